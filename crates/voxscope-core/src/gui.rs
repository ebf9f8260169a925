//! Transfer function editor overlay: hit regions and pixel-space geometry.
//!
//! The editor is anchored to the bottom edge of the framebuffer. From the
//! bottom up it shows the lookup gradient, the curve graph with the node
//! selector arrows above it, and one level bar per channel (alpha, blue,
//! green, red). Hit testing uses window pixels with Y pointing down, the
//! same convention as cursor events.

use bytemuck::{Pod, Zeroable};

use crate::transfer_function::{Rgba, TransferFunction, LOOKUP_SIZE};

/// Left edge of the curve and bars, in pixels.
pub const MARGIN_LEFT: f32 = 13.0;

/// Pixels between the right framebuffer edge and the right end of the curve.
pub const MARGIN_RIGHT: f32 = 13.0;

/// Height of the curve graph.
pub const GRAPH_HEIGHT: f32 = 64.0;

const STRIP_BOTTOM: f32 = 5.0;
const GRAPH_BOTTOM: f32 = 10.0;
const ARROW_BOTTOM: f32 = 74.0;
const ROW_HEIGHT: f32 = 5.0;
const FIRST_BAR_BOTTOM: f32 = 81.0;
const BAR_PITCH: f32 = 12.0;

/// Part of the window under the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HitRegion {
    /// Outside the editor; gestures manipulate the volume.
    #[default]
    Volume,
    /// Curve graph: pick a level or remove the current node.
    Function,
    /// Arrow selecting the previous node.
    Previous,
    /// Arrow selecting the next node.
    Next,
    Red,
    Green,
    Blue,
    Alpha,
}

impl HitRegion {
    /// Color channel index edited by a level bar, 0=R 1=G 2=B 3=A.
    #[must_use]
    pub fn channel(self) -> Option<usize> {
        match self {
            HitRegion::Red => Some(0),
            HitRegion::Green => Some(1),
            HitRegion::Blue => Some(2),
            HitRegion::Alpha => Some(3),
            _ => None,
        }
    }

    /// Returns true for every region that belongs to the editor.
    #[must_use]
    pub fn is_gui(self) -> bool {
        self != HitRegion::Volume
    }
}

/// Bars from the bottom up, with the channel each one edits.
const BARS: [(HitRegion, [f32; 4]); 4] = [
    (HitRegion::Alpha, [1.0, 1.0, 1.0, 1.0]),
    (HitRegion::Blue, [0.0, 0.0, 1.0, 1.0]),
    (HitRegion::Green, [0.0, 1.0, 0.0, 1.0]),
    (HitRegion::Red, [1.0, 0.0, 0.0, 1.0]),
];

/// Overlay vertex in window pixels.
///
/// `lookup` is the transfer function coordinate to sample, or negative for
/// a flat color. The sampled color is multiplied by `color`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
#[allow(clippy::pub_underscore_fields)]
pub struct GuiVertex {
    pub position: [f32; 2],
    pub lookup: f32,
    pub _padding: f32,
    pub color: [f32; 4],
}

impl GuiVertex {
    fn flat(x: f32, y: f32, color: [f32; 4]) -> Self {
        Self {
            position: [x, y],
            lookup: -1.0,
            _padding: 0.0,
            color,
        }
    }

    fn sampled(x: f32, y: f32, lookup: f32) -> Self {
        Self {
            position: [x, y],
            lookup,
            _padding: 0.0,
            color: [1.0; 4],
        }
    }
}

/// Triangles and line segments making up one frame of the overlay.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GuiGeometry {
    /// Triangle list.
    pub triangles: Vec<GuiVertex>,
    /// Line list: consecutive pairs form one segment.
    pub lines: Vec<GuiVertex>,
}

impl GuiGeometry {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty() && self.lines.is_empty()
    }

    /// Axis-aligned rectangle with `bottom`/`top` measured up from the window bottom.
    fn rect(&mut self, height: f32, x0: f32, x1: f32, bottom: f32, top: f32, color: [f32; 4]) {
        let (y0, y1) = (height - bottom, height - top);
        let corners = [(x0, y0), (x1, y0), (x1, y1), (x0, y0), (x1, y1), (x0, y1)];
        self.triangles
            .extend(corners.map(|(x, y)| GuiVertex::flat(x, y, color)));
    }

    fn triangle(&mut self, height: f32, points: [(f32, f32); 3], color: [f32; 4]) {
        self.triangles.extend(
            points.map(|(x, bottom)| GuiVertex::flat(x, height - bottom, color)),
        );
    }

    fn polyline(&mut self, points: impl IntoIterator<Item = GuiVertex>) {
        let mut previous: Option<GuiVertex> = None;
        for point in points {
            if let Some(start) = previous {
                self.lines.push(start);
                self.lines.push(point);
            }
            previous = Some(point);
        }
    }
}

/// Editor placement for the current framebuffer size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GuiLayout {
    width: f32,
    height: f32,
    visible: bool,
}

impl Default for GuiLayout {
    fn default() -> Self {
        Self::new(1, 1)
    }
}

impl GuiLayout {
    /// Creates a visible layout for a framebuffer of the given size.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width as f32,
            height: height as f32,
            visible: true,
        }
    }

    pub fn set_resolution(&mut self, width: u32, height: u32) {
        self.width = width as f32;
        self.height = height as f32;
    }

    #[must_use]
    pub fn width(&self) -> f32 {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> f32 {
        self.height
    }

    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    /// Width of the curve in pixels.
    #[must_use]
    pub fn curve_width(&self) -> f32 {
        (self.width - MARGIN_LEFT - MARGIN_RIGHT).max(1.0)
    }

    /// Classifies a cursor position given in window pixels, Y down.
    ///
    /// All bounds are exclusive. A hidden editor classifies everything as
    /// [`HitRegion::Volume`].
    #[must_use]
    pub fn classify(&self, x: f32, y: f32) -> HitRegion {
        if !self.visible {
            return HitRegion::Volume;
        }
        let (w, h) = (self.width, self.height);
        let left = MARGIN_LEFT;
        let right = w - (MARGIN_RIGHT - 1.0);
        let inside = |x0: f32, x1: f32, y0: f32, y1: f32| x > x0 && x < x1 && y > y0 && y < y1;

        // Rows are stored as distances from the bottom edge.
        let curve_top = h - (FIRST_BAR_BOTTOM);
        if inside(left, right, curve_top, h - 4.0) {
            return HitRegion::Function;
        }
        let arrows_bottom = h - (ARROW_BOTTOM - 1.0);
        if inside(4.0, 10.0, curve_top, arrows_bottom) {
            return HitRegion::Previous;
        }
        if inside(w - 10.0, w - 4.0, curve_top, arrows_bottom) {
            return HitRegion::Next;
        }

        let mut bar_bottom = FIRST_BAR_BOTTOM - 1.0;
        for (region, _) in BARS {
            let bar_top = bar_bottom + BAR_PITCH + 1.0;
            if inside(left, right, h - bar_top, h - bar_bottom) {
                return region;
            }
            bar_bottom += BAR_PITCH;
        }
        HitRegion::Volume
    }

    /// Maps a cursor X to an intensity level, clamped to 0..=255.
    #[must_use]
    pub fn level_from_x(&self, x: f32) -> u8 {
        let level = 255.0 * (x - MARGIN_LEFT) / self.curve_width();
        level.clamp(0.0, 255.0) as u8
    }

    /// X of the curve point for `level`.
    #[must_use]
    pub fn x_for_level(&self, level: u8) -> f32 {
        MARGIN_LEFT + f32::from(level) / 255.0 * self.curve_width()
    }

    /// Builds the overlay for the current transfer function state.
    ///
    /// Empty while the editor is hidden.
    #[must_use]
    pub fn geometry(&self, tf: &TransferFunction) -> GuiGeometry {
        let mut geometry = GuiGeometry::default();
        if !self.visible {
            return geometry;
        }
        let h = self.height;
        let (x0, x1) = (MARGIN_LEFT, self.width - MARGIN_RIGHT);
        let background = [0.15, 0.15, 0.15, 0.8];
        let marker = [0.9, 0.9, 0.9, 1.0];

        // Lookup gradient strip sampled straight from the texture.
        let (y0, y1) = (h - STRIP_BOTTOM, h - GRAPH_BOTTOM);
        geometry.triangles.extend([
            GuiVertex::sampled(x0, y0, 0.0),
            GuiVertex::sampled(x1, y0, 1.0),
            GuiVertex::sampled(x1, y1, 1.0),
            GuiVertex::sampled(x0, y0, 0.0),
            GuiVertex::sampled(x1, y1, 1.0),
            GuiVertex::sampled(x0, y1, 0.0),
        ]);

        geometry.rect(h, x0, x1, GRAPH_BOTTOM, ARROW_BOTTOM, background);
        for (level, _) in tf.nodes() {
            let x = self.x_for_level(level);
            geometry.rect(h, x - 0.5, x + 0.5, GRAPH_BOTTOM, ARROW_BOTTOM, [0.4, 0.4, 0.4, 1.0]);
        }

        let (arrow_top, arrow_mid) = (ARROW_BOTTOM + ROW_HEIGHT, ARROW_BOTTOM + ROW_HEIGHT * 0.5);
        geometry.triangle(h, [(5.0, arrow_mid), (10.0, ARROW_BOTTOM), (10.0, arrow_top)], marker);
        let right_edge = self.width;
        geometry.triangle(
            h,
            [
                (right_edge - 5.0, arrow_mid),
                (right_edge - 10.0, arrow_top),
                (right_edge - 10.0, ARROW_BOTTOM),
            ],
            marker,
        );
        let current_x = self.x_for_level(tf.current_node());
        geometry.triangle(
            h,
            [
                (current_x - 2.5, arrow_top),
                (current_x, ARROW_BOTTOM),
                (current_x + 2.5, arrow_top),
            ],
            marker,
        );

        let current = tf.current_node_color();
        let mut bar_bottom = FIRST_BAR_BOTTOM;
        for (region, color) in BARS {
            let dim = [color[0] * 0.5, color[1] * 0.5, color[2] * 0.5, 1.0];
            geometry.rect(h, x0, x1, bar_bottom, bar_bottom + ROW_HEIGHT, dim);
            if let Some(channel) = region.channel() {
                let x = self.x_for_level(current[channel]);
                let top = bar_bottom + 2.0 * ROW_HEIGHT;
                geometry.triangle(
                    h,
                    [(x - 2.5, top), (x, bar_bottom + ROW_HEIGHT), (x + 2.5, top)],
                    color,
                );
            }
            bar_bottom += BAR_PITCH;
        }

        // Draw order alpha, blue, green, red puts red on top.
        for (region, color) in BARS {
            let Some(channel) = region.channel() else {
                continue;
            };
            let table = tf.table();
            geometry.polyline((0..LOOKUP_SIZE).map(|i| {
                let x = x0 + i as f32 / 255.0 * self.curve_width();
                GuiVertex::flat(x, h - graph_y(table[i], channel), color)
            }));
        }
        geometry
    }
}

/// Height above the window bottom of a channel value in the curve graph.
fn graph_y(color: Rgba, channel: usize) -> f32 {
    GRAPH_BOTTOM + f32::from(color[channel]) * GRAPH_HEIGHT / 255.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> GuiLayout {
        GuiLayout::new(800, 600)
    }

    #[test]
    fn test_vertex_size() {
        assert_eq!(std::mem::size_of::<GuiVertex>(), 32);
    }

    #[test]
    fn test_classify_curve_and_arrows() {
        let layout = layout();
        assert_eq!(layout.classify(400.0, 550.0), HitRegion::Function);
        assert_eq!(layout.classify(7.0, 523.0), HitRegion::Previous);
        assert_eq!(layout.classify(793.0, 523.0), HitRegion::Next);
        // Arrow column below the arrow row.
        assert_eq!(layout.classify(7.0, 560.0), HitRegion::Volume);
    }

    #[test]
    fn test_classify_channel_bars() {
        let layout = layout();
        assert_eq!(layout.classify(400.0, 512.0), HitRegion::Alpha);
        assert_eq!(layout.classify(400.0, 500.0), HitRegion::Blue);
        assert_eq!(layout.classify(400.0, 488.0), HitRegion::Green);
        assert_eq!(layout.classify(400.0, 476.0), HitRegion::Red);
        assert_eq!(layout.classify(400.0, 300.0), HitRegion::Volume);
    }

    #[test]
    fn test_bounds_are_exclusive() {
        let layout = layout();
        assert_eq!(layout.classify(13.0, 550.0), HitRegion::Volume);
        assert_eq!(layout.classify(788.0, 550.0), HitRegion::Volume);
        assert_eq!(layout.classify(787.5, 550.0), HitRegion::Function);
        assert_eq!(layout.classify(400.0, 596.0), HitRegion::Volume);
    }

    #[test]
    fn test_overlap_rows_prefer_curve() {
        // y = 519.5 sits in both the curve rows and the alpha bar rows.
        assert_eq!(layout().classify(400.0, 519.5), HitRegion::Function);
    }

    #[test]
    fn test_hidden_layout_is_all_volume() {
        let mut layout = layout();
        layout.set_visible(false);
        assert_eq!(layout.classify(400.0, 550.0), HitRegion::Volume);
        assert!(layout.geometry(&TransferFunction::new()).is_empty());
    }

    #[test]
    fn test_level_from_x() {
        let layout = layout();
        assert_eq!(layout.level_from_x(13.0), 0);
        assert_eq!(layout.level_from_x(787.0), 255);
        assert_eq!(layout.level_from_x(400.0), 127);
        assert_eq!(layout.level_from_x(-50.0), 0);
        assert_eq!(layout.level_from_x(5000.0), 255);
    }

    #[test]
    fn test_channel_indices() {
        assert_eq!(HitRegion::Red.channel(), Some(0));
        assert_eq!(HitRegion::Alpha.channel(), Some(3));
        assert_eq!(HitRegion::Next.channel(), None);
        assert!(!HitRegion::Volume.is_gui());
    }

    #[test]
    fn test_geometry_curves_follow_table() {
        let layout = layout();
        let mut tf = TransferFunction::new();
        tf.set_node(64, [255, 0, 0, 255]);
        let geometry = layout.geometry(&tf);

        assert_eq!(geometry.triangles.len() % 3, 0);
        // Four channels of 255 segments each.
        assert_eq!(geometry.lines.len(), 4 * 255 * 2);

        // The red curve is drawn last; its point at level 64 is at the top of the graph.
        let red = &geometry.lines[3 * 255 * 2..];
        let at_64 = red[64 * 2 - 1];
        assert!((at_64.position[1] - (600.0 - GRAPH_BOTTOM - GRAPH_HEIGHT)).abs() < 1e-4);
        assert!((at_64.position[0] - layout.x_for_level(64)).abs() < 1e-3);
    }
}
