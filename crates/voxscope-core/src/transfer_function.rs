//! Piecewise-linear transfer function over 256 intensity levels.
//!
//! A transfer function is a sparse set of control nodes, each mapping an
//! intensity level to an RGBA color. The 256-entry lookup table is derived
//! from the nodes by linear interpolation and rebuilt on every edit. Levels
//! 0 and 255 are always nodes, so the table has defined endpoints.

use std::collections::BTreeMap;

use glam::IVec4;

use crate::resource::{TextureHandle, TextureStore};
use crate::shader::{names, ShaderProgram, Uniform};

/// Number of entries in the lookup table.
pub const LOOKUP_SIZE: usize = 256;

/// An 8-bit RGBA color, channel order R, G, B, A.
pub type Rgba = [u8; 4];

/// Fully transparent black, the default color at level 0.
pub const TRANSPARENT_BLACK: Rgba = [0, 0, 0, 0];

/// Opaque white, the default color at level 255.
pub const OPAQUE_WHITE: Rgba = [255, 255, 255, 255];

const FIRST_LEVEL: u8 = 0;
const LAST_LEVEL: u8 = u8::MAX;

/// Editable color/opacity mapping from voxel intensity.
#[derive(Debug, Clone)]
pub struct TransferFunction {
    nodes: BTreeMap<u8, Rgba>,
    table: [Rgba; LOOKUP_SIZE],
    current: u8,
    revision: u64,
    uploaded_revision: Option<u64>,
    texture: Option<TextureHandle>,
}

impl Default for TransferFunction {
    fn default() -> Self {
        Self::new()
    }
}

impl TransferFunction {
    /// Creates a transfer function ramping from transparent black to opaque white.
    #[must_use]
    pub fn new() -> Self {
        let mut tf = Self {
            nodes: BTreeMap::new(),
            table: [TRANSPARENT_BLACK; LOOKUP_SIZE],
            current: FIRST_LEVEL,
            revision: 0,
            uploaded_revision: None,
            texture: None,
        };
        tf.reset();
        tf
    }

    /// Inserts or overwrites the node at `level`. Channels are clamped to 0..=255.
    pub fn set_node(&mut self, level: u8, color: impl Into<IVec4>) {
        self.nodes.insert(level, clamp_color(color.into()));
        self.rebuild();
    }

    /// Sets the color of the current level, making it a node.
    pub fn set_current_node(&mut self, color: impl Into<IVec4>) {
        self.set_node(self.current, color);
    }

    /// Designates `level` as current without touching the table.
    pub fn set_current_node_index(&mut self, level: u8) {
        self.current = level;
    }

    /// Moves the current level to the preceding node.
    ///
    /// If the current level is not a node, the nearest node below it is
    /// selected. Stays on the first node.
    pub fn select_previous_node(&mut self) -> u8 {
        let below = self.nodes.range(..self.current).next_back().map(|(&l, _)| l);
        if let Some(level) = below {
            self.current = level;
        } else if !self.nodes.contains_key(&self.current) {
            // Nothing below and not a node: fall back to the first node.
            if let Some(&first) = self.nodes.keys().next() {
                self.current = first;
            }
        }
        self.current
    }

    /// Moves the current level to the next node above it. Stays on the last node.
    pub fn select_next_node(&mut self) -> u8 {
        let above = self
            .nodes
            .range(self.current.saturating_add(1)..)
            .next()
            .map(|(&l, _)| l);
        if let Some(level) = above.filter(|_| self.current < LAST_LEVEL) {
            self.current = level;
        }
        self.current
    }

    /// Removes the node at `level`.
    ///
    /// The boundary levels 0 and 255 are never removed, so the node set
    /// cannot fall below two members. Removing the current node moves the
    /// current level to a neighbor.
    pub fn remove_node(&mut self, level: u8) {
        if level == self.current {
            self.remove_current_node();
            return;
        }
        if is_boundary(level) || self.nodes.len() <= 2 {
            return;
        }
        if self.nodes.remove(&level).is_some() {
            self.rebuild();
        }
    }

    /// Removes the current node and selects the following node, or the
    /// preceding one when there is none.
    ///
    /// If the current level is not a node this selects the previous node instead.
    pub fn remove_current_node(&mut self) {
        if self.nodes.len() <= 2 {
            return;
        }
        if !self.nodes.contains_key(&self.current) {
            self.select_previous_node();
            return;
        }
        if is_boundary(self.current) {
            return;
        }

        let next = self.nodes.range(self.current + 1..).next().map(|(&l, _)| l);
        let previous = self.nodes.range(..self.current).next_back().map(|(&l, _)| l);
        let Some(new_current) = next.or(previous) else {
            return;
        };
        self.nodes.remove(&self.current);
        self.current = new_current;
        self.rebuild();
    }

    /// Restores the two default boundary nodes and selects level 0.
    pub fn reset(&mut self) {
        self.nodes.clear();
        self.nodes.insert(FIRST_LEVEL, TRANSPARENT_BLACK);
        self.nodes.insert(LAST_LEVEL, OPAQUE_WHITE);
        self.current = FIRST_LEVEL;
        self.rebuild();
    }

    /// Makes the lookup texture available to `program` at `slot`.
    ///
    /// Does nothing if the program is absent or failed to link.
    pub fn bind(&self, program: Option<&mut dyn ShaderProgram>, slot: u32) {
        let Some(program) = program else {
            return;
        };
        if !program.is_valid() {
            return;
        }
        program.use_program();
        program.set_uniform(
            names::TRANSFER_FUNCTION,
            Uniform::Int(i32::try_from(slot).unwrap_or(i32::MAX)),
        );
        if let Some(texture) = self.texture {
            program.bind_texture(slot, texture);
        }
    }

    /// Recreates the lookup texture if the table changed since the last upload.
    ///
    /// The previous texture is released before the new one is created.
    pub fn upload(&mut self, store: &mut dyn TextureStore) {
        if self.uploaded_revision == Some(self.revision)
            && self.texture.is_some_and(|t| store.contains(t))
        {
            return;
        }
        self.release(store);
        match store.create_lookup_texture(&self.table) {
            Ok(handle) => {
                self.texture = Some(handle);
                self.uploaded_revision = Some(self.revision);
            }
            Err(e) => log::error!("failed to create transfer function texture: {e}"),
        }
    }

    /// Forces the next [`upload`](Self::upload) to recreate the texture.
    pub fn invalidate(&mut self) {
        self.uploaded_revision = None;
    }

    /// Frees the lookup texture.
    pub fn release(&mut self, store: &mut dyn TextureStore) {
        if let Some(texture) = self.texture.take() {
            store.release(texture);
        }
    }

    /// Table color at `level`. Interpolated when `level` is not a node.
    #[must_use]
    pub fn node_color(&self, level: u8) -> Rgba {
        self.table[usize::from(level)]
    }

    /// Table color at the current level.
    #[must_use]
    pub fn current_node_color(&self) -> Rgba {
        self.node_color(self.current)
    }

    /// The current level.
    #[must_use]
    pub fn current_node(&self) -> u8 {
        self.current
    }

    /// Returns true if `level` is a control node.
    #[must_use]
    pub fn is_node(&self, level: u8) -> bool {
        self.nodes.contains_key(&level)
    }

    /// Control nodes in ascending level order.
    pub fn nodes(&self) -> impl Iterator<Item = (u8, Rgba)> + '_ {
        self.nodes.iter().map(|(&l, &c)| (l, c))
    }

    /// Number of control nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// The derived lookup table.
    #[must_use]
    pub fn table(&self) -> &[Rgba; LOOKUP_SIZE] {
        &self.table
    }

    /// Counter bumped on every table rebuild.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Handle of the uploaded lookup texture, if any.
    #[must_use]
    pub fn texture(&self) -> Option<TextureHandle> {
        self.texture
    }

    fn rebuild(&mut self) {
        let mut nodes = self.nodes.iter().map(|(&l, &c)| (usize::from(l), c));
        let Some((mut a, mut color_a)) = nodes.next() else {
            return;
        };

        self.table[..a].fill(color_a);
        for (b, color_b) in nodes {
            let span = (b - a) as f32;
            let slope: [f32; 4] =
                std::array::from_fn(|c| (f32::from(color_b[c]) - f32::from(color_a[c])) / span);
            for (offset, entry) in self.table[a..b].iter_mut().enumerate() {
                let t = offset as f32;
                // Truncation toward zero, not rounding.
                *entry = std::array::from_fn(|c| (f32::from(color_a[c]) + t * slope[c]) as u8);
            }
            a = b;
            color_a = color_b;
        }
        self.table[a..].fill(color_a);

        self.revision += 1;
    }
}

fn is_boundary(level: u8) -> bool {
    level == FIRST_LEVEL || level == LAST_LEVEL
}

fn clamp_color(color: IVec4) -> Rgba {
    let clamped = color.clamp(IVec4::ZERO, IVec4::splat(255));
    clamped
        .to_array()
        .map(|c| u8::try_from(c).unwrap_or(u8::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::HostTextureStore;
    use proptest::prelude::*;

    #[test]
    fn test_reset_ramp() {
        let tf = TransferFunction::new();
        assert_eq!(tf.node_color(0), [0, 0, 0, 0]);
        assert_eq!(tf.node_color(255), [255, 255, 255, 255]);
        assert_eq!(tf.node_color(128), [128, 128, 128, 128]);
        assert_eq!(tf.node_count(), 2);
        assert_eq!(tf.current_node(), 0);
    }

    #[test]
    fn test_set_node_example() {
        let mut tf = TransferFunction::new();
        tf.set_node(64, [255, 0, 0, 255]);
        assert_eq!(tf.node_color(32), [127, 0, 0, 127]);
        assert_eq!(tf.node_color(64), [255, 0, 0, 255]);
        // Level 200 lies on the segment from node 64 to node 255.
        assert_eq!(tf.node_color(200), [255, 181, 181, 255]);
        assert_eq!(tf.node_color(255), [255, 255, 255, 255]);
    }

    #[test]
    fn test_levels_outside_nodes_replicate_boundary_color() {
        let mut tf = TransferFunction::new();
        tf.set_node(0, [0, 0, 0, 0]);
        tf.set_node(200, [255, 255, 255, 255]);
        tf.set_node(255, [255, 255, 255, 255]);
        for level in 200..=255 {
            assert_eq!(tf.node_color(level), [255, 255, 255, 255]);
        }
    }

    #[test]
    fn test_set_node_clamps_channels() {
        let mut tf = TransferFunction::new();
        tf.set_node(10, [-20, 300, 128, 1000]);
        assert_eq!(tf.node_color(10), [0, 255, 128, 255]);
    }

    #[test]
    fn test_boundary_replication() {
        let mut tf = TransferFunction::new();
        tf.set_node(0, [10, 20, 30, 40]);
        tf.set_node(255, [50, 60, 70, 80]);
        tf.set_node(100, [1, 2, 3, 4]);
        tf.set_node(150, [9, 9, 9, 9]);
        assert_eq!(tf.node_color(0), [10, 20, 30, 40]);
        assert_eq!(tf.node_color(255), [50, 60, 70, 80]);
        assert_eq!(tf.node_color(100), [1, 2, 3, 4]);
        assert_eq!(tf.node_color(150), [9, 9, 9, 9]);
    }

    #[test]
    fn test_set_current_node_targets_current_level() {
        let mut tf = TransferFunction::new();
        let before = tf.revision();
        tf.set_current_node_index(90);
        assert_eq!(tf.revision(), before, "selecting must not rebuild");
        assert_eq!(tf.current_node_color(), [90, 90, 90, 90]);
        tf.set_current_node([0, 255, 0, 255]);
        assert!(tf.is_node(90));
        assert_eq!(tf.current_node_color(), [0, 255, 0, 255]);
        assert!(tf.revision() > before);
    }

    #[test]
    fn test_select_previous_and_next() {
        let mut tf = TransferFunction::new();
        tf.set_node(50, [1, 1, 1, 1]);
        tf.set_node(100, [2, 2, 2, 2]);

        assert_eq!(tf.select_previous_node(), 0, "stays on the first node");
        assert_eq!(tf.select_next_node(), 50);
        assert_eq!(tf.select_next_node(), 100);
        assert_eq!(tf.select_next_node(), 255);
        assert_eq!(tf.select_next_node(), 255, "stays on the last node");
        assert_eq!(tf.select_previous_node(), 100);
    }

    #[test]
    fn test_select_from_level_without_node() {
        let mut tf = TransferFunction::new();
        tf.set_node(50, [1, 1, 1, 1]);
        tf.set_node(100, [2, 2, 2, 2]);

        tf.set_current_node_index(75);
        assert_eq!(tf.select_previous_node(), 50);

        tf.set_current_node_index(75);
        assert_eq!(tf.select_next_node(), 100);
    }

    #[test]
    fn test_remove_current_moves_to_neighbor() {
        let mut tf = TransferFunction::new();
        tf.set_node(50, [1, 1, 1, 1]);
        tf.set_node(100, [2, 2, 2, 2]);
        tf.set_current_node_index(50);

        tf.remove_current_node();
        assert!(!tf.is_node(50));
        assert_eq!(tf.current_node(), 100);

        tf.remove_node(100);
        assert_eq!(tf.current_node(), 255);
        assert_eq!(tf.node_count(), 2);
        assert_eq!(tf.node_color(128), [128, 128, 128, 128]);
    }

    #[test]
    fn test_remove_current_without_node_selects_previous() {
        let mut tf = TransferFunction::new();
        tf.set_node(50, [1, 1, 1, 1]);
        tf.set_current_node_index(70);
        tf.remove_current_node();
        assert_eq!(tf.current_node(), 50);
        assert_eq!(tf.node_count(), 3);
    }

    #[test]
    fn test_remove_never_drops_boundaries() {
        let mut tf = TransferFunction::new();
        tf.set_node(30, [1, 1, 1, 1]);
        tf.set_node(60, [1, 1, 1, 1]);
        for level in [0, 255, 30, 60, 0, 255] {
            tf.remove_node(level);
        }
        let nodes: Vec<u8> = tf.nodes().map(|(l, _)| l).collect();
        assert_eq!(nodes, vec![0, 255]);

        tf.remove_current_node();
        assert_eq!(tf.node_count(), 2);
    }

    #[test]
    fn test_upload_recreates_texture_on_change() {
        let mut store = HostTextureStore::new();
        let mut tf = TransferFunction::new();

        tf.upload(&mut store);
        let first = tf.texture().unwrap();
        tf.upload(&mut store);
        assert_eq!(tf.texture(), Some(first), "unchanged table keeps its texture");

        tf.set_node(64, [255, 0, 0, 255]);
        tf.upload(&mut store);
        let second = tf.texture().unwrap();
        assert_ne!(first, second);
        assert!(!store.contains(first), "old texture must be released");
        assert_eq!(store.len(), 1);
        assert_eq!(store.lookup_table(second).unwrap()[64], [255, 0, 0, 255]);

        tf.release(&mut store);
        assert!(store.is_empty());
    }

    #[derive(Default)]
    struct Probe {
        valid: bool,
        used: bool,
        uniforms: Vec<(String, Uniform)>,
        bound: Vec<(u32, TextureHandle)>,
    }

    impl ShaderProgram for Probe {
        fn use_program(&mut self) {
            self.used = true;
        }
        fn is_valid(&self) -> bool {
            self.valid
        }
        fn set_uniform(&mut self, name: &str, value: Uniform) {
            self.uniforms.push((name.to_string(), value));
        }
        fn bind_texture(&mut self, slot: u32, texture: TextureHandle) {
            self.bound.push((slot, texture));
        }
        fn draw_quad(&mut self) {}
        fn link(&mut self) -> crate::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_bind_skips_invalid_program() {
        let mut store = HostTextureStore::new();
        let mut tf = TransferFunction::new();
        tf.upload(&mut store);

        tf.bind(None, 1);

        let mut invalid = Probe::default();
        tf.bind(Some(&mut invalid), 1);
        assert!(!invalid.used);
        assert!(invalid.uniforms.is_empty());

        let mut valid = Probe {
            valid: true,
            ..Probe::default()
        };
        tf.bind(Some(&mut valid), 1);
        assert!(valid.used);
        assert_eq!(
            valid.uniforms,
            vec![(names::TRANSFER_FUNCTION.to_string(), Uniform::Int(1))]
        );
        assert_eq!(valid.bound, vec![(1, tf.texture().unwrap())]);
    }

    proptest! {
        #[test]
        fn prop_table_matches_nodes_and_stays_between_neighbors(
            edits in prop::collection::vec((1u8..255, any::<[u8; 4]>()), 0..12)
        ) {
            let mut tf = TransferFunction::new();
            for (level, color) in &edits {
                tf.set_node(*level, color.map(i32::from));
            }

            let nodes: Vec<(u8, Rgba)> = tf.nodes().collect();
            for (level, color) in &nodes {
                prop_assert_eq!(tf.node_color(*level), *color);
            }
            for pair in nodes.windows(2) {
                let (a, ca) = pair[0];
                let (b, cb) = pair[1];
                for level in a..=b {
                    let entry = tf.node_color(level);
                    for c in 0..4 {
                        let lo = ca[c].min(cb[c]);
                        let hi = ca[c].max(cb[c]);
                        prop_assert!(entry[c] >= lo && entry[c] <= hi);
                    }
                }
            }
        }

        #[test]
        fn prop_next_then_previous_round_trips(
            levels in prop::collection::btree_set(1u8..255, 0..10),
            pick in any::<prop::sample::Index>()
        ) {
            let mut tf = TransferFunction::new();
            for level in &levels {
                tf.set_node(*level, [1, 2, 3, 4]);
            }
            let nodes: Vec<u8> = tf.nodes().map(|(l, _)| l).collect();
            let start = nodes[pick.index(nodes.len() - 1)];
            tf.set_current_node_index(start);
            tf.select_next_node();
            prop_assert_eq!(tf.select_previous_node(), start);
        }

        #[test]
        fn prop_removal_stabilizes_at_boundaries(
            levels in prop::collection::vec(any::<u8>(), 0..20),
            removals in prop::collection::vec(any::<u8>(), 0..40)
        ) {
            let mut tf = TransferFunction::new();
            for level in &levels {
                tf.set_node(*level, [7, 7, 7, 7]);
            }
            for level in removals {
                tf.set_current_node_index(level);
                tf.remove_current_node();
                tf.remove_node(level);
                prop_assert!(tf.node_count() >= 2);
            }
            for _ in 0..300 {
                tf.remove_current_node();
                let current = tf.current_node();
                tf.remove_node(current.wrapping_add(1));
            }
            prop_assert!(tf.is_node(0) && tf.is_node(255));
        }
    }
}
