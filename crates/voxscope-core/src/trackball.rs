//! Trackball mapping from cursor motion to rotations and translations.
//!
//! Cursor positions are normalized to `[-1, 1]` with Y pointing up and then
//! lifted onto a unit hemisphere. Past `r² = 0.5` the hemisphere is replaced
//! by the hyperbolic sheet `z = 1 / (2r)`, which meets the sphere at that
//! radius and stays finite for cursors outside the visible disk.

use glam::{Quat, Vec2, Vec3};

/// Angle of the quaternion built for every rotation step.
pub const ROTATION_ANGLE: f32 = std::f32::consts::FRAC_PI_2;

/// Squared radius where the sphere hands over to the hyperbolic sheet.
const SPHERE_LIMIT: f32 = 0.5;

/// Cursor state for rotation and translation gestures.
#[derive(Debug, Clone)]
pub struct Trackball {
    enabled: bool,
    pressed: bool,
    resolution: Vec2,
    rotation_point: Vec3,
    translation_point: Vec2,
}

impl Default for Trackball {
    fn default() -> Self {
        Self::new(1, 1)
    }
}

impl Trackball {
    /// Creates an enabled trackball for a framebuffer of the given size.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        let mut trackball = Self {
            enabled: true,
            pressed: false,
            resolution: Vec2::ONE,
            rotation_point: Vec3::Z,
            translation_point: Vec2::ZERO,
        };
        trackball.set_resolution(width, height);
        trackball
    }

    /// Updates the tracked framebuffer size. Zero sizes are treated as 1.
    pub fn set_resolution(&mut self, width: u32, height: u32) {
        self.resolution = Vec2::new(width.max(1) as f32, height.max(1) as f32);
    }

    /// Tracked framebuffer size.
    #[must_use]
    pub fn resolution(&self) -> Vec2 {
        self.resolution
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    #[must_use]
    pub fn is_pressed(&self) -> bool {
        self.pressed
    }

    pub fn set_pressed(&mut self, pressed: bool) {
        self.pressed = pressed;
    }

    /// Maps pixel coordinates to `[-1, 1]²` with Y flipped.
    #[must_use]
    pub fn normalize_to_window(&self, x: f32, y: f32) -> Vec2 {
        let Vec2 { x: w, y: h } = self.resolution;
        Vec2::new((2.0 * x - w) / w, (h - 2.0 * y) / h)
    }

    /// Lifts a cursor position onto the sphere or its hyperbolic extension.
    #[must_use]
    pub fn project_to_sphere(&self, x: f32, y: f32) -> Vec3 {
        let point = self.normalize_to_window(x, y);
        let r2 = point.length_squared();
        let z = if r2 <= SPHERE_LIMIT {
            (1.0 - r2).sqrt()
        } else {
            1.0 / (2.0 * r2.sqrt())
        };
        point.extend(z)
    }

    /// Latches the anchor for a rotation gesture.
    pub fn set_rotation_point(&mut self, x: f32, y: f32) {
        self.rotation_point = self.project_to_sphere(x, y);
    }

    /// Latches the anchor for a translation gesture.
    pub fn set_translation_point(&mut self, x: f32, y: f32) {
        self.translation_point = self.normalize_to_window(x, y);
    }

    /// Last rotation anchor on the sphere.
    #[must_use]
    pub fn rotation_point(&self) -> Vec3 {
        self.rotation_point
    }

    /// Last translation anchor in window coordinates.
    #[must_use]
    pub fn translation_point(&self) -> Vec2 {
        self.translation_point
    }

    /// Rotation from the anchor to the cursor. Moves the anchor to the cursor.
    ///
    /// The quaternion is built with [`ROTATION_ANGLE`] about the unnormalized
    /// cross product of the two sphere points and then normalized, so small
    /// cursor steps yield small rotations and a zero step yields identity.
    pub fn rotate(&mut self, x: f32, y: f32) -> Quat {
        let point = self.project_to_sphere(x, y);
        let axis = self.rotation_point.cross(point);
        self.rotation_point = point;

        let (sin, cos) = (ROTATION_ANGLE * 0.5).sin_cos();
        let scaled = axis * sin;
        Quat::from_xyzw(scaled.x, scaled.y, scaled.z, cos).normalize()
    }

    /// Window-space offset from the anchor to the cursor. Moves the anchor to the cursor.
    pub fn translate(&mut self, x: f32, y: f32) -> Vec2 {
        let point = self.normalize_to_window(x, y);
        let delta = point - self.translation_point;
        self.translation_point = point;
        delta
    }
}
