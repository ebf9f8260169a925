//! Placement of a volume in world space.

use glam::{EulerRot, Mat4, Quat, Vec3};

/// Replacement for scale components that stop being finite.
pub const SCALE_EPSILON: f32 = 0.001;

/// Position, rotation and per-axis scale of a volume, with the derived
/// model and sampling matrices.
///
/// The volume occupies a box of size `extent` centered on its local origin,
/// where `extent` is the grid size normalized to a unit diagonal. Both
/// matrices are recomputed by every mutating call.
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    position: Vec3,
    rotation: Quat,
    scale: Vec3,
    extent: Vec3,
    model: Mat4,
    sampling: Mat4,
}

impl Default for Placement {
    fn default() -> Self {
        Self::new(Vec3::ONE)
    }
}

impl Placement {
    /// Creates an identity placement for a box of the given extent.
    #[must_use]
    pub fn new(extent: Vec3) -> Self {
        let mut placement = Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
            extent: Vec3::ONE,
            model: Mat4::IDENTITY,
            sampling: Mat4::IDENTITY,
        };
        placement.set_extent(extent);
        placement
    }

    /// Resets to the identity pose: origin, no rotation, unit scale.
    pub fn reset(&mut self) {
        self.position = Vec3::ZERO;
        self.rotation = Quat::IDENTITY;
        self.scale = Vec3::ONE;
        self.update_matrices();
    }

    /// Sets the local box size. Degenerate extents fall back to a unit cube.
    pub fn set_extent(&mut self, extent: Vec3) {
        self.extent = if extent.is_finite() && extent.min_element() > 0.0 {
            extent
        } else {
            Vec3::ONE
        };
        self.update_matrices();
    }

    pub fn translate(&mut self, delta: Vec3) {
        self.position += delta;
        self.update_matrices();
    }

    /// Rotates by Euler angles in degrees, applied before the current rotation.
    pub fn rotate_euler(&mut self, degrees: Vec3) {
        self.rotate(quat_from_degrees(degrees));
    }

    /// Left-composes `rotation` onto the current rotation and renormalizes.
    pub fn rotate(&mut self, rotation: Quat) {
        let composed = (rotation * self.rotation).normalize();
        if composed.is_finite() {
            self.rotation = composed;
        }
        self.update_matrices();
    }

    /// Multiplies the scale component-wise. Non-finite results become [`SCALE_EPSILON`].
    pub fn scale(&mut self, factor: Vec3) {
        self.scale = finite_or_epsilon(self.scale * factor);
        self.update_matrices();
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        self.update_matrices();
    }

    pub fn set_rotation(&mut self, rotation: Quat) {
        self.rotation = rotation.normalize();
        if !self.rotation.is_finite() {
            self.rotation = Quat::IDENTITY;
        }
        self.update_matrices();
    }

    /// Sets the rotation from Euler angles in degrees.
    pub fn set_rotation_euler(&mut self, degrees: Vec3) {
        self.set_rotation(quat_from_degrees(degrees));
    }

    pub fn set_scale(&mut self, scale: Vec3) {
        self.scale = finite_or_epsilon(scale);
        self.update_matrices();
    }

    #[must_use]
    pub fn position(&self) -> Vec3 {
        self.position
    }

    #[must_use]
    pub fn rotation(&self) -> Quat {
        self.rotation
    }

    /// Rotation as Euler angles in degrees.
    #[must_use]
    pub fn rotation_degrees(&self) -> Vec3 {
        let (z, y, x) = self.rotation.to_euler(EulerRot::ZYX);
        Vec3::new(x.to_degrees(), y.to_degrees(), z.to_degrees())
    }

    #[must_use]
    pub fn scale_factor(&self) -> Vec3 {
        self.scale
    }

    #[must_use]
    pub fn extent(&self) -> Vec3 {
        self.extent
    }

    /// Translate · rotate · scale.
    #[must_use]
    pub fn model_matrix(&self) -> Mat4 {
        self.model
    }

    /// Maps world space to the `[0, 1]³` texture space of the grid.
    #[must_use]
    pub fn sampling_matrix(&self) -> Mat4 {
        self.sampling
    }

    /// Radius of the sphere enclosing the placed box.
    #[must_use]
    pub fn bounding_radius(&self) -> f32 {
        0.5 * (self.extent * self.scale).length()
    }

    fn update_matrices(&mut self) {
        self.model =
            Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position);
        let to_texture =
            Mat4::from_translation(Vec3::splat(0.5)) * Mat4::from_scale(self.extent.recip());
        self.sampling = to_texture * self.model.inverse();
    }
}

fn quat_from_degrees(degrees: Vec3) -> Quat {
    Quat::from_euler(
        EulerRot::ZYX,
        degrees.z.to_radians(),
        degrees.y.to_radians(),
        degrees.x.to_radians(),
    )
}

fn finite_or_epsilon(v: Vec3) -> Vec3 {
    Vec3::from_array(
        v.to_array()
            .map(|c| if c.is_finite() { c } else { SCALE_EPSILON }),
    )
}
