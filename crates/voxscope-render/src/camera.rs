//! Camera and view management.

use glam::{Mat4, Vec3};

/// Travel speed multiplier while boost is held.
pub const BOOST_FACTOR: f32 = 4.0;

/// Camera projection mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProjectionMode {
    /// Perspective projection.
    #[default]
    Perspective,
    /// Orthographic projection.
    Orthographic,
}

/// A camera looking at the volume.
#[derive(Debug, Clone)]
pub struct Camera {
    /// Camera position in world space.
    pub position: Vec3,
    /// Point the camera is looking at.
    pub target: Vec3,
    /// Up vector.
    pub up: Vec3,
    /// Field of view in radians.
    pub fov: f32,
    /// Aspect ratio (width / height).
    pub aspect_ratio: f32,
    /// Near clipping plane.
    pub near: f32,
    /// Far clipping plane.
    pub far: f32,
    /// Projection mode.
    pub projection_mode: ProjectionMode,
    /// Movement speed in world units per second.
    pub move_speed: f32,
    /// Orthographic half height (used when `projection_mode` is Orthographic).
    pub ortho_scale: f32,
    /// Whether travel runs at [`BOOST_FACTOR`] speed.
    pub boost: bool,
}

impl Camera {
    /// Creates a new camera with default settings.
    #[must_use]
    pub fn new(aspect_ratio: f32) -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 2.0),
            target: Vec3::ZERO,
            up: Vec3::Y,
            fov: std::f32::consts::FRAC_PI_4, // 45 degrees
            aspect_ratio,
            near: 0.01,
            far: 100.0,
            projection_mode: ProjectionMode::Perspective,
            move_speed: 1.0,
            ortho_scale: 0.8,
            boost: false,
        }
    }

    /// Updates the aspect ratio from a framebuffer size. Zero sizes are ignored.
    pub fn set_resolution(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.aspect_ratio = width as f32 / height as f32;
        }
    }

    /// Returns the view matrix.
    #[must_use]
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    /// Returns the projection matrix.
    #[must_use]
    pub fn projection_matrix(&self) -> Mat4 {
        match self.projection_mode {
            ProjectionMode::Perspective => {
                Mat4::perspective_rh(self.fov, self.aspect_ratio, self.near, self.far)
            }
            ProjectionMode::Orthographic => {
                let half_height = self.ortho_scale;
                let half_width = half_height * self.aspect_ratio;
                // Symmetric depth range so slices behind the target are not clipped.
                let dist = (self.position - self.target).length();
                let ortho_depth = (dist + self.far).max(self.ortho_scale * 100.0);
                Mat4::orthographic_rh(
                    -half_width,
                    half_width,
                    -half_height,
                    half_height,
                    -ortho_depth,
                    ortho_depth,
                )
            }
        }
    }

    /// Returns the combined view-projection matrix.
    #[must_use]
    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Returns the camera's forward direction.
    #[must_use]
    pub fn forward(&self) -> Vec3 {
        (self.target - self.position).normalize_or(Vec3::NEG_Z)
    }

    /// Returns the camera's right direction.
    #[must_use]
    pub fn right(&self) -> Vec3 {
        self.forward().cross(self.up).normalize_or(Vec3::X)
    }

    /// Zooms the camera (moves toward/away from target for perspective,
    /// adjusts `ortho_scale` for orthographic).
    pub fn zoom(&mut self, delta: f32) {
        match self.projection_mode {
            ProjectionMode::Perspective => {
                let direction = self.forward();
                let distance = (self.position - self.target).length();
                let new_distance = (distance - delta).max(0.1);
                self.position = self.target - direction * new_distance;
            }
            ProjectionMode::Orthographic => {
                // delta > 0 zooms in, so the scale shrinks.
                let zoom_factor = (1.0 - delta * 0.4).max(0.1);
                self.ortho_scale = (self.ortho_scale * zoom_factor).clamp(0.01, 1000.0);
            }
        }
    }

    /// Sets the projection mode.
    pub fn set_projection_mode(&mut self, mode: ProjectionMode) {
        self.projection_mode = mode;
    }

    pub fn set_orthographic(&mut self, orthographic: bool) {
        self.projection_mode = if orthographic {
            ProjectionMode::Orthographic
        } else {
            ProjectionMode::Perspective
        };
    }

    /// Switches between perspective and orthographic projection.
    pub fn toggle_projection(&mut self) {
        self.set_orthographic(self.projection_mode == ProjectionMode::Perspective);
        log::debug!("projection: {:?}", self.projection_mode);
    }

    pub fn set_boost(&mut self, boost: bool) {
        self.boost = boost;
    }

    /// Sets the movement speed.
    pub fn set_move_speed(&mut self, speed: f32) {
        self.move_speed = speed.max(0.01);
    }

    /// Moves the camera and its target together.
    ///
    /// `direction` is in camera space: +X right, +Y up, +Z forward. It is
    /// normalized, so diagonal travel is not faster.
    pub fn travel(&mut self, direction: Vec3, dt: f32) {
        if direction.length_squared() == 0.0 || !dt.is_finite() || dt <= 0.0 {
            return;
        }
        let boost = if self.boost { BOOST_FACTOR } else { 1.0 };
        let step = direction.normalize() * self.move_speed * boost * dt;
        let offset = self.right() * step.x + self.up * step.y + self.forward() * step.z;
        self.position += offset;
        self.target += offset;
    }

    /// Centers the view on the origin so a sphere of `radius` fills the view.
    pub fn look_at_radius(&mut self, radius: f32) {
        let radius = if radius.is_finite() && radius > 0.0 {
            radius
        } else {
            0.5
        };
        let distance = radius / (self.fov * 0.5).sin() * 1.2;
        self.target = Vec3::ZERO;
        self.position = Vec3::new(0.0, 0.0, distance);
        self.near = distance * 0.01;
        self.far = distance * 10.0;
        self.ortho_scale = radius * 1.2;
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(16.0 / 9.0)
    }
}
