//! A first-person fly camera.

use glam::{Mat4, Vec3, vec3};

const DEFAULT_POSITION: Vec3 = vec3(0.0, 1.0, 3.0);
const DEFAULT_YAW: f32 = -90.0;
const DEFAULT_PITCH: f32 = 0.0;
const DEFAULT_FOV: f32 = 45.0;
const DEFAULT_MOVEMENT_SPEED: f32 = 10.0;
const DEFAULT_LOOK_SPEED: f32 = 0.125;

const Z_NEAR: f32 = 0.1;
const Z_FAR: f32 = 10000.0;

/// Movement directions relative to the camera orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraMovement {
    Forward,
    Backward,
    Left,
    Right,
    Up,
    Down,
}

/// A free-look camera updated by input handling each frame.
#[derive(Debug, Clone)]
pub struct Camera {
    pub position: Vec3,
    pub fov: f32,
    pub movement_speed: f32,
    pub look_speed: f32,
    yaw: f32,
    pitch: f32,
    forward: Vec3,
    up: Vec3,
}

impl Camera {
    pub fn new() -> Self {
        let mut camera = Self {
            position: DEFAULT_POSITION,
            fov: DEFAULT_FOV,
            movement_speed: DEFAULT_MOVEMENT_SPEED,
            look_speed: DEFAULT_LOOK_SPEED,
            yaw: DEFAULT_YAW,
            pitch: DEFAULT_PITCH,
            forward: Vec3::NEG_Z,
            up: Vec3::Y,
        };
        camera.update_forward();
        camera
    }

    /// Moves the camera in the given direction by `speed * dt`.
    pub fn advance(&mut self, direction: CameraMovement, dt: f32) {
        let step = self.movement_speed * dt;
        let right = self.forward.cross(self.up).normalize();
        match direction {
            CameraMovement::Forward => self.position += self.forward * step,
            CameraMovement::Backward => self.position -= self.forward * step,
            CameraMovement::Left => self.position -= right * step,
            CameraMovement::Right => self.position += right * step,
            CameraMovement::Up => self.position += self.up * step,
            CameraMovement::Down => self.position -= self.up * step,
        }
    }

    /// Rotates the view by the given mouse delta, in pixels. Pitch is
    /// clamped so the view never flips over.
    pub fn look_around(&mut self, dx: f32, dy: f32) {
        self.yaw += dx * self.look_speed;
        self.pitch = (self.pitch - dy * self.look_speed).clamp(-89.0, 89.0);
        self.update_forward();
    }

    /// Restores position, orientation, speeds and field of view to their
    /// defaults.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn forward(&self) -> Vec3 {
        self.forward
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.position + self.forward, self.up)
    }

    pub fn projection_matrix(&self, width: u32, height: u32) -> Mat4 {
        Mat4::perspective_rh_gl(
            self.fov.to_radians(),
            width as f32 / height.max(1) as f32,
            Z_NEAR,
            Z_FAR,
        )
    }

    fn update_forward(&mut self) {
        let yaw_rad = self.yaw.to_radians();
        let pitch_rad = self.pitch.to_radians();
        self.forward = vec3(
            yaw_rad.cos() * pitch_rad.cos(),
            pitch_rad.sin(),
            yaw_rad.sin() * pitch_rad.cos(),
        )
        .normalize();
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3Swizzles;

    #[test]
    fn test_default_looks_down_negative_z() {
        let camera = Camera::new();
        assert!((camera.forward() - Vec3::NEG_Z).length() < 1e-5);
    }

    #[test]
    fn test_pitch_is_clamped() {
        let mut camera = Camera::new();
        camera.look_around(0.0, -100000.0);
        assert!(camera.forward().y <= 1.0);
        // Still well-defined: forward never becomes vertical.
        assert!(camera.forward().xz().length() > 1e-4);
    }

    #[test]
    fn test_reset_restores_defaults() {
        let mut camera = Camera::new();
        camera.advance(CameraMovement::Forward, 1.0);
        camera.look_around(40.0, 10.0);
        camera.fov = 90.0;
        camera.reset();
        assert_eq!(camera.position, DEFAULT_POSITION);
        assert_eq!(camera.fov, DEFAULT_FOV);
        assert!((camera.forward() - Vec3::NEG_Z).length() < 1e-5);
    }

    #[test]
    fn test_view_matrix_translates_world_to_eye() {
        let camera = Camera::new();
        let eye = camera.view_matrix().transform_point3(camera.position);
        assert!(eye.length() < 1e-5);
    }
}
