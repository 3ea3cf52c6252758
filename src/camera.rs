//! First-person fly camera.
//!
//! Yaw/pitch orientation with WASD movement along the camera basis, mouse
//! look and scroll-to-zoom. The projection uses the zoom angle as the
//! vertical field of view, so zooming in narrows the frustum.

use glam::{Mat4, Vec3};

const DEFAULT_YAW: f32 = -90.0;
const DEFAULT_PITCH: f32 = 0.0;
const MOVE_SPEED: f32 = 2.5;
const MOUSE_SENSITIVITY: f32 = 0.1;
const DEFAULT_ZOOM: f32 = 45.0;

const PITCH_LIMIT: f32 = 89.0;
const ZOOM_MIN: f32 = 1.0;
const ZOOM_MAX: f32 = 45.0;

/// Movement directions relative to the camera basis.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MoveDirection {
    Forward,
    Backward,
    Left,
    Right,
}

/// A free-flying camera.
///
/// Angles are stored in degrees; the basis vectors are recomputed whenever
/// yaw or pitch changes.
#[derive(Clone, Debug)]
pub struct Camera {
    pub position: Vec3,
    front: Vec3,
    up: Vec3,
    right: Vec3,
    world_up: Vec3,
    yaw: f32,
    pitch: f32,
    /// Vertical field of view in degrees, adjusted by the scroll wheel.
    pub zoom: f32,
}

impl Camera {
    pub fn new(position: Vec3) -> Self {
        let mut camera = Self {
            position,
            front: Vec3::NEG_Z,
            up: Vec3::Y,
            right: Vec3::X,
            world_up: Vec3::Y,
            yaw: DEFAULT_YAW,
            pitch: DEFAULT_PITCH,
            zoom: DEFAULT_ZOOM,
        };
        camera.update_basis();
        camera
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.position + self.front, self.up)
    }

    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(self.zoom.to_radians(), aspect, 0.1, 100.0)
    }

    /// View matrix with translation stripped, for skybox rendering.
    pub fn skybox_view_matrix(&self) -> Mat4 {
        let view = self.view_matrix();
        let mut cols = view.to_cols_array_2d();
        cols[3] = [0.0, 0.0, 0.0, 1.0];
        Mat4::from_cols_array_2d(&cols)
    }

    pub fn process_keyboard(&mut self, direction: MoveDirection, dt: f32) {
        let velocity = MOVE_SPEED * dt;
        match direction {
            MoveDirection::Forward => self.position += self.front * velocity,
            MoveDirection::Backward => self.position -= self.front * velocity,
            MoveDirection::Left => self.position -= self.right * velocity,
            MoveDirection::Right => self.position += self.right * velocity,
        }
    }

    pub fn process_mouse(&mut self, dx: f32, dy: f32) {
        self.yaw += dx * MOUSE_SENSITIVITY;
        self.pitch = (self.pitch + dy * MOUSE_SENSITIVITY).clamp(-PITCH_LIMIT, PITCH_LIMIT);
        self.update_basis();
    }

    pub fn process_scroll(&mut self, dy: f32) {
        self.zoom = (self.zoom - dy).clamp(ZOOM_MIN, ZOOM_MAX);
    }

    pub fn front(&self) -> Vec3 {
        self.front
    }

    fn update_basis(&mut self) {
        let (yaw, pitch) = (self.yaw.to_radians(), self.pitch.to_radians());
        self.front = Vec3::new(
            yaw.cos() * pitch.cos(),
            pitch.sin(),
            yaw.sin() * pitch.cos(),
        )
        .normalize();
        self.right = self.front.cross(self.world_up).normalize();
        self.up = self.right.cross(self.front).normalize();
    }
}

impl Default for Camera {
    fn default() -> Self {
        // Matches the scene's intended vantage point over the village.
        Self::new(Vec3::new(-6.0, 7.0, -9.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_faces_negative_z() {
        let camera = Camera::new(Vec3::ZERO);
        assert!((camera.front() - Vec3::NEG_Z).length() < 1e-5);
    }

    #[test]
    fn test_pitch_clamped() {
        let mut camera = Camera::new(Vec3::ZERO);
        camera.process_mouse(0.0, 10_000.0);
        assert!(camera.pitch <= PITCH_LIMIT);
        camera.process_mouse(0.0, -100_000.0);
        assert!(camera.pitch >= -PITCH_LIMIT);
        // Basis stays finite and normalized at the clamp
        assert!((camera.front().length() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_zoom_clamped() {
        let mut camera = Camera::new(Vec3::ZERO);
        camera.process_scroll(100.0);
        assert_eq!(camera.zoom, ZOOM_MIN);
        camera.process_scroll(-100.0);
        assert_eq!(camera.zoom, ZOOM_MAX);
    }

    #[test]
    fn test_basis_orthonormal() {
        let mut camera = Camera::new(Vec3::ZERO);
        camera.process_mouse(123.0, -37.0);
        let (f, r, u) = (camera.front, camera.right, camera.up);
        assert!(f.dot(r).abs() < 1e-5);
        assert!(f.dot(u).abs() < 1e-5);
        assert!(r.dot(u).abs() < 1e-5);
    }

    #[test]
    fn test_movement_follows_basis() {
        let mut camera = Camera::new(Vec3::ZERO);
        camera.process_keyboard(MoveDirection::Forward, 1.0);
        assert!(camera.position.z < 0.0);
        camera.process_keyboard(MoveDirection::Backward, 1.0);
        assert!(camera.position.length() < 1e-5);
    }

    #[test]
    fn test_skybox_view_has_no_translation() {
        let camera = Camera::new(Vec3::new(5.0, 3.0, -2.0));
        let view = camera.skybox_view_matrix();
        let t = view.to_cols_array_2d()[3];
        assert_eq!(t, [0.0, 0.0, 0.0, 1.0]);
    }
}
