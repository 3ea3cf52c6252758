//! Keyboard and mouse state collection.
//!
//! Winit events are folded into a per-frame snapshot: held keys drive
//! continuous controls (movement, exposure, height scale), while the toggles
//! (bloom, gate, shading model, cursor capture) are edge-triggered so holding
//! the key down does not re-fire them.

use std::collections::HashSet;

use winit::event::ElementState;
use winit::keyboard::KeyCode;

use crate::camera::{Camera, MoveDirection};
use crate::settings::{RenderSettings, EXPOSURE_STEP, HEIGHT_SCALE_STEP};

/// Accumulated input state, applied once per frame.
#[derive(Debug, Default)]
pub struct InputState {
    held: HashSet<KeyCode>,
    /// Mouse motion accumulated since the last `apply`.
    mouse_dx: f32,
    mouse_dy: f32,
    /// Scroll accumulated since the last `apply`.
    scroll_dy: f32,

    pub quit_requested: bool,
    /// Set for one `apply` call when F1 is pressed.
    pub cursor_toggled: bool,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a key press or release into the state.
    ///
    /// Toggles fire on the press edge only; `ElementState::Pressed` repeats
    /// from the OS are filtered out by the held-set check.
    pub fn handle_key(
        &mut self,
        key: KeyCode,
        state: ElementState,
        settings: &mut RenderSettings,
    ) {
        match state {
            ElementState::Pressed => {
                let was_held = !self.held.insert(key);
                if was_held {
                    return;
                }
                match key {
                    KeyCode::Escape => self.quit_requested = true,
                    KeyCode::Space => settings.bloom_enabled = !settings.bloom_enabled,
                    KeyCode::KeyG => settings.gate_closed = !settings.gate_closed,
                    KeyCode::KeyM => settings.blinn_phong = !settings.blinn_phong,
                    KeyCode::F1 => self.cursor_toggled = true,
                    _ => {}
                }
            }
            ElementState::Released => {
                self.held.remove(&key);
            }
        }
    }

    pub fn handle_mouse_motion(&mut self, dx: f64, dy: f64) {
        self.mouse_dx += dx as f32;
        // Reversed: screen y grows downward, pitch grows upward.
        self.mouse_dy -= dy as f32;
    }

    pub fn handle_scroll(&mut self, dy: f32) {
        self.scroll_dy += dy;
    }

    /// Apply held keys and accumulated deltas to the camera and settings,
    /// then reset the per-frame accumulators.
    pub fn apply(&mut self, dt: f32, camera: &mut Camera, settings: &mut RenderSettings) {
        if self.held.contains(&KeyCode::KeyW) {
            camera.process_keyboard(MoveDirection::Forward, dt);
        }
        if self.held.contains(&KeyCode::KeyS) {
            camera.process_keyboard(MoveDirection::Backward, dt);
        }
        if self.held.contains(&KeyCode::KeyA) {
            camera.process_keyboard(MoveDirection::Left, dt);
        }
        if self.held.contains(&KeyCode::KeyD) {
            camera.process_keyboard(MoveDirection::Right, dt);
        }

        if self.held.contains(&KeyCode::KeyZ) {
            settings.adjust_exposure(-EXPOSURE_STEP);
        } else if self.held.contains(&KeyCode::KeyC) {
            settings.adjust_exposure(EXPOSURE_STEP);
        }

        if self.held.contains(&KeyCode::KeyQ) {
            settings.adjust_height_scale(-HEIGHT_SCALE_STEP);
        } else if self.held.contains(&KeyCode::KeyE) {
            settings.adjust_height_scale(HEIGHT_SCALE_STEP);
        }

        if self.mouse_dx != 0.0 || self.mouse_dy != 0.0 {
            camera.process_mouse(self.mouse_dx, self.mouse_dy);
        }
        if self.scroll_dy != 0.0 {
            camera.process_scroll(self.scroll_dy);
        }

        self.mouse_dx = 0.0;
        self.mouse_dy = 0.0;
        self.scroll_dy = 0.0;
        self.cursor_toggled = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn test_bloom_toggle_is_edge_triggered() {
        let mut input = InputState::new();
        let mut settings = RenderSettings::default();
        assert!(!settings.bloom_enabled);

        input.handle_key(KeyCode::Space, ElementState::Pressed, &mut settings);
        assert!(settings.bloom_enabled);

        // Key repeat while held must not toggle again
        input.handle_key(KeyCode::Space, ElementState::Pressed, &mut settings);
        assert!(settings.bloom_enabled);

        input.handle_key(KeyCode::Space, ElementState::Released, &mut settings);
        input.handle_key(KeyCode::Space, ElementState::Pressed, &mut settings);
        assert!(!settings.bloom_enabled);
    }

    #[test]
    fn test_held_exposure_keys() {
        let mut input = InputState::new();
        let mut settings = RenderSettings::default();
        let mut camera = Camera::new(Vec3::ZERO);

        input.handle_key(KeyCode::KeyC, ElementState::Pressed, &mut settings);
        let before = settings.exposure;
        input.apply(0.016, &mut camera, &mut settings);
        input.apply(0.016, &mut camera, &mut settings);
        assert!((settings.exposure - before - 2.0 * EXPOSURE_STEP).abs() < 1e-6);
    }

    #[test]
    fn test_mouse_deltas_reset_after_apply() {
        let mut input = InputState::new();
        let mut settings = RenderSettings::default();
        let mut camera = Camera::new(Vec3::ZERO);

        input.handle_mouse_motion(10.0, 0.0);
        input.apply(0.016, &mut camera, &mut settings);
        let after_first = camera.front();
        input.apply(0.016, &mut camera, &mut settings);
        // Second apply with no new motion must not rotate further
        assert!((camera.front() - after_first).length() < 1e-6);
    }

    #[test]
    fn test_escape_requests_quit() {
        let mut input = InputState::new();
        let mut settings = RenderSettings::default();
        input.handle_key(KeyCode::Escape, ElementState::Pressed, &mut settings);
        assert!(input.quit_requested);
    }
}
