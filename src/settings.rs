//! Per-frame render settings.
//!
//! The original toggles (bloom, exposure, gate state, shading model) live in
//! one struct that is passed by reference into render calls rather than
//! floating around as globals. Input handling mutates it; the renderer only
//! reads it.

/// Number of separable blur iterations run per frame by default.
pub const DEFAULT_BLUR_ITERATIONS: u32 = 10;

/// How far exposure moves per frame while Z or C is held.
pub const EXPOSURE_STEP: f32 = 0.001;

/// How far the parallax height scale moves per frame while Q or E is held.
pub const HEIGHT_SCALE_STEP: f32 = 0.0005;

/// Render settings adjusted at runtime through the keyboard.
#[derive(Clone, Debug)]
pub struct RenderSettings {
    /// Whether the blurred bright-pass is added back in during composite.
    pub bloom_enabled: bool,
    /// Exposure used by the tone-map operator. Never negative.
    pub exposure: f32,
    /// Number of blur iterations (alternating horizontal/vertical).
    pub blur_iterations: u32,
    /// Blinn-Phong (true) vs. plain Phong specular.
    pub blinn_phong: bool,
    /// Whether the paddock gate is drawn closed.
    pub gate_closed: bool,
    /// Parallax mapping height scale for the ground, in [0, 1].
    pub height_scale: f32,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            bloom_enabled: false,
            exposure: 1.0,
            blur_iterations: DEFAULT_BLUR_ITERATIONS,
            blinn_phong: true,
            gate_closed: false,
            height_scale: 0.0305,
        }
    }
}

impl RenderSettings {
    /// Clamp all fields to safe ranges.
    pub fn sanitize(&self) -> Self {
        Self {
            exposure: self.exposure.max(0.0),
            blur_iterations: self.blur_iterations.max(1),
            height_scale: self.height_scale.clamp(0.0, 1.0),
            ..self.clone()
        }
    }

    pub fn adjust_exposure(&mut self, delta: f32) {
        self.exposure = (self.exposure + delta).max(0.0);
    }

    pub fn adjust_height_scale(&mut self, delta: f32) {
        self.height_scale = (self.height_scale + delta).clamp(0.0, 1.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let s = RenderSettings::default();
        assert!(!s.bloom_enabled);
        assert_eq!(s.blur_iterations, 10);
        assert!((s.exposure - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_exposure_floor() {
        let mut s = RenderSettings::default();
        for _ in 0..2000 {
            s.adjust_exposure(-EXPOSURE_STEP);
        }
        assert_eq!(s.exposure, 0.0);

        s.adjust_exposure(EXPOSURE_STEP);
        assert!(s.exposure > 0.0);
    }

    #[test]
    fn test_height_scale_clamped() {
        let mut s = RenderSettings::default();
        s.adjust_height_scale(5.0);
        assert_eq!(s.height_scale, 1.0);
        s.adjust_height_scale(-10.0);
        assert_eq!(s.height_scale, 0.0);
    }

    #[test]
    fn test_sanitize_floors_iterations() {
        let s = RenderSettings {
            blur_iterations: 0,
            exposure: -2.0,
            ..Default::default()
        };
        let s = s.sanitize();
        assert_eq!(s.blur_iterations, 1);
        assert_eq!(s.exposure, 0.0);
    }
}
