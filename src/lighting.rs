//! Scene lighting: one directional light, four point lights and the UFO's
//! downward spotlight.
//!
//! All values are packed into a single uniform struct uploaded once per
//! frame. Vec3 quantities are stored as `[f32; 4]` so the layout matches
//! WGSL's 16-byte alignment rules without implicit padding.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

/// Fixed positions of the village's four point lights.
pub const POINT_LIGHT_POSITIONS: [Vec3; 4] = [
    Vec3::new(0.7, 0.2, 2.0),
    Vec3::new(2.3, 2.0, -4.0),
    Vec3::new(-4.0, 2.0, -12.0),
    Vec3::new(0.0, 0.0, -3.0),
];

/// Direction of the moonlight over the village.
pub const DIR_LIGHT_DIRECTION: Vec3 = Vec3::new(-0.2, -1.0, -0.3);

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct DirLight {
    /// Direction (xyz), w unused.
    pub direction: [f32; 4],
    pub ambient: [f32; 4],
    pub diffuse: [f32; 4],
    pub specular: [f32; 4],
} // 64 bytes

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct PointLight {
    /// Position (xyz), w unused.
    pub position: [f32; 4],
    pub ambient: [f32; 4],
    pub diffuse: [f32; 4],
    pub specular: [f32; 4],
    /// Attenuation: constant (x), linear (y), quadratic (z), w unused.
    pub attenuation: [f32; 4],
} // 80 bytes

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct SpotLight {
    pub position: [f32; 4],
    pub direction: [f32; 4],
    pub ambient: [f32; 4],
    pub diffuse: [f32; 4],
    pub specular: [f32; 4],
    /// Attenuation: constant (x), linear (y), quadratic (z), w unused.
    pub attenuation: [f32; 4],
    /// Cosine of inner cutoff (x) and outer cutoff (y), zw unused.
    pub cutoffs: [f32; 4],
} // 112 bytes

/// GPU-ready lighting uniforms for the forward pass.
///
/// Total size: 528 bytes (16-byte aligned).
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct LightingUniforms {
    pub dir_light: DirLight,         // 64 bytes
    pub point_lights: [PointLight; 4], // 320 bytes
    pub spot_light: SpotLight,       // 112 bytes
    /// Camera position in world space (xyz), w unused.
    pub view_pos: [f32; 4],          // 16 bytes
    /// Specular shininess exponent.
    pub shininess: f32,              // 4 bytes
    /// Blinn-Phong (1) vs. Phong (0) specular.
    pub blinn_phong: u32,            // 4 bytes
    pub _padding: [u32; 2],          // 8 bytes
} // Total: 528 bytes

fn vec4(v: Vec3) -> [f32; 4] {
    [v.x, v.y, v.z, 0.0]
}

fn splat(v: f32) -> [f32; 4] {
    [v, v, v, 0.0]
}

impl LightingUniforms {
    /// Build the frame's lighting from the camera position, the UFO position
    /// (spotlight source) and the shading-model toggle.
    pub fn new(view_pos: Vec3, ufo_pos: Vec3, blinn_phong: bool) -> Self {
        let point_light = |position: Vec3| PointLight {
            position: vec4(position),
            ambient: splat(0.05),
            diffuse: splat(0.1),
            specular: splat(0.1),
            attenuation: [1.0, 0.09, 0.032, 0.0],
        };

        Self {
            dir_light: DirLight {
                direction: vec4(DIR_LIGHT_DIRECTION),
                ambient: splat(0.05),
                diffuse: splat(0.1),
                specular: splat(0.1),
            },
            point_lights: [
                point_light(POINT_LIGHT_POSITIONS[0]),
                point_light(POINT_LIGHT_POSITIONS[1]),
                point_light(POINT_LIGHT_POSITIONS[2]),
                point_light(POINT_LIGHT_POSITIONS[3]),
            ],
            spot_light: SpotLight {
                position: vec4(ufo_pos),
                direction: vec4(Vec3::NEG_Y),
                ambient: splat(0.0),
                diffuse: splat(0.1),
                specular: splat(0.1),
                attenuation: [1.0, 1.0, 1.0, 0.0],
                cutoffs: [
                    12.5_f32.to_radians().cos(),
                    15.0_f32.to_radians().cos(),
                    0.0,
                    0.0,
                ],
            },
            view_pos: vec4(view_pos),
            shininess: 16.0,
            blinn_phong: blinn_phong as u32,
            _padding: [0; 2],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_struct_sizes() {
        assert_eq!(std::mem::size_of::<DirLight>(), 64);
        assert_eq!(std::mem::size_of::<PointLight>(), 80);
        assert_eq!(std::mem::size_of::<SpotLight>(), 112);
        assert_eq!(std::mem::size_of::<LightingUniforms>(), 528);
    }

    #[test]
    fn test_spotlight_cone() {
        let u = LightingUniforms::new(Vec3::ZERO, Vec3::new(0.0, 7.0, 0.0), true);
        // Inner cutoff cosine must be larger (tighter cone) than the outer one
        assert!(u.spot_light.cutoffs[0] > u.spot_light.cutoffs[1]);
        assert_eq!(u.spot_light.direction[1], -1.0);
        assert_eq!(u.spot_light.position[1], 7.0);
    }

    #[test]
    fn test_blinn_flag() {
        let u = LightingUniforms::new(Vec3::ZERO, Vec3::ZERO, false);
        assert_eq!(u.blinn_phong, 0);
        let u = LightingUniforms::new(Vec3::ZERO, Vec3::ZERO, true);
        assert_eq!(u.blinn_phong, 1);
    }
}
