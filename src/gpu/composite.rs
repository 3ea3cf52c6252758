//! Final composite pass: bloom add, tone map, gamma.
//!
//! Runs as a fullscreen triangle reading the HDR scene color and the
//! blurred bright pass, writing the tone-mapped result to the surface (or
//! the offline readback target). The bloom term is added before tone
//! mapping so bright regions saturate together rather than clipping.

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use crate::gpu::pipeline;
use crate::gpu::render_target::{HdrTarget, PingPongTargets};
use crate::settings::RenderSettings;

/// Gamma applied when the output surface is linear.
pub const OUTPUT_GAMMA: f32 = 2.2;

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct CompositeUniforms {
    pub exposure: f32,
    pub bloom_enabled: u32,
    pub gamma: f32,
    pub _padding: f32,
}

impl CompositeUniforms {
    pub fn new(settings: &RenderSettings, gamma: f32) -> Self {
        let settings = settings.sanitize();
        Self {
            exposure: settings.exposure,
            bloom_enabled: settings.bloom_enabled as u32,
            gamma,
            _padding: 0.0,
        }
    }
}

// === CPU reference for the tone-map operator ===

/// Exponential tone map with gamma correction, per channel.
pub fn tone_map(hdr: f32, exposure: f32, gamma: f32) -> f32 {
    let mapped = 1.0 - (-hdr * exposure).exp();
    mapped.powf(1.0 / gamma)
}

/// Full composite for one channel: bloom add then tone map.
pub fn composite_reference(
    scene: f32,
    bloom: f32,
    bloom_enabled: bool,
    exposure: f32,
    gamma: f32,
) -> f32 {
    let hdr = if bloom_enabled { scene + bloom } else { scene };
    tone_map(hdr, exposure, gamma)
}

/// GPU state for the composite pass.
pub struct CompositePass {
    pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    uniform_bind: wgpu::BindGroup,
    input_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    /// One bind group per possible blur result texture.
    input_binds: [wgpu::BindGroup; 2],
}

impl CompositePass {
    pub fn new(
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        hdr: &HdrTarget,
        ping_pong: &PingPongTargets,
    ) -> Self {
        let uniform_layout = pipeline::create_composite_uniform_layout(device);
        let input_layout = pipeline::create_composite_input_layout(device);

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("composite_pipeline_layout"),
            bind_group_layouts: &[&uniform_layout, &input_layout],
            push_constant_ranges: &[],
        });
        let pipeline = pipeline::create_composite_pipeline(device, &pipeline_layout, surface_format);

        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("composite_uniforms"),
            contents: bytemuck::bytes_of(&CompositeUniforms {
                exposure: 1.0,
                bloom_enabled: 0,
                gamma: OUTPUT_GAMMA,
                _padding: 0.0,
            }),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let uniform_bind = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("composite_uniforms"),
            layout: &uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let input_binds = Self::build_input_binds(device, &input_layout, &sampler, hdr, ping_pong);

        Self {
            pipeline,
            uniform_buffer,
            uniform_bind,
            input_layout,
            sampler,
            input_binds,
        }
    }

    fn build_input_binds(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        sampler: &wgpu::Sampler,
        hdr: &HdrTarget,
        ping_pong: &PingPongTargets,
    ) -> [wgpu::BindGroup; 2] {
        let bind = |blur_view: &wgpu::TextureView, label: &str| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(label),
                layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(&hdr.scene_view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(blur_view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: wgpu::BindingResource::Sampler(sampler),
                    },
                ],
            })
        };
        [
            bind(&ping_pong.views[0], "composite_input_ping0"),
            bind(&ping_pong.views[1], "composite_input_ping1"),
        ]
    }

    /// Rebuild the texture bind groups after the targets were recreated.
    pub fn rebind(
        &mut self,
        device: &wgpu::Device,
        hdr: &HdrTarget,
        ping_pong: &PingPongTargets,
    ) {
        self.input_binds =
            Self::build_input_binds(device, &self.input_layout, &self.sampler, hdr, ping_pong);
    }

    /// Upload this frame's uniforms. Must happen before the encoder that
    /// uses them is submitted.
    pub fn write_uniforms(&self, queue: &wgpu::Queue, uniforms: &CompositeUniforms) {
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(uniforms));
    }

    /// Record the composite pass into `target`, reading the blur result
    /// from ping-pong texture `blur_index`.
    pub fn run(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
        blur_index: usize,
    ) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("composite_pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.uniform_bind, &[]);
        pass.set_bind_group(1, &self.input_binds[blur_index], &[]);
        pass.draw(0..3, 0..1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniforms_layout() {
        assert_eq!(std::mem::size_of::<CompositeUniforms>(), 16);
    }

    #[test]
    fn test_uniforms_sanitized_from_settings() {
        let settings = RenderSettings {
            exposure: -3.0,
            bloom_enabled: true,
            ..Default::default()
        };
        let u = CompositeUniforms::new(&settings, OUTPUT_GAMMA);
        assert_eq!(u.exposure, 0.0);
        assert_eq!(u.bloom_enabled, 1);
    }

    #[test]
    fn test_tone_map_monotonic_in_input() {
        let mut prev = -1.0;
        for i in 0..100 {
            let hdr = i as f32 * 0.25;
            let out = tone_map(hdr, 1.0, OUTPUT_GAMMA);
            assert!(out > prev);
            assert!((0.0..=1.0).contains(&out));
            prev = out;
        }
    }

    #[test]
    fn test_tone_map_monotonic_in_exposure() {
        let mut prev = -1.0;
        for i in 1..50 {
            let out = tone_map(2.0, i as f32 * 0.1, OUTPUT_GAMMA);
            assert!(out > prev);
            prev = out;
        }
    }

    #[test]
    fn test_zero_exposure_maps_to_black() {
        assert_eq!(tone_map(5.0, 0.0, OUTPUT_GAMMA), 0.0);
    }

    #[test]
    fn test_bloom_disabled_ignores_bloom_input() {
        let with_bloom_input = composite_reference(1.5, 100.0, false, 1.0, OUTPUT_GAMMA);
        let without = composite_reference(1.5, 0.0, false, 1.0, OUTPUT_GAMMA);
        assert_eq!(with_bloom_input, without);
    }

    #[test]
    fn test_bloom_adds_before_tone_map() {
        let combined = composite_reference(1.0, 2.0, true, 1.0, OUTPUT_GAMMA);
        let expected = tone_map(3.0, 1.0, OUTPUT_GAMMA);
        assert_eq!(combined, expected);
        // Additive before the curve, not after: brighter than scene alone
        assert!(combined > tone_map(1.0, 1.0, OUTPUT_GAMMA));
    }
}
