//! Separable Gaussian blur over the bright-pass texture.
//!
//! The blur alternates between two full-resolution HDR textures. Iteration
//! 0 is horizontal and reads the bright-pass attachment; every later
//! iteration reads the texture the previous one wrote. Queue writes land
//! immediately rather than in submission order, so the direction flag
//! cannot be rewritten between iterations of one encoder. Instead two
//! static uniform buffers (one per direction) are created up front and the
//! passes bind whichever they need.

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use crate::gpu::pipeline;
use crate::gpu::render_target::{HdrTarget, PingPongTargets};

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
struct BlurUniforms {
    horizontal: u32,
    _padding: [u32; 3],
}

/// Half-kernel Gaussian weights, mirrored in shader_post_blur.wgsl.
pub const GAUSSIAN_WEIGHTS: [f32; 5] = [
    0.2270270270,
    0.1945945946,
    0.1216216216,
    0.0540540541,
    0.0162162162,
];

// === Ping-pong schedule ===

/// Blur direction for a 0-based iteration. The chain starts horizontal.
pub fn is_horizontal(iteration: u32) -> bool {
    iteration % 2 == 0
}

/// Which ping-pong texture iteration `i` writes.
pub fn write_index(iteration: u32) -> usize {
    if is_horizontal(iteration) {
        1
    } else {
        0
    }
}

/// What iteration `i` reads: the bright pass first, then the previous
/// iteration's output.
pub fn read_index(iteration: u32) -> Option<usize> {
    if iteration == 0 {
        None
    } else {
        Some(write_index(iteration - 1))
    }
}

/// The texture holding the final blur after `iterations` passes.
pub fn final_index(iterations: u32) -> usize {
    write_index(iterations.saturating_sub(1))
}

/// GPU state for the blur chain.
pub struct BlurStage {
    pipeline: wgpu::RenderPipeline,
    horizontal_bind: wgpu::BindGroup,
    vertical_bind: wgpu::BindGroup,
    input_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    /// Reads the scene's bright-pass attachment (iteration 0).
    bright_bind: wgpu::BindGroup,
    /// Reads ping-pong texture 0 or 1.
    ping_binds: [wgpu::BindGroup; 2],
}

impl BlurStage {
    pub fn new(device: &wgpu::Device, hdr: &HdrTarget, ping_pong: &PingPongTargets) -> Self {
        let uniform_layout = pipeline::create_blur_uniform_layout(device);
        let input_layout = pipeline::create_blur_input_layout(device);

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("blur_pipeline_layout"),
            bind_group_layouts: &[&uniform_layout, &input_layout],
            push_constant_ranges: &[],
        });
        let pipeline = pipeline::create_blur_pipeline(device, &pipeline_layout);

        let direction_bind = |horizontal: u32, label: &str| {
            let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytemuck::bytes_of(&BlurUniforms {
                    horizontal,
                    _padding: [0; 3],
                }),
                usage: wgpu::BufferUsages::UNIFORM,
            });
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(label),
                layout: &uniform_layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: buffer.as_entire_binding(),
                }],
            })
        };
        let horizontal_bind = direction_bind(1, "blur_horizontal");
        let vertical_bind = direction_bind(0, "blur_vertical");

        // Clamped sampling keeps the kernel from wrapping at the edges
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let input_bind = |view: &wgpu::TextureView, label: &str| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(label),
                layout: &input_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::Sampler(&sampler),
                    },
                ],
            })
        };
        let bright_bind = input_bind(&hdr.bright_view, "blur_read_bright");
        let ping_binds = [
            input_bind(&ping_pong.views[0], "blur_read_ping0"),
            input_bind(&ping_pong.views[1], "blur_read_ping1"),
        ];

        Self {
            pipeline,
            horizontal_bind,
            vertical_bind,
            input_layout,
            sampler,
            bright_bind,
            ping_binds,
        }
    }

    /// Rebuild the texture bind groups after the targets were recreated.
    pub fn rebind(
        &mut self,
        device: &wgpu::Device,
        hdr: &HdrTarget,
        ping_pong: &PingPongTargets,
    ) {
        let input_bind = |view: &wgpu::TextureView, label: &str| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(label),
                layout: &self.input_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::Sampler(&self.sampler),
                    },
                ],
            })
        };
        self.bright_bind = input_bind(&hdr.bright_view, "blur_read_bright");
        self.ping_binds = [
            input_bind(&ping_pong.views[0], "blur_read_ping0"),
            input_bind(&ping_pong.views[1], "blur_read_ping1"),
        ];
    }

    /// Record the full blur chain. Returns the index of the ping-pong
    /// texture holding the result.
    pub fn run(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        ping_pong: &PingPongTargets,
        iterations: u32,
    ) -> usize {
        for i in 0..iterations {
            let target = &ping_pong.views[write_index(i)];
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("blur_pass"),
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
            if is_horizontal(i) {
                pass.set_bind_group(0, &self.horizontal_bind, &[]);
            } else {
                pass.set_bind_group(0, &self.vertical_bind, &[]);
            }
            match read_index(i) {
                None => pass.set_bind_group(1, &self.bright_bind, &[]),
                Some(idx) => pass.set_bind_group(1, &self.ping_binds[idx], &[]),
            }
            pass.draw(0..3, 0..1);
        }

        final_index(iterations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_iteration_is_horizontal_from_bright() {
        assert!(is_horizontal(0));
        assert_eq!(read_index(0), None);
        assert_eq!(write_index(0), 1);
    }

    #[test]
    fn test_each_iteration_reads_previous_write() {
        for i in 1..12 {
            assert_eq!(read_index(i), Some(write_index(i - 1)));
            // Never read and write the same texture
            assert_ne!(read_index(i), Some(write_index(i)));
        }
    }

    #[test]
    fn test_directions_alternate() {
        for i in 0..12 {
            assert_eq!(is_horizontal(i), i % 2 == 0);
        }
    }

    #[test]
    fn test_final_index_parity() {
        // Odd counts end on the horizontal target, even counts on the other
        assert_eq!(final_index(1), 1);
        assert_eq!(final_index(2), 0);
        assert_eq!(final_index(3), 1);
        assert_eq!(final_index(4), 0);
        assert_eq!(final_index(10), 0);
    }

    #[test]
    fn test_final_index_matches_last_write() {
        for n in 1..12 {
            assert_eq!(final_index(n), write_index(n - 1));
        }
    }

    #[test]
    fn test_gaussian_kernel_normalized() {
        // Center tap plus both mirrored halves sums to one
        let sum: f32 = GAUSSIAN_WEIGHTS[0]
            + 2.0 * GAUSSIAN_WEIGHTS[1..].iter().sum::<f32>();
        assert!((sum - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_gaussian_kernel_decreasing() {
        for pair in GAUSSIAN_WEIGHTS.windows(2) {
            assert!(pair[0] > pair[1]);
        }
    }

    #[test]
    fn test_blur_uniforms_size() {
        assert_eq!(std::mem::size_of::<BlurUniforms>(), 16);
    }

    /// One 1-D blur pass over a 2D grid, edges clamped like the sampler.
    fn reference_blur_pass(field: &[Vec<f32>], horizontal: bool) -> Vec<Vec<f32>> {
        let h = field.len() as isize;
        let w = field[0].len() as isize;
        let sample = |x: isize, y: isize| {
            field[y.clamp(0, h - 1) as usize][x.clamp(0, w - 1) as usize]
        };
        let mut out = vec![vec![0.0; w as usize]; h as usize];
        for y in 0..h {
            for x in 0..w {
                let mut acc = GAUSSIAN_WEIGHTS[0] * sample(x, y);
                for (k, weight) in GAUSSIAN_WEIGHTS.iter().enumerate().skip(1) {
                    let k = k as isize;
                    acc += weight
                        * if horizontal {
                            sample(x - k, y) + sample(x + k, y)
                        } else {
                            sample(x, y - k) + sample(x, y + k)
                        };
                }
                out[y as usize][x as usize] = acc;
            }
        }
        out
    }

    #[test]
    fn test_uniform_field_survives_blur_chain() {
        // A constant field must pass through the full separable chain
        // unchanged, including the clamped edge taps.
        const LEVEL: f32 = 0.75;
        let mut field = vec![vec![LEVEL; 16]; 12];
        for i in 0..10 {
            field = reference_blur_pass(&field, is_horizontal(i));
        }
        for row in &field {
            for &texel in row {
                assert!((texel - LEVEL).abs() < 1e-4);
            }
        }
    }
}
