//! Frame rendering.
//!
//! One `Renderer` owns the device, queue, pipelines, scene geometry and the
//! HDR post-process chain. A frame runs three stages: the scene pass into
//! the two-attachment HDR target, the ping-pong blur over the bright pass,
//! and the composite onto the output view.
//!
//! Per-instance model matrices live in one large uniform buffer addressed
//! with dynamic offsets. All slots are written before the encoder is
//! submitted; queue.write_buffer is immediate rather than recorded, so a
//! slot must never be rewritten between draws of one frame.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use wgpu::util::DeviceExt;

use crate::camera::Camera;
use crate::gpu::bloom::{final_index, BlurStage};
use crate::gpu::composite::{CompositePass, CompositeUniforms, OUTPUT_GAMMA};
use crate::gpu::mesh::{
    create_floor_geometry, create_foliage_geometry, create_skybox_positions, GpuMesh,
};
use crate::gpu::pipeline;
use crate::gpu::render_target::{HdrTarget, PingPongTargets, TargetError};
use crate::lighting::LightingUniforms;
use crate::mesh_asset::MeshAsset;
use crate::scene::{self, ModelKind, MODEL_KINDS};
use crate::settings::RenderSettings;
use crate::texture::Texture;

/// Dynamic uniform slot stride required by WebGPU limits.
const UNIFORM_ALIGNMENT: usize = 256;

/// Model instances plus foliage cards, with headroom.
const MAX_INSTANCES: usize = 192;

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
struct CameraUniforms {
    view_proj: [[f32; 4]; 4],
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
struct ModelUniforms {
    model: [[f32; 4]; 4],
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
struct FloorUniforms {
    model: [[f32; 4]; 4],
    height_scale: f32,
    shininess: f32,
    _padding: [f32; 2],
}

/// Specular exponent for the parallax-mapped ground.
const FLOOR_SHININESS: f32 = 1000.0;

struct ModelEntry {
    mesh: GpuMesh,
    material_bind: wgpu::BindGroup,
}

pub struct Renderer {
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface_format: wgpu::TextureFormat,
    gamma: f32,

    forward_pipeline: wgpu::RenderPipeline,
    floor_pipeline: wgpu::RenderPipeline,
    skybox_pipeline: wgpu::RenderPipeline,
    foliage_pipeline: wgpu::RenderPipeline,

    camera_buffer: wgpu::Buffer,
    lighting_buffer: wgpu::Buffer,
    frame_bind: wgpu::BindGroup,

    model_buffer: wgpu::Buffer,
    model_bind: wgpu::BindGroup,

    floor_buffer: wgpu::Buffer,
    floor_uniform_bind: wgpu::BindGroup,

    skybox_buffer: wgpu::Buffer,
    skybox_uniform_bind: wgpu::BindGroup,
    skybox_texture_bind: wgpu::BindGroup,
    skybox_vertex_buffer: wgpu::Buffer,

    models: HashMap<ModelKind, ModelEntry>,
    floor_mesh: GpuMesh,
    floor_material_bind: wgpu::BindGroup,
    foliage_mesh: GpuMesh,
    foliage_material_bind: wgpu::BindGroup,

    hdr: HdrTarget,
    ping_pong: PingPongTargets,
    blur: BlurStage,
    composite: CompositePass,
}

fn model_obj_path(assets: &Path, kind: ModelKind) -> PathBuf {
    let rel = match kind {
        ModelKind::Ufo => "objects/ufo/ufo.obj",
        ModelKind::Stall => "objects/stall/stall.obj",
        ModelKind::Hut => "objects/hut/woodshed.obj",
        ModelKind::Well => "objects/well/well.obj",
        ModelKind::Fence => "objects/fence/fence.obj",
        ModelKind::Sheep => "objects/sheep/sheep.obj",
        ModelKind::Human => "objects/human/human.obj",
    };
    assets.join(rel)
}

impl Renderer {
    /// Build pipelines, load every asset and create the render targets.
    ///
    /// Any missing or unreadable asset fails construction; the scene is
    /// static, so there is nothing sensible to render without them.
    pub fn new(
        device: wgpu::Device,
        queue: wgpu::Queue,
        surface_format: wgpu::TextureFormat,
        width: u32,
        height: u32,
        assets: &Path,
    ) -> Result<Self> {
        let gamma = if surface_format.is_srgb() {
            1.0
        } else {
            OUTPUT_GAMMA
        };

        // === Layouts and pipelines ===

        let frame_layout = pipeline::create_frame_layout(&device);
        let model_layout = pipeline::create_model_layout(&device);
        let floor_layout = pipeline::create_floor_layout(&device);
        let material_layout = pipeline::create_material_layout(&device);
        let floor_material_layout = pipeline::create_floor_material_layout(&device);
        let skybox_uniform_layout = pipeline::create_skybox_uniform_layout(&device);
        let skybox_texture_layout = pipeline::create_skybox_texture_layout(&device);

        let forward_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("forward_pipeline_layout"),
                bind_group_layouts: &[&frame_layout, &model_layout, &material_layout],
                push_constant_ranges: &[],
            });
        let forward_pipeline = pipeline::create_forward_pipeline(&device, &forward_pipeline_layout);
        let foliage_pipeline = pipeline::create_foliage_pipeline(&device, &forward_pipeline_layout);

        let floor_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("floor_pipeline_layout"),
                bind_group_layouts: &[&frame_layout, &floor_layout, &floor_material_layout],
                push_constant_ranges: &[],
            });
        let floor_pipeline = pipeline::create_floor_pipeline(&device, &floor_pipeline_layout);

        let skybox_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("skybox_pipeline_layout"),
                bind_group_layouts: &[&skybox_uniform_layout, &skybox_texture_layout],
                push_constant_ranges: &[],
            });
        let skybox_pipeline = pipeline::create_skybox_pipeline(&device, &skybox_pipeline_layout);

        // === Frame uniforms ===

        let camera_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("camera_uniforms"),
            size: std::mem::size_of::<CameraUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let lighting_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("lighting_uniforms"),
            size: std::mem::size_of::<LightingUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let frame_bind = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("frame_bind"),
            layout: &frame_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: camera_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: lighting_buffer.as_entire_binding(),
                },
            ],
        });

        let model_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("model_uniforms"),
            size: (UNIFORM_ALIGNMENT * MAX_INSTANCES) as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let model_bind = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("model_bind"),
            layout: &model_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &model_buffer,
                    offset: 0,
                    size: wgpu::BufferSize::new(std::mem::size_of::<ModelUniforms>() as u64),
                }),
            }],
        });

        let floor_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("floor_uniforms"),
            size: std::mem::size_of::<FloorUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let floor_uniform_bind = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("floor_uniform_bind"),
            layout: &floor_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: floor_buffer.as_entire_binding(),
            }],
        });

        let skybox_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("skybox_uniforms"),
            size: std::mem::size_of::<CameraUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let skybox_uniform_bind = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("skybox_uniform_bind"),
            layout: &skybox_uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: skybox_buffer.as_entire_binding(),
            }],
        });

        // === Assets ===

        let material_bind = |texture: &Texture, label: &str| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(label),
                layout: &material_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(&texture.view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::Sampler(&texture.sampler),
                    },
                ],
            })
        };

        let mut models = HashMap::new();
        for kind in MODEL_KINDS {
            let path = model_obj_path(assets, kind);
            let asset = MeshAsset::load(&path)?;
            log::debug!(
                "loaded {:?}: {} triangles from {}",
                kind,
                asset.triangle_count(),
                path.display()
            );

            let texture = match &asset.diffuse_texture {
                Some(tex_path) => Texture::from_path(&device, &queue, tex_path, true)?,
                None => {
                    log::warn!("{:?} has no diffuse texture, using white", kind);
                    Texture::white(&device, &queue)
                }
            };

            let mesh = GpuMesh::upload(&device, &asset.name, &asset.vertices, &asset.indices);
            models.insert(
                kind,
                ModelEntry {
                    mesh,
                    material_bind: material_bind(&texture, &asset.name),
                },
            );
        }

        let (floor_vertices, floor_indices) = create_floor_geometry();
        let floor_mesh = GpuMesh::upload(&device, "floor", &floor_vertices, &floor_indices);
        let floor_diffuse =
            Texture::from_path(&device, &queue, &assets.join("textures/grass_diffuse.jpg"), true)?;
        let floor_normal =
            Texture::from_path(&device, &queue, &assets.join("textures/grass_normal.jpg"), false)?;
        let floor_height =
            Texture::from_path(&device, &queue, &assets.join("textures/grass_height.jpg"), false)?;
        let floor_material_bind = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("floor_material_bind"),
            layout: &floor_material_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&floor_diffuse.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&floor_normal.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&floor_height.view),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::Sampler(&floor_diffuse.sampler),
                },
            ],
        });

        let (foliage_vertices, foliage_indices) = create_foliage_geometry();
        let foliage_mesh = GpuMesh::upload(&device, "foliage", &foliage_vertices, &foliage_indices);
        let foliage_texture =
            Texture::from_path(&device, &queue, &assets.join("textures/tree.png"), true)?;
        let foliage_material_bind = material_bind(&foliage_texture, "foliage");

        let sky_dir = assets.join("textures/alps");
        let skybox_texture = Texture::cubemap_from_paths(
            &device,
            &queue,
            &[
                sky_dir.join("right.tga"),
                sky_dir.join("left.tga"),
                sky_dir.join("up.tga"),
                sky_dir.join("down.tga"),
                sky_dir.join("back.tga"),
                sky_dir.join("front.tga"),
            ],
        )?;
        let skybox_texture_bind = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("skybox_texture_bind"),
            layout: &skybox_texture_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&skybox_texture.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&skybox_texture.sampler),
                },
            ],
        });
        let skybox_vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("skybox_vertices"),
            contents: bytemuck::cast_slice(&create_skybox_positions()),
            usage: wgpu::BufferUsages::VERTEX,
        });

        // === Post-process chain ===

        let hdr = HdrTarget::new(&device, width, height)
            .context("failed to create HDR target")?;
        let ping_pong = PingPongTargets::new(&device, width, height)
            .context("failed to create blur targets")?;
        let blur = BlurStage::new(&device, &hdr, &ping_pong);
        let composite = CompositePass::new(&device, surface_format, &hdr, &ping_pong);

        Ok(Self {
            device,
            queue,
            surface_format,
            gamma,
            forward_pipeline,
            floor_pipeline,
            skybox_pipeline,
            foliage_pipeline,
            camera_buffer,
            lighting_buffer,
            frame_bind,
            model_buffer,
            model_bind,
            floor_buffer,
            floor_uniform_bind,
            skybox_buffer,
            skybox_uniform_bind,
            skybox_texture_bind,
            skybox_vertex_buffer,
            models,
            floor_mesh,
            floor_material_bind,
            foliage_mesh,
            foliage_material_bind,
            hdr,
            ping_pong,
            blur,
            composite,
        })
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.surface_format
    }

    /// Recreate the offscreen targets for a new output size.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), TargetError> {
        self.hdr = HdrTarget::new(&self.device, width, height)?;
        self.ping_pong = PingPongTargets::new(&self.device, width, height)?;
        self.blur.rebind(&self.device, &self.hdr, &self.ping_pong);
        self.composite
            .rebind(&self.device, &self.hdr, &self.ping_pong);
        Ok(())
    }

    /// Render one frame into `view`.
    pub fn render(
        &mut self,
        view: &wgpu::TextureView,
        camera: &Camera,
        settings: &RenderSettings,
        time: f32,
    ) {
        let settings = settings.sanitize();
        let aspect = self.hdr.width as f32 / self.hdr.height as f32;
        let view_proj = camera.projection_matrix(aspect) * camera.view_matrix();
        let skybox_view_proj = camera.projection_matrix(aspect) * camera.skybox_view_matrix();

        let instances = scene::model_instances(&settings, time);
        let foliage = scene::foliage_transforms();

        let mut slots: Vec<Mat4> = Vec::with_capacity(instances.len() + foliage.len());
        slots.extend(instances.iter().map(|i| i.transform));
        slots.extend(foliage.iter().copied());
        if slots.len() > MAX_INSTANCES {
            log::warn!(
                "instance count {} exceeds capacity {}, truncating",
                slots.len(),
                MAX_INSTANCES
            );
            slots.truncate(MAX_INSTANCES);
        }

        // All uniform writes happen up front, before the passes that read
        // them are recorded.
        self.queue.write_buffer(
            &self.camera_buffer,
            0,
            bytemuck::bytes_of(&CameraUniforms {
                view_proj: view_proj.to_cols_array_2d(),
            }),
        );
        self.queue.write_buffer(
            &self.lighting_buffer,
            0,
            bytemuck::bytes_of(&LightingUniforms::new(
                camera.position,
                scene::ufo_position(time),
                settings.blinn_phong,
            )),
        );
        self.queue.write_buffer(
            &self.floor_buffer,
            0,
            bytemuck::bytes_of(&FloorUniforms {
                model: scene::floor_transform().to_cols_array_2d(),
                height_scale: settings.height_scale,
                shininess: FLOOR_SHININESS,
                _padding: [0.0; 2],
            }),
        );
        self.queue.write_buffer(
            &self.skybox_buffer,
            0,
            bytemuck::bytes_of(&CameraUniforms {
                view_proj: skybox_view_proj.to_cols_array_2d(),
            }),
        );
        for (slot, transform) in slots.iter().enumerate() {
            self.queue.write_buffer(
                &self.model_buffer,
                (slot * UNIFORM_ALIGNMENT) as u64,
                bytemuck::bytes_of(&ModelUniforms {
                    model: transform.to_cols_array_2d(),
                }),
            );
        }
        self.composite
            .write_uniforms(&self.queue, &CompositeUniforms::new(&settings, self.gamma));

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame_encoder"),
            });

        // === Scene pass ===
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("scene_pass"),
                color_attachments: &[
                    Some(wgpu::RenderPassColorAttachment {
                        view: &self.hdr.scene_view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                            store: wgpu::StoreOp::Store,
                        },
                    }),
                    Some(wgpu::RenderPassColorAttachment {
                        view: &self.hdr.bright_view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                            store: wgpu::StoreOp::Store,
                        },
                    }),
                ],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.hdr.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            // Opaque models
            pass.set_pipeline(&self.forward_pipeline);
            pass.set_bind_group(0, &self.frame_bind, &[]);
            for (slot, instance) in instances.iter().enumerate().take(MAX_INSTANCES) {
                let entry = &self.models[&instance.kind];
                let offset = (slot * UNIFORM_ALIGNMENT) as u32;
                pass.set_bind_group(1, &self.model_bind, &[offset]);
                pass.set_bind_group(2, &entry.material_bind, &[]);
                pass.set_vertex_buffer(0, entry.mesh.vertex_buffer.slice(..));
                pass.set_index_buffer(
                    entry.mesh.index_buffer.slice(..),
                    wgpu::IndexFormat::Uint32,
                );
                pass.draw_indexed(0..entry.mesh.index_count, 0, 0..1);
            }

            // Ground plane
            pass.set_pipeline(&self.floor_pipeline);
            pass.set_bind_group(1, &self.floor_uniform_bind, &[]);
            pass.set_bind_group(2, &self.floor_material_bind, &[]);
            pass.set_vertex_buffer(0, self.floor_mesh.vertex_buffer.slice(..));
            pass.set_index_buffer(
                self.floor_mesh.index_buffer.slice(..),
                wgpu::IndexFormat::Uint32,
            );
            pass.draw_indexed(0..self.floor_mesh.index_count, 0, 0..1);

            // Sky, after opaques so most fragments fail the depth test
            pass.set_pipeline(&self.skybox_pipeline);
            pass.set_bind_group(0, &self.skybox_uniform_bind, &[]);
            pass.set_bind_group(1, &self.skybox_texture_bind, &[]);
            pass.set_vertex_buffer(0, self.skybox_vertex_buffer.slice(..));
            pass.draw(0..36, 0..1);

            // Transparent foliage last
            pass.set_pipeline(&self.foliage_pipeline);
            pass.set_bind_group(0, &self.frame_bind, &[]);
            pass.set_bind_group(2, &self.foliage_material_bind, &[]);
            pass.set_vertex_buffer(0, self.foliage_mesh.vertex_buffer.slice(..));
            pass.set_index_buffer(
                self.foliage_mesh.index_buffer.slice(..),
                wgpu::IndexFormat::Uint32,
            );
            for slot in instances.len()..slots.len() {
                let offset = (slot * UNIFORM_ALIGNMENT) as u32;
                pass.set_bind_group(1, &self.model_bind, &[offset]);
                pass.draw_indexed(0..self.foliage_mesh.index_count, 0, 0..1);
            }
        }

        // === Blur and composite ===
        let blur_index = if settings.bloom_enabled {
            self.blur
                .run(&mut encoder, &self.ping_pong, settings.blur_iterations)
        } else {
            // Composite ignores the bloom input; any valid texture will do
            final_index(settings.blur_iterations)
        };
        self.composite.run(&mut encoder, view, blur_index);

        self.queue.submit(std::iter::once(encoder.finish()));
    }
}
