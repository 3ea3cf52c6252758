//! Command line entry points.
//!
//! `view` opens the interactive window. `render` runs headless and writes
//! numbered PNG frames, useful for smoke-testing the pipeline on machines
//! without a display.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::app;
use crate::camera::Camera;
use crate::gpu::renderer::Renderer;
use crate::settings::RenderSettings;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory holding models, textures and the skybox
    #[arg(long, default_value = "resources")]
    assets: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the interactive viewer
    View,

    /// Render frames to disk without a window
    Render {
        /// Output directory for frames
        #[arg(long)]
        out: PathBuf,

        /// Frames per second
        #[arg(long, default_value_t = 60.0)]
        fps: f32,

        /// Duration in seconds
        #[arg(long, default_value_t = 5.0)]
        duration: f32,

        /// Output width
        #[arg(long, default_value_t = 1280)]
        width: u32,

        /// Output height
        #[arg(long, default_value_t = 720)]
        height: u32,

        /// Enable the bloom pass
        #[arg(long)]
        bloom: bool,

        /// Tone-map exposure
        #[arg(long, default_value_t = 1.0)]
        exposure: f32,
    },
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::View => app::run(cli.assets),
        Commands::Render {
            out,
            fps,
            duration,
            width,
            height,
            bloom,
            exposure,
        } => {
            let settings = RenderSettings {
                bloom_enabled: bloom,
                exposure,
                ..Default::default()
            };
            pollster::block_on(render_offline(
                cli.assets, out, fps, duration, width, height, settings,
            ))
        }
    }
}

async fn render_offline(
    assets: PathBuf,
    out_dir: PathBuf,
    fps: f32,
    duration: f32,
    width: u32,
    height: u32,
    settings: RenderSettings,
) -> Result<()> {
    let total_frames = (duration * fps).ceil() as usize;
    let dt = 1.0 / fps;

    std::fs::create_dir_all(&out_dir)?;

    let instance = wgpu::Instance::new(wgpu::InstanceDescriptor::default());
    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        })
        .await
        .ok_or_else(|| anyhow::anyhow!("no adapter found"))?;

    let (device, queue) = adapter
        .request_device(&wgpu::DeviceDescriptor::default(), None)
        .await?;

    let texture_desc = wgpu::TextureDescriptor {
        label: Some("offline_target"),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8UnormSrgb,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    };
    let texture = device.create_texture(&texture_desc);
    let texture_view = texture.create_view(&wgpu::TextureViewDescriptor::default());

    // Readback rows are padded to the 256-byte copy alignment
    let unpadded_bytes_per_row = 4 * width;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    let padded_bytes_per_row = unpadded_bytes_per_row.div_ceil(align) * align;

    let output_buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("readback_buffer"),
        size: (padded_bytes_per_row * height) as wgpu::BufferAddress,
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    let mut renderer = Renderer::new(device, queue, texture_desc.format, width, height, &assets)?;
    let camera = Camera::default();

    log::info!("rendering {} frames to {}", total_frames, out_dir.display());

    for frame_idx in 0..total_frames {
        let time = frame_idx as f32 * dt;
        renderer.render(&texture_view, &camera, &settings, time);

        let mut encoder = renderer
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });
        encoder.copy_texture_to_buffer(
            wgpu::ImageCopyTexture {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::ImageCopyBuffer {
                buffer: &output_buffer,
                layout: wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_bytes_per_row),
                    rows_per_image: Some(height),
                },
            },
            texture_desc.size,
        );
        renderer.queue().submit(Some(encoder.finish()));

        let buffer_slice = output_buffer.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |v| {
            let _ = tx.send(v);
        });
        renderer.device().poll(wgpu::Maintain::Wait);
        rx.recv()??;

        let data = buffer_slice.get_mapped_range();
        let mut unpadded = Vec::with_capacity((width * height * 4) as usize);
        for row in 0..height {
            let start = (row * padded_bytes_per_row) as usize;
            unpadded.extend_from_slice(&data[start..start + unpadded_bytes_per_row as usize]);
        }
        drop(data);
        output_buffer.unmap();

        let frame_path = out_dir.join(format!("frame_{:05}.png", frame_idx));
        image::save_buffer(
            &frame_path,
            &unpadded,
            width,
            height,
            image::ColorType::Rgba8,
        )?;
    }

    log::info!("done");
    Ok(())
}
