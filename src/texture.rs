//! Image file loading and GPU texture upload.
//!
//! Color textures (diffuse maps, foliage, skybox faces) are uploaded as
//! sRGB; data textures (normal and height maps) stay linear. Everything is
//! converted to RGBA8 on the CPU so one upload path covers all formats.

use std::path::Path;

use anyhow::{bail, Context, Result};
use image::GenericImageView;

/// A GPU texture together with its view and sampler.
pub struct Texture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
}

impl Texture {
    /// Load a 2D texture from an image file.
    pub fn from_path(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        path: &Path,
        srgb: bool,
    ) -> Result<Self> {
        let img = image::open(path)
            .with_context(|| format!("failed to load texture {}", path.display()))?;
        let label = path.file_name().map(|n| n.to_string_lossy().into_owned());
        Ok(Self::from_image(device, queue, &img, srgb, label.as_deref()))
    }

    /// Upload a decoded image as a 2D texture.
    pub fn from_image(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        img: &image::DynamicImage,
        srgb: bool,
        label: Option<&str>,
    ) -> Self {
        let (width, height) = img.dimensions();
        let rgba = img.to_rgba8();
        Self::from_rgba8(device, queue, &rgba, width, height, srgb, label)
    }

    /// Upload raw RGBA8 pixels as a 2D texture.
    pub fn from_rgba8(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        pixels: &[u8],
        width: u32,
        height: u32,
        srgb: bool,
        label: Option<&str>,
    ) -> Self {
        let format = if srgb {
            wgpu::TextureFormat::Rgba8UnormSrgb
        } else {
            wgpu::TextureFormat::Rgba8Unorm
        };
        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label,
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            pixels,
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(4 * width),
                rows_per_image: Some(height),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        Self {
            texture,
            view,
            sampler,
        }
    }

    /// A 1x1 opaque white texture, bound where a model has no diffuse map.
    pub fn white(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        Self::from_rgba8(device, queue, &[255; 4], 1, 1, true, Some("white"))
    }

    /// Load a cubemap from six face images.
    ///
    /// Face order is +x, -x, +y, -y, +z, -z (right, left, up, down, back,
    /// front for this scene's skybox). All faces must share one size.
    pub fn cubemap_from_paths(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        faces: &[impl AsRef<Path>; 6],
    ) -> Result<Self> {
        let mut pixels: Vec<Vec<u8>> = Vec::with_capacity(6);
        let mut dims: Option<(u32, u32)> = None;

        for face in faces {
            let path = face.as_ref();
            let img = image::open(path)
                .with_context(|| format!("failed to load cubemap face {}", path.display()))?;
            let (w, h) = img.dimensions();
            match dims {
                None => dims = Some((w, h)),
                Some(expected) if expected != (w, h) => {
                    bail!(
                        "cubemap face {} is {}x{}, expected {}x{}",
                        path.display(),
                        w,
                        h,
                        expected.0,
                        expected.1
                    );
                }
                Some(_) => {}
            }
            pixels.push(img.to_rgba8().into_raw());
        }

        let (width, height) = dims.context("cubemap has no faces")?;
        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 6,
        };

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("skybox_cubemap"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        for (layer, data) in pixels.iter().enumerate() {
            queue.write_texture(
                wgpu::ImageCopyTexture {
                    texture: &texture,
                    mip_level: 0,
                    origin: wgpu::Origin3d {
                        x: 0,
                        y: 0,
                        z: layer as u32,
                    },
                    aspect: wgpu::TextureAspect::All,
                },
                data,
                wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(4 * width),
                    rows_per_image: Some(height),
                },
                wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
            );
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            dimension: Some(wgpu::TextureViewDimension::Cube),
            ..Default::default()
        });
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        Ok(Self {
            texture,
            view,
            sampler,
        })
    }
}
