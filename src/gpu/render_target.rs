//! Offscreen render targets for the HDR pipeline.
//!
//! The scene pass writes two floating point color attachments (lit color
//! and the bright-pass threshold output) sharing one depth buffer. The
//! blur stage bounces between a pair of same-size HDR textures. All of
//! these are recreated on resize.

use std::fmt;

/// Format for all HDR color attachments.
pub const HDR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;

/// Depth buffer format for the scene pass.
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Target creation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetError {
    /// Requested dimensions include a zero extent.
    ZeroSize { width: u32, height: u32 },
}

impl fmt::Display for TargetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetError::ZeroSize { width, height } => {
                write!(f, "render target size {}x{} has a zero extent", width, height)
            }
        }
    }
}

impl std::error::Error for TargetError {}

fn create_color_texture(
    device: &wgpu::Device,
    label: &str,
    width: u32,
    height: u32,
) -> wgpu::Texture {
    device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: HDR_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        view_formats: &[],
    })
}

/// Scene-pass output: lit color, bright-pass color and depth.
pub struct HdrTarget {
    pub scene_view: wgpu::TextureView,
    pub bright_view: wgpu::TextureView,
    pub depth_view: wgpu::TextureView,
    pub width: u32,
    pub height: u32,
}

impl HdrTarget {
    pub fn new(device: &wgpu::Device, width: u32, height: u32) -> Result<Self, TargetError> {
        if width == 0 || height == 0 {
            return Err(TargetError::ZeroSize { width, height });
        }

        let scene = create_color_texture(device, "hdr_scene", width, height);
        let bright = create_color_texture(device, "hdr_bright", width, height);
        let depth = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("hdr_depth"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });

        Ok(Self {
            scene_view: scene.create_view(&wgpu::TextureViewDescriptor::default()),
            bright_view: bright.create_view(&wgpu::TextureViewDescriptor::default()),
            depth_view: depth.create_view(&wgpu::TextureViewDescriptor::default()),
            width,
            height,
        })
    }
}

/// The two full-resolution textures the separable blur alternates between.
pub struct PingPongTargets {
    pub views: [wgpu::TextureView; 2],
    pub width: u32,
    pub height: u32,
}

impl PingPongTargets {
    pub fn new(device: &wgpu::Device, width: u32, height: u32) -> Result<Self, TargetError> {
        if width == 0 || height == 0 {
            return Err(TargetError::ZeroSize { width, height });
        }

        let a = create_color_texture(device, "blur_ping", width, height);
        let b = create_color_texture(device, "blur_pong", width, height);

        Ok(Self {
            views: [
                a.create_view(&wgpu::TextureViewDescriptor::default()),
                b.create_view(&wgpu::TextureViewDescriptor::default()),
            ],
            width,
            height,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_size_error_display() {
        let err = TargetError::ZeroSize {
            width: 0,
            height: 600,
        };
        assert_eq!(
            err.to_string(),
            "render target size 0x600 has a zero extent"
        );
    }

    #[test]
    fn test_zero_size_detected_on_either_axis() {
        for (w, h) in [(0, 0), (0, 1), (1, 0)] {
            let err = TargetError::ZeroSize {
                width: w,
                height: h,
            };
            // Variant carries the offending dimensions
            let TargetError::ZeroSize { width, height } = err;
            assert_eq!((width, height), (w, h));
        }
    }
}
