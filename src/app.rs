//! Windowed interactive viewer.
//!
//! Owns the winit event loop, the surface and the frame clock. Input events
//! are folded into `InputState` and applied once per redraw; the renderer
//! never sees winit types.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use winit::dpi::LogicalSize;
use winit::event::{DeviceEvent, Event, KeyEvent, MouseScrollDelta, WindowEvent};
use winit::event_loop::EventLoop;
use winit::keyboard::PhysicalKey;
use winit::window::{CursorGrabMode, Window, WindowBuilder};

use crate::camera::Camera;
use crate::gpu::renderer::Renderer;
use crate::input::InputState;
use crate::settings::RenderSettings;

const DEFAULT_WIDTH: u32 = 1280;
const DEFAULT_HEIGHT: u32 = 720;

/// Prefer a non-sRGB surface format so the composite shader's own gamma
/// curve is the only one applied.
fn pick_surface_format(caps: &wgpu::SurfaceCapabilities) -> wgpu::TextureFormat {
    caps.formats
        .iter()
        .copied()
        .find(|f| !f.is_srgb())
        .unwrap_or(caps.formats[0])
}

fn grab_cursor(window: &Window, grab: bool) {
    let result = if grab {
        window
            .set_cursor_grab(CursorGrabMode::Locked)
            .or_else(|_| window.set_cursor_grab(CursorGrabMode::Confined))
    } else {
        window.set_cursor_grab(CursorGrabMode::None)
    };
    if let Err(e) = result {
        log::warn!("cursor grab change failed: {}", e);
    }
    window.set_cursor_visible(!grab);
}

/// Open a window and run the interactive render loop until quit.
pub fn run(assets: PathBuf) -> Result<()> {
    let event_loop = EventLoop::new().context("failed to create event loop")?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title("ufo-village")
            .with_inner_size(LogicalSize::new(DEFAULT_WIDTH, DEFAULT_HEIGHT))
            .build(&event_loop)
            .context("failed to create window")?,
    );

    let instance = wgpu::Instance::new(wgpu::InstanceDescriptor::default());
    let surface = instance
        .create_surface(window.clone())
        .context("failed to create surface")?;

    let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
        power_preference: wgpu::PowerPreference::HighPerformance,
        compatible_surface: Some(&surface),
        force_fallback_adapter: false,
    }))
    .ok_or_else(|| anyhow!("no compatible GPU adapter found"))?;
    log::info!("using adapter: {}", adapter.get_info().name);

    let (device, queue) = pollster::block_on(
        adapter.request_device(&wgpu::DeviceDescriptor::default(), None),
    )
    .context("failed to create device")?;

    let caps = surface.get_capabilities(&adapter);
    let format = pick_surface_format(&caps);
    let size = window.inner_size();
    let mut config = wgpu::SurfaceConfiguration {
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        format,
        width: size.width.max(1),
        height: size.height.max(1),
        present_mode: wgpu::PresentMode::AutoVsync,
        alpha_mode: caps.alpha_modes[0],
        view_formats: vec![],
        desired_maximum_frame_latency: 2,
    };
    surface.configure(&device, &config);

    let mut renderer = Renderer::new(device, queue, format, config.width, config.height, &assets)?;

    let mut camera = Camera::default();
    let mut settings = RenderSettings::default();
    let mut input = InputState::new();

    let mut cursor_grabbed = true;
    grab_cursor(&window, true);

    let start = Instant::now();
    let mut last_frame = Instant::now();
    let mut minimized = false;

    event_loop
        .run(move |event, elwt| match event {
            Event::DeviceEvent {
                event: DeviceEvent::MouseMotion { delta: (dx, dy) },
                ..
            } => {
                if cursor_grabbed {
                    input.handle_mouse_motion(dx, dy);
                }
            }
            Event::WindowEvent { event, .. } => match event {
                WindowEvent::CloseRequested => elwt.exit(),
                WindowEvent::KeyboardInput {
                    event:
                        KeyEvent {
                            physical_key: PhysicalKey::Code(code),
                            state,
                            ..
                        },
                    ..
                } => {
                    input.handle_key(code, state, &mut settings);
                }
                WindowEvent::MouseWheel { delta, .. } => {
                    let dy = match delta {
                        MouseScrollDelta::LineDelta(_, y) => y,
                        MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 20.0,
                    };
                    input.handle_scroll(dy);
                }
                WindowEvent::Resized(new_size) => {
                    minimized = new_size.width == 0 || new_size.height == 0;
                    if !minimized {
                        config.width = new_size.width;
                        config.height = new_size.height;
                        surface.configure(renderer.device(), &config);
                        if let Err(e) = renderer.resize(config.width, config.height) {
                            log::error!("resize failed: {}", e);
                        }
                    }
                }
                WindowEvent::RedrawRequested => {
                    let now = Instant::now();
                    let dt = (now - last_frame).as_secs_f32();
                    last_frame = now;

                    if input.cursor_toggled {
                        cursor_grabbed = !cursor_grabbed;
                        grab_cursor(&window, cursor_grabbed);
                    }
                    input.apply(dt, &mut camera, &mut settings);
                    if input.quit_requested {
                        elwt.exit();
                        return;
                    }
                    if minimized {
                        return;
                    }

                    let frame = match surface.get_current_texture() {
                        Ok(frame) => frame,
                        Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                            surface.configure(renderer.device(), &config);
                            return;
                        }
                        Err(wgpu::SurfaceError::OutOfMemory) => {
                            log::error!("surface out of memory");
                            elwt.exit();
                            return;
                        }
                        Err(e) => {
                            log::warn!("dropped frame: {}", e);
                            return;
                        }
                    };
                    let view = frame
                        .texture
                        .create_view(&wgpu::TextureViewDescriptor::default());

                    renderer.render(&view, &camera, &settings, start.elapsed().as_secs_f32());
                    window.pre_present_notify();
                    frame.present();
                }
                _ => {}
            },
            Event::AboutToWait => {
                window.request_redraw();
            }
            _ => {}
        })
        .context("event loop error")?;

    Ok(())
}
