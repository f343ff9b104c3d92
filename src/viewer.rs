//! Interactive native window: winit event loop driving the scene and the
//! wgpu renderer.

use std::rc::Rc;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use winit::dpi::{LogicalSize, PhysicalPosition};
use winit::event::{ElementState, Event, MouseButton, WindowEvent};
use winit::event_loop::EventLoop;
use winit::window::{CursorIcon, WindowBuilder};

use crate::audio::LogAudioOutput;
use crate::camera::pixel_to_ndc;
use crate::config::SceneConfig;
use crate::frame_loop::{Clock, SystemClock};
use crate::gpu::renderer::Renderer;
use crate::pointer::{Cursor, CursorCell};
use crate::random::SmallRngSource;
use crate::scene::{SceneHost, SceneRoot, SceneStatus};

fn cursor_icon(cursor: Cursor) -> CursorIcon {
    match cursor {
        Cursor::Default => CursorIcon::Default,
        Cursor::Pointer => CursorIcon::Pointer,
    }
}

pub fn run(config: SceneConfig) -> Result<()> {
    let event_loop = EventLoop::new()?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title("hero-shapes")
            .with_inner_size(LogicalSize::new(1280.0, 720.0))
            .build(&event_loop)?,
    );

    let clock = SystemClock;
    let cursor = CursorCell::new();
    let msaa = config.surface.msaa_samples;
    log::info!(
        "Device pixel ratio {:.2} (clamped {:.2})",
        window.scale_factor(),
        config.surface.device_pixel_ratio(window.scale_factor())
    );

    let host = SceneHost {
        rng: Box::new(SmallRngSource::from_entropy()),
        audio: Rc::new(LogAudioOutput),
        pointer: Rc::new(cursor.clone()),
    };
    let mut scene = SceneRoot::mount(config, host, clock.now_secs());
    if let SceneStatus::Failed(reason) = scene.status() {
        return Err(anyhow!("scene failed to load: {}", reason));
    }

    let instance = wgpu::Instance::new(wgpu::InstanceDescriptor::default());
    let surface = instance.create_surface(window.clone())?;
    let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
        power_preference: wgpu::PowerPreference::HighPerformance,
        compatible_surface: Some(&surface),
        force_fallback_adapter: false,
    }))
    .ok_or_else(|| anyhow!("No adapter found"))?;
    let (device, queue) =
        pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor::default(), None))?;

    let caps = surface.get_capabilities(&adapter);
    let format = caps
        .formats
        .iter()
        .copied()
        .find(|f| f.is_srgb())
        .or_else(|| caps.formats.first().copied())
        .context("surface reports no formats")?;
    let size = window.inner_size();
    let mut surface_config = wgpu::SurfaceConfiguration {
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        format,
        width: size.width.max(1),
        height: size.height.max(1),
        present_mode: wgpu::PresentMode::Fifo,
        alpha_mode: caps.alpha_modes.first().copied().unwrap_or(wgpu::CompositeAlphaMode::Auto),
        view_formats: vec![],
        desired_maximum_frame_latency: 2,
    };
    surface.configure(&device, &surface_config);

    let mut renderer = Renderer::new(device, queue, format, surface_config.width, surface_config.height, msaa);
    scene.set_aspect(renderer.aspect());

    let mut pointer = PhysicalPosition::new(0.0, 0.0);
    let mut shown_cursor = cursor.get();

    event_loop.run(move |event, elwt| match event {
        Event::WindowEvent { event, window_id } if window_id == window.id() => match event {
            WindowEvent::CloseRequested => {
                scene.unmount();
                elwt.exit();
            }
            WindowEvent::Resized(size) => {
                if size.width > 0 && size.height > 0 {
                    surface_config.width = size.width;
                    surface_config.height = size.height;
                    surface.configure(renderer.device(), &surface_config);
                    renderer.resize(size.width, size.height);
                    scene.set_aspect(renderer.aspect());
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                pointer = position;
                let (w, h) = renderer.size();
                scene.hover_at(pixel_to_ndc(position.x, position.y, w, h));
                if cursor.get() != shown_cursor {
                    shown_cursor = cursor.get();
                    window.set_cursor_icon(cursor_icon(shown_cursor));
                }
            }
            WindowEvent::CursorLeft { .. } => {
                scene.pointer_leave();
                if cursor.get() != shown_cursor {
                    shown_cursor = cursor.get();
                    window.set_cursor_icon(cursor_icon(shown_cursor));
                }
            }
            WindowEvent::MouseInput {
                state: ElementState::Pressed,
                button: MouseButton::Left,
                ..
            } => {
                let (w, h) = renderer.size();
                let ndc = pixel_to_ndc(pointer.x, pointer.y, w, h);
                if let Some(outcome) = scene.click_at(ndc, clock.now_secs()) {
                    log::info!("Clicked {} -> {}", outcome.id, outcome.material);
                }
            }
            WindowEvent::RedrawRequested => {
                if !scene.frame(clock.now_secs()) {
                    return;
                }
                match surface.get_current_texture() {
                    Ok(frame) => {
                        let view = frame.texture.create_view(&wgpu::TextureViewDescriptor::default());
                        renderer.render(&view, &scene.snapshot());
                        frame.present();
                    }
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        surface.configure(renderer.device(), &surface_config);
                    }
                    Err(e) => log::warn!("Dropped frame: {}", e),
                }
            }
            _ => {}
        },
        Event::AboutToWait => window.request_redraw(),
        _ => {}
    })?;
    Ok(())
}
