use std::cell::RefCell;
use std::rc::Rc;

use serde::Serialize;
use wasm_bindgen::prelude::*;
use web_sys::{HtmlAudioElement, HtmlCanvasElement};

use crate::audio::{AudioOutput, PlaybackError, SoundClip, SoundPool};
use crate::camera::pixel_to_ndc;
use crate::config::{LoadingGateSettings, SceneConfig};
use crate::frame_loop::{Clock, SystemClock};
use crate::gpu::renderer::Renderer;
use crate::hero::{EntranceTimeline, HeroContent};
use crate::lighting::ShadowBlob;
use crate::mesh_asset::AssetCache;
use crate::model::ModelRenderState;
use crate::pointer::{Cursor, PointerHint};
use crate::random::SmallRngSource;
use crate::scene::{SceneAssets, SceneHost, SceneRoot, SceneStatus};

/// Plays clips through a fresh `<audio>` element per click.
struct HtmlAudioOutput;

impl AudioOutput for HtmlAudioOutput {
    fn play(&self, clip: &SoundClip) -> Result<(), PlaybackError> {
        let audio = HtmlAudioElement::new_with_src(&clip.source)
            .map_err(|e| PlaybackError::Backend(format!("{:?}", e)))?;
        // Autoplay rejections arrive later through the promise and are ignored.
        audio
            .play()
            .map(|_| ())
            .map_err(|e| PlaybackError::Backend(format!("{:?}", e)))
    }
}

/// Sets the document body's CSS cursor.
struct BodyCursor;

impl PointerHint for BodyCursor {
    fn set_cursor(&self, cursor: Cursor) {
        let body = web_sys::window()
            .and_then(|w| w.document())
            .and_then(|d| d.body());
        if let Some(body) = body {
            if let Err(e) = body.style().set_property("cursor", cursor.css_name()) {
                log::warn!("Failed to set cursor: {:?}", e);
            }
        }
    }
}

#[derive(Serialize)]
struct SnapshotJson<'a> {
    ready: bool,
    models: &'a [ModelRenderState],
    shadows: &'a [ShadowBlob],
    particles: usize,
}

#[wasm_bindgen]
pub fn init_panic_hook() {
    console_error_panic_hook::set_once();
    let _ = console_log::init_with_level(log::Level::Info);
}

#[wasm_bindgen]
pub struct WasmHeroScene {
    inner: Rc<RefCell<HeroSceneContext>>,
}

struct HeroSceneContext {
    scene: SceneRoot,
    renderer: Renderer,
    surface: wgpu::Surface<'static>,
    config: wgpu::SurfaceConfiguration,
    clock: SystemClock,
}

impl HeroSceneContext {
    fn ndc(&self, x: f64, y: f64) -> glam::Vec2 {
        pixel_to_ndc(x, y, self.config.width, self.config.height)
    }
}

#[wasm_bindgen]
impl WasmHeroScene {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        panic!("Use create_hero_scene async constructor");
    }

    pub fn is_ready(&self) -> bool {
        self.inner.borrow().scene.is_ready()
    }

    /// Empty when ready, otherwise the load error.
    pub fn error(&self) -> String {
        match self.inner.borrow().scene.status() {
            SceneStatus::Ready => String::new(),
            SceneStatus::Failed(reason) => reason.clone(),
        }
    }

    /// Clamp a native device pixel ratio into the configured range.
    pub fn device_pixel_ratio(&self, native: f64) -> f64 {
        self.inner.borrow().scene.config().surface.device_pixel_ratio(native)
    }

    /// Call after changing the canvas backing size.
    pub fn resize(&self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        let mut inner = self.inner.borrow_mut();
        let ctx = &mut *inner;
        ctx.config.width = width;
        ctx.config.height = height;
        ctx.surface.configure(ctx.renderer.device(), &ctx.config);
        ctx.renderer.resize(width, height);
        let aspect = ctx.renderer.aspect();
        ctx.scene.set_aspect(aspect);
    }

    /// Advance and draw one frame. Returns false once unmounted or failed.
    pub fn frame(&self) -> bool {
        let mut inner = self.inner.borrow_mut();
        let ctx = &mut *inner;
        let now = ctx.clock.now_secs();
        if !ctx.scene.frame(now) {
            return false;
        }
        match ctx.surface.get_current_texture() {
            Ok(frame) => {
                let view = frame.texture.create_view(&wgpu::TextureViewDescriptor::default());
                ctx.renderer.render(&view, &ctx.scene.snapshot());
                frame.present();
            }
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                ctx.surface.configure(ctx.renderer.device(), &ctx.config);
            }
            Err(e) => log::warn!("Dropped frame: {}", e),
        }
        true
    }

    /// Pointer moved to canvas pixel `(x, y)`. Returns the hovered instance.
    pub fn pointer_move(&self, x: f64, y: f64) -> Option<u32> {
        let mut inner = self.inner.borrow_mut();
        let ndc = inner.ndc(x, y);
        inner.scene.hover_at(ndc).map(|id| id.0 as u32)
    }

    /// The pointer left the canvas.
    pub fn pointer_leave(&self) {
        self.inner.borrow_mut().scene.pointer_leave();
    }

    /// Click at canvas pixel `(x, y)`. Returns the outcome as JSON.
    pub fn click(&self, x: f64, y: f64) -> Option<String> {
        let mut inner = self.inner.borrow_mut();
        let ndc = inner.ndc(x, y);
        let now = inner.clock.now_secs();
        let outcome = inner.scene.click_at(ndc, now)?;
        serde_json::to_string(&outcome).ok()
    }

    /// Render state of every model, for debugging.
    pub fn snapshot_json(&self) -> String {
        let inner = self.inner.borrow();
        let snapshot = inner.scene.snapshot();
        let json = SnapshotJson {
            ready: inner.scene.is_ready(),
            models: &snapshot.models,
            shadows: &snapshot.shadows,
            particles: inner.scene.particles().map(|p| p.len()).unwrap_or(0),
        };
        serde_json::to_string(&json).unwrap_or_else(|e| format!("{{\"error\":\"{}\"}}", e))
    }

    pub fn unmount(&self) -> bool {
        self.inner.borrow_mut().scene.unmount()
    }
}

/// Mount the hero scene on `canvas`. The host fetches both OBJ files; sound
/// clips are played from the configured URLs.
#[wasm_bindgen]
pub async fn create_hero_scene(
    canvas: HtmlCanvasElement,
    config_json: Option<String>,
    primary_obj: String,
    secondary_obj: String,
) -> Result<WasmHeroScene, JsValue> {
    init_panic_hook();

    let scene_config = match config_json {
        Some(json) => SceneConfig::from_json_str(&json)
            .map_err(|e| JsValue::from_str(&format!("{:#}", e)))?,
        None => SceneConfig::default(),
    };

    let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
        backends: wgpu::Backends::all(),
        dx12_shader_compiler: Default::default(),
        flags: wgpu::InstanceFlags::default(),
        gles_minor_version: wgpu::Gles3MinorVersion::Automatic,
    });

    let target = wgpu::SurfaceTarget::Canvas(canvas.clone());
    let surface = instance.create_surface(target)
        .map_err(|e| JsValue::from_str(&format!("Failed to create surface: {}", e)))?;

    let adapter = instance.request_adapter(&wgpu::RequestAdapterOptions {
        power_preference: wgpu::PowerPreference::None,
        compatible_surface: Some(&surface),
        force_fallback_adapter: false,
    }).await.ok_or_else(|| JsValue::from_str("Failed to find an appropriate adapter"))?;

    let (device, queue) = adapter.request_device(
        &wgpu::DeviceDescriptor {
            label: None,
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::downlevel_webgl2_defaults(),
            memory_hints: Default::default(),
        },
        None,
    ).await.map_err(|e| JsValue::from_str(&format!("Failed to create device: {}", e)))?;

    let surface_caps = surface.get_capabilities(&adapter);
    let surface_format = surface_caps.formats.iter()
        .copied()
        .find(|f: &wgpu::TextureFormat| f.is_srgb())
        .or_else(|| surface_caps.formats.first().copied())
        .ok_or_else(|| JsValue::from_str("Surface reports no formats"))?;

    let config = wgpu::SurfaceConfiguration {
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        format: surface_format,
        width: canvas.width().max(1),
        height: canvas.height().max(1),
        present_mode: surface_caps.present_modes.first().copied().unwrap_or(wgpu::PresentMode::Fifo),
        alpha_mode: surface_caps.alpha_modes.first().copied().unwrap_or(wgpu::CompositeAlphaMode::Auto),
        view_formats: vec![],
        desired_maximum_frame_latency: 2,
    };
    surface.configure(&device, &config);

    let renderer = Renderer::new(
        device,
        queue,
        config.format,
        config.width,
        config.height,
        scene_config.surface.msaa_samples,
    );

    let assets = (|| -> anyhow::Result<SceneAssets> {
        let mut models = AssetCache::new();
        models.insert_obj(&scene_config.models.primary, &primary_obj)?;
        models.insert_obj(&scene_config.models.secondary, &secondary_obj)?;
        Ok(SceneAssets {
            models,
            sounds: SoundPool::from_sources(&scene_config.sounds),
        })
    })();

    let clock = SystemClock;
    let host = SceneHost {
        rng: Box::new(SmallRngSource::from_entropy()),
        audio: Rc::new(HtmlAudioOutput),
        pointer: Rc::new(BodyCursor),
    };
    let mut scene = SceneRoot::mount_with_assets(scene_config, assets, host, clock.now_secs());
    scene.set_aspect(renderer.aspect());

    Ok(WasmHeroScene {
        inner: Rc::new(RefCell::new(HeroSceneContext {
            scene,
            renderer,
            surface,
            config,
            clock,
        })),
    })
}

/// Hero text entrance for the DOM host to apply.
#[wasm_bindgen]
pub struct WasmHeroTimeline {
    timeline: EntranceTimeline,
    aria_label: String,
    rng: SmallRngSource,
    clock: SystemClock,
}

#[wasm_bindgen]
impl WasmHeroTimeline {
    /// `gated` shows the loading overlay in front of the hero block, timed by
    /// the optional scene config.
    #[wasm_bindgen(constructor)]
    pub fn new(
        content_json: &str,
        gated: bool,
        config_json: Option<String>,
    ) -> Result<WasmHeroTimeline, JsValue> {
        let content = HeroContent::from_json_str(content_json)
            .map_err(|e| JsValue::from_str(&format!("{:#}", e)))?;
        let gate = match config_json {
            Some(json) => {
                SceneConfig::from_json_str(&json)
                    .map_err(|e| JsValue::from_str(&format!("{:#}", e)))?
                    .loading_gate
            }
            None => LoadingGateSettings::default(),
        };
        let gate = if gated { gate.active() } else { None };
        Ok(Self {
            timeline: EntranceTimeline::new(&content, gate),
            aria_label: content.aria_label(),
            rng: SmallRngSource::from_entropy(),
            clock: SystemClock,
        })
    }

    pub fn aria_label(&self) -> String {
        self.aria_label.clone()
    }

    pub fn duration(&self) -> f32 {
        self.timeline.duration()
    }

    pub fn mount(&mut self) -> bool {
        let now = self.clock.now_secs();
        self.timeline.mount(now, &mut self.rng)
    }

    pub fn frame(&mut self) -> bool {
        self.timeline.frame(self.clock.now_secs())
    }

    pub fn is_finished(&self) -> bool {
        self.timeline.is_finished(self.clock.now_secs())
    }

    /// Current element list with styles, as JSON.
    pub fn elements_json(&self) -> String {
        serde_json::to_string(self.timeline.elements()).unwrap_or_else(|_| "[]".to_string())
    }

    pub fn unmount(&mut self) -> bool {
        self.timeline.unmount()
    }
}
