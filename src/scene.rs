//! Scene root: asset loading, the frame loop, input routing and teardown.
//!
//! Mounting loads every model and sound first. If anything fails the root
//! stays in [`SceneStatus::Failed`] and renders nothing; otherwise it builds
//! the particle field and one [`ModelController`] per composed instance and
//! starts their entrances. Hosts then call [`SceneRoot::frame`] once per
//! display refresh until [`SceneRoot::unmount`] (or drop).

use std::rc::Rc;
use std::sync::Arc;

use anyhow::Result;
use glam::Vec2;

use crate::audio::{AudioOutput, SoundPool};
use crate::camera::CameraConfig;
use crate::composer::{compose, reference_layout, ModelVariant};
use crate::config::SceneConfig;
use crate::frame_loop::{FrameLoop, StopSignal};
use crate::lighting::{LightingConfig, ShadowBlob};
use crate::material::PointsMaterial;
use crate::mesh_asset::{AssetCache, MeshAsset};
use crate::model::{ClickContext, ClickOutcome, ModelController, ModelRenderState};
use crate::particle::ParticleField;
use crate::picking::{pick_nearest, PickTarget};
use crate::pointer::{Cursor, PointerHint};
use crate::random::RandomSource;
use crate::scene_graph::InstanceId;

/// Outcome of mounting.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SceneStatus {
    Ready,
    /// Assets failed to load; nothing renders.
    Failed(String),
}

/// Capabilities the host lends the scene.
pub struct SceneHost {
    pub rng: Box<dyn RandomSource>,
    pub audio: Rc<dyn AudioOutput>,
    pub pointer: Rc<dyn PointerHint>,
}

/// Loaded models and sounds.
#[derive(Debug, Default)]
pub struct SceneAssets {
    pub models: AssetCache,
    pub sounds: SoundPool,
}

impl SceneAssets {
    /// Read every model and sound named by `config`, checking that each
    /// variant's sub-mesh exists.
    pub fn load(config: &SceneConfig) -> Result<Self> {
        let mut models = AssetCache::new();
        for variant in [ModelVariant::PrimaryModel, ModelVariant::SecondaryModel] {
            models.preload(config.models.for_variant(variant))?;
        }
        let assets = Self {
            models,
            sounds: SoundPool::load(&config.sounds)?,
        };
        assets.check(config)?;
        Ok(assets)
    }

    /// Validate assets supplied by the host.
    pub fn check(&self, config: &SceneConfig) -> Result<()> {
        for variant in [ModelVariant::PrimaryModel, ModelVariant::SecondaryModel] {
            self.mesh_for(config, variant)?;
        }
        Ok(())
    }

    fn mesh_for(&self, config: &SceneConfig, variant: ModelVariant) -> Result<Arc<MeshAsset>> {
        self.models
            .mesh(config.models.for_variant(variant), variant.mesh_name())
    }
}

struct LiveScene {
    particles: Option<ParticleField>,
    models: Vec<ModelController>,
    sounds: SoundPool,
    hovered: Option<InstanceId>,
}

/// Borrowed, render-ready view of the scene.
pub struct SceneSnapshot<'a> {
    pub camera: &'a CameraConfig,
    pub lighting: &'a LightingConfig,
    pub clear_color: [f32; 4],
    pub msaa_samples: u32,
    /// `(positions, colours, material)` of the particle field.
    pub points: Option<(&'a [f32], &'a [f32], PointsMaterial)>,
    pub models: Vec<ModelRenderState>,
    pub shadows: Vec<ShadowBlob>,
    /// Contact shadow blur; widens the soft edge of each disc.
    pub shadow_blur: f32,
}

/// The mounted hero scene.
pub struct SceneRoot {
    config: SceneConfig,
    lighting: LightingConfig,
    status: SceneStatus,
    live: Option<LiveScene>,
    frame_loop: FrameLoop,
    host: SceneHost,
    aspect: f32,
    unmounted: bool,
}

impl SceneRoot {
    /// Load assets from disk and mount.
    pub fn mount(config: SceneConfig, host: SceneHost, now: f64) -> Self {
        let assets = SceneAssets::load(&config);
        Self::mount_with_assets(config, assets, host, now)
    }

    /// Mount with assets the host already loaded (or failed to load).
    pub fn mount_with_assets(
        config: SceneConfig,
        assets: Result<SceneAssets>,
        mut host: SceneHost,
        now: f64,
    ) -> Self {
        let lighting = LightingConfig::from_preset(config.environment);
        let frame_loop = FrameLoop::new();

        let live = assets.and_then(|assets| {
            assets.check(&config)?;
            let particles =
                ParticleField::new(config.particles.count, config.particles.extent, host.rng.as_mut());

            let mut models = Vec::new();
            for instance in compose(&reference_layout()) {
                let mesh = assets.mesh_for(&config, instance.variant)?;
                let mut model = ModelController::new(
                    instance,
                    mesh,
                    instance.variant.palette(),
                    host.pointer.clone(),
                );
                model.mount(now, host.rng.as_mut());
                models.push(model);
            }

            Ok(LiveScene {
                particles: Some(particles),
                models,
                sounds: assets.sounds,
                hovered: None,
            })
        });

        let (status, live) = match live {
            Ok(live) => {
                log::info!(
                    "Scene mounted: {} models, {} particles",
                    live.models.len(),
                    config.particles.count
                );
                (SceneStatus::Ready, Some(live))
            }
            Err(e) => {
                log::error!("Scene failed to load: {:#}", e);
                frame_loop.stop();
                (SceneStatus::Failed(format!("{:#}", e)), None)
            }
        };

        Self {
            config,
            lighting,
            status,
            live,
            frame_loop,
            host,
            aspect: 16.0 / 9.0,
            unmounted: false,
        }
    }

    pub fn status(&self) -> &SceneStatus {
        &self.status
    }

    pub fn is_ready(&self) -> bool {
        self.status == SceneStatus::Ready
    }

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    /// Viewport width / height.
    pub fn set_aspect(&mut self, aspect: f32) {
        if aspect.is_finite() && aspect > 0.0 {
            self.aspect = aspect;
        }
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn stop_signal(&self) -> StopSignal {
        self.frame_loop.stop_signal()
    }

    pub fn frames_run(&self) -> u64 {
        self.frame_loop.frames_run()
    }

    pub fn particles(&self) -> Option<&ParticleField> {
        self.live.as_ref().and_then(|live| live.particles.as_ref())
    }

    pub fn models(&self) -> &[ModelController] {
        self.live.as_ref().map(|live| live.models.as_slice()).unwrap_or(&[])
    }

    pub fn model(&self, id: InstanceId) -> Option<&ModelController> {
        self.models().iter().find(|m| m.id() == id)
    }

    /// Instance currently under the pointer.
    pub fn hovered(&self) -> Option<InstanceId> {
        self.live.as_ref().and_then(|live| live.hovered)
    }

    /// Advance the particle field and every model. Returns whether the frame
    /// ran.
    pub fn frame(&mut self, now: f64) -> bool {
        let Self {
            frame_loop, live, ..
        } = self;
        let Some(live) = live.as_mut() else {
            return false;
        };
        frame_loop.step(now, |frame| {
            if let Some(particles) = live.particles.as_mut() {
                particles.update(frame.now);
            }
            for model in &mut live.models {
                model.update(frame.now);
            }
        })
    }

    /// Click whatever visible model lies under `ndc`.
    pub fn click_at(&mut self, ndc: Vec2, now: f64) -> Option<ClickOutcome> {
        let id = self.pick(ndc)?;
        self.click(id, now)
    }

    /// Route a click to an instance by identity.
    pub fn click(&mut self, id: InstanceId, now: f64) -> Option<ClickOutcome> {
        if self.unmounted {
            return None;
        }
        let live = self.live.as_mut()?;
        let model = live.models.iter_mut().find(|m| m.id() == id)?;
        model.click(
            now,
            ClickContext {
                rng: self.host.rng.as_mut(),
                sounds: &live.sounds,
                audio: self.host.audio.as_ref(),
            },
        )
    }

    /// Track the pointer; fires leave/enter when the hovered instance
    /// changes. Returns the instance now under the pointer.
    pub fn hover_at(&mut self, ndc: Vec2) -> Option<InstanceId> {
        if self.unmounted {
            return None;
        }
        let hit = self.pick(ndc);
        let live = self.live.as_mut()?;
        if hit != live.hovered {
            if let Some(model) = live.hovered.and_then(|id| live.models.iter().find(|m| m.id() == id)) {
                model.pointer_leave();
            }
            if let Some(model) = hit.and_then(|id| live.models.iter().find(|m| m.id() == id)) {
                model.pointer_enter();
            }
            live.hovered = hit;
        }
        hit
    }

    /// The pointer left the surface; the hovered model, if any, loses it.
    pub fn pointer_leave(&mut self) {
        let Some(live) = self.live.as_mut() else {
            return;
        };
        if let Some(id) = live.hovered.take() {
            if let Some(model) = live.models.iter().find(|m| m.id() == id) {
                model.pointer_leave();
            }
        }
    }

    fn pick(&self, ndc: Vec2) -> Option<InstanceId> {
        let ray = self.config.camera.ray_from_ndc(ndc, self.aspect);
        let targets: Vec<PickTarget> = self
            .models()
            .iter()
            .filter(|m| m.is_visible())
            .map(|m| {
                let state = m.render_state();
                PickTarget {
                    id: state.id,
                    center: state.center,
                    radius: state.radius,
                }
            })
            .collect();
        pick_nearest(&ray, targets).map(|hit| hit.id)
    }

    /// Stop the frame loop, revert every model and release the particle
    /// buffers. Returns `true` for the call that did the work.
    pub fn unmount(&mut self) -> bool {
        if self.unmounted {
            return false;
        }
        self.unmounted = true;
        self.frame_loop.stop();

        if let Some(live) = self.live.as_mut() {
            for model in &mut live.models {
                model.unmount();
            }
            if live.hovered.take().is_some() {
                self.host.pointer.set_cursor(Cursor::Default);
            }
            live.particles = None;
        }
        log::info!("Scene unmounted after {} frames", self.frame_loop.frames_run());
        true
    }

    pub fn snapshot(&self) -> SceneSnapshot<'_> {
        let models: Vec<ModelRenderState> = self
            .models()
            .iter()
            .map(|m| m.render_state())
            .collect();

        let shadows = if self.config.surface.shadows {
            models
                .iter()
                .filter(|m| m.visible)
                .filter_map(|m| self.config.contact_shadows.blob_for(m.center, m.radius))
                .collect()
        } else {
            Vec::new()
        };

        SceneSnapshot {
            camera: &self.config.camera,
            lighting: &self.lighting,
            clear_color: self.config.surface.clear_color,
            msaa_samples: self.config.surface.msaa_samples,
            points: self
                .particles()
                .filter(|p| p.visible)
                .map(|p| (p.positions(), p.colors(), p.material)),
            models,
            shadows,
            shadow_blur: self.config.contact_shadows.blur,
        }
    }
}

impl Drop for SceneRoot {
    fn drop(&mut self) {
        self.unmount();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::RecordingAudioOutput;
    use crate::pointer::CursorCell;
    use crate::random::SmallRngSource;

    const RING: &str = "o Circle011\nv -1 0 -1\nv 1 0 -1\nv 1 0 1\nv -1 0 1\nf 1 2 3 4\n";
    const DISC: &str = "o Cylinder005\nv -1 0 -1\nv 1 0 -1\nv 1 0 1\nv -1 0 1\nf 1 2 3 4\n";

    fn assets(config: &SceneConfig) -> SceneAssets {
        let mut models = AssetCache::new();
        models.insert_obj(&config.models.primary, RING).unwrap();
        models.insert_obj(&config.models.secondary, DISC).unwrap();
        SceneAssets {
            models,
            sounds: SoundPool::from_sources(&config.sounds),
        }
    }

    fn host(cursor: &CursorCell) -> (SceneHost, Rc<RecordingAudioOutput>) {
        let audio = Rc::new(RecordingAudioOutput::new());
        (
            SceneHost {
                rng: Box::new(SmallRngSource::seeded(5)),
                audio: audio.clone(),
                pointer: Rc::new(cursor.clone()),
            },
            audio,
        )
    }

    fn small_config() -> SceneConfig {
        let mut config = SceneConfig::default();
        config.particles.count = 50;
        config
    }

    #[test]
    fn test_mount_builds_layout() {
        let config = small_config();
        let cursor = CursorCell::new();
        let (host, _) = host(&cursor);
        let scene = SceneRoot::mount_with_assets(config.clone(), Ok(assets(&config)), host, 0.0);
        assert!(scene.is_ready());
        assert_eq!(scene.models().len(), 5);
        assert_eq!(scene.particles().map(|p| p.len()), Some(50));
        assert!(scene.models().iter().all(|m| m.is_visible()));
    }

    #[test]
    fn test_missing_sub_mesh_fails_scene() {
        let config = small_config();
        let mut bad = assets(&config);
        bad.models.insert_obj(&config.models.primary, DISC).unwrap();
        let cursor = CursorCell::new();
        let (host, _) = host(&cursor);
        let mut scene = SceneRoot::mount_with_assets(config, Ok(bad), host, 0.0);

        match scene.status() {
            SceneStatus::Failed(reason) => assert!(reason.contains("Circle011")),
            other => panic!("unexpected status {:?}", other),
        }
        assert!(!scene.frame(1.0));
        assert!(scene.snapshot().models.is_empty());
        assert!(scene.snapshot().points.is_none());
    }

    #[test]
    fn test_unmount_is_idempotent() {
        let config = small_config();
        let cursor = CursorCell::new();
        let (host, _) = host(&cursor);
        let mut scene = SceneRoot::mount_with_assets(config.clone(), Ok(assets(&config)), host, 0.0);
        assert!(scene.frame(0.1));
        assert!(scene.unmount());
        assert!(!scene.unmount());
        assert!(!scene.frame(0.2));
        assert_eq!(scene.frames_run(), 1);
        assert!(scene.particles().is_none());
        assert!(scene.stop_signal().is_stopped());
    }

    #[test]
    fn test_hover_sets_and_clears_cursor() {
        let config = small_config();
        let cursor = CursorCell::new();
        let (host, _) = host(&cursor);
        let mut scene = SceneRoot::mount_with_assets(config.clone(), Ok(assets(&config)), host, 0.0);
        scene.set_aspect(1.0);
        scene.frame(10.0);

        let centre = scene.model(InstanceId(1)).unwrap().render_state().center;
        let ndc = scene
            .config()
            .camera
            .view_projection_matrix(1.0)
            .project_point3(centre)
            .truncate();
        assert!(scene.hover_at(ndc).is_some());
        assert_eq!(cursor.get(), Cursor::Pointer);

        assert_eq!(scene.hover_at(Vec2::new(0.99, -0.99)), None);
        assert_eq!(cursor.get(), Cursor::Default);
    }

    #[test]
    fn test_click_by_id_plays_one_sound() {
        let config = small_config();
        let cursor = CursorCell::new();
        let (host, audio) = host(&cursor);
        let mut scene = SceneRoot::mount_with_assets(config.clone(), Ok(assets(&config)), host, 0.0);
        let outcome = scene.click(InstanceId(1), 1.0).unwrap();
        assert_eq!(outcome.material_index, 1);
        assert_eq!(audio.play_count(), 1);
        assert!(scene.click(InstanceId(9), 1.0).is_none());
    }
}
