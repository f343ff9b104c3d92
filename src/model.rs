//! Interactive model controller.
//!
//! One controller drives one composed instance through
//! `Hidden → Visible → Unmounted`. While visible it bobs with an idle float
//! motion, and each click plays a knock, spins the mesh and moves to the next
//! colour of its palette.

use std::rc::Rc;
use std::sync::Arc;

use glam::{Mat4, Vec3};
use serde::Serialize;

use crate::audio::{AudioOutput, SoundPool};
use crate::composer::{ComposedInstance, ModelVariant};
use crate::easing::Easing;
use crate::material::{MaterialCycle, MaterialPalette, StandardMaterial};
use crate::mesh_asset::MeshAsset;
use crate::pointer::{Cursor, PointerHint};
use crate::random::RandomSource;
use crate::scene_graph::{InstanceId, ModelNodes, Transform};
use crate::timeline::{AnimationSession, Timeline};
use crate::tween::Tween;

/// Entrance tween duration range, seconds.
pub const ENTRANCE_DURATION: (f32, f32) = (0.8, 1.2);
/// Entrance delay range, seconds.
pub const ENTRANCE_DELAY: (f32, f32) = (0.0, 0.5);
/// One forward pass of the click spin, seconds.
pub const CLICK_SPIN_DURATION: f32 = 1.3;
/// Upper bound of the per-axis spin added by a click, radians.
pub const CLICK_SPIN_MAX: f32 = 2.0;
/// Float phase offsets are drawn from `[0, FLOAT_OFFSET_RANGE)`.
pub const FLOAT_OFFSET_RANGE: f32 = 10_000.0;

/// Lifecycle of a controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Lifecycle {
    Hidden,
    Visible,
    Unmounted,
}

/// Nodes an entrance session can animate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AnimatedNode {
    GroupScale,
}

/// Idle bobbing, parameterised by an instance's motion intensity.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FloatMotion {
    pub speed: f32,
    pub rotation_intensity: f32,
    pub float_intensity: f32,
    /// Phase offset in seconds.
    pub offset: f32,
}

impl FloatMotion {
    pub fn from_intensity(r: f32, offset: f32) -> Self {
        Self {
            speed: 5.0 * r,
            rotation_intensity: 6.0 * r,
            float_intensity: 5.0 * r,
            offset,
        }
    }

    /// Float node transform `elapsed` seconds after mount.
    pub fn sample(&self, elapsed: f32) -> Transform {
        let t = (self.offset + elapsed) / 4.0 * self.speed;
        let (sin, cos) = t.sin_cos();
        Transform {
            position: Vec3::new(0.0, sin / 10.0 * self.float_intensity, 0.0),
            rotation: Vec3::new(
                cos / 8.0 * self.rotation_intensity,
                sin / 8.0 * self.rotation_intensity,
                sin / 20.0 * self.rotation_intensity,
            ),
            scale: Vec3::ONE,
        }
    }
}

/// Collaborators a click needs.
pub struct ClickContext<'a> {
    pub rng: &'a mut dyn RandomSource,
    pub sounds: &'a SoundPool,
    pub audio: &'a dyn AudioOutput,
}

/// What a click did.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ClickOutcome {
    pub id: InstanceId,
    pub material_index: usize,
    pub material: String,
    /// Clip handed to the audio output, if any.
    pub clip: Option<String>,
}

/// Render-ready view of one instance.
#[derive(Clone, Debug, Serialize)]
pub struct ModelRenderState {
    pub id: InstanceId,
    pub variant: ModelVariant,
    pub visible: bool,
    #[serde(skip)]
    pub world: Mat4,
    /// Linear RGB of the displayed material.
    pub color: [f32; 3],
    pub material_index: usize,
    /// Centre of the mesh bounds in world space.
    pub center: Vec3,
    /// Radius of a sphere enclosing the mesh in world space.
    pub radius: f32,
    #[serde(skip)]
    pub mesh: Arc<MeshAsset>,
}

#[derive(Clone, Copy, Debug)]
struct Spin {
    started_at: f64,
    tween: Tween<Vec3>,
}

/// Drives one model instance.
pub struct ModelController {
    instance: ComposedInstance,
    mesh: Arc<MeshAsset>,
    nodes: ModelNodes,
    material: MaterialCycle,
    lifecycle: Lifecycle,
    float: FloatMotion,
    mounted_at: f64,
    entrance: Option<AnimationSession<AnimatedNode, Vec3>>,
    spin: Option<Spin>,
    pointer: Rc<dyn PointerHint>,
    clicks: u32,
}

impl ModelController {
    pub fn new(
        instance: ComposedInstance,
        mesh: Arc<MeshAsset>,
        palette: Arc<MaterialPalette>,
        pointer: Rc<dyn PointerHint>,
    ) -> Self {
        let nodes = ModelNodes {
            group: Transform::from_position(instance.position),
            float: Transform::default(),
            mesh: Transform {
                position: Vec3::ZERO,
                rotation: instance.variant.base_rotation(),
                scale: instance.scale,
            },
        };
        Self {
            material: MaterialCycle::new(palette, instance.initial_material_index),
            float: FloatMotion::from_intensity(instance.r, 0.0),
            instance,
            mesh,
            nodes,
            lifecycle: Lifecycle::Hidden,
            mounted_at: 0.0,
            entrance: None,
            spin: None,
            pointer,
            clicks: 0,
        }
    }

    pub fn id(&self) -> InstanceId {
        self.instance.id
    }

    pub fn variant(&self) -> ModelVariant {
        self.instance.variant
    }

    pub fn instance(&self) -> &ComposedInstance {
        &self.instance
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn is_visible(&self) -> bool {
        self.lifecycle == Lifecycle::Visible
    }

    pub fn nodes(&self) -> &ModelNodes {
        &self.nodes
    }

    pub fn palette(&self) -> &Arc<MaterialPalette> {
        self.material.palette()
    }

    pub fn mesh(&self) -> &Arc<MeshAsset> {
        &self.mesh
    }

    pub fn material_index(&self) -> usize {
        self.material.index()
    }

    pub fn material(&self) -> &StandardMaterial {
        self.material.current()
    }

    pub fn float_motion(&self) -> &FloatMotion {
        &self.float
    }

    pub fn click_count(&self) -> u32 {
        self.clicks
    }

    /// True while an entrance tween is still moving.
    pub fn is_entering(&self, now: f64) -> bool {
        self.entrance
            .as_ref()
            .map(|s| !s.is_finished(now))
            .unwrap_or(false)
    }

    /// True while a click spin is in flight.
    pub fn is_spinning(&self) -> bool {
        self.spin.is_some()
    }

    /// Show the instance and start its entrance. Only the first call acts.
    pub fn mount(&mut self, now: f64, rng: &mut dyn RandomSource) {
        if self.lifecycle != Lifecycle::Hidden {
            return;
        }

        let duration = rng.range(ENTRANCE_DURATION.0, ENTRANCE_DURATION.1);
        let delay = rng.range(ENTRANCE_DELAY.0, ENTRANCE_DELAY.1);
        self.float.offset = rng.range(0.0, FLOAT_OFFSET_RANGE);

        let natural_scale = self.nodes.group.scale;
        let mut timeline = Timeline::new();
        timeline.append(
            &[AnimatedNode::GroupScale],
            Tween::new(Vec3::ZERO, natural_scale, duration)
                .with_delay(delay)
                .with_easing(Easing::ELASTIC_OUT),
        );
        let session = AnimationSession::start(
            timeline,
            now,
            vec![(AnimatedNode::GroupScale, natural_scale)],
        );

        self.mounted_at = now;
        self.lifecycle = Lifecycle::Visible;
        self.entrance = Some(session);
        self.update(now);

        log::debug!(
            "Mounted {} ({:?}) entrance {:.2}s after {:.2}s",
            self.instance.id,
            self.instance.variant,
            duration,
            delay
        );
    }

    /// Revert the entrance and stop every tween. Safe to call repeatedly and
    /// at any point of the entrance.
    pub fn unmount(&mut self) {
        if self.lifecycle == Lifecycle::Unmounted {
            return;
        }
        if let Some(mut session) = self.entrance.take() {
            for (node, value) in session.revert() {
                self.apply(node, value);
            }
        }
        self.spin = None;
        self.lifecycle = Lifecycle::Unmounted;
    }

    /// Play a knock, spin the mesh and advance the colour.
    ///
    /// Returns `None` when the instance is not visible.
    pub fn click(&mut self, now: f64, ctx: ClickContext<'_>) -> Option<ClickOutcome> {
        if !self.is_visible() {
            log::warn!("Ignoring click on {} while {:?}", self.instance.id, self.lifecycle);
            return None;
        }

        let clip = ctx.sounds.pick(ctx.rng).map(|clip| {
            if let Err(e) = ctx.audio.play(clip) {
                log::warn!("Sound '{}' failed to play: {}", clip.name, e);
            }
            clip.name.clone()
        });

        let from = self.nodes.mesh.rotation;
        let delta = Vec3::new(
            ctx.rng.range(0.0, CLICK_SPIN_MAX),
            ctx.rng.range(0.0, CLICK_SPIN_MAX),
            ctx.rng.range(0.0, CLICK_SPIN_MAX),
        );
        self.spin = Some(Spin {
            started_at: now,
            tween: Tween::new(from, from + delta, CLICK_SPIN_DURATION)
                .with_easing(Easing::ELASTIC_OUT)
                .with_yoyo(true),
        });

        let (material_index, material) = self.material.advance();
        let outcome = ClickOutcome {
            id: self.instance.id,
            material_index,
            material: material.name.clone(),
            clip,
        };
        self.clicks += 1;

        log::debug!(
            "Click on {} -> material {} ({}), sound {:?}",
            outcome.id,
            outcome.material_index,
            outcome.material,
            outcome.clip
        );
        Some(outcome)
    }

    pub fn pointer_enter(&self) {
        self.pointer.set_cursor(Cursor::Pointer);
    }

    pub fn pointer_leave(&self) {
        self.pointer.set_cursor(Cursor::Default);
    }

    /// Sample every running animation at `now`.
    pub fn update(&mut self, now: f64) {
        if !self.is_visible() {
            return;
        }

        if let Some(session) = &self.entrance {
            for (node, value) in session.sample(now) {
                self.apply(node, value);
            }
        }

        if let Some(spin) = self.spin {
            let elapsed = (now - spin.started_at).max(0.0) as f32;
            self.nodes.mesh.rotation = spin.tween.value_at(elapsed);
            if spin.tween.is_complete(elapsed) {
                self.spin = None;
            }
        }

        self.nodes.float = self.float.sample((now - self.mounted_at).max(0.0) as f32);
    }

    fn apply(&mut self, node: AnimatedNode, value: Vec3) {
        match node {
            AnimatedNode::GroupScale => self.nodes.group.scale = value,
        }
    }

    pub fn render_state(&self) -> ModelRenderState {
        let world = self.nodes.world_matrix();
        let bounds = &self.mesh.bounds;
        let center = world.transform_point3(Vec3::from(bounds.center()));
        let radius = Vec3::from(bounds.size()).length() * 0.5 * self.nodes.max_world_scale();
        ModelRenderState {
            id: self.instance.id,
            variant: self.instance.variant,
            visible: self.is_visible(),
            world,
            color: self.material.current().linear(),
            material_index: self.material.index(),
            center,
            radius,
            mesh: self.mesh.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::RecordingAudioOutput;
    use crate::composer::{compose, reference_layout};
    use crate::gpu::mesh::create_plane_geometry;
    use crate::pointer::CursorCell;
    use crate::random::SequenceSource;

    fn plane_mesh() -> Arc<MeshAsset> {
        let (vertices, indices) = create_plane_geometry();
        Arc::new(MeshAsset::new("plane".into(), vertices, indices))
    }

    fn controller(index: usize) -> (ModelController, CursorCell) {
        let cursor = CursorCell::new();
        let instance = compose(&reference_layout())[index];
        (
            ModelController::new(
                instance,
                plane_mesh(),
                instance.variant.palette(),
                Rc::new(cursor.clone()),
            ),
            cursor,
        )
    }

    fn sounds() -> SoundPool {
        SoundPool::from_sources(&["knock1.wav", "knock2.wav", "knock3.wav"])
    }

    #[test]
    fn test_same_variant_shares_palette() {
        let (a, _) = controller(1);
        let (b, _) = controller(2);
        let (c, _) = controller(0);
        assert!(Arc::ptr_eq(a.palette(), b.palette()));
        assert!(!Arc::ptr_eq(a.palette(), c.palette()));
    }

    #[test]
    fn test_starts_hidden() {
        let (model, _) = controller(1);
        assert_eq!(model.lifecycle(), Lifecycle::Hidden);
        assert!(!model.render_state().visible);
    }

    #[test]
    fn test_mount_starts_entrance_from_zero() {
        let (mut model, _) = controller(1);
        // duration 1.0, delay 0.25, offset 5000
        let mut rng = SequenceSource::new(vec![0.5, 0.5, 0.5]);
        model.mount(10.0, &mut rng);
        assert!(model.is_visible());
        assert_eq!(model.nodes().group.scale, Vec3::ZERO);
        assert!(model.is_entering(10.5));

        model.update(11.25);
        assert!((model.nodes().group.scale - Vec3::ONE).length() < 1e-5);
        assert!(!model.is_entering(11.25));
    }

    #[test]
    fn test_second_mount_is_noop() {
        let (mut model, _) = controller(1);
        let mut rng = SequenceSource::constant(0.5);
        model.mount(0.0, &mut rng);
        let draws = rng.draws();
        model.mount(5.0, &mut rng);
        assert_eq!(rng.draws(), draws);
    }

    #[test]
    fn test_unmount_before_entrance_completes() {
        let (mut model, _) = controller(2);
        let mut rng = SequenceSource::constant(0.5);
        model.mount(0.0, &mut rng);
        model.update(0.3);
        model.unmount();
        assert_eq!(model.lifecycle(), Lifecycle::Unmounted);
        assert_eq!(model.nodes().group.scale, Vec3::ONE);

        let before = *model.nodes();
        model.update(5.0);
        model.unmount();
        assert_eq!(*model.nodes(), before);
    }

    #[test]
    fn test_unmount_without_mount() {
        let (mut model, _) = controller(0);
        model.unmount();
        model.unmount();
        assert_eq!(model.lifecycle(), Lifecycle::Unmounted);
    }

    #[test]
    fn test_click_cycles_primary_material() {
        let (mut model, _) = controller(2);
        let mut rng = SequenceSource::constant(0.5);
        model.mount(0.0, &mut rng);
        let audio = RecordingAudioOutput::new();
        let pool = sounds();

        let start = model.material_index();
        for n in 1..=5 {
            let outcome = model
                .click(
                    1.0,
                    ClickContext {
                        rng: &mut rng,
                        sounds: &pool,
                        audio: &audio,
                    },
                )
                .unwrap();
            assert_eq!(outcome.material_index, (start + n) % 3);
            assert_eq!(model.material().name, outcome.material);
        }
        assert_eq!(audio.play_count(), 5);
        assert_eq!(model.click_count(), 5);
    }

    #[test]
    fn test_click_toggles_secondary_material() {
        let (mut model, _) = controller(3);
        let mut rng = SequenceSource::constant(0.1);
        model.mount(0.0, &mut rng);
        let audio = RecordingAudioOutput::new();
        let pool = sounds();
        assert_eq!(model.material_index(), 1);

        let mut click = |model: &mut ModelController| {
            model
                .click(
                    1.0,
                    ClickContext {
                        rng: &mut rng,
                        sounds: &pool,
                        audio: &audio,
                    },
                )
                .map(|o| o.material_index)
        };
        assert_eq!(click(&mut model), Some(0));
        assert_eq!(click(&mut model), Some(1));
    }

    #[test]
    fn test_click_ignored_when_not_visible() {
        let (mut model, _) = controller(1);
        let mut rng = SequenceSource::constant(0.5);
        let audio = RecordingAudioOutput::new();
        let pool = sounds();
        let ctx = ClickContext {
            rng: &mut rng,
            sounds: &pool,
            audio: &audio,
        };
        assert!(model.click(0.0, ctx).is_none());
        assert_eq!(audio.play_count(), 0);
        assert_eq!(model.material_index(), 0);
    }

    #[test]
    fn test_playback_error_is_swallowed() {
        let (mut model, _) = controller(1);
        let mut rng = SequenceSource::constant(0.5);
        model.mount(0.0, &mut rng);
        let audio = RecordingAudioOutput::failing("no device");
        let pool = sounds();
        let outcome = model
            .click(
                1.0,
                ClickContext {
                    rng: &mut rng,
                    sounds: &pool,
                    audio: &audio,
                },
            )
            .unwrap();
        assert_eq!(outcome.clip.as_deref(), Some("knock2"));
        assert_eq!(outcome.material_index, 1);
    }

    #[test]
    fn test_spin_returns_to_rest_rotation() {
        let (mut model, _) = controller(1);
        let mut rng = SequenceSource::constant(0.5);
        model.mount(0.0, &mut rng);
        model.update(5.0);
        let rest = model.nodes().mesh.rotation;
        let audio = RecordingAudioOutput::new();
        let pool = sounds();

        model.click(
            5.0,
            ClickContext {
                rng: &mut rng,
                sounds: &pool,
                audio: &audio,
            },
        );
        model.update(5.0 + CLICK_SPIN_DURATION as f64);
        assert!((model.nodes().mesh.rotation - (rest + Vec3::ONE)).length() < 1e-4);
        assert!(model.is_spinning());

        model.update(5.0 + 2.0 * CLICK_SPIN_DURATION as f64 + 0.01);
        assert!((model.nodes().mesh.rotation - rest).length() < 1e-4);
        assert!(!model.is_spinning());
    }

    #[test]
    fn test_pointer_hints() {
        let (model, cursor) = controller(0);
        model.pointer_enter();
        assert_eq!(cursor.get(), Cursor::Pointer);
        model.pointer_leave();
        assert_eq!(cursor.get(), Cursor::Default);
    }

    #[test]
    fn test_float_motion_formula() {
        let motion = FloatMotion::from_intensity(0.4, 0.0);
        assert!((motion.speed - 2.0).abs() < 1e-6);
        let t = 3.0_f32;
        let arg = t / 4.0 * 2.0;
        let sample = motion.sample(t);
        assert!((sample.rotation.x - arg.cos() / 8.0 * 2.4).abs() < 1e-5);
        assert!((sample.rotation.z - arg.sin() / 20.0 * 2.4).abs() < 1e-5);
        assert!((sample.position.y - arg.sin() / 10.0 * 2.0).abs() < 1e-5);
        assert_eq!(sample.position.x, 0.0);
    }

    #[test]
    fn test_render_state_tracks_material() {
        let (model, _) = controller(0);
        let state = model.render_state();
        assert_eq!(state.material_index, 0);
        assert!(state.color.iter().all(|c| (c - 1.0).abs() < 1e-5));
        assert_eq!(state.id, InstanceId(0));
    }
}
