//! Hero text entrance.
//!
//! The hero block is a name split into per-letter elements, a tag line and a
//! call-to-action button. On mount three segments play back to back:
//! 1. every letter slides, fades and rotates in, staggered in random order
//! 2. the tag line fades and scales in
//! 3. the button does the same
//!
//! An optional loading gate keeps the whole block hidden for a moment and
//! then cross-fades it in against an overlay. Unmounting reverts every
//! element to the style it had before mount.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize, Serializer};

use crate::config::LoadingGateSettings;
use crate::easing::Easing;
use crate::random::RandomSource;
use crate::timeline::{AnimationSession, Stagger, StaggerOrder, Timeline};
use crate::tween::{Interpolate, Tween};

/// Delay before the first letter moves, seconds.
pub const LETTER_DELAY: f32 = 0.5;
/// Interval between consecutive letter starts, seconds.
pub const LETTER_STAGGER: f32 = 0.1;
/// Duration of every entrance segment tween, seconds.
pub const SEGMENT_DURATION: f32 = 1.0;

const NBSP: char = '\u{00A0}';

/// Text the hero renders. Every field may be missing.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeroContent {
    pub hero_1st: Option<String>,
    pub hero_2nd: Option<String>,
    pub tag_line: Option<String>,
    pub cta_label: Option<String>,
    pub cta_link: Option<String>,
}

impl HeroContent {
    pub fn from_json_str(json: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Accessible label for the heading: both name parts joined by a space.
    pub fn aria_label(&self) -> String {
        format!(
            "{} {}",
            self.hero_1st.as_deref().unwrap_or(""),
            self.hero_2nd.as_deref().unwrap_or("")
        )
    }
}

fn camel_boundary() -> Option<&'static Regex> {
    static CAMEL: OnceLock<Option<Regex>> = OnceLock::new();
    CAMEL
        .get_or_init(|| Regex::new(r"([a-z])([A-Z])").ok())
        .as_ref()
}

/// Insert a space at every lower→upper case boundary: `JohnDoe` → `John Doe`.
pub fn split_camel_case(text: &str) -> String {
    match camel_boundary() {
        Some(re) => re.replace_all(text, "$1 $2").into_owned(),
        None => text.to_string(),
    }
}

/// One glyph per character, with spaces made non-breaking.
pub fn letter_glyphs(text: &str) -> Vec<char> {
    text.chars().map(|c| if c == ' ' { NBSP } else { c }).collect()
}

/// Animated style of one element. `rotate` is in degrees.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ElementStyle {
    pub x: f32,
    pub y: f32,
    pub opacity: f32,
    pub rotate: f32,
    pub scale: f32,
}

impl Default for ElementStyle {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            opacity: 1.0,
            rotate: 0.0,
            scale: 1.0,
        }
    }
}

impl ElementStyle {
    pub fn hidden() -> Self {
        Self {
            opacity: 0.0,
            ..Self::default()
        }
    }

    pub fn with_opacity(self, opacity: f32) -> Self {
        Self { opacity, ..self }
    }
}

impl Interpolate for ElementStyle {
    fn interpolate(from: Self, to: Self, t: f32) -> Self {
        Self {
            x: f32::interpolate(from.x, to.x, t),
            y: f32::interpolate(from.y, to.y, t),
            opacity: f32::interpolate(from.opacity, to.opacity, t),
            rotate: f32::interpolate(from.rotate, to.rotate, t),
            scale: f32::interpolate(from.scale, to.scale, t),
        }
    }
}

/// Which half of the name a letter belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LetterGroup {
    First,
    Second,
}

/// Identity of an animated element.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ElementId {
    Letter { group: LetterGroup, index: usize },
    Title,
    Button,
    /// The whole hero block, gated by the loading overlay.
    Block,
    Overlay,
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementId::Letter { group, index } => {
                let group = match group {
                    LetterGroup::First => "1st",
                    LetterGroup::Second => "2nd",
                };
                write!(f, "letter-{}-{}", group, index)
            }
            ElementId::Title => write!(f, "title"),
            ElementId::Button => write!(f, "button"),
            ElementId::Block => write!(f, "block"),
            ElementId::Overlay => write!(f, "overlay"),
        }
    }
}

impl Serialize for ElementId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One element of the hero block.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HeroElement {
    pub id: ElementId,
    pub text: String,
    /// CSS transform origin for the element's rotation and scale.
    pub origin: &'static str,
    pub style: ElementStyle,
}

/// Build the element list in document order with pre-mount styles.
pub fn build_elements(content: &HeroContent, gated: bool) -> Vec<HeroElement> {
    let mut elements = Vec::new();

    if gated {
        elements.push(HeroElement {
            id: ElementId::Overlay,
            text: String::new(),
            origin: "center",
            style: ElementStyle::default(),
        });
        elements.push(HeroElement {
            id: ElementId::Block,
            text: String::new(),
            origin: "center",
            style: ElementStyle::hidden(),
        });
    }

    for (group, text) in [
        (LetterGroup::First, &content.hero_1st),
        (LetterGroup::Second, &content.hero_2nd),
    ] {
        let spaced = split_camel_case(text.as_deref().unwrap_or(""));
        for (index, glyph) in letter_glyphs(&spaced).into_iter().enumerate() {
            elements.push(HeroElement {
                id: ElementId::Letter { group, index },
                text: glyph.to_string(),
                origin: "left top",
                style: ElementStyle::hidden(),
            });
        }
    }

    elements.push(HeroElement {
        id: ElementId::Title,
        text: content.tag_line.clone().unwrap_or_default(),
        origin: "center",
        style: ElementStyle::hidden(),
    });
    elements.push(HeroElement {
        id: ElementId::Button,
        text: content.cta_label.clone().unwrap_or_default(),
        origin: "center",
        style: ElementStyle::default(),
    });

    elements
}

/// The three entrance segments over `letters`, the title and the button.
pub fn entrance_timeline(
    letters: &[ElementId],
    rng: &mut dyn RandomSource,
) -> Timeline<ElementId, ElementStyle> {
    let mut timeline = Timeline::new();

    let letter_from = ElementStyle {
        x: -100.0,
        opacity: 0.0,
        rotate: -10.0,
        ..ElementStyle::default()
    };
    timeline.append_staggered(
        letters,
        Tween::new(letter_from, ElementStyle::default(), SEGMENT_DURATION)
            .with_delay(LETTER_DELAY)
            .with_easing(Easing::ELASTIC_OUT),
        Stagger {
            each: LETTER_STAGGER,
            order: StaggerOrder::Random,
        },
        rng,
    );

    let rise = Tween::new(
        ElementStyle {
            y: 20.0,
            opacity: 0.0,
            scale: 1.2,
            ..ElementStyle::default()
        },
        ElementStyle::default(),
        SEGMENT_DURATION,
    )
    .with_easing(Easing::ELASTIC_OUT);
    timeline.append(&[ElementId::Title], rise);
    timeline.append(&[ElementId::Button], rise);

    timeline
}

/// Hold-then-fade reveal of the hero block.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LoadingGate {
    fade: Tween<f32>,
}

impl LoadingGate {
    pub fn new(settings: &LoadingGateSettings) -> Self {
        Self {
            fade: Tween::new(0.0, 1.0, settings.fade_secs)
                .with_delay(settings.hold_secs)
                .with_easing(Easing::QuadraticOut),
        }
    }

    /// Block opacity `elapsed` seconds after mount; the overlay shows the
    /// complement.
    pub fn block_opacity(&self, elapsed: f32) -> f32 {
        self.fade.value_at(elapsed)
    }

    pub fn is_open(&self, elapsed: f32) -> bool {
        self.fade.is_complete(elapsed)
    }

    pub fn duration(&self) -> f32 {
        self.fade.total_duration()
    }
}

/// Where an [`EntranceTimeline`] is in its life.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntranceState {
    Idle,
    Running,
    Reverted,
}

/// Runs the hero entrance once and reverts it on teardown.
#[derive(Debug)]
pub struct EntranceTimeline {
    elements: Vec<HeroElement>,
    session: Option<AnimationSession<ElementId, ElementStyle>>,
    gate: Option<LoadingGate>,
    mounted_at: f64,
    state: EntranceState,
}

impl EntranceTimeline {
    /// Build the elements for `content`. `gate` enables the loading overlay.
    pub fn new(content: &HeroContent, gate: Option<&LoadingGateSettings>) -> Self {
        Self {
            elements: build_elements(content, gate.is_some()),
            session: None,
            gate: gate.map(LoadingGate::new),
            mounted_at: 0.0,
            state: EntranceState::Idle,
        }
    }

    pub fn state(&self) -> EntranceState {
        self.state
    }

    pub fn elements(&self) -> &[HeroElement] {
        &self.elements
    }

    pub fn style(&self, id: ElementId) -> Option<ElementStyle> {
        self.elements.iter().find(|e| e.id == id).map(|e| e.style)
    }

    /// Letter ids in document order.
    pub fn letters(&self) -> Vec<ElementId> {
        self.elements
            .iter()
            .map(|e| e.id)
            .filter(|id| matches!(id, ElementId::Letter { .. }))
            .collect()
    }

    pub fn gate(&self) -> Option<&LoadingGate> {
        self.gate.as_ref()
    }

    /// Seconds until every segment and the gate have finished.
    pub fn duration(&self) -> f32 {
        let timeline = self
            .session
            .as_ref()
            .map(|s| s.timeline().duration())
            .unwrap_or(0.0);
        let gate = self.gate.map(|g| g.duration()).unwrap_or(0.0);
        timeline.max(gate)
    }

    /// Start the entrance and apply every start style immediately. Only the
    /// first call acts.
    pub fn mount(&mut self, now: f64, rng: &mut dyn RandomSource) -> bool {
        if self.state != EntranceState::Idle {
            return false;
        }
        let letters = self.letters();
        let timeline = entrance_timeline(&letters, rng);
        let originals = self.elements.iter().map(|e| (e.id, e.style)).collect();

        self.session = Some(AnimationSession::start(timeline, now, originals));
        self.mounted_at = now;
        self.state = EntranceState::Running;
        self.frame(now);

        log::info!(
            "Hero entrance started: {} letters, {:.2}s",
            letters.len(),
            self.duration()
        );
        true
    }

    /// Apply the styles for `now`. Returns `false` unless running.
    pub fn frame(&mut self, now: f64) -> bool {
        if self.state != EntranceState::Running {
            return false;
        }
        let mut updates = self
            .session
            .as_ref()
            .map(|s| s.sample(now))
            .unwrap_or_default();

        if let Some(gate) = &self.gate {
            let block = gate.block_opacity((now - self.mounted_at).max(0.0) as f32);
            updates.push((ElementId::Block, ElementStyle::default().with_opacity(block)));
            updates.push((
                ElementId::Overlay,
                ElementStyle::default().with_opacity(1.0 - block),
            ));
        }

        for (id, style) in updates {
            self.set_style(id, style);
        }
        true
    }

    pub fn is_finished(&self, now: f64) -> bool {
        match self.state {
            EntranceState::Idle => false,
            EntranceState::Reverted => true,
            EntranceState::Running => (now - self.mounted_at) as f32 >= self.duration(),
        }
    }

    /// Cancel the entrance and restore pre-mount styles. Returns `true` for
    /// the call that did the work.
    pub fn unmount(&mut self) -> bool {
        if self.state != EntranceState::Running {
            return false;
        }
        if let Some(session) = self.session.as_mut() {
            for (id, style) in session.revert() {
                self.set_style(id, style);
            }
        }
        self.state = EntranceState::Reverted;
        log::info!("Hero entrance reverted");
        true
    }

    fn set_style(&mut self, id: ElementId, style: ElementStyle) {
        if let Some(element) = self.elements.iter_mut().find(|e| e.id == id) {
            element.style = style;
        }
    }
}

impl Drop for EntranceTimeline {
    fn drop(&mut self) {
        self.unmount();
    }
}
