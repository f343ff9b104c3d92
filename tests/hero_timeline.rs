//! Hero entrance timeline through the public API.
//!
//! Run with: cargo test --test hero_timeline

use hero_shapes::config::LoadingGateSettings;
use hero_shapes::hero::{
    ElementId, EntranceState, EntranceTimeline, HeroContent, LetterGroup, LETTER_DELAY,
    LETTER_STAGGER, SEGMENT_DURATION,
};
use hero_shapes::random::{SequenceSource, SmallRngSource};

fn content() -> HeroContent {
    HeroContent::from_json_str(
        r#"{
            "hero_1st": "JaneDoe",
            "hero_2nd": "Studio",
            "tag_line": "Shapes that knock back",
            "cta_label": "Say hello",
            "cta_link": "mailto:hello@example.com"
        }"#,
    )
    .unwrap()
}

#[test]
fn test_letters_are_split_and_hidden_before_mount() {
    let timeline = EntranceTimeline::new(&content(), None);
    // "Jane Doe" (8 glyphs) + "Studio" (6 glyphs).
    assert_eq!(timeline.letters().len(), 14);
    let space = ElementId::Letter {
        group: LetterGroup::First,
        index: 4,
    };
    let glyph = timeline.elements().iter().find(|e| e.id == space).unwrap();
    assert_eq!(glyph.text, "\u{00A0}");
    assert_eq!(timeline.style(space).unwrap().opacity, 0.0);
    assert_eq!(timeline.style(ElementId::Button).unwrap().opacity, 1.0);
    assert_eq!(content().aria_label(), "JaneDoe Studio");
}

#[test]
fn test_segments_play_in_order() {
    let mut timeline = EntranceTimeline::new(&content(), None);
    let mut rng = SequenceSource::constant(0.3);
    assert!(timeline.mount(0.0, &mut rng));

    let letters_end = LETTER_DELAY + SEGMENT_DURATION + 13.0 * LETTER_STAGGER;
    assert!((timeline.duration() - (letters_end + 2.0 * SEGMENT_DURATION)).abs() < 1e-4);

    // Title waits for the letters.
    timeline.frame((letters_end - 0.05) as f64);
    assert_eq!(timeline.style(ElementId::Title).unwrap().opacity, 0.0);
    timeline.frame((letters_end + 0.5) as f64);
    assert!(timeline.style(ElementId::Title).unwrap().opacity > 0.0);
    assert_eq!(timeline.style(ElementId::Button).unwrap().opacity, 0.0);

    let end = timeline.duration() as f64 + 0.1;
    timeline.frame(end);
    assert!(timeline.is_finished(end));
    for element in timeline.elements() {
        let style = element.style;
        assert!((style.opacity - 1.0).abs() < 1e-3, "{} not settled", element.id);
        assert!(style.x.abs() < 1e-2);
    }
}

#[test]
fn test_unmount_restores_pre_mount_styles() {
    let gate = LoadingGateSettings::default();
    let mut timeline = EntranceTimeline::new(&content(), Some(&gate));
    let before: Vec<_> = timeline.elements().to_vec();

    let mut rng = SmallRngSource::seeded(9);
    timeline.mount(0.0, &mut rng);
    timeline.frame(1.7);
    assert_ne!(timeline.elements(), before.as_slice());

    assert!(timeline.unmount());
    assert_eq!(timeline.state(), EntranceState::Reverted);
    assert_eq!(timeline.elements(), before.as_slice());
    assert!(!timeline.frame(2.0));
    assert!(!timeline.unmount());
}

#[test]
fn test_loading_gate_cross_fades() {
    let gate = LoadingGateSettings::default();
    let mut timeline = EntranceTimeline::new(&content(), Some(&gate));
    timeline.mount(0.0, &mut SequenceSource::constant(0.5));

    timeline.frame(1.0);
    assert_eq!(timeline.style(ElementId::Block).unwrap().opacity, 0.0);
    assert_eq!(timeline.style(ElementId::Overlay).unwrap().opacity, 1.0);

    timeline.frame(2.6);
    assert_eq!(timeline.style(ElementId::Block).unwrap().opacity, 1.0);
    assert_eq!(timeline.style(ElementId::Overlay).unwrap().opacity, 0.0);
    assert!(timeline.gate().unwrap().is_open(2.6));
}

#[test]
fn test_empty_content() {
    let mut timeline = EntranceTimeline::new(&HeroContent::default(), None);
    assert!(timeline.letters().is_empty());
    timeline.mount(0.0, &mut SequenceSource::constant(0.0));
    assert!((timeline.duration() - 2.0 * SEGMENT_DURATION).abs() < 1e-4);
}
