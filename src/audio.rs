//! Click sounds.
//!
//! A [`SoundPool`] holds the preloaded clips; the scene picks one uniformly
//! at random per click and hands it to an [`AudioOutput`]. Playback is a
//! host capability: the wasm host plays through the browser, native hosts
//! log (or record, in tests).

use std::cell::RefCell;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::random::RandomSource;

/// One preloaded sound.
#[derive(Clone, Debug, PartialEq)]
pub struct SoundClip {
    /// File stem, e.g. `knock2`.
    pub name: String,
    /// Where the clip came from (file path or URL).
    pub source: String,
    /// Encoded audio bytes; empty when the host streams from `source`.
    pub bytes: Arc<[u8]>,
}

impl SoundClip {
    pub fn new(source: impl Into<String>, bytes: Vec<u8>) -> Self {
        let source = source.into();
        let name = Path::new(&source)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| source.clone());
        Self {
            name,
            source,
            bytes: bytes.into(),
        }
    }
}

/// Ordered, read-only set of clips.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SoundPool {
    clips: Vec<SoundClip>,
}

impl SoundPool {
    pub fn new(clips: Vec<SoundClip>) -> Self {
        Self { clips }
    }

    /// Read every file in `paths`, in order.
    pub fn load<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        let mut clips = Vec::with_capacity(paths.len());
        for path in paths {
            let path = path.as_ref();
            let bytes = std::fs::read(path)
                .with_context(|| format!("failed to read sound '{}'", path.display()))?;
            clips.push(SoundClip::new(path.to_string_lossy(), bytes));
        }
        log::info!("Loaded {} sound clips", clips.len());
        Ok(Self { clips })
    }

    /// Clips the host fetches itself (browser audio elements).
    pub fn from_sources<S: AsRef<str>>(sources: &[S]) -> Self {
        Self {
            clips: sources
                .iter()
                .map(|s| SoundClip::new(s.as_ref(), Vec::new()))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    pub fn clips(&self) -> &[SoundClip] {
        &self.clips
    }

    /// Uniform random choice with replacement.
    pub fn pick(&self, rng: &mut dyn RandomSource) -> Option<&SoundClip> {
        if self.clips.is_empty() {
            return None;
        }
        self.clips.get(rng.pick_index(self.clips.len()))
    }
}

/// Why a clip could not be played.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PlaybackError {
    /// The host refused or failed to start playback.
    Backend(String),
}

impl fmt::Display for PlaybackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaybackError::Backend(msg) => write!(f, "audio backend error: {}", msg),
        }
    }
}

impl std::error::Error for PlaybackError {}

/// Host capability that plays a clip, fire-and-forget.
pub trait AudioOutput {
    fn play(&self, clip: &SoundClip) -> Result<(), PlaybackError>;
}

/// Native output without an audio device: logs each request.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogAudioOutput;

impl AudioOutput for LogAudioOutput {
    fn play(&self, clip: &SoundClip) -> Result<(), PlaybackError> {
        log::debug!("Playing sound '{}' ({} bytes)", clip.name, clip.bytes.len());
        Ok(())
    }
}

/// Records clip names; optionally fails every request.
#[derive(Debug, Default)]
pub struct RecordingAudioOutput {
    played: RefCell<Vec<String>>,
    fail_with: Option<String>,
}

impl RecordingAudioOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// An output whose every `play` fails with a backend error.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            played: RefCell::new(Vec::new()),
            fail_with: Some(message.into()),
        }
    }

    /// Names of the clips requested so far, including failed requests.
    pub fn played(&self) -> Vec<String> {
        self.played.borrow().clone()
    }

    pub fn play_count(&self) -> usize {
        self.played.borrow().len()
    }
}

impl AudioOutput for RecordingAudioOutput {
    fn play(&self, clip: &SoundClip) -> Result<(), PlaybackError> {
        self.played.borrow_mut().push(clip.name.clone());
        match &self.fail_with {
            Some(msg) => Err(PlaybackError::Backend(msg.clone())),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::SequenceSource;

    fn knocks() -> SoundPool {
        SoundPool::from_sources(&[
            "assets/sounds/knock1.wav",
            "assets/sounds/knock2.wav",
            "assets/sounds/knock3.wav",
        ])
    }

    #[test]
    fn test_clip_name_is_file_stem() {
        let clip = SoundClip::new("assets/sounds/knock2.wav", vec![1, 2, 3]);
        assert_eq!(clip.name, "knock2");
        assert_eq!(clip.bytes.len(), 3);
    }

    #[test]
    fn test_pick_is_uniform_over_pool() {
        let pool = knocks();
        let mut rng = SequenceSource::new(vec![0.0, 0.4, 0.9]);
        let names: Vec<String> = (0..3)
            .map(|_| pool.pick(&mut rng).unwrap().name.clone())
            .collect();
        assert_eq!(names, vec!["knock1", "knock2", "knock3"]);
    }

    #[test]
    fn test_empty_pool_picks_nothing() {
        let pool = SoundPool::default();
        let mut rng = SequenceSource::constant(0.5);
        assert!(pool.pick(&mut rng).is_none());
        assert_eq!(rng.draws(), 0);
    }

    #[test]
    fn test_load_missing_file_fails() {
        let err = SoundPool::load(&["no/such/knock.wav"]).unwrap_err();
        assert!(format!("{:#}", err).contains("no/such/knock.wav"));
    }

    #[test]
    fn test_recording_output() {
        let pool = knocks();
        let output = RecordingAudioOutput::new();
        output.play(&pool.clips()[1]).unwrap();
        assert_eq!(output.played(), vec!["knock2"]);

        let failing = RecordingAudioOutput::failing("device busy");
        let err = failing.play(&pool.clips()[0]).unwrap_err();
        assert_eq!(err.to_string(), "audio backend error: device busy");
        assert_eq!(failing.play_count(), 1);
    }
}
