//! Sequenced tweens and revertible animation sessions.
//!
//! A [`Timeline`] places tweens on a shared time axis. Segments are appended
//! back to back: a new segment starts where the previous one ends, and a
//! staggered segment offsets each target's start by a fixed interval.
//!
//! An [`AnimationSession`] is a started timeline plus a snapshot of every
//! target's pre-animation value. Its owner samples it each frame and calls
//! [`AnimationSession::revert`] on teardown to restore the snapshot; after a
//! revert the session yields nothing.

use std::collections::HashMap;
use std::hash::Hash;

use crate::random::RandomSource;
use crate::tween::{Interpolate, Tween};

/// Order in which staggered targets start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaggerOrder {
    /// Targets start in the order given.
    Sequential,
    /// Targets start in a random permutation.
    Random,
}

/// Per-target start offsets within one segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stagger {
    /// Seconds between consecutive starts.
    pub each: f32,
    pub order: StaggerOrder,
}

/// One tween bound to a target at an absolute start time.
#[derive(Debug, Clone, PartialEq)]
pub struct TimelineEntry<K, T> {
    pub target: K,
    pub start: f32,
    pub tween: Tween<T>,
}

impl<K, T: Interpolate> TimelineEntry<K, T> {
    pub fn end(&self) -> f32 {
        self.start + self.tween.total_duration()
    }
}

/// Tweens laid out on one time axis.
#[derive(Debug, Clone)]
pub struct Timeline<K, T> {
    entries: Vec<TimelineEntry<K, T>>,
    end: f32,
}

impl<K, T> Default for Timeline<K, T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            end: 0.0,
        }
    }
}

impl<K: Copy + Eq + Hash, T: Interpolate> Timeline<K, T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a segment in which every target runs `tween` at the same time.
    pub fn append(&mut self, targets: &[K], tween: Tween<T>) {
        let start = self.end;
        for &target in targets {
            self.push(target, start, tween);
        }
    }

    /// Append a segment whose targets start `stagger.each` seconds apart.
    pub fn append_staggered(
        &mut self,
        targets: &[K],
        tween: Tween<T>,
        stagger: Stagger,
        rng: &mut dyn RandomSource,
    ) {
        let start = self.end;
        let ranks: Vec<usize> = match stagger.order {
            StaggerOrder::Sequential => (0..targets.len()).collect(),
            StaggerOrder::Random => {
                let order = rng.shuffled_indices(targets.len());
                let mut ranks = vec![0; targets.len()];
                for (rank, &target_idx) in order.iter().enumerate() {
                    ranks[target_idx] = rank;
                }
                ranks
            }
        };
        for (&target, rank) in targets.iter().zip(ranks) {
            self.push(target, start + rank as f32 * stagger.each, tween);
        }
    }

    fn push(&mut self, target: K, start: f32, tween: Tween<T>) {
        let entry = TimelineEntry {
            target,
            start,
            tween,
        };
        self.end = self.end.max(entry.end());
        self.entries.push(entry);
    }

    /// Time at which the last tween finishes.
    pub fn duration(&self) -> f32 {
        self.end
    }

    pub fn entries(&self) -> &[TimelineEntry<K, T>] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Current value of every target.
    ///
    /// A target takes its value from its latest entry that has started. A
    /// target none of whose entries has started yet shows its first entry's
    /// `from` value, so start states render immediately.
    pub fn sample(&self, elapsed: f32) -> Vec<(K, T)> {
        let mut chosen: HashMap<K, usize> = HashMap::new();
        let mut order: Vec<K> = Vec::new();
        for (idx, entry) in self.entries.iter().enumerate() {
            match chosen.get(&entry.target) {
                None => {
                    order.push(entry.target);
                    chosen.insert(entry.target, idx);
                }
                Some(&current) => {
                    let current_started = self.entries[current].start <= elapsed;
                    let this_started = entry.start <= elapsed;
                    let replaces = if this_started {
                        !current_started || entry.start >= self.entries[current].start
                    } else {
                        false
                    };
                    if replaces {
                        chosen.insert(entry.target, idx);
                    }
                }
            }
        }

        order
            .into_iter()
            .filter_map(|target| {
                let entry = &self.entries[*chosen.get(&target)?];
                Some((target, entry.tween.value_at(elapsed - entry.start)))
            })
            .collect()
    }
}

/// Lifecycle of an [`AnimationSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Running,
    Reverted,
}

/// A started timeline that can be reverted exactly once.
#[derive(Debug, Clone)]
pub struct AnimationSession<K, T> {
    timeline: Timeline<K, T>,
    started_at: f64,
    originals: Vec<(K, T)>,
    state: SessionState,
}

impl<K: Copy + Eq + Hash, T: Interpolate> AnimationSession<K, T> {
    /// Start `timeline` at wall-clock `started_at`, remembering `originals`
    /// for [`revert`](Self::revert).
    pub fn start(timeline: Timeline<K, T>, started_at: f64, originals: Vec<(K, T)>) -> Self {
        Self {
            timeline,
            started_at,
            originals,
            state: SessionState::Running,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == SessionState::Running
    }

    pub fn timeline(&self) -> &Timeline<K, T> {
        &self.timeline
    }

    pub fn elapsed(&self, now: f64) -> f32 {
        (now - self.started_at).max(0.0) as f32
    }

    /// True once every tween has completed (or the session was reverted).
    pub fn is_finished(&self, now: f64) -> bool {
        !self.is_running() || self.elapsed(now) >= self.timeline.duration()
    }

    /// Values to apply at `now`; empty after a revert.
    pub fn sample(&self, now: f64) -> Vec<(K, T)> {
        if !self.is_running() {
            return Vec::new();
        }
        self.timeline.sample(self.elapsed(now))
    }

    /// Cancel the session and hand back the pre-animation values.
    ///
    /// Only the first call returns values; later calls return nothing.
    pub fn revert(&mut self) -> Vec<(K, T)> {
        if !self.is_running() {
            return Vec::new();
        }
        self.state = SessionState::Reverted;
        std::mem::take(&mut self.originals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::easing::Easing;
    use crate::random::SequenceSource;

    fn linear(from: f32, to: f32, duration: f32) -> Tween<f32> {
        Tween::new(from, to, duration).with_easing(Easing::Linear)
    }

    #[test]
    fn test_segments_run_back_to_back() {
        let mut timeline: Timeline<u8, f32> = Timeline::new();
        timeline.append(&[1], linear(0.0, 1.0, 1.0));
        timeline.append(&[2], linear(0.0, 1.0, 2.0));
        assert_eq!(timeline.entries()[1].start, 1.0);
        assert_eq!(timeline.duration(), 3.0);
    }

    #[test]
    fn test_sequential_stagger_offsets() {
        let mut timeline: Timeline<u8, f32> = Timeline::new();
        let mut rng = SequenceSource::constant(0.0);
        let stagger = Stagger {
            each: 0.1,
            order: StaggerOrder::Sequential,
        };
        timeline.append_staggered(&[0, 1, 2], linear(0.0, 1.0, 1.0).with_delay(0.5), stagger, &mut rng);
        let starts: Vec<f32> = timeline.entries().iter().map(|e| e.start).collect();
        assert_eq!(starts, vec![0.0, 0.1, 0.2]);
        assert!((timeline.duration() - 1.7).abs() < 1e-6);
    }

    #[test]
    fn test_random_stagger_uses_every_slot_once() {
        let mut timeline: Timeline<u8, f32> = Timeline::new();
        let mut rng = SequenceSource::new(vec![0.9, 0.1, 0.5, 0.3]);
        let stagger = Stagger {
            each: 0.1,
            order: StaggerOrder::Random,
        };
        timeline.append_staggered(&[0, 1, 2, 3, 4], linear(0.0, 1.0, 1.0), stagger, &mut rng);
        let mut slots: Vec<i32> = timeline
            .entries()
            .iter()
            .map(|e| (e.start * 10.0).round() as i32)
            .collect();
        slots.sort_unstable();
        assert_eq!(slots, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_sample_renders_start_state_immediately() {
        let mut timeline: Timeline<u8, f32> = Timeline::new();
        timeline.append(&[1], linear(0.0, 1.0, 1.0));
        timeline.append(&[2], linear(5.0, 6.0, 1.0));
        let values: HashMap<u8, f32> = timeline.sample(0.5).into_iter().collect();
        assert_eq!(values[&1], 0.5);
        assert_eq!(values[&2], 5.0);
    }

    #[test]
    fn test_later_entry_takes_over_target() {
        let mut timeline: Timeline<u8, f32> = Timeline::new();
        timeline.append(&[1], linear(0.0, 1.0, 1.0));
        timeline.append(&[1], linear(1.0, 3.0, 1.0));
        let early: HashMap<u8, f32> = timeline.sample(0.5).into_iter().collect();
        assert_eq!(early[&1], 0.5);
        let late: HashMap<u8, f32> = timeline.sample(1.5).into_iter().collect();
        assert_eq!(late[&1], 2.0);
    }

    #[test]
    fn test_session_revert_once() {
        let mut timeline: Timeline<u8, f32> = Timeline::new();
        timeline.append(&[1], linear(0.0, 1.0, 1.0));
        let mut session = AnimationSession::start(timeline, 100.0, vec![(1, 7.0)]);

        assert_eq!(session.sample(100.5), vec![(1, 0.5)]);
        assert!(!session.is_finished(100.5));
        assert_eq!(session.revert(), vec![(1, 7.0)]);
        assert!(session.revert().is_empty());
        assert!(session.sample(100.75).is_empty());
        assert!(session.is_finished(100.75));
    }
}
