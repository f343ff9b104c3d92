//! Single-property tweens.
//!
//! A [`Tween`] maps elapsed seconds (relative to its own start) to a value
//! between `from` and `to`. Tweens are pure: they hold no clock and no
//! reference to their target, so the owner samples and applies them.

use glam::Vec3;

use crate::easing::Easing;

/// Values that can be blended by a tween.
///
/// `t` is eased progress and may fall outside `[0, 1]` for overshooting
/// curves, so implementations must extrapolate rather than clamp.
pub trait Interpolate: Copy {
    fn interpolate(from: Self, to: Self, t: f32) -> Self;
}

impl Interpolate for f32 {
    fn interpolate(from: Self, to: Self, t: f32) -> Self {
        from + (to - from) * t
    }
}

impl Interpolate for Vec3 {
    fn interpolate(from: Self, to: Self, t: f32) -> Self {
        from + (to - from) * t
    }
}

/// A from → to animation with optional delay and yoyo.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tween<T> {
    pub from: T,
    pub to: T,
    /// Seconds before the tween starts moving. `from` is held meanwhile.
    pub delay: f32,
    /// Seconds for one forward pass.
    pub duration: f32,
    pub easing: Easing,
    /// Play forward, then once in reverse back to `from`.
    pub yoyo: bool,
}

impl<T: Interpolate> Tween<T> {
    pub fn new(from: T, to: T, duration: f32) -> Self {
        Self {
            from,
            to,
            delay: 0.0,
            duration,
            easing: Easing::default(),
            yoyo: false,
        }
    }

    pub fn with_delay(mut self, delay: f32) -> Self {
        self.delay = delay.max(0.0);
        self
    }

    pub fn with_easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }

    pub fn with_yoyo(mut self, yoyo: bool) -> Self {
        self.yoyo = yoyo;
        self
    }

    /// Delay plus every pass.
    pub fn total_duration(&self) -> f32 {
        let passes = if self.yoyo { 2.0 } else { 1.0 };
        self.delay + self.duration.max(0.0) * passes
    }

    pub fn is_complete(&self, elapsed: f32) -> bool {
        elapsed >= self.total_duration()
    }

    /// Value after `elapsed` seconds since the tween was started.
    pub fn value_at(&self, elapsed: f32) -> T {
        let local = elapsed - self.delay;
        if local <= 0.0 {
            return self.from;
        }
        if self.duration <= 0.0 {
            return if self.yoyo { self.from } else { self.to };
        }

        let progress = if !self.yoyo || local <= self.duration {
            (local / self.duration).min(1.0)
        } else {
            // The reverse pass replays the forward curve backwards.
            (1.0 - (local - self.duration) / self.duration).max(0.0)
        };
        T::interpolate(self.from, self.to, self.easing.apply(progress))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_tween() {
        let tween = Tween::new(0.0_f32, 10.0, 2.0).with_easing(Easing::Linear);
        assert_eq!(tween.value_at(0.0), 0.0);
        assert_eq!(tween.value_at(1.0), 5.0);
        assert_eq!(tween.value_at(2.0), 10.0);
        assert_eq!(tween.value_at(5.0), 10.0);
        assert!(tween.is_complete(2.0));
    }

    #[test]
    fn test_delay_holds_from_value() {
        let tween = Tween::new(Vec3::ZERO, Vec3::ONE, 1.0)
            .with_delay(0.5)
            .with_easing(Easing::Linear);
        assert_eq!(tween.value_at(0.25), Vec3::ZERO);
        assert_eq!(tween.value_at(1.0), Vec3::splat(0.5));
        assert_eq!(tween.total_duration(), 1.5);
    }

    #[test]
    fn test_yoyo_returns_to_start() {
        let tween = Tween::new(1.0_f32, 3.0, 1.3)
            .with_easing(Easing::ELASTIC_OUT)
            .with_yoyo(true);
        assert_eq!(tween.value_at(1.3), 3.0);
        assert_eq!(tween.value_at(2.6), 1.0);
        assert_eq!(tween.value_at(10.0), 1.0);
        assert!((tween.total_duration() - 2.6).abs() < 1e-6);
    }

    #[test]
    fn test_zero_duration_jumps() {
        let tween = Tween::new(0.0_f32, 4.0, 0.0);
        assert_eq!(tween.value_at(0.1), 4.0);
    }
}
