//! Easing curves for tweens.
//!
//! Progress `t` is clamped to `[0, 1]` before evaluation. Curves may overshoot
//! (elastic), so callers must not clamp the eased value.

use std::f32::consts::TAU;

/// Easing function applied to normalised tween progress.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Easing {
    /// Linear interpolation.
    Linear,
    /// Quadratic ease-out. The default ease for plain opacity fades.
    #[default]
    QuadraticOut,
    /// Elastic ease-out: overshoots and settles on the target.
    ///
    /// `amplitude` below 1 is treated as 1; `period` is the oscillation
    /// period in normalised time.
    ElasticOut { amplitude: f32, period: f32 },
}

impl Easing {
    /// The bouncy curve used by every model and hero entrance.
    pub const ELASTIC_OUT: Easing = Easing::ElasticOut {
        amplitude: 1.0,
        period: 0.3,
    };

    pub fn apply(&self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match *self {
            Easing::Linear => t,
            Easing::QuadraticOut => t * (2.0 - t),
            Easing::ElasticOut { amplitude, period } => {
                if t == 0.0 || t == 1.0 {
                    return t;
                }
                let a = amplitude.max(1.0);
                let p = period / amplitude.min(1.0).max(f32::EPSILON);
                let s = p / TAU * (1.0 / a).asin();
                a * (2.0_f32).powf(-10.0 * t) * ((t - s) * TAU / p).sin() + 1.0
            }
        }
    }
}
