//! The background particle field.
//!
//! A fixed point cloud: positions and colours are drawn once when the field is
//! created, then positions drift by a small closed-form perturbation every
//! frame. There is no spawning, no lifetime and no physics.

use crate::material::PointsMaterial;
use crate::random::RandomSource;

/// Default number of points.
pub const DEFAULT_PARTICLE_COUNT: usize = 5000;
/// Default edge length of the cube the points are scattered in.
pub const DEFAULT_PARTICLE_EXTENT: f32 = 200.0;

/// Per-frame drift parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DriftParams {
    /// Angular speed applied to wall-clock seconds.
    pub frequency: f64,
    /// Displacement per frame.
    pub amplitude: f64,
}

impl Default for DriftParams {
    fn default() -> Self {
        Self {
            frequency: 1.0,
            amplitude: 0.01,
        }
    }
}

/// A point cloud with parallel position and colour buffers.
#[derive(Clone, Debug)]
pub struct ParticleField {
    /// Interleaved xyz, `count * 3` floats.
    positions: Vec<f32>,
    /// Interleaved rgb, `count * 3` floats.
    colors: Vec<f32>,
    /// Rendering parameters.
    pub material: PointsMaterial,
    pub drift: DriftParams,
    /// Whether the field is drawn.
    pub visible: bool,
    updates: u64,
}

impl ParticleField {
    /// Scatter `count` points uniformly in a cube of edge `extent` centred on
    /// the origin, each with a uniform random colour.
    pub fn new(count: usize, extent: f32, rng: &mut dyn RandomSource) -> Self {
        let mut positions = Vec::with_capacity(count * 3);
        let mut colors = Vec::with_capacity(count * 3);

        for _ in 0..count {
            for _ in 0..3 {
                positions.push((rng.next_unit() - 0.5) * extent);
            }
            for _ in 0..3 {
                colors.push(rng.next_unit());
            }
        }

        Self {
            positions,
            colors,
            material: PointsMaterial::default(),
            drift: DriftParams::default(),
            visible: true,
            updates: 0,
        }
    }

    /// Advance every point for wall-clock time `t_secs`.
    ///
    /// x += sin(t·f + i)·a and y += cos(t·f + i)·a; z never moves.
    pub fn update(&mut self, t_secs: f64) {
        let DriftParams {
            frequency,
            amplitude,
        } = self.drift;
        let phase = t_secs * frequency;

        for (i, p) in self.positions.chunks_exact_mut(3).enumerate() {
            let arg = phase + i as f64;
            p[0] = (p[0] as f64 + arg.sin() * amplitude) as f32;
            p[1] = (p[1] as f64 + arg.cos() * amplitude) as f32;
        }
        self.updates += 1;
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.positions.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn positions(&self) -> &[f32] {
        &self.positions
    }

    pub fn colors(&self) -> &[f32] {
        &self.colors
    }

    /// How many times [`update`](Self::update) has run.
    pub fn update_count(&self) -> u64 {
        self.updates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::{SequenceSource, SmallRngSource};

    #[test]
    fn test_buffers_have_three_floats_per_point() {
        let mut rng = SmallRngSource::seeded(1);
        let field = ParticleField::new(DEFAULT_PARTICLE_COUNT, DEFAULT_PARTICLE_EXTENT, &mut rng);
        assert_eq!(field.len(), 5000);
        assert_eq!(field.positions().len(), 15000);
        assert_eq!(field.colors().len(), 15000);
    }

    #[test]
    fn test_values_stay_in_range() {
        let mut rng = SmallRngSource::seeded(99);
        let field = ParticleField::new(DEFAULT_PARTICLE_COUNT, DEFAULT_PARTICLE_EXTENT, &mut rng);
        assert!(field.positions().iter().all(|&p| (-100.0..100.0).contains(&p)));
        assert!(field.colors().iter().all(|&c| (0.0..1.0).contains(&c)));
    }

    #[test]
    fn test_draw_order_is_position_then_colour() {
        let mut rng = SequenceSource::new(vec![0.0, 0.25, 0.5, 0.1, 0.2, 0.3]);
        let field = ParticleField::new(1, 200.0, &mut rng);
        assert_eq!(field.positions(), &[-100.0, -50.0, 0.0]);
        assert_eq!(field.colors(), &[0.1, 0.2, 0.3]);
    }

    #[test]
    fn test_update_matches_closed_form() {
        let mut rng = SmallRngSource::seeded(3);
        let mut field = ParticleField::new(10, 200.0, &mut rng);
        let before = field.positions().to_vec();

        let t = 12.5;
        field.update(t);

        for i in 0..10 {
            let arg = t + i as f64;
            let dx = field.positions()[i * 3] as f64 - before[i * 3] as f64;
            let dy = field.positions()[i * 3 + 1] as f64 - before[i * 3 + 1] as f64;
            assert!((dx - arg.sin() * 0.01).abs() < 1e-4);
            assert!((dy - arg.cos() * 0.01).abs() < 1e-4);
            assert_eq!(field.positions()[i * 3 + 2], before[i * 3 + 2]);
        }
        assert_eq!(field.update_count(), 1);
    }

    #[test]
    fn test_empty_field() {
        let mut rng = SequenceSource::constant(0.5);
        let mut field = ParticleField::new(0, 200.0, &mut rng);
        field.update(1.0);
        assert!(field.is_empty());
        assert_eq!(rng.draws(), 0);
    }
}
