//! Ray casting for pointer interaction.
//!
//! Each pickable instance is approximated by a bounding sphere; the nearest
//! hit along the ray wins.

use glam::Vec3;

use crate::scene_graph::InstanceId;

/// A half-line with a normalized direction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    /// `direction` is normalized here; a zero direction stays zero and never hits.
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }

    pub fn at(&self, distance: f32) -> Vec3 {
        self.origin + self.direction * distance
    }

    /// Distance to the first intersection with a sphere, if any.
    ///
    /// A ray starting inside the sphere hits at distance 0.
    pub fn intersect_sphere(&self, center: Vec3, radius: f32) -> Option<f32> {
        if self.direction == Vec3::ZERO || radius <= 0.0 {
            return None;
        }
        let oc = self.origin - center;
        let b = oc.dot(self.direction);
        let c = oc.length_squared() - radius * radius;
        if c <= 0.0 {
            return Some(0.0);
        }
        let discriminant = b * b - c;
        if discriminant < 0.0 {
            return None;
        }
        let t = -b - discriminant.sqrt();
        (t >= 0.0).then_some(t)
    }
}

/// A pickable sphere.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PickTarget {
    pub id: InstanceId,
    pub center: Vec3,
    pub radius: f32,
}

/// A ray hit.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PickHit {
    pub id: InstanceId,
    pub distance: f32,
}

/// The nearest target hit by `ray`.
pub fn pick_nearest(ray: &Ray, targets: impl IntoIterator<Item = PickTarget>) -> Option<PickHit> {
    targets
        .into_iter()
        .filter_map(|target| {
            ray.intersect_sphere(target.center, target.radius)
                .map(|distance| PickHit {
                    id: target.id,
                    distance,
                })
        })
        .min_by(|a, b| a.distance.total_cmp(&b.distance))
}
