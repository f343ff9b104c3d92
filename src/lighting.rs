//! Environment light rigs and contact shadows.
//!
//! An environment preset is a small stylised rig rather than image-based
//! lighting:
//! - a key light (direction, colour, intensity)
//! - a fill light from the opposite side
//! - an ambient term
//! - a rim term (view-normal based edge highlighting)
//!
//! Contact shadows are soft blobs on a horizontal plane below the models,
//! fading with the caster's height above the plane.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Named light rig.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvironmentPreset {
    /// Warm interior key light with a cool window fill.
    #[default]
    Apartment,
    /// Neutral white key and fill.
    Studio,
    /// Low orange key with a purple fill.
    Sunset,
}

/// One directional light.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DirectionalLight {
    /// Points FROM the light source.
    pub direction: Vec3,
    /// Linear RGB.
    pub color: Vec3,
    pub intensity: f32,
}

/// An evaluated light rig.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LightingConfig {
    pub key: DirectionalLight,
    pub fill: DirectionalLight,
    /// Ambient light (linear RGB, pre-multiplied by intensity).
    pub ambient: Vec3,
    /// Rim lighting intensity.
    pub rim_intensity: f32,
    /// Rim lighting power (higher = sharper rim effect).
    pub rim_power: f32,
}

impl LightingConfig {
    pub fn from_preset(preset: EnvironmentPreset) -> Self {
        match preset {
            EnvironmentPreset::Apartment => Self {
                key: DirectionalLight {
                    direction: Vec3::new(-0.4, -0.8, -0.45),
                    color: Vec3::new(1.0, 0.86, 0.72),
                    intensity: 1.2,
                },
                fill: DirectionalLight {
                    direction: Vec3::new(0.6, -0.2, -0.5),
                    color: Vec3::new(0.62, 0.74, 1.0),
                    intensity: 0.45,
                },
                ambient: Vec3::new(0.32, 0.3, 0.28),
                rim_intensity: 0.35,
                rim_power: 3.0,
            },
            EnvironmentPreset::Studio => Self {
                key: DirectionalLight {
                    direction: Vec3::new(-0.3, -1.0, -0.5),
                    color: Vec3::ONE,
                    intensity: 1.0,
                },
                fill: DirectionalLight {
                    direction: Vec3::new(0.5, -0.3, -0.6),
                    color: Vec3::ONE,
                    intensity: 0.5,
                },
                ambient: Vec3::splat(0.3),
                rim_intensity: 0.2,
                rim_power: 2.0,
            },
            EnvironmentPreset::Sunset => Self {
                key: DirectionalLight {
                    direction: Vec3::new(-0.9, -0.25, -0.3),
                    color: Vec3::new(1.0, 0.55, 0.3),
                    intensity: 1.3,
                },
                fill: DirectionalLight {
                    direction: Vec3::new(0.7, -0.4, -0.4),
                    color: Vec3::new(0.55, 0.4, 0.8),
                    intensity: 0.4,
                },
                ambient: Vec3::new(0.25, 0.2, 0.25),
                rim_intensity: 0.5,
                rim_power: 2.5,
            },
        }
    }

    /// Produce GPU-ready uniforms. Directions are normalized here.
    pub fn to_uniforms(&self) -> LightingUniforms {
        LightingUniforms {
            key_direction: normalized_direction(self.key.direction),
            key_color: (self.key.color * self.key.intensity).extend(1.0).to_array(),
            fill_direction: normalized_direction(self.fill.direction),
            fill_color: (self.fill.color * self.fill.intensity).extend(1.0).to_array(),
            ambient: self.ambient.extend(1.0).to_array(),
            rim_intensity: self.rim_intensity,
            rim_power: self.rim_power,
            _padding: [0.0; 2],
        }
    }
}

impl Default for LightingConfig {
    fn default() -> Self {
        Self::from_preset(EnvironmentPreset::default())
    }
}

fn normalized_direction(dir: Vec3) -> [f32; 4] {
    if dir.length() > 0.001 {
        dir.normalize().extend(0.0).to_array()
    } else {
        // Fallback to down direction
        [0.0, -1.0, 0.0, 0.0]
    }
}

/// GPU-ready lighting uniforms.
///
/// Total size: 96 bytes (16-byte aligned).
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, Pod, Zeroable)]
pub struct LightingUniforms {
    pub key_direction: [f32; 4],
    /// rgb × intensity.
    pub key_color: [f32; 4],
    pub fill_direction: [f32; 4],
    pub fill_color: [f32; 4],
    pub ambient: [f32; 4],
    pub rim_intensity: f32,
    pub rim_power: f32,
    pub _padding: [f32; 2],
}

/// Contact shadow plane settings.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContactShadowSettings {
    /// Centre of the shadow plane.
    pub position: Vec3,
    /// Darkness of a shadow cast from the plane itself.
    pub opacity: f32,
    /// Edge length of the square plane.
    pub scale: f32,
    /// Blur amount; blobs widen by this factor at the far distance.
    pub blur: f32,
    /// Casters higher than this above the plane cast nothing.
    pub far: f32,
}

impl Default for ContactShadowSettings {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, -3.5, 0.0),
            opacity: 0.65,
            scale: 40.0,
            blur: 1.0,
            far: 9.0,
        }
    }
}

/// A soft shadow disc on the contact plane.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ShadowBlob {
    /// Centre on the plane.
    pub center: Vec3,
    pub radius: f32,
    pub opacity: f32,
}

impl ContactShadowSettings {
    /// Shadow cast by a sphere of `radius` centred at `caster`, if any.
    pub fn blob_for(&self, caster: Vec3, radius: f32) -> Option<ShadowBlob> {
        let height = caster.y - self.position.y;
        if radius <= 0.0 || height < 0.0 || height > self.far || self.far <= 0.0 {
            return None;
        }
        let half = self.scale / 2.0;
        if (caster.x - self.position.x).abs() > half || (caster.z - self.position.z).abs() > half {
            return None;
        }

        let falloff = 1.0 - height / self.far;
        Some(ShadowBlob {
            center: Vec3::new(caster.x, self.position.y, caster.z),
            radius: radius * (1.0 + self.blur * (1.0 - falloff)),
            opacity: self.opacity * falloff,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniforms_size() {
        assert_eq!(std::mem::size_of::<LightingUniforms>(), 96);
    }

    #[test]
    fn test_direction_normalization() {
        let uniforms = LightingConfig::default().to_uniforms();
        let d = uniforms.key_direction;
        let len = (d[0] * d[0] + d[1] * d[1] + d[2] * d[2]).sqrt();
        assert!((len - 1.0).abs() < 1e-5);
        assert_eq!(d[3], 0.0);
    }

    #[test]
    fn test_preset_names_deserialize() {
        let preset: EnvironmentPreset = serde_json::from_str("\"apartment\"").unwrap();
        assert_eq!(preset, EnvironmentPreset::Apartment);
        assert!(serde_json::from_str::<EnvironmentPreset>("\"cave\"").is_err());
    }

    #[test]
    fn test_shadow_fades_with_height() {
        let shadows = ContactShadowSettings::default();
        let low = shadows.blob_for(Vec3::new(0.0, -3.0, 0.0), 1.0).unwrap();
        let high = shadows.blob_for(Vec3::new(0.0, 4.0, 0.0), 1.0).unwrap();
        assert!(low.opacity > high.opacity);
        assert!(high.radius > low.radius);
        assert_eq!(low.center.y, -3.5);
    }

    #[test]
    fn test_shadow_out_of_range() {
        let shadows = ContactShadowSettings::default();
        assert!(shadows.blob_for(Vec3::new(0.0, -4.0, 0.0), 1.0).is_none());
        assert!(shadows.blob_for(Vec3::new(0.0, 6.0, 0.0), 1.0).is_none());
        assert!(shadows.blob_for(Vec3::new(30.0, 0.0, 0.0), 1.0).is_none());
    }

    #[test]
    fn test_shadow_at_plane_uses_full_opacity() {
        let shadows = ContactShadowSettings::default();
        let blob = shadows.blob_for(Vec3::new(1.0, -3.5, 2.0), 2.0).unwrap();
        assert!((blob.opacity - 0.65).abs() < 1e-6);
        assert_eq!(blob.radius, 2.0);
    }
}
