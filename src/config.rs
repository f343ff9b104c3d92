//! Scene configuration.
//!
//! Every field has a default, so a config file only needs the keys it
//! changes. The model layout itself is fixed and not configurable.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::camera::CameraConfig;
use crate::composer::ModelVariant;
use crate::lighting::{ContactShadowSettings, EnvironmentPreset};
use crate::particle::{DEFAULT_PARTICLE_COUNT, DEFAULT_PARTICLE_EXTENT};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParticleSettings {
    pub count: usize,
    /// Edge length of the cube the points are scattered in.
    pub extent: f32,
}

impl Default for ParticleSettings {
    fn default() -> Self {
        Self {
            count: DEFAULT_PARTICLE_COUNT,
            extent: DEFAULT_PARTICLE_EXTENT,
        }
    }
}

/// Rendering surface settings.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceSettings {
    /// Device pixel ratio is clamped into `[dpr_min, dpr_max]`.
    pub dpr_min: f32,
    pub dpr_max: f32,
    /// 1 disables antialiasing.
    pub msaa_samples: u32,
    pub shadows: bool,
    /// Linear RGBA.
    pub clear_color: [f32; 4],
}

impl Default for SurfaceSettings {
    fn default() -> Self {
        Self {
            dpr_min: 1.0,
            dpr_max: 1.5,
            msaa_samples: 4,
            shadows: true,
            clear_color: [0.0, 0.0, 0.0, 0.0],
        }
    }
}

impl SurfaceSettings {
    pub fn device_pixel_ratio(&self, native: f64) -> f64 {
        native.clamp(self.dpr_min as f64, self.dpr_max.max(self.dpr_min) as f64)
    }
}

/// Model file per variant.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelPaths {
    pub primary: String,
    pub secondary: String,
}

impl Default for ModelPaths {
    fn default() -> Self {
        Self {
            primary: "assets/models/phile.obj".to_string(),
            secondary: "assets/models/phile2.obj".to_string(),
        }
    }
}

impl ModelPaths {
    pub fn for_variant(&self, variant: ModelVariant) -> &str {
        match variant {
            ModelVariant::PrimaryModel => &self.primary,
            ModelVariant::SecondaryModel => &self.secondary,
        }
    }
}

/// Loading overlay in front of the hero block.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadingGateSettings {
    pub enabled: bool,
    /// Seconds the overlay stays fully opaque.
    pub hold_secs: f32,
    /// Seconds of the cross-fade.
    pub fade_secs: f32,
}

impl Default for LoadingGateSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            hold_secs: 2.0,
            fade_secs: 0.5,
        }
    }
}

impl LoadingGateSettings {
    /// These settings, or None when the overlay is switched off.
    pub fn active(&self) -> Option<&Self> {
        self.enabled.then_some(self)
    }
}

/// Everything tunable about the scene.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub particles: ParticleSettings,
    pub camera: CameraConfig,
    pub surface: SurfaceSettings,
    pub environment: EnvironmentPreset,
    pub contact_shadows: ContactShadowSettings,
    pub models: ModelPaths,
    pub sounds: Vec<String>,
    pub loading_gate: LoadingGateSettings,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            particles: ParticleSettings::default(),
            camera: CameraConfig::default(),
            surface: SurfaceSettings::default(),
            environment: EnvironmentPreset::default(),
            contact_shadows: ContactShadowSettings::default(),
            models: ModelPaths::default(),
            sounds: (1..=3)
                .map(|i| format!("assets/sounds/knock{}.wav", i))
                .collect(),
            loading_gate: LoadingGateSettings::default(),
        }
    }
}

impl SceneConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("invalid scene config")
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config '{}'", path.display()))?;
        Self::from_json_str(&json).with_context(|| format!("in '{}'", path.display()))
    }

    /// Prefix every relative asset path with `root`.
    pub fn with_asset_root(mut self, root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        let rebase = |p: &mut String| {
            if Path::new(p.as_str()).is_relative() {
                *p = root.join(p.as_str()).to_string_lossy().into_owned();
            }
        };
        rebase(&mut self.models.primary);
        rebase(&mut self.models.secondary);
        self.sounds.iter_mut().for_each(rebase);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn test_defaults() {
        let config = SceneConfig::default();
        assert_eq!(config.particles.count, 5000);
        assert_eq!(config.camera.position, Vec3::new(0.0, 0.0, 25.0));
        assert_eq!(config.contact_shadows.opacity, 0.65);
        assert_eq!(config.environment, EnvironmentPreset::Apartment);
        assert_eq!(config.sounds[2], "assets/sounds/knock3.wav");
        assert!(config.loading_gate.enabled);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config =
            SceneConfig::from_json_str(r#"{ "particles": { "count": 10 }, "environment": "studio" }"#)
                .unwrap();
        assert_eq!(config.particles.count, 10);
        assert_eq!(config.particles.extent, 200.0);
        assert_eq!(config.environment, EnvironmentPreset::Studio);
        assert_eq!(config.camera.fov, 30.0);
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        assert!(SceneConfig::from_json_str("{ \"particles\": 3 }").is_err());
        assert!(SceneConfig::from_json_file("missing/config.json").is_err());
    }

    #[test]
    fn test_disabled_gate_is_inactive() {
        let config = SceneConfig::from_json_str(
            r#"{ "loading_gate": { "enabled": false, "hold_secs": 1.0 } }"#,
        )
        .unwrap();
        assert_eq!(config.loading_gate.hold_secs, 1.0);
        assert!(config.loading_gate.active().is_none());
        assert!(SceneConfig::default().loading_gate.active().is_some());
    }

    #[test]
    fn test_dpr_clamp() {
        let surface = SurfaceSettings::default();
        assert_eq!(surface.device_pixel_ratio(0.5), 1.0);
        assert_eq!(surface.device_pixel_ratio(1.25), 1.25);
        assert_eq!(surface.device_pixel_ratio(3.0), 1.5);
    }

    #[test]
    fn test_asset_root() {
        let config = SceneConfig::default().with_asset_root("/srv/hero");
        assert_eq!(config.models.primary, "/srv/hero/assets/models/phile.obj");
        assert_eq!(config.sounds[0], "/srv/hero/assets/sounds/knock1.wav");
        assert_eq!(config.models.for_variant(ModelVariant::SecondaryModel), "/srv/hero/assets/models/phile2.obj");
    }
}
