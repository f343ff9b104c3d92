//! The fixed model layout and its composition into scene instances.

use std::f32::consts::FRAC_PI_2;
use std::sync::{Arc, OnceLock};

use glam::Vec3;
use serde::Serialize;

use crate::material::MaterialPalette;
use crate::scene_graph::InstanceId;

/// Layout positions are authored at half the scene scale.
pub const POSITION_SCALE: f32 = 2.0;

/// The two clickable model kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum ModelVariant {
    /// Ring-shaped model, three colours.
    PrimaryModel,
    /// Flat cylinder, two colours.
    SecondaryModel,
}

impl ModelVariant {
    /// Sub-mesh name inside the variant's model file.
    pub fn mesh_name(self) -> &'static str {
        match self {
            ModelVariant::PrimaryModel => "Circle011",
            ModelVariant::SecondaryModel => "Cylinder005",
        }
    }

    /// Orientation applied to the mesh before any animation.
    pub fn base_rotation(self) -> Vec3 {
        match self {
            ModelVariant::PrimaryModel => Vec3::new(FRAC_PI_2, 0.0, 0.0),
            ModelVariant::SecondaryModel => Vec3::ZERO,
        }
    }

    /// The variant's palette. Every call returns the same shared instance.
    pub fn palette(self) -> Arc<MaterialPalette> {
        static PRIMARY: OnceLock<Arc<MaterialPalette>> = OnceLock::new();
        static SECONDARY: OnceLock<Arc<MaterialPalette>> = OnceLock::new();
        let cell = match self {
            ModelVariant::PrimaryModel => &PRIMARY,
            ModelVariant::SecondaryModel => &SECONDARY,
        };
        cell.get_or_init(|| {
            Arc::new(match self {
                ModelVariant::PrimaryModel => MaterialPalette::primary(),
                ModelVariant::SecondaryModel => MaterialPalette::secondary(),
            })
        })
        .clone()
    }
}

/// One authored entry of the layout.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ModelPlacement {
    pub variant: ModelVariant,
    pub position: Vec3,
    /// Motion intensity; drives float speed and amplitude.
    pub r: f32,
    pub scale: Vec3,
}

impl ModelPlacement {
    pub const fn new(variant: ModelVariant, position: Vec3, r: f32, scale: Vec3) -> Self {
        Self {
            variant,
            position,
            r,
            scale,
        }
    }
}

/// The five models of the hero scene, in draw and colour-assignment order.
pub fn reference_layout() -> Vec<ModelPlacement> {
    use ModelVariant::*;
    vec![
        ModelPlacement::new(SecondaryModel, Vec3::new(0.0, 0.0, 0.0), 0.5, Vec3::new(1.5, 0.4, 1.5)),
        ModelPlacement::new(PrimaryModel, Vec3::new(1.0, -0.75, 4.0), 0.4, Vec3::new(1.0, 1.0, 1.0)),
        ModelPlacement::new(PrimaryModel, Vec3::new(-1.4, 2.0, -4.0), 0.6, Vec3::new(1.5, 1.5, 1.5)),
        ModelPlacement::new(SecondaryModel, Vec3::new(-0.8, -0.75, 5.0), 0.5, Vec3::new(1.2, 0.4, 1.2)),
        ModelPlacement::new(PrimaryModel, Vec3::new(1.6, 1.6, -4.0), 0.7, Vec3::new(1.5, 1.5, 1.5)),
    ]
}

/// A layout entry placed in the scene.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ComposedInstance {
    pub id: InstanceId,
    pub variant: ModelVariant,
    /// Scene-space position (authored position × 2).
    pub position: Vec3,
    pub r: f32,
    pub scale: Vec3,
    pub initial_material_index: usize,
}

/// Place every layout entry and assign starting colours.
///
/// Primary models take the next colour of their palette in the order they
/// appear; secondary models alternate by overall position.
pub fn compose(placements: &[ModelPlacement]) -> Vec<ComposedInstance> {
    let primary_len = ModelVariant::PrimaryModel.palette().len();
    let secondary_len = ModelVariant::SecondaryModel.palette().len();
    let mut primaries_seen = 0usize;

    placements
        .iter()
        .enumerate()
        .map(|(index, placement)| {
            let initial_material_index = match placement.variant {
                ModelVariant::PrimaryModel => {
                    let i = primaries_seen % primary_len;
                    primaries_seen += 1;
                    i
                }
                ModelVariant::SecondaryModel => index % secondary_len,
            };
            ComposedInstance {
                id: InstanceId(index),
                variant: placement.variant,
                position: placement.position * POSITION_SCALE,
                r: placement.r,
                scale: placement.scale,
                initial_material_index,
            }
        })
        .collect()
}
