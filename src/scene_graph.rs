//! Transforms and instance identity for the scene's fixed node hierarchy.
//!
//! Every model instance is a three-level chain: an outer group (layout
//! position, entrance scale), a float node (idle bobbing) and the mesh itself
//! (base orientation, click rotation, geometric scale).

use glam::{EulerRot, Mat4, Quat, Vec3};
use serde::Serialize;

/// Identity of a model instance: its index in the composed layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct InstanceId(pub usize);

impl std::fmt::Display for InstanceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Transform component for scene nodes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Vec3, // Euler angles in radians
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    /// Model = Translation * Rotation (Euler XYZ) * Scale
    pub fn matrix(&self) -> Mat4 {
        let rotation = Quat::from_euler(
            EulerRot::XYZ,
            self.rotation.x,
            self.rotation.y,
            self.rotation.z,
        );
        Mat4::from_scale_rotation_translation(self.scale, rotation, self.position)
    }
}

/// The group → float → mesh chain of one model instance.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ModelNodes {
    pub group: Transform,
    pub float: Transform,
    pub mesh: Transform,
}

impl ModelNodes {
    /// World = Group * Float * Mesh
    pub fn world_matrix(&self) -> Mat4 {
        self.group.matrix() * self.float.matrix() * self.mesh.matrix()
    }

    /// World-space origin of the mesh.
    pub fn world_origin(&self) -> Vec3 {
        self.world_matrix().transform_point3(Vec3::ZERO)
    }

    /// Largest axis scale applied to the mesh, for conservative bounds.
    pub fn max_world_scale(&self) -> f32 {
        let s = self.group.scale * self.float.scale * self.mesh.scale;
        s.abs().max_element()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_transform_is_identity() {
        assert_eq!(Transform::default().matrix(), Mat4::IDENTITY);
    }

    #[test]
    fn test_world_matrix_chains_nodes() {
        let nodes = ModelNodes {
            group: Transform::from_position(Vec3::new(2.0, 0.0, 0.0)),
            float: Transform::from_position(Vec3::new(0.0, 0.5, 0.0)),
            mesh: Transform {
                scale: Vec3::splat(3.0),
                ..Transform::default()
            },
        };
        let origin = nodes.world_origin();
        assert!((origin - Vec3::new(2.0, 0.5, 0.0)).length() < 1e-6);
        assert_eq!(nodes.max_world_scale(), 3.0);
    }

    #[test]
    fn test_group_scale_collapses_mesh() {
        let nodes = ModelNodes {
            group: Transform {
                scale: Vec3::ZERO,
                ..Transform::default()
            },
            ..ModelNodes::default()
        };
        assert_eq!(nodes.max_world_scale(), 0.0);
    }
}
