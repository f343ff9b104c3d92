//! Model asset loading and caching.
//!
//! Model files are Wavefront OBJ. Each named object (`o`) or group (`g`) in a
//! file becomes one named sub-mesh, so a controller can ask for e.g.
//! `Circle011` out of `phile.obj`. Files are parsed once and cached; the scene
//! pre-warms every model it needs before its first frame.
//!
//! ## Normal Handling
//!
//! Provided normals are used when present. Normals are generated only when
//! missing, using area-weighted averaging of adjacent face normals.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};

use crate::gpu::mesh::Vertex;

/// Axis-aligned bounding box for a mesh.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BoundingBox {
    pub min: [f32; 3],
    pub max: [f32; 3],
}

impl BoundingBox {
    /// Compute bounding box from a set of vertices.
    pub fn from_vertices(vertices: &[Vertex]) -> Self {
        if vertices.is_empty() {
            return Self::default();
        }

        let mut min = [f32::MAX; 3];
        let mut max = [f32::MIN; 3];

        for v in vertices {
            for i in 0..3 {
                min[i] = min[i].min(v.position[i]);
                max[i] = max[i].max(v.position[i]);
            }
        }

        Self { min, max }
    }

    /// Get the center of the bounding box.
    pub fn center(&self) -> [f32; 3] {
        [
            (self.min[0] + self.max[0]) / 2.0,
            (self.min[1] + self.max[1]) / 2.0,
            (self.min[2] + self.max[2]) / 2.0,
        ]
    }

    /// Get the dimensions of the bounding box.
    pub fn size(&self) -> [f32; 3] {
        [
            self.max[0] - self.min[0],
            self.max[1] - self.min[1],
            self.max[2] - self.min[2],
        ]
    }
}

/// One named sub-mesh with geometry ready for upload.
#[derive(Debug, Clone)]
pub struct MeshAsset {
    /// Sub-mesh name inside its model file.
    pub name: String,
    pub vertices: Vec<Vertex>,
    /// Triangle indices.
    pub indices: Vec<u16>,
    pub bounds: BoundingBox,
}

impl MeshAsset {
    pub fn new(name: String, vertices: Vec<Vertex>, indices: Vec<u16>) -> Self {
        let bounds = BoundingBox::from_vertices(&vertices);
        Self {
            name,
            vertices,
            indices,
            bounds,
        }
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// A parsed model file: its named sub-meshes.
#[derive(Debug, Clone)]
pub struct ModelAsset {
    pub path: String,
    meshes: HashMap<String, Arc<MeshAsset>>,
}

impl ModelAsset {
    /// Parse OBJ content into named sub-meshes.
    pub fn from_obj(path: impl Into<String>, obj_content: &str) -> Result<Self> {
        let path = path.into();
        let mut cursor = std::io::Cursor::new(obj_content.as_bytes());

        let load_options = tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        };

        let (models, _materials) = tobj::load_obj_buf(&mut cursor, &load_options, |_| {
            Ok((vec![], HashMap::new()))
        })
        .map_err(|e| anyhow!("failed to parse OBJ '{}': {}", path, e))?;

        let mut meshes = HashMap::new();
        for model in &models {
            if model.mesh.positions.is_empty() {
                continue;
            }
            if meshes.contains_key(&model.name) {
                log::warn!("'{}' has duplicate sub-mesh '{}', keeping the first", path, model.name);
                continue;
            }
            let mesh = mesh_from_tobj(&model.name, &model.mesh)
                .with_context(|| format!("sub-mesh '{}' in '{}'", model.name, path))?;
            meshes.insert(model.name.clone(), Arc::new(mesh));
        }

        if meshes.is_empty() {
            bail!("OBJ '{}' contains no geometry", path);
        }

        Ok(Self { path, meshes })
    }

    /// Look up a named sub-mesh.
    pub fn mesh(&self, name: &str) -> Option<Arc<MeshAsset>> {
        self.meshes.get(name).cloned()
    }

    /// Sorted sub-mesh names.
    pub fn mesh_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.meshes.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }
}

fn mesh_from_tobj(name: &str, mesh: &tobj::Mesh) -> Result<MeshAsset> {
    let vertex_count = mesh.positions.len() / 3;
    if vertex_count > u16::MAX as usize + 1 {
        bail!("{} vertices exceed the 16-bit index range", vertex_count);
    }

    let positions: Vec<[f32; 3]> = mesh
        .positions
        .chunks_exact(3)
        .map(|p| [p[0], p[1], p[2]])
        .collect();

    let indices: Vec<u16> = mesh.indices.iter().map(|&i| i as u16).collect();
    if indices.iter().any(|&i| i as usize >= vertex_count) {
        bail!("face index out of range");
    }

    let normals = if mesh.normals.len() == mesh.positions.len() {
        mesh.normals.chunks_exact(3).map(|n| [n[0], n[1], n[2]]).collect()
    } else {
        compute_vertex_normals(&positions, &indices)
    };

    let vertices = positions
        .iter()
        .zip(normals.iter())
        .map(|(position, normal)| Vertex::new(*position, *normal))
        .collect();

    Ok(MeshAsset::new(name.to_string(), vertices, indices))
}

/// Compute area-weighted vertex normals from face normals.
///
/// Each triangle's unnormalised face normal (magnitude = 2 × area) is added to
/// its three vertices, then every sum is normalised.
fn compute_vertex_normals(positions: &[[f32; 3]], indices: &[u16]) -> Vec<[f32; 3]> {
    let mut normals = vec![[0.0f32; 3]; positions.len()];

    for tri in indices.chunks_exact(3) {
        let i0 = tri[0] as usize;
        let i1 = tri[1] as usize;
        let i2 = tri[2] as usize;

        if i0 >= positions.len() || i1 >= positions.len() || i2 >= positions.len() {
            continue;
        }

        let p0 = positions[i0];
        let p1 = positions[i1];
        let p2 = positions[i2];

        let e1 = [p1[0] - p0[0], p1[1] - p0[1], p1[2] - p0[2]];
        let e2 = [p2[0] - p0[0], p2[1] - p0[1], p2[2] - p0[2]];

        let face_normal = [
            e1[1] * e2[2] - e1[2] * e2[1],
            e1[2] * e2[0] - e1[0] * e2[2],
            e1[0] * e2[1] - e1[1] * e2[0],
        ];

        for &idx in &[i0, i1, i2] {
            normals[idx][0] += face_normal[0];
            normals[idx][1] += face_normal[1];
            normals[idx][2] += face_normal[2];
        }
    }

    for normal in &mut normals {
        let len = (normal[0] * normal[0] + normal[1] * normal[1] + normal[2] * normal[2]).sqrt();
        if len > 1e-6 {
            normal[0] /= len;
            normal[1] /= len;
            normal[2] /= len;
        } else {
            // Degenerate normal, use Y-up as fallback
            *normal = [0.0, 1.0, 0.0];
        }
    }

    normals
}

/// Cache of parsed model files, keyed by path.
///
/// Shared by every controller; a model is parsed once no matter how many
/// instances use it.
#[derive(Debug, Default)]
pub struct AssetCache {
    models: HashMap<String, Arc<ModelAsset>>,
}

impl AssetCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read and parse `path` unless it is already cached.
    pub fn preload(&mut self, path: &str) -> Result<Arc<ModelAsset>> {
        if let Some(model) = self.models.get(path) {
            return Ok(model.clone());
        }
        let content = std::fs::read_to_string(Path::new(path))
            .with_context(|| format!("failed to read model '{}'", path))?;
        self.insert_obj(path, &content)
    }

    /// Parse OBJ content supplied by the host and cache it under `path`.
    pub fn insert_obj(&mut self, path: &str, obj_content: &str) -> Result<Arc<ModelAsset>> {
        let model = Arc::new(ModelAsset::from_obj(path, obj_content)?);
        log::info!(
            "Loaded model '{}' with sub-meshes {:?}",
            path,
            model.mesh_names()
        );
        self.models.insert(path.to_string(), model.clone());
        Ok(model)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.models.contains_key(path)
    }

    /// Named sub-mesh of a cached model.
    pub fn mesh(&self, path: &str, name: &str) -> Result<Arc<MeshAsset>> {
        let model = self
            .models
            .get(path)
            .ok_or_else(|| anyhow!("model '{}' was not preloaded", path))?;
        model
            .mesh(name)
            .ok_or_else(|| anyhow!("model '{}' has no sub-mesh '{}'", path, name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_OBJECTS: &str = r#"
o Triangle
v 0 0 0
v 1 0 0
v 0 1 0
f 1 2 3
o Quad
v 0 0 1
v 1 0 1
v 1 1 1
v 0 1 1
f 4 5 6 7
"#;

    #[test]
    fn test_bounding_box_from_vertices() {
        let vertices = vec![
            Vertex::new([-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
            Vertex::new([1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
            Vertex::new([0.0, 2.0, 0.0], [0.0, 1.0, 0.0]),
        ];

        let bounds = BoundingBox::from_vertices(&vertices);
        assert_eq!(bounds.min, [-1.0, 0.0, 0.0]);
        assert_eq!(bounds.max, [1.0, 2.0, 0.0]);
        assert_eq!(bounds.size(), [2.0, 2.0, 0.0]);
    }

    #[test]
    fn test_named_sub_meshes() {
        let model = ModelAsset::from_obj("two.obj", TWO_OBJECTS).unwrap();
        assert_eq!(model.mesh_names(), vec!["Quad", "Triangle"]);

        let tri = model.mesh("Triangle").unwrap();
        assert_eq!(tri.vertices.len(), 3);
        assert_eq!(tri.triangle_count(), 1);

        let quad = model.mesh("Quad").unwrap();
        assert_eq!(quad.triangle_count(), 2);
    }

    #[test]
    fn test_generated_normals_face_the_viewer() {
        let model = ModelAsset::from_obj("two.obj", TWO_OBJECTS).unwrap();
        let tri = model.mesh("Triangle").unwrap();
        for v in &tri.vertices {
            assert!((v.normal[2] - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_empty_obj_is_an_error() {
        assert!(ModelAsset::from_obj("empty.obj", "# nothing here\n").is_err());
    }

    #[test]
    fn test_cache_lookup() {
        let mut cache = AssetCache::new();
        cache.insert_obj("two.obj", TWO_OBJECTS).unwrap();
        assert!(cache.contains("two.obj"));
        assert!(cache.mesh("two.obj", "Quad").is_ok());

        let missing_name = cache.mesh("two.obj", "Circle011").unwrap_err();
        assert!(missing_name.to_string().contains("Circle011"));
        assert!(cache.mesh("other.obj", "Quad").is_err());
    }

    #[test]
    fn test_preload_missing_file_fails() {
        let mut cache = AssetCache::new();
        let err = cache.preload("does/not/exist.obj").unwrap_err();
        assert!(format!("{:#}", err).contains("does/not/exist.obj"));
    }
}
