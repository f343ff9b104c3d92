//! GPU renderer for the hero scene.
//!
//! Draws one [`SceneSnapshot`] per call: contact shadows, then the lit
//! models, then the particle field on top.

use std::collections::HashMap;
use std::iter;
use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use crate::camera::CameraUniforms;
use crate::gpu::mesh::{self, PointVertex};
use crate::gpu::pipeline::{self, DEPTH_FORMAT};
use crate::lighting::{LightingUniforms, ShadowBlob};
use crate::material::PointsMaterial;
use crate::mesh_asset::MeshAsset;
use crate::model::ModelRenderState;
use crate::scene::SceneSnapshot;

/// Maximum number of models that can be rendered per frame.
/// Each model needs its own uniform slot in the dynamic uniform buffer.
const MAX_MODELS_PER_FRAME: usize = 64;

/// Maximum number of contact shadow discs per frame.
const MAX_SHADOWS_PER_FRAME: usize = 64;

/// Uniform buffer alignment (WebGPU minUniformBufferOffsetAlignment is typically 256 bytes)
const UNIFORM_ALIGNMENT: usize = 256;

/// Per-frame uniforms shared by every pipeline (group 0).
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct FrameUniforms {
    camera: CameraUniforms,
    lighting: LightingUniforms,
    /// Point size, opacity, vertex colour switch, unused.
    points: [f32; 4],
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct ModelUniforms {
    model: [[f32; 4]; 4],
    normal_matrix: [[f32; 4]; 4],
    color: [f32; 4],
    // Padding to reach 256-byte alignment (144 bytes of data + 112 bytes padding)
    _padding: [f32; 28],
}

/// Matches shader_shadow.wgsl ShadowUniforms.
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct ShadowUniforms {
    center: [f32; 4],
    color: [f32; 4],
    /// Radius (x) and softness (y).
    params: [f32; 4],
    _padding: [[f32; 4]; 13],
}

impl ModelUniforms {
    /// None when the world matrix is degenerate (zero scale).
    fn from_state(state: &ModelRenderState) -> Option<Self> {
        if state.world.determinant().abs() < 1e-12 {
            return None;
        }
        let normal_matrix = state.world.inverse().transpose();
        Some(Self {
            model: state.world.to_cols_array_2d(),
            normal_matrix: normal_matrix.to_cols_array_2d(),
            color: [state.color[0], state.color[1], state.color[2], 1.0],
            _padding: [0.0; 28],
        })
    }
}

impl ShadowUniforms {
    fn from_blob(blob: &ShadowBlob, softness: f32) -> Self {
        Self {
            center: blob.center.extend(1.0).to_array(),
            color: [0.0, 0.0, 0.0, blob.opacity],
            params: [blob.radius, softness, 0.0, 0.0],
            _padding: [[0.0; 4]; 13],
        }
    }
}

fn points_params(material: &PointsMaterial) -> [f32; 4] {
    let opacity = if material.transparent { material.opacity } else { 1.0 };
    let vertex_colors = if material.vertex_colors { 1.0 } else { 0.0 };
    [material.size, opacity, vertex_colors, 0.0]
}

struct MeshBuffers {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    num_indices: u32,
}

struct RenderTargets {
    depth_view: wgpu::TextureView,
    msaa_view: Option<wgpu::TextureView>,
}

impl RenderTargets {
    fn new(
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        size: wgpu::Extent3d,
        sample_count: u32,
    ) -> Self {
        let depth_texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Depth Texture"),
            size,
            mip_level_count: 1,
            sample_count,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let msaa_view = (sample_count > 1).then(|| {
            device
                .create_texture(&wgpu::TextureDescriptor {
                    label: Some("MSAA Color Texture"),
                    size,
                    mip_level_count: 1,
                    sample_count,
                    dimension: wgpu::TextureDimension::D2,
                    format,
                    usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                    view_formats: &[],
                })
                .create_view(&wgpu::TextureViewDescriptor::default())
        });
        Self {
            depth_view: depth_texture.create_view(&wgpu::TextureViewDescriptor::default()),
            msaa_view,
        }
    }
}

struct Pipelines {
    mesh: wgpu::RenderPipeline,
    points: wgpu::RenderPipeline,
    shadow: wgpu::RenderPipeline,
}

pub struct Renderer {
    device: wgpu::Device,
    queue: wgpu::Queue,
    format: wgpu::TextureFormat,
    size: wgpu::Extent3d,
    sample_count: u32,

    frame_buffer: wgpu::Buffer,
    frame_bind_group: wgpu::BindGroup,
    model_buffer: wgpu::Buffer,
    model_bind_group: wgpu::BindGroup,
    shadow_buffer: wgpu::Buffer,
    shadow_bind_group: wgpu::BindGroup,

    mesh_layout: wgpu::PipelineLayout,
    points_layout: wgpu::PipelineLayout,
    shadow_layout: wgpu::PipelineLayout,
    pipelines: Pipelines,
    targets: RenderTargets,

    plane: MeshBuffers,
    points_buffer: Option<wgpu::Buffer>,
    points_capacity: usize,
    mesh_buffers: HashMap<String, MeshBuffers>,
}

/// wgpu only guarantees 1 and 4 samples on every backend.
fn supported_sample_count(requested: u32) -> u32 {
    match requested {
        0 | 1 => 1,
        4 => 4,
        other => {
            log::warn!("Unsupported MSAA sample count {}, using 4", other);
            4
        }
    }
}

fn dynamic_uniform_layout(device: &wgpu::Device, label: &str, size: usize) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: true,
                min_binding_size: wgpu::BufferSize::new(size as u64),
            },
            count: None,
        }],
        label: Some(label),
    })
}

fn dynamic_uniform_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    buffer: &wgpu::Buffer,
    label: &str,
    size: usize,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                buffer,
                offset: 0,
                size: wgpu::BufferSize::new(size as u64),
            }),
        }],
        label: Some(label),
    })
}

impl Renderer {
    pub fn new(
        device: wgpu::Device,
        queue: wgpu::Queue,
        format: wgpu::TextureFormat,
        width: u32,
        height: u32,
        sample_count: u32,
    ) -> Self {
        let size = wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        };
        let sample_count = supported_sample_count(sample_count);

        // === Frame uniforms (group 0) ===

        let frame_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Frame Uniform Buffer"),
            size: std::mem::size_of::<FrameUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let frame_bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
            label: Some("frame_bind_group_layout"),
        });
        let frame_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &frame_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: frame_buffer.as_entire_binding(),
            }],
            label: Some("frame_bind_group"),
        });

        // === Per-model and per-shadow uniforms (group 1, dynamic offsets) ===

        let model_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Model Uniform Buffer (Dynamic)"),
            size: (UNIFORM_ALIGNMENT * MAX_MODELS_PER_FRAME) as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let model_size = std::mem::size_of::<ModelUniforms>();
        let model_bind_group_layout = dynamic_uniform_layout(&device, "model_bind_group_layout", model_size);
        let model_bind_group = dynamic_uniform_bind_group(
            &device,
            &model_bind_group_layout,
            &model_buffer,
            "model_bind_group",
            model_size,
        );

        let shadow_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Shadow Uniform Buffer (Dynamic)"),
            size: (UNIFORM_ALIGNMENT * MAX_SHADOWS_PER_FRAME) as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let shadow_size = std::mem::size_of::<ShadowUniforms>();
        let shadow_bind_group_layout = dynamic_uniform_layout(&device, "shadow_bind_group_layout", shadow_size);
        let shadow_bind_group = dynamic_uniform_bind_group(
            &device,
            &shadow_bind_group_layout,
            &shadow_buffer,
            "shadow_bind_group",
            shadow_size,
        );

        // === Pipelines ===

        let mesh_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Mesh Pipeline Layout"),
            bind_group_layouts: &[&frame_bind_group_layout, &model_bind_group_layout],
            push_constant_ranges: &[],
        });
        let points_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Points Pipeline Layout"),
            bind_group_layouts: &[&frame_bind_group_layout],
            push_constant_ranges: &[],
        });
        let shadow_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Shadow Pipeline Layout"),
            bind_group_layouts: &[&frame_bind_group_layout, &shadow_bind_group_layout],
            push_constant_ranges: &[],
        });
        let pipelines = Self::create_pipelines(
            &device,
            &mesh_layout,
            &points_layout,
            &shadow_layout,
            format,
            sample_count,
        );
        let targets = RenderTargets::new(&device, format, size, sample_count);

        // === Geometry ===

        let (plane_vertices, plane_indices) = mesh::create_plane_geometry();
        let plane = MeshBuffers {
            vertex_buffer: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Plane Vertex Buffer"),
                contents: bytemuck::cast_slice(&plane_vertices),
                usage: wgpu::BufferUsages::VERTEX,
            }),
            index_buffer: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Plane Index Buffer"),
                contents: bytemuck::cast_slice(&plane_indices),
                usage: wgpu::BufferUsages::INDEX,
            }),
            num_indices: plane_indices.len() as u32,
        };

        log::info!(
            "Renderer created: {}x{}, {:?}, {}x MSAA",
            size.width,
            size.height,
            format,
            sample_count
        );

        Self {
            device,
            queue,
            format,
            size,
            sample_count,
            frame_buffer,
            frame_bind_group,
            model_buffer,
            model_bind_group,
            shadow_buffer,
            shadow_bind_group,
            mesh_layout,
            points_layout,
            shadow_layout,
            pipelines,
            targets,
            plane,
            points_buffer: None,
            points_capacity: 0,
            mesh_buffers: HashMap::new(),
        }
    }

    fn create_pipelines(
        device: &wgpu::Device,
        mesh_layout: &wgpu::PipelineLayout,
        points_layout: &wgpu::PipelineLayout,
        shadow_layout: &wgpu::PipelineLayout,
        format: wgpu::TextureFormat,
        sample_count: u32,
    ) -> Pipelines {
        Pipelines {
            mesh: pipeline::create_mesh_pipeline(device, mesh_layout, format, sample_count),
            points: pipeline::create_points_pipeline(device, points_layout, format, sample_count),
            shadow: pipeline::create_shadow_pipeline(device, shadow_layout, format, sample_count),
        }
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn size(&self) -> (u32, u32) {
        (self.size.width, self.size.height)
    }

    pub fn aspect(&self) -> f32 {
        self.size.width as f32 / self.size.height as f32
    }

    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.size.width = width;
        self.size.height = height;
        self.targets = RenderTargets::new(&self.device, self.format, self.size, self.sample_count);
    }

    /// Rebuild pipelines and targets for a new MSAA sample count.
    pub fn set_sample_count(&mut self, requested: u32) {
        let sample_count = supported_sample_count(requested);
        if sample_count == self.sample_count {
            return;
        }
        log::debug!("MSAA {} -> {}", self.sample_count, sample_count);
        self.sample_count = sample_count;
        self.pipelines = Self::create_pipelines(
            &self.device,
            &self.mesh_layout,
            &self.points_layout,
            &self.shadow_layout,
            self.format,
            sample_count,
        );
        self.targets = RenderTargets::new(&self.device, self.format, self.size, sample_count);
    }

    fn ensure_mesh_buffers(&mut self, asset: &Arc<MeshAsset>) {
        if self.mesh_buffers.contains_key(&asset.name) {
            return;
        }
        let vertex_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("Mesh Vertex Buffer: {}", asset.name)),
            contents: bytemuck::cast_slice(&asset.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        // Index buffers must be a multiple of 4 bytes.
        let mut indices = asset.indices.clone();
        if indices.len() % 2 == 1 {
            indices.push(0);
        }
        let index_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("Mesh Index Buffer: {}", asset.name)),
            contents: bytemuck::cast_slice(&indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        self.mesh_buffers.insert(
            asset.name.clone(),
            MeshBuffers {
                vertex_buffer,
                index_buffer,
                num_indices: asset.indices.len() as u32,
            },
        );
    }

    /// Upload the particle field, growing the buffer when needed.
    /// Returns the number of points to draw.
    fn upload_points(&mut self, positions: &[f32], colors: &[f32]) -> u32 {
        let points: Vec<PointVertex> = mesh::interleave_points(positions, colors);
        if points.is_empty() {
            return 0;
        }
        if self.points_buffer.is_none() || points.len() > self.points_capacity {
            self.points_capacity = points.len();
            self.points_buffer = Some(self.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("Points Instance Buffer"),
                size: (points.len() * std::mem::size_of::<PointVertex>()) as u64,
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            }));
        }
        if let Some(buffer) = &self.points_buffer {
            self.queue.write_buffer(buffer, 0, bytemuck::cast_slice(&points));
        }
        points.len() as u32
    }

    pub fn render(&mut self, view: &wgpu::TextureView, snapshot: &SceneSnapshot) {
        self.set_sample_count(snapshot.msaa_samples);

        let points_material = snapshot.points.as_ref().map(|(_, _, m)| *m).unwrap_or_default();
        let frame = FrameUniforms {
            camera: snapshot.camera.to_uniforms(self.aspect()),
            lighting: snapshot.lighting.to_uniforms(),
            points: points_params(&points_material),
        };
        self.queue.write_buffer(&self.frame_buffer, 0, bytemuck::bytes_of(&frame));

        // Pre-write every uniform slot before the pass; writes issued during
        // recording would all land before the first draw.
        let mut draws: Vec<(String, u32)> = Vec::new();
        for state in snapshot.models.iter().filter(|m| m.visible) {
            if draws.len() >= MAX_MODELS_PER_FRAME {
                log::warn!(
                    "Too many models ({} > {}), some will not be rendered",
                    snapshot.models.len(),
                    MAX_MODELS_PER_FRAME
                );
                break;
            }
            let Some(uniforms) = ModelUniforms::from_state(state) else {
                continue;
            };
            self.ensure_mesh_buffers(&state.mesh);
            let offset = draws.len() * UNIFORM_ALIGNMENT;
            self.queue
                .write_buffer(&self.model_buffer, offset as u64, bytemuck::bytes_of(&uniforms));
            draws.push((state.mesh.name.clone(), offset as u32));
        }

        let softness = (0.3 + 0.5 * snapshot.shadow_blur).clamp(0.05, 1.0);
        let shadow_count = snapshot.shadows.len().min(MAX_SHADOWS_PER_FRAME);
        for (i, blob) in snapshot.shadows.iter().take(shadow_count).enumerate() {
            let uniforms = ShadowUniforms::from_blob(blob, softness);
            self.queue.write_buffer(
                &self.shadow_buffer,
                (i * UNIFORM_ALIGNMENT) as u64,
                bytemuck::bytes_of(&uniforms),
            );
        }

        let point_count = match snapshot.points {
            Some((positions, colors, _)) => self.upload_points(positions, colors),
            None => 0,
        };

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Render Encoder"),
        });

        {
            let (color_view, resolve_target) = match &self.targets.msaa_view {
                Some(msaa) => (msaa, Some(view)),
                None => (view, None),
            };
            let [r, g, b, a] = snapshot.clear_color;
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: color_view,
                    resolve_target,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: r as f64,
                            g: g as f64,
                            b: b as f64,
                            a: a as f64,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.targets.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Discard,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            pass.set_bind_group(0, &self.frame_bind_group, &[]);

            if shadow_count > 0 {
                pass.set_pipeline(&self.pipelines.shadow);
                pass.set_vertex_buffer(0, self.plane.vertex_buffer.slice(..));
                pass.set_index_buffer(self.plane.index_buffer.slice(..), wgpu::IndexFormat::Uint16);
                for i in 0..shadow_count {
                    let offset = (i * UNIFORM_ALIGNMENT) as u32;
                    pass.set_bind_group(1, &self.shadow_bind_group, &[offset]);
                    pass.draw_indexed(0..self.plane.num_indices, 0, 0..1);
                }
            }

            if !draws.is_empty() {
                pass.set_pipeline(&self.pipelines.mesh);
                for (name, offset) in &draws {
                    let Some(buffers) = self.mesh_buffers.get(name) else {
                        continue;
                    };
                    pass.set_bind_group(1, &self.model_bind_group, &[*offset]);
                    pass.set_vertex_buffer(0, buffers.vertex_buffer.slice(..));
                    pass.set_index_buffer(buffers.index_buffer.slice(..), wgpu::IndexFormat::Uint16);
                    pass.draw_indexed(0..buffers.num_indices, 0, 0..1);
                }
            }

            if let (Some(buffer), true) = (&self.points_buffer, point_count > 0) {
                pass.set_pipeline(&self.pipelines.points);
                pass.set_vertex_buffer(0, buffer.slice(..));
                pass.draw(0..6, 0..point_count);
            }
        }

        self.queue.submit(iter::once(encoder.finish()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composer::ModelVariant;
    use crate::gpu::mesh::create_plane_geometry;
    use crate::scene_graph::InstanceId;
    use glam::{Mat4, Vec3};

    #[test]
    fn test_uniform_sizes() {
        // The WGSL struct is 224 bytes; dynamic slots are one alignment unit.
        assert_eq!(std::mem::size_of::<FrameUniforms>(), 224);
        assert_eq!(std::mem::size_of::<ModelUniforms>(), UNIFORM_ALIGNMENT);
        assert_eq!(std::mem::size_of::<ShadowUniforms>(), UNIFORM_ALIGNMENT);
    }

    fn state(world: Mat4) -> ModelRenderState {
        let (vertices, indices) = create_plane_geometry();
        ModelRenderState {
            id: InstanceId(0),
            variant: ModelVariant::PrimaryModel,
            visible: true,
            world,
            color: [0.5, 0.25, 1.0],
            material_index: 0,
            center: Vec3::ZERO,
            radius: 1.0,
            mesh: Arc::new(MeshAsset::new("plane".to_string(), vertices, indices)),
        }
    }

    #[test]
    fn test_zero_scale_model_is_skipped() {
        assert!(ModelUniforms::from_state(&state(Mat4::from_scale(Vec3::ZERO))).is_none());
        let uniforms = ModelUniforms::from_state(&state(Mat4::from_scale(Vec3::splat(2.0)))).unwrap();
        assert_eq!(uniforms.color, [0.5, 0.25, 1.0, 1.0]);
        assert_eq!(uniforms.normal_matrix[0][0], 0.5);
    }

    #[test]
    fn test_points_params() {
        let material = PointsMaterial::default();
        let params = points_params(&material);
        assert_eq!(params[0], 0.2);
        assert_eq!(params[1], 0.8);
        assert_eq!(params[2], 1.0);

        let opaque = PointsMaterial {
            transparent: false,
            ..material
        };
        assert_eq!(points_params(&opaque)[1], 1.0);
    }

    #[test]
    fn test_sample_count() {
        assert_eq!(supported_sample_count(0), 1);
        assert_eq!(supported_sample_count(1), 1);
        assert_eq!(supported_sample_count(4), 4);
        assert_eq!(supported_sample_count(8), 4);
    }
}
