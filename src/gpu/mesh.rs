use bytemuck::{Pod, Zeroable};

/// Lit mesh vertex: position + normal.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

impl Vertex {
    pub const fn new(position: [f32; 3], normal: [f32; 3]) -> Self {
        Self { position, normal }
    }

    pub fn desc<'a>() -> wgpu::VertexBufferLayout<'a> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: 12, // [f32; 3] is 12 bytes
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }
}

/// Particle vertex: position + vertex colour. Stepped per instance; each
/// point is drawn as a six-vertex camera-facing quad.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct PointVertex {
    pub position: [f32; 3],
    pub color: [f32; 3],
}

impl PointVertex {
    pub fn desc<'a>() -> wgpu::VertexBufferLayout<'a> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<PointVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: 12,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }
}

/// Interleave the particle field's parallel buffers for upload.
pub fn interleave_points(positions: &[f32], colors: &[f32]) -> Vec<PointVertex> {
    positions
        .chunks_exact(3)
        .zip(colors.chunks_exact(3))
        .map(|(p, c)| PointVertex {
            position: [p[0], p[1], p[2]],
            color: [c[0], c[1], c[2]],
        })
        .collect()
}

/// Unit quad in the XZ plane (Y = 0), centred at the origin.
pub fn create_plane_geometry() -> (Vec<Vertex>, Vec<u16>) {
    let up = [0.0, 1.0, 0.0];
    let vertices = vec![
        Vertex::new([-0.5, 0.0, -0.5], up),
        Vertex::new([0.5, 0.0, -0.5], up),
        Vertex::new([0.5, 0.0, 0.5], up),
        Vertex::new([-0.5, 0.0, 0.5], up),
    ];
    // Counter-clockwise when viewed from above.
    let indices = vec![0, 2, 1, 0, 3, 2];
    (vertices, indices)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_sizes() {
        assert_eq!(std::mem::size_of::<Vertex>(), 24);
        assert_eq!(std::mem::size_of::<PointVertex>(), 24);
    }

    #[test]
    fn test_interleave_points() {
        let positions = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let colors = [0.1, 0.2, 0.3, 0.4, 0.5, 0.6];
        let points = interleave_points(&positions, &colors);
        assert_eq!(points.len(), 2);
        assert_eq!(points[1].position, [4.0, 5.0, 6.0]);
        assert_eq!(points[1].color, [0.4, 0.5, 0.6]);
    }
}
