//! Vertex data of the water surface quad.

use crate::{backend::VertexLayout, map::Y_COORDS_PER_TILE};

/// Height of the water plane: one tile below ground, lifted by two units so
/// it does not z-fight with the terrain's lowest level.
pub const WATER_LEVEL: f32 = -1.0 * Y_COORDS_PER_TILE + 2.0;

/// Number of vertices in the surface quad (two triangles, no index buffer).
pub const SURFACE_VERTEX_COUNT: u32 = 6;

/// Position-only vertex. Texture coordinates are derived from the world
/// position in the shader, so nothing else is stored per vertex.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct WaterVertex {
    pub position: [f32; 3],
}

impl WaterVertex {
    /// Attribute 0 - position
    pub fn layout() -> VertexLayout {
        VertexLayout {
            array_stride: std::mem::size_of::<WaterVertex>() as wgpu::BufferAddress,
            attributes: vec![wgpu::VertexAttribute {
                offset: 0,
                shader_location: 0,
                format: wgpu::VertexFormat::Float32x3,
            }],
        }
    }
}

/// The unit square `(±1, level, ±1)` as two triangles.
///
/// Both triangles are wound so their normal points along +Y.
pub fn surface_vertices(level: f32) -> [WaterVertex; SURFACE_VERTEX_COUNT as usize] {
    let tl = WaterVertex { position: [1.0, level, 1.0] };
    let tr = WaterVertex { position: [-1.0, level, 1.0] };
    let bl = WaterVertex { position: [1.0, level, -1.0] };
    let br = WaterVertex { position: [-1.0, level, -1.0] };

    [tl, bl, tr, bl, br, tr]
}
