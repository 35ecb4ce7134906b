use crate::{
    backend::{ProgramDescriptor, UniformDecl, UniformKind},
    config::{DISTORTION_SAMPLER, NORMAL_SAMPLER},
    data_structures::water::WaterVertex,
};

/// Name the water renderer looks its program up by.
pub const COLORED_MESH_PROGRAM: &str = "mesh.static.colored";

pub const U_VIEW_PROJ: &str = "view_proj";
pub const U_MODEL: &str = "model";
pub const U_COLOR: &str = "color";

// Order and kinds must match `MeshUniform` in water.wgsl.
const UNIFORMS: &[UniformDecl] = &[
    UniformDecl {
        name: U_VIEW_PROJ,
        kind: UniformKind::Mat4,
    },
    UniformDecl {
        name: U_MODEL,
        kind: UniformKind::Mat4,
    },
    UniformDecl {
        name: U_COLOR,
        kind: UniformKind::Vec4,
    },
];

const SAMPLERS: &[&str] = &[DISTORTION_SAMPLER, NORMAL_SAMPLER];

/**
 * Flat mesh with a single uniform colour and two texture samplers.
 *
 * Texture coordinates come from the world position, so the program only needs
 * a position attribute and works for any mesh scaled by the `model` uniform.
 */
pub fn colored_mesh_program() -> ProgramDescriptor {
    ProgramDescriptor {
        name: COLORED_MESH_PROGRAM,
        source: include_str!("water.wgsl"),
        vertex_layout: WaterVertex::layout(),
        uniforms: UNIFORMS,
        samplers: SAMPLERS,
    }
}
