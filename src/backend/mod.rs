//! Graphics backend contract.
//!
//! The water code talks to the GPU through [`GraphicsBackend`], an immediate-mode
//! surface shaped after classic GL: opaque integer handles, a current program,
//! uniforms that persist as program state and numbered texture units. The
//! production implementation is [`wgpu_backend::WgpuBackend`], which records these
//! calls and replays them into a `wgpu::RenderPass`.
//!
//! Handles are [`NonZeroU32`] newtypes so a "null" handle cannot be constructed.

use std::num::NonZeroU32;

pub mod wgpu_backend;

macro_rules! handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(NonZeroU32);

        impl $name {
            /// Wraps a raw handle, `None` for zero.
            pub fn new(raw: u32) -> Option<Self> {
                NonZeroU32::new(raw).map(Self)
            }

            pub const fn from_nonzero(raw: NonZeroU32) -> Self {
                Self(raw)
            }

            pub fn get(self) -> u32 {
                self.0.get()
            }
        }
    };
}

handle!(
    /// A texture resident on the GPU.
    TextureId
);
handle!(
    /// A GPU buffer holding raw vertex data.
    BufferId
);
handle!(
    /// A vertex buffer paired with the layout describing its bytes.
    VertexArrayId
);
handle!(
    /// A linked shading program (a render pipeline on wgpu).
    ProgramId
);

/// Logical binding point a texture is attached to for sampling.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureUnit(pub u32);

/// Program-relative slot of a uniform or sampler, see [`GraphicsBackend::uniform_location`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct UniformLocation(pub u32);

/// Describes how the bytes of one vertex map to shader inputs.
#[derive(Clone, Debug, PartialEq)]
pub struct VertexLayout {
    pub array_stride: wgpu::BufferAddress,
    pub attributes: Vec<wgpu::VertexAttribute>,
}

impl VertexLayout {
    pub fn desc(&self) -> wgpu::VertexBufferLayout<'_> {
        wgpu::VertexBufferLayout {
            array_stride: self.array_stride,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &self.attributes,
        }
    }
}

/// Type of a value inside a program's uniform block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UniformKind {
    Vec4,
    Mat4,
}

impl UniformKind {
    /// Size in bytes with std140 padding. Both kinds are 16 byte aligned.
    pub const fn size(self) -> usize {
        match self {
            UniformKind::Vec4 => 16,
            UniformKind::Mat4 => 64,
        }
    }
}

/// A named member of a program's uniform block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UniformDecl {
    pub name: &'static str,
    pub kind: UniformKind,
}

/// Everything a backend needs to build a shading program.
///
/// Uniforms are packed into one block in declaration order; samplers are
/// bound after it, each as a texture + sampler pair.
#[derive(Clone, Debug)]
pub struct ProgramDescriptor {
    pub name: &'static str,
    /// WGSL source with `vs_main` and `fs_main` entry points.
    pub source: &'static str,
    pub vertex_layout: VertexLayout,
    pub uniforms: &'static [UniformDecl],
    pub samplers: &'static [&'static str],
}

impl ProgramDescriptor {
    /// Size of the packed uniform block in bytes.
    pub fn uniform_block_size(&self) -> usize {
        self.uniforms.iter().map(|u| u.kind.size()).sum()
    }
}

/// Immediate-mode GPU surface used by the water renderer and its collaborators.
///
/// Creation calls are infallible apart from program linkage: running out of
/// GPU memory is treated as fatal by implementations. Uniform and sampler
/// setters apply to the program selected with [`use_program`](Self::use_program)
/// and persist until overwritten.
pub trait GraphicsBackend {
    fn create_texture(&mut self, label: &str, image: &image::DynamicImage) -> TextureId;
    fn delete_texture(&mut self, texture: TextureId);

    fn create_vertex_buffer(&mut self, label: &str, contents: &[u8]) -> BufferId;
    fn delete_buffer(&mut self, buffer: BufferId);

    fn create_vertex_array(&mut self, buffer: BufferId, layout: VertexLayout) -> VertexArrayId;
    fn delete_vertex_array(&mut self, vertex_array: VertexArrayId);

    fn create_program(&mut self, descriptor: &ProgramDescriptor) -> anyhow::Result<ProgramId>;
    fn use_program(&mut self, program: ProgramId);

    /// Resolves a uniform or sampler name on `program`.
    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation>;
    fn set_uniform_vec4(&mut self, location: UniformLocation, value: [f32; 4]);
    fn set_uniform_mat4(&mut self, location: UniformLocation, value: [[f32; 4]; 4]);
    /// Points the sampler at `location` to a texture unit.
    fn set_uniform_sampler(&mut self, location: UniformLocation, unit: TextureUnit);

    fn bind_texture(&mut self, unit: TextureUnit, texture: TextureId);

    /// Submits a non-indexed triangle list of `count` vertices starting at `first`.
    fn draw_triangles(&mut self, vertex_array: VertexArrayId, first: u32, count: u32);
}
