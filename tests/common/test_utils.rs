#![allow(dead_code)]

use std::{
    cell::Cell,
    collections::{HashMap, HashSet},
    path::PathBuf,
};

use flow_water::{
    backend::{
        BufferId, GraphicsBackend, ProgramDescriptor, ProgramId, TextureId, TextureUnit,
        UniformLocation, VertexArrayId, VertexLayout,
    },
    config::WaterConfig,
};

/// Every call a [`RecordingBackend`] received, in order.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Call {
    CreateTexture { id: TextureId, label: String },
    DeleteTexture(TextureId),
    CreateVertexBuffer { id: BufferId, len: usize },
    DeleteBuffer(BufferId),
    CreateVertexArray { id: VertexArrayId, buffer: BufferId },
    DeleteVertexArray(VertexArrayId),
    CreateProgram { id: ProgramId, name: &'static str },
    UseProgram(ProgramId),
    SetVec4(UniformLocation, [f32; 4]),
    SetMat4(UniformLocation, [[f32; 4]; 4]),
    SetSampler(UniformLocation, TextureUnit),
    BindTexture(TextureUnit, TextureId),
    DrawTriangles { vertex_array: VertexArrayId, first: u32, count: u32 },
}

/// A [`GraphicsBackend`] without a GPU that remembers what it was asked to do.
#[derive(Default)]
pub(crate) struct RecordingBackend {
    pub(crate) calls: Vec<Call>,
    next: u32,
    live_textures: HashSet<TextureId>,
    buffers: HashMap<BufferId, Vec<u8>>,
    vertex_arrays: HashMap<VertexArrayId, (BufferId, VertexLayout)>,
    programs: HashMap<ProgramId, Vec<&'static str>>,
    lookups: Cell<usize>,
}

impl RecordingBackend {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn next(&mut self) -> u32 {
        self.next += 1;
        self.next
    }

    pub(crate) fn live_textures(&self) -> usize {
        self.live_textures.len()
    }

    pub(crate) fn is_texture_live(&self, id: TextureId) -> bool {
        self.live_textures.contains(&id)
    }

    pub(crate) fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    pub(crate) fn live_vertex_arrays(&self) -> usize {
        self.vertex_arrays.len()
    }

    pub(crate) fn buffer_contents(&self, id: BufferId) -> Option<&[u8]> {
        self.buffers.get(&id).map(|b| b.as_slice())
    }

    pub(crate) fn vertex_array_layout(&self, id: VertexArrayId) -> Option<&VertexLayout> {
        self.vertex_arrays.get(&id).map(|(_, layout)| layout)
    }

    pub(crate) fn draws(&self) -> Vec<&Call> {
        self.calls
            .iter()
            .filter(|c| matches!(c, Call::DrawTriangles { .. }))
            .collect()
    }

    /// Last matrix uploaded to `name` on `program`.
    pub(crate) fn last_mat4(&self, program: ProgramId, name: &str) -> Option<[[f32; 4]; 4]> {
        let loc = self.uniform_location(program, name)?;
        self.calls.iter().rev().find_map(|c| match c {
            Call::SetMat4(l, m) if *l == loc => Some(*m),
            _ => None,
        })
    }

    /// Last vec4 uploaded to `name` on `program`.
    pub(crate) fn last_vec4(&self, program: ProgramId, name: &str) -> Option<[f32; 4]> {
        let loc = self.uniform_location(program, name)?;
        self.calls.iter().rev().find_map(|c| match c {
            Call::SetVec4(l, v) if *l == loc => Some(*v),
            _ => None,
        })
    }

    /// How often a uniform or sampler location was resolved.
    pub(crate) fn lookups(&self) -> usize {
        self.lookups.get()
    }

    pub(crate) fn clear_calls(&mut self) {
        self.calls.clear();
    }
}

impl GraphicsBackend for RecordingBackend {
    fn create_texture(&mut self, label: &str, _: &image::DynamicImage) -> TextureId {
        let id = TextureId::new(self.next()).unwrap();
        self.live_textures.insert(id);
        self.calls.push(Call::CreateTexture {
            id,
            label: label.to_string(),
        });
        id
    }

    fn delete_texture(&mut self, texture: TextureId) {
        assert!(self.live_textures.remove(&texture), "double free of {texture:?}");
        self.calls.push(Call::DeleteTexture(texture));
    }

    fn create_vertex_buffer(&mut self, _: &str, contents: &[u8]) -> BufferId {
        let id = BufferId::new(self.next()).unwrap();
        self.buffers.insert(id, contents.to_vec());
        self.calls.push(Call::CreateVertexBuffer {
            id,
            len: contents.len(),
        });
        id
    }

    fn delete_buffer(&mut self, buffer: BufferId) {
        assert!(self.buffers.remove(&buffer).is_some(), "double free of {buffer:?}");
        self.calls.push(Call::DeleteBuffer(buffer));
    }

    fn create_vertex_array(&mut self, buffer: BufferId, layout: VertexLayout) -> VertexArrayId {
        let id = VertexArrayId::new(self.next()).unwrap();
        self.vertex_arrays.insert(id, (buffer, layout));
        self.calls.push(Call::CreateVertexArray { id, buffer });
        id
    }

    fn delete_vertex_array(&mut self, vertex_array: VertexArrayId) {
        assert!(
            self.vertex_arrays.remove(&vertex_array).is_some(),
            "double free of {vertex_array:?}"
        );
        self.calls.push(Call::DeleteVertexArray(vertex_array));
    }

    fn create_program(&mut self, descriptor: &ProgramDescriptor) -> anyhow::Result<ProgramId> {
        let id = ProgramId::new(self.next()).unwrap();
        let names = descriptor
            .uniforms
            .iter()
            .map(|u| u.name)
            .chain(descriptor.samplers.iter().copied())
            .collect();
        self.programs.insert(id, names);
        self.calls.push(Call::CreateProgram {
            id,
            name: descriptor.name,
        });
        Ok(id)
    }

    fn use_program(&mut self, program: ProgramId) {
        self.calls.push(Call::UseProgram(program));
    }

    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation> {
        self.lookups.set(self.lookups.get() + 1);
        self.programs
            .get(&program)?
            .iter()
            .position(|n| *n == name)
            .map(|idx| UniformLocation(idx as u32))
    }

    fn set_uniform_vec4(&mut self, location: UniformLocation, value: [f32; 4]) {
        self.calls.push(Call::SetVec4(location, value));
    }

    fn set_uniform_mat4(&mut self, location: UniformLocation, value: [[f32; 4]; 4]) {
        self.calls.push(Call::SetMat4(location, value));
    }

    fn set_uniform_sampler(&mut self, location: UniformLocation, unit: TextureUnit) {
        self.calls.push(Call::SetSampler(location, unit));
    }

    fn bind_texture(&mut self, unit: TextureUnit, texture: TextureId) {
        self.calls.push(Call::BindTexture(unit, texture));
    }

    fn draw_triangles(&mut self, vertex_array: VertexArrayId, first: u32, count: u32) {
        self.calls.push(Call::DrawTriangles {
            vertex_array,
            first,
            count,
        });
    }
}

/// Config reading the textures shipped in `assets/`.
pub(crate) fn test_config() -> WaterConfig {
    WaterConfig {
        base_path: PathBuf::from(env!("CARGO_MANIFEST_DIR")),
        ..Default::default()
    }
}

pub(crate) fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
