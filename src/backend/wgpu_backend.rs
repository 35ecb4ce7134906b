//! [`GraphicsBackend`] on top of wgpu.
//!
//! wgpu has no current program and no global uniform state, so this backend
//! keeps that state itself. Every program owns a CPU-side copy of its uniform
//! block (std140, declaration order) and a unit per sampler. `draw_triangles`
//! snapshots this state into a [`DrawCommand`]; [`WgpuBackend::flush`] turns
//! the recorded commands into bind groups and draws on a render pass.

use std::{collections::HashMap, num::NonZeroU32, ops::Range};

use anyhow::bail;
use wgpu::util::DeviceExt;

use crate::{
    backend::{
        BufferId, GraphicsBackend, ProgramDescriptor, ProgramId, TextureId, TextureUnit,
        UniformKind, UniformLocation, VertexArrayId, VertexLayout,
    },
    context::Context,
    data_structures::texture::{self, Texture},
    pipelines::basic::mk_render_pipeline,
};

struct VertexArray {
    buffer: BufferId,
    layout: VertexLayout,
}

struct UniformSlot {
    name: &'static str,
    kind: UniformKind,
    offset: usize,
}

struct SamplerSlot {
    name: &'static str,
    unit: Option<TextureUnit>,
}

struct Program {
    name: &'static str,
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    vertex_layout: VertexLayout,
    uniforms: Vec<UniformSlot>,
    samplers: Vec<SamplerSlot>,
    staging: Vec<u8>,
}

impl Program {
    /// Uniform locations come first, sampler locations follow them.
    fn location(&self, name: &str) -> Option<UniformLocation> {
        let uniform = self.uniforms.iter().position(|u| u.name == name);
        let sampler = || {
            self.samplers
                .iter()
                .position(|s| s.name == name)
                .map(|idx| idx + self.uniforms.len())
        };
        uniform
            .or_else(sampler)
            .map(|idx| UniformLocation(idx as u32))
    }

    fn write_uniform(&mut self, location: UniformLocation, kind: UniformKind, bytes: &[u8]) {
        let Some(slot) = self.uniforms.get(location.0 as usize) else {
            log::error!(
                "location {} of program {} is not a uniform",
                location.0,
                self.name
            );
            return;
        };
        if slot.kind != kind {
            log::error!(
                "uniform {} of program {} is a {:?}, not a {:?}",
                slot.name,
                self.name,
                slot.kind,
                kind
            );
            return;
        }
        self.staging[slot.offset..slot.offset + bytes.len()].copy_from_slice(bytes);
    }
}

/// Recorded draws that have not been flushed yet before a warning is logged.
pub const PENDING_DRAWS_WARNING: usize = 1024;

/// A draw recorded by [`GraphicsBackend::draw_triangles`], waiting for [`WgpuBackend::flush`].
struct DrawCommand {
    program: ProgramId,
    vertex_array: VertexArrayId,
    vertices: Range<u32>,
    uniforms: Vec<u8>,
    /// One texture per program sampler, in declaration order.
    textures: Vec<TextureId>,
}

pub struct WgpuBackend {
    ctx: Context,
    next_handle: NonZeroU32,
    default_sampler: wgpu::Sampler,
    textures: HashMap<TextureId, Texture>,
    buffers: HashMap<BufferId, wgpu::Buffer>,
    vertex_arrays: HashMap<VertexArrayId, VertexArray>,
    programs: HashMap<ProgramId, Program>,
    current_program: Option<ProgramId>,
    units: HashMap<TextureUnit, TextureId>,
    pending: Vec<DrawCommand>,
}

impl WgpuBackend {
    pub fn new(ctx: Context) -> Self {
        let default_sampler = texture::create_default_sampler(&ctx.device);
        Self {
            ctx,
            next_handle: NonZeroU32::MIN,
            default_sampler,
            textures: HashMap::new(),
            buffers: HashMap::new(),
            vertex_arrays: HashMap::new(),
            programs: HashMap::new(),
            current_program: None,
            units: HashMap::new(),
            pending: Vec::new(),
        }
    }

    pub fn ctx(&self) -> &Context {
        &self.ctx
    }

    /// Number of draws recorded since the last [`flush`](Self::flush).
    pub fn pending_draws(&self) -> usize {
        self.pending.len()
    }

    fn allocate(&mut self) -> NonZeroU32 {
        let handle = self.next_handle;
        self.next_handle = handle
            .checked_add(1)
            .expect("GPU handle space exhausted");
        handle
    }

    fn current_program_mut(&mut self) -> Option<&mut Program> {
        let Some(id) = self.current_program else {
            log::error!("uniform upload without a program in use");
            return None;
        };
        self.programs.get_mut(&id)
    }

    /// Encode every recorded draw into `pass`, returning how many were issued.
    ///
    /// Draws whose resources were deleted after recording are skipped.
    pub fn flush(&mut self, pass: &mut wgpu::RenderPass<'_>) -> usize {
        let pending = std::mem::take(&mut self.pending);
        let mut issued = 0;
        for cmd in pending {
            let Some(program) = self.programs.get(&cmd.program) else {
                log::warn!("dropping draw of deleted program {}", cmd.program.get());
                continue;
            };
            let Some(buffer) = self
                .vertex_arrays
                .get(&cmd.vertex_array)
                .and_then(|vao| self.buffers.get(&vao.buffer))
            else {
                log::warn!(
                    "dropping draw of deleted vertex array {}",
                    cmd.vertex_array.get()
                );
                continue;
            };
            let textures: Option<Vec<&Texture>> =
                cmd.textures.iter().map(|id| self.textures.get(id)).collect();
            let Some(textures) = textures else {
                log::warn!("dropping draw of program {} with a deleted texture", program.name);
                continue;
            };

            let uniform_buffer =
                self.ctx
                    .device
                    .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                        label: Some(&format!("{} Uniform Buffer", program.name)),
                        contents: &cmd.uniforms,
                        usage: wgpu::BufferUsages::UNIFORM,
                    });
            let mut entries = vec![wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }];
            for (idx, tex) in textures.iter().enumerate() {
                let binding = 1 + 2 * idx as u32;
                entries.push(wgpu::BindGroupEntry {
                    binding,
                    resource: wgpu::BindingResource::TextureView(&tex.view),
                });
                entries.push(wgpu::BindGroupEntry {
                    binding: binding + 1,
                    resource: wgpu::BindingResource::Sampler(
                        tex.sampler.as_ref().unwrap_or(&self.default_sampler),
                    ),
                });
            }
            let bind_group = self
                .ctx
                .device
                .create_bind_group(&wgpu::BindGroupDescriptor {
                    layout: &program.bind_group_layout,
                    entries: &entries,
                    label: Some(&format!("{} bind_group", program.name)),
                });

            pass.set_pipeline(&program.pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.set_vertex_buffer(0, buffer.slice(..));
            pass.draw(cmd.vertices, 0..1);
            issued += 1;
        }
        issued
    }
}

fn mk_bind_group_layout(
    device: &wgpu::Device,
    descriptor: &ProgramDescriptor,
) -> wgpu::BindGroupLayout {
    let mut entries = vec![wgpu::BindGroupLayoutEntry {
        binding: 0,
        visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }];
    for idx in 0..descriptor.samplers.len() as u32 {
        entries.push(wgpu::BindGroupLayoutEntry {
            binding: 1 + 2 * idx,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                multisampled: false,
                view_dimension: wgpu::TextureViewDimension::D2,
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
            },
            count: None,
        });
        entries.push(wgpu::BindGroupLayoutEntry {
            binding: 2 + 2 * idx,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
            count: None,
        });
    }
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &entries,
        label: Some(&format!("{} bind_group_layout", descriptor.name)),
    })
}

impl GraphicsBackend for WgpuBackend {
    fn create_texture(&mut self, label: &str, image: &image::DynamicImage) -> TextureId {
        let texture = Texture::from_image(&self.ctx.device, &self.ctx.queue, image, Some(label), true);
        let id = TextureId::from_nonzero(self.allocate());
        self.textures.insert(id, texture);
        id
    }

    fn delete_texture(&mut self, texture: TextureId) {
        match self.textures.remove(&texture) {
            Some(tex) => tex.texture.destroy(),
            None => log::warn!("deleting unknown texture {}", texture.get()),
        }
        self.units.retain(|_, bound| *bound != texture);
    }

    fn create_vertex_buffer(&mut self, label: &str, contents: &[u8]) -> BufferId {
        let buffer = self
            .ctx
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{label} Vertex Buffer")),
                contents,
                usage: wgpu::BufferUsages::VERTEX,
            });
        let id = BufferId::from_nonzero(self.allocate());
        self.buffers.insert(id, buffer);
        id
    }

    fn delete_buffer(&mut self, buffer: BufferId) {
        match self.buffers.remove(&buffer) {
            Some(buf) => buf.destroy(),
            None => log::warn!("deleting unknown buffer {}", buffer.get()),
        }
    }

    fn create_vertex_array(&mut self, buffer: BufferId, layout: VertexLayout) -> VertexArrayId {
        if !self.buffers.contains_key(&buffer) {
            log::warn!("vertex array refers to unknown buffer {}", buffer.get());
        }
        let id = VertexArrayId::from_nonzero(self.allocate());
        self.vertex_arrays.insert(id, VertexArray { buffer, layout });
        id
    }

    fn delete_vertex_array(&mut self, vertex_array: VertexArrayId) {
        if self.vertex_arrays.remove(&vertex_array).is_none() {
            log::warn!("deleting unknown vertex array {}", vertex_array.get());
        }
    }

    fn create_program(&mut self, descriptor: &ProgramDescriptor) -> anyhow::Result<ProgramId> {
        let names = descriptor
            .uniforms
            .iter()
            .map(|u| u.name)
            .chain(descriptor.samplers.iter().copied());
        let mut seen = Vec::new();
        for name in names {
            if seen.contains(&name) {
                bail!("program {} declares `{name}` twice", descriptor.name);
            }
            seen.push(name);
        }

        let device = &self.ctx.device;
        let bind_group_layout = mk_bind_group_layout(device, descriptor);
        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(&format!("{} Pipeline Layout", descriptor.name)),
            bind_group_layouts: &[Some(&bind_group_layout)],
            immediate_size: 0,
        });
        let shader = wgpu::ShaderModuleDescriptor {
            label: Some(descriptor.name),
            source: wgpu::ShaderSource::Wgsl(descriptor.source.into()),
        };
        let pipeline = mk_render_pipeline(
            device,
            &layout,
            self.ctx.color_format,
            Some(wgpu::BlendState::ALPHA_BLENDING),
            self.ctx.depth_format,
            None,
            &[descriptor.vertex_layout.desc()],
            shader,
            descriptor.name,
        );

        let mut offset = 0;
        let uniforms = descriptor
            .uniforms
            .iter()
            .map(|decl| {
                let slot = UniformSlot {
                    name: decl.name,
                    kind: decl.kind,
                    offset,
                };
                offset += decl.kind.size();
                slot
            })
            .collect();
        let samplers = descriptor
            .samplers
            .iter()
            .map(|&name| SamplerSlot { name, unit: None })
            .collect();

        let id = ProgramId::from_nonzero(self.allocate());
        self.programs.insert(
            id,
            Program {
                name: descriptor.name,
                pipeline,
                bind_group_layout,
                vertex_layout: descriptor.vertex_layout.clone(),
                uniforms,
                samplers,
                staging: vec![0; descriptor.uniform_block_size()],
            },
        );
        Ok(id)
    }

    fn use_program(&mut self, program: ProgramId) {
        if !self.programs.contains_key(&program) {
            log::error!("using unknown program {}", program.get());
            self.current_program = None;
            return;
        }
        self.current_program = Some(program);
    }

    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation> {
        self.programs.get(&program)?.location(name)
    }

    fn set_uniform_vec4(&mut self, location: UniformLocation, value: [f32; 4]) {
        if let Some(program) = self.current_program_mut() {
            program.write_uniform(location, UniformKind::Vec4, bytemuck::cast_slice(&value));
        }
    }

    fn set_uniform_mat4(&mut self, location: UniformLocation, value: [[f32; 4]; 4]) {
        if let Some(program) = self.current_program_mut() {
            program.write_uniform(location, UniformKind::Mat4, bytemuck::cast_slice(&value));
        }
    }

    fn set_uniform_sampler(&mut self, location: UniformLocation, unit: TextureUnit) {
        if let Some(program) = self.current_program_mut() {
            let idx = (location.0 as usize).checked_sub(program.uniforms.len());
            match idx.and_then(|idx| program.samplers.get_mut(idx)) {
                Some(slot) => slot.unit = Some(unit),
                None => log::error!(
                    "location {} of program {} is not a sampler",
                    location.0,
                    program.name
                ),
            }
        }
    }

    fn bind_texture(&mut self, unit: TextureUnit, texture: TextureId) {
        if !self.textures.contains_key(&texture) {
            log::error!("binding unknown texture {} to unit {}", texture.get(), unit.0);
            return;
        }
        self.units.insert(unit, texture);
    }

    fn draw_triangles(&mut self, vertex_array: VertexArrayId, first: u32, count: u32) {
        let Some(program_id) = self.current_program else {
            log::error!("draw without a program in use");
            return;
        };
        let Some(program) = self.programs.get(&program_id) else {
            return;
        };
        let Some(vao) = self.vertex_arrays.get(&vertex_array) else {
            log::error!("draw of unknown vertex array {}", vertex_array.get());
            return;
        };
        if vao.layout != program.vertex_layout {
            log::error!(
                "vertex array {} does not match the vertex layout of program {}",
                vertex_array.get(),
                program.name
            );
            return;
        }

        let mut textures = Vec::with_capacity(program.samplers.len());
        for slot in &program.samplers {
            let bound = slot.unit.and_then(|unit| self.units.get(&unit));
            let Some(texture) = bound else {
                log::error!(
                    "sampler {} of program {} has no texture bound",
                    slot.name,
                    program.name
                );
                return;
            };
            textures.push(*texture);
        }

        if self.pending.len() == PENDING_DRAWS_WARNING {
            log::warn!(
                "{PENDING_DRAWS_WARNING} draws recorded without a flush, is the frame ever encoded?"
            );
        }
        self.pending.push(DrawCommand {
            program: program_id,
            vertex_array,
            vertices: first..first + count,
            uniforms: program.staging.clone(),
            textures,
        });
    }
}
