use std::collections::HashMap;

use anyhow::bail;

use crate::{
    backend::{GraphicsBackend, ProgramDescriptor, ProgramId},
    pipelines,
};

/// Lookup of linked programs by their well-known name.
pub trait ShaderRegistry {
    fn program_by_name(&self, name: &str) -> Option<ProgramId>;
}

/// Programs linked through a [`GraphicsBackend`], registered once at startup.
#[derive(Debug, Default)]
pub struct Shaders {
    programs: HashMap<&'static str, ProgramId>,
}

impl Shaders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every program shipped with the crate.
    pub fn with_builtin<B: GraphicsBackend>(gfx: &mut B) -> anyhow::Result<Self> {
        let mut shaders = Self::new();
        shaders.register(gfx, &pipelines::water::colored_mesh_program())?;
        Ok(shaders)
    }

    pub fn register<B: GraphicsBackend>(
        &mut self,
        gfx: &mut B,
        descriptor: &ProgramDescriptor,
    ) -> anyhow::Result<ProgramId> {
        if self.programs.contains_key(descriptor.name) {
            bail!("program {} is already registered", descriptor.name);
        }
        let program = gfx.create_program(descriptor)?;
        self.programs.insert(descriptor.name, program);
        log::debug!("registered program {} as {}", descriptor.name, program.get());
        Ok(program)
    }
}

impl ShaderRegistry for Shaders {
    fn program_by_name(&self, name: &str) -> Option<ProgramId> {
        self.programs.get(name).copied()
    }
}
