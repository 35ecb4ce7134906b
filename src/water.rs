//! Water plane under the active map.
//!
//! [`WaterResources`] owns the GPU side: a distortion map, a normal map and a
//! unit quad at water level. [`WaterRenderer`] places that quad over the map
//! every frame and submits it with the `mesh.static.colored` program.
//!
//! All calls happen on the thread owning the graphics context. Init and
//! Shutdown take `&mut WaterResources`, Draw takes `&WaterResources`, so the
//! borrow checker already forbids drawing while the resources change. Sharing
//! one instance across threads is not supported.
//!
//! Lifecycle misuse (drawing before init, shutting down twice) is a bug in the
//! caller and trips a debug assertion. Release builds log it and do nothing.

use std::cell::OnceCell;

use anyhow::bail;
use cgmath::Matrix4;

use crate::{
    backend::{BufferId, GraphicsBackend, ProgramId, TextureId, UniformLocation, VertexArrayId},
    config::{DISTORTION_SAMPLER, NORMAL_SAMPLER, SamplerUnits, WaterConfig},
    data_structures::water::{SURFACE_VERTEX_COUNT, WaterVertex, surface_vertices},
    map::Map,
    pipelines::water::{COLORED_MESH_PROGRAM, U_COLOR, U_MODEL},
    resources::{shader::ShaderRegistry, texture::TextureLoader},
};

/// A texture acquired through the loader, remembered by the path it was loaded from.
#[derive(Clone, Debug, PartialEq)]
pub struct SurfaceTexture {
    pub asset_path: String,
    pub id: TextureId,
    /// Sampler of the water program this texture feeds.
    pub sampler: &'static str,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SurfaceMesh {
    pub buffer: BufferId,
    pub vertex_array: VertexArrayId,
    pub num_vertices: u32,
}

/// Handles held while the water is Ready.
#[derive(Clone, Debug, PartialEq)]
pub struct WaterSurface {
    pub distortion: SurfaceTexture,
    pub normal: SurfaceTexture,
    pub mesh: SurfaceMesh,
}

/// GPU resources of the water plane, Uninitialized until [`init`](Self::init) succeeds.
#[derive(Debug, Default)]
pub struct WaterResources {
    surface: Option<WaterSurface>,
}

impl WaterResources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_ready(&self) -> bool {
        self.surface.is_some()
    }

    pub fn surface(&self) -> Option<&WaterSurface> {
        self.surface.as_ref()
    }

    /// Acquire both textures and build the quad.
    ///
    /// On error nothing stays acquired: a distortion map loaded before a
    /// failing normal map is released again before returning.
    pub fn init<B, L>(&mut self, gfx: &mut B, textures: &mut L, config: &WaterConfig) -> anyhow::Result<()>
    where
        B: GraphicsBackend,
        L: TextureLoader,
    {
        debug_assert!(!self.is_ready(), "water resources initialised twice");
        if self.is_ready() {
            bail!("water resources are already initialised");
        }
        for sampler in [DISTORTION_SAMPLER, NORMAL_SAMPLER] {
            if config.samplers.unit(sampler).is_none() {
                bail!("sampler `{sampler}` has no texture unit assigned");
            }
        }

        let distortion = textures.load(gfx, &config.base_path, &config.distortion_map)?;
        let normal = match textures.load(gfx, &config.base_path, &config.normal_map) {
            Ok(id) => id,
            Err(e) => {
                textures.release(gfx, &config.distortion_map);
                return Err(e);
            }
        };

        let vertices = surface_vertices(config.water_level);
        let buffer = gfx.create_vertex_buffer("Water Surface", bytemuck::cast_slice(&vertices));
        let vertex_array = gfx.create_vertex_array(buffer, WaterVertex::layout());

        self.surface = Some(WaterSurface {
            distortion: SurfaceTexture {
                asset_path: config.distortion_map.clone(),
                id: distortion,
                sampler: DISTORTION_SAMPLER,
            },
            normal: SurfaceTexture {
                asset_path: config.normal_map.clone(),
                id: normal,
                sampler: NORMAL_SAMPLER,
            },
            mesh: SurfaceMesh {
                buffer,
                vertex_array,
                num_vertices: SURFACE_VERTEX_COUNT,
            },
        });
        log::debug!("water surface ready");
        Ok(())
    }

    /// Give both textures back to the loader and delete the quad.
    ///
    /// The textures are only freed on the GPU when no other subsystem holds
    /// them. Afterwards the resources are Uninitialized and `init` may run again.
    pub fn shutdown<B, L>(&mut self, gfx: &mut B, textures: &mut L)
    where
        B: GraphicsBackend,
        L: TextureLoader,
    {
        debug_assert!(self.is_ready(), "water resources shut down while uninitialised");
        let Some(surface) = self.surface.take() else {
            log::error!("water shutdown without a successful init");
            return;
        };

        textures.release(gfx, &surface.distortion.asset_path);
        textures.release(gfx, &surface.normal.asset_path);
        gfx.delete_vertex_array(surface.mesh.vertex_array);
        gfx.delete_buffer(surface.mesh.buffer);
        log::debug!("water surface released");
    }
}

/// Model matrix stretching the unit quad over the whole map.
///
/// The quad is scaled to the map's half extents first and then moved to the
/// map's center. Y is never scaled, the water level comes from the mesh.
pub fn model_transform<M: Map + ?Sized>(map: &M) -> Matrix4<f32> {
    let (half_x, half_z) = map.resolution().world_half_extents();
    Matrix4::from_translation(map.center_world_position())
        * Matrix4::from_nonuniform_scale(half_x, 1.0, half_z)
}

/// Uniform locations of the water program, resolved on the first draw.
#[derive(Clone, Copy, Debug)]
struct DrawLocations {
    program: ProgramId,
    color: Option<UniformLocation>,
    model: Option<UniformLocation>,
    /// Distortion sampler first, then the normal sampler.
    samplers: [Option<UniformLocation>; 2],
}

/// Per-frame draw of the water plane.
#[derive(Clone, Debug)]
pub struct WaterRenderer {
    pub tint: [f32; 4],
    pub samplers: SamplerUnits,
    locations: OnceCell<DrawLocations>,
}

impl WaterRenderer {
    pub fn new(config: &WaterConfig) -> Self {
        Self {
            tint: config.tint,
            samplers: config.samplers.clone(),
            locations: OnceCell::new(),
        }
    }

    fn locations<B: GraphicsBackend>(&self, gfx: &B, program: ProgramId) -> DrawLocations {
        if let Some(cached) = self.locations.get()
            && cached.program == program
        {
            return *cached;
        }
        let resolved = DrawLocations {
            program,
            color: gfx.uniform_location(program, U_COLOR),
            model: gfx.uniform_location(program, U_MODEL),
            samplers: [
                gfx.uniform_location(program, DISTORTION_SAMPLER),
                gfx.uniform_location(program, NORMAL_SAMPLER),
            ],
        };
        // A program registered after the first draw is looked up every frame.
        let _ = self.locations.set(resolved);
        resolved
    }

    /// Issue exactly one 6 vertex draw covering `map`.
    ///
    /// `water` must be Ready and `shaders` must know `mesh.static.colored`.
    /// Uniform and sampler locations are resolved once and reused while the
    /// program stays the same. Texture units come from [`Self::samplers`] on
    /// every call, [`WaterResources::init`] has already checked that both
    /// samplers have one.
    pub fn draw<B, S, M>(&self, gfx: &mut B, shaders: &S, water: &WaterResources, map: &M)
    where
        B: GraphicsBackend,
        S: ShaderRegistry + ?Sized,
        M: Map + ?Sized,
    {
        debug_assert!(water.is_ready(), "water drawn before a successful init");
        let Some(surface) = water.surface() else {
            log::error!("water drawn before a successful init");
            return;
        };
        let program = shaders.program_by_name(COLORED_MESH_PROGRAM);
        debug_assert!(program.is_some(), "program {COLORED_MESH_PROGRAM} is not registered");
        let Some(program) = program else {
            log::error!("program {COLORED_MESH_PROGRAM} is not registered");
            return;
        };
        let locations = self.locations(gfx, program);

        gfx.use_program(program);

        if let Some(loc) = locations.color {
            gfx.set_uniform_vec4(loc, self.tint);
        }

        for (texture, location) in [&surface.distortion, &surface.normal]
            .into_iter()
            .zip(locations.samplers)
        {
            let unit = self.samplers.unit(texture.sampler);
            debug_assert!(unit.is_some(), "sampler {} has no texture unit", texture.sampler);
            let Some(unit) = unit else {
                log::error!("sampler {} has no texture unit", texture.sampler);
                continue;
            };
            if let Some(loc) = location {
                gfx.set_uniform_sampler(loc, unit);
            }
            gfx.bind_texture(unit, texture.id);
        }

        if let Some(loc) = locations.model {
            gfx.set_uniform_mat4(loc, model_transform(map).into());
        }

        gfx.draw_triangles(surface.mesh.vertex_array, 0, surface.mesh.num_vertices);
    }
}
