//! The render subsystem driving the water lifecycle.
//!
//! [`RenderSubsystem`] owns the backend and the shared texture and shader
//! tables. It calls water Init once at construction, Draw once per frame and
//! Shutdown once at teardown. A failed Init is a startup warning: the scene
//! simply renders without water.
//!
//! [`render_offscreen`] renders a single frame into a texture and reads it
//! back, for tools and golden-image tests without a window.

use std::time::Duration;

use anyhow::{Context as _, bail};
use cgmath::{Matrix4, Point3, Vector3};

use crate::{
    backend::{GraphicsBackend, wgpu_backend::WgpuBackend},
    config::WaterConfig,
    data_structures::texture::Texture,
    map::Map,
    pipelines::water::{COLORED_MESH_PROGRAM, U_VIEW_PROJ},
    resources::{
        shader::{ShaderRegistry, Shaders},
        texture::TextureCache,
    },
    water::{WaterRenderer, WaterResources},
};

/// Maps OpenGL clip space (z in -1..1) to wgpu clip space (z in 0..1).
#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

/// Orthographic camera looking straight down at `center`, showing `reach`
/// world units in every direction. Screen right is +X, screen up is -Z.
pub fn top_down_view_projection(center: Vector3<f32>, reach: f32) -> Matrix4<f32> {
    let target = Point3::new(center.x, center.y, center.z);
    let eye = Point3::new(center.x, center.y + 100.0, center.z);
    let view = Matrix4::look_at_rh(eye, target, -Vector3::unit_z());
    let proj = cgmath::ortho(-reach, reach, -reach, reach, 0.1, 1000.0);
    OPENGL_TO_WGPU_MATRIX * proj * view
}

pub struct RenderSubsystem<B: GraphicsBackend> {
    pub gfx: B,
    /// Shared with any other subsystem loading textures through this backend.
    pub textures: TextureCache,
    pub shaders: Shaders,
    water: WaterResources,
    water_renderer: WaterRenderer,
}

impl<B: GraphicsBackend> RenderSubsystem<B> {
    /// Registers the built-in programs and brings up the water plane.
    ///
    /// Only program registration errors are returned; missing water assets are
    /// logged and leave the water Uninitialized.
    pub fn new(mut gfx: B, config: WaterConfig) -> anyhow::Result<Self> {
        let shaders = Shaders::with_builtin(&mut gfx)?;
        let mut textures = TextureCache::new();
        let mut water = WaterResources::new();
        if let Err(e) = water.init(&mut gfx, &mut textures, &config) {
            log::warn!("rendering without water: {e:#}");
        }

        Ok(Self {
            gfx,
            textures,
            shaders,
            water,
            water_renderer: WaterRenderer::new(&config),
        })
    }

    pub fn water(&self) -> &WaterResources {
        &self.water
    }

    /// Upload the camera used by every following draw.
    pub fn set_view_projection(&mut self, view_proj: Matrix4<f32>) {
        let Some(program) = self.shaders.program_by_name(COLORED_MESH_PROGRAM) else {
            return;
        };
        self.gfx.use_program(program);
        if let Some(loc) = self.gfx.uniform_location(program, U_VIEW_PROJ) {
            self.gfx.set_uniform_mat4(loc, view_proj.into());
        }
    }

    /// Draw everything this subsystem renders for the active map.
    ///
    /// With [`WgpuBackend`] the draws are only recorded: call
    /// [`encode`](RenderSubsystem::encode) once per frame to submit them.
    pub fn draw_frame<M: Map + ?Sized>(&mut self, map: &M) {
        if self.water.is_ready() {
            self.water_renderer
                .draw(&mut self.gfx, &self.shaders, &self.water, map);
        }
    }

    /// Release the water resources. Safe to call when the water never came up.
    pub fn shutdown(&mut self) {
        if self.water.is_ready() {
            self.water.shutdown(&mut self.gfx, &mut self.textures);
        }
    }
}

impl RenderSubsystem<WgpuBackend> {
    /// Replay the draws recorded this frame into `pass`.
    pub fn encode(&mut self, pass: &mut wgpu::RenderPass<'_>) -> usize {
        self.gfx.flush(pass)
    }
}

/// Draw `map` once into an offscreen target of `size` pixels and read it back.
///
/// The context must render to `Rgba8Unorm` or `Rgba8UnormSrgb`.
pub async fn render_offscreen<M: Map + ?Sized>(
    subsystem: &mut RenderSubsystem<WgpuBackend>,
    map: &M,
    size: [u32; 2],
    clear: wgpu::Color,
) -> anyhow::Result<image::RgbaImage> {
    let (width, height) = (size[0].max(1), size[1].max(1));
    let ctx = subsystem.gfx.ctx();
    let color_format = ctx.color_format;
    if !matches!(
        color_format,
        wgpu::TextureFormat::Rgba8Unorm | wgpu::TextureFormat::Rgba8UnormSrgb
    ) {
        bail!("offscreen rendering needs an RGBA8 target, got {color_format:?}");
    }
    if ctx
        .depth_format
        .is_some_and(|format| format != Texture::DEPTH_FORMAT)
    {
        bail!("offscreen rendering only supports {:?} depth", Texture::DEPTH_FORMAT);
    }
    // The Arcs inside Device and Queue make these clones cheap handles.
    let device = ctx.device.clone();
    let queue = ctx.queue.clone();
    let depth = ctx
        .depth_format
        .map(|_| Texture::create_depth_texture(&device, [width, height], "Offscreen depth"));
    let target = Texture::create_render_target(&device, [width, height], color_format, "Offscreen target");

    subsystem.draw_frame(map);

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("Offscreen Encoder"),
    });
    let issued = {
        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Offscreen Render Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &target.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(clear),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: depth.as_ref().map(|depth| {
                wgpu::RenderPassDepthStencilAttachment {
                    view: &depth.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }
            }),
            occlusion_query_set: None,
            timestamp_writes: None,
            multiview_mask: None,
        });
        subsystem.encode(&mut render_pass)
    };
    log::debug!("offscreen frame issued {issued} draw(s)");

    // Rows of a texture copy have to be padded to 256 bytes.
    let unpadded_bytes_per_row = 4 * width;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    let padded_bytes_per_row = unpadded_bytes_per_row.div_ceil(align) * align;
    let output_buffer = device.create_buffer(&wgpu::BufferDescriptor {
        size: (padded_bytes_per_row * height) as wgpu::BufferAddress,
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        label: Some("Offscreen readback buffer"),
        mapped_at_creation: false,
    });
    encoder.copy_texture_to_buffer(
        wgpu::TexelCopyTextureInfo {
            aspect: wgpu::TextureAspect::All,
            texture: &target.texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
        },
        wgpu::TexelCopyBufferInfo {
            buffer: &output_buffer,
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(padded_bytes_per_row),
                rows_per_image: Some(height),
            },
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );
    queue.submit(std::iter::once(encoder.finish()));

    let (tx, rx) = futures_intrusive::channel::shared::oneshot_channel();
    let buffer_slice = output_buffer.slice(..);
    buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });
    device
        .poll(wgpu::PollType::Wait {
            submission_index: None,
            timeout: Some(Duration::from_secs(3)),
        })
        .context("GPU did not finish the offscreen frame")?;
    rx.receive()
        .await
        .context("readback buffer mapping was cancelled")??;

    let pixels = {
        let data = buffer_slice.get_mapped_range();
        let mut pixels = Vec::with_capacity((unpadded_bytes_per_row * height) as usize);
        for row in data.chunks(padded_bytes_per_row as usize) {
            pixels.extend_from_slice(&row[..unpadded_bytes_per_row as usize]);
        }
        pixels
    };
    output_buffer.unmap();

    image::RgbaImage::from_raw(width, height, pixels).context("readback has the wrong size")
}
