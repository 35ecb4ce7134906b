//! Renders the water plane under a square map, seen from above, into a PNG.
//!
//! Usage: `water-preview [OUTPUT.png] [CHUNKS]`

use std::path::PathBuf;

use anyhow::{Context as _, bail};
use flow_water::{
    backend::wgpu_backend::WgpuBackend,
    cgmath::Vector3,
    config::WaterConfig,
    context::Context,
    map::{MapResolution, TileMap},
    render::{RenderSubsystem, render_offscreen, top_down_view_projection},
};

const IMAGE_SIZE: u32 = 512;

fn main() -> anyhow::Result<()> {
    if let Err(e) = env_logger::try_init() {
        eprintln!("Failed to initialise logging: {e}");
    }

    let mut args = std::env::args().skip(1);
    let output = PathBuf::from(args.next().unwrap_or_else(|| "water.png".to_string()));
    let chunks: u32 = match args.next() {
        Some(arg) => arg
            .parse()
            .with_context(|| format!("CHUNKS must be a number, got `{arg}`"))?,
        None => 4,
    };

    let map = TileMap::new(
        Vector3::new(0.0, 0.0, 0.0),
        MapResolution {
            chunks_x: chunks,
            chunks_z: chunks,
            tiles_per_chunk_x: 8,
            tiles_per_chunk_z: 8,
            tile_world_width: 2.0,
            tile_world_height: 2.0,
        },
    );

    let runtime = tokio::runtime::Runtime::new()?;
    let img = runtime.block_on(async {
        let ctx = Context::new_headless(wgpu::TextureFormat::Rgba8Unorm).await?;
        let config = WaterConfig {
            base_path: PathBuf::from(env!("CARGO_MANIFEST_DIR")),
            ..Default::default()
        };
        let mut subsystem = RenderSubsystem::new(WgpuBackend::new(ctx), config)?;
        if !subsystem.water().is_ready() {
            bail!("water textures could not be loaded");
        }

        let (half_x, half_z) = map.resolution.world_half_extents();
        let reach = half_x.max(half_z) * 1.25 + 1.0;
        subsystem.set_view_projection(top_down_view_projection(map.center, reach));
        let img = render_offscreen(
            &mut subsystem,
            &map,
            [IMAGE_SIZE, IMAGE_SIZE],
            wgpu::Color::BLACK,
        )
        .await;
        subsystem.shutdown();
        img
    })?;

    img.save(&output)
        .with_context(|| format!("failed to write {}", output.display()))?;
    log::info!("wrote {}", output.display());
    Ok(())
}
