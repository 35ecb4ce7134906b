#[cfg(feature = "integration-tests")]
use crate::common::test_utils::{init_logging, test_config};

#[cfg(feature = "integration-tests")]
mod common;

#[test]
#[cfg(feature = "integration-tests")]
fn should_render_water_under_the_map() {
    use cgmath::Vector3;
    use flow_water::{
        backend::wgpu_backend::WgpuBackend,
        context::Context,
        map::{MapResolution, TileMap},
        render::{RenderSubsystem, render_offscreen, top_down_view_projection},
    };

    init_logging();
    let map = TileMap::new(
        Vector3::new(0.0, 0.0, 0.0),
        MapResolution {
            chunks_x: 2,
            chunks_z: 2,
            tiles_per_chunk_x: 8,
            tiles_per_chunk_z: 8,
            tile_world_width: 2.0,
            tile_world_height: 2.0,
        },
    );

    let runtime = tokio::runtime::Runtime::new().unwrap();
    let img = runtime.block_on(async {
        let ctx = Context::new_headless(wgpu::TextureFormat::Rgba8Unorm)
            .await
            .unwrap();
        let mut subsystem = RenderSubsystem::new(WgpuBackend::new(ctx), test_config()).unwrap();
        assert!(subsystem.water().is_ready());
        // The map spans ±16 world units, the camera shows ±32.
        subsystem.set_view_projection(top_down_view_projection(map.center, 32.0));
        subsystem.draw_frame(&map);
        assert_eq!(subsystem.gfx.pending_draws(), 1);
        let img = render_offscreen(&mut subsystem, &map, [64, 64], wgpu::Color::BLACK)
            .await
            .unwrap();
        assert_eq!(subsystem.gfx.pending_draws(), 0);
        subsystem.shutdown();
        img
    });

    let center = img.get_pixel(32, 32);
    assert_eq!(center[0], 0, "{center:?}");
    assert_eq!(center[1], 0, "{center:?}");
    assert!(center[2] >= 150, "{center:?}");

    for (x, y) in [(0, 0), (63, 0), (0, 63), (63, 63)] {
        assert_eq!(*img.get_pixel(x, y), image::Rgba([0, 0, 0, 255]), "pixel ({x}, {y})");
    }
}

#[test]
#[cfg(feature = "integration-tests")]
fn should_render_only_clear_colour_without_water() {
    use cgmath::Vector3;
    use flow_water::{
        backend::wgpu_backend::WgpuBackend,
        config::WaterConfig,
        context::Context,
        map::{MapResolution, TileMap},
        render::{RenderSubsystem, render_offscreen, top_down_view_projection},
    };

    init_logging();
    let map = TileMap::new(Vector3::new(0.0, 0.0, 0.0), MapResolution::default());
    let config = WaterConfig {
        distortion_map: "assets/water_textures/nope.png".to_string(),
        ..test_config()
    };

    let runtime = tokio::runtime::Runtime::new().unwrap();
    let img = runtime.block_on(async {
        let ctx = Context::new_headless(wgpu::TextureFormat::Rgba8Unorm)
            .await
            .unwrap();
        let mut subsystem = RenderSubsystem::new(WgpuBackend::new(ctx), config).unwrap();
        assert!(!subsystem.water().is_ready());
        subsystem.set_view_projection(top_down_view_projection(map.center, 8.0));
        render_offscreen(&mut subsystem, &map, [16, 16], wgpu::Color::WHITE)
            .await
            .unwrap()
    });

    assert!(img.pixels().all(|p| *p == image::Rgba([255, 255, 255, 255])));
}
