//! Map spatial model consumed by the water renderer.
//!
//! A map is split into chunks, each chunk into tiles. Only the world-space
//! footprint matters here: its center and how far it extends along X and Z.

use cgmath::Vector3;

/// World units between two height levels of a tile.
pub const Y_COORDS_PER_TILE: f32 = 4.0;

/// Chunk and tile counts plus the world size of a single tile.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MapResolution {
    pub chunks_x: u32,
    pub chunks_z: u32,
    pub tiles_per_chunk_x: u32,
    pub tiles_per_chunk_z: u32,
    pub tile_world_width: f32,
    pub tile_world_height: f32,
}

impl MapResolution {
    /// Half of the map's world extent along X and Z.
    ///
    /// Zero chunks or tiles yield `(0.0, 0.0)` on that axis.
    pub fn world_half_extents(&self) -> (f32, f32) {
        let tiles_x = self.chunks_x as f32 * self.tiles_per_chunk_x as f32;
        let tiles_z = self.chunks_z as f32 * self.tiles_per_chunk_z as f32;
        (
            tiles_x * self.tile_world_width / 2.0,
            tiles_z * self.tile_world_height / 2.0,
        )
    }
}

/// Read-only view of the active map.
pub trait Map {
    fn center_world_position(&self) -> Vector3<f32>;
    fn resolution(&self) -> MapResolution;
}

/// Plain map description, enough to place the water under it.
#[derive(Clone, Debug, PartialEq)]
pub struct TileMap {
    pub center: Vector3<f32>,
    pub resolution: MapResolution,
}

impl TileMap {
    pub fn new(center: Vector3<f32>, resolution: MapResolution) -> Self {
        Self { center, resolution }
    }
}

impl Map for TileMap {
    fn center_world_position(&self) -> Vector3<f32> {
        self.center
    }

    fn resolution(&self) -> MapResolution {
        self.resolution
    }
}
