//! flow-water
//!
//! An animated water plane drawn under a tile-based terrain map. The crate owns
//! the water's GPU resources (a distortion map, a normal map and a unit quad)
//! and the per-frame draw that stretches the quad over the active map.
//!
//! High-level modules
//! - `backend`: the immediate-mode graphics contract and its wgpu implementation
//! - `config`: asset paths, sampler units and tint of the water
//! - `context`: GPU device/queue and target formats, headless or supplied by the engine
//! - `data_structures`: GPU textures and the water vertex/quad
//! - `map`: the map model the water is placed under
//! - `pipelines`: render pipeline construction and the water program
//! - `resources`: refcounted texture loading and the shader registry
//! - `render`: the render subsystem driving Init/Draw/Shutdown, offscreen rendering
//! - `water`: water resources lifecycle and the draw procedure
//!

pub mod backend;
pub mod config;
pub mod context;
pub mod data_structures;
pub mod map;
pub mod pipelines;
pub mod render;
pub mod resources;
pub mod water;

// Re-exports commonly used types for convenience in downstream code.
pub use cgmath;
pub use wgpu;
