//! Engine data structures: textures and the water surface geometry.
//!
//! - `texture` contains the GPU texture wrapper and creation utilities
//! - `water` holds the position-only vertex type and the surface quad

pub mod texture;
pub mod water;
