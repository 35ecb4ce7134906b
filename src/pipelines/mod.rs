//! Render pipeline construction and the programs shipped with the crate.
//!
//! - `basic` builds wgpu render pipelines from a shader and vertex layouts
//! - `water` describes the flat coloured, dual-sampler mesh program

pub mod basic;
pub mod water;
