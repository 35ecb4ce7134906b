//! Loading of external assets and their GPU-side bookkeeping.
//!
//! - `texture` is the reference-counted, path-keyed texture loader
//! - `shader` is the name -> program registry

use std::path::Path;

use anyhow::Context;

pub mod shader;
pub mod texture;

/// Reads `base_path/asset_path` into memory.
pub fn load_binary(base_path: &Path, asset_path: &str) -> anyhow::Result<Vec<u8>> {
    let path = base_path.join(asset_path);
    std::fs::read(&path).with_context(|| format!("failed to read asset {}", path.display()))
}
