use std::{collections::HashMap, path::Path};

use anyhow::Context;

use crate::backend::{GraphicsBackend, TextureId};

/// Capability to acquire and release textures by asset path.
///
/// Implementations are shared between render subsystems and reference count
/// every path, so `release` only frees GPU memory once the last user is gone.
pub trait TextureLoader {
    fn load<B: GraphicsBackend>(
        &mut self,
        gfx: &mut B,
        base_path: &Path,
        asset_path: &str,
    ) -> anyhow::Result<TextureId>;

    fn release<B: GraphicsBackend>(&mut self, gfx: &mut B, asset_path: &str);
}

#[derive(Debug)]
struct CachedTexture {
    id: TextureId,
    refcount: usize,
}

/**
 * Texture table keyed by asset path.
 *
 * The first `load` of a path reads, decodes and uploads the image; every
 * further `load` only bumps the reference count and hands out the same id.
 */
#[derive(Debug, Default)]
pub struct TextureCache {
    entries: HashMap<String, CachedTexture>,
}

impl TextureCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current number of holders of `asset_path`, zero when not loaded.
    pub fn refcount(&self, asset_path: &str) -> usize {
        self.entries.get(asset_path).map_or(0, |e| e.refcount)
    }

    pub fn get(&self, asset_path: &str) -> Option<TextureId> {
        self.entries.get(asset_path).map(|e| e.id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl TextureLoader for TextureCache {
    fn load<B: GraphicsBackend>(
        &mut self,
        gfx: &mut B,
        base_path: &Path,
        asset_path: &str,
    ) -> anyhow::Result<TextureId> {
        if let Some(entry) = self.entries.get_mut(asset_path) {
            entry.refcount += 1;
            return Ok(entry.id);
        }

        let bytes = super::load_binary(base_path, asset_path)?;
        let img = image::load_from_memory(&bytes)
            .with_context(|| format!("failed to decode texture {asset_path}"))?;
        let id = gfx.create_texture(asset_path, &img);
        log::debug!(
            "loaded texture {asset_path} ({}x{}) as {}",
            img.width(),
            img.height(),
            id.get()
        );

        self.entries
            .insert(asset_path.to_string(), CachedTexture { id, refcount: 1 });
        Ok(id)
    }

    fn release<B: GraphicsBackend>(&mut self, gfx: &mut B, asset_path: &str) {
        let Some(entry) = self.entries.get_mut(asset_path) else {
            log::warn!("released texture {asset_path} which was never loaded");
            return;
        };
        entry.refcount -= 1;
        if entry.refcount == 0 {
            let id = entry.id;
            self.entries.remove(asset_path);
            gfx.delete_texture(id);
            log::debug!("freed texture {asset_path}");
        }
    }
}
