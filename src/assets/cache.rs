use std::collections::HashMap;
use std::sync::Arc;

use rayon::prelude::*;

use crate::assets::decode::ImageDecoder;
use crate::assets::extract::AssetCatalog;
use crate::foundation::error::{GraspError, GraspResult};
use crate::render::bitmap::Bitmap;

/// Which buffer family an asset name belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AssetKind {
    /// Full-screen picture (`.pic`), also the source of decode palettes.
    Picture,
    /// Clipping (`.clp`), a smaller image composited onto the canvas.
    Clip,
}

impl AssetKind {
    fn noun(self) -> &'static str {
        match self {
            Self::Picture => "picture",
            Self::Clip => "clip",
        }
    }
}

/// Cache identity for one decoded bitmap.
///
/// The palette name is part of the key: the same asset decoded under two
/// palettes yields two distinct entries, so a palette change never needs to
/// evict anything — entries prepared under the old palette stop being hit.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Asset name, lower-cased.
    pub name: String,
    /// Buffer family the name resolves in.
    pub kind: AssetKind,
    /// Active palette identity at decode time, lower-cased.
    pub palette: Option<String>,
}

impl CacheKey {
    fn new(name: &str, kind: AssetKind, palette: Option<&str>) -> Self {
        Self {
            name: name.to_ascii_lowercase(),
            kind,
            palette: palette.map(str::to_ascii_lowercase),
        }
    }
}

/// Memoizes decoded bitmaps for the lifetime of one run.
///
/// Entries are never evicted; scripts are short-lived single runs and the
/// decoded assets are small DOS-era rasters.
pub struct ImageCache {
    catalog: AssetCatalog,
    decoder: Box<dyn ImageDecoder>,
    entries: HashMap<CacheKey, Arc<Bitmap>>,
}

impl ImageCache {
    /// Cache resolving names through `catalog` and decoding via `decoder`.
    pub fn new(catalog: AssetCatalog, decoder: Box<dyn ImageDecoder>) -> Self {
        Self {
            catalog,
            decoder,
            entries: HashMap::new(),
        }
    }

    /// The catalog names are resolved against.
    pub fn catalog(&self) -> &AssetCatalog {
        &self.catalog
    }

    /// Cached decode of `name` under the given palette identity. A decode
    /// failure (including an unknown asset name) is fatal to the run.
    pub fn load(
        &mut self,
        name: &str,
        kind: AssetKind,
        palette: Option<&str>,
    ) -> GraspResult<Arc<Bitmap>> {
        let key = CacheKey::new(name, kind, palette);
        if let Some(hit) = self.entries.get(&key) {
            return Ok(hit.clone());
        }
        let bmp = Arc::new(self.decode_one(&key)?);
        self.entries.insert(key, bmp.clone());
        Ok(bmp)
    }

    /// Decode any not-yet-cached `names` in parallel, bounded by the rayon
    /// pool. Decodes are read-only against interpreter state and write-once
    /// into the cache, so no locking is involved.
    pub fn prepare_all(
        &mut self,
        names: &[String],
        kind: AssetKind,
        palette: Option<&str>,
    ) -> GraspResult<()> {
        let mut missing: Vec<CacheKey> = Vec::new();
        for name in names {
            let key = CacheKey::new(name, kind, palette);
            if !self.entries.contains_key(&key) && !missing.contains(&key) {
                missing.push(key);
            }
        }

        let decoded: Vec<(CacheKey, GraspResult<Bitmap>)> = missing
            .into_par_iter()
            .map(|key| {
                let result = self.decode_one(&key);
                (key, result)
            })
            .collect();

        for (key, result) in decoded {
            self.entries.insert(key, Arc::new(result?));
        }
        Ok(())
    }

    fn decode_one(&self, key: &CacheKey) -> GraspResult<Bitmap> {
        let path = match key.kind {
            AssetKind::Picture => self.catalog.pic_path(&key.name),
            AssetKind::Clip => self.catalog.clip_path(&key.name),
        }
        .ok_or_else(|| {
            GraspError::decode(format!("no {} asset named '{}'", key.kind.noun(), key.name))
        })?;

        let palette_path = match key.palette.as_deref() {
            None => None,
            Some(pal) => Some(self.catalog.pic_path(pal).ok_or_else(|| {
                GraspError::decode(format!("palette picture '{pal}' is not in the container"))
            })?),
        };

        self.decoder.decode(path, palette_path)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/cache.rs"]
mod tests;
