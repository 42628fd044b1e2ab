use std::collections::{HashMap, VecDeque};

use macroquad::prelude::Image;

use crate::config;

/// Identity of a loaded, immutable sprite asset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpriteId(pub u64);

/// Where a shadow's outline comes from.
#[derive(Clone, Copy)]
pub enum SpriteSource<'a> {
    /// Stable asset; its silhouette is cached.
    Asset { id: SpriteId, image: &'a Image },
    /// Raster produced this frame (e.g. a sprite-sheet cell); never cached.
    Frame(&'a Image),
}

impl<'a> SpriteSource<'a> {
    pub fn image(&self) -> &'a Image {
        match *self {
            SpriteSource::Asset { image, .. } => image,
            SpriteSource::Frame(image) => image,
        }
    }

    /// A sprite whose pixels have not arrived yet has no extent.
    pub fn is_ready(&self) -> bool {
        let image = self.image();
        image.width > 0 && image.height > 0 && !image.bytes.is_empty()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SilhouetteKey {
    pub sprite: SpriteId,
    pub tint: [u8; 3],
}

/// Write a flat-tinted copy of `src` into `dst`: every pixel keeps its alpha,
/// its color becomes `tint`. Same result as filling with `tint` under a
/// source-in composite over the drawn sprite.
pub fn tint_into(dst: &mut Image, src: &Image, tint: [u8; 3]) {
    dst.width = src.width;
    dst.height = src.height;
    dst.bytes.clear();
    dst.bytes.reserve(src.bytes.len());
    for px in src.bytes.chunks_exact(4) {
        let a = px[3];
        if a == 0 {
            dst.bytes.extend_from_slice(&[0, 0, 0, 0]);
        } else {
            dst.bytes.extend_from_slice(&[tint[0], tint[1], tint[2], a]);
        }
    }
}

pub fn build_silhouette(src: &Image, tint: [u8; 3]) -> Image {
    let mut out = Image::empty();
    tint_into(&mut out, src, tint);
    out
}

/// Bounded silhouette store. Eviction is by insertion order, not by use.
pub struct SilhouetteCache {
    entries: HashMap<SilhouetteKey, Image>,
    order: VecDeque<SilhouetteKey>,
    capacity: usize,
    builds: u64,
}

impl Default for SilhouetteCache {
    fn default() -> Self {
        Self::new(config::SILHOUETTE_CACHE_CAPACITY)
    }
}

impl SilhouetteCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: HashMap::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
            capacity,
            builds: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of silhouettes rasterized since creation.
    pub fn builds(&self) -> u64 {
        self.builds
    }

    pub fn contains(&self, key: &SilhouetteKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn get(&self, key: &SilhouetteKey) -> Option<&Image> {
        self.entries.get(key)
    }

    pub fn get_or_build(&mut self, key: SilhouetteKey, src: &Image) -> &Image {
        if !self.entries.contains_key(&key) {
            while self.entries.len() >= self.capacity {
                let Some(oldest) = self.order.pop_front() else {
                    break;
                };
                self.entries.remove(&oldest);
                log::trace!("evicted silhouette {:?}", oldest);
            }
            self.entries.insert(key, build_silhouette(src, key.tint));
            self.order.push_back(key);
            self.builds += 1;
        }
        &self.entries[&key]
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }
}

/// Cache plus the one scratch raster shared by uncached frame sources.
#[derive(Default)]
pub struct SilhouetteStore {
    cache: SilhouetteCache,
    scratch: Option<Image>,
}

impl SilhouetteStore {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            cache: SilhouetteCache::new(capacity),
            scratch: None,
        }
    }

    pub fn cache(&self) -> &SilhouetteCache {
        &self.cache
    }

    pub fn silhouette(&mut self, sprite: SpriteSource<'_>, tint: [u8; 3]) -> &Image {
        match sprite {
            SpriteSource::Asset { id, image } => self.cache.get_or_build(
                SilhouetteKey { sprite: id, tint },
                image,
            ),
            SpriteSource::Frame(image) => {
                let scratch = self.scratch.get_or_insert_with(Image::empty);
                tint_into(scratch, image, tint);
                scratch
            }
        }
    }

    pub fn clear(&mut self) {
        self.cache.clear();
        self.scratch = None;
    }
}
