//! Transient Texture Pool
//!
//! Pooled acquire/release for scratch textures. Backends embed one pool and
//! route [`BloomBackend::acquire_temporary`](super::BloomBackend::acquire_temporary)
//! and [`release_temporary`](super::BloomBackend::release_temporary) through
//! it, so a pyramid that is torn down and rebuilt with the same shape reuses
//! the very same textures instead of creating new ones.
//!
//! # Design
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │              TransientTexturePool<T>                │
//! │                                                     │
//! │  free: HashMap<Key, Vec<PooledTexture<T>>>          │
//! │                                                     │
//! │  acquire(desc, create) → T   (pool hit or create)   │
//! │  release(desc, T)            (back to free list)    │
//! │  trim(n) → Vec<T>            (evict idle textures)  │
//! │  drain() → Vec<T>            (evict everything)     │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! # Memory Strategy
//!
//! - Released textures are kept for reuse; nothing is destroyed on release.
//! - The pool grows on demand: a miss calls the backend's `create` closure.
//! - Call [`TransientTexturePool::trim`] periodically (e.g. once per frame,
//!   or after a resolution change) to evict textures nobody asked for in a
//!   while. Evicted textures are handed back to the caller so backends that
//!   own texture storage can free it.

use rustc_hash::FxHashMap;

use super::TextureDesc;
use crate::errors::Result;

/// Key for texture recycling. Every field that affects the physical texture
/// takes part; the debug label does not.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
struct PoolKey {
    width: u32,
    height: u32,
    format: wgpu::TextureFormat,
    depth_format: Option<wgpu::TextureFormat>,
    mip_level_count: u32,
    sample_count: u32,
}

impl PoolKey {
    fn from_desc(desc: &TextureDesc) -> Self {
        Self {
            width: desc.width,
            height: desc.height,
            format: desc.format,
            depth_format: desc.depth_format,
            mip_level_count: desc.mip_level_count,
            sample_count: desc.sample_count,
        }
    }
}

struct PooledTexture<T> {
    texture: T,
    /// Number of `trim` calls this texture has survived in the free list.
    idle_frames: u32,
}

/// Free-list texture pool keyed by texture descriptor.
pub struct TransientTexturePool<T> {
    free: FxHashMap<PoolKey, Vec<PooledTexture<T>>>,
    outstanding: usize,
    created: usize,
}

impl<T> TransientTexturePool<T> {
    /// Creates an empty pool.
    #[must_use]
    pub fn new() -> Self {
        Self {
            free: FxHashMap::default(),
            outstanding: 0,
            created: 0,
        }
    }

    /// Hands out a texture matching `desc`.
    ///
    /// A compatible free texture is reused when available; otherwise
    /// `create` is called. A failing `create` leaves the pool untouched.
    pub fn acquire<F>(&mut self, desc: &TextureDesc, create: F) -> Result<T>
    where
        F: FnOnce(&TextureDesc) -> Result<T>,
    {
        let key = PoolKey::from_desc(desc);

        let texture = match self.free.get_mut(&key).and_then(Vec::pop) {
            Some(pooled) => pooled.texture,
            None => {
                let texture = create(desc)?;
                self.created += 1;
                log::debug!(
                    "Transient pool miss: created {}x{} {:?} ({} total)",
                    desc.width,
                    desc.height,
                    desc.format,
                    self.created
                );
                texture
            }
        };

        self.outstanding += 1;
        Ok(texture)
    }

    /// Returns a texture to the free list.
    ///
    /// `desc` must describe the texture as it was acquired.
    pub fn release(&mut self, desc: &TextureDesc, texture: T) {
        self.outstanding = self.outstanding.saturating_sub(1);
        self.free
            .entry(PoolKey::from_desc(desc))
            .or_default()
            .push(PooledTexture {
                texture,
                idle_frames: 0,
            });
    }

    /// Ages every free texture by one frame and evicts those idle for more
    /// than `max_idle_frames`.
    pub fn trim(&mut self, max_idle_frames: u32) -> Vec<T> {
        let mut evicted = Vec::new();
        for bucket in self.free.values_mut() {
            let mut kept = Vec::with_capacity(bucket.len());
            for mut t in bucket.drain(..) {
                t.idle_frames += 1;
                if t.idle_frames > max_idle_frames {
                    evicted.push(t.texture);
                } else {
                    kept.push(t);
                }
            }
            *bucket = kept;
        }
        self.free.retain(|_, bucket| !bucket.is_empty());
        evicted
    }

    /// Removes every free texture from the pool.
    pub fn drain(&mut self) -> Vec<T> {
        self.free
            .drain()
            .flat_map(|(_, bucket)| bucket.into_iter().map(|t| t.texture))
            .collect()
    }

    /// Number of textures sitting in the free lists.
    #[must_use]
    pub fn free_count(&self) -> usize {
        self.free.values().map(Vec::len).sum()
    }

    /// Number of textures acquired and not yet released.
    #[must_use]
    pub fn outstanding(&self) -> usize {
        self.outstanding
    }

    /// Number of textures ever created through this pool.
    #[must_use]
    pub fn total_created(&self) -> usize {
        self.created
    }
}

impl<T> Default for TransientTexturePool<T> {
    fn default() -> Self {
        Self::new()
    }
}
