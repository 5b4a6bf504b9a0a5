//! Pyramid Buffer Manager
//!
//! Owns the chain of scratch textures the downsample/upsample passes ping
//! between. The chain is rebuilt only when the iteration count, the base
//! resolution, or the destination's main parameters (width, height, color
//! format) change; every other frame gets the existing chain back with zero
//! allocation.
//!
//! ```text
//!             resolution (e.g. 512×288)
//!                    │ >> 1
//!   level 0   256×144   ← finest, prefilter writes here
//!   level 1   128×72
//!   level 2    64×36
//!   ...
//!   level L-1          ← coarsest, stops before w < 2 or h < 2
//! ```
//!
//! Levels are acquired from and released to the backend's temporary pool,
//! so a chain that is torn down and rebuilt with the same shape reuses its
//! old textures.

use glam::{UVec2, Vec2};

use super::params::{pyramid_extents, texel_size};
use crate::errors::Result;
use crate::renderer::{BloomBackend, TextureDesc};

/// One scratch render target of the pyramid.
#[derive(Debug)]
pub struct PyramidLevel<T> {
    pub texture: T,
    pub desc: TextureDesc,
    /// Always bilinear; the tent and box kernels rely on hardware filtering.
    pub filter: wgpu::FilterMode,
}

impl<T> PyramidLevel<T> {
    #[inline]
    #[must_use]
    pub fn extent(&self) -> UVec2 {
        self.desc.extent()
    }

    #[inline]
    #[must_use]
    pub fn texel_size(&self) -> Vec2 {
        texel_size(self.extent())
    }
}

/// Snapshot of the inputs a chain was built for.
///
/// `==` is [`BufferParameters::matches`].
#[derive(Clone, Copy, Debug)]
pub struct BufferParameters {
    pub iterations: u32,
    pub resolution: UVec2,
    pub destination: TextureDesc,
}

impl BufferParameters {
    /// Structural equality over the fields that shape the chain. Destination
    /// depth, mip count, sample count and label are ignored.
    #[must_use]
    pub fn matches(&self, other: &BufferParameters) -> bool {
        self.iterations == other.iterations
            && self.resolution == other.resolution
            && self.destination.main_parameters_match(&other.destination)
    }
}

impl PartialEq for BufferParameters {
    fn eq(&self, other: &Self) -> bool {
        self.matches(other)
    }
}

impl Eq for BufferParameters {}

enum PyramidState<T> {
    Uninitialized,
    Valid {
        params: BufferParameters,
        chain: Vec<PyramidLevel<T>>,
    },
}

/// Lazily (re)allocated chain of pyramid levels.
pub struct PyramidBuffers<T> {
    state: PyramidState<T>,
}

impl<T> Default for PyramidBuffers<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> PyramidBuffers<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: PyramidState::Uninitialized,
        }
    }

    /// Makes sure the chain matches the requested parameters and returns it.
    ///
    /// On a parameter change every held level goes back to the pool before
    /// the new chain is built. If the backend fails to provide a level, the
    /// partial chain is released too and the manager is left uninitialized,
    /// so the next call starts from scratch.
    pub fn ensure<B>(
        &mut self,
        backend: &mut B,
        resolution: UVec2,
        iterations: u32,
        destination: &TextureDesc,
    ) -> Result<&[PyramidLevel<T>]>
    where
        B: BloomBackend<Texture = T> + ?Sized,
    {
        let requested = BufferParameters {
            iterations,
            resolution,
            destination: *destination,
        };

        let up_to_date =
            matches!(&self.state, PyramidState::Valid { params, .. } if params.matches(&requested));

        if !up_to_date {
            self.release(backend);
            let chain = Self::allocate_chain(backend, &requested)?;

            log::debug!(
                "Bloom pyramid allocated: base {}x{}, {} of {} levels, {:?}",
                resolution.x,
                resolution.y,
                chain.len(),
                iterations,
                destination.format,
            );

            self.state = PyramidState::Valid {
                params: requested,
                chain,
            };
        }

        Ok(self.levels())
    }

    fn allocate_chain<B>(backend: &mut B, params: &BufferParameters) -> Result<Vec<PyramidLevel<T>>>
    where
        B: BloomBackend<Texture = T> + ?Sized,
    {
        let extents = pyramid_extents(params.resolution, params.iterations);
        let mut chain: Vec<PyramidLevel<T>> = Vec::with_capacity(extents.len());

        for extent in extents {
            let desc = TextureDesc::color(extent.x, extent.y, params.destination.format)
                .with_label("Bloom Pyramid Level");

            match backend.acquire_temporary(&desc) {
                Ok(texture) => chain.push(PyramidLevel {
                    texture,
                    desc,
                    filter: wgpu::FilterMode::Linear,
                }),
                Err(err) => {
                    for level in chain.drain(..) {
                        backend.release_temporary(&level.desc, level.texture);
                    }
                    return Err(err);
                }
            }
        }

        Ok(chain)
    }

    /// Returns every held level to the backend's pool. Safe to call any
    /// number of times, including before the first `ensure`.
    pub fn release<B>(&mut self, backend: &mut B)
    where
        B: BloomBackend<Texture = T> + ?Sized,
    {
        if let PyramidState::Valid { chain, .. } =
            std::mem::replace(&mut self.state, PyramidState::Uninitialized)
        {
            for level in chain {
                backend.release_temporary(&level.desc, level.texture);
            }
        }
    }

    /// Current chain, finest first. Empty when uninitialized.
    #[must_use]
    pub fn levels(&self) -> &[PyramidLevel<T>] {
        match &self.state {
            PyramidState::Valid { chain, .. } => chain,
            PyramidState::Uninitialized => &[],
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.levels().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.levels().is_empty()
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        matches!(self.state, PyramidState::Valid { .. })
    }

    /// Parameters the current chain was built for.
    #[must_use]
    pub fn parameters(&self) -> Option<&BufferParameters> {
        match &self.state {
            PyramidState::Valid { params, .. } => Some(params),
            PyramidState::Uninitialized => None,
        }
    }
}
