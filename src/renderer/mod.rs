//! Execution Backends
//!
//! The bloom core never touches a GPU API directly. It talks to the host
//! through [`BloomBackend`], which bundles the four collaborator services the
//! effect needs:
//!
//! - a per-frame recording context (`blit`, `copy`, `clear`),
//! - a pooled scratch-texture allocator (`acquire_temporary` /
//!   `release_temporary`),
//! - a size query for images it is handed,
//! - a readiness flag for the filter program.
//!
//! Two implementations ship with the crate:
//!
//! | Backend | Texture handle | Purpose |
//! |---------|----------------|---------|
//! | [`cpu::CpuBackend`] | [`cpu::CpuTextureId`] | Reference filters, tests, offline processing |
//! | [`gpu::GpuFrame`] | [`gpu::GpuTexture`] | wgpu fullscreen passes recorded into a `CommandEncoder` |

pub mod cpu;
pub mod gpu;
pub mod transient_pool;

use glam::UVec2;

use crate::core::filter::{FilterParams, FilterPass};
use crate::errors::Result;

pub use transient_pool::TransientTexturePool;

/// Descriptor for a render target.
///
/// Mirrors the subset of a texture descriptor the effect cares about. Only
/// `width`, `height` and `format` take part in pyramid invalidation (see
/// [`TextureDesc::main_parameters_match`]); every field except `label`
/// takes part in pool recycling.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextureDesc {
    pub width: u32,
    pub height: u32,
    pub format: wgpu::TextureFormat,
    /// Depth attachment format, if the host's target carries one.
    pub depth_format: Option<wgpu::TextureFormat>,
    pub mip_level_count: u32,
    pub sample_count: u32,
    pub label: &'static str,
}

impl TextureDesc {
    /// A single-sampled, single-mip color target without depth.
    #[must_use]
    pub fn color(width: u32, height: u32, format: wgpu::TextureFormat) -> Self {
        Self {
            width,
            height,
            format,
            depth_format: None,
            mip_level_count: 1,
            sample_count: 1,
            label: "Bloom Scratch",
        }
    }

    #[must_use]
    pub fn with_label(mut self, label: &'static str) -> Self {
        self.label = label;
        self
    }

    /// Strips everything a color-only scratch copy does not need.
    #[must_use]
    pub fn color_only(mut self) -> Self {
        self.depth_format = None;
        self.mip_level_count = 1;
        self.sample_count = 1;
        self
    }

    #[inline]
    #[must_use]
    pub fn extent(&self) -> UVec2 {
        UVec2::new(self.width, self.height)
    }

    /// Compares only the fields that decide whether a pyramid built for
    /// `self` is still usable for `other`: width, height and color format.
    #[must_use]
    pub fn main_parameters_match(&self, other: &TextureDesc) -> bool {
        self.width == other.width && self.height == other.height && self.format == other.format
    }
}

/// Host collaborator for the bloom effect.
///
/// All calls for one frame are issued in program order onto one recording
/// stream; implementations must preserve that order.
pub trait BloomBackend {
    /// Image handle. Host-owned images are only ever borrowed by the core;
    /// temporaries are owned by the core between `acquire_temporary` and
    /// `release_temporary`.
    type Texture;

    /// Whether the filter program is loaded. When `false` the effect skips
    /// the frame without recording anything.
    fn is_ready(&self) -> bool {
        true
    }

    /// Pixel dimensions of `texture`.
    fn texture_size(&self, texture: &Self::Texture) -> Result<UVec2>;

    /// Obtains a scratch texture matching `desc`, reusing a pooled one when
    /// possible.
    fn acquire_temporary(&mut self, desc: &TextureDesc) -> Result<Self::Texture>;

    /// Returns a scratch texture obtained from `acquire_temporary` with the
    /// same `desc`.
    fn release_temporary(&mut self, desc: &TextureDesc, texture: Self::Texture);

    /// Records a fullscreen filter invocation reading `source` and writing
    /// `destination`.
    fn blit(
        &mut self,
        source: &Self::Texture,
        destination: &Self::Texture,
        pass: FilterPass,
        params: &FilterParams<'_, Self::Texture>,
    ) -> Result<()>;

    /// Records a plain copy, resampling when the sizes differ.
    fn copy(&mut self, source: &Self::Texture, destination: &Self::Texture) -> Result<()> {
        self.blit(source, destination, FilterPass::Copy, &FilterParams::new())
    }

    /// Records a clear of `destination` to transparent black.
    fn clear(&mut self, destination: &Self::Texture) -> Result<()>;

    /// Evicts pooled temporaries idle for more than `max_idle_frames` frames.
    fn trim_temporaries(&mut self, _max_idle_frames: u32) {}

    /// Frees every pooled temporary that is not currently acquired.
    fn destroy_temporaries(&mut self) {}
}
