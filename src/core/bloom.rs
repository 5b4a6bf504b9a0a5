//! Bloom Pass Sequencer
//!
//! Records the fixed bloom pipeline onto a [`BloomBackend`]:
//!
//! ```text
//! source ──Prefilter──▶ L0 ──Down──▶ L1 ──Down──▶ … ──Down──▶ L(n-1)
//!                        ▲            ▲                          │
//!                        └────Up──────┴───────Up──── … ◀─────────┘
//!                        │
//!                        └──Final (× intensity)──▶ bloom result
//!
//! source + bloom result ──Combine (+ dither)──▶ destination
//! ```
//!
//! The recorded order is part of the contract: prefilter first, downsamples
//! finest to coarsest, upsamples coarsest to finest, final after the last
//! upsample, combine after final.
//!
//! Two entry points exist. [`Bloom::apply`] + [`Bloom::combine`] suit hosts
//! that manage their own targets. [`Bloom::run_full_pipeline`] is the fused
//! variant for hosts that cannot read and write the same image in one frame:
//! it copies the source into a temporary first and owns the bloom target.

use glam::UVec2;

use super::filter::{FilterParams, FilterPass, ParamKey};
use super::params::{ThresholdCurve, bloom_resolution, noise_scale, texel_size};
use super::pyramid::{PyramidBuffers, PyramidLevel};
use crate::errors::Result;
use crate::renderer::{BloomBackend, TextureDesc};
use crate::settings::BloomSettings;

/// Format of the bloom target and its pyramid in the fused pipeline.
/// Half-float keeps HDR highlights through the accumulation passes.
pub const BLOOM_TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;

/// Dither texture used by the combine pass.
#[derive(Debug, Clone)]
pub struct NoiseTexture<T> {
    pub texture: T,
    pub size: UVec2,
}

/// Why a frame's bloom was not recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The backend's filter program is not available yet.
    ProgramUnavailable,
    /// The resolution is too small for even one pyramid level.
    NoPyramidLevels,
    /// Bloom is switched off in the settings.
    Disabled,
}

/// Result of a frame's bloom recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BloomOutcome {
    Applied {
        /// Realized pyramid depth.
        levels: usize,
    },
    Skipped(SkipReason),
}

impl BloomOutcome {
    #[must_use]
    pub fn is_applied(&self) -> bool {
        matches!(self, BloomOutcome::Applied { .. })
    }
}

/// Multi-resolution bloom effect.
///
/// Stateless across frames apart from the pyramid chain and the snapshot it
/// was built for.
pub struct Bloom<T> {
    settings: BloomSettings,
    noise: Option<NoiseTexture<T>>,
    pyramid: PyramidBuffers<T>,
}

impl<T> Default for Bloom<T> {
    fn default() -> Self {
        Self::new(BloomSettings::default())
    }
}

impl<T> Bloom<T> {
    #[must_use]
    pub fn new(settings: BloomSettings) -> Self {
        Self {
            settings,
            noise: None,
            pyramid: PyramidBuffers::new(),
        }
    }

    /// Replaces the user parameters. Takes effect on the next recorded frame.
    pub fn set_parameters(&mut self, settings: BloomSettings) {
        self.settings = settings;
    }

    /// Sets the dither texture used by the fused pipeline's combine pass.
    pub fn set_noise_texture(&mut self, noise: Option<NoiseTexture<T>>) {
        self.noise = noise;
    }

    #[must_use]
    pub fn settings(&self) -> &BloomSettings {
        &self.settings
    }

    #[must_use]
    pub fn noise_texture(&self) -> Option<&NoiseTexture<T>> {
        self.noise.as_ref()
    }

    #[must_use]
    pub fn pyramid(&self) -> &PyramidBuffers<T> {
        &self.pyramid
    }

    /// Runs prefilter, downsample, upsample and final, leaving the bloom
    /// result in `destination`.
    ///
    /// `resolution` is the bloom base resolution; the pyramid starts at half
    /// of it. When not even one level fits, `destination` is cleared so that
    /// it still holds a defined (zero) bloom contribution.
    ///
    /// An allocator failure is returned as an error before anything is
    /// recorded, leaving `destination` untouched.
    pub fn apply<B>(
        &mut self,
        backend: &mut B,
        source: &T,
        destination: &T,
        resolution: UVec2,
        destination_desc: &TextureDesc,
    ) -> Result<BloomOutcome>
    where
        B: BloomBackend<Texture = T> + ?Sized,
    {
        if !backend.is_ready() {
            log::trace!("Bloom skipped: filter program unavailable");
            return Ok(BloomOutcome::Skipped(SkipReason::ProgramUnavailable));
        }

        let levels = self.pyramid.ensure(
            backend,
            resolution,
            self.settings.iterations(),
            destination_desc,
        )?;

        if levels.is_empty() {
            backend.clear(destination)?;
            return Ok(BloomOutcome::Skipped(SkipReason::NoPyramidLevels));
        }

        record_pyramid(backend, &self.settings, levels, source, destination, resolution)?;

        Ok(BloomOutcome::Applied {
            levels: levels.len(),
        })
    }

    /// Blends `source` and the bloom result into `destination`.
    ///
    /// The dither texture tiles at one texel per destination pixel; without
    /// one the scale stays `(1, 1)` and the backend's default noise is used.
    pub fn combine<B>(
        &self,
        backend: &mut B,
        source: &T,
        destination: &T,
        bloom: &T,
        noise: Option<&NoiseTexture<T>>,
    ) -> Result<BloomOutcome>
    where
        B: BloomBackend<Texture = T> + ?Sized,
    {
        if !backend.is_ready() {
            return Ok(BloomOutcome::Skipped(SkipReason::ProgramUnavailable));
        }

        let screen = backend.texture_size(destination)?;
        let scale = noise_scale(screen, noise.map(|n| n.size));

        let mut params = FilterParams::new()
            .with_texture(ParamKey::SourceTex, source)
            .with_vec2(ParamKey::NoiseTexScale, scale);
        if let Some(noise) = noise {
            params = params.with_texture(ParamKey::NoiseTex, &noise.texture);
        }

        record(backend, bloom, destination, FilterPass::Combine, &params)?;

        Ok(BloomOutcome::Applied {
            levels: self.pyramid.len(),
        })
    }

    /// Releases the pyramid back to the backend's pool and drops the noise
    /// texture. Idempotent.
    pub fn dispose<B>(&mut self, backend: &mut B)
    where
        B: BloomBackend<Texture = T> + ?Sized,
    {
        self.pyramid.release(backend);
        self.noise = None;
    }
}

impl<T: PartialEq> Bloom<T> {
    /// Fused pipeline: copy, bloom, combine.
    ///
    /// `camera_desc` describes `source`; its size is the screen size used
    /// for the bloom target aspect ratio and the dither tiling. `source` and
    /// `destination` may be the same image.
    ///
    /// When the effect is disabled or the pyramid is empty, `destination`
    /// receives an unmodified copy of `source`. On allocator failure the same
    /// fallback copy is recorded before the error is returned.
    pub fn run_full_pipeline<B>(
        &mut self,
        backend: &mut B,
        source: &T,
        destination: &T,
        camera_desc: &TextureDesc,
    ) -> Result<BloomOutcome>
    where
        B: BloomBackend<Texture = T> + ?Sized,
    {
        if !backend.is_ready() {
            log::trace!("Bloom skipped: filter program unavailable");
            return Ok(BloomOutcome::Skipped(SkipReason::ProgramUnavailable));
        }

        if !self.settings.enabled {
            if source != destination {
                backend.copy(source, destination)?;
            }
            return Ok(BloomOutcome::Skipped(SkipReason::Disabled));
        }

        let temp_desc = camera_desc.color_only().with_label("Bloom Temp Color");
        let temp = match backend.acquire_temporary(&temp_desc) {
            Ok(temp) => temp,
            Err(err) => {
                log::warn!("Bloom frame skipped: {err}");
                if source != destination {
                    backend.copy(source, destination)?;
                }
                return Err(err);
            }
        };

        let result = backend
            .copy(source, &temp)
            .and_then(|()| self.bloom_from_temp(backend, &temp, destination, camera_desc.extent()));

        backend.release_temporary(&temp_desc, temp);
        result
    }

    fn bloom_from_temp<B>(
        &mut self,
        backend: &mut B,
        temp: &T,
        destination: &T,
        screen: UVec2,
    ) -> Result<BloomOutcome>
    where
        B: BloomBackend<Texture = T> + ?Sized,
    {
        let extent = bloom_resolution(self.settings.resolution(), screen);
        let bloom_desc =
            TextureDesc::color(extent.x, extent.y, BLOOM_TARGET_FORMAT).with_label("Bloom Target");

        let bloom_target = match backend.acquire_temporary(&bloom_desc) {
            Ok(target) => target,
            Err(err) => {
                log::warn!("Bloom frame skipped: {err}");
                backend.copy(temp, destination)?;
                return Err(err);
            }
        };

        let result = match self.apply(backend, temp, &bloom_target, extent, &bloom_desc) {
            Ok(BloomOutcome::Applied { levels }) => self
                .combine(backend, temp, destination, &bloom_target, self.noise.as_ref())
                .map(|_| BloomOutcome::Applied { levels }),
            Ok(skipped) => backend.copy(temp, destination).map(|()| skipped),
            Err(err) => {
                log::warn!("Bloom frame skipped: {err}");
                backend.copy(temp, destination).and(Err(err))
            }
        };

        backend.release_temporary(&bloom_desc, bloom_target);
        result
    }
}

/// Records prefilter, downsample, upsample and final for a non-empty chain.
fn record_pyramid<B, T>(
    backend: &mut B,
    settings: &BloomSettings,
    levels: &[PyramidLevel<T>],
    source: &T,
    destination: &T,
    resolution: UVec2,
) -> Result<()>
where
    B: BloomBackend<Texture = T> + ?Sized,
{
    let curve = ThresholdCurve::new(settings.threshold(), settings.soft_knee());

    // Prefilter: source -> level 0 (half resolution)
    let params = FilterParams::new()
        .with_float(ParamKey::Threshold, curve.threshold)
        .with_vec3(ParamKey::Curve, curve.curve)
        .with_vec2(ParamKey::TexelSize, texel_size(resolution));
    record(backend, source, &levels[0].texture, FilterPass::Prefilter, &params)?;

    // Downsample: finest -> coarsest
    for pair in levels.windows(2) {
        let (src, dst) = (&pair[0], &pair[1]);
        let params = FilterParams::new().with_vec2(ParamKey::TexelSize, src.texel_size());
        record(backend, &src.texture, &dst.texture, FilterPass::Downsample, &params)?;
    }

    // Upsample: coarsest -> finest, accumulating onto each finer level
    for i in (1..levels.len()).rev() {
        let (src, dst) = (&levels[i], &levels[i - 1]);
        let params = FilterParams::new().with_vec2(ParamKey::TexelSize, src.texel_size());
        record(backend, &src.texture, &dst.texture, FilterPass::Upsample, &params)?;
    }

    let finest = &levels[0];
    let params = FilterParams::new()
        .with_float(ParamKey::Intensity, settings.intensity())
        .with_vec2(ParamKey::TexelSize, finest.texel_size());
    record(backend, &finest.texture, destination, FilterPass::Final, &params)
}

fn record<B, T>(
    backend: &mut B,
    source: &T,
    destination: &T,
    pass: FilterPass,
    params: &FilterParams<'_, T>,
) -> Result<()>
where
    B: BloomBackend<Texture = T> + ?Sized,
{
    log::trace!("{} (pass {}, {} params)", pass.label(), pass.index(), params.len());
    backend.blit(source, destination, pass, params)
}
