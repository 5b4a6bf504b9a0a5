//! CPU Reference Backend
//!
//! Executes every filter pass immediately on `f32` RGBA images held in a
//! [`SlotMap`]. Useful for offline processing, for hosts without a GPU, and
//! for verifying the pass sequence: every recorded invocation is appended to
//! a command log that tests can inspect.
//!
//! Sampling follows GPU conventions: texel centers sit at `(i + 0.5) / size`,
//! filtering is bilinear, addressing is clamp-to-edge (repeat for the dither
//! texture).
//!
//! Two fault injection knobs exist for hosts that want to exercise failure
//! paths: [`CpuBackend::set_ready`] simulates a missing filter program and
//! [`CpuBackend::set_allocation_budget`] makes texture creation fail once
//! the budget is spent. Pool hits never consume budget.

use glam::{UVec2, Vec2, Vec3, Vec4, Vec4Swizzles};
use slotmap::{SlotMap, new_key_type};

use super::transient_pool::TransientTexturePool;
use super::{BloomBackend, TextureDesc};
use crate::core::filter::{FilterParams, FilterPass, ParamKey};
use crate::core::params::{ThresholdCurve, texel_size};
use crate::errors::{BloomError, Result};

new_key_type! {
    /// Handle to an image owned by a [`CpuBackend`].
    pub struct CpuTextureId;
}

// ─── Images ───────────────────────────────────────────────────────────────────

/// Linear RGBA image with `f32` channels, row-major, origin top-left.
#[derive(Debug, Clone, PartialEq)]
pub struct CpuImage {
    width: u32,
    height: u32,
    pixels: Vec<Vec4>,
}

impl CpuImage {
    /// A transparent black image.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self::filled(width, height, Vec4::ZERO)
    }

    #[must_use]
    pub fn filled(width: u32, height: u32, color: Vec4) -> Self {
        Self {
            width,
            height,
            pixels: vec![color; (width as usize) * (height as usize)],
        }
    }

    #[must_use]
    pub fn from_fn<F>(width: u32, height: u32, mut f: F) -> Self
    where
        F: FnMut(u32, u32) -> Vec4,
    {
        let mut pixels = Vec::with_capacity((width as usize) * (height as usize));
        for y in 0..height {
            for x in 0..width {
                pixels.push(f(x, y));
            }
        }
        Self {
            width,
            height,
            pixels,
        }
    }

    #[inline]
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    #[must_use]
    pub fn extent(&self) -> UVec2 {
        UVec2::new(self.width, self.height)
    }

    #[must_use]
    pub fn pixels(&self) -> &[Vec4] {
        &self.pixels
    }

    #[inline]
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> Vec4 {
        self.pixels[self.index(x, y)]
    }

    #[inline]
    pub fn set(&mut self, x: u32, y: u32, color: Vec4) {
        let i = self.index(x, y);
        self.pixels[i] = color;
    }

    pub fn fill(&mut self, color: Vec4) {
        self.pixels.fill(color);
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        (y as usize) * (self.width as usize) + (x as usize)
    }

    /// Bilinear sample with clamp-to-edge addressing.
    #[must_use]
    pub fn sample(&self, uv: Vec2) -> Vec4 {
        self.sample_with(uv, |i, n| i.clamp(0, n - 1))
    }

    /// Bilinear sample with repeat addressing.
    #[must_use]
    pub fn sample_repeat(&self, uv: Vec2) -> Vec4 {
        self.sample_with(uv, i64::rem_euclid)
    }

    fn sample_with(&self, uv: Vec2, address: impl Fn(i64, i64) -> i64) -> Vec4 {
        if self.pixels.is_empty() {
            return Vec4::ZERO;
        }

        let w = i64::from(self.width);
        let h = i64::from(self.height);
        let px = uv.x * self.width as f32 - 0.5;
        let py = uv.y * self.height as f32 - 0.5;
        let x0 = px.floor();
        let y0 = py.floor();
        let fx = px - x0;
        let fy = py - y0;

        let fetch = |x: i64, y: i64| -> Vec4 {
            let x = address(x, w) as u32;
            let y = address(y, h) as u32;
            self.get(x, y)
        };

        let (x0, y0) = (x0 as i64, y0 as i64);
        let top = fetch(x0, y0).lerp(fetch(x0 + 1, y0), fx);
        let bottom = fetch(x0, y0 + 1).lerp(fetch(x0 + 1, y0 + 1), fx);
        top.lerp(bottom, fy)
    }

    /// Largest channel value over the whole image, ignoring alpha.
    #[must_use]
    pub fn max_rgb(&self) -> f32 {
        self.pixels
            .iter()
            .map(|p| p.xyz().max_element())
            .fold(0.0, f32::max)
    }
}

// ─── Filters ──────────────────────────────────────────────────────────────────

/// Center of texel `(x, y)` in a target of `extent`, in UV space.
#[inline]
fn texel_center(x: u32, y: u32, extent: UVec2) -> Vec2 {
    Vec2::new(
        (x as f32 + 0.5) / extent.x as f32,
        (y as f32 + 0.5) / extent.y as f32,
    )
}

/// 4-tap box: one bilinear tap in each diagonal direction, one texel out.
fn box4(src: &CpuImage, uv: Vec2, texel: Vec2) -> Vec4 {
    let d = Vec4::new(-texel.x, -texel.y, texel.x, texel.y);
    (src.sample(uv + d.xy())
        + src.sample(uv + d.zy())
        + src.sample(uv + d.xw())
        + src.sample(uv + d.zw()))
        * 0.25
}

/// 9-tap tent: 1-2-1 weights on a 3×3 grid one texel apart.
fn tent9(src: &CpuImage, uv: Vec2, texel: Vec2) -> Vec4 {
    let mut sum = Vec4::ZERO;
    for (dy, wy) in [(-1.0, 1.0), (0.0, 2.0), (1.0, 1.0)] {
        for (dx, wx) in [(-1.0, 1.0), (0.0, 2.0), (1.0, 1.0)] {
            sum += src.sample(uv + Vec2::new(dx, dy) * texel) * (wx * wy);
        }
    }
    sum / 16.0
}

fn map_pixels(extent: UVec2, f: impl Fn(Vec2) -> Vec4) -> CpuImage {
    CpuImage::from_fn(extent.x, extent.y, |x, y| f(texel_center(x, y, extent)))
}

// ─── Backend ──────────────────────────────────────────────────────────────────

/// One entry of the command log.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CpuCommand {
    Blit {
        pass: FilterPass,
        source: CpuTextureId,
        destination: CpuTextureId,
        source_size: UVec2,
        destination_size: UVec2,
        texel_size: Option<Vec2>,
    },
    Clear {
        destination: CpuTextureId,
    },
}

impl CpuCommand {
    #[must_use]
    pub fn pass(&self) -> Option<FilterPass> {
        match self {
            CpuCommand::Blit { pass, .. } => Some(*pass),
            CpuCommand::Clear { .. } => None,
        }
    }
}

struct StoredImage {
    image: CpuImage,
    desc: TextureDesc,
}

/// Immediate-mode CPU implementation of [`BloomBackend`].
pub struct CpuBackend {
    images: SlotMap<CpuTextureId, StoredImage>,
    pool: TransientTexturePool<CpuTextureId>,
    commands: Vec<CpuCommand>,
    ready: bool,
    allocation_budget: Option<usize>,
}

impl Default for CpuBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl CpuBackend {
    #[must_use]
    pub fn new() -> Self {
        Self {
            images: SlotMap::with_key(),
            pool: TransientTexturePool::new(),
            commands: Vec::new(),
            ready: true,
            allocation_budget: None,
        }
    }

    /// Registers a host-owned image, tagged as `Rgba32Float`.
    pub fn insert(&mut self, image: CpuImage) -> CpuTextureId {
        self.insert_with_format(image, wgpu::TextureFormat::Rgba32Float)
    }

    /// Registers a host-owned image with an explicit format tag. The format
    /// only affects pyramid invalidation and pooling; storage is always `f32`.
    pub fn insert_with_format(&mut self, image: CpuImage, format: wgpu::TextureFormat) -> CpuTextureId {
        let desc = TextureDesc::color(image.width, image.height, format).with_label("Host Image");
        self.images.insert(StoredImage { image, desc })
    }

    /// Removes an image and returns it.
    pub fn remove(&mut self, id: CpuTextureId) -> Option<CpuImage> {
        self.images.remove(id).map(|s| s.image)
    }

    pub fn image(&self, id: CpuTextureId) -> Result<&CpuImage> {
        self.stored(id).map(|s| &s.image)
    }

    pub fn image_mut(&mut self, id: CpuTextureId) -> Result<&mut CpuImage> {
        self.images
            .get_mut(id)
            .map(|s| &mut s.image)
            .ok_or_else(|| BloomError::InvalidTexture(format!("{id:?}")))
    }

    /// Descriptor of a registered image.
    pub fn desc(&self, id: CpuTextureId) -> Result<TextureDesc> {
        self.stored(id).map(|s| s.desc)
    }

    #[must_use]
    pub fn contains(&self, id: CpuTextureId) -> bool {
        self.images.contains_key(id)
    }

    /// Simulates the filter program being (un)available.
    pub fn set_ready(&mut self, ready: bool) {
        self.ready = ready;
    }

    /// Limits how many more textures may be created. `None` is unlimited.
    pub fn set_allocation_budget(&mut self, budget: Option<usize>) {
        self.allocation_budget = budget;
    }

    #[must_use]
    pub fn commands(&self) -> &[CpuCommand] {
        &self.commands
    }

    pub fn take_commands(&mut self) -> Vec<CpuCommand> {
        std::mem::take(&mut self.commands)
    }

    /// Textures ever created for temporaries (pool misses).
    #[must_use]
    pub fn created_temporaries(&self) -> usize {
        self.pool.total_created()
    }

    /// Temporaries currently held by callers.
    #[must_use]
    pub fn outstanding_temporaries(&self) -> usize {
        self.pool.outstanding()
    }

    /// Temporaries parked in the pool.
    #[must_use]
    pub fn pooled_temporaries(&self) -> usize {
        self.pool.free_count()
    }

    /// Number of images alive in the backend, host-owned included.
    #[must_use]
    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    fn stored(&self, id: CpuTextureId) -> Result<&StoredImage> {
        self.images
            .get(id)
            .ok_or_else(|| BloomError::InvalidTexture(format!("{id:?}")))
    }

    fn run_filter(
        &self,
        src: &CpuImage,
        extent: UVec2,
        pass: FilterPass,
        params: &FilterParams<'_, CpuTextureId>,
    ) -> Result<CpuImage> {
        let texel = params
            .vec2(ParamKey::TexelSize)
            .unwrap_or_else(|| texel_size(src.extent()));

        let out = match pass {
            FilterPass::Prefilter => {
                let threshold = params.float(ParamKey::Threshold).unwrap_or(0.0);
                let curve = params.vec3(ParamKey::Curve).unwrap_or(Vec3::ZERO);
                let response = ThresholdCurve::from_parts(threshold, curve);
                map_pixels(extent, |uv| {
                    let rgb = box4(src, uv, texel).xyz();
                    (rgb * response.factor(rgb.max_element())).extend(0.0)
                })
            }
            FilterPass::Downsample => map_pixels(extent, |uv| box4(src, uv, texel)),
            FilterPass::Upsample => map_pixels(extent, |uv| tent9(src, uv, texel)),
            FilterPass::Final => {
                let intensity = params.float(ParamKey::Intensity).unwrap_or(1.0);
                map_pixels(extent, |uv| {
                    (tent9(src, uv, texel).xyz() * intensity).extend(0.0)
                })
            }
            FilterPass::Combine => {
                let source_id = params.texture(ParamKey::SourceTex).ok_or_else(|| {
                    BloomError::InvalidTexture("combine pass without SourceTex".into())
                })?;
                let original = &self.stored(*source_id)?.image;
                let noise = params
                    .texture(ParamKey::NoiseTex)
                    .map(|id| self.stored(*id).map(|s| &s.image))
                    .transpose()?;
                let scale = params.vec2(ParamKey::NoiseTexScale).unwrap_or(Vec2::ONE);

                map_pixels(extent, |uv| {
                    let base = original.sample(uv);
                    let bloom = src.sample(uv).xyz();
                    let dither = noise.map_or(0.0, |n| (n.sample_repeat(uv * scale).x - 0.5) / 255.0);
                    (base.xyz() + bloom + Vec3::splat(dither)).extend(base.w)
                })
            }
            FilterPass::Copy => {
                if src.extent() == extent {
                    src.clone()
                } else {
                    map_pixels(extent, |uv| src.sample(uv))
                }
            }
        };

        Ok(out)
    }
}

impl BloomBackend for CpuBackend {
    type Texture = CpuTextureId;

    fn is_ready(&self) -> bool {
        self.ready
    }

    fn texture_size(&self, texture: &CpuTextureId) -> Result<UVec2> {
        self.stored(*texture).map(|s| s.image.extent())
    }

    fn acquire_temporary(&mut self, desc: &TextureDesc) -> Result<CpuTextureId> {
        let images = &mut self.images;
        let budget = &mut self.allocation_budget;

        self.pool.acquire(desc, |d| {
            if let Some(remaining) = budget {
                if *remaining == 0 {
                    return Err(BloomError::ScratchAllocation {
                        width: d.width,
                        height: d.height,
                        format: d.format,
                        reason: "allocation budget exhausted".into(),
                    });
                }
                *remaining -= 1;
            }
            Ok(images.insert(StoredImage {
                image: CpuImage::new(d.width, d.height),
                desc: *d,
            }))
        })
    }

    fn release_temporary(&mut self, desc: &TextureDesc, texture: CpuTextureId) {
        self.pool.release(desc, texture);
    }

    fn blit(
        &mut self,
        source: &CpuTextureId,
        destination: &CpuTextureId,
        pass: FilterPass,
        params: &FilterParams<'_, CpuTextureId>,
    ) -> Result<()> {
        let src = &self.stored(*source)?.image;
        let extent = self.stored(*destination)?.image.extent();
        let source_size = src.extent();
        let out = self.run_filter(src, extent, pass, params)?;

        let dst = self.image_mut(*destination)?;
        if pass.is_additive() {
            for (d, o) in dst.pixels.iter_mut().zip(&out.pixels) {
                *d += *o;
            }
        } else {
            *dst = out;
        }

        self.commands.push(CpuCommand::Blit {
            pass,
            source: *source,
            destination: *destination,
            source_size,
            destination_size: extent,
            texel_size: params.vec2(ParamKey::TexelSize),
        });
        Ok(())
    }

    fn clear(&mut self, destination: &CpuTextureId) -> Result<()> {
        self.image_mut(*destination)?.fill(Vec4::ZERO);
        self.commands.push(CpuCommand::Clear {
            destination: *destination,
        });
        Ok(())
    }

    fn trim_temporaries(&mut self, max_idle_frames: u32) {
        for id in self.pool.trim(max_idle_frames) {
            self.images.remove(id);
        }
    }

    fn destroy_temporaries(&mut self) {
        for id in self.pool.drain() {
            self.images.remove(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp() -> CpuImage {
        CpuImage::from_fn(4, 1, |x, _| Vec4::splat(x as f32))
    }

    #[test]
    fn sample_at_texel_center_is_exact() {
        let img = ramp();
        for x in 0..4 {
            assert_eq!(img.sample(texel_center(x, 0, img.extent())), Vec4::splat(x as f32));
        }
    }

    #[test]
    fn sample_between_texels_interpolates() {
        let img = ramp();
        let v = img.sample(Vec2::new(0.25, 0.5));
        assert!((v.x - 0.5).abs() < 1e-6);
    }

    #[test]
    fn clamp_and_repeat_addressing() {
        let img = ramp();
        assert_eq!(img.sample(Vec2::new(-1.0, 0.5)).x, 0.0);
        assert_eq!(img.sample(Vec2::new(2.0, 0.5)).x, 3.0);
        // Wraps to the first texel center
        assert_eq!(img.sample_repeat(Vec2::new(1.125, 0.5)).x, 0.0);
    }

    #[test]
    fn box_and_tent_preserve_constant_images() {
        let img = CpuImage::filled(8, 8, Vec4::splat(0.3));
        let uv = Vec2::new(0.4, 0.6);
        let texel = texel_size(img.extent());
        assert!((box4(&img, uv, texel) - Vec4::splat(0.3)).abs().max_element() < 1e-6);
        assert!((tent9(&img, uv, texel) - Vec4::splat(0.3)).abs().max_element() < 1e-6);
    }

    #[test]
    fn unknown_handle_is_rejected() {
        let mut backend = CpuBackend::new();
        let id = backend.insert(CpuImage::new(2, 2));
        backend.remove(id);
        assert!(matches!(backend.image(id), Err(BloomError::InvalidTexture(_))));
        assert!(backend.texture_size(&id).is_err());
    }

    #[test]
    fn upsample_accumulates() {
        let mut backend = CpuBackend::new();
        let src = backend.insert(CpuImage::filled(2, 2, Vec4::splat(1.0)));
        let dst = backend.insert(CpuImage::filled(4, 4, Vec4::splat(0.5)));

        backend
            .blit(&src, &dst, FilterPass::Upsample, &FilterParams::new())
            .unwrap();

        let out = backend.image(dst).unwrap();
        assert!(out.pixels().iter().all(|p| (p.x - 1.5).abs() < 1e-6));
    }

    #[test]
    fn budget_only_counts_pool_misses() {
        let mut backend = CpuBackend::new();
        backend.set_allocation_budget(Some(1));
        let desc = TextureDesc::color(4, 4, wgpu::TextureFormat::Rgba16Float);

        let a = backend.acquire_temporary(&desc).unwrap();
        backend.release_temporary(&desc, a);
        let b = backend.acquire_temporary(&desc).unwrap();
        assert_eq!(a, b);

        assert!(backend.acquire_temporary(&desc).unwrap_err().is_allocation_failure());
    }
}
