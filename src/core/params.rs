//! Pure Parameter Math
//!
//! Everything here is shared by the split (`apply` + `combine`) and fused
//! (`run_full_pipeline`) entry points and by every backend. No function in
//! this module touches a texture.

use glam::{UVec2, Vec2, Vec3};

/// Lower bound for the soft knee width. Keeps `0.25 / knee` finite.
pub const MIN_KNEE: f32 = 1.0e-4;

/// Pixels below this size in either dimension are not worth a pyramid level.
pub const MIN_LEVEL_EXTENT: u32 = 2;

/// Soft-threshold response curve consumed by the prefilter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdCurve {
    pub threshold: f32,
    pub knee: f32,
    /// `(threshold - knee, knee * 2, 0.25 / knee)`
    pub curve: Vec3,
}

impl ThresholdCurve {
    #[must_use]
    pub fn new(threshold: f32, soft_knee: f32) -> Self {
        let knee = (threshold * soft_knee).max(MIN_KNEE);
        Self {
            threshold,
            knee,
            curve: Vec3::new(threshold - knee, knee * 2.0, 0.25 / knee),
        }
    }

    /// Rebuilds the curve from the values bound for a prefilter invocation.
    #[must_use]
    pub fn from_parts(threshold: f32, curve: Vec3) -> Self {
        Self {
            threshold,
            knee: curve.y * 0.5,
            curve,
        }
    }

    /// Evaluates the response for a pixel of brightness `br` and returns the
    /// factor the pixel color is multiplied by.
    ///
    /// Below `threshold - knee` the factor is zero, inside the knee it rolls
    /// off quadratically, above the threshold the excess passes through.
    #[must_use]
    pub fn factor(&self, br: f32) -> f32 {
        let rq = (br - self.curve.x).clamp(0.0, self.curve.y);
        let rq = self.curve.z * rq * rq;
        rq.max(br - self.threshold) / br.max(1.0e-5)
    }
}

/// Reciprocal of an image's dimensions.
#[inline]
#[must_use]
pub fn texel_size(extent: UVec2) -> Vec2 {
    Vec2::new(1.0 / extent.x as f32, 1.0 / extent.y as f32)
}

/// Dimensions of the realized pyramid for a base `resolution`.
///
/// Level `i` is `resolution >> (i + 1)`. Construction stops before the first
/// level whose width or height would drop below [`MIN_LEVEL_EXTENT`], so the
/// result may be shorter than `iterations`.
#[must_use]
pub fn pyramid_extents(resolution: UVec2, iterations: u32) -> Vec<UVec2> {
    let mut extents = Vec::with_capacity(iterations as usize);
    for i in 0..iterations {
        let shift = i + 1;
        if shift >= u32::BITS {
            break;
        }
        let level = UVec2::new(resolution.x >> shift, resolution.y >> shift);
        if level.x < MIN_LEVEL_EXTENT || level.y < MIN_LEVEL_EXTENT {
            break;
        }
        extents.push(level);
    }
    extents
}

/// Tiling factor for the dither texture so that one noise texel maps to one
/// screen pixel. Without a noise texture the scale is `(1, 1)`.
#[must_use]
pub fn noise_scale(screen: UVec2, noise: Option<UVec2>) -> Vec2 {
    match noise {
        Some(size) if size.x > 0 && size.y > 0 => Vec2::new(
            screen.x as f32 / size.x as f32,
            screen.y as f32 / size.y as f32,
        ),
        _ => Vec2::ONE,
    }
}

/// Expands a single configured dimension into a bloom target size matching
/// the screen aspect ratio.
///
/// `resolution` becomes the short side; the long side is
/// `resolution * aspect`, truncated. Square and portrait screens put the
/// long side on `y`.
#[must_use]
pub fn bloom_resolution(resolution: u32, screen: UVec2) -> UVec2 {
    let screen = screen.max(UVec2::ONE);
    let mut aspect = screen.x as f32 / screen.y as f32;
    if aspect < 1.0 {
        aspect = 1.0 / aspect;
    }

    let min = resolution;
    let max = (resolution as f32 * aspect) as u32;

    if screen.x > screen.y {
        UVec2::new(max, min)
    } else {
        UVec2::new(min, max)
    }
}
