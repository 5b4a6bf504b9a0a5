//! Filter Invocation Vocabulary
//!
//! A filter invocation is "draw a fullscreen triangle with program variant
//! [`FilterPass`], reading image A, writing image B". Named parameters travel
//! alongside each invocation in a [`FilterParams`] bag keyed by [`ParamKey`],
//! so no backend has to keep a process-wide parameter registry.

use glam::{Vec2, Vec3};
use smallvec::SmallVec;

/// Program variant selected for a filter invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterPass {
    /// Threshold + first downsample.
    Prefilter,
    /// 4-tap box downsample.
    Downsample,
    /// 9-tap tent upsample, accumulated onto the destination.
    Upsample,
    /// Tent upsample into the bloom result, scaled by intensity.
    Final,
    /// Source + bloom + dither.
    Combine,
    /// Plain bilinear copy.
    Copy,
}

impl FilterPass {
    pub const ALL: [FilterPass; 6] = [
        FilterPass::Prefilter,
        FilterPass::Downsample,
        FilterPass::Upsample,
        FilterPass::Final,
        FilterPass::Combine,
        FilterPass::Copy,
    ];

    /// Integer pass index, matching the program's pass ordering.
    #[must_use]
    pub const fn index(self) -> u32 {
        match self {
            FilterPass::Prefilter => 0,
            FilterPass::Downsample => 1,
            FilterPass::Upsample => 2,
            FilterPass::Final => 3,
            FilterPass::Combine => 4,
            FilterPass::Copy => 5,
        }
    }

    /// Whether the pass blends onto the destination instead of replacing it.
    #[must_use]
    pub const fn is_additive(self) -> bool {
        matches!(self, FilterPass::Upsample)
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            FilterPass::Prefilter => "Bloom Prefilter",
            FilterPass::Downsample => "Bloom Downsample",
            FilterPass::Upsample => "Bloom Upsample",
            FilterPass::Final => "Bloom Final",
            FilterPass::Combine => "Bloom Combine",
            FilterPass::Copy => "Bloom Copy",
        }
    }
}

/// Named parameters visible to a filter invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamKey {
    Threshold,
    Curve,
    TexelSize,
    Intensity,
    NoiseTex,
    NoiseTexScale,
    SourceTex,
}

/// A parameter value. Textures are borrowed for the duration of one
/// invocation.
#[derive(Debug)]
pub enum ParamValue<'a, T> {
    Float(f32),
    Vec2(Vec2),
    Vec3(Vec3),
    Texture(&'a T),
}

impl<T> Clone for ParamValue<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ParamValue<'_, T> {}

/// Parameters bound for a single filter invocation.
///
/// Setting a key twice overwrites the previous value.
#[derive(Debug)]
pub struct FilterParams<'a, T> {
    entries: SmallVec<[(ParamKey, ParamValue<'a, T>); 4]>,
}

impl<T> Default for FilterParams<'_, T> {
    fn default() -> Self {
        Self {
            entries: SmallVec::new(),
        }
    }
}

impl<'a, T> FilterParams<'a, T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: ParamKey, value: ParamValue<'a, T>) -> &mut Self {
        if let Some(slot) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value;
        } else {
            self.entries.push((key, value));
        }
        self
    }

    #[must_use]
    pub fn with_float(mut self, key: ParamKey, value: f32) -> Self {
        self.set(key, ParamValue::Float(value));
        self
    }

    #[must_use]
    pub fn with_vec2(mut self, key: ParamKey, value: Vec2) -> Self {
        self.set(key, ParamValue::Vec2(value));
        self
    }

    #[must_use]
    pub fn with_vec3(mut self, key: ParamKey, value: Vec3) -> Self {
        self.set(key, ParamValue::Vec3(value));
        self
    }

    #[must_use]
    pub fn with_texture(mut self, key: ParamKey, texture: &'a T) -> Self {
        self.set(key, ParamValue::Texture(texture));
        self
    }

    #[must_use]
    pub fn get(&self, key: ParamKey) -> Option<ParamValue<'a, T>> {
        self.entries
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| *v)
    }

    #[must_use]
    pub fn float(&self, key: ParamKey) -> Option<f32> {
        match self.get(key)? {
            ParamValue::Float(v) => Some(v),
            _ => None,
        }
    }

    #[must_use]
    pub fn vec2(&self, key: ParamKey) -> Option<Vec2> {
        match self.get(key)? {
            ParamValue::Vec2(v) => Some(v),
            _ => None,
        }
    }

    #[must_use]
    pub fn vec3(&self, key: ParamKey) -> Option<Vec3> {
        match self.get(key)? {
            ParamValue::Vec3(v) => Some(v),
            _ => None,
        }
    }

    #[must_use]
    pub fn texture(&self, key: ParamKey) -> Option<&'a T> {
        match self.get(key)? {
            ParamValue::Texture(t) => Some(t),
            _ => None,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = ParamKey> + '_ {
        self.entries.iter().map(|(k, _)| *k)
    }
}
