//! Bloom Core
//!
//! Execution-model-agnostic part of the effect:
//!
//! - [`params`]: knee/curve, texel size, pyramid extents, noise scale
//! - [`filter`]: pass selection and named filter parameters
//! - [`pyramid`]: the lazily reallocated scratch chain
//! - [`bloom`]: the pass sequencer

pub mod bloom;
pub mod filter;
pub mod params;
pub mod pyramid;

pub use bloom::{BLOOM_TARGET_FORMAT, Bloom, BloomOutcome, NoiseTexture, SkipReason};
pub use filter::{FilterParams, FilterPass, ParamKey, ParamValue};
pub use params::{ThresholdCurve, bloom_resolution, noise_scale, pyramid_extents, texel_size};
pub use pyramid::{BufferParameters, PyramidBuffers, PyramidLevel};
