#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]

//! Multi-resolution bloom post-processing.
//!
//! Bright regions of a frame are isolated by a soft-knee threshold, blurred
//! through a half-resolution pyramid, and added back onto the frame with a
//! dither to hide banding. The pass sequencing and pyramid management live
//! in [`core`]; the GPU/CPU specifics live behind
//! [`renderer::BloomBackend`].
//!
//! ```rust,ignore
//! use fast_bloom::{Bloom, BloomSettings};
//! use fast_bloom::renderer::cpu::{CpuBackend, CpuImage};
//!
//! let mut backend = CpuBackend::new();
//! let frame = backend.insert(CpuImage::filled(640, 360, glam::Vec4::splat(0.2)));
//! let camera = backend.desc(frame)?;
//!
//! let mut bloom = Bloom::new(BloomSettings::default());
//! bloom.run_full_pipeline(&mut backend, &frame, &frame, &camera)?;
//! ```

pub mod core;
pub mod errors;
pub mod renderer;
pub mod settings;

pub use crate::core::{Bloom, BloomOutcome, NoiseTexture, SkipReason};
pub use errors::{BloomError, Result};
pub use renderer::{BloomBackend, TextureDesc};
pub use settings::BloomSettings;
