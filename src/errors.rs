//! Error Types
//!
//! This module defines the error types used throughout the crate.
//!
//! # Overview
//!
//! The main error type [`BloomError`] covers the failure modes that are
//! *exceptional* for the bloom effect:
//! - Scratch texture allocation failures (fatal for the current frame)
//! - Foreign or stale texture handles handed to a backend
//! - Settings parsing errors
//!
//! Expected degenerate configurations (filter program not loaded yet, a
//! pyramid with zero usable levels) are **not** errors. They are reported
//! as [`BloomOutcome::Skipped`](crate::core::BloomOutcome::Skipped).
//!
//! # Usage
//!
//! ```rust,ignore
//! use fast_bloom::errors::{BloomError, Result};
//!
//! fn frame() -> Result<()> {
//!     // Operations that may fail return Result
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// The main error type for the bloom effect.
#[derive(Error, Debug)]
pub enum BloomError {
    // ========================================================================
    // Resource Errors
    // ========================================================================
    /// The backend could not provide a scratch texture.
    #[error("Failed to allocate {width}x{height} {format:?} scratch texture: {reason}")]
    ScratchAllocation {
        /// Requested width in pixels
        width: u32,
        /// Requested height in pixels
        height: u32,
        /// Requested color format
        format: wgpu::TextureFormat,
        /// Backend-specific description of the failure
        reason: String,
    },

    /// A texture handle does not belong to the backend it was passed to.
    #[error("Invalid texture handle: {0}")]
    InvalidTexture(String),

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Settings could not be parsed.
    #[error("Settings parse error: {0}")]
    Config(#[from] serde_json::Error),
}

impl BloomError {
    /// Returns `true` if this error came from the scratch allocator.
    #[must_use]
    pub fn is_allocation_failure(&self) -> bool {
        matches!(self, BloomError::ScratchAllocation { .. })
    }
}

/// Alias for `Result<T, BloomError>`.
pub type Result<T> = std::result::Result<T, BloomError>;
