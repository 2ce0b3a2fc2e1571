//! Error types for layout.
//!
//! Every variant is an invariant violation in the input handed to the
//! layout engine (or in its configuration). They are reported before any
//! geometry is touched. A region that simply cannot be de-collided is not
//! an error; it shows up as a [`crate::Diagnostic`] instead.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, LayoutError>;

#[derive(Debug, Error)]
pub enum LayoutError {
    /// Duration-bearing symbols in a voice must have strictly increasing
    /// time positions; clefs and barlines may share the time of their
    /// neighbours but never go backwards.
    #[error("staff {staff} voice {voice}: symbol {index} at {time_ms}ms is out of time order")]
    UnorderedVoice {
        staff: usize,
        voice: usize,
        index: usize,
        time_ms: u64,
    },

    /// A chord or rest with a zero duration.
    #[error("staff {staff} voice {voice}: symbol {index} has no duration")]
    NonPositiveDuration {
        staff: usize,
        voice: usize,
        index: usize,
    },

    /// A chord or rest whose end time does not fit in a `u64`.
    #[error("staff {staff} voice {voice}: symbol {index} ends past the representable time range")]
    TimeOverflow {
        staff: usize,
        voice: usize,
        index: usize,
    },

    /// A bounding box, anchor, barline width or outline that is not finite,
    /// is inverted, or lies outside the page coordinate range.
    #[error("staff {staff} voice {voice}: symbol {index} has invalid geometry")]
    InvalidGeometry {
        staff: usize,
        voice: usize,
        index: usize,
    },

    /// A clef or barline placed after the end of the system.
    #[error("staff {staff} voice {voice}: symbol {index} at {time_ms}ms lies after the system end")]
    TrailingSymbolAfterEnd {
        staff: usize,
        voice: usize,
        index: usize,
        time_ms: u64,
    },

    /// No moments could be built (no staves, no voices, or no symbols).
    #[error("system contains no symbols")]
    EmptySystem,

    /// A staff must hold one or two voices.
    #[error("staff {staff} has {voices} voices (expected 1 or 2)")]
    InvalidStaff { staff: usize, voices: usize },

    /// The boundary curve of a staff produced no samples.
    #[error("staff {staff} has no boundary samples")]
    NoBoundarySamples { staff: usize },

    /// Barlines alone consume more than the available width.
    #[error("available width {available} is smaller than the fixed barline width {fixed}")]
    InsufficientWidth { available: f64, fixed: f64 },

    /// The fixed-point loop did not settle within the configured bound.
    #[error("justification did not converge after {passes} passes")]
    NoConvergence { passes: usize },

    /// A configuration value is out of range.
    #[error("invalid layout configuration: {0}")]
    InvalidConfig(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
