//! Layout configuration.
//!
//! Values come from the page setup of the caller. Every field has a
//! default, so a JSON document only needs to name what it overrides.

use serde::{Deserialize, Serialize};

use crate::error::{LayoutError, Result};
use crate::justify::constants::*;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// X coordinate of the left margin
    pub left_margin: f64,
    /// X coordinate of the right margin
    pub right_margin: f64,
    /// Y coordinate at which the first system on a page starts
    pub top_margin: f64,
    /// Staffline spacing; vertical shifts are whole multiples of it
    pub gap: f64,
    /// Minimum horizontal clearance between adjacent symbols
    pub hairline: f64,
    /// Passed through from the notation layer; not used by layout
    pub beams_cross_barlines: bool,
    /// Horizontal distance between boundary-curve samples
    pub sample_step: f64,
    /// Spacing weight per elapsed millisecond
    pub time_scale: u64,
    /// Clearance between an absorbed clef and the material after it
    pub clef_gap: f64,
    /// Minimum separation between consecutive systems, in gaps
    pub system_gap: f64,
    /// Upper bound on fixed-point passes before giving up
    pub max_passes: usize,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            left_margin: DEFAULT_LEFT_MARGIN,
            right_margin: DEFAULT_RIGHT_MARGIN,
            top_margin: DEFAULT_TOP_MARGIN,
            gap: DEFAULT_GAP,
            hairline: DEFAULT_HAIRLINE,
            beams_cross_barlines: false,
            sample_step: DEFAULT_SAMPLE_STEP,
            time_scale: DEFAULT_TIME_SCALE,
            clef_gap: DEFAULT_CLEF_GAP,
            system_gap: DEFAULT_SYSTEM_GAP,
            max_passes: DEFAULT_MAX_PASSES,
        }
    }
}

impl LayoutConfig {
    /// Parse a (possibly partial) JSON object and validate it.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: LayoutConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let fail = |msg: String| Err(LayoutError::InvalidConfig(msg));
        let lengths = [
            self.left_margin,
            self.right_margin,
            self.top_margin,
            self.gap,
            self.hairline,
            self.sample_step,
            self.clef_gap,
            self.system_gap,
        ];
        if !lengths.iter().all(|v| v.is_finite()) {
            return fail("lengths must be finite".into());
        }
        if !(self.content_width() > 0.0) {
            return fail(format!(
                "right margin {} must lie right of left margin {}",
                self.right_margin, self.left_margin
            ));
        }
        if !(self.gap > 0.0) {
            return fail(format!("gap must be positive, got {}", self.gap));
        }
        if !(self.hairline >= 0.0) {
            return fail(format!("hairline must not be negative, got {}", self.hairline));
        }
        if !(self.sample_step > 0.0) {
            return fail(format!("sample step must be positive, got {}", self.sample_step));
        }
        if !(self.clef_gap >= 0.0) || !(self.system_gap >= 0.0) {
            return fail("clef and system gaps must not be negative".into());
        }
        if self.time_scale == 0 {
            return fail("time scale must be positive".into());
        }
        if self.max_passes == 0 {
            return fail("max passes must be positive".into());
        }
        Ok(())
    }

    /// Width between the margins.
    pub fn content_width(&self) -> f64 {
        self.right_margin - self.left_margin
    }
}
