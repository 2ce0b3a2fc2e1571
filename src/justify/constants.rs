//! Default layout constants (all in page units unless noted).

// ── Page & margins ──────────────────────────────────────────────────
pub(crate) const DEFAULT_LEFT_MARGIN: f64 = 50.0;
pub(crate) const DEFAULT_RIGHT_MARGIN: f64 = 790.0;
pub(crate) const DEFAULT_TOP_MARGIN: f64 = 100.0;

// ── Spacing units ───────────────────────────────────────────────────
pub(crate) const DEFAULT_GAP: f64 = 8.0; // distance between two stafflines
pub(crate) const DEFAULT_HAIRLINE: f64 = 1.0; // minimum clearance between neighbours
pub(crate) const DEFAULT_CLEF_GAP: f64 = 2.0; // clef to the material it precedes
pub(crate) const DEFAULT_SYSTEM_GAP: f64 = 6.0; // in gaps, between consecutive systems

// ── Solver precision ────────────────────────────────────────────────
pub(crate) const DEFAULT_SAMPLE_STEP: f64 = 2.0; // boundary-curve sampling density
pub(crate) const DEFAULT_TIME_SCALE: u64 = 10_000; // weight per elapsed millisecond
pub(crate) const DEFAULT_MAX_PASSES: usize = 1000;

/// Shifts that exceed a multiple of the gap by less than this are not
/// rounded up to the next multiple.
pub(crate) const SHIFT_EPSILON: f64 = 1e-9;

/// Collisions needing less extra width than this are ignored.
pub(crate) const OVERLAP_EPSILON: f64 = 1e-9;

// ── Input bounds ────────────────────────────────────────────────────
pub(crate) const MAX_COORDINATE: f64 = 1.0e6; // |x| and |y| of any input geometry
pub(crate) const MAX_SAMPLES: usize = 1 << 20; // per boundary comparison
