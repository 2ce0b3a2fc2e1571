//! Score justification: turns the symbols of a system into final,
//! non-overlapping page coordinates.
//!
//! The pipeline for one system is:
//! 1. merge all voices into time-ordered [`Moment`]s,
//! 2. space the moments proportionally to elapsed time and place every
//!    symbol on its moment's anchor,
//! 3. trade width between moments until adjacent symbols no longer
//!    collide (or report the ones that cannot be fixed),
//! 4. stack the staves as tightly as their outlines allow.

pub(crate) mod constants;
pub mod moments;
pub mod spacing;
pub mod overlap;
pub mod redistribute;
pub mod horizontal;
pub mod vertical;

use serde::{Deserialize, Serialize};

use crate::config::LayoutConfig;
use crate::error::{LayoutError, Result};
use crate::model::{Page, System};
pub use horizontal::{Diagnostic, HorizontalJustifier, VoiceGroup};
pub use moments::Moment;

// ═══════════════════════════════════════════════════════════════════════
// Reports
// ═══════════════════════════════════════════════════════════════════════

/// Final anchor of one moment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MomentSummary {
    pub time_ms: u64,
    pub alignment_x: f64,
    pub barline_width: f64,
}

/// What happened while justifying one system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JustifyReport {
    /// Collisions left in place; empty when fully justified
    pub diagnostics: Vec<Diagnostic>,
    /// Fixed-point passes used by horizontal justification
    pub passes: usize,
    pub moments: Vec<MomentSummary>,
    /// Staffline distance between each consecutive pair of staves
    pub staff_shifts: Vec<f64>,
}

/// What happened while laying out a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageReport {
    pub systems: Vec<JustifyReport>,
    /// Shift applied between each consecutive pair of systems
    pub system_shifts: Vec<f64>,
}

impl PageReport {
    /// Every diagnostic on the page, in system order.
    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.systems.iter().flat_map(|r| r.diagnostics.iter())
    }
}

fn summarize(moments: &[Moment], system: &System) -> Vec<MomentSummary> {
    moments
        .iter()
        .map(|m| MomentSummary {
            time_ms: m.time_ms,
            alignment_x: m.alignment_x,
            barline_width: m.barline_width(system),
        })
        .collect()
}

// ═══════════════════════════════════════════════════════════════════════
// Public API
// ═══════════════════════════════════════════════════════════════════════

/// Justify one system in place: horizontal spacing and collision removal,
/// then vertical packing of its staves (top staff at y = 0).
///
/// `system_index` only tags the diagnostics. On error `system` is left as
/// it was passed in.
pub fn justify_system(system: &mut System, system_index: usize, config: &LayoutConfig) -> Result<JustifyReport> {
    let mut work = system.clone();
    let report = justify_copy(&mut work, system_index, config)?;
    *system = work;
    Ok(report)
}

fn justify_copy(system: &mut System, system_index: usize, config: &LayoutConfig) -> Result<JustifyReport> {
    config.validate()?;
    let mut moments = moments::build_moments(system, config.clef_gap)?;

    spacing::initial_layout(system, &mut moments, config)?;
    let passes = horizontal::justify_horizontally(system, &mut moments, config)?;
    let diagnostics = horizontal::unresolved_overlaps(system, &moments, system_index, config.hairline);
    for d in &diagnostics {
        log::warn!(
            "system {} staff {}: {} unresolved overlaps in {:?} voices",
            d.system_index,
            d.staff_index,
            d.unresolved_overlaps,
            d.voice_group
        );
    }

    let staff_shifts = vertical::pack_staves(system, config)?;

    log::debug!(
        "system {}: {} moments, {} passes, {} diagnostics",
        system_index,
        moments.len(),
        passes,
        diagnostics.len()
    );
    Ok(JustifyReport {
        diagnostics,
        passes,
        moments: summarize(&moments, system),
        staff_shifts,
    })
}

/// Re-run horizontal justification on a system whose symbols are already
/// placed, keeping the current anchors instead of re-spacing. A system
/// that is already clear, or one that fails, is left untouched.
pub fn rejustify_system(system: &mut System, system_index: usize, config: &LayoutConfig) -> Result<JustifyReport> {
    config.validate()?;
    let mut work = system.clone();
    let mut moments = moments::build_moments(&work, config.clef_gap)?;
    let passes = horizontal::justify_horizontally(&mut work, &mut moments, config)?;
    let diagnostics = horizontal::unresolved_overlaps(&work, &moments, system_index, config.hairline);
    let report = JustifyReport {
        diagnostics,
        passes,
        moments: summarize(&moments, &work),
        staff_shifts: Vec::new(),
    };
    *system = work;
    Ok(report)
}

/// Justify every system on a page, then stack the systems from the top
/// margin down, `system_gap` gaps apart. If any system fails the page is
/// left as it was passed in.
pub fn layout_page(page: &mut Page, config: &LayoutConfig) -> Result<PageReport> {
    if page.systems.is_empty() {
        return Err(LayoutError::EmptySystem);
    }

    let mut work = page.clone();
    let mut systems = Vec::with_capacity(work.systems.len());
    for (index, system) in work.systems.iter_mut().enumerate() {
        systems.push(justify_copy(system, index, config)?);
    }

    for staff in &mut work.systems[0].staves {
        staff.move_by(0.0, config.top_margin);
    }
    let mut system_shifts = Vec::with_capacity(work.systems.len() - 1);
    for i in 1..work.systems.len() {
        let (above, below) = work.systems.split_at_mut(i);
        system_shifts.push(vertical::stack_system_below(&above[i - 1], &mut below[0], config)?);
    }

    *page = work;
    Ok(PageReport { systems, system_shifts })
}
