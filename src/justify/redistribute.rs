//! Redistribution: trade width from uncontested moments into the ones
//! that collide, keeping the total system width unchanged.

use std::collections::BTreeSet;

use crate::model::System;
use super::moments::Moment;
use super::overlap::OverlapMap;
use super::spacing::moment_widths;

/// Moments that may no longer be shrunk in the current justification run.
/// Only grows during a run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompressibilitySet {
    fixed: BTreeSet<u64>,
}

impl CompressibilitySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_fixed(&mut self, time_ms: u64) {
        self.fixed.insert(time_ms);
    }

    pub fn is_compressible(&self, time_ms: u64) -> bool {
        !self.fixed.contains(&time_ms)
    }

    /// Number of moments marked non-compressible so far.
    pub fn fixed_count(&self) -> usize {
        self.fixed.len()
    }
}

/// Outcome of one redistribution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Redistribution {
    /// Anchors were moved; compressible moments were scaled by `compression`.
    Applied { compression: f64 },
    /// Not enough compressible width; nothing was moved.
    Infeasible { compressible: f64, required: f64 },
}

impl Redistribution {
    pub fn is_applied(&self) -> bool {
        matches!(self, Redistribution::Applied { .. })
    }
}

/// A run of system moments `[start, end)` that must grow by `extra`.
struct Span {
    start: usize,
    end: usize,
    extra: f64,
}

/// Widen every span in `overlaps` by its required width, paying for it by
/// shrinking the moments that are still compressible.
///
/// Moments inside a span are marked non-compressible before the budget is
/// computed. When the budget does not cover the required width the anchors
/// and the symbols are left untouched.
pub fn redistribute(
    system: &mut System,
    moments: &mut [Moment],
    barline_widths: &[f64],
    compressibility: &mut CompressibilitySet,
    overlaps: &OverlapMap,
    clef_gap: f64,
) -> Redistribution {
    let index_of = |time_ms: u64| moments.binary_search_by_key(&time_ms, |m| m.time_ms).ok();

    let spans: Vec<Span> = overlaps
        .values()
        .filter_map(|o| {
            let span = Span {
                start: index_of(o.earlier_ms)?,
                end: index_of(o.later_ms)?,
                extra: o.required_width,
            };
            (span.start < span.end).then_some(span)
        })
        .collect();

    for span in &spans {
        for moment in &moments[span.start..span.end] {
            compressibility.mark_fixed(moment.time_ms);
        }
    }

    let widths = moment_widths(moments, barline_widths);
    let compressible: f64 = widths
        .iter()
        .zip(moments.iter())
        .filter(|(_, m)| compressibility.is_compressible(m.time_ms))
        .map(|(w, _)| *w)
        .sum();
    let required: f64 = spans.iter().map(|s| s.extra).sum();

    let span_widths: Vec<f64> = spans.iter().map(|s| widths[s.start..s.end].iter().sum()).collect();
    if compressible - required <= 0.0 || span_widths.iter().any(|&w| w <= 0.0) {
        log::debug!(
            "redistribution infeasible: compressible {:.3}, required {:.3}",
            compressible,
            required
        );
        return Redistribution::Infeasible { compressible, required };
    }
    let compression = (compressible - required) / compressible;

    let mut multipliers: Vec<f64> = moments[..widths.len()]
        .iter()
        .map(|m| if compressibility.is_compressible(m.time_ms) { compression } else { 1.0 })
        .collect();
    for (span, &span_width) in spans.iter().zip(&span_widths) {
        let stretch = (span_width + span.extra) / span_width;
        for multiplier in &mut multipliers[span.start..span.end] {
            *multiplier = stretch;
        }
    }

    for i in 1..moments.len() {
        let x = moments[i - 1].alignment_x + widths[i - 1] * multipliers[i - 1] + barline_widths[i];
        if x != moments[i].alignment_x {
            moments[i].alignment_x = x;
            moments[i].place(system, clef_gap);
        }
    }

    log::debug!(
        "redistributed {:.3} over {} spans, compression {:.6}",
        required,
        spans.len(),
        compression
    );
    Redistribution::Applied { compression }
}
