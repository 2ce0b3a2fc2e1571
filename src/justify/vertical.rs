//! Vertical packing: stack staves as closely as their sampled outlines
//! allow, in whole multiples of the staffline gap.

use crate::config::LayoutConfig;
use crate::error::{LayoutError, Result};
use crate::model::{Staff, Symbol, System};
use super::constants::{MAX_SAMPLES, SHIFT_EPSILON};

fn symbols(staff: &Staff) -> impl Iterator<Item = &Symbol> {
    staff.voices.iter().flat_map(|v| v.symbols.iter())
}

/// Highest point of the staff at page x (stafflines included).
pub fn upper_boundary_at(staff: &Staff, x: f64) -> f64 {
    symbols(staff)
        .filter_map(|s| s.top_at(x))
        .fold(staff.top_line_y, f64::min)
}

/// Lowest point of the staff at page x (stafflines included).
pub fn lower_boundary_at(staff: &Staff, x: f64) -> f64 {
    symbols(staff)
        .filter_map(|s| s.bottom_at(x))
        .fold(staff.bottom_line_y(), f64::max)
}

/// Sample positions covering the margins and every symbol of both staves.
/// Empty when the range is not finite or would need more than
/// `MAX_SAMPLES` positions.
pub fn sample_positions(upper: &Staff, lower: &Staff, config: &LayoutConfig) -> Vec<f64> {
    let (mut from, mut to) = (config.left_margin, config.right_margin);
    for s in symbols(upper).chain(symbols(lower)) {
        from = from.min(s.bbox.left);
        to = to.max(s.bbox.right);
    }
    if !(config.sample_step > 0.0) || !(to >= from) {
        return Vec::new();
    }

    let steps = ((to - from) / config.sample_step).floor();
    if !(steps < MAX_SAMPLES as f64) {
        return Vec::new();
    }
    let count = steps as usize;
    let mut xs: Vec<f64> = (0..=count).map(|i| from + i as f64 * config.sample_step).collect();
    if xs.last().map_or(false, |&x| x < to) {
        xs.push(to);
    }
    xs
}

/// Smallest vertical distance between the bottom outline of `upper` and
/// the top outline of `lower` over the sampled positions.
pub fn measured_separation(upper: &Staff, lower: &Staff, xs: &[f64]) -> Option<f64> {
    xs.iter()
        .map(|&x| upper_boundary_at(lower, x) - lower_boundary_at(upper, x))
        .reduce(f64::min)
}

/// Round a shift up to the next whole multiple of `gap`.
pub fn round_up_to_gap(shift: f64, gap: f64) -> f64 {
    ((shift / gap) - SHIFT_EPSILON).ceil() * gap
}

/// Shift needed to bring `lower` at least `min_separation` below `upper`.
fn required_shift(
    upper: &Staff,
    lower: &Staff,
    min_separation: f64,
    lower_index: usize,
    config: &LayoutConfig,
) -> Result<f64> {
    let xs = sample_positions(upper, lower, config);
    let separation = measured_separation(upper, lower, &xs)
        .ok_or(LayoutError::NoBoundarySamples { staff: lower_index })?;
    Ok(round_up_to_gap(min_separation - separation, config.gap))
}

/// Translate every staff from `from` onwards.
fn move_staves(staves: &mut [Staff], from: usize, dy: f64) {
    for staff in &mut staves[from..] {
        staff.move_by(0.0, dy);
    }
}

/// Put the top of the first staff at y = 0 and stack the others below it,
/// each one `gap` clear of the staff above. Returns the staffline distance
/// applied between each consecutive pair.
pub fn pack_staves(system: &mut System, config: &LayoutConfig) -> Result<Vec<f64>> {
    let staves = &mut system.staves;
    let Some(first) = staves.first() else {
        return Err(LayoutError::EmptySystem);
    };

    let xs = sample_positions(first, first, config);
    let top = xs
        .iter()
        .map(|&x| upper_boundary_at(first, x))
        .reduce(f64::min)
        .ok_or(LayoutError::NoBoundarySamples { staff: 0 })?;
    move_staves(staves, 0, -top);

    let mut shifts = Vec::with_capacity(staves.len().saturating_sub(1));
    for i in 1..staves.len() {
        // Start from touching stafflines, then push down until clear.
        let collapse = staves[i - 1].bottom_line_y() - staves[i].top_line_y;
        move_staves(staves, i, collapse);

        let shift = required_shift(&staves[i - 1], &staves[i], config.gap, i, config)?;
        if shift > 0.0 {
            move_staves(staves, i, shift);
        }
        log::trace!("staff {} placed {:.3} below staff {}", i, shift, i - 1);
        shifts.push(shift.max(0.0));
    }
    Ok(shifts)
}

/// Place `lower` below the last staff of `upper` with at least
/// `system_gap` gaps between their outlines. Returns the applied shift.
pub fn stack_system_below(upper: &System, lower: &mut System, config: &LayoutConfig) -> Result<f64> {
    let (Some(last), Some(first)) = (upper.staves.last(), lower.staves.first()) else {
        return Err(LayoutError::EmptySystem);
    };
    let collapse = last.bottom_line_y() - first.top_line_y;
    move_staves(&mut lower.staves, 0, collapse);

    let min_separation = config.system_gap * config.gap;
    let shift = required_shift(last, &lower.staves[0], min_separation, 0, config)?;
    if shift > 0.0 {
        move_staves(&mut lower.staves, 0, shift);
    }
    Ok(shift.max(0.0))
}
