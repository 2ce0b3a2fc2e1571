//! Proportional spacing: first horizontal positions, proportional to
//! elapsed musical time.

use crate::config::LayoutConfig;
use crate::error::{LayoutError, Result};
use crate::model::System;
use super::moments::Moment;

/// Fixed barline space in front of each moment.
pub fn barline_widths(moments: &[Moment], system: &System) -> Vec<f64> {
    moments.iter().map(|m| m.barline_width(system)).collect()
}

/// Width of each moment: the distance to the next anchor minus the
/// barline in front of it. The last moment has no width.
pub fn moment_widths(moments: &[Moment], barline_widths: &[f64]) -> Vec<f64> {
    moments
        .windows(2)
        .enumerate()
        .map(|(i, pair)| pair[1].alignment_x - pair[0].alignment_x - barline_widths[i + 1])
        .collect()
}

/// Distribute `width` over the moments in proportion to elapsed time,
/// starting from an anchor at `start_x`.
///
/// The spreadable width is `width` minus every barline after the first
/// moment, so the gaps plus the barlines add up to exactly `width`.
pub fn space_proportionally(
    moments: &mut [Moment],
    barline_widths: &[f64],
    start_x: f64,
    width: f64,
    time_scale: u64,
) -> Result<()> {
    let Some(first) = moments.first_mut() else {
        return Err(LayoutError::EmptySystem);
    };
    first.alignment_x = start_x;
    if moments.len() == 1 {
        return Ok(());
    }

    let fixed: f64 = barline_widths.iter().skip(1).sum();
    let spreadable = width - fixed;
    if spreadable <= 0.0 {
        return Err(LayoutError::InsufficientWidth { available: width, fixed });
    }

    // Integer weights keep the ratios exact before the single division.
    let overflow = || {
        LayoutError::InvalidConfig(format!(
            "time scale {} overflows the weights of a {}ms system",
            time_scale,
            moments[moments.len() - 1].time_ms - moments[0].time_ms
        ))
    };
    let weighted_gaps = moments
        .windows(2)
        .map(|pair| (pair[1].time_ms - pair[0].time_ms).checked_mul(time_scale))
        .collect::<Option<Vec<u64>>>()
        .ok_or_else(overflow)?;
    let total = weighted_gaps
        .iter()
        .try_fold(0u64, |sum, &w| sum.checked_add(w))
        .ok_or_else(overflow)? as f64;

    for i in 1..moments.len() {
        let gap = weighted_gaps[i - 1] as f64 * spreadable / total;
        moments[i].alignment_x = moments[i - 1].alignment_x + barline_widths[i] + gap;
    }

    log::trace!(
        "proportional spacing: {} moments, spreadable {:.3}, factor {:e}",
        moments.len(),
        spreadable,
        spreadable / total
    );
    Ok(())
}

/// Compute the leading offset, spread the moments proportionally between
/// the margins and place every symbol on its anchor.
///
/// Returns the width that was distributed (right margin minus the first
/// anchor).
pub fn initial_layout(system: &mut System, moments: &mut [Moment], config: &LayoutConfig) -> Result<f64> {
    let Some(first) = moments.first_mut() else {
        return Err(LayoutError::EmptySystem);
    };
    first.alignment_x = 0.0;
    first.place(system, config.clef_gap);
    let leading_offset = -first.left_extent(system);

    let start_x = config.left_margin + leading_offset;
    let width = config.right_margin - start_x;
    let widths = barline_widths(moments, system);
    space_proportionally(moments, &widths, start_x, width, config.time_scale)?;

    for moment in moments.iter() {
        moment.place(system, config.clef_gap);
    }
    Ok(width)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::*;
    use crate::justify::moments::build_moments;
    use pretty_assertions::assert_eq;

    fn system_with_times(times: &[u64], barline_at: Option<usize>) -> System {
        let mut symbols = Vec::new();
        for (i, &t) in times.iter().enumerate() {
            if barline_at == Some(i) {
                symbols.push(Symbol::barline(t, BoundingBox::new(0.0, 2.0, 0.0, 32.0), 10.0));
            }
            let duration = times.get(i + 1).map_or(1000, |next| next - t);
            symbols.push(Symbol::chord(t, duration, BoundingBox::new(0.0, 10.0, 0.0, 8.0), 0.0));
        }
        System::new(vec![Staff::new(0.0, 32.0, vec![Voice::new(symbols)])])
    }

    #[test]
    fn gaps_are_proportional_to_time() {
        let system = system_with_times(&[0, 1000, 3000], None);
        let mut moments = build_moments(&system, 0.0).unwrap();
        let bw = barline_widths(&moments, &system);
        space_proportionally(&mut moments, &bw, 0.0, 300.0, 10_000).unwrap();
        let xs: Vec<f64> = moments.iter().map(|m| m.alignment_x).collect();
        assert_eq!(xs, vec![0.0, 100.0, 300.0]);
    }

    #[test]
    fn barline_widths_are_taken_out_of_the_spread() {
        let system = system_with_times(&[0, 1000, 2000], Some(1));
        let mut moments = build_moments(&system, 0.0).unwrap();
        let bw = barline_widths(&moments, &system);
        space_proportionally(&mut moments, &bw, 0.0, 210.0, 10_000).unwrap();
        let widths = moment_widths(&moments, &bw);
        assert_eq!(widths, vec![100.0, 100.0]);
        assert_eq!(moments[1].alignment_x, 110.0);
        let total: f64 = widths.iter().sum::<f64>() + bw.iter().skip(1).sum::<f64>();
        assert!((total - 210.0).abs() < 1e-9);
    }

    #[test]
    fn barlines_wider_than_the_system_are_rejected() {
        let system = system_with_times(&[0, 1000], Some(1));
        let mut moments = build_moments(&system, 0.0).unwrap();
        let bw = barline_widths(&moments, &system);
        assert!(matches!(
            space_proportionally(&mut moments, &bw, 0.0, 5.0, 10_000),
            Err(LayoutError::InsufficientWidth { .. })
        ));
    }

    #[test]
    fn overflowing_time_weights_are_rejected() {
        let system = system_with_times(&[0, 1000, 2000], None);
        let mut moments = build_moments(&system, 0.0).unwrap();
        let bw = barline_widths(&moments, &system);
        assert!(matches!(
            space_proportionally(&mut moments, &bw, 0.0, 300.0, u64::MAX / 1500),
            Err(LayoutError::InvalidConfig(_))
        ));
        assert!(matches!(
            space_proportionally(&mut moments, &bw, 0.0, 300.0, u64::MAX / 100),
            Err(LayoutError::InvalidConfig(_))
        ));
    }

    #[test]
    fn initial_layout_reserves_room_for_the_leading_clef() {
        let mut system = System::new(vec![Staff::new(
            0.0,
            32.0,
            vec![Voice::new(vec![
                Symbol::clef(0, BoundingBox::new(0.0, 20.0, -8.0, 40.0)),
                Symbol::chord(0, 1000, BoundingBox::new(0.0, 10.0, 0.0, 8.0), 4.0),
                Symbol::barline(1000, BoundingBox::new(0.0, 2.0, 0.0, 32.0), 2.0),
            ])],
        )]);
        let config = LayoutConfig {
            left_margin: 0.0,
            right_margin: 200.0,
            clef_gap: 2.0,
            ..LayoutConfig::default()
        };
        let mut moments = build_moments(&system, config.clef_gap).unwrap();
        let width = initial_layout(&mut system, &mut moments, &config).unwrap();

        // clef (20) + clef gap (2) + anchor offset (4)
        assert_eq!(moments[0].alignment_x, 26.0);
        assert_eq!(width, 174.0);
        assert_eq!(system.symbol(SymbolRef::new(0, 0, 0)).bbox.left, 0.0);
        assert_eq!(moments[1].alignment_x, 200.0);
        assert_eq!(system.symbol(SymbolRef::new(0, 0, 2)).bbox.right, 200.0);
    }
}
