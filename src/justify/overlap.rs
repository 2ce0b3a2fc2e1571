//! Overlap detection between temporally adjacent moments of one voice or
//! one staff.

use std::collections::BTreeMap;

use crate::model::System;
use super::constants::OVERLAP_EPSILON;
use super::moments::Moment;

/// The symbols an overlap check looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// One voice of one staff
    Voice { staff: usize, voice: usize },
    /// Both voices of one staff together
    Staff { staff: usize },
}

impl Scope {
    fn staff(&self) -> usize {
        match *self {
            Scope::Voice { staff, .. } | Scope::Staff { staff } => staff,
        }
    }

    fn voice(&self) -> Option<usize> {
        match *self {
            Scope::Voice { voice, .. } => Some(voice),
            Scope::Staff { .. } => None,
        }
    }
}

/// A collision between two adjacent moments of a scope.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Overlap {
    /// Time of the earlier moment (also the map key)
    pub earlier_ms: u64,
    /// Time of the next moment in the same scope
    pub later_ms: u64,
    /// Extra width needed between the two anchors: intrusion plus hairline
    pub required_width: f64,
}

/// Overlaps keyed by the time of the earlier moment.
pub type OverlapMap = BTreeMap<u64, Overlap>;

/// Find every pair of adjacent moments in `scope` whose symbols collide
/// along the x axis.
pub fn detect_overlaps(system: &System, moments: &[Moment], scope: Scope, hairline: f64) -> OverlapMap {
    let (staff, voice) = (scope.staff(), scope.voice());
    let in_scope: Vec<&Moment> = moments.iter().filter(|m| m.touches(staff, voice)).collect();

    let mut overlaps = OverlapMap::new();
    for pair in in_scope.windows(2) {
        let (earlier, later) = (pair[0], pair[1]);
        let mut worst: Option<f64> = None;

        for a in earlier.members_in(staff, voice) {
            let a_box = &system.symbol(a).bbox;
            for b in later.members_in(staff, voice) {
                let intrusion = a_box.intrusion_into(&system.symbol(b).bbox);
                let required = intrusion + hairline;
                if intrusion >= 0.0 && required > OVERLAP_EPSILON {
                    worst = Some(worst.map_or(required, |w: f64| w.max(required)));
                }
            }
        }

        if let Some(required_width) = worst {
            log::trace!(
                "{:?}: {}ms intrudes into {}ms, needs {:.3}",
                scope,
                earlier.time_ms,
                later.time_ms,
                required_width
            );
            overlaps.insert(
                earlier.time_ms,
                Overlap {
                    earlier_ms: earlier.time_ms,
                    later_ms: later.time_ms,
                    required_width,
                },
            );
        }
    }
    overlaps
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::*;
    use crate::justify::moments::build_moments;
    use pretty_assertions::assert_eq;

    fn chord(t: u64, left: f64, right: f64) -> Symbol {
        Symbol::chord(t, 100, BoundingBox::new(left, right, 0.0, 8.0), 0.0)
    }

    #[test]
    fn separated_symbols_do_not_overlap() {
        let system = System::new(vec![Staff::new(
            0.0,
            32.0,
            vec![Voice::new(vec![chord(0, 0.0, 10.0), chord(100, 20.0, 30.0)])],
        )]);
        let moments = build_moments(&system, 0.0).unwrap();
        let found = detect_overlaps(&system, &moments, Scope::Voice { staff: 0, voice: 0 }, 1.0);
        assert!(found.is_empty());
    }

    #[test]
    fn intrusion_plus_hairline_is_required() {
        let system = System::new(vec![Staff::new(
            0.0,
            32.0,
            vec![Voice::new(vec![chord(0, 0.0, 25.0), chord(100, 20.0, 30.0)])],
        )]);
        let moments = build_moments(&system, 0.0).unwrap();
        let found = detect_overlaps(&system, &moments, Scope::Voice { staff: 0, voice: 0 }, 1.0);
        assert_eq!(found.len(), 1);
        assert_eq!(found[&0], Overlap { earlier_ms: 0, later_ms: 100, required_width: 6.0 });
    }

    #[test]
    fn voice_scope_skips_moments_of_other_voices() {
        // The lower voice has a moment at 50ms between the top voice's two
        // chords; the top voice pair is still adjacent within its own scope.
        let top = Voice::new(vec![
            Symbol::chord(0, 100, BoundingBox::new(0.0, 25.0, 0.0, 8.0), 0.0),
            Symbol::chord(100, 100, BoundingBox::new(20.0, 30.0, 0.0, 8.0), 0.0),
        ]);
        let lower = Voice::new(vec![
            Symbol::rest(0, 50, BoundingBox::new(0.0, 5.0, 20.0, 28.0)),
            Symbol::rest(50, 150, BoundingBox::new(40.0, 45.0, 20.0, 28.0)),
        ]);
        let system = System::new(vec![Staff::new(0.0, 32.0, vec![top, lower])]);
        let moments = build_moments(&system, 0.0).unwrap();

        let top_only = detect_overlaps(&system, &moments, Scope::Voice { staff: 0, voice: 0 }, 0.0);
        assert_eq!(top_only[&0].later_ms, 100);

        // Across the staff 0 → 50 is clear, but the lower rest at 50ms ends
        // at 45, well past the left edge of the top chord at 100ms.
        let staff = detect_overlaps(&system, &moments, Scope::Staff { staff: 0 }, 0.0);
        assert_eq!(staff.keys().copied().collect::<Vec<_>>(), vec![50]);
        assert_eq!(staff[&50].required_width, 25.0);
    }
}
