//! Moments: every symbol of a system that shares one time position,
//! aligned on a single horizontal anchor.

use std::collections::BTreeMap;

use crate::error::{LayoutError, Result};
use crate::model::*;
use super::constants::MAX_COORDINATE;

/// All symbols of a system that start at the same time, plus any clefs and
/// barlines that immediately precede them in their voice.
#[derive(Debug, Clone, PartialEq)]
pub struct Moment {
    pub time_ms: u64,
    /// Shared horizontal anchor
    pub alignment_x: f64,
    /// Chords and rests anchored here
    pub symbols: Vec<SymbolRef>,
    /// Barlines folded in from the preceding position in their voice
    pub barlines: Vec<SymbolRef>,
    /// Clefs folded in from the preceding position in their voice
    pub clefs: Vec<SymbolRef>,
}

impl Moment {
    fn new(time_ms: u64) -> Self {
        Self {
            time_ms,
            alignment_x: 0.0,
            symbols: Vec::new(),
            barlines: Vec::new(),
            clefs: Vec::new(),
        }
    }

    /// Every symbol that belongs to this moment.
    pub fn members(&self) -> impl Iterator<Item = SymbolRef> + '_ {
        self.symbols
            .iter()
            .chain(self.barlines.iter())
            .chain(self.clefs.iter())
            .copied()
    }

    /// Members on `staff`, restricted to one voice when `voice` is given.
    pub fn members_in(&self, staff: usize, voice: Option<usize>) -> impl Iterator<Item = SymbolRef> + '_ {
        self.members()
            .filter(move |r| r.staff == staff && voice.map_or(true, |v| r.voice == v))
    }

    pub fn touches(&self, staff: usize, voice: Option<usize>) -> bool {
        self.members_in(staff, voice).next().is_some()
    }

    /// Fixed space between the leading edge of this moment's barline and
    /// its anchor. Zero when no barline was folded in.
    pub fn barline_width(&self, system: &System) -> f64 {
        self.barlines
            .iter()
            .filter_map(|&r| match system.symbol(r).kind {
                SymbolKind::Barline { width } => Some(width),
                _ => None,
            })
            .fold(0.0, f64::max)
    }

    /// Leftmost edge of every member.
    pub fn left_extent(&self, system: &System) -> f64 {
        self.members()
            .map(|r| system.symbol(r).bbox.left)
            .fold(self.alignment_x, f64::min)
    }

    /// The anchor implied by the current geometry of the members.
    fn current_alignment(&self, system: &System, clef_gap: f64) -> f64 {
        if let Some(&r) = self.symbols.first() {
            return system.symbol(r).anchor_x();
        }
        if let Some(&r) = self.barlines.first() {
            let s = system.symbol(r);
            if let SymbolKind::Barline { width } = s.kind {
                return s.bbox.left + width;
            }
        }
        self.clefs
            .first()
            .map_or(0.0, |&r| system.symbol(r).bbox.right + clef_gap)
    }

    /// Move every member so that it sits on `alignment_x`.
    ///
    /// Chords and rests put their anchor on the alignment; barlines end
    /// their fixed width before it; clefs sit `clef_gap` left of whatever
    /// else their voice has in this moment.
    pub fn place(&self, system: &mut System, clef_gap: f64) {
        let x = self.alignment_x;
        for &r in &self.symbols {
            let s = system.symbol_mut(r);
            let dx = x - s.anchor_x();
            s.move_by(dx, 0.0);
        }
        for &r in &self.barlines {
            let s = system.symbol_mut(r);
            let width = match s.kind {
                SymbolKind::Barline { width } => width,
                _ => 0.0,
            };
            let dx = (x - width) - s.bbox.left;
            s.move_by(dx, 0.0);
        }

        // Later clefs sit closer to the anchor, so walk them right to left.
        for &r in self.clefs.iter().rev() {
            let leading = self
                .symbols
                .iter()
                .chain(self.barlines.iter())
                .chain(self.clefs.iter().filter(|c| c.index > r.index))
                .filter(|o| o.staff == r.staff && o.voice == r.voice)
                .map(|&o| system.symbol(o).bbox.left)
                .fold(x, f64::min);
            let s = system.symbol_mut(r);
            let dx = (leading - clef_gap) - s.bbox.right;
            s.move_by(dx, 0.0);
        }
    }
}

fn in_range(v: f64) -> bool {
    v.is_finite() && v.abs() <= MAX_COORDINATE
}

/// Finite, upright, on-page geometry.
fn has_valid_geometry(symbol: &Symbol) -> bool {
    let b = &symbol.bbox;
    let box_ok = [b.left, b.right, b.top, b.bottom].into_iter().all(in_range)
        && b.width() >= 0.0
        && b.height() >= 0.0;
    let barline_ok = match symbol.kind {
        SymbolKind::Barline { width } => in_range(width) && width >= 0.0,
        _ => true,
    };
    let outline_ok = symbol.outline.as_ref().map_or(true, |o| {
        o.top.iter().chain(o.bottom.iter()).all(|&(dx, dy)| in_range(dx) && in_range(dy))
    });
    box_ok && barline_ok && outline_ok && in_range(symbol.anchor_offset)
}

/// Check the structural invariants every voice must satisfy.
pub fn validate_system(system: &System) -> Result<()> {
    let end = system.end_ms();
    let mut any_symbol = false;

    for (si, staff) in system.staves.iter().enumerate() {
        if staff.voices.is_empty() || staff.voices.len() > 2 {
            return Err(LayoutError::InvalidStaff { staff: si, voices: staff.voices.len() });
        }
        for (vi, voice) in staff.voices.iter().enumerate() {
            let mut last_time = 0u64;
            let mut last_onset: Option<u64> = None;
            for (i, symbol) in voice.symbols.iter().enumerate() {
                any_symbol = true;
                if !has_valid_geometry(symbol) {
                    return Err(LayoutError::InvalidGeometry { staff: si, voice: vi, index: i });
                }
                let out_of_order = symbol.time_ms < last_time
                    || (symbol.kind.has_duration() && last_onset.map_or(false, |t| symbol.time_ms <= t));
                if out_of_order {
                    return Err(LayoutError::UnorderedVoice {
                        staff: si,
                        voice: vi,
                        index: i,
                        time_ms: symbol.time_ms,
                    });
                }
                if symbol.kind.has_duration() {
                    if symbol.duration_ms == 0 {
                        return Err(LayoutError::NonPositiveDuration { staff: si, voice: vi, index: i });
                    }
                    if symbol.end_ms().is_none() {
                        return Err(LayoutError::TimeOverflow { staff: si, voice: vi, index: i });
                    }
                    last_onset = Some(symbol.time_ms);
                } else if symbol.time_ms > end {
                    return Err(LayoutError::TrailingSymbolAfterEnd {
                        staff: si,
                        voice: vi,
                        index: i,
                        time_ms: symbol.time_ms,
                    });
                }
                last_time = symbol.time_ms;
            }
        }
    }

    if !any_symbol {
        return Err(LayoutError::EmptySystem);
    }
    Ok(())
}

/// Merge every voice of the system into one time-ordered list of moments.
///
/// Clefs and barlines are folded into the moment of the next chord or rest
/// in their voice; trailing ones go to a final moment at the system end.
/// Anchors are taken from the current geometry.
pub fn build_moments(system: &System, clef_gap: f64) -> Result<Vec<Moment>> {
    validate_system(system)?;

    let end = system.end_ms();
    let mut by_time: BTreeMap<u64, Moment> = BTreeMap::new();

    for (si, staff) in system.staves.iter().enumerate() {
        for (vi, voice) in staff.voices.iter().enumerate() {
            let mut pending_barlines = Vec::new();
            let mut pending_clefs = Vec::new();

            for (i, symbol) in voice.symbols.iter().enumerate() {
                let r = SymbolRef::new(si, vi, i);
                match symbol.kind {
                    SymbolKind::Barline { .. } => pending_barlines.push(r),
                    SymbolKind::Clef => pending_clefs.push(r),
                    SymbolKind::Chord | SymbolKind::Rest => {
                        let moment = by_time
                            .entry(symbol.time_ms)
                            .or_insert_with(|| Moment::new(symbol.time_ms));
                        moment.symbols.push(r);
                        moment.barlines.append(&mut pending_barlines);
                        moment.clefs.append(&mut pending_clefs);
                    }
                }
            }

            if !pending_barlines.is_empty() || !pending_clefs.is_empty() {
                let moment = by_time.entry(end).or_insert_with(|| Moment::new(end));
                moment.barlines.append(&mut pending_barlines);
                moment.clefs.append(&mut pending_clefs);
            }
        }
    }

    let mut moments: Vec<Moment> = by_time.into_values().collect();
    if moments.is_empty() {
        return Err(LayoutError::EmptySystem);
    }
    for moment in &mut moments {
        moment.alignment_x = moment.current_alignment(system, clef_gap);
    }

    log::trace!("built {} moments ending at {}ms", moments.len(), end);
    Ok(moments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn bx(left: f64, right: f64) -> BoundingBox {
        BoundingBox::new(left, right, -10.0, 10.0)
    }

    fn two_voice_system() -> System {
        let top = Voice::new(vec![
            Symbol::clef(0, bx(0.0, 20.0)),
            Symbol::chord(0, 500, bx(0.0, 10.0), 0.0),
            Symbol::barline(500, bx(0.0, 2.0), 6.0),
            Symbol::chord(500, 500, bx(0.0, 10.0), 0.0),
            Symbol::barline(1000, bx(0.0, 2.0), 2.0),
        ]);
        let lower = Voice::new(vec![
            Symbol::rest(0, 250, bx(0.0, 8.0)),
            Symbol::rest(250, 750, bx(0.0, 8.0)),
        ]);
        System::new(vec![Staff::new(0.0, 32.0, vec![top, lower])])
    }

    #[test]
    fn moments_merge_voices_by_time() {
        let system = two_voice_system();
        let moments = build_moments(&system, 2.0).unwrap();
        let times: Vec<u64> = moments.iter().map(|m| m.time_ms).collect();
        assert_eq!(times, vec![0, 250, 500, 1000]);
        assert_eq!(moments[0].symbols.len(), 2);
        assert_eq!(moments[0].clefs, vec![SymbolRef::new(0, 0, 0)]);
        assert_eq!(moments[2].barlines, vec![SymbolRef::new(0, 0, 2)]);
        assert_eq!(moments[2].barline_width(&system), 6.0);
    }

    #[test]
    fn trailing_barline_gets_final_moment() {
        let system = two_voice_system();
        let moments = build_moments(&system, 2.0).unwrap();
        let last = moments.last().unwrap();
        assert_eq!(last.time_ms, 1000);
        assert!(last.symbols.is_empty());
        assert_eq!(last.barlines, vec![SymbolRef::new(0, 0, 4)]);
    }

    #[test]
    fn trailing_clef_gets_final_moment() {
        let voice = Voice::new(vec![
            Symbol::chord(0, 400, bx(0.0, 10.0), 0.0),
            Symbol::clef(400, bx(0.0, 16.0)),
        ]);
        let system = System::new(vec![Staff::new(0.0, 32.0, vec![voice])]);
        let moments = build_moments(&system, 2.0).unwrap();

        assert_eq!(moments.len(), 2);
        let last = &moments[1];
        assert_eq!(last.time_ms, 400);
        assert!(last.symbols.is_empty() && last.barlines.is_empty());
        assert_eq!(last.clefs, vec![SymbolRef::new(0, 0, 1)]);
        // A lone clef is anchored clef_gap right of its box.
        assert_eq!(last.alignment_x, 18.0);
    }

    #[test]
    fn end_time_overflow_is_rejected() {
        let voice = Voice::new(vec![Symbol::chord(u64::MAX - 100, 1000, bx(0.0, 10.0), 0.0)]);
        let system = System::new(vec![Staff::new(0.0, 32.0, vec![voice])]);
        assert!(matches!(
            build_moments(&system, 2.0),
            Err(LayoutError::TimeOverflow { staff: 0, voice: 0, index: 0 })
        ));
    }

    #[test]
    fn unusable_geometry_is_rejected() {
        let bad = [
            Symbol::chord(0, 100, bx(0.0, 1e300), 0.0),
            Symbol::chord(0, 100, bx(0.0, f64::NAN), 0.0),
            Symbol::chord(0, 100, bx(10.0, 0.0), 0.0),
            Symbol::chord(0, 100, bx(0.0, 10.0), f64::INFINITY),
            Symbol::barline(0, bx(0.0, 2.0), -1.0),
            Symbol::rest(0, 100, bx(0.0, 10.0)).with_outline(Outline {
                top: vec![(0.0, f64::NEG_INFINITY)],
                bottom: Vec::new(),
            }),
        ];
        for symbol in bad {
            let system = System::new(vec![Staff::new(0.0, 32.0, vec![Voice::new(vec![symbol.clone()])])]);
            assert!(
                matches!(build_moments(&system, 2.0), Err(LayoutError::InvalidGeometry { index: 0, .. })),
                "{symbol:?} was accepted"
            );
        }
    }

    #[test]
    fn out_of_order_voice_is_rejected() {
        let system = System::new(vec![Staff::new(
            0.0,
            32.0,
            vec![Voice::new(vec![
                Symbol::chord(500, 500, bx(0.0, 10.0), 0.0),
                Symbol::chord(500, 500, bx(0.0, 10.0), 0.0),
            ])],
        )]);
        assert!(matches!(
            build_moments(&system, 2.0),
            Err(LayoutError::UnorderedVoice { index: 1, .. })
        ));
    }

    #[test]
    fn empty_system_is_rejected() {
        let system = System::new(vec![Staff::new(0.0, 32.0, vec![Voice::default()])]);
        assert!(matches!(build_moments(&system, 2.0), Err(LayoutError::EmptySystem)));
    }

    #[test]
    fn three_voices_is_an_invalid_staff() {
        let v = || Voice::new(vec![Symbol::rest(0, 100, bx(0.0, 1.0))]);
        let system = System::new(vec![Staff::new(0.0, 32.0, vec![v(), v(), v()])]);
        assert!(matches!(
            build_moments(&system, 2.0),
            Err(LayoutError::InvalidStaff { staff: 0, voices: 3 })
        ));
    }

    #[test]
    fn place_aligns_members() {
        let mut system = two_voice_system();
        let mut moments = build_moments(&system, 2.0).unwrap();
        moments[2].alignment_x = 100.0;
        moments[2].place(&mut system, 2.0);
        assert_eq!(system.symbol(SymbolRef::new(0, 0, 3)).anchor_x(), 100.0);
        assert_eq!(system.symbol(SymbolRef::new(0, 0, 2)).bbox.left, 94.0);

        moments[0].alignment_x = 40.0;
        moments[0].place(&mut system, 2.0);
        // Clef ends clef_gap before the chord.
        assert_eq!(system.symbol(SymbolRef::new(0, 0, 0)).bbox.right, 38.0);
    }
}
