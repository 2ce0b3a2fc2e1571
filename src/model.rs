//! Data model for the symbols handed to the layout engine.
//!
//! The notation layer creates these structures (with glyph metrics already
//! measured) before layout begins. Layout only ever translates symbols; it
//! never resizes them.

use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box in page units (y grows downwards).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub bottom: f64,
}

impl BoundingBox {
    pub fn new(left: f64, right: f64, top: f64, bottom: f64) -> Self {
        Self { left, right, top, bottom }
    }

    /// Translate the box in place.
    pub fn move_by(&mut self, dx: f64, dy: f64) {
        self.left += dx;
        self.right += dx;
        self.top += dy;
        self.bottom += dy;
    }

    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }

    /// How far this box reaches into `other` along the x axis.
    /// Negative values are the clearance between the two boxes.
    pub fn intrusion_into(&self, other: &BoundingBox) -> f64 {
        self.right - other.left
    }
}

/// What a symbol is. Only chords and rests carry duration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolKind {
    Chord,
    Rest,
    Clef,
    /// `width` is the distance from the barline's left edge to the anchor
    /// of the moment that follows it.
    Barline { width: f64 },
}

impl SymbolKind {
    pub fn has_duration(&self) -> bool {
        matches!(self, SymbolKind::Chord | SymbolKind::Rest)
    }
}

/// Sampled outline of a symbol, used instead of its box when stacking
/// staves. X offsets are relative to `bbox.left`, y offsets to `bbox.top`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Outline {
    /// Upper edge, sorted by x offset
    pub top: Vec<(f64, f64)>,
    /// Lower edge, sorted by x offset
    pub bottom: Vec<(f64, f64)>,
}

/// A drawable musical object: chord, rest, clef or barline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Symbol {
    /// Absolute time position in milliseconds
    pub time_ms: u64,
    /// Duration in milliseconds (0 for clefs and barlines)
    #[serde(default)]
    pub duration_ms: u64,
    pub kind: SymbolKind,
    pub bbox: BoundingBox,
    /// Distance from `bbox.left` to the point aligned with the moment anchor
    #[serde(default)]
    pub anchor_offset: f64,
    /// Optional sampled outline for vertical packing
    #[serde(default)]
    pub outline: Option<Outline>,
}

impl Symbol {
    pub fn chord(time_ms: u64, duration_ms: u64, bbox: BoundingBox, anchor_offset: f64) -> Self {
        Self {
            time_ms,
            duration_ms,
            kind: SymbolKind::Chord,
            bbox,
            anchor_offset,
            outline: None,
        }
    }

    pub fn rest(time_ms: u64, duration_ms: u64, bbox: BoundingBox) -> Self {
        Self {
            time_ms,
            duration_ms,
            kind: SymbolKind::Rest,
            bbox,
            anchor_offset: 0.0,
            outline: None,
        }
    }

    pub fn clef(time_ms: u64, bbox: BoundingBox) -> Self {
        Self {
            time_ms,
            duration_ms: 0,
            kind: SymbolKind::Clef,
            bbox,
            anchor_offset: 0.0,
            outline: None,
        }
    }

    pub fn barline(time_ms: u64, bbox: BoundingBox, width: f64) -> Self {
        Self {
            time_ms,
            duration_ms: 0,
            kind: SymbolKind::Barline { width },
            bbox,
            anchor_offset: 0.0,
            outline: None,
        }
    }

    pub fn with_outline(mut self, outline: Outline) -> Self {
        self.outline = Some(outline);
        self
    }

    /// X coordinate of the alignment point.
    pub fn anchor_x(&self) -> f64 {
        self.bbox.left + self.anchor_offset
    }

    /// Time at which this symbol stops sounding, or `None` when it lies
    /// beyond the `u64` range.
    pub fn end_ms(&self) -> Option<u64> {
        self.time_ms.checked_add(self.duration_ms)
    }

    pub fn move_by(&mut self, dx: f64, dy: f64) {
        self.bbox.move_by(dx, dy);
    }

    /// Upper edge of the symbol at page x, if the symbol covers `x`.
    pub fn top_at(&self, x: f64) -> Option<f64> {
        match self.outline.as_ref().filter(|o| !o.top.is_empty()) {
            Some(o) => interpolate(&o.top, x - self.bbox.left).map(|dy| self.bbox.top + dy),
            None => self.covers(x).then_some(self.bbox.top),
        }
    }

    /// Lower edge of the symbol at page x, if the symbol covers `x`.
    pub fn bottom_at(&self, x: f64) -> Option<f64> {
        match self.outline.as_ref().filter(|o| !o.bottom.is_empty()) {
            Some(o) => interpolate(&o.bottom, x - self.bbox.left).map(|dy| self.bbox.top + dy),
            None => self.covers(x).then_some(self.bbox.bottom),
        }
    }

    fn covers(&self, x: f64) -> bool {
        x >= self.bbox.left && x <= self.bbox.right
    }
}

/// Piecewise-linear lookup; `None` outside the sampled range.
fn interpolate(points: &[(f64, f64)], x: f64) -> Option<f64> {
    let first = points.first()?;
    let last = points.last()?;
    if x < first.0 || x > last.0 {
        return None;
    }
    for pair in points.windows(2) {
        let (x0, y0) = pair[0];
        let (x1, y1) = pair[1];
        if x >= x0 && x <= x1 {
            if x1 - x0 <= f64::EPSILON {
                return Some(y0.max(y1));
            }
            return Some(y0 + (y1 - y0) * (x - x0) / (x1 - x0));
        }
    }
    Some(first.1)
}

/// A time-ordered sequence of symbols belonging to one staff.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Voice {
    pub symbols: Vec<Symbol>,
}

impl Voice {
    pub fn new(symbols: Vec<Symbol>) -> Self {
        Self { symbols }
    }
}

/// One set of stafflines carrying a top voice and an optional lower voice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Staff {
    /// Y coordinate of the top staffline
    pub top_line_y: f64,
    /// Distance from the top to the bottom staffline
    pub height: f64,
    /// Index 0 is the top voice, index 1 the lower voice
    pub voices: Vec<Voice>,
}

impl Staff {
    pub fn new(top_line_y: f64, height: f64, voices: Vec<Voice>) -> Self {
        Self { top_line_y, height, voices }
    }

    pub fn bottom_line_y(&self) -> f64 {
        self.top_line_y + self.height
    }

    pub fn has_lower_voice(&self) -> bool {
        self.voices.len() > 1
    }

    /// Translate the stafflines and every symbol on them.
    pub fn move_by(&mut self, dx: f64, dy: f64) {
        self.top_line_y += dy;
        for symbol in self.voices.iter_mut().flat_map(|v| v.symbols.iter_mut()) {
            symbol.move_by(dx, dy);
        }
    }
}

/// One line of music: an ordered list of staves.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct System {
    pub staves: Vec<Staff>,
}

impl System {
    pub fn new(staves: Vec<Staff>) -> Self {
        Self { staves }
    }

    pub fn symbol(&self, r: SymbolRef) -> &Symbol {
        &self.staves[r.staff].voices[r.voice].symbols[r.index]
    }

    pub fn symbol_mut(&mut self, r: SymbolRef) -> &mut Symbol {
        &mut self.staves[r.staff].voices[r.voice].symbols[r.index]
    }

    /// Time at which the last duration-bearing symbol ends. Symbols whose
    /// end overflows are skipped; validation rejects them.
    pub fn end_ms(&self) -> u64 {
        self.staves
            .iter()
            .flat_map(|s| s.voices.iter())
            .flat_map(|v| v.symbols.iter())
            .filter(|s| s.kind.has_duration())
            .filter_map(Symbol::end_ms)
            .max()
            .unwrap_or(0)
    }
}

/// The systems laid out on one page, top to bottom.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Page {
    pub systems: Vec<System>,
}

/// Non-owning reference to a symbol inside a [`System`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SymbolRef {
    pub staff: usize,
    pub voice: usize,
    pub index: usize,
}

impl SymbolRef {
    pub fn new(staff: usize, voice: usize, index: usize) -> Self {
        Self { staff, voice, index }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn move_by_translates_box_and_anchor() {
        let mut s = Symbol::chord(0, 500, BoundingBox::new(10.0, 30.0, -5.0, 5.0), 8.0);
        s.move_by(4.0, 2.0);
        assert_eq!(s.bbox, BoundingBox::new(14.0, 34.0, -3.0, 7.0));
        assert_eq!(s.anchor_x(), 22.0);
    }

    #[test]
    fn outline_is_interpolated_between_samples() {
        let s = Symbol::chord(0, 500, BoundingBox::new(100.0, 120.0, 0.0, 40.0), 0.0)
            .with_outline(Outline {
                top: vec![(0.0, 0.0), (20.0, 20.0)],
                bottom: vec![(0.0, 10.0), (20.0, 40.0)],
            });
        assert_eq!(s.top_at(110.0), Some(10.0));
        assert_eq!(s.bottom_at(110.0), Some(25.0));
        assert_eq!(s.top_at(130.0), None);
    }

    #[test]
    fn box_sampling_without_outline() {
        let s = Symbol::rest(0, 500, BoundingBox::new(0.0, 10.0, -4.0, 6.0));
        assert_eq!(s.top_at(5.0), Some(-4.0));
        assert_eq!(s.bottom_at(10.0), Some(6.0));
        assert_eq!(s.bottom_at(10.5), None);
    }

    #[test]
    fn system_end_ignores_barlines() {
        let system = System::new(vec![Staff::new(
            0.0,
            40.0,
            vec![Voice::new(vec![
                Symbol::rest(0, 750, BoundingBox::default()),
                Symbol::barline(750, BoundingBox::default(), 2.0),
            ])],
        )]);
        assert_eq!(system.end_ms(), 750);
    }

    #[test]
    fn end_past_u64_is_none() {
        let s = Symbol::rest(u64::MAX - 10, 1000, BoundingBox::default());
        assert_eq!(s.end_ms(), None);
        assert_eq!(Symbol::rest(250, 500, BoundingBox::default()).end_ms(), Some(750));
    }

    #[test]
    fn box_extents() {
        let b = BoundingBox::new(10.0, 34.0, -6.0, 2.0);
        assert_eq!(b.width(), 24.0);
        assert_eq!(b.height(), 8.0);
    }
}
