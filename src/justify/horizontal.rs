//! Horizontal justification: alternate between fixing the top voices and
//! the lower voices until neither pass moves anything.

use serde::{Deserialize, Serialize};

use crate::config::LayoutConfig;
use crate::error::{LayoutError, Result};
use crate::model::System;
use super::moments::Moment;
use super::overlap::{detect_overlaps, OverlapMap, Scope};
use super::redistribute::{redistribute, CompressibilitySet, Redistribution};
use super::spacing::barline_widths;

/// Which voices of a staff a diagnostic refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoiceGroup {
    /// The top voice on its own
    Top,
    /// The lower voice, alone and together with the top voice
    Lower,
}

/// Collisions that were left in place because there was no width to
/// trade for them. Advisory: the geometry is still usable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub system_index: usize,
    pub staff_index: usize,
    pub unresolved_overlaps: usize,
    pub voice_group: VoiceGroup,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    FixTop,
    FixLower,
    Done,
}

/// Fixed-point driver over one system's moments.
pub struct HorizontalJustifier<'a> {
    config: &'a LayoutConfig,
    barline_widths: Vec<f64>,
    compressibility: CompressibilitySet,
    passes: usize,
}

impl<'a> HorizontalJustifier<'a> {
    pub fn new(system: &System, moments: &[Moment], config: &'a LayoutConfig) -> Self {
        Self {
            config,
            barline_widths: barline_widths(moments, system),
            compressibility: CompressibilitySet::new(),
            passes: 0,
        }
    }

    /// Run to the fixed point. Returns the number of passes taken.
    pub fn run(&mut self, system: &mut System, moments: &mut [Moment]) -> Result<usize> {
        let mut phase = Phase::FixTop;
        loop {
            phase = match phase {
                Phase::FixTop => {
                    self.fix_top(system, moments)?;
                    Phase::FixLower
                }
                // Moving a lower voice can push material back into a top voice.
                Phase::FixLower => {
                    if self.fix_lower(system, moments)? {
                        Phase::FixTop
                    } else {
                        Phase::Done
                    }
                }
                Phase::Done => break,
            };
        }
        log::debug!(
            "horizontal justification settled after {} passes ({} moments fixed)",
            self.passes,
            self.compressibility.fixed_count()
        );
        Ok(self.passes)
    }

    fn fix_top(&mut self, system: &mut System, moments: &mut [Moment]) -> Result<bool> {
        let mut moved = false;
        loop {
            self.tick()?;
            let mut progress = false;
            for staff in 0..system.staves.len() {
                let scopes = [Scope::Voice { staff, voice: 0 }];
                progress |= self.fix_staff(system, moments, &scopes, VoiceGroup::Top)?;
            }
            if !progress {
                return Ok(moved);
            }
            moved = true;
        }
    }

    fn fix_lower(&mut self, system: &mut System, moments: &mut [Moment]) -> Result<bool> {
        let mut moved = false;
        loop {
            self.tick()?;
            let mut progress = false;
            for staff in 0..system.staves.len() {
                if !system.staves[staff].has_lower_voice() {
                    continue;
                }
                let scopes = [Scope::Voice { staff, voice: 1 }, Scope::Staff { staff }];
                progress |= self.fix_staff(system, moments, &scopes, VoiceGroup::Lower)?;
            }
            if !progress {
                return Ok(moved);
            }
            moved = true;
        }
    }

    /// Detect and redistribute on one staff until its scopes are clear or
    /// the budget runs out. Returns whether any anchor moved.
    fn fix_staff(
        &mut self,
        system: &mut System,
        moments: &mut [Moment],
        scopes: &[Scope],
        group: VoiceGroup,
    ) -> Result<bool> {
        let mut moved = false;
        loop {
            let Some(overlaps) = scopes
                .iter()
                .map(|&scope| detect_overlaps(system, moments, scope, self.config.hairline))
                .find(|found| !found.is_empty())
            else {
                return Ok(moved);
            };

            self.tick()?;
            match redistribute(
                system,
                moments,
                &self.barline_widths,
                &mut self.compressibility,
                &overlaps,
                self.config.clef_gap,
            ) {
                Redistribution::Applied { .. } => moved = true,
                Redistribution::Infeasible { compressible, required } => {
                    log::warn!(
                        "{:?}: {} overlaps left unresolved ({:?} voices), need {:.3} but only {:.3} compressible",
                        scopes[0],
                        overlaps.len(),
                        group,
                        required,
                        compressible
                    );
                    return Ok(moved);
                }
            }
        }
    }

    fn tick(&mut self) -> Result<()> {
        self.passes += 1;
        if self.passes > self.config.max_passes {
            return Err(LayoutError::NoConvergence { passes: self.config.max_passes });
        }
        Ok(())
    }
}

/// Convenience wrapper: run a [`HorizontalJustifier`] over `moments`.
pub fn justify_horizontally(system: &mut System, moments: &mut [Moment], config: &LayoutConfig) -> Result<usize> {
    HorizontalJustifier::new(system, moments, config).run(system, moments)
}

/// Every collision still present in the system, grouped per staff and
/// voice group.
pub fn unresolved_overlaps(
    system: &System,
    moments: &[Moment],
    system_index: usize,
    hairline: f64,
) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    for (staff_index, staff) in system.staves.iter().enumerate() {
        let top = detect_overlaps(system, moments, Scope::Voice { staff: staff_index, voice: 0 }, hairline);
        if !top.is_empty() {
            diagnostics.push(Diagnostic {
                system_index,
                staff_index,
                unresolved_overlaps: top.len(),
                voice_group: VoiceGroup::Top,
            });
        }

        if staff.has_lower_voice() {
            let mut lower: OverlapMap =
                detect_overlaps(system, moments, Scope::Voice { staff: staff_index, voice: 1 }, hairline);
            lower.extend(detect_overlaps(system, moments, Scope::Staff { staff: staff_index }, hairline));
            if !lower.is_empty() {
                diagnostics.push(Diagnostic {
                    system_index,
                    staff_index,
                    unresolved_overlaps: lower.len(),
                    voice_group: VoiceGroup::Lower,
                });
            }
        }
    }
    diagnostics
}
