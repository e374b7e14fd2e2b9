//! Turning pitch sequences into note events.
//!
//! Each pitch is classified by the first matching rule, in fixed order:
//! divider marker, below a threshold, above a threshold, equal to a value,
//! and finally the default shape. A second pass then suppresses repeated
//! pitches and pitches that correspond to configured skip values.

use crate::divider::PitchItem;
use crate::mapping::Mapping;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Highest valid MIDI key or velocity.
const MIDI_MAX: u8 = 127;

/// Duration (in beats) and volume (MIDI velocity) of a note.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoteShape {
    pub duration: f64,
    pub volume: u8,
}

impl NoteShape {
    pub fn new(duration: f64, volume: u8) -> Self {
        Self { duration, volume }
    }

    /// Durations must be finite and non-negative; volumes at most 127.
    pub fn validate(&self) -> Result<()> {
        if !self.duration.is_finite() || self.duration < 0.0 || self.volume > MIDI_MAX {
            return Err(Error::InvalidNoteShape {
                duration: self.duration,
                volume: self.volume,
            });
        }
        Ok(())
    }

    /// A zero duration means "drop this note".
    pub fn drops_note(&self) -> bool {
        self.duration == 0.0
    }
}

impl Default for NoteShape {
    fn default() -> Self {
        Self {
            duration: 0.25,
            volume: 90,
        }
    }
}

/// An exception rule keyed on a raw data value.
///
/// `value` is in data units; it is converted to a pitch with the track's
/// own mapping before comparison.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdRule {
    pub value: f64,
    #[serde(default = "ThresholdRule::default_duration")]
    pub duration: f64,
    #[serde(default = "ThresholdRule::default_volume")]
    pub volume: u8,
}

impl ThresholdRule {
    pub fn new(value: f64) -> Self {
        Self {
            value,
            duration: Self::default_duration(),
            volume: Self::default_volume(),
        }
    }

    pub fn with_shape(mut self, duration: f64, volume: u8) -> Self {
        self.duration = duration;
        self.volume = volume;
        self
    }

    pub fn shape(&self) -> NoteShape {
        NoteShape::new(self.duration, self.volume)
    }

    fn default_duration() -> f64 {
        NoteShape::default().duration
    }

    fn default_volume() -> u8 {
        NoteShape::default().volume
    }
}

/// The sound played for a divider marker. Its pitch may lie outside the
/// track's pitch range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DividerNote {
    #[serde(default = "DividerNote::default_pitch")]
    pub pitch: u8,
    #[serde(default = "DividerNote::default_duration")]
    pub duration: f64,
    #[serde(default)]
    pub volume: u8,
}

impl DividerNote {
    fn default_pitch() -> u8 {
        50
    }

    fn default_duration() -> f64 {
        0.5
    }

    pub fn shape(&self) -> NoteShape {
        NoteShape::new(self.duration, self.volume)
    }
}

impl Default for DividerNote {
    /// A silent rest twice as long as a default note.
    fn default() -> Self {
        Self {
            pitch: Self::default_pitch(),
            duration: Self::default_duration(),
            volume: 0,
        }
    }
}

/// Classification rules shared by every track.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassifyRules {
    pub default: NoteShape,
    pub below: Option<ThresholdRule>,
    pub above: Option<ThresholdRule>,
    pub equal: Option<ThresholdRule>,
    pub divider: DividerNote,
}

impl ClassifyRules {
    fn validate(&self) -> Result<()> {
        self.default.validate()?;
        for rule in [&self.below, &self.above, &self.equal].into_iter().flatten() {
            rule.shape().validate()?;
        }
        self.divider.shape().validate()?;
        if self.divider.pitch > MIDI_MAX {
            return Err(Error::InvalidPitch(self.divider.pitch));
        }
        Ok(())
    }
}

/// Post-classification note removal.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Suppression {
    /// Drop a note whose pitch equals the last kept note's pitch.
    pub skip_duplicates: bool,
    /// Raw data values whose pitches are always dropped.
    pub skip_values: Vec<f64>,
}

/// One note of a track. Start times are implied by the running sum of
/// preceding durations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoteEvent {
    pub pitch: u8,
    pub duration: f64,
    pub volume: u8,
}

impl NoteEvent {
    fn shaped(pitch: u8, shape: NoteShape) -> Self {
        Self {
            pitch,
            duration: shape.duration,
            volume: shape.volume,
        }
    }
}

/// Threshold pitches resolved against one track's mapping.
struct ResolvedRules {
    below: Option<(u8, NoteShape)>,
    above: Option<(u8, NoteShape)>,
    equal: Option<(u8, NoteShape)>,
}

impl ResolvedRules {
    fn resolve(rules: &ClassifyRules, mapping: &Mapping) -> Result<Self> {
        let resolve = |rule: &Option<ThresholdRule>| -> Result<Option<(u8, NoteShape)>> {
            rule.as_ref()
                .map(|r| mapping.pitch_of(r.value).map(|pitch| (pitch, r.shape())))
                .transpose()
        };
        Ok(Self {
            below: resolve(&rules.below)?,
            above: resolve(&rules.above)?,
            equal: resolve(&rules.equal)?,
        })
    }

    fn shape_for(&self, pitch: u8, default: NoteShape) -> NoteShape {
        if let Some((bound, shape)) = self.below {
            if pitch < bound {
                return shape;
            }
        }
        if let Some((bound, shape)) = self.above {
            if pitch > bound {
                return shape;
            }
        }
        if let Some((target, shape)) = self.equal {
            if pitch == target {
                return shape;
            }
        }
        default
    }
}

/// Classify a pitch sequence into note events, then apply suppression.
///
/// Threshold values in `rules` must lie inside the mapping's value range.
pub fn classify(
    items: &[PitchItem],
    rules: &ClassifyRules,
    suppression: &Suppression,
    mapping: &Mapping,
) -> Result<Vec<NoteEvent>> {
    rules.validate()?;
    let resolved = ResolvedRules::resolve(rules, mapping)?;

    let mut classified = Vec::with_capacity(items.len());
    for item in items {
        let (pitch, shape) = match *item {
            PitchItem::Divider => (rules.divider.pitch, rules.divider.shape()),
            PitchItem::Note(pitch) => (pitch, resolved.shape_for(pitch, rules.default)),
        };
        if shape.drops_note() {
            continue;
        }
        classified.push((NoteEvent::shaped(pitch, shape), item.is_divider()));
    }

    let skip_pitches = skip_pitches(&suppression.skip_values, mapping)?;
    let emitted = classified.len();
    let kept = suppress(classified, suppression.skip_duplicates, &skip_pitches);

    debug!(
        items = items.len(),
        emitted,
        kept = kept.len(),
        "classified pitch sequence"
    );
    Ok(kept)
}

/// Convert skip values to pitches on this mapping's scale.
///
/// A value outside the track's value range matches no data point of the
/// track, so it is left out.
fn skip_pitches(skip_values: &[f64], mapping: &Mapping) -> Result<Vec<u8>> {
    let mut pitches = Vec::with_capacity(skip_values.len());
    for &value in skip_values {
        if !mapping.values.contains(value) {
            debug!(value, "skip value outside track range, ignoring");
            continue;
        }
        pitches.push(mapping.pitch_of(value)?);
    }
    Ok(pitches)
}

/// Drop skip-value pitches unconditionally and, when enabled, notes that
/// repeat the last kept pitch. Dropped notes leave the last kept pitch
/// unchanged; dividers are never dropped and never become the last kept
/// pitch.
fn suppress(
    classified: Vec<(NoteEvent, bool)>,
    skip_duplicates: bool,
    skip_pitches: &[u8],
) -> Vec<NoteEvent> {
    let mut kept = Vec::with_capacity(classified.len());
    let mut last_kept: Option<u8> = None;

    for (event, is_divider) in classified {
        if is_divider {
            kept.push(event);
            continue;
        }
        if skip_pitches.contains(&event.pitch) {
            continue;
        }
        if skip_duplicates && last_kept == Some(event.pitch) {
            continue;
        }
        last_kept = Some(event.pitch);
        kept.push(event);
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::{PitchRange, ValueRange};
    use pretty_assertions::assert_eq;
    use PitchItem::{Divider, Note};

    /// Values 0..=10 onto pitches 40..=80: four semitones per unit.
    fn mapping() -> Mapping {
        Mapping {
            pitch: PitchRange::new(40, 80).unwrap(),
            values: ValueRange { min: 0.0, max: 10.0 },
        }
    }

    fn notes(pitches: &[u8]) -> Vec<PitchItem> {
        pitches.iter().map(|&p| Note(p)).collect()
    }

    fn pitches_of(events: &[NoteEvent]) -> Vec<u8> {
        events.iter().map(|e| e.pitch).collect()
    }

    #[test]
    fn default_shape_applies_without_rules() {
        let events = classify(
            &notes(&[40, 60]),
            &ClassifyRules::default(),
            &Suppression::default(),
            &mapping(),
        )
        .unwrap();
        assert_eq!(
            events,
            vec![
                NoteEvent { pitch: 40, duration: 0.25, volume: 90 },
                NoteEvent { pitch: 60, duration: 0.25, volume: 90 },
            ]
        );
    }

    #[test]
    fn below_wins_over_equal() {
        let rules = ClassifyRules {
            // below value 5 -> pitch 60, equal value 2 -> pitch 48
            below: Some(ThresholdRule::new(5.0).with_shape(1.0, 30)),
            equal: Some(ThresholdRule::new(2.0).with_shape(2.0, 120)),
            ..ClassifyRules::default()
        };
        let events = classify(&notes(&[48]), &rules, &Suppression::default(), &mapping()).unwrap();
        assert_eq!(events, vec![NoteEvent { pitch: 48, duration: 1.0, volume: 30 }]);
    }

    #[test]
    fn rules_apply_in_order() {
        let rules = ClassifyRules {
            below: Some(ThresholdRule::new(2.5).with_shape(0.5, 10)), // pitch 50
            above: Some(ThresholdRule::new(7.5).with_shape(0.75, 20)), // pitch 70
            equal: Some(ThresholdRule::new(5.0).with_shape(1.5, 30)), // pitch 60
            ..ClassifyRules::default()
        };
        let events = classify(
            &notes(&[44, 50, 60, 64, 70, 76]),
            &rules,
            &Suppression::default(),
            &mapping(),
        )
        .unwrap();
        let shapes: Vec<(f64, u8)> = events.iter().map(|e| (e.duration, e.volume)).collect();
        assert_eq!(
            shapes,
            vec![(0.5, 10), (0.25, 90), (1.5, 30), (0.25, 90), (0.25, 90), (0.75, 20)]
        );
    }

    #[test]
    fn zero_duration_rule_drops_matching_notes() {
        let rules = ClassifyRules {
            above: Some(ThresholdRule::new(5.0).with_shape(0.0, 90)),
            ..ClassifyRules::default()
        };
        let events = classify(&notes(&[44, 72, 60, 80]), &rules, &Suppression::default(), &mapping())
            .unwrap();
        assert_eq!(pitches_of(&events), vec![44, 60]);
    }

    #[test]
    fn dividers_use_divider_shape() {
        let rules = ClassifyRules {
            divider: DividerNote { pitch: 20, duration: 1.0, volume: 64 },
            ..ClassifyRules::default()
        };
        let events = classify(
            &[Note(40), Divider, Note(44)],
            &rules,
            &Suppression::default(),
            &mapping(),
        )
        .unwrap();
        assert_eq!(events[1], NoteEvent { pitch: 20, duration: 1.0, volume: 64 });
    }

    #[test]
    fn duplicates_compare_with_last_kept_pitch() {
        let suppression = Suppression {
            skip_duplicates: true,
            skip_values: vec![],
        };
        let events = classify(
            &notes(&[60, 60, 62, 60]),
            &ClassifyRules::default(),
            &suppression,
            &mapping(),
        )
        .unwrap();
        assert_eq!(pitches_of(&events), vec![60, 62, 60]);
    }

    #[test]
    fn skipped_notes_do_not_reset_duplicate_tracker() {
        // value 5 -> pitch 60
        let suppression = Suppression {
            skip_duplicates: true,
            skip_values: vec![5.0],
        };
        let events = classify(
            &notes(&[52, 60, 52, 60, 56]),
            &ClassifyRules::default(),
            &suppression,
            &mapping(),
        )
        .unwrap();
        assert_eq!(pitches_of(&events), vec![52, 56]);
    }

    #[test]
    fn dividers_survive_suppression() {
        let suppression = Suppression {
            skip_duplicates: true,
            skip_values: vec![],
        };
        let events = classify(
            &[Note(48), Divider, Note(48), Divider, Note(52)],
            &ClassifyRules::default(),
            &suppression,
            &mapping(),
        )
        .unwrap();
        assert_eq!(pitches_of(&events), vec![48, 50, 50, 52]);
    }

    #[test]
    fn skip_values_outside_range_are_ignored() {
        let suppression = Suppression {
            skip_duplicates: false,
            skip_values: vec![-3.0, 42.0],
        };
        let events = classify(
            &notes(&[40, 80]),
            &ClassifyRules::default(),
            &suppression,
            &mapping(),
        )
        .unwrap();
        assert_eq!(pitches_of(&events), vec![40, 80]);
    }

    #[test]
    fn threshold_outside_range_fails() {
        let rules = ClassifyRules {
            below: Some(ThresholdRule::new(11.0)),
            ..ClassifyRules::default()
        };
        assert!(matches!(
            classify(&notes(&[40]), &rules, &Suppression::default(), &mapping()),
            Err(Error::ValueOutOfRange { .. })
        ));
    }

    #[test]
    fn negative_duration_is_rejected() {
        let rules = ClassifyRules {
            default: NoteShape::new(-0.5, 90),
            ..ClassifyRules::default()
        };
        assert!(matches!(
            classify(&notes(&[40]), &rules, &Suppression::default(), &mapping()),
            Err(Error::InvalidNoteShape { .. })
        ));
    }
}
