//! The explicit configuration surface for a sonification run.

use crate::classify::{ClassifyRules, DividerNote, NoteShape, Suppression, ThresholdRule};
use crate::compress::Extreme;
use crate::mapping::PitchRange;
use crate::text::default_stopwords;
use crate::Result;
use serde::{Deserialize, Serialize};

/// Every recognized option, with its default.
///
/// All tracks of a run share one config; only their value ranges differ.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SonifyConfig {
    /// Lowest pitch data may map to. Default: 36
    pub min_pitch: u8,

    /// Highest pitch data may map to. Default: 96
    pub max_pitch: u8,

    /// Beats per minute for every track. Default: 120
    pub tempo: u16,

    /// Duration of ordinary notes, in beats. Default: 0.25
    pub duration: f64,

    /// Volume (velocity) of ordinary notes. Default: 90
    pub volume: u8,

    /// Notes below this data value get their own shape.
    pub below: Option<ThresholdRule>,

    /// Notes above this data value get their own shape.
    pub above: Option<ThresholdRule>,

    /// Notes equal to this data value get their own shape.
    pub equal: Option<ThresholdRule>,

    /// Insert a divider after every `interval` notes. Default: disabled
    pub interval: Option<usize>,

    /// Sound of the divider. Default: a silent half-beat rest at pitch 50
    pub divider: DividerNote,

    /// Drop notes repeating the last kept pitch. Default: false
    pub skip_duplicates: bool,

    /// Raw data values whose notes are always dropped.
    pub skip_values: Vec<f64>,

    /// Average every N consecutive rows of a matrix. 0 disables. Default: 0
    pub to_mean_group_size: usize,

    /// Collapse a matrix to its element-wise minimum row.
    pub only_min: bool,

    /// Collapse a matrix to its element-wise maximum row.
    pub only_max: bool,

    /// Words excluded from text frequency counts. `None` keeps every word.
    /// Default: [`crate::DEFAULT_STOPWORDS`]
    pub stopwords: Option<Vec<String>>,
}

impl Default for SonifyConfig {
    fn default() -> Self {
        let note = NoteShape::default();
        Self {
            min_pitch: 36,
            max_pitch: 96,
            tempo: 120,
            duration: note.duration,
            volume: note.volume,
            below: None,
            above: None,
            equal: None,
            interval: None,
            divider: DividerNote::default(),
            skip_duplicates: false,
            skip_values: Vec::new(),
            to_mean_group_size: 0,
            only_min: false,
            only_max: false,
            stopwords: Some(default_stopwords()),
        }
    }
}

impl SonifyConfig {
    pub fn pitch_range(&self) -> Result<PitchRange> {
        PitchRange::new(self.min_pitch, self.max_pitch)
    }

    pub fn rules(&self) -> ClassifyRules {
        ClassifyRules {
            default: NoteShape::new(self.duration, self.volume),
            below: self.below,
            above: self.above,
            equal: self.equal,
            divider: self.divider,
        }
    }

    pub fn suppression(&self) -> Suppression {
        Suppression {
            skip_duplicates: self.skip_duplicates,
            skip_values: self.skip_values.clone(),
        }
    }

    /// The requested matrix reduction, if any.
    pub fn reduction(&self) -> Result<Option<Extreme>> {
        Extreme::from_flags(self.only_min, self.only_max)
    }

    /// Row group size for mean compression, `None` when disabled.
    pub fn mean_group_size(&self) -> Option<usize> {
        (self.to_mean_group_size > 0).then_some(self.to_mean_group_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn defaults_are_usable() {
        let config = SonifyConfig::default();
        assert!(config.pitch_range().is_ok());
        assert_eq!(config.reduction().unwrap(), None);
        assert_eq!(config.mean_group_size(), None);
        assert_eq!(config.rules().divider.volume, 0);
        assert!(config.stopwords.as_ref().is_some_and(|s| s.contains(&"the".to_string())));
    }

    #[test]
    fn conflicting_flags_surface_on_reduction() {
        let config = SonifyConfig {
            only_min: true,
            only_max: true,
            ..SonifyConfig::default()
        };
        assert!(matches!(config.reduction(), Err(Error::ConflictingReduction)));
    }

    #[test]
    fn rules_carry_exception_shapes() {
        let config = SonifyConfig {
            duration: 0.5,
            volume: 70,
            above: Some(ThresholdRule::new(3.0).with_shape(1.0, 110)),
            ..SonifyConfig::default()
        };
        let rules = config.rules();
        assert_eq!(rules.default, NoteShape::new(0.5, 70));
        assert_eq!(rules.above.map(|r| r.volume), Some(110));
        assert!(rules.below.is_none());
    }
}
