//! Min-max feature mapping from data values onto MIDI pitches.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Highest pitch a range may reach (exclusive).
const PITCH_CEILING: u8 = 127;

/// Check that `0 < min < max < 127`.
///
/// Both ends are strict: 0 and 127 are rejected even though they are valid
/// MIDI keys.
pub fn validate_pitch_range(min: u8, max: u8) -> Result<()> {
    if min == 0 || min >= max || max >= PITCH_CEILING {
        return Err(Error::InvalidPitchRange { min, max });
    }
    Ok(())
}

/// Check that `min <= value <= max`.
pub fn validate_value_in_range(value: f64, min: f64, max: f64) -> Result<()> {
    if !(min <= value && value <= max) {
        return Err(Error::ValueOutOfRange { value, min, max });
    }
    Ok(())
}

/// Map one value onto the pitch range.
///
/// `pitch = (max_pitch - min_pitch) * (value - min_val) / (max_val - min_val) + min_pitch`,
/// truncated toward zero. `max_val` itself always maps to `max_pitch`. Fails
/// when the pitch range is invalid, the value lies outside `min_val..=max_val`,
/// or the value range has zero width.
pub fn map_to_pitch(value: f64, min_pitch: u8, max_pitch: u8, min_val: f64, max_val: f64) -> Result<u8> {
    validate_pitch_range(min_pitch, max_pitch)?;
    validate_value_in_range(value, min_val, max_val)?;
    if max_val == min_val {
        return Err(Error::DegenerateRange { value: min_val });
    }
    // span * d / d may land one ulp short of span and truncate a step low
    if value == max_val {
        return Ok(max_pitch);
    }

    let span = f64::from(max_pitch - min_pitch);
    let scaled = span * (value - min_val) / (max_val - min_val) + f64::from(min_pitch);
    Ok(scaled as u8)
}

/// Map a whole sequence, using its own minimum and maximum as the value range.
pub fn map_sequence(values: &[f64], pitch: PitchRange) -> Result<Vec<u8>> {
    Mapping::for_values(values, pitch)?.map_all(values)
}

/// A validated pitch interval `min < max`, both strictly inside `0..127`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PitchRange {
    min: u8,
    max: u8,
}

impl PitchRange {
    pub fn new(min: u8, max: u8) -> Result<Self> {
        validate_pitch_range(min, max)?;
        Ok(Self { min, max })
    }

    pub fn min(&self) -> u8 {
        self.min
    }

    pub fn max(&self) -> u8 {
        self.max
    }

    pub fn contains(&self, pitch: u8) -> bool {
        (self.min..=self.max).contains(&pitch)
    }
}

/// Observed minimum and maximum of a value sequence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
}

impl ValueRange {
    /// Compute the range of `values`.
    ///
    /// Fails on an empty sequence or any NaN/infinite entry.
    pub fn of(values: &[f64]) -> Result<Self> {
        let first = *values.first().ok_or(Error::EmptyInput)?;

        let mut range = Self {
            min: first,
            max: first,
        };
        for (index, &value) in values.iter().enumerate() {
            if !value.is_finite() {
                return Err(Error::NonFiniteValue { index });
            }
            range.min = range.min.min(value);
            range.max = range.max.max(value);
        }
        Ok(range)
    }

    pub fn is_degenerate(&self) -> bool {
        self.min == self.max
    }

    pub fn contains(&self, value: f64) -> bool {
        self.min <= value && value <= self.max
    }
}

/// The pitch range and value range used for one track.
///
/// Every conversion for the track (data points, thresholds, skip values)
/// goes through the same mapping so they land on the same scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mapping {
    pub pitch: PitchRange,
    pub values: ValueRange,
}

impl Mapping {
    /// Build the mapping for a sequence from its own extremes.
    pub fn for_values(values: &[f64], pitch: PitchRange) -> Result<Self> {
        let range = ValueRange::of(values)?;
        if range.is_degenerate() {
            return Err(Error::DegenerateRange { value: range.min });
        }
        Ok(Self {
            pitch,
            values: range,
        })
    }

    /// Pitch for a single value on this mapping's scale.
    pub fn pitch_of(&self, value: f64) -> Result<u8> {
        map_to_pitch(
            value,
            self.pitch.min,
            self.pitch.max,
            self.values.min,
            self.values.max,
        )
    }

    pub fn map_all(&self, values: &[f64]) -> Result<Vec<u8>> {
        values.iter().map(|&v| self.pitch_of(v)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn range(min: u8, max: u8) -> PitchRange {
        PitchRange::new(min, max).unwrap()
    }

    #[test]
    fn pitch_range_bounds_are_strict() {
        assert!(validate_pitch_range(1, 126).is_ok());
        assert!(matches!(
            validate_pitch_range(0, 100),
            Err(Error::InvalidPitchRange { min: 0, max: 100 })
        ));
        assert!(validate_pitch_range(10, 127).is_err());
        assert!(validate_pitch_range(60, 60).is_err());
        assert!(validate_pitch_range(70, 60).is_err());
    }

    #[test]
    fn value_range_check_is_inclusive() {
        assert!(validate_value_in_range(1.0, 1.0, 2.0).is_ok());
        assert!(validate_value_in_range(2.0, 1.0, 2.0).is_ok());
        assert!(matches!(
            validate_value_in_range(2.5, 1.0, 2.0),
            Err(Error::ValueOutOfRange { .. })
        ));
        assert!(validate_value_in_range(f64::NAN, 1.0, 2.0).is_err());
    }

    #[test]
    fn extremes_map_to_pitch_bounds() {
        assert_eq!(map_to_pitch(-3.5, 40, 80, -3.5, 12.25).unwrap(), 40);
        assert_eq!(map_to_pitch(12.25, 40, 80, -3.5, 12.25).unwrap(), 80);
    }

    #[test]
    fn non_integer_maximum_reaches_top_pitch() {
        assert_eq!(map_to_pitch(146.48, 25, 117, 90.6, 146.48).unwrap(), 117);
        assert_eq!(
            map_sequence(&[90.6, 100.0, 146.48], range(25, 117)).unwrap(),
            vec![25, 40, 117]
        );
    }

    #[test]
    fn mapped_pitches_stay_inside_range() {
        let pitch = range(33, 101);
        let values = [0.1, 0.7, 0.35, 1.9, 0.3];
        for p in map_sequence(&values, pitch).unwrap() {
            assert!(pitch.contains(p), "{} outside {:?}", p, pitch);
        }
        assert!(!pitch.contains(32) && !pitch.contains(102));
    }

    #[test]
    fn mapping_truncates_instead_of_rounding() {
        // 40 * 0.99 + 20 = 59.6
        assert_eq!(map_to_pitch(0.99, 20, 60, 0.0, 1.0).unwrap(), 59);
        // 40 * 0.5 + 20 = 40.0
        assert_eq!(map_to_pitch(0.5, 20, 60, 0.0, 1.0).unwrap(), 40);
    }

    #[test]
    fn degenerate_sequence_is_rejected() {
        let err = map_sequence(&[5.0, 5.0, 5.0], range(30, 90)).unwrap_err();
        assert!(matches!(err, Error::DegenerateRange { value } if value == 5.0));
    }

    #[test]
    fn degenerate_range_is_rejected_for_single_value() {
        assert!(matches!(
            map_to_pitch(3.0, 30, 90, 3.0, 3.0),
            Err(Error::DegenerateRange { .. })
        ));
    }

    #[test]
    fn sequence_is_monotonic() {
        let values = [0.3, -1.0, 7.5, 2.2, 2.2, 9.0, 4.4, -0.5];
        let pitches = map_sequence(&values, range(21, 108)).unwrap();

        let mut pairs: Vec<(f64, u8)> = values.iter().copied().zip(pitches).collect();
        pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
        for w in pairs.windows(2) {
            assert!(w[0].1 <= w[1].1, "{:?} then {:?}", w[0], w[1]);
        }
        assert_eq!(pairs.first().unwrap().1, 21);
        assert_eq!(pairs.last().unwrap().1, 108);
    }

    #[test]
    fn empty_and_non_finite_sequences_fail() {
        assert!(matches!(
            map_sequence(&[], range(30, 90)),
            Err(Error::EmptyInput)
        ));
        assert!(matches!(
            map_sequence(&[1.0, f64::INFINITY], range(30, 90)),
            Err(Error::NonFiniteValue { index: 1 })
        ));
    }

    #[test]
    fn integer_data_maps_like_floats() {
        let data: Vec<f64> = [1, 2, 3, 4, 5].iter().map(|&v: &i32| v as f64).collect();
        assert_eq!(
            map_sequence(&data, range(60, 64)).unwrap(),
            vec![60, 61, 62, 63, 64]
        );
    }
}
