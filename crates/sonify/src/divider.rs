//! Periodic divider markers.
//!
//! Long or periodic data (monthly readings over several years, say) is easier
//! to follow with a separator sound every `interval` notes.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// One slot of a pitch sequence: a data pitch or a divider marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PitchItem {
    Note(u8),
    Divider,
}

impl PitchItem {
    pub fn is_divider(&self) -> bool {
        matches!(self, PitchItem::Divider)
    }
}

/// Insert a divider after every `interval`-th pitch.
///
/// A divider follows index `i` whenever `i % interval == interval - 1`, so a
/// trailing partial group gets none.
pub fn insert_dividers(pitches: &[u8], interval: usize) -> Result<Vec<PitchItem>> {
    if interval == 0 {
        return Err(Error::InvalidInterval(0));
    }

    let mut items = Vec::with_capacity(pitches.len() + pitches.len() / interval);
    for (i, &pitch) in pitches.iter().enumerate() {
        items.push(PitchItem::Note(pitch));
        if i % interval == interval - 1 {
            items.push(PitchItem::Divider);
        }
    }
    Ok(items)
}

/// Wrap pitches as items, inserting dividers only when an interval is set.
pub fn with_optional_dividers(pitches: &[u8], interval: Option<usize>) -> Result<Vec<PitchItem>> {
    match interval {
        Some(interval) => insert_dividers(pitches, interval),
        None => Ok(pitches.iter().map(|&p| PitchItem::Note(p)).collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use PitchItem::{Divider, Note};

    #[test]
    fn dividers_follow_each_full_group() {
        assert_eq!(
            insert_dividers(&[1, 2, 3, 4, 5], 2).unwrap(),
            vec![Note(1), Note(2), Divider, Note(3), Note(4), Divider, Note(5)]
        );
    }

    #[test]
    fn divider_count_matches_full_groups() {
        let items = insert_dividers(&[9, 8, 7, 6, 5, 4, 3], 3).unwrap();
        assert_eq!(items.iter().filter(|item| item.is_divider()).count(), 2);
        assert!(!Note(9).is_divider());
    }

    #[test]
    fn exact_multiple_ends_with_divider() {
        assert_eq!(
            insert_dividers(&[10, 20, 30], 3).unwrap(),
            vec![Note(10), Note(20), Note(30), Divider]
        );
    }

    #[test]
    fn interval_of_one_separates_every_note() {
        assert_eq!(
            insert_dividers(&[7, 8], 1).unwrap(),
            vec![Note(7), Divider, Note(8), Divider]
        );
    }

    #[test]
    fn zero_interval_is_rejected() {
        assert!(matches!(
            insert_dividers(&[1, 2], 0),
            Err(Error::InvalidInterval(0))
        ));
    }

    #[test]
    fn unset_interval_inserts_nothing() {
        assert_eq!(
            with_optional_dividers(&[1, 2, 3], None).unwrap(),
            vec![Note(1), Note(2), Note(3)]
        );
    }
}
