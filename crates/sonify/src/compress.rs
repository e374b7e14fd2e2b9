//! Row compression for matrices with more rows than is comfortable to hear
//! as simultaneous tracks.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Which element-wise extreme to keep when collapsing a matrix to one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Extreme {
    Min,
    Max,
}

impl Extreme {
    /// Translate the `only_min` / `only_max` switches.
    pub fn from_flags(only_min: bool, only_max: bool) -> Result<Option<Self>> {
        match (only_min, only_max) {
            (true, true) => Err(Error::ConflictingReduction),
            (true, false) => Ok(Some(Extreme::Min)),
            (false, true) => Ok(Some(Extreme::Max)),
            (false, false) => Ok(None),
        }
    }
}

/// Check that every row has the width of the first. Returns that width.
pub fn validate_matrix(matrix: &[Vec<f64>]) -> Result<usize> {
    let expected = matrix.first().map(Vec::len).unwrap_or(0);
    for (row, values) in matrix.iter().enumerate() {
        if values.len() != expected {
            return Err(Error::RaggedMatrix {
                row,
                expected,
                found: values.len(),
            });
        }
    }
    Ok(expected)
}

/// Replace each run of `group_size` consecutive rows with their mean.
///
/// Produces `ceil(rows / group_size)` rows. The last group averages over
/// however many rows remain.
pub fn compress_rows(matrix: &[Vec<f64>], group_size: usize) -> Result<Vec<Vec<f64>>> {
    if group_size == 0 {
        return Err(Error::InvalidGroupSize);
    }
    let width = validate_matrix(matrix)?;

    let compressed = matrix
        .chunks(group_size)
        .map(|group| {
            let mut sums = vec![0.0; width];
            for row in group {
                for (sum, value) in sums.iter_mut().zip(row) {
                    *sum += value;
                }
            }
            let count = group.len() as f64;
            sums.into_iter().map(|s| s / count).collect()
        })
        .collect();
    Ok(compressed)
}

/// Collapse all rows into one by taking the element-wise min or max.
pub fn reduce_to_extreme_row(matrix: &[Vec<f64>], extreme: Extreme) -> Result<Vec<f64>> {
    validate_matrix(matrix)?;
    let (first, rest) = matrix.split_first().ok_or(Error::EmptyInput)?;

    let mut reduced = first.clone();
    for row in rest {
        for (acc, &value) in reduced.iter_mut().zip(row) {
            *acc = match extreme {
                Extreme::Min => acc.min(value),
                Extreme::Max => acc.max(value),
            };
        }
    }
    Ok(reduced)
}
