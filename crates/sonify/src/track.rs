//! Driving rows of data through the pipeline into tracks.
//!
//! Per row: feature mapping, optional dividers, classification. A matrix
//! may first be mean-compressed and then collapsed to its min or max row.
//! Each row computes its own value range, so every track has its own scale.

use crate::classify::{classify, NoteEvent};
use crate::compress::{compress_rows, reduce_to_extreme_row, validate_matrix};
use crate::config::SonifyConfig;
use crate::divider::with_optional_dividers;
use crate::mapping::Mapping;
use crate::midi_writer::validate_tempo;
use crate::text::encode_text;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// MIDI channel used for every note.
pub const CHANNEL: u8 = 0;

/// A sequenced track: notes play back to back from `start`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub index: usize,
    pub tempo_bpm: u16,
    /// Starting beat. Always 0: every track begins together.
    pub start: f64,
    pub notes: Vec<NoteEvent>,
}

/// A note with its absolute placement, as handed to a MIDI sink.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimedEvent {
    pub track: usize,
    pub channel: u8,
    pub pitch: u8,
    pub start: f64,
    pub duration: f64,
    pub volume: u8,
}

impl Track {
    /// Notes with start times accumulated from the track start.
    pub fn timed_events(&self) -> Vec<TimedEvent> {
        let mut time = self.start;
        self.notes
            .iter()
            .map(|note| {
                let event = TimedEvent {
                    track: self.index,
                    channel: CHANNEL,
                    pitch: note.pitch,
                    start: time,
                    duration: note.duration,
                    volume: note.volume,
                };
                time += note.duration;
                event
            })
            .collect()
    }

    /// Length of the track in beats.
    pub fn total_beats(&self) -> f64 {
        self.notes.iter().map(|n| n.duration).sum()
    }
}

/// Sonify one sequence of values into a single track.
pub fn sonify_row(values: &[f64], config: &SonifyConfig) -> Result<Track> {
    build_track(0, values, config)
}

/// Sonify a matrix, one track per (possibly compressed) row.
///
/// Mean compression runs first, then min/max reduction. A single remaining
/// row yields a single track.
pub fn sonify_matrix(matrix: &[Vec<f64>], config: &SonifyConfig) -> Result<Vec<Track>> {
    let reduction = config.reduction()?;
    validate_matrix(matrix)?;

    let mut rows = match config.mean_group_size() {
        Some(size) => compress_rows(matrix, size)?,
        None => matrix.to_vec(),
    };
    if let Some(extreme) = reduction {
        if !rows.is_empty() {
            rows = vec![reduce_to_extreme_row(&rows, extreme)?];
        }
    }

    debug!(
        input_rows = matrix.len(),
        tracks = rows.len(),
        ?reduction,
        "prepared matrix rows"
    );

    match rows.as_slice() {
        [] => Err(Error::EmptyInput),
        [row] => Ok(vec![build_track(0, row, config)?]),
        rows => rows
            .iter()
            .enumerate()
            .map(|(index, row)| build_track(index, row, config))
            .collect(),
    }
}

/// Frequency-encode text and sonify it as a single track.
pub fn sonify_text(text: &str, config: &SonifyConfig) -> Result<Track> {
    let values = encode_text(text, config.stopwords.as_deref());
    debug!(tokens = values.len(), "encoded text by word frequency");
    sonify_row(&values, config)
}

fn build_track(index: usize, values: &[f64], config: &SonifyConfig) -> Result<Track> {
    validate_tempo(config.tempo)?;
    let mapping = Mapping::for_values(values, config.pitch_range()?)?;
    let pitches = mapping.map_all(values)?;
    let items = with_optional_dividers(&pitches, config.interval)?;
    let notes = classify(&items, &config.rules(), &config.suppression(), &mapping)?;

    debug!(
        track = index,
        min_value = mapping.values.min,
        max_value = mapping.values.max,
        values = values.len(),
        notes = notes.len(),
        "built track"
    );

    Ok(Track {
        index,
        tempo_bpm: config.tempo,
        start: 0.0,
        notes,
    })
}
