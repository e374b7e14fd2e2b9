//! Data sonification via min-max feature mapping.
//!
//! This crate turns numeric sequences, matrices and text into timed MIDI
//! note sequences. Each value is mapped linearly onto a pitch range, optional
//! divider notes mark periodic boundaries, and exception rules change the
//! duration or volume of notes that fall below, above or on a threshold.
//!
//! # Example
//!
//! ```
//! use sonify::{sonify_row, tracks_to_midi, MidiParams, SonifyConfig};
//!
//! let config = SonifyConfig {
//!     interval: Some(4),
//!     ..SonifyConfig::default()
//! };
//!
//! let track = sonify_row(&[1.0, 3.5, 2.0, 8.0, 5.5], &config).unwrap();
//! let midi_bytes = tracks_to_midi(&[track], &MidiParams::default()).unwrap();
//! assert_eq!(&midi_bytes[0..4], b"MThd");
//! ```

pub mod classify;
pub mod compress;
pub mod config;
pub mod divider;
pub mod mapping;
pub mod midi_reader;
pub mod midi_writer;
pub mod text;
pub mod track;

pub use classify::{classify, ClassifyRules, DividerNote, NoteEvent, NoteShape, Suppression, ThresholdRule};
pub use compress::{compress_rows, reduce_to_extreme_row, Extreme};
pub use config::SonifyConfig;
pub use divider::{insert_dividers, PitchItem};
pub use mapping::{
    map_sequence, map_to_pitch, validate_pitch_range, validate_value_in_range, Mapping,
    PitchRange, ValueRange,
};
pub use midi_reader::{read_notes, read_tempos, ReadNote, TempoMark};
pub use midi_writer::{
    render_tracks, tracks_to_midi, write_midi_file, MidiParams, NoteSink, SmfWriter,
};
pub use text::{encode_by_frequency, encode_text, filter_stopwords, tokenize, DEFAULT_STOPWORDS};
pub use track::{sonify_matrix, sonify_row, sonify_text, TimedEvent, Track};

/// Errors from sonification.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid pitch range {min}..{max}: need 0 < min < max < 127")]
    InvalidPitchRange { min: u8, max: u8 },

    #[error("value {value} lies outside {min}..={max}")]
    ValueOutOfRange { value: f64, min: f64, max: f64 },

    #[error("every value equals {value}, the value range has zero width")]
    DegenerateRange { value: f64 },

    #[error("divider interval must be a positive integer, got {0}")]
    InvalidInterval(i64),

    #[error("cannot reduce to both minimum and maximum values at once")]
    ConflictingReduction,

    #[error("nothing to sonify: input is empty")]
    EmptyInput,

    #[error("value at index {index} is not finite")]
    NonFiniteValue { index: usize },

    #[error("row {row} has {found} values, expected {expected}")]
    RaggedMatrix {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("row group size must be positive")]
    InvalidGroupSize,

    #[error("invalid note shape: duration {duration}, volume {volume}")]
    InvalidNoteShape { duration: f64, volume: u8 },

    #[error("pitch {0} is not a MIDI key")]
    InvalidPitch(u8),

    #[error("program {0} is not a General MIDI program (0-127)")]
    InvalidProgram(u8),

    #[error("tempo {0} bpm cannot be expressed in MIDI")]
    InvalidTempo(u16),

    #[error("track {track} does not exist, sink has {tracks} tracks")]
    UnknownTrack { track: usize, tracks: usize },

    #[error("MIDI parse error: {0}")]
    MidiParse(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
