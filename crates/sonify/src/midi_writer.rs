//! MIDI output for sonified tracks.
//!
//! [`NoteSink`] is the seam between sequencing and serialization: a sink is
//! told the tempo of each track and then receives notes with absolute start
//! times in beats. [`SmfWriter`] implements it and produces a Standard MIDI
//! File, format 1, one `MTrk` chunk per track.

use std::path::Path;

use tracing::info;

use crate::track::{TimedEvent, Track};
use crate::{Error, Result};

/// Slowest tempo whose microseconds-per-beat fits the 24-bit tempo field.
const MIN_TEMPO_BPM: u16 = 4;

/// Parameters for MIDI generation
#[derive(Debug, Clone)]
pub struct MidiParams {
    /// Ticks per quarter note (typically 480)
    pub ticks_per_beat: u16,
    /// General MIDI program for every track, if any
    pub program: Option<u8>,
}

impl Default for MidiParams {
    fn default() -> Self {
        MidiParams {
            ticks_per_beat: 480,
            program: None,
        }
    }
}

/// Receiver of sequenced notes.
pub trait NoteSink {
    /// Set the tempo of `track` from beat `time` on.
    fn add_tempo(&mut self, track: usize, time: f64, bpm: u16) -> Result<()>;

    /// Add one note. A volume of 0 is a rest: it occupies time but sounds
    /// nothing.
    fn add_note(&mut self, event: &TimedEvent) -> Result<()>;
}

/// Check that `bpm` can be written as a MIDI tempo.
pub fn validate_tempo(bpm: u16) -> Result<()> {
    if bpm < MIN_TEMPO_BPM {
        return Err(Error::InvalidTempo(bpm));
    }
    Ok(())
}

/// Feed every track to a sink. Track `i` of the slice becomes sink track `i`.
pub fn render_tracks<S: NoteSink + ?Sized>(tracks: &[Track], sink: &mut S) -> Result<()> {
    for (index, track) in tracks.iter().enumerate() {
        sink.add_tempo(index, track.start, track.tempo_bpm)?;
        for event in track.timed_events() {
            sink.add_note(&TimedEvent {
                track: index,
                ..event
            })?;
        }
    }
    Ok(())
}

/// Serialize tracks to SMF bytes.
pub fn tracks_to_midi(tracks: &[Track], params: &MidiParams) -> Result<Vec<u8>> {
    if tracks.is_empty() {
        return Err(Error::EmptyInput);
    }
    let mut writer = SmfWriter::new(tracks.len(), params.clone())?;
    render_tracks(tracks, &mut writer)?;
    Ok(writer.finish())
}

/// Serialize tracks and write them to `path`, replacing any existing file.
///
/// The whole file is encoded in memory first; the path is not touched when
/// encoding fails.
pub fn write_midi_file(tracks: &[Track], path: &Path, params: &MidiParams) -> Result<()> {
    let bytes = tracks_to_midi(tracks, params)?;
    std::fs::write(path, &bytes)?;
    info!(
        path = %path.display(),
        tracks = tracks.len(),
        bytes = bytes.len(),
        "wrote MIDI file"
    );
    Ok(())
}

/// Ordering of events that share a tick: tempo and program first, then
/// note-offs before note-ons so back-to-back notes do not overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum EventOrder {
    Tempo,
    Program,
    NoteOff,
    NoteOn,
}

struct MidiEvent {
    tick: u32,
    order: EventOrder,
    data: Vec<u8>,
}

/// In-memory SMF format 1 writer.
pub struct SmfWriter {
    params: MidiParams,
    tracks: Vec<Vec<MidiEvent>>,
}

impl SmfWriter {
    /// Fails if `params.program` is not a General MIDI program number.
    pub fn new(num_tracks: usize, params: MidiParams) -> Result<Self> {
        if let Some(program) = params.program {
            if program > 0x7F {
                return Err(Error::InvalidProgram(program));
            }
        }
        let mut tracks = Vec::with_capacity(num_tracks);
        for _ in 0..num_tracks {
            let mut events = Vec::new();
            if let Some(program) = params.program {
                events.push(MidiEvent {
                    tick: 0,
                    order: EventOrder::Program,
                    data: vec![0xC0, program],
                });
            }
            tracks.push(events);
        }
        Ok(SmfWriter { params, tracks })
    }

    pub fn num_tracks(&self) -> usize {
        self.tracks.len()
    }

    fn ticks(&self, beats: f64) -> u32 {
        (beats * self.params.ticks_per_beat as f64).round() as u32
    }

    fn track_mut(&mut self, track: usize) -> Result<&mut Vec<MidiEvent>> {
        let tracks = self.num_tracks();
        self.tracks
            .get_mut(track)
            .ok_or(Error::UnknownTrack { track, tracks })
    }

    /// Encode all tracks into a complete MIDI file.
    pub fn finish(mut self) -> Vec<u8> {
        let ticks_per_beat = self.params.ticks_per_beat;
        let chunks: Vec<Vec<u8>> = self
            .tracks
            .iter_mut()
            .map(|events| {
                events.sort_by_key(|e| (e.tick, e.order));
                encode_track(events)
            })
            .collect();

        let mut out = Vec::new();

        // Header chunk: MThd
        out.extend_from_slice(b"MThd");
        out.extend_from_slice(&6u32.to_be_bytes());
        out.extend_from_slice(&1u16.to_be_bytes()); // format 1
        out.extend_from_slice(&(chunks.len() as u16).to_be_bytes());
        out.extend_from_slice(&ticks_per_beat.to_be_bytes());

        // Track chunks: MTrk
        for chunk in chunks {
            out.extend_from_slice(b"MTrk");
            out.extend_from_slice(&(chunk.len() as u32).to_be_bytes());
            out.extend(chunk);
        }

        out
    }
}

impl NoteSink for SmfWriter {
    fn add_tempo(&mut self, track: usize, time: f64, bpm: u16) -> Result<()> {
        validate_tempo(bpm)?;
        let tick = self.ticks(time);
        let us_per_beat = 60_000_000u32 / bpm as u32;
        self.track_mut(track)?.push(MidiEvent {
            tick,
            order: EventOrder::Tempo,
            data: vec![
                0xFF,
                0x51,
                0x03,
                ((us_per_beat >> 16) & 0xFF) as u8,
                ((us_per_beat >> 8) & 0xFF) as u8,
                (us_per_beat & 0xFF) as u8,
            ],
        });
        Ok(())
    }

    fn add_note(&mut self, event: &TimedEvent) -> Result<()> {
        if event.pitch > 0x7F {
            return Err(Error::InvalidPitch(event.pitch));
        }
        let onset = self.ticks(event.start);
        let offset = self.ticks(event.start + event.duration);
        let events = self.track_mut(event.track)?;

        // Rests and notes too short to span a tick only advance time, which
        // the caller already accounts for in later start times.
        if event.volume == 0 || offset <= onset {
            return Ok(());
        }

        let channel = event.channel & 0x0F;
        events.push(MidiEvent {
            tick: onset,
            order: EventOrder::NoteOn,
            data: vec![0x90 | channel, event.pitch, event.volume & 0x7F],
        });
        events.push(MidiEvent {
            tick: offset,
            order: EventOrder::NoteOff,
            data: vec![0x80 | channel, event.pitch, 0],
        });
        Ok(())
    }
}

fn encode_track(events: &[MidiEvent]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut last_tick = 0u32;

    for event in events {
        let delta = event.tick.saturating_sub(last_tick);
        out.extend(encode_variable_length(delta));
        out.extend(&event.data);
        last_tick = event.tick;
    }

    // End of track
    out.extend(&[0x00, 0xFF, 0x2F, 0x00]);
    out
}

/// Encode a value as MIDI variable-length quantity
fn encode_variable_length(mut value: u32) -> Vec<u8> {
    let mut bytes = vec![(value & 0x7F) as u8];
    value >>= 7;
    while value > 0 {
        bytes.push((value & 0x7F) as u8 | 0x80);
        value >>= 7;
    }
    bytes.reverse();
    bytes
}
