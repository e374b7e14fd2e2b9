//! Reading notes back out of a Standard MIDI File.

use std::collections::HashMap;

use midly::{MetaMessage, MidiMessage, Smf, Timing, TrackEventKind};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// A note recovered from a MIDI file, timed in beats.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReadNote {
    pub track: usize,
    pub channel: u8,
    pub pitch: u8,
    pub start: f64,
    pub duration: f64,
    pub volume: u8,
}

/// A tempo meta event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TempoMark {
    pub track: usize,
    pub start: f64,
    pub bpm: f64,
}

fn parse(bytes: &[u8]) -> Result<(Smf<'_>, f64)> {
    let smf = Smf::parse(bytes).map_err(|e| Error::MidiParse(e.to_string()))?;
    let ppq = match smf.header.timing {
        Timing::Metrical(ticks) => ticks.as_int(),
        Timing::Timecode(_, _) => {
            return Err(Error::MidiParse("timecode timing is not supported".into()));
        }
    };
    Ok((smf, f64::from(ppq)))
}

/// Extract all notes, pairing note-on with the next note-off on the same
/// channel and key. Sorted by track, then start.
pub fn read_notes(bytes: &[u8]) -> Result<Vec<ReadNote>> {
    let (smf, ppq) = parse(bytes)?;
    let mut notes = Vec::new();

    for (track_index, track) in smf.tracks.iter().enumerate() {
        let mut current_tick: u64 = 0;
        // (channel, pitch) -> stack of (onset_tick, velocity)
        let mut pending: HashMap<(u8, u8), Vec<(u64, u8)>> = HashMap::new();

        for event in track {
            current_tick += u64::from(event.delta.as_int());

            if let TrackEventKind::Midi { channel, message } = event.kind {
                let ch = channel.as_int();
                match message {
                    MidiMessage::NoteOn { key, vel } if vel.as_int() > 0 => {
                        pending
                            .entry((ch, key.as_int()))
                            .or_default()
                            .push((current_tick, vel.as_int()));
                    }
                    MidiMessage::NoteOff { key, .. } | MidiMessage::NoteOn { key, .. } => {
                        // vel=0 NoteOn is NoteOff
                        let key = (ch, key.as_int());
                        if let Some((onset, velocity)) =
                            pending.get_mut(&key).and_then(|stack| stack.pop())
                        {
                            notes.push(ReadNote {
                                track: track_index,
                                channel: ch,
                                pitch: key.1,
                                start: onset as f64 / ppq,
                                duration: (current_tick - onset) as f64 / ppq,
                                volume: velocity,
                            });
                        }
                    }
                    _ => {}
                }
            }
        }

        // Close any unclosed notes at the track's final tick
        for ((ch, pitch), stack) in pending {
            for (onset, velocity) in stack {
                notes.push(ReadNote {
                    track: track_index,
                    channel: ch,
                    pitch,
                    start: onset as f64 / ppq,
                    duration: (current_tick - onset) as f64 / ppq,
                    volume: velocity,
                });
            }
        }
    }

    notes.sort_by(|a, b| {
        a.track
            .cmp(&b.track)
            .then_with(|| a.start.total_cmp(&b.start))
            .then_with(|| a.pitch.cmp(&b.pitch))
    });
    Ok(notes)
}

/// Extract every tempo meta event.
pub fn read_tempos(bytes: &[u8]) -> Result<Vec<TempoMark>> {
    let (smf, ppq) = parse(bytes)?;
    let mut tempos = Vec::new();

    for (track_index, track) in smf.tracks.iter().enumerate() {
        let mut current_tick: u64 = 0;
        for event in track {
            current_tick += u64::from(event.delta.as_int());
            if let TrackEventKind::Meta(MetaMessage::Tempo(tempo)) = event.kind {
                tempos.push(TempoMark {
                    track: track_index,
                    start: current_tick as f64 / ppq,
                    bpm: 60_000_000.0 / f64::from(tempo.as_int()),
                });
            }
        }
    }
    Ok(tempos)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn garbage_is_a_parse_error() {
        assert!(matches!(
            read_notes(b"not a midi file"),
            Err(Error::MidiParse(_))
        ));
    }

    #[test]
    fn reads_hand_built_file() {
        // Format 0, 96 ppq, one note C4 for one beat
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"MThd");
        bytes.extend_from_slice(&6u32.to_be_bytes());
        bytes.extend_from_slice(&0u16.to_be_bytes());
        bytes.extend_from_slice(&1u16.to_be_bytes());
        bytes.extend_from_slice(&96u16.to_be_bytes());
        let track = [
            0x00, 0x90, 60, 100, // note on
            0x60, 0x80, 60, 0, // note off after 96 ticks
            0x00, 0xFF, 0x2F, 0x00,
        ];
        bytes.extend_from_slice(b"MTrk");
        bytes.extend_from_slice(&(track.len() as u32).to_be_bytes());
        bytes.extend_from_slice(&track);

        let notes = read_notes(&bytes).unwrap();
        assert_eq!(
            notes,
            vec![ReadNote {
                track: 0,
                channel: 0,
                pitch: 60,
                start: 0.0,
                duration: 1.0,
                volume: 100,
            }]
        );
        assert!(read_tempos(&bytes).unwrap().is_empty());
    }
}
