//! Standard MIDI file export.
//!
//! A composition is written as a format 1 (parallel) file: a conductor track with
//! the tempo, then one track chunk per composition track in the same order.
//! Note times are converted from beats at [`TICKS_PER_BEAT`]. Velocities are the
//! effective volumes the synthesizer would render at; silent notes are skipped.

use std::fs;
use std::io;
use std::path::Path;

use midly::num::{u15, u24, u28, u4, u7};
use midly::{Format, Header, MetaMessage, MidiMessage, Smf, Timing, TrackEvent, TrackEventKind};

use crate::error::CodecResult;
use crate::music::Music;
use crate::synth::{Engine, Synthesizer};
use crate::track::Track;

/// Pulses per quarter note.
pub const TICKS_PER_BEAT: u16 = 480;

/// Number of MIDI channels.
const CHANNELS: usize = 16;

const MAX_DELTA: u64 = 0x0FFF_FFFF;
const MAX_TEMPO: u32 = 0x00FF_FFFF;

/// MIDI channel a track is written on.
///
/// SoundFont and plugin tracks use their configured channel; other engines use
/// the track index modulo 16.
pub fn midi_channel(index: usize, synthesizer: &Synthesizer) -> u8 {
    let channel = match synthesizer.engine() {
        Engine::SoundFont(engine) => usize::from(engine.channel()),
        Engine::PluginHost(engine) => usize::from(engine.channel()),
        Engine::Chiptune(_) | Engine::ImpactModel(_) => index,
    };
    (channel % CHANNELS) as u8
}

/// Converts a beat position to ticks.
pub fn beats_to_ticks(beats: f32) -> u64 {
    (f64::from(beats) * f64::from(TICKS_PER_BEAT)).round() as u64
}

/// Microseconds per quarter note for a tempo.
pub fn tempo_micros(bpm: u32) -> u32 {
    (60_000_000 / bpm.max(1)).min(MAX_TEMPO)
}

/// Encodes a composition as a standard MIDI file.
pub fn encode_midi(music: &Music) -> io::Result<Vec<u8>> {
    let mut smf = Smf::new(Header::new(
        Format::Parallel,
        Timing::Metrical(u15::new(TICKS_PER_BEAT)),
    ));

    smf.tracks.push(vec![
        TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Meta(MetaMessage::Tempo(u24::new(tempo_micros(music.bpm())))),
        },
        end_of_track(),
    ]);
    for (index, track) in music.tracks().iter().enumerate() {
        smf.tracks.push(track_events(index, track));
    }

    let mut bytes = Vec::new();
    smf.write_std(&mut bytes)?;
    Ok(bytes)
}

/// Encodes a composition and writes it as a `.mid` file.
pub fn save_midi(path: impl AsRef<Path>, music: &Music) -> CodecResult<()> {
    let bytes = encode_midi(music)?;
    fs::write(path, bytes)?;
    Ok(())
}

fn track_events(index: usize, track: &Track) -> Vec<TrackEvent<'static>> {
    let synthesizer = track.synthesizer();
    let channel = u4::new(midi_channel(index, synthesizer));

    // (tick, off before on, message)
    let mut timed: Vec<(u64, u8, MidiMessage)> = Vec::new();
    for note in track.notes() {
        let Some(pitch) = note.pitch() else {
            continue;
        };
        let key = u7::new(pitch);
        let vel = u7::new(synthesizer.settings().effective_volume(note.volume()));
        let start = beats_to_ticks(note.start());
        let end = beats_to_ticks(note.end()).max(start + 1);
        timed.push((start, 1, MidiMessage::NoteOn { key, vel }));
        timed.push((end, 0, MidiMessage::NoteOff { key, vel }));
    }
    timed.sort_by_key(|&(tick, order, _)| (tick, order));

    let mut events = vec![TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::TrackName(synthesizer.kind().name().as_bytes())),
    }];
    let mut last = 0;
    for (tick, _, message) in timed {
        events.push(TrackEvent {
            delta: u28::new((tick - last).min(MAX_DELTA) as u32),
            kind: TrackEventKind::Midi { channel, message },
        });
        last = tick;
    }
    events.push(end_of_track());
    events
}

fn end_of_track() -> TrackEvent<'static> {
    TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::note::Note;
    use crate::synth::{PluginHost, SoundFont, SynthSettings, SynthesizerKind};
    use crate::Beat;
    use pretty_assertions::assert_eq;

    /// (absolute tick, channel, key, velocity, is note-on) for every channel event.
    fn note_events(smf: &Smf, track: usize) -> Vec<(u64, u8, u8, u8, bool)> {
        let mut tick = 0;
        let mut out = Vec::new();
        for event in &smf.tracks[track] {
            tick += u64::from(event.delta.as_int());
            if let TrackEventKind::Midi { channel, message } = event.kind {
                match message {
                    MidiMessage::NoteOn { key, vel } => {
                        out.push((tick, channel.as_int(), key.as_int(), vel.as_int(), true))
                    }
                    MidiMessage::NoteOff { key, vel } => {
                        out.push((tick, channel.as_int(), key.as_int(), vel.as_int(), false))
                    }
                    _ => {}
                }
            }
        }
        out
    }

    #[test]
    fn test_conversions() {
        assert_eq!(beats_to_ticks(1.0), 480);
        assert_eq!(beats_to_ticks(0.125), 60);
        assert_eq!(tempo_micros(120), 500_000);
        assert_eq!(tempo_micros(1), MAX_TEMPO);
    }

    #[test]
    fn test_channels() {
        let chiptune = Synthesizer::new(SynthesizerKind::Chiptune);
        assert_eq!(midi_channel(3, &chiptune), 3);
        assert_eq!(midi_channel(17, &chiptune), 1);

        let soundfont =
            Synthesizer::with_engine(Engine::SoundFont(SoundFont::new("a.sf2", 9, 0, 0).unwrap()));
        assert_eq!(midi_channel(0, &soundfont), 9);

        let plugin = Synthesizer::with_engine(Engine::PluginHost(
            PluginHost::new("p.vst", 20, 512, vec![]).unwrap(),
        ));
        assert_eq!(midi_channel(0, &plugin), 4);
    }

    #[test]
    fn test_encode_midi() {
        let settings = SynthSettings::new(Beat::One, 127, false, 127).unwrap();
        let mut music = Music::new(120).unwrap();
        music.push_track(Track::with_notes(
            Synthesizer::new(SynthesizerKind::Chiptune).with_settings(settings),
            vec![
                Note::new(Some(64), 1.0, 1.0, 90).unwrap(),
                Note::new(Some(60), 0.0, 1.0, 100).unwrap(),
                Note::silence(2.0, 1.0).unwrap(),
            ],
        ));
        music.push_track(Track::new(Synthesizer::new(SynthesizerKind::ImpactModel)));

        let bytes = encode_midi(&music).unwrap();
        let smf = Smf::parse(&bytes).unwrap();
        assert_eq!(smf.header.format, Format::Parallel);
        assert_eq!(smf.header.timing, Timing::Metrical(u15::new(TICKS_PER_BEAT)));
        assert_eq!(smf.tracks.len(), 3);
        assert!(smf.tracks[0].iter().any(|event| matches!(
            event.kind,
            TrackEventKind::Meta(MetaMessage::Tempo(t)) if t.as_int() == 500_000
        )));

        // Sorted by time; the note-off at 480 precedes the note-on at 480.
        assert_eq!(
            note_events(&smf, 1),
            vec![
                (0, 0, 60, 100, true),
                (480, 0, 60, 100, false),
                (480, 0, 64, 90, true),
                (960, 0, 64, 90, false),
            ]
        );
        assert!(note_events(&smf, 2).is_empty());
        assert!(matches!(
            smf.tracks[2][0].kind,
            TrackEventKind::Meta(MetaMessage::TrackName(b"impact_model"))
        ));
    }

    #[test]
    fn test_velocity_uses_fixed_volume_and_gain() {
        let settings = SynthSettings::new(Beat::One, 64, true, 100).unwrap();
        let mut music = Music::new(60).unwrap();
        music.push_track(Track::with_notes(
            Synthesizer::new(SynthesizerKind::Chiptune).with_settings(settings),
            vec![Note::new(Some(72), 0.0, 0.5, 10).unwrap()],
        ));

        let bytes = encode_midi(&music).unwrap();
        let smf = Smf::parse(&bytes).unwrap();
        let events = note_events(&smf, 1);
        assert_eq!(events[0], (0, 0, 72, 50, true));
        assert_eq!(events[1].0, 240);
    }

    #[test]
    fn test_save_midi() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("song.mid");
        save_midi(&path, &Music::default()).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..4], b"MThd");
        assert_eq!(Smf::parse(&bytes).unwrap().tracks.len(), 1);
    }
}
