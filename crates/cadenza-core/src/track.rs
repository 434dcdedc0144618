//! Tracks and the per-track compositor.

use log::trace;
use serde::{Deserialize, Serialize};

use crate::constants::{beats_to_seconds, seconds_to_frames};
use crate::note::Note;
use crate::pcm::PcmBuffer;
use crate::synth::{Backends, Synthesizer};

/// How a rendered note was placed on the accumulated track audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// The note produced no audio.
    Skipped,
    /// Concatenated at the current end, ignoring any gap before its start.
    Appended,
    /// Mixed entirely inside the existing audio.
    Overlaid,
    /// Mixed into the tail of the existing audio, remainder appended.
    Extended,
}

/// An ordered list of notes played by one synthesizer.
///
/// Notes are kept in insertion order and rendered in that order; they are never
/// sorted by start time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    synthesizer: Synthesizer,
    #[serde(default)]
    notes: Vec<Note>,
}

impl Track {
    pub fn new(synthesizer: Synthesizer) -> Self {
        Self {
            synthesizer,
            notes: Vec::new(),
        }
    }

    pub fn with_notes(synthesizer: Synthesizer, notes: Vec<Note>) -> Self {
        Self { synthesizer, notes }
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn notes_mut(&mut self) -> &mut Vec<Note> {
        &mut self.notes
    }

    pub fn push_note(&mut self, note: Note) {
        self.notes.push(note);
    }

    /// Inserts a note at `index`, or at the end if `index` is past it.
    pub fn insert_note(&mut self, index: usize, note: Note) {
        let index = index.min(self.notes.len());
        self.notes.insert(index, note);
    }

    pub fn remove_note(&mut self, index: usize) -> Option<Note> {
        (index < self.notes.len()).then(|| self.notes.remove(index))
    }

    pub fn synthesizer(&self) -> &Synthesizer {
        &self.synthesizer
    }

    pub fn synthesizer_mut(&mut self) -> &mut Synthesizer {
        &mut self.synthesizer
    }

    pub fn set_synthesizer(&mut self, synthesizer: Synthesizer) {
        self.synthesizer = synthesizer;
    }

    pub fn attach_backends(&mut self, backends: &Backends) {
        self.synthesizer.attach(backends);
    }

    /// Latest note end, in beats.
    pub fn duration_beats(&self) -> f32 {
        self.notes.iter().map(Note::end).fold(0.0, f32::max)
    }

    /// Renders every note and assembles them into one buffer.
    ///
    /// The buffer has the synthesizer's channel count. A track without audible
    /// notes yields an empty buffer.
    pub fn compose(&self, bpm: u32) -> PcmBuffer {
        let mut acc = PcmBuffer::empty(self.synthesizer.channel_count());
        for note in &self.notes {
            let audio = self.synthesizer.audio(note, bpm);
            place(&mut acc, note, &audio, bpm);
        }
        acc
    }
}

/// Places one note's audio on the accumulated buffer.
pub(crate) fn place(acc: &mut PcmBuffer, note: &Note, audio: &PcmBuffer, bpm: u32) -> Placement {
    if audio.is_empty() {
        return Placement::Skipped;
    }

    let t0 = beats_to_seconds(bpm, note.start());
    let dur = beats_to_seconds(bpm, note.duration());
    let length = acc.duration_seconds();

    if t0 >= length {
        trace!("append at {:.6}s (end {:.6}s)", t0, length);
        acc.append(audio);
        return Placement::Appended;
    }

    let offset = seconds_to_frames(t0);
    if t0 + dur <= length {
        trace!("overlay at {:.6}s", t0);
        acc.mix_at(offset, audio);
        return Placement::Overlaid;
    }

    trace!("extend at {:.6}s past end {:.6}s", t0, length);
    let mixed = acc.mix_at(offset, audio);
    acc.append(&audio.slice_frames(mixed, audio.frames()));
    Placement::Extended
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::FRAMERATE;
    use crate::synth::{Chiptune, Engine, SynthesizerKind, Waveform};
    use pretty_assertions::assert_eq;

    fn note(start: f32, duration: f32) -> Note {
        Note::new(Some(60), start, duration, 100).unwrap()
    }

    fn mono(samples: Vec<i16>) -> PcmBuffer {
        PcmBuffer::from_samples(1, samples)
    }

    #[test]
    fn test_place_cases() {
        // At 60 bpm one beat is one second.
        let second = FRAMERATE as usize;
        let mut acc = PcmBuffer::empty(1);

        assert_eq!(place(&mut acc, &note(0.0, 1.0), &mono(vec![1; second]), 60), Placement::Appended);
        assert_eq!(acc.frames(), second);

        assert_eq!(
            place(&mut acc, &note(0.5, 0.5), &mono(vec![2; second / 2]), 60),
            Placement::Overlaid
        );
        assert_eq!(acc.frames(), second);
        assert_eq!(acc.samples()[0], 1);
        assert_eq!(acc.samples()[second - 1], 3);

        assert_eq!(
            place(&mut acc, &note(0.75, 1.0), &mono(vec![4; second]), 60),
            Placement::Extended
        );
        let offset = second * 3 / 4;
        assert_eq!(acc.frames(), offset + second);
        assert_eq!(acc.samples()[offset - 1], 3);
        assert_eq!(acc.samples()[offset], 7);
        assert_eq!(acc.samples()[second], 4);
    }

    #[test]
    fn test_append_ignores_gap() {
        let mut acc = PcmBuffer::empty(1);
        place(&mut acc, &note(10.0, 1.0), &mono(vec![1; 10]), 60);
        assert_eq!(acc.frames(), 10);
        place(&mut acc, &note(20.0, 1.0), &mono(vec![2; 10]), 60);
        assert_eq!(acc.frames(), 20);
    }

    #[test]
    fn test_empty_audio_is_skipped() {
        let mut acc = mono(vec![5; 4]);
        assert_eq!(
            place(&mut acc, &note(0.0, 1.0), &PcmBuffer::empty(1), 60),
            Placement::Skipped
        );
        assert_eq!(acc.samples(), &[5, 5, 5, 5]);
    }

    #[test]
    fn test_overlay_truncates_longer_audio() {
        let second = FRAMERATE as usize;
        let mut acc = mono(vec![0; second]);
        // Declared half a beat, but the engine returned more audio than that.
        place(&mut acc, &note(0.0, 0.5), &mono(vec![1; second * 2]), 60);
        assert_eq!(acc.frames(), second);
    }

    #[test]
    fn test_empty_track() {
        let track = Track::new(Synthesizer::new(SynthesizerKind::Chiptune));
        let audio = track.compose(120);
        assert!(audio.is_empty());
        assert_eq!(audio.channels(), 1);
        assert_eq!(track.duration_beats(), 0.0);
    }

    #[test]
    fn test_compose_uses_synth_channels() {
        let mut track = Track::new(Synthesizer::new(SynthesizerKind::SoundFont));
        track.push_note(note(0.0, 1.0));
        let audio = track.compose(120);
        assert!(audio.is_empty());
        assert_eq!(audio.channels(), 2);
    }

    #[test]
    fn test_note_editing() {
        let synth = Synthesizer::with_engine(Engine::Chiptune(Chiptune::new(Waveform::Saw)));
        let mut track = Track::new(synth);
        track.push_note(note(0.0, 1.0));
        track.push_note(note(2.0, 1.0));
        track.insert_note(1, note(1.0, 1.0));
        track.insert_note(99, note(3.0, 0.5));
        let starts: Vec<f32> = track.notes().iter().map(Note::start).collect();
        assert_eq!(starts, vec![0.0, 1.0, 2.0, 3.0]);
        assert_eq!(track.duration_beats(), 3.5);

        assert_eq!(track.remove_note(0), Some(note(0.0, 1.0)));
        assert_eq!(track.remove_note(10), None);
        assert_eq!(track.notes().len(), 3);

        track.notes_mut().clear();
        assert!(track.notes().is_empty());

        track.set_synthesizer(Synthesizer::new(SynthesizerKind::ImpactModel));
        assert_eq!(track.synthesizer().kind(), SynthesizerKind::ImpactModel);
    }
}
