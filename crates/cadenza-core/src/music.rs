//! A composition: tempo plus tracks, and the cross-track mixdown.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::constants::beats_to_seconds;
use crate::error::ModelError;
use crate::pcm::PcmBuffer;
use crate::synth::Backends;
use crate::track::Track;

/// Tempo of a new composition.
pub const DEFAULT_BPM: u32 = 120;

/// Tempo and tracks. Track order is presentation order only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "MusicFields", into = "MusicFields")]
pub struct Music {
    bpm: u32,
    tracks: Vec<Track>,
}

impl Default for Music {
    fn default() -> Self {
        Self {
            bpm: DEFAULT_BPM,
            tracks: Vec::new(),
        }
    }
}

impl Music {
    /// Creates an empty composition.
    ///
    /// # Errors
    /// Returns [`ModelError::InvalidBpm`] if `bpm` is zero.
    pub fn new(bpm: u32) -> Result<Self, ModelError> {
        Self::with_tracks(bpm, Vec::new())
    }

    pub fn with_tracks(bpm: u32, tracks: Vec<Track>) -> Result<Self, ModelError> {
        Ok(Self {
            bpm: check_bpm(bpm)?,
            tracks,
        })
    }

    pub fn bpm(&self) -> u32 {
        self.bpm
    }

    pub fn set_bpm(&mut self, bpm: u32) -> Result<(), ModelError> {
        self.bpm = check_bpm(bpm)?;
        Ok(())
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn tracks_mut(&mut self) -> &mut Vec<Track> {
        &mut self.tracks
    }

    pub fn push_track(&mut self, track: Track) {
        self.tracks.push(track);
    }

    pub fn remove_track(&mut self, index: usize) -> Option<Track> {
        (index < self.tracks.len()).then(|| self.tracks.remove(index))
    }

    /// Loads external resources for every track's synthesizer.
    pub fn attach_backends(&mut self, backends: &Backends) {
        for track in &mut self.tracks {
            track.attach_backends(backends);
        }
    }

    /// Latest note end across all tracks, in beats.
    pub fn duration_beats(&self) -> f32 {
        self.tracks
            .iter()
            .map(Track::duration_beats)
            .fold(0.0, f32::max)
    }

    /// Latest note end across all tracks, in seconds.
    pub fn duration_seconds(&self) -> f64 {
        beats_to_seconds(self.bpm, self.duration_beats())
    }

    /// Renders every track independently.
    ///
    /// Tracks share no state while rendering; the results are joined by
    /// [`Music::mixdown`].
    pub fn compose_tracks(&self) -> Vec<PcmBuffer> {
        self.tracks
            .iter()
            .enumerate()
            .map(|(i, track)| {
                let audio = track.compose(self.bpm);
                debug!(
                    "Track {} ({}): {} frames",
                    i,
                    track.synthesizer().kind(),
                    audio.frames()
                );
                audio
            })
            .collect()
    }

    /// Adds buffers together from offset 0.
    ///
    /// The result is as long as the longest buffer and has the widest channel
    /// count; narrower buffers are remixed first. No buffers yield an empty mono
    /// buffer.
    pub fn mixdown(buffers: &[PcmBuffer]) -> PcmBuffer {
        let channels = buffers.iter().map(PcmBuffer::channels).max().unwrap_or(1);
        let frames = buffers.iter().map(PcmBuffer::frames).max().unwrap_or(0);
        let mut out = PcmBuffer::from_samples(channels, vec![0; frames * usize::from(channels)]);
        for buffer in buffers {
            out.mix_at(0, buffer);
        }
        out
    }

    /// Renders the whole composition.
    pub fn compose(&self) -> PcmBuffer {
        Self::mixdown(&self.compose_tracks())
    }
}

fn check_bpm(bpm: u32) -> Result<u32, ModelError> {
    if bpm == 0 {
        Err(ModelError::InvalidBpm { bpm })
    } else {
        Ok(bpm)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct MusicFields {
    bpm: u32,
    #[serde(default)]
    tracks: Vec<Track>,
}

impl TryFrom<MusicFields> for Music {
    type Error = ModelError;

    fn try_from(fields: MusicFields) -> Result<Self, Self::Error> {
        Music::with_tracks(fields.bpm, fields.tracks)
    }
}

impl From<Music> for MusicFields {
    fn from(music: Music) -> Self {
        Self {
            bpm: music.bpm,
            tracks: music.tracks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::note::Note;
    use crate::synth::{Synthesizer, SynthesizerKind};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_new_rejects_zero_bpm() {
        assert_eq!(Music::new(0), Err(ModelError::InvalidBpm { bpm: 0 }));
        let mut music = Music::new(90).unwrap();
        assert!(music.set_bpm(0).is_err());
        assert_eq!(music.bpm(), 90);
        assert_eq!(Music::default().bpm(), DEFAULT_BPM);
    }

    #[test]
    fn test_empty_music_is_empty_audio() {
        let music = Music::new(120).unwrap();
        let audio = music.compose();
        assert!(audio.is_empty());
        assert_eq!(music.duration_beats(), 0.0);
    }

    #[test]
    fn test_mixdown_longest_and_widest() {
        let a = PcmBuffer::from_samples(1, vec![1, 2, 3]);
        let b = PcmBuffer::from_samples(2, vec![10, 20]);
        let mixed = Music::mixdown(&[a, b]);
        assert_eq!(mixed.channels(), 2);
        assert_eq!(mixed.frames(), 3);
        assert_eq!(mixed.samples(), &[11, 21, 2, 2, 3, 3]);
    }

    #[test]
    fn test_mixdown_saturates() {
        let a = PcmBuffer::from_samples(1, vec![i16::MAX, i16::MIN]);
        let b = PcmBuffer::from_samples(1, vec![100, -100]);
        assert_eq!(Music::mixdown(&[a, b]).samples(), &[i16::MAX, i16::MIN]);
    }

    #[test]
    fn test_track_editing() {
        let mut music = Music::new(120).unwrap();
        music.push_track(Track::new(Synthesizer::new(SynthesizerKind::Chiptune)));
        let mut second = Track::new(Synthesizer::new(SynthesizerKind::ImpactModel));
        second.push_note(Note::new(Some(40), 2.0, 2.0, 80).unwrap());
        music.push_track(second);
        assert_eq!(music.tracks().len(), 2);
        assert_eq!(music.duration_beats(), 4.0);
        assert_eq!(music.duration_seconds(), 2.0);

        let removed = music.remove_track(0).unwrap();
        assert_eq!(removed.synthesizer().kind(), SynthesizerKind::Chiptune);
        assert!(music.remove_track(5).is_none());
        music.tracks_mut().clear();
        assert!(music.tracks().is_empty());
    }

    #[test]
    fn test_serde_rejects_zero_bpm() {
        assert!(serde_json::from_str::<Music>(r#"{"bpm": 0}"#).is_err());
        let music: Music = serde_json::from_str(r#"{"bpm": 100}"#).unwrap();
        assert_eq!(music, Music::new(100).unwrap());
    }
}
