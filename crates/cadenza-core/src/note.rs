//! A single musical event on a track.

use serde::{Deserialize, Serialize};

use crate::constants::{round6, MIDI_MAX};
use crate::error::ModelError;

/// A note: an optional MIDI pitch placed on the track timeline in beats.
///
/// A `None` pitch is silence. `start` and `duration` are kept rounded to 6 decimal
/// digits so that a saved and reloaded note compares equal to the original.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "NoteFields", into = "NoteFields")]
pub struct Note {
    pitch: Option<u8>,
    start: f32,
    duration: f32,
    volume: u8,
}

impl Note {
    /// Creates a note, rejecting values outside the model's ranges.
    ///
    /// # Arguments
    /// * `pitch` - MIDI pitch 0-127, or `None` for silence
    /// * `start` - Offset from the track origin in beats (>= 0)
    /// * `duration` - Length in beats (> 0)
    /// * `volume` - Volume 0-127
    pub fn new(pitch: Option<u8>, start: f32, duration: f32, volume: u8) -> Result<Self, ModelError> {
        Ok(Self {
            pitch: check_pitch(pitch)?,
            start: check_start(start)?,
            duration: check_duration(duration)?,
            volume: check_volume(volume)?,
        })
    }

    /// Creates a silent note.
    pub fn silence(start: f32, duration: f32) -> Result<Self, ModelError> {
        Self::new(None, start, duration, 0)
    }

    pub fn pitch(&self) -> Option<u8> {
        self.pitch
    }

    pub fn start(&self) -> f32 {
        self.start
    }

    pub fn duration(&self) -> f32 {
        self.duration
    }

    pub fn volume(&self) -> u8 {
        self.volume
    }

    /// Whether this note is silence.
    pub fn is_silence(&self) -> bool {
        self.pitch.is_none()
    }

    /// Beat at which the note ends.
    pub fn end(&self) -> f32 {
        self.start + self.duration
    }

    pub fn set_pitch(&mut self, pitch: Option<u8>) -> Result<(), ModelError> {
        self.pitch = check_pitch(pitch)?;
        Ok(())
    }

    pub fn set_start(&mut self, start: f32) -> Result<(), ModelError> {
        self.start = check_start(start)?;
        Ok(())
    }

    pub fn set_duration(&mut self, duration: f32) -> Result<(), ModelError> {
        self.duration = check_duration(duration)?;
        Ok(())
    }

    pub fn set_volume(&mut self, volume: u8) -> Result<(), ModelError> {
        self.volume = check_volume(volume)?;
        Ok(())
    }
}

fn check_pitch(pitch: Option<u8>) -> Result<Option<u8>, ModelError> {
    match pitch {
        Some(p) if p > MIDI_MAX => Err(ModelError::InvalidPitch { pitch: p }),
        other => Ok(other),
    }
}

fn check_volume(volume: u8) -> Result<u8, ModelError> {
    if volume > MIDI_MAX {
        Err(ModelError::InvalidVolume { volume })
    } else {
        Ok(volume)
    }
}

fn check_start(start: f32) -> Result<f32, ModelError> {
    if !start.is_finite() || start < 0.0 {
        return Err(ModelError::InvalidStart { start });
    }
    Ok(round6(start))
}

fn check_duration(duration: f32) -> Result<f32, ModelError> {
    if !duration.is_finite() || duration <= 0.0 {
        return Err(ModelError::InvalidDuration { duration });
    }
    let rounded = round6(duration);
    // Durations below a millionth of a beat would round to zero.
    if rounded <= 0.0 {
        return Err(ModelError::InvalidDuration { duration });
    }
    Ok(rounded)
}

/// Serialized form of a note; deserialization goes through [`Note::new`].
#[derive(Debug, Clone, Serialize, Deserialize)]
struct NoteFields {
    #[serde(default)]
    pitch: Option<u8>,
    start: f32,
    duration: f32,
    volume: u8,
}

impl TryFrom<NoteFields> for Note {
    type Error = ModelError;

    fn try_from(fields: NoteFields) -> Result<Self, Self::Error> {
        Note::new(fields.pitch, fields.start, fields.duration, fields.volume)
    }
}

impl From<Note> for NoteFields {
    fn from(note: Note) -> Self {
        Self {
            pitch: note.pitch,
            start: note.start,
            duration: note.duration,
            volume: note.volume,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_valid() {
        let note = Note::new(Some(60), 0.0, 1.0, 127).unwrap();
        assert_eq!(note.pitch(), Some(60));
        assert_eq!(note.start(), 0.0);
        assert_eq!(note.duration(), 1.0);
        assert_eq!(note.volume(), 127);
        assert!(!note.is_silence());
        assert_eq!(note.end(), 1.0);
    }

    #[test]
    fn test_silence() {
        let note = Note::silence(2.0, 0.5).unwrap();
        assert!(note.is_silence());
        assert_eq!(note.volume(), 0);
    }

    #[test]
    fn test_rejects_invalid_values() {
        assert_eq!(
            Note::new(Some(128), 0.0, 1.0, 100),
            Err(ModelError::InvalidPitch { pitch: 128 })
        );
        assert_eq!(
            Note::new(Some(60), 0.0, 1.0, 200),
            Err(ModelError::InvalidVolume { volume: 200 })
        );
        assert!(matches!(
            Note::new(Some(60), -0.5, 1.0, 100),
            Err(ModelError::InvalidStart { .. })
        ));
        assert!(matches!(
            Note::new(Some(60), 0.0, -1.0, 100),
            Err(ModelError::InvalidDuration { .. })
        ));
        assert!(matches!(
            Note::new(Some(60), 0.0, 0.0, 100),
            Err(ModelError::InvalidDuration { .. })
        ));
        assert!(matches!(
            Note::new(Some(60), f32::NAN, 1.0, 100),
            Err(ModelError::InvalidStart { .. })
        ));
        assert!(matches!(
            Note::new(Some(60), 0.0, 1e-8, 100),
            Err(ModelError::InvalidDuration { .. })
        ));
    }

    #[test]
    fn test_values_are_rounded() {
        let note = Note::new(Some(60), 1.0 / 3.0, 2.0 / 3.0, 100).unwrap();
        assert_eq!(note.start(), 0.333_333);
        assert_eq!(note.duration(), 0.666_667);
    }

    #[test]
    fn test_setters_validate() {
        let mut note = Note::new(Some(60), 0.0, 1.0, 100).unwrap();
        assert!(note.set_volume(128).is_err());
        assert_eq!(note.volume(), 100);
        note.set_pitch(None).unwrap();
        assert!(note.is_silence());
        note.set_start(4.0).unwrap();
        note.set_duration(0.25).unwrap();
        assert_eq!(note.end(), 4.25);
    }

    #[test]
    fn test_serde_validates() {
        let json = r#"{"pitch": 64, "start": 0.5, "duration": 1.0, "volume": 90}"#;
        let note: Note = serde_json::from_str(json).unwrap();
        assert_eq!(note.pitch(), Some(64));

        let silent: Note = serde_json::from_str(r#"{"start": 0, "duration": 1, "volume": 0}"#).unwrap();
        assert!(silent.is_silence());

        let bad = r#"{"pitch": 64, "start": 0.5, "duration": 0.0, "volume": 90}"#;
        assert!(serde_json::from_str::<Note>(bad).is_err());
    }
}
