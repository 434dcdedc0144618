//! Sample-bank playback engine.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use log::warn;
use serde::{Deserialize, Serialize};

use super::bank::{BankRequest, SampleBank, SampleBankCache};
use super::{NoteRenderer, Unavailable};
use crate::constants::seconds_to_frames;
use crate::error::ModelError;
use crate::pcm::PcmBuffer;

/// SoundFont engine parameters plus the bank loaded for them.
///
/// The loaded bank is runtime state: it is neither persisted nor compared.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(try_from = "SoundFontFields", into = "SoundFontFields")]
pub struct SoundFont {
    path: String,
    channel: u8,
    bank: u8,
    preset: u8,
    loaded: Option<Arc<dyn SampleBank>>,
}

impl SoundFont {
    pub fn new(
        path: impl Into<String>,
        channel: u8,
        bank: u8,
        preset: u8,
    ) -> Result<Self, ModelError> {
        Ok(Self {
            path: path.into(),
            channel: ModelError::check_midi("channel", channel)?,
            bank: ModelError::check_midi("bank", bank)?,
            preset: ModelError::check_midi("preset", preset)?,
            loaded: None,
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn channel(&self) -> u8 {
        self.channel
    }

    pub fn bank(&self) -> u8 {
        self.bank
    }

    pub fn preset(&self) -> u8 {
        self.preset
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.is_some()
    }

    /// Changes the file; the previously loaded bank is dropped.
    pub fn set_path(&mut self, path: impl Into<String>) {
        self.path = path.into();
        self.loaded = None;
    }

    pub fn set_channel(&mut self, channel: u8) -> Result<(), ModelError> {
        self.channel = ModelError::check_midi("channel", channel)?;
        Ok(())
    }

    pub fn set_bank(&mut self, bank: u8) -> Result<(), ModelError> {
        self.bank = ModelError::check_midi("bank", bank)?;
        Ok(())
    }

    pub fn set_preset(&mut self, preset: u8) -> Result<(), ModelError> {
        self.preset = ModelError::check_midi("preset", preset)?;
        Ok(())
    }

    /// Uses an already loaded bank.
    pub fn with_bank(mut self, bank: Arc<dyn SampleBank>) -> Self {
        self.loaded = Some(bank);
        self
    }

    /// Loads the bank for the current path from `cache`.
    ///
    /// Without a cache, with an empty path, or when loading fails, the engine is
    /// left unloaded and its notes render as silence.
    pub fn attach(&mut self, cache: Option<&SampleBankCache>) {
        self.loaded = None;
        if self.path.is_empty() {
            return;
        }
        let Some(cache) = cache else {
            return;
        };
        match cache.get_or_load(&self.path) {
            Ok(bank) => self.loaded = Some(bank),
            Err(e) => warn!("Failed to load sample bank '{}': {}", self.path, e),
        }
    }

    fn file_name(&self) -> String {
        Path::new(&self.path)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.clone())
    }
}

impl PartialEq for SoundFont {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
            && self.channel == other.channel
            && self.bank == other.bank
            && self.preset == other.preset
    }
}

impl fmt::Debug for SoundFont {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SoundFont")
            .field("path", &self.path)
            .field("channel", &self.channel)
            .field("bank", &self.bank)
            .field("preset", &self.preset)
            .field("loaded", &self.loaded.is_some())
            .finish()
    }
}

impl NoteRenderer for SoundFont {
    fn channel_count(&self) -> u8 {
        2
    }

    fn is_deterministic(&self) -> bool {
        true
    }

    fn render_note(
        &self,
        pitch: u8,
        volume: u8,
        duration_seconds: f64,
    ) -> Result<PcmBuffer, Unavailable> {
        let bank = self.loaded.as_ref().ok_or_else(|| {
            if self.path.is_empty() {
                Unavailable::new("no SoundFont file selected")
            } else {
                Unavailable::new(format!("SoundFont '{}' is not loaded", self.path))
            }
        })?;
        bank.render(&BankRequest {
            channel: self.channel,
            bank: self.bank,
            preset: self.preset,
            pitch,
            volume,
            frames: seconds_to_frames(duration_seconds),
        })
    }

    fn describe(&self) -> String {
        if self.loaded.is_none() {
            return "SoundFont. No file loaded.".to_string();
        }
        format!(
            "SoundFont {}. Channel {}, bank {}, preset {}.",
            self.file_name(),
            self.channel,
            self.bank,
            self.preset
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SoundFontFields {
    #[serde(default)]
    path: String,
    #[serde(default)]
    channel: u8,
    #[serde(default)]
    bank: u8,
    #[serde(default)]
    preset: u8,
}

impl TryFrom<SoundFontFields> for SoundFont {
    type Error = ModelError;

    fn try_from(fields: SoundFontFields) -> Result<Self, Self::Error> {
        SoundFont::new(fields.path, fields.channel, fields.bank, fields.preset)
    }
}

impl From<SoundFont> for SoundFontFields {
    fn from(engine: SoundFont) -> Self {
        Self {
            path: engine.path,
            channel: engine.channel,
            bank: engine.bank,
            preset: engine.preset,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::FRAMERATE;
    use crate::error::BackendError;
    use crate::synth::bank::{SampleBankLoader, WavSampleBank};

    #[derive(Debug)]
    struct FixedLoader;

    impl SampleBankLoader for FixedLoader {
        fn load(&self, path: &str) -> Result<Arc<dyn SampleBank>, BackendError> {
            if path.ends_with(".wav") {
                Ok(Arc::new(WavSampleBank::from_samples(vec![0.5; 64], FRAMERATE)))
            } else {
                Err(BackendError::Other(format!("cannot open {}", path)))
            }
        }
    }

    #[test]
    fn test_unloaded_is_unavailable() {
        let engine = SoundFont::default();
        let err = engine.render_note(60, 100, 0.1).unwrap_err();
        assert!(err.reason().contains("no SoundFont"));
        assert_eq!(engine.describe(), "SoundFont. No file loaded.");

        let engine = SoundFont::new("piano.sf2", 0, 0, 0).unwrap();
        assert!(engine.render_note(60, 100, 0.1).is_err());
    }

    #[test]
    fn test_attach_and_render() {
        let cache = SampleBankCache::new(Arc::new(FixedLoader));
        let mut engine = SoundFont::new("banks/piano.wav", 1, 2, 3).unwrap();
        engine.attach(Some(&cache));
        assert!(engine.is_loaded());
        assert_eq!(engine.describe(), "SoundFont piano.wav. Channel 1, bank 2, preset 3.");

        let buffer = engine.render_note(60, 127, 0.01).unwrap();
        assert_eq!(buffer.channels(), 2);
        assert_eq!(buffer.frames(), seconds_to_frames(0.01));
    }

    #[test]
    fn test_attach_failure_stays_unloaded() {
        let cache = SampleBankCache::new(Arc::new(FixedLoader));
        let mut engine = SoundFont::new("broken.sf2", 0, 0, 0).unwrap();
        engine.attach(Some(&cache));
        assert!(!engine.is_loaded());
        engine.attach(None);
        assert!(!engine.is_loaded());
    }

    #[test]
    fn test_set_path_unloads() {
        let cache = SampleBankCache::new(Arc::new(FixedLoader));
        let mut engine = SoundFont::new("a.wav", 0, 0, 0).unwrap();
        engine.attach(Some(&cache));
        engine.set_path("b.wav");
        assert!(!engine.is_loaded());
    }

    #[test]
    fn test_equality_ignores_loaded_bank() {
        let cache = SampleBankCache::new(Arc::new(FixedLoader));
        let plain = SoundFont::new("a.wav", 0, 0, 0).unwrap();
        let mut loaded = plain.clone();
        loaded.attach(Some(&cache));
        assert_eq!(plain, loaded);
    }

    #[test]
    fn test_rejects_out_of_range() {
        assert!(SoundFont::new("a.wav", 128, 0, 0).is_err());
        let mut engine = SoundFont::default();
        assert!(engine.set_preset(200).is_err());
        assert_eq!(engine.preset(), 0);
    }
}
