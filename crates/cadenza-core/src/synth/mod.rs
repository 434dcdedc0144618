//! Sound generators bound to tracks.
//!
//! A [`Synthesizer`] pairs per-track settings (beat, gain, fixed volume) with one
//! [`Engine`] variant. Every engine implements [`NoteRenderer`]; the beat/second
//! conversion and volume resolution in [`Synthesizer::audio`] are shared by all of
//! them.
//!
//! Engines that need an external resource (a sample bank, a plugin binary) get it
//! through [`Backends`] at configuration time. Until then, or when loading fails,
//! they report [`Unavailable`] and the note degrades to silence.
//!
//! - [`chiptune`]: Procedural waveforms (sine, triangle, saw, pulse, noise)
//! - [`impact`]: Modal impact sounds between two materials
//! - [`soundfont`]: Sample-bank playback
//! - [`plugin`]: Externally hosted instrument plugins
//! - [`bank`]: Sample-bank loading and caching

pub mod bank;
pub mod chiptune;
pub mod impact;
pub mod plugin;
pub mod soundfont;

#[cfg(test)]
mod tests;

use std::fmt;
use std::sync::Arc;

use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::beat::Beat;
use crate::constants::{beats_to_seconds, MIDI_MAX};
use crate::error::ModelError;
use crate::note::Note;
use crate::pcm::PcmBuffer;

pub use bank::{BankRequest, SampleBank, SampleBankCache, SampleBankLoader, WavBankLoader};
pub use chiptune::{Chiptune, Waveform};
pub use impact::ImpactModel;
pub use plugin::{PluginHost, PluginInstance, PluginLoader, PluginRequest};
pub use soundfont::SoundFont;

/// Why an engine produced no audio for a non-silent note.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct Unavailable {
    reason: String,
}

impl Unavailable {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

/// The capability set every engine provides.
pub trait NoteRenderer {
    /// Number of interleaved channels in every buffer this engine returns.
    fn channel_count(&self) -> u8;

    /// Whether rendering the same note twice yields identical samples.
    fn is_deterministic(&self) -> bool;

    /// Synthesizes `duration_seconds` of audio for a pitch at an effective volume.
    ///
    /// Errors are recovered by the caller as silence; they are never fatal.
    fn render_note(
        &self,
        pitch: u8,
        volume: u8,
        duration_seconds: f64,
    ) -> Result<PcmBuffer, Unavailable>;

    /// Short human-readable description of the current configuration.
    fn describe(&self) -> String;
}

/// Settings shared by every engine; read at render time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SettingsFields", into = "SettingsFields")]
pub struct SynthSettings {
    beat: Beat,
    gain: u8,
    use_fixed_volume: bool,
    fixed_volume: u8,
}

impl Default for SynthSettings {
    fn default() -> Self {
        Self {
            beat: Beat::One,
            gain: MIDI_MAX,
            use_fixed_volume: true,
            fixed_volume: MIDI_MAX,
        }
    }
}

impl SynthSettings {
    pub fn new(
        beat: Beat,
        gain: u8,
        use_fixed_volume: bool,
        fixed_volume: u8,
    ) -> Result<Self, ModelError> {
        Ok(Self {
            beat,
            gain: ModelError::check_midi("gain", gain)?,
            use_fixed_volume,
            fixed_volume: ModelError::check_midi("fixed volume", fixed_volume)?,
        })
    }

    pub fn beat(&self) -> Beat {
        self.beat
    }

    pub fn gain(&self) -> u8 {
        self.gain
    }

    pub fn use_fixed_volume(&self) -> bool {
        self.use_fixed_volume
    }

    pub fn fixed_volume(&self) -> u8 {
        self.fixed_volume
    }

    pub fn set_beat(&mut self, beat: Beat) {
        self.beat = beat;
    }

    pub fn set_gain(&mut self, gain: u8) -> Result<(), ModelError> {
        self.gain = ModelError::check_midi("gain", gain)?;
        Ok(())
    }

    pub fn set_use_fixed_volume(&mut self, use_fixed_volume: bool) {
        self.use_fixed_volume = use_fixed_volume;
    }

    pub fn set_fixed_volume(&mut self, fixed_volume: u8) -> Result<(), ModelError> {
        self.fixed_volume = ModelError::check_midi("fixed volume", fixed_volume)?;
        Ok(())
    }

    /// Resolves the volume a note is rendered at.
    ///
    /// The fixed volume (when enabled) or the note's own volume, scaled by
    /// `gain / 127` and rounded.
    pub fn effective_volume(&self, note_volume: u8) -> u8 {
        let gain_factor = f64::from(self.gain) / 127.0;
        let base = if self.use_fixed_volume {
            self.fixed_volume
        } else {
            note_volume
        };
        (f64::from(base) * gain_factor).round() as u8
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SettingsFields {
    #[serde(default)]
    beat: Beat,
    gain: u8,
    use_fixed_volume: bool,
    fixed_volume: u8,
}

impl TryFrom<SettingsFields> for SynthSettings {
    type Error = ModelError;

    fn try_from(fields: SettingsFields) -> Result<Self, Self::Error> {
        SynthSettings::new(
            fields.beat,
            fields.gain,
            fields.use_fixed_volume,
            fields.fixed_volume,
        )
    }
}

impl From<SynthSettings> for SettingsFields {
    fn from(settings: SynthSettings) -> Self {
        Self {
            beat: settings.beat,
            gain: settings.gain,
            use_fixed_volume: settings.use_fixed_volume,
            fixed_volume: settings.fixed_volume,
        }
    }
}

/// The registry of available engine variants.
///
/// The discriminant is the persisted type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SynthesizerKind {
    Chiptune = 0,
    ImpactModel = 1,
    SoundFont = 2,
    PluginHost = 3,
}

impl SynthesizerKind {
    /// Every variant, in tag order.
    pub const ALL: [SynthesizerKind; 4] = [
        SynthesizerKind::Chiptune,
        SynthesizerKind::ImpactModel,
        SynthesizerKind::SoundFont,
        SynthesizerKind::PluginHost,
    ];

    pub fn tag(self) -> u8 {
        self as u8
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        Self::ALL.get(usize::from(tag)).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            SynthesizerKind::Chiptune => "chiptune",
            SynthesizerKind::ImpactModel => "impact_model",
            SynthesizerKind::SoundFont => "sound_font",
            SynthesizerKind::PluginHost => "plugin_host",
        }
    }
}

impl fmt::Display for SynthesizerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Engine variant with its variant-specific parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Engine {
    Chiptune(Chiptune),
    ImpactModel(ImpactModel),
    SoundFont(SoundFont),
    PluginHost(PluginHost),
}

impl Engine {
    /// Default engine for a kind.
    pub fn for_kind(kind: SynthesizerKind) -> Self {
        match kind {
            SynthesizerKind::Chiptune => Engine::Chiptune(Chiptune::default()),
            SynthesizerKind::ImpactModel => Engine::ImpactModel(ImpactModel::default()),
            SynthesizerKind::SoundFont => Engine::SoundFont(SoundFont::default()),
            SynthesizerKind::PluginHost => Engine::PluginHost(PluginHost::default()),
        }
    }

    pub fn kind(&self) -> SynthesizerKind {
        match self {
            Engine::Chiptune(_) => SynthesizerKind::Chiptune,
            Engine::ImpactModel(_) => SynthesizerKind::ImpactModel,
            Engine::SoundFont(_) => SynthesizerKind::SoundFont,
            Engine::PluginHost(_) => SynthesizerKind::PluginHost,
        }
    }

    fn renderer(&self) -> &dyn NoteRenderer {
        match self {
            Engine::Chiptune(engine) => engine,
            Engine::ImpactModel(engine) => engine,
            Engine::SoundFont(engine) => engine,
            Engine::PluginHost(engine) => engine,
        }
    }
}

/// Outcome of rendering one note, keeping silence and failure apart.
#[derive(Debug, Clone, PartialEq)]
pub enum NoteAudio {
    /// The note has no pitch.
    Silent,
    /// The engine could not produce audio.
    Unavailable(Unavailable),
    /// Rendered samples.
    Audio(PcmBuffer),
}

/// External resources engines may load at configuration time.
#[derive(Debug, Clone, Default)]
pub struct Backends {
    banks: Option<Arc<SampleBankCache>>,
    plugins: Option<Arc<dyn PluginLoader>>,
}

impl Backends {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_banks(mut self, cache: Arc<SampleBankCache>) -> Self {
        self.banks = Some(cache);
        self
    }

    pub fn with_plugins(mut self, loader: Arc<dyn PluginLoader>) -> Self {
        self.plugins = Some(loader);
        self
    }

    pub fn banks(&self) -> Option<&SampleBankCache> {
        self.banks.as_deref()
    }

    pub fn plugins(&self) -> Option<&dyn PluginLoader> {
        self.plugins.as_deref()
    }
}

/// A track's sound generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Synthesizer {
    #[serde(default)]
    settings: SynthSettings,
    engine: Engine,
}

impl Synthesizer {
    /// Creates a synthesizer of the given kind with default parameters.
    pub fn new(kind: SynthesizerKind) -> Self {
        Self::with_engine(Engine::for_kind(kind))
    }

    pub fn with_engine(engine: Engine) -> Self {
        Self {
            settings: SynthSettings::default(),
            engine,
        }
    }

    pub fn with_settings(mut self, settings: SynthSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &SynthSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut SynthSettings {
        &mut self.settings
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut Engine {
        &mut self.engine
    }

    pub fn kind(&self) -> SynthesizerKind {
        self.engine.kind()
    }

    pub fn channel_count(&self) -> u8 {
        self.engine.renderer().channel_count()
    }

    pub fn is_deterministic(&self) -> bool {
        self.engine.renderer().is_deterministic()
    }

    pub fn describe(&self) -> String {
        self.engine.renderer().describe()
    }

    /// Loads any external resource the engine needs.
    pub fn attach(&mut self, backends: &Backends) {
        match &mut self.engine {
            Engine::SoundFont(engine) => engine.attach(backends.banks()),
            Engine::PluginHost(engine) => engine.attach(backends.plugins()),
            Engine::Chiptune(_) | Engine::ImpactModel(_) => {}
        }
    }

    /// Renders a note, reporting silence and unavailability separately.
    pub fn render(&self, note: &Note, bpm: u32) -> NoteAudio {
        let Some(pitch) = note.pitch() else {
            return NoteAudio::Silent;
        };
        let duration = beats_to_seconds(bpm, note.duration());
        let volume = self.settings.effective_volume(note.volume());
        let renderer = self.engine.renderer();
        match renderer.render_note(pitch, volume, duration) {
            Ok(buffer) if buffer.channels() != renderer.channel_count() => {
                NoteAudio::Unavailable(Unavailable::new(format!(
                    "engine returned {} channels, expected {}",
                    buffer.channels(),
                    renderer.channel_count()
                )))
            }
            Ok(buffer) => NoteAudio::Audio(buffer),
            Err(unavailable) => NoteAudio::Unavailable(unavailable),
        }
    }

    /// Synthesizes a note.
    ///
    /// Silence and unavailable engines both yield an empty buffer.
    pub fn audio(&self, note: &Note, bpm: u32) -> PcmBuffer {
        match self.render(note, bpm) {
            NoteAudio::Audio(buffer) => buffer,
            NoteAudio::Silent => PcmBuffer::empty(self.channel_count()),
            NoteAudio::Unavailable(unavailable) => {
                debug!(
                    "{} engine produced no audio for pitch {:?}: {}",
                    self.kind(),
                    note.pitch(),
                    unavailable
                );
                PcmBuffer::empty(self.channel_count())
            }
        }
    }
}

impl From<Engine> for Synthesizer {
    fn from(engine: Engine) -> Self {
        Synthesizer::with_engine(engine)
    }
}
