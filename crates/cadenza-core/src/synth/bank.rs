//! Sample banks for the SoundFont engine.
//!
//! A [`SampleBank`] turns a (channel, bank, preset, pitch, volume) request into
//! stereo audio. Banks are loaded once per path through a [`SampleBankLoader`] and
//! shared through a [`SampleBankCache`]. The bundled [`WavBankLoader`] treats a WAV
//! file as a single sample pitched around middle C.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use log::debug;

use super::Unavailable;
use crate::constants::{FRAMERATE, MIDI_MAX};
use crate::error::BackendError;
use crate::pcm::{normalized_to_i16, PcmBuffer};

/// MIDI pitch at which a WAV sample plays back unshifted.
pub const REFERENCE_PITCH: u8 = 60;

/// One note to be played from a bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BankRequest {
    pub channel: u8,
    pub bank: u8,
    pub preset: u8,
    pub pitch: u8,
    pub volume: u8,
    /// Exact number of frames to return.
    pub frames: usize,
}

/// A loaded sample bank.
pub trait SampleBank: Send + Sync + fmt::Debug {
    /// Renders a note as stereo audio of exactly `request.frames` frames.
    fn render(&self, request: &BankRequest) -> Result<PcmBuffer, Unavailable>;
}

/// Loads a sample bank from a path.
pub trait SampleBankLoader: Send + Sync + fmt::Debug {
    fn load(&self, path: &str) -> Result<Arc<dyn SampleBank>, BackendError>;
}

/// Loaded banks keyed by path.
///
/// Shared by every SoundFont engine attached to it, so a file used on several
/// tracks is only read once.
#[derive(Debug)]
pub struct SampleBankCache {
    loader: Arc<dyn SampleBankLoader>,
    banks: Mutex<HashMap<String, Arc<dyn SampleBank>>>,
}

impl SampleBankCache {
    pub fn new(loader: Arc<dyn SampleBankLoader>) -> Self {
        Self {
            loader,
            banks: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the bank for `path`, loading it on first use.
    ///
    /// Failed loads are not cached.
    pub fn get_or_load(&self, path: &str) -> Result<Arc<dyn SampleBank>, BackendError> {
        let mut banks = self.banks.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(bank) = banks.get(path) {
            return Ok(Arc::clone(bank));
        }
        let bank = self.loader.load(path)?;
        debug!("Loaded sample bank '{}'", path);
        banks.insert(path.to_string(), Arc::clone(&bank));
        Ok(bank)
    }

    /// Number of cached banks.
    pub fn len(&self) -> usize {
        self.banks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Loads WAV files with `hound`.
#[derive(Debug, Clone, Default)]
pub struct WavBankLoader {
    root: Option<PathBuf>,
}

impl WavBankLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves relative paths against `root`.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        match &self.root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }
}

impl SampleBankLoader for WavBankLoader {
    fn load(&self, path: &str) -> Result<Arc<dyn SampleBank>, BackendError> {
        let resolved = self.resolve(path);
        let bank = WavSampleBank::open(&resolved)?;
        Ok(Arc::new(bank))
    }
}

/// A single mono sample, resampled to play any pitch.
#[derive(Debug, Clone, PartialEq)]
pub struct WavSampleBank {
    samples: Vec<f64>,
    sample_rate: u32,
}

impl WavSampleBank {
    /// Reads a WAV file, averaging all channels down to mono.
    pub fn open(path: &Path) -> Result<Self, BackendError> {
        let display = path.display().to_string();
        let wav_err = |source| BackendError::Wav {
            path: display.clone(),
            source,
        };
        let mut reader = hound::WavReader::open(path).map_err(wav_err)?;
        let spec = reader.spec();

        let interleaved: Vec<f64> = match (spec.sample_format, spec.bits_per_sample) {
            (hound::SampleFormat::Float, 32) => reader
                .samples::<f32>()
                .map(|s| s.map(f64::from))
                .collect::<Result<_, _>>()
                .map_err(wav_err)?,
            (hound::SampleFormat::Int, bits @ (8 | 16 | 24 | 32)) => {
                let scale = f64::from(1u32 << (bits - 1));
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|v| f64::from(v) / scale))
                    .collect::<Result<_, _>>()
                    .map_err(wav_err)?
            }
            (format, bits) => {
                return Err(BackendError::Unsupported {
                    path: display,
                    message: format!("{:?} samples at {} bits", format, bits),
                })
            }
        };

        let channels = usize::from(spec.channels.max(1));
        let samples: Vec<f64> = interleaved
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f64>() / channels as f64)
            .collect();
        if samples.is_empty() {
            return Err(BackendError::Empty { path: display });
        }

        Ok(Self {
            samples,
            sample_rate: spec.sample_rate,
        })
    }

    /// Wraps already-decoded mono samples in [-1.0, 1.0].
    pub fn from_samples(samples: Vec<f64>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    fn sample_at(&self, position: f64) -> f64 {
        let index = position as usize;
        let frac = position - index as f64;
        match (self.samples.get(index), self.samples.get(index + 1)) {
            (Some(&a), Some(&b)) => a + (b - a) * frac,
            (Some(&a), None) => a,
            _ => 0.0,
        }
    }
}

impl SampleBank for WavSampleBank {
    fn render(&self, request: &BankRequest) -> Result<PcmBuffer, Unavailable> {
        let semitones = f64::from(request.pitch) - f64::from(REFERENCE_PITCH);
        let step = 2.0_f64.powf(semitones / 12.0) * f64::from(self.sample_rate)
            / f64::from(FRAMERATE);
        let gain = f64::from(request.volume) / f64::from(MIDI_MAX);

        // Past the end of the sample the note is padded with silence.
        let mut samples = Vec::with_capacity(request.frames * 2);
        for i in 0..request.frames {
            let value = normalized_to_i16(self.sample_at(i as f64 * step) * gain);
            samples.push(value);
            samples.push(value);
        }
        Ok(PcmBuffer::from_samples(2, samples))
    }
}
