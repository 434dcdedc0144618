//! Procedural waveform engine.
//!
//! Generates classic chip waveforms directly from the note frequency. Output is
//! mono and fully deterministic; the noise channel draws from a PCG32 stream seeded
//! per pitch and volume.

use std::f64::consts::PI;
use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::{NoteRenderer, Unavailable};
use crate::constants::{midi_to_freq, seconds_to_frames, FRAMERATE, MIDI_MAX};
use crate::pcm::PcmBuffer;
use crate::rng::{create_rng, derive_note_seed};

/// Base seed of the noise waveform stream.
const NOISE_SEED: u32 = 0x4348_4950;

/// Chip waveform. The discriminant is the persisted code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Waveform {
    #[default]
    Sine = 1,
    Triangle = 2,
    Saw = 4,
    Pulse = 8,
    Noise = 16,
}

impl Waveform {
    pub const ALL: [Waveform; 5] = [
        Waveform::Sine,
        Waveform::Triangle,
        Waveform::Saw,
        Waveform::Pulse,
        Waveform::Noise,
    ];

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.iter().copied().find(|w| w.code() == code)
    }

    pub fn name(self) -> &'static str {
        match self {
            Waveform::Sine => "sine",
            Waveform::Triangle => "triangle",
            Waveform::Saw => "saw",
            Waveform::Pulse => "pulse",
            Waveform::Noise => "noise",
        }
    }

    /// Value of a periodic waveform at `phase` in [0, 1).
    fn periodic(self, phase: f64) -> f64 {
        match self {
            Waveform::Sine => (2.0 * PI * phase).sin(),
            Waveform::Triangle => {
                if phase < 0.5 {
                    4.0 * phase - 1.0
                } else {
                    3.0 - 4.0 * phase
                }
            }
            Waveform::Saw => 2.0 * phase - 1.0,
            Waveform::Pulse => {
                if phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            Waveform::Noise => 0.0,
        }
    }
}

impl fmt::Display for Waveform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Chiptune engine parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Chiptune {
    #[serde(default)]
    waveform: Waveform,
}

impl Chiptune {
    pub fn new(waveform: Waveform) -> Self {
        Self { waveform }
    }

    pub fn waveform(&self) -> Waveform {
        self.waveform
    }

    pub fn set_waveform(&mut self, waveform: Waveform) {
        self.waveform = waveform;
    }

    fn generate(&self, pitch: u8, volume: u8, frames: usize) -> Vec<f64> {
        let frequency = midi_to_freq(pitch);
        let sample_rate = f64::from(FRAMERATE);
        let amplitude = f64::from(volume) / f64::from(MIDI_MAX);

        if self.waveform == Waveform::Noise {
            // Sample-and-hold noise; the hold length tracks the pitch.
            let hold = ((sample_rate / frequency / 2.0) as usize).max(1);
            let mut rng = create_rng(derive_note_seed(NOISE_SEED, pitch, volume));
            let mut value = 0.0;
            return (0..frames)
                .map(|i| {
                    if i % hold == 0 {
                        value = rng.gen::<f64>() * 2.0 - 1.0;
                    }
                    value * amplitude
                })
                .collect();
        }

        let increment = frequency / sample_rate;
        (0..frames)
            .map(|i| {
                let phase = (i as f64 * increment).fract();
                self.waveform.periodic(phase) * amplitude
            })
            .collect()
    }
}

impl NoteRenderer for Chiptune {
    fn channel_count(&self) -> u8 {
        1
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
        let frames = seconds_to_frames(duration_seconds);
        Ok(PcmBuffer::from_normalized(&self.generate(pitch, volume, frames)))
    }

    fn describe(&self) -> String {
        format!("Chiptune ({})", self.waveform)
    }
}
