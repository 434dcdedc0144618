//! Interleaved 16-bit PCM buffers and the linear mixing they support.

use crate::constants::{frames_to_seconds, SAMPLE_WIDTH};

/// Interleaved signed 16-bit audio at [`FRAMERATE`](crate::constants::FRAMERATE).
///
/// An empty buffer means "no audio to place"; it is not the same as a run of
/// zero-valued samples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PcmBuffer {
    channels: u8,
    samples: Vec<i16>,
}

impl PcmBuffer {
    /// Creates an empty buffer.
    ///
    /// A channel count of zero is treated as mono.
    pub fn empty(channels: u8) -> Self {
        Self {
            channels: channels.max(1),
            samples: Vec::new(),
        }
    }

    /// Wraps interleaved samples.
    ///
    /// A trailing partial frame is dropped.
    pub fn from_samples(channels: u8, mut samples: Vec<i16>) -> Self {
        let channels = channels.max(1);
        let whole = samples.len() - samples.len() % usize::from(channels);
        samples.truncate(whole);
        Self { channels, samples }
    }

    /// Builds a mono buffer from normalized samples in [-1.0, 1.0].
    pub fn from_normalized(samples: &[f64]) -> Self {
        Self {
            channels: 1,
            samples: samples.iter().map(|&s| normalized_to_i16(s)).collect(),
        }
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    /// Number of frames (samples per channel).
    pub fn frames(&self) -> usize {
        self.samples.len() / usize::from(self.channels)
    }

    pub fn duration_seconds(&self) -> f64 {
        frames_to_seconds(self.frames())
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Concatenates `other` onto the end of this buffer.
    ///
    /// `other` is remixed first if its channel count differs.
    pub fn append(&mut self, other: &PcmBuffer) {
        if other.channels == self.channels {
            self.samples.extend_from_slice(&other.samples);
        } else {
            self.samples.extend(other.remix(self.channels).samples);
        }
    }

    /// Adds the frames of `other` into this buffer starting at `frame_offset`.
    ///
    /// Summation saturates at the i16 range. Frames of `other` past the end of this
    /// buffer are ignored; the length never changes. Returns the number of frames
    /// mixed.
    pub fn mix_at(&mut self, frame_offset: usize, other: &PcmBuffer) -> usize {
        let remixed;
        let other = if other.channels == self.channels {
            other
        } else {
            remixed = other.remix(self.channels);
            &remixed
        };
        let available = self.frames().saturating_sub(frame_offset);
        let frames = available.min(other.frames());
        if frames == 0 {
            return 0;
        }
        let channels = usize::from(self.channels);
        let start = frame_offset * channels;
        let target = &mut self.samples[start..start + frames * channels];
        for (dst, &src) in target.iter_mut().zip(&other.samples) {
            *dst = dst.saturating_add(src);
        }
        frames
    }

    /// Returns the frames in `range` as a new buffer.
    pub fn slice_frames(&self, from: usize, to: usize) -> PcmBuffer {
        let channels = usize::from(self.channels);
        let to = to.min(self.frames());
        let from = from.min(to);
        Self {
            channels: self.channels,
            samples: self.samples[from * channels..to * channels].to_vec(),
        }
    }

    /// Converts to another channel count.
    ///
    /// Mono is duplicated into every output channel, anything is averaged down to
    /// mono, and other layouts copy the nearest source channel.
    pub fn remix(&self, channels: u8) -> PcmBuffer {
        let channels = channels.max(1);
        if channels == self.channels {
            return self.clone();
        }
        let src = usize::from(self.channels);
        let dst = usize::from(channels);
        let mut samples = Vec::with_capacity(self.frames() * dst);
        for frame in self.samples.chunks_exact(src) {
            if dst == 1 {
                let sum: i32 = frame.iter().map(|&s| i32::from(s)).sum();
                samples.push((sum / src as i32) as i16);
            } else {
                for c in 0..dst {
                    samples.push(frame[c.min(src - 1)]);
                }
            }
        }
        Self { channels, samples }
    }

    /// Little-endian bytes of the interleaved samples.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.samples.len() * SAMPLE_WIDTH);
        for sample in &self.samples {
            bytes.extend_from_slice(&sample.to_le_bytes());
        }
        bytes
    }

    /// BLAKE3 hash of the PCM bytes.
    pub fn content_hash(&self) -> String {
        blake3::hash(&self.to_le_bytes()).to_hex().to_string()
    }

    /// Largest absolute sample value.
    pub fn peak(&self) -> u16 {
        self.samples
            .iter()
            .map(|s| s.unsigned_abs())
            .max()
            .unwrap_or(0)
    }
}

/// Converts a normalized sample to i16, clipping to [-1.0, 1.0].
pub fn normalized_to_i16(sample: f64) -> i16 {
    (sample.clamp(-1.0, 1.0) * 32767.0).round() as i16
}
