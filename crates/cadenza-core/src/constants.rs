//! Process-wide audio constants and the shared time conversions.
//!
//! Every component (synthesizers, the compositor and the codec) goes through these
//! helpers so that beat and frame arithmetic is bit-identical across call sites.

/// Frames per second of every rendered buffer.
pub const FRAMERATE: u32 = 44_100;

/// Bytes per sample (signed 16-bit PCM).
pub const SAMPLE_WIDTH: usize = 2;

/// Largest MIDI value accepted for pitch, volume, gain and channel fields.
pub const MIDI_MAX: u8 = 127;

/// Convert a length in beats to seconds at the given tempo.
///
/// # Examples
/// ```
/// use cadenza_core::constants::beats_to_seconds;
///
/// assert_eq!(beats_to_seconds(120, 1.0), 0.5);
/// assert_eq!(beats_to_seconds(60, 2.0), 2.0);
/// ```
pub fn beats_to_seconds(bpm: u32, beats: f32) -> f64 {
    60.0 / f64::from(bpm) * f64::from(beats)
}

/// Convert seconds to a whole number of frames, truncating toward zero.
pub fn seconds_to_frames(seconds: f64) -> usize {
    if seconds <= 0.0 || !seconds.is_finite() {
        return 0;
    }
    (seconds * f64::from(FRAMERATE)) as usize
}

/// Convert a frame count back to seconds.
pub fn frames_to_seconds(frames: usize) -> f64 {
    frames as f64 / f64::from(FRAMERATE)
}

/// Round a beat value to 6 decimal digits.
///
/// 32-bit floats cannot hold most decimal fractions exactly; rounding before
/// storing and after loading makes persistence idempotent.
pub fn round6(value: f32) -> f32 {
    ((f64::from(value) * 1e6).round() / 1e6) as f32
}

/// Convert a MIDI note number to frequency in Hz (A4 = 69 = 440 Hz).
pub fn midi_to_freq(midi_note: u8) -> f64 {
    440.0 * 2.0_f64.powf((f64::from(midi_note) - 69.0) / 12.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_beats_to_seconds() {
        assert_eq!(beats_to_seconds(120, 1.0), 0.5);
        assert_eq!(beats_to_seconds(60, 2.0), 2.0);
        assert_eq!(beats_to_seconds(60, 0.0), 0.0);
    }

    #[test]
    fn test_seconds_to_frames() {
        assert_eq!(seconds_to_frames(0.5), 22_050);
        assert_eq!(seconds_to_frames(1.0), 44_100);
        assert_eq!(seconds_to_frames(0.0), 0);
        assert_eq!(seconds_to_frames(-1.0), 0);
        assert_eq!(seconds_to_frames(f64::NAN), 0);
    }

    #[test]
    fn test_round6_is_idempotent() {
        for value in [0.1_f32, 1.0 / 3.0, 2.5, 17.123_456_7, 1234.567_9] {
            let once = round6(value);
            assert_eq!(round6(once), once, "round6 not idempotent for {}", value);
        }
        assert_eq!(round6(1.0 / 3.0), 0.333_333);
    }

    #[test]
    fn test_midi_to_freq() {
        assert!((midi_to_freq(69) - 440.0).abs() < 0.001);
        assert!((midi_to_freq(60) - 261.626).abs() < 0.01);
        assert!((midi_to_freq(57) - 220.0).abs() < 0.001);
    }
}
