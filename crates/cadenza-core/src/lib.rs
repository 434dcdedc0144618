//! Cadenza Core - Step Sequencer Composition and Rendering
//!
//! This crate turns time-stamped notes, grouped into tracks that each own a
//! pluggable synthesizer, into a single PCM waveform, and persists compositions in
//! a compact big-endian binary format.
//!
//! # Rendering
//!
//! - Each [`Synthesizer`] converts a [`Note`] into PCM audio at [`FRAMERATE`],
//!   resolving the note's length from beats and its effective volume from the
//!   synthesizer's gain and fixed-volume settings.
//! - A [`Track`] composes its notes in list order: a note that starts at or past
//!   the current end is appended (gaps are not filled), a note inside the existing
//!   audio is mixed in, and a note straddling the end is mixed then extended.
//! - [`Music`] renders each track independently and mixes them from offset 0.
//!
//! Silence and unavailable synthesizer backends both produce empty buffers, which
//! compositing skips.
//!
//! # Determinism
//!
//! Chiptune and SoundFont rendering, and impact rendering with a fixed seed, are
//! byte-identical across runs. Randomness comes from PCG32 streams seeded through
//! BLAKE3 derivation.
//!
//! # Example
//!
//! ```
//! use cadenza_core::{codec, Music, Note, Synthesizer, SynthesizerKind, Track};
//!
//! let mut track = Track::new(Synthesizer::new(SynthesizerKind::Chiptune));
//! track.push_note(Note::new(Some(60), 0.0, 1.0, 127).unwrap());
//! track.push_note(Note::new(Some(64), 0.0, 1.0, 127).unwrap());
//!
//! let mut music = Music::new(120).unwrap();
//! music.push_track(track);
//!
//! let audio = music.compose();
//! assert_eq!(audio.frames(), 22_050);
//!
//! let bytes = codec::encode_music(&music).unwrap();
//! assert_eq!(codec::decode_music(&bytes).unwrap(), music);
//! ```
//!
//! # Module Structure
//!
//! - [`constants`]: Frame rate and beat/second/frame conversions
//! - [`beat`]: The fixed set of beat fractions
//! - [`note`]: Notes and their invariants
//! - [`pcm`]: Interleaved 16-bit buffers and mixing
//! - [`synth`]: Synthesizer settings, engines and backends
//! - [`track`]: Tracks and the compositor
//! - [`music`]: Compositions and the mixdown
//! - [`codec`]: Binary file format
//! - [`midi`]: Standard MIDI file export

pub mod beat;
pub mod codec;
pub mod constants;
pub mod error;
pub mod midi;
pub mod music;
pub mod note;
pub mod pcm;
pub mod rng;
pub mod synth;
pub mod track;

pub use beat::Beat;
pub use constants::{beats_to_seconds, seconds_to_frames, FRAMERATE, SAMPLE_WIDTH};
pub use error::{BackendError, CodecError, CodecResult, ModelError};
pub use music::Music;
pub use note::Note;
pub use pcm::PcmBuffer;
pub use synth::{
    Backends, Engine, NoteAudio, NoteRenderer, SynthSettings, Synthesizer, SynthesizerKind,
    Unavailable,
};
pub use track::Track;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
