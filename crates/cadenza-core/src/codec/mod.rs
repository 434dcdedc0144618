//! Binary composition file format.
//!
//! All multi-byte integers are big-endian and floats are 32-bit IEEE-754.
//!
//! ```text
//! file        = magic "CDNZ" | version u8 | bpm i32 | track_count i32 | track*
//! track       = synth_len i32 | synth_block | notes_len i32 | note*
//! synth_block = tag u8 | beat u8 | gain u8 | use_fixed u8 | fixed_volume u8 | variant
//! note        = pitch_code u8 | volume u8 | start f32 | duration f32
//! ```
//!
//! Variant fields by tag:
//! - 0 Chiptune: `waveform u8`
//! - 1 ImpactModel: `seeded u8 | seed u32`
//! - 2 SoundFont: `channel u8 | bank u8 | preset u8 | path_len i32 | path`
//! - 3 PluginHost: `channel u8 | block_size u16 | count i32 | f32*count | path_len i32 | path`
//!
//! Note times are rounded to 6 decimal digits when written and when read, so
//! encode, decode, encode produces identical bytes.

mod reader;
mod writer;

use std::fs;
use std::path::Path;

use crate::error::CodecResult;
use crate::music::Music;

pub use reader::{decode_music, decode_note, decode_synthesizer, decode_track};
pub use writer::{encode_music, encode_note, encode_synthesizer, encode_track, write_music};

/// File identifier.
pub const MAGIC: &[u8; 4] = b"CDNZ";

/// Current format version.
pub const FORMAT_VERSION: u8 = 1;

/// Encoded size of one note in bytes.
pub const NOTE_SIZE: usize = 10;

/// Reads and decodes a composition file.
pub fn load_music(path: impl AsRef<Path>) -> CodecResult<Music> {
    let bytes = fs::read(path)?;
    decode_music(&bytes)
}

/// Encodes a composition and writes it in one call.
pub fn save_music(path: impl AsRef<Path>, music: &Music) -> CodecResult<()> {
    let bytes = encode_music(music)?;
    fs::write(path, bytes)?;
    Ok(())
}

/// BLAKE3 hex digest of an encoded composition.
pub fn hash_bytes(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}

/// BLAKE3 hash of a composition's encoded bytes.
pub fn compute_hash(music: &Music) -> CodecResult<String> {
    Ok(hash_bytes(&encode_music(music)?))
}
