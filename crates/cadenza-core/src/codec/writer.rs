//! Binary encoder for compositions.

use std::io::{self, Write};

use byteorder::{BigEndian, ByteOrder, WriteBytesExt};

use super::{FORMAT_VERSION, MAGIC, NOTE_SIZE};
use crate::constants::round6;
use crate::music::Music;
use crate::note::Note;
use crate::synth::{Engine, Synthesizer};
use crate::track::Track;

/// Writes a complete composition file.
pub fn write_music<W: Write>(writer: &mut W, music: &Music) -> io::Result<()> {
    writer.write_all(MAGIC)?;
    writer.write_u8(FORMAT_VERSION)?;
    writer.write_i32::<BigEndian>(to_i32("bpm", music.bpm() as usize)?)?;
    writer.write_i32::<BigEndian>(to_i32("track count", music.tracks().len())?)?;
    for track in music.tracks() {
        write_track(writer, track)?;
    }
    Ok(())
}

/// Encodes a composition to bytes.
pub fn encode_music(music: &Music) -> io::Result<Vec<u8>> {
    let mut buffer = Vec::new();
    write_music(&mut buffer, music)?;
    Ok(buffer)
}

/// Encodes one note: `[pitch code][volume][start f32][duration f32]`.
///
/// Pitch code 0 is silence; any pitch `p` is stored as `p + 1`.
pub fn encode_note(note: &Note) -> [u8; NOTE_SIZE] {
    let mut bytes = [0u8; NOTE_SIZE];
    bytes[0] = note.pitch().map_or(0, |pitch| pitch + 1);
    bytes[1] = note.volume();
    BigEndian::write_f32(&mut bytes[2..6], round6(note.start()));
    BigEndian::write_f32(&mut bytes[6..10], round6(note.duration()));
    bytes
}

/// Encodes one track with its length-prefixed synthesizer and notes blocks.
pub fn encode_track(track: &Track) -> io::Result<Vec<u8>> {
    let mut buffer = Vec::new();
    write_track(&mut buffer, track)?;
    Ok(buffer)
}

fn write_track<W: Write>(writer: &mut W, track: &Track) -> io::Result<()> {
    let synth_block = encode_synthesizer(track.synthesizer())?;
    writer.write_i32::<BigEndian>(to_i32("synthesizer block length", synth_block.len())?)?;
    writer.write_all(&synth_block)?;

    let notes_len = track.notes().len() * NOTE_SIZE;
    writer.write_i32::<BigEndian>(to_i32("notes block length", notes_len)?)?;
    for note in track.notes() {
        writer.write_all(&encode_note(note))?;
    }
    Ok(())
}

/// Encodes a synthesizer block: type tag, shared settings, then variant fields.
pub fn encode_synthesizer(synth: &Synthesizer) -> io::Result<Vec<u8>> {
    let mut block = Vec::new();
    let settings = synth.settings();
    block.write_u8(synth.kind().tag())?;
    block.write_u8(settings.beat().index())?;
    block.write_u8(settings.gain())?;
    block.write_u8(u8::from(settings.use_fixed_volume()))?;
    block.write_u8(settings.fixed_volume())?;

    match synth.engine() {
        Engine::Chiptune(engine) => {
            block.write_u8(engine.waveform().code())?;
        }
        Engine::ImpactModel(engine) => {
            block.write_u8(u8::from(engine.is_seeded()))?;
            block.write_u32::<BigEndian>(engine.seed())?;
        }
        Engine::SoundFont(engine) => {
            block.write_u8(engine.channel())?;
            block.write_u8(engine.bank())?;
            block.write_u8(engine.preset())?;
            write_string(&mut block, engine.path())?;
        }
        Engine::PluginHost(engine) => {
            block.write_u8(engine.channel())?;
            block.write_u16::<BigEndian>(engine.block_size())?;
            block.write_i32::<BigEndian>(to_i32("parameter count", engine.parameters().len())?)?;
            for &value in engine.parameters() {
                block.write_f32::<BigEndian>(value)?;
            }
            write_string(&mut block, engine.path())?;
        }
    }
    Ok(block)
}

fn write_string<W: Write>(writer: &mut W, value: &str) -> io::Result<()> {
    writer.write_i32::<BigEndian>(to_i32("string length", value.len())?)?;
    writer.write_all(value.as_bytes())
}

fn to_i32(field: &str, value: usize) -> io::Result<i32> {
    i32::try_from(value).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} {} does not fit in a signed 32-bit field", field, value),
        )
    })
}
