//! Binary decoder for compositions.
//!
//! Every read is bounds-checked; malformed input is reported as a [`CodecError`]
//! and never substituted with defaults.

use byteorder::{BigEndian, ByteOrder};

use super::{FORMAT_VERSION, MAGIC, NOTE_SIZE};
use crate::beat::Beat;
use crate::constants::round6;
use crate::error::{CodecError, CodecResult};
use crate::music::Music;
use crate::note::Note;
use crate::synth::{
    Chiptune, Engine, ImpactModel, PluginHost, SoundFont, SynthSettings, Synthesizer,
    SynthesizerKind, Waveform,
};
use crate::track::Track;

/// Smallest possible encoded track: two empty length prefixes.
const MIN_TRACK_SIZE: usize = 8;

/// Cursor over an input slice.
struct ByteReader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> ByteReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    fn take(&mut self, needed: usize) -> CodecResult<&'a [u8]> {
        if needed > self.remaining() {
            return Err(CodecError::Truncated {
                offset: self.offset,
                needed,
                available: self.remaining(),
            });
        }
        let bytes = &self.data[self.offset..self.offset + needed];
        self.offset += needed;
        Ok(bytes)
    }

    fn u8(&mut self) -> CodecResult<u8> {
        Ok(self.take(1)?[0])
    }

    fn bool(&mut self, field: &'static str) -> CodecResult<bool> {
        match self.u8()? {
            0 => Ok(false),
            1 => Ok(true),
            value => Err(CodecError::InvalidBool { field, value }),
        }
    }

    fn u16(&mut self) -> CodecResult<u16> {
        Ok(BigEndian::read_u16(self.take(2)?))
    }

    fn u32(&mut self) -> CodecResult<u32> {
        Ok(BigEndian::read_u32(self.take(4)?))
    }

    fn i32(&mut self) -> CodecResult<i32> {
        Ok(BigEndian::read_i32(self.take(4)?))
    }

    fn f32(&mut self) -> CodecResult<f32> {
        Ok(BigEndian::read_f32(self.take(4)?))
    }

    /// Reads an `i32` length prefix.
    fn length(&mut self, field: &'static str) -> CodecResult<usize> {
        let length = self.i32()?;
        usize::try_from(length).map_err(|_| CodecError::NegativeLength { field, length })
    }

    fn string(&mut self) -> CodecResult<String> {
        let length = self.length("path")?;
        let bytes = self.take(length)?;
        Ok(String::from_utf8(bytes.to_vec())?)
    }

    fn finish(&self) -> CodecResult<()> {
        match self.remaining() {
            0 => Ok(()),
            count => Err(CodecError::TrailingBytes { count }),
        }
    }
}

/// Decodes a complete composition file.
///
/// # Errors
/// Returns an error for a missing header, truncated or trailing data, negative
/// lengths, unknown synthesizer tags, or any value outside the model's ranges.
pub fn decode_music(data: &[u8]) -> CodecResult<Music> {
    let mut reader = ByteReader::new(data);
    read_header(&mut reader)?;

    let bpm = reader.i32()?;
    let bpm = u32::try_from(bpm).map_err(|_| CodecError::InvalidCount {
        field: "bpm",
        value: bpm,
    })?;
    let track_count = reader.i32()?;
    let track_count = usize::try_from(track_count).map_err(|_| CodecError::InvalidCount {
        field: "track count",
        value: track_count,
    })?;

    let mut tracks = Vec::with_capacity(track_count.min(reader.remaining() / MIN_TRACK_SIZE));
    for _ in 0..track_count {
        tracks.push(read_track(&mut reader)?);
    }
    reader.finish()?;

    Ok(Music::with_tracks(bpm, tracks)?)
}

fn read_header(reader: &mut ByteReader<'_>) -> CodecResult<()> {
    if reader.remaining() < MAGIC.len() {
        return Err(CodecError::InvalidMagic {
            found: reader.data.to_vec(),
        });
    }
    let magic = reader.take(MAGIC.len())?;
    if magic != MAGIC {
        return Err(CodecError::InvalidMagic {
            found: magic.to_vec(),
        });
    }
    match reader.u8()? {
        FORMAT_VERSION => Ok(()),
        version => Err(CodecError::UnsupportedVersion(version)),
    }
}

/// Decodes exactly one encoded track.
pub fn decode_track(data: &[u8]) -> CodecResult<Track> {
    let mut reader = ByteReader::new(data);
    let track = read_track(&mut reader)?;
    reader.finish()?;
    Ok(track)
}

/// Reads one track, consuming `4 + synth_block_len + 4 + notes_block_len` bytes.
fn read_track(reader: &mut ByteReader<'_>) -> CodecResult<Track> {
    let synth_len = reader.length("synthesizer block")?;
    let synthesizer = decode_synthesizer(reader.take(synth_len)?)?;

    let notes_len = reader.length("notes block")?;
    if notes_len % NOTE_SIZE != 0 {
        return Err(CodecError::NotesBlockLength {
            length: notes_len,
            note_size: NOTE_SIZE,
        });
    }
    let notes = reader
        .take(notes_len)?
        .chunks_exact(NOTE_SIZE)
        .map(decode_note)
        .collect::<CodecResult<Vec<_>>>()?;

    Ok(Track::with_notes(synthesizer, notes))
}

/// Decodes one 10-byte note.
pub fn decode_note(bytes: &[u8]) -> CodecResult<Note> {
    let mut reader = ByteReader::new(bytes);
    let pitch = match reader.u8()? {
        0 => None,
        code => Some(code - 1),
    };
    let volume = reader.u8()?;
    let start = round6(reader.f32()?);
    let duration = round6(reader.f32()?);
    reader.finish()?;
    Ok(Note::new(pitch, start, duration, volume)?)
}

/// Decodes a synthesizer block.
pub fn decode_synthesizer(block: &[u8]) -> CodecResult<Synthesizer> {
    if block.is_empty() {
        return Err(CodecError::EmptySynthBlock);
    }
    let mut reader = ByteReader::new(block);
    let tag = reader.u8()?;
    let kind = SynthesizerKind::from_tag(tag).ok_or(CodecError::UnknownSynthesizer { tag })?;

    let beat_index = reader.u8()?;
    let beat = Beat::from_index(beat_index).ok_or(CodecError::InvalidBeat(beat_index))?;
    let gain = reader.u8()?;
    let use_fixed_volume = reader.bool("use fixed volume")?;
    let fixed_volume = reader.u8()?;
    let settings = SynthSettings::new(beat, gain, use_fixed_volume, fixed_volume)?;

    let engine = match kind {
        SynthesizerKind::Chiptune => {
            let code = reader.u8()?;
            let waveform = Waveform::from_code(code).ok_or(CodecError::InvalidWaveform(code))?;
            Engine::Chiptune(Chiptune::new(waveform))
        }
        SynthesizerKind::ImpactModel => {
            let seeded = reader.bool("seeded")?;
            let seed = reader.u32()?;
            let mut engine = ImpactModel::seeded(seed);
            engine.set_seeded(seeded);
            Engine::ImpactModel(engine)
        }
        SynthesizerKind::SoundFont => {
            let channel = reader.u8()?;
            let bank = reader.u8()?;
            let preset = reader.u8()?;
            let path = reader.string()?;
            Engine::SoundFont(SoundFont::new(path, channel, bank, preset)?)
        }
        SynthesizerKind::PluginHost => {
            let channel = reader.u8()?;
            let block_size = reader.u16()?;
            let count = reader.length("parameter count")?;
            let needed = count.checked_mul(4).unwrap_or(usize::MAX);
            let parameters = reader
                .take(needed)?
                .chunks_exact(4)
                .map(BigEndian::read_f32)
                .collect();
            let path = reader.string()?;
            Engine::PluginHost(PluginHost::new(path, channel, block_size, parameters)?)
        }
    };

    if reader.remaining() > 0 {
        return Err(CodecError::SynthBlockTrailing {
            count: reader.remaining(),
        });
    }
    Ok(Synthesizer::with_engine(engine).with_settings(settings))
}
