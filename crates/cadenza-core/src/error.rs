//! Error types for the composition model and the file format.

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// A value that would break a model invariant.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    /// Pitch outside the MIDI range.
    #[error("invalid pitch {pitch}: must be 0-127")]
    InvalidPitch {
        /// The rejected pitch.
        pitch: u8,
    },

    /// Volume outside the MIDI range.
    #[error("invalid volume {volume}: must be 0-127")]
    InvalidVolume {
        /// The rejected volume.
        volume: u8,
    },

    /// Negative or non-finite start offset.
    #[error("invalid note start {start}: must be a finite number of beats >= 0")]
    InvalidStart {
        /// The rejected start.
        start: f32,
    },

    /// Zero, negative or non-finite duration.
    #[error("invalid note duration {duration}: must be a finite number of beats > 0")]
    InvalidDuration {
        /// The rejected duration.
        duration: f32,
    },

    /// Tempo of zero.
    #[error("invalid bpm {bpm}: must be greater than 0")]
    InvalidBpm {
        /// The rejected tempo.
        bpm: u32,
    },

    /// A 0-127 synthesizer parameter was out of range.
    #[error("invalid {name} {value}: must be 0-127")]
    OutOfMidiRange {
        /// Parameter name.
        name: &'static str,
        /// The rejected value.
        value: u8,
    },

    /// A plugin parameter outside 0.0-1.0.
    #[error("invalid plugin parameter {index} = {value}: must be within 0.0-1.0")]
    InvalidPluginParameter {
        /// Parameter index.
        index: usize,
        /// The rejected value.
        value: f32,
    },

    /// Block size not offered by the plugin host.
    #[error("invalid plugin block size {size}: must be one of 256, 512, 1024")]
    InvalidBlockSize {
        /// The rejected size.
        size: u16,
    },

    /// A beat fraction that is not part of the beat set.
    #[error("unknown beat '{0}'")]
    UnknownBeat(String),
}

impl ModelError {
    /// Checks a 0-127 parameter.
    pub(crate) fn check_midi(name: &'static str, value: u8) -> Result<u8, ModelError> {
        if value > crate::constants::MIDI_MAX {
            Err(ModelError::OutOfMidiRange { name, value })
        } else {
            Ok(value)
        }
    }
}

/// Errors raised while decoding (or encoding) a composition file.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The magic identifier is missing.
    #[error("invalid magic identifier: expected \"CDNZ\", found {found:?}")]
    InvalidMagic {
        /// The bytes found instead.
        found: Vec<u8>,
    },

    /// The file was written by an unknown format version.
    #[error("unsupported format version {0}")]
    UnsupportedVersion(u8),

    /// The byte stream ended early.
    #[error("truncated input: needed {needed} bytes at offset {offset}, only {available} available")]
    Truncated {
        /// Offset of the read.
        offset: usize,
        /// Bytes required.
        needed: usize,
        /// Bytes left.
        available: usize,
    },

    /// A length prefix was negative.
    #[error("negative {field} length {length}")]
    NegativeLength {
        /// Which length prefix.
        field: &'static str,
        /// The value read.
        length: i32,
    },

    /// The notes block is not a whole number of notes.
    #[error("notes block length {length} is not a multiple of {note_size}")]
    NotesBlockLength {
        /// The block length read.
        length: usize,
        /// Encoded size of one note.
        note_size: usize,
    },

    /// Unrecognized synthesizer type tag.
    #[error("unknown synthesizer type tag {tag}")]
    UnknownSynthesizer {
        /// The tag read.
        tag: u8,
    },

    /// Synthesizer block was empty.
    #[error("empty synthesizer block")]
    EmptySynthBlock,

    /// Synthesizer block had bytes left after its fields.
    #[error("synthesizer block has {count} unread trailing bytes")]
    SynthBlockTrailing {
        /// Unread bytes.
        count: usize,
    },

    /// Bytes left after the last track.
    #[error("{count} trailing bytes after the last track")]
    TrailingBytes {
        /// Unread bytes.
        count: usize,
    },

    /// Invalid beat index.
    #[error("invalid beat index {0}")]
    InvalidBeat(u8),

    /// Invalid chiptune waveform code.
    #[error("invalid chiptune waveform code {0}")]
    InvalidWaveform(u8),

    /// Invalid boolean byte.
    #[error("invalid boolean byte {value} for {field}")]
    InvalidBool {
        /// Field name.
        field: &'static str,
        /// The byte read.
        value: u8,
    },

    /// Negative counts (bpm, track count).
    #[error("invalid {field} {value}")]
    InvalidCount {
        /// Field name.
        field: &'static str,
        /// The value read.
        value: i32,
    },

    /// A file path that is not valid UTF-8.
    #[error("path is not valid UTF-8")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    /// A decoded value violates a model invariant.
    #[error("invalid value: {0}")]
    Model(#[from] ModelError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CodecError {
    /// Stable diagnostic code for reporting.
    pub fn code(&self) -> &'static str {
        match self {
            CodecError::InvalidMagic { .. } => "CODEC_001",
            CodecError::UnsupportedVersion(_) => "CODEC_002",
            CodecError::Truncated { .. } => "CODEC_003",
            CodecError::NegativeLength { .. } => "CODEC_004",
            CodecError::NotesBlockLength { .. } => "CODEC_005",
            CodecError::UnknownSynthesizer { .. } => "CODEC_006",
            CodecError::EmptySynthBlock => "CODEC_007",
            CodecError::SynthBlockTrailing { .. } => "CODEC_008",
            CodecError::TrailingBytes { .. } => "CODEC_009",
            CodecError::InvalidBeat(_) => "CODEC_010",
            CodecError::InvalidWaveform(_) => "CODEC_011",
            CodecError::InvalidBool { .. } => "CODEC_012",
            CodecError::InvalidCount { .. } => "CODEC_013",
            CodecError::InvalidUtf8(_) => "CODEC_014",
            CodecError::Model(_) => "CODEC_015",
            CodecError::Io(_) => "CODEC_016",
        }
    }
}

/// Errors raised while loading an external sample bank or plugin.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The file could not be read as WAV.
    #[error("failed to read '{path}': {source}")]
    Wav {
        /// Resolved path.
        path: String,
        /// Underlying decoder error.
        #[source]
        source: hound::Error,
    },

    /// The file decoded but its format is not supported.
    #[error("unsupported audio format in '{path}': {message}")]
    Unsupported {
        /// Resolved path.
        path: String,
        /// What was wrong.
        message: String,
    },

    /// The file contained no samples.
    #[error("'{path}' contains no audio")]
    Empty {
        /// Resolved path.
        path: String,
    },

    /// A loader-specific failure.
    #[error("{0}")]
    Other(String),
}

impl BackendError {
    pub fn code(&self) -> &'static str {
        match self {
            BackendError::Wav { .. } => "BACKEND_001",
            BackendError::Unsupported { .. } => "BACKEND_002",
            BackendError::Empty { .. } => "BACKEND_003",
            BackendError::Other(_) => "BACKEND_004",
        }
    }
}
