use std::io;

use thiserror::Error;

/// Failure of a `code`/`name` lookup.
#[derive(Error, Debug)]
pub enum LookupError {
    /// Well-formed input that names no character.
    #[error("No such character: {0}")]
    NoSuchCharacter(String),

    #[error("Codepoint {0} is outside 0..=0x10FFFF")]
    InvalidCodepoint(i64),

    /// The name table could not be read (missing, unreadable, wrong length).
    #[error("Name database unavailable")]
    DatabaseUnavailable(#[source] io::Error),

    /// The name table was read but fails its checksum or does not decode to a
    /// valid record stream.
    #[error("Name database corrupt")]
    DatabaseCorrupt(#[source] CorruptionError),
}

impl From<CorruptionError> for LookupError {
    fn from(err: CorruptionError) -> Self {
        Self::DatabaseCorrupt(err)
    }
}

/// A structural fault found while decoding or scanning the name table.
#[derive(Error, Debug)]
pub enum CorruptionError {
    #[error("Table checksum {actual:#010X} does not match {expected:#010X}")]
    Checksum { expected: u32, actual: u32 },

    #[error("Raw deflate stream rejected")]
    Inflate(#[from] flate2::DecompressError),

    #[error("Compressed input ended before the end-of-data marker")]
    TruncatedStream,

    #[error("Record stream ended inside a name record")]
    UnterminatedName,

    #[error("Record stream ended inside a skip record")]
    UnterminatedSkip,

    #[error("Record cursor left the codepoint range")]
    CursorOutOfRange,

    #[error("Name record is not ASCII")]
    InvalidName,
}

/// Failure while encoding a name table.
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("Codepoint {0:#X} is outside 0..=0x10FFFF")]
    InvalidCodepoint(u32),

    #[error("Invalid character name {0:?}")]
    InvalidName(String),

    #[error("Codepoint {0:#06X} already has a name")]
    DuplicateCode(u32),

    #[error("Name {0:?} is already assigned")]
    DuplicateName(String),

    #[error("Alias for unnamed codepoint {0:#06X}")]
    AliasWithoutName(u32),

    #[error("Line {line}: {reason}")]
    Malformed { line: usize, reason: String },

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Failure while reading a dataset profile.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("Invalid dataset profile")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid ideograph block {prefix:?} {first:#X}..={last:#X}")]
    InvalidBlock { prefix: String, first: u32, last: u32 },
}
