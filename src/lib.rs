//! # Unicode Character Names
//!
//! `namemap` maps Unicode codepoints to their character names and back.
//!
//! Names that follow a formula, such as Hangul syllables and the ideograph
//! blocks, are computed. Every other name lives in a compressed table that
//! ships with the crate and is scanned, without being fully expanded, on each
//! lookup. Superseded Unicode 1.0 names and legacy aliases resolve to the same
//! codepoint as the current name.
//!
//! ## Example
//!
//! ```rust
//! assert_eq!(namemap::name(0x20A8).unwrap(), "RUPEE SIGN");
//! assert_eq!(namemap::code("RUPEE SIGN").unwrap(), 0x20A8);
//!
//! // Aliases map to the codepoint; the codepoint maps to its current name.
//! assert_eq!(namemap::code("PERIOD").unwrap(), 0x2E);
//! assert_eq!(namemap::name(0x2E).unwrap(), "FULL STOP");
//!
//! assert_eq!(namemap::code("HANGUL SYLLABLE GAG").unwrap(), 0xAC01);
//! ```

#![forbid(unsafe_code)]

pub mod compress;
pub mod config;
pub mod decompress;
pub mod error;
pub mod map;
pub mod ranges;
pub mod scan;
pub mod table;
pub mod ucd;

pub use compress::TableBuilder;
pub use config::DatasetConfig;
pub use decompress::StreamingDecoder;
pub use error::{BuildError, ConfigError, CorruptionError, LookupError};
pub use map::NameMap;
pub use ranges::{IdeographBlock, RangeRules};
pub use scan::{ChunkSource, RawChunks, TableScanner};
pub use table::{
    CompressedTable, DirectoryProvider, EmbeddedProvider, MemoryProvider, ResourceProvider,
};

/// Highest Unicode scalar position.
pub const MAX_CODEPOINT: u32 = 0x10FFFF;

/// Codepoint of the character named `name`, using the embedded table.
pub fn code(name: &str) -> Result<u32, LookupError> {
    NameMap::global().code(name)
}

/// Current name of `code`, using the embedded table.
pub fn name(code: u32) -> Result<String, LookupError> {
    NameMap::global().name(code)
}
