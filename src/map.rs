use std::sync::OnceLock;

use crate::MAX_CODEPOINT;
use crate::config::DatasetConfig;
use crate::decompress::{DEFAULT_CHUNK_SIZE, StreamingDecoder};
use crate::error::LookupError;
use crate::ranges::RangeRules;
use crate::scan::{MAX_NAME_LEN, TableScanner};
use crate::table::{CompressedTable, ResourceProvider};

type Result<T> = core::result::Result<T, LookupError>;

/// Bidirectional map between codepoints and their names.
///
/// Algorithmic ranges are answered directly; everything else is a single
/// linear scan of the compressed table, which is loaded once per map and
/// decompressed afresh for every lookup. A `NameMap` is `Sync`, so one
/// instance can serve any number of threads.
#[derive(Debug)]
pub struct NameMap {
    rules: RangeRules,
    table: CompressedTable,
    chunk_size: usize,
}

impl NameMap {
    pub fn new(rules: RangeRules, table: CompressedTable) -> Self {
        Self {
            rules,
            table,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// A map over the embedded Unicode 14.0.0 table.
    pub fn embedded() -> Self {
        Self::new(DatasetConfig::default().rules(), CompressedTable::embedded())
    }

    /// A map over the table `config` describes, read through `provider`.
    pub fn from_config(config: &DatasetConfig, provider: impl ResourceProvider + 'static) -> Self {
        let mut table = CompressedTable::new(provider, config.resource.clone(), config.table_len);
        if let Some(crc32) = config.table_crc32 {
            table = table.with_checksum(crc32);
        }
        Self::new(config.rules(), table)
    }

    /// The process-wide embedded map.
    pub fn global() -> &'static Self {
        static MAP: OnceLock<NameMap> = OnceLock::new();
        MAP.get_or_init(Self::embedded)
    }

    /// Sets the decoder's chunk size for subsequent lookups.
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub const fn rules(&self) -> &RangeRules {
        &self.rules
    }

    pub const fn table(&self) -> &CompressedTable {
        &self.table
    }

    /// Codepoint of the character named `name`.
    ///
    /// Superseded alias names resolve to the same codepoint as the current
    /// name.
    pub fn code(&self, name: &str) -> Result<u32> {
        if let Some(code) = self.rules.code(name) {
            return Ok(code);
        }
        if name.is_empty() || name.len() > usize::from(MAX_NAME_LEN) {
            return Err(LookupError::NoSuchCharacter(name.to_owned()));
        }
        self.scanner()?
            .find_code(name)?
            .ok_or_else(|| LookupError::NoSuchCharacter(name.to_owned()))
    }

    /// Canonical name of `code`.
    pub fn name(&self, code: u32) -> Result<String> {
        if code > MAX_CODEPOINT {
            return Err(LookupError::InvalidCodepoint(i64::from(code)));
        }
        if let Some(name) = self.rules.name(code) {
            return Ok(name);
        }
        self.scanner()?
            .find_name(code)?
            .ok_or_else(|| LookupError::NoSuchCharacter(format!("U+{code:04X}")))
    }

    fn scanner(&self) -> Result<TableScanner<StreamingDecoder<'_>>> {
        let blob = self.table.bytes()?;
        Ok(TableScanner::new(StreamingDecoder::with_chunk_size(
            blob,
            self.chunk_size,
        )))
    }
}
