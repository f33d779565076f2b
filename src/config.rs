//! Dataset profiles.
//!
//! A profile ties a compressed table to the algorithmic rules it was built
//! against. Ideograph blocks change between Unicode versions, so they live
//! here instead of in code.
//!
//! ```toml
//! resource = "names.data"
//! table_len = 154696
//! table_crc32 = 0x9A71DBA3
//! unicode_version = "14.0.0"
//!
//! [[ideographs]]
//! prefix = "CJK UNIFIED IDEOGRAPH-"
//! first = 0x4E00
//! last = 0x9FFF
//! ```

use std::path::Path;

use serde::Deserialize;

use crate::MAX_CODEPOINT;
use crate::error::ConfigError;
use crate::ranges::{IdeographBlock, RangeRules, SYLLABLE_BASE, SYLLABLE_COUNT};
use crate::table::{EMBEDDED_TABLE_CRC32, EMBEDDED_TABLE_LEN, RESOURCE_NAME};

const CJK_UNIFIED: &str = "CJK UNIFIED IDEOGRAPH-";
const CJK_COMPATIBILITY: &str = "CJK COMPATIBILITY IDEOGRAPH-";
const TANGUT: &str = "TANGUT IDEOGRAPH-";
const KHITAN: &str = "KHITAN SMALL SCRIPT CHARACTER-";
const NUSHU: &str = "NUSHU CHARACTER-";

/// Ideograph blocks of Unicode 14.0.0.
const UNICODE_14_IDEOGRAPHS: &[(&str, u32, u32)] = &[
    (CJK_UNIFIED, 0x3400, 0x4DBF),
    (CJK_UNIFIED, 0x4E00, 0x9FFF),
    (CJK_UNIFIED, 0x20000, 0x2A6DF),
    (CJK_UNIFIED, 0x2A700, 0x2B738),
    (CJK_UNIFIED, 0x2B740, 0x2B81D),
    (CJK_UNIFIED, 0x2B820, 0x2CEA1),
    (CJK_UNIFIED, 0x2CEB0, 0x2EBE0),
    (CJK_UNIFIED, 0x30000, 0x3134A),
    (CJK_COMPATIBILITY, 0xF900, 0xFA6D),
    (CJK_COMPATIBILITY, 0xFA70, 0xFAD9),
    (CJK_COMPATIBILITY, 0x2F800, 0x2FA1D),
    (TANGUT, 0x17000, 0x187F7),
    (TANGUT, 0x18D00, 0x18D08),
    (KHITAN, 0x18B00, 0x18CD5),
    (NUSHU, 0x1B170, 0x1B2FB),
];

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatasetConfig {
    #[serde(default = "default_resource")]
    pub resource: String,

    /// Exact byte length of the compressed table.
    pub table_len: usize,

    /// CRC-32 the compressed table must match. Without one, corruption is
    /// only caught where it breaks the record grammar.
    #[serde(default)]
    pub table_crc32: Option<u32>,

    #[serde(default)]
    pub unicode_version: Option<String>,

    #[serde(default)]
    pub ideographs: Vec<IdeographBlock>,

    #[serde(default = "default_true")]
    pub hangul_syllables: bool,
}

fn default_resource() -> String {
    RESOURCE_NAME.to_owned()
}

const fn default_true() -> bool {
    true
}

impl Default for DatasetConfig {
    /// The profile of the embedded Unicode 14.0.0 table.
    fn default() -> Self {
        Self {
            resource: default_resource(),
            table_len: EMBEDDED_TABLE_LEN,
            table_crc32: Some(EMBEDDED_TABLE_CRC32),
            unicode_version: Some("14.0.0".to_owned()),
            ideographs: UNICODE_14_IDEOGRAPHS
                .iter()
                .map(|&(prefix, first, last)| IdeographBlock::new(prefix, first, last))
                .collect(),
            hangul_syllables: true,
        }
    }
}

impl DatasetConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(
            path = %path.as_ref().display(),
            version = ?config.unicode_version,
            blocks = config.ideographs.len(),
            "Loaded dataset profile"
        );
        Ok(config)
    }

    /// Checks that every ideograph block is a non-empty, in-range interval
    /// with a prefix, and that no codepoint falls under two rules.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let syllables = SYLLABLE_BASE..SYLLABLE_BASE + SYLLABLE_COUNT;
        for block in &self.ideographs {
            let malformed =
                block.prefix.is_empty() || block.first > block.last || block.last > MAX_CODEPOINT;
            let in_syllables = self.hangul_syllables
                && block.first < syllables.end
                && block.last >= syllables.start;
            if malformed || in_syllables {
                return Err(invalid_block(block));
            }
        }

        let mut sorted: Vec<&IdeographBlock> = self.ideographs.iter().collect();
        sorted.sort_by_key(|block| block.first);
        for pair in sorted.windows(2) {
            if pair[1].first <= pair[0].last {
                return Err(invalid_block(pair[1]));
            }
        }
        Ok(())
    }

    pub fn rules(&self) -> RangeRules {
        RangeRules::new(self.ideographs.clone(), self.hangul_syllables)
    }
}

fn invalid_block(block: &IdeographBlock) -> ConfigError {
    ConfigError::InvalidBlock {
        prefix: block.prefix.clone(),
        first: block.first,
        last: block.last,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shipped_profile_matches_default() {
        let text = include_str!("../data/unicode-14.0.toml");
        let config = DatasetConfig::from_toml_str(text).unwrap();
        assert_eq!(config, DatasetConfig::default());
    }

    #[test]
    fn test_minimal_profile() {
        let config = DatasetConfig::from_toml_str("table_len = 10").unwrap();
        assert_eq!(config.resource, RESOURCE_NAME);
        assert!(config.hangul_syllables);
        assert!(config.ideographs.is_empty());
        assert_eq!(config.unicode_version, None);
        assert_eq!(config.table_crc32, None);
    }

    #[test]
    fn test_legacy_profile() {
        let text = r#"
            resource = "names-2.1.data"
            table_len = 39000
            unicode_version = "2.1"

            [[ideographs]]
            prefix = "CJK UNIFIED IDEOGRAPH-"
            first = 0x4E00
            last = 0x9FA5
        "#;
        let config = DatasetConfig::from_toml_str(text).unwrap();
        let rules = config.rules();
        assert_eq!(rules.code("CJK UNIFIED IDEOGRAPH-9FA5"), Some(0x9FA5));
        assert_eq!(rules.code("CJK UNIFIED IDEOGRAPH-9FA6"), None);
        assert_eq!(rules.code("CJK UNIFIED IDEOGRAPH-3400"), None);
    }

    #[test]
    fn test_rejects_bad_blocks() {
        let reversed = r#"
            table_len = 1
            [[ideographs]]
            prefix = "X-"
            first = 0x200
            last = 0x100
        "#;
        assert!(matches!(
            DatasetConfig::from_toml_str(reversed),
            Err(ConfigError::InvalidBlock { .. })
        ));

        let unprefixed = r#"
            table_len = 1
            [[ideographs]]
            prefix = ""
            first = 0x100
            last = 0x200
        "#;
        assert!(matches!(
            DatasetConfig::from_toml_str(unprefixed),
            Err(ConfigError::InvalidBlock { .. })
        ));
    }

    #[test]
    fn test_rejects_overlapping_blocks() {
        let overlapping = r#"
            table_len = 1
            [[ideographs]]
            prefix = "A-"
            first = 0x4E00
            last = 0x9FFF
            [[ideographs]]
            prefix = "B-"
            first = 0x9F00
            last = 0xA000
        "#;
        assert!(matches!(
            DatasetConfig::from_toml_str(overlapping),
            Err(ConfigError::InvalidBlock { first: 0x9F00, .. })
        ));

        let over_hangul = r#"
            table_len = 1
            [[ideographs]]
            prefix = "X-"
            first = 0xD7A3
            last = 0xD7FF
        "#;
        assert!(matches!(
            DatasetConfig::from_toml_str(over_hangul),
            Err(ConfigError::InvalidBlock { first: 0xD7A3, .. })
        ));

        // Without syllable rules the same range is free.
        let config =
            DatasetConfig::from_toml_str(&format!("hangul_syllables = false\n{over_hangul}"))
                .unwrap();
        assert_eq!(config.rules().code("X-D7A3"), Some(0xD7A3));

        let adjacent = r#"
            table_len = 1
            [[ideographs]]
            prefix = "A-"
            first = 0x100
            last = 0x1FF
            [[ideographs]]
            prefix = "B-"
            first = 0x200
            last = 0x2FF
        "#;
        assert!(DatasetConfig::from_toml_str(adjacent).is_ok());
    }

    #[test]
    fn test_rejects_unknown_keys() {
        assert!(matches!(
            DatasetConfig::from_toml_str("table_len = 1\ncompression = \"gzip\""),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            DatasetConfig::from_toml_str("resource = \"x\""),
            Err(ConfigError::Parse(_))
        ));
    }
}
