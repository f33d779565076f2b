use std::collections::{BTreeMap, HashSet};
use std::io::{self, Write};

use flate2::Compression;
use flate2::write::DeflateEncoder;

use crate::MAX_CODEPOINT;
use crate::error::BuildError;
use crate::scan::{ALIAS_MARKER, MAX_NAME_LEN, MAX_SKIP, SKIP_MARKER_MIN};

type Result<T> = core::result::Result<T, BuildError>;

/// Accumulates codepoint names and encodes them as a record stream.
///
/// Each codepoint has one canonical name and any number of aliases; every
/// name in the table is unique.
#[derive(Debug, Clone, Default)]
pub struct TableBuilder {
    // Canonical name first, then aliases in insertion order.
    entries: BTreeMap<u32, Vec<String>>,
    names: HashSet<String>,
}

impl TableBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of named codepoints.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether any codepoint already carries `name`.
    #[must_use]
    pub fn contains_name(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    #[must_use]
    pub fn contains_code(&self, code: u32) -> bool {
        self.entries.contains_key(&code)
    }

    /// Gives `code` its canonical name.
    pub fn insert(&mut self, code: u32, name: impl Into<String>) -> Result<()> {
        let name = self.check(code, name.into())?;
        if self.entries.contains_key(&code) {
            return Err(BuildError::DuplicateCode(code));
        }
        self.names.insert(name.clone());
        self.entries.insert(code, vec![name]);
        Ok(())
    }

    /// Adds a superseded name for a codepoint that already has a canonical one.
    pub fn insert_alias(&mut self, code: u32, name: impl Into<String>) -> Result<()> {
        let name = self.check(code, name.into())?;
        let names = self
            .entries
            .get_mut(&code)
            .ok_or(BuildError::AliasWithoutName(code))?;
        self.names.insert(name.clone());
        names.push(name);
        Ok(())
    }

    fn check(&self, code: u32, name: String) -> Result<String> {
        if code > MAX_CODEPOINT {
            return Err(BuildError::InvalidCodepoint(code));
        }
        if !is_valid_name(&name) {
            return Err(BuildError::InvalidName(name));
        }
        if self.names.contains(&name) {
            return Err(BuildError::DuplicateName(name));
        }
        Ok(name)
    }

    /// Encodes the uncompressed record stream.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut output = Vec::new();
        let mut cursor = 0;

        for (&code, names) in &self.entries {
            // Gaps wider than one skip record takes are split.
            let mut gap = code - cursor;
            while gap > 0 {
                let step = gap.min(MAX_SKIP);
                output.push(SKIP_MARKER_MIN + (step >> 8) as u8);
                output.push((step & 0xFF) as u8);
                gap -= step;
            }

            for (i, name) in names.iter().enumerate() {
                if i > 0 {
                    output.push(ALIAS_MARKER);
                }
                output.push(name.len() as u8);
                output.extend_from_slice(name.as_bytes());
            }

            cursor = code + 1;
        }

        output
    }

    /// Encodes and compresses the table into its on-disk form.
    pub fn build(&self) -> Result<Vec<u8>> {
        let records = self.encode();
        let mut output = Vec::with_capacity(records.len() / 4);
        compress(&records, &mut output)?;
        tracing::debug!(
            codepoints = self.len(),
            names = self.names.len(),
            records = records.len(),
            compressed = output.len(),
            "Built name table"
        );
        Ok(output)
    }
}

/// Compresses a record stream as raw deflate, appending to `output`.
pub fn compress(records: &[u8], output: &mut Vec<u8>) -> io::Result<()> {
    let mut encoder = DeflateEncoder::new(output, Compression::best());
    encoder.write_all(records)?;
    encoder.finish()?;
    Ok(())
}

/// Name records hold 1 to 90 bytes of `A-Z`, `0-9`, space and hyphen.
fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= usize::from(MAX_NAME_LEN)
        && name
            .bytes()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit() || b == b' ' || b == b'-')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decompress::StreamingDecoder;
    use crate::scan::{RawChunks, TableScanner};

    #[test]
    fn test_encoding_layout() {
        let mut builder = TableBuilder::new();
        builder.insert(0, "NULL").unwrap();
        builder.insert(2, "B").unwrap();
        builder.insert_alias(2, "BEE").unwrap();
        builder.insert(1, "A").unwrap();

        assert_eq!(builder.encode(), b"\x04NULL\x01A\x01B\xff\x03BEE".to_vec());
    }

    #[test]
    fn test_gap_encoding() {
        let mut builder = TableBuilder::new();
        builder.insert(0x20A8, "RUPEE SIGN").unwrap();
        let encoded = builder.encode();
        assert_eq!(&encoded[..2], &[SKIP_MARKER_MIN + 0x20, 0xA8]);
    }

    #[test]
    fn test_wide_gap_is_split() {
        let mut builder = TableBuilder::new();
        builder.insert(0xE01EF, "VARIATION SELECTOR-256").unwrap();
        let encoded = builder.encode();
        // 0xE01EF = 21 * MAX_SKIP + 0x8E04
        let skips = &encoded[..44];
        for pair in skips[..42].chunks(2) {
            assert_eq!(pair, &[0xFE, 0xFF]);
        }
        assert_eq!(&skips[42..], &[SKIP_MARKER_MIN + 0x8E, 0x04]);

        let scanner = TableScanner::new(RawChunks::new(&encoded, 5));
        assert_eq!(scanner.find_code("VARIATION SELECTOR-256").unwrap(), Some(0xE01EF));
    }

    #[test]
    fn test_rejections() {
        let mut builder = TableBuilder::new();
        builder.insert(0x41, "LATIN CAPITAL LETTER A").unwrap();

        assert!(matches!(
            builder.insert(0x41, "OTHER"),
            Err(BuildError::DuplicateCode(0x41))
        ));
        assert!(matches!(
            builder.insert(0x42, "LATIN CAPITAL LETTER A"),
            Err(BuildError::DuplicateName(_))
        ));
        assert!(matches!(
            builder.insert_alias(0x41, "LATIN CAPITAL LETTER A"),
            Err(BuildError::DuplicateName(_))
        ));
        assert!(matches!(
            builder.insert_alias(0x43, "SEE"),
            Err(BuildError::AliasWithoutName(0x43))
        ));
        assert!(matches!(
            builder.insert(0x110000, "TOO HIGH"),
            Err(BuildError::InvalidCodepoint(0x110000))
        ));
        let long = "X".repeat(91);
        for bad in ["", "lower case", "TAB\tHERE", "É", long.as_str()] {
            assert!(
                matches!(builder.insert(0x50, bad), Err(BuildError::InvalidName(_))),
                "{bad:?}"
            );
        }
        assert_eq!(builder.len(), 1);
    }

    #[test]
    fn test_build_decodes_back() {
        let mut builder = TableBuilder::new();
        for (i, code) in (0x100..0x400).step_by(3).enumerate() {
            builder.insert(code, format!("TEST CHARACTER {i}")).unwrap();
        }
        let blob = builder.build().unwrap();

        let mut decoder = StreamingDecoder::new(&blob);
        let mut decoded = Vec::new();
        loop {
            let n = decoder.pull().unwrap();
            if n == 0 {
                break;
            }
            decoded.extend_from_slice(&decoder.buffer()[..n]);
        }
        assert_eq!(decoded, builder.encode());
    }
}
