//! Loading and caching the compressed name table.

use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use flate2::Crc;

use crate::error::{CorruptionError, LookupError};

/// Resource name the table is stored under.
pub const RESOURCE_NAME: &str = "names.data";

/// Exact length of the embedded Unicode 14.0.0 table.
pub const EMBEDDED_TABLE_LEN: usize = 154_696;

/// CRC-32 of the embedded table.
pub const EMBEDDED_TABLE_CRC32: u32 = 0x9A71_DBA3;

static EMBEDDED_TABLE: &[u8] = include_bytes!("../data/names.data");

/// Source of named byte resources.
pub trait ResourceProvider: Send + Sync {
    fn open(&self, name: &str) -> io::Result<Box<dyn Read + '_>>;
}

/// Serves the table compiled into this crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedProvider;

impl ResourceProvider for EmbeddedProvider {
    fn open(&self, name: &str) -> io::Result<Box<dyn Read + '_>> {
        if name == RESOURCE_NAME {
            Ok(Box::new(EMBEDDED_TABLE))
        } else {
            Err(not_found(name))
        }
    }
}

/// Serves files from a directory.
#[derive(Debug, Clone)]
pub struct DirectoryProvider {
    root: PathBuf,
}

impl DirectoryProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ResourceProvider for DirectoryProvider {
    fn open(&self, name: &str) -> io::Result<Box<dyn Read + '_>> {
        Ok(Box::new(File::open(self.root.join(name))?))
    }
}

/// Serves one in-memory resource.
#[derive(Debug, Clone)]
pub struct MemoryProvider {
    name: String,
    bytes: Vec<u8>,
}

impl MemoryProvider {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }
}

impl ResourceProvider for MemoryProvider {
    fn open(&self, name: &str) -> io::Result<Box<dyn Read + '_>> {
        if name == self.name {
            Ok(Box::new(self.bytes.as_slice()))
        } else {
            Err(not_found(name))
        }
    }
}

fn not_found(name: &str) -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, format!("no resource named {name:?}"))
}

/// CRC-32 of `bytes`, as recorded in a dataset profile's `table_crc32`.
pub fn crc32(bytes: &[u8]) -> u32 {
    let mut crc = Crc::new();
    crc.update(bytes);
    crc.sum()
}

/// A compressed name table, read from its provider on first use and kept for
/// the table's lifetime.
///
/// Raw deflate carries no checksum of its own, so a table given one with
/// [`with_checksum`](Self::with_checksum) is verified before it is cached.
/// Concurrent first uses may each read the resource; the first to finish
/// becomes the cached copy and the others are dropped. A failed load caches
/// nothing, so a later call tries again.
pub struct CompressedTable {
    provider: Box<dyn ResourceProvider>,
    resource: String,
    expected_len: usize,
    checksum: Option<u32>,
    blob: OnceLock<Box<[u8]>>,
}

impl CompressedTable {
    pub fn new(
        provider: impl ResourceProvider + 'static,
        resource: impl Into<String>,
        expected_len: usize,
    ) -> Self {
        Self {
            provider: Box::new(provider),
            resource: resource.into(),
            expected_len,
            checksum: None,
            blob: OnceLock::new(),
        }
    }

    /// Requires the loaded bytes to have this CRC-32.
    #[must_use]
    pub fn with_checksum(mut self, crc32: u32) -> Self {
        self.checksum = Some(crc32);
        self
    }

    /// The Unicode 14.0.0 table shipped with this crate.
    pub fn embedded() -> Self {
        Self::new(EmbeddedProvider, RESOURCE_NAME, EMBEDDED_TABLE_LEN)
            .with_checksum(EMBEDDED_TABLE_CRC32)
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub const fn expected_len(&self) -> usize {
        self.expected_len
    }

    pub const fn checksum(&self) -> Option<u32> {
        self.checksum
    }

    pub fn is_loaded(&self) -> bool {
        self.blob.get().is_some()
    }

    /// The compressed bytes, loading and verifying them if this is the first
    /// use.
    ///
    /// Read failures are [`LookupError::DatabaseUnavailable`]; a checksum
    /// mismatch is [`LookupError::DatabaseCorrupt`].
    pub fn bytes(&self) -> Result<&[u8], LookupError> {
        if let Some(blob) = self.blob.get() {
            return Ok(&blob[..]);
        }
        let loaded = self.load().map_err(|err| {
            tracing::warn!(resource = %self.resource, error = %err, "Failed to load name table");
            LookupError::DatabaseUnavailable(err)
        })?;
        self.verify(&loaded)?;
        Ok(&self.blob.get_or_init(|| loaded)[..])
    }

    fn verify(&self, blob: &[u8]) -> Result<(), CorruptionError> {
        let Some(expected) = self.checksum else {
            return Ok(());
        };
        let actual = crc32(blob);
        if actual != expected {
            tracing::warn!(
                resource = %self.resource,
                expected,
                actual,
                "Name table checksum mismatch"
            );
            return Err(CorruptionError::Checksum { expected, actual });
        }
        Ok(())
    }

    /// Reads the resource until the buffer is full or the source is
    /// exhausted; anything other than exactly `expected_len` bytes fails.
    fn load(&self) -> io::Result<Box<[u8]>> {
        let mut reader = self.provider.open(&self.resource)?;
        let mut buf = vec![0u8; self.expected_len].into_boxed_slice();
        let mut filled = 0;

        while filled < buf.len() {
            match reader.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }

        if filled != self.expected_len {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "{} holds {filled} bytes, expected {}",
                    self.resource, self.expected_len
                ),
            ));
        }

        tracing::debug!(resource = %self.resource, bytes = filled, "Loaded name table");
        Ok(buf)
    }
}

impl core::fmt::Debug for CompressedTable {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CompressedTable")
            .field("resource", &self.resource)
            .field("expected_len", &self.expected_len)
            .field("checksum", &self.checksum)
            .field("loaded", &self.is_loaded())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    /// Fails the first `failures` opens, then serves `bytes`.
    struct Flaky {
        failures: usize,
        opens: AtomicUsize,
        bytes: Vec<u8>,
    }

    impl ResourceProvider for Flaky {
        fn open(&self, _name: &str) -> io::Result<Box<dyn Read + '_>> {
            if self.opens.fetch_add(1, Ordering::SeqCst) < self.failures {
                Err(io::Error::other("disk on fire"))
            } else {
                Ok(Box::new(self.bytes.as_slice()))
            }
        }
    }

    /// Yields one byte per read call.
    struct Trickle<'a>(&'a [u8]);

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let data = self.0;
            match (data.split_first(), buf.first_mut()) {
                (Some((byte, rest)), Some(slot)) => {
                    *slot = *byte;
                    self.0 = rest;
                    Ok(1)
                }
                _ => Ok(0),
            }
        }
    }

    /// Sleeps before every read, widening the window for racing loads.
    struct Slow<'a>(&'a [u8]);

    impl Read for Slow<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            std::thread::sleep(std::time::Duration::from_millis(5));
            let n = buf.len().min(self.0.len()).min(16);
            buf[..n].copy_from_slice(&self.0[..n]);
            self.0 = &self.0[n..];
            Ok(n)
        }
    }

    struct SlowProvider {
        opens: AtomicUsize,
        bytes: Vec<u8>,
    }

    impl ResourceProvider for SlowProvider {
        fn open(&self, _name: &str) -> io::Result<Box<dyn Read + '_>> {
            self.opens.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(Slow(&self.bytes)))
        }
    }

    /// Kind of the I/O error behind an unavailable table.
    #[track_caller]
    fn io_kind(err: LookupError) -> io::ErrorKind {
        match err {
            LookupError::DatabaseUnavailable(err) => err.kind(),
            other => panic!("expected an unavailable table, got {other:?}"),
        }
    }

    struct TrickleProvider(Vec<u8>);

    impl ResourceProvider for TrickleProvider {
        fn open(&self, _name: &str) -> io::Result<Box<dyn Read + '_>> {
            Ok(Box::new(Trickle(&self.0)))
        }
    }

    #[test]
    fn test_embedded_length() {
        assert_eq!(EMBEDDED_TABLE.len(), EMBEDDED_TABLE_LEN);
        let table = CompressedTable::embedded();
        assert!(!table.is_loaded());
        assert_eq!(table.bytes().unwrap().len(), EMBEDDED_TABLE_LEN);
        assert!(table.is_loaded());
        assert_eq!(crc32(EMBEDDED_TABLE), EMBEDDED_TABLE_CRC32);
    }

    #[test]
    fn test_short_resource() {
        let table = CompressedTable::new(MemoryProvider::new("t", vec![1, 2, 3]), "t", 4);
        assert_eq!(io_kind(table.bytes().unwrap_err()), io::ErrorKind::UnexpectedEof);
        assert!(!table.is_loaded());
    }

    #[test]
    fn test_long_resource_reads_expected_prefix() {
        let table = CompressedTable::new(MemoryProvider::new("t", vec![1, 2, 3, 4, 5]), "t", 4);
        assert_eq!(table.bytes().unwrap(), &[1, 2, 3, 4]);
    }

    #[test]
    fn test_missing_resource() {
        let table = CompressedTable::new(MemoryProvider::new("t", vec![1]), "other", 1);
        assert_eq!(io_kind(table.bytes().unwrap_err()), io::ErrorKind::NotFound);
        let table = CompressedTable::new(EmbeddedProvider, "nope", 1);
        assert_eq!(io_kind(table.bytes().unwrap_err()), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_partial_reads_accumulate() {
        let table = CompressedTable::new(TrickleProvider(vec![9; 10]), "t", 10);
        assert_eq!(table.bytes().unwrap(), &[9; 10]);
    }

    #[test]
    fn test_failed_load_is_retried() {
        let provider = Flaky {
            failures: 1,
            opens: AtomicUsize::new(0),
            bytes: vec![7, 7],
        };
        let table = CompressedTable::new(provider, "t", 2);
        assert!(table.bytes().is_err());
        assert_eq!(table.bytes().unwrap(), &[7, 7]);
        assert!(table.is_loaded());
    }

    #[test]
    fn test_checksum_mismatch_is_corrupt() {
        let mut bytes = EMBEDDED_TABLE.to_vec();
        bytes[1000] ^= 0x55;
        let table = CompressedTable::new(MemoryProvider::new("t", bytes), "t", EMBEDDED_TABLE_LEN)
            .with_checksum(EMBEDDED_TABLE_CRC32);
        assert!(matches!(
            table.bytes(),
            Err(LookupError::DatabaseCorrupt(CorruptionError::Checksum {
                expected: EMBEDDED_TABLE_CRC32,
                ..
            }))
        ));
        assert!(!table.is_loaded());
    }

    #[test]
    fn test_checksum_match() {
        let bytes = vec![3u8, 1, 4, 1, 5];
        let table = CompressedTable::new(MemoryProvider::new("t", bytes.clone()), "t", 5)
            .with_checksum(crc32(&bytes));
        assert_eq!(table.bytes().unwrap(), &bytes[..]);
        assert_eq!(table.checksum(), Some(crc32(&bytes)));
    }

    #[test]
    fn test_concurrent_first_load_caches_one_blob() {
        let bytes: Vec<u8> = (0..=255).collect();
        let provider = SlowProvider {
            opens: AtomicUsize::new(0),
            bytes: bytes.clone(),
        };
        let table = CompressedTable::new(provider, "t", bytes.len()).with_checksum(crc32(&bytes));
        let barrier = std::sync::Barrier::new(8);

        let seen: Vec<&[u8]> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    scope.spawn(|| {
                        barrier.wait();
                        table.bytes().unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let cached = table.bytes().unwrap();
        for blob in seen {
            assert!(core::ptr::eq(blob, cached));
            assert_eq!(blob, &bytes[..]);
        }
        assert!(table.is_loaded());
    }

    #[test]
    fn test_directory_provider() {
        let dir = std::env::temp_dir().join(format!("namemap-provider-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(RESOURCE_NAME), [1u8, 2, 3]).unwrap();

        let table = CompressedTable::new(DirectoryProvider::new(&dir), RESOURCE_NAME, 3);
        assert_eq!(table.bytes().unwrap(), &[1, 2, 3]);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
