//! Forward-only scanner over the name table's record stream.
//!
//! The stream is a sequence of records, each introduced by one byte:
//!
//! | Leading byte | Record | Effect |
//! |---|---|---|
//! | `0..=90` (`L`) | name, followed by `L` ASCII bytes | names the cursor codepoint, cursor += 1 |
//! | `255` | alias marker | cursor -= 1, so the next name attaches to the previous codepoint |
//! | `91..=254` (`M`) | skip, followed by one byte `E` | cursor += `(M - 91) * 256 + E` |
//!
//! The cursor starts at 0 and records are sorted by it. The scanner consumes
//! decoded chunks of arbitrary size and keeps its position inside a record
//! across chunk boundaries, so the whole stream is never buffered.

use crate::MAX_CODEPOINT;
use crate::error::CorruptionError;

type Result<T> = core::result::Result<T, CorruptionError>;

// --- Record Grammar ---

/// Longest name a name record can carry.
pub const MAX_NAME_LEN: u8 = 90;

/// First skip marker; the marker's offset from here is the gap's high byte.
pub const SKIP_MARKER_MIN: u8 = 91;

/// Last skip marker.
pub const SKIP_MARKER_MAX: u8 = 254;

/// Alias marker.
pub const ALIAS_MARKER: u8 = 255;

/// Largest gap a single skip record can encode.
pub const MAX_SKIP: u32 = (((SKIP_MARKER_MAX - SKIP_MARKER_MIN) as u32) << 8) | 0xFF;

/// A producer of decoded record-stream bytes.
pub trait ChunkSource {
    /// Returns the next run of decoded bytes.
    ///
    /// An empty slice means the stream ended cleanly. The slice is only valid
    /// until the next call.
    fn next_chunk(&mut self) -> Result<&[u8]>;
}

/// Serves an uncompressed record stream in fixed-size pieces.
#[derive(Debug, Clone)]
pub struct RawChunks<'a> {
    data: &'a [u8],
    chunk_size: usize,
}

impl<'a> RawChunks<'a> {
    #[must_use]
    pub fn new(data: &'a [u8], chunk_size: usize) -> Self {
        Self {
            data,
            chunk_size: chunk_size.max(1),
        }
    }
}

impl ChunkSource for RawChunks<'_> {
    fn next_chunk(&mut self) -> Result<&[u8]> {
        let n = self.chunk_size.min(self.data.len());
        let (head, tail) = self.data.split_at(n);
        self.data = tail;
        Ok(head)
    }
}

/// Where the walk stands relative to the record grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// At a record boundary.
    Record,
    /// Skip marker consumed; waiting for the gap's low byte.
    SkipLow { high: u32 },
    /// Inside a name record the probe wants, `remaining` bytes still unread.
    Read { remaining: usize },
    /// Inside a name record the probe ignores.
    Discard { remaining: usize },
}

/// What to do with a name record once its length and codepoint are known.
enum Action {
    Read,
    Skip,
    /// No later record can match.
    Stop,
}

/// One lookup direction, driven by [`walk`].
trait Probe {
    type Found;

    /// A name record of `len` bytes for `cursor` begins.
    fn open(&mut self, cursor: u32, len: usize) -> Action;

    /// Next bytes of a record opened with [`Action::Read`]. Returns `false`
    /// to abandon the record.
    fn feed(&mut self, bytes: &[u8]) -> bool;

    /// Every byte of a read record was accepted.
    fn complete(&mut self, cursor: u32) -> Result<Option<Self::Found>>;
}

/// Runs `probe` over the record stream until it finds something, stops, or
/// the stream ends.
///
/// The stream may only end at a record boundary; ending anywhere else is
/// reported as corruption.
fn walk<S, P>(source: &mut S, probe: &mut P) -> Result<Option<P::Found>>
where
    S: ChunkSource + ?Sized,
    P: Probe,
{
    let mut cursor: u32 = 0;
    let mut state = State::Record;

    loop {
        let chunk = source.next_chunk()?;
        if chunk.is_empty() {
            return match state {
                State::Record => Ok(None),
                State::SkipLow { .. } => Err(CorruptionError::UnterminatedSkip),
                State::Read { .. } | State::Discard { .. } => {
                    Err(CorruptionError::UnterminatedName)
                }
            };
        }

        let mut pos = 0;
        while pos < chunk.len() {
            state = match state {
                State::Record => {
                    let byte = chunk[pos];
                    pos += 1;
                    match byte {
                        ALIAS_MARKER => {
                            cursor = cursor
                                .checked_sub(1)
                                .ok_or(CorruptionError::CursorOutOfRange)?;
                            State::Record
                        }
                        SKIP_MARKER_MIN..=SKIP_MARKER_MAX => State::SkipLow {
                            high: u32::from(byte - SKIP_MARKER_MIN) << 8,
                        },
                        len => {
                            if cursor > MAX_CODEPOINT {
                                return Err(CorruptionError::CursorOutOfRange);
                            }
                            let remaining = usize::from(len);
                            match probe.open(cursor, remaining) {
                                Action::Read => State::Read { remaining },
                                Action::Skip => State::Discard { remaining },
                                Action::Stop => return Ok(None),
                            }
                        }
                    }
                }
                State::SkipLow { high } => {
                    let gap = high | u32::from(chunk[pos]);
                    pos += 1;
                    cursor = cursor
                        .checked_add(gap)
                        .filter(|c| *c <= MAX_CODEPOINT + 1)
                        .ok_or(CorruptionError::CursorOutOfRange)?;
                    State::Record
                }
                State::Read { remaining } => {
                    let n = remaining.min(chunk.len() - pos);
                    let accepted = probe.feed(&chunk[pos..pos + n]);
                    pos += n;
                    if accepted {
                        State::Read {
                            remaining: remaining - n,
                        }
                    } else {
                        State::Discard {
                            remaining: remaining - n,
                        }
                    }
                }
                State::Discard { remaining } => {
                    let n = remaining.min(chunk.len() - pos);
                    pos += n;
                    State::Discard {
                        remaining: remaining - n,
                    }
                }
            };

            // Close finished name records right away so a record ending on a
            // chunk boundary never looks unterminated.
            match state {
                State::Read { remaining: 0 } => {
                    if let Some(found) = probe.complete(cursor)? {
                        return Ok(Some(found));
                    }
                    cursor += 1;
                    state = State::Record;
                }
                State::Discard { remaining: 0 } => {
                    cursor += 1;
                    state = State::Record;
                }
                _ => {}
            }
        }
    }
}

/// Finds the codepoint whose name (canonical or alias) equals the target.
struct CodeProbe<'t> {
    target: &'t [u8],
    matched: usize,
}

impl Probe for CodeProbe<'_> {
    type Found = u32;

    fn open(&mut self, _cursor: u32, len: usize) -> Action {
        if len == self.target.len() {
            self.matched = 0;
            Action::Read
        } else {
            Action::Skip
        }
    }

    fn feed(&mut self, bytes: &[u8]) -> bool {
        let end = self.matched + bytes.len();
        let accepted = self.target[self.matched..end] == *bytes;
        self.matched = end;
        accepted
    }

    fn complete(&mut self, cursor: u32) -> Result<Option<u32>> {
        Ok(Some(cursor))
    }
}

/// Collects the first name recorded for the target codepoint.
struct NameProbe {
    target: u32,
    name: Vec<u8>,
}

impl Probe for NameProbe {
    type Found = String;

    fn open(&mut self, cursor: u32, len: usize) -> Action {
        match cursor.cmp(&self.target) {
            core::cmp::Ordering::Less => Action::Skip,
            core::cmp::Ordering::Equal => {
                self.name.reserve_exact(len);
                Action::Read
            }
            core::cmp::Ordering::Greater => Action::Stop,
        }
    }

    fn feed(&mut self, bytes: &[u8]) -> bool {
        self.name.extend_from_slice(bytes);
        true
    }

    fn complete(&mut self, _cursor: u32) -> Result<Option<String>> {
        let bytes = core::mem::take(&mut self.name);
        if !bytes.is_ascii() {
            return Err(CorruptionError::InvalidName);
        }
        String::from_utf8(bytes)
            .map(Some)
            .map_err(|_| CorruptionError::InvalidName)
    }
}

/// Single-pass lookup over a record stream.
///
/// Both directions are a linear walk from the start of the stream; a scanner
/// is consumed by the lookup it performs.
pub struct TableScanner<S> {
    source: S,
}

impl<S: ChunkSource> TableScanner<S> {
    pub const fn new(source: S) -> Self {
        Self { source }
    }

    /// Codepoint carrying `name`, or `None` if the stream ends without it.
    pub fn find_code(mut self, name: &str) -> Result<Option<u32>> {
        let mut probe = CodeProbe {
            target: name.as_bytes(),
            matched: 0,
        };
        let found = walk(&mut self.source, &mut probe)?;
        tracing::trace!(name, found = ?found, "Scanned table for name");
        Ok(found)
    }

    /// Canonical name of `code`, or `None` if the table has no entry for it.
    pub fn find_name(mut self, code: u32) -> Result<Option<String>> {
        let mut probe = NameProbe {
            target: code,
            name: Vec::new(),
        };
        let found = walk(&mut self.source, &mut probe)?;
        tracing::trace!(code, found = found.is_some(), "Scanned table for codepoint");
        Ok(found)
    }
}
