use flate2::{Decompress, FlushDecompress, Status};

use crate::error::CorruptionError;
use crate::scan::ChunkSource;

type Result<T> = core::result::Result<T, CorruptionError>;

// --- Constants ---

/// Smallest output buffer a decoder will use.
pub const MIN_CHUNK_SIZE: usize = 512;

/// Output buffer size used by [`StreamingDecoder::new`].
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

/// Incremental raw-deflate decoder over an in-memory blob.
///
/// Each [`pull`](Self::pull) refills the same fixed-size buffer, so memory use
/// is bounded by the chunk size no matter how large the decoded stream is.
pub struct StreamingDecoder<'a> {
    input: &'a [u8],
    inflater: Decompress,
    buffer: Box<[u8]>,
    finished: bool,
}

impl<'a> StreamingDecoder<'a> {
    #[must_use]
    pub fn new(input: &'a [u8]) -> Self {
        Self::with_chunk_size(input, DEFAULT_CHUNK_SIZE)
    }

    /// Creates a decoder whose buffer holds `chunk_size` bytes (at least
    /// [`MIN_CHUNK_SIZE`]).
    #[must_use]
    pub fn with_chunk_size(input: &'a [u8], chunk_size: usize) -> Self {
        Self {
            input,
            // Raw deflate: no zlib header or trailer.
            inflater: Decompress::new(false),
            buffer: vec![0; chunk_size.max(MIN_CHUNK_SIZE)].into_boxed_slice(),
            finished: false,
        }
    }

    /// Decodes the next chunk into the internal buffer.
    ///
    /// Returns the number of bytes produced; 0 means the compressed stream has
    /// reached its end-of-data marker. The previous chunk is overwritten.
    pub fn pull(&mut self) -> Result<usize> {
        if self.finished {
            return Ok(0);
        }

        let mut produced = 0;
        while produced < self.buffer.len() {
            let consumed = self.total_in();
            let before_out = self.inflater.total_out();

            let status = self.inflater.decompress(
                &self.input[consumed..],
                &mut self.buffer[produced..],
                FlushDecompress::None,
            )?;

            let written = (self.inflater.total_out() - before_out) as usize;
            produced += written;

            match status {
                Status::StreamEnd => {
                    self.finished = true;
                    break;
                }
                Status::Ok | Status::BufError => {
                    if written == 0 && self.total_in() == consumed {
                        // No progress: the input ran out before end-of-data.
                        // Hand back what we have; the next pull reports it.
                        if produced > 0 {
                            break;
                        }
                        return Err(CorruptionError::TruncatedStream);
                    }
                }
            }
        }

        Ok(produced)
    }

    /// The buffer filled by the last [`pull`](Self::pull).
    #[must_use]
    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    /// Whether the end-of-data marker has been reached.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.finished
    }

    #[inline]
    fn total_in(&self) -> usize {
        self.inflater.total_in() as usize
    }
}

impl ChunkSource for StreamingDecoder<'_> {
    fn next_chunk(&mut self) -> Result<&[u8]> {
        let n = self.pull()?;
        Ok(&self.buffer[..n])
    }
}
