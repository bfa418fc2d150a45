//! Fixed-width codec for sequences of canonical field elements.
//!
//! A canonical element is below the modulus and the modulus fills all but
//! the top 2^32 - 1 values of the 64-bit range, so one little-endian 64-bit
//! unit per element round-trips with no escape handling and no
//! content-dependent branching. Word counts derive purely from byte
//! lengths, which is what lets callers pre-size recovery buffers exactly.

use crate::bits;

/// Packs canonical words into a caller-supplied buffer.
///
/// Single-use: bind with [`WordWriter::new`], call
/// [`write`](WordWriter::write) per element, then
/// [`flush`](WordWriter::flush) for the total byte count.
pub struct WordWriter<'a> {
    out: &'a mut [u8],
    pos: usize,
}

impl<'a> WordWriter<'a> {
    /// Exact buffer size for `words` elements.
    pub fn bytes_needed(words: usize) -> usize {
        words * 8
    }

    /// Binds a fresh cursor over `out`.
    pub fn new(out: &'a mut [u8]) -> Self {
        Self { out, pos: 0 }
    }

    /// Appends one element. The value is stored verbatim; callers are
    /// expected to pass finalized (below-modulus) words.
    pub fn write(&mut self, word: u64) {
        bits::write_u64_le(&mut self.out[self.pos..], word);
        self.pos += 8;
    }

    /// Returns the total bytes produced. At this width no partial unit can
    /// remain, so the call only reports the count.
    pub fn flush(self) -> usize {
        self.pos
    }
}

/// Unpacks canonical words from a buffer produced by [`WordWriter`].
pub struct WordReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> WordReader<'a> {
    /// Number of whole elements stored in `bytes` bytes; the exact inverse
    /// of [`WordWriter::bytes_needed`] on 8-byte boundaries.
    pub fn word_count(bytes: usize) -> usize {
        bytes / 8
    }

    /// Binds a fresh cursor over `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Reads the next element. Panics past the end of the buffer.
    pub fn read(&mut self) -> u64 {
        let word = bits::read_u64_le(&self.data[self.pos..]);
        self.pos += 8;
        word
    }
}
