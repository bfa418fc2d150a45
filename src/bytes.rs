//! General lossless codec between byte buffers and field words.
//!
//! Arbitrary application data is packed 64 bits per word, least-significant
//! bit first. A word whose bits 32..=62 are all set cannot keep its high bit
//! and stay below the modulus, so the reader emits it with bit 63 cleared
//! and carries that bit as the low bit of the next word, which then takes
//! only 63 fresh bits from the stream. The writer reverses the escape
//! exactly, so the stream stays self-describing with no side metadata
//! beyond the byte counts.

use crate::bits;
use crate::field;

/// Streaming reader: bytes in, sub-modulus words out.
///
/// Single-use: bind a buffer with [`ByteReader::new`] and call
/// [`read`](ByteReader::read) until it returns `None`. Every word produced
/// is below the modulus and safe to feed into field arithmetic.
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
    acc: u128,
    avail: u32,
    packed: bool,
    packed_bit: u64,
}

impl<'a> ByteReader<'a> {
    /// Upper bound on the number of words [`read`](ByteReader::read) can
    /// produce for `bytes` input bytes.
    ///
    /// Worst case every word is escaped, leaving 63 fresh bits per word,
    /// plus one trailing word holding a final escape bit.
    pub fn max_words(bytes: usize) -> usize {
        (bytes * 8).div_ceil(63) + 1
    }

    /// Binds a fresh cursor over `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            acc: 0,
            avail: 0,
            packed: false,
            packed_bit: 0,
        }
    }

    /// Produces the next word, or `None` once the buffer is exhausted.
    ///
    /// The final data word may be partial (high bits zero); a pending
    /// escape bit at end of data is emitted as one extra 1-bit word.
    pub fn read(&mut self) -> Option<u64> {
        while self.avail <= 120 && self.pos < self.data.len() {
            self.acc |= (self.data[self.pos] as u128) << self.avail;
            self.avail += 8;
            self.pos += 1;
        }

        if self.avail == 0 {
            if !self.packed {
                return None;
            }
            let word = self.packed_bit;
            self.packed = false;
            return Some(word);
        }

        let take = if self.packed { 63 } else { 64 };
        let n = take.min(self.avail);
        let fresh = (self.acc & ((1u128 << n) - 1)) as u64;
        self.acc >>= n;
        self.avail -= n;

        let word = if self.packed {
            (fresh << 1) | self.packed_bit
        } else {
            fresh
        };

        self.packed = field::is_ambiguous(word);
        if self.packed {
            self.packed_bit = word >> 63;
            Some(word & field::HIGH_BIT_MASK)
        } else {
            Some(word)
        }
    }
}

impl Iterator for ByteReader<'_> {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        self.read()
    }
}

/// Streaming writer: words in, original bytes out.
///
/// Mirrors [`ByteReader`] word for word. Single-use: bind an output buffer
/// with [`ByteWriter::new`], feed it every word the reader produced, then
/// call [`flush`](ByteWriter::flush) for the total byte count. The buffer
/// must hold [`max_bytes_needed`](ByteWriter::max_bytes_needed) bytes for
/// the word count being written.
pub struct ByteWriter<'a> {
    out: &'a mut [u8],
    pos: usize,
    acc: u128,
    avail: u32,
    /// Escaped word waiting for its high bit, which arrives as the low bit
    /// of the next word.
    pending: u64,
    pending_shift: u32,
    has_pending: bool,
}

impl<'a> ByteWriter<'a> {
    /// Upper bound on the bytes produced by writing `words` words: each
    /// word restores at most 64 raw bits.
    pub fn max_bytes_needed(words: usize) -> usize {
        words * 8
    }

    /// Binds a fresh cursor over `out`.
    pub fn new(out: &'a mut [u8]) -> Self {
        Self {
            out,
            pos: 0,
            acc: 0,
            avail: 0,
            pending: 0,
            pending_shift: 0,
            has_pending: false,
        }
    }

    fn push_bits(&mut self, value: u64, bits: u32) {
        self.acc |= (value as u128) << self.avail;
        self.avail += bits;
        while self.avail >= 64 {
            bits::write_u64_le(&mut self.out[self.pos..], self.acc as u64);
            self.pos += 8;
            self.acc >>= 64;
            self.avail -= 64;
        }
    }

    /// Accepts the next word of the stream.
    pub fn write(&mut self, word: u64) {
        let shift = if self.has_pending {
            // This word carries the previous word's high bit in its low bit
            // and contributes only 63 raw bits itself.
            let raw = self.pending | ((word & 1) << 63);
            let s = self.pending_shift;
            self.push_bits(raw >> s, 64 - s);
            self.has_pending = false;
            1
        } else {
            0
        };

        if field::is_ambiguous(word) {
            // Escaped by the reader; its high bit rides on the next word.
            self.pending = word;
            self.pending_shift = shift;
            self.has_pending = true;
        } else {
            self.push_bits(word >> shift, 64 - shift);
        }
    }

    /// Writes the final partial byte(s) and returns the total bytes
    /// produced. Bytes past the original input length are padding.
    pub fn flush(mut self) -> usize {
        if self.has_pending {
            // A well-formed stream always follows an escape with another
            // word; restore a missing trailer with a zero high bit.
            let raw = self.pending;
            let s = self.pending_shift;
            self.push_bits(raw >> s, 64 - s);
        }
        let mut pos = self.pos;
        let mut acc = self.acc;
        let mut remaining = self.avail;
        while remaining > 0 {
            self.out[pos] = acc as u8;
            pos += 1;
            acc >>= 8;
            remaining = remaining.saturating_sub(8);
        }
        pos
    }
}
