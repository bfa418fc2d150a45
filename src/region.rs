//! Aligned region reader and the bulk multiply kernels.
//!
//! The kernels view a byte buffer as a run of 8-byte little-endian field
//! words. Words at or above the modulus cannot be stored verbatim, so
//! [`RegionReader`] defers their high bit into a side workspace instead of
//! escaping inline: the multiply loop stays branch-light and the deferred
//! bits are appended to the region as ordinary extra words. Workspace units
//! carry at most 63 deferred bits each, keeping every overflow word below
//! the modulus by construction.

use crate::bits;
use crate::field;

/// Reads 8-byte-aligned words for the bulk kernels, deferring ambiguous
/// high bits into a caller-supplied workspace.
///
/// Single-use per region pass: bind a workspace with [`RegionReader::new`],
/// feed every full 8-byte window through
/// [`read_next8`](RegionReader::read_next8), then call
/// [`finish`](RegionReader::finish) to flush and take the overflow words.
pub struct RegionReader<'a> {
    workspace: &'a mut [u8],
    written: usize,
    acc: u64,
    available: u32,
}

impl<'a> RegionReader<'a> {
    /// Workspace bytes needed for a region of `bytes` input bytes.
    ///
    /// Every full 8-byte input word can defer one bit, and flushed units
    /// hold 63 bits each so the unit itself stays below the modulus.
    pub fn workspace_bytes(bytes: usize) -> usize {
        let input_bits = bytes * 8;
        let max_extra_bits = input_bits / 64;
        max_extra_bits.div_ceil(63) * 8
    }

    /// Total output bytes a region pass can produce: the rounded-up input
    /// words plus the worst-case overflow words.
    pub fn max_output_bytes(bytes: usize) -> usize {
        Self::workspace_bytes(bytes) + bytes.div_ceil(8) * 8
    }

    /// Binds the workspace buffer; size it with
    /// [`workspace_bytes`](RegionReader::workspace_bytes).
    pub fn new(workspace: &'a mut [u8]) -> Self {
        Self {
            workspace,
            written: 0,
            acc: 0,
            available: 0,
        }
    }

    /// Reads one full 8-byte word from `data`.
    ///
    /// An ambiguous word has bit 63 appended to the workspace and cleared
    /// in the returned value; every return value is below the modulus.
    /// Trailing sub-8-byte input needs no deferral (its top byte is zero)
    /// and is read with [`bits::read_bytes_le`] directly.
    #[inline]
    pub fn read_next8(&mut self, data: &[u8]) -> u64 {
        let mut word = bits::read_u64_le(data);

        if field::is_ambiguous(word) {
            if self.available >= 63 {
                bits::write_u64_le(&mut self.workspace[self.written..], self.acc);
                self.written += 8;
                self.acc = word >> 63;
                self.available = 1;
            } else {
                self.acc |= (word >> 63) << self.available;
                self.available += 1;
            }
            word &= field::HIGH_BIT_MASK;
        }

        word
    }

    /// Flushes the pending unit and returns the overflow region: whole
    /// 64-bit units the caller processes exactly like ordinary words.
    pub fn finish(self) -> &'a [u8] {
        let Self {
            workspace,
            mut written,
            acc,
            available,
        } = self;

        if available != 0 {
            bits::write_u64_le(&mut workspace[written..], acc);
            written += 8;
        }

        &workspace[..written]
    }
}

/// `output = data * coeff` over the field-word view of `data`.
///
/// Fast paths: `coeff == 0` zero-fills the rounded-up length, `coeff == 1`
/// byte-copies with zero padding. The general path runs 32-byte chunks
/// through [`RegionReader`] and [`field::multiply`], then the 8-byte tail,
/// the final partial word, and the deferred overflow words. Returns the
/// number of bytes written; empty input writes nothing and returns 0.
///
/// # Panics
///
/// Panics if `coeff` is not below the modulus, or if `workspace`/`output`
/// are smaller than [`RegionReader::workspace_bytes`] /
/// [`RegionReader::max_output_bytes`] for `data.len()`.
pub fn multiply_region(data: &[u8], coeff: u64, workspace: &mut [u8], output: &mut [u8]) -> usize {
    assert!(coeff < field::MODULUS, "coefficient not below the modulus");
    let bytes = data.len();
    if bytes == 0 {
        return 0;
    }
    let min_output = bytes.div_ceil(8) * 8;
    assert!(
        workspace.len() >= RegionReader::workspace_bytes(bytes),
        "workspace smaller than workspace_bytes({bytes})"
    );
    assert!(
        output.len() >= RegionReader::max_output_bytes(bytes),
        "output smaller than max_output_bytes({bytes})"
    );

    if coeff == 0 {
        output[..min_output].fill(0);
        return min_output;
    }
    if coeff == 1 {
        output[..bytes].copy_from_slice(data);
        output[bytes..min_output].fill(0);
        return min_output;
    }

    let mut reader = RegionReader::new(workspace);
    let mut remaining = bytes;
    let mut in_pos = 0;
    let mut out_pos = 0;

    while remaining >= 32 {
        let x0 = field::multiply(coeff, reader.read_next8(&data[in_pos..]));
        let x1 = field::multiply(coeff, reader.read_next8(&data[in_pos + 8..]));
        let x2 = field::multiply(coeff, reader.read_next8(&data[in_pos + 16..]));
        let x3 = field::multiply(coeff, reader.read_next8(&data[in_pos + 24..]));

        bits::write_u64_le(&mut output[out_pos..], x0);
        bits::write_u64_le(&mut output[out_pos + 8..], x1);
        bits::write_u64_le(&mut output[out_pos + 16..], x2);
        bits::write_u64_le(&mut output[out_pos + 24..], x3);

        in_pos += 32;
        out_pos += 32;
        remaining -= 32;
    }

    while remaining >= 8 {
        let x0 = field::multiply(coeff, reader.read_next8(&data[in_pos..]));
        bits::write_u64_le(&mut output[out_pos..], x0);
        in_pos += 8;
        out_pos += 8;
        remaining -= 8;
    }

    if remaining > 0 {
        // Trailing bytes always land below the modulus, no deferral needed.
        let x0 = field::multiply(coeff, bits::read_bytes_le(&data[in_pos..]));
        bits::write_u64_le(&mut output[out_pos..], x0);
        out_pos += 8;
    }

    let extra = reader.finish();
    for chunk in extra.chunks_exact(8) {
        let x = field::multiply(coeff, bits::read_u64_le(chunk));
        bits::write_u64_le(&mut output[out_pos..], x);
        out_pos += 8;
    }

    debug_assert_eq!(out_pos, min_output + extra.len());
    out_pos
}

/// `output += data * coeff` over the field-word view of `data`.
///
/// Same structure as [`multiply_region`], with a read-accumulate of the
/// existing output word before every store; this loop dominates the whole
/// system's run time. `coeff == 0` touches nothing and returns the
/// rounded-up length. Returns the number of bytes written; empty input
/// returns 0.
///
/// # Panics
///
/// Same conditions as [`multiply_region`].
// TODO: a coeff == 1 path could skip the multiplies, though it still needs
// the escape deferral.
pub fn multiply_add_region(
    data: &[u8],
    coeff: u64,
    workspace: &mut [u8],
    output: &mut [u8],
) -> usize {
    assert!(coeff < field::MODULUS, "coefficient not below the modulus");
    let bytes = data.len();
    if bytes == 0 {
        return 0;
    }
    let min_output = bytes.div_ceil(8) * 8;

    if coeff == 0 {
        return min_output;
    }

    assert!(
        workspace.len() >= RegionReader::workspace_bytes(bytes),
        "workspace smaller than workspace_bytes({bytes})"
    );
    assert!(
        output.len() >= RegionReader::max_output_bytes(bytes),
        "output smaller than max_output_bytes({bytes})"
    );

    let mut reader = RegionReader::new(workspace);
    let mut remaining = bytes;
    let mut in_pos = 0;
    let mut out_pos = 0;

    while remaining >= 32 {
        let x0 = field::add(
            field::multiply(coeff, reader.read_next8(&data[in_pos..])),
            bits::read_u64_le(&output[out_pos..]),
        );
        bits::write_u64_le(&mut output[out_pos..], x0);

        let x1 = field::add(
            field::multiply(coeff, reader.read_next8(&data[in_pos + 8..])),
            bits::read_u64_le(&output[out_pos + 8..]),
        );
        bits::write_u64_le(&mut output[out_pos + 8..], x1);

        let x2 = field::add(
            field::multiply(coeff, reader.read_next8(&data[in_pos + 16..])),
            bits::read_u64_le(&output[out_pos + 16..]),
        );
        bits::write_u64_le(&mut output[out_pos + 16..], x2);

        let x3 = field::add(
            field::multiply(coeff, reader.read_next8(&data[in_pos + 24..])),
            bits::read_u64_le(&output[out_pos + 24..]),
        );
        bits::write_u64_le(&mut output[out_pos + 24..], x3);

        in_pos += 32;
        out_pos += 32;
        remaining -= 32;
    }

    while remaining >= 8 {
        let x0 = field::add(
            field::multiply(coeff, reader.read_next8(&data[in_pos..])),
            bits::read_u64_le(&output[out_pos..]),
        );
        bits::write_u64_le(&mut output[out_pos..], x0);
        in_pos += 8;
        out_pos += 8;
        remaining -= 8;
    }

    if remaining > 0 {
        let x0 = field::add(
            field::multiply(coeff, bits::read_bytes_le(&data[in_pos..])),
            bits::read_u64_le(&output[out_pos..]),
        );
        bits::write_u64_le(&mut output[out_pos..], x0);
        out_pos += 8;
    }

    let extra = reader.finish();
    for chunk in extra.chunks_exact(8) {
        let x = field::add(
            field::multiply(coeff, bits::read_u64_le(chunk)),
            bits::read_u64_le(&output[out_pos..]),
        );
        bits::write_u64_le(&mut output[out_pos..], x);
        out_pos += 8;
    }

    debug_assert_eq!(out_pos, min_output + extra.len());
    out_pos
}
