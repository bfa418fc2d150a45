//! Solinas64 - erasure-code arithmetic over p = 2^64 - 2^32 + 1
//!
//! This library implements finite field arithmetic modulo the Solinas prime
//! p = 2^64 - 2^32 + 1 together with the bit-packing codecs and bulk
//! multiply kernels needed to build a software convolutional erasure code
//! on top of it. Each recovery packet is a pseudo-random linear combination
//! of the original packets, computed with the fast 64x64->128 multiplier
//! modern CPUs provide.
//!
//! The packing problem this solves: a 64-bit data word can land in the
//! narrow band at or above p, which has no canonical representation in the
//! field. The codecs spend one extra bit on exactly those words - inline
//! for the general [`ByteReader`]/[`ByteWriter`] stream codec, deferred
//! into a side workspace for the [`RegionReader`] feeding the hot multiply
//! loops.
//!
//! # Example
//!
//! ```rust
//! use solinas64::{encode, RegionReader};
//!
//! let packets: Vec<Vec<u8>> = vec![vec![0x11; 100], vec![0x22; 100], vec![0x33; 100]];
//! let refs: Vec<&[u8]> = packets.iter().map(|p| p.as_slice()).collect();
//!
//! let mut workspace = vec![0u8; RegionReader::workspace_bytes(100)];
//! let mut recovery = vec![0u8; RegionReader::max_output_bytes(100)];
//!
//! let written = encode(&refs, 7, &mut workspace, &mut recovery).unwrap();
//! assert!(written <= recovery.len());
//! ```

pub mod bits;
pub mod bytes;
pub mod field;
pub mod random;
pub mod region;
pub mod words;

pub use bytes::{ByteReader, ByteWriter};
pub use random::{hash_to_nonzero_fp, hash_u64, Random};
pub use region::{multiply_add_region, multiply_region, RegionReader};
pub use words::{WordReader, WordWriter};

/// Error type for the encode entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// No packets, empty packets, or mismatched packet lengths
    InvalidInput,
    /// Workspace or recovery buffer smaller than the sizing contracts
    BufferTooSmall,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::InvalidInput => write!(f, "packets must be non-empty and equal-sized"),
            Error::BufferTooSmall => {
                write!(f, "workspace or recovery buffer below the sized minimum")
            }
        }
    }
}

impl std::error::Error for Error {}

/// Encodes one recovery packet from a set of equal-sized original packets.
///
/// The coefficient row is derived from `seed`: packet `i` is multiplied by
/// `hash_to_nonzero_fp(hash_u64(seed) + i)`, so a decoder only needs the
/// seed to reproduce the row. Packet 0 runs through [`multiply_region`],
/// the rest accumulate with [`multiply_add_region`]; the recovery buffer is
/// zero-filled up to [`RegionReader::max_output_bytes`] in between so
/// packets with more overflow words than packet 0 accumulate onto zeros.
///
/// # Arguments
/// * `originals` - the original packets, all the same nonzero length
/// * `seed` - coefficient row seed shared with the eventual decoder
/// * `workspace` - scratch sized by [`RegionReader::workspace_bytes`]
/// * `recovery` - output sized by [`RegionReader::max_output_bytes`]
///
/// Returns the number of recovery bytes produced (the largest write across
/// packets; trailing bytes up to the sized maximum are zero).
///
/// # Errors
/// [`Error::InvalidInput`] for an empty packet set, empty packets or
/// mismatched lengths; [`Error::BufferTooSmall`] for undersized buffers.
pub fn encode(
    originals: &[&[u8]],
    seed: u64,
    workspace: &mut [u8],
    recovery: &mut [u8],
) -> Result<usize, Error> {
    let first = match originals.first() {
        Some(p) => p,
        None => return Err(Error::InvalidInput),
    };
    let bytes = first.len();
    if bytes == 0 || originals.iter().any(|p| p.len() != bytes) {
        return Err(Error::InvalidInput);
    }
    if workspace.len() < RegionReader::workspace_bytes(bytes) {
        return Err(Error::BufferTooSmall);
    }
    let max_recovery = RegionReader::max_output_bytes(bytes);
    if recovery.len() < max_recovery {
        return Err(Error::BufferTooSmall);
    }

    let row_seed = hash_u64(seed);

    let coeff0 = hash_to_nonzero_fp(row_seed);
    let mut recovery_bytes = multiply_region(originals[0], coeff0, workspace, recovery);

    // Later packets may defer more overflow words than packet 0 did.
    recovery[recovery_bytes..max_recovery].fill(0);

    for (i, packet) in originals.iter().enumerate().skip(1) {
        let coeff = hash_to_nonzero_fp(row_seed.wrapping_add(i as u64));
        let written = multiply_add_region(packet, coeff, workspace, recovery);
        recovery_bytes = recovery_bytes.max(written);
    }

    Ok(recovery_bytes)
}
