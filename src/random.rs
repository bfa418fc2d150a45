//! Deterministic coefficient generation.
//!
//! A convolutional recovery packet is a pseudo-random linear combination of
//! the originals; both sides only need to agree on a seed to agree on the
//! coefficient row. The generator state is caller-owned and value-semantic,
//! so independent instances can run in parallel with no coordination.

use crate::field::MODULUS;

const GOLDEN_GAMMA: u64 = 0x9e37_79b9_7f4a_7c15;

/// SplitMix64 avalanche: hashes a 64-bit value to another 64-bit value.
#[inline]
pub fn hash_u64(x: u64) -> u64 {
    let mut z = x.wrapping_add(GOLDEN_GAMMA);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

/// Hashes a seed into a nonzero field element in `[1, p - 1]`.
///
/// Runs the first mixing round of [`hash_u64`], keeps the top 61 bits, then
/// steers away from the excluded endpoints with single-bit carry tricks:
/// `w -= (w + 1) >> 61` collapses the all-ones pattern, `w += (w - 1) >> 63`
/// lifts zero to one. Stateless, so coefficient `i` of a row can be drawn
/// directly as `hash_to_nonzero_fp(row_seed + i)`.
#[inline]
pub fn hash_to_nonzero_fp(seed: u64) -> u64 {
    let mut word = seed.wrapping_add(GOLDEN_GAMMA);
    word = (word ^ (word >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);

    word >>= 3;
    word -= (word + 1) >> 61;
    word += word.wrapping_sub(1) >> 63;
    word
}

/// Xoshiro256+ pseudo-random generator.
///
/// 256 bits of state seeded from a single 64-bit value. The low 3 bits of
/// each output are weaker than the rest, which is why the field conversions
/// below discard them first.
#[derive(Clone)]
pub struct Random {
    state: [u64; 4],
}

impl Random {
    /// Creates a generator seeded with `seed`.
    pub fn new(seed: u64) -> Self {
        let mut prng = Self { state: [0; 4] };
        prng.seed(seed);
        prng
    }

    /// Re-seeds the generator, expanding `x` through chained [`hash_u64`]
    /// applications as the xoshiro authors recommend.
    pub fn seed(&mut self, x: u64) {
        let mut h = hash_u64(x);
        self.state[0] = h;
        h = hash_u64(h);
        self.state[1] = h;
        h = hash_u64(h);
        self.state[2] = h;
        h = hash_u64(h);
        self.state[3] = h;
    }

    /// Returns the next raw 64-bit output.
    #[inline]
    pub fn next(&mut self) -> u64 {
        let [mut s0, mut s1, mut s2, mut s3] = self.state;

        let result = s0.wrapping_add(s3);

        let t = s1 << 17;
        s2 ^= s0;
        s3 ^= s1;
        s1 ^= s2;
        s0 ^= s3;
        s2 ^= t;
        s3 = s3.rotate_left(45);

        self.state = [s0, s1, s2, s3];
        result
    }

    /// Maps a raw 64-bit word to a field element in `[0, p - 1]`.
    #[inline]
    pub fn convert_rand_to_fp(word: u64) -> u64 {
        let mut w = word >> 3;
        w -= (w + 1) >> 61;
        w
    }

    /// Maps a raw 64-bit word to a nonzero field element in `[1, p - 1]`.
    #[inline]
    pub fn convert_rand_to_nonzero_fp(word: u64) -> u64 {
        let mut w = word >> 3;
        w -= (w + 1) >> 61;
        w += w.wrapping_sub(1) >> 63;
        w
    }

    /// Draws a field element in `[0, p - 1]`.
    #[inline]
    pub fn next_fp(&mut self) -> u64 {
        Self::convert_rand_to_fp(self.next())
    }

    /// Draws a nonzero field element in `[1, p - 1]`.
    #[inline]
    pub fn next_nonzero_fp(&mut self) -> u64 {
        Self::convert_rand_to_nonzero_fp(self.next())
    }
}
