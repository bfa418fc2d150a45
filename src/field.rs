//! Scalar arithmetic modulo the Solinas prime p = 2^64 - 2^32 + 1.
//!
//! The prime's sparse form keeps every reduction down to shifts, adds and
//! conditional folds: a carry out of 64 bits is congruent to adding
//! 2^32 - 1, and 2^96 is congruent to -1. Products are computed with the
//! machine's 64x64->128 multiplier and reduced in a handful of operations,
//! which is what makes this field competitive with byte-oriented fields for
//! bulk erasure coding.
//!
//! Values are plain `u64`. Most operations return a 64-bit value that is
//! congruent to the true result but not necessarily below p; callers that
//! need the canonical representative apply [`finalize`].

/// The field modulus p = 2^64 - 2^32 + 1.
pub const MODULUS: u64 = 0xffff_ffff_0000_0001;

/// 2^64 - p = 2^32 - 1: the amount a carry out of 64 bits folds back in.
pub const EPSILON: u64 = 0xffff_ffff;

/// Ambiguity pattern: a word with bits 32..=62 all set collides with the
/// band `[p, 2^64)` once bit 63 is dropped. Every value at or above p
/// matches this mask, and every word that does not match is below p.
pub const AMBIGUITY_MASK: u64 = 0x7fff_ffff_0000_0000;

/// Clears bit 63, the bit an ambiguous word hands off to an escape channel.
pub const HIGH_BIT_MASK: u64 = 0x7fff_ffff_ffff_ffff;

/// Returns true if `word` needs an extra bit to round-trip through 64-bit
/// storage that only admits values below p.
#[inline(always)]
pub fn is_ambiguous(word: u64) -> bool {
    (word & AMBIGUITY_MASK) == AMBIGUITY_MASK
}

/// Add with carry: `x += y`, returns whether the sum wrapped.
#[inline(always)]
fn adc(x: &mut u64, y: u64) -> bool {
    let (sum, carry) = x.overflowing_add(y);
    *x = sum;
    carry
}

/// Subtract with borrow: `x -= y`, returns whether the difference wrapped.
#[inline(always)]
fn sbb(x: &mut u64, y: u64) -> bool {
    let (diff, borrow) = x.overflowing_sub(y);
    *x = diff;
    borrow
}

/// Returns a 64-bit value congruent to `x + y` modulo p.
///
/// Accepts any 64-bit inputs. A carry folds back as [`EPSILON`]; the fold
/// itself can carry once more for extreme inputs, so the correction is
/// applied up to twice. The result may equal or exceed p (for example
/// `add(p - 1, 1) == p`); use [`finalize`] where the canonical
/// representative is required.
#[inline]
pub fn add(mut x: u64, y: u64) -> u64 {
    if adc(&mut x, y) {
        if adc(&mut x, EPSILON) {
            adc(&mut x, EPSILON);
        }
    }
    x
}

/// Returns a 64-bit value congruent to `x - y` modulo p.
///
/// Accepts any 64-bit inputs; a borrow folds back by subtracting
/// [`EPSILON`], applied up to twice.
#[inline]
pub fn subtract(mut x: u64, y: u64) -> u64 {
    if sbb(&mut x, y) {
        if sbb(&mut x, EPSILON) {
            sbb(&mut x, EPSILON);
        }
    }
    x
}

/// Sums four values below 2^62 with no intermediate folds.
///
/// The precondition guarantees the plain integer sum cannot wrap 64 bits,
/// so lazy-reduction accumulation of small products needs no carry logic.
#[inline]
pub fn add4(x: u64, y: u64, z: u64, w: u64) -> u64 {
    debug_assert!(x < (1 << 62) && y < (1 << 62) && z < (1 << 62) && w < (1 << 62));
    x + y + z + w
}

/// Returns `p - x` for `0 <= x <= p`.
///
/// The boundary input `x == p` maps to zero; `negate(0)` returns p itself,
/// which is congruent to zero.
#[inline]
pub fn negate(x: u64) -> u64 {
    debug_assert!(x <= MODULUS);
    MODULUS - x
}

/// Full 64x64->128 multiply, returned as `(hi, lo)`.
///
/// The default build uses the native `u128` widening multiply. Enabling the
/// `soft-mul128` feature swaps in [`mul_64x64_soft`] for targets where
/// 128-bit arithmetic is emulated poorly by the compiler.
#[inline(always)]
pub fn mul_64x64(x: u64, y: u64) -> (u64, u64) {
    #[cfg(not(feature = "soft-mul128"))]
    {
        let wide = (x as u128) * (y as u128);
        ((wide >> 64) as u64, wide as u64)
    }
    #[cfg(feature = "soft-mul128")]
    {
        mul_64x64_soft(x, y)
    }
}

/// Schoolbook 64x64->128 multiply over 32-bit limbs, returned as `(hi, lo)`.
///
/// The middle-part accumulation adds two 32-bit values onto a 64-bit
/// product; the maximum is (2^32-1)^2 + 2*(2^32-1) = 2^64 - 1, so neither
/// accumulation step can wrap. That bound is pinned by a unit test rather
/// than trusted here.
pub fn mul_64x64_soft(x: u64, y: u64) -> (u64, u64) {
    let x0 = x & 0xffff_ffff;
    let x1 = x >> 32;
    let y0 = y & 0xffff_ffff;
    let y1 = y >> 32;

    let p00 = x0 * y0;
    let p01 = x0 * y1;
    let p10 = x1 * y0;
    let p11 = x1 * y1;

    let middle = p10 + (p00 >> 32) + (p01 & 0xffff_ffff);
    let hi = p11 + (middle >> 32) + (p01 >> 32);
    let lo = (middle << 32) | (p00 & 0xffff_ffff);
    (hi, lo)
}

/// Returns a 64-bit value congruent to `x * y` modulo p.
///
/// Accepts any 64-bit inputs. Writing the 128-bit product as
/// `lo + 2^64*a2 + 2^96*a3` with 32-bit `a2`, `a3`, the congruences
/// 2^64 = 2^32 - 1 and 2^96 = -1 reduce it to `lo + (2^32-1)*a2 - a3`;
/// the carry of the addition and the borrow of the subtraction each fold
/// once more.
#[inline]
pub fn multiply(x: u64, y: u64) -> u64 {
    let (hi, lo) = mul_64x64(x, y);

    let a2 = hi & 0xffff_ffff;
    let a3 = hi >> 32;
    let t = (a2 << 32) - a2;

    let mut r = lo;
    if adc(&mut r, t) {
        adc(&mut r, EPSILON);
    }
    if sbb(&mut r, a3) {
        sbb(&mut r, EPSILON);
    }
    r
}

/// Reduces any 64-bit value to its canonical residue below p.
///
/// Only the band `[p, 2^64)` lies outside the field, and that band is
/// narrower than p, so a single conditional fold is exact for every input.
#[inline]
pub fn finalize(x: u64) -> u64 {
    let (r, underflow) = x.overflowing_sub(MODULUS);
    if underflow {
        x
    } else {
        r
    }
}

/// Brings a raw 64-bit word into range for [`multiply`].
///
/// Kept as a distinct entry point so call sites can state the reduction
/// level they rely on; for this modulus the partial tier already coincides
/// with [`finalize`], since one conditional fold lands every input below p.
#[inline]
pub fn partial_reduce(x: u64) -> u64 {
    finalize(x)
}

/// Returns the multiplicative inverse of `x` modulo p, or 0 if none exists.
///
/// Unrolled unsigned extended GCD with one operand fixed to the modulus; it
/// accepts any 64-bit input and guarantees `0 < result < p` on success.
/// `x` divisible by p (including 0) has no inverse and yields 0.
///
/// Not constant-time; do not feed it secret-dependent values.
pub fn inverse(x: u64) -> u64 {
    let mut u3 = x % MODULUS;
    let mut u1: u64 = 1;

    if u3 == 0 {
        return 0;
    }

    let mut qt = MODULUS / u3;
    let mut v3 = MODULUS % u3;
    let mut v1 = qt;

    loop {
        if v3 == 0 {
            return if u3 == 1 { u1 } else { 0 };
        }

        qt = u3 / v3;
        u3 %= v3;
        u1 = u1.wrapping_add(qt.wrapping_mul(v1));

        if u3 == 0 {
            return if v3 == 1 { MODULUS.wrapping_sub(v1) } else { 0 };
        }

        qt = v3 / u3;
        v3 %= u3;
        v1 = v1.wrapping_add(qt.wrapping_mul(u1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::Random;

    const RANDOM_LOOPS: usize = 50_000;
    const MASK61: u64 = (1 << 61) - 1;
    const MASK62: u64 = (1 << 62) - 1;
    const MASK63: u64 = (1 << 63) - 1;

    fn reduce_wide(x: u128) -> u64 {
        (x % MODULUS as u128) as u64
    }

    fn congruent(a: u64, b: u64) -> bool {
        reduce_wide(a as u128) == reduce_wide(b as u128)
    }

    #[test]
    fn modulus_structure() {
        assert_eq!(MODULUS, 0u64.wrapping_sub(EPSILON));
        assert_eq!(EPSILON, (1u64 << 32) - 1);
    }

    #[test]
    fn negate_cancels_add() {
        let check = |x: u64| {
            let n = negate(x);
            assert_eq!(
                (x as u128 + n as u128) % MODULUS as u128,
                0,
                "x = {x:#x}"
            );
        };
        for x in 0..1000 {
            check(x);
        }
        for x in (MODULUS - 1000)..=MODULUS {
            check(x);
        }
        let mut prng = Random::new(1);
        for _ in 0..RANDOM_LOOPS {
            check(prng.next() & MODULUS);
        }
    }

    #[test]
    fn add_matches_reference() {
        let mut prng = Random::new(0);
        for _ in 0..RANDOM_LOOPS {
            let x = prng.next();
            let y = prng.next();
            let r = add(x, y);
            assert_eq!(
                reduce_wide(r as u128),
                reduce_wide(x as u128 + y as u128),
                "x = {x:#x} y = {y:#x}"
            );
        }
        // Double-fold boundary.
        let r = add(u64::MAX, u64::MAX);
        assert_eq!(reduce_wide(r as u128), reduce_wide(u64::MAX as u128 * 2));
    }

    #[test]
    fn add4_matches_reference() {
        let largest = MASK62;
        for x in (largest - 1000)..=largest {
            let r = add4(largest, largest, largest, x);
            let expected = reduce_wide(3 * largest as u128 + x as u128);
            assert_eq!(reduce_wide(r as u128), expected, "x = {x:#x}");
        }
        let mut prng = Random::new(0);
        for _ in 0..RANDOM_LOOPS {
            let x = prng.next() & MASK62;
            let y = prng.next() & MASK62;
            let z = prng.next() & MASK62;
            let w = prng.next() & MASK62;
            let r = add4(x, y, z, w);
            let expected = reduce_wide(x as u128 + y as u128 + z as u128 + w as u128);
            assert_eq!(reduce_wide(r as u128), expected);
        }
    }

    #[test]
    fn subtract_matches_reference() {
        let mut prng = Random::new(6);
        for _ in 0..RANDOM_LOOPS {
            let x = prng.next();
            let y = prng.next();
            let r = subtract(x, y);
            let expected = reduce_wide(x as u128 + MODULUS as u128 * 2 - y as u128);
            assert_eq!(reduce_wide(r as u128), expected, "x = {x:#x} y = {y:#x}");
        }
        assert_eq!(subtract(0, 0), 0);
        assert!(congruent(subtract(0, 1), MODULUS - 1));
    }

    #[test]
    fn multiply_matches_reference() {
        let check = |x: u64, y: u64| {
            let r = multiply(x, y);
            assert_eq!(
                reduce_wide(r as u128),
                reduce_wide(x as u128 * y as u128),
                "x = {x:#x} y = {y:#x}"
            );
        };

        for x in 0..200u64 {
            for y in x..200u64 {
                check(x, y);
            }
        }

        // Inputs that drive the final subtraction into a borrow: the product
        // high half is a multiple of 2^32 and the corrected low half is 0.
        check(1 << 62, 1 << 62);
        check(1 << 63, 1 << 63);
        check(1 << 48, 1 << 48);
        check(u64::MAX, u64::MAX);
        check(MODULUS - 1, MODULUS - 1);

        let mut prng = Random::new(4);
        for _ in 0..RANDOM_LOOPS {
            check(prng.next() & MASK62, prng.next() & MASK62);
        }
        for _ in 0..RANDOM_LOOPS {
            check(prng.next() & MASK61, prng.next() & MASK63);
        }
        for _ in 0..RANDOM_LOOPS {
            check(prng.next(), prng.next());
        }
    }

    #[test]
    fn multiply_commutes_and_associates() {
        let mut prng = Random::new(4);
        for _ in 0..10_000 {
            let a = prng.next() & MASK62;
            let b = prng.next() & MASK62;
            let c = prng.next() & MASK62;

            let r = finalize(multiply(multiply(c, b), a));
            let s = finalize(multiply(multiply(a, c), b));
            let t = finalize(multiply(multiply(a, b), c));
            assert_eq!(r, s);
            assert_eq!(s, t);
        }
    }

    #[test]
    fn soft_multiply_matches_native() {
        let edge = [
            0u64,
            1,
            2,
            0xffff_ffff,
            0x1_0000_0000,
            0x1_0000_0001,
            MODULUS,
            MODULUS - 1,
            1 << 62,
            1 << 63,
            u64::MAX,
            u64::MAX - 1,
        ];
        for &x in &edge {
            for &y in &edge {
                let wide = (x as u128) * (y as u128);
                let expected = ((wide >> 64) as u64, wide as u64);
                assert_eq!(mul_64x64_soft(x, y), expected, "x = {x:#x} y = {y:#x}");
            }
        }
        // The documented emulation identity from the original proof sketch.
        assert_eq!(
            mul_64x64_soft(u64::MAX, u64::MAX),
            (0xffff_ffff_ffff_fffe, 1)
        );

        let mut prng = Random::new(9);
        for _ in 0..RANDOM_LOOPS {
            let x = prng.next();
            let y = prng.next();
            let wide = (x as u128) * (y as u128);
            assert_eq!(
                mul_64x64_soft(x, y),
                ((wide >> 64) as u64, wide as u64),
                "x = {x:#x} y = {y:#x}"
            );
        }
    }

    #[test]
    fn finalize_is_canonical_everywhere() {
        let check = |x: u64| {
            let r = finalize(x);
            assert!(r < MODULUS, "x = {x:#x}");
            assert_eq!(r, reduce_wide(x as u128), "x = {x:#x}");
        };
        for x in 0..1000 {
            check(x);
        }
        for x in (u64::MAX - 1000)..=u64::MAX {
            check(x);
        }
        for x in (MODULUS - 1000)..=MODULUS.wrapping_add(1000) {
            check(x);
        }
        for x in (MASK62 - 1000)..=MASK62 + 1000 {
            check(x);
        }
        // 2^62 - 2 sits at a shift-chain saturation boundary; it is below
        // p, so it must come back unchanged.
        check(0x3fff_ffff_ffff_fffe);
        assert_eq!(finalize(0x3fff_ffff_ffff_fffe), 0x3fff_ffff_ffff_fffe);

        let mut prng = Random::new(3);
        for _ in 0..RANDOM_LOOPS {
            check(prng.next());
        }
    }

    #[test]
    fn partial_reduce_stays_congruent() {
        let masks = [
            u64::MAX,
            u64::MAX ^ (1 << 62),
            u64::MAX ^ (1 << 61),
            u64::MAX ^ (1 << 60),
            MASK63,
            MASK63 ^ (1 << 61),
            MASK62,
            MASK61,
        ];
        let check = |x: u64| {
            let r = partial_reduce(x);
            assert!(r < MODULUS, "x = {x:#x}");
            assert_eq!(r, reduce_wide(x as u128), "x = {x:#x}");
        };
        for &m in &masks {
            for delta in 0..1000u64 {
                check(m.wrapping_sub(delta));
                check(m.wrapping_add(delta));
            }
        }
        let mut prng = Random::new(2);
        for _ in 0..RANDOM_LOOPS {
            check(prng.next());
        }
    }

    #[test]
    fn inverse_round_trips() {
        let check = |x: u64| {
            let inv = inverse(x);
            if inv == 0 {
                assert_eq!(x % MODULUS, 0, "x = {x:#x} has an inverse");
                return;
            }
            assert!(inv < MODULUS, "x = {x:#x}");
            let p = multiply(partial_reduce(x), inv);
            assert_eq!(finalize(p), 1, "x = {x:#x}");
        };
        for x in 1..1000 {
            check(x);
        }
        check(0);
        check(MODULUS);
        check(MODULUS - 1);
        let mut prng = Random::new(5);
        for _ in 0..10_000 {
            check(prng.next());
        }
    }

    #[test]
    fn ambiguity_tracks_the_field_gap() {
        // Everything at or above p is ambiguous.
        assert!(is_ambiguous(MODULUS));
        assert!(is_ambiguous(u64::MAX));
        assert!(is_ambiguous(MODULUS - 1));
        // An ambiguous word with bit 63 cleared is still below p.
        assert!(is_ambiguous(AMBIGUITY_MASK));
        assert!(AMBIGUITY_MASK < MODULUS);
        // A cleared bit anywhere in 32..=62 puts the word below p.
        assert!(!is_ambiguous(MODULUS - EPSILON));
        assert!(MODULUS - EPSILON < MODULUS);
        let mut prng = Random::new(8);
        for _ in 0..RANDOM_LOOPS {
            let w = prng.next();
            if !is_ambiguous(w) {
                assert!(w < MODULUS, "w = {w:#x}");
            }
        }
    }
}
