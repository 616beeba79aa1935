//! Fixed-point entropy term `H(u) = -ln(u)`, expressed in µ-nats
//! (natural-log units scaled by 1,000,000) so every implementation of
//! this consensus rule produces bit-identical scores without touching
//! floating point.
//!
//! `u` is represented as a ratio `hash_value / max_value` with
//! `1 <= hash_value <= max_value`; `hash_value == 0` (i.e. `u == 0`) is
//! a hard rejection handled by the caller before this function is ever
//! invoked, since `-ln(0)` is undefined.

/// Number of fractional bits used while extracting the mantissa of
/// `log2`; 20 bits gives better than 1-µ-nat accuracy across the full
/// `u64` range, which is comfortably inside the scorer's µ-nat ULP
/// budget.
const FRAC_BITS: u32 = 20;
const FRAC_SCALE: u64 = 1 << FRAC_BITS;

/// `ln(2)`, scaled by 1_000_000.
const LN2_MICRONATS: u128 = 693_147;

/// Computes `H(u) = -ln(hash_value / max_value)` in µ-nats.
///
/// Callers reachable from outside this crate go through
/// [`crate::scorer::PoiesScorer::score`], which turns an out-of-range
/// `hash_value` into a typed [`crate::scorer::ScoreError`] rejection
/// before ever calling this function; the checks below are therefore
/// debug-only assertions of that already-enforced precondition, not a
/// second line of defense against untrusted input.
pub fn shortfall_micronats(hash_value: u64, max_value: u64) -> u64 {
    debug_assert!(hash_value > 0, "u == 0 must be rejected before scoring");
    debug_assert!(
        hash_value <= max_value,
        "hash_value must not exceed max_value"
    );

    if hash_value == max_value {
        return 0;
    }

    let log2_q = log2_fixed_point(max_value, hash_value);
    ((log2_q as u128 * LN2_MICRONATS) / FRAC_SCALE as u128) as u64
}

/// Computes `log2(p / q)` for integers `p >= q >= 1`, returned as a
/// fixed-point value scaled by `2^FRAC_BITS` (i.e. the returned integer
/// divided by `FRAC_SCALE` is the real-valued log2).
///
/// Uses the standard bit-length-plus-repeated-squaring technique: the
/// integer part comes from comparing bit lengths, and each fractional
/// bit comes from squaring a mantissa held in `[1, 2)` and checking
/// whether it has overflowed into `[2, 4)`.
fn log2_fixed_point(p: u64, q: u64) -> u64 {
    debug_assert!(p >= q && q >= 1);

    // Find the integer part n0 = floor(log2(p/q)): the largest n with
    // q * 2^n <= p.
    let mut n0: u32 = 0;
    {
        let mut scaled_q: u128 = q as u128;
        while scaled_q.checked_mul(2).map(|v| v <= p as u128).unwrap_or(false) {
            scaled_q *= 2;
            n0 += 1;
        }
    }

    // Normalize the mantissa m = p / (q * 2^n0) into Q32.32-style fixed
    // point with FRAC_BITS fractional bits, landing in [2^FRAC_BITS,
    // 2^(FRAC_BITS+1)) to represent a real value in [1, 2).
    let denom = (q as u128) << n0;
    let mut mantissa: u64 = (((p as u128) << FRAC_BITS) / denom) as u64;

    let mut frac_acc: u64 = 0;
    for i in 0..FRAC_BITS {
        let squared = ((mantissa as u128) * (mantissa as u128)) >> FRAC_BITS;
        if squared >= (2 * FRAC_SCALE as u128) {
            frac_acc |= 1 << (FRAC_BITS - 1 - i);
            mantissa = (squared >> 1) as u64;
        } else {
            mantissa = squared as u64;
        }
    }

    (n0 as u64) * FRAC_SCALE + frac_acc
}
