//! Numeric primitives backing the builtin registry.
//!
//! [`gamma`] provides the real-valued gamma function via the Lanczos
//! approximation (g = 7, n = 9), the same approximation and reference used
//! by the teacher crate's special-function module: C. Lanczos, "A precision
//! approximation of the gamma function", J. SIAM Numer. Anal. Ser. B, Vol.
//! 1, 1964, and NIST DLMF §5.10.

use std::cell::Cell;

/// Lanczos `g` parameter.
const LANCZOS_G: f64 = 7.0;

/// Lanczos coefficients for `g = 7`, `n = 9`.
const LANCZOS_COEFFICIENTS: [f64; 9] = [
    0.999_999_999_999_809_9,
    676.520_368_121_885_1,
    -1_259.139_216_722_402_8,
    771.323_428_777_653_1,
    -176.615_029_162_140_6,
    12.507_343_278_686_905,
    -0.138_571_095_265_720_12,
    9.984_369_578_019_572e-6,
    1.505_632_735_149_311_6e-7,
];

/// The real gamma function, `Γ(x)`.
///
/// Uses the reflection formula for `x < 0.5` and the Lanczos series
/// directly otherwise. Returns `NaN` at the non-positive integer poles.
#[must_use]
pub fn gamma(x: f64) -> f64 {
    if x.fract() == 0.0 && x <= 0.0 {
        return f64::NAN;
    }
    if x < 0.5 {
        std::f64::consts::PI / ((std::f64::consts::PI * x).sin() * gamma(1.0 - x))
    } else {
        let x = x - 1.0;
        let mut a = LANCZOS_COEFFICIENTS[0];
        let t = x + LANCZOS_G + 0.5;
        for (i, c) in LANCZOS_COEFFICIENTS.iter().enumerate().skip(1) {
            a += c / (x + i as f64);
        }
        (2.0 * std::f64::consts::PI).sqrt() * t.powf(x + 0.5) * (-t).exp() * a
    }
}

/// Generalized factorial via the gamma function, resolving the open
/// question of what `fac` means for non-integer and negative arguments:
/// `fac(a) = Γ(a + 1)` for `a > 0`, `fac(0) = 1` exactly, and `NaN` for
/// `a < 0` (the gamma function's poles there make the "factorial" reading
/// meaningless, so we don't try to extend it through the reflection
/// formula).
#[must_use]
pub fn fac(a: f64) -> f64 {
    if a < 0.0 {
        f64::NAN
    } else if a == 0.0 {
        1.0
    } else {
        gamma(a + 1.0)
    }
}

/// Combinations, `n choose r`: `NaN` if `n < 0 || r < 0 || n < r`; `+inf`
/// if either input exceeds `2^32 - 1` or the exact result overflows; else
/// the exact integer binomial coefficient, computed over `u128` rather
/// than through `fac`'s float division so it stays exact for inputs where
/// `fac(n)` itself would already have lost precision or overflowed to
/// infinity.
#[must_use]
pub fn ncr(n: f64, r: f64) -> f64 {
    if n < 0.0 || r < 0.0 || n < r {
        return f64::NAN;
    }
    if n > f64::from(u32::MAX) || r > f64::from(u32::MAX) {
        return f64::INFINITY;
    }
    let n = n.trunc() as u128;
    let r = (r.trunc() as u128).min(n - r.trunc() as u128);
    let mut result: u128 = 1;
    for i in 0..r {
        result = match result.checked_mul(n - i) {
            Some(v) => v,
            None => return f64::INFINITY,
        };
        result /= i + 1;
    }
    result as f64
}

/// Permutations, `n pick r`: `ncr(n, r) * fac(r)`, inheriting `ncr`'s
/// domain (`NaN`/`+inf`) for out-of-range or overflowing inputs.
#[must_use]
pub fn npr(n: f64, r: f64) -> f64 {
    ncr(n, r) * fac(r)
}

/// Greatest common divisor of the truncated magnitudes of `a` and `b`.
#[must_use]
pub fn gcd(a: f64, b: f64) -> f64 {
    let mut a = a.trunc().abs() as i64;
    let mut b = b.trunc().abs() as i64;
    while b != 0 {
        let t = b;
        b = a % b;
        a = t;
    }
    a as f64
}

/// Sign of `x`: `-1.0`, `0.0`, or `1.0`. `NaN` input yields `NaN`.
#[must_use]
pub fn sign(x: f64) -> f64 {
    if x.is_nan() {
        f64::NAN
    } else if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Clamp `x` into `[lo, hi]`.
#[must_use]
pub fn clamp(x: f64, lo: f64, hi: f64) -> f64 {
    x.max(lo).min(hi)
}

/// Round-to-nearest-even conversion from `f64` to the 53-bit signed integer
/// domain bitwise operators work in (§4.5). Values outside the representable
/// `i64` range saturate per [`f64::to_int_unchecked`]'s documented
/// alternative, `as` casting, which saturates rather than producing
/// undefined behavior for out-of-range floats as of Rust's defined `as`
/// semantics.
#[must_use]
pub fn to_bitwise_int(x: f64) -> i64 {
    x.round_ties_even() as i64
}

/// Mask a 53-bit-domain conversion back down to 53 bits, as `~` requires.
pub const BITWISE_MASK_53: i64 = 0x1F_FFFF_FFFF_FFFF;

/// Convert a bitwise-domain `i64` result back to `f64`.
#[must_use]
pub fn from_bitwise_int(x: i64) -> f64 {
    x as f64
}

/// A host-owned variable cell, re-exported here for convenience in host
/// application code constructing [`crate::bindings::Bindings`] tables.
pub type VarCell = Cell<f64>;
