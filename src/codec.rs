//! Mapping between generator words and the doubles `Math.random()` returns.
//!
//! The engine packs the top 52 bits of the state word into the mantissa of a
//! double in `[1, 2)` and subtracts one. Only those 52 bits survive, so
//! [`encode`] recovers exactly `word >> 12` and nothing more.

/// Low 52 bits of an IEEE-754 double.
pub const MANTISSA_MASK: u64 = (1 << 52) - 1;

/// Bit pattern of `1.0f64`: sign 0, biased exponent 1023, empty mantissa.
pub const ONE_BITS: u64 = 0x3FF0_0000_0000_0000;

/// Bits of the state word that never reach the output.
pub const DROPPED_BITS: u32 = 12;

#[inline]
pub fn decode(word: u64) -> f64 {
    f64::from_bits((word >> DROPPED_BITS) | ONE_BITS) - 1.0
}

/// Mantissa bits of `d + 1.0`. Does not validate `d`.
#[inline]
pub fn encode(d: f64) -> u64 {
    (d + 1.0).to_bits() & MANTISSA_MASK
}
