//! 64-bit word arithmetic shared by the concrete and symbolic generator.

use crate::solver::{BvTerm, SortBv, Term};

/// The operations the xorshift128+ recurrence needs. Implemented for `u64`
/// (concrete, wrapping) and for [`Term`] (symbolic, builds bit-vector terms).
pub trait Word: Clone {
    fn xor(&self, other: &Self) -> Self;
    /// Left shift, discarding bits shifted past bit 63.
    fn shl(&self, amount: u32) -> Self;
    /// Logical right shift, zero-filling from the top.
    fn lshr(&self, amount: u32) -> Self;
}

impl Word for u64 {
    #[inline]
    fn xor(&self, other: &Self) -> Self { self ^ other }

    #[inline]
    fn shl(&self, amount: u32) -> Self { self.checked_shl(amount).unwrap_or(0) }

    #[inline]
    fn lshr(&self, amount: u32) -> Self { self.checked_shr(amount).unwrap_or(0) }
}

impl Word for Term {
    fn xor(&self, other: &Self) -> Self { BvTerm::xor(self, other) }

    fn shl(&self, amount: u32) -> Self { BvTerm::shl(self, amount) }

    fn lshr(&self, amount: u32) -> Self { BvTerm::lshr(self, amount) }
}

pub fn word64(v: u64) -> Term { BvTerm::value(v, SortBv::W64) }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concrete_shifts_drop_overflowing_bits() {
        assert_eq!(Word::shl(&0xFFFF_0000_0000_0001u64, 23), 0x0000_0000_0080_0000);
        assert_eq!(Word::lshr(&0x8000_0000_0000_0000u64, 63), 1);
        assert_eq!(Word::shl(&1u64, 64), 0);
    }

    #[test]
    fn symbolic_constants_fold_like_concrete() {
        let v = 0xDEAD_BEEF_CAFE_F00Du64;
        let t = word64(v);
        assert_eq!(Word::shl(&t, 23).as_value(), Some(Word::shl(&v, 23)));
        assert_eq!(Word::lshr(&t, 17).as_value(), Some(Word::lshr(&v, 17)));
        assert_eq!(Word::xor(&t, &word64(1)).as_value(), Some(v ^ 1));
    }
}
