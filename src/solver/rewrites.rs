use std::sync::Arc;

use super::bv::{lshr_bits, shl_bits, BvTerm, Term};

/// Very small collection of local simplifications to keep terms small.
/// Fully constant sub-terms fold to values, so a symbolic step applied to
/// constant inputs yields the concrete result.
pub fn simplify_bv(t: BvTerm) -> Term {
    let sort = t.sort();
    match t {
        BvTerm::Xor(a, b) => match (a.as_value(), b.as_value()) {
            (Some(x), Some(y)) => BvTerm::value(x ^ y, sort),
            (Some(0), None) => b,
            (None, Some(0)) => a,
            _ if Arc::ptr_eq(&a, &b) => BvTerm::value(0, sort),
            _ => Arc::new(BvTerm::Xor(a, b)),
        },
        BvTerm::Shl { a, amount } => match a.as_value() {
            _ if amount == 0 => a,
            _ if amount >= sort.width => BvTerm::value(0, sort),
            Some(x) => BvTerm::value(shl_bits(x, amount), sort),
            None => Arc::new(BvTerm::Shl { a, amount }),
        },
        BvTerm::Lshr { a, amount } => match a.as_value() {
            _ if amount == 0 => a,
            _ if amount >= sort.width => BvTerm::value(0, sort),
            Some(x) => BvTerm::value(lshr_bits(x, amount), sort),
            None => Arc::new(BvTerm::Lshr { a, amount }),
        },
        other => Arc::new(other),
    }
}

#[cfg(test)]
mod tests {
    use super::super::bv::SortBv;
    use super::*;

    #[test]
    fn folds_constants() {
        let a = BvTerm::value(0b1010, SortBv::W64);
        let b = BvTerm::value(0b0110, SortBv::W64);
        assert_eq!(BvTerm::xor(&a, &b).as_value(), Some(0b1100));
        assert_eq!(BvTerm::shl(&a, 62).as_value(), Some(0x8000_0000_0000_0000));
        assert_eq!(BvTerm::lshr(&a, 1).as_value(), Some(0b101));
    }

    #[test]
    fn drops_identities() {
        let x = BvTerm::constant("x", SortBv::W64);
        let zero = BvTerm::value(0, SortBv::W64);
        assert!(Arc::ptr_eq(&BvTerm::xor(&x, &zero), &x));
        assert!(Arc::ptr_eq(&BvTerm::shl(&x, 0), &x));
        assert_eq!(BvTerm::xor(&x, &x).as_value(), Some(0));
        assert_eq!(BvTerm::lshr(&x, 64).as_value(), Some(0));
    }
}
