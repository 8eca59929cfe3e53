//! The xorshift128+ recurrence, written once for both concrete and symbolic
//! words.

use std::fmt;

use crate::codec;
use crate::word::Word;

/// One step of the generator. `s0'` is the value the output is drawn from.
pub fn step<W: Word>(s0: &W, s1: &W) -> (W, W) {
    let mut t = s1.clone();
    t = t.xor(&t.shl(23));
    t = t.xor(&t.lshr(17));
    t = t.xor(s0);
    t = t.xor(&s0.lshr(26));
    (s1.clone(), t)
}

/// Complete internal state of one generator instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GeneratorState {
    pub s0: u64,
    pub s1: u64,
}

impl GeneratorState {
    pub const fn new(s0: u64, s1: u64) -> Self { Self { s0, s1 } }

    #[must_use]
    pub fn next(self) -> Self {
        let (s0, s1) = step(&self.s0, &self.s1);
        Self { s0, s1 }
    }

    /// Advances `n` steps.
    #[must_use]
    pub fn advance(self, n: usize) -> Self {
        (0..n).fold(self, |s, _| s.next())
    }

    /// The double this state yields when it is the result of a step.
    pub fn output(self) -> f64 { codec::decode(self.s0) }
}

impl From<(u64, u64)> for GeneratorState {
    fn from((s0, s1): (u64, u64)) -> Self { Self::new(s0, s1) }
}

impl From<GeneratorState> for (u64, u64) {
    fn from(s: GeneratorState) -> Self { (s.s0, s.s1) }
}

impl fmt::Display for GeneratorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(s0={:#018x}, s1={:#018x})", self.s0, self.s1)
    }
}
