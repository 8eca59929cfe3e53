use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use super::bv::{ptr_id, BvTerm, Problem, Term};
use super::{Model, Multiplicity, SolveBudget, SolveError, SolveOutcome, StateSolver};

/// Row over GF(2): a bitset of variable bits plus a constant bit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Affine {
    words: Vec<u64>,
    pub constant: bool,
}

impl Affine {
    fn zero(num_vars: usize) -> Self {
        Self { words: vec![0; num_vars.div_ceil(64)], constant: false }
    }

    fn var(num_vars: usize, v: usize) -> Self {
        let mut a = Self::zero(num_vars);
        a.words[v / 64] |= 1 << (v % 64);
        a
    }

    fn xor_assign(&mut self, other: &Affine) {
        for (w, o) in self.words.iter_mut().zip(&other.words) { *w ^= o; }
        self.constant ^= other.constant;
    }

    fn bit(&self, v: usize) -> bool { (self.words[v / 64] >> (v % 64)) & 1 == 1 }

    fn is_const(&self) -> bool { self.words.iter().all(|&w| w == 0) }
}

/// Lowers XOR/shift/NOT terms to one affine form per output bit. Every term in
/// that fragment is linear over GF(2), so the lowering is exact.
pub struct LinearBlaster {
    num_vars: usize,
    var_bits: HashMap<(String, u32), usize>,
    cache: HashMap<usize, Arc<Vec<Affine>>>,
}

impl LinearBlaster {
    pub fn new(problem: &Problem) -> Self {
        let mut var_bits = HashMap::new();
        let mut next = 0;
        for (name, sort) in &problem.vars {
            for i in 0..sort.width {
                var_bits.insert((name.clone(), i), next);
                next += 1;
            }
        }
        Self { num_vars: next, var_bits, cache: HashMap::new() }
    }

    pub fn num_vars(&self) -> usize { self.num_vars }

    pub fn var_index(&self, name: &str, bit: u32) -> Option<usize> {
        self.var_bits.get(&(name.to_string(), bit)).copied()
    }

    pub fn emit_bits(&mut self, t: &Term) -> Result<Arc<Vec<Affine>>, SolveError> {
        let key = ptr_id(t);
        if let Some(bits) = self.cache.get(&key) { return Ok(bits.clone()); }
        let w = t.sort().width as usize;
        let n = self.num_vars;
        let bits: Vec<Affine> = match &**t {
            BvTerm::Const { name, sort } => (0..sort.width)
                .map(|i| {
                    self.var_index(name, i)
                        .map(|v| Affine::var(n, v))
                        .ok_or_else(|| SolveError::Unsupported(format!("undeclared symbol {name}")))
                })
                .collect::<Result<_, _>>()?,
            BvTerm::Value { bits, .. } => (0..w)
                .map(|i| Affine { constant: (bits >> i) & 1 == 1, ..Affine::zero(n) })
                .collect(),
            BvTerm::Xor(a, b) => {
                let la = self.emit_bits(a)?;
                let lb = self.emit_bits(b)?;
                la.iter().zip(lb.iter()).map(|(x, y)| { let mut z = x.clone(); z.xor_assign(y); z }).collect()
            }
            BvTerm::Shl { a, amount } => {
                let la = self.emit_bits(a)?;
                let k = *amount as usize;
                (0..w).map(|i| if i >= k { la[i - k].clone() } else { Affine::zero(n) }).collect()
            }
            BvTerm::Lshr { a, amount } => {
                let la = self.emit_bits(a)?;
                let k = *amount as usize;
                (0..w).map(|i| if i + k < w { la[i + k].clone() } else { Affine::zero(n) }).collect()
            }
        };
        let bits = Arc::new(bits);
        self.cache.insert(key, bits.clone());
        Ok(bits)
    }
}

/// In-process decision procedure for equality systems in the linear
/// bit-vector fragment. Gauss-Jordan elimination gives an exact answer: a
/// contradiction row means unsat, and the rank deficit counts free bits.
#[derive(Debug, Default, Clone)]
pub struct LinearSolver;

impl LinearSolver {
    pub fn new() -> Self { Self }
}

impl StateSolver for LinearSolver {
    fn name(&self) -> &str { "linear" }

    fn check(&self, problem: &Problem, budget: &SolveBudget) -> Result<SolveOutcome, SolveError> {
        let deadline = budget.deadline();
        let mut bb = LinearBlaster::new(problem);
        let n = bb.num_vars();

        let mut rows: Vec<Affine> = Vec::new();
        for c in &problem.assertions {
            let l = bb.emit_bits(&c.lhs)?;
            let r = bb.emit_bits(&c.rhs)?;
            for (x, y) in l.iter().zip(r.iter()) {
                let mut row = x.clone();
                row.xor_assign(y);
                if row.is_const() && !row.constant { continue; }
                rows.push(row);
            }
        }
        debug!(vars = n, rows = rows.len(), "linear system built");

        let mut pivots: Vec<usize> = Vec::new();
        let mut rank = 0;
        for col in 0..n {
            budget.check(deadline)?;
            let Some(p) = (rank..rows.len()).find(|&r| rows[r].bit(col)) else { continue };
            rows.swap(rank, p);
            let pivot = rows[rank].clone();
            for (r, row) in rows.iter_mut().enumerate() {
                if r != rank && row.bit(col) { row.xor_assign(&pivot); }
            }
            pivots.push(col);
            rank += 1;
        }

        if rows[rank..].iter().any(|r| r.constant) {
            debug!(rank, "linear system inconsistent");
            return Ok(SolveOutcome::Unsat);
        }

        // Free bits are fixed to zero; each pivot row then reads off its variable.
        let mut assignment = vec![false; n];
        for (r, &col) in pivots.iter().enumerate() {
            assignment[col] = rows[r].constant;
        }

        let mut values = std::collections::BTreeMap::new();
        for (name, sort) in &problem.vars {
            let mut v = 0u64;
            for i in 0..sort.width {
                if let Some(idx) = bb.var_index(name, i) {
                    if assignment[idx] { v |= 1 << i; }
                }
            }
            values.insert(name.clone(), v);
        }

        let free_bits = (n - rank) as u32;
        let multiplicity = if free_bits == 0 { Multiplicity::Unique } else { Multiplicity::Multiple { free_bits: Some(free_bits) } };
        debug!(rank, free_bits, "linear system solved");
        Ok(SolveOutcome::Sat(Model { values, multiplicity }))
    }
}

#[cfg(test)]
mod tests {
    use super::super::bv::{Constraint, SortBv};
    use super::*;

    fn w64(v: u64) -> Term { BvTerm::value(v, SortBv::W64) }

    #[test]
    fn solves_hand_checkable_system() {
        // x ^ (x >> 1) == 0b110 has the unique solution x = 0b100.
        let mut p = Problem::new();
        let x = p.declare("x", SortBv::W64);
        p.assert(Constraint::eq(BvTerm::xor(&x, &BvTerm::lshr(&x, 1)), w64(0b110)));
        let SolveOutcome::Sat(m) = LinearSolver.check(&p, &SolveBudget::unbounded()).unwrap() else { panic!("expected sat") };
        assert_eq!(m.value("x"), Some(0b100));
        assert_eq!(m.multiplicity, Multiplicity::Unique);
    }

    #[test]
    fn detects_contradiction() {
        let mut p = Problem::new();
        let x = p.declare("x", SortBv::W64);
        p.assert(Constraint::eq(x.clone(), w64(1)));
        p.assert(Constraint::eq(BvTerm::xor(&x, &w64(u64::MAX)), w64(u64::MAX)));
        assert!(matches!(LinearSolver.check(&p, &SolveBudget::unbounded()).unwrap(), SolveOutcome::Unsat));
    }

    #[test]
    fn counts_free_bits() {
        // Only the top 60 bits of x are pinned.
        let mut p = Problem::new();
        let x = p.declare("x", SortBv::W64);
        p.assert(Constraint::eq(BvTerm::lshr(&x, 4), w64(0xABC)));
        let SolveOutcome::Sat(m) = LinearSolver.check(&p, &SolveBudget::unbounded()).unwrap() else { panic!("expected sat") };
        assert_eq!(m.multiplicity, Multiplicity::Multiple { free_bits: Some(4) });
        assert_eq!(m.value("x").map(|v| v >> 4), Some(0xABC));
    }

    #[test]
    fn rejects_undeclared_symbols() {
        let mut p = Problem::new();
        p.declare("x", SortBv::W64);
        let y = BvTerm::constant("y", SortBv::W64);
        p.assert(Constraint::eq(y, w64(0)));
        assert!(matches!(LinearSolver.check(&p, &SolveBudget::unbounded()), Err(SolveError::Unsupported(_))));
    }

    #[test]
    fn honours_cancellation() {
        let mut p = Problem::new();
        let x = p.declare("x", SortBv::W64);
        p.assert(Constraint::eq(x, w64(7)));
        let budget = SolveBudget::unbounded();
        budget.cancel.cancel();
        assert!(matches!(LinearSolver.check(&p, &budget), Err(SolveError::Cancelled)));
    }
}
