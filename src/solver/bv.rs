use std::collections::HashMap;
use std::sync::Arc;

use super::rewrites::simplify_bv;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SortBv {
    pub width: u32,
}

impl SortBv {
    pub const W64: SortBv = SortBv { width: 64 };

    pub fn mask(self) -> u64 {
        if self.width >= 64 { u64::MAX } else { (1u64 << self.width) - 1 }
    }
}

/// Shared handle to a term node. Sub-terms are reference counted so a chain of
/// generator steps forms a DAG instead of a tree.
pub type Term = Arc<BvTerm>;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BvTerm {
    Const { name: String, sort: SortBv },
    Value { bits: u64, sort: SortBv },
    Xor(Term, Term),
    Shl { a: Term, amount: u32 },
    Lshr { a: Term, amount: u32 },
}

impl BvTerm {
    pub fn sort(&self) -> SortBv {
        match self {
            BvTerm::Const { sort, .. } | BvTerm::Value { sort, .. } => *sort,
            BvTerm::Xor(a, _) | BvTerm::Shl { a, .. } | BvTerm::Lshr { a, .. } => a.sort(),
        }
    }

    pub fn as_value(&self) -> Option<u64> {
        match self {
            BvTerm::Value { bits, .. } => Some(*bits),
            _ => None,
        }
    }

    pub fn constant<S: Into<String>>(name: S, sort: SortBv) -> Term {
        Arc::new(BvTerm::Const { name: name.into(), sort })
    }

    pub fn value(bits: u64, sort: SortBv) -> Term {
        Arc::new(BvTerm::Value { bits: bits & sort.mask(), sort })
    }

    pub fn xor(a: &Term, b: &Term) -> Term {
        debug_assert_eq!(a.sort(), b.sort());
        simplify_bv(BvTerm::Xor(a.clone(), b.clone()))
    }

    pub fn shl(a: &Term, amount: u32) -> Term {
        simplify_bv(BvTerm::Shl { a: a.clone(), amount })
    }

    pub fn lshr(a: &Term, amount: u32) -> Term {
        simplify_bv(BvTerm::Lshr { a: a.clone(), amount })
    }

    /// Evaluates the term under a concrete assignment. Returns `None` when a
    /// constant has no assigned value.
    pub fn eval(&self, env: &HashMap<String, u64>) -> Option<u64> {
        let mut memo = HashMap::new();
        self.eval_memo(env, &mut memo)
    }

    fn eval_memo(&self, env: &HashMap<String, u64>, memo: &mut HashMap<usize, u64>) -> Option<u64> {
        let key = ptr_id(self);
        if let Some(&v) = memo.get(&key) { return Some(v); }
        let mask = self.sort().mask();
        let v = match self {
            BvTerm::Const { name, .. } => env.get(name)? & mask,
            BvTerm::Value { bits, .. } => *bits,
            BvTerm::Xor(a, b) => a.eval_memo(env, memo)? ^ b.eval_memo(env, memo)?,
            BvTerm::Shl { a, amount } => shl_bits(a.eval_memo(env, memo)?, *amount) & mask,
            BvTerm::Lshr { a, amount } => lshr_bits(a.eval_memo(env, memo)?, *amount),
        };
        memo.insert(key, v);
        Some(v)
    }

    /// Number of distinct nodes reachable from this term.
    pub fn dag_size(&self) -> usize {
        let mut seen = std::collections::HashSet::new();
        let mut stack: Vec<&BvTerm> = vec![self];
        while let Some(t) = stack.pop() {
            if !seen.insert(ptr_id(t)) { continue; }
            match t {
                BvTerm::Const { .. } | BvTerm::Value { .. } => {}
                BvTerm::Shl { a, .. } | BvTerm::Lshr { a, .. } => stack.push(a),
                BvTerm::Xor(a, b) => { stack.push(a); stack.push(b); }
            }
        }
        seen.len()
    }
}

pub(crate) fn ptr_id(t: &BvTerm) -> usize { t as *const _ as usize }

pub(crate) fn shl_bits(v: u64, amount: u32) -> u64 {
    if amount >= 64 { 0 } else { v << amount }
}

pub(crate) fn lshr_bits(v: u64, amount: u32) -> u64 {
    if amount >= 64 { 0 } else { v >> amount }
}

/// Equality between two bit-vector terms of the same sort.
#[derive(Debug, Clone)]
pub struct Constraint {
    pub lhs: Term,
    pub rhs: Term,
}

impl Constraint {
    pub fn eq(lhs: Term, rhs: Term) -> Self {
        debug_assert_eq!(lhs.sort(), rhs.sort());
        Self { lhs, rhs }
    }

    pub fn holds(&self, env: &HashMap<String, u64>) -> Option<bool> {
        Some(self.lhs.eval(env)? == self.rhs.eval(env)?)
    }
}

/// A conjunction of equalities over declared bit-vector unknowns.
#[derive(Debug, Clone, Default)]
pub struct Problem {
    pub vars: Vec<(String, SortBv)>,
    pub assertions: Vec<Constraint>,
}

impl Problem {
    pub fn new() -> Self { Self::default() }

    pub fn declare<S: Into<String>>(&mut self, name: S, sort: SortBv) -> Term {
        let name = name.into();
        if !self.vars.iter().any(|(n, _)| *n == name) {
            self.vars.push((name.clone(), sort));
        }
        BvTerm::constant(name, sort)
    }

    pub fn assert(&mut self, c: Constraint) { self.assertions.push(c); }

    pub fn var_bits(&self) -> usize {
        self.vars.iter().map(|(_, s)| s.width as usize).sum()
    }
}
