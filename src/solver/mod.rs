use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio_util::sync::CancellationToken;

pub mod bv;
pub mod linear;
pub mod process;
pub mod rewrites;
pub mod sexpr;
pub mod smtlib;

pub use bv::{BvTerm, Constraint, Problem, SortBv, Term};
pub use linear::LinearSolver;
pub use smtlib::SmtLibSolver;

/// Failures of a decision procedure that say nothing about satisfiability.
#[derive(Debug, Clone, Error)]
pub enum SolveError {
    #[error("solver timed out")]
    Timeout,

    #[error("solve cancelled")]
    Cancelled,

    #[error("unsupported problem: {0}")]
    Unsupported(String),

    #[error("solver backend failed: {0}")]
    Backend(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Multiplicity {
    Unique,
    /// Other models exist. `free_bits` is known when the backend can count them.
    Multiple { free_bits: Option<u32> },
    Unchecked,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Model {
    pub values: BTreeMap<String, u64>,
    pub multiplicity: Multiplicity,
}

impl Model {
    pub fn value(&self, name: &str) -> Option<u64> { self.values.get(name).copied() }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SolveOutcome {
    Sat(Model),
    Unsat,
}

/// Resource bounds for one solve call.
#[derive(Debug, Clone)]
pub struct SolveBudget {
    pub timeout: Option<Duration>,
    pub cancel: CancellationToken,
}

impl SolveBudget {
    pub fn new(timeout: Option<Duration>, cancel: CancellationToken) -> Self {
        Self { timeout, cancel }
    }

    pub fn unbounded() -> Self { Self::new(None, CancellationToken::new()) }

    pub fn with_timeout(&self, timeout: Option<Duration>) -> Self {
        Self { timeout, cancel: self.cancel.clone() }
    }

    /// Absolute deadline for this attempt; a timeout too large to represent
    /// means no deadline.
    pub fn deadline(&self) -> Option<Instant> { self.timeout.and_then(|t| Instant::now().checked_add(t)) }

    pub fn check(&self, deadline: Option<Instant>) -> Result<(), SolveError> {
        if self.cancel.is_cancelled() { return Err(SolveError::Cancelled); }
        match deadline {
            Some(d) if Instant::now() >= d => Err(SolveError::Timeout),
            _ => Ok(()),
        }
    }
}

impl Default for SolveBudget {
    fn default() -> Self { Self::unbounded() }
}

/// A decision procedure for quantifier-free bit-vector equality systems.
///
/// Implementations must not share mutable sessions between calls; every call
/// stands alone.
pub trait StateSolver {
    fn name(&self) -> &str;

    fn check(&self, problem: &Problem, budget: &SolveBudget) -> Result<SolveOutcome, SolveError>;
}

impl<S: StateSolver + ?Sized> StateSolver for Box<S> {
    fn name(&self) -> &str { (**self).name() }

    fn check(&self, problem: &Problem, budget: &SolveBudget) -> Result<SolveOutcome, SolveError> {
        (**self).check(problem, budget)
    }
}

impl<S: StateSolver + ?Sized> StateSolver for &S {
    fn name(&self) -> &str { (**self).name() }

    fn check(&self, problem: &Problem, budget: &SolveBudget) -> Result<SolveOutcome, SolveError> {
        (**self).check(problem, budget)
    }
}
