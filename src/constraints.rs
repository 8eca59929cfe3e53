use tracing::debug;

use crate::codec::DROPPED_BITS;
use crate::observe::Observation;
use crate::solver::{Constraint, Problem, SortBv, Term};
use crate::transition::step;
use crate::word::{word64, Word};

pub const STATE0: &str = "state0";
pub const STATE1: &str = "state1";

/// Equality system over the two unknown initial state words.
#[derive(Debug, Clone)]
pub struct StateConstraints {
    pub problem: Problem,
    pub state0: Term,
    pub state1: Term,
}

/// Threads a symbolic state through one step per observation and pins the
/// observable 52 bits of each resulting `s0`.
pub fn build(observations: &[Observation]) -> StateConstraints {
    let mut problem = Problem::new();
    let state0 = problem.declare(STATE0, SortBv::W64);
    let state1 = problem.declare(STATE1, SortBv::W64);

    let (mut s0, mut s1) = (state0.clone(), state1.clone());
    for obs in observations {
        (s0, s1) = step(&s0, &s1);
        problem.assert(Constraint::eq(s0.lshr(DROPPED_BITS), word64(obs.mantissa())));
    }
    debug!(
        observations = observations.len(),
        constraints = problem.assertions.len(),
        dag_nodes = s1.dag_size(),
        "built state constraints"
    );
    StateConstraints { problem, state0, state1 }
}
