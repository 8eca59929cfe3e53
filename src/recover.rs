use std::time::Duration;

use tracing::{debug, info, warn};

use crate::constraints::{self, STATE0, STATE1};
use crate::error::{RecoveryError, RecoveryResult};
use crate::observe::{self, Observation};
use crate::predict::Predictor;
use crate::solver::{Model, Multiplicity, Problem, SolveBudget, SolveError, SolveOutcome, StateSolver};
use crate::transition::GeneratorState;

/// How solver timeouts are retried. Other failures are never retried.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Factor applied to the timeout before each retry.
    pub timeout_backoff: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self { Self { max_attempts: 3, timeout_backoff: 2.0 } }
}

/// Validates observations, builds the constraint system, solves it and checks
/// the model before handing out a state.
pub struct Recovery<S> {
    solver: S,
    policy: RetryPolicy,
}

impl<S: StateSolver> Recovery<S> {
    pub fn new(solver: S) -> Self { Self { solver, policy: RetryPolicy::default() } }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Recovers the state the generator was in before the first observation.
    pub fn recover(&self, values: &[f64], budget: &SolveBudget) -> RecoveryResult<GeneratorState> {
        let observations = observe::validate(values)?;
        let system = constraints::build(&observations);
        let model = self.solve(&system.problem, budget)?;

        let word = |name: &str| {
            model.value(name).ok_or_else(|| RecoveryError::SolverError(format!("model has no value for {name}")))
        };
        let state = GeneratorState::new(word(STATE0)?, word(STATE1)?);
        verify(state, &observations)?;

        match model.multiplicity {
            Multiplicity::Unique => {}
            Multiplicity::Multiple { free_bits } => {
                warn!(%state, ?free_bits, "observations do not pin a single state");
                return Err(RecoveryError::AmbiguousModel { candidate: state, free_bits });
            }
            Multiplicity::Unchecked => warn!(%state, "uniqueness of the recovered state was not checked"),
        }
        info!(%state, observations = observations.len(), solver = self.solver.name(), "recovered generator state");
        Ok(state)
    }

    /// Recovers the state and positions a predictor just past the observations.
    pub fn predictor(&self, values: &[f64], budget: &SolveBudget) -> RecoveryResult<Predictor> {
        let state = self.recover(values, budget)?;
        Ok(Predictor::new(state, values.len()))
    }

    fn solve(&self, problem: &Problem, budget: &SolveBudget) -> RecoveryResult<Model> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut timeout = budget.timeout;
        for attempt in 1..=max_attempts {
            debug!(attempt, ?timeout, solver = self.solver.name(), "solving");
            match self.solver.check(problem, &budget.with_timeout(timeout)) {
                Ok(SolveOutcome::Sat(model)) => return Ok(model),
                Ok(SolveOutcome::Unsat) => return Err(RecoveryError::Unsatisfiable),
                Err(SolveError::Timeout) if attempt < max_attempts => {
                    timeout = timeout.map(|t| grow_timeout(t, self.policy.timeout_backoff));
                    warn!(attempt, ?timeout, "solver timed out, retrying");
                }
                Err(SolveError::Timeout | SolveError::Cancelled) => {
                    return Err(RecoveryError::SolverTimeout { attempts: attempt });
                }
                Err(e) => return Err(RecoveryError::SolverError(e.to_string())),
            }
        }
        Err(RecoveryError::SolverTimeout { attempts: max_attempts })
    }
}

/// Scales `t` by `factor`, keeping `t` when the product is not a valid,
/// larger duration.
fn grow_timeout(t: Duration, factor: f64) -> Duration {
    Duration::try_from_secs_f64(t.as_secs_f64() * factor)
        .ok()
        .filter(|grown| *grown >= t)
        .unwrap_or(t)
}

/// Replays the candidate concretely; a backend that returns a model which
/// does not reproduce the observations is reported as a solver error.
fn verify(state: GeneratorState, observations: &[Observation]) -> RecoveryResult<()> {
    let mut s = state;
    for obs in observations {
        s = s.next();
        if crate::codec::encode(s.output()) != obs.mantissa() {
            return Err(RecoveryError::SolverError(format!(
                "model {state} does not reproduce observation {}",
                obs.index
            )));
        }
    }
    Ok(())
}
