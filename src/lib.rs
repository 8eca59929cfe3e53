//! Recovers the internal state of an xorshift128+ generator from observed
//! `Math.random()` doubles and predicts the outputs that follow.
//!
//! ```
//! use xs128p_recover::{GeneratorState, LinearSolver, Recovery, SolveBudget};
//!
//! let mut s = GeneratorState::new(0x1234, 0x5678);
//! let observed: Vec<f64> = (0..5).map(|_| { s = s.next(); s.output() }).collect();
//! let predictor = Recovery::new(LinearSolver::new())
//!     .predictor(&observed, &SolveBudget::unbounded())?;
//! assert_eq!(predictor.take(1)[0], s.next().output());
//! # Ok::<(), xs128p_recover::RecoveryError>(())
//! ```

pub mod codec;
pub mod config;
pub mod constraints;
pub mod error;
pub mod observe;
pub mod predict;
pub mod recover;
pub mod solver;
pub mod transition;
pub mod word;

pub use config::RecoveryConfig;
pub use error::{RecoveryError, RecoveryResult};
pub use predict::{Predictions, Predictor};
pub use recover::{Recovery, RetryPolicy};
pub use solver::{LinearSolver, SmtLibSolver, SolveBudget, StateSolver};
pub use transition::{step, GeneratorState};
