use std::path::Path;
use std::time::Duration;

use anyhow::{ensure, Context, Result};
use clap::ValueEnum;
use serde::Deserialize;

use crate::recover::RetryPolicy;
use crate::solver::{LinearSolver, SmtLibSolver, StateSolver};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// In-process GF(2) elimination.
    #[default]
    Linear,
    /// External SMT-LIB 2 solver process.
    #[value(name = "smtlib")]
    SmtLib,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SolverConfig {
    pub backend: Backend,
    /// External solver binary, used by the `smtlib` backend.
    pub command: String,
    pub args: Vec<String>,
    /// Per-attempt budget; no limit when absent.
    pub timeout_ms: Option<u64>,
    pub max_attempts: u32,
    pub timeout_backoff: f64,
    pub check_uniqueness: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            backend: Backend::Linear,
            command: "z3".to_string(),
            args: vec!["-in".to_string(), "-smt2".to_string()],
            timeout_ms: Some(10_000),
            max_attempts: policy.max_attempts,
            timeout_backoff: policy.timeout_backoff,
            check_uniqueness: true,
        }
    }
}

impl SolverConfig {
    pub fn timeout(&self) -> Option<Duration> { self.timeout_ms.map(Duration::from_millis) }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy { max_attempts: self.max_attempts, timeout_backoff: self.timeout_backoff }
    }

    /// Rejects settings that would make the retry loop misbehave.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.timeout_backoff.is_finite() && self.timeout_backoff >= 1.0,
            "solver.timeout_backoff must be a finite number >= 1.0, got {}",
            self.timeout_backoff
        );
        ensure!(self.max_attempts >= 1, "solver.max_attempts must be at least 1");
        Ok(())
    }

    pub fn build(&self) -> Box<dyn StateSolver + Send + Sync> {
        match self.backend {
            Backend::Linear => Box::new(LinearSolver::new()),
            Backend::SmtLib => {
                let mut s = SmtLibSolver::new(self.command.clone(), self.args.clone());
                s.check_uniqueness = self.check_uniqueness;
                Box::new(s)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PredictConfig {
    pub count: usize,
}

impl Default for PredictConfig {
    fn default() -> Self { Self { count: 10 } }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RecoveryConfig {
    pub solver: SolverConfig,
    pub predict: PredictConfig,
}

impl RecoveryConfig {
    pub fn from_toml(s: &str) -> Result<Self> {
        let cfg: Self = toml::from_str(s).context("invalid recovery config")?;
        cfg.solver.validate().context("invalid recovery config")?;
        Ok(cfg)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let s = std::fs::read_to_string(path).with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_toml(&s).with_context(|| format!("in {}", path.display()))
    }
}
