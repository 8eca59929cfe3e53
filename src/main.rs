use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use xs128p_recover::config::Backend;
use xs128p_recover::{Recovery, RecoveryConfig, SolveBudget};

#[derive(Parser, Debug)]
#[command(name = "xs128p-recover", about = "Recover xorshift128+ state from observed Math.random() outputs and predict the next ones")]
struct Args {
    /// File with observed doubles, whitespace or comma separated; stdin when absent.
    input: Option<PathBuf>,
    #[arg(long)]
    config: Option<PathBuf>,
    /// Number of outputs to predict after the observed ones.
    #[arg(long)]
    count: Option<usize>,
    #[arg(long, value_enum)]
    backend: Option<Backend>,
    #[arg(long)]
    timeout_ms: Option<u64>,
}

fn parse_observations(input: &str) -> Result<Vec<f64>> {
    let mut out = Vec::new();
    for (lineno, line) in input.lines().enumerate() {
        let line = line.split('#').next().unwrap_or("");
        for tok in line.split(|c: char| c.is_whitespace() || c == ',').filter(|t| !t.is_empty()) {
            let v = tok.parse::<f64>().with_context(|| format!("line {}: not a number: {tok}", lineno + 1))?;
            out.push(v);
        }
    }
    if out.is_empty() { bail!("no observations in input") }
    Ok(out)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let mut cfg = match &args.config {
        Some(p) => RecoveryConfig::load(p)?,
        None => RecoveryConfig::default(),
    };
    if let Some(b) = args.backend { cfg.solver.backend = b; }
    if let Some(t) = args.timeout_ms { cfg.solver.timeout_ms = Some(t); }
    let count = args.count.unwrap_or(cfg.predict.count);

    let input = match &args.input {
        Some(p) => fs::read_to_string(p).with_context(|| format!("failed to read {}", p.display()))?,
        None => {
            let mut s = String::new();
            io::stdin().read_to_string(&mut s).context("failed to read stdin")?;
            s
        }
    };
    let observed = parse_observations(&input)?;

    let recovery = Recovery::new(cfg.solver.build()).with_policy(cfg.solver.retry_policy());
    let budget = SolveBudget::new(cfg.solver.timeout(), CancellationToken::new());
    let predictor = recovery
        .predictor(&observed, &budget)
        .context("state recovery failed")?;

    println!("state {}", predictor.state());
    for d in predictor.take(count) {
        println!("{d}");
    }
    Ok(())
}
