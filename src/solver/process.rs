use std::io::{ErrorKind, Read, Write};
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use super::{SolveBudget, SolveError};

const POLL_INTERVAL: Duration = Duration::from_millis(5);

#[derive(Debug)]
pub struct ProcessOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

/// Runs `command` with `input` on stdin, killing it when the budget runs out.
pub fn run_with_budget(command: &str, args: &[String], input: &str, budget: &SolveBudget) -> Result<ProcessOutput, SolveError> {
    let deadline = budget.deadline();
    let mut child = Command::new(command)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| SolveError::Backend(format!("failed to spawn {command}: {e}")))?;
    debug!(command, pid = child.id(), bytes = input.len(), "solver process started");

    let stdin = child.stdin.take();
    let script = input.to_string();
    let writer = thread::spawn(move || {
        let Some(mut stdin) = stdin else { return Ok(()) };
        match stdin.write_all(script.as_bytes()) {
            Err(e) if e.kind() == ErrorKind::BrokenPipe => Ok(()),
            other => other,
        }
    });
    let stdout = spawn_reader(child.stdout.take());
    let stderr = spawn_reader(child.stderr.take());

    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => {}
            Err(e) => return Err(SolveError::Backend(format!("failed to poll {command}: {e}"))),
        }
        if let Err(e) = budget.check(deadline) {
            warn!(command, error = %e, "stopping solver process");
            let _ = child.kill();
            let _ = child.wait();
            return Err(e);
        }
        thread::sleep(POLL_INTERVAL);
    };

    if let Some(Err(e)) = join_within(writer, budget, deadline)? {
        return Err(SolveError::Backend(format!("failed to write script: {e}")));
    }
    let stdout = join_within(stdout, budget, deadline)?.unwrap_or_default();
    let stderr = join_within(stderr, budget, deadline)?.unwrap_or_default();
    debug!(command, %status, "solver process finished");
    Ok(ProcessOutput { status, stdout, stderr })
}

/// Waits for a pipe thread under the same budget as the process. A grandchild
/// that inherited the pipe keeps it open after the solver itself exits.
fn join_within<T>(handle: thread::JoinHandle<T>, budget: &SolveBudget, deadline: Option<Instant>) -> Result<Option<T>, SolveError> {
    while !handle.is_finished() {
        budget.check(deadline)?;
        thread::sleep(POLL_INTERVAL);
    }
    Ok(handle.join().ok())
}

fn spawn_reader<R: Read + Send + 'static>(pipe: Option<R>) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut s = String::new();
        if let Some(mut p) = pipe { let _ = p.read_to_string(&mut s); }
        s
    })
}
