//! Bounded Execution Supervisor
//!
//! Drives one simulation run against the runner pool with a wall-clock
//! budget. The supervisor sleep-polls the run handle; when the budget runs
//! out first it cancels the in-flight work and reports a timeout instead of
//! blocking indefinitely. Completed runs are normalized into a result table.
//!
//! Polling trades detection latency for simplicity: each iteration sleeps
//! for the poll interval, so a timeout is reported within one interval of
//! the budget expiring.

use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::execution::request::ExecutionRequest;
use crate::execution::runner::RunnerPool;
use crate::results::table::{normalize, ResultTable};

/// Default wall-clock budget for one run.
pub const DEFAULT_BUDGET: Duration = Duration::from_secs(10);

/// Default interval between completion checks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Terminal outcome of one supervised execution attempt.
///
/// Exactly one variant holds per attempt, and each maps to its own
/// user-visible presentation: results, timeout notice, or error notice.
#[derive(Debug)]
pub enum ExecutionOutcome {
    /// The run finished and its output normalized cleanly.
    Success(ResultTable),
    /// The budget expired; the run was cancelled best-effort.
    Timeout,
    /// The run failed inside the engine or produced a malformed result.
    Failure(String),
}

impl ExecutionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionOutcome::Success(_))
    }
}

/// Supervises simulation runs with a bounded wall-clock budget.
///
/// # Example
///
/// ```rust,no_run
/// use fmusim::execution::request::ExecutionRequest;
/// use fmusim::execution::runner::RunnerPool;
/// use fmusim::execution::supervisor::{ExecutionOutcome, Supervisor};
///
/// let supervisor = Supervisor::new(RunnerPool::new());
/// let request = ExecutionRequest::new("ball.fmu", 1.0, 0.1);
///
/// match supervisor.run(request) {
///     ExecutionOutcome::Success(table) => println!("{} samples", table.len()),
///     ExecutionOutcome::Timeout => eprintln!("simulation took too long"),
///     ExecutionOutcome::Failure(detail) => eprintln!("simulation failed: {}", detail),
/// }
/// ```
pub struct Supervisor {
    pool: RunnerPool,
    budget: Duration,
    poll_interval: Duration,
}

impl Supervisor {
    /// Creates a supervisor over `pool` with default budget and interval.
    pub fn new(pool: RunnerPool) -> Self {
        Self {
            pool,
            budget: DEFAULT_BUDGET,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Sets the wall-clock budget used by [`run`](Self::run).
    pub fn set_budget(&mut self, budget: Duration) {
        self.budget = budget;
    }

    /// Sets the completion-check interval.
    pub fn set_poll_interval(&mut self, interval: Duration) {
        self.poll_interval = interval;
    }

    /// The runner pool this supervisor submits to.
    pub fn pool(&self) -> &RunnerPool {
        &self.pool
    }

    /// Runs a request under the configured budget.
    pub fn run(&self, request: ExecutionRequest) -> ExecutionOutcome {
        self.run_with_budget(request, self.budget)
    }

    /// Runs a request under an explicit budget.
    ///
    /// Two calls with equal requests are fully independent executions; the
    /// supervisor keeps no state between them.
    pub fn run_with_budget(&self, request: ExecutionRequest, budget: Duration) -> ExecutionOutcome {
        let model = request.model.clone();

        let handle = match self.pool.submit(request) {
            Ok(handle) => handle,
            // The run never started; surfaced as a failure, not a timeout.
            Err(e) => return ExecutionOutcome::Failure(e.to_string()),
        };

        debug!(
            "Supervising {} (budget {:?}, poll every {:?})",
            model.display(),
            budget,
            self.poll_interval
        );

        let started = Instant::now();
        while !handle.is_done() && started.elapsed() < budget {
            std::thread::sleep(self.poll_interval);
        }

        if !handle.is_done() {
            // Best effort: flag the run and move on without waiting for the
            // kill to land. The worker discards whatever the engine was
            // still producing.
            handle.cancel();
            warn!(
                "Run for {} exceeded its {:?} budget, cancelled",
                model.display(),
                budget
            );
            return ExecutionOutcome::Timeout;
        }

        match handle.join() {
            Ok(raw) => match normalize(&raw) {
                Ok(table) => {
                    info!(
                        "Run for {} completed: {} samples, {} columns ({:.2?})",
                        model.display(),
                        table.len(),
                        table.columns().len(),
                        started.elapsed()
                    );
                    ExecutionOutcome::Success(table)
                }
                Err(e) => ExecutionOutcome::Failure(e.to_string()),
            },
            Err(e) => ExecutionOutcome::Failure(e.to_string()),
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use std::io::Write;
    use std::path::{Path, PathBuf};
    use tempfile::tempdir;

    fn write_engine_script(dir: &Path, name: &str, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(b"#!/bin/bash\n").unwrap();
        file.write_all(body.as_bytes()).unwrap();
        file.write_all(b"\n").unwrap();
        drop(file);
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    /// Emits an 11-sample bouncing-ball style trace to the --output file.
    fn trace_engine(dir: &Path) -> PathBuf {
        write_engine_script(
            dir,
            "trace-engine",
            r#"out=""
prev=""
for arg in "$@"; do
  if [ "$prev" = "--output" ]; then out="$arg"; fi
  prev="$arg"
done
cat > "$out" <<'ROWS'
{"time": 0.0, "h": 1.0}
{"time": 0.1, "h": 0.95}
{"time": 0.2, "h": 0.9}
{"time": 0.3, "h": 0.85}
{"time": 0.4, "h": 0.8}
{"time": 0.5, "h": 0.75}
{"time": 0.6, "h": 0.7}
{"time": 0.7, "h": 0.65}
{"time": 0.8, "h": 0.6}
{"time": 0.9, "h": 0.55}
{"time": 1.0, "h": 0.5}
ROWS"#,
        )
    }

    fn supervisor_with(engine: PathBuf) -> Supervisor {
        let mut pool = RunnerPool::with_capacity(1);
        pool.set_engine(engine);
        let mut supervisor = Supervisor::new(pool);
        supervisor.set_poll_interval(Duration::from_millis(20));
        supervisor
    }

    #[test]
    fn test_successful_run_yields_table() {
        let dir = tempdir().unwrap();
        let supervisor = supervisor_with(trace_engine(dir.path()));

        let request = ExecutionRequest::new("ball.fmu", 1.0, 0.1).with_override("g", 9.81);
        let outcome = supervisor.run_with_budget(request, Duration::from_secs(10));

        let table = match outcome {
            ExecutionOutcome::Success(table) => table,
            other => panic!("expected success, got {:?}", other),
        };

        assert_eq!(table.len(), 11);
        assert_eq!(table.columns()[0], "time");
        assert_eq!(table.column("h").unwrap().len(), 11);

        // Time is monotonically non-decreasing from 0.0 to 1.0.
        let times: Vec<f64> = table.time().iter().filter_map(|v| v.as_f64()).collect();
        assert_eq!(times.len(), 11);
        assert_eq!(times[0], 0.0);
        assert_eq!(times[10], 1.0);
        assert!(times.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_stderr_flood_does_not_become_timeout() {
        let dir = tempdir().unwrap();
        // Emits far more stderr than an OS pipe buffers, then finishes
        // normally; the outcome must be Success within the budget.
        let supervisor = supervisor_with(write_engine_script(
            dir.path(),
            "chatty-engine",
            r#"out=""
prev=""
for arg in "$@"; do
  if [ "$prev" = "--output" ]; then out="$arg"; fi
  prev="$arg"
done
head -c 200000 /dev/zero | tr '\0' 'x' >&2
printf '{"time": 0.0, "h": 1.0}\n{"time": 0.1, "h": 0.95}\n' > "$out""#,
        ));

        let outcome = supervisor.run_with_budget(
            ExecutionRequest::new("ball.fmu", 1.0, 0.1),
            Duration::from_secs(3),
        );

        match outcome {
            ExecutionOutcome::Success(table) => assert_eq!(table.len(), 2),
            other => panic!("expected success, got {:?}", other),
        }
    }

    #[test]
    fn test_budget_exceeded_is_timeout() {
        let dir = tempdir().unwrap();
        let supervisor = supervisor_with(write_engine_script(
            dir.path(),
            "stuck-engine",
            "sleep 30",
        ));

        let budget = Duration::from_millis(300);
        let started = Instant::now();
        let outcome =
            supervisor.run_with_budget(ExecutionRequest::new("ball.fmu", 1.0, 0.1), budget);
        let elapsed = started.elapsed();

        assert!(matches!(outcome, ExecutionOutcome::Timeout));
        assert!(elapsed >= budget, "returned before the budget: {:?}", elapsed);
        // budget + poll interval + scheduling slack, never the 30s sleep
        assert!(
            elapsed < budget + Duration::from_millis(700),
            "timeout detection too slow: {:?}",
            elapsed
        );
    }

    #[test]
    fn test_engine_failure_is_failure_not_timeout() {
        let dir = tempdir().unwrap();
        let supervisor = supervisor_with(write_engine_script(
            dir.path(),
            "failing-engine",
            "echo 'solver diverged' >&2\nexit 1",
        ));

        let outcome = supervisor.run_with_budget(
            ExecutionRequest::new("ball.fmu", 1.0, 0.1),
            Duration::from_secs(10),
        );

        match outcome {
            ExecutionOutcome::Failure(detail) => assert!(detail.contains("solver diverged")),
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_result_is_failure() {
        let dir = tempdir().unwrap();
        // Engine "succeeds" but emits rows without a time field.
        let supervisor = supervisor_with(write_engine_script(
            dir.path(),
            "timeless-engine",
            r#"out=""
prev=""
for arg in "$@"; do
  if [ "$prev" = "--output" ]; then out="$arg"; fi
  prev="$arg"
done
echo '{"h": 1.0}' > "$out""#,
        ));

        let outcome = supervisor.run_with_budget(
            ExecutionRequest::new("ball.fmu", 1.0, 0.1),
            Duration::from_secs(10),
        );

        match outcome {
            ExecutionOutcome::Failure(detail) => assert!(detail.contains("time")),
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_request_fails_before_running() {
        let dir = tempdir().unwrap();
        let supervisor = supervisor_with(write_engine_script(
            dir.path(),
            "unused-engine",
            "exit 0",
        ));

        let outcome = supervisor.run_with_budget(
            ExecutionRequest::new("ball.fmu", 1.0, 0.0),
            Duration::from_secs(1),
        );

        match outcome {
            ExecutionOutcome::Failure(detail) => assert!(detail.contains("step size")),
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[test]
    fn test_sequential_runs_are_independent() {
        let dir = tempdir().unwrap();
        let supervisor = supervisor_with(trace_engine(dir.path()));

        let first = supervisor.run(ExecutionRequest::new("ball.fmu", 1.0, 0.1));
        let second = supervisor.run(ExecutionRequest::new("ball.fmu", 1.0, 0.1));

        for outcome in [first, second] {
            match outcome {
                ExecutionOutcome::Success(table) => assert_eq!(table.len(), 11),
                other => panic!("expected success, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_timed_out_run_releases_its_pool_slot() {
        let dir = tempdir().unwrap();
        let supervisor = supervisor_with(write_engine_script(
            dir.path(),
            "stuck-engine",
            "sleep 30",
        ));

        let started = Instant::now();
        for _ in 0..2 {
            let outcome = supervisor.run_with_budget(
                ExecutionRequest::new("ball.fmu", 1.0, 0.1),
                Duration::from_millis(200),
            );
            assert!(matches!(outcome, ExecutionOutcome::Timeout));
        }

        // With a single-slot pool, the second submit would block forever if
        // the first killed run leaked its slot.
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
