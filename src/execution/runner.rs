//! Isolated Runner
//!
//! Executes simulation requests in separate OS processes so that a runaway
//! or crashing simulation can never destabilize the caller. A fixed-size
//! pool bounds how many engine processes run at once; each worker handles
//! exactly one request, with no shared state between workers and no
//! implicit retry.
//!
//! Cancellation kills the engine child process outright. The caller gets
//! control back as soon as the cancel flag is set; the worker reaps the
//! child in the background and releases its pool slot.

use std::fs;
use std::io;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{channel, Receiver};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::Duration;

use log::{debug, warn};
use thiserror::Error;

use crate::engine::adapter::{self, ENGINE_PATH};
use crate::execution::request::ExecutionRequest;
use crate::model::variable::ScalarValue;
use crate::results::table::{RawResult, RawRow};

/// Interval for checking whether the engine child process has exited.
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Monotonic counter distinguishing result files of concurrent runs.
static RUN_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Raised when an isolated execution fails.
///
/// Everything that goes wrong inside the isolation boundary surfaces as one
/// of these variants; nothing crosses it as an unhandled fault.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("invalid execution request: {0}")]
    InvalidRequest(String),

    #[error("failed to launch simulation engine: {0}")]
    Spawn(#[source] io::Error),

    #[error("engine process error: {0}")]
    Process(#[source] io::Error),

    #[error("simulation failed: {detail}")]
    Simulation { detail: String },

    #[error("engine produced an unreadable result: {0}")]
    Protocol(String),

    #[error("run cancelled before completion")]
    Cancelled,
}

/// Handle to one in-flight simulation run.
pub struct RunHandle {
    done: Arc<AtomicBool>,
    cancelled: Arc<AtomicBool>,
    rx: Receiver<Result<RawResult, EngineError>>,
}

impl RunHandle {
    /// True once the worker has reported a result (success or failure).
    pub fn is_done(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }

    /// Requests cancellation and returns immediately.
    ///
    /// The worker kills the engine child process at its next wait poll. The
    /// run's result, if any, is discarded.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Waits for the run to finish and retrieves its result.
    ///
    /// Never blocks once [`is_done`](Self::is_done) has returned true.
    pub fn join(self) -> Result<RawResult, EngineError> {
        self.rx.recv().unwrap_or_else(|_| {
            Err(EngineError::Protocol(
                "worker thread terminated without reporting a result".to_string(),
            ))
        })
    }
}

/// Fixed-size pool of isolated simulation workers.
///
/// # Example
///
/// ```rust,no_run
/// use fmusim::execution::runner::RunnerPool;
/// use fmusim::execution::request::ExecutionRequest;
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let pool = RunnerPool::new();
///     let request = ExecutionRequest::new("ball.fmu", 1.0, 0.1);
///
///     let handle = pool.submit(request)?;
///     let raw = handle.join()?;
///     println!("{} samples", raw.rows.len());
///     Ok(())
/// }
/// ```
pub struct RunnerPool {
    capacity: usize,
    engine: PathBuf,
    // (active worker count, wakeup for freed slots)
    slots: Arc<(Mutex<usize>, Condvar)>,
}

impl RunnerPool {
    /// Creates a pool sized to the available hardware parallelism.
    pub fn new() -> Self {
        Self::with_capacity(num_cpus::get())
    }

    /// Creates a pool with an explicit worker count.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            engine: ENGINE_PATH.clone(),
            slots: Arc::new((Mutex::new(0), Condvar::new())),
        }
    }

    /// Overrides the engine binary used for all subsequent submissions.
    pub fn set_engine(&mut self, engine: impl Into<PathBuf>) {
        self.engine = engine.into();
    }

    /// Maximum number of concurrently running engine processes.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Submits a request for isolated execution.
    ///
    /// Blocks while the pool is saturated, then hands the request to a fresh
    /// worker thread and returns a [`RunHandle`] for it. Each submission is
    /// executed at most once.
    pub fn submit(&self, request: ExecutionRequest) -> Result<RunHandle, EngineError> {
        request.validate().map_err(EngineError::InvalidRequest)?;

        // Admission control: wait for a free slot.
        {
            let (lock, cvar) = &*self.slots;
            let mut active = lock.lock().expect("pool lock poisoned");
            while *active >= self.capacity {
                active = cvar.wait(active).expect("pool lock poisoned");
            }
            *active += 1;
        }

        let done = Arc::new(AtomicBool::new(false));
        let cancelled = Arc::new(AtomicBool::new(false));
        let (tx, rx) = channel();

        let worker_done = Arc::clone(&done);
        let worker_cancelled = Arc::clone(&cancelled);
        let slots = Arc::clone(&self.slots);
        let engine = self.engine.clone();

        thread::spawn(move || {
            let result = run_simulation(&engine, &request, &worker_cancelled);

            if tx.send(result).is_err() {
                debug!("Run finished after its handle was dropped");
            }
            // Flip the flag only after the result is in the channel so that
            // a join() following is_done() can never block.
            worker_done.store(true, Ordering::Release);

            let (lock, cvar) = &*slots;
            let mut active = lock.lock().expect("pool lock poisoned");
            *active -= 1;
            cvar.notify_one();
        });

        Ok(RunHandle { done, cancelled, rx })
    }
}

impl Default for RunnerPool {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs one simulation to completion in an engine child process.
fn run_simulation(
    engine: &Path,
    request: &ExecutionRequest,
    cancelled: &AtomicBool,
) -> Result<RawResult, EngineError> {
    let output_path = allocate_output_path()?;

    debug!(
        "Launching engine for {} (stop {}, step {}, {} overrides)",
        request.model.display(),
        request.stop_time,
        request.step_size,
        request.override_count()
    );

    let mut child = adapter::simulate_command(engine, request, &output_path)
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(EngineError::Spawn)?;

    // Drain stderr while the child runs. A chatty engine can fill the pipe
    // buffer and block on write, which would keep try_wait() from ever
    // seeing the exit.
    let stderr_drain = child.stderr.take().map(|mut stderr| {
        thread::spawn(move || {
            let mut text = String::new();
            let _ = stderr.read_to_string(&mut text);
            text
        })
    });

    let status = loop {
        if cancelled.load(Ordering::Acquire) {
            if let Err(e) = child.kill() {
                warn!("Failed to kill engine process: {}", e);
            }
            let _ = child.wait();
            discard_output(&output_path);
            return Err(EngineError::Cancelled);
        }

        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => thread::sleep(WAIT_POLL_INTERVAL),
            Err(e) => {
                discard_output(&output_path);
                return Err(EngineError::Process(e));
            }
        }
    };

    let stderr_text = stderr_drain
        .map(|drain| drain.join().unwrap_or_default())
        .unwrap_or_default();

    if !status.success() {
        discard_output(&output_path);
        let detail = stderr_text.trim();
        return Err(EngineError::Simulation {
            detail: if detail.is_empty() {
                format!("engine exited with {:?}", status.code())
            } else {
                detail.to_string()
            },
        });
    }

    let raw = parse_output(&output_path)?;
    discard_output(&output_path);

    debug!("Engine returned {} samples", raw.rows.len());

    Ok(raw)
}

/// Reserves a result file path for one run.
fn allocate_output_path() -> Result<PathBuf, EngineError> {
    let run_dir = std::env::temp_dir().join("fmusim_runs");
    fs::create_dir_all(&run_dir).map_err(EngineError::Process)?;

    let id = RUN_COUNTER.fetch_add(1, Ordering::Relaxed);
    Ok(run_dir.join(format!("run_{}_{}.jsonl", std::process::id(), id)))
}

/// Removes a run's result file, warning instead of failing.
fn discard_output(path: &Path) {
    if path.exists() {
        if let Err(e) = fs::remove_file(path) {
            warn!("Failed to clean up result file {}: {}", path.display(), e);
        }
    }
}

/// Parses the engine's JSON Lines result file into raw rows.
fn parse_output(path: &Path) -> Result<RawResult, EngineError> {
    let text = fs::read_to_string(path)
        .map_err(|e| EngineError::Protocol(format!("result file unreadable: {}", e)))?;

    let mut rows = Vec::new();
    for (i, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let object: serde_json::Map<String, serde_json::Value> = serde_json::from_str(line)
            .map_err(|e| EngineError::Protocol(format!("sample {}: {}", i, e)))?;

        let mut fields = Vec::with_capacity(object.len());
        for (name, value) in object {
            let scalar: ScalarValue = serde_json::from_value(value).map_err(|_| {
                EngineError::Protocol(format!("sample {}: field '{}' is not a scalar", i, name))
            })?;
            fields.push((name, scalar));
        }
        rows.push(RawRow::new(fields));
    }

    Ok(RawResult { rows })
}
