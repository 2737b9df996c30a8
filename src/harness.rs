use std::ops::AddAssign;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::error::BenchError;
use crate::schema::{BenchResult, Unit};
use crate::workload::Workload;

/// Number of logical CPUs, falling back to 1 when the platform cannot say.
pub fn logical_cpus() -> usize {
    thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}

/// `0` means "one worker per logical CPU".
pub fn resolve_threads(threads: usize) -> usize {
    if threads == 0 {
        logical_cpus()
    } else {
        threads
    }
}

/// Workload parameters shared by the default catalogue.
#[derive(Clone, Debug)]
pub struct BenchConfig {
    pub seed: u64,
    pub zstd_level: i32,
    pub gzip_level: i32,
    pub matrix_n: usize,
    /// Directory for the sequential I/O scratch file; `None` uses the OS temp dir.
    pub scratch_dir: Option<PathBuf>,
}

impl Default for BenchConfig {
    fn default() -> Self {
        BenchConfig {
            seed: 42,
            zstd_level: 3,
            gzip_level: 6,
            matrix_n: 256,
            scratch_dir: None,
        }
    }
}

impl BenchConfig {
    pub fn scratch_dir(&self) -> PathBuf {
        self.scratch_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

/// One suite invocation: time budget, parallelism and which workloads to run.
#[derive(Clone, Debug)]
pub struct RunRequest {
    pub duration: Duration,
    /// `0` resolves to the logical CPU count.
    pub threads: usize,
    /// Workload names to run, in catalogue order; empty selects everything.
    pub only: Vec<String>,
}

impl RunRequest {
    pub fn new(duration: Duration, threads: usize) -> Self {
        RunRequest {
            duration,
            threads,
            only: Vec::new(),
        }
    }
}

/// Externally triggered cancellation, shared by clones.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Cancels and reports whether the token had already been cancelled, so a
    /// repeated interrupt can be told apart from the first one.
    pub fn interrupt(&self) -> bool {
        self.0.swap(true, Ordering::AcqRel)
    }
}

/// Stop condition observed by every worker between units of work.
///
/// Trips on the deadline, on external cancellation, or when a sibling worker
/// aborts after a failure. A budget too large to represent as an [`Instant`]
/// leaves the signal without a deadline.
#[derive(Clone, Debug)]
pub struct StopSignal {
    cancel: CancelToken,
    abort: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl StopSignal {
    pub fn new(cancel: CancelToken, budget: Duration) -> Self {
        StopSignal {
            cancel,
            abort: Arc::new(AtomicBool::new(false)),
            deadline: Instant::now().checked_add(budget),
        }
    }

    /// A fresh window of `budget` sharing this signal's cancellation and abort state.
    pub fn window(&self, budget: Duration) -> Self {
        StopSignal {
            cancel: self.cancel.clone(),
            abort: Arc::clone(&self.abort),
            deadline: Instant::now().checked_add(budget),
        }
    }

    pub fn should_stop(&self) -> bool {
        self.cancel.is_cancelled()
            || self.is_aborted()
            || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn is_aborted(&self) -> bool {
        self.abort.load(Ordering::Acquire)
    }

    pub fn abort(&self) {
        self.abort.store(true, Ordering::Release);
    }
}

/// Work completed by one worker, or by all workers once merged.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Tally {
    pub ops: u64,
    pub bytes: u64,
}

impl Tally {
    pub fn ops(ops: u64) -> Self {
        Tally { ops, bytes: 0 }
    }

    /// One unit of work that moved `bytes` bytes.
    pub fn unit_of(bytes: u64) -> Self {
        Tally { ops: 1, bytes }
    }
}

impl AddAssign for Tally {
    fn add_assign(&mut self, rhs: Tally) {
        self.ops += rhs.ops;
        self.bytes += rhs.bytes;
    }
}

/// Per-thread state that performs one bounded unit of work per call.
pub trait Worker {
    fn step(&mut self) -> Result<Tally, BenchError>;
}

/// Runs `workers` threads until `signal` trips and returns the merged tally.
///
/// Each thread builds its own state with `make(index)`, loops on a local tally
/// and merges it exactly once on exit. The first failure aborts every worker and
/// is returned instead of the partial tally. A thread the OS refuses to start is
/// a setup failure of `workload`.
pub fn fan_out<W, F>(workload: &str, signal: &StopSignal, workers: usize, make: F) -> Result<Tally, BenchError>
where
    W: Worker,
    F: Fn(usize) -> Result<W, BenchError> + Sync,
{
    let builder = |index: usize| thread::Builder::new().name(format!("bench-worker-{index}"));
    fan_out_with(workload, signal, workers, builder, make)
}

fn fan_out_with<W, F, B>(
    workload: &str,
    signal: &StopSignal,
    workers: usize,
    builder: B,
    make: F,
) -> Result<Tally, BenchError>
where
    W: Worker,
    F: Fn(usize) -> Result<W, BenchError> + Sync,
    B: Fn(usize) -> thread::Builder,
{
    let ops = AtomicU64::new(0);
    let bytes = AtomicU64::new(0);
    let failure: Mutex<Option<BenchError>> = Mutex::new(None);

    let fail = |err: BenchError| {
        signal.abort();
        if let Ok(mut slot) = failure.lock() {
            slot.get_or_insert(err);
        }
    };

    let workers = workers.max(1);
    thread::scope(|s| {
        let mut handles = Vec::with_capacity(workers);
        for index in 0..workers {
            let make = &make;
            let fail = &fail;
            let (ops, bytes) = (&ops, &bytes);
            let spawned = builder(index).spawn_scoped(s, move || {
                let mut worker = match make(index) {
                    Ok(w) => w,
                    Err(err) => return fail(err),
                };
                let mut local = Tally::default();
                while !signal.should_stop() {
                    match worker.step() {
                        Ok(t) => local += t,
                        Err(err) => {
                            fail(err);
                            break;
                        }
                    }
                }
                ops.fetch_add(local.ops, Ordering::AcqRel);
                bytes.fetch_add(local.bytes, Ordering::AcqRel);
                debug!(worker = index, ops = local.ops, bytes = local.bytes, "worker merged");
            });
            match spawned {
                Ok(handle) => handles.push(handle),
                Err(err) => {
                    fail(BenchError::setup(workload, format!("spawning worker {index}: {err}")));
                    break;
                }
            }
        }

        for handle in handles {
            if handle.join().is_err() {
                fail(BenchError::Io(std::io::Error::other("worker thread panicked")));
            }
        }
    });
    debug!(
        workload,
        workers,
        cancelled = signal.is_cancelled(),
        aborted = signal.is_aborted(),
        "stop signal observed"
    );

    match failure.into_inner().unwrap_or_else(|p| p.into_inner()) {
        Some(err) => Err(err),
        None => Ok(Tally {
            ops: ops.into_inner(),
            bytes: bytes.into_inner(),
        }),
    }
}

/// What a workload hands back to the [`Runner`] on success.
#[derive(Clone, Debug, Default)]
pub struct Outcome {
    pub tally: Tally,
    pub notes: Vec<String>,
}

impl Outcome {
    pub fn new(tally: Tally) -> Self {
        Outcome {
            tally,
            notes: Vec::new(),
        }
    }

    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }
}

/// Executes one workload under a deadline and turns its tally into a result.
#[derive(Clone, Debug, Default)]
pub struct Runner {
    cancel: CancelToken,
}

impl Runner {
    pub fn new(cancel: CancelToken) -> Self {
        Runner { cancel }
    }

    pub fn execute(&self, workload: &dyn Workload, duration: Duration, threads: usize) -> BenchResult {
        let threads = workload.threads(resolve_threads(threads));
        let signal = StopSignal::new(self.cancel.clone(), duration);
        info!(workload = workload.name(), threads, ?duration, "workload started");

        let outcome = match workload.run(&signal, duration, threads) {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(workload = workload.name(), error = %err, "workload failed");
                return BenchResult::failed(workload.name(), workload.unit(), threads, duration, err.to_string());
            }
        };

        let result = record(workload.name(), workload.unit(), threads, duration, outcome);
        info!(
            workload = workload.name(),
            ops = result.ops,
            bytes = result.bytes,
            cancelled = signal.is_cancelled(),
            "workload finished"
        );
        result
    }
}

/// Converts a merged tally into the stored encoding for `unit`.
///
/// Byte units keep exact counts; every other unit is stored as a per-second rate
/// over the requested duration, with the exact count moved into the notes.
fn record(name: &str, unit: Unit, threads: usize, duration: Duration, outcome: Outcome) -> BenchResult {
    let Outcome { tally, mut notes } = outcome;
    let secs = duration.as_secs_f64();
    let per_sec = |count: u64| if secs > 0.0 { count as f64 / secs } else { 0.0 };

    let (ops, bytes) = match unit {
        Unit::BytesPerSec => (tally.ops, tally.bytes),
        Unit::HashesPerSec => {
            notes.push(format!("hashes={}", tally.ops));
            (per_sec(tally.ops) as u64, 0)
        }
        Unit::PixelsPerSec => {
            notes.push(format!("pixels={}", tally.ops));
            (per_sec(tally.ops) as u64, 0)
        }
        Unit::GflopsPerSec => {
            notes.push(format!("flop={}", tally.ops));
            ((per_sec(tally.ops) / 1e9 * Unit::FLOP_SCALE) as u64, 0)
        }
    };

    BenchResult {
        name: name.to_string(),
        threads,
        duration,
        ops,
        bytes,
        unit,
        err: None,
        notes: if notes.is_empty() {
            None
        } else {
            Some(notes.join(", "))
        },
    }
}
