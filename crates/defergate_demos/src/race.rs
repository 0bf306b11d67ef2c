//! Workers racing for a shared set of mutexes in opposite orders.
//!
//! Even workers take the locks in ascending order and odd workers in
//! descending order, using `try_lock` so nobody blocks while holding a partial
//! set. On contention a worker reaches its `retry` gate, whose hook releases
//! the positions taken so far, and starts again from position 0. Once it holds
//! every lock it reaches `ret`, which releases them all.
//!
//! The controlling procedure owns the mutexes. Its own `ret` hook checks that
//! no lock is still held once every worker has been joined.

use core::cell::{Cell, RefCell};
use core::time::Duration;
use std::thread;

use defergate_frame::{Frame, FrameConfig, FrameError, gates, hook};
use parking_lot::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

use crate::error::DemoError;

/// Default number of mutexes.
pub const DEFAULT_MUTEXES: usize = 32;

/// Default number of worker threads.
pub const DEFAULT_THREADS: usize = 16;

/// Default pause after each retry.
pub const DEFAULT_BACKOFF: Duration = Duration::from_micros(50);

/// Configuration for [`run_race`].
///
/// # Example
///
/// ```
/// use defergate_demos::RaceConfig;
/// use std::time::Duration;
///
/// let config = RaceConfig::new()
///     .with_mutexes(8)
///     .with_threads(4)
///     .with_backoff(Duration::ZERO);
/// assert_eq!(config.mutexes(), 8);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RaceConfig {
    mutexes: usize,
    threads: usize,
    backoff: Duration,
}

impl Default for RaceConfig {
    fn default() -> Self {
        Self {
            mutexes: DEFAULT_MUTEXES,
            threads: DEFAULT_THREADS,
            backoff: DEFAULT_BACKOFF,
        }
    }
}

impl RaceConfig {
    /// Creates a configuration with the default sizes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of mutexes.
    #[must_use]
    pub fn with_mutexes(mut self, mutexes: usize) -> Self {
        self.mutexes = mutexes;
        self
    }

    /// Sets the number of worker threads.
    #[must_use]
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// Sets the base pause after each retry. Worker `k` sleeps
    /// `backoff * (k % 4 + 1)`.
    #[must_use]
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Returns the number of mutexes.
    #[must_use]
    pub fn mutexes(&self) -> usize {
        self.mutexes
    }

    /// Returns the number of worker threads.
    #[must_use]
    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Returns the base backoff.
    #[must_use]
    pub fn backoff(&self) -> Duration {
        self.backoff
    }

    fn validate(&self) -> Result<(), DemoError> {
        if self.mutexes == 0 {
            return Err(DemoError::InvalidConfig("at least one mutex is required"));
        }
        if self.threads == 0 {
            return Err(DemoError::InvalidConfig("at least one thread is required"));
        }
        Ok(())
    }
}

/// Maps acquisition position `position` of worker `worker` to a mutex index.
///
/// Even workers go ascending, odd workers descending.
///
/// ```
/// use defergate_demos::access_index;
///
/// assert_eq!(access_index(0, 0, 4), 0);
/// assert_eq!(access_index(1, 0, 4), 3);
/// ```
#[must_use]
pub fn access_index(worker: usize, position: usize, len: usize) -> usize {
    if worker % 2 == 0 { position } else { len - position - 1 }
}

/// Outcome of one worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerReport {
    /// Worker index.
    pub worker: usize,
    /// Number of times the worker reached its `retry` gate.
    pub retries: usize,
}

/// Outcome of a race.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RaceReport {
    workers: Vec<WorkerReport>,
}

impl RaceReport {
    /// Returns one report per worker, in worker order.
    #[must_use]
    pub fn workers(&self) -> &[WorkerReport] {
        &self.workers
    }

    /// Returns the retries summed over every worker.
    #[must_use]
    pub fn total_retries(&self) -> usize {
        self.workers.iter().map(|report| report.retries).sum()
    }
}

fn worker(index: usize, locks: &[Mutex<()>], backoff: Duration) -> Result<WorkerReport, FrameError> {
    let i = Cell::new(0);
    let held: RefCell<Vec<Option<MutexGuard<'_, ()>>>> =
        RefCell::new((0..locks.len()).map(|_| None).collect());
    let pause = backoff * ((index % 4) as u32 + 1);
    let mut retries = 0;

    let frame = Frame::with_config(FrameConfig::new().with_name(format!("worker-{index}")));
    gates!(frame; retry, ret);

    hook!(frame, retry => {
        let mut held = held.borrow_mut();
        for position in (0..i.get()).rev() {
            held[position] = None;
        }
    })?;
    hook!(frame, ret => {
        let mut held = held.borrow_mut();
        for position in (0..locks.len()).rev() {
            held[position] = None;
        }
    })?;

    'attempt: loop {
        i.set(0);
        while i.get() < locks.len() {
            let mutex = access_index(index, i.get(), locks.len());
            let Some(guard) = locks[mutex].try_lock() else {
                debug!(worker = index, mutex, held = i.get(), "mutex busy, retrying");
                frame.reach(retry)?;
                retries += 1;
                if pause.is_zero() {
                    thread::yield_now();
                } else {
                    thread::sleep(pause);
                }
                continue 'attempt;
            };
            held.borrow_mut()[i.get()] = Some(guard);
            i.set(i.get() + 1);
        }
        break;
    }

    info!(worker = index, retries, "acquired all mutexes");
    frame.finish(ret)?;
    Ok(WorkerReport {
        worker: index,
        retries,
    })
}

/// Runs `config.threads()` workers over `config.mutexes()` shared mutexes.
///
/// # Errors
///
/// Returns [`DemoError::InvalidConfig`] for zero mutexes or threads,
/// [`DemoError::Spawn`] or [`DemoError::WorkerPanicked`] if a worker cannot
/// run to completion, and [`DemoError::LeakedLocks`] if any mutex is still
/// held once every worker is joined.
pub fn run_race(config: &RaceConfig) -> Result<RaceReport, DemoError> {
    config.validate()?;

    let locks: Vec<Mutex<()>> = (0..config.mutexes).map(|_| Mutex::new(())).collect();
    let leaked = Cell::new(0);

    let frame = Frame::with_config(FrameConfig::new().with_name("race"));
    gates!(frame; ret);

    hook!(frame, ret => {
        leaked.set(locks.iter().filter(|lock| lock.is_locked()).count());
    })?;

    let backoff = config.backoff;
    let joined = thread::scope(|scope| -> Result<Vec<WorkerReport>, DemoError> {
        let mut handles = Vec::with_capacity(config.threads);
        for index in 0..config.threads {
            let locks = locks.as_slice();
            let handle = thread::Builder::new()
                .name(format!("race-{index}"))
                .spawn_scoped(scope, move || worker(index, locks, backoff))
                .map_err(|source| DemoError::Spawn {
                    worker: index,
                    source,
                })?;
            handles.push((index, handle));
        }

        let mut workers = Vec::with_capacity(handles.len());
        for (index, handle) in handles {
            let report = handle
                .join()
                .map_err(|_| DemoError::WorkerPanicked { worker: index })??;
            info!(worker = index, retries = report.retries, "worker exited");
            workers.push(report);
        }
        Ok(workers)
    });

    frame.finish(ret)?;
    let workers = joined?;
    if leaked.get() > 0 {
        warn!(leaked = leaked.get(), "mutexes still locked at teardown");
        return Err(DemoError::LeakedLocks(leaked.get()));
    }

    Ok(RaceReport { workers })
}
