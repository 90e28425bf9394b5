//! Shared progress state for archive tasks.
//!
//! A [`ProgressMonitor`] is written by the thread running a task and may be
//! read by any number of observer threads. All counters are atomics with
//! relaxed ordering: observers see updates eventually, never torn values.
//!
//! Cancellation is cooperative. [`ProgressMonitor::cancel`] sets a flag that
//! the running task polls after every buffer; the task then stops and
//! reports [`Error::Cancelled`](crate::Error::Cancelled).
//!
//! # Example
//!
//! ```rust
//! use spanzip::progress::{ProgressMonitor, TaskState};
//!
//! let monitor = ProgressMonitor::shared();
//! assert_eq!(monitor.state(), TaskState::Ready);
//! assert_eq!(monitor.percent_done(), 0);
//!
//! // From another thread:
//! monitor.cancel();
//! assert!(monitor.is_cancel_requested());
//! ```

use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::Error;

/// Whether a task is currently running against the monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// No task is running.
    Ready,
    /// A task is running.
    Busy,
}

/// Outcome of the most recent task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskResult {
    /// No task has finished yet, or one is still running.
    Pending,
    /// The task completed.
    Success,
    /// The task failed; see [`ProgressMonitor::last_error`].
    Error,
    /// The task stopped after a cancellation request.
    Cancelled,
}

/// Kind of task currently running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum TaskKind {
    /// No task.
    None,
    /// Adding an entry from a non-seekable stream.
    AddStream,
    /// Adding an entry from a file.
    AddFile,
    /// Extracting an entry.
    Extract,
}

impl TaskState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Busy,
            _ => Self::Ready,
        }
    }
}

impl TaskResult {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Success,
            2 => Self::Error,
            3 => Self::Cancelled,
            _ => Self::Pending,
        }
    }
}

impl TaskKind {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::AddStream,
            2 => Self::AddFile,
            3 => Self::Extract,
            _ => Self::None,
        }
    }
}

/// Acquires a mutex lock, recovering from a poisoned state.
///
/// The guarded values are informational strings.
fn lock_or_recover<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| {
        log::warn!("ProgressMonitor mutex was poisoned, recovering");
        poisoned.into_inner()
    })
}

/// Thread-safe progress and cancellation state for one task at a time.
#[derive(Debug)]
pub struct ProgressMonitor {
    total_work: AtomicU64,
    work_completed: AtomicU64,
    cancel_requested: AtomicBool,
    state: AtomicU8,
    result: AtomicU8,
    task: AtomicU8,
    file_name: Mutex<Option<String>>,
    last_error: Mutex<Option<String>>,
    started: Mutex<Option<Instant>>,
}

impl Default for ProgressMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressMonitor {
    /// Creates an idle monitor.
    pub fn new() -> Self {
        Self {
            total_work: AtomicU64::new(0),
            work_completed: AtomicU64::new(0),
            cancel_requested: AtomicBool::new(false),
            state: AtomicU8::new(0),
            result: AtomicU8::new(0),
            task: AtomicU8::new(0),
            file_name: Mutex::new(None),
            last_error: Mutex::new(None),
            started: Mutex::new(None),
        }
    }

    /// Creates a shared monitor.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Total declared work in bytes. Zero when unknown (stream sources).
    pub fn total_work(&self) -> u64 {
        self.total_work.load(Ordering::Relaxed)
    }

    /// Work completed so far in bytes.
    pub fn work_completed(&self) -> u64 {
        self.work_completed.load(Ordering::Relaxed)
    }

    /// Completion percentage (0-100). Zero when total work is unknown.
    pub fn percent_done(&self) -> u8 {
        let total = self.total_work();
        if total == 0 {
            return 0;
        }
        let done = self.work_completed().min(total);
        ((done as u128 * 100) / total as u128) as u8
    }

    /// Requests cancellation of the running task.
    pub fn cancel(&self) {
        self.cancel_requested.store(true, Ordering::Relaxed);
    }

    /// Returns whether cancellation was requested.
    pub fn is_cancel_requested(&self) -> bool {
        self.cancel_requested.load(Ordering::Relaxed)
    }

    /// Returns the current task state.
    pub fn state(&self) -> TaskState {
        TaskState::from_u8(self.state.load(Ordering::Relaxed))
    }

    /// Returns the outcome of the most recent task.
    pub fn result(&self) -> TaskResult {
        TaskResult::from_u8(self.result.load(Ordering::Relaxed))
    }

    /// Returns the kind of task currently running.
    pub fn current_task(&self) -> TaskKind {
        TaskKind::from_u8(self.task.load(Ordering::Relaxed))
    }

    /// Returns the name of the entry or file being processed.
    pub fn file_name(&self) -> Option<String> {
        lock_or_recover(&self.file_name).clone()
    }

    /// Returns the message of the error that ended the last task, if any.
    pub fn last_error(&self) -> Option<String> {
        lock_or_recover(&self.last_error).clone()
    }

    /// Time elapsed since the current (or last) task started.
    pub fn elapsed(&self) -> Option<Duration> {
        lock_or_recover(&self.started).map(|start| start.elapsed())
    }

    /// Marks the start of a task.
    ///
    /// Resets counters, the cancellation flag and the previous result.
    pub(crate) fn begin(&self, kind: TaskKind, total_work: u64) {
        self.total_work.store(total_work, Ordering::Relaxed);
        self.work_completed.store(0, Ordering::Relaxed);
        self.cancel_requested.store(false, Ordering::Relaxed);
        self.result.store(0, Ordering::Relaxed);
        self.task.store(kind as u8, Ordering::Relaxed);
        self.state.store(1, Ordering::Relaxed);
        *lock_or_recover(&self.last_error) = None;
        *lock_or_recover(&self.started) = Some(Instant::now());
    }

    /// Adds to the completed-work counter.
    pub(crate) fn add_work_completed(&self, amount: u64) {
        self.work_completed.fetch_add(amount, Ordering::Relaxed);
    }

    pub(crate) fn set_file_name(&self, name: Option<String>) {
        *lock_or_recover(&self.file_name) = name;
    }

    /// Records the outcome of a task and returns the monitor to `Ready`.
    pub(crate) fn finish(&self, outcome: Result<(), &Error>) {
        let result = match outcome {
            Ok(()) => TaskResult::Success,
            Err(Error::Cancelled) => TaskResult::Cancelled,
            Err(e) => {
                *lock_or_recover(&self.last_error) = Some(e.to_string());
                TaskResult::Error
            }
        };
        self.result.store(result as u8, Ordering::Relaxed);
        self.task.store(TaskKind::None as u8, Ordering::Relaxed);
        self.state.store(0, Ordering::Relaxed);
        self.cancel_requested.store(false, Ordering::Relaxed);
        *lock_or_recover(&self.file_name) = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let monitor = ProgressMonitor::new();
        assert_eq!(monitor.state(), TaskState::Ready);
        assert_eq!(monitor.result(), TaskResult::Pending);
        assert_eq!(monitor.current_task(), TaskKind::None);
        assert_eq!(monitor.percent_done(), 0);
        assert!(monitor.file_name().is_none());
        assert!(monitor.elapsed().is_none());
    }

    #[test]
    fn test_percent_done() {
        let monitor = ProgressMonitor::new();
        monitor.begin(TaskKind::AddFile, 1000);
        monitor.add_work_completed(250);
        assert_eq!(monitor.percent_done(), 25);
        monitor.add_work_completed(2000);
        assert_eq!(monitor.percent_done(), 100);
    }

    #[test]
    fn test_unknown_total() {
        let monitor = ProgressMonitor::new();
        monitor.begin(TaskKind::AddStream, 0);
        monitor.add_work_completed(4096);
        assert_eq!(monitor.work_completed(), 4096);
        assert_eq!(monitor.percent_done(), 0);
    }

    #[test]
    fn test_lifecycle() {
        let monitor = ProgressMonitor::new();
        monitor.begin(TaskKind::Extract, 10);
        monitor.set_file_name(Some("a.txt".into()));
        assert_eq!(monitor.state(), TaskState::Busy);
        assert_eq!(monitor.current_task(), TaskKind::Extract);
        assert_eq!(monitor.file_name().as_deref(), Some("a.txt"));

        monitor.finish(Ok(()));
        assert_eq!(monitor.state(), TaskState::Ready);
        assert_eq!(monitor.result(), TaskResult::Success);
        assert!(monitor.file_name().is_none());
    }

    #[test]
    fn test_finish_with_error() {
        let monitor = ProgressMonitor::new();
        monitor.begin(TaskKind::AddFile, 0);
        monitor.finish(Err(&Error::EntryNotFound("x".into())));
        assert_eq!(monitor.result(), TaskResult::Error);
        assert!(monitor.last_error().unwrap().contains("x"));
    }

    #[test]
    fn test_cancel_flag() {
        let monitor = ProgressMonitor::shared();
        monitor.begin(TaskKind::AddStream, 0);

        let observer = Arc::clone(&monitor);
        std::thread::spawn(move || observer.cancel()).join().unwrap();

        assert!(monitor.is_cancel_requested());
        monitor.finish(Err(&Error::Cancelled));
        assert_eq!(monitor.result(), TaskResult::Cancelled);
        assert!(!monitor.is_cancel_requested());
    }

    #[test]
    fn test_begin_resets_counters() {
        let monitor = ProgressMonitor::new();
        monitor.begin(TaskKind::AddFile, 100);
        monitor.add_work_completed(100);
        monitor.cancel();
        monitor.begin(TaskKind::AddFile, 50);
        assert_eq!(monitor.work_completed(), 0);
        assert_eq!(monitor.total_work(), 50);
        assert!(!monitor.is_cancel_requested());
    }
}
