//! Archive tasks with progress reporting and cooperative cancellation.
//!
//! A task bundles one archive mutation or extraction with everything it
//! needs, so it can be moved to a worker thread. [`execute`] runs it either
//! on the calling thread or on a dedicated worker and reports progress into
//! a shared [`ProgressMonitor`].
//!
//! Payload bytes are pumped in [`BUFFER_SIZE`](crate::BUFFER_SIZE)
//! increments. After every buffer the completed-work counter is advanced and
//! the cancel flag is polled; a cancelled task stops at the next buffer
//! boundary with [`Error::Cancelled`]. Bytes already written stay in the
//! archive.
//!
//! # Example
//!
//! ```rust,no_run
//! use spanzip::progress::ProgressMonitor;
//! use spanzip::task::{AddStreamTask, ExecutionMode, execute};
//! use spanzip::{ArchiveMetadata, EntryOptions};
//!
//! let metadata = ArchiveMetadata::create("out.zip", None)?;
//! let monitor = ProgressMonitor::shared();
//! let task = AddStreamTask::new(metadata, std::io::stdin(), EntryOptions::new("stdin.txt"));
//! let handle = execute(task, ExecutionMode::Background, monitor.clone());
//! let metadata = handle.wait()?;
//! println!("{} entries", metadata.len());
//! # Ok::<(), spanzip::Error>(())
//! ```

mod add_file;
mod add_stream;
mod extract;

use std::io::{self, Read};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::progress::{ProgressMonitor, TaskKind};
use crate::{BUFFER_SIZE, Error, Result};

pub use add_file::AddFileTask;
pub use add_stream::AddStreamTask;
pub use extract::ExtractEntryTask;

/// Where a task runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    /// On the calling thread; [`execute`] returns once the task is done.
    #[default]
    Inline,
    /// On a dedicated worker thread.
    Background,
}

/// A unit of work that can be run by [`execute`].
pub trait ArchiveTask: Send + 'static {
    /// The value produced on success.
    type Output: Send + 'static;

    /// The kind reported through the monitor.
    fn kind(&self) -> TaskKind;

    /// Total work in bytes, or 0 when unknown.
    fn total_work(&self) -> Result<u64>;

    /// Runs the task, reporting progress into `monitor`.
    fn run(self, monitor: &ProgressMonitor) -> Result<Self::Output>;
}

/// Handle to a task started by [`execute`].
#[derive(Debug)]
pub struct TaskHandle<T> {
    inner: HandleInner<T>,
}

#[derive(Debug)]
enum HandleInner<T> {
    Done(Result<T>),
    Running(JoinHandle<Result<T>>),
}

impl<T> TaskHandle<T> {
    /// Returns `true` once the task has stopped.
    pub fn is_finished(&self) -> bool {
        match &self.inner {
            HandleInner::Done(_) => true,
            HandleInner::Running(handle) => handle.is_finished(),
        }
    }

    /// Blocks until the task stops and returns its result.
    ///
    /// A panic on the worker thread is resumed on the caller.
    pub fn wait(self) -> Result<T> {
        match self.inner {
            HandleInner::Done(result) => result,
            HandleInner::Running(handle) => match handle.join() {
                Ok(result) => result,
                Err(payload) => std::panic::resume_unwind(payload),
            },
        }
    }
}

/// Runs `task` in the given mode.
///
/// The monitor is switched to busy before this returns, so a cancel request
/// issued right after a background start is not lost.
pub fn execute<T: ArchiveTask>(
    task: T,
    mode: ExecutionMode,
    monitor: Arc<ProgressMonitor>,
) -> TaskHandle<T::Output> {
    let kind = task.kind();
    let total = match task.total_work() {
        Ok(total) => total,
        Err(e) => {
            monitor.begin(kind, 0);
            monitor.finish(Err(&e));
            return TaskHandle {
                inner: HandleInner::Done(Err(e)),
            };
        }
    };
    monitor.begin(kind, total);
    log::debug!("Starting {kind:?} task ({mode:?}, {total} bytes of work)");

    let inner = match mode {
        ExecutionMode::Inline => HandleInner::Done(run_to_completion(task, &monitor)),
        ExecutionMode::Background => {
            HandleInner::Running(thread::spawn(move || run_to_completion(task, &monitor)))
        }
    };
    TaskHandle { inner }
}

fn run_to_completion<T: ArchiveTask>(task: T, monitor: &ProgressMonitor) -> Result<T::Output> {
    let kind = task.kind();
    let result = task.run(monitor);
    match &result {
        Ok(_) => log::debug!("{kind:?} task finished"),
        Err(Error::Cancelled) => log::debug!("{kind:?} task cancelled"),
        Err(e) => log::debug!("{kind:?} task failed: {e}"),
    }
    monitor.finish(result.as_ref().map(|_| ()));
    result
}

/// Copies `source` into `consume` one buffer at a time.
///
/// Cancellation is checked before every read. Read errors that carry a crate
/// error (for example a CRC mismatch from an entry stream) are surfaced as
/// that error; plain I/O errors become [`Error::SourceReadFailure`].
pub(crate) fn pump<R, F>(source: &mut R, monitor: &ProgressMonitor, mut consume: F) -> Result<u64>
where
    R: Read + ?Sized,
    F: FnMut(&[u8]) -> Result<()>,
{
    let mut buf = [0u8; BUFFER_SIZE];
    let mut total = 0u64;
    loop {
        if monitor.is_cancel_requested() {
            return Err(Error::Cancelled);
        }
        let n = match source.read(&mut buf) {
            Ok(0) => return Ok(total),
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(source_error(e)),
        };
        consume(&buf[..n])?;
        monitor.add_work_completed(n as u64);
        total += n as u64;
    }
}

fn source_error(error: io::Error) -> Error {
    match Error::from_io(error) {
        Error::Io(e) => Error::SourceReadFailure(e),
        other => other,
    }
}
