//! Progress reporting for batch and optimization runs.
//!
//! A [`Progress`] wraps a callback that receives `(completed, total, message)`
//! after each unit of work finishes. Callbacks may be invoked from worker
//! threads, so they must be `Send + Sync`.
//!
//! # Example
//!
//! ```
//! use uvwrap::algo::progress::Progress;
//!
//! let progress = Progress::new(|current, total, message| {
//!     println!("[{}/{}] {}", current, total, message);
//! });
//! progress.report(1, 4, "bunny.obj");
//! ```
//!
//! For consumers on another thread, [`Progress::channel`] forwards every
//! report as a [`ProgressEvent`].

use std::sync::mpsc::Sender;

/// A progress callback that receives updates during long-running operations.
///
/// The callback receives:
/// - `current`: Number of completed units
/// - `total`: Total number of units
/// - `message`: Label of the unit that just finished
pub struct Progress {
    callback: Box<dyn Fn(usize, usize, &str) + Send + Sync>,
}

/// One progress report, as sent by [`Progress::channel`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    pub current: usize,
    pub total: usize,
    pub message: String,
}

impl Progress {
    /// Create a new progress reporter with the given callback.
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(usize, usize, &str) + Send + Sync + 'static,
    {
        Self {
            callback: Box::new(callback),
        }
    }

    /// Forward every report to `sender`.
    ///
    /// Reports sent after the receiver is dropped are discarded.
    pub fn channel(sender: Sender<ProgressEvent>) -> Self {
        Self::new(move |current, total, message| {
            let _ = sender.send(ProgressEvent {
                current,
                total,
                message: message.to_string(),
            });
        })
    }

    /// Report progress.
    #[inline]
    pub fn report(&self, current: usize, total: usize, message: &str) {
        (self.callback)(current, total, message);
    }

    /// Create a no-op progress reporter that discards all updates.
    pub fn none() -> Self {
        Self::new(|_, _, _| {})
    }
}

impl Default for Progress {
    fn default() -> Self {
        Self::none()
    }
}

impl std::fmt::Debug for Progress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Progress").finish_non_exhaustive()
    }
}
