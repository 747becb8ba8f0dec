// Copyright (c) The isopool Authors.
// Licensed under the MIT License.

// Error taxonomy for the pool control core.

use thiserror::Error;

/// A specialized `Result` type for isopool operations that return an
/// isopool [`Error`][enum@Error] on failure.
pub type Result<T> = std::result::Result<T, Error>;

/// An error surfaced by the pool control core.
///
/// Every recoverable failure a caller can observe is represented here. Future versions may add
/// additional variants, so callers should not exhaustively match without a wildcard arm.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The pool has been closed; no new submissions or acquisitions are accepted.
    ///
    /// Also returned for every task that was still registered at the moment [`close`] ran.
    ///
    /// [`close`]: crate::Pool::close
    #[error("pool is closed")]
    PoolClosed,

    /// The task was cancelled via its abort signal, either before or after dispatch.
    #[error("task was aborted")]
    Aborted,

    /// The worker bound to this task crashed while the task was running.
    ///
    /// The worker has already been replaced by the time this error is observed by the caller.
    #[error("worker crashed while running the task: {0}")]
    WorkerCrash(String),

    /// Posting the `TASK` message to the chosen worker failed synchronously.
    #[error("failed to dispatch task to worker: {0}")]
    DispatchFailure(String),

    /// A worker emitted a message of a type the core does not recognize.
    ///
    /// This indicates the worker-side message channel is broken in a way the core cannot
    /// recover from; the owning control thread stops processing further events for this pool.
    #[error("worker sent an unrecognized message type: {0}")]
    InvalidMessage(String),

    /// The worker-supplied task handler returned an error; the payload is surfaced verbatim.
    #[error("task handler failed: {0}")]
    UserTaskFailure(String),

    /// The caller made a programming mistake (invalid configuration, reentrant call that would
    /// deadlock the control thread, and similar misuse).
    #[error("{0}")]
    Programming(String),
}
