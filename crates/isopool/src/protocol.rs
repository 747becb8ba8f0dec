// Copyright (c) The isopool Authors.
// Licensed under the MIT License.

// Public task-submission types plus the internal control<->worker message protocol (spec §6).
// Only the message *shapes* are specified; the worker-side dispatcher that interprets `Task`
// messages and produces `Result`/`Event` messages is an external collaborator (spec §1) — in this
// crate that collaborator is a user-supplied [`crate::TaskHandler`] running on a worker thread.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use crate::abort::AbortSignal;
use crate::error::Result;
use crate::ids::{TaskId, WorkerId};

/// A unit of work submitted to a [`Pool`][crate::Pool].
///
/// Mirrors spec §3's `Task`: a routing tag, an opaque payload, an optional priority (honored only
/// when the pool was built with a priority wait list), an optional cancellation signal, and an
/// optional progress-event callback. `transferList` is not modeled: in a single process, moving
/// `data` into the worker thread is already what `Send` ownership gives for free (see
/// `DESIGN.md`).
pub struct Task<D> {
    pub(crate) task_type: String,
    pub(crate) data: D,
    pub(crate) priority: i64,
    pub(crate) abort_signal: Option<AbortSignal>,
    pub(crate) on_event: Option<Box<dyn FnMut(String, String) + Send>>,
}

impl<D> fmt::Debug for Task<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("task_type", &self.task_type)
            .field("priority", &self.priority)
            .finish_non_exhaustive()
    }
}

impl<D> Task<D> {
    /// Creates a task of the given routing type carrying `data`, with default priority `0` and no
    /// abort signal or event callback.
    pub fn new(task_type: impl Into<String>, data: D) -> Self {
        Self {
            task_type: task_type.into(),
            data,
            priority: 0,
            abort_signal: None,
            on_event: None,
        }
    }

    /// Sets the priority; only honored by a pool built with `use_priority_task_queue(true)`.
    /// Lower values are dispatched first (spec §3: "lower is more prioritized").
    #[must_use]
    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = priority;
        self
    }

    /// Attaches a cancellation signal; aborting it before or during execution fails this task
    /// with [`Error::Aborted`][crate::Error::Aborted] (spec §4.4).
    #[must_use]
    pub fn with_abort_signal(mut self, signal: AbortSignal) -> Self {
        self.abort_signal = Some(signal);
        self
    }

    /// Registers a callback invoked on the control thread for every `EVENT` message the worker
    /// emits while running this task (spec §3: `onEvent`).
    #[must_use]
    pub fn on_event(mut self, callback: impl FnMut(String, String) + Send + 'static) -> Self {
        self.on_event = Some(Box::new(callback));
        self
    }
}

/// The caller-visible completion handle returned by [`Pool::run_task`][crate::Pool::run_task].
///
/// Resolves exactly once, either with the worker's output or with the [`Error`][crate::Error] the
/// task terminated with. Implements [`Future`] so it can be awaited directly; [`TaskHandle::wait`]
/// offers a blocking alternative for synchronous callers.
pub struct TaskHandle<T> {
    pub(crate) id: TaskId,
    pub(crate) rx: oneshot::Receiver<Result<T>>,
}

impl<T> fmt::Debug for TaskHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle").field("id", &self.id).finish_non_exhaustive()
    }
}

impl<T> TaskHandle<T> {
    /// The identity assigned to this task at submission.
    #[must_use]
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Blocks the calling thread until the task reaches a terminal state.
    ///
    /// # Errors
    ///
    /// Returns whatever [`Error`][crate::Error] the task terminated with.
    pub fn wait(self) -> Result<T> {
        match self.rx.recv() {
            Ok(outcome) => outcome,
            Err(_) => Err(crate::Error::Programming(
                "task completion was dropped without being resolved".to_owned(),
            )),
        }
    }
}

impl<T> Future for TaskHandle<T> {
    type Output = Result<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx).poll(cx).map(|res| {
            res.unwrap_or_else(|_| {
                Err(crate::Error::Programming(
                    "task completion was dropped without being resolved".to_owned(),
                ))
            })
        })
    }
}

/// A worker reserved for exclusive use via [`Pool::acquire_worker`][crate::Pool::acquire_worker].
///
/// Dropping a handle without calling [`Pool::release_worker`][crate::Pool::release_worker] is a
/// resource leak (the worker stays out of the idle pool forever) but not unsound; a future
/// revision may add an auto-release `Drop` impl, tracked as an open item in `DESIGN.md`.
#[derive(Debug)]
pub struct WorkerHandle {
    pub(crate) id: WorkerId,
}

impl WorkerHandle {
    /// The identity of the reserved worker.
    #[must_use]
    pub fn id(&self) -> WorkerId {
        self.id
    }
}

/// Message posted from the control thread to a worker thread (spec §6, core→worker `TASK`).
pub(crate) struct WorkerCommand<D> {
    pub(crate) task_id: TaskId,
    pub(crate) task_type: String,
    pub(crate) data: D,
    pub(crate) abort_flag: std::sync::Arc<std::sync::atomic::AtomicBool>,
}

/// Message sent from a worker thread back to the control thread.
pub(crate) enum WorkerMessage<T> {
    /// Terminal (spec §6, worker→core `RESULT`): `Ok` on success, `Err` with the handler's
    /// verbatim failure otherwise.
    Result {
        worker_id: WorkerId,
        task_id: TaskId,
        outcome: std::result::Result<T, String>,
    },
    /// Non-terminal (spec §6, worker→core `EVENT`).
    Event {
        task_id: TaskId,
        event: String,
        data: String,
    },
    /// The worker thread's handler panicked; treated as spec §4.5's "error handler" /
    /// `WorkerCrash` (the closest analogue to an isolated worker faulting, given OS threads share
    /// an address space but `catch_unwind` still gives us a fault boundary per task).
    Crashed {
        worker_id: WorkerId,
        task_id: Option<TaskId>,
        error: String,
    },
}
