// Copyright (c) The isopool Authors.
// Licensed under the MIT License.

// WorkerLifecycle (spec §4.5): spawns an isolated execution worker, wires its message/error
// handlers, and supports replacing a crashed worker. A "worker" in this crate is a dedicated OS
// thread running a user-supplied [`TaskHandler`]; it communicates with the control thread only
// through the discrete messages in `protocol.rs`, the closest same-process analogue to "its own
// memory space" that Rust offers without paying for a subprocess per worker.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::mpsc;
use std::thread;

use tracing::{debug, warn};

use crate::ids::{TaskId, WorkerId};
use crate::pool::ControlEvent;
use crate::protocol::{WorkerCommand, WorkerMessage};

/// A user-supplied handler invoked on a worker thread for every task dispatched to it.
///
/// This is the external collaborator spec §1 calls "the worker-side task dispatcher" — this
/// crate only specifies the message protocol it exchanges with the control core (spec §6), not
/// the handler logic itself.
pub trait TaskHandler: Send + 'static {
    /// The payload type carried by a [`Task`][crate::Task] submitted to this handler's pool.
    type Data: Send + 'static;
    /// The value produced by a successfully handled task.
    type Output: Send + 'static;

    /// Routes `task_type` and runs it against `data`, returning the worker-side result or a
    /// verbatim failure message (spec §6: "returns `{data, transferList?}` or throws").
    ///
    /// # Errors
    ///
    /// Returns a descriptive error if the task type is unrecognized or the task otherwise fails;
    /// the message is surfaced to the caller verbatim as
    /// [`Error::UserTaskFailure`][crate::Error::UserTaskFailure].
    fn handle(
        &mut self,
        task_type: &str,
        data: Self::Data,
        ctx: &WorkerContext<Self>,
    ) -> Result<Self::Output, String>
    where
        Self: Sized;
}

/// The context handed to a [`TaskHandler`] while it runs a task (spec §6's worker-side handler
/// contract: `emitEvent(event, data)` and `throwIfAborted()`).
pub struct WorkerContext<H: TaskHandler> {
    pub(crate) task_id: TaskId,
    pub(crate) abort_flag: Arc<AtomicBool>,
    pub(crate) control_tx: mpsc::Sender<ControlEvent<H>>,
}

impl<H: TaskHandler> std::fmt::Debug for WorkerContext<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerContext")
            .field("task_id", &self.task_id)
            .finish_non_exhaustive()
    }
}

impl<H: TaskHandler> Clone for WorkerContext<H> {
    fn clone(&self) -> Self {
        Self {
            task_id: self.task_id,
            abort_flag: Arc::clone(&self.abort_flag),
            control_tx: self.control_tx.clone(),
        }
    }
}

impl<H: TaskHandler> WorkerContext<H> {
    /// Sends a non-terminal progress event for the current task back to the control thread,
    /// which forwards it to the task's `on_event` callback if one was registered (spec §4.5,
    /// `EVENT` message handling).
    pub fn emit_event(&self, event: impl Into<String>, data: impl Into<String>) {
        let _ = self.control_tx.send(ControlEvent::Worker(WorkerMessage::Event {
            task_id: self.task_id,
            event: event.into(),
            data: data.into(),
        }));
    }

    /// Returns [`Error::Aborted`][crate::Error::Aborted] once the control thread has signalled
    /// abort for the current task; otherwise `Ok(())`. Intended to be polled at safe points
    /// inside handler code (spec §4.4 item 2, spec §9: "cheap polling point").
    ///
    /// # Errors
    ///
    /// Returns [`Error::Aborted`][crate::Error::Aborted] if the task has been cancelled.
    pub fn throw_if_aborted(&self) -> crate::Result<()> {
        if self
            .abort_flag
            .load(std::sync::atomic::Ordering::SeqCst)
        {
            Err(crate::Error::Aborted)
        } else {
            Ok(())
        }
    }
}

/// A live worker thread: its identity and the channel used to post `TASK` commands to it.
pub(crate) struct WorkerThread<H: TaskHandler> {
    pub(crate) id: WorkerId,
    command_tx: mpsc::Sender<WorkerCommand<H::Data>>,
    join_handle: Option<thread::JoinHandle<()>>,
}

impl<H: TaskHandler> WorkerThread<H> {
    /// Posts a `TASK` message to this worker (spec §6, core→worker `TASK`).
    ///
    /// # Errors
    ///
    /// Returns the command back if the worker thread has already exited and its channel is
    /// closed (spec §7, `DispatchFailure`: "posting the TASK message failed synchronously").
    pub(crate) fn dispatch(
        &self,
        command: WorkerCommand<H::Data>,
    ) -> Result<(), WorkerCommand<H::Data>> {
        self.command_tx.send(command).map_err(|e| e.0)
    }

    /// Closes this worker's command channel and joins its thread on a throwaway reaper thread,
    /// so a handler wedged in a long, non-cooperative call can't block the caller (the control
    /// thread, during `close()`).
    pub(crate) fn shut_down(mut self) {
        drop(self.command_tx);
        if let Some(handle) = self.join_handle.take() {
            thread::spawn(move || {
                let _ = handle.join();
            });
        }
    }
}

/// Spawns a fresh worker thread running `factory()`'s handler, wired to report every `RESULT`,
/// `EVENT`, and crash back to `control_tx` (spec §4.5: "spawns a worker, wires message/error
/// handlers").
pub(crate) fn spawn<H: TaskHandler>(
    id: WorkerId,
    factory: &(dyn Fn() -> H + Send + Sync),
    control_tx: mpsc::Sender<ControlEvent<H>>,
) -> WorkerThread<H> {
    let mut handler = factory();
    let (command_tx, command_rx) = mpsc::channel::<WorkerCommand<H::Data>>();

    debug!(worker = %id, "spawning worker thread");

    let join_handle = thread::Builder::new()
        .name(format!("isopool-worker-{id}"))
        .spawn(move || {
            for command in command_rx {
                let WorkerCommand {
                    task_id,
                    task_type,
                    data,
                    abort_flag,
                } = command;

                let ctx = WorkerContext {
                    task_id,
                    abort_flag,
                    control_tx: control_tx.clone(),
                };

                let outcome = {
                    let handler = AssertUnwindSafe(&mut handler);
                    let ctx_ref = &ctx;
                    let task_type_ref = task_type.as_str();
                    panic::catch_unwind(move || {
                        let handler = handler;
                        handler.0.handle(task_type_ref, data, ctx_ref)
                    })
                };

                match outcome {
                    Ok(result) => {
                        let _ = control_tx.send(ControlEvent::Worker(WorkerMessage::Result {
                            worker_id: id,
                            task_id,
                            outcome: result,
                        }));
                    }
                    Err(panic) => {
                        let message = panic_message(&panic);
                        warn!(worker = %id, task = %task_id, error = %message, "worker thread panicked");
                        let _ = control_tx.send(ControlEvent::Worker(WorkerMessage::Crashed {
                            worker_id: id,
                            task_id: Some(task_id),
                            error: message,
                        }));
                        return;
                    }
                }
            }
        })
        .expect("spawning an OS thread should not fail under normal operation");

    WorkerThread {
        id,
        command_tx,
        join_handle: Some(join_handle),
    }
}

pub(crate) fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "worker panicked with a non-string payload".to_owned()
    }
}
