// Copyright (c) The isopool Authors.
// Licensed under the MIT License.

// The task registry: core-owned mapping from task identity to its per-task state (spec §3,
// "TaskRegistry"). Every task not yet in a terminal state has exactly one entry here; removal
// plus abort-subscription detachment happens together, within a single control-thread step, so
// observers never see partial teardown (spec §3, end of "Task lifecycle states").

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use crate::abort::{AbortSignal, SubscriptionId};
use crate::error::{Error, Result};
use crate::ids::TaskId;

/// Per-task state the control core owns for the lifetime of a registered task.
pub(crate) struct TaskRecord<T> {
    completion: oneshot::Sender<Result<T>>,
    abort_signal: Option<AbortSignal>,
    subscription: Option<SubscriptionId>,
    /// The one-byte shared region the worker polls via `throwIfAborted()` (spec §3, "abortFlag").
    pub(crate) abort_flag: Arc<AtomicBool>,
    pub(crate) priority: i64,
    pub(crate) on_event: Option<Box<dyn FnMut(String, String) + Send>>,
}

impl<T> TaskRecord<T> {
    pub(crate) fn new(
        completion: oneshot::Sender<Result<T>>,
        abort_signal: Option<AbortSignal>,
        priority: i64,
        on_event: Option<Box<dyn FnMut(String, String) + Send>>,
    ) -> Self {
        Self {
            completion,
            abort_signal,
            subscription: None,
            abort_flag: Arc::new(AtomicBool::new(false)),
            priority,
            on_event,
        }
    }

    pub(crate) fn set_subscription(&mut self, subscription: Option<SubscriptionId>) {
        self.subscription = subscription;
    }

    /// Detaches this task's abort subscription, if it is still attached. Idempotent.
    fn detach(&mut self) {
        if let (Some(signal), Some(id)) = (&self.abort_signal, self.subscription.take()) {
            signal.unsubscribe(id);
        }
    }

    /// Resolves the completion with `outcome` and detaches the abort subscription. Consumes the
    /// record, matching "terminal transition removes the task from all indices" (spec §3).
    fn finish(mut self, outcome: Result<T>) {
        self.detach();
        let _ = self.completion.send(outcome);
    }
}

/// Core-owned mapping from task identity to [`TaskRecord`] (spec §3, "TaskRegistry").
pub(crate) struct TaskRegistry<T> {
    tasks: HashMap<TaskId, TaskRecord<T>>,
}

impl<T> TaskRegistry<T> {
    pub(crate) fn new() -> Self {
        Self {
            tasks: HashMap::new(),
        }
    }

    pub(crate) fn insert(&mut self, id: TaskId, record: TaskRecord<T>) {
        self.tasks.insert(id, record);
    }

    pub(crate) fn contains(&self, id: TaskId) -> bool {
        self.tasks.contains_key(&id)
    }

    pub(crate) fn get_mut(&mut self, id: TaskId) -> Option<&mut TaskRecord<T>> {
        self.tasks.get_mut(&id)
    }

    pub(crate) fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Removes the task and resolves its completion, detaching the abort subscription
    /// (spec §3, `TaskState.deregister()`). A no-op if the task is already gone, matching
    /// `deregister`'s idempotence requirement.
    pub(crate) fn finish(&mut self, id: TaskId, outcome: Result<T>) {
        if let Some(record) = self.tasks.remove(&id) {
            record.finish(outcome);
        }
    }

    /// Removes every remaining task and rejects each with [`Error::PoolClosed`] (spec §4.1,
    /// `close()`).
    pub(crate) fn close_all(&mut self) {
        for (_, record) in self.tasks.drain() {
            record.finish(Err(Error::PoolClosed));
        }
    }
}
