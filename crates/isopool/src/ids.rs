// Copyright (c) The isopool Authors.
// Licensed under the MIT License.

// Monotonic identity generators for tasks and workers.
//
// The core keys its indices on these identities only; callers never need to construct one
// themselves (see spec §9: "the core itself keys on task identity only").

use std::sync::atomic::{AtomicU64, Ordering};

/// Process-unique, monotonically increasing identity for a submitted task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

impl TaskId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "task#{}", self.0)
    }
}

/// Process-unique, monotonically increasing identity for a worker thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkerId(u64);

impl WorkerId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for WorkerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "worker#{}", self.0)
    }
}

/// Allocates process-unique identities for tasks and workers.
///
/// Kept as a tiny indirection (rather than calling `TaskId::next()` directly from call sites) so
/// the control core has a single place to look if identity generation ever needs to change.
#[derive(Debug, Default)]
pub(crate) struct IdAllocator;

impl IdAllocator {
    pub(crate) fn next_task_id(&self) -> TaskId {
        TaskId::next()
    }

    pub(crate) fn next_worker_id(&self) -> WorkerId {
        WorkerId::next()
    }
}
