// Copyright (c) The isopool Authors.
// Licensed under the MIT License.

/// A point-in-time snapshot of the pool's indices, consistent as of the instant it was taken
/// (spec §4.1, `stats()`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub struct Stats {
    /// Total number of live workers (spec §3's `workers` index). Named `available_workers` to
    /// match the field spec.md's `stats()` names; see `DESIGN.md` for why this crate treats
    /// "available" as "currently spawned", not "currently idle".
    pub available_workers: usize,
    /// Total number of live workers, repeated under its index name from spec §3 for callers who
    /// find `workers` clearer than `available_workers` (SPEC_FULL.md §4, additive field).
    pub workers: usize,
    /// Workers sitting in the idle ring, ready to be dispatched to immediately.
    pub idle_workers: usize,
    /// Workers currently reserved for exclusive use via `acquire_worker` (additive field).
    pub acquired_workers: usize,
    /// Tasks dispatched to a worker but not yet terminal.
    pub running_tasks: usize,
    /// Tasks waiting in the FIFO or priority wait list for a worker to become available.
    pub queued_tasks: usize,
    /// Whether `close()` has been called.
    pub closed: bool,
}
