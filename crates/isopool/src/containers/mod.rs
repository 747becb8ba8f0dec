// Copyright (c) The isopool Authors.
// Licensed under the MIT License.

// The three supporting containers named in spec §2/§3: an unbounded FIFO queue, a binary-heap
// priority queue, and a bounded ring buffer used as the idle-worker pool. Only their semantic
// contracts are in scope for this crate (spec §1 keeps the containers themselves outside the
// "hard engineering" the spec concentrates on), so these are small, dependency-free
// implementations rather than anything load-bearing for the control core's correctness.

mod priority_queue;
mod queue;
mod ring;

pub(crate) use priority_queue::PriorityQueue;
pub(crate) use queue::Queue;
pub(crate) use ring::{RingFullError, RingBuffer};
