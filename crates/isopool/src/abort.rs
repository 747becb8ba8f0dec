// Copyright (c) The isopool Authors.
// Licensed under the MIT License.

// Caller-side cancellation handle, independent of the worker-side abort flag in `protocol.rs`.
//
// `AbortController`/`AbortSignal` model the caller's half of cancellation (spec §3's
// `task.abortSignal`): a predicate plus a one-shot subscription. The core translates a signal
// firing into writing the shared abort byte the worker polls; the two mechanisms are deliberately
// kept separate because a signal can fire before a worker ever receives the task.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use std::sync::Arc;

use crate::constants::ERR_POISONED_LOCK;

type Waiter = Box<dyn FnOnce() + Send>;

#[derive(Default)]
struct Inner {
    aborted: AtomicBool,
    waiters: Mutex<Vec<(u64, Waiter)>>,
}

/// The writer half of an abort signal: calling [`abort`][Self::abort] transitions the paired
/// [`AbortSignal`] from not-aborted to aborted, exactly once.
#[derive(Debug, Clone)]
pub struct AbortController {
    inner: Arc<Inner>,
}

/// The reader half of an abort signal, handed to a task at submission.
///
/// Cloning an `AbortSignal` shares the same underlying aborted flag and subscriber list.
#[derive(Debug, Clone)]
pub struct AbortSignal {
    inner: Arc<Inner>,
}

/// A handle returned by [`AbortSignal::on_abort`], used to detach the subscription before it
/// fires (see spec §4.4: "detached on any terminal transition").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(u64);

impl std::fmt::Debug for Inner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Inner")
            .field("aborted", &self.aborted.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl AbortController {
    /// Creates a fresh, not-yet-aborted controller/signal pair.
    #[must_use]
    pub fn new() -> (Self, AbortSignal) {
        let inner = Arc::new(Inner::default());
        (
            Self {
                inner: Arc::clone(&inner),
            },
            AbortSignal { inner },
        )
    }

    /// Flips the paired signal to aborted and fires every still-subscribed waiter.
    ///
    /// Idempotent: aborting twice only fires waiters once (monotonic false→true, per spec §3).
    pub fn abort(&self) {
        if self.inner.aborted.swap(true, Ordering::SeqCst) {
            return;
        }

        let waiters = std::mem::take(&mut *self.inner.waiters.lock().expect(ERR_POISONED_LOCK));
        for (_, waiter) in waiters {
            waiter();
        }
    }
}

impl AbortSignal {
    /// Returns whether the signal has already fired.
    #[must_use]
    pub fn aborted(&self) -> bool {
        self.inner.aborted.load(Ordering::SeqCst)
    }

    /// Subscribes `waiter` to fire exactly once when the signal aborts.
    ///
    /// If the signal is already aborted, `waiter` runs immediately (inline, on the caller's
    /// thread) and `None` is returned since there is nothing left to unsubscribe. Otherwise the
    /// subscription is recorded and its id returned so the caller can detach it later via
    /// [`unsubscribe`][Self::unsubscribe].
    pub fn on_abort(&self, waiter: impl FnOnce() + Send + 'static) -> Option<SubscriptionId> {
        if self.aborted() {
            waiter();
            return None;
        }

        let mut waiters = self.inner.waiters.lock().expect(ERR_POISONED_LOCK);

        // Re-check under the lock: `abort()` may have raced us between the check above and
        // acquiring the lock.
        if self.inner.aborted.load(Ordering::SeqCst) {
            drop(waiters);
            waiter();
            return None;
        }

        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
        waiters.push((id, Box::new(waiter)));
        Some(SubscriptionId(id))
    }

    /// Removes a subscription registered via [`on_abort`][Self::on_abort].
    ///
    /// A no-op if the subscription already fired or was already removed; detachment is
    /// idempotent, matching the task registry's `deregister()` contract.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        let mut waiters = self.inner.waiters.lock().expect(ERR_POISONED_LOCK);
        waiters.retain(|(waiter_id, _)| *waiter_id != id.0);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn fires_waiter_on_abort() {
        let (controller, signal) = AbortController::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let fired_clone = Arc::clone(&fired);
        signal.on_abort(move || {
            fired_clone.fetch_add(1, Ordering::SeqCst);
        });

        assert!(!signal.aborted());
        controller.abort();
        assert!(signal.aborted());
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn abort_is_idempotent() {
        let (controller, signal) = AbortController::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let fired_clone = Arc::clone(&fired);
        signal.on_abort(move || {
            fired_clone.fetch_add(1, Ordering::SeqCst);
        });

        controller.abort();
        controller.abort();
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn on_abort_after_abort_fires_immediately() {
        let (controller, signal) = AbortController::new();
        controller.abort();

        let fired = Arc::new(AtomicUsize::new(0));
        let fired_clone = Arc::clone(&fired);
        let subscription = signal.on_abort(move || {
            fired_clone.fetch_add(1, Ordering::SeqCst);
        });

        assert!(subscription.is_none());
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unsubscribe_prevents_later_firing() {
        let (controller, signal) = AbortController::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let fired_clone = Arc::clone(&fired);
        let subscription = signal
            .on_abort(move || {
                fired_clone.fetch_add(1, Ordering::SeqCst);
            })
            .expect("signal not yet aborted");

        signal.unsubscribe(subscription);
        controller.abort();
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }
}
