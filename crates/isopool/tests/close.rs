// Copyright (c) The isopool Authors.
// Licensed under the MIT License.

// Close termination law (spec §8): after `close()`, every task that existed at call time
// reaches `PoolClosed` unless it had already resolved, and every later submission is rejected
// immediately.

use std::thread;
use std::time::Duration;

use isopool::{Error, Pool, Task, TaskHandler, WorkerContext};

struct Sleepy;

impl TaskHandler for Sleepy {
    type Data = Duration;
    type Output = ();

    fn handle(
        &mut self,
        _task_type: &str,
        duration: Duration,
        _ctx: &WorkerContext<Self>,
    ) -> Result<(), String> {
        thread::sleep(duration);
        Ok(())
    }
}

#[test]
fn close_rejects_in_flight_tasks_and_further_submissions() {
    let pool = Pool::builder()
        .worker_factory(|| Sleepy)
        .pool_size(1)
        .build()
        .expect("pool should build with a valid fixed size");

    // The first dispatches immediately (idle worker present); the second has nowhere to go and
    // queues behind it. Both are still registered when `close` runs below.
    let running = pool.run_task(Task::new("sleep", Duration::from_millis(200)));
    let queued = pool.run_task(Task::new("sleep", Duration::from_millis(200)));

    pool.close().expect("close should succeed");

    assert!(matches!(running.wait(), Err(Error::PoolClosed)));
    assert!(matches!(queued.wait(), Err(Error::PoolClosed)));

    let after_close = pool.run_task(Task::new("sleep", Duration::from_millis(1)));
    assert!(matches!(after_close.wait(), Err(Error::PoolClosed)));

    // Idempotent: closing an already-closed pool does not panic or block.
    pool.close().expect("close should succeed");
}

#[test]
fn pending_acquire_and_wait_callers_are_rejected_on_close() {
    let pool = Pool::builder()
        .worker_factory(|| Sleepy)
        .pool_size(1)
        .build()
        .expect("pool should build with a valid fixed size");

    let worker = pool.acquire_worker().expect("pool should not be closed");

    let pool_ref = &pool;
    thread::scope(|scope| {
        let acquirer = scope.spawn(move || pool_ref.acquire_worker());
        let waiter = scope.spawn(move || pool_ref.wait_for_available_resource());

        thread::sleep(Duration::from_millis(20));
        pool.close().expect("close should succeed");

        assert!(matches!(
            acquirer.join().expect("acquirer thread panicked"),
            Err(Error::PoolClosed)
        ));
        assert!(matches!(
            waiter.join().expect("waiter thread panicked"),
            Err(Error::PoolClosed)
        ));
    });

    drop(worker);
}
