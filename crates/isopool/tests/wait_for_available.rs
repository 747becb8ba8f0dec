// Copyright (c) The isopool Authors.
// Licensed under the MIT License.

// Scenario E (spec §8): `wait_for_available_resource` resolves strictly in FIFO order, and
// resolving one waiter does not cascade to the next — the next waiter only wakes on the next
// qualifying idle moment.
//
// Each task logs itself from inside its own `handle()` call, on the single worker thread this
// pool size (1) guarantees. That thread processes one command at a time, so the log's append
// order is the real completion order by construction, not by timing luck; channel sends between
// the control thread and whichever caller thread a waiter resolves on give the happens-before
// edges the assertion below relies on. The two `sleep`s only need to be long enough to keep `W2`
// from being installed ahead of `W1` on the control thread, and are not load-bearing for the
// completion-order guarantee itself.

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use isopool::{Pool, Task, TaskHandler, WorkerContext};

struct Logger {
    log: Arc<Mutex<Vec<&'static str>>>,
}

impl TaskHandler for Logger {
    type Data = &'static str;
    type Output = ();

    fn handle(
        &mut self,
        _task_type: &str,
        label: &'static str,
        _ctx: &WorkerContext<Self>,
    ) -> Result<(), String> {
        thread::sleep(Duration::from_millis(15));
        self.log.lock().expect("log mutex poisoned").push(label);
        Ok(())
    }
}

#[test]
fn wait_for_available_resource_resolves_in_fifo_order() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let pool = {
        let log = Arc::clone(&log);
        Arc::new(
            Pool::builder()
                .worker_factory(move || Logger {
                    log: Arc::clone(&log),
                })
                .pool_size(1)
                .build()
                .expect("pool should build with a valid fixed size"),
        )
    };

    let task1 = pool.run_task(Task::new("ping", "task1"));
    let task2 = pool.run_task(Task::new("ping", "task2"));

    let w1 = {
        let pool = Arc::clone(&pool);
        let log = Arc::clone(&log);
        thread::spawn(move || {
            pool.wait_for_available_resource()
                .expect("pool should not be closed");
            log.lock().expect("log mutex poisoned").push("W1");
            let task3 = pool.run_task(Task::new("ping", "task3"));
            let task4 = pool.run_task(Task::new("ping", "task4"));
            task3.wait().expect("task3 should not fail");
            task4.wait().expect("task4 should not fail");
        })
    };

    // Give W1's request time to register with the control thread before W2's does, so the two
    // waiters are known to queue in this order (spec §4.1: "resolved in FIFO order of waiters").
    thread::sleep(Duration::from_millis(30));

    let w2 = {
        let pool = Arc::clone(&pool);
        let log = Arc::clone(&log);
        thread::spawn(move || {
            pool.wait_for_available_resource()
                .expect("pool should not be closed");
            log.lock().expect("log mutex poisoned").push("W2");
            let task5 = pool.run_task(Task::new("ping", "task5"));
            let task6 = pool.run_task(Task::new("ping", "task6"));
            task5.wait().expect("task5 should not fail");
            task6.wait().expect("task6 should not fail");
        })
    };

    task1.wait().expect("task1 should not fail");
    task2.wait().expect("task2 should not fail");
    w1.join().expect("w1 thread panicked");
    w2.join().expect("w2 thread panicked");

    let observed = log.lock().expect("log mutex poisoned").clone();
    assert_eq!(
        observed,
        vec!["task1", "task2", "W1", "task3", "task4", "W2", "task5", "task6"]
    );

    pool.close().expect("close should succeed");
}
