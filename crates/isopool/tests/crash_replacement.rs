// Copyright (c) The isopool Authors.
// Licensed under the MIT License.

// Scenario D (spec §8): a worker that panics while running a task fails that task with
// `WorkerCrash`, is replaced automatically, and the pool keeps serving new work.

use std::thread;
use std::time::{Duration, Instant};

use isopool::{Error, Pool, Task, TaskHandler, WorkerContext};

enum Op {
    Crash,
    Add(i64, i64),
}

struct Calc;

impl TaskHandler for Calc {
    type Data = Op;
    type Output = i64;

    fn handle(
        &mut self,
        _task_type: &str,
        data: Op,
        _ctx: &WorkerContext<Self>,
    ) -> Result<i64, String> {
        match data {
            Op::Crash => panic!("simulated worker crash"),
            Op::Add(a, b) => Ok(a + b),
        }
    }
}

#[test]
fn crashed_worker_is_replaced_and_pool_keeps_serving() {
    let pool = Pool::builder()
        .worker_factory(|| Calc)
        .pool_size(1)
        .build()
        .expect("pool should build with a valid fixed size");

    let crash = pool.run_task(Task::new("crash", Op::Crash));
    match crash.wait() {
        Err(Error::WorkerCrash(_)) => {}
        other => panic!("expected WorkerCrash, got {other:?}"),
    }

    let deadline = Instant::now() + Duration::from_millis(100);
    loop {
        let stats = pool.stats().expect("stats should succeed");
        if stats.available_workers == 1 {
            break;
        }
        assert!(
            Instant::now() < deadline,
            "worker was not replaced within 100ms"
        );
        thread::sleep(Duration::from_millis(2));
    }

    let add = pool.run_task(Task::new("add", Op::Add(7, 2)));
    assert_eq!(add.wait().expect("add should not fail"), 9);

    pool.close().expect("close should succeed");
}
