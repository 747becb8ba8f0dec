// Copyright (c) The isopool Authors.
// Licensed under the MIT License.

// Scenario A (spec §8): a single-worker FIFO pool serializes a ping and three adds, all of which
// eventually resolve.

use isopool::{Pool, Task, TaskHandler, WorkerContext};

enum Op {
    Ping,
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
            Op::Ping => Ok(0),
            Op::Add(a, b) => Ok(a + b),
        }
    }
}

#[test]
fn fifo_pool_runs_ping_then_adds_in_order() {
    let pool = Pool::builder()
        .worker_factory(|| Calc)
        .pool_size(1)
        .build()
        .expect("pool should build with a valid fixed size");

    let ping = pool.run_task(Task::new("ping", Op::Ping));
    let adds: Vec<_> = [(2, 7), (10, 8), (18, 9)]
        .into_iter()
        .map(|(a, b)| pool.run_task(Task::new("add", Op::Add(a, b))))
        .collect();

    assert_eq!(ping.wait().expect("ping should not fail"), 0);

    let mut results: Vec<i64> = adds
        .into_iter()
        .map(|handle| handle.wait().expect("add should not fail"))
        .collect();
    results.sort_unstable();

    assert_eq!(results, vec![9, 18, 27]);

    pool.close().expect("close should succeed");
}
