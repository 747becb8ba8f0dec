// Copyright (c) The isopool Authors.
// Licensed under the MIT License.

// Scenario F (spec §8): an autoscaled pool grows to its ceiling under simultaneous load, then
// decays back toward its floor once the queue drains and the shrink timer ticks.

use std::thread;
use std::time::{Duration, Instant};

use isopool::{Pool, Task, TaskHandler, WorkerContext};

struct Slow;

impl TaskHandler for Slow {
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
fn autoscale_grows_under_load_and_shrinks_back_when_idle() {
    let pool = Pool::builder()
        .worker_factory(|| Slow)
        .min_pool_size(1)
        .max_pool_size(3)
        .auto_shrink_interval(Duration::from_millis(50))
        .build()
        .expect("pool should build with a valid min/max range");

    let handles: Vec<_> = (0..3)
        .map(|_| pool.run_task(Task::new("slow", Duration::from_millis(150))))
        .collect();

    let grow_deadline = Instant::now() + Duration::from_millis(500);
    loop {
        let stats = pool.stats().expect("stats should succeed");
        if stats.available_workers == 3 {
            break;
        }
        assert!(
            Instant::now() < grow_deadline,
            "pool did not grow to 3 workers in time"
        );
        thread::sleep(Duration::from_millis(5));
    }

    for handle in handles {
        handle.wait().expect("slow task should not fail");
    }

    let shrink_deadline = Instant::now() + Duration::from_millis(1500);
    loop {
        let stats = pool.stats().expect("stats should succeed");
        if stats.available_workers == 1 {
            break;
        }
        assert!(
            Instant::now() < shrink_deadline,
            "pool did not shrink back to 1 worker in time"
        );
        thread::sleep(Duration::from_millis(10));
    }

    pool.close().expect("close should succeed");
}

#[test]
fn autoscale_never_exceeds_max_pool_size() {
    let pool = Pool::builder()
        .worker_factory(|| Slow)
        .min_pool_size(1)
        .max_pool_size(2)
        .auto_shrink_interval(Duration::from_secs(300))
        .build()
        .expect("pool should build with a valid min/max range");

    let handles: Vec<_> = (0..5)
        .map(|_| pool.run_task(Task::new("slow", Duration::from_millis(50))))
        .collect();

    thread::sleep(Duration::from_millis(20));
    let stats = pool.stats().expect("stats should succeed");
    assert!(stats.available_workers <= 2);

    for handle in handles {
        handle.wait().expect("slow task should not fail");
    }

    pool.close().expect("close should succeed");
}
