// Copyright (c) The isopool Authors.
// Licensed under the MIT License.

//! A pool of isolated execution workers, each a dedicated OS thread running a user-supplied
//! [`TaskHandler`], coordinated by a single control thread that owns every piece of pool state.
//!
//! Work is submitted as a [`Task`] via [`Pool::run_task`] and observed through the returned
//! [`TaskHandle`], which can be awaited or blocked on. Callers who need a worker to themselves —
//! to run several related tasks back to back without another caller's task interleaving — can
//! [`Pool::acquire_worker`] and dispatch to it directly with [`Pool::run_task_on`].
//!
//! ```no_run
//! use isopool::{Pool, Task, TaskHandler, WorkerContext};
//!
//! struct Double;
//!
//! impl TaskHandler for Double {
//!     type Data = i64;
//!     type Output = i64;
//!
//!     fn handle(
//!         &mut self,
//!         _task_type: &str,
//!         data: i64,
//!         _ctx: &WorkerContext<Self>,
//!     ) -> Result<i64, String> {
//!         Ok(data * 2)
//!     }
//! }
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = Pool::builder()
//!     .worker_factory(|| Double)
//!     .pool_size(4)
//!     .build()?;
//!
//! let handle = pool.run_task(Task::new("double", 21));
//! assert_eq!(handle.wait()?, 42);
//! # Ok(())
//! # }
//! ```

mod abort;
mod builder;
mod constants;
mod containers;
mod error;
mod ids;
mod pool;
mod protocol;
mod registry;
mod stats;
mod worker;

pub use abort::{AbortController, AbortSignal, SubscriptionId};
pub use builder::PoolBuilder;
pub use error::{Error, Result};
pub use ids::{TaskId, WorkerId};
pub use pool::Pool;
pub use protocol::{Task, TaskHandle, WorkerHandle};
pub use stats::Stats;
pub use worker::{TaskHandler, WorkerContext};
