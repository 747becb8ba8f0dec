// Copyright (c) The isopool Authors.
// Licensed under the MIT License.

// Configuration for a `Pool` (spec §6, "Construction parameters"; SPEC_FULL.md §9, `PoolBuilder`).
// `Pool::builder()` is the only supported construction path, mirroring the teacher crate's
// `RuntimeBuilder`-only construction (SPEC_FULL.md §4).

use std::sync::Arc;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::pool::Pool;
use crate::worker::TaskHandler;

const DEFAULT_AUTO_SHRINK_INTERVAL: Duration = Duration::from_secs(300);

enum SizingMode {
    Unset,
    Fixed(usize),
    Range {
        min: Option<usize>,
        max: Option<usize>,
    },
}

/// Builds a [`Pool`], validating the exclusive pool-sizing forms from spec §6 at build time
/// rather than at first use.
pub struct PoolBuilder<H: TaskHandler> {
    worker_factory: Option<Arc<dyn Fn() -> H + Send + Sync>>,
    sizing: SizingMode,
    use_priority_task_queue: bool,
    auto_shrink_interval: Duration,
}

impl<H: TaskHandler> std::fmt::Debug for PoolBuilder<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolBuilder")
            .field("use_priority_task_queue", &self.use_priority_task_queue)
            .field("auto_shrink_interval", &self.auto_shrink_interval)
            .finish_non_exhaustive()
    }
}

impl<H: TaskHandler> Default for PoolBuilder<H> {
    fn default() -> Self {
        Self {
            worker_factory: None,
            sizing: SizingMode::Unset,
            use_priority_task_queue: false,
            auto_shrink_interval: DEFAULT_AUTO_SHRINK_INTERVAL,
        }
    }
}

impl<H: TaskHandler> PoolBuilder<H> {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Installs the closure `WorkerLifecycle` uses to spin up a worker thread; the crate's
    /// substitute for spec §6's `workerPath`/`workerOptions`, since a Rust worker is a
    /// closure/function rather than a script path (SPEC_FULL.md §6).
    #[must_use]
    pub fn worker_factory(mut self, factory: impl Fn() -> H + Send + Sync + 'static) -> Self {
        self.worker_factory = Some(Arc::new(factory));
        self
    }

    /// Sets `{minPoolSize: n, maxPoolSize: n}` with autoscaling inert, exclusive with
    /// [`min_pool_size`][Self::min_pool_size]/[`max_pool_size`][Self::max_pool_size].
    #[must_use]
    pub fn pool_size(mut self, size: usize) -> Self {
        self.sizing = SizingMode::Fixed(size);
        self
    }

    /// Sets the autoscaling floor, exclusive with [`pool_size`][Self::pool_size].
    #[must_use]
    pub fn min_pool_size(mut self, size: usize) -> Self {
        self.sizing = match self.sizing {
            SizingMode::Range { max, .. } => SizingMode::Range {
                min: Some(size),
                max,
            },
            _ => SizingMode::Range {
                min: Some(size),
                max: None,
            },
        };
        self
    }

    /// Sets the autoscaling ceiling, exclusive with [`pool_size`][Self::pool_size].
    #[must_use]
    pub fn max_pool_size(mut self, size: usize) -> Self {
        self.sizing = match self.sizing {
            SizingMode::Range { min, .. } => SizingMode::Range {
                min,
                max: Some(size),
            },
            _ => SizingMode::Range {
                min: None,
                max: Some(size),
            },
        };
        self
    }

    /// Defaults to `false`: dispatch order is FIFO submission order. When `true`, the wait list
    /// is a min-heap keyed by `Task::priority` (spec §4.3).
    #[must_use]
    pub fn use_priority_task_queue(mut self, enabled: bool) -> Self {
        self.use_priority_task_queue = enabled;
        self
    }

    /// Defaults to 5 minutes (spec §6, `autoShrinkIntervalTime`).
    #[must_use]
    pub fn auto_shrink_interval(mut self, interval: Duration) -> Self {
        self.auto_shrink_interval = interval;
        self
    }

    /// Validates the configuration and starts the pool's control thread.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Programming`] for an impossible configuration: no worker factory, both
    /// `pool_size` and `min_pool_size`/`max_pool_size` unset, `pool_size == 0`, or
    /// `min_pool_size > max_pool_size` (spec §6, SPEC_FULL.md §9).
    pub fn build(self) -> Result<Pool<H>> {
        let worker_factory = self.worker_factory.ok_or_else(|| {
            Error::Programming("PoolBuilder requires a worker_factory".to_owned())
        })?;

        let (min_pool_size, max_pool_size) = match self.sizing {
            SizingMode::Unset => {
                return Err(Error::Programming(
                    "PoolBuilder requires either pool_size or min_pool_size/max_pool_size"
                        .to_owned(),
                ));
            }
            SizingMode::Fixed(size) => {
                if size == 0 {
                    return Err(Error::Programming("pool_size must be at least 1".to_owned()));
                }
                (size, size)
            }
            SizingMode::Range { min, max } => {
                let min = min.unwrap_or(0);
                let max = max.ok_or_else(|| {
                    Error::Programming("min_pool_size requires max_pool_size".to_owned())
                })?;
                if max == 0 {
                    return Err(Error::Programming(
                        "max_pool_size must be at least 1".to_owned(),
                    ));
                }
                if min > max {
                    return Err(Error::Programming(format!(
                        "min_pool_size ({min}) must not exceed max_pool_size ({max})"
                    )));
                }
                (min, max)
            }
        };

        Ok(Pool::start(
            worker_factory,
            min_pool_size,
            max_pool_size,
            self.use_priority_task_queue,
            self.auto_shrink_interval,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worker::WorkerContext;

    struct Noop;
    impl TaskHandler for Noop {
        type Data = ();
        type Output = ();

        fn handle(
            &mut self,
            _task_type: &str,
            _data: (),
            _ctx: &WorkerContext<Self>,
        ) -> Result<(), String> {
            Ok(())
        }
    }

    #[test]
    fn rejects_zero_pool_size() {
        let result = PoolBuilder::<Noop>::new()
            .worker_factory(|| Noop)
            .pool_size(0)
            .build();
        assert!(matches!(result, Err(Error::Programming(_))));
    }

    #[test]
    fn rejects_inverted_min_max() {
        let result = PoolBuilder::<Noop>::new()
            .worker_factory(|| Noop)
            .min_pool_size(4)
            .max_pool_size(2)
            .build();
        assert!(matches!(result, Err(Error::Programming(_))));
    }

    #[test]
    fn rejects_missing_sizing() {
        let result = PoolBuilder::<Noop>::new().worker_factory(|| Noop).build();
        assert!(matches!(result, Err(Error::Programming(_))));
    }

    #[test]
    fn rejects_missing_worker_factory() {
        let result = PoolBuilder::<Noop>::new().pool_size(1).build();
        assert!(matches!(result, Err(Error::Programming(_))));
    }

    #[test]
    fn accepts_valid_fixed_size() {
        let pool = PoolBuilder::<Noop>::new()
            .worker_factory(|| Noop)
            .pool_size(2)
            .build()
            .unwrap();
        pool.close().unwrap();
    }
}
