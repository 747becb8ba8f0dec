// Copyright (c) The isopool Authors.
// Licensed under the MIT License.

// The pool control core (spec §4.1-§4.7): the coordinator tying the queue, registry, and worker
// lifecycle together. Realized as a single dedicated OS thread (the "control thread", spec §5)
// that owns every index in §3 and processes a private channel of internal events exactly as
// spec §9's design notes suggest (`Submit`, `WorkerResult`/`WorkerEvent`/`WorkerCrash` folded into
// one `Worker` variant, `Acquire`, `Release`, `Close`, `ShrinkTick`). No index is ever touched
// from any other thread.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use tracing::{debug, warn};

use crate::abort::{AbortSignal, SubscriptionId};
use crate::containers::{PriorityQueue, Queue, RingBuffer};
use crate::error::{Error, Result};
use crate::ids::{IdAllocator, TaskId, WorkerId};
use crate::protocol::{Task, TaskHandle, WorkerCommand, WorkerMessage};
use crate::registry::{TaskRecord, TaskRegistry};
use crate::stats::Stats;
use crate::worker::{self, TaskHandler, WorkerThread};
use crate::WorkerHandle;

/// Internal events the control thread processes, one at a time, in arrival order (spec §5: "a
/// channel of internal events").
pub(crate) enum ControlEvent<H: TaskHandler> {
    Submit(SubmitRequest<H>),
    Acquire(oneshot::Sender<Result<WorkerHandle>>),
    Release(WorkerId),
    Abort(TaskId),
    Worker(WorkerMessage<H::Output>),
    Close(oneshot::Sender<()>),
    ShrinkTick,
    Stats(oneshot::Sender<Stats>),
    WaitAvailable(oneshot::Sender<Result<()>>),
}

pub(crate) struct SubmitRequest<H: TaskHandler> {
    task_id: TaskId,
    task_type: String,
    data: H::Data,
    priority: i64,
    abort_signal: Option<AbortSignal>,
    subscription: Option<SubscriptionId>,
    on_event: Option<Box<dyn FnMut(String, String) + Send>>,
    completion: oneshot::Sender<Result<H::Output>>,
    target_worker: Option<WorkerId>,
}

struct QueuedTask<H: TaskHandler> {
    task_id: TaskId,
    task_type: String,
    data: H::Data,
    priority: i64,
}

fn queued_task_priority<H: TaskHandler>(task: &QueuedTask<H>) -> i64 {
    task.priority
}

/// The FIFO-or-priority wait list named `taskQueue` in spec §3, chosen at construction (spec
/// §4.3).
enum WaitList<H: TaskHandler> {
    Fifo(Queue<QueuedTask<H>>),
    Priority(PriorityQueue<QueuedTask<H>, fn(&QueuedTask<H>) -> i64>),
}

impl<H: TaskHandler> WaitList<H> {
    fn new(use_priority: bool) -> Self {
        if use_priority {
            let key: fn(&QueuedTask<H>) -> i64 = queued_task_priority::<H>;
            Self::Priority(PriorityQueue::new(key))
        } else {
            Self::Fifo(Queue::new())
        }
    }

    fn push(&mut self, task: QueuedTask<H>) {
        match self {
            Self::Fifo(q) => q.push(task),
            Self::Priority(q) => q.push(task),
        }
    }

    fn pop(&mut self) -> Option<QueuedTask<H>> {
        match self {
            Self::Fifo(q) => q.pop(),
            Self::Priority(q) => q.pop(),
        }
    }

    fn len(&self) -> usize {
        match self {
            Self::Fifo(q) => q.len(),
            Self::Priority(q) => q.len(),
        }
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn clear(&mut self) -> Vec<QueuedTask<H>> {
        match self {
            Self::Fifo(q) => q.clear(),
            Self::Priority(q) => q.clear(),
        }
    }
}

/// All state the control thread owns exclusively (spec §3's index table).
struct ControlState<H: TaskHandler> {
    worker_factory: Arc<dyn Fn() -> H + Send + Sync>,
    min_pool_size: usize,
    max_pool_size: usize,
    ids: IdAllocator,
    control_tx: mpsc::Sender<ControlEvent<H>>,

    workers: HashMap<WorkerId, WorkerThread<H>>,
    idle_workers: RingBuffer<WorkerId>,
    acquired_workers: HashSet<WorkerId>,
    running_task_by_worker: HashMap<WorkerId, TaskId>,
    running_tasks: HashSet<TaskId>,
    task_queue: WaitList<H>,
    task_registry: TaskRegistry<H::Output>,
    acquiring_worker_resolvers: VecDeque<oneshot::Sender<Result<WorkerHandle>>>,
    available_resource_resolvers: VecDeque<oneshot::Sender<Result<()>>>,
    replacing_crashed_workers: HashSet<WorkerId>,

    closed: bool,
    closed_flag: Arc<AtomicBool>,
}

impl<H: TaskHandler> ControlState<H> {
    fn new(
        worker_factory: Arc<dyn Fn() -> H + Send + Sync>,
        min_pool_size: usize,
        max_pool_size: usize,
        use_priority_task_queue: bool,
        control_tx: mpsc::Sender<ControlEvent<H>>,
        closed_flag: Arc<AtomicBool>,
    ) -> Self {
        Self {
            worker_factory,
            min_pool_size,
            max_pool_size,
            ids: IdAllocator::default(),
            control_tx,
            workers: HashMap::new(),
            idle_workers: RingBuffer::new(max_pool_size),
            acquired_workers: HashSet::new(),
            running_task_by_worker: HashMap::new(),
            running_tasks: HashSet::new(),
            task_queue: WaitList::new(use_priority_task_queue),
            task_registry: TaskRegistry::new(),
            acquiring_worker_resolvers: VecDeque::new(),
            available_resource_resolvers: VecDeque::new(),
            replacing_crashed_workers: HashSet::new(),
            closed: false,
            closed_flag,
        }
    }

    fn spawn_worker(&mut self) -> WorkerId {
        let id = self.ids.next_worker_id();
        let worker = worker::spawn(id, self.worker_factory.as_ref(), self.control_tx.clone());
        self.workers.insert(id, worker);
        id
    }

    /// Dispatches `task_id` to `worker_id` (spec §4.1, "Dispatch rule").
    fn dispatch_now(&mut self, worker_id: WorkerId, task_id: TaskId, task_type: String, data: H::Data) {
        let Some(record) = self.task_registry.get_mut(task_id) else {
            // Deregistered (aborted) between being chosen and being dispatched; drop silently.
            return;
        };
        let abort_flag = Arc::clone(&record.abort_flag);

        self.running_task_by_worker.insert(worker_id, task_id);
        self.running_tasks.insert(task_id);

        let command = WorkerCommand {
            task_id,
            task_type,
            data,
            abort_flag,
        };

        let Some(worker) = self.workers.get(&worker_id) else {
            self.fail_dispatch(worker_id, task_id, "target worker no longer exists".to_owned());
            return;
        };

        match worker.dispatch(command) {
            Ok(()) => {
                debug!(worker = %worker_id, task = %task_id, "dispatched task to worker");
                if let Some(record) = self.task_registry.get_mut(task_id) {
                    invoke_on_event(record, "sent to worker".to_owned(), String::new());
                }
            }
            Err(_command) => {
                self.fail_dispatch(worker_id, task_id, "worker command channel is closed".to_owned());
            }
        }
    }

    /// Spec §7, `DispatchFailure`: "posting the TASK message failed synchronously. A task fails
    /// with the underlying cause and the worker returns to idle."
    fn fail_dispatch(&mut self, worker_id: WorkerId, task_id: TaskId, reason: String) {
        self.running_task_by_worker.remove(&worker_id);
        self.running_tasks.remove(&task_id);
        self.task_registry
            .finish(task_id, Err(Error::DispatchFailure(reason)));
        if self.workers.contains_key(&worker_id) {
            let _ = self.idle_workers.push(worker_id);
        }
    }

    fn handle_submit(&mut self, req: SubmitRequest<H>) {
        if self.closed {
            let _ = req.completion.send(Err(Error::PoolClosed));
            return;
        }

        if self.task_registry.contains(req.task_id) {
            // spec §4.1: "idempotence on re-submission" — not reachable from the public API
            // (each call mints a fresh TaskId), kept defensive for internal requeue per spec §9.
            let _ = req.completion.send(Err(Error::Programming(
                "task id already registered".to_owned(),
            )));
            return;
        }

        let already_aborted = req.abort_signal.as_ref().is_some_and(AbortSignal::aborted);

        let mut record = TaskRecord::new(req.completion, req.abort_signal, req.priority, req.on_event);
        record.set_subscription(req.subscription);
        self.task_registry.insert(req.task_id, record);

        // Closes the race between the pre-dispatch fast path in `submit` (checked before the
        // abort subscription existed) and `AbortController::abort()` firing after the
        // subscription was recorded but before this `Submit` event was drained: the resulting
        // `Abort` event can arrive first and find nothing registered yet, so re-check here before
        // ever handing the task to a worker (spec §4.4: abort monotonicity).
        if already_aborted {
            self.task_registry.finish(req.task_id, Err(Error::Aborted));
            return;
        }

        if let Some(worker_id) = req.target_worker {
            self.dispatch_now(worker_id, req.task_id, req.task_type, req.data);
        } else if let Some(worker_id) = self.idle_workers.pop() {
            self.dispatch_now(worker_id, req.task_id, req.task_type, req.data);
        } else {
            self.task_queue.push(QueuedTask {
                task_id: req.task_id,
                task_type: req.task_type,
                data: req.data,
                priority: req.priority,
            });
            self.auto_grow();
        }
    }

    fn handle_acquire(&mut self, resolver: oneshot::Sender<Result<WorkerHandle>>) {
        if self.closed {
            let _ = resolver.send(Err(Error::PoolClosed));
            return;
        }
        if let Some(worker_id) = self.idle_workers.pop() {
            self.acquired_workers.insert(worker_id);
            let _ = resolver.send(Ok(WorkerHandle { id: worker_id }));
            return;
        }
        self.acquiring_worker_resolvers.push_back(resolver);
        self.auto_grow();
    }

    fn handle_release(&mut self, worker_id: WorkerId) {
        if self.closed {
            if let Some(worker) = self.workers.remove(&worker_id) {
                self.acquired_workers.remove(&worker_id);
                worker.shut_down();
            }
            return;
        }
        if !self.acquired_workers.remove(&worker_id) {
            return; // spec §4.1: "if the worker is not in acquiredWorkers, ignore"
        }
        self.worker_became_idle(worker_id);
    }

    fn handle_abort(&mut self, task_id: TaskId) {
        let Some(record) = self.task_registry.get_mut(task_id) else {
            return; // already terminal
        };
        record.abort_flag.store(true, Ordering::SeqCst);
        self.running_tasks.remove(&task_id);
        // Note: `running_task_by_worker` is left untouched if this task is dispatched — the
        // worker thread is still physically busy until its RESULT/crash message arrives (spec
        // §4.5: "exactly one TASK outstanding per worker"); `handle_worker_result` reclaims the
        // worker then, ignoring the late message per spec §4.4 item 3.
        self.task_registry.finish(task_id, Err(Error::Aborted));
    }

    fn handle_worker_message(&mut self, message: WorkerMessage<H::Output>) {
        match message {
            WorkerMessage::Result {
                worker_id,
                task_id,
                outcome,
            } => self.handle_worker_result(worker_id, task_id, outcome),
            WorkerMessage::Event {
                task_id,
                event,
                data,
            } => self.handle_worker_event(task_id, event, data),
            WorkerMessage::Crashed {
                worker_id,
                task_id,
                error,
            } => self.handle_worker_crashed(worker_id, task_id, error),
        }
    }

    fn handle_worker_result(
        &mut self,
        worker_id: WorkerId,
        task_id: TaskId,
        outcome: std::result::Result<H::Output, String>,
    ) {
        self.running_task_by_worker.remove(&worker_id);

        if self.task_registry.contains(task_id) {
            self.running_tasks.remove(&task_id);
            self.task_registry
                .finish(task_id, outcome.map_err(Error::UserTaskFailure));
        }
        // else: late message racing an abort or a close (spec §4.4 item 3) — ignored.

        if self.acquired_workers.contains(&worker_id) {
            return; // spec §4.5: "trigger the worker became idle path (unless worker is acquired)"
        }
        if self.workers.contains_key(&worker_id) {
            self.worker_became_idle(worker_id);
        }
    }

    fn handle_worker_event(&mut self, task_id: TaskId, event: String, data: String) {
        if let Some(record) = self.task_registry.get_mut(task_id) {
            invoke_on_event(record, event, data);
        }
        // else: task already terminal (aborted/closed); spec §4.5 says do not alter worker state
        // and the event is simply moot once there is nowhere to deliver it.
    }

    fn handle_worker_crashed(&mut self, worker_id: WorkerId, task_id: Option<TaskId>, error: String) {
        warn!(worker = %worker_id, error = %error, "worker crashed; scheduling replacement");

        self.running_task_by_worker.remove(&worker_id);
        self.acquired_workers.remove(&worker_id);
        self.idle_workers.retain(|w| *w != worker_id);
        self.workers.remove(&worker_id);

        if let Some(task_id) = task_id {
            self.running_tasks.remove(&task_id);
            if self.task_registry.contains(task_id) {
                self.task_registry
                    .finish(task_id, Err(Error::WorkerCrash(error)));
            }
        }

        if self.closed {
            return;
        }

        self.replacing_crashed_workers.insert(worker_id);
        let replacement = self.spawn_worker();
        self.replacing_crashed_workers.remove(&worker_id);
        self.worker_became_idle(replacement);
    }

    fn handle_close(&mut self, ack: oneshot::Sender<()>) {
        if self.closed {
            let _ = ack.send(());
            return;
        }
        self.closed = true;
        self.closed_flag.store(true, Ordering::SeqCst);

        self.task_registry.close_all();
        self.task_queue.clear();
        self.running_tasks.clear();
        self.running_task_by_worker.clear();

        while let Some(resolver) = self.acquiring_worker_resolvers.pop_front() {
            let _ = resolver.send(Err(Error::PoolClosed));
        }
        while let Some(resolver) = self.available_resource_resolvers.pop_front() {
            let _ = resolver.send(Err(Error::PoolClosed));
        }

        let worker_ids: Vec<WorkerId> = self.workers.keys().copied().collect();
        for id in worker_ids {
            if let Some(worker) = self.workers.remove(&id) {
                worker.shut_down();
            }
        }
        self.idle_workers = RingBuffer::new(self.max_pool_size);
        self.acquired_workers.clear();

        let _ = ack.send(());
    }

    fn handle_shrink_tick(&mut self) {
        if self.closed || !self.replacing_crashed_workers.is_empty() {
            return;
        }
        if self.task_queue.is_empty()
            && self.workers.len() > self.min_pool_size
            && self.idle_workers.len() > 1
        {
            if let Some(worker_id) = self.idle_workers.pop() {
                if let Some(worker) = self.workers.remove(&worker_id) {
                    debug!(worker = %worker_id, "auto-shrink: removing idle worker");
                    worker.shut_down();
                }
            }
        }
    }

    fn handle_wait_available(&mut self, resolver: oneshot::Sender<Result<()>>) {
        if self.closed {
            let _ = resolver.send(Err(Error::PoolClosed));
            return;
        }
        if !self.idle_workers.is_empty() && self.task_queue.is_empty() {
            let _ = resolver.send(Ok(()));
            return;
        }
        self.available_resource_resolvers.push_back(resolver);
    }

    fn snapshot_stats(&self) -> Stats {
        Stats {
            available_workers: self.workers.len(),
            workers: self.workers.len(),
            idle_workers: self.idle_workers.len(),
            acquired_workers: self.acquired_workers.len(),
            running_tasks: self.running_tasks.len(),
            queued_tasks: self.task_queue.len(),
            closed: self.closed,
        }
    }

    /// The "worker became idle" policy (spec §4.2): non-suspending, runs atomically on the
    /// control thread. Acquire waiters outrank queued tasks, which outrank idle announcements —
    /// "dedicated use has been requested explicitly, so it outranks speculative queued work."
    fn worker_became_idle(&mut self, worker_id: WorkerId) {
        if self.closed {
            return;
        }

        if let Some(resolver) = self.acquiring_worker_resolvers.pop_front() {
            self.acquired_workers.insert(worker_id);
            let _ = resolver.send(Ok(WorkerHandle { id: worker_id }));
            return;
        }

        if self.idle_workers.push(worker_id).is_err() {
            warn!(worker = %worker_id, "idle ring unexpectedly at capacity");
            return;
        }

        loop {
            let Some(queued) = self.task_queue.pop() else {
                break;
            };
            if !self.task_registry.contains(queued.task_id) {
                continue; // tombstone: aborted/deregistered while queued (spec §4.4 item 1)
            }
            if let Some(w) = self.idle_workers.pop() {
                self.dispatch_now(w, queued.task_id, queued.task_type, queued.data);
            }
            break;
        }

        if !self.idle_workers.is_empty() {
            if let Some(resolver) = self.available_resource_resolvers.pop_front() {
                let _ = resolver.send(Ok(()));
            }
        }
    }

    /// Auto-grow (spec §4.6): spawns at most one worker per invocation when the caller just had
    /// to wait, no crash replacement is in flight, and there is room to grow.
    fn auto_grow(&mut self) {
        if self.closed || !self.replacing_crashed_workers.is_empty() {
            return;
        }
        if self.workers.len() >= self.max_pool_size || !self.idle_workers.is_empty() {
            return;
        }
        debug!(workers = self.workers.len(), "auto-grow: spawning a worker");
        let id = self.spawn_worker();
        self.worker_became_idle(id);
    }
}

fn invoke_on_event<T>(record: &mut TaskRecord<T>, event: String, data: String) {
    if let Some(callback) = record.on_event.as_mut() {
        let outcome =
            std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| callback(event, data)));
        if let Err(panic) = outcome {
            warn!(error = %worker::panic_message(&panic), "on_event callback panicked");
        }
    }
}

fn control_loop<H: TaskHandler>(mut state: ControlState<H>, rx: mpsc::Receiver<ControlEvent<H>>) {
    for event in rx {
        match event {
            ControlEvent::Submit(req) => state.handle_submit(req),
            ControlEvent::Acquire(resolver) => state.handle_acquire(resolver),
            ControlEvent::Release(worker_id) => state.handle_release(worker_id),
            ControlEvent::Abort(task_id) => state.handle_abort(task_id),
            ControlEvent::Worker(message) => state.handle_worker_message(message),
            ControlEvent::Close(ack) => {
                state.handle_close(ack);
                break;
            }
            ControlEvent::ShrinkTick => state.handle_shrink_tick(),
            ControlEvent::Stats(resolver) => {
                let _ = resolver.send(state.snapshot_stats());
            }
            ControlEvent::WaitAvailable(resolver) => state.handle_wait_available(resolver),
        }
    }
}

/// A cancellable sleep used by the auto-shrink timer so `close()` does not have to wait out a
/// full `auto_shrink_interval` before the background thread notices and exits.
#[derive(Default)]
struct ShrinkStop {
    stopped: Mutex<bool>,
    condvar: Condvar,
}

impl ShrinkStop {
    fn wait(&self, timeout: Duration) -> bool {
        let guard = self.stopped.lock().expect("shrink-stop mutex poisoned");
        let (guard, _) = self
            .condvar
            .wait_timeout_while(guard, timeout, |stopped| !*stopped)
            .expect("shrink-stop mutex poisoned");
        *guard
    }

    fn stop(&self) {
        *self.stopped.lock().expect("shrink-stop mutex poisoned") = true;
        self.condvar.notify_all();
    }
}

/// A pool of isolated worker threads (spec §1-§9). Construct with [`Pool::builder`].
pub struct Pool<H: TaskHandler> {
    control_tx: mpsc::Sender<ControlEvent<H>>,
    closed: Arc<AtomicBool>,
    ids: IdAllocator,
    control_thread: Option<thread::JoinHandle<()>>,
    shrink_thread: Option<thread::JoinHandle<()>>,
    shrink_stop: Arc<ShrinkStop>,
}

impl<H: TaskHandler> Pool<H> {
    /// Starts building a new pool.
    #[must_use]
    pub fn builder() -> crate::PoolBuilder<H> {
        crate::PoolBuilder::new()
    }

    pub(crate) fn start(
        worker_factory: Arc<dyn Fn() -> H + Send + Sync>,
        min_pool_size: usize,
        max_pool_size: usize,
        use_priority_task_queue: bool,
        auto_shrink_interval: Duration,
    ) -> Self {
        let (control_tx, control_rx) = mpsc::channel();
        let closed = Arc::new(AtomicBool::new(false));

        let mut state = ControlState::new(
            worker_factory,
            min_pool_size,
            max_pool_size,
            use_priority_task_queue,
            control_tx.clone(),
            Arc::clone(&closed),
        );
        for _ in 0..min_pool_size {
            let id = state.spawn_worker();
            state.worker_became_idle(id);
        }

        let control_thread = thread::Builder::new()
            .name("isopool-control".to_owned())
            .spawn(move || control_loop(state, control_rx))
            .expect("spawning the control thread should not fail under normal operation");

        let shrink_stop = Arc::new(ShrinkStop::default());
        let shrink_thread = {
            let control_tx = control_tx.clone();
            let shrink_stop = Arc::clone(&shrink_stop);
            thread::Builder::new()
                .name("isopool-autoshrink".to_owned())
                .spawn(move || {
                    loop {
                        let stopped = shrink_stop.wait(auto_shrink_interval);
                        if stopped {
                            break;
                        }
                        if control_tx.send(ControlEvent::ShrinkTick).is_err() {
                            break;
                        }
                    }
                })
                .expect("spawning the auto-shrink thread should not fail under normal operation")
        };

        Self {
            control_tx,
            closed,
            ids: IdAllocator::default(),
            control_thread: Some(control_thread),
            shrink_thread: Some(shrink_thread),
            shrink_stop,
        }
    }

    /// Submits `task` for dispatch to any idle worker, or enqueues it if none is available (spec
    /// §4.1, `runTask`).
    pub fn run_task(&self, task: Task<H::Data>) -> TaskHandle<H::Output> {
        self.submit(task, None)
    }

    /// Submits `task` to run specifically on `worker`, which must have been obtained from
    /// [`acquire_worker`][Self::acquire_worker] (spec §4.1: "runTask(task, acquiredWorker?)").
    pub fn run_task_on(&self, worker: &WorkerHandle, task: Task<H::Data>) -> TaskHandle<H::Output> {
        self.submit(task, Some(worker.id()))
    }

    fn submit(&self, task: Task<H::Data>, target_worker: Option<WorkerId>) -> TaskHandle<H::Output> {
        let (completion_tx, completion_rx) = oneshot::channel();
        let task_id = self.ids.next_task_id();

        if self.closed.load(Ordering::Acquire) {
            let _ = completion_tx.send(Err(Error::PoolClosed));
            return TaskHandle {
                id: task_id,
                rx: completion_rx,
            };
        }

        if task.abort_signal.as_ref().is_some_and(AbortSignal::aborted) {
            let _ = completion_tx.send(Err(Error::Aborted));
            return TaskHandle {
                id: task_id,
                rx: completion_rx,
            };
        }

        let abort_signal = task.abort_signal.clone();
        let subscription = abort_signal.as_ref().and_then(|signal| {
            let control_tx = self.control_tx.clone();
            signal.on_abort(move || {
                let _ = control_tx.send(ControlEvent::Abort(task_id));
            })
        });

        let request = SubmitRequest {
            task_id,
            task_type: task.task_type,
            data: task.data,
            priority: task.priority,
            abort_signal,
            subscription,
            on_event: task.on_event,
            completion: completion_tx,
            target_worker,
        };

        if let Err(mpsc::SendError(ControlEvent::Submit(req))) =
            self.control_tx.send(ControlEvent::Submit(request))
        {
            let _ = req.completion.send(Err(Error::PoolClosed));
        }

        TaskHandle {
            id: task_id,
            rx: completion_rx,
        }
    }

    /// Reserves a worker for exclusive caller use, blocking until one is available (spec §4.1,
    /// `acquireWorker`).
    ///
    /// # Errors
    ///
    /// Returns [`Error::PoolClosed`] if the pool is, or becomes, closed before a worker is handed
    /// over.
    pub fn acquire_worker(&self) -> Result<WorkerHandle> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::PoolClosed);
        }
        let (tx, rx) = oneshot::channel();
        if self.control_tx.send(ControlEvent::Acquire(tx)).is_err() {
            return Err(Error::PoolClosed);
        }
        rx.recv().unwrap_or(Err(Error::PoolClosed))
    }

    /// Returns a previously acquired worker to the pool (spec §4.1, `releaseWorker`).
    pub fn release_worker(&self, worker: WorkerHandle) {
        let _ = self.control_tx.send(ControlEvent::Release(worker.id()));
    }

    /// A consistent snapshot of the pool's indices (spec §4.1, `stats()`).
    ///
    /// # Errors
    ///
    /// Returns [`Error::PoolClosed`] if the control thread has already exited.
    pub fn stats(&self) -> Result<Stats> {
        let (tx, rx) = oneshot::channel();
        if self.control_tx.send(ControlEvent::Stats(tx)).is_err() {
            return Err(Error::PoolClosed);
        }
        rx.recv()
            .map_err(|_| Error::Programming("stats resolver was dropped".to_owned()))
    }

    /// Blocks until at least one worker is idle and the next `run_task` would dispatch
    /// immediately (spec §4.1, `waitForAvailableResource`). Waiters are resolved strictly in
    /// FIFO order and resolving one does not cascade to the next.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PoolClosed`] if the pool is, or becomes, closed before this waiter is
    /// resolved.
    pub fn wait_for_available_resource(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::PoolClosed);
        }
        let (tx, rx) = oneshot::channel();
        if self.control_tx.send(ControlEvent::WaitAvailable(tx)).is_err() {
            return Err(Error::PoolClosed);
        }
        rx.recv().unwrap_or(Err(Error::PoolClosed))
    }

    /// Idempotently closes the pool: rejects every registered task with
    /// [`Error::PoolClosed`][crate::Error::PoolClosed], terminates every worker, rejects pending
    /// acquire/available-resource waiters, and stops the auto-shrink timer (spec §4.1, `close()`).
    pub fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        self.shrink_stop.stop();

        let (tx, rx) = oneshot::channel();
        if self.control_tx.send(ControlEvent::Close(tx)).is_ok() {
            let _ = rx.recv();
        }
        Ok(())
    }
}

impl<H: TaskHandler> Drop for Pool<H> {
    fn drop(&mut self) {
        let _ = self.close();
        if let Some(handle) = self.control_thread.take() {
            let _ = handle.join();
        }
        if let Some(handle) = self.shrink_thread.take() {
            let _ = handle.join();
        }
    }
}

impl<H: TaskHandler> std::fmt::Debug for Pool<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pool")
            .field("closed", &self.closed.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}
