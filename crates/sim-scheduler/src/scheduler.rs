//! Priority scheduler over a fixed pool of cores.
//!
//! The queue, the task table and the core-slot table share one lock, held
//! only while they are read or mutated and never while a core executes.
//! A single loop thread runs dispatch passes; it sleeps until a submission
//! or a completion wakes it, or until the tick interval elapses.

use std::any::Any;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::Sender;
use parking_lot::{Condvar, Mutex};
use sim_core::{Core, LoadError, Program};

use crate::worker::{self, Job};
use crate::{
    Priority, SchedulerConfig, SchedulerError, TaskId, TaskQueue, TaskRecord, TaskResult,
    TaskState,
};

/// Occupancy of one core slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum CoreState {
    /// Available for dispatch.
    Idle,
    /// Running the given task.
    Busy(TaskId),
    /// Its worker is gone; never dispatched to again.
    Offline,
}

/// One task-to-core binding made by a dispatch pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Dispatch {
    /// Dispatched task.
    pub task: TaskId,
    /// Pool index of the core it was bound to.
    pub core: usize,
}

#[derive(Debug)]
struct SharedState {
    queue: TaskQueue,
    tasks: HashMap<TaskId, TaskRecord>,
    slots: Vec<CoreState>,
    senders: Vec<Sender<Job>>,
    next_id: u64,
    wake_pending: bool,
    stopped: bool,
}

impl SharedState {
    fn is_idle(&self) -> bool {
        self.queue.is_empty()
            && !self
                .slots
                .iter()
                .any(|slot| matches!(slot, CoreState::Busy(_)))
    }
}

/// State shared between the scheduler handle, its loop, and core workers.
#[derive(Debug)]
pub(crate) struct Shared {
    state: Mutex<SharedState>,
    wake: Condvar,
    settled: Condvar,
    keep_running: AtomicBool,
}

impl Shared {
    fn new(cores: usize) -> Self {
        Self {
            state: Mutex::new(SharedState {
                queue: TaskQueue::new(),
                tasks: HashMap::new(),
                slots: vec![CoreState::Idle; cores],
                senders: Vec::with_capacity(cores),
                next_id: 0,
                wake_pending: false,
                stopped: false,
            }),
            wake: Condvar::new(),
            settled: Condvar::new(),
            keep_running: AtomicBool::new(false),
        }
    }

    fn tick(&self) -> Vec<Dispatch> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        if state.stopped {
            return Vec::new();
        }

        let mut dispatched = Vec::new();
        for index in 0..state.slots.len() {
            if state.slots[index] != CoreState::Idle {
                continue;
            }
            let Ok((id, position)) = state.queue.take_next_with_position() else {
                break;
            };
            let Some(record) = state.tasks.get_mut(&id) else {
                continue;
            };

            let job = Job {
                id,
                program: record.program.clone(),
            };
            let sent = state
                .senders
                .get(index)
                .is_some_and(|sender| sender.try_send(job).is_ok());
            if sent {
                tracing::debug!(core = index, task = %id, priority = record.priority, "dispatched");
                record.state = TaskState::Running;
                record.core = Some(index);
                state.slots[index] = CoreState::Busy(id);
                dispatched.push(Dispatch {
                    task: id,
                    core: index,
                });
            } else {
                tracing::warn!(core = index, task = %id, "core worker unavailable; taking core offline");
                state.slots[index] = CoreState::Offline;
                state.queue.requeue(id, position);
            }
        }

        for (id, _) in state.queue.iter() {
            if let Some(record) = state.tasks.get_mut(&id) {
                record.state = TaskState::Waiting;
            }
        }
        dispatched
    }

    fn run_loop(&self, interval: Duration) {
        tracing::debug!(?interval, "scheduler loop running");
        while self.keep_running.load(Ordering::Acquire) {
            self.tick();
            let mut state = self.state.lock();
            if !state.wake_pending && self.keep_running.load(Ordering::Acquire) {
                self.wake.wait_for(&mut state, interval);
            }
            state.wake_pending = false;
        }
        tracing::debug!("scheduler loop exiting");
    }

    pub(crate) fn complete(&self, core: usize, id: TaskId, result: Option<TaskResult>) {
        {
            let mut state = self.state.lock();
            if let Some(slot) = state.slots.get_mut(core) {
                *slot = CoreState::Idle;
            }
            if let Some(record) = state.tasks.get_mut(&id) {
                record.state = result
                    .as_ref()
                    .map_or(TaskState::FinishedWithError, TaskResult::state);
                match &result {
                    Some(result) => tracing::info!(
                        core,
                        task = %id,
                        state = %record.state,
                        steps = result.steps,
                        exit = ?result.exit,
                        "task finished"
                    ),
                    None => tracing::info!(core, task = %id, state = %record.state, "task finished"),
                }
                record.result = result;
            }
            state.wake_pending = true;
        }
        self.wake.notify_one();
        self.settled.notify_all();
    }
}

/// Dispatches queued tasks to a fixed pool of cores.
///
/// Each core is driven by its own worker thread for the scheduler's whole
/// lifetime. Dispatched tasks run to completion; nothing is preempted.
#[derive(Debug)]
pub struct Scheduler {
    config: SchedulerConfig,
    shared: Arc<Shared>,
    workers: Vec<JoinHandle<Core>>,
    loop_handle: Option<JoinHandle<()>>,
    parked: Vec<Core>,
    stopped: bool,
}

impl Scheduler {
    /// Builds the core pool and spawns one worker per core. The scheduler
    /// loop does not run until [`Scheduler::start`].
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Spawn`] when a worker thread cannot be
    /// created; workers already spawned are shut down.
    pub fn new(config: SchedulerConfig) -> Result<Self, SchedulerError> {
        let count = config.core_count();
        let mut scheduler = Self {
            config,
            shared: Arc::new(Shared::new(count)),
            workers: Vec::with_capacity(count),
            loop_handle: None,
            parked: Vec::new(),
            stopped: false,
        };
        for index in 0..count {
            let core = Core::new(scheduler.config.core.clone());
            let (sender, handle) = worker::spawn(index, core, Arc::clone(&scheduler.shared))?;
            scheduler.shared.state.lock().senders.push(sender);
            scheduler.workers.push(handle);
        }
        Ok(scheduler)
    }

    /// Configuration the scheduler was built with.
    #[must_use]
    pub const fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Creates a task for `program` and queues it at `priority`.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Load`] when the program is longer than core
    /// memory (no task is created) and [`SchedulerError::Stopped`] after
    /// [`Scheduler::stop`].
    pub fn submit_task(&self, program: Program, priority: Priority) -> Result<TaskId, SchedulerError> {
        let capacity = self.config.core.memory_cells;
        if program.len() > capacity {
            return Err(LoadError::ProgramTooLarge {
                len: program.len(),
                capacity,
            }
            .into());
        }

        let id = {
            let mut state = self.shared.state.lock();
            if state.stopped {
                return Err(SchedulerError::Stopped);
            }
            state.next_id += 1;
            let id = TaskId::new(state.next_id);
            state.tasks.insert(id, TaskRecord::new(id, program, priority));
            state.queue.submit(id, priority);
            state.wake_pending = true;
            id
        };
        self.shared.wake.notify_one();
        tracing::debug!(task = %id, priority, "task submitted");
        Ok(id)
    }

    /// Runs one dispatch pass: each idle core, in pool order, receives the
    /// highest-priority queued task. Tasks left queued are marked waiting.
    pub fn tick(&self) -> Vec<Dispatch> {
        self.shared.tick()
    }

    /// Spawns the scheduler loop.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::AlreadyStarted`] if the loop is running,
    /// [`SchedulerError::Stopped`] after [`Scheduler::stop`], and
    /// [`SchedulerError::Spawn`] if the loop thread cannot be created.
    pub fn start(&mut self) -> Result<(), SchedulerError> {
        if self.stopped {
            return Err(SchedulerError::Stopped);
        }
        if self.loop_handle.is_some() {
            return Err(SchedulerError::AlreadyStarted);
        }

        self.shared.keep_running.store(true, Ordering::Release);
        let shared = Arc::clone(&self.shared);
        let interval = self.config.tick_interval;
        let spawned = thread::Builder::new()
            .name("sim-scheduler".to_string())
            .spawn(move || shared.run_loop(interval));
        match spawned {
            Ok(handle) => {
                self.loop_handle = Some(handle);
                tracing::info!(cores = self.config.core_count(), "scheduler started");
                Ok(())
            }
            Err(err) => {
                self.shared.keep_running.store(false, Ordering::Release);
                Err(err.into())
            }
        }
    }

    /// Stops the loop, lets every dispatched task finish, and joins all
    /// worker threads. The cores are kept for inspection via
    /// [`Scheduler::cores`]. Calling it again is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::WorkerPanicked`] if any thread panicked;
    /// every other thread is still joined.
    pub fn stop(&mut self) -> Result<(), SchedulerError> {
        if self.stopped {
            return Ok(());
        }
        self.stopped = true;

        self.shared.keep_running.store(false, Ordering::Release);
        {
            let mut state = self.shared.state.lock();
            state.stopped = true;
            state.wake_pending = true;
        }
        self.shared.wake.notify_all();

        let mut panics = Vec::new();
        if let Some(handle) = self.loop_handle.take() {
            if let Err(payload) = handle.join() {
                panics.push(panic_message(&*payload));
            }
        }

        self.shared.state.lock().senders.clear();
        for handle in self.workers.drain(..) {
            match handle.join() {
                Ok(core) => self.parked.push(core),
                Err(payload) => panics.push(panic_message(&*payload)),
            }
        }
        self.shared.settled.notify_all();
        tracing::info!(cores = self.parked.len(), "scheduler stopped");

        panics
            .into_iter()
            .next()
            .map_or(Ok(()), |message| Err(SchedulerError::WorkerPanicked(message)))
    }

    /// Returns true between [`Scheduler::start`] and [`Scheduler::stop`].
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.loop_handle.is_some() && !self.stopped
    }

    /// Changes the priority of a queued task.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::UnknownTask`] or, for a task that has left
    /// the queue, [`SchedulerError::NotQueued`].
    pub fn reprioritize(&self, id: TaskId, priority: Priority) -> Result<(), SchedulerError> {
        let mut guard = self.shared.state.lock();
        let state = &mut *guard;
        let record = state
            .tasks
            .get_mut(&id)
            .ok_or(SchedulerError::UnknownTask(id))?;
        if !state.queue.contains(id) {
            return Err(SchedulerError::NotQueued {
                id,
                state: record.state,
            });
        }
        state.queue.submit(id, priority);
        record.priority = priority;
        Ok(())
    }

    /// Removes a queued task and marks it cancelled.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::UnknownTask`] or, for a task that has left
    /// the queue, [`SchedulerError::NotQueued`].
    pub fn cancel(&self, id: TaskId) -> Result<(), SchedulerError> {
        {
            let mut guard = self.shared.state.lock();
            let state = &mut *guard;
            let record = state
                .tasks
                .get_mut(&id)
                .ok_or(SchedulerError::UnknownTask(id))?;
            if state.queue.remove(id).is_none() {
                return Err(SchedulerError::NotQueued {
                    id,
                    state: record.state,
                });
            }
            record.state = TaskState::Cancelled;
        }
        self.shared.settled.notify_all();
        tracing::debug!(task = %id, "task cancelled");
        Ok(())
    }

    /// Current state of a task.
    #[must_use]
    pub fn task_state(&self, id: TaskId) -> Option<TaskState> {
        self.shared.state.lock().tasks.get(&id).map(|record| record.state)
    }

    /// Full record of a task, including its result once finished.
    #[must_use]
    pub fn task(&self, id: TaskId) -> Option<TaskRecord> {
        self.shared.state.lock().tasks.get(&id).cloned()
    }

    /// Records of every submitted task in submission order.
    #[must_use]
    pub fn tasks(&self) -> Vec<TaskRecord> {
        let mut tasks: Vec<_> = self.shared.state.lock().tasks.values().cloned().collect();
        tasks.sort_by_key(|record| record.id);
        tasks
    }

    /// Occupancy of every core slot in pool order.
    #[must_use]
    pub fn core_states(&self) -> Vec<CoreState> {
        self.shared.state.lock().slots.clone()
    }

    /// Blocks until the task reaches a terminal state or `timeout` elapses,
    /// returning its state at that point.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::UnknownTask`] for an id never submitted.
    pub fn wait_for_task(&self, id: TaskId, timeout: Duration) -> Result<TaskState, SchedulerError> {
        let mut state = self.shared.state.lock();
        if !state.tasks.contains_key(&id) {
            return Err(SchedulerError::UnknownTask(id));
        }
        self.shared.settled.wait_while_for(
            &mut state,
            |state| {
                state
                    .tasks
                    .get(&id)
                    .is_some_and(|record| !record.state.is_terminal())
            },
            timeout,
        );
        state
            .tasks
            .get(&id)
            .map(|record| record.state)
            .ok_or(SchedulerError::UnknownTask(id))
    }

    /// Blocks until the queue is empty and no core is busy, or `timeout`
    /// elapses. Returns true if idle.
    #[must_use]
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let mut state = self.shared.state.lock();
        self.shared
            .settled
            .wait_while_for(&mut state, |state| !state.is_idle(), timeout);
        state.is_idle()
    }

    /// Cores handed back by their workers. Empty until [`Scheduler::stop`].
    #[must_use]
    pub fn cores(&self) -> &[Core] {
        &self.parked
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        if let Err(err) = self.stop() {
            tracing::warn!(%err, "scheduler shutdown reported an error");
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(ToString::to_string)
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use proptest::prelude::*;

    use super::{CoreState, Dispatch, Scheduler};
    use crate::{SchedulerConfig, SchedulerError, TaskId, TaskState};
    use sim_core::{CoreConfig, Program};

    const WAIT: Duration = Duration::from_secs(10);

    fn scheduler(cores: usize) -> Scheduler {
        Scheduler::new(SchedulerConfig {
            cores,
            ..SchedulerConfig::default()
        })
        .expect("workers spawn")
    }

    fn halt() -> Program {
        Program::new(["HLT"])
    }

    #[test]
    fn higher_priority_task_is_dispatched_first() {
        let scheduler = scheduler(1);
        let low = scheduler.submit_task(halt(), 1).expect("submit");
        let high = scheduler.submit_task(halt(), 2).expect("submit");

        assert_eq!(scheduler.tick(), vec![Dispatch { task: high, core: 0 }]);
        assert_eq!(scheduler.task_state(low), Some(TaskState::Waiting));
        assert_eq!(scheduler.wait_for_task(high, WAIT).expect("known"), TaskState::Finished);

        assert_eq!(scheduler.tick(), vec![Dispatch { task: low, core: 0 }]);
        assert_eq!(scheduler.wait_for_task(low, WAIT).expect("known"), TaskState::Finished);
    }

    #[test]
    fn oversized_program_is_rejected_without_creating_a_task() {
        let scheduler = Scheduler::new(SchedulerConfig {
            cores: 1,
            core: CoreConfig {
                memory_cells: 2,
                ..CoreConfig::default()
            },
            ..SchedulerConfig::default()
        })
        .expect("workers spawn");

        let err = scheduler
            .submit_task(Program::new(["HLT"; 3]), 1)
            .expect_err("too large");
        assert!(matches!(err, SchedulerError::Load(_)));
        assert!(scheduler.tasks().is_empty());
        assert!(scheduler.tick().is_empty());
    }

    #[test]
    fn reprioritize_and_cancel_only_touch_queued_tasks() {
        let scheduler = scheduler(1);
        let first = scheduler.submit_task(halt(), 1).expect("submit");
        let second = scheduler.submit_task(halt(), 1).expect("submit");
        let third = scheduler.submit_task(halt(), 1).expect("submit");

        scheduler.reprioritize(third, 9).expect("queued");
        scheduler.cancel(second).expect("queued");
        assert_eq!(scheduler.task_state(second), Some(TaskState::Cancelled));

        assert_eq!(scheduler.tick(), vec![Dispatch { task: third, core: 0 }]);
        assert!(matches!(
            scheduler.cancel(third),
            Err(SchedulerError::NotQueued { id, .. }) if id == third
        ));
        assert!(matches!(
            scheduler.reprioritize(second, 5),
            Err(SchedulerError::NotQueued { state: TaskState::Cancelled, .. })
        ));
        assert!(matches!(
            scheduler.cancel(TaskId::new(99)),
            Err(SchedulerError::UnknownTask(_))
        ));

        scheduler.wait_for_task(third, WAIT).expect("known");
        assert_eq!(scheduler.tick(), vec![Dispatch { task: first, core: 0 }]);
    }

    #[test]
    fn stop_parks_idle_cores_and_rejects_further_work() {
        let mut scheduler = scheduler(3);
        scheduler.start().expect("start");
        assert!(matches!(scheduler.start(), Err(SchedulerError::AlreadyStarted)));
        assert!(scheduler.is_running());

        scheduler.stop().expect("clean stop");
        assert!(!scheduler.is_running());
        assert_eq!(scheduler.cores().len(), 3);
        assert!(scheduler.cores().iter().all(|core| !core.is_running()));
        assert!(matches!(
            scheduler.submit_task(halt(), 1),
            Err(SchedulerError::Stopped)
        ));
        assert!(matches!(scheduler.start(), Err(SchedulerError::Stopped)));
        scheduler.stop().expect("second stop is a no-op");
    }

    #[test]
    fn wait_idle_times_out_while_work_is_queued() {
        let scheduler = scheduler(1);
        assert!(scheduler.wait_idle(Duration::from_millis(1)));
        scheduler.submit_task(halt(), 1).expect("submit");
        assert!(!scheduler.wait_idle(Duration::from_millis(20)));
        scheduler.tick();
        assert!(scheduler.wait_idle(WAIT));
        assert_eq!(scheduler.core_states(), vec![CoreState::Idle]);
    }

    #[test]
    fn busy_core_keeps_its_task_running_across_ticks() {
        let scheduler = Scheduler::new(SchedulerConfig {
            cores: 1,
            core: CoreConfig {
                step_budget: Some(2_000_000),
                ..CoreConfig::default()
            },
            ..SchedulerConfig::default()
        })
        .expect("workers spawn");
        let spinner = scheduler
            .submit_task(Program::new(["JMP 0"]), 1)
            .expect("submit");
        assert_eq!(scheduler.task_state(spinner), Some(TaskState::Ready));

        assert_eq!(scheduler.tick(), vec![Dispatch { task: spinner, core: 0 }]);
        assert_eq!(scheduler.task_state(spinner), Some(TaskState::Running));

        let urgent = scheduler.submit_task(halt(), 5).expect("submit");
        assert!(scheduler.tick().is_empty());
        assert_eq!(scheduler.task_state(spinner), Some(TaskState::Running));
        assert_eq!(scheduler.task_state(urgent), Some(TaskState::Waiting));
        assert_eq!(scheduler.core_states(), vec![CoreState::Busy(spinner)]);

        assert_eq!(
            scheduler.wait_for_task(spinner, WAIT).expect("known"),
            TaskState::FinishedWithError
        );
        assert_eq!(scheduler.tick(), vec![Dispatch { task: urgent, core: 0 }]);
        assert_eq!(scheduler.wait_for_task(urgent, WAIT).expect("known"), TaskState::Finished);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn first_idle_core_gets_the_higher_priority_task(busy in prop::collection::vec(any::<bool>(), 1..5)) {
            let scheduler = scheduler(busy.len());
            {
                let mut state = scheduler.shared.state.lock();
                for (slot, busy) in state.slots.iter_mut().zip(&busy) {
                    if *busy {
                        *slot = CoreState::Busy(TaskId::new(u64::MAX));
                    }
                }
            }
            let low = scheduler.submit_task(halt(), 1).expect("submit");
            let high = scheduler.submit_task(halt(), 2).expect("submit");

            let idle: Vec<usize> = busy
                .iter()
                .enumerate()
                .filter_map(|(index, busy)| (!busy).then_some(index))
                .collect();
            let dispatched = scheduler.tick();

            match idle.as_slice() {
                [] => prop_assert!(dispatched.is_empty()),
                [only] => {
                    prop_assert_eq!(dispatched, vec![Dispatch { task: high, core: *only }]);
                    prop_assert_eq!(scheduler.task_state(low), Some(TaskState::Waiting));
                }
                [first, second, ..] => prop_assert_eq!(
                    dispatched,
                    vec![
                        Dispatch { task: high, core: *first },
                        Dispatch { task: low, core: *second },
                    ]
                ),
            }
        }
    }
}
