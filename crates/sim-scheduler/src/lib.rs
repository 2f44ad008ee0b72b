//! Priority task scheduler and RTOS facade for the multi-core simulator.
//!
//! A [`Scheduler`] owns a fixed pool of [`sim_core::Core`]s, one worker
//! thread each, and dispatches queued tasks to idle cores in priority order.
//! [`Rtos`] is the submit/start/stop facade on top.

/// Task identity, states, and records.
pub mod task;
pub use task::{Priority, TaskId, TaskRecord, TaskResult, TaskState, DEFAULT_PRIORITY};

/// Priority queue of task identities.
pub mod queue;
pub use queue::{QueueEmpty, QueuePosition, TaskQueue};

/// Scheduler configuration.
pub mod config;
pub use config::{SchedulerConfig, DEFAULT_CORE_COUNT, DEFAULT_TICK_INTERVAL};

/// Scheduler error type.
pub mod error;
pub use error::SchedulerError;

/// Dispatch loop, task table, and core slots.
pub mod scheduler;
pub use scheduler::{CoreState, Dispatch, Scheduler};

/// RTOS facade.
pub mod rtos;
pub use rtos::Rtos;

mod worker;

#[cfg(test)]
use rstest as _;
