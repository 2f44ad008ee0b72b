//! Scheduler error type.

use sim_core::LoadError;
use thiserror::Error;

use crate::{TaskId, TaskState};

/// Errors returned by scheduler and facade operations.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The program cannot be placed into core memory; no task was created.
    #[error(transparent)]
    Load(#[from] LoadError),
    /// No task with this id was ever submitted.
    #[error("unknown task {0}")]
    UnknownTask(TaskId),
    /// The task has left the queue and can no longer be changed.
    #[error("{id} is no longer queued (state: {state})")]
    NotQueued {
        /// Task identity.
        id: TaskId,
        /// Its current state.
        state: TaskState,
    },
    /// `start` was called on a running scheduler.
    #[error("scheduler already started")]
    AlreadyStarted,
    /// The scheduler has been stopped.
    #[error("scheduler is stopped")]
    Stopped,
    /// A loop or core worker thread panicked.
    #[error("worker thread panicked: {0}")]
    WorkerPanicked(String),
    /// A worker thread could not be spawned.
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),
}
