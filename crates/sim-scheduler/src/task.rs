//! Task identity, lifecycle states, and records.

use std::fmt;

use sim_core::{CoreSnapshot, ExitReason, Program};

/// Scheduling priority. Larger values are dispatched first.
pub type Priority = i32;

/// Priority used when none is given.
pub const DEFAULT_PRIORITY: Priority = 1;

/// Generated task identity, unique within one scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct TaskId(u64);

impl TaskId {
    /// Wraps a raw identifier.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw identifier value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task#{}", self.0)
    }
}

/// Task lifecycle.
///
/// `Ready` and `Waiting` both mean queued; `Waiting` marks a task that has
/// been passed over by at least one dispatch pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum TaskState {
    /// Submitted, not yet considered for dispatch.
    Ready,
    /// Queued behind other tasks or busy cores.
    Waiting,
    /// Bound to a core.
    Running,
    /// Stopped on `HLT`, end of memory, or end of program.
    Finished,
    /// Stopped on a fault.
    FinishedWithError,
    /// Removed from the queue before dispatch.
    Cancelled,
}

impl TaskState {
    /// Returns true while the task sits in the queue.
    #[must_use]
    pub const fn is_queued(self) -> bool {
        matches!(self, Self::Ready | Self::Waiting)
    }

    /// Returns true once the task can no longer change state.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Finished | Self::FinishedWithError | Self::Cancelled
        )
    }

    /// Lowercase label used in logs and reports.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Ready => "ready",
            Self::Waiting => "waiting",
            Self::Running => "running",
            Self::Finished => "finished",
            Self::FinishedWithError => "finished-with-error",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// What a core reported when a task's run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskResult {
    /// Why the run ended.
    pub exit: ExitReason,
    /// Instructions retired.
    pub steps: u64,
    /// Final core state.
    pub snapshot: CoreSnapshot,
}

impl TaskResult {
    /// Terminal state this result maps to.
    #[must_use]
    pub const fn state(&self) -> TaskState {
        if self.exit.is_fault() {
            TaskState::FinishedWithError
        } else {
            TaskState::Finished
        }
    }
}

/// Everything the scheduler knows about one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRecord {
    /// Task identity.
    pub id: TaskId,
    /// Current priority.
    pub priority: Priority,
    /// Program to run.
    pub program: Program,
    /// Lifecycle state.
    pub state: TaskState,
    /// Pool index of the core the task was dispatched to.
    pub core: Option<usize>,
    /// Run result, once finished.
    pub result: Option<TaskResult>,
}

impl TaskRecord {
    pub(crate) const fn new(id: TaskId, program: Program, priority: Priority) -> Self {
        Self {
            id,
            priority,
            program,
            state: TaskState::Ready,
            core: None,
            result: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{TaskId, TaskResult, TaskState};
    use sim_core::{CoreSnapshot, ExitReason, FaultReason};

    fn result(exit: ExitReason) -> TaskResult {
        TaskResult {
            exit,
            steps: 0,
            snapshot: CoreSnapshot {
                pc: 0,
                registers: [0; 4],
                memory_head: Vec::new(),
                running: false,
            },
        }
    }

    #[test]
    fn exits_map_to_terminal_states() {
        assert_eq!(result(ExitReason::Halted).state(), TaskState::Finished);
        assert_eq!(result(ExitReason::EndOfMemory).state(), TaskState::Finished);
        assert_eq!(result(ExitReason::EndOfProgram).state(), TaskState::Finished);
        let faulted = ExitReason::Faulted {
            addr: 0,
            reason: FaultReason::EmptyInstruction,
        };
        assert_eq!(result(faulted).state(), TaskState::FinishedWithError);
    }

    #[test]
    fn queued_and_terminal_states_are_disjoint() {
        for state in [
            TaskState::Ready,
            TaskState::Waiting,
            TaskState::Running,
            TaskState::Finished,
            TaskState::FinishedWithError,
            TaskState::Cancelled,
        ] {
            assert!(!(state.is_queued() && state.is_terminal()), "{state}");
        }
        assert!(!TaskState::Running.is_queued());
        assert!(!TaskState::Running.is_terminal());
    }

    #[test]
    fn task_id_display() {
        assert_eq!(TaskId::new(7).to_string(), "task#7");
        assert_eq!(TaskId::new(7).get(), 7);
    }
}
