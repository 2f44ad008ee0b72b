//! Run reports printed by `simcpu run`.

use std::fmt;
use std::path::Path;

use serde::Serialize;
use sim_core::{Core, REGISTER_COUNT};
use sim_scheduler::{TaskRecord, TaskState};

/// Outcome of one submitted program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskReport {
    /// Scheduler-assigned task id.
    pub id: u64,
    /// Source file the program came from.
    pub file: String,
    /// Submission priority.
    pub priority: i32,
    /// Final lifecycle state.
    pub state: TaskState,
    /// Pool index of the core that ran it.
    pub core: Option<usize>,
    /// Exit description, once finished.
    pub exit: Option<String>,
    /// Stable fault code byte for faulted runs.
    pub fault_code: Option<u8>,
    /// Instructions retired.
    pub steps: Option<u64>,
    /// Final program counter.
    pub pc: Option<usize>,
    /// Final register values.
    pub registers: Option<[i64; REGISTER_COUNT]>,
}

impl TaskReport {
    /// Builds a report from the scheduler's record of a task.
    #[must_use]
    pub fn new(file: &Path, record: &TaskRecord) -> Self {
        let result = record.result.as_ref();
        Self {
            id: record.id.get(),
            file: file.display().to_string(),
            priority: record.priority,
            state: record.state,
            core: record.core,
            exit: result.map(|result| result.exit.to_string()),
            fault_code: result
                .and_then(|result| result.exit.fault_code())
                .map(sim_core::FaultCode::as_u8),
            steps: result.map(|result| result.steps),
            pc: result.map(|result| result.snapshot.pc),
            registers: result.map(|result| result.snapshot.registers),
        }
    }

    /// Returns true for tasks that should fail the run.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        self.state == TaskState::FinishedWithError
    }
}

impl fmt::Display for TaskReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "task {} {} (priority {}): {}",
            self.id, self.file, self.priority, self.state
        )?;
        if let Some(core) = self.core {
            write!(f, " on core {core}")?;
        }
        if let Some(exit) = &self.exit {
            write!(f, ", {exit}")?;
        }
        if let Some(steps) = self.steps {
            write!(f, ", {steps} steps")?;
        }
        if let (Some(pc), Some(registers)) = (self.pc, self.registers) {
            write!(f, ", pc={pc}")?;
            for (index, value) in registers.iter().enumerate() {
                write!(f, " R{index}={value}")?;
            }
        }
        Ok(())
    }
}

/// Lifetime counters of one core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CoreReport {
    /// Pool index.
    pub index: usize,
    /// Instructions retired across all tasks.
    pub instructions_retired: u64,
    /// Tasks run to an exit.
    pub runs_completed: u64,
    /// Faults of every class.
    pub faults: u64,
}

impl CoreReport {
    /// Summarises a parked core.
    #[must_use]
    pub const fn new(index: usize, core: &Core) -> Self {
        let stats = core.stats();
        Self {
            index,
            instructions_retired: stats.instructions_retired,
            runs_completed: stats.runs_completed,
            faults: stats.total_faults(),
        }
    }
}

impl fmt::Display for CoreReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "core {}: {} instructions, {} runs, {} faults",
            self.index, self.instructions_retired, self.runs_completed, self.faults
        )
    }
}

/// Everything `simcpu run` reports.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// One entry per submitted task, in submission order.
    pub tasks: Vec<TaskReport>,
    /// One entry per core, in pool order.
    pub cores: Vec<CoreReport>,
}

impl RunReport {
    /// Returns true if any task finished with an error.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.tasks.iter().any(TaskReport::is_failure)
    }

    /// Pretty-printed JSON form.
    ///
    /// # Errors
    ///
    /// Propagates serializer failures.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for task in &self.tasks {
            writeln!(f, "{task}")?;
        }
        for core in &self.cores {
            writeln!(f, "{core}")?;
        }
        Ok(())
    }
}
