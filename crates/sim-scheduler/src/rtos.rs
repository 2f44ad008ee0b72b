//! Minimal RTOS-style facade over the scheduler.

use sim_core::Program;

use crate::{Priority, Scheduler, SchedulerConfig, SchedulerError, TaskId};

/// Thin facade exposing submit/start/stop. Holds nothing but the scheduler.
#[derive(Debug)]
pub struct Rtos {
    scheduler: Scheduler,
}

impl Rtos {
    /// Builds a scheduler from `config` and wraps it.
    ///
    /// # Errors
    ///
    /// Propagates [`Scheduler::new`] failures.
    pub fn new(config: SchedulerConfig) -> Result<Self, SchedulerError> {
        Scheduler::new(config).map(Self::with_scheduler)
    }

    /// Wraps an existing scheduler.
    #[must_use]
    pub const fn with_scheduler(scheduler: Scheduler) -> Self {
        Self { scheduler }
    }

    /// Submits a program at `priority`.
    ///
    /// # Errors
    ///
    /// See [`Scheduler::submit_task`].
    pub fn submit(&self, program: Program, priority: Priority) -> Result<TaskId, SchedulerError> {
        self.scheduler.submit_task(program, priority)
    }

    /// Starts scheduling.
    ///
    /// # Errors
    ///
    /// See [`Scheduler::start`].
    pub fn start(&mut self) -> Result<(), SchedulerError> {
        self.scheduler.start()
    }

    /// Stops scheduling and joins every worker.
    ///
    /// # Errors
    ///
    /// See [`Scheduler::stop`].
    pub fn stop(&mut self) -> Result<(), SchedulerError> {
        self.scheduler.stop()
    }

    /// The wrapped scheduler, for inspection.
    #[must_use]
    pub const fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::Rtos;
    use crate::{SchedulerConfig, TaskState};
    use sim_core::{Program, Register};

    #[test]
    fn facade_runs_a_submitted_program() {
        let mut rtos = Rtos::new(SchedulerConfig::default()).expect("workers spawn");
        let id = rtos
            .submit(Program::new(["MOV R0 10", "MOV R1 20", "ADD R0 R1", "HLT"]), 2)
            .expect("submit");
        rtos.start().expect("start");
        let state = rtos
            .scheduler()
            .wait_for_task(id, Duration::from_secs(10))
            .expect("known task");
        rtos.stop().expect("stop");

        assert_eq!(state, TaskState::Finished);
        let record = rtos.scheduler().task(id).expect("known task");
        let result = record.result.expect("finished task has a result");
        assert_eq!(result.snapshot.registers[Register::R0.index()], 30);
    }
}
