//! Per-core worker threads.
//!
//! Each worker owns one [`Core`] for the scheduler's lifetime, runs one
//! dispatched task at a time to completion, and hands the core back when
//! its dispatch channel closes.

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender};
use sim_core::{Core, LogTrace, Program};

use crate::scheduler::Shared;
use crate::{TaskId, TaskResult};

/// A task bound to a core, in flight to that core's worker.
#[derive(Debug)]
pub(crate) struct Job {
    pub(crate) id: TaskId,
    pub(crate) program: Program,
}

/// Spawns the worker for pool slot `index`.
///
/// The channel holds one job: the scheduler only dispatches to an idle
/// core, and a core is idle only after its worker has taken the last job.
pub(crate) fn spawn(
    index: usize,
    core: Core,
    shared: Arc<Shared>,
) -> io::Result<(Sender<Job>, JoinHandle<Core>)> {
    let (sender, receiver) = crossbeam_channel::bounded(1);
    let handle = thread::Builder::new()
        .name(format!("sim-core-{index}"))
        .spawn(move || worker_loop(index, core, &receiver, &shared))?;
    Ok((sender, handle))
}

fn worker_loop(index: usize, mut core: Core, receiver: &Receiver<Job>, shared: &Shared) -> Core {
    while let Ok(job) = receiver.recv() {
        let result = run_job(index, &mut core, &job);
        shared.complete(index, job.id, result);
    }
    tracing::debug!(core = index, "dispatch channel closed; worker exiting");
    core
}

fn run_job(index: usize, core: &mut Core, job: &Job) -> Option<TaskResult> {
    if let Err(err) = core.load(&job.program) {
        tracing::warn!(core = index, task = %job.id, %err, "program load failed");
        return None;
    }
    let run = core.run_with(&mut LogTrace { core: index });
    Some(TaskResult {
        exit: run.exit,
        steps: run.steps,
        snapshot: core.snapshot(),
    })
}
