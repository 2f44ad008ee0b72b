//! Host-facing configuration, outcome, snapshot, and trace types.

use std::fmt;

use crate::{Cell, FaultCode, FaultReason, Instruction, DEFAULT_MEMORY_CELLS, REGISTER_COUNT};

/// Default per-run instruction budget.
pub const DEFAULT_STEP_BUDGET: u64 = 1_000_000;

/// Default number of memory cells included in snapshots and trace events.
pub const DEFAULT_SNAPSHOT_MEMORY_HEAD: usize = 10;

/// Immutable configuration for a core instance.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct CoreConfig {
    /// Memory capacity in cells. Bounds both program length and addresses.
    pub memory_cells: usize,
    /// Maximum instructions retired per run; `None` runs to completion.
    pub step_budget: Option<u64>,
    /// Number of leading memory cells captured in snapshots.
    pub snapshot_memory_head: usize,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            memory_cells: DEFAULT_MEMORY_CELLS,
            step_budget: Some(DEFAULT_STEP_BUDGET),
            snapshot_memory_head: DEFAULT_SNAPSHOT_MEMORY_HEAD,
        }
    }
}

/// Why a core stopped running its current program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitReason {
    /// `HLT` retired.
    Halted,
    /// PC advanced past the last memory cell.
    EndOfMemory,
    /// PC reached a zero data cell, written or not.
    EndOfProgram,
    /// Decode or execute fault.
    Faulted {
        /// Address of the faulting instruction.
        addr: usize,
        /// Detailed fault reason.
        reason: FaultReason,
    },
}

impl ExitReason {
    /// Returns the fault code when the core stopped on a fault.
    #[must_use]
    pub const fn fault_code(&self) -> Option<FaultCode> {
        match self {
            Self::Faulted { reason, .. } => Some(reason.code()),
            Self::Halted | Self::EndOfMemory | Self::EndOfProgram => None,
        }
    }

    /// Returns true when the core stopped on a fault.
    #[must_use]
    pub const fn is_fault(&self) -> bool {
        matches!(self, Self::Faulted { .. })
    }

    /// Short lowercase label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Halted => "halted",
            Self::EndOfMemory => "end-of-memory",
            Self::EndOfProgram => "end-of-program",
            Self::Faulted { .. } => "faulted",
        }
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Faulted { addr, reason } => {
                write!(f, "{} at {addr}: {reason}", reason.code())
            }
            other => f.write_str(other.label()),
        }
    }
}

/// Output of one fetch/decode/execute step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// Instruction retired and the core keeps running.
    Retired,
    /// The core stopped during this step.
    Exited(ExitReason),
    /// The core was not running; nothing happened.
    Idle,
}

/// Aggregated outcome of running a loaded program to its end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    /// Instructions retired during the run.
    pub steps: u64,
    /// Why the run ended.
    pub exit: ExitReason,
}

/// Host-visible core state captured at a point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct CoreSnapshot {
    /// Program counter (address of the next fetch).
    pub pc: usize,
    /// Register values in index order.
    pub registers: [i64; REGISTER_COUNT],
    /// Leading memory cells.
    pub memory_head: Vec<Cell>,
    /// Running flag.
    pub running: bool,
}

/// Diagnostics events emitted at instruction boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceEvent<'a> {
    /// An instruction retired.
    InstructionRetired {
        /// Address the instruction was fetched from.
        addr: usize,
        /// Decoded instruction.
        instruction: &'a Instruction,
        /// Program counter after execution.
        pc: usize,
        /// Register values after execution.
        registers: [i64; REGISTER_COUNT],
        /// Leading memory cells after execution.
        memory_head: &'a [Cell],
    },
    /// A fault halted the core.
    FaultRaised {
        /// Address of the faulting instruction.
        addr: usize,
        /// Detailed fault reason.
        reason: &'a FaultReason,
    },
}

/// Sink for advisory trace events. Sinks never influence control flow.
pub trait TraceSink {
    /// Records an event in execution order.
    fn on_event(&mut self, event: TraceEvent<'_>);
}

/// Sink that drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullTrace;

impl TraceSink for NullTrace {
    fn on_event(&mut self, _event: TraceEvent<'_>) {}
}

/// Sink that forwards events to `tracing` at trace level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogTrace {
    /// Pool index of the core, attached to every record.
    pub core: usize,
}

impl TraceSink for LogTrace {
    fn on_event(&mut self, event: TraceEvent<'_>) {
        match event {
            TraceEvent::InstructionRetired {
                addr,
                instruction,
                pc,
                registers,
                memory_head,
            } => tracing::trace!(
                core = self.core,
                addr,
                pc,
                %instruction,
                ?registers,
                ?memory_head,
                "retired"
            ),
            TraceEvent::FaultRaised { addr, reason } => {
                tracing::debug!(core = self.core, addr, %reason, "fault");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CoreConfig, ExitReason, DEFAULT_SNAPSHOT_MEMORY_HEAD, DEFAULT_STEP_BUDGET};
    use crate::{FaultCode, FaultReason, DEFAULT_MEMORY_CELLS};

    #[test]
    fn default_core_config_matches_documented_defaults() {
        let config = CoreConfig::default();
        assert_eq!(config.memory_cells, DEFAULT_MEMORY_CELLS);
        assert_eq!(config.step_budget, Some(DEFAULT_STEP_BUDGET));
        assert_eq!(config.snapshot_memory_head, DEFAULT_SNAPSHOT_MEMORY_HEAD);
    }

    #[test]
    fn only_faulted_exits_carry_a_fault_code() {
        assert_eq!(ExitReason::Halted.fault_code(), None);
        assert_eq!(ExitReason::EndOfMemory.fault_code(), None);
        assert!(!ExitReason::EndOfProgram.is_fault());

        let faulted = ExitReason::Faulted {
            addr: 3,
            reason: FaultReason::RegisterOutOfRange(7),
        };
        assert!(faulted.is_fault());
        assert_eq!(faulted.fault_code(), Some(FaultCode::InvalidOperand));
        assert_eq!(faulted.label(), "faulted");
        assert_eq!(ExitReason::EndOfProgram.to_string(), "end-of-program");
    }
}
