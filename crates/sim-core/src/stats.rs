//! Per-core diagnostic counters kept across program loads.

use crate::{FaultClass, FaultCode};

/// Saturating counters describing one core's lifetime activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct CoreStats {
    /// Instructions retired across all runs.
    pub instructions_retired: u64,
    /// Runs that reached an exit (halt, end of memory/program, or fault).
    pub runs_completed: u64,
    /// Decode-class faults.
    pub fault_count_decode: u32,
    /// Operand-class faults.
    pub fault_count_operand: u32,
    /// Budget-class faults.
    pub fault_count_budget: u32,
    /// The most recent fault code, if any.
    pub last_fault_code: Option<FaultCode>,
    /// Address of the most recent fault.
    pub last_fault_addr: usize,
}

impl CoreStats {
    /// Records a fault occurrence, updating the last fault info and the
    /// counter for its class.
    pub const fn record_fault(&mut self, code: FaultCode, addr: usize) {
        self.last_fault_code = Some(code);
        self.last_fault_addr = addr;
        match code.class() {
            FaultClass::Decode => {
                self.fault_count_decode = self.fault_count_decode.saturating_add(1);
            }
            FaultClass::Operand => {
                self.fault_count_operand = self.fault_count_operand.saturating_add(1);
            }
            FaultClass::Budget => {
                self.fault_count_budget = self.fault_count_budget.saturating_add(1);
            }
        }
    }

    /// Increments the retired-instruction counter.
    pub const fn record_retired(&mut self) {
        self.instructions_retired = self.instructions_retired.saturating_add(1);
    }

    /// Increments the completed-run counter.
    pub const fn record_run(&mut self) {
        self.runs_completed = self.runs_completed.saturating_add(1);
    }

    /// Total faults across every class.
    #[must_use]
    pub const fn total_faults(&self) -> u64 {
        self.fault_count_decode as u64
            + self.fault_count_operand as u64
            + self.fault_count_budget as u64
    }

    /// Resets all counters.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
