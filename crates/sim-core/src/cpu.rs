//! The core: one register file, one memory block, one PC, one running flag.

use std::sync::Arc;

use crate::execute::{execute_instruction, Control, ExecuteState};
use crate::{
    Cell, CoreConfig, CoreSnapshot, CoreStats, ExitReason, FaultReason, Instruction, LoadError,
    LogTrace, Memory, Program, Register, RegisterFile, RunOutcome, StepOutcome, TraceEvent,
    TraceSink,
};

/// Result of one instruction fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fetch {
    /// Instruction text at the old PC.
    Instruction(Arc<str>),
    /// Non-zero data word at the old PC.
    Data(i64),
    /// The cell at the old PC holds a zero data word.
    EndOfProgram,
    /// PC was at or past the end of memory; PC is unchanged.
    EndOfMemory,
}

/// A single instruction-execution unit.
///
/// A core is driven by exactly one thread at a time; every mutating method
/// takes `&mut self`, so exclusive access to registers, memory and PC is
/// enforced by ownership rather than by a lock.
#[derive(Debug, Clone)]
pub struct Core {
    config: CoreConfig,
    registers: RegisterFile,
    memory: Memory,
    pc: usize,
    running: bool,
    steps: u64,
    exit: Option<ExitReason>,
    stats: CoreStats,
}

impl Default for Core {
    fn default() -> Self {
        Self::new(CoreConfig::default())
    }
}

impl Core {
    /// Creates an idle core with zeroed registers and memory.
    #[must_use]
    pub fn new(config: CoreConfig) -> Self {
        let memory = Memory::new(config.memory_cells);
        Self {
            config,
            registers: RegisterFile::default(),
            memory,
            pc: 0,
            running: false,
            steps: 0,
            exit: None,
            stats: CoreStats::default(),
        }
    }

    /// Resets registers and memory, copies `program` to address 0, sets
    /// `PC=0` and starts the core.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::ProgramTooLarge`] when the program does not fit;
    /// the core is left untouched.
    pub fn load(&mut self, program: &Program) -> Result<(), LoadError> {
        self.memory.load_program(program)?;
        self.registers.clear();
        self.pc = 0;
        self.running = true;
        self.steps = 0;
        self.exit = None;
        Ok(())
    }

    /// Clears registers and memory and stops the core. Statistics survive.
    pub fn reset(&mut self) {
        self.memory.clear();
        self.registers.clear();
        self.pc = 0;
        self.running = false;
        self.steps = 0;
        self.exit = None;
    }

    /// Returns the cell at PC and advances PC by one.
    pub fn fetch(&mut self) -> Fetch {
        let Some(cell) = self.memory.get(self.pc) else {
            return Fetch::EndOfMemory;
        };
        let fetched = match cell {
            Cell::Instruction(text) => Fetch::Instruction(Arc::clone(text)),
            Cell::Data(0) => Fetch::EndOfProgram,
            Cell::Data(value) => Fetch::Data(*value),
        };
        self.pc += 1;
        fetched
    }

    /// Decodes and executes one instruction text, returning the running flag.
    ///
    /// # Errors
    ///
    /// Returns the [`FaultReason`] for an invalid opcode or operand. The
    /// caller decides how to stop the core; see [`Core::step`].
    pub fn decode_execute(&mut self, text: &str) -> Result<bool, FaultReason> {
        let instruction = Instruction::decode(text)?;
        self.execute(&instruction)?;
        Ok(self.running)
    }

    fn execute(&mut self, instruction: &Instruction) -> Result<(), FaultReason> {
        let mut state = ExecuteState {
            registers: &mut self.registers,
            memory: &mut self.memory,
            pc: &mut self.pc,
        };
        if execute_instruction(instruction, &mut state)? == Control::Halt {
            self.running = false;
        }
        Ok(())
    }

    /// Runs one fetch/decode/execute step, reporting events to `sink`.
    pub fn step_with(&mut self, sink: &mut dyn TraceSink) -> StepOutcome {
        if !self.running {
            return StepOutcome::Idle;
        }

        let addr = self.pc;
        if let Some(budget) = self.config.step_budget {
            if self.steps >= budget {
                return self.fault(addr, FaultReason::BudgetExhausted(budget), sink);
            }
        }

        let text = match self.fetch() {
            Fetch::Instruction(text) => text,
            Fetch::Data(value) => {
                return self.fault(addr, FaultReason::DataAsInstruction(value), sink);
            }
            Fetch::EndOfProgram => return self.exit(ExitReason::EndOfProgram),
            Fetch::EndOfMemory => return self.exit(ExitReason::EndOfMemory),
        };

        let instruction = match Instruction::decode(&text) {
            Ok(instruction) => instruction,
            Err(reason) => return self.fault(addr, reason, sink),
        };
        if let Err(reason) = self.execute(&instruction) {
            return self.fault(addr, reason, sink);
        }

        self.steps += 1;
        self.stats.record_retired();
        sink.on_event(TraceEvent::InstructionRetired {
            addr,
            instruction: &instruction,
            pc: self.pc,
            registers: self.registers.values(),
            memory_head: self.memory.head(self.config.snapshot_memory_head),
        });

        if self.running {
            StepOutcome::Retired
        } else {
            self.exit(ExitReason::Halted)
        }
    }

    /// Runs one step, tracing to the `tracing` facade.
    pub fn step(&mut self) -> StepOutcome {
        self.step_with(&mut LogTrace::default())
    }

    /// Steps until the core stops, reporting events to `sink`.
    ///
    /// A core that is not running returns its previous exit, or
    /// [`ExitReason::Halted`] if it was never loaded.
    pub fn run_with(&mut self, sink: &mut dyn TraceSink) -> RunOutcome {
        loop {
            match self.step_with(sink) {
                StepOutcome::Retired => {}
                StepOutcome::Exited(exit) => {
                    return RunOutcome {
                        steps: self.steps,
                        exit,
                    };
                }
                StepOutcome::Idle => {
                    return RunOutcome {
                        steps: self.steps,
                        exit: self.exit.clone().unwrap_or(ExitReason::Halted),
                    };
                }
            }
        }
    }

    /// Steps until the core stops, tracing to the `tracing` facade.
    pub fn run(&mut self) -> RunOutcome {
        self.run_with(&mut LogTrace::default())
    }

    fn exit(&mut self, exit: ExitReason) -> StepOutcome {
        self.running = false;
        self.stats.record_run();
        self.exit = Some(exit.clone());
        StepOutcome::Exited(exit)
    }

    fn fault(&mut self, addr: usize, reason: FaultReason, sink: &mut dyn TraceSink) -> StepOutcome {
        self.stats.record_fault(reason.code(), addr);
        sink.on_event(TraceEvent::FaultRaised {
            addr,
            reason: &reason,
        });
        self.exit(ExitReason::Faulted { addr, reason })
    }

    /// Configuration this core was built with.
    #[must_use]
    pub const fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// Program counter.
    #[must_use]
    pub const fn pc(&self) -> usize {
        self.pc
    }

    /// Running flag.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.running
    }

    /// Reads one register.
    #[must_use]
    pub const fn register(&self, reg: Register) -> i64 {
        self.registers.get(reg)
    }

    /// Register file.
    #[must_use]
    pub const fn registers(&self) -> &RegisterFile {
        &self.registers
    }

    /// Memory block.
    #[must_use]
    pub const fn memory(&self) -> &Memory {
        &self.memory
    }

    /// Instructions retired since the last load.
    #[must_use]
    pub const fn steps(&self) -> u64 {
        self.steps
    }

    /// Why the last run stopped, if it has.
    #[must_use]
    pub const fn last_exit(&self) -> Option<&ExitReason> {
        self.exit.as_ref()
    }

    /// Lifetime statistics.
    #[must_use]
    pub const fn stats(&self) -> &CoreStats {
        &self.stats
    }

    /// Captures PC, registers, memory head and the running flag.
    #[must_use]
    pub fn snapshot(&self) -> CoreSnapshot {
        CoreSnapshot {
            pc: self.pc,
            registers: self.registers.values(),
            memory_head: self.memory.head(self.config.snapshot_memory_head).to_vec(),
            running: self.running,
        }
    }
}
