//! Text-ISA core interpreter for the multi-core simulator.
//!
//! A [`Core`] owns four signed registers, a fixed block of memory cells
//! shared by instructions and data, and a program counter. Programs are
//! sequences of whitespace-separated instruction texts, decoded lazily at
//! fetch time.

/// Fault taxonomy and load errors.
pub mod fault;
pub use fault::{FaultClass, FaultCode, FaultReason, LoadError};

/// Register names and the register file.
pub mod registers;
pub use registers::{Register, RegisterFile, REGISTER_COUNT};

/// Mnemonic table and operand shapes.
pub mod opcode;
pub use opcode::{lookup_mnemonic, Opcode, OpcodeEntry, OperandShape, OPCODE_TABLE};

/// Instruction text decoder.
pub mod instruction;
pub use instruction::Instruction;

/// Cell-addressed memory.
pub mod memory;
pub use memory::{Cell, Memory, DEFAULT_MEMORY_CELLS};

/// Program containers and source ingestion.
pub mod program;
pub use program::{extract_source_lines, Program, SourceLine};

/// Public host-facing configuration, outcome, and trace types.
pub mod api;
pub use api::{
    CoreConfig, CoreSnapshot, ExitReason, LogTrace, NullTrace, RunOutcome, StepOutcome,
    TraceEvent, TraceSink, DEFAULT_SNAPSHOT_MEMORY_HEAD, DEFAULT_STEP_BUDGET,
};

/// Per-core diagnostic counters.
pub mod stats;
pub use stats::CoreStats;

/// Instruction execution semantics.
pub mod execute;
pub use execute::{execute_instruction, Control, ExecuteState};

/// The fetch/decode/execute core.
pub mod cpu;
pub use cpu::{Core, Fetch};

#[cfg(test)]
use proptest as _;
#[cfg(test)]
use rstest as _;
