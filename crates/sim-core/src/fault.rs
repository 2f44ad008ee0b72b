use thiserror::Error;

/// Fault classes used for per-core statistics aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum FaultClass {
    /// Instruction text did not name a known opcode.
    Decode,
    /// Register, literal, or address operand was malformed or out of range.
    Operand,
    /// Run exceeded the configured step budget.
    Budget,
}

/// Stable core fault taxonomy.
///
/// Every fault halts the core that raised it and finishes the bound task with
/// an error. Faults never escape the core as panics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
pub enum FaultCode {
    /// Unrecognised instruction mnemonic.
    #[error("invalid opcode")]
    InvalidOpcode = 0x01,
    /// Register index or memory address out of bounds, or malformed operand.
    #[error("invalid operand")]
    InvalidOperand = 0x02,
    /// Instruction count for one run crossed the configured budget.
    #[error("step budget exceeded")]
    BudgetExceeded = 0x03,
}

impl FaultCode {
    /// Converts a fault code to its stable byte value.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Converts a stable byte value back into a fault code.
    #[must_use]
    pub const fn from_u8(code: u8) -> Option<Self> {
        match code {
            0x01 => Some(Self::InvalidOpcode),
            0x02 => Some(Self::InvalidOperand),
            0x03 => Some(Self::BudgetExceeded),
            _ => None,
        }
    }

    /// Returns the statistics class for this fault code.
    #[must_use]
    pub const fn class(self) -> FaultClass {
        match self {
            Self::InvalidOpcode => FaultClass::Decode,
            Self::InvalidOperand => FaultClass::Operand,
            Self::BudgetExceeded => FaultClass::Budget,
        }
    }
}

/// Detailed reason behind a decode or execute fault.
///
/// Each reason maps onto exactly one [`FaultCode`] via [`FaultReason::code`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FaultReason {
    /// The instruction text contained no tokens.
    #[error("empty instruction")]
    EmptyInstruction,
    /// The first token is not a known mnemonic.
    #[error("unknown mnemonic `{0}`")]
    UnknownMnemonic(String),
    /// A non-zero data word was fetched as an instruction.
    #[error("data word {0} is not an instruction")]
    DataAsInstruction(i64),
    /// Operand count does not match the opcode's operand shape.
    #[error("{mnemonic} expects {expected} operand(s), found {found}")]
    OperandCount {
        /// Mnemonic being decoded.
        mnemonic: &'static str,
        /// Operand count required by the opcode.
        expected: usize,
        /// Operand count present in the text.
        found: usize,
    },
    /// Token in register position is not of the form `R<digit>`.
    #[error("malformed register token `{0}`")]
    MalformedRegister(String),
    /// Register digit is outside `R0..R3`.
    #[error("register R{0} is out of range")]
    RegisterOutOfRange(u8),
    /// Token in literal or address position is not an integer.
    #[error("malformed integer literal `{0}`")]
    MalformedLiteral(String),
    /// Address operand lies outside the core's memory.
    #[error("address {address} is outside memory of {capacity} cells")]
    AddressOutOfRange {
        /// Requested address.
        address: i64,
        /// Memory capacity in cells.
        capacity: usize,
    },
    /// `LOAD` targeted a cell that holds instruction text.
    #[error("cell {0} holds an instruction, not data")]
    NotData(usize),
    /// The run retired as many instructions as its budget allows.
    #[error("step budget of {0} instructions exhausted")]
    BudgetExhausted(u64),
}

impl FaultReason {
    /// Maps this reason onto the stable fault taxonomy.
    #[must_use]
    pub const fn code(&self) -> FaultCode {
        match self {
            Self::EmptyInstruction | Self::UnknownMnemonic(_) | Self::DataAsInstruction(_) => {
                FaultCode::InvalidOpcode
            }
            Self::OperandCount { .. }
            | Self::MalformedRegister(_)
            | Self::RegisterOutOfRange(_)
            | Self::MalformedLiteral(_)
            | Self::AddressOutOfRange { .. }
            | Self::NotData(_) => FaultCode::InvalidOperand,
            Self::BudgetExhausted(_) => FaultCode::BudgetExceeded,
        }
    }
}

/// Error returned when a program cannot be placed into core memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum LoadError {
    /// Program has more instructions than the core has memory cells.
    #[error("program of {len} instructions exceeds memory capacity of {capacity} cells")]
    ProgramTooLarge {
        /// Instruction count of the rejected program.
        len: usize,
        /// Memory capacity in cells.
        capacity: usize,
    },
}
