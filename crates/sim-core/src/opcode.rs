/// Opcodes of the text instruction set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[allow(missing_docs)]
pub enum Opcode {
    Mov,
    Add,
    Sub,
    Load,
    Store,
    Jmp,
    Jz,
    Jnz,
    Hlt,
}

/// Operand layout accepted by an opcode, in source order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperandShape {
    /// No operands (`HLT`).
    None,
    /// One address (`JMP addr`).
    Address,
    /// Register then integer literal (`MOV Rd imm`).
    RegisterImmediate,
    /// Register then register (`ADD Rd Rs`).
    RegisterRegister,
    /// Register then address (`LOAD Rd addr`, `JZ Rs addr`).
    RegisterAddress,
}

impl OperandShape {
    /// Number of operand tokens this shape consumes.
    #[must_use]
    pub const fn arity(self) -> usize {
        match self {
            Self::None => 0,
            Self::Address => 1,
            Self::RegisterImmediate | Self::RegisterRegister | Self::RegisterAddress => 2,
        }
    }
}

/// One row of the mnemonic table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpcodeEntry {
    /// Case-sensitive source mnemonic.
    pub mnemonic: &'static str,
    /// Opcode the mnemonic resolves to.
    pub opcode: Opcode,
    /// Operand layout.
    pub shape: OperandShape,
}

/// Canonical mnemonic table in opcode declaration order.
pub const OPCODE_TABLE: [OpcodeEntry; 9] = [
    OpcodeEntry {
        mnemonic: "MOV",
        opcode: Opcode::Mov,
        shape: OperandShape::RegisterImmediate,
    },
    OpcodeEntry {
        mnemonic: "ADD",
        opcode: Opcode::Add,
        shape: OperandShape::RegisterRegister,
    },
    OpcodeEntry {
        mnemonic: "SUB",
        opcode: Opcode::Sub,
        shape: OperandShape::RegisterRegister,
    },
    OpcodeEntry {
        mnemonic: "LOAD",
        opcode: Opcode::Load,
        shape: OperandShape::RegisterAddress,
    },
    OpcodeEntry {
        mnemonic: "STORE",
        opcode: Opcode::Store,
        shape: OperandShape::RegisterAddress,
    },
    OpcodeEntry {
        mnemonic: "JMP",
        opcode: Opcode::Jmp,
        shape: OperandShape::Address,
    },
    OpcodeEntry {
        mnemonic: "JZ",
        opcode: Opcode::Jz,
        shape: OperandShape::RegisterAddress,
    },
    OpcodeEntry {
        mnemonic: "JNZ",
        opcode: Opcode::Jnz,
        shape: OperandShape::RegisterAddress,
    },
    OpcodeEntry {
        mnemonic: "HLT",
        opcode: Opcode::Hlt,
        shape: OperandShape::None,
    },
];

/// Resolves a source mnemonic. Matching is exact and case-sensitive.
#[must_use]
pub fn lookup_mnemonic(mnemonic: &str) -> Option<&'static OpcodeEntry> {
    OPCODE_TABLE.iter().find(|entry| entry.mnemonic == mnemonic)
}

impl Opcode {
    /// Returns the table entry for this opcode.
    #[must_use]
    pub const fn entry(self) -> &'static OpcodeEntry {
        &OPCODE_TABLE[self as usize]
    }

    /// Returns the canonical source mnemonic.
    #[must_use]
    pub const fn mnemonic(self) -> &'static str {
        self.entry().mnemonic
    }

    /// Returns the operand layout.
    #[must_use]
    pub const fn shape(self) -> OperandShape {
        self.entry().shape
    }
}
