//! Text instruction decoder.
//!
//! Instructions are whitespace-separated tokens with the mnemonic first, for
//! example `MOV R0 10`, `JZ R3 10` or `HLT`. Decoding is pure: it validates
//! token shapes and register indices but not addresses, which depend on the
//! memory capacity of the executing core.

use std::fmt;
use std::str::FromStr;

use crate::opcode::{lookup_mnemonic, Opcode};
use crate::{FaultReason, Register};

/// A decoded instruction with typed operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum Instruction {
    Mov { rd: Register, imm: i64 },
    Add { rd: Register, rs: Register },
    Sub { rd: Register, rs: Register },
    Load { rd: Register, addr: i64 },
    Store { rs: Register, addr: i64 },
    Jmp { addr: i64 },
    Jz { rs: Register, addr: i64 },
    Jnz { rs: Register, addr: i64 },
    Hlt,
}

impl Instruction {
    /// Decodes one instruction text.
    ///
    /// # Errors
    ///
    /// Returns a [`FaultReason`] mapping to `InvalidOpcode` for empty text or
    /// an unknown mnemonic, and to `InvalidOperand` for a wrong operand count,
    /// malformed tokens, or a register index above 3.
    pub fn decode(text: &str) -> Result<Self, FaultReason> {
        let mut tokens = text.split_whitespace();
        let mnemonic = tokens.next().ok_or(FaultReason::EmptyInstruction)?;
        let entry = lookup_mnemonic(mnemonic)
            .ok_or_else(|| FaultReason::UnknownMnemonic(mnemonic.to_string()))?;

        let operands: Vec<&str> = tokens.collect();
        let expected = entry.shape.arity();
        if operands.len() != expected {
            return Err(FaultReason::OperandCount {
                mnemonic: entry.mnemonic,
                expected,
                found: operands.len(),
            });
        }

        let register = |index: usize| Register::parse(operands[index]);
        let literal = |index: usize| parse_literal(operands[index]);

        Ok(match entry.opcode {
            Opcode::Mov => Self::Mov {
                rd: register(0)?,
                imm: literal(1)?,
            },
            Opcode::Add => Self::Add {
                rd: register(0)?,
                rs: register(1)?,
            },
            Opcode::Sub => Self::Sub {
                rd: register(0)?,
                rs: register(1)?,
            },
            Opcode::Load => Self::Load {
                rd: register(0)?,
                addr: literal(1)?,
            },
            Opcode::Store => Self::Store {
                rs: register(0)?,
                addr: literal(1)?,
            },
            Opcode::Jmp => Self::Jmp { addr: literal(0)? },
            Opcode::Jz => Self::Jz {
                rs: register(0)?,
                addr: literal(1)?,
            },
            Opcode::Jnz => Self::Jnz {
                rs: register(0)?,
                addr: literal(1)?,
            },
            Opcode::Hlt => Self::Hlt,
        })
    }

    /// Returns the opcode of this instruction.
    #[must_use]
    pub const fn opcode(&self) -> Opcode {
        match self {
            Self::Mov { .. } => Opcode::Mov,
            Self::Add { .. } => Opcode::Add,
            Self::Sub { .. } => Opcode::Sub,
            Self::Load { .. } => Opcode::Load,
            Self::Store { .. } => Opcode::Store,
            Self::Jmp { .. } => Opcode::Jmp,
            Self::Jz { .. } => Opcode::Jz,
            Self::Jnz { .. } => Opcode::Jnz,
            Self::Hlt => Opcode::Hlt,
        }
    }
}

fn parse_literal(token: &str) -> Result<i64, FaultReason> {
    token
        .parse::<i64>()
        .map_err(|_| FaultReason::MalformedLiteral(token.to_string()))
}

impl FromStr for Instruction {
    type Err = FaultReason;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode(s)
    }
}

/// Renders the canonical single-space text form.
impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mnemonic = self.opcode().mnemonic();
        match *self {
            Self::Mov { rd, imm } => write!(f, "{mnemonic} {rd} {imm}"),
            Self::Add { rd, rs } | Self::Sub { rd, rs } => write!(f, "{mnemonic} {rd} {rs}"),
            Self::Load { rd: reg, addr }
            | Self::Store { rs: reg, addr }
            | Self::Jz { rs: reg, addr }
            | Self::Jnz { rs: reg, addr } => write!(f, "{mnemonic} {reg} {addr}"),
            Self::Jmp { addr } => write!(f, "{mnemonic} {addr}"),
            Self::Hlt => f.write_str(mnemonic),
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::Instruction;
    use crate::{FaultCode, FaultReason, Register};

    #[rstest]
    #[case("MOV R0 10", Instruction::Mov { rd: Register::R0, imm: 10 })]
    #[case("MOV R3 -4", Instruction::Mov { rd: Register::R3, imm: -4 })]
    #[case("ADD R0 R1", Instruction::Add { rd: Register::R0, rs: Register::R1 })]
    #[case("SUB R2 R2", Instruction::Sub { rd: Register::R2, rs: Register::R2 })]
    #[case("LOAD R1 50", Instruction::Load { rd: Register::R1, addr: 50 })]
    #[case("STORE R0 0", Instruction::Store { rs: Register::R0, addr: 0 })]
    #[case("JMP 6", Instruction::Jmp { addr: 6 })]
    #[case("JZ R3 10", Instruction::Jz { rs: Register::R3, addr: 10 })]
    #[case("JNZ R1 2", Instruction::Jnz { rs: Register::R1, addr: 2 })]
    #[case("HLT", Instruction::Hlt)]
    fn decodes_every_opcode(#[case] text: &str, #[case] expected: Instruction) {
        assert_eq!(Instruction::decode(text), Ok(expected));
        assert_eq!(expected.to_string(), text);
    }

    #[test]
    fn tolerates_extra_whitespace_between_tokens() {
        assert_eq!(
            "  MOV\tR1   20 ".parse::<Instruction>(),
            Ok(Instruction::Mov {
                rd: Register::R1,
                imm: 20
            })
        );
    }

    #[rstest]
    #[case("", FaultCode::InvalidOpcode)]
    #[case("NOP", FaultCode::InvalidOpcode)]
    #[case("mov R0 1", FaultCode::InvalidOpcode)]
    #[case("MOV R0", FaultCode::InvalidOperand)]
    #[case("HLT R0", FaultCode::InvalidOperand)]
    #[case("MOV R7 1", FaultCode::InvalidOperand)]
    #[case("ADD R0 5", FaultCode::InvalidOperand)]
    #[case("MOV R0 ten", FaultCode::InvalidOperand)]
    #[case("JMP R1", FaultCode::InvalidOperand)]
    fn rejects_malformed_text(#[case] text: &str, #[case] code: FaultCode) {
        let reason = Instruction::decode(text).expect_err("text should not decode");
        assert_eq!(reason.code(), code, "{text:?} -> {reason}");
    }

    #[test]
    fn operand_count_error_names_the_mnemonic() {
        assert_eq!(
            Instruction::decode("JZ R0"),
            Err(FaultReason::OperandCount {
                mnemonic: "JZ",
                expected: 2,
                found: 1
            })
        );
    }
}
