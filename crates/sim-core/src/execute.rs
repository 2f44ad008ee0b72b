//! Instruction execution semantics.
//!
//! Every opcode validates all of its operands before its single state
//! mutation, so a faulting instruction leaves registers, memory and PC as
//! they were after fetch.

use crate::{FaultReason, Instruction, Memory, RegisterFile};

/// Control-flow result of one executed instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    /// Keep fetching.
    Continue,
    /// `HLT` retired.
    Halt,
}

/// Mutable architectural state touched by execution.
#[derive(Debug)]
pub struct ExecuteState<'a> {
    /// Register file.
    pub registers: &'a mut RegisterFile,
    /// Memory block.
    pub memory: &'a mut Memory,
    /// Program counter, already advanced past the executing instruction.
    pub pc: &'a mut usize,
}

/// Executes one decoded instruction against core state.
///
/// # Errors
///
/// Returns [`FaultReason::AddressOutOfRange`] for memory or jump addresses
/// outside the core's memory and [`FaultReason::NotData`] when `LOAD` reads an
/// instruction cell.
pub fn execute_instruction(
    instr: &Instruction,
    state: &mut ExecuteState<'_>,
) -> Result<Control, FaultReason> {
    match *instr {
        Instruction::Mov { rd, imm } => state.registers.set(rd, imm),
        Instruction::Add { rd, rs } => {
            let value = state.registers.get(rd).wrapping_add(state.registers.get(rs));
            state.registers.set(rd, value);
        }
        Instruction::Sub { rd, rs } => {
            let value = state.registers.get(rd).wrapping_sub(state.registers.get(rs));
            state.registers.set(rd, value);
        }
        Instruction::Load { rd, addr } => {
            let value = state.memory.read_data(addr)?;
            state.registers.set(rd, value);
        }
        Instruction::Store { rs, addr } => {
            state.memory.write_data(addr, state.registers.get(rs))?;
        }
        Instruction::Jmp { addr } => jump(state, addr, true)?,
        Instruction::Jz { rs, addr } => jump(state, addr, state.registers.get(rs) == 0)?,
        Instruction::Jnz { rs, addr } => jump(state, addr, state.registers.get(rs) != 0)?,
        Instruction::Hlt => return Ok(Control::Halt),
    }
    Ok(Control::Continue)
}

// Targets are validated even when the branch is not taken.
fn jump(state: &mut ExecuteState<'_>, addr: i64, taken: bool) -> Result<(), FaultReason> {
    let target = state.memory.resolve(addr)?;
    if taken {
        *state.pc = target;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{execute_instruction, Control, ExecuteState};
    use crate::{FaultReason, Instruction, Memory, Register, RegisterFile};

    fn exec(
        text: &str,
        registers: &mut RegisterFile,
        memory: &mut Memory,
        pc: &mut usize,
    ) -> Result<Control, FaultReason> {
        let instr = Instruction::decode(text).expect("test instruction decodes");
        let mut state = ExecuteState {
            registers,
            memory,
            pc,
        };
        execute_instruction(&instr, &mut state)
    }

    #[test]
    fn add_and_sub_wrap_on_overflow() {
        let mut registers = RegisterFile::default();
        let mut memory = Memory::new(4);
        let mut pc = 1;
        registers.set(Register::R0, i64::MAX);
        registers.set(Register::R1, 1);

        exec("ADD R0 R1", &mut registers, &mut memory, &mut pc).expect("add executes");
        assert_eq!(registers.get(Register::R0), i64::MIN);

        exec("SUB R0 R1", &mut registers, &mut memory, &mut pc).expect("sub executes");
        assert_eq!(registers.get(Register::R0), i64::MAX);
    }

    #[test]
    fn conditional_jumps_follow_register_value() {
        let mut registers = RegisterFile::default();
        let mut memory = Memory::new(8);
        let mut pc = 1;

        exec("JNZ R0 5", &mut registers, &mut memory, &mut pc).expect("jnz executes");
        assert_eq!(pc, 1);
        exec("JZ R0 5", &mut registers, &mut memory, &mut pc).expect("jz executes");
        assert_eq!(pc, 5);

        registers.set(Register::R2, -3);
        exec("JNZ R2 2", &mut registers, &mut memory, &mut pc).expect("jnz executes");
        assert_eq!(pc, 2);
    }

    #[test]
    fn untaken_jump_with_bad_target_still_faults() {
        let mut registers = RegisterFile::default();
        registers.set(Register::R0, 1);
        let mut memory = Memory::new(8);
        let mut pc = 1;

        let err = exec("JZ R0 8", &mut registers, &mut memory, &mut pc)
            .expect_err("target outside memory");
        assert_eq!(
            err,
            FaultReason::AddressOutOfRange {
                address: 8,
                capacity: 8
            }
        );
        assert_eq!(pc, 1);
    }

    #[test]
    fn faulting_store_leaves_memory_untouched() {
        let mut registers = RegisterFile::default();
        registers.set(Register::R1, 42);
        let mut memory = Memory::new(4);
        let mut pc = 0;

        assert!(exec("STORE R1 -1", &mut registers, &mut memory, &mut pc).is_err());
        assert!(memory.cells().iter().all(crate::Cell::is_empty));
    }

    #[test]
    fn hlt_reports_halt_without_touching_pc() {
        let mut registers = RegisterFile::default();
        let mut memory = Memory::new(4);
        let mut pc = 3;
        assert_eq!(
            exec("HLT", &mut registers, &mut memory, &mut pc),
            Ok(Control::Halt)
        );
        assert_eq!(pc, 3);
    }
}
