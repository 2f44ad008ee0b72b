//! Shared instruction/data address space of one core.

use std::sync::Arc;

use crate::{FaultReason, LoadError, Program};

/// Default memory capacity in cells.
pub const DEFAULT_MEMORY_CELLS: usize = 256;

/// One memory cell. Instructions and data share the address space.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Cell {
    /// Integer data word. Never-written cells hold `Data(0)`.
    Data(i64),
    /// Instruction text, stored byte-for-byte as submitted.
    Instruction(Arc<str>),
}

impl Default for Cell {
    fn default() -> Self {
        Self::Data(0)
    }
}

impl Cell {
    /// Returns true for a zero data word, which ends a run when fetched.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        matches!(self, Self::Data(0))
    }

    /// Returns the data word, if this cell holds data.
    #[must_use]
    pub const fn data(&self) -> Option<i64> {
        match self {
            Self::Data(value) => Some(*value),
            Self::Instruction(_) => None,
        }
    }
}

/// Fixed-capacity cell array. Capacity never changes after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Memory {
    cells: Box<[Cell]>,
}

impl Memory {
    /// Allocates zeroed memory with `capacity` cells.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            cells: vec![Cell::default(); capacity].into_boxed_slice(),
        }
    }

    /// Number of addressable cells.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.cells.len()
    }

    /// Returns the cell at `addr`, or `None` past the end of memory.
    #[must_use]
    pub fn get(&self, addr: usize) -> Option<&Cell> {
        self.cells.get(addr)
    }

    /// All cells in address order.
    #[must_use]
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// First `len` cells (fewer if memory is smaller).
    #[must_use]
    pub fn head(&self, len: usize) -> &[Cell] {
        &self.cells[..len.min(self.cells.len())]
    }

    /// Validates an address operand against the memory bounds.
    ///
    /// # Errors
    ///
    /// Returns [`FaultReason::AddressOutOfRange`] for negative addresses and
    /// addresses at or past capacity.
    pub fn resolve(&self, addr: i64) -> Result<usize, FaultReason> {
        usize::try_from(addr)
            .ok()
            .filter(|index| *index < self.cells.len())
            .ok_or(FaultReason::AddressOutOfRange {
                address: addr,
                capacity: self.cells.len(),
            })
    }

    /// Reads a data word.
    ///
    /// # Errors
    ///
    /// Returns [`FaultReason::AddressOutOfRange`] for an invalid address and
    /// [`FaultReason::NotData`] when the cell holds instruction text.
    pub fn read_data(&self, addr: i64) -> Result<i64, FaultReason> {
        let index = self.resolve(addr)?;
        self.cells[index].data().ok_or(FaultReason::NotData(index))
    }

    /// Writes a data word, replacing whatever the cell held.
    ///
    /// # Errors
    ///
    /// Returns [`FaultReason::AddressOutOfRange`] for an invalid address.
    pub fn write_data(&mut self, addr: i64, value: i64) -> Result<(), FaultReason> {
        let index = self.resolve(addr)?;
        self.cells[index] = Cell::Data(value);
        Ok(())
    }

    /// Zeroes every cell.
    pub fn clear(&mut self) {
        self.cells.fill(Cell::default());
    }

    /// Zeroes memory, then copies the program's instructions from address 0.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::ProgramTooLarge`] without touching memory when the
    /// program has more instructions than there are cells.
    pub fn load_program(&mut self, program: &Program) -> Result<(), LoadError> {
        if program.len() > self.cells.len() {
            return Err(LoadError::ProgramTooLarge {
                len: program.len(),
                capacity: self.cells.len(),
            });
        }
        self.clear();
        for (cell, text) in self.cells.iter_mut().zip(program.iter()) {
            *cell = Cell::Instruction(Arc::clone(text));
        }
        Ok(())
    }
}
