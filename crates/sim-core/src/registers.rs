//! Register identifiers and the per-core register file.

use std::fmt;

use crate::FaultReason;

/// Number of architecturally visible general-purpose registers (`R0..R3`).
pub const REGISTER_COUNT: usize = 4;

/// General-purpose register identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
#[allow(missing_docs)]
pub enum Register {
    R0 = 0,
    R1 = 1,
    R2 = 2,
    R3 = 3,
}

impl Register {
    /// Ordered list of all general-purpose registers.
    pub const ALL: [Self; REGISTER_COUNT] = [Self::R0, Self::R1, Self::R2, Self::R3];

    /// Returns the array index for this register (`0..=3`).
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Converts a register index into an identifier.
    #[must_use]
    pub const fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(Self::R0),
            1 => Some(Self::R1),
            2 => Some(Self::R2),
            3 => Some(Self::R3),
            _ => None,
        }
    }

    /// Parses a register token: `R` followed by exactly one decimal digit.
    ///
    /// # Errors
    ///
    /// Returns [`FaultReason::MalformedRegister`] when the token shape is wrong
    /// and [`FaultReason::RegisterOutOfRange`] for digits above 3.
    pub fn parse(token: &str) -> Result<Self, FaultReason> {
        let bytes = token.as_bytes();
        match bytes {
            [b'R', digit @ b'0'..=b'9'] => {
                let index = digit - b'0';
                Self::from_index(index).ok_or(FaultReason::RegisterOutOfRange(index))
            }
            _ => Err(FaultReason::MalformedRegister(token.to_string())),
        }
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R{}", self.index())
    }
}

/// Zero-initialised register file owned by one core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct RegisterFile {
    values: [i64; REGISTER_COUNT],
}

impl RegisterFile {
    /// Reads a register.
    #[must_use]
    pub const fn get(&self, reg: Register) -> i64 {
        self.values[reg.index()]
    }

    /// Writes a register.
    pub const fn set(&mut self, reg: Register, value: i64) {
        self.values[reg.index()] = value;
    }

    /// Returns all register values in index order.
    #[must_use]
    pub const fn values(&self) -> [i64; REGISTER_COUNT] {
        self.values
    }

    /// Clears every register to zero.
    pub const fn clear(&mut self) {
        self.values = [0; REGISTER_COUNT];
    }
}
