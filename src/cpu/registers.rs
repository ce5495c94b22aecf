//! The MiniMIPS register file.
//!
//! The emulated machine keeps a reduced set of 10 registers:
//! `$zero, $v0, $a0, $t0-$t3, $sp, $HI, $LO`. Each slot holds a plain
//! signed integer; there is no 32-bit wraparound model.

use crate::cpu::memory::MEMORY_SIZE;
use serde::{Deserialize, Serialize};

/// One of the 10 named register slots.
///
/// The discriminant doubles as the slot index and as the value placed in
/// the 5-bit register fields of the binary encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Register {
    /// `$zero`: always reads 0; writes are dropped.
    Zero = 0,
    /// `$v0`: syscall selector.
    V0 = 1,
    /// `$a0`: syscall argument.
    A0 = 2,
    /// `$t0`: temporary.
    T0 = 3,
    /// `$t1`: temporary.
    T1 = 4,
    /// `$t2`: temporary.
    T2 = 5,
    /// `$t3`: temporary.
    T3 = 6,
    /// `$sp`: stack pointer, reset to the last memory cell.
    Sp = 7,
    /// `$HI`: upper 32 bits of a `mult` product.
    Hi = 8,
    /// `$LO`: lower 32 bits of a `mult` product.
    Lo = 9,
}

/// All registers in slot order.
pub const REGISTERS: [Register; 10] = [
    Register::Zero,
    Register::V0,
    Register::A0,
    Register::T0,
    Register::T1,
    Register::T2,
    Register::T3,
    Register::Sp,
    Register::Hi,
    Register::Lo,
];

impl Register {
    /// Slot index in the register file (0-9).
    pub fn index(self) -> usize {
        self as usize
    }

    /// Source spelling, `$` prefix included.
    pub fn name(self) -> &'static str {
        match self {
            Register::Zero => "$zero",
            Register::V0 => "$v0",
            Register::A0 => "$a0",
            Register::T0 => "$t0",
            Register::T1 => "$t1",
            Register::T2 => "$t2",
            Register::T3 => "$t3",
            Register::Sp => "$sp",
            Register::Hi => "$HI",
            Register::Lo => "$LO",
        }
    }

    /// Look up a register by its source spelling.
    pub fn from_name(name: &str) -> Option<Register> {
        REGISTERS.iter().copied().find(|r| r.name() == name)
    }
}

impl std::fmt::Display for Register {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// The register file: a fixed array of 10 signed integer slots.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RegisterFile {
    values: [i64; 10],
}

impl RegisterFile {
    /// Create a register file in its reset state.
    pub fn new() -> Self {
        let mut regs = Self { values: [0; 10] };
        regs.reset();
        regs
    }

    /// Zero every register, then point `$sp` at the last memory cell.
    pub fn reset(&mut self) {
        self.values = [0; 10];
        self.values[Register::Sp.index()] = (MEMORY_SIZE - 1) as i64;
    }

    /// Read a register.
    pub fn read(&self, reg: Register) -> i64 {
        self.values[reg.index()]
    }

    /// Write a register.
    ///
    /// Writes to `$zero` are dropped; the return value tells the caller
    /// whether the write took effect, so it can log the suppression.
    pub fn write(&mut self, reg: Register, value: i64) -> bool {
        if reg == Register::Zero {
            return false;
        }
        self.values[reg.index()] = value;
        true
    }

    /// Force `$zero` back to 0. Invoked after every executed instruction.
    pub fn enforce_zero(&mut self) {
        self.values[Register::Zero.index()] = 0;
    }

    /// Snapshot of the full named register file, in slot order.
    pub fn snapshot(&self) -> [(Register, i64); 10] {
        let mut out = [(Register::Zero, 0); 10];
        for (slot, reg) in REGISTERS.iter().enumerate() {
            out[slot] = (*reg, self.values[slot]);
        }
        out
    }
}

impl Default for RegisterFile {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_roundtrip() {
        for reg in REGISTERS {
            assert_eq!(Register::from_name(reg.name()), Some(reg));
        }
        assert_eq!(Register::from_name("$s0"), None);
        assert_eq!(Register::from_name("zero"), None);
    }

    #[test]
    fn test_reset_points_sp_at_top_of_memory() {
        let regs = RegisterFile::new();
        assert_eq!(regs.read(Register::Sp), (MEMORY_SIZE - 1) as i64);
        assert_eq!(regs.read(Register::T0), 0);
    }

    #[test]
    fn test_zero_write_is_dropped() {
        let mut regs = RegisterFile::new();
        assert!(!regs.write(Register::Zero, 42));
        assert_eq!(regs.read(Register::Zero), 0);

        assert!(regs.write(Register::T1, 42));
        assert_eq!(regs.read(Register::T1), 42);
    }

    #[test]
    fn test_indices_match_encoding_order() {
        assert_eq!(Register::Zero.index(), 0);
        assert_eq!(Register::Sp.index(), 7);
        assert_eq!(Register::Lo.index(), 9);
    }
}
