//! Instruction representation for the MiniMIPS.
//!
//! Mnemonics are resolved into the closed [`OpKind`] set when the program
//! is loaded, so the engine dispatches on an enum variant instead of
//! comparing strings on every step. Operand tokens stay in source order
//! and are resolved during execution; that is where a bad register name
//! or a non-numeric immediate surfaces as a fault.

use serde::{Deserialize, Serialize};

/// The instruction kinds the emulated machine knows about.
///
/// Supported set: `add, addi, sub, mult, and, or, sll, lw, sw, lui, slt,
/// slti, syscall`. `la` never appears here; the loader expands it into
/// `addi` before the program is installed. Anything else becomes
/// [`OpKind::Unknown`] and faults when it is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpKind {
    /// `add rd, rs, rt`: rd = rs + rt
    Add,
    /// `addi rt, rs, imm`: rt = rs + imm
    Addi,
    /// `sub rd, rs, rt`: rd = rs - rt
    Sub,
    /// `mult rs, rt`: ($HI, $LO) = rs * rt
    Mult,
    /// `and rd, rs, rt`: rd = rs & rt
    And,
    /// `or rd, rs, rt`: rd = rs | rt
    Or,
    /// `sll rd, rt, shamt`: rd = rt << shamt
    Sll,
    /// `lw rt, offset(base)`: rt = memory[offset + base]
    Lw,
    /// `sw rt, offset(base)`: memory[offset + base] = rt (or a literal)
    Sw,
    /// `lui rt, imm`: rt = imm << 16
    Lui,
    /// `slt rd, rs, rt`: rd = (rs < rt) ? 1 : 0
    Slt,
    /// `slti rt, rs, imm`: rt = (rs < imm) ? 1 : 0
    Slti,
    /// `syscall`: dispatch on `$v0` (1 = print int, 4 = print string,
    /// 10 = halt)
    Syscall,
    /// Unrecognized mnemonic; faults with `UnknownInstruction` on execute.
    Unknown,
}

impl OpKind {
    /// Map a source mnemonic to its kind.
    pub fn from_mnemonic(mnemonic: &str) -> OpKind {
        match mnemonic {
            "add" => OpKind::Add,
            "addi" => OpKind::Addi,
            "sub" => OpKind::Sub,
            "mult" => OpKind::Mult,
            "and" => OpKind::And,
            "or" => OpKind::Or,
            "sll" => OpKind::Sll,
            "lw" => OpKind::Lw,
            "sw" => OpKind::Sw,
            "lui" => OpKind::Lui,
            "slt" => OpKind::Slt,
            "slti" => OpKind::Slti,
            "syscall" => OpKind::Syscall,
            _ => OpKind::Unknown,
        }
    }
}

/// One loaded instruction: resolved kind, source mnemonic and operand
/// tokens in source order. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    /// Instruction kind, fixed at load time.
    pub kind: OpKind,
    /// The mnemonic as written in the source (kept for display and for
    /// the `UnknownInstruction` fault message).
    pub mnemonic: String,
    /// Operand tokens: register names, labels already resolved to
    /// integers, or integer literals. Commas and parentheses were token
    /// separators, so `4($sp)` arrives as `["4", "$sp"]`.
    pub args: Vec<String>,
}

impl Instruction {
    /// Build an instruction from a mnemonic and operand tokens.
    pub fn new(mnemonic: &str, args: Vec<String>) -> Self {
        Self {
            kind: OpKind::from_mnemonic(mnemonic),
            mnemonic: mnemonic.to_string(),
            args,
        }
    }
}

impl std::fmt::Display for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.args.is_empty() {
            f.write_str(&self.mnemonic)
        } else {
            write!(f, "{} {}", self.mnemonic, self.args.join(", "))
        }
    }
}

/// An ordered, fixed-length sequence of instructions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    instructions: Vec<Instruction>,
}

impl Program {
    /// Create an empty program.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, instruction: Instruction) {
        self.instructions.push(instruction);
    }

    /// Number of instructions.
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// True if the program has no instructions.
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// The instruction at `pc`, if any.
    pub fn get(&self, pc: usize) -> Option<&Instruction> {
        self.instructions.get(pc)
    }

    /// Iterate over the instructions in order.
    pub fn iter(&self) -> impl Iterator<Item = &Instruction> {
        self.instructions.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mnemonic_mapping_is_closed() {
        assert_eq!(OpKind::from_mnemonic("add"), OpKind::Add);
        assert_eq!(OpKind::from_mnemonic("syscall"), OpKind::Syscall);
        assert_eq!(OpKind::from_mnemonic("beq"), OpKind::Unknown);
        assert_eq!(OpKind::from_mnemonic("j"), OpKind::Unknown);
        assert_eq!(OpKind::from_mnemonic("ADD"), OpKind::Unknown);
    }

    #[test]
    fn test_display_source_order() {
        let ins = Instruction::new(
            "add",
            vec!["$t0".into(), "$t1".into(), "$t2".into()],
        );
        assert_eq!(ins.to_string(), "add $t0, $t1, $t2");

        let ins = Instruction::new("syscall", vec![]);
        assert_eq!(ins.to_string(), "syscall");
    }
}
