//! Machine emulation for the MiniMIPS.
//!
//! This module implements the reduced MIPS teaching architecture:
//! - 256 integer memory cells
//! - 10 registers: $zero, $v0, $a0, $t0-$t3, $sp, $HI, $LO
//! - 13-instruction set plus the `la` pseudo-instruction
//! - syscalls 1 (print int), 4 (print string), 10 (halt)

pub mod execute;
pub mod instruction;
pub mod memory;
pub mod registers;

pub use execute::{
    EventLog, ExecutionError, LogEntry, LogLevel, Machine, MachineState, RunResult, StepResult,
};
pub use instruction::{Instruction, OpKind, Program};
pub use memory::{Memory, MemoryError, MEMORY_SIZE};
pub use registers::{Register, RegisterFile, REGISTERS};
