//! # MiniMIPS Emulator
//!
//! An emulator core for a reduced MIPS teaching architecture: 10
//! registers, 256 memory cells, a 13-instruction subset and three
//! syscalls. Programs are plain assembly text with `.data` and `.text`
//! segments.
//!
//! ```
//! use minimips::Machine;
//!
//! let mut machine = Machine::new();
//! machine
//!     .load_source(
//!         ".text\n\
//!          addi $t0, $zero, 40\n\
//!          addi $t1, $zero, 2\n\
//!          add  $a0, $t0, $t1\n\
//!          addi $v0, $zero, 1\n\
//!          syscall\n\
//!          addi $v0, $zero, 10\n\
//!          syscall\n",
//!     )
//!     .unwrap();
//! let result = machine.run();
//! assert!(machine.is_halted());
//! assert_eq!(result.steps, 7);
//! ```

pub mod asm;
pub mod cpu;

// Re-export commonly used types
pub use asm::{encode, parse, Assembly, LoadError, SymbolTable};
pub use cpu::{
    EventLog, ExecutionError, Instruction, LogEntry, LogLevel, Machine, MachineState, Memory,
    MemoryError, OpKind, Program, Register, RegisterFile, RunResult, StepResult, MEMORY_SIZE,
};
