//! The MiniMIPS machine: state, decode-execute engine and run control.
//!
//! A [`Machine`] owns the register file, memory, loaded program, symbol
//! table, program counter and event log; nothing lives outside it. All
//! mutation happens inside [`Machine::step`], called from a single
//! control thread. Control flow is strictly sequential: the only way a
//! program ends is running off the end, a halting syscall, or a fault.

use crate::asm::assembler::{self, Assembly, LoadError, SymbolTable};
use crate::cpu::instruction::{Instruction, OpKind, Program};
use crate::cpu::memory::{Memory, MemoryError};
use crate::cpu::registers::{Register, RegisterFile};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Machine execution state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MachineState {
    /// Ready to execute the next instruction.
    Running,
    /// Execution finished (halting syscall or end of program).
    Halted,
    /// Execution aborted; the reason is terminal until the next load.
    Faulted(ExecutionError),
}

/// Outcome of a single [`Machine::step`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepResult {
    /// One instruction executed; the machine is still running.
    Executed,
    /// The machine is halted (now or from an earlier step).
    Halted,
    /// The machine is faulted (now or from an earlier step).
    Faulted(ExecutionError),
}

/// Outcome of a [`Machine::run`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunResult {
    /// Instructions executed by this run call.
    pub steps: u64,
    /// The machine state the run stopped in.
    pub state: MachineState,
}

/// Errors that abort execution.
///
/// Each becomes exactly one error log entry plus a terminal machine
/// state; mutations made by earlier instructions are preserved.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum ExecutionError {
    /// The mnemonic is not part of the emulated instruction set.
    #[error("unknown instruction '{0}'")]
    UnknownInstruction(String),

    /// A `lw`/`sw` address fell outside memory.
    #[error("memory fault: {0}")]
    MemoryFault(#[from] MemoryError),

    /// `syscall` with an unsupported `$v0` code.
    #[error("unknown syscall code {0}")]
    UnknownSyscall(i64),

    /// An operand token could not be resolved.
    #[error("malformed operand for {mnemonic}: {reason}")]
    MalformedOperand { mnemonic: String, reason: String },
}

/// Severity of an event log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    Info,
    Error,
}

/// One line of the machine's event log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
}

/// Append-only event log: the execution trace, syscall output and
/// fault reports, in order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventLog {
    entries: Vec<LogEntry>,
}

impl EventLog {
    fn push_info(&mut self, message: String) {
        self.entries.push(LogEntry {
            level: LogLevel::Info,
            message,
        });
    }

    fn push_error(&mut self, message: String) {
        self.entries.push(LogEntry {
            level: LogLevel::Error,
            message,
        });
    }

    fn clear(&mut self) {
        self.entries.clear();
    }

    /// All entries, oldest first.
    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// Iterate over the entries, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }
}

/// Whether execution continues after an instruction.
enum Flow {
    Continue,
    Halt,
}

/// The MiniMIPS machine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Machine {
    regs: RegisterFile,
    mem: Memory,
    program: Program,
    symbols: SymbolTable,
    pc: usize,
    state: MachineState,
    log: EventLog,
    /// Instructions executed since the last reset (for reporting).
    steps: u64,
}

impl Machine {
    /// Create a machine in its reset state.
    pub fn new() -> Self {
        Self {
            regs: RegisterFile::new(),
            mem: Memory::new(),
            program: Program::new(),
            symbols: SymbolTable::default(),
            pc: 0,
            state: MachineState::Running,
            log: EventLog::default(),
            steps: 0,
        }
    }

    /// Reset to the initial state: zero memory, zero registers except
    /// `$sp`, clear program, symbols and log, program counter to 0.
    pub fn reset(&mut self) {
        self.regs.reset();
        self.mem.clear();
        self.program = Program::new();
        self.symbols = SymbolTable::default();
        self.pc = 0;
        self.state = MachineState::Running;
        self.steps = 0;
        self.log.clear();
        self.log.push_info("machine reset".to_string());
    }

    /// Read a source file and load it.
    ///
    /// An unreadable path is a [`LoadError::FileNotFound`].
    pub fn load_path<P: AsRef<Path>>(&mut self, path: P) -> Result<(), LoadError> {
        let path = path.as_ref();
        let source =
            std::fs::read_to_string(path).map_err(|_| LoadError::FileNotFound {
                path: path.display().to_string(),
            })?;
        self.load_source(&source)
    }

    /// Reset, then parse and install a program.
    ///
    /// On any load error the machine stays at its post-reset values; no
    /// partial program is installed. The error is logged and returned.
    pub fn load_source(&mut self, source: &str) -> Result<(), LoadError> {
        self.reset();

        let Assembly {
            program,
            symbols,
            data,
        } = match assembler::parse(source) {
            Ok(assembly) => assembly,
            Err(err) => {
                self.log.push_error(format!("load failed: {}", err));
                return Err(err);
            }
        };

        // The loader bounds the data image, so this only fires for
        // images built outside the assembler.
        if let Err(err) = self.mem.install_data(&data) {
            let err = LoadError::MalformedDataLine {
                line: 0,
                reason: err.to_string(),
            };
            self.mem.clear();
            self.log.push_error(format!("load failed: {}", err));
            return Err(err);
        }

        self.log.push_info(format!(
            "loaded {} instructions, {} data cells, {} labels",
            program.len(),
            data.len(),
            symbols.len()
        ));
        self.program = program;
        self.symbols = symbols;
        Ok(())
    }

    /// Execute exactly one instruction.
    ///
    /// A halted or faulted machine reports its terminal state without
    /// touching anything; no program counter value is ever executed
    /// twice without an intervening reset or load.
    pub fn step(&mut self) -> StepResult {
        match &self.state {
            MachineState::Halted => return StepResult::Halted,
            MachineState::Faulted(err) => return StepResult::Faulted(err.clone()),
            MachineState::Running => {}
        }

        let ins = match self.program.get(self.pc) {
            Some(ins) => ins.clone(),
            None => {
                self.state = MachineState::Halted;
                self.log.push_info("end of program reached".to_string());
                return StepResult::Halted;
            }
        };

        self.log
            .push_info(format!("PC={}: executing -> {}", self.pc, ins));

        match self.execute(&ins) {
            Ok(Flow::Continue) => {
                self.regs.enforce_zero();
                self.pc += 1;
                self.steps += 1;
                StepResult::Executed
            }
            Ok(Flow::Halt) => {
                self.regs.enforce_zero();
                self.pc = self.program.len();
                self.steps += 1;
                self.state = MachineState::Halted;
                self.log.push_info("syscall: execution halted".to_string());
                StepResult::Halted
            }
            Err(err) => {
                self.log
                    .push_error(format!("execution error at PC={}: {}", self.pc, err));
                self.pc = self.program.len();
                self.state = MachineState::Faulted(err.clone());
                StepResult::Faulted(err)
            }
        }
    }

    /// Step until the machine halts, faults, or runs out of program.
    pub fn run(&mut self) -> RunResult {
        self.run_limited(u64::MAX)
    }

    /// Like [`Machine::run`] but stops after at most `max_steps`
    /// instructions, leaving the machine running.
    pub fn run_limited(&mut self, max_steps: u64) -> RunResult {
        let start = self.steps;

        while self.steps - start < max_steps {
            match self.step() {
                StepResult::Executed => {}
                StepResult::Halted | StepResult::Faulted(_) => break,
            }
        }

        let steps = self.steps - start;
        if steps == max_steps && matches!(self.state, MachineState::Running) {
            self.log
                .push_info(format!("step limit of {} reached", max_steps));
        }

        RunResult {
            steps,
            state: self.state.clone(),
        }
    }

    fn execute(&mut self, ins: &Instruction) -> Result<Flow, ExecutionError> {
        match ins.kind {
            // rd, rs, rt
            OpKind::Add | OpKind::Sub | OpKind::And | OpKind::Or | OpKind::Slt => {
                let rd = self.reg_operand(ins, 0)?;
                let rs = self.regs.read(self.reg_operand(ins, 1)?);
                let rt = self.regs.read(self.reg_operand(ins, 2)?);

                let result = match ins.kind {
                    OpKind::Add => rs.wrapping_add(rt),
                    OpKind::Sub => rs.wrapping_sub(rt),
                    OpKind::And => rs & rt,
                    OpKind::Or => rs | rt,
                    OpKind::Slt => i64::from(rs < rt),
                    _ => unreachable!(),
                };
                self.write_reg(rd, result);
            }

            // rs, rt; the 64-bit product splits across $HI/$LO.
            OpKind::Mult => {
                let rs = self.regs.read(self.reg_operand(ins, 0)?);
                let rt = self.regs.read(self.reg_operand(ins, 1)?);
                let product = rs.wrapping_mul(rt);
                self.write_reg(Register::Lo, product & 0xFFFF_FFFF);
                self.write_reg(Register::Hi, product >> 32);
            }

            // rd, rt, shamt
            OpKind::Sll => {
                let rd = self.reg_operand(ins, 0)?;
                let rt = self.regs.read(self.reg_operand(ins, 1)?);
                let shamt = self.imm_operand(ins, 2)?;
                if !(0..=63).contains(&shamt) {
                    return Err(ExecutionError::MalformedOperand {
                        mnemonic: ins.mnemonic.clone(),
                        reason: format!("shift amount {} out of range", shamt),
                    });
                }
                self.write_reg(rd, rt << shamt);
            }

            // rt, rs, imm
            OpKind::Addi | OpKind::Slti => {
                let rt = self.reg_operand(ins, 0)?;
                let rs = self.regs.read(self.reg_operand(ins, 1)?);
                let imm = self.imm_operand(ins, 2)?;

                let result = match ins.kind {
                    OpKind::Addi => rs.wrapping_add(imm),
                    OpKind::Slti => i64::from(rs < imm),
                    _ => unreachable!(),
                };
                self.write_reg(rt, result);
            }

            // rt, imm: assignment of imm shifted into the upper bits,
            // the lower 16 bits become 0.
            OpKind::Lui => {
                let rt = self.reg_operand(ins, 0)?;
                let imm = self.imm_operand(ins, 1)?;
                self.write_reg(rt, imm.wrapping_shl(16));
            }

            // rt, offset, base
            OpKind::Lw => {
                let rt = self.reg_operand(ins, 0)?;
                let offset = self.imm_operand(ins, 1)?;
                let base = self.regs.read(self.reg_operand(ins, 2)?);
                let value = self.mem.load(offset.wrapping_add(base))?;
                self.write_reg(rt, value);
            }

            // rt_or_literal, offset, base
            OpKind::Sw => {
                let token = operand(ins, 0)?;
                let value = match Register::from_name(token) {
                    Some(reg) => self.regs.read(reg),
                    // Not a known register name: store the literal
                    // integer directly.
                    None => token.parse::<i64>().map_err(|_| {
                        ExecutionError::MalformedOperand {
                            mnemonic: ins.mnemonic.clone(),
                            reason: format!(
                                "'{}' is neither a register nor an integer",
                                token
                            ),
                        }
                    })?,
                };
                let offset = self.imm_operand(ins, 1)?;
                let base = self.regs.read(self.reg_operand(ins, 2)?);
                self.mem.store(offset.wrapping_add(base), value)?;
            }

            OpKind::Syscall => return self.syscall(),

            OpKind::Unknown => {
                return Err(ExecutionError::UnknownInstruction(ins.mnemonic.clone()));
            }
        }

        Ok(Flow::Continue)
    }

    /// Dispatch a syscall on the code in `$v0`.
    fn syscall(&mut self) -> Result<Flow, ExecutionError> {
        let code = self.regs.read(Register::V0);
        match code {
            // Print the integer in $a0.
            1 => {
                let value = self.regs.read(Register::A0);
                self.log.push_info(format!("output: {}", value));
                Ok(Flow::Continue)
            }
            // Print the string starting at the address in $a0, one
            // character code per cell, up to the zero cell.
            4 => {
                let mut addr = self.regs.read(Register::A0);
                let mut text = String::new();
                loop {
                    let cell = self.mem.load(addr)?;
                    if cell == 0 {
                        break;
                    }
                    let ch = u32::try_from(cell)
                        .ok()
                        .and_then(char::from_u32)
                        .unwrap_or('?');
                    text.push(ch);
                    addr += 1;
                }
                self.log.push_info(format!("output: {}", text));
                Ok(Flow::Continue)
            }
            10 => Ok(Flow::Halt),
            other => Err(ExecutionError::UnknownSyscall(other)),
        }
    }

    /// Write a register, logging the suppressed write when the
    /// destination is `$zero`.
    fn write_reg(&mut self, reg: Register, value: i64) {
        if !self.regs.write(reg, value) {
            self.log
                .push_info(format!("PC={}: write to $zero ignored", self.pc));
        }
    }

    fn reg_operand(&self, ins: &Instruction, arg: usize) -> Result<Register, ExecutionError> {
        let token = operand(ins, arg)?;
        Register::from_name(token).ok_or_else(|| ExecutionError::MalformedOperand {
            mnemonic: ins.mnemonic.clone(),
            reason: format!("unknown register '{}'", token),
        })
    }

    fn imm_operand(&self, ins: &Instruction, arg: usize) -> Result<i64, ExecutionError> {
        let token = operand(ins, arg)?;
        token
            .parse::<i64>()
            .map_err(|_| ExecutionError::MalformedOperand {
                mnemonic: ins.mnemonic.clone(),
                reason: format!("'{}' is not a numeric immediate", token),
            })
    }

    /// Read-only register file snapshot.
    pub fn registers(&self) -> &RegisterFile {
        &self.regs
    }

    /// Read-only memory snapshot.
    pub fn memory(&self) -> &Memory {
        &self.mem
    }

    /// The loaded program.
    pub fn program(&self) -> &Program {
        &self.program
    }

    /// The data-segment symbol table.
    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// Index of the next instruction to execute.
    pub fn pc(&self) -> usize {
        self.pc
    }

    /// Current execution state.
    pub fn state(&self) -> &MachineState {
        &self.state
    }

    /// The append-only event log.
    pub fn log(&self) -> &EventLog {
        &self.log
    }

    /// Instructions executed since the last reset.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// True if execution finished normally.
    pub fn is_halted(&self) -> bool {
        self.state == MachineState::Halted
    }

    /// True if the machine can still execute.
    pub fn is_running(&self) -> bool {
        self.state == MachineState::Running
    }
}

impl Default for Machine {
    fn default() -> Self {
        Self::new()
    }
}

fn operand<'a>(ins: &'a Instruction, arg: usize) -> Result<&'a str, ExecutionError> {
    ins.args
        .get(arg)
        .map(String::as_str)
        .ok_or_else(|| ExecutionError::MalformedOperand {
            mnemonic: ins.mnemonic.clone(),
            reason: format!("missing operand {}", arg + 1),
        })
}
