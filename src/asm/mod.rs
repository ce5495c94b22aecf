//! Loader/assembler and binary renderer for MiniMIPS programs.
//!
//! This module provides:
//! - A two-pass loader (source text → program + symbol table + data image)
//! - A binary field-layout renderer for display

pub mod assembler;
pub mod encoder;

pub use assembler::{parse, Assembly, LoadError, SymbolTable};
pub use encoder::encode;
