//! Two-pass loader/assembler for MiniMIPS source files.
//!
//! Syntax:
//! ```text
//! # Comment
//! .data
//! msg:   .asciiz "hi"      # characters + terminating zero cell
//! nums:  .word 1, 2, 3     # one integer per cell
//! .text
//! start: la   $t0, msg     # pseudo-instruction, expands to addi
//!        lw   $t1, 0($t0)
//!        addi $v0, $zero, 10
//!        syscall
//! ```
//!
//! Pass one walks the data segment, building the symbol table and the
//! data image. Pass two assembles the text segment, expanding `la`
//! against the completed table. Lines before the first `.data`/`.text`
//! header belong to no segment and are ignored.

use crate::cpu::instruction::{Instruction, Program};
use crate::cpu::memory::MEMORY_SIZE;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Label → memory cell index, built once from the data segment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolTable {
    symbols: HashMap<String, usize>,
}

impl SymbolTable {
    /// Address of a label, if defined.
    pub fn get(&self, label: &str) -> Option<usize> {
        self.symbols.get(label).copied()
    }

    /// Number of defined labels.
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// True if no labels are defined.
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Iterate over (label, address) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.symbols.iter().map(|(label, addr)| (label.as_str(), *addr))
    }

    fn insert(&mut self, label: String, addr: usize) {
        let _ = self.symbols.insert(label, addr);
    }
}

/// The result of a successful parse: the instructions, the symbol table
/// and the data-segment image (installed into memory cells `[0, len)`).
#[derive(Debug, Clone, Default)]
pub struct Assembly {
    /// Ordered instruction sequence.
    pub program: Program,
    /// Label → data address map.
    pub symbols: SymbolTable,
    /// Data-segment image, one value per cell starting at address 0.
    pub data: Vec<i64>,
}

/// Parse source text into a program, symbol table and data image.
pub fn parse(source: &str) -> Result<Assembly, LoadError> {
    let mut asm = Assembler::default();
    asm.collect_data(source)?;
    asm.assemble_text(source)?;
    Ok(Assembly {
        program: asm.program,
        symbols: asm.symbols,
        data: asm.data,
    })
}

/// Which segment a line belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Segment {
    /// Before the first `.data`/`.text` header.
    None,
    Data,
    Text,
}

#[derive(Default)]
struct Assembler {
    symbols: SymbolTable,
    data: Vec<i64>,
    program: Program,
}

impl Assembler {
    /// Pass one: build the symbol table and data image from `.data` lines.
    fn collect_data(&mut self, source: &str) -> Result<(), LoadError> {
        let mut segment = Segment::None;

        for (line_num, raw) in source.lines().enumerate() {
            let line = match clean_line(raw) {
                Some(line) => line,
                None => continue,
            };

            match line {
                ".data" => segment = Segment::Data,
                ".text" => segment = Segment::Text,
                _ if segment == Segment::Data => {
                    self.process_data_line(line, line_num + 1)?;
                }
                _ => {}
            }
        }

        Ok(())
    }

    /// Pass two: assemble `.text` lines against the completed table.
    fn assemble_text(&mut self, source: &str) -> Result<(), LoadError> {
        let mut segment = Segment::None;

        for (line_num, raw) in source.lines().enumerate() {
            let line = match clean_line(raw) {
                Some(line) => line,
                None => continue,
            };

            match line {
                ".data" => segment = Segment::Data,
                ".text" => segment = Segment::Text,
                _ if segment == Segment::Text => {
                    self.process_text_line(line, line_num + 1)?;
                }
                _ => {}
            }
        }

        Ok(())
    }

    fn process_data_line(&mut self, line: &str, line_num: usize) -> Result<(), LoadError> {
        let malformed = |reason: &str| LoadError::MalformedDataLine {
            line: line_num,
            reason: reason.to_string(),
        };

        let colon = line.find(':').ok_or_else(|| malformed("missing ':' after label"))?;
        let label = line[..colon].trim();
        if label.is_empty() {
            return Err(malformed("empty label"));
        }

        let rest = line[colon + 1..].trim();
        let (directive, value) = match rest.split_once(char::is_whitespace) {
            Some((directive, value)) => (directive, value.trim()),
            None => (rest, ""),
        };

        // The label resolves to the first cell this line writes.
        self.symbols.insert(label.to_string(), self.data.len());

        match directive {
            ".asciiz" => {
                let text = unquote(value).ok_or_else(|| {
                    malformed(".asciiz value must be a double-quoted string")
                })?;
                for ch in text.chars() {
                    self.data.push(ch as i64);
                }
                self.data.push(0);
            }
            ".word" => {
                if value.is_empty() {
                    return Err(malformed(".word requires at least one value"));
                }
                for item in value.split(',') {
                    let item = item.trim();
                    let parsed = item.parse::<i64>().map_err(|_| {
                        malformed(&format!("'{}' is not an integer", item))
                    })?;
                    self.data.push(parsed);
                }
            }
            "" => return Err(malformed("missing directive")),
            other => {
                return Err(malformed(&format!("unknown directive '{}'", other)));
            }
        }

        if self.data.len() > MEMORY_SIZE {
            return Err(malformed("data segment overflows memory"));
        }

        Ok(())
    }

    fn process_text_line(&mut self, line: &str, line_num: usize) -> Result<(), LoadError> {
        // Commas and parentheses separate tokens, so `4($sp)` becomes
        // the two tokens `4` and `$sp`.
        let separated: String = line
            .chars()
            .map(|c| if c == ',' || c == '(' || c == ')' { ' ' } else { c })
            .collect();
        let mut tokens: Vec<&str> = separated.split_whitespace().collect();

        // Text-segment labels are recognized syntactically only; there is
        // no branch target resolution in this machine.
        if let Some(first) = tokens.first() {
            if first.ends_with(':') {
                tokens.remove(0);
            }
        }

        let (mnemonic, args) = match tokens.split_first() {
            Some((mnemonic, args)) => (*mnemonic, args),
            None => return Ok(()),
        };

        // `la dst, label` expands to the canonical immediate-load form.
        if mnemonic == "la" && args.len() == 2 {
            let label = args[1];
            let addr = self.symbols.get(label).ok_or_else(|| LoadError::UnknownLabel {
                line: line_num,
                label: label.to_string(),
            })?;
            self.program.push(Instruction::new(
                "addi",
                vec![args[0].to_string(), "$zero".to_string(), addr.to_string()],
            ));
            return Ok(());
        }

        self.program.push(Instruction::new(
            mnemonic,
            args.iter().map(|a| a.to_string()).collect(),
        ));
        Ok(())
    }
}

/// Strip the `#` comment and surrounding whitespace; `None` for blank lines.
fn clean_line(raw: &str) -> Option<&str> {
    let line = match raw.find('#') {
        Some(idx) => &raw[..idx],
        None => raw,
    };
    let line = line.trim();
    if line.is_empty() {
        None
    } else {
        Some(line)
    }
}

/// Extract the contents of a double-quoted string.
fn unquote(value: &str) -> Option<&str> {
    let value = value.strip_prefix('"')?;
    value.strip_suffix('"')
}

/// Errors that can occur while loading a program.
///
/// Any of these aborts the whole load; the machine keeps its just-reset
/// state and no partial program is installed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    /// The source file could not be read.
    #[error("could not read source file '{path}'")]
    FileNotFound { path: String },

    /// A data-segment line is not `label: directive value...`.
    #[error("malformed data line {line}: {reason}")]
    MalformedDataLine { line: usize, reason: String },

    /// `la` referenced a label the data segment never defined.
    #[error("unknown label '{label}' on line {line}")]
    UnknownLabel { line: usize, label: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::instruction::OpKind;

    #[test]
    fn test_asciiz_writes_codes_and_terminator() {
        let asm = parse(".data\nlabel: .asciiz \"hi\"\n").unwrap();
        assert_eq!(asm.data, vec![104, 105, 0]);
        assert_eq!(asm.symbols.get("label"), Some(0));
    }

    #[test]
    fn test_word_list() {
        let asm = parse(".data\nnums: .word 1, -2, 30\n").unwrap();
        assert_eq!(asm.data, vec![1, -2, 30]);
        assert_eq!(asm.symbols.get("nums"), Some(0));
    }

    #[test]
    fn test_consecutive_data_lines_advance_pointer() {
        let source = r#"
.data
msg: .asciiz "hi"
nums: .word 7, 8
"#;
        let asm = parse(source).unwrap();
        assert_eq!(asm.symbols.get("msg"), Some(0));
        // "hi" occupies cells 0-2 including the terminator.
        assert_eq!(asm.symbols.get("nums"), Some(3));
        assert_eq!(asm.data, vec![104, 105, 0, 7, 8]);
    }

    #[test]
    fn test_la_expands_to_addi() {
        let source = r#"
.data
msg: .asciiz "hi"
.text
la $t0, msg
"#;
        let asm = parse(source).unwrap();
        assert_eq!(asm.program.len(), 1);
        let ins = asm.program.get(0).unwrap();
        assert_eq!(ins.kind, OpKind::Addi);
        assert_eq!(ins.args, vec!["$t0", "$zero", "0"]);
    }

    #[test]
    fn test_la_unknown_label() {
        let err = parse(".text\nla $t0, nowhere\n").unwrap_err();
        assert_eq!(
            err,
            LoadError::UnknownLabel {
                line: 2,
                label: "nowhere".to_string()
            }
        );
    }

    #[test]
    fn test_offset_base_tokenization() {
        let asm = parse(".text\nlw $t1, 4($sp)\n").unwrap();
        let ins = asm.program.get(0).unwrap();
        assert_eq!(ins.kind, OpKind::Lw);
        assert_eq!(ins.args, vec!["$t1", "4", "$sp"]);
    }

    #[test]
    fn test_text_label_is_stripped() {
        let asm = parse(".text\nstart: addi $t0, $zero, 1\n").unwrap();
        let ins = asm.program.get(0).unwrap();
        assert_eq!(ins.kind, OpKind::Addi);
        assert_eq!(ins.args, vec!["$t0", "$zero", "1"]);
    }

    #[test]
    fn test_lines_before_first_segment_are_ignored() {
        let source = "addi $t0, $zero, 1\njunk: .word 5\n.text\nsyscall\n";
        let asm = parse(source).unwrap();
        assert_eq!(asm.program.len(), 1);
        assert_eq!(asm.program.get(0).unwrap().kind, OpKind::Syscall);
        assert!(asm.symbols.is_empty());
        assert!(asm.data.is_empty());
    }

    #[test]
    fn test_comments_and_blank_lines() {
        let source = r#"
# leading comment
.text

addi $t0, $zero, 1  # trailing comment
# full-line comment
"#;
        let asm = parse(source).unwrap();
        assert_eq!(asm.program.len(), 1);
    }

    #[test]
    fn test_missing_colon_is_malformed() {
        let err = parse(".data\nlabel .word 1\n").unwrap_err();
        assert!(matches!(err, LoadError::MalformedDataLine { line: 2, .. }));
    }

    #[test]
    fn test_unknown_directive_is_malformed() {
        let err = parse(".data\nlabel: .byte 1\n").unwrap_err();
        assert!(matches!(err, LoadError::MalformedDataLine { .. }));
    }

    #[test]
    fn test_non_integer_word_is_malformed() {
        let err = parse(".data\nlabel: .word 1, two\n").unwrap_err();
        assert!(matches!(err, LoadError::MalformedDataLine { .. }));
    }

    #[test]
    fn test_unquoted_asciiz_is_malformed() {
        let err = parse(".data\nlabel: .asciiz hi\n").unwrap_err();
        assert!(matches!(err, LoadError::MalformedDataLine { .. }));
    }

    #[test]
    fn test_data_overflow_is_malformed() {
        // 200 + 100 words cannot fit in 256 cells.
        let source = format!(
            ".data\na: .word {}\nb: .word {}\n",
            vec!["1"; 200].join(","),
            vec!["1"; 100].join(",")
        );
        let err = parse(&source).unwrap_err();
        assert!(matches!(err, LoadError::MalformedDataLine { line: 3, .. }));
    }

    #[test]
    fn test_unknown_mnemonic_loads_as_unknown_kind() {
        let asm = parse(".text\nbeq $t0, $t1, loop\n").unwrap();
        assert_eq!(asm.program.get(0).unwrap().kind, OpKind::Unknown);
    }

    #[test]
    fn test_data_label_usable_before_definition_line() {
        // The symbol table is completed in pass one, so a `la` that
        // appears textually before the .data block still resolves.
        let source = r#"
.text
la $t0, late
.data
late: .word 9
"#;
        let asm = parse(source).unwrap();
        assert_eq!(asm.program.get(0).unwrap().args, vec!["$t0", "$zero", "0"]);
    }
}
