//! Binary field-layout renderer for MiniMIPS instructions.
//!
//! Purely for display: the rendered bit string has no effect on
//! execution. Each instruction is formatted as its canonical field
//! groups separated by spaces, followed by a format tag:
//!
//! ```text
//! add  $t1, $t2, $t3  ->  000000 00101 00110 00100 00000 100000 (R-type)
//! addi $t1, $t2, 100  ->  001000 00101 00100 0000000001100100 (I-type)
//! syscall             ->  000000 00000000000000000000 001100 (syscall)
//! ```
//!
//! Register fields carry the 5-bit simulator slot index; immediates are
//! 16-bit two's complement. Malformed operands produce a translation
//! error string rather than a fault.

use crate::cpu::instruction::{Instruction, OpKind};
use crate::cpu::registers::Register;

const ZERO_REG: &str = "00000";
const ZERO_SHAMT: &str = "00000";
// Syscall leaves a 20-bit code field, all zeros here.
const ZERO_CODE: &str = "00000000000000000000";

/// Render an instruction's binary field layout.
///
/// Never fails: pseudo-instructions and malformed operands are reported
/// in the returned string.
pub fn encode(ins: &Instruction) -> String {
    if ins.mnemonic == "la" {
        return "la is a pseudo-instruction and has no binary encoding".to_string();
    }

    match try_encode(ins) {
        Ok(rendered) => rendered,
        Err(reason) => format!("cannot encode {}: {}", ins.mnemonic, reason),
    }
}

fn try_encode(ins: &Instruction) -> Result<String, String> {
    let opcode = opcode_bits(ins.kind).ok_or("unknown instruction")?;

    let rendered = match ins.kind {
        // Source order: rd, rs, rt.
        OpKind::Add | OpKind::Sub | OpKind::And | OpKind::Or | OpKind::Slt => {
            let rd = register_field(ins, 0)?;
            let rs = register_field(ins, 1)?;
            let rt = register_field(ins, 2)?;
            let funct = funct_bits(ins.kind);
            format!("{opcode} {rs} {rt} {rd} {ZERO_SHAMT} {funct} (R-type)")
        }

        // mult has no destination register.
        OpKind::Mult => {
            let rs = register_field(ins, 0)?;
            let rt = register_field(ins, 1)?;
            let funct = funct_bits(ins.kind);
            format!("{opcode} {rs} {rt} {ZERO_REG} {ZERO_SHAMT} {funct} (R-type)")
        }

        // Source order: rd, rt, shamt; rs is unused.
        OpKind::Sll => {
            let rd = register_field(ins, 0)?;
            let rt = register_field(ins, 1)?;
            let shamt = immediate_field(ins, 2, 5)?;
            let funct = funct_bits(ins.kind);
            format!("{opcode} {ZERO_REG} {rt} {rd} {shamt} {funct} (R-type)")
        }

        // Source order: rt, rs, imm.
        OpKind::Addi | OpKind::Slti => {
            let rt = register_field(ins, 0)?;
            let rs = register_field(ins, 1)?;
            let imm = immediate_field(ins, 2, 16)?;
            format!("{opcode} {rs} {rt} {imm} (I-type)")
        }

        // Source order: rt, offset, base; the base register is rs.
        OpKind::Lw | OpKind::Sw => {
            let rt = register_field(ins, 0)?;
            let imm = immediate_field(ins, 1, 16)?;
            let rs = register_field(ins, 2)?;
            format!("{opcode} {rs} {rt} {imm} (I-type)")
        }

        // Source order: rt, imm; rs is unused.
        OpKind::Lui => {
            let rt = register_field(ins, 0)?;
            let imm = immediate_field(ins, 1, 16)?;
            format!("{opcode} {ZERO_REG} {rt} {imm} (I-type)")
        }

        OpKind::Syscall => {
            let funct = funct_bits(ins.kind);
            format!("{opcode} {ZERO_CODE} {funct} (syscall)")
        }

        OpKind::Unknown => return Err("unknown instruction".to_string()),
    };

    Ok(rendered)
}

/// Opcode field. R-type instructions share opcode 0.
fn opcode_bits(kind: OpKind) -> Option<&'static str> {
    let bits = match kind {
        OpKind::Add
        | OpKind::Sub
        | OpKind::Mult
        | OpKind::And
        | OpKind::Or
        | OpKind::Sll
        | OpKind::Slt
        | OpKind::Syscall => "000000",
        OpKind::Addi => "001000",
        OpKind::Lw => "100011",
        OpKind::Sw => "101011",
        OpKind::Lui => "001111",
        OpKind::Slti => "001010",
        OpKind::Unknown => return None,
    };
    Some(bits)
}

/// Function code distinguishing R-type operations. Only meaningful for
/// the kinds that share opcode 0.
fn funct_bits(kind: OpKind) -> &'static str {
    match kind {
        OpKind::Add => "100000",
        OpKind::Sub => "100010",
        OpKind::Mult => "011000",
        OpKind::And => "100100",
        OpKind::Or => "100101",
        OpKind::Sll => "000000",
        OpKind::Slt => "101010",
        OpKind::Syscall => "001100",
        _ => "000000",
    }
}

fn register_field(ins: &Instruction, arg: usize) -> Result<String, String> {
    let token = operand(ins, arg)?;
    let reg = Register::from_name(token)
        .ok_or_else(|| format!("unknown register '{}'", token))?;
    Ok(to_binary(reg.index() as i64, 5))
}

fn immediate_field(ins: &Instruction, arg: usize, bits: u32) -> Result<String, String> {
    let token = operand(ins, arg)?;
    let value = token
        .parse::<i64>()
        .map_err(|_| format!("'{}' is not a numeric immediate", token))?;
    Ok(to_binary(value, bits))
}

fn operand<'a>(ins: &'a Instruction, arg: usize) -> Result<&'a str, String> {
    ins.args
        .get(arg)
        .map(String::as_str)
        .ok_or_else(|| format!("missing operand {}", arg + 1))
}

/// Render a value as a zero-padded binary field.
///
/// Negative values use two's complement: `n` encodes as `2^bits + n`.
fn to_binary(value: i64, bits: u32) -> String {
    let encoded = if value >= 0 {
        value
    } else {
        (1i64 << bits) + value
    };
    format!("{:0width$b}", encoded, width = bits as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ins(mnemonic: &str, args: &[&str]) -> Instruction {
        Instruction::new(mnemonic, args.iter().map(|a| a.to_string()).collect())
    }

    #[test]
    fn test_encode_r_type() {
        // add $t1, $t2, $t3: rd=$t1(4), rs=$t2(5), rt=$t3(6)
        let out = encode(&ins("add", &["$t1", "$t2", "$t3"]));
        assert_eq!(out, "000000 00101 00110 00100 00000 100000 (R-type)");
    }

    #[test]
    fn test_encode_mult_has_no_rd() {
        let out = encode(&ins("mult", &["$t0", "$t1"]));
        assert_eq!(out, "000000 00011 00100 00000 00000 011000 (R-type)");
    }

    #[test]
    fn test_encode_sll_shamt() {
        let out = encode(&ins("sll", &["$t1", "$t2", "4"]));
        assert_eq!(out, "000000 00000 00101 00100 00100 000000 (R-type)");
    }

    #[test]
    fn test_encode_addi() {
        let out = encode(&ins("addi", &["$t1", "$t2", "100"]));
        assert_eq!(out, "001000 00101 00100 0000000001100100 (I-type)");
    }

    #[test]
    fn test_encode_negative_immediate_twos_complement() {
        let out = encode(&ins("addi", &["$t1", "$t2", "-1"]));
        assert_eq!(out, "001000 00101 00100 1111111111111111 (I-type)");

        let out = encode(&ins("addi", &["$t1", "$t2", "-4"]));
        assert_eq!(out, "001000 00101 00100 1111111111111100 (I-type)");
    }

    #[test]
    fn test_encode_lw_sw_base_in_rs() {
        // lw $t1, 16($sp): rt=$t1(4), offset=16, base=$sp(7)
        let out = encode(&ins("lw", &["$t1", "16", "$sp"]));
        assert_eq!(out, "100011 00111 00100 0000000000010000 (I-type)");

        let out = encode(&ins("sw", &["$t1", "16", "$sp"]));
        assert_eq!(out, "101011 00111 00100 0000000000010000 (I-type)");
    }

    #[test]
    fn test_encode_lui() {
        let out = encode(&ins("lui", &["$t1", "16"]));
        assert_eq!(out, "001111 00000 00100 0000000000010000 (I-type)");
    }

    #[test]
    fn test_encode_syscall() {
        let out = encode(&ins("syscall", &[]));
        assert_eq!(out, "000000 00000000000000000000 001100 (syscall)");
    }

    #[test]
    fn test_la_reported_not_errored() {
        let out = encode(&ins("la", &["$t0", "msg"]));
        assert!(out.contains("pseudo-instruction"));
        assert!(!out.starts_with("cannot encode"));
    }

    #[test]
    fn test_malformed_operands_yield_error_string() {
        let out = encode(&ins("add", &["$t9", "$t2", "$t3"]));
        assert_eq!(out, "cannot encode add: unknown register '$t9'");

        let out = encode(&ins("addi", &["$t1", "$t2", "ten"]));
        assert_eq!(out, "cannot encode addi: 'ten' is not a numeric immediate");

        let out = encode(&ins("add", &["$t1", "$t2"]));
        assert_eq!(out, "cannot encode add: missing operand 3");

        let out = encode(&ins("frobnicate", &[]));
        assert_eq!(out, "cannot encode frobnicate: unknown instruction");
    }

    proptest! {
        #[test]
        fn prop_immediate_field_is_16_bit_twos_complement(imm in -32768i64..32768) {
            let out = encode(&ins("addi", &["$t1", "$t2", &imm.to_string()]));
            let field = out
                .split(' ')
                .nth(3)
                .expect("addi rendering has an immediate field");
            prop_assert_eq!(field.len(), 16);

            let unsigned = i64::from_str_radix(field, 2).unwrap();
            let expected = if imm >= 0 { imm } else { (1 << 16) + imm };
            prop_assert_eq!(unsigned, expected);
        }
    }
}
