//! NEC V30MZ: an 8086-compatible 16-bit CPU. Two-operand syntax
//! (`MOV AX, BX`), 16-bit general registers plus their 8-bit halves.
//! This table covers the common data-movement/arithmetic/control-flow
//! subset; string instructions (`MOVSB`/`STOSW`/…), segment-override
//! prefixes, and the full ModRM addressing-mode matrix are not modeled.

use super::{Encoding, ModeKey};

pub const MNEMONICS: &[&str] = &[
    "MOV", "ADD", "ADC", "SUB", "SBB", "CMP", "AND", "OR", "XOR", "INC", "DEC", "NOT", "NEG",
    "MUL", "IMUL", "DIV", "IDIV", "SHL", "SHR", "SAR", "ROL", "ROR", "PUSH", "POP", "JMP",
    "CALL", "RET", "RETF", "JE", "JNE", "JZ", "JNZ", "JC", "JNC", "JS", "JNS", "JG", "JGE",
    "JL", "JLE", "JA", "JB", "LOOP", "NOP", "HLT", "CLI", "STI", "CLC", "STC", "INT", "IRET",
    "XCHG", "LEA",
];

pub const REGISTERS_16: &[&str] = &["AX", "BX", "CX", "DX", "SP", "BP", "SI", "DI"];
pub const REGISTERS_8: &[&str] = &["AL", "AH", "BL", "BH", "CL", "CH", "DL", "DH"];

pub fn is_register(name: &str) -> bool {
    let up = name.to_ascii_uppercase();
    REGISTERS_16.contains(&up.as_str()) || REGISTERS_8.contains(&up.as_str())
}

fn enc(opcode: &[u8], operand_size: u8) -> Encoding {
    Encoding { opcode: opcode.to_vec(), operand_size, is_branch: false, affects_register_width: false }
}

fn branch(opcode: &[u8], operand_size: u8) -> Encoding {
    Encoding { opcode: opcode.to_vec(), operand_size, is_branch: true, affects_register_width: false }
}

fn reg16_bits(name: &str) -> Option<u8> {
    Some(match name.to_ascii_uppercase().as_str() {
        "AX" => 0,
        "CX" => 1,
        "DX" => 2,
        "BX" => 3,
        "SP" => 4,
        "BP" => 5,
        "SI" => 6,
        "DI" => 7,
        _ => return None,
    })
}

pub fn lookup(mnemonic: &str, dest: Option<&str>, key: ModeKey) -> Option<Encoding> {
    use ModeKey::*;
    let m = mnemonic.to_ascii_uppercase();
    let d = dest.map(|s| s.to_ascii_uppercase());

    match m.as_str() {
        "NOP" => return Some(enc(&[0x90], 0)),
        "HLT" => return Some(enc(&[0xf4], 0)),
        "CLI" => return Some(enc(&[0xfa], 0)),
        "STI" => return Some(enc(&[0xfb], 0)),
        "CLC" => return Some(enc(&[0xf8], 0)),
        "STC" => return Some(enc(&[0xf9], 0)),
        "RET" => return Some(enc(&[0xc3], 0)),
        "RETF" => return Some(enc(&[0xcb], 0)),
        "IRET" => return Some(enc(&[0xcf], 0)),
        _ => {}
    }

    if m == "INT" {
        return match key {
            Immediate => Some(enc(&[0xcd], 1)),
            _ => None,
        };
    }

    let jcc: Option<u8> = match m.as_str() {
        "JE" | "JZ" => Some(0x74),
        "JNE" | "JNZ" => Some(0x75),
        "JC" | "JB" => Some(0x72),
        "JNC" => Some(0x73),
        "JS" => Some(0x78),
        "JNS" => Some(0x79),
        "JG" => Some(0x7f),
        "JGE" => Some(0x7d),
        "JL" => Some(0x7c),
        "JLE" => Some(0x7e),
        "JA" => Some(0x77),
        _ => None,
    };
    if let Some(opcode) = jcc {
        return match key {
            Relative | Absolute => Some(branch(&[opcode], 1)),
            _ => None,
        };
    }
    if m == "LOOP" {
        return match key {
            Relative | Absolute => Some(branch(&[0xe2], 1)),
            _ => None,
        };
    }
    if m == "JMP" {
        return match key {
            Relative => Some(branch(&[0xeb], 1)),
            Absolute => Some(enc(&[0xe9], 2)),
            Indirect => Some(enc(&[0xff], 0)),
            _ => None,
        };
    }
    if m == "CALL" {
        return match key {
            Absolute => Some(enc(&[0xe8], 2)),
            Indirect => Some(enc(&[0xff], 0)),
            _ => None,
        };
    }

    if matches!(m.as_str(), "PUSH" | "POP") {
        if let Some(reg) = &d {
            let bits = reg16_bits(reg)?;
            let base = if m == "PUSH" { 0x50 } else { 0x58 };
            return Some(enc(&[base + bits], 0));
        }
    }

    if matches!(m.as_str(), "INC" | "DEC") {
        if let Some(reg) = &d {
            let bits = reg16_bits(reg)?;
            let base = if m == "INC" { 0x40 } else { 0x48 };
            return Some(enc(&[base + bits], 0));
        }
    }

    if m == "LEA" {
        return match key {
            Absolute | Indirect => Some(enc(&[0x8d], 2)),
            _ => None,
        };
    }

    if m == "XCHG" {
        return Some(enc(&[0x87], 0));
    }

    if m == "MOV" {
        if let Some(reg) = &d {
            if let (Some(bits), Immediate) = (reg16_bits(reg), key) {
                return Some(enc(&[0xb8 + bits], 2));
            }
            if key == Absolute || key == Indirect {
                return Some(enc(&[0x8b], 2));
            }
            if key == Implied {
                return Some(enc(&[0x89], 0));
            }
        }
        return None;
    }

    if matches!(m.as_str(), "ADD" | "ADC" | "SUB" | "SBB" | "AND" | "OR" | "XOR" | "CMP") {
        let base_immediate: u8 = match m.as_str() {
            "ADD" => 0x05,
            "ADC" => 0x15,
            "SUB" => 0x2d,
            "SBB" => 0x1d,
            "AND" => 0x25,
            "OR" => 0x0d,
            "XOR" => 0x35,
            "CMP" => 0x3d,
            _ => return None,
        };
        let base_reg: u8 = match m.as_str() {
            "ADD" => 0x03,
            "ADC" => 0x13,
            "SUB" => 0x2b,
            "SBB" => 0x1b,
            "AND" => 0x23,
            "OR" => 0x0b,
            "XOR" => 0x33,
            "CMP" => 0x3b,
            _ => return None,
        };
        return match key {
            Immediate => Some(enc(&[base_immediate], 2)),
            Absolute | Indirect | Implied => Some(enc(&[base_reg], 2)),
            _ => None,
        };
    }

    if matches!(m.as_str(), "NOT" | "NEG" | "MUL" | "IMUL" | "DIV" | "IDIV") {
        return Some(enc(&[0xf7], 0));
    }
    if matches!(m.as_str(), "SHL" | "SHR" | "SAR" | "ROL" | "ROR") {
        return match key {
            Immediate => Some(enc(&[0xc1], 1)),
            Implied => Some(enc(&[0xd3], 0)),
            _ => None,
        };
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mov_register_immediate() {
        let e = lookup("mov", Some("ax"), ModeKey::Immediate).unwrap();
        assert_eq!(e.opcode, vec![0xb8]);
        assert_eq!(e.operand_size, 2);
    }

    #[test]
    fn conditional_jump_is_branch() {
        assert!(lookup("jne", None, ModeKey::Relative).unwrap().is_branch);
    }

    #[test]
    fn push_pop_encode_register_in_opcode() {
        assert_eq!(lookup("push", Some("cx"), ModeKey::Implied).unwrap().opcode, vec![0x51]);
    }
}
