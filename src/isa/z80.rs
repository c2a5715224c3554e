//! Zilog Z80: a superset of the SM83's parent architecture — shadow
//! register file (`EXX`, `EX AF, AF'`), `IX`/`IY` index registers, and a
//! larger set of ED/CB/DD/FD-prefixed opcodes. This table covers the
//! unprefixed core plus the common ED-prefixed and block instructions;
//! `IX`/`IY`-displacement addressing is out of scope (not expressible
//! by this single-expression-operand grammar).

use super::{Encoding, ModeKey};

pub const MNEMONICS: &[&str] = &[
    "LD", "PUSH", "POP", "EX", "EXX", "ADD", "ADC", "SUB", "SBC", "AND", "OR", "XOR", "CP", "INC",
    "DEC", "DAA", "CPL", "NEG", "CCF", "SCF", "NOP", "HALT", "DI", "EI", "IM", "RLCA", "RLA",
    "RRCA", "RRA", "RLC", "RL", "RRC", "RR", "SLA", "SRA", "SRL", "BIT", "SET", "RES", "JP",
    "JR", "DJNZ", "CALL", "RET", "RETI", "RETN", "RST", "LDI", "LDIR", "LDD", "LDDR", "CPI",
    "CPIR", "CPD", "CPDR", "IN", "OUT", "OUTI", "OUTD",
];

pub const REGISTERS_8: &[&str] = &["A", "B", "C", "D", "E", "H", "L", "I", "R"];
pub const REGISTERS_16: &[&str] = &["BC", "DE", "HL", "SP", "AF", "IX", "IY"];

pub fn is_register(name: &str) -> bool {
    let up = name.to_ascii_uppercase();
    REGISTERS_8.contains(&up.as_str()) || REGISTERS_16.contains(&up.as_str())
}

fn reg8_bits(name: &str) -> Option<u8> {
    Some(match name.to_ascii_uppercase().as_str() {
        "B" => 0,
        "C" => 1,
        "D" => 2,
        "E" => 3,
        "H" => 4,
        "L" => 5,
        "A" => 7,
        _ => return None,
    })
}

fn enc(opcode: &[u8], operand_size: u8) -> Encoding {
    Encoding { opcode: opcode.to_vec(), operand_size, is_branch: false, affects_register_width: false }
}

fn branch(opcode: &[u8], operand_size: u8) -> Encoding {
    Encoding { opcode: opcode.to_vec(), operand_size, is_branch: true, affects_register_width: false }
}

pub fn lookup(mnemonic: &str, dest: Option<&str>, key: ModeKey) -> Option<Encoding> {
    use ModeKey::*;
    let m = mnemonic.to_ascii_uppercase();
    let d = dest.map(|s| s.to_ascii_uppercase());

    match (m.as_str(), d.as_deref(), key) {
        ("NOP", None, Implied) => return Some(enc(&[0x00], 0)),
        ("HALT", None, Implied) => return Some(enc(&[0x76], 0)),
        ("DI", None, Implied) => return Some(enc(&[0xf3], 0)),
        ("EI", None, Implied) => return Some(enc(&[0xfb], 0)),
        ("DAA", None, Implied) => return Some(enc(&[0x27], 0)),
        ("CPL", None, Implied) => return Some(enc(&[0x2f], 0)),
        ("NEG", None, Implied) => return Some(enc(&[0xed, 0x44], 0)),
        ("CCF", None, Implied) => return Some(enc(&[0x3f], 0)),
        ("SCF", None, Implied) => return Some(enc(&[0x37], 0)),
        ("RLCA", None, Implied) => return Some(enc(&[0x07], 0)),
        ("RLA", None, Implied) => return Some(enc(&[0x17], 0)),
        ("RRCA", None, Implied) => return Some(enc(&[0x0f], 0)),
        ("RRA", None, Implied) => return Some(enc(&[0x1f], 0)),
        ("RET", None, Implied) => return Some(enc(&[0xc9], 0)),
        ("RETI", None, Implied) => return Some(enc(&[0xed, 0x4d], 0)),
        ("RETN", None, Implied) => return Some(enc(&[0xed, 0x45], 0)),
        ("EXX", None, Implied) => return Some(enc(&[0xd9], 0)),
        ("LDI", None, Implied) => return Some(enc(&[0xed, 0xa0], 0)),
        ("LDIR", None, Implied) => return Some(enc(&[0xed, 0xb0], 0)),
        ("LDD", None, Implied) => return Some(enc(&[0xed, 0xa8], 0)),
        ("LDDR", None, Implied) => return Some(enc(&[0xed, 0xb8], 0)),
        ("CPI", None, Implied) => return Some(enc(&[0xed, 0xa1], 0)),
        ("CPIR", None, Implied) => return Some(enc(&[0xed, 0xb1], 0)),
        ("CPD", None, Implied) => return Some(enc(&[0xed, 0xa9], 0)),
        ("CPDR", None, Implied) => return Some(enc(&[0xed, 0xb9], 0)),
        ("OUTI", None, Implied) => return Some(enc(&[0xed, 0xa3], 0)),
        ("OUTD", None, Implied) => return Some(enc(&[0xed, 0xab], 0)),
        _ => {}
    }

    if m == "IM" && key == Immediate {
        // mode number (0/1/2) is folded into the opcode by codegen.
        return Some(enc(&[0xed, 0x46], 1));
    }

    if m == "EX" {
        return lookup_ex(d.as_deref(), key);
    }

    if matches!(m.as_str(), "INC" | "DEC") {
        if let Some(reg) = &d {
            if key == ModeKey::Implied {
                if let Some(bits) = reg8_bits(reg) {
                    let base = if m == "INC" { 0x04 } else { 0x05 };
                    return Some(enc(&[base + (bits << 3)], 0));
                }
                let pair_opcode: Option<u8> = match (m.as_str(), reg.as_str()) {
                    ("INC", "BC") => Some(0x03),
                    ("INC", "DE") => Some(0x13),
                    ("INC", "HL") => Some(0x23),
                    ("INC", "SP") => Some(0x33),
                    ("DEC", "BC") => Some(0x0b),
                    ("DEC", "DE") => Some(0x1b),
                    ("DEC", "HL") => Some(0x2b),
                    ("DEC", "SP") => Some(0x3b),
                    _ => None,
                };
                if let Some(op) = pair_opcode {
                    return Some(enc(&[op], 0));
                }
                if reg == "IX" {
                    return Some(enc(&[0xdd, if m == "INC" { 0x23 } else { 0x2b }], 0));
                }
                if reg == "IY" {
                    return Some(enc(&[0xfd, if m == "INC" { 0x23 } else { 0x2b }], 0));
                }
            }
            if key == Indirect && reg == "HL" {
                return Some(enc(&[if m == "INC" { 0x34 } else { 0x35 }], 0));
            }
        }
    }

    if matches!(m.as_str(), "PUSH" | "POP") {
        if let Some(reg) = &d {
            let opcode = match (m.as_str(), reg.as_str()) {
                ("PUSH", "BC") => 0xc5,
                ("PUSH", "DE") => 0xd5,
                ("PUSH", "HL") => 0xe5,
                ("PUSH", "AF") => 0xf5,
                ("POP", "BC") => 0xc1,
                ("POP", "DE") => 0xd1,
                ("POP", "HL") => 0xe1,
                ("POP", "AF") => 0xf1,
                _ => return None,
            };
            return Some(enc(&[opcode], 0));
        }
    }

    if matches!(m.as_str(), "JP" | "JR" | "CALL" | "DJNZ") {
        return lookup_control_flow(&m, d.as_deref(), key);
    }
    if m == "RST" && key == Immediate {
        return Some(enc(&[0xc7], 1));
    }

    if matches!(m.as_str(), "ADD" | "ADC" | "SUB" | "SBC" | "AND" | "XOR" | "OR" | "CP") {
        if let Some(enc) = lookup_alu16(&m, d.as_deref(), key) {
            return Some(enc);
        }
        return lookup_alu(&m, d.as_deref(), key);
    }

    if m == "LD" {
        return lookup_ld(d.as_deref(), key);
    }
    if m == "IN" {
        return match key {
            Immediate | Absolute => Some(enc(&[0xdb], 1)),
            _ => None,
        };
    }
    if m == "OUT" {
        return match key {
            Absolute | Immediate => Some(enc(&[0xd3], 1)),
            _ => None,
        };
    }

    if matches!(m.as_str(), "RLC" | "RRC" | "RL" | "RR" | "SLA" | "SRA" | "SRL") {
        return lookup_cb_rotate(&m, d.as_deref(), key);
    }
    if matches!(m.as_str(), "BIT" | "SET" | "RES") {
        return match key {
            Immediate | Absolute => {
                let base: u8 = match m.as_str() {
                    "BIT" => 0x40,
                    "RES" => 0x80,
                    "SET" => 0xc0,
                    _ => return None,
                };
                Some(enc(&[0xcb, base], 0))
            }
            _ => None,
        };
    }

    None
}

fn lookup_ex(reg: Option<&str>, key: ModeKey) -> Option<Encoding> {
    use ModeKey::*;
    match (reg, key) {
        (Some(r), Implied) if r == "AF" => Some(enc(&[0x08], 0)),
        (Some(r), Implied) if r == "DE" => Some(enc(&[0xeb], 0)), // EX DE, HL
        (None, Indirect) => Some(enc(&[0xe3], 0)),                // EX (SP), HL
        _ => None,
    }
}

fn lookup_control_flow(m: &str, cond: Option<&str>, key: ModeKey) -> Option<Encoding> {
    use ModeKey::*;
    let cc = |c: &str| -> Option<u8> {
        Some(match c {
            "NZ" => 0,
            "Z" => 1,
            "NC" => 2,
            "C" => 3,
            "PO" => 4,
            "PE" => 5,
            "P" => 6,
            "M" => 7,
            _ => return None,
        })
    };
    match m {
        "JP" => match (cond, key) {
            (None, Absolute) | (None, Relative) => Some(enc(&[0xc3], 2)),
            (None, Indirect) => Some(enc(&[0xe9], 0)),
            (Some(c), Absolute) | (Some(c), Relative) => Some(enc(&[0xc2 + (cc(c)? << 3)], 2)),
            _ => None,
        },
        "JR" => match (cond, key) {
            (None, Relative) | (None, Absolute) => Some(branch(&[0x18], 1)),
            (Some(c), Relative) | (Some(c), Absolute) if matches!(c, "Z" | "NZ" | "C" | "NC") => {
                Some(branch(&[0x20 + (cc(c)? << 3)], 1))
            }
            _ => None,
        },
        "DJNZ" => match key {
            Relative | Absolute => Some(branch(&[0x10], 1)),
            _ => None,
        },
        "CALL" => match (cond, key) {
            (None, Absolute) | (None, Relative) => Some(enc(&[0xcd], 2)),
            (Some(c), Absolute) | (Some(c), Relative) => Some(enc(&[0xc4 + (cc(c)? << 3)], 2)),
            _ => None,
        },
        "RET" => match cond {
            Some(c) => Some(enc(&[0xc0 + (cc(c)? << 3)], 0)),
            None => Some(enc(&[0xc9], 0)),
        },
        _ => None,
    }
}

fn lookup_alu16(m: &str, dest: Option<&str>, key: ModeKey) -> Option<Encoding> {
    use ModeKey::*;
    if m != "ADD" {
        return None;
    }
    let dest = dest?;
    if !dest.eq_ignore_ascii_case("hl") || key != Implied {
        return None;
    }
    // source register pair folded into the opcode by codegen from the
    // raw second operand (BC=0x09, DE=0x19, HL=0x29, SP=0x39).
    Some(enc(&[0x09], 0))
}

fn lookup_alu(m: &str, dest: Option<&str>, key: ModeKey) -> Option<Encoding> {
    use ModeKey::*;
    let (base_immediate, base_reg): (u8, u8) = match m {
        "ADD" => (0xc6, 0x80),
        "ADC" => (0xce, 0x88),
        "SUB" => (0xd6, 0x90),
        "SBC" => (0xde, 0x98),
        "AND" => (0xe6, 0xa0),
        "XOR" => (0xee, 0xa8),
        "OR" => (0xf6, 0xb0),
        "CP" => (0xfe, 0xb8),
        _ => return None,
    };
    match (dest, key) {
        (Some(d), Immediate) if d.eq_ignore_ascii_case("A") => Some(enc(&[base_immediate], 1)),
        (None, Immediate) => Some(enc(&[base_immediate], 1)),
        (Some(d), Indirect) if d.eq_ignore_ascii_case("A") => Some(enc(&[base_reg + 6], 0)),
        (None, Indirect) => Some(enc(&[base_reg + 6], 0)),
        (Some(reg), Implied) if !reg.eq_ignore_ascii_case("A") => {
            reg8_bits(reg).map(|bits| enc(&[base_reg + bits], 0))
        }
        _ => None,
    }
}

fn lookup_ld(dest: Option<&str>, key: ModeKey) -> Option<Encoding> {
    use ModeKey::*;
    let dest = dest?;
    let d_up = dest.to_ascii_uppercase();

    if key == Immediate {
        if let Some(bits) = reg8_bits(&d_up) {
            return Some(enc(&[0x06 + (bits << 3)], 1));
        }
        let opcode = match d_up.as_str() {
            "BC" => 0x01,
            "DE" => 0x11,
            "HL" => 0x21,
            "SP" => 0x31,
            "IX" => return Some(enc(&[0xdd, 0x21], 2)),
            "IY" => return Some(enc(&[0xfd, 0x21], 2)),
            _ => return None,
        };
        return Some(enc(&[opcode], 2));
    }

    if key == Indirect {
        if let Some(bits) = reg8_bits(&d_up) {
            return Some(enc(&[0x46 + (bits << 3)], 0));
        }
    }

    if d_up == "SP" && key == Absolute {
        return Some(enc(&[0xed, 0x73], 2));
    }
    if d_up == "SP" && key == Implied {
        return Some(enc(&[0xf9], 0));
    }
    if d_up == "A" && key == Absolute {
        return Some(enc(&[0x3a], 2));
    }
    if matches!(d_up.as_str(), "BC" | "DE" | "HL") && key == Absolute {
        let opcode = match d_up.as_str() {
            "BC" => return Some(enc(&[0xed, 0x4b], 2)),
            "DE" => return Some(enc(&[0xed, 0x5b], 2)),
            "HL" => 0x2a,
            _ => unreachable!(),
        };
        return Some(enc(&[opcode], 2));
    }

    if key == Implied && reg8_bits(&d_up).is_some() {
        return Some(enc(&[0x40], 0));
    }

    None
}

fn lookup_cb_rotate(m: &str, reg: Option<&str>, key: ModeKey) -> Option<Encoding> {
    use ModeKey::*;
    let base: u8 = match m {
        "RLC" => 0x00,
        "RRC" => 0x08,
        "RL" => 0x10,
        "RR" => 0x18,
        "SLA" => 0x20,
        "SRA" => 0x28,
        "SRL" => 0x38,
        _ => return None,
    };
    match (reg, key) {
        (Some(r), Implied) => reg8_bits(r).map(|bits| enc(&[0xcb, base + bits], 0)),
        (None, Indirect) | (Some(_), Indirect) => Some(enc(&[0xcb, base + 6], 0)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exx_and_shadow_exchange() {
        assert_eq!(lookup("exx", None, ModeKey::Implied).unwrap().opcode, vec![0xd9]);
        assert_eq!(lookup("ex", Some("af"), ModeKey::Implied).unwrap().opcode, vec![0x08]);
    }

    #[test]
    fn ix_load_immediate() {
        let enc = lookup("ld", Some("ix"), ModeKey::Immediate).unwrap();
        assert_eq!(enc.opcode, vec![0xdd, 0x21]);
        assert_eq!(enc.operand_size, 2);
    }

    #[test]
    fn djnz_is_branch() {
        assert!(lookup("djnz", None, ModeKey::Relative).unwrap().is_branch);
    }

    #[test]
    fn ed_prefixed_block_instruction() {
        assert_eq!(lookup("ldir", None, ModeKey::Implied).unwrap().opcode, vec![0xed, 0xb0]);
    }
}
