//! Sharp SM83 (Game Boy CPU): a stripped Z80 derivative — no IX/IY, no
//! shadow register file, no block-transfer instructions, but a full set
//! of CB-prefixed bit/rotate/shift opcodes. Two-operand syntax
//! (`LD A, B`) is the norm; `dest_register` carries the left-hand
//! register when present.

use super::{Encoding, ModeKey};

pub const MNEMONICS: &[&str] = &[
    "LD", "LDH", "PUSH", "POP", "ADD", "ADC", "SUB", "SBC", "AND", "OR", "XOR", "CP", "INC",
    "DEC", "SWAP", "DAA", "CPL", "CCF", "SCF", "NOP", "HALT", "STOP", "DI", "EI", "RLCA", "RLA",
    "RRCA", "RRA", "RLC", "RL", "RRC", "RR", "SLA", "SRA", "SRL", "BIT", "SET", "RES", "JP",
    "JR", "CALL", "RET", "RETI", "RST",
];

pub const REGISTERS_8: &[&str] = &["A", "B", "C", "D", "E", "H", "L"];
pub const REGISTERS_16: &[&str] = &["BC", "DE", "HL", "SP", "AF"];

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
    Encoding {
        opcode: opcode.to_vec(),
        operand_size,
        is_branch: false,
        affects_register_width: false,
    }
}

fn branch(opcode: &[u8], operand_size: u8) -> Encoding {
    Encoding {
        opcode: opcode.to_vec(),
        operand_size,
        is_branch: true,
        affects_register_width: false,
    }
}

/// `dest` is the register on the left of the comma (`LD A, ...` →
/// `Some("A")`); `key`/the expression carries the right-hand operand's
/// shape. A single-operand instruction (`INC B`, `PUSH BC`) parses its
/// one register into `dest` with `key = ModeKey::Implied`.
pub fn lookup(mnemonic: &str, dest: Option<&str>, key: ModeKey) -> Option<Encoding> {
    use ModeKey::*;
    let m = mnemonic.to_ascii_uppercase();
    let d = dest.map(|s| s.to_ascii_uppercase());

    match (m.as_str(), d.as_deref(), key) {
        ("NOP", None, Implied) => return Some(enc(&[0x00], 0)),
        ("HALT", None, Implied) => return Some(enc(&[0x76], 0)),
        ("STOP", None, Implied) => return Some(enc(&[0x10, 0x00], 0)),
        ("DI", None, Implied) => return Some(enc(&[0xf3], 0)),
        ("EI", None, Implied) => return Some(enc(&[0xfb], 0)),
        ("DAA", None, Implied) => return Some(enc(&[0x27], 0)),
        ("CPL", None, Implied) => return Some(enc(&[0x2f], 0)),
        ("CCF", None, Implied) => return Some(enc(&[0x3f], 0)),
        ("SCF", None, Implied) => return Some(enc(&[0x37], 0)),
        ("RLCA", None, Implied) => return Some(enc(&[0x07], 0)),
        ("RLA", None, Implied) => return Some(enc(&[0x17], 0)),
        ("RRCA", None, Implied) => return Some(enc(&[0x0f], 0)),
        ("RRA", None, Implied) => return Some(enc(&[0x1f], 0)),
        ("RET", None, Implied) => return Some(enc(&[0xc9], 0)),
        ("RETI", None, Implied) => return Some(enc(&[0xd9], 0)),
        _ => {}
    }

    // `INC r` / `DEC r` / `INC rr` / `DEC rr`
    if matches!(m.as_str(), "INC" | "DEC") {
        if let Some(reg) = &d {
            if key == ModeKey::Implied {
                if let Some(bits) = reg8_bits(reg) {
                    let base = if m == "INC" { 0x04 } else { 0x05 };
                    return Some(enc(&[base + (bits << 3)], 0));
                }
                let pair_opcode = match (m.as_str(), reg.as_str()) {
                    ("INC", "BC") => 0x03,
                    ("INC", "DE") => 0x13,
                    ("INC", "HL") => 0x23,
                    ("INC", "SP") => 0x33,
                    ("DEC", "BC") => 0x0b,
                    ("DEC", "DE") => 0x1b,
                    ("DEC", "HL") => 0x2b,
                    ("DEC", "SP") => 0x3b,
                    _ => return None,
                };
                return Some(enc(&[pair_opcode], 0));
            }
            if key == Indirect && reg == "HL" {
                return Some(enc(&[if m == "INC" { 0x34 } else { 0x35 }], 0));
            }
        }
    }

    // `PUSH rr` / `POP rr`
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

    // unconditional/conditional control flow where `dest` carries the
    // condition code (`Z`, `NZ`, `C`, `NC`) or is absent.
    if matches!(m.as_str(), "JP" | "JR" | "CALL") {
        let cond = d.as_deref();
        return lookup_control_flow(&m, cond, key);
    }
    if m == "RST" {
        // the vector itself (0x00/0x08/.../0x38) is folded into the
        // opcode's top bits by codegen from the resolved operand value;
        // the table only confirms a single-immediate-operand shape.
        if key == Immediate {
            return Some(enc(&[0xc7], 1));
        }
    }

    // 8-bit ALU `op A, r` / `op A, n` / `op A, (HL)`, and the
    // one-operand sugar `op r` meaning `op A, r`.
    if matches!(m.as_str(), "ADD" | "ADC" | "SUB" | "SBC" | "AND" | "XOR" | "OR" | "CP") {
        return lookup_alu(&m, d.as_deref(), key);
    }

    if m == "LD" {
        return lookup_ld(d.as_deref(), key);
    }
    if m == "LDH" {
        return lookup_ldh(key);
    }

    if matches!(m.as_str(), "RLC" | "RRC" | "RL" | "RR" | "SLA" | "SRA" | "SWAP" | "SRL") {
        return lookup_cb_rotate(&m, d.as_deref(), key);
    }
    if matches!(m.as_str(), "BIT" | "SET" | "RES") {
        return lookup_cb_bit(&m, key);
    }

    None
}

fn lookup_control_flow(m: &str, cond: Option<&str>, key: ModeKey) -> Option<Encoding> {
    use ModeKey::*;
    let cc = |c: &str| -> Option<u8> {
        Some(match c {
            "NZ" => 0,
            "Z" => 1,
            "NC" => 2,
            "C" => 3,
            _ => return None,
        })
    };
    match m {
        "JP" => match (cond, key) {
            (None, Absolute) | (None, Relative) => Some(enc(&[0xc3], 2)),
            (None, Indirect) => Some(enc(&[0xe9], 0)), // JP (HL)
            (Some(c), Absolute) | (Some(c), Relative) => {
                Some(enc(&[0xc2 + (cc(c)? << 3)], 2))
            }
            _ => None,
        },
        "JR" => match (cond, key) {
            (None, Relative) | (None, Absolute) => Some(branch(&[0x18], 1)),
            (Some(c), Relative) | (Some(c), Absolute) => Some(branch(&[0x20 + (cc(c)? << 3)], 1)),
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

fn lookup_alu(m: &str, dest: Option<&str>, key: ModeKey) -> Option<Encoding> {
    use ModeKey::*;
    // one-operand sugar: `AND B` means `AND A, B`.
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
        (Some(d), Implied) if d.eq_ignore_ascii_case("A") => None,
        (Some(reg), Implied) => reg8_bits(reg).map(|bits| enc(&[base_reg + bits], 0)),
        _ => None,
    }
}

fn lookup_ld(dest: Option<&str>, key: ModeKey) -> Option<Encoding> {
    use ModeKey::*;
    let dest = dest?;
    let d_up = dest.to_ascii_uppercase();

    // `LD r, n`
    if key == Immediate {
        if let Some(bits) = reg8_bits(&d_up) {
            return Some(enc(&[0x06 + (bits << 3)], 1));
        }
        let opcode = match d_up.as_str() {
            "BC" => 0x01,
            "DE" => 0x11,
            "HL" => 0x21,
            "SP" => 0x31,
            _ => return None,
        };
        return Some(enc(&[opcode], 2));
    }

    // `LD r, (HL)` / `LD (HL), r` handled via dest register vs Indirect
    // key for the right-hand operand shape; `LD A, (BC)`/`(DE)` have
    // dedicated opcodes handled by the Register variant below since
    // `BC`/`DE` parse as bare registers, not an indirect mode, under
    // this grammar (`(BC)` parses as `Indirect` with operand `BC`
    // evaluating as an identifier, which codegen resolves specially).
    if key == Indirect {
        if let Some(bits) = reg8_bits(&d_up) {
            return Some(enc(&[0x46 + (bits << 3)], 0));
        }
    }

    // `LD (HL), n` is handled by codegen recognizing key==Indirect with
    // an Immediate-shaped... not representable in this single-mode
    // table; `LD (HL), 5` instead parses dest=None, key=Indirect, whose
    // right-hand immediate is folded in by codegen directly (opcode 0x36).
    if dest.is_empty() {
        return None;
    }

    // `LD (nn), SP`
    if d_up == "SP" && key == Absolute {
        return Some(enc(&[0x08], 2));
    }
    // `LD SP, HL`
    if d_up == "SP" && key == Implied {
        return Some(enc(&[0xf9], 0));
    }
    // `LD A, (nn)` / `LD (nn), A`
    if d_up == "A" && key == Absolute {
        return Some(enc(&[0xfa], 2));
    }

    // register-to-register `LD r, r'` — both are bare identifiers, so
    // the right-hand side arrives as `ModeKey::Implied` carrying the
    // source register name via the instruction's (unparsed here)
    // second operand; codegen resolves the specific source register
    // bits from the raw operand text.
    if key == Implied {
        if reg8_bits(&d_up).is_some() {
            // opcode base computed fully by codegen (needs source reg too)
            return Some(Encoding {
                opcode: vec![0x40],
                operand_size: 0,
                is_branch: false,
                affects_register_width: false,
            });
        }
    }

    None
}

fn lookup_ldh(key: ModeKey) -> Option<Encoding> {
    use ModeKey::*;
    match key {
        Absolute | ZeroPage => Some(enc(&[0xe0], 1)),
        Indirect => Some(enc(&[0xe2], 0)),
        _ => None,
    }
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
        "SWAP" => 0x30,
        "SRL" => 0x38,
        _ => return None,
    };
    match (reg, key) {
        (Some(r), Implied) => reg8_bits(r).map(|bits| enc(&[0xcb, base + bits], 0)),
        (None, Indirect) | (Some(_), Indirect) => Some(enc(&[0xcb, base + 6], 0)),
        _ => None,
    }
}

fn lookup_cb_bit(m: &str, key: ModeKey) -> Option<Encoding> {
    use ModeKey::*;
    let base: u8 = match m {
        "BIT" => 0x40,
        "RES" => 0x80,
        "SET" => 0xc0,
        _ => return None,
    };
    // bit index and target register are both plain expressions/
    // identifiers folded by codegen into the opcode byte; the table
    // only confirms a two-operand immediate+register shape exists.
    match key {
        Immediate | Absolute => Some(enc(&[0xcb, base], 0)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nop_and_halt() {
        assert_eq!(lookup("nop", None, ModeKey::Implied).unwrap().opcode, vec![0x00]);
        assert_eq!(lookup("halt", None, ModeKey::Implied).unwrap().opcode, vec![0x76]);
    }

    #[test]
    fn ld_immediate_into_register() {
        let enc = lookup("ld", Some("a"), ModeKey::Immediate).unwrap();
        assert_eq!(enc.opcode, vec![0x3e]);
        assert_eq!(enc.operand_size, 1);
    }

    #[test]
    fn inc_register_pair() {
        assert_eq!(lookup("inc", Some("hl"), ModeKey::Implied).unwrap().opcode, vec![0x23]);
    }

    #[test]
    fn conditional_jump_relative_is_branch() {
        let enc = lookup("jr", Some("z"), ModeKey::Relative).unwrap();
        assert!(enc.is_branch);
    }

    #[test]
    fn cb_prefixed_bit_test() {
        let enc = lookup("bit", None, ModeKey::Immediate).unwrap();
        assert_eq!(enc.opcode, vec![0xcb, 0x40]);
    }
}
