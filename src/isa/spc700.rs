//! Sony SPC700 (the SNES's audio coprocessor): an accumulator-based
//! 8-bit CPU distinct from the 6502 family despite superficial
//! similarity. Registers `A`, `X`, `Y`, the 16-bit pair `YA`, `SP`, and
//! the flags register `PSW`. Covers the common load/store/ALU/branch
//! subset; the bit-indexed `SET1`/`CLR1`/`BBS`/`BBC` direct-page-bit
//! instructions and the `TCALL n` table-call form are not modeled (both
//! need operand shapes this grammar doesn't parse).

use super::{Encoding, ModeKey};

pub const MNEMONICS: &[&str] = &[
    "MOV", "MOVW", "ADC", "SBC", "CMP", "AND", "OR", "EOR", "INC", "DEC", "ASL", "LSR", "ROL",
    "ROR", "XCN", "MUL", "DIV", "DAA", "DAS", "NOP", "SLEEP", "STOP", "CLRC", "SETC", "NOTC",
    "CLRV", "CLRP", "SETP", "EI", "DI", "BRA", "BEQ", "BNE", "BCS", "BCC", "BVS", "BVC", "BMI",
    "BPL", "CALL", "PCALL", "RET", "RETI", "PUSH", "POP", "BRK", "CBNE", "DBNZ",
];

pub const REGISTERS: &[&str] = &["A", "X", "Y", "YA", "SP", "PSW"];

pub fn is_register(name: &str) -> bool {
    REGISTERS.contains(&name.to_ascii_uppercase().as_str())
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

    match m.as_str() {
        "NOP" => return Some(enc(&[0x00], 0)),
        "SLEEP" => return Some(enc(&[0xef], 0)),
        "STOP" => return Some(enc(&[0xff], 0)),
        "CLRC" => return Some(enc(&[0x60], 0)),
        "SETC" => return Some(enc(&[0x80], 0)),
        "NOTC" => return Some(enc(&[0xed], 0)),
        "CLRV" => return Some(enc(&[0xe0], 0)),
        "CLRP" => return Some(enc(&[0x20], 0)),
        "SETP" => return Some(enc(&[0x40], 0)),
        "EI" => return Some(enc(&[0xa0], 0)),
        "DI" => return Some(enc(&[0xc0], 0)),
        "RET" => return Some(enc(&[0x6f], 0)),
        "RETI" => return Some(enc(&[0x7f], 0)),
        "BRK" => return Some(enc(&[0x0f], 0)),
        "DAA" => return Some(enc(&[0xdf], 0)),
        "DAS" => return Some(enc(&[0xbe], 0)),
        "XCN" => return Some(enc(&[0x9f], 0)),
        "MUL" => return Some(enc(&[0xcf], 0)),
        "DIV" => return Some(enc(&[0x9e], 0)),
        _ => {}
    }

    if matches!(m.as_str(), "BRA" | "BEQ" | "BNE" | "BCS" | "BCC" | "BVS" | "BVC" | "BMI" | "BPL") {
        let opcode: u8 = match m.as_str() {
            "BRA" => 0x2f,
            "BEQ" => 0xf0,
            "BNE" => 0xd0,
            "BCS" => 0xb0,
            "BCC" => 0x90,
            "BVS" => 0x70,
            "BVC" => 0x50,
            "BMI" => 0x30,
            "BPL" => 0x10,
            _ => return None,
        };
        return match key {
            Relative | Absolute => Some(branch(&[opcode], 1)),
            _ => None,
        };
    }

    if m == "CALL" {
        return match key {
            Absolute => Some(enc(&[0x3f], 2)),
            _ => None,
        };
    }
    if m == "PCALL" {
        return match key {
            Absolute | Immediate => Some(enc(&[0x4f], 1)),
            _ => None,
        };
    }
    if matches!(m.as_str(), "CBNE" | "DBNZ") {
        return match key {
            Relative | Absolute => Some(branch(&[if m == "CBNE" { 0x2e } else { 0xfe }], 2)),
            _ => None,
        };
    }

    if matches!(m.as_str(), "PUSH" | "POP") {
        if let Some(reg) = &d {
            let opcode = match (m.as_str(), reg.as_str()) {
                ("PUSH", "A") => 0x2d,
                ("PUSH", "X") => 0x4d,
                ("PUSH", "Y") => 0x6d,
                ("PUSH", "PSW") => 0x0d,
                ("POP", "A") => 0xae,
                ("POP", "X") => 0xce,
                ("POP", "Y") => 0xee,
                ("POP", "PSW") => 0x8e,
                _ => return None,
            };
            return Some(enc(&[opcode], 0));
        }
    }

    if matches!(m.as_str(), "INC" | "DEC") {
        if let Some(reg) = &d {
            if key == Implied {
                let opcode = match (m.as_str(), reg.as_str()) {
                    ("INC", "A") => 0xbc,
                    ("INC", "X") => 0x3d,
                    ("INC", "Y") => 0xfc,
                    ("DEC", "A") => 0x9c,
                    ("DEC", "X") => 0x1d,
                    ("DEC", "Y") => 0xdc,
                    _ => return None,
                };
                return Some(enc(&[opcode], 0));
            }
        }
        return match key {
            ZeroPage => Some(enc(&[if m == "INC" { 0xab } else { 0x8b }], 1)),
            _ => None,
        };
    }

    if matches!(m.as_str(), "ASL" | "LSR" | "ROL" | "ROR") {
        let base: u8 = match m.as_str() {
            "ASL" => 0x1c,
            "LSR" => 0x5c,
            "ROL" => 0x3c,
            "ROR" => 0x7c,
            _ => return None,
        };
        return match (d.as_deref(), key) {
            (Some("A"), Implied) => Some(enc(&[base], 0)),
            (_, ZeroPage) => Some(enc(&[base - 0x04], 1)),
            _ => None,
        };
    }

    if matches!(m.as_str(), "ADC" | "SBC" | "CMP" | "AND" | "OR" | "EOR") {
        return lookup_alu(&m, d.as_deref(), key);
    }
    if m == "MOV" {
        return lookup_mov(d.as_deref(), key);
    }
    if m == "MOVW" {
        return match (d.as_deref(), key) {
            (Some("YA"), ZeroPage) => Some(enc(&[0xba], 1)),
            (Some(_), Implied) => Some(enc(&[0xda], 1)),
            _ => None,
        };
    }

    None
}

fn lookup_alu(m: &str, dest: Option<&str>, key: ModeKey) -> Option<Encoding> {
    use ModeKey::*;
    let (base_immediate, base_zp): (u8, u8) = match m {
        "ADC" => (0x88, 0x84),
        "SBC" => (0xa8, 0xa4),
        "CMP" => (0x68, 0x64),
        "AND" => (0x28, 0x24),
        "OR" => (0x08, 0x04),
        "EOR" => (0x48, 0x44),
        _ => return None,
    };
    match (dest, key) {
        (Some("A"), Immediate) | (None, Immediate) => Some(enc(&[base_immediate], 1)),
        (Some("A"), ZeroPage) | (None, ZeroPage) => Some(enc(&[base_zp], 1)),
        (Some("A"), Indirect) | (None, Indirect) => Some(enc(&[base_zp + 0x01], 0)),
        _ => None,
    }
}

fn lookup_mov(dest: Option<&str>, key: ModeKey) -> Option<Encoding> {
    use ModeKey::*;
    let dest = dest?;
    match (dest.to_ascii_uppercase().as_str(), key) {
        ("A", Immediate) => Some(enc(&[0xe8], 1)),
        ("A", ZeroPage) => Some(enc(&[0xe4], 1)),
        ("A", Indirect) => Some(enc(&[0xe6], 0)),
        ("A", Absolute) => Some(enc(&[0xe5], 2)),
        ("X", Immediate) => Some(enc(&[0xcd], 1)),
        ("X", ZeroPage) => Some(enc(&[0xf8], 1)),
        ("Y", Immediate) => Some(enc(&[0x8d], 1)),
        ("Y", ZeroPage) => Some(enc(&[0xeb], 1)),
        ("SP", Implied) => Some(enc(&[0xbd], 0)),
        (_, ZeroPage) => Some(enc(&[0xc4], 1)), // MOV dp, A
        (_, Absolute) => Some(enc(&[0xc5], 2)), // MOV !abs, A
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mov_a_immediate() {
        assert_eq!(lookup("mov", Some("a"), ModeKey::Immediate).unwrap().opcode, vec![0xe8]);
    }

    #[test]
    fn branch_always_is_flagged() {
        assert!(lookup("bra", None, ModeKey::Relative).unwrap().is_branch);
    }

    #[test]
    fn push_pop_registers() {
        assert_eq!(lookup("push", Some("a"), ModeKey::Implied).unwrap().opcode, vec![0x2d]);
        assert_eq!(lookup("pop", Some("y"), ModeKey::Implied).unwrap().opcode, vec![0xee]);
    }
}
