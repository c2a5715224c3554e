//! ARM7TDMI (Game Boy Advance): 32-bit ARM-mode encoding only — this
//! table does not model the 16-bit Thumb instruction set, which would
//! need its own mnemonic/operand grammar. Every ARM instruction is a
//! fixed 4-byte word; the condition code defaults to `AL` (always) and
//! is not parsed separately (a `COND`-suffixed mnemonic, e.g. `BEQ`,
//! selects the branch's condition field instead).

use super::{Encoding, ModeKey};

pub const MNEMONICS: &[&str] = &[
    "MOV", "MVN", "ADD", "ADC", "SUB", "SBC", "RSB", "RSC", "AND", "ORR", "EOR", "BIC", "CMP",
    "CMN", "TST", "TEQ", "MUL", "MLA", "LDR", "STR", "LDM", "STM", "PUSH", "POP", "B", "BL",
    "BX", "BEQ", "BNE", "BCS", "BCC", "BMI", "BPL", "BVS", "BVC", "BHI", "BLS", "BGE", "BLT",
    "BGT", "BLE", "SWI", "NOP", "LSL", "LSR", "ASR", "ROR",
];

pub const REGISTERS: &[&str] = &[
    "R0", "R1", "R2", "R3", "R4", "R5", "R6", "R7", "R8", "R9", "R10", "R11", "R12", "R13", "SP",
    "R14", "LR", "R15", "PC",
];

pub fn is_register(name: &str) -> bool {
    REGISTERS.contains(&name.to_ascii_uppercase().as_str())
}

fn enc(opcode: u32) -> Encoding {
    Encoding {
        opcode: opcode.to_le_bytes().to_vec(),
        operand_size: 0,
        is_branch: false,
        affects_register_width: false,
    }
}

fn branch_enc(cond: u32) -> Encoding {
    // condition in bits 31..28, `101` branch class in 27..25; the
    // 24-bit signed word offset itself is computed and spliced in by
    // code generation, which is the only stage that knows the target.
    Encoding {
        opcode: (cond << 28 | 0b1010 << 24).to_le_bytes().to_vec(),
        operand_size: 0,
        is_branch: true,
        affects_register_width: false,
    }
}

fn cond_bits(mnemonic_suffix: &str) -> Option<u32> {
    Some(match mnemonic_suffix {
        "" => 0xe, // AL
        "EQ" => 0x0,
        "NE" => 0x1,
        "CS" => 0x2,
        "CC" => 0x3,
        "MI" => 0x4,
        "PL" => 0x5,
        "VS" => 0x6,
        "VC" => 0x7,
        "HI" => 0x8,
        "LS" => 0x9,
        "GE" => 0xa,
        "LT" => 0xb,
        "GT" => 0xc,
        "LE" => 0xd,
        _ => return None,
    })
}

pub fn lookup(mnemonic: &str, _dest: Option<&str>, key: ModeKey) -> Option<Encoding> {
    use ModeKey::*;
    let m = mnemonic.to_ascii_uppercase();

    if m == "NOP" {
        return Some(enc(0xe1a0_0000)); // MOV R0, R0
    }
    if m == "BX" {
        return Some(enc(0xe12f_ff10));
    }
    if m == "SWI" {
        return match key {
            Immediate => Some(enc(0xef00_0000)),
            _ => None,
        };
    }

    if m == "B" || m == "BL" {
        return match key {
            Relative | Absolute => Some(branch_enc(0xe)),
            _ => None,
        };
    }
    if let Some(rest) = m.strip_prefix('B') {
        if let Some(cond) = cond_bits(rest) {
            return match key {
                Relative | Absolute => Some(branch_enc(cond)),
                _ => None,
            };
        }
    }

    let data_processing_base: Option<u32> = match m.as_str() {
        "AND" => Some(0x0),
        "EOR" => Some(0x1),
        "SUB" => Some(0x2),
        "RSB" => Some(0x3),
        "ADD" => Some(0x4),
        "ADC" => Some(0x5),
        "SBC" => Some(0x6),
        "RSC" => Some(0x7),
        "TST" => Some(0x8),
        "TEQ" => Some(0x9),
        "CMP" => Some(0xa),
        "CMN" => Some(0xb),
        "ORR" => Some(0xc),
        "MOV" => Some(0xd),
        "BIC" => Some(0xe),
        "MVN" => Some(0xf),
        _ => None,
    };
    if let Some(opc) = data_processing_base {
        let immediate_bit = matches!(key, Immediate) as u32;
        return Some(enc(0xe << 28 | immediate_bit << 25 | opc << 21));
    }

    if matches!(m.as_str(), "LSL" | "LSR" | "ASR" | "ROR") {
        return Some(enc(0xe1a0_0000));
    }

    if m == "MUL" {
        return Some(enc(0xe000_0090));
    }
    if m == "MLA" {
        return Some(enc(0xe020_0090));
    }

    if m == "LDR" {
        return match key {
            Absolute | Indirect => Some(enc(0xe510_0000)),
            _ => None,
        };
    }
    if m == "STR" {
        return match key {
            Absolute | Indirect => Some(enc(0xe500_0000)),
            _ => None,
        };
    }
    if m == "LDM" {
        return Some(enc(0xe890_0000));
    }
    if m == "STM" {
        return Some(enc(0xe880_0000));
    }
    if m == "PUSH" {
        return Some(enc(0xe92d_0000));
    }
    if m == "POP" {
        return Some(enc(0xe8bd_0000));
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unconditional_branch_is_four_bytes_and_flagged() {
        let e = lookup("b", None, ModeKey::Relative).unwrap();
        assert_eq!(e.opcode.len(), 4);
        assert!(e.is_branch);
    }

    #[test]
    fn conditional_branch_suffix_sets_condition_field() {
        let e = lookup("beq", None, ModeKey::Absolute).unwrap();
        assert_eq!(e.opcode[3] & 0xf0, 0x00);
    }

    #[test]
    fn mov_immediate_sets_immediate_bit() {
        let e = lookup("mov", None, ModeKey::Immediate).unwrap();
        assert_ne!(e.opcode[3] & 0x02, 0);
    }
}
