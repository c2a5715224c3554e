//! WDC 65816: binary-compatible superset of the 6502/65C02 opcode map,
//! plus new addressing modes (stack-relative, `[dp]` long indirect,
//! long absolute) and new instructions for native 16-bit/24-bit mode.
//!
//! `.b|.w|.l` size suffixes override the operand width the table would
//! otherwise pick: `lda.w $10` forces the 3-byte absolute form even
//! though `$10` would otherwise narrow to direct-page, and `lda.l`
//! selects the 4-byte (1 opcode + 3 address bytes) long form.

use super::mos6502::{self, Family};
use super::{Encoding, ModeKey};
use crate::ast::{IndexRegister as Idx, SizeSuffix};

const MNEMONICS_816_EXTRA: &[&str] = &[
    "PEA", "PEI", "PER", "MVN", "MVP", "REP", "SEP", "BRL", "JSL", "JML", "RTL", "TCD", "TDC",
    "TCS", "TSC", "TXY", "TYX", "STP", "WAI", "WDM", "COP", "XCE", "PHB", "PLB", "PHD", "PLD",
    "PHK",
];

pub fn mnemonics() -> Vec<&'static str> {
    let mut v = mos6502::mnemonics_for(Family::Wdc65Sc02);
    v.extend_from_slice(MNEMONICS_816_EXTRA);
    v
}

pub fn lookup(mnemonic: &str, key: ModeKey, size_suffix: Option<SizeSuffix>) -> Option<Encoding> {
    let m = mnemonic.to_ascii_uppercase();

    if size_suffix == Some(SizeSuffix::Long) {
        if let Some(enc) = lookup_long(&m, key) {
            return Some(enc);
        }
    }

    // A `.w` suffix forces the wide (absolute) form even for an
    // operand value that would otherwise narrow to direct-page; a
    // `.b` suffix forces direct-page for a value the narrowing pass
    // couldn't prove fits (an explicit promise from the programmer).
    let adjusted_key = match (size_suffix, key) {
        (Some(SizeSuffix::Word), ModeKey::ZeroPage) => ModeKey::Absolute,
        (Some(SizeSuffix::Word), ModeKey::ZeroPageIndexed(r)) => ModeKey::AbsoluteIndexed(r),
        (Some(SizeSuffix::Byte), ModeKey::Absolute) => ModeKey::ZeroPage,
        (Some(SizeSuffix::Byte), ModeKey::AbsoluteIndexed(r)) => ModeKey::ZeroPageIndexed(r),
        _ => key,
    };

    if let Some(enc) = mos6502::lookup_nmos(&m, adjusted_key) {
        return Some(enc);
    }
    if let Some(enc) = mos6502::lookup_65c02_extra(&m, adjusted_key) {
        return Some(enc);
    }
    lookup_816_extra(&m, adjusted_key)
}

macro_rules! enc {
    ($op:expr) => {
        Encoding::fixed(&[$op], 0)
    };
    ($op:expr, $size:expr) => {
        Encoding::fixed(&[$op], $size)
    };
}

fn lookup_816_extra(m: &str, key: ModeKey) -> Option<Encoding> {
    use ModeKey::*;
    Some(match (m, key) {
        ("PEA", Absolute) => enc!(0xf4, 2),
        ("PEI", Indirect) => enc!(0xd4, 1),
        ("PER", Relative) | ("PER", Absolute) => enc!(0x62, 2),
        ("MVN", Absolute) => enc!(0x54, 2),
        ("MVP", Absolute) => enc!(0x44, 2),
        ("REP", Immediate) => Encoding::register_width(&[0xc2], 1),
        ("SEP", Immediate) => Encoding::register_width(&[0xe2], 1),
        ("BRL", Relative) | ("BRL", Absolute) => Encoding::branch(&[0x82], 2),
        ("JSL", Absolute) => enc!(0x22, 3),
        ("JML", Absolute) => enc!(0x5c, 3),
        ("JML", Indirect) => enc!(0xdc, 2),
        ("RTL", Implied) => enc!(0x6b),
        ("TCD", Implied) => enc!(0x5b),
        ("TDC", Implied) => enc!(0x7b),
        ("TCS", Implied) => enc!(0x1b),
        ("TSC", Implied) => enc!(0x3b),
        ("TXY", Implied) => enc!(0x9b),
        ("TYX", Implied) => enc!(0xbb),
        ("STP", Implied) => enc!(0xdb),
        ("WAI", Implied) => enc!(0xcb),
        ("WDM", Immediate) => enc!(0x42, 1),
        ("COP", Immediate) => enc!(0x02, 1),
        ("XCE", Implied) => enc!(0xfb),
        ("PHB", Implied) => enc!(0x8b),
        ("PLB", Implied) => enc!(0xab),
        ("PHD", Implied) => enc!(0x0b),
        ("PLD", Implied) => enc!(0x2b),
        ("PHK", Implied) => enc!(0x4b),

        // stack-relative: `$nn,s` / `($nn,s),y`
        ("LDA", ZeroPageIndexed(Idx::S)) => enc!(0xa3, 1),
        ("STA", ZeroPageIndexed(Idx::S)) => enc!(0x83, 1),

        // `[dp]` / `[dp],y` long-indirect forms
        ("LDA", LongIndirect) => enc!(0xa7, 1),
        ("LDA", LongIndirectIndexed) => enc!(0xb7, 1),
        ("STA", LongIndirect) => enc!(0x87, 1),
        ("STA", LongIndirectIndexed) => enc!(0x97, 1),

        _ => return None,
    })
}

/// Long (24-bit address, `.l` suffix) addressing, a 65816-only form
/// not representable by the shared `ModeKey::Absolute`/`ZeroPage`
/// narrowing since it's always exactly 3 address bytes regardless of
/// the resolved value.
fn lookup_long(m: &str, key: ModeKey) -> Option<Encoding> {
    use ModeKey::*;
    Some(match (m, key) {
        ("LDA", Absolute) | ("LDA", ZeroPage) => enc!(0xaf, 3),
        ("LDA", AbsoluteIndexed(Idx::X)) | ("LDA", ZeroPageIndexed(Idx::X)) => enc!(0xbf, 3),
        ("STA", Absolute) | ("STA", ZeroPage) => enc!(0x8f, 3),
        ("STA", AbsoluteIndexed(Idx::X)) | ("STA", ZeroPageIndexed(Idx::X)) => enc!(0x9f, 3),
        ("JSL", Absolute) | ("JSL", ZeroPage) => enc!(0x22, 3),
        ("JML", Absolute) | ("JML", ZeroPage) => enc!(0x5c, 3),
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_6502_opcodes_still_resolve() {
        assert_eq!(
            lookup("lda", ModeKey::Immediate, None).unwrap().opcode,
            vec![0xa9]
        );
    }

    #[test]
    fn word_suffix_forces_absolute_form() {
        let enc = lookup("lda", ModeKey::ZeroPage, Some(SizeSuffix::Word)).unwrap();
        assert_eq!(enc.opcode, vec![0xad]);
        assert_eq!(enc.total_size(), 3);
    }

    #[test]
    fn long_suffix_selects_three_byte_address() {
        let enc = lookup("lda", ModeKey::Absolute, Some(SizeSuffix::Long)).unwrap();
        assert_eq!(enc.opcode, vec![0xaf]);
        assert_eq!(enc.total_size(), 4);
    }

    #[test]
    fn rep_sep_flag_register_width() {
        assert!(lookup("rep", ModeKey::Immediate, None).unwrap().affects_register_width);
    }
}
