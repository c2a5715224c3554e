//! Per-target instruction-set tables: `lookup(mnemonic, addressing_mode)
//! → (opcode, size, flags)` (design note §9, spec §4.5). Each table is
//! a plain `match` over static data — there is nothing to construct per
//! compile, so dispatch is one function call per instruction.

pub mod arm7tdmi;
pub mod m68000;
pub mod mos6502;
pub mod sm83;
pub mod spc700;
pub mod v30mz;
pub mod wdc65816;
pub mod z80;

use crate::ast::{AddressingMode, IndexRegister, SizeSuffix};
use crate::target::TargetArchitecture;

/// The addressing-mode "shape" an instruction table keys on — the same
/// information `AddressingMode` carries, minus the operand expression,
/// plus the pass-1 zero-page/absolute narrowing decision the parser
/// cannot make on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeKey {
    Implied,
    Accumulator,
    Immediate,
    ZeroPage,
    Absolute,
    Indirect,
    IndexedIndirect,
    IndirectIndexed,
    LongIndirect,
    LongIndirectIndexed,
    ZeroPageIndexed(IndexRegister),
    AbsoluteIndexed(IndexRegister),
    Relative,
}

/// One table entry: the bytes that precede the operand, how many
/// operand bytes follow, and the behavioral flags code generation
/// needs (relative branch, 65816 REP/SEP register-width impact, …).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Encoding {
    pub opcode: Vec<u8>,
    pub operand_size: u8,
    pub is_branch: bool,
    /// `REP #imm` / `SEP #imm` on the 65816 change the processor's
    /// accumulator/index register width; code generation doesn't act
    /// on this itself (that would need full dataflow), but carries the
    /// flag for a future accumulator-width-aware assembler.
    pub affects_register_width: bool,
}

impl Encoding {
    pub fn total_size(&self) -> u8 {
        self.opcode.len() as u8 + self.operand_size
    }

    fn fixed(opcode: &[u8], operand_size: u8) -> Self {
        Self {
            opcode: opcode.to_vec(),
            operand_size,
            is_branch: false,
            affects_register_width: false,
        }
    }

    fn branch(opcode: &[u8], operand_size: u8) -> Self {
        Self {
            opcode: opcode.to_vec(),
            operand_size,
            is_branch: true,
            affects_register_width: false,
        }
    }

    fn register_width(opcode: &[u8], operand_size: u8) -> Self {
        Self {
            opcode: opcode.to_vec(),
            operand_size,
            is_branch: false,
            affects_register_width: true,
        }
    }
}

/// Derives a table `ModeKey` from a parsed `AddressingMode`, given
/// whether pass 1 narrowed an `Absolute` operand to zero-page.
pub fn mode_key(mode: &AddressingMode, narrowed_zero_page: bool) -> ModeKey {
    match mode {
        AddressingMode::Implied => ModeKey::Implied,
        AddressingMode::Accumulator => ModeKey::Accumulator,
        AddressingMode::Immediate(_) => ModeKey::Immediate,
        AddressingMode::Absolute(_) => {
            if narrowed_zero_page {
                ModeKey::ZeroPage
            } else {
                ModeKey::Absolute
            }
        }
        AddressingMode::ZeroPage(_) => ModeKey::ZeroPage,
        AddressingMode::Indirect(_) => ModeKey::Indirect,
        AddressingMode::IndexedIndirect(_) => ModeKey::IndexedIndirect,
        AddressingMode::IndirectIndexed(_) => ModeKey::IndirectIndexed,
        AddressingMode::LongIndirect(_) => ModeKey::LongIndirect,
        AddressingMode::LongIndirectIndexed(_) => ModeKey::LongIndirectIndexed,
        AddressingMode::Indexed(_, reg) => {
            if narrowed_zero_page {
                ModeKey::ZeroPageIndexed(*reg)
            } else {
                ModeKey::AbsoluteIndexed(*reg)
            }
        }
        AddressingMode::Relative(_) => ModeKey::Relative,
        AddressingMode::Register(_) => ModeKey::Implied,
    }
}

/// Looks up an instruction's encoding for the given target. `dest_register`
/// is the explicit leading register operand two-operand targets parse
/// (`LD A, (HL)` → `dest_register = Some("A")`); 6502-family targets
/// never set it. `size_suffix` is the 65816 `.b|.w|.l` override.
pub fn lookup(
    target: TargetArchitecture,
    mnemonic: &str,
    dest_register: Option<&str>,
    key: ModeKey,
    size_suffix: Option<SizeSuffix>,
) -> Option<Encoding> {
    match target {
        TargetArchitecture::Mos6502 | TargetArchitecture::Mos6507 => {
            mos6502::lookup(mnemonic, key, mos6502::Family::Nmos6502)
        }
        TargetArchitecture::Wdc65Sc02 => mos6502::lookup(mnemonic, key, mos6502::Family::Wdc65Sc02),
        TargetArchitecture::HuC6280 => mos6502::lookup(mnemonic, key, mos6502::Family::HuC6280),
        TargetArchitecture::Wdc65816 => wdc65816::lookup(mnemonic, key, size_suffix),
        TargetArchitecture::Sm83 => sm83::lookup(mnemonic, dest_register, key),
        TargetArchitecture::Z80 => z80::lookup(mnemonic, dest_register, key),
        TargetArchitecture::Motorola68000 => m68000::lookup(mnemonic, dest_register, key, size_suffix),
        TargetArchitecture::Arm7Tdmi => arm7tdmi::lookup(mnemonic, dest_register, key),
        TargetArchitecture::Spc700 => spc700::lookup(mnemonic, dest_register, key),
        TargetArchitecture::V30Mz => v30mz::lookup(mnemonic, dest_register, key),
    }
}

/// Whether `name` is a recognized mnemonic for `target`, used by the
/// lexer to decide whether a statement-start identifier lexes as
/// `Mnemonic` rather than a plain `Identifier`.
pub fn is_mnemonic(target: TargetArchitecture, name: &str) -> bool {
    let upper = name.to_ascii_uppercase();
    // strip a trailing `.b`/`.w`/`.l` size suffix before the set check,
    // mirroring how the lexer re-splits it later (parser::split_size_suffix).
    let base = if upper.len() > 2 && upper.as_bytes()[upper.len() - 2] == b'.' {
        &upper[..upper.len() - 2]
    } else {
        upper.as_str()
    };
    match target {
        TargetArchitecture::Mos6502 | TargetArchitecture::Mos6507 => {
            mos6502::MNEMONICS_NMOS.contains(&base)
        }
        TargetArchitecture::Wdc65Sc02 => {
            mos6502::mnemonics_for(mos6502::Family::Wdc65Sc02).contains(&base)
        }
        TargetArchitecture::HuC6280 => {
            mos6502::mnemonics_for(mos6502::Family::HuC6280).contains(&base)
        }
        TargetArchitecture::Wdc65816 => wdc65816::mnemonics().contains(&base),
        TargetArchitecture::Sm83 => sm83::MNEMONICS.contains(&base),
        TargetArchitecture::Z80 => z80::MNEMONICS.contains(&base),
        TargetArchitecture::Motorola68000 => m68000::MNEMONICS.contains(&base),
        TargetArchitecture::Arm7Tdmi => arm7tdmi::MNEMONICS.contains(&base),
        TargetArchitecture::Spc700 => spc700::MNEMONICS.contains(&base),
        TargetArchitecture::V30Mz => v30mz::MNEMONICS.contains(&base),
    }
}

/// Whether `name` is a register name on `target`, used by the parser to
/// decide whether a bare identifier operand is a register (binds to
/// `dest_register`/the two-operand shape) or a plain expression.
pub fn is_register_name(target: TargetArchitecture, name: &str) -> bool {
    match target {
        TargetArchitecture::Mos6502
        | TargetArchitecture::Mos6507
        | TargetArchitecture::Wdc65Sc02
        | TargetArchitecture::HuC6280
        | TargetArchitecture::Wdc65816 => false,
        TargetArchitecture::Sm83 => sm83::is_register(name),
        TargetArchitecture::Z80 => z80::is_register(name),
        TargetArchitecture::Motorola68000 => m68000::is_register(name),
        TargetArchitecture::Arm7Tdmi => arm7tdmi::is_register(name),
        TargetArchitecture::Spc700 => spc700::is_register(name),
        TargetArchitecture::V30Mz => v30mz::is_register(name),
    }
}

/// Targets whose mnemonics support a destination-register operand
/// (`LD A, ...`), as opposed to the 6502 family's single implicit
/// accumulator baked into the mnemonic itself.
pub fn uses_register_operand(target: TargetArchitecture) -> bool {
    matches!(
        target,
        TargetArchitecture::Sm83
            | TargetArchitecture::Z80
            | TargetArchitecture::Motorola68000
            | TargetArchitecture::Arm7Tdmi
            | TargetArchitecture::Spc700
            | TargetArchitecture::V30Mz
    )
}
