//! End-to-end exercises of `poppy::assemble` across the full pipeline
//! (lexer, preprocessor, parser, semantic analyzer, code generator, ROM
//! builder), grounded in the scenarios a single source file should
//! produce byte-exact output for.

use poppy::file_reader::MockFileReader;
use poppy::options::CompilerOptions;
use poppy::target::TargetArchitecture;
use poppy::assemble;

fn options(target: TargetArchitecture, main: &str) -> CompilerOptions {
    CompilerOptions {
        target,
        main_source: main.into(),
        ..CompilerOptions::default()
    }
}

#[test]
fn nes_minimal_reset_vector() {
    let mut reader = MockFileReader::default();
    reader.add_file(
        "main.pasm",
        ".org $8000\nreset:\n lda #$00\n sta $2000\n jmp reset\n.org $fffa\n.dw 0, reset, 0\n",
    );

    let rom = assemble(&options(TargetArchitecture::Mos6502, "main.pasm"), &reader).unwrap();

    // 16-byte iNES header + one 16 KiB PRG bank.
    assert_eq!(&rom[0..4], b"NES\x1a");
    let prg = &rom[16..];
    assert_eq!(&prg[0..8], &[0xa9, 0x00, 0x8d, 0x00, 0x20, 0x4c, 0x00, 0x80]);
    // reset vector at PRG offset $7ffc ($fffc - $8000)
    assert_eq!(&prg[0x7ffc..0x7ffe], &[0x00, 0x80]);
}

#[test]
fn branch_backward_offset() {
    let mut reader = MockFileReader::default();
    reader.add_file("main.pasm", ".org $8000\nloop:\n inx\n bne loop\n");

    let rom = assemble(&options(TargetArchitecture::Mos6502, "main.pasm"), &reader).unwrap();
    let prg = &rom[16..];
    assert_eq!(&prg[0..3], &[0xe8, 0xd0, 0xfd]);
}

#[test]
fn zero_page_narrowing() {
    let mut reader = MockFileReader::default();
    reader.add_file("main.pasm", ".org $8000\n lda $00\n lda $0100\n");

    let rom = assemble(&options(TargetArchitecture::Mos6502, "main.pasm"), &reader).unwrap();
    let prg = &rom[16..];
    assert_eq!(&prg[0..2], &[0xa5, 0x00]);
    assert_eq!(&prg[2..5], &[0xad, 0x00, 0x01]);
}

#[test]
fn snes_checksum_consistency() {
    let mut reader = MockFileReader::default();
    reader.add_file(
        "main.pasm",
        ".snes\n.lorom\n.snes_title \"TEST\"\n.org $8000\nreset:\n sei\n jmp reset\n",
    );

    let rom = assemble(&options(TargetArchitecture::Wdc65816, "main.pasm"), &reader).unwrap();
    assert_eq!(rom.len(), 32 * 1024);

    let complement = u16::from_le_bytes([rom[0x7ffc], rom[0x7ffd]]);
    let checksum = u16::from_le_bytes([rom[0x7ffe], rom[0x7fff]]);
    assert_eq!(checksum.wrapping_add(complement), 0xffff);

    let recomputed: u32 = rom
        .iter()
        .enumerate()
        .filter(|(i, _)| !(0x7ffc..0x8000).contains(i))
        .map(|(_, b)| *b as u32)
        .sum();
    assert_eq!((recomputed & 0xffff) as u16, checksum);
}

#[test]
fn game_boy_header_entry_and_checksum() {
    let mut reader = MockFileReader::default();
    reader.add_file(
        "main.pasm",
        ".gb\n.gb_title \"HELLO\"\n.org $0150\nstart:\n nop\n",
    );

    let rom = assemble(&options(TargetArchitecture::Sm83, "main.pasm"), &reader).unwrap();
    assert_eq!(&rom[0x0100..0x0104], &[0x00, 0xc3, 0x50, 0x01]);

    let sum: u8 = rom[0x0134..=0x014c]
        .iter()
        .fold(0u8, |acc, b| acc.wrapping_sub(*b).wrapping_sub(1));
    assert_eq!(rom[0x014d], sum);
}

#[test]
fn macro_expansion_emits_body_bytes() {
    let mut reader = MockFileReader::default();
    reader.add_file(
        "main.pasm",
        ".macro SET, addr, val\n lda #\\val\n sta \\addr\n.endmacro\n.org $8000\n %SET $2000, $01\n",
    );

    let rom = assemble(&options(TargetArchitecture::Mos6502, "main.pasm"), &reader).unwrap();
    let prg = &rom[16..];
    assert_eq!(&prg[0..5], &[0xa9, 0x01, 0x8d, 0x00, 0x20]);
}

#[test]
fn include_resolution_splices_tokens_in_place() {
    let mut reader = MockFileReader::default();
    reader.add_file(
        "main.pasm",
        ".org $8000\n lda #$01\n.include \"shared.pasm\"\n sta $2000\n",
    );
    reader.add_file("shared.pasm", " inx\n");

    let rom = assemble(&options(TargetArchitecture::Mos6502, "main.pasm"), &reader).unwrap();
    let prg = &rom[16..];
    assert_eq!(&prg[0..6], &[0xa9, 0x01, 0xe8, 0x8d, 0x00, 0x20]);
}

#[test]
fn circular_include_is_an_error() {
    let mut reader = MockFileReader::default();
    reader.add_file("a.pasm", ".include \"b.pasm\"\n");
    reader.add_file("b.pasm", ".include \"a.pasm\"\n");

    let result = assemble(&options(TargetArchitecture::Mos6502, "a.pasm"), &reader);
    assert!(result.is_err());
}

#[test]
fn undefined_symbol_reference_is_reported() {
    let mut reader = MockFileReader::default();
    reader.add_file("main.pasm", ".org $8000\n lda undefined_label\n");

    let result = assemble(&options(TargetArchitecture::Mos6502, "main.pasm"), &reader);
    assert!(result.is_err());
}

#[test]
fn overlapping_segments_are_an_error() {
    let mut reader = MockFileReader::default();
    reader.add_file(
        "main.pasm",
        ".org $8000\n lda #$01\n sta $2000\n sta $2001\n.org $8000\n nop\n nop\n nop\n nop\n",
    );

    let result = assemble(&options(TargetArchitecture::Mos6502, "main.pasm"), &reader);
    assert!(result.is_err());
}

#[test]
fn determinism_across_runs() {
    let mut reader = MockFileReader::default();
    reader.add_file(
        "main.pasm",
        ".org $8000\nreset:\n lda #$00\n sta $2000\n jmp reset\n",
    );

    let opts = options(TargetArchitecture::Mos6502, "main.pasm");
    let first = assemble(&opts, &reader).unwrap();
    let second = assemble(&opts, &reader).unwrap();
    assert_eq!(first, second);
}
