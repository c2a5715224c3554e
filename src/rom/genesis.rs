//! Sega Genesis / Mega Drive: the vector table (initial SP and reset
//! vector as 32-bit big-endian longs) lives at offset 0, written by
//! ordinary code generation; the builder only splices the 512-byte
//! system header at $0100 — identifier, copyright, titles, serial,
//! region codes.

use super::{place_segments, round_up_pow2, RomBuilder, RomMetadata};
use crate::errors::PoppyError;
use crate::segment::OutputSegment;
use crate::semantic::symbol::SymbolTable;

const HEADER_BASE: usize = 0x100;
const HEADER_LEN: usize = 512;

pub struct GenesisBuilder;

impl RomBuilder for GenesisBuilder {
    fn build(
        &self,
        segments: &[OutputSegment],
        _symbols: &SymbolTable,
        metadata: &RomMetadata,
    ) -> Result<Vec<u8>, PoppyError> {
        let highest_end = segments.iter().map(|s| s.end_address()).max().unwrap_or(0);
        let rom_size = round_up_pow2(highest_end as usize, HEADER_BASE + HEADER_LEN);

        let mut rom = vec![0u8; rom_size];
        place_segments(&mut rom, segments, 0, 0, Some((HEADER_BASE, HEADER_BASE + HEADER_LEN)))?;

        write_field(&mut rom, HEADER_BASE, 16, "SEGA MEGA DRIVE ");
        write_field(&mut rom, HEADER_BASE + 0x10, 16, "(C)SEGA 2026.JUL");
        let title = metadata.title.clone().unwrap_or_default();
        write_field(&mut rom, HEADER_BASE + 0x20, 48, &title);
        write_field(&mut rom, HEADER_BASE + 0x50, 48, &title);
        write_field(&mut rom, HEADER_BASE + 0x80, 2, "GM");
        write_field(&mut rom, HEADER_BASE + 0x82, 11, "00000000-00");
        write_field(
            &mut rom,
            HEADER_BASE + 0xf0,
            3,
            metadata.region.as_deref().unwrap_or("JUE"),
        );

        Ok(rom)
    }
}

fn write_field(rom: &mut [u8], offset: usize, width: usize, text: &str) {
    let mut bytes = text.as_bytes().to_vec();
    bytes.resize(width, b' ');
    bytes.truncate(width);
    rom[offset..offset + width].copy_from_slice(&bytes);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vector_table_survives_and_header_is_placed() {
        let vectors = OutputSegment { start_address: 0, bytes: vec![0, 0xff, 0, 0, 0, 0, 0x04, 0] };
        let rom = GenesisBuilder.build(&[vectors], &SymbolTable::new(), &RomMetadata::default()).unwrap();
        assert_eq!(&rom[0..8], &[0, 0xff, 0, 0, 0, 0, 0x04, 0]);
        assert_eq!(&rom[HEADER_BASE..HEADER_BASE + 16], b"SEGA MEGA DRIVE ");
    }
}
