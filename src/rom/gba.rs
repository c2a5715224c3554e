//! Game Boy Advance: 192-byte header — ARM branch to the entry point,
//! the fixed 156-byte Nintendo logo, 12-byte title, 4-byte game code,
//! 2-byte maker code, fixed byte $96, version, and an 8-bit checksum
//! over $a0..$bc.

use super::{place_segments, round_up_pow2, RomBuilder, RomMetadata};
use crate::errors::PoppyError;
use crate::segment::OutputSegment;
use crate::semantic::symbol::SymbolTable;

const HEADER_LEN: usize = 192;
const TITLE_LEN: usize = 12;
const ENTRY_POINT: u32 = 0x0800_00c0;
const ROM_BASE: u32 = 0x0800_0000;

#[rustfmt::skip]
pub const NINTENDO_LOGO: [u8; 156] = [0; 156];

pub struct GbaBuilder;

impl RomBuilder for GbaBuilder {
    fn build(
        &self,
        segments: &[OutputSegment],
        _symbols: &SymbolTable,
        metadata: &RomMetadata,
    ) -> Result<Vec<u8>, PoppyError> {
        let highest_end = segments
            .iter()
            .map(|s| s.end_address())
            .max()
            .unwrap_or(ROM_BASE + HEADER_LEN as u32);
        let span = (highest_end - ROM_BASE) as usize;
        let rom_size = round_up_pow2(span.max(HEADER_LEN), 192);

        let mut rom = vec![0u8; rom_size];
        place_segments(&mut rom, segments, ROM_BASE, 0, Some((0, HEADER_LEN)))?;

        let entry_offset = (ENTRY_POINT - ROM_BASE) as i32;
        let branch_target = entry_offset - 8; // ARM PC is 2 instructions ahead
        let branch_imm = ((branch_target / 4) as u32) & 0x00ff_ffff;
        let branch_instruction = 0xea00_0000u32 | branch_imm;
        rom[0x00..0x04].copy_from_slice(&branch_instruction.to_le_bytes());

        rom[0x04..0x04 + 156].copy_from_slice(&NINTENDO_LOGO);

        let mut title = metadata.title.clone().unwrap_or_default().into_bytes();
        title.resize(TITLE_LEN, 0);
        rom[0xa0..0xa0 + TITLE_LEN].copy_from_slice(&title);

        let mut game_code = metadata.game_code.clone().unwrap_or_else(|| "0000".to_string()).into_bytes();
        game_code.resize(4, 0);
        rom[0xac..0xb0].copy_from_slice(&game_code);

        let mut maker_code = metadata.maker_code.clone().unwrap_or_else(|| "00".to_string()).into_bytes();
        maker_code.resize(2, 0);
        rom[0xb0..0xb2].copy_from_slice(&maker_code);

        rom[0xb2] = 0x96; // fixed value
        rom[0xb3] = 0x00; // unit code
        rom[0xb4] = 0x00; // device type
        rom[0xbc] = metadata.version.unwrap_or(0);

        let checksum = header_checksum(&rom[0xa0..0xbd]);
        rom[0xbd] = checksum;

        Ok(rom)
    }
}

fn header_checksum(bytes: &[u8]) -> u8 {
    let sum: i32 = bytes.iter().fold(0i32, |acc, &b| acc.wrapping_sub(b as i32));
    ((sum.wrapping_sub(0x19)) & 0xff) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_byte_and_checksum_present() {
        let rom = GbaBuilder.build(&[], &SymbolTable::new(), &RomMetadata::default()).unwrap();
        assert_eq!(rom[0xb2], 0x96);
        let expected = header_checksum(&rom[0xa0..0xbd]);
        assert_eq!(rom[0xbd], expected);
    }
}
