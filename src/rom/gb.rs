//! Game Boy / SM83: 80-byte header at $0100 — entry stub, the
//! byte-exact 48-byte Nintendo logo, 16-byte title, CGB/SGB flags,
//! cartridge/ROM/RAM size bytes, region byte, 8-bit header checksum at
//! $014d, and a big-endian 16-bit global checksum at $014e.

use super::{place_segments, round_up_pow2, RomBuilder, RomMetadata};
use crate::errors::PoppyError;
use crate::segment::OutputSegment;
use crate::semantic::symbol::SymbolTable;

const HEADER_BASE: u32 = 0x0100;
const TITLE_LEN: usize = 16;

#[rustfmt::skip]
pub const NINTENDO_LOGO: [u8; 48] = [
    0xce, 0xed, 0x66, 0x66, 0xcc, 0x0d, 0x00, 0x0b, 0x03, 0x73, 0x00, 0x83, 0x00, 0x0c, 0x00, 0x0d,
    0x00, 0x08, 0x11, 0x1f, 0x88, 0x89, 0x00, 0x0e, 0xdc, 0xcc, 0x6e, 0xe6, 0xdd, 0xdd, 0xd9, 0x99,
    0xbb, 0xbb, 0x67, 0x63, 0x6e, 0x0e, 0xec, 0xcc, 0xdd, 0xdc, 0x99, 0x9f, 0xbb, 0xb9, 0x33, 0x3e,
];

pub struct GameBoyBuilder;

impl RomBuilder for GameBoyBuilder {
    fn build(
        &self,
        segments: &[OutputSegment],
        _symbols: &SymbolTable,
        metadata: &RomMetadata,
    ) -> Result<Vec<u8>, PoppyError> {
        let highest_end = segments.iter().map(|s| s.end_address()).max().unwrap_or(HEADER_BASE);
        let rom_size = round_up_pow2(highest_end as usize, 32 * 1024);

        let mut rom = vec![0u8; rom_size];
        place_segments(&mut rom, segments, 0, 0, None)?;

        // entry stub: NOP; JP $0150
        rom[0x100] = 0x00;
        rom[0x101] = 0xc3;
        rom[0x102] = 0x50;
        rom[0x103] = 0x01;

        rom[0x104..0x104 + 48].copy_from_slice(&NINTENDO_LOGO);

        let mut title = metadata.title.clone().unwrap_or_default().into_bytes();
        title.truncate(TITLE_LEN);
        let title_len = title.len();
        rom[0x134..0x134 + title_len].copy_from_slice(&title);

        rom[0x143] = metadata.cgb_flag.unwrap_or(0x00);
        rom[0x144] = 0x30; // maker code placeholder digits "0"
        rom[0x145] = 0x31;
        rom[0x146] = metadata.sgb_flag.unwrap_or(0x00);
        rom[0x147] = 0x00; // cartridge type: ROM only
        rom[0x148] = rom_size_code(rom_size);
        rom[0x149] = 0x00; // RAM size: none
        rom[0x14a] = region_code(metadata.region.as_deref());
        rom[0x14b] = 0x33; // old licensee: use new licensee code
        rom[0x14c] = metadata.version.unwrap_or(0);

        let header_checksum = header_checksum(&rom[0x134..0x14d]);
        rom[0x14d] = header_checksum;

        let global_checksum = global_checksum(&rom);
        rom[0x14e] = (global_checksum >> 8) as u8;
        rom[0x14f] = (global_checksum & 0xff) as u8;

        Ok(rom)
    }
}

fn rom_size_code(size: usize) -> u8 {
    // 32KiB << n == size
    ((size / (32 * 1024)).trailing_zeros()) as u8
}

fn region_code(region: Option<&str>) -> u8 {
    match region {
        Some("japan") => 0x00,
        _ => 0x01,
    }
}

fn header_checksum(bytes: &[u8]) -> u8 {
    let sum: i32 = bytes.iter().fold(0i32, |acc, &b| acc - b as i32 - 1);
    (sum & 0xff) as u8
}

fn global_checksum(rom: &[u8]) -> u16 {
    let mut sum: u16 = 0;
    for (i, &b) in rom.iter().enumerate() {
        if i == 0x14e || i == 0x14f {
            continue;
        }
        sum = sum.wrapping_add(b as u16);
    }
    sum
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_stub_and_logo_present() {
        let seg = OutputSegment { start_address: 0x0150, bytes: vec![0x00] };
        let metadata = RomMetadata { title: Some("HELLO".to_string()), ..Default::default() };
        let rom = GameBoyBuilder.build(&[seg], &SymbolTable::new(), &metadata).unwrap();
        assert_eq!(&rom[0x100..0x104], &[0x00, 0xc3, 0x50, 0x01]);
        assert_eq!(&rom[0x104..0x104 + 48], &NINTENDO_LOGO);
        assert_eq!(&rom[0x134..0x134 + 5], b"HELLO");
    }

    #[test]
    fn header_checksum_matches_formula() {
        let rom = GameBoyBuilder.build(&[], &SymbolTable::new(), &RomMetadata::default()).unwrap();
        let expected = header_checksum(&rom[0x134..0x14d]);
        assert_eq!(rom[0x14d], expected);
    }
}
