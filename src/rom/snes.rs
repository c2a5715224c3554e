//! SNES: 64-byte internal header at file offset $7fc0 (LoROM) or $ffc0
//! (HiROM), 21-byte space-padded title, and a 16-bit checksum/complement
//! pair filling the header's last four bytes. LoROM maps each bank's
//! upper half ($8000-$ffff) onto one 32 KiB file window; HiROM maps a
//! bank's full 64 KiB directly, so bank 0 alone covers the header.

use super::{place_segments, round_up_pow2, RomBuilder, RomMetadata};
use crate::errors::PoppyError;
use crate::segment::OutputSegment;
use crate::semantic::symbol::SymbolTable;

const HEADER_LEN: usize = 64;
const TITLE_LEN: usize = 21;

pub struct SnesBuilder;

impl RomBuilder for SnesBuilder {
    fn build(
        &self,
        segments: &[OutputSegment],
        _symbols: &SymbolTable,
        metadata: &RomMetadata,
    ) -> Result<Vec<u8>, PoppyError> {
        let hirom = matches!(metadata.mapping.as_deref(), Some("hirom"));
        let (base, min_size, header_offset, map_mode) = if hirom {
            (0x0000u32, 64 * 1024, 0xffc0usize, 0x21u8)
        } else {
            (0x8000u32, 32 * 1024, 0x7fc0usize, 0x20u8)
        };

        let highest_end = segments
            .iter()
            .map(|s| s.end_address())
            .max()
            .unwrap_or(base);
        let span = highest_end.saturating_sub(base) as usize;
        let rom_size = round_up_pow2(span.max(header_offset + HEADER_LEN), min_size);

        let mut rom = vec![0u8; rom_size];
        place_segments(&mut rom, segments, base, 0, Some((header_offset, header_offset + HEADER_LEN)))?;

        let mut title = metadata.title.clone().unwrap_or_default().into_bytes();
        title.resize(TITLE_LEN, b' ');
        rom[header_offset..header_offset + TITLE_LEN].copy_from_slice(&title);
        rom[header_offset + 0x15] = map_mode;
        rom[header_offset + 0x16] = 0x00; // cartridge type: ROM only
        rom[header_offset + 0x17] = rom_size.trailing_zeros() as u8 - 10; // log2(KiB)
        rom[header_offset + 0x18] = 0x00; // no save RAM
        rom[header_offset + 0x19] = 0x00; // country: Japan/NTSC
        rom[header_offset + 0x1a] = 0x00; // developer id
        rom[header_offset + 0x1b] = metadata.version.unwrap_or(0);

        let checksum = checksum_excluding(&rom, header_offset + 0x3c, header_offset + 0x40);
        let complement = !checksum;
        rom[header_offset + 0x3c..header_offset + 0x3e].copy_from_slice(&complement.to_le_bytes());
        rom[header_offset + 0x3e..header_offset + 0x40].copy_from_slice(&checksum.to_le_bytes());

        Ok(rom)
    }
}

fn checksum_excluding(rom: &[u8], excl_start: usize, excl_end: usize) -> u16 {
    let mut sum: u16 = 0;
    for (i, &b) in rom.iter().enumerate() {
        if i >= excl_start && i < excl_end {
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
    fn lorom_checksum_and_complement_agree() {
        let code = OutputSegment { start_address: 0x8000, bytes: vec![0x78, 0x4c, 0x00, 0x80] };
        let metadata = RomMetadata { mapping: Some("lorom".to_string()), title: Some("TEST".to_string()), ..Default::default() };
        let rom = SnesBuilder.build(&[code], &SymbolTable::new(), &metadata).unwrap();
        assert_eq!(rom.len(), 32 * 1024);
        let checksum = u16::from_le_bytes([rom[0x7ffe], rom[0x7fff]]);
        let complement = u16::from_le_bytes([rom[0x7ffc], rom[0x7ffd]]);
        assert_eq!(checksum.wrapping_add(complement), 0xffff);
        assert_eq!(&rom[0x7fc0..0x7fc0 + 4], b"TEST");
    }
}
