//! Atari Lynx (V30MZ): 64-byte "LYNX" header prepended to the raw
//! image — magic, page size and count per bank, load address, a
//! version byte, a 32-byte cartridge name, a 16-byte manufacturer
//! field, and a rotation byte for the handheld's hardware screen flip.

use super::{place_segments, RomBuilder, RomMetadata};
use crate::errors::PoppyError;
use crate::segment::OutputSegment;
use crate::semantic::symbol::SymbolTable;

const HEADER_LEN: usize = 64;
const PAGE_SIZE: usize = 256;
const NAME_LEN: usize = 32;
const MANUFACTURER_LEN: usize = 16;

pub struct LynxBuilder;

impl RomBuilder for LynxBuilder {
    fn build(
        &self,
        segments: &[OutputSegment],
        _symbols: &SymbolTable,
        metadata: &RomMetadata,
    ) -> Result<Vec<u8>, PoppyError> {
        let lowest_start = segments.iter().map(|s| s.start_address).min().unwrap_or(0);
        let highest_end = segments.iter().map(|s| s.end_address()).max().unwrap_or(lowest_start);
        let image_size = (highest_end - lowest_start) as usize;

        let mut image = vec![0u8; image_size];
        place_segments(&mut image, segments, lowest_start, 0, None)?;

        let bank0_pages = (image_size.div_ceil(PAGE_SIZE)) as u16;

        let mut header = vec![0u8; HEADER_LEN];
        header[0..4].copy_from_slice(b"LYNX");
        header[4..6].copy_from_slice(&bank0_pages.to_le_bytes());
        header[6..8].copy_from_slice(&0u16.to_le_bytes()); // bank 1: unused, single-bank images only
        header[8..10].copy_from_slice(&(lowest_start as u16).to_le_bytes());
        header[10] = metadata.version.unwrap_or(1);

        let mut name = metadata.title.clone().unwrap_or_default().into_bytes();
        name.truncate(NAME_LEN);
        let name_len = name.len();
        header[11..11 + name_len].copy_from_slice(&name);

        let mut manufacturer = metadata.manufacturer.clone().unwrap_or_default().into_bytes();
        manufacturer.truncate(MANUFACTURER_LEN);
        let manufacturer_len = manufacturer.len();
        let manufacturer_start = 11 + NAME_LEN;
        header[manufacturer_start..manufacturer_start + manufacturer_len].copy_from_slice(&manufacturer);

        header[63] = metadata.rotation.unwrap_or(0);

        let mut rom = header;
        rom.extend_from_slice(&image);
        Ok(rom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_magic_and_page_count() {
        let seg = OutputSegment { start_address: 0x0000, bytes: vec![0xea; 300] };
        let metadata =
            RomMetadata { title: Some("ROBOTRON".to_string()), rotation: Some(1), ..Default::default() };
        let rom = LynxBuilder.build(&[seg], &SymbolTable::new(), &metadata).unwrap();
        assert_eq!(&rom[0..4], b"LYNX");
        assert_eq!(u16::from_le_bytes([rom[4], rom[5]]), 2); // 300 bytes -> 2 pages of 256
        assert_eq!(&rom[11..11 + 8], b"ROBOTRON");
        assert_eq!(rom[63], 1);
        assert_eq!(rom.len(), HEADER_LEN + 300);
    }

    #[test]
    fn load_address_reflects_lowest_segment() {
        let seg = OutputSegment { start_address: 0x0200, bytes: vec![0x00; 16] };
        let rom = LynxBuilder.build(&[seg], &SymbolTable::new(), &RomMetadata::default()).unwrap();
        assert_eq!(u16::from_le_bytes([rom[8], rom[9]]), 0x0200);
    }
}
