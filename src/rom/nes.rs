//! NES / iNES: 16-byte header (`NES\x1a`, PRG/CHR sizes, mapper and
//! mirroring flags) prepended to a flat PRG-ROM image. CPU addresses
//! $8000-$ffff map directly onto PRG-ROM offset `addr - $8000`; bank
//! switching beyond a single contiguous PRG image (MMC-style windowed
//! mappers) is not modeled — the whole $8000-$ffff span is laid out as
//! one buffer, sized to the highest address any segment touches.
//!
//! The header defaults to plain iNES 1.0. Giving `.submapper` or
//! `.nes_timing` in the source is what asks for iNES 2.0: byte 7's low
//! bits flag the format, byte 8 carries the submapper, byte 9 the
//! extended PRG/CHR size nibbles (always zero here, since bank counts
//! are capped at a `u8`), and byte 12 the CPU/PPU timing.

use super::{place_segments, round_up_pow2, RomBuilder, RomMetadata};
use crate::errors::PoppyError;
use crate::segment::OutputSegment;
use crate::semantic::symbol::SymbolTable;

const PRG_BASE: u32 = 0x8000;
const PRG_BANK: usize = 16 * 1024;
const CHR_BANK: usize = 8 * 1024;

pub struct NesBuilder;

impl RomBuilder for NesBuilder {
    fn build(
        &self,
        segments: &[OutputSegment],
        _symbols: &SymbolTable,
        metadata: &RomMetadata,
    ) -> Result<Vec<u8>, PoppyError> {
        let highest_end = segments
            .iter()
            .filter(|s| s.start_address >= PRG_BASE)
            .map(|s| s.end_address())
            .max()
            .unwrap_or(PRG_BASE + PRG_BANK as u32);
        let prg_size = round_up_pow2((highest_end - PRG_BASE) as usize, PRG_BANK);

        let mut prg = vec![0u8; prg_size];
        place_segments(&mut prg, segments, PRG_BASE, 0, None)?;

        let chr_banks = metadata.chr_banks.unwrap_or(0);
        let chr = vec![0u8; chr_banks as usize * CHR_BANK];

        let prg_banks = (prg_size / PRG_BANK) as u8;
        let mapper = metadata.mapper.unwrap_or(0);
        let vertical = matches!(metadata.mirroring.as_deref(), Some("vertical"));
        let four_screen = matches!(metadata.mirroring.as_deref(), Some("four-screen"));

        let flags6 = (mapper & 0x0f) << 4
            | (vertical as u8)
            | ((four_screen as u8) << 3);

        // An explicit submapper or timing byte is what this builder takes
        // as the author asking for an iNES 2.0 header; otherwise it emits
        // plain iNES 1.0 with bytes 8-15 left zero.
        let is_ines2 = metadata.submapper.is_some() || metadata.nes_timing.is_some();

        let mut header = vec![0u8; 16];
        header[0..4].copy_from_slice(b"NES\x1a");
        header[4] = prg_banks;
        header[5] = chr_banks;
        header[6] = flags6;

        if is_ines2 {
            // Mapper is modeled as a single byte here, so its bits 8-11
            // (byte 8's low nibble) are always zero.
            header[7] = (mapper & 0xf0) | 0b0000_1000;
            header[8] = (metadata.submapper.unwrap_or(0) & 0x0f) << 4;
            // Extended size bits: high nibbles of PRG/CHR bank counts.
            // `prg_banks`/`chr_banks` are u8-capped, so these are always
            // zero in practice, but the byte position is still correct.
            header[9] = 0;
            header[12] = metadata.nes_timing.unwrap_or(0) & 0b11;
        } else {
            header[7] = mapper & 0xf0;
        }

        let mut rom = header;
        rom.extend_from_slice(&prg);
        rom.extend_from_slice(&chr);
        Ok(rom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_magic_and_prg_size() {
        let seg = OutputSegment { start_address: 0x8000, bytes: vec![0xea; 8] };
        let rom = NesBuilder.build(&[seg], &SymbolTable::new(), &RomMetadata::default()).unwrap();
        assert_eq!(&rom[0..4], b"NES\x1a");
        assert_eq!(rom[4], 1); // one 16KB bank covers the 8-byte segment
        assert_eq!(rom.len(), 16 + PRG_BANK);
        assert_eq!(rom[8], 0); // plain iNES 1.0, no submapper/timing given
    }

    #[test]
    fn submapper_or_timing_upgrades_to_ines2() {
        let seg = OutputSegment { start_address: 0x8000, bytes: vec![0xea; 8] };
        let metadata = RomMetadata { mapper: Some(0x14), submapper: Some(3), nes_timing: Some(1), ..Default::default() };
        let rom = NesBuilder.build(&[seg], &SymbolTable::new(), &metadata).unwrap();
        assert_eq!(rom[7] & 0b0000_1100, 0b0000_1000); // iNES 2.0 identifier bits
        assert_eq!(rom[8] >> 4, 3); // submapper
        assert_eq!(rom[12] & 0b11, 1); // PAL timing
    }

    #[test]
    fn reset_vector_lands_at_expected_offset() {
        let code = OutputSegment { start_address: 0x8000, bytes: vec![0xa9, 0x00, 0x8d, 0x00, 0x20, 0x4c, 0x00, 0x80] };
        let vectors = OutputSegment { start_address: 0xfffa, bytes: vec![0, 0, 0x00, 0x80, 0, 0] };
        let rom = NesBuilder.build(&[code, vectors], &SymbolTable::new(), &RomMetadata::default()).unwrap();
        assert_eq!(rom.len(), 16 + 2 * PRG_BANK);
        let prg_offset_of_vector = 16 + (0xfffc - 0x8000);
        assert_eq!(&rom[prg_offset_of_vector..prg_offset_of_vector + 2], &[0x00, 0x80]);
    }
}
