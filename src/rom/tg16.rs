//! TurboGrafx-16 / PC Engine (HuC6280): headerless. The image is just
//! the ROM content, rounded up to a power of two between 8 KiB and
//! 1 MiB; the reset vector lives in the program itself, at the image's
//! last two bytes, same as the 6502 family it descends from.

use super::{place_segments, round_up_pow2, RomBuilder, RomMetadata};
use crate::errors::{ErrorKind, PoppyError};
use crate::segment::OutputSegment;
use crate::semantic::symbol::SymbolTable;

const MIN_SIZE: usize = 8 * 1024;
const MAX_SIZE: usize = 1024 * 1024;

pub struct Tg16Builder;

impl RomBuilder for Tg16Builder {
    fn build(
        &self,
        segments: &[OutputSegment],
        _symbols: &SymbolTable,
        _metadata: &RomMetadata,
    ) -> Result<Vec<u8>, PoppyError> {
        let highest_end = segments.iter().map(|s| s.end_address()).max().unwrap_or(MIN_SIZE as u32);
        let rom_size = round_up_pow2(highest_end as usize, MIN_SIZE);
        if rom_size > MAX_SIZE {
            return Err(PoppyError::without_location(ErrorKind::ROMSizeInvalid(format!(
                "program spans {} bytes, which exceeds the largest TurboGrafx-16 image size (1 MiB)",
                highest_end
            ))));
        }

        let mut rom = vec![0u8; rom_size];
        place_segments(&mut rom, segments, 0, 0, None)?;
        Ok(rom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_up_to_next_power_of_two() {
        let seg = OutputSegment { start_address: 0, bytes: vec![0xea; 10 * 1024] };
        let rom = Tg16Builder.build(&[seg], &SymbolTable::new(), &RomMetadata::default()).unwrap();
        assert_eq!(rom.len(), 16 * 1024);
    }

    #[test]
    fn reset_vector_preserved_at_image_end() {
        let seg = OutputSegment { start_address: MIN_SIZE as u32 - 2, bytes: vec![0x00, 0x80] };
        let rom = Tg16Builder.build(&[seg], &SymbolTable::new(), &RomMetadata::default()).unwrap();
        assert_eq!(&rom[rom.len() - 2..], &[0x00, 0x80]);
    }

    #[test]
    fn oversized_program_rejected() {
        let seg = OutputSegment { start_address: 0, bytes: vec![0u8; MAX_SIZE + 1] };
        let err = Tg16Builder.build(&[seg], &SymbolTable::new(), &RomMetadata::default()).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::ROMSizeInvalid(_)));
    }
}
