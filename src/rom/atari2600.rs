//! Atari 2600: headerless. ROM size must land in {2, 4, 8, 16, 32} KiB
//! and match the declared bank-switching scheme; the 6502 reset vector
//! is whatever code generation placed at the image's last two bytes.

use super::{place_segments, RomBuilder, RomMetadata};
use crate::errors::{ErrorKind, PoppyError};
use crate::segment::OutputSegment;
use crate::semantic::symbol::SymbolTable;

const VALID_SIZES: [usize; 5] = [2 * 1024, 4 * 1024, 8 * 1024, 16 * 1024, 32 * 1024];

pub struct Atari2600Builder;

impl RomBuilder for Atari2600Builder {
    fn build(
        &self,
        segments: &[OutputSegment],
        _symbols: &SymbolTable,
        metadata: &RomMetadata,
    ) -> Result<Vec<u8>, PoppyError> {
        let highest_end = segments.iter().map(|s| s.end_address()).max().unwrap_or(2 * 1024);
        let rom_size = VALID_SIZES
            .iter()
            .copied()
            .find(|&size| size as u32 >= highest_end)
            .ok_or_else(|| {
                PoppyError::without_location(ErrorKind::ROMSizeInvalid(format!(
                    "program spans {} bytes, which exceeds the largest Atari 2600 image size (32 KiB)",
                    highest_end
                )))
            })?;

        let scheme = metadata.bank_switching.as_deref().unwrap_or("none");
        let expected_size = match scheme {
            "none" => None, // both 2K and 4K are valid unbanked sizes
            "f8" => Some(8 * 1024),
            "f6" => Some(16 * 1024),
            "f4" => Some(32 * 1024),
            other => {
                return Err(PoppyError::without_location(ErrorKind::Other(format!(
                    "unknown Atari 2600 bank-switching scheme: {}",
                    other
                ))))
            }
        };
        if let Some(expected) = expected_size {
            if rom_size != expected {
                return Err(PoppyError::without_location(ErrorKind::ROMSizeInvalid(format!(
                    "bank-switching scheme {} requires a {} KiB image, program assembled to {} KiB",
                    scheme,
                    expected / 1024,
                    rom_size / 1024
                ))));
            }
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
    fn f8_scheme_requires_8kib() {
        let seg = OutputSegment { start_address: 0, bytes: vec![0xea; 4096] };
        let metadata = RomMetadata { bank_switching: Some("f8".to_string()), ..Default::default() };
        let err = Atari2600Builder.build(&[seg], &SymbolTable::new(), &metadata).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::ROMSizeInvalid(_)));
    }

    #[test]
    fn unbanked_4kib_accepted() {
        let seg = OutputSegment { start_address: 0, bytes: vec![0xea; 4096] };
        let rom = Atari2600Builder.build(&[seg], &SymbolTable::new(), &RomMetadata::default()).unwrap();
        assert_eq!(rom.len(), 4096);
    }
}
