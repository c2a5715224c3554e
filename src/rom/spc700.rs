//! SPC700 sound dump (`.spc`): a fixed 65,984-byte file — 256-byte
//! header (signature, initial CPU register state, and an ID666 tag
//! describing the tune), a 64 KiB image of the APU's full RAM address
//! space, a 128-byte DSP register block, and 64 bytes of trailing
//! padding that real dumps reserve for extra RAM state.

use super::{place_segments, RomBuilder, RomMetadata};
use crate::errors::PoppyError;
use crate::segment::OutputSegment;
use crate::semantic::symbol::SymbolTable;

const HEADER_LEN: usize = 256;
const RAM_LEN: usize = 65536;
const DSP_LEN: usize = 128;
const TRAILER_LEN: usize = 64;
const TOTAL_LEN: usize = HEADER_LEN + RAM_LEN + DSP_LEN + TRAILER_LEN;

const SIGNATURE: &[u8; 33] = b"SNES-SPC700 Sound File Data v0.30";

fn write_tag_field(header: &mut [u8], offset: usize, max_len: usize, value: Option<&str>) {
    let mut bytes = value.unwrap_or_default().as_bytes().to_vec();
    bytes.truncate(max_len);
    let len = bytes.len();
    header[offset..offset + len].copy_from_slice(&bytes);
}

pub struct SpcBuilder;

impl RomBuilder for SpcBuilder {
    fn build(
        &self,
        segments: &[OutputSegment],
        _symbols: &SymbolTable,
        metadata: &RomMetadata,
    ) -> Result<Vec<u8>, PoppyError> {
        let entry_pc = segments.iter().map(|s| s.start_address).min().unwrap_or(0) as u16;

        let mut header = vec![0u8; HEADER_LEN];
        header[0..33].copy_from_slice(SIGNATURE);
        header[33] = 0x1a;
        header[34] = 0x1a;
        header[35] = 26; // ID666 tag present, binary fields
        header[36] = 30; // format version minor

        header[37..39].copy_from_slice(&entry_pc.to_le_bytes());
        // initial A, X, Y, PSW, SP: zeroed, no call-site convention to derive these from.
        header[39] = 0;
        header[40] = 0;
        header[41] = 0;
        header[42] = 0;
        header[43] = 0;
        header[44] = 0;
        header[45] = 0;

        write_tag_field(&mut header, 46, 32, metadata.title.as_deref());
        write_tag_field(&mut header, 78, 32, metadata.title.as_deref());
        write_tag_field(&mut header, 110, 16, metadata.dumper.as_deref());
        write_tag_field(&mut header, 126, 32, metadata.comment.as_deref());
        write_tag_field(&mut header, 214, 32, metadata.artist.as_deref());

        let mut ram = vec![0u8; RAM_LEN];
        place_segments(&mut ram, segments, 0, 0, None)?;

        let dsp = vec![0u8; DSP_LEN];
        let trailer = vec![0u8; TRAILER_LEN];

        let mut spc = Vec::with_capacity(TOTAL_LEN);
        spc.extend_from_slice(&header);
        spc.extend_from_slice(&ram);
        spc.extend_from_slice(&dsp);
        spc.extend_from_slice(&trailer);
        Ok(spc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_size_is_exactly_65984() {
        let rom = SpcBuilder.build(&[], &SymbolTable::new(), &RomMetadata::default()).unwrap();
        assert_eq!(rom.len(), TOTAL_LEN);
        assert_eq!(TOTAL_LEN, 65984);
    }

    #[test]
    fn signature_and_title_present() {
        let metadata = RomMetadata { title: Some("Song".to_string()), ..Default::default() };
        let rom = SpcBuilder.build(&[], &SymbolTable::new(), &metadata).unwrap();
        assert_eq!(&rom[0..33], SIGNATURE.as_slice());
        assert_eq!(&rom[46..50], b"Song");
    }

    #[test]
    fn ram_segment_placed_at_absolute_offset() {
        let seg = OutputSegment { start_address: 0x0200, bytes: vec![0xab, 0xcd] };
        let rom = SpcBuilder.build(&[seg], &SymbolTable::new(), &RomMetadata::default()).unwrap();
        let ram_start = HEADER_LEN;
        assert_eq!(&rom[ram_start + 0x0200..ram_start + 0x0202], &[0xab, 0xcd]);
    }
}
