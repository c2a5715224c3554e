//! Per-platform ROM builders (design note §9, spec §4.6). Each builder
//! implements `RomBuilder::build`: logical-address placement, mandatory
//! header construction, size rounding, and checksums. Dispatch happens
//! once per compilation from the target's conventional platform tag.

pub mod atari2600;
pub mod gb;
pub mod gba;
pub mod genesis;
pub mod lynx;
pub mod nes;
pub mod snes;
pub mod spc700;
pub mod tg16;

use crate::errors::{ErrorKind, PoppyError};
use crate::segment::OutputSegment;
use crate::semantic::symbol::SymbolTable;

/// Header fields a source file configures via platform directives
/// (`.snes`, `.lorom`, `.snes_title "…"`, …). Each builder reads only
/// the fields relevant to its platform; the rest are ignored.
#[derive(Debug, Clone, Default)]
pub struct RomMetadata {
    pub platform: Option<String>,
    /// SNES: `lorom` or `hirom`.
    pub mapping: Option<String>,
    pub title: Option<String>,
    /// NES: iNES mapper number.
    pub mapper: Option<u8>,
    /// NES: `horizontal`, `vertical`, or `four-screen`.
    pub mirroring: Option<String>,
    pub region: Option<String>,
    pub cgb_flag: Option<u8>,
    pub sgb_flag: Option<u8>,
    /// GBA: 4-character game code.
    pub game_code: Option<String>,
    /// GBA: 2-character maker code.
    pub maker_code: Option<String>,
    pub version: Option<u8>,
    /// Atari 2600: `none`, `f8`, `f6`, or `f4`.
    pub bank_switching: Option<String>,
    /// Lynx: 16-byte manufacturer field.
    pub manufacturer: Option<String>,
    pub rotation: Option<u8>,
    /// SPC700 ID666 tag fields.
    pub artist: Option<String>,
    pub dumper: Option<String>,
    pub comment: Option<String>,
    /// NES: explicit CHR-ROM bank count (8 KiB units); inferred from
    /// segment layout when unset.
    pub chr_banks: Option<u8>,
    pub prg_banks: Option<u8>,
    /// NES: iNES 2.0 submapper number, written into header byte 8's low
    /// nibble. Presence of this field (or `nes_timing`) is what flags the
    /// header as iNES 2.0 rather than iNES 1.0.
    pub submapper: Option<u8>,
    /// NES: CPU/PPU timing (0 = NTSC, 1 = PAL, 2 = multi-region, 3 =
    /// Dendy), written into header byte 12.
    pub nes_timing: Option<u8>,
}

/// Implemented once per platform. Dispatch happens a single time per
/// compilation, after code generation has produced the final segment list.
pub trait RomBuilder {
    fn build(
        &self,
        segments: &[OutputSegment],
        symbols: &SymbolTable,
        metadata: &RomMetadata,
    ) -> Result<Vec<u8>, PoppyError>;
}

/// Resolves and invokes the builder for `platform` (one of the tags
/// `TargetArchitecture::default_platform` returns, or a `.platform`-style
/// directive override).
pub fn build(
    platform: &str,
    segments: &[OutputSegment],
    symbols: &SymbolTable,
    metadata: &RomMetadata,
) -> Result<Vec<u8>, PoppyError> {
    match platform {
        "nes" => nes::NesBuilder.build(segments, symbols, metadata),
        "snes" => snes::SnesBuilder.build(segments, symbols, metadata),
        "gb" => gb::GameBoyBuilder.build(segments, symbols, metadata),
        "gba" => gba::GbaBuilder.build(segments, symbols, metadata),
        "genesis" => genesis::GenesisBuilder.build(segments, symbols, metadata),
        "atari2600" => atari2600::Atari2600Builder.build(segments, symbols, metadata),
        "lynx" => lynx::LynxBuilder.build(segments, symbols, metadata),
        "tg16" => tg16::Tg16Builder.build(segments, symbols, metadata),
        "spc" => spc700::SpcBuilder.build(segments, symbols, metadata),
        other => Err(PoppyError::without_location(ErrorKind::Other(format!(
            "unknown ROM platform: {}",
            other
        )))),
    }
}

/// Copies each segment's bytes into `image` at `segment.start_address -
/// base`, growing `image` with `fill` as needed. Used by every builder
/// that lays PRG/ROM space out as one flat buffer. Returns a
/// `HeaderConflict` if a segment would write inside `[header_start,
/// header_end)`.
pub(crate) fn place_segments(
    image: &mut Vec<u8>,
    segments: &[OutputSegment],
    base: u32,
    fill: u8,
    header_range: Option<(usize, usize)>,
) -> Result<(), PoppyError> {
    for seg in segments {
        if seg.start_address < base {
            continue;
        }
        let offset = (seg.start_address - base) as usize;
        let end = offset + seg.bytes.len();
        if let Some((hstart, hend)) = header_range {
            if offset < hend && hstart < end {
                return Err(PoppyError::without_location(ErrorKind::HeaderConflict(
                    format!("segment at ${:x} overlaps header region", seg.start_address),
                )));
            }
        }
        if image.len() < end {
            image.resize(end, fill);
        }
        image[offset..end].copy_from_slice(&seg.bytes);
    }
    Ok(())
}

/// Rounds `size` up to the next power of two, no smaller than `min`.
pub(crate) fn round_up_pow2(size: usize, min: usize) -> usize {
    let mut n = min.max(1);
    while n < size {
        n *= 2;
    }
    n
}
