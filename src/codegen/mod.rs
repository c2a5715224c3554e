//! `LayoutItem` list -> final bytes (spec §4.5).
//!
//! Everything here is re-evaluation and encoding, not layout: addresses
//! and sizes were already decided in `crate::semantic`. This pass's own
//! decisions are the ones that can only be made once every symbol has
//! its final value — branch offsets, the zero-page narrowing pass 1
//! only guessed at, and multi-byte endianness.

use crate::ast::{AddressingMode, Expr, SizeSuffix};
use crate::diagnostics::Diagnostics;
use crate::errors::{ErrorKind, PoppyError};
use crate::options::CompilerOptions;
use crate::segment::OutputSegment;
use crate::semantic::eval::eval;
use crate::semantic::symbol::SymbolTable;
use crate::semantic::{eval_err, make_ctx, mode_exprs, DataWidth, LayoutItem};
use crate::source::SourceLocation;
use crate::target::Endianness;

/// Sidecar hook notified of every address the code generator claims,
/// tagged as code or data (spec §4.5: "for each emitted byte, notify
/// the CDL/Pansy sink"). No concrete sink ships in this crate; this is
/// the seam an external collaborator implements against.
pub trait CoverageSink {
    fn mark(&mut self, address: u32, is_code: bool);
}

/// Turns the flattened layout into the code generator's product: a list
/// of contiguous byte runs, each stamped with its base address, ready
/// for a `RomBuilder` to place.
pub fn generate(
    layout: &[LayoutItem],
    symbols: &SymbolTable,
    options: &CompilerOptions,
    diagnostics: &mut Diagnostics,
) -> Vec<OutputSegment> {
    generate_with_hooks(layout, symbols, options, diagnostics, None)
}

/// Same as [`generate`], additionally notifying `coverage` of every
/// address emitted.
pub fn generate_with_hooks(
    layout: &[LayoutItem],
    symbols: &SymbolTable,
    options: &CompilerOptions,
    diagnostics: &mut Diagnostics,
    mut coverage: Option<&mut dyn CoverageSink>,
) -> Vec<OutputSegment> {
    let mut segments: Vec<OutputSegment> = Vec::new();

    for item in layout {
        let (address, bytes) = match item {
            LayoutItem::Instruction {
                address,
                mnemonic,
                size_suffix,
                dest_register,
                mode,
                narrowed_zero_page,
                scope,
                order,
                loc,
            } => {
                let bytes = encode_instruction(
                    *address,
                    mnemonic,
                    *size_suffix,
                    dest_register.as_deref(),
                    mode,
                    *narrowed_zero_page,
                    scope.as_deref(),
                    *order,
                    loc,
                    symbols,
                    options,
                    diagnostics,
                );
                (*address, bytes)
            }
            LayoutItem::Data { address, width, values, scope, order, loc } => {
                let bytes =
                    encode_data(*width, values, scope.as_deref(), *order, *address, symbols, options, loc, diagnostics);
                (*address, bytes)
            }
            LayoutItem::Bytes { address, bytes } => (*address, bytes.clone()),
            LayoutItem::Fill { address, count, value, scope, order, loc } => {
                let ctx = make_ctx(symbols, scope.as_deref(), *address, *order);
                let fill_byte = match eval(value, &ctx) {
                    Ok(v) => v as u8,
                    Err(e) => {
                        diagnostics.error(eval_err(e, loc));
                        0
                    }
                };
                (*address, vec![fill_byte; *count as usize])
            }
        };
        if let Some(sink) = coverage.as_deref_mut() {
            let is_code = matches!(item, LayoutItem::Instruction { .. });
            for i in 0..bytes.len() {
                sink.mark(address + i as u32, is_code);
            }
        }
        append_bytes(&mut segments, address, bytes, diagnostics);
    }

    segments
}

/// Appends `bytes` at `address`, extending the last segment when it is
/// an exact contiguous continuation and starting a fresh one otherwise.
/// Any genuine overlap with a prior segment is a hard error: two parts
/// of the program both claimed the same address.
fn append_bytes(segments: &mut Vec<OutputSegment>, address: u32, bytes: Vec<u8>, diagnostics: &mut Diagnostics) {
    if bytes.is_empty() {
        return;
    }
    let candidate = OutputSegment { start_address: address, bytes };
    if let Some(last) = segments.last_mut() {
        if last.end_address() == candidate.start_address {
            last.bytes.extend(candidate.bytes);
            return;
        }
        if last.overlaps(&candidate) {
            diagnostics.error(PoppyError::without_location(ErrorKind::SegmentOverlap {
                first: format!("${:x}", last.start_address),
                second: format!("${:x}", candidate.start_address),
            }));
            return;
        }
    }
    segments.push(candidate);
}

fn signed_range(bits: u32) -> (i64, i64) {
    let half = 1i64 << (bits - 1);
    (-half, half - 1)
}

fn encode_bytes(value: i64, size: u8, big_endian: bool) -> Vec<u8> {
    let mut out = Vec::with_capacity(size as usize);
    for i in 0..size {
        out.push(((value >> (8 * i as u32)) & 0xff) as u8);
    }
    if big_endian {
        out.reverse();
    }
    out
}

fn is_big_endian(options: &CompilerOptions) -> bool {
    options.big_endian_override || options.target.endianness() == Endianness::Big
}

#[allow(clippy::too_many_arguments)]
fn encode_instruction(
    address: u32,
    mnemonic: &str,
    size_suffix: Option<SizeSuffix>,
    dest_register: Option<&str>,
    mode: &AddressingMode,
    narrowed_zero_page: bool,
    scope: Option<&str>,
    order: usize,
    loc: &SourceLocation,
    symbols: &SymbolTable,
    options: &CompilerOptions,
    diagnostics: &mut Diagnostics,
) -> Vec<u8> {
    let key = crate::isa::mode_key(mode, narrowed_zero_page);
    let Some(encoding) =
        crate::isa::lookup(options.target, mnemonic, dest_register, key, size_suffix)
    else {
        // Pass 1 already reported InvalidAddressingMode and reserved one
        // placeholder byte; keep subsequent addresses lined up with it.
        return vec![0u8; 1];
    };

    let mut bytes = encoding.opcode.clone();
    let Some(expr) = mode_exprs(mode) else {
        return bytes;
    };

    let ctx = make_ctx(symbols, scope, address, order);
    let value = match eval(expr, &ctx) {
        Ok(v) => v,
        Err(e) => {
            diagnostics.error(eval_err(e, loc));
            bytes.resize(encoding.total_size() as usize, 0);
            return bytes;
        }
    };

    if encoding.is_branch {
        let next_pc = address as i64 + encoding.total_size() as i64;
        let offset = value - next_pc;
        let bits = encoding.operand_size as u32 * 8;
        let (lo, hi) = signed_range(bits);
        if offset < lo || offset > hi {
            diagnostics.error(PoppyError::new(
                ErrorKind::BranchOutOfRange { offset: offset as i32, bits },
                loc.clone(),
            ));
            bytes.resize(encoding.total_size() as usize, 0);
            return bytes;
        }
        bytes.extend(encode_bytes(offset, encoding.operand_size, false));
        return bytes;
    }

    if narrowed_zero_page && !(0..=255).contains(&value) {
        diagnostics.error(PoppyError::new(
            ErrorKind::ValueOutOfRange { value, bits: 8 },
            loc.clone(),
        ));
        bytes.resize(encoding.total_size() as usize, 0);
        return bytes;
    }

    bytes.extend(encode_bytes(value, encoding.operand_size, is_big_endian(options)));
    bytes
}

#[allow(clippy::too_many_arguments)]
fn encode_data(
    width: DataWidth,
    values: &[Expr],
    scope: Option<&str>,
    order: usize,
    address: u32,
    symbols: &SymbolTable,
    options: &CompilerOptions,
    loc: &SourceLocation,
    diagnostics: &mut Diagnostics,
) -> Vec<u8> {
    let ctx = make_ctx(symbols, scope, address, order);
    let big_endian = is_big_endian(options);
    let width_bytes = match width {
        DataWidth::Byte => 1,
        DataWidth::Word => 2,
        DataWidth::Long => 3,
    };
    let mut out = Vec::new();
    for expr in values {
        if let (DataWidth::Byte, Expr::Str(s)) = (width, expr) {
            out.extend_from_slice(s.as_bytes());
            continue;
        }
        match eval(expr, &ctx) {
            Ok(v) => out.extend(encode_bytes(v, width_bytes, big_endian)),
            Err(e) => {
                diagnostics.error(eval_err(e, loc));
                out.extend(std::iter::repeat(0u8).take(width_bytes as usize));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SourceLocation;
    use crate::target::TargetArchitecture;
    use std::rc::Rc;

    fn loc() -> SourceLocation {
        SourceLocation::new(Rc::new("test.pasm".into()), 1, 1, 0)
    }

    fn options(target: TargetArchitecture) -> CompilerOptions {
        CompilerOptions { target, ..Default::default() }
    }

    #[test]
    fn encodes_implied_instruction() {
        let symbols = SymbolTable::new();
        let mut diags = Diagnostics::new();
        let layout = vec![LayoutItem::Instruction {
            address: 0x8000,
            mnemonic: "NOP".to_string(),
            size_suffix: None,
            dest_register: None,
            mode: AddressingMode::Implied,
            narrowed_zero_page: false,
            scope: None,
            order: 1,
            loc: loc(),
        }];
        let segments = generate(&layout, &symbols, &options(TargetArchitecture::Mos6502), &mut diags);
        assert!(!diags.has_errors());
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].start_address, 0x8000);
        assert_eq!(segments[0].bytes, vec![0xea]);
    }

    #[test]
    fn out_of_range_branch_reports_error() {
        let symbols = SymbolTable::new();
        let mut diags = Diagnostics::new();
        let layout = vec![LayoutItem::Instruction {
            address: 0x8000,
            mnemonic: "BEQ".to_string(),
            size_suffix: None,
            dest_register: None,
            mode: AddressingMode::Absolute(Expr::Number(0x9000)),
            narrowed_zero_page: false,
            scope: None,
            order: 1,
            loc: loc(),
        }];
        generate(&layout, &symbols, &options(TargetArchitecture::Mos6502), &mut diags);
        assert!(diags.has_errors());
        assert!(matches!(diags.errors()[0].kind, ErrorKind::BranchOutOfRange { .. }));
    }

    #[test]
    fn contiguous_items_merge_into_one_segment() {
        let symbols = SymbolTable::new();
        let mut diags = Diagnostics::new();
        let layout = vec![
            LayoutItem::Bytes { address: 0x200, bytes: vec![1, 2, 3] },
            LayoutItem::Bytes { address: 0x203, bytes: vec![4, 5] },
        ];
        let segments = generate(&layout, &symbols, &options(TargetArchitecture::Mos6502), &mut diags);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].bytes, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn non_contiguous_items_start_new_segments() {
        let symbols = SymbolTable::new();
        let mut diags = Diagnostics::new();
        let layout = vec![
            LayoutItem::Bytes { address: 0x200, bytes: vec![1, 2, 3] },
            LayoutItem::Bytes { address: 0x300, bytes: vec![4, 5] },
        ];
        let segments = generate(&layout, &symbols, &options(TargetArchitecture::Mos6502), &mut diags);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[1].start_address, 0x300);
    }
}
