//! AST -> symbol table + flattened, address-stamped layout (spec §4.4).
//!
//! Pass 1 (`Analyzer::walk_statements`) is a single recursive descent
//! over the statement tree: it assigns addresses, sizes instructions,
//! and expands macros/`.repeat`/`.if` inline, because expanding a
//! conditional requires evaluating its condition against whatever the
//! symbol table already holds at that point in the walk — there is no
//! separate "expansion pass" before layout. The walk's output is a flat
//! `Vec<LayoutItem>`: every label, macro, and control-flow construct is
//! gone, leaving only the things that ultimately emit or reserve bytes,
//! each stamped with a final address. Pass 2 (`verify_references`)
//! re-evaluates every expression in that list against the now-complete
//! symbol table and reports anything that still doesn't resolve.
//!
//! Code generation (a third walk, in `crate::codegen`) is what actually
//! turns `LayoutItem`s into bytes — this module only decides addresses,
//! sizes, and symbol values.

pub mod eval;
mod expand;
pub mod symbol;

use std::collections::HashMap;
use std::path::PathBuf;

use crate::ast::*;
use crate::diagnostics::Diagnostics;
use crate::errors::{ErrorKind, PoppyError};
use crate::file_reader::FileReader;
use crate::options::CompilerOptions;
use crate::rom::RomMetadata;
use crate::segment::{MemorySegment, SegmentKind};
use crate::source::SourceLocation;

use eval::{eval, EvalContext, EvalError};
use expand::rewrite_statements;
use symbol::{qualify_local, Symbol, SymbolKind, SymbolTable};

/// How many bytes a `.dw`/`.dl`-family directive's values width to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataWidth {
    Byte,
    Word,
    Long,
}

/// A thing pass 1 decided has a final address and a final (or
/// deferred-but-verifiable) size. Code generation owns turning these
/// into bytes; this module's job ends at "where" and "how big".
#[derive(Debug, Clone)]
pub enum LayoutItem {
    Instruction {
        address: u32,
        mnemonic: String,
        size_suffix: Option<SizeSuffix>,
        dest_register: Option<String>,
        mode: AddressingMode,
        /// Whether pass 1 narrowed an `Absolute`/`Indexed` operand to
        /// its zero-page form — optimistically, if the operand was a
        /// forward reference (spec §4.5: codegen re-checks and errors
        /// rather than re-laying out if this turns out wrong).
        narrowed_zero_page: bool,
        scope: Option<String>,
        order: usize,
        loc: SourceLocation,
    },
    Data {
        address: u32,
        width: DataWidth,
        values: Vec<Expr>,
        scope: Option<String>,
        order: usize,
        loc: SourceLocation,
    },
    /// Bytes already known at analysis time (`.incbin`, `.ascii`) —
    /// nothing left for code generation to evaluate.
    Bytes { address: u32, bytes: Vec<u8> },
    /// `count` copies of `value`, from `.ds`/`.fill`/`.align`/`.pad`.
    Fill {
        address: u32,
        count: u32,
        value: Expr,
        scope: Option<String>,
        order: usize,
        loc: SourceLocation,
    },
}

pub struct AnalysisResult {
    pub symbols: SymbolTable,
    pub layout: Vec<LayoutItem>,
    pub metadata: RomMetadata,
    pub big_endian_override: bool,
}

/// Runs both analysis passes over `program` and returns the symbol
/// table, flattened layout, and ROM metadata collected from platform
/// directives. Errors are appended to `diagnostics`; analysis keeps
/// going after most errors so a single compile can report several.
pub fn analyze<F: FileReader>(
    program: &Program,
    options: &CompilerOptions,
    reader: &F,
    diagnostics: &mut Diagnostics,
) -> AnalysisResult {
    let mut analyzer = Analyzer::new(options, reader);
    for (name, value) in &options.defines {
        let _ = analyzer.symbols.define(Symbol {
            name: name.clone(),
            kind: SymbolKind::Constant,
            value: Some(*value),
            def_loc: SourceLocation::synthetic(),
            scope: None,
            reassignable: true,
        });
    }
    analyzer.walk_statements(&program.statements, diagnostics);
    analyzer.resolve_deferred_constants(diagnostics);
    analyzer.verify_references(diagnostics);
    if options.autogenerate_labels {
        analyzer.autogenerate_labels();
    }
    AnalysisResult {
        symbols: analyzer.symbols,
        layout: analyzer.layout,
        metadata: analyzer.metadata,
        big_endian_override: analyzer.big_endian_override,
    }
}

pub(crate) fn make_ctx<'a>(
    symbols: &'a SymbolTable,
    scope: Option<&'a str>,
    address: u32,
    order: usize,
) -> EvalContext<'a> {
    EvalContext { symbols, scope, current_address: address, statement_order: order }
}

pub(crate) fn eval_err(err: EvalError, loc: &SourceLocation) -> PoppyError {
    match err {
        EvalError::Undefined(name) => PoppyError::new(ErrorKind::UndefinedSymbol(name), loc.clone()),
        EvalError::DivisionByZero => {
            PoppyError::new(ErrorKind::Other("division by zero".to_string()), loc.clone())
        }
    }
}

fn expr_as_string(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Str(s) => Some(s.clone()),
        Expr::Identifier(s) => Some(s.clone()),
        _ => None,
    }
}

pub(crate) fn mode_exprs(mode: &AddressingMode) -> Option<&Expr> {
    use AddressingMode::*;
    match mode {
        Immediate(e) | Absolute(e) | ZeroPage(e) | Indirect(e) | IndexedIndirect(e)
        | IndirectIndexed(e) | LongIndirect(e) | LongIndirectIndexed(e) | Relative(e)
        | Indexed(e, _) => Some(e),
        Implied | Accumulator | Register(_) => None,
    }
}

fn segment_kind_from_name(name: &str) -> Option<SegmentKind> {
    match name.to_ascii_lowercase().as_str() {
        "code" => Some(SegmentKind::Code),
        "data" => Some(SegmentKind::Data),
        "bss" => Some(SegmentKind::Bss),
        "zeropage" | "zp" | "directpage" => Some(SegmentKind::ZeroPage),
        "rom" => Some(SegmentKind::Rom),
        "ram" => Some(SegmentKind::Ram),
        _ => None,
    }
}

/// Every mnemonic spelling across the supported targets that reads as
/// "jump to this address" or "call this address", for the optional
/// autogenerated-label pass. Approximate by design (spec §4.4 only
/// requires `jsr`/`jmp`-style targets); documented as a heuristic.
fn call_kind(mnemonic: &str) -> Option<&'static str> {
    match mnemonic.to_ascii_uppercase().as_str() {
        "JSR" | "JSL" | "BSR" | "CALL" => Some("sub_"),
        "JMP" | "JML" | "JP" | "JR" | "BRA" | "BRL" | "BEQ" | "BNE" | "BCC" | "BCS" | "BMI"
        | "BPL" | "BVC" | "BVS" => Some("loc_"),
        _ => None,
    }
}

/// Tracks the active segment's write cursor. `.org` repositions the
/// current segment directly rather than offsetting within it — each
/// `.org` effectively opens a fresh contiguous run, which the code
/// generator's segment-placement step (grouping by address contiguity)
/// handles without needing this bookkeeping itself.
struct SegmentStore {
    segments: HashMap<String, MemorySegment>,
    current: String,
}

impl SegmentStore {
    fn new() -> Self {
        let mut segments = HashMap::new();
        segments.insert(String::new(), MemorySegment::new(String::new(), 0, SegmentKind::Code));
        Self { segments, current: String::new() }
    }

    fn current(&self) -> &MemorySegment {
        self.segments.get(&self.current).expect("current segment always present")
    }

    fn current_mut(&mut self) -> &mut MemorySegment {
        let name = self.current.clone();
        self.segments.get_mut(&name).expect("current segment always present")
    }

    fn switch(&mut self, name: String, kind: Option<SegmentKind>) {
        self.segments
            .entry(name.clone())
            .or_insert_with(|| MemorySegment::new(name.clone(), 0, kind.unwrap_or(SegmentKind::Code)));
        self.current = name;
    }

    fn set_org(&mut self, addr: u32) {
        let seg = self.current_mut();
        seg.start = addr;
        seg.current_offset = 0;
    }
}

struct Analyzer<'a, F: FileReader> {
    symbols: SymbolTable,
    segments: SegmentStore,
    macros: HashMap<String, MacroDefinitionNode>,
    metadata: RomMetadata,
    big_endian_override: bool,
    layout: Vec<LayoutItem>,
    deferred_constants: Vec<(String, Expr, SourceLocation, Option<String>, bool)>,
    current_scope: Option<String>,
    order_counter: usize,
    macro_invocation_counter: usize,
    expansion_depth: u32,
    options: &'a CompilerOptions,
    reader: &'a F,
}

impl<'a, F: FileReader> Analyzer<'a, F> {
    fn new(options: &'a CompilerOptions, reader: &'a F) -> Self {
        Self {
            symbols: SymbolTable::new(),
            segments: SegmentStore::new(),
            macros: HashMap::new(),
            metadata: RomMetadata {
                platform: Some(options.target.default_platform().to_string()),
                ..Default::default()
            },
            big_endian_override: options.big_endian_override,
            layout: Vec::new(),
            deferred_constants: Vec::new(),
            current_scope: None,
            order_counter: 0,
            macro_invocation_counter: 0,
            expansion_depth: 0,
            options,
            reader,
        }
    }

    fn walk_statements(&mut self, stmts: &[Statement], diagnostics: &mut Diagnostics) {
        for stmt in stmts {
            self.walk_statement(stmt, diagnostics);
        }
    }

    fn walk_statement(&mut self, stmt: &Statement, diagnostics: &mut Diagnostics) {
        match stmt {
            Statement::Label(label) => self.handle_label(label, diagnostics),
            Statement::Instruction(instr) => self.handle_instruction(instr, diagnostics),
            Statement::Directive(dir) => self.handle_directive(dir, diagnostics),
            Statement::MacroDefinition(def) => {
                self.macros.insert(def.name.clone(), def.clone());
            }
            Statement::MacroInvocation(inv) => self.handle_macro_invocation(inv, diagnostics),
            Statement::Conditional(cond) => self.handle_conditional(cond, diagnostics),
            Statement::RepeatBlock(rep) => self.handle_repeat(rep, diagnostics),
            Statement::EnumerationBlock(en) => self.handle_enum(en, diagnostics),
        }
    }

    // --- labels --------------------------------------------------------

    fn handle_label(&mut self, label: &LabelNode, diagnostics: &mut Diagnostics) {
        self.order_counter += 1;
        let order = self.order_counter;
        let addr = self.segments.current().current_address();
        match &label.kind {
            LabelKind::Global => {
                let sym = Symbol {
                    name: label.name.clone(),
                    kind: SymbolKind::Label,
                    value: Some(addr as i64),
                    def_loc: label.loc.clone(),
                    scope: None,
                    reassignable: false,
                };
                if self.symbols.define(sym).is_err() {
                    diagnostics.error(PoppyError::new(
                        ErrorKind::Redefinition(label.name.clone()),
                        label.loc.clone(),
                    ));
                }
                self.current_scope = Some(label.name.clone());
            }
            LabelKind::Local => {
                let scope = self.current_scope.clone().unwrap_or_default();
                let qualified = qualify_local(&scope, &label.name);
                let sym = Symbol {
                    name: qualified.clone(),
                    kind: SymbolKind::LocalLabel,
                    value: Some(addr as i64),
                    def_loc: label.loc.clone(),
                    scope: Some(scope),
                    reassignable: false,
                };
                if self.symbols.define(sym).is_err() {
                    diagnostics.error(PoppyError::new(
                        ErrorKind::Redefinition(qualified),
                        label.loc.clone(),
                    ));
                }
            }
            LabelKind::Anonymous(glyph) => {
                let depth = label.name.chars().count();
                self.symbols.push_anonymous(*glyph, depth, addr, order);
            }
        }
    }

    // --- instructions ----------------------------------------------------

    fn handle_instruction(&mut self, instr: &InstructionNode, diagnostics: &mut Diagnostics) {
        self.order_counter += 1;
        let order = self.order_counter;
        let addr = self.segments.current().current_address();

        let narrowed = self.decide_narrowing(&instr.mode, &instr.mnemonic, instr.dest_register.as_deref(), instr.size_suffix, addr, order);
        let key = crate::isa::mode_key(&instr.mode, narrowed);
        let encoding = crate::isa::lookup(
            self.options.target,
            &instr.mnemonic,
            instr.dest_register.as_deref(),
            key,
            instr.size_suffix,
        );
        let size = match &encoding {
            Some(enc) => enc.total_size(),
            None => {
                diagnostics.error(PoppyError::new(
                    ErrorKind::InvalidAddressingMode {
                        mnemonic: instr.mnemonic.clone(),
                        mode: format!("{:?}", key),
                    },
                    instr.loc.clone(),
                ));
                1
            }
        };

        self.layout.push(LayoutItem::Instruction {
            address: addr,
            mnemonic: instr.mnemonic.clone(),
            size_suffix: instr.size_suffix,
            dest_register: instr.dest_register.clone(),
            mode: instr.mode.clone(),
            narrowed_zero_page: narrowed,
            scope: self.current_scope.clone(),
            order,
            loc: instr.loc.clone(),
        });
        self.advance_pc(size as u32, diagnostics, &instr.loc);
    }

    /// Pass-1 zero-page/absolute narrowing (spec §4.4): a statically
    /// known value that fits in a byte narrows if the mnemonic has a
    /// zero-page form. A forward reference narrows optimistically if
    /// that form exists at all — code generation re-checks and errors
    /// if the resolved value doesn't actually fit (§4.5).
    fn decide_narrowing(
        &self,
        mode: &AddressingMode,
        mnemonic: &str,
        dest_register: Option<&str>,
        suffix: Option<SizeSuffix>,
        address: u32,
        order: usize,
    ) -> bool {
        let expr = match mode {
            AddressingMode::Absolute(e) | AddressingMode::Indexed(e, _) => e,
            _ => return false,
        };
        if let Some(suffix) = suffix {
            return matches!(suffix, SizeSuffix::Byte);
        }
        let zp_key = match mode {
            AddressingMode::Indexed(_, reg) => crate::isa::ModeKey::ZeroPageIndexed(*reg),
            _ => crate::isa::ModeKey::ZeroPage,
        };
        let zp_supported =
            crate::isa::lookup(self.options.target, mnemonic, dest_register, zp_key, None).is_some();
        if !zp_supported {
            return false;
        }
        let ctx = make_ctx(&self.symbols, self.current_scope.as_deref(), address, order);
        match eval(expr, &ctx) {
            Ok(v) => (0..=255).contains(&v),
            Err(_) => true,
        }
    }

    fn advance_pc(&mut self, size: u32, diagnostics: &mut Diagnostics, loc: &SourceLocation) {
        if size == 0 {
            return;
        }
        let seg_name = self.segments.current.clone();
        if !self.segments.current_mut().advance(size) {
            diagnostics.error(PoppyError::new(ErrorKind::SegmentOverflow(seg_name), loc.clone()));
        }
    }

    fn push_fill(&mut self, count: u32, value: Expr, loc: SourceLocation, diagnostics: &mut Diagnostics) {
        if count == 0 {
            return;
        }
        let addr = self.segments.current().current_address();
        if self.segments.current().kind != SegmentKind::Bss {
            self.order_counter += 1;
            self.layout.push(LayoutItem::Fill {
                address: addr,
                count,
                value,
                scope: self.current_scope.clone(),
                order: self.order_counter,
                loc: loc.clone(),
            });
        }
        self.advance_pc(count, diagnostics, &loc);
    }

    // --- macros, conditionals, repeat, enum -----------------------------

    fn handle_macro_invocation(&mut self, inv: &MacroInvocationNode, diagnostics: &mut Diagnostics) {
        let Some(def) = self.macros.get(&inv.name).cloned() else {
            diagnostics
                .error(PoppyError::new(ErrorKind::UnknownMacro(inv.name.clone()), inv.loc.clone()));
            return;
        };
        if def.params.len() != inv.args.len() {
            diagnostics.error(PoppyError::new(
                ErrorKind::MacroArityMismatch {
                    name: inv.name.clone(),
                    expected: def.params.len(),
                    got: inv.args.len(),
                },
                inv.loc.clone(),
            ));
            return;
        }
        if self.expansion_depth >= 64 {
            diagnostics.error(PoppyError::new(
                ErrorKind::Other(format!(
                    "macro '{}' nested too deeply (possible recursive expansion)",
                    inv.name
                )),
                inv.loc.clone(),
            ));
            return;
        }

        self.macro_invocation_counter += 1;
        let suffix = format!("__m{}", self.macro_invocation_counter);
        let args: HashMap<String, Expr> =
            def.params.iter().map(|p| p.name.clone()).zip(inv.args.iter().cloned()).collect();
        let arg_count = inv.args.len() as i64;
        let replace = |e: &Expr| match e {
            Expr::MacroParam(name) => args.get(name).cloned(),
            Expr::MacroArgCount => Some(Expr::Number(arg_count)),
            _ => None,
        };
        let rename_local = |name: &str| Some(format!("{}{}", name, suffix));
        let body = rewrite_statements(&def.body, &replace, &rename_local);

        self.expansion_depth += 1;
        self.walk_statements(&body, diagnostics);
        self.expansion_depth -= 1;
    }

    fn handle_conditional(&mut self, cond: &ConditionalNode, diagnostics: &mut Diagnostics) {
        for branch in &cond.branches {
            let taken = match branch.kind {
                ConditionalKind::IfDef => self.symbols.contains(branch.symbol.as_deref().unwrap_or("")),
                ConditionalKind::IfNDef => !self.symbols.contains(branch.symbol.as_deref().unwrap_or("")),
                ConditionalKind::If => {
                    let addr = self.segments.current().current_address();
                    let ctx =
                        make_ctx(&self.symbols, self.current_scope.as_deref(), addr, self.order_counter);
                    match branch.condition.as_ref().map(|e| eval(e, &ctx)) {
                        Some(Ok(v)) => v != 0,
                        Some(Err(e)) => {
                            diagnostics.error(PoppyError::new(
                                ErrorKind::InvalidConditional(format!("{:?}", e)),
                                cond.loc.clone(),
                            ));
                            false
                        }
                        None => false,
                    }
                }
            };
            if taken {
                self.walk_statements(&branch.body, diagnostics);
                return;
            }
        }
        if let Some(else_body) = &cond.else_body {
            self.walk_statements(else_body, diagnostics);
        }
    }

    fn handle_repeat(&mut self, rep: &RepeatBlockNode, diagnostics: &mut Diagnostics) {
        let addr = self.segments.current().current_address();
        let ctx = make_ctx(&self.symbols, self.current_scope.as_deref(), addr, self.order_counter);
        let count = match eval(&rep.count, &ctx) {
            Ok(v) if v >= 0 => v,
            Ok(_) => {
                diagnostics.error(PoppyError::new(
                    ErrorKind::Other("'.repeat' count must not be negative".to_string()),
                    rep.loc.clone(),
                ));
                return;
            }
            Err(e) => {
                diagnostics.error(eval_err(e, &rep.loc));
                return;
            }
        };
        if self.expansion_depth >= 64 {
            diagnostics.error(PoppyError::new(
                ErrorKind::Other(".repeat nested too deeply".to_string()),
                rep.loc.clone(),
            ));
            return;
        }

        self.expansion_depth += 1;
        for i in 0..count {
            let body = match &rep.counter {
                Some(counter_name) => {
                    let replace = |e: &Expr| match e {
                        Expr::Identifier(name) if name == counter_name => Some(Expr::Number(i)),
                        _ => None,
                    };
                    rewrite_statements(&rep.body, &replace, &|_| None)
                }
                None => rep.body.clone(),
            };
            self.walk_statements(&body, diagnostics);
        }
        self.expansion_depth -= 1;
    }

    fn handle_enum(&mut self, en: &EnumerationBlockNode, diagnostics: &mut Diagnostics) {
        let addr = self.segments.current().current_address();
        let ctx = make_ctx(&self.symbols, self.current_scope.as_deref(), addr, self.order_counter);
        let start = match eval(&en.start, &ctx) {
            Ok(v) => v,
            Err(e) => {
                diagnostics.error(eval_err(e, &en.loc));
                return;
            }
        };
        let step = match &en.step {
            Some(expr) => match eval(expr, &ctx) {
                Ok(v) => v,
                Err(e) => {
                    diagnostics.error(eval_err(e, &en.loc));
                    return;
                }
            },
            None => 1,
        };
        for (i, name) in en.entries.iter().enumerate() {
            let value = start + step * i as i64;
            let sym = Symbol {
                name: name.clone(),
                kind: SymbolKind::Constant,
                value: Some(value),
                def_loc: en.loc.clone(),
                scope: self.current_scope.clone(),
                reassignable: false,
            };
            if self.symbols.define(sym).is_err() {
                diagnostics
                    .error(PoppyError::new(ErrorKind::Redefinition(name.clone()), en.loc.clone()));
            }
        }
    }

    // --- directives ------------------------------------------------------

    fn handle_directive(&mut self, dir: &DirectiveNode, diagnostics: &mut Diagnostics) {
        let canon = dir.name.trim_start_matches('.').to_ascii_lowercase();
        match canon.as_str() {
            "equ" | "define" => self.handle_constant(dir, false, diagnostics),
            "set" => self.handle_constant(dir, true, diagnostics),
            "org" => self.handle_org(dir, diagnostics),
            "segment" => self.handle_segment(dir),
            "bank" => self.handle_bank(dir, diagnostics),
            "align" => self.handle_align(dir, diagnostics),
            "pad" => self.handle_pad(dir, diagnostics),
            "db" | "byte" => self.handle_data(dir, DataWidth::Byte, diagnostics),
            "dw" | "word" => self.handle_data(dir, DataWidth::Word, diagnostics),
            "dl" | "long" => self.handle_data(dir, DataWidth::Long, diagnostics),
            "ds" | "fill" => self.handle_reserve(dir, diagnostics),
            "incbin" => self.handle_incbin(dir, diagnostics),
            "ascii" => self.handle_ascii(dir, diagnostics),
            "big_endian" => self.big_endian_override = true,
            "nes" | "snes" | "gb" | "gba" | "genesis" | "atari2600" | "lynx" | "tg16" | "spc" => {
                self.metadata.platform = Some(canon);
            }
            "lorom" => self.metadata.mapping = Some("lorom".to_string()),
            "hirom" => self.metadata.mapping = Some("hirom".to_string()),
            "title" | "snes_title" | "gb_title" => {
                self.metadata.title = self.string_arg(dir, 0, diagnostics)
            }
            "mapper" => self.metadata.mapper = self.u8_arg(dir, 0, diagnostics),
            "mirroring" => self.metadata.mirroring = self.string_arg(dir, 0, diagnostics),
            "region" => self.metadata.region = self.string_arg(dir, 0, diagnostics),
            "cgb_flag" => self.metadata.cgb_flag = self.u8_arg(dir, 0, diagnostics),
            "sgb_flag" => self.metadata.sgb_flag = self.u8_arg(dir, 0, diagnostics),
            "game_code" => self.metadata.game_code = self.string_arg(dir, 0, diagnostics),
            "maker_code" => self.metadata.maker_code = self.string_arg(dir, 0, diagnostics),
            "version" => self.metadata.version = self.u8_arg(dir, 0, diagnostics),
            "bank_switching" => self.metadata.bank_switching = self.string_arg(dir, 0, diagnostics),
            "manufacturer" => self.metadata.manufacturer = self.string_arg(dir, 0, diagnostics),
            "rotation" => self.metadata.rotation = self.u8_arg(dir, 0, diagnostics),
            "artist" => self.metadata.artist = self.string_arg(dir, 0, diagnostics),
            "dumper" => self.metadata.dumper = self.string_arg(dir, 0, diagnostics),
            "comment" => self.metadata.comment = self.string_arg(dir, 0, diagnostics),
            "chr_banks" => self.metadata.chr_banks = self.u8_arg(dir, 0, diagnostics),
            "prg_banks" => self.metadata.prg_banks = self.u8_arg(dir, 0, diagnostics),
            "submapper" => self.metadata.submapper = self.u8_arg(dir, 0, diagnostics),
            "nes_timing" => self.metadata.nes_timing = self.u8_arg(dir, 0, diagnostics),
            _ => diagnostics
                .error(PoppyError::new(ErrorKind::UnknownDirective(dir.name.clone()), dir.loc.clone())),
        }
    }

    fn string_arg(&self, dir: &DirectiveNode, idx: usize, diagnostics: &mut Diagnostics) -> Option<String> {
        match dir.args.get(idx).and_then(expr_as_string) {
            Some(s) => Some(s),
            None => {
                diagnostics.error(PoppyError::new(
                    ErrorKind::InvalidDirectiveArity {
                        directive: dir.name.clone(),
                        expected: "a string argument".to_string(),
                        got: dir.args.len(),
                    },
                    dir.loc.clone(),
                ));
                None
            }
        }
    }

    fn u8_arg(&self, dir: &DirectiveNode, idx: usize, diagnostics: &mut Diagnostics) -> Option<u8> {
        let expr = dir.args.get(idx)?;
        let addr = self.segments.current().current_address();
        let ctx = make_ctx(&self.symbols, self.current_scope.as_deref(), addr, self.order_counter);
        match eval(expr, &ctx) {
            Ok(v) => Some(v as u8),
            Err(e) => {
                diagnostics.error(eval_err(e, &dir.loc));
                None
            }
        }
    }

    fn handle_constant(&mut self, dir: &DirectiveNode, reassignable: bool, diagnostics: &mut Diagnostics) {
        let name = match dir.args.first() {
            Some(Expr::Identifier(n)) => n.clone(),
            _ => {
                diagnostics.error(PoppyError::new(
                    ErrorKind::InvalidDirectiveArity {
                        directive: dir.name.clone(),
                        expected: "name, value".to_string(),
                        got: dir.args.len(),
                    },
                    dir.loc.clone(),
                ));
                return;
            }
        };
        let value_expr = match dir.args.get(1) {
            Some(e) => e.clone(),
            None => {
                diagnostics.error(PoppyError::new(
                    ErrorKind::InvalidDirectiveArity {
                        directive: dir.name.clone(),
                        expected: "2".to_string(),
                        got: dir.args.len(),
                    },
                    dir.loc.clone(),
                ));
                return;
            }
        };
        let addr = self.segments.current().current_address();
        let ctx = make_ctx(&self.symbols, self.current_scope.as_deref(), addr, self.order_counter);
        match eval(&value_expr, &ctx) {
            Ok(value) => {
                let sym = Symbol {
                    name: name.clone(),
                    kind: SymbolKind::Constant,
                    value: Some(value),
                    def_loc: dir.loc.clone(),
                    scope: self.current_scope.clone(),
                    reassignable,
                };
                if self.symbols.define(sym).is_err() {
                    diagnostics.error(PoppyError::new(ErrorKind::Redefinition(name), dir.loc.clone()));
                }
            }
            Err(EvalError::Undefined(_)) => {
                self.deferred_constants.push((
                    name,
                    value_expr,
                    dir.loc.clone(),
                    self.current_scope.clone(),
                    reassignable,
                ));
            }
            Err(e) => diagnostics.error(eval_err(e, &dir.loc)),
        }
    }

    fn resolve_deferred_constants(&mut self, diagnostics: &mut Diagnostics) {
        let mut pending = std::mem::take(&mut self.deferred_constants);
        loop {
            let mut progressed = false;
            let mut still_pending = Vec::new();
            for (name, expr, loc, scope, reassignable) in pending {
                let ctx = make_ctx(&self.symbols, scope.as_deref(), 0, usize::MAX);
                match eval(&expr, &ctx) {
                    Ok(value) => {
                        progressed = true;
                        let sym = Symbol {
                            name: name.clone(),
                            kind: SymbolKind::Constant,
                            value: Some(value),
                            def_loc: loc.clone(),
                            scope: scope.clone(),
                            reassignable,
                        };
                        if self.symbols.define(sym).is_err() {
                            diagnostics.error(PoppyError::new(ErrorKind::Redefinition(name), loc));
                        }
                    }
                    Err(EvalError::Undefined(_)) => still_pending.push((name, expr, loc, scope, reassignable)),
                    Err(e) => {
                        progressed = true;
                        diagnostics.error(eval_err(e, &loc));
                    }
                }
            }
            if still_pending.is_empty() {
                break;
            }
            if !progressed {
                for (name, _, loc, _, _) in &still_pending {
                    diagnostics.error(PoppyError::new(ErrorKind::CircularConstant(name.clone()), loc.clone()));
                }
                break;
            }
            pending = still_pending;
        }
    }

    fn handle_org(&mut self, dir: &DirectiveNode, diagnostics: &mut Diagnostics) {
        let Some(expr) = dir.args.first() else {
            diagnostics.error(PoppyError::new(
                ErrorKind::InvalidDirectiveArity { directive: dir.name.clone(), expected: "1".to_string(), got: 0 },
                dir.loc.clone(),
            ));
            return;
        };
        let addr = self.segments.current().current_address();
        let ctx = make_ctx(&self.symbols, self.current_scope.as_deref(), addr, self.order_counter);
        match eval(expr, &ctx) {
            Ok(v) => self.segments.set_org(v as u32),
            Err(e) => diagnostics.error(eval_err(e, &dir.loc)),
        }
    }

    fn handle_segment(&mut self, dir: &DirectiveNode) {
        let name = match dir.args.first() {
            Some(Expr::Identifier(n)) => n.clone(),
            Some(Expr::Str(s)) => s.clone(),
            _ => return,
        };
        let kind = match dir.args.get(1) {
            Some(Expr::Identifier(k)) => segment_kind_from_name(k),
            _ => None,
        };
        self.segments.switch(name, kind);
    }

    fn handle_bank(&mut self, dir: &DirectiveNode, diagnostics: &mut Diagnostics) {
        let Some(expr) = dir.args.first() else { return };
        let addr = self.segments.current().current_address();
        let ctx = make_ctx(&self.symbols, self.current_scope.as_deref(), addr, self.order_counter);
        match eval(expr, &ctx) {
            Ok(n) if (0..=0xff).contains(&n) => self.segments.current_mut().bank = n as u32,
            Ok(n) => diagnostics.error(PoppyError::new(ErrorKind::BankOutOfRange(n as u32), dir.loc.clone())),
            Err(e) => diagnostics.error(eval_err(e, &dir.loc)),
        }
    }

    fn handle_align(&mut self, dir: &DirectiveNode, diagnostics: &mut Diagnostics) {
        let Some(expr) = dir.args.first() else { return };
        let addr = self.segments.current().current_address();
        let ctx = make_ctx(&self.symbols, self.current_scope.as_deref(), addr, self.order_counter);
        let n = match eval(expr, &ctx) {
            Ok(n) if n > 0 => n as u32,
            Ok(_) => {
                diagnostics.error(PoppyError::new(
                    ErrorKind::Other("alignment must be positive".to_string()),
                    dir.loc.clone(),
                ));
                return;
            }
            Err(e) => {
                diagnostics.error(eval_err(e, &dir.loc));
                return;
            }
        };
        let current = self.segments.current().current_address();
        let rem = current % n;
        let next = if rem == 0 { current } else { current + (n - rem) };
        self.push_fill(next - current, Expr::Number(0), dir.loc.clone(), diagnostics);
    }

    fn handle_pad(&mut self, dir: &DirectiveNode, diagnostics: &mut Diagnostics) {
        let Some(expr) = dir.args.first() else { return };
        let addr = self.segments.current().current_address();
        let ctx = make_ctx(&self.symbols, self.current_scope.as_deref(), addr, self.order_counter);
        let target = match eval(expr, &ctx) {
            Ok(v) => v as u32,
            Err(e) => {
                diagnostics.error(eval_err(e, &dir.loc));
                return;
            }
        };
        let current = self.segments.current().current_address();
        if target < current {
            diagnostics.error(PoppyError::new(
                ErrorKind::Other(format!(
                    "'.pad' target ${:x} is before the current address ${:x}",
                    target, current
                )),
                dir.loc.clone(),
            ));
            return;
        }
        let value = dir.args.get(1).cloned().unwrap_or(Expr::Number(0));
        self.push_fill(target - current, value, dir.loc.clone(), diagnostics);
    }

    fn handle_data(&mut self, dir: &DirectiveNode, width: DataWidth, diagnostics: &mut Diagnostics) {
        if dir.args.is_empty() {
            diagnostics.error(PoppyError::new(
                ErrorKind::InvalidDirectiveArity {
                    directive: dir.name.clone(),
                    expected: "at least 1".to_string(),
                    got: 0,
                },
                dir.loc.clone(),
            ));
            return;
        }
        let width_bytes = match width {
            DataWidth::Byte => 1u32,
            DataWidth::Word => 2,
            DataWidth::Long => 3,
        };
        let mut count = 0u32;
        for a in &dir.args {
            match (width, a) {
                (DataWidth::Byte, Expr::Str(s)) => count += s.len() as u32,
                (_, Expr::Str(_)) => diagnostics.error(PoppyError::new(
                    ErrorKind::Other("string literal only valid in a byte-width data directive".to_string()),
                    dir.loc.clone(),
                )),
                _ => count += width_bytes,
            }
        }
        self.order_counter += 1;
        let order = self.order_counter;
        let addr = self.segments.current().current_address();
        if self.segments.current().kind != SegmentKind::Bss {
            self.layout.push(LayoutItem::Data {
                address: addr,
                width,
                values: dir.args.clone(),
                scope: self.current_scope.clone(),
                order,
                loc: dir.loc.clone(),
            });
        }
        self.advance_pc(count, diagnostics, &dir.loc);
    }

    fn handle_reserve(&mut self, dir: &DirectiveNode, diagnostics: &mut Diagnostics) {
        let Some(count_expr) = dir.args.first() else {
            diagnostics.error(PoppyError::new(
                ErrorKind::InvalidDirectiveArity {
                    directive: dir.name.clone(),
                    expected: "1 or 2".to_string(),
                    got: 0,
                },
                dir.loc.clone(),
            ));
            return;
        };
        let addr = self.segments.current().current_address();
        let ctx = make_ctx(&self.symbols, self.current_scope.as_deref(), addr, self.order_counter);
        let count = match eval(count_expr, &ctx) {
            Ok(v) if v >= 0 => v as u32,
            Ok(_) => {
                diagnostics.error(PoppyError::new(
                    ErrorKind::Other("reserved byte count must not be negative".to_string()),
                    dir.loc.clone(),
                ));
                return;
            }
            Err(e) => {
                diagnostics.error(eval_err(e, &dir.loc));
                return;
            }
        };
        let value = dir.args.get(1).cloned().unwrap_or(Expr::Number(0));
        self.push_fill(count, value, dir.loc.clone(), diagnostics);
    }

    fn handle_ascii(&mut self, dir: &DirectiveNode, diagnostics: &mut Diagnostics) {
        let mut bytes = Vec::new();
        for arg in &dir.args {
            match arg {
                Expr::Str(s) => bytes.extend_from_slice(s.as_bytes()),
                _ => diagnostics.error(PoppyError::new(
                    ErrorKind::Other("'.ascii' arguments must be string literals".to_string()),
                    dir.loc.clone(),
                )),
            }
        }
        self.order_counter += 1;
        let addr = self.segments.current().current_address();
        let count = bytes.len() as u32;
        if self.segments.current().kind != SegmentKind::Bss {
            self.layout.push(LayoutItem::Bytes { address: addr, bytes });
        }
        self.advance_pc(count, diagnostics, &dir.loc);
    }

    fn handle_incbin(&mut self, dir: &DirectiveNode, diagnostics: &mut Diagnostics) {
        let Some(path_str) = dir.args.first().and_then(expr_as_string) else {
            diagnostics.error(PoppyError::new(
                ErrorKind::InvalidDirectiveArity {
                    directive: dir.name.clone(),
                    expected: "path".to_string(),
                    got: dir.args.len(),
                },
                dir.loc.clone(),
            ));
            return;
        };
        let current_file = dir.loc.file_path().to_path_buf();
        let resolved = crate::preprocessor::resolve_include(
            &current_file,
            &path_str,
            &self.options.include_paths,
            self.reader,
        )
        .unwrap_or_else(|| PathBuf::from(&path_str));
        let bytes = match self.reader.read_binary(&resolved) {
            Ok(b) => b,
            Err(e) => {
                diagnostics.error(PoppyError::new(
                    ErrorKind::IncludeNotFound(format!("{}: {}", resolved.display(), e)),
                    dir.loc.clone(),
                ));
                return;
            }
        };
        self.order_counter += 1;
        let addr = self.segments.current().current_address();
        let count = bytes.len() as u32;
        if self.segments.current().kind != SegmentKind::Bss {
            self.layout.push(LayoutItem::Bytes { address: addr, bytes });
        }
        self.advance_pc(count, diagnostics, &dir.loc);
    }

    // --- pass 2 ----------------------------------------------------------

    fn verify_references(&mut self, diagnostics: &mut Diagnostics) {
        for item in &self.layout {
            match item {
                LayoutItem::Instruction { mode, scope, order, address, loc, .. } => {
                    if let Some(expr) = mode_exprs(mode) {
                        let ctx = make_ctx(&self.symbols, scope.as_deref(), *address, *order);
                        if let Err(e) = eval(expr, &ctx) {
                            diagnostics.error(eval_err(e, loc));
                        }
                    }
                }
                LayoutItem::Data { values, scope, order, address, loc, .. } => {
                    let ctx = make_ctx(&self.symbols, scope.as_deref(), *address, *order);
                    for expr in values {
                        if let Err(e) = eval(expr, &ctx) {
                            diagnostics.error(eval_err(e, loc));
                        }
                    }
                }
                LayoutItem::Fill { value, scope, order, address, loc, .. } => {
                    let ctx = make_ctx(&self.symbols, scope.as_deref(), *address, *order);
                    if let Err(e) = eval(value, &ctx) {
                        diagnostics.error(eval_err(e, loc));
                    }
                }
                LayoutItem::Bytes { .. } => {}
            }
        }
    }

    /// Opt-in pass (spec §4.4): synthesizes `sub_XXXX`/`loc_XXXX` labels
    /// at any call/jump target that doesn't already have one.
    fn autogenerate_labels(&mut self) {
        let mut claimed: HashMap<u32, ()> = HashMap::new();
        let mut new_symbols = Vec::new();
        for item in &self.layout {
            let LayoutItem::Instruction { mnemonic, mode, scope, order, address, loc, .. } = item else {
                continue;
            };
            let Some(prefix) = call_kind(mnemonic) else { continue };
            let Some(expr) = mode_exprs(mode) else { continue };
            let ctx = make_ctx(&self.symbols, scope.as_deref(), *address, *order);
            let Ok(target) = eval(expr, &ctx) else { continue };
            let target = target as u32;
            if claimed.contains_key(&target) || self.symbols.all().any(|s| s.value == Some(target as i64)) {
                continue;
            }
            claimed.insert(target, ());
            new_symbols.push(Symbol {
                name: format!("{}{:04x}", prefix, target),
                kind: SymbolKind::Label,
                value: Some(target as i64),
                def_loc: loc.clone(),
                scope: None,
                reassignable: false,
            });
        }
        for sym in new_symbols {
            let _ = self.symbols.define(sym);
        }
    }
}
