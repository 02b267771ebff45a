//! Turning source text into a [`Program`].
//!
//! The first pass reads the source a line at a time.  It gives each
//! statement its address, defines labels and other symbols, and
//! collects literals.  Once every line has been read, the literal
//! pool is placed after the last statement and the program is
//! checked as a whole.  The second pass then encodes every statement;
//! because all symbols are defined by then, statements may refer to
//! labels which appear later in the source.
use tracing::{event, span, Level};

use base::bitfield::PAGE_SIZE;
use base::isa::{
    find_definition, is_mnemonic, InstructionDefinition, OperandDefinition, OperandType, ValueRange,
};
use base::object::{segment_name, Relocation};
use base::symbol::{valid_symbol_name, Symbol, SymbolTable};

use super::literal::LiteralTable;
use super::operand::{parse_constant, parse_literal, Environment, RawOperand};
use super::program::{ImportReference, Program, Statement, Word};
use super::scanner::{is_comment_or_blank, scan_line, ScannedLine};
use super::types::{LineNumber, ProgramError, ProgramErrors};

/// The most symbols one program may define.
pub const MAX_SYMBOLS: usize = 100;
/// The most distinct literals one program may use.
pub const MAX_LITERALS: usize = 50;
/// The most words (including reserved space and literals) one
/// program may occupy.
pub const MAX_SOURCE_RECORDS: u32 = 200;

const ADDRESS_LIMIT: u32 = 0x1_0000;

/// The single 16-bit field of a `.FILL` word.
const FILL_SLOT: OperandDefinition = OperandDefinition::new(
    false,
    &[OperandType::Immediate, OperandType::Symbol],
    ValueRange::Word,
    15,
    0,
);

/// What one statement will turn into.
#[derive(Debug)]
pub(crate) enum Body {
    /// Nothing is emitted.
    Nothing,
    /// `count` words are reserved but nothing is stored in them.
    Reserve(u32),
    /// A statement which could not be understood.  It is taken to
    /// occupy one word, so that the addresses of the statements after
    /// it are plausible.
    Invalid,
    Machine {
        definition: &'static InstructionDefinition,
        operands: Vec<RawOperand>,
    },
    Fill(RawOperand),
    Data(Vec<u16>),
}

impl Body {
    fn size(&self) -> u32 {
        match self {
            Body::Nothing => 0,
            Body::Reserve(n) => *n,
            Body::Invalid | Body::Fill(_) => 1,
            Body::Machine { definition, .. } => {
                u32::try_from(definition.size()).unwrap_or(u32::MAX)
            }
            Body::Data(words) => u32::try_from(words.len()).unwrap_or(u32::MAX),
        }
    }
}

#[derive(Debug)]
struct Pending {
    line: LineNumber,
    source: String,
    address: u32,
    body: Body,
}

/// State of the first pass.
#[derive(Debug)]
pub(crate) struct Assembly {
    pub(crate) errors: Vec<ProgramError>,
    pub(crate) symbols: SymbolTable,
    pub(crate) literals: LiteralTable,
    pending: Vec<Pending>,
    pub(crate) location: u32,
    pub(crate) origin: u16,
    pub(crate) relocatable: bool,
    pub(crate) seen_orig: bool,
    pub(crate) seen_end: bool,
    pub(crate) end_operand: Option<(LineNumber, RawOperand)>,
    pub(crate) exports: Vec<(LineNumber, String)>,
    pub(crate) segment_name: String,
}

/// Truncate an address known to be (or already reported as not
/// being) within the address space.
fn word_address(address: u32) -> u16 {
    #[allow(clippy::cast_possible_truncation)]
    let truncated = (address & 0xFFFF) as u16;
    truncated
}

impl Assembly {
    fn new(segment_hint: &str) -> Assembly {
        Assembly {
            errors: Vec::new(),
            symbols: SymbolTable::new(),
            literals: LiteralTable::new(),
            pending: Vec::new(),
            location: 0,
            origin: 0,
            relocatable: false,
            seen_orig: false,
            seen_end: false,
            end_operand: None,
            exports: Vec::new(),
            segment_name: segment_name(segment_hint),
        }
    }

    pub(crate) fn has_statements(&self) -> bool {
        !self.pending.is_empty()
    }

    pub(crate) fn semantic(&mut self, line: LineNumber, msg: String) {
        self.errors.push(ProgramError::semantic(line, msg));
    }

    pub(crate) fn structural(&mut self, line: LineNumber, msg: String) {
        self.errors.push(ProgramError::structural(Some(line), msg));
    }

    pub(crate) fn syntax(&mut self, line: LineNumber, msg: String) {
        self.errors.push(ProgramError::syntax(line, msg));
    }

    /// Define `label` at the current location.
    pub(crate) fn define_label(&mut self, line: LineNumber, label: &str) {
        if !valid_symbol_name(label) {
            // The scanner has already complained.
            return;
        }
        let value = i32::try_from(self.location).unwrap_or(i32::MAX);
        event!(
            Level::DEBUG,
            "line {line}: label {label} = {value:04X}{}",
            if self.relocatable { " (relocatable)" } else { "" }
        );
        if let Err(e) = self
            .symbols
            .define(Symbol::new(label, value, self.relocatable))
        {
            self.semantic(line, e.to_string());
        }
    }

    fn statement(&mut self, line: LineNumber, source: &str, scanned: ScannedLine) {
        let ScannedLine {
            label,
            op,
            operands,
        } = scanned;
        let operands: Vec<RawOperand> = operands.iter().map(|text| RawOperand::new(text)).collect();
        let address = self.location;
        match op.as_str() {
            ".ORIG" | ".EQU" => (),
            ".END" | ".ENT" | ".EXT" => {
                if !label.is_empty() {
                    self.semantic(line, format!("No label allowed on {op} instruction."));
                }
            }
            _ => {
                if !label.is_empty() {
                    self.define_label(line, &label);
                }
            }
        }
        let body = match op.as_str() {
            ".ORIG" => self.orig(line, &label, &operands),
            ".EQU" => self.equ(line, &label, &operands),
            ".FILL" => self.fill(line, operands),
            ".STRZ" => self.strz(line, &operands),
            ".BLKW" => self.blkw(line, &operands),
            ".END" => self.end(line, operands),
            ".ENT" => self.ent(line, &operands),
            ".EXT" => self.ext(line, &operands),
            _ => self.machine(line, &op, operands),
        };
        // .ORIG moves the location counter.
        let address = if matches!(body, Body::Nothing) {
            self.location
        } else {
            address
        };
        self.location = self.location.saturating_add(body.size());
        self.pending.push(Pending {
            line,
            source: source.to_string(),
            address,
            body,
        });
    }

    fn machine(&mut self, line: LineNumber, op: &str, operands: Vec<RawOperand>) -> Body {
        if op.is_empty() {
            if !operands.is_empty() {
                self.syntax(line, "Missing operation.".to_string());
            }
            return Body::Nothing;
        }
        let types: Vec<OperandType> = operands.iter().map(|o| o.kind).collect();
        let Some(definition) = find_definition(op, &types) else {
            if is_mnemonic(op) {
                self.semantic(
                    line,
                    format!("Could not find definition for operation \"{op}\" with matching operands."),
                );
            } else {
                self.semantic(line, format!("Unknown operation \"{op}\"."));
            }
            return Body::Invalid;
        };
        for operand in operands.iter().filter(|o| o.kind == OperandType::Literal) {
            match parse_literal(&operand.text) {
                Ok(value) => {
                    self.literals.define(value);
                }
                Err(msg) => {
                    self.syntax(line, msg);
                    return Body::Invalid;
                }
            }
        }
        Body::Machine {
            definition,
            operands,
        }
    }

    fn resolve_start_address(&mut self, end: u32) -> u16 {
        let Some((line, operand)) = self.end_operand.take() else {
            return self.origin;
        };
        let value: Option<i32> = match operand.kind {
            OperandType::Immediate => match parse_constant(&operand.text) {
                Ok(v) => Some(v),
                Err(msg) => {
                    self.syntax(line, msg);
                    return self.origin;
                }
            },
            OperandType::Symbol => match self.symbols.get(&operand.text).map(|s| (s.is_import, s.value)) {
                None => {
                    self.semantic(line, format!("Undefined symbol \"{}\".", operand.text));
                    return self.origin;
                }
                Some((true, _)) => {
                    self.semantic(
                        line,
                        format!(
                            "Imported symbol \"{}\" cannot be the start address.",
                            operand.text
                        ),
                    );
                    return self.origin;
                }
                Some((false, value)) => Some(value),
            },
            _ => None,
        };
        let start = value.and_then(|v| u16::try_from(v).ok());
        let Some(start) = start else {
            self.semantic(line, format!(".END operand \"{}\" is not an address.", operand.text));
            return self.origin;
        };
        let inside = (u32::from(self.origin)..end).contains(&u32::from(start))
            || (end == u32::from(self.origin) && start == self.origin);
        if !inside {
            self.semantic(
                line,
                format!(".END operand \"{}\" is outside the program.", operand.text),
            );
        }
        start
    }

    fn check_program(&mut self, last: u32) {
        let mut problems: Vec<&str> = Vec::new();
        if self.relocatable && last > PAGE_SIZE {
            problems.push("Program spans multiple memory pages. Relocate or shrink the program to fit inside one memory page.");
        }
        if last > ADDRESS_LIMIT {
            problems.push("Program loads into memory outside the addressable range.");
        }
        if self.symbols.len() > MAX_SYMBOLS {
            problems.push("Program exceeds limit for maximum number of symbols.");
        }
        if self.literals.len() > MAX_LITERALS {
            problems.push("Program exceeds limit for maximum number of literals.");
        }
        if last.saturating_sub(u32::from(self.origin)) > MAX_SOURCE_RECORDS {
            problems.push("Program exceeds limit for maximum number of source records.");
        }
        if !self.seen_orig || !self.seen_end {
            problems.push("Program is missing .ORIG and/or .END instructions.");
        }
        for msg in problems {
            self.errors
                .push(ProgramError::structural(None, msg.to_string()));
        }

        for (line, name) in std::mem::take(&mut self.exports) {
            match self.symbols.get(&name).map(|sym| sym.is_import) {
                None => self.semantic(line, format!("Undefined .ENT symbol \"{name}\".")),
                Some(true) => self.semantic(
                    line,
                    format!("Imported symbol \"{name}\" cannot be exported."),
                ),
                Some(false) => {
                    if let Err(e) = self.symbols.mark_export(&name) {
                        self.semantic(line, e.to_string());
                    }
                }
            }
        }
    }

    fn encode(
        &self,
        pending: &Pending,
        errors: &mut Vec<ProgramError>,
        imports: &mut Vec<ImportReference>,
    ) -> Vec<Word> {
        let address = word_address(pending.address);
        let (slots, operands, mut words): (&[OperandDefinition], &[RawOperand], Vec<u16>) =
            match &pending.body {
                Body::Nothing | Body::Reserve(_) | Body::Invalid => return Vec::new(),
                Body::Data(data) => {
                    return data
                        .iter()
                        .enumerate()
                        .map(|(i, value)| Word {
                            address: word_address(pending.address + u32::try_from(i).unwrap_or(0)),
                            value: *value,
                            relocation: None,
                        })
                        .collect();
                }
                Body::Fill(operand) => (
                    std::slice::from_ref(&FILL_SLOT),
                    std::slice::from_ref(operand),
                    vec![0],
                ),
                Body::Machine {
                    definition,
                    operands,
                } => (definition.operands, operands.as_slice(), definition.operations.to_vec()),
            };
        let mut masks: Vec<u16> = vec![0; words.len()];
        for (slot, operand) in slots.iter().zip(operands.iter()) {
            let index = slot.word_index;
            let word_addr = word_address(pending.address + u32::try_from(index).unwrap_or(0));
            let env = Environment {
                symbols: &self.symbols,
                literals: &self.literals,
                origin: self.origin,
                relocatable: self.relocatable,
                address: word_addr,
            };
            match operand.resolve(slot, &env) {
                Ok(resolved) => {
                    words[index] = resolved.insert(words[index], slot);
                    if resolved.relocatable {
                        masks[index] |= slot.range.mask();
                    }
                    if let Some(name) = resolved.import {
                        imports.push(ImportReference {
                            address: word_addr,
                            range: slot.range,
                            name,
                        });
                    }
                }
                Err(msg) => errors.push(ProgramError::semantic(pending.line, msg)),
            }
        }
        words
            .into_iter()
            .zip(masks)
            .enumerate()
            .map(|(i, (value, mask))| Word {
                address: address.wrapping_add(u16::try_from(i).unwrap_or(0)),
                value,
                relocation: Relocation::for_mask(mask),
            })
            .collect()
    }

    fn finish(mut self) -> Result<Program, ProgramErrors> {
        let end = self.location;
        self.literals.set_offset(word_address(end));
        let last = end.saturating_add(u32::try_from(self.literals.len()).unwrap_or(u32::MAX));
        self.check_program(last);
        let start_address = self.resolve_start_address(end);

        let mut errors = std::mem::take(&mut self.errors);
        let mut imports: Vec<ImportReference> = Vec::new();
        let statements: Vec<Statement> = self
            .pending
            .iter()
            .map(|p| Statement {
                line: p.line,
                source: p.source.clone(),
                address: word_address(p.address),
                words: self.encode(p, &mut errors, &mut imports),
            })
            .collect();

        if !errors.is_empty() {
            // Line-specific errors first, in line order.
            errors.sort_by_key(|e| (e.line.is_none(), e.line));
            return Err(ProgramErrors(errors));
        }
        let length = u16::try_from(last - u32::from(self.origin)).unwrap_or(u16::MAX);
        event!(
            Level::INFO,
            "assembled segment {} ({} words, {})",
            self.segment_name.trim_end(),
            length,
            if self.relocatable {
                "relocatable"
            } else {
                "absolute"
            }
        );
        Ok(Program {
            segment_name: self.segment_name,
            origin: self.origin,
            relocatable: self.relocatable,
            start_address,
            length,
            symbols: self.symbols,
            literals: self.literals,
            statements,
            imports,
        })
    }
}

/// Assemble `source`.  `segment_hint` (usually the name of the source
/// file without its extension) names the segment unless the `.ORIG`
/// statement has a label.
///
/// # Errors
///
/// Every problem found in the program is reported.  No program is
/// returned if there are any.
pub fn assemble(segment_hint: &str, source: &str) -> Result<Program, ProgramErrors> {
    let span = span!(Level::ERROR, "assemble", segment = segment_hint);
    let _enter = span.enter();

    let mut assembly = Assembly::new(segment_hint);
    for (line_number, line) in source.lines().enumerate().map(|(n, l)| (n + 1, l)) {
        if is_comment_or_blank(line) {
            continue;
        }
        match scan_line(line_number, line, &mut assembly.errors) {
            Ok(scanned) => assembly.statement(line_number, line, scanned),
            Err(e) => assembly.errors.push(e),
        }
    }
    assembly.finish()
}
