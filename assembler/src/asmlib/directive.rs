//! Pseudo-operations: statements which direct the assembler rather
//! than (or as well as) emitting machine instructions.
use tracing::{event, Level};

use base::isa::OperandType;
use base::object::segment_name;
use base::symbol::Symbol;

use super::assembly::{Assembly, Body};
use super::operand::{parse_constant, RawOperand};
use super::types::LineNumber;

impl Assembly {
    /// `.ORIG [address]`
    pub(crate) fn orig(&mut self, line: LineNumber, label: &str, operands: &[RawOperand]) -> Body {
        if self.seen_orig {
            self.structural(
                line,
                "Multiple .ORIG instructions are not allowed.".to_string(),
            );
            return Body::Nothing;
        }
        if self.has_statements() {
            self.structural(
                line,
                ".ORIG instruction must be first non-comment line.".to_string(),
            );
        }
        self.seen_orig = true;
        match operands {
            [] => {
                self.relocatable = true;
                self.origin = 0;
                self.location = 0;
            }
            [operand] if operand.kind == OperandType::Immediate => {
                match parse_constant(&operand.text) {
                    Ok(value) => match u16::try_from(value) {
                        Ok(origin) => {
                            self.origin = origin;
                            self.location = u32::from(origin);
                        }
                        Err(_) => self.semantic(
                            line,
                            ".ORIG address must be between x0000 and xFFFF.".to_string(),
                        ),
                    },
                    Err(msg) => self.syntax(line, msg),
                }
            }
            [_] => self.semantic(
                line,
                "Operand of .ORIG must be an immediate value.".to_string(),
            ),
            _ => self.semantic(
                line,
                format!(
                    ".ORIG may have a maximum of one operand; {} operands were given.",
                    operands.len()
                ),
            ),
        }
        event!(
            Level::DEBUG,
            "origin {:04X}{}",
            self.origin,
            if self.relocatable {
                " (relocatable)"
            } else {
                ""
            }
        );
        if !label.is_empty() {
            self.segment_name = segment_name(label);
            self.define_label(line, label);
        }
        Body::Nothing
    }

    /// `LABEL .EQU value` or `LABEL .EQU symbol`
    pub(crate) fn equ(&mut self, line: LineNumber, label: &str, operands: &[RawOperand]) -> Body {
        let operand = match operands {
            [operand] if !label.is_empty() => operand,
            _ => {
                self.semantic(
                    line,
                    "Incorrect usage of .EQU. Requires a label and one operand.".to_string(),
                );
                return Body::Nothing;
            }
        };
        let result = match operand.kind {
            OperandType::Symbol => self
                .symbols
                .alias(label, &operand.text)
                .map_err(|e| e.to_string()),
            OperandType::Immediate => parse_constant(&operand.text).and_then(|value| {
                self.symbols
                    .define(Symbol::new(label, value, false))
                    .map_err(|e| e.to_string())
            }),
            _ => Err(".EQU operand must be a symbol or a constant value.".to_string()),
        };
        match result {
            Ok(()) => event!(Level::DEBUG, "line {line}: {label} .EQU {}", operand.text),
            Err(msg) => self.semantic(line, msg),
        }
        Body::Nothing
    }

    /// `.FILL value`
    pub(crate) fn fill(&mut self, line: LineNumber, mut operands: Vec<RawOperand>) -> Body {
        if operands.len() != 1 {
            self.semantic(
                line,
                format!(".FILL requires one operand. {} were given.", operands.len()),
            );
            return Body::Invalid;
        }
        let operand = operands.remove(0);
        match operand.kind {
            OperandType::Immediate | OperandType::Symbol => Body::Fill(operand),
            _ => {
                self.semantic(line, "Incorrect operands for .FILL operation.".to_string());
                Body::Invalid
            }
        }
    }

    /// `.STRZ "text"`: one word per character and a terminating zero.
    pub(crate) fn strz(&mut self, line: LineNumber, operands: &[RawOperand]) -> Body {
        let text = match operands {
            [operand] => operand.text.as_str(),
            _ => {
                self.semantic(
                    line,
                    format!(".STRZ requires one operand. {} were given.", operands.len()),
                );
                return Body::Nothing;
            }
        };
        let inner = match text.strip_prefix('"').and_then(|t| t.strip_suffix('"')) {
            Some(inner) => inner,
            None => {
                self.semantic(line, "Incorrect operand type for .STRZ operation.".to_string());
                return Body::Nothing;
            }
        };
        let mut words: Vec<u16> = Vec::with_capacity(inner.len() + 1);
        for ch in inner.chars() {
            match u16::try_from(u32::from(ch)) {
                Ok(w) => words.push(w),
                Err(_) => {
                    self.semantic(
                        line,
                        format!("Character '{ch}' in .STRZ operand does not fit in a word."),
                    );
                    return Body::Nothing;
                }
            }
        }
        words.push(0);
        Body::Data(words)
    }

    /// `.BLKW count`
    pub(crate) fn blkw(&mut self, line: LineNumber, operands: &[RawOperand]) -> Body {
        let operand = match operands {
            [operand] => operand,
            _ => {
                self.semantic(
                    line,
                    format!(".BLKW requires one operand. {} were given.", operands.len()),
                );
                return Body::Nothing;
            }
        };
        let value: Result<i32, String> = match operand.kind {
            OperandType::Immediate => parse_constant(&operand.text),
            OperandType::Symbol => match self.symbols.get(&operand.text) {
                Some(sym) if !sym.is_import && !sym.relocatable => Ok(sym.value),
                _ => Err(
                    ".BLKW operand must be a constant or a previously defined absolute symbol."
                        .to_string(),
                ),
            },
            _ => Err(
                ".BLKW operand must be a constant or a previously defined absolute symbol."
                    .to_string(),
            ),
        };
        match value.map(u32::try_from) {
            Ok(Ok(count)) => Body::Reserve(count),
            Ok(Err(_)) => {
                self.semantic(line, ".BLKW requires a non-negative operand.".to_string());
                Body::Nothing
            }
            Err(msg) => {
                self.semantic(line, msg);
                Body::Nothing
            }
        }
    }

    /// `.END [start]`
    pub(crate) fn end(&mut self, line: LineNumber, operands: Vec<RawOperand>) -> Body {
        if self.seen_end {
            self.structural(line, "Multiple .END instructions are not allowed.".to_string());
            return Body::Nothing;
        }
        self.seen_end = true;
        match operands.len() {
            0 => (),
            1 => {
                let operand = operands.into_iter().next();
                match operand {
                    Some(op) if matches!(op.kind, OperandType::Immediate | OperandType::Symbol) => {
                        self.end_operand = Some((line, op));
                    }
                    _ => self.semantic(
                        line,
                        ".END operand must be an immediate value or a symbol.".to_string(),
                    ),
                }
            }
            n => self.semantic(
                line,
                format!(".END may have a maximum of one operand; {n} operands were given."),
            ),
        }
        Body::Nothing
    }

    /// `.ENT name, ...`: export symbols defined in this program.
    pub(crate) fn ent(&mut self, line: LineNumber, operands: &[RawOperand]) -> Body {
        if operands.is_empty() {
            self.semantic(line, ".ENT requires at least one operand.".to_string());
        }
        for operand in operands {
            if operand.kind == OperandType::Symbol {
                self.exports.push((line, operand.text.clone()));
            } else {
                self.semantic(
                    line,
                    format!(".ENT operand \"{}\" must be a valid symbol name.", operand.text),
                );
            }
        }
        Body::Nothing
    }

    /// `.EXT name, ...`: import symbols defined by other programs.
    pub(crate) fn ext(&mut self, line: LineNumber, operands: &[RawOperand]) -> Body {
        if operands.is_empty() {
            self.semantic(line, ".EXT requires at least one operand.".to_string());
        }
        for operand in operands {
            if operand.kind != OperandType::Symbol {
                self.semantic(
                    line,
                    format!(".EXT operand \"{}\" must be a valid symbol name.", operand.text),
                );
            } else if let Err(e) = self.symbols.define_import(&operand.text) {
                self.semantic(line, e.to_string());
            }
        }
        Body::Nothing
    }
}
