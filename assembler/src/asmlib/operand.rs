//! Operand values.
//!
//! An operand goes through two phases.  While the source is read it
//! is a [`RawOperand`]: its text has been classified but not valued,
//! since it may name a label which is defined later.  The encoder
//! turns it into a [`ResolvedOperand`] against the finished symbol
//! and literal tables.  Only then is the value range-checked and,
//! for immediate values in page-relative fields, adjusted by the page
//! offset of the program origin.
use base::bitfield::{page_of, BitRange, PAGE_OFFSET_MASK};
use base::isa::{OperandDefinition, OperandType};
use base::symbol::SymbolTable;

use super::literal::LiteralTable;

/// One operand as written in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RawOperand {
    pub(crate) text: String,
    pub(crate) kind: OperandType,
}

impl RawOperand {
    pub(crate) fn new(text: &str) -> RawOperand {
        RawOperand {
            text: text.to_string(),
            kind: OperandType::classify(text),
        }
    }

    /// Find the value this operand puts into `slot`.
    pub(crate) fn resolve(
        &self,
        slot: &OperandDefinition,
        env: &Environment<'_>,
    ) -> Result<ResolvedOperand, String> {
        match self.kind {
            OperandType::Immediate => {
                let raw = parse_constant(&self.text)?;
                check_range(slot, raw, &self.text)?;
                let value = if slot.relocatable {
                    raw - i32::from(env.origin & PAGE_OFFSET_MASK)
                } else {
                    raw
                };
                Ok(ResolvedOperand::absolute(value))
            }
            OperandType::Register => {
                let n = parse_register(&self.text)?;
                check_range(slot, n, &self.text)?;
                Ok(ResolvedOperand::absolute(n))
            }
            OperandType::Literal => {
                let value = parse_literal(&self.text)?;
                match env.literals.address_of(value) {
                    Some(address) => {
                        self.resolve_reference(slot, i32::from(address), env.relocatable, env)
                    }
                    None => Err(format!("Literal \"{}\" is not in the literal pool.", self.text)),
                }
            }
            OperandType::Symbol => match env.symbols.get(&self.text) {
                None => Err(format!("Undefined symbol \"{}\".", self.text)),
                Some(sym) if sym.is_import => Ok(ResolvedOperand {
                    value: 0,
                    relocatable: false,
                    import: Some(sym.name.clone()),
                }),
                Some(sym) => self.resolve_reference(slot, sym.value, sym.relocatable, env),
            },
            OperandType::String => Err(format!(
                "String \"{}\" cannot be used in this operand.",
                self.text
            )),
        }
    }

    /// The value of a symbol or literal, that is an address or a
    /// named constant.
    fn resolve_reference(
        &self,
        slot: &OperandDefinition,
        value: i32,
        relocatable: bool,
        env: &Environment<'_>,
    ) -> Result<ResolvedOperand, String> {
        let what = if self.kind == OperandType::Literal {
            "Literal"
        } else {
            "Symbol"
        };
        if slot.relocatable {
            // Page-relative fields hold the low bits of an address on
            // the page the program counter will be on when the
            // instruction runs.  A relocatable program fits in one page
            // wherever it is put.
            if !env.relocatable {
                let pc = env.address.wrapping_add(1);
                let same_page =
                    u16::try_from(value).is_ok_and(|address| page_of(address) == page_of(pc));
                if !same_page {
                    return Err(format!("{what} \"{}\" is not on the current page.", self.text));
                }
            }
            return Ok(ResolvedOperand {
                value,
                relocatable,
                import: None,
            });
        }
        if relocatable {
            if slot.range == BitRange::FULL_WORD {
                return Ok(ResolvedOperand {
                    value,
                    relocatable: true,
                    import: None,
                });
            }
            return Err(format!(
                "Relocatable {} \"{}\" cannot be used in this operand.",
                what.to_lowercase(),
                self.text
            ));
        }
        check_range(slot, value, &self.text)?;
        Ok(ResolvedOperand::absolute(value))
    }
}

/// Parse `#decimal` or `xHEX`.
pub(crate) fn parse_constant(text: &str) -> Result<i32, String> {
    if let Some(digits) = text.strip_prefix('#') {
        digits
            .parse::<i32>()
            .map_err(|_| format!("Cannot parse \"{text}\" as a decimal value."))
    } else if let Some(digits) = text.strip_prefix('x') {
        let (negative, digits) = match digits.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, digits),
        };
        if digits.is_empty() || !digits.chars().all(|ch| ch.is_ascii_hexdigit()) {
            return Err(format!("Cannot parse \"{text}\" as a hex value."));
        }
        let value = i32::from_str_radix(digits, 16)
            .map_err(|_| format!("Cannot parse \"{text}\" as a hex value."))?;
        Ok(if negative { -value } else { value })
    } else {
        Err(format!("\"{text}\" is not a constant."))
    }
}

/// Parse `Rn`.
pub(crate) fn parse_register(text: &str) -> Result<i32, String> {
    match text.strip_prefix('R').map(str::parse::<i32>) {
        Some(Ok(n)) => Ok(n),
        _ => Err(format!("Invalid register \"{text}\".")),
    }
}

/// Parse `=#decimal` or `=xHEX`, giving the 16-bit word stored in
/// the literal pool.
pub(crate) fn parse_literal(text: &str) -> Result<u16, String> {
    let value = match text.strip_prefix('=') {
        Some(constant) => parse_constant(constant)?,
        None => return Err(format!("\"{text}\" is not a literal.")),
    };
    if (i32::from(i16::MIN)..=i32::from(u16::MAX)).contains(&value) {
        // Negative values are stored as their two's complement.
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let word = value as u16;
        Ok(word)
    } else {
        Err(format!("Literal \"{text}\" does not fit in a word."))
    }
}

/// What the encoder needs to know about the program in order to
/// resolve an operand.
pub(crate) struct Environment<'a> {
    pub(crate) symbols: &'a SymbolTable,
    pub(crate) literals: &'a LiteralTable,
    pub(crate) origin: u16,
    pub(crate) relocatable: bool,
    /// Address of the word being encoded.
    pub(crate) address: u16,
}

/// An operand whose value is known and fits its field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ResolvedOperand {
    pub(crate) value: i32,
    /// The value depends on where the program is loaded.
    pub(crate) relocatable: bool,
    /// The field must be filled in by the linker with the value of
    /// this imported symbol.  The value is then zero.
    pub(crate) import: Option<String>,
}

impl ResolvedOperand {
    fn absolute(value: i32) -> ResolvedOperand {
        ResolvedOperand {
            value,
            relocatable: false,
            import: None,
        }
    }

    /// `word` with this operand inserted into `slot`.
    pub(crate) fn insert(&self, word: u16, slot: &OperandDefinition) -> u16 {
        slot.range.or_into(word, self.value)
    }
}

fn check_range(slot: &OperandDefinition, value: i32, text: &str) -> Result<(), String> {
    if slot.in_range(value) {
        Ok(())
    } else {
        Err(format!(
            "Operand \"{text}\" is out of range; it must be between {} and {}.",
            slot.min_value(),
            slot.max_value()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base::isa::{find_definition, ValueRange};
    use base::symbol::Symbol;

    fn env<'a>(
        symbols: &'a SymbolTable,
        literals: &'a LiteralTable,
        origin: u16,
        relocatable: bool,
    ) -> Environment<'a> {
        Environment {
            symbols,
            literals,
            origin,
            relocatable,
            address: origin,
        }
    }

    fn slot_of(mnemonic: &str, types: &[OperandType], n: usize) -> OperandDefinition {
        find_definition(mnemonic, types)
            .unwrap_or_else(|| panic!("{mnemonic} {types:?} should exist"))
            .operands[n]
    }

    fn page_slot() -> OperandDefinition {
        slot_of("BRNZP", &[OperandType::Symbol], 0)
    }

    fn imm5_slot() -> OperandDefinition {
        use OperandType::{Immediate, Register};
        slot_of("ADD", &[Register, Register, Immediate], 2)
    }

    /// Resolve `text` for `slot` and insert it into `word`.
    fn encode(
        word: u16,
        slot: &OperandDefinition,
        text: &str,
        e: &Environment<'_>,
    ) -> Result<u16, String> {
        RawOperand::new(text)
            .resolve(slot, e)
            .map(|resolved| resolved.insert(word, slot))
    }

    #[test]
    fn test_parse_constant() {
        assert_eq!(parse_constant("#12"), Ok(12));
        assert_eq!(parse_constant("#-16"), Ok(-16));
        assert_eq!(parse_constant("x1F"), Ok(31));
        assert_eq!(parse_constant("xffff"), Ok(0xFFFF));
        assert_eq!(parse_constant("x-1"), Ok(-1));
        assert!(parse_constant("x").is_err());
        assert!(parse_constant("x1G").is_err());
        assert!(parse_constant("#abc").is_err());
        assert!(parse_constant("12").is_err());
    }

    #[test]
    fn test_parse_literal() {
        assert_eq!(parse_literal("=#5"), Ok(5));
        assert_eq!(parse_literal("=x0005"), Ok(5));
        assert_eq!(parse_literal("=#-1"), Ok(0xFFFF));
        assert!(parse_literal("=x10000").is_err());
        assert!(parse_literal("=#-32769").is_err());
    }

    #[test]
    fn test_parse_register() {
        assert_eq!(parse_register("R0"), Ok(0));
        assert_eq!(parse_register("R7"), Ok(7));
        assert!(parse_register("RX").is_err());
    }

    #[test]
    fn test_immediate_range() {
        let symbols = SymbolTable::new();
        let literals = LiteralTable::new();
        let e = env(&symbols, &literals, 0x3000, false);
        let slot = imm5_slot();
        assert_eq!(encode(0x1020, &slot, "#-16", &e), Ok(0x1030));
        assert_eq!(encode(0x1020, &slot, "#15", &e), Ok(0x102F));
        assert_eq!(
            encode(0x1020, &slot, "#16", &e),
            Err("Operand \"#16\" is out of range; it must be between -16 and 15.".to_string())
        );
        assert!(encode(0x1020, &slot, "#-17", &e).is_err());
    }

    #[test]
    fn test_index_range() {
        use OperandType::{Immediate, Register};
        let symbols = SymbolTable::new();
        let literals = LiteralTable::new();
        let e = env(&symbols, &literals, 0x3000, false);
        let str_index = slot_of("STR", &[Register, Register, Immediate], 2);
        assert_eq!(encode(0x7080, &str_index, "#63", &e), Ok(0x70BF));
        assert_eq!(
            encode(0x7080, &str_index, "#64", &e),
            Err("Operand \"#64\" is out of range; it must be between 0 and 63.".to_string())
        );
        assert!(encode(0x7080, &str_index, "#-1", &e).is_err());
        let jsrr_index = slot_of("JSRR", &[Register, Immediate], 1);
        assert_eq!(encode(0xC840, &jsrr_index, "#0", &e), Ok(0xC840));
        assert!(encode(0xC840, &jsrr_index, "#-1", &e).is_err());
    }

    #[test]
    fn test_trap_vector_is_unsigned() {
        let symbols = SymbolTable::new();
        let literals = LiteralTable::new();
        let e = env(&symbols, &literals, 0x3000, false);
        let vector = slot_of("TRAP", &[OperandType::Immediate], 0);
        assert_eq!(encode(0xF000, &vector, "xFF", &e), Ok(0xF0FF));
        assert!(encode(0xF000, &vector, "#-1", &e).is_err());
    }

    #[test]
    fn test_page_immediate_is_adjusted_by_origin() {
        let symbols = SymbolTable::new();
        let literals = LiteralTable::new();
        let e = env(&symbols, &literals, 0x3010, false);
        // 0x15 - 0x10 = 5.
        assert_eq!(encode(0x0E00, &page_slot(), "x15", &e), Ok(0x0E05));
        assert!(encode(0x0E00, &page_slot(), "x200", &e).is_err());
    }

    #[test]
    fn test_symbol_in_page_field() {
        let mut symbols = SymbolTable::new();
        symbols
            .define(Symbol::new("NEAR", 0x3005, false))
            .expect("define NEAR");
        symbols
            .define(Symbol::new("FAR", 0x3205, false))
            .expect("define FAR");
        let literals = LiteralTable::new();
        let e = env(&symbols, &literals, 0x3000, false);
        assert_eq!(encode(0x0E00, &page_slot(), "NEAR", &e), Ok(0x0E05));
        assert_eq!(
            encode(0x0E00, &page_slot(), "FAR", &e),
            Err("Symbol \"FAR\" is not on the current page.".to_string())
        );
        assert_eq!(
            encode(0x0E00, &page_slot(), "NOWHERE", &e),
            Err("Undefined symbol \"NOWHERE\".".to_string())
        );
    }

    #[test]
    fn test_relocatable_symbols() {
        let mut symbols = SymbolTable::new();
        symbols
            .define(Symbol::new("LOOP", 4, true))
            .expect("define LOOP");
        let literals = LiteralTable::new();
        let e = env(&symbols, &literals, 0, true);
        let loop_operand = RawOperand::new("LOOP");
        let relocatable_four = ResolvedOperand {
            value: 4,
            relocatable: true,
            import: None,
        };
        assert_eq!(loop_operand.resolve(&page_slot(), &e), Ok(relocatable_four.clone()));
        assert_eq!(relocatable_four.insert(0x0E00, &page_slot()), 0x0E04);
        let fill = OperandDefinition::new(
            false,
            &[OperandType::Immediate, OperandType::Symbol],
            ValueRange::Word,
            15,
            0,
        );
        assert_eq!(loop_operand.resolve(&fill, &e), Ok(relocatable_four));
        assert_eq!(
            loop_operand.resolve(&imm5_slot(), &e),
            Err("Relocatable symbol \"LOOP\" cannot be used in this operand.".to_string())
        );
    }

    #[test]
    fn test_imported_symbol() {
        let mut symbols = SymbolTable::new();
        symbols.define_import("FOO").expect("import FOO");
        let literals = LiteralTable::new();
        let e = env(&symbols, &literals, 0, true);
        let resolved = RawOperand::new("FOO")
            .resolve(&page_slot(), &e)
            .expect("imports resolve");
        assert_eq!(resolved.import.as_deref(), Some("FOO"));
        assert!(!resolved.relocatable);
        assert_eq!(resolved.insert(0x2000, &page_slot()), 0x2000);
    }

    #[test]
    fn test_literal_address() {
        let symbols = SymbolTable::new();
        let mut literals = LiteralTable::new();
        literals.define(5);
        literals.set_offset(0x3004);
        let e = env(&symbols, &literals, 0x3000, false);
        assert_eq!(encode(0x2000, &page_slot(), "=#5", &e), Ok(0x2004));
        assert_eq!(encode(0x2000, &page_slot(), "=x0005", &e), Ok(0x2004));
    }
}
