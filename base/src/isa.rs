//! The instruction set table used by the assembler.
//!
//! Each entry maps a mnemonic to a base encoding (the instruction
//! word with every operand field zero) and describes where each
//! operand goes.  Some mnemonics appear more than once (for example
//! the register and immediate forms of `ADD`); the assembler picks the
//! first entry whose operand types match the operands actually
//! written, so the order of [`INSTRUCTION_SET`] matters.

use std::fmt::{self, Display, Formatter};

use super::bitfield::BitRange;

/// The kind of an operand, determined by the first character of its
/// source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperandType {
    /// `#123` (decimal) or `x1F` (hexadecimal).
    Immediate,
    /// `R0` to `R7`.
    Register,
    /// `=#5` or `=x0005`; a value placed in the literal pool.
    Literal,
    /// Anything else: a reference to a label or `.EQU` name.
    Symbol,
    /// `"text"`, used only by `.STRZ`.
    String,
}

impl OperandType {
    /// Classify an operand from its source text.  `token` is expected
    /// to be trimmed and non-empty; an empty token classifies as a
    /// symbol (and will then fail symbol lookup).
    #[must_use]
    pub fn classify(token: &str) -> OperandType {
        match token.chars().next() {
            Some('=') => OperandType::Literal,
            Some('#' | 'x') => OperandType::Immediate,
            Some('R') => OperandType::Register,
            Some('"') => OperandType::String,
            _ => OperandType::Symbol,
        }
    }
}

impl Display for OperandType {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        f.write_str(match self {
            OperandType::Immediate => "immediate",
            OperandType::Register => "register",
            OperandType::Literal => "literal",
            OperandType::Symbol => "symbol",
            OperandType::String => "string",
        })
    }
}

/// The values an operand field accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueRange {
    /// Two's complement values which fit the field.
    Signed,
    /// Zero up to the largest value the field holds.
    Unsigned,
    /// Either reading of the field's bit pattern, so that
    /// `.FILL xFFFF` and `.FILL #-1` mean the same thing.
    Word,
    /// An unsigned value of this many bits, which may be fewer than
    /// the field has.
    Narrow(u32),
}

/// Where an operand lives in the encoded instruction and what is
/// allowed to go there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperandDefinition {
    /// The bits occupied by the operand.
    pub range: BitRange,
    /// Which word of a multi-word instruction the operand is
    /// inserted into.  All machine instructions are a single word.
    pub word_index: usize,
    /// Page-relative address fields are relocatable: their value
    /// depends on where the program is loaded.
    pub relocatable: bool,
    pub acceptable: &'static [OperandType],
    pub values: ValueRange,
}

impl OperandDefinition {
    /// A single-word operand occupying `[msb, lsb]`.
    #[must_use]
    pub const fn new(
        relocatable: bool,
        acceptable: &'static [OperandType],
        values: ValueRange,
        msb: u8,
        lsb: u8,
    ) -> OperandDefinition {
        OperandDefinition {
            range: BitRange::new(msb, lsb),
            word_index: 0,
            relocatable,
            acceptable,
            values,
        }
    }

    #[must_use]
    pub fn accepts(&self, t: OperandType) -> bool {
        self.acceptable.contains(&t)
    }

    #[must_use]
    pub fn is_signed(&self) -> bool {
        matches!(self.values, ValueRange::Signed | ValueRange::Word)
    }

    /// The smallest value which fits in the field.
    #[must_use]
    pub fn min_value(&self) -> i32 {
        if self.is_signed() {
            -(1_i32 << (self.range.width() - 1))
        } else {
            0
        }
    }

    /// The largest value which fits in the field.
    #[must_use]
    pub fn max_value(&self) -> i32 {
        let width = self.range.width();
        match self.values {
            ValueRange::Signed => (1_i32 << (width - 1)) - 1,
            ValueRange::Unsigned | ValueRange::Word => (1_i32 << width) - 1,
            ValueRange::Narrow(bits) => (1_i32 << bits.min(width)) - 1,
        }
    }

    #[must_use]
    pub fn in_range(&self, value: i32) -> bool {
        (self.min_value()..=self.max_value()).contains(&value)
    }
}

/// One form of one machine instruction.
#[derive(Debug, PartialEq, Eq)]
pub struct InstructionDefinition {
    pub mnemonic: &'static str,
    /// The base encoding of each word, with all operand fields zero.
    pub operations: &'static [u16],
    pub operands: &'static [OperandDefinition],
}

impl InstructionDefinition {
    /// Number of words the instruction occupies.
    #[must_use]
    pub fn size(&self) -> usize {
        self.operations.len()
    }

    /// Determine whether operands of the given types fit this
    /// definition.
    #[must_use]
    pub fn is_acceptable(&self, mnemonic: &str, types: &[OperandType]) -> bool {
        self.mnemonic == mnemonic
            && self.operands.len() == types.len()
            && self
                .operands
                .iter()
                .zip(types.iter())
                .all(|(def, t)| def.accepts(*t))
    }
}

use OperandType::{Immediate, Literal, Register, Symbol};

const REG: &[OperandType] = &[Register];
const VALUE: &[OperandType] = &[Immediate, Symbol];
const ADDRESS: &[OperandType] = &[Immediate, Symbol];
const LITERAL_ADDRESS: &[OperandType] = &[Immediate, Symbol, Literal];

/// Width of the base-relative index of LDR, STR, JSRR and JMPR.
pub const INDEX_BITS: u32 = 6;

const fn reg(msb: u8, lsb: u8) -> OperandDefinition {
    OperandDefinition::new(false, REG, ValueRange::Unsigned, msb, lsb)
}

const fn imm(msb: u8, lsb: u8) -> OperandDefinition {
    OperandDefinition::new(false, VALUE, ValueRange::Signed, msb, lsb)
}

/// STR's field is seven bits wide but, as for the other indexed
/// instructions, only six are read.
const fn index(msb: u8, lsb: u8) -> OperandDefinition {
    OperandDefinition::new(false, VALUE, ValueRange::Narrow(INDEX_BITS), msb, lsb)
}

const VECTOR: OperandDefinition = OperandDefinition::new(false, VALUE, ValueRange::Unsigned, 7, 0);
const PAGE: OperandDefinition = OperandDefinition::new(true, ADDRESS, ValueRange::Unsigned, 8, 0);
const LITERAL_PAGE: OperandDefinition =
    OperandDefinition::new(true, LITERAL_ADDRESS, ValueRange::Unsigned, 8, 0);

macro_rules! def {
    ($mnemonic:expr, $op:expr, [$($operand:expr),* $(,)?]) => {
        InstructionDefinition {
            mnemonic: $mnemonic,
            operations: &[$op],
            operands: &[$($operand),*],
        }
    };
}

/// The instruction set, in matching order.
pub static INSTRUCTION_SET: &[InstructionDefinition] = &[
    def!("ADD", 0x1000, [reg(11, 9), reg(8, 6), reg(2, 0)]),
    def!("ADD", 0x1020, [reg(11, 9), reg(8, 6), imm(4, 0)]),
    def!("AND", 0x5000, [reg(11, 9), reg(8, 6), reg(2, 0)]),
    def!("AND", 0x5020, [reg(11, 9), reg(8, 6), imm(4, 0)]),
    def!("BRN", 0x0800, [PAGE]),
    def!("BRZ", 0x0400, [PAGE]),
    def!("BRP", 0x0200, [PAGE]),
    def!("BRNZ", 0x0C00, [PAGE]),
    def!("BRNP", 0x0A00, [PAGE]),
    def!("BRZP", 0x0600, [PAGE]),
    def!("BRNZP", 0x0E00, [PAGE]),
    def!("DBUG", 0x8000, []),
    def!("JSR", 0x4800, [PAGE]),
    def!("JMP", 0x4000, [PAGE]),
    def!("JSRR", 0xC800, [reg(8, 6), index(5, 0)]),
    def!("JMPR", 0xC000, [reg(8, 6), index(5, 0)]),
    def!("LD", 0x2000, [reg(11, 9), LITERAL_PAGE]),
    def!("LDI", 0xA000, [reg(11, 9), LITERAL_PAGE]),
    def!("LDR", 0x6000, [reg(11, 9), reg(8, 6), index(5, 0)]),
    def!("LEA", 0xE000, [reg(11, 9), LITERAL_PAGE]),
    def!("NOT", 0x9000, [reg(11, 9), reg(8, 6)]),
    def!("RET", 0xD000, []),
    def!("ST", 0x3000, [reg(11, 9), PAGE]),
    def!("STI", 0xB000, [reg(11, 9), PAGE]),
    def!("STR", 0x7000, [reg(11, 9), reg(8, 6), index(6, 0)]),
    def!("TRAP", 0xF000, [VECTOR]),
];

/// Find the first definition accepting `mnemonic` with operands of
/// the given types.
#[must_use]
pub fn find_definition(
    mnemonic: &str,
    types: &[OperandType],
) -> Option<&'static InstructionDefinition> {
    INSTRUCTION_SET
        .iter()
        .find(|def| def.is_acceptable(mnemonic, types))
}

/// Returns true if `mnemonic` names a machine instruction (in any
/// form).
#[must_use]
pub fn is_mnemonic(mnemonic: &str) -> bool {
    INSTRUCTION_SET.iter().any(|def| def.mnemonic == mnemonic)
}

#[test]
fn test_classify() {
    assert_eq!(OperandType::classify("=#5"), OperandType::Literal);
    assert_eq!(OperandType::classify("#-5"), OperandType::Immediate);
    assert_eq!(OperandType::classify("x3000"), OperandType::Immediate);
    assert_eq!(OperandType::classify("R7"), OperandType::Register);
    assert_eq!(OperandType::classify("\"hi\""), OperandType::String);
    assert_eq!(OperandType::classify("LOOP"), OperandType::Symbol);
}

#[test]
fn test_register_form_of_add_matches_first() {
    use OperandType::*;
    let def = find_definition("ADD", &[Register, Register, Register]).expect("ADD exists");
    assert_eq!(def.operations, &[0x1000]);
    let def = find_definition("ADD", &[Register, Register, Immediate]).expect("ADD exists");
    assert_eq!(def.operations, &[0x1020]);
    assert!(find_definition("ADD", &[Register, Register]).is_none());
    assert!(find_definition("ADD", &[Register, Register, Literal]).is_none());
}

#[test]
fn test_operand_bounds() {
    let imm5 = imm(4, 0);
    assert!(imm5.is_signed());
    assert_eq!(imm5.min_value(), -16);
    assert_eq!(imm5.max_value(), 15);
    assert!(!imm5.in_range(16));
    assert!(!PAGE.is_signed());
    assert_eq!(PAGE.min_value(), 0);
    assert_eq!(PAGE.max_value(), 511);
    let r = reg(11, 9);
    assert!(!r.is_signed());
    assert!(r.in_range(7));
    assert!(!r.in_range(8));
    assert_eq!(VECTOR.min_value(), 0);
    assert_eq!(VECTOR.max_value(), 255);
}

#[test]
fn test_index_fields_hold_six_bits() {
    let str_index = index(6, 0);
    assert_eq!(str_index.min_value(), 0);
    assert_eq!(str_index.max_value(), 63);
    assert!(!str_index.in_range(64));
    assert!(!str_index.in_range(-1));
    let jsrr_index = index(5, 0);
    assert_eq!(jsrr_index.max_value(), 63);
}

#[test]
fn test_full_word_takes_either_reading() {
    let word = OperandDefinition::new(false, VALUE, ValueRange::Word, 15, 0);
    assert!(word.in_range(0xFFFF));
    assert!(word.in_range(-0x8000));
    assert!(!word.in_range(0x1_0000));
    assert!(!word.in_range(-0x8001));
}

#[test]
fn test_is_mnemonic() {
    assert!(is_mnemonic("BRNZP"));
    assert!(is_mnemonic("TRAP"));
    assert!(!is_mnemonic("BR"));
    assert!(!is_mnemonic(".FILL"));
}
