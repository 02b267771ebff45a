//! Binary representation of machine instructions.
//!
//! An instruction occupies one 16-bit word.  The opcode is always in
//! the top four bits; the meaning of the other twelve depends on the
//! opcode:
//!
//! | Opcode | Bits 11-9 | Bits 8-6 | Bits 5-0 |
//! |--------|-----------|----------|----------|
//! | ADD, AND | dst | src1 | `0 00 src2` or `1 imm5` |
//! | BR     | condition mask (N Z P) | page offset (8-0) | |
//! | JSR, JMP | link bit (11) | page offset (8-0) | |
//! | JSRR, JMPR | link bit (11) | base | index6 |
//! | LD, LDI, LEA, ST, STI | register | page offset (8-0) | |
//! | LDR, STR | register | base | index6 |
//! | NOT    | dst | src | |
//! | TRAP   | | | vector (7-0) |
//! | DBUG, RET | | | |
//!
//! Since all sixteen values of the opcode field are in use, every
//! fetched word decodes to some opcode.

use std::fmt::{self, Debug, Display, Formatter};

use super::bitfield::{sign_extend, BitRange};

const OPCODE: BitRange = BitRange::new(15, 12);
const DST: BitRange = BitRange::new(11, 9);
const SRC1: BitRange = BitRange::new(8, 6);
const SRC2: BitRange = BitRange::new(2, 0);
const IMM5: BitRange = BitRange::new(4, 0);
const INDEX6: BitRange = BitRange::new(5, 0);
const TRAP_VECTOR: BitRange = BitRange::new(7, 0);

const IMMEDIATE_FLAG: u16 = 1 << 5;
const LINK_FLAG: u16 = 1 << 11;

/// `Opcode` enumerates the sixteen opcodes, indexed by the value of
/// bits 15-12 of the instruction word.
#[repr(u8)]
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum Opcode {
    Br = 0x0,
    Add = 0x1,
    Ld = 0x2,
    St = 0x3,
    Jsr = 0x4,
    And = 0x5,
    Ldr = 0x6,
    Str = 0x7,
    Dbug = 0x8,
    Not = 0x9,
    Ldi = 0xA,
    Sti = 0xB,
    Jsrr = 0xC,
    Ret = 0xD,
    Lea = 0xE,
    Trap = 0xF,
}

impl Opcode {
    /// The descriptive name shown when tracing execution.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Opcode::Br => "Branch",
            Opcode::Add => "Add",
            Opcode::Ld => "Load",
            Opcode::St => "Store",
            Opcode::Jsr => "Jump Subroutine Immediate",
            Opcode::And => "And",
            Opcode::Ldr => "Load Register",
            Opcode::Str => "Store Register",
            Opcode::Dbug => "Debug",
            Opcode::Not => "Not",
            Opcode::Ldi => "Load Immediate",
            Opcode::Sti => "Store Immediate",
            Opcode::Jsrr => "Jump Subroutine Register",
            Opcode::Ret => "Return",
            Opcode::Lea => "Load Effective Address",
            Opcode::Trap => "Trap",
        }
    }
}

impl Display for Opcode {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        f.write_str(match self {
            Opcode::Br => "BR",
            Opcode::Add => "ADD",
            Opcode::Ld => "LD",
            Opcode::St => "ST",
            Opcode::Jsr => "JSR",
            Opcode::And => "AND",
            Opcode::Ldr => "LDR",
            Opcode::Str => "STR",
            Opcode::Dbug => "DBUG",
            Opcode::Not => "NOT",
            Opcode::Ldi => "LDI",
            Opcode::Sti => "STI",
            Opcode::Jsrr => "JSRR",
            Opcode::Ret => "RET",
            Opcode::Lea => "LEA",
            Opcode::Trap => "TRAP",
        })
    }
}

/// Signals that a number is not a valid opcode.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct InvalidOpcode(pub u8);

impl Display for InvalidOpcode {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        write!(f, "invalid op code 0x{:X}", self.0)
    }
}

impl std::error::Error for InvalidOpcode {}

impl TryFrom<u8> for Opcode {
    type Error = InvalidOpcode;
    fn try_from(n: u8) -> Result<Opcode, InvalidOpcode> {
        use Opcode::*;
        Ok(match n {
            0x0 => Br,
            0x1 => Add,
            0x2 => Ld,
            0x3 => St,
            0x4 => Jsr,
            0x5 => And,
            0x6 => Ldr,
            0x7 => Str,
            0x8 => Dbug,
            0x9 => Not,
            0xA => Ldi,
            0xB => Sti,
            0xC => Jsrr,
            0xD => Ret,
            0xE => Lea,
            0xF => Trap,
            _ => {
                return Err(InvalidOpcode(n));
            }
        })
    }
}

/// A single instruction word.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Instruction(u16);

impl Instruction {
    /// The value of bits 15-12.
    #[must_use]
    pub fn opcode_number(&self) -> u8 {
        // A 4-bit field always fits.
        #[allow(clippy::cast_possible_truncation)]
        let n = OPCODE.extract(self.0) as u8;
        n
    }

    /// Decode the opcode.
    ///
    /// # Errors
    ///
    /// Cannot fail for a genuine 16-bit word, but the opcode field is
    /// decoded through the same checked conversion used for any
    /// number.
    pub fn opcode(&self) -> Result<Opcode, InvalidOpcode> {
        Opcode::try_from(self.opcode_number())
    }

    /// Destination (or, for stores, source) register, bits 11-9.
    #[must_use]
    pub fn dst(&self) -> usize {
        usize::from(DST.extract(self.0))
    }

    /// First source register, bits 8-6.
    #[must_use]
    pub fn src1(&self) -> usize {
        usize::from(SRC1.extract(self.0))
    }

    /// Base register of LDR, STR and JSRR.  This is the same field as
    /// `src1`.
    #[must_use]
    pub fn base(&self) -> usize {
        self.src1()
    }

    /// Second source register of the register forms of ADD and AND.
    #[must_use]
    pub fn src2(&self) -> usize {
        usize::from(SRC2.extract(self.0))
    }

    /// True when bit 5 selects the immediate form of ADD and AND.
    #[must_use]
    pub fn immediate_mode(&self) -> bool {
        self.0 & IMMEDIATE_FLAG != 0
    }

    /// The sign-extended 5-bit immediate of ADD and AND.
    #[must_use]
    pub fn imm5(&self) -> i16 {
        sign_extend(IMM5.extract(self.0), IMM5.width())
    }

    /// The N/Z/P condition mask of a branch, bits 11-9.
    #[must_use]
    pub fn condition(&self) -> u16 {
        DST.extract(self.0)
    }

    /// The link bit (bit 11) of JSR/JMP/JSRR/JMPR.
    #[must_use]
    pub fn link(&self) -> bool {
        self.0 & LINK_FLAG != 0
    }

    /// The 9-bit page offset, bits 8-0.
    #[must_use]
    pub fn page_offset(&self) -> u16 {
        BitRange::PAGE_OFFSET.extract(self.0)
    }

    /// The zero-extended 6-bit index of LDR, STR, JSRR and JMPR.
    #[must_use]
    pub fn index6(&self) -> u16 {
        INDEX6.extract(self.0)
    }

    #[must_use]
    pub fn trap_vector(&self) -> u8 {
        #[allow(clippy::cast_possible_truncation)]
        let v = TRAP_VECTOR.extract(self.0) as u8;
        v
    }
}

impl From<u16> for Instruction {
    fn from(w: u16) -> Instruction {
        Instruction(w)
    }
}

impl From<Instruction> for u16 {
    fn from(inst: Instruction) -> u16 {
        inst.0
    }
}

impl Debug for Instruction {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        write!(f, "Instruction({:#06X})", self.0)
    }
}
