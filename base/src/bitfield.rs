//! Convenience utilities for pulling bit-fields out of 16-bit machine
//! words and for putting them back in again.
//!
//! Bit positions are numbered from 0 (least significant) to 15 (most
//! significant) and ranges are inclusive at both ends, so the opcode
//! of an instruction occupies `BitRange::new(15, 12)`.

use std::fmt::{self, Display, Formatter};

/// Memory is divided into pages of 512 words.  Page-relative
/// addresses replace the low [`PAGE_SHIFT`] bits of the program
/// counter.
pub const PAGE_SHIFT: u32 = 9;

/// The number of words in one page.
pub const PAGE_SIZE: u32 = 1 << PAGE_SHIFT;

/// Mask selecting the page-offset part of an address.
pub const PAGE_OFFSET_MASK: u16 = 0x01FF;

/// An inclusive range of bits `[msb, lsb]` within a 16-bit word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BitRange {
    msb: u8,
    lsb: u8,
}

impl BitRange {
    /// The 9-bit page offset field `[8, 0]`.
    pub const PAGE_OFFSET: BitRange = BitRange::new(8, 0);

    /// The whole word, `[15, 0]`.
    pub const FULL_WORD: BitRange = BitRange::new(15, 0);

    /// Create a bit range.  `msb` must be at least `lsb` and both must
    /// lie within a 16-bit word; the table-driven callers only ever
    /// pass constants, so this is checked at compile time when used
    /// in a `const`.
    #[must_use]
    pub const fn new(msb: u8, lsb: u8) -> BitRange {
        assert!(msb < 16 && lsb <= msb);
        BitRange { msb, lsb }
    }

    #[must_use]
    pub const fn msb(&self) -> u8 {
        self.msb
    }

    #[must_use]
    pub const fn lsb(&self) -> u8 {
        self.lsb
    }

    /// Number of bits in the field.
    #[must_use]
    pub const fn width(&self) -> u32 {
        (self.msb - self.lsb + 1) as u32
    }

    /// A mask covering the bits of the field in their in-word
    /// position.
    #[must_use]
    pub const fn mask(&self) -> u16 {
        let unshifted: u32 = (1_u32 << self.width()) - 1;
        (unshifted << self.lsb) as u16
    }

    /// Extract the field from `word`, right-aligned.
    #[must_use]
    pub const fn extract(&self, word: u16) -> u16 {
        (word & self.mask()) >> self.lsb
    }

    /// Overwrite the field within `word` with (the low bits of)
    /// `value`, leaving the other bits of `word` untouched.
    #[must_use]
    pub fn insert(&self, word: u16, value: i32) -> u16 {
        (word & !self.mask()) | self.shifted(value)
    }

    /// OR (the low bits of) `value` into the field.  This is what the
    /// assembler does when it builds up an instruction from a base
    /// encoding whose operand fields are all zero.
    #[must_use]
    pub fn or_into(&self, word: u16, value: i32) -> u16 {
        word | self.shifted(value)
    }

    /// Add `delta` to the value held in the field, discarding any
    /// carry out of the field.  Bits outside the field are unchanged.
    #[must_use]
    pub fn add(&self, word: u16, delta: i32) -> u16 {
        let current = i32::from(self.extract(word));
        self.insert(word, current.wrapping_add(delta))
    }

    fn shifted(&self, value: i32) -> u16 {
        // Truncation to the field width is the point of the mask.
        #![allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        ((value as u32) << self.lsb) as u16 & self.mask()
    }
}

impl Display for BitRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        write!(f, "[{}:{}]", self.msb, self.lsb)
    }
}

/// Return the page number containing `address`.
#[must_use]
pub const fn page_of(address: u16) -> u16 {
    address >> PAGE_SHIFT
}

/// Form a page-relative address: the page of `pc` combined with the
/// 9-bit `offset`.  This replaces the low bits of `pc`, it does not
/// add a displacement.
#[must_use]
pub const fn page_replace(pc: u16, offset: u16) -> u16 {
    (pc & !PAGE_OFFSET_MASK) | (offset & PAGE_OFFSET_MASK)
}

/// Sign-extend the low `width` bits of `value`.
#[must_use]
pub const fn sign_extend(value: u16, width: u32) -> i16 {
    let shift = 16 - width;
    #[allow(clippy::cast_possible_wrap)]
    let signed = (value << shift) as i16;
    signed >> shift
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_strategy::proptest;

    macro_rules! assert_hex_eq {
        ($left:expr, $right:expr $(,)?) => {{
            match (&$left, &$right) {
                (left_val, right_val) => {
                    if !(*left_val == *right_val) {
                        panic!("Assertion failed: {:#06x} != {:#06x}", left_val, right_val);
                    }
                }
            }
        }};
    }

    #[test]
    fn test_mask() {
        assert_hex_eq!(BitRange::new(15, 12).mask(), 0xF000_u16);
        assert_hex_eq!(BitRange::new(8, 0).mask(), 0x01FF_u16);
        assert_hex_eq!(BitRange::new(15, 0).mask(), 0xFFFF_u16);
        assert_hex_eq!(BitRange::new(5, 5).mask(), 0x0020_u16);
    }

    #[test]
    fn test_extract() {
        let opcode = BitRange::new(15, 12);
        assert_hex_eq!(opcode.extract(0x1005), 0x1_u16);
        assert_hex_eq!(BitRange::new(11, 9).extract(0x1263), 0x1_u16);
        assert_hex_eq!(BitRange::new(4, 0).extract(0x107F), 0x1F_u16);
    }

    #[test]
    fn test_or_into_truncates_negative_values() {
        // ADD R1,R1,#-1 is 0x127F.
        let imm5 = BitRange::new(4, 0);
        assert_hex_eq!(imm5.or_into(0x1260, -1), 0x127F_u16);
    }

    #[test]
    fn test_insert_overwrites_only_the_field() {
        let page = BitRange::PAGE_OFFSET;
        assert_hex_eq!(page.insert(0x0FFF, 0x005), 0x0E05_u16);
    }

    #[test]
    fn test_add_wraps_within_field() {
        let page = BitRange::PAGE_OFFSET;
        assert_hex_eq!(page.add(0x0E05, 0x10), 0x0E15_u16);
        // The carry out of bit 8 is discarded, bit 9 stays set.
        assert_hex_eq!(page.add(0x03FF, 1), 0x0200_u16);
        assert_hex_eq!(BitRange::FULL_WORD.add(0xFFFF, 2), 0x0001_u16);
    }

    #[test]
    fn test_page_replace() {
        assert_hex_eq!(page_replace(0x3123, 0x005), 0x3005_u16);
        assert_hex_eq!(page_replace(0x31FF, 0x1FF), 0x31FF_u16);
        assert_eq!(page_of(0x3123), 0x18);
    }

    #[test]
    fn test_sign_extend() {
        assert_eq!(sign_extend(0x1F, 5), -1);
        assert_eq!(sign_extend(0x0F, 5), 15);
        assert_eq!(sign_extend(0x10, 5), -16);
        assert_eq!(sign_extend(0x8000, 16), i16::MIN);
    }

    #[proptest]
    fn insert_then_extract_is_identity(
        #[strategy(0u8..16)] lsb: u8,
        #[strategy(0u8..16)] span: u8,
        word: u16,
        value: u16,
    ) {
        let msb = (lsb + span).min(15);
        let range = BitRange::new(msb, lsb);
        let max = (1_u32 << range.width()) - 1;
        let value = u32::from(value) & max;
        let updated = range.insert(word, i32::try_from(value).unwrap());
        assert_eq!(u32::from(range.extract(updated)), value);
        // Bits outside the field are preserved.
        assert_eq!(updated & !range.mask(), word & !range.mask());
    }

    #[proptest]
    fn page_replace_stays_on_page(pc: u16, offset: u16) {
        let target = page_replace(pc, offset);
        assert_eq!(page_of(target), page_of(pc));
        assert_eq!(target & PAGE_OFFSET_MASK, offset & PAGE_OFFSET_MASK);
    }
}
