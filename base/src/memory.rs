//! A sparse image of the 64K-word address space.
use std::collections::BTreeMap;
use std::fmt::{self, Write};

use super::bitfield::PAGE_SHIFT;

/// Words of memory keyed by address.  Addresses never written read
/// as zero.  The image also tracks the lowest and highest addresses
/// written, which the linker uses to place modules one after
/// another.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MemoryImage {
    words: BTreeMap<u16, u16>,
}

impl MemoryImage {
    #[must_use]
    pub fn new() -> MemoryImage {
        MemoryImage::default()
    }

    #[must_use]
    pub fn read(&self, address: u16) -> u16 {
        self.words.get(&address).copied().unwrap_or(0)
    }

    /// Store `value` at `address`, returning the previous value if
    /// the address had been written before.
    pub fn write(&mut self, address: u16, value: u16) -> Option<u16> {
        self.words.insert(address, value)
    }

    #[must_use]
    pub fn contains(&self, address: u16) -> bool {
        self.words.contains_key(&address)
    }

    #[must_use]
    pub fn first_address(&self) -> Option<u16> {
        self.words.keys().next().copied()
    }

    #[must_use]
    pub fn last_address(&self) -> Option<u16> {
        self.words.keys().next_back().copied()
    }

    /// Number of words written.
    #[must_use]
    pub fn len(&self) -> usize {
        self.words.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Iterate over `(address, word)` pairs in address order.
    pub fn iter(&self) -> impl Iterator<Item = (u16, u16)> + '_ {
        self.words.iter().map(|(addr, word)| (*addr, *word))
    }

    /// Write out the 512-word page `page`, eight words per line, each
    /// line prefixed by the address of its first word.
    ///
    /// # Errors
    ///
    /// Propagates failures of `out`.
    pub fn display_page<W: Write>(&self, out: &mut W, page: u16) -> Result<(), fmt::Error> {
        let start = u32::from(page) << PAGE_SHIFT;
        let end = (u32::from(page) + 1) << PAGE_SHIFT;
        for line_start in (start..end).step_by(8) {
            write!(out, "0x{line_start:04X}:")?;
            for addr in line_start..line_start + 8 {
                match u16::try_from(addr) {
                    Ok(a) => write!(out, " {:04X}", self.read(a))?,
                    Err(_) => break,
                }
            }
            writeln!(out)?;
        }
        Ok(())
    }
}

impl FromIterator<(u16, u16)> for MemoryImage {
    fn from_iter<I: IntoIterator<Item = (u16, u16)>>(iter: I) -> MemoryImage {
        MemoryImage {
            words: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unwritten_memory_reads_as_zero() {
        let mem = MemoryImage::new();
        assert_eq!(mem.read(0x3000), 0);
        assert_eq!(mem.first_address(), None);
        assert_eq!(mem.last_address(), None);
        assert!(mem.is_empty());
    }

    #[test]
    fn test_bounds_tracking() {
        let mut mem = MemoryImage::new();
        assert_eq!(mem.write(0x3005, 1), None);
        mem.write(0x3000, 2);
        mem.write(0x3002, 3);
        assert_eq!(mem.write(0x3002, 4), Some(3));
        assert_eq!(mem.first_address(), Some(0x3000));
        assert_eq!(mem.last_address(), Some(0x3005));
        assert_eq!(mem.len(), 3);
        assert_eq!(
            mem.iter().collect::<Vec<_>>(),
            vec![(0x3000, 2), (0x3002, 4), (0x3005, 1)]
        );
    }

    #[test]
    fn test_display_page() {
        let mem: MemoryImage = [(0x3000, 0x1005), (0x3009, 0xF025)].into_iter().collect();
        let mut out = String::new();
        mem.display_page(&mut out, 0x3000 >> 9).expect("writing to a String");
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 64);
        assert_eq!(
            lines[0],
            "0x3000: 1005 0000 0000 0000 0000 0000 0000 0000"
        );
        assert_eq!(
            lines[1],
            "0x3008: 0000 F025 0000 0000 0000 0000 0000 0000"
        );
        assert!(lines[63].starts_with("0x31F8:"));
    }

    #[test]
    fn test_display_last_page() {
        let mem = MemoryImage::new();
        let mut out = String::new();
        mem.display_page(&mut out, 0x7F).expect("writing to a String");
        assert!(out.lines().last().unwrap().starts_with("0xFFF8:"));
    }
}
