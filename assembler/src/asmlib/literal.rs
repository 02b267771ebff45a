use std::collections::BTreeMap;

/// The literal pool.  Each distinct value gets one word, in order of
/// first use; the pool is placed immediately after the last
/// instruction once the size of the program is known.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LiteralTable {
    values: Vec<u16>,
    index: BTreeMap<u16, usize>,
    offset: u16,
}

impl LiteralTable {
    #[must_use]
    pub fn new() -> LiteralTable {
        LiteralTable::default()
    }

    /// Add `value` to the pool (if it is not already there) and
    /// return its position within the pool.
    pub fn define(&mut self, value: u16) -> usize {
        if let Some(n) = self.index.get(&value) {
            return *n;
        }
        let n = self.values.len();
        self.values.push(value);
        self.index.insert(value, n);
        n
    }

    /// Set the address of the first word of the pool.
    pub fn set_offset(&mut self, offset: u16) {
        self.offset = offset;
    }

    #[must_use]
    pub fn offset(&self) -> u16 {
        self.offset
    }

    /// The address at which `value` is stored.
    #[must_use]
    pub fn address_of(&self, value: u16) -> Option<u16> {
        self.index.get(&value).map(|n| self.address_of_index(*n))
    }

    fn address_of_index(&self, n: usize) -> u16 {
        // The pool never holds more than a page worth of entries in a
        // valid program; larger pools are reported as errors before
        // addresses matter.
        #[allow(clippy::cast_possible_truncation)]
        let n = n as u16;
        self.offset.wrapping_add(n)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over the pool as (address, value) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (u16, u16)> + '_ {
        self.values
            .iter()
            .enumerate()
            .map(|(n, value)| (self.address_of_index(n), *value))
    }
}

#[test]
fn test_equal_values_share_a_word() {
    let mut literals = LiteralTable::new();
    assert_eq!(literals.define(5), 0);
    assert_eq!(literals.define(0xFFFF), 1);
    // =#5 and =x0005 are the same literal.
    assert_eq!(literals.define(5), 0);
    assert_eq!(literals.len(), 2);
    literals.set_offset(0x3010);
    assert_eq!(literals.address_of(5), Some(0x3010));
    assert_eq!(literals.address_of(0xFFFF), Some(0x3011));
    assert_eq!(literals.address_of(7), None);
    assert_eq!(
        literals.iter().collect::<Vec<_>>(),
        vec![(0x3010, 5), (0x3011, 0xFFFF)]
    );
}
