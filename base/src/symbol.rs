//! Symbols and symbol tables.
//!
//! The assembler keeps one [`SymbolTable`] per program and the
//! linker keeps one (holding just the exports) per object module.
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{self, Display, Formatter};

/// A named value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub name: String,
    pub value: i32,
    /// The value is an address within a module whose final location
    /// is not yet known.
    pub relocatable: bool,
    /// The value is supplied by another module at link time.
    pub is_import: bool,
    /// Other modules may refer to this symbol.
    pub is_export: bool,
}

impl Symbol {
    #[must_use]
    pub fn new(name: &str, value: i32, relocatable: bool) -> Symbol {
        Symbol {
            name: name.to_string(),
            value,
            relocatable,
            is_import: false,
            is_export: false,
        }
    }

    #[must_use]
    pub fn import(name: &str) -> Symbol {
        Symbol {
            name: name.to_string(),
            value: 0,
            relocatable: false,
            is_import: true,
            is_export: false,
        }
    }
}

impl Display for Symbol {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        write!(
            f,
            "{:<8} {:04X} {}",
            self.name,
            self.value & 0xFFFF,
            if self.relocatable { "R" } else { "A" }
        )?;
        if self.is_import {
            f.write_str(" import")?;
        }
        if self.is_export {
            f.write_str(" export")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SymbolError {
    Redefinition(String),
    Undefined(String),
    AliasToSelf,
    AliasToImport(String),
}

impl Display for SymbolError {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            SymbolError::Redefinition(name) => write!(f, "Symbol \"{name}\" is already defined."),
            SymbolError::Undefined(name) => write!(f, "Undefined symbol \"{name}\"."),
            SymbolError::AliasToSelf => f.write_str("Cannot alias a symbol to itself."),
            SymbolError::AliasToImport(name) => {
                write!(f, "Cannot alias imported symbol \"{name}\".")
            }
        }
    }
}

impl Error for SymbolError {}

/// Check the rules for symbol names: not empty, not starting with a
/// character which would make the operand look like a constant,
/// register or literal, and not containing separators.
#[must_use]
pub fn valid_symbol_name(name: &str) -> bool {
    match name.chars().next() {
        None | Some('x' | 'R' | '#' | '=') => false,
        Some(_) => !name.contains([' ', ',']),
    }
}

/// Owns the symbols of one module, keyed by name.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SymbolTable {
    symbols: BTreeMap<String, Symbol>,
}

impl SymbolTable {
    #[must_use]
    pub fn new() -> SymbolTable {
        SymbolTable::default()
    }

    /// Add a symbol.
    ///
    /// # Errors
    ///
    /// Fails if a symbol of the same name already exists.
    pub fn define(&mut self, symbol: Symbol) -> Result<(), SymbolError> {
        if self.symbols.contains_key(&symbol.name) {
            return Err(SymbolError::Redefinition(symbol.name));
        }
        self.symbols.insert(symbol.name.clone(), symbol);
        Ok(())
    }

    /// Declare `name` as provided by some other module.
    ///
    /// # Errors
    ///
    /// Fails if `name` is already defined.
    pub fn define_import(&mut self, name: &str) -> Result<(), SymbolError> {
        self.define(Symbol::import(name))
    }

    /// Define `name` with the same value and relocatability as
    /// `target`.
    ///
    /// # Errors
    ///
    /// Fails when aliasing a name to itself, when `target` is
    /// undefined or imported (its value is not known yet), or when
    /// `name` is already defined.
    pub fn alias(&mut self, name: &str, target: &str) -> Result<(), SymbolError> {
        if name == target {
            return Err(SymbolError::AliasToSelf);
        }
        let (value, relocatable) = match self.symbols.get(target) {
            None => {
                return Err(SymbolError::Undefined(target.to_string()));
            }
            Some(sym) if sym.is_import => {
                return Err(SymbolError::AliasToImport(target.to_string()));
            }
            Some(sym) => (sym.value, sym.relocatable),
        };
        self.define(Symbol::new(name, value, relocatable))
    }

    /// Mark an existing symbol for export.
    ///
    /// # Errors
    ///
    /// Fails if there is no such symbol.
    pub fn mark_export(&mut self, name: &str) -> Result<(), SymbolError> {
        match self.symbols.get_mut(name) {
            Some(sym) => {
                sym.is_export = true;
                Ok(())
            }
            None => Err(SymbolError::Undefined(name.to_string())),
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Symbol> {
        self.symbols.get(name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.symbols.contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Iterate over the symbols in name order.
    pub fn iter(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.values()
    }

    /// Iterate over the exported symbols in name order.
    pub fn exports(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.values().filter(|sym| sym.is_export)
    }

    /// Shift the value of every relocatable symbol by `delta`.
    pub fn relocate(&mut self, delta: i32) {
        for sym in self.symbols.values_mut().filter(|sym| sym.relocatable) {
            sym.value += delta;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redefinition_is_an_error() {
        let mut table = SymbolTable::new();
        table
            .define(Symbol::new("LOOP", 0x3000, false))
            .expect("first definition should succeed");
        assert_eq!(
            table.define(Symbol::new("LOOP", 0x3001, false)),
            Err(SymbolError::Redefinition("LOOP".to_string()))
        );
        assert_eq!(table.get("LOOP").map(|s| s.value), Some(0x3000));
    }

    #[test]
    fn test_alias_copies_value_and_relocatability() {
        let mut table = SymbolTable::new();
        table.define(Symbol::new("START", 4, true)).unwrap();
        table.alias("BEGIN", "START").unwrap();
        let begin = table.get("BEGIN").expect("alias should exist");
        assert_eq!(begin.value, 4);
        assert!(begin.relocatable);
    }

    #[test]
    fn test_alias_errors() {
        let mut table = SymbolTable::new();
        table.define_import("EXT").unwrap();
        assert_eq!(table.alias("A", "A"), Err(SymbolError::AliasToSelf));
        assert_eq!(
            table.alias("A", "NOWHERE"),
            Err(SymbolError::Undefined("NOWHERE".to_string()))
        );
        assert_eq!(
            table.alias("A", "EXT"),
            Err(SymbolError::AliasToImport("EXT".to_string()))
        );
        assert!(!table.contains("A"));
    }

    #[test]
    fn test_relocate_only_moves_relocatable_symbols() {
        let mut table = SymbolTable::new();
        table.define(Symbol::new("HERE", 0x10, true)).unwrap();
        table.define(Symbol::new("CONST", 0x10, false)).unwrap();
        table.relocate(0x3000);
        assert_eq!(table.get("HERE").map(|s| s.value), Some(0x3010));
        assert_eq!(table.get("CONST").map(|s| s.value), Some(0x10));
    }

    #[test]
    fn test_exports() {
        let mut table = SymbolTable::new();
        table.define(Symbol::new("A", 1, false)).unwrap();
        table.define(Symbol::new("B", 2, false)).unwrap();
        table.mark_export("B").unwrap();
        assert_eq!(
            table.mark_export("C"),
            Err(SymbolError::Undefined("C".to_string()))
        );
        let names: Vec<&str> = table.exports().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["B"]);
    }

    #[test]
    fn test_valid_symbol_name() {
        assert!(valid_symbol_name("LOOP"));
        assert!(valid_symbol_name("r2d2"));
        assert!(!valid_symbol_name("x2"));
        assert!(!valid_symbol_name("R2"));
        assert!(!valid_symbol_name("#2"));
        assert!(!valid_symbol_name("=2"));
        assert!(!valid_symbol_name("A B"));
        assert!(!valid_symbol_name("A,B"));
        assert!(!valid_symbol_name(""));
    }
}
