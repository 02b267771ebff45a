use std::fmt::Write as _;

use base::bitfield::BitRange;
use base::object::{Record, Relocation};
use base::symbol::SymbolTable;

use super::listing::render_listing;
use super::literal::LiteralTable;
use super::types::LineNumber;

/// One word of the assembled program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Word {
    pub address: u16,
    pub value: u16,
    pub relocation: Option<Relocation>,
}

/// A field which the linker must fill with the value of a symbol
/// defined by some other module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportReference {
    pub address: u16,
    pub range: BitRange,
    pub name: String,
}

/// One source line together with what it assembled to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Statement {
    pub(crate) line: LineNumber,
    pub(crate) source: String,
    pub(crate) address: u16,
    pub(crate) words: Vec<Word>,
}

/// The output of [`Program::render`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendering {
    /// Object file text.
    pub object: String,
    /// The listing, if one was asked for.
    pub listing: Option<String>,
}

/// An assembled program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    pub(crate) segment_name: String,
    pub(crate) origin: u16,
    pub(crate) relocatable: bool,
    pub(crate) start_address: u16,
    pub(crate) length: u16,
    pub(crate) symbols: SymbolTable,
    pub(crate) literals: LiteralTable,
    pub(crate) statements: Vec<Statement>,
    pub(crate) imports: Vec<ImportReference>,
}

impl Program {
    /// The six-character segment name.
    #[must_use]
    pub fn segment_name(&self) -> &str {
        &self.segment_name
    }

    /// The load address; 0 for a relocatable program.
    #[must_use]
    pub fn origin(&self) -> u16 {
        self.origin
    }

    #[must_use]
    pub fn start_address(&self) -> u16 {
        self.start_address
    }

    #[must_use]
    pub fn is_relocatable(&self) -> bool {
        self.relocatable
    }

    /// Number of words from the origin to the end of the literal
    /// pool, including space reserved by `.BLKW`.
    #[must_use]
    pub fn length(&self) -> u16 {
        self.length
    }

    #[must_use]
    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    #[must_use]
    pub fn literals(&self) -> &LiteralTable {
        &self.literals
    }

    #[must_use]
    pub fn imports(&self) -> &[ImportReference] {
        &self.imports
    }

    pub(crate) fn statements(&self) -> &[Statement] {
        &self.statements
    }

    /// Every word the program stores, in address order: instructions
    /// and data first, then the literal pool.
    pub fn words(&self) -> impl Iterator<Item = Word> + '_ {
        self.statements
            .iter()
            .flat_map(|s| s.words.iter().copied())
            .chain(self.literals.iter().map(|(address, value)| Word {
                address,
                value,
                relocation: None,
            }))
    }

    /// The object file as a sequence of records.
    #[must_use]
    pub fn records(&self) -> Vec<Record> {
        let mut records = vec![Record::Header {
            name: self.segment_name.clone(),
            origin: if self.relocatable {
                None
            } else {
                Some(self.origin)
            },
            length: self.length,
        }];
        records.extend(self.words().map(|w| Record::Text {
            address: w.address,
            value: w.value,
            relocation: w.relocation,
        }));
        records.extend(self.symbols.exports().map(|sym| {
            // Negative constants are exported as their 16-bit two's
            // complement.
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let value = sym.value as u16;
            Record::Export {
                name: sym.name.clone(),
                value,
                relocatable: sym.relocatable,
            }
        }));
        records.extend(self.imports.iter().map(|imp| Record::Import {
            address: imp.address,
            range: imp.range,
            name: imp.name.clone(),
        }));
        records.push(Record::End {
            start: self.start_address,
        });
        records
    }

    /// The text of the object file.
    #[must_use]
    pub fn object_text(&self) -> String {
        let mut text = String::new();
        for record in self.records() {
            // Writing to a String cannot fail.
            let _ = writeln!(text, "{record}");
        }
        text
    }

    /// The assembly listing.
    #[must_use]
    pub fn listing(&self) -> String {
        render_listing(self)
    }

    #[must_use]
    pub fn render(&self, listing: bool) -> Rendering {
        Rendering {
            object: self.object_text(),
            listing: if listing { Some(self.listing()) } else { None },
        }
    }
}
