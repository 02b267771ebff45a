//! Loading an object file into an [`ObjectModule`], and moving a
//! relocatable module to its final address.
use std::collections::BTreeMap;

use tracing::{event, Level};

use base::bitfield::BitRange;
use base::memory::MemoryImage;
use base::object::{Record, Relocation};
use base::symbol::{Symbol, SymbolTable};

use super::types::{LineNumber, LinkFailure, LoadError, LoadErrors};

/// A place where the value of an imported symbol must be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSite {
    pub address: u16,
    pub range: BitRange,
    pub name: String,
}

/// The contents of one object file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectModule {
    segment_name: String,
    origin: u16,
    length: u16,
    relocatable: bool,
    start_address: u16,
    memory: MemoryImage,
    relocations: BTreeMap<u16, Relocation>,
    exports: SymbolTable,
    imports: Vec<ImportSite>,
}

impl ObjectModule {
    #[must_use]
    pub fn segment_name(&self) -> &str {
        &self.segment_name
    }

    /// The load address; 0 for a relocatable module which has not
    /// been moved.
    #[must_use]
    pub fn origin(&self) -> u16 {
        self.origin
    }

    /// The number of words the segment occupies (including space
    /// reserved but not written).
    #[must_use]
    pub fn length(&self) -> u16 {
        self.length
    }

    #[must_use]
    pub fn is_relocatable(&self) -> bool {
        self.relocatable
    }

    #[must_use]
    pub fn start_address(&self) -> u16 {
        self.start_address
    }

    #[must_use]
    pub fn memory(&self) -> &MemoryImage {
        &self.memory
    }

    /// Relocation tags of the words which have them.
    #[must_use]
    pub fn relocations(&self) -> &BTreeMap<u16, Relocation> {
        &self.relocations
    }

    #[must_use]
    pub fn exports(&self) -> &SymbolTable {
        &self.exports
    }

    #[must_use]
    pub fn imports(&self) -> &[ImportSite] {
        &self.imports
    }

    /// The highest address holding a word, if any.
    #[must_use]
    pub fn last_address(&self) -> Option<u16> {
        self.memory.last_address()
    }

    /// One past the last address of the segment.
    #[must_use]
    pub fn end(&self) -> u32 {
        u32::from(self.origin) + u32::from(self.length)
    }

    /// Move the module so that it starts at `new_origin`.  Every
    /// word moves, relocatable exports and the start address shift
    /// by the same distance, and the tagged field of each tagged word
    /// has the distance added to it.
    ///
    /// # Errors
    ///
    /// Only relocatable modules can be moved, and the moved module
    /// must still fit in memory.
    pub fn relocate(&mut self, new_origin: u16) -> Result<(), LinkFailure> {
        if !self.relocatable {
            return Err(LinkFailure::AbsoluteModuleMoved {
                name: self.segment_name.clone(),
                origin: self.origin,
                base: new_origin,
            });
        }
        if u32::from(new_origin) + u32::from(self.length) > 0x1_0000 {
            return Err(LinkFailure::AddressSpaceExhausted {
                name: self.segment_name.clone(),
            });
        }
        let delta: i32 = i32::from(new_origin) - i32::from(self.origin);
        event!(
            Level::DEBUG,
            "relocating module {} from {:04X} to {:04X}",
            self.segment_name.trim_end(),
            self.origin,
            new_origin
        );
        let shift = |addr: u16| -> u16 {
            // The segment fits at its new address, so every address
            // within it does too.
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let moved = (i32::from(addr) + delta) as u16;
            moved
        };

        let mut memory = MemoryImage::new();
        let mut relocations = BTreeMap::new();
        for (addr, word) in self.memory.iter() {
            let value = match self.relocations.get(&addr) {
                Some(tag) => {
                    relocations.insert(shift(addr), *tag);
                    tag.field().add(word, delta)
                }
                None => word,
            };
            memory.write(shift(addr), value);
        }
        self.memory = memory;
        self.relocations = relocations;
        self.exports.relocate(delta);
        for site in &mut self.imports {
            site.address = shift(site.address);
        }
        self.start_address = shift(self.start_address);
        self.origin = new_origin;
        Ok(())
    }
}

struct Segment {
    first: u16,
    length: u16,
}

impl Segment {
    fn contains(&self, address: u16) -> bool {
        address >= self.first
            && u32::from(address) < u32::from(self.first) + u32::from(self.length)
    }
}

/// Accumulates the records of one object file.
#[derive(Default)]
struct ModuleBuilder {
    header: Option<(String, Option<u16>, u16)>,
    start: Option<u16>,
    memory: MemoryImage,
    relocations: BTreeMap<u16, Relocation>,
    exports: SymbolTable,
    imports: Vec<ImportSite>,
    errors: Vec<LoadError>,
}

impl ModuleBuilder {
    fn segment(&self) -> Option<Segment> {
        self.header.as_ref().map(|(_, origin, length)| Segment {
            first: origin.unwrap_or(0),
            length: *length,
        })
    }

    fn error(&mut self, line: LineNumber, msg: String) {
        self.errors.push(LoadError::at_line(line, msg));
    }

    fn add(&mut self, line: LineNumber, record: Record) {
        if self.start.is_some() {
            self.error(line, "Record follows the end record.".to_string());
            return;
        }
        let segment = match (&record, self.segment()) {
            (Record::Header { .. }, None) => None,
            (Record::Header { .. }, Some(_)) => {
                self.error(
                    line,
                    "Object file contains more than one header record.".to_string(),
                );
                return;
            }
            (_, None) => {
                self.error(line, "Record precedes the header record.".to_string());
                return;
            }
            (_, Some(segment)) => Some(segment),
        };
        match (record, segment) {
            (
                Record::Header {
                    name,
                    origin,
                    length,
                },
                _,
            ) => {
                let first = u32::from(origin.unwrap_or(0));
                if first + u32::from(length) > 0x1_0000 {
                    self.error(
                        line,
                        "Memory segment length is too large for virtual machine.".to_string(),
                    );
                }
                self.header = Some((name, origin, length));
            }
            (
                Record::Text {
                    address,
                    value,
                    relocation,
                },
                Some(segment),
            ) => {
                if !segment.contains(address) {
                    self.error(line, format!("Text record address 0x{address:04x} exists outside program memory range specified in header record."));
                } else if self.memory.write(address, value).is_some() {
                    self.error(
                        line,
                        format!("Text record address 0x{address:04x} appears more than once."),
                    );
                } else if let Some(tag) = relocation {
                    self.relocations.insert(address, tag);
                }
            }
            (
                Record::Export {
                    name,
                    value,
                    relocatable,
                },
                _,
            ) => {
                let mut sym = Symbol::new(&name, i32::from(value), relocatable);
                sym.is_export = true;
                if let Err(e) = self.exports.define(sym) {
                    self.error(line, e.to_string());
                }
            }
            (
                Record::Import {
                    address,
                    range,
                    name,
                },
                Some(segment),
            ) => {
                if segment.contains(address) {
                    self.imports.push(ImportSite {
                        address,
                        range,
                        name,
                    });
                } else {
                    self.error(line, format!("Import record address 0x{address:04x} exists outside program memory range specified in header record."));
                }
            }
            (Record::End { start }, Some(segment)) => {
                let empty_segment_start = segment.length == 0 && start == segment.first;
                if !segment.contains(start) && !empty_segment_start {
                    self.error(line, format!("Execution start address 0x{start:04x} outside specified memory segment range."));
                }
                self.start = Some(start);
            }
            (Record::Text { .. } | Record::Import { .. } | Record::End { .. }, None) => {
                // The header check above returned already.
            }
        }
    }

    fn finish(mut self) -> Result<ObjectModule, LoadErrors> {
        if self.header.is_none() {
            self.errors.push(LoadError::whole_file(
                "Object file does not contain a header record.",
            ));
        }
        if self.start.is_none() {
            self.errors.push(LoadError::whole_file(
                "Object file does not contain an end record.",
            ));
        }
        match (self.header, self.start) {
            (Some((segment_name, origin, length)), Some(start_address))
                if self.errors.is_empty() =>
            {
                Ok(ObjectModule {
                    segment_name,
                    origin: origin.unwrap_or(0),
                    length,
                    relocatable: origin.is_none(),
                    start_address,
                    memory: self.memory,
                    relocations: self.relocations,
                    exports: self.exports,
                    imports: self.imports,
                })
            }
            _ => Err(LoadErrors(self.errors)),
        }
    }
}

/// Parse the text of an object file.
///
/// # Errors
///
/// Every malformed or inconsistent record is reported; if there are
/// any such problems no module is returned.
pub fn load(text: &str) -> Result<ObjectModule, LoadErrors> {
    let mut builder = ModuleBuilder::default();
    for (line_number, line) in text.lines().enumerate().map(|(n, l)| (n + 1, l.trim())) {
        if line.is_empty() {
            continue;
        }
        match Record::parse(line) {
            Ok(record) => {
                event!(Level::DEBUG, "line {line_number}: {record:?}");
                builder.add(line_number, record);
            }
            Err(e) => builder.error(line_number, e.to_string()),
        }
    }
    let result = builder.finish();
    if let Ok(module) = &result {
        event!(
            Level::DEBUG,
            "loaded module {} ({} words, {})",
            module.segment_name.trim_end(),
            module.memory.len(),
            if module.relocatable {
                "relocatable"
            } else {
                "absolute"
            }
        );
    }
    result
}
