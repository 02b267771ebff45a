//! Combining object modules into one memory image.
//!
//! Modules are placed in the order given.  The first module stays
//! where it is (or, if it is relocatable, moves to the base address
//! when one is given).  Each later relocatable module is moved to the
//! address just past the end of the module before it; absolute
//! modules stay where they are.  Once everything is placed, the
//! import sites of every module are patched with the values exported
//! by the others.
use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};

use tracing::{event, span, Level};

use base::bitfield::page_of;
use base::memory::MemoryImage;
use base::object::Record;
use base::symbol::Symbol;

use super::module::ObjectModule;
use super::types::LinkFailure;

/// The result of linking: an absolute program ready to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkedImage {
    pub memory: MemoryImage,
    pub start_address: u16,
    pub segment_name: String,
}

impl LinkedImage {
    /// The records of an absolute object file holding the image.
    #[must_use]
    pub fn records(&self) -> Vec<Record> {
        let first = self
            .memory
            .first_address()
            .map_or(self.start_address, |a| a.min(self.start_address));
        let last = self
            .memory
            .last_address()
            .map_or(self.start_address, |a| a.max(self.start_address));
        // The start address is known to be inside the image, so a
        // non-empty image always has a non-zero length.
        let length = if self.memory.is_empty() {
            0
        } else {
            last.wrapping_sub(first).wrapping_add(1)
        };
        let mut records = Vec::with_capacity(self.memory.len() + 2);
        records.push(Record::Header {
            name: self.segment_name.clone(),
            origin: Some(first),
            length,
        });
        records.extend(self.memory.iter().map(|(address, value)| Record::Text {
            address,
            value,
            relocation: None,
        }));
        records.push(Record::End {
            start: self.start_address,
        });
        records
    }

    /// Render the image as the text of an absolute object file.
    #[must_use]
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl Display for LinkedImage {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        for record in self.records() {
            writeln!(f, "{record}")?;
        }
        Ok(())
    }
}

fn place(modules: Vec<ObjectModule>, base: Option<u16>) -> Result<Vec<ObjectModule>, LinkFailure> {
    let mut placed: Vec<ObjectModule> = Vec::with_capacity(modules.len());
    for mut module in modules {
        let wanted: Option<u32> = match placed.last() {
            None => base.map(u32::from),
            Some(previous) => {
                if module.is_relocatable() {
                    // Space reserved at the end of the previous module
                    // but never written is not kept.
                    Some(
                        previous
                            .last_address()
                            .map_or(u32::from(previous.origin()), |a| u32::from(a) + 1),
                    )
                } else {
                    None
                }
            }
        };
        match wanted {
            Some(address) if module.is_relocatable() => {
                let new_origin = u16::try_from(address).map_err(|_| {
                    LinkFailure::AddressSpaceExhausted {
                        name: module.segment_name().to_string(),
                    }
                })?;
                module.relocate(new_origin)?;
            }
            Some(address) if address != u32::from(module.origin()) => {
                // The only absolute module with a wanted address is
                // the first, and that address came from a u16.
                return Err(LinkFailure::AbsoluteModuleMoved {
                    name: module.segment_name().to_string(),
                    origin: module.origin(),
                    base: u16::try_from(address).unwrap_or(u16::MAX),
                });
            }
            _ => (),
        }
        event!(
            Level::DEBUG,
            "module {} occupies {:04X}..{:05X}",
            module.segment_name().trim_end(),
            module.origin(),
            module.end()
        );
        placed.push(module);
    }
    Ok(placed)
}

fn collect_exports(modules: &[ObjectModule]) -> Result<BTreeMap<String, Symbol>, LinkFailure> {
    let mut exports: BTreeMap<String, Symbol> = BTreeMap::new();
    for sym in modules.iter().flat_map(|m| m.exports().exports()) {
        if exports.insert(sym.name.clone(), sym.clone()).is_some() {
            return Err(LinkFailure::DuplicateExport {
                name: sym.name.clone(),
            });
        }
    }
    Ok(exports)
}

/// Link `modules` into a single absolute memory image.
///
/// The start address and segment name of the result are those of the
/// first module.
///
/// # Errors
///
/// Linking stops at the first problem: no modules, modules which
/// cannot be placed or overlap, exports defined twice, imports
/// nobody exports, or (for more than one module) a result which does
/// not fit within one page.
pub fn link(modules: Vec<ObjectModule>, base: Option<u16>) -> Result<LinkedImage, LinkFailure> {
    let span = span!(Level::ERROR, "link", modules = modules.len(), ?base);
    let _enter = span.enter();

    if modules.is_empty() {
        return Err(LinkFailure::NoModules);
    }
    let module_count = modules.len();
    let modules = place(modules, base)?;
    let exports = collect_exports(&modules)?;

    let mut memory = MemoryImage::new();
    for module in &modules {
        for (address, word) in module.memory().iter() {
            if memory.write(address, word).is_some() {
                return Err(LinkFailure::Overlap { address });
            }
        }
    }

    for site in modules.iter().flat_map(|m| m.imports()) {
        let value = match exports.get(&site.name) {
            Some(sym) => sym.value,
            None => {
                return Err(LinkFailure::UndefinedSymbol {
                    name: site.name.clone(),
                });
            }
        };
        let patched = site.range.insert(memory.read(site.address), value);
        event!(
            Level::DEBUG,
            "patching {} into {} of {:04X}: {:04X}",
            site.name,
            site.range,
            site.address,
            patched
        );
        memory.write(site.address, patched);
    }

    if module_count > 1 {
        if let (Some(first), Some(last)) = (memory.first_address(), memory.last_address()) {
            if page_of(first) != page_of(last) {
                return Err(LinkFailure::CrossesPage { first, last });
            }
        }
    }

    let (start_address, segment_name) = match modules.first() {
        Some(m) => (m.start_address(), m.segment_name().to_string()),
        None => return Err(LinkFailure::NoModules),
    };
    event!(
        Level::INFO,
        "linked {} module(s), {} words, start address {:04X}",
        module_count,
        memory.len(),
        start_address
    );
    Ok(LinkedImage {
        memory,
        start_address,
        segment_name,
    })
}
