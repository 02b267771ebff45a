//! The object file format shared by the assembler, the linker and
//! the simulator's loader.
//!
//! An object file is a sequence of text lines, one record per line.
//! The first character of each line identifies the record type and
//! every field has a fixed width:
//!
//! | Record | Layout | Meaning |
//! |--------|--------|---------|
//! | Header | `H<name:6><origin:4><length:4>` | Segment name, load address (`MMMM` if relocatable), length in words |
//! | Text   | `T<address:4><word:4>[M0\|M1]` | One word of memory, optionally with a relocation tag |
//! | Export | `X<A\|R><value:4><name>` | A symbol other modules may use, absolute or relocatable |
//! | Import | `I<address:4><msb:1><lsb:1><name>` | The bit-field `[msb, lsb]` of the word at `address` receives the value of `name` |
//! | End    | `E<start:4>` | Execution start address |
//!
//! Numeric fields are hexadecimal.  A text record tagged `M0` holds a
//! page-relative address in its low nine bits; `M1` means the whole
//! word is an address.  The linker adds the relocation distance to
//! just the tagged field.

use std::error::Error;
use std::fmt::{self, Display, Formatter};

use super::bitfield::BitRange;
use super::symbol::valid_symbol_name;

/// The origin field of a header record for a relocatable module.
pub const RELOCATABLE_ORIGIN: &str = "MMMM";

/// Width of the segment name field of a header record.
pub const SEGMENT_NAME_LENGTH: usize = 6;

const HEADER_RECORD_LENGTH: usize = 15;
const TEXT_RECORD_LENGTH: usize = 9;
const TEXT_RECORD_MODIFICATION_LENGTH: usize = 11;
const EXPORT_RECORD_MIN_LENGTH: usize = 7;
const IMPORT_RECORD_MIN_LENGTH: usize = 8;
const END_RECORD_LENGTH: usize = 5;

/// Describes which part of a word must be adjusted when the module
/// containing it is moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Relocation {
    /// `M0`: the 9-bit page offset in bits 8-0.
    PageOffset,
    /// `M1`: the whole 16-bit word.
    FullWord,
}

impl Relocation {
    #[must_use]
    pub fn field(&self) -> BitRange {
        match self {
            Relocation::PageOffset => BitRange::PAGE_OFFSET,
            Relocation::FullWord => BitRange::FULL_WORD,
        }
    }

    /// Choose the tag covering the relocatable bits selected by
    /// `mask`, if any.
    #[must_use]
    pub fn for_mask(mask: u16) -> Option<Relocation> {
        if mask == 0 {
            None
        } else if mask & !BitRange::PAGE_OFFSET.mask() == 0 {
            Some(Relocation::PageOffset)
        } else {
            Some(Relocation::FullWord)
        }
    }

    fn suffix(&self) -> &'static str {
        match self {
            Relocation::PageOffset => "M0",
            Relocation::FullWord => "M1",
        }
    }
}

/// One line of an object file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    Header {
        name: String,
        /// `None` for a relocatable module.
        origin: Option<u16>,
        length: u16,
    },
    Text {
        address: u16,
        value: u16,
        relocation: Option<Relocation>,
    },
    Export {
        name: String,
        value: u16,
        relocatable: bool,
    },
    Import {
        address: u16,
        range: BitRange,
        name: String,
    },
    End {
        start: u16,
    },
}

/// Pad or truncate a segment name to exactly the width of the header
/// field.
#[must_use]
pub fn segment_name(name: &str) -> String {
    let truncated: String = name.chars().take(SEGMENT_NAME_LENGTH).collect();
    format!("{truncated:<width$}", width = SEGMENT_NAME_LENGTH)
}

impl Display for Record {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            Record::Header {
                name,
                origin,
                length,
            } => {
                write!(f, "H{}", segment_name(name))?;
                match origin {
                    Some(addr) => write!(f, "{addr:04X}")?,
                    None => f.write_str(RELOCATABLE_ORIGIN)?,
                }
                write!(f, "{length:04X}")
            }
            Record::Text {
                address,
                value,
                relocation,
            } => {
                write!(f, "T{address:04X}{value:04X}")?;
                match relocation {
                    Some(r) => f.write_str(r.suffix()),
                    None => Ok(()),
                }
            }
            Record::Export {
                name,
                value,
                relocatable,
            } => {
                let kind = if *relocatable { 'R' } else { 'A' };
                write!(f, "X{kind}{value:04X}{name}")
            }
            Record::Import {
                address,
                range,
                name,
            } => {
                write!(f, "I{address:04X}{:X}{:X}{name}", range.msb(), range.lsb())
            }
            Record::End { start } => write!(f, "E{start:04X}"),
        }
    }
}

/// Describes why a line is not a valid record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordError(pub String);

impl Display for RecordError {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        f.write_str(&self.0)
    }
}

impl Error for RecordError {}

fn hex_field(line: &str, start: usize, end: usize, what: &str) -> Result<u16, RecordError> {
    let text = line
        .get(start..end)
        .ok_or_else(|| RecordError(format!("Missing {what}.")))?;
    if !text.chars().all(|ch| ch.is_ascii_hexdigit()) {
        return Err(RecordError(format!(
            "Invalid hexadecimal value \"{text}\" for {what}."
        )));
    }
    u16::from_str_radix(text, 16)
        .map_err(|_| RecordError(format!("Invalid hexadecimal value \"{text}\" for {what}.")))
}

fn symbol_field(line: &str, start: usize) -> Result<String, RecordError> {
    match line.get(start..) {
        Some(name) if valid_symbol_name(name) => Ok(name.to_string()),
        Some(name) => Err(RecordError(format!("Invalid symbol name \"{name}\"."))),
        None => Err(RecordError("Missing symbol name.".to_string())),
    }
}

impl Record {
    /// Parse one (already trimmed) line of an object file.
    ///
    /// # Errors
    ///
    /// Fails when the record type is unknown, when the line has the
    /// wrong length for its type, or when a field cannot be decoded.
    pub fn parse(line: &str) -> Result<Record, RecordError> {
        let len = line.len();
        match line.chars().next() {
            Some('H') => {
                if len != HEADER_RECORD_LENGTH || !line.is_ascii() {
                    return Err(RecordError(format!(
                        "Length of header record is incorrect. Should be {HEADER_RECORD_LENGTH} characters."
                    )));
                }
                let name = line[1..7].to_string();
                let origin = if &line[7..11] == RELOCATABLE_ORIGIN {
                    None
                } else {
                    Some(hex_field(line, 7, 11, "segment origin")?)
                };
                let length = hex_field(line, 11, 15, "segment length")?;
                Ok(Record::Header {
                    name,
                    origin,
                    length,
                })
            }
            Some('T') => {
                if len != TEXT_RECORD_LENGTH && len != TEXT_RECORD_MODIFICATION_LENGTH {
                    return Err(RecordError(format!(
                        "Length of text record is incorrect. Should be {TEXT_RECORD_LENGTH} or {TEXT_RECORD_MODIFICATION_LENGTH} characters."
                    )));
                }
                let address = hex_field(line, 1, 5, "text record address")?;
                let value = hex_field(line, 5, 9, "text record value")?;
                let relocation = match line.get(9..) {
                    Some("") => None,
                    Some("M0") => Some(Relocation::PageOffset),
                    Some("M1") => Some(Relocation::FullWord),
                    _ => {
                        return Err(RecordError(
                            "Malformed modification record. Must be \"M0\" or \"M1\".".to_string(),
                        ));
                    }
                };
                Ok(Record::Text {
                    address,
                    value,
                    relocation,
                })
            }
            Some('X') => {
                if len < EXPORT_RECORD_MIN_LENGTH {
                    return Err(RecordError(format!(
                        "Length of export record is incorrect. Should be at least {EXPORT_RECORD_MIN_LENGTH} characters."
                    )));
                }
                let relocatable = match line.get(1..2) {
                    Some("A") => false,
                    Some("R") => true,
                    _ => {
                        return Err(RecordError(
                            "Second character of export record should be 'A' for absolute or 'R' for relative.".to_string(),
                        ));
                    }
                };
                let value = hex_field(line, 2, 6, "export value")?;
                let name = symbol_field(line, 6)?;
                Ok(Record::Export {
                    name,
                    value,
                    relocatable,
                })
            }
            Some('I') => {
                if len < IMPORT_RECORD_MIN_LENGTH {
                    return Err(RecordError(format!(
                        "Length of import record is incorrect. Should be at least {IMPORT_RECORD_MIN_LENGTH} characters."
                    )));
                }
                let address = hex_field(line, 1, 5, "import address")?;
                let msb = hex_field(line, 5, 6, "import field msb")?;
                let lsb = hex_field(line, 6, 7, "import field lsb")?;
                if lsb > msb {
                    return Err(RecordError(format!(
                        "Import field [{msb:X}:{lsb:X}] is empty."
                    )));
                }
                let name = symbol_field(line, 7)?;
                // Both values are single hex digits, so they fit.
                #[allow(clippy::cast_possible_truncation)]
                let range = BitRange::new(msb as u8, lsb as u8);
                Ok(Record::Import {
                    address,
                    range,
                    name,
                })
            }
            Some('E') => {
                if len != END_RECORD_LENGTH {
                    return Err(RecordError(format!(
                        "Length of end record is incorrect. Should be {END_RECORD_LENGTH} characters."
                    )));
                }
                let start = hex_field(line, 1, 5, "start address")?;
                Ok(Record::End { start })
            }
            _ => Err(RecordError(
                "First character of line is invalid; must be 'H', 'T', 'E', 'I', or 'X'.".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_records() {
        let header = Record::Header {
            name: "PROG".to_string(),
            origin: Some(0x3000),
            length: 1,
        };
        assert_eq!(header.to_string(), "HPROG  30000001");
        let header = Record::Header {
            name: "LONGNAME".to_string(),
            origin: None,
            length: 0x1F,
        };
        assert_eq!(header.to_string(), "HLONGNAMMMM001F");
        let text = Record::Text {
            address: 0x3000,
            value: 0x1005,
            relocation: None,
        };
        assert_eq!(text.to_string(), "T30001005");
        let text = Record::Text {
            address: 0x0001,
            value: 0x0E05,
            relocation: Some(Relocation::PageOffset),
        };
        assert_eq!(text.to_string(), "T00010E05M0");
        let export = Record::Export {
            name: "FOO".to_string(),
            value: 0x3005,
            relocatable: false,
        };
        assert_eq!(export.to_string(), "XA3005FOO");
        let import = Record::Import {
            address: 0x0002,
            range: BitRange::PAGE_OFFSET,
            name: "FOO".to_string(),
        };
        assert_eq!(import.to_string(), "I000280FOO");
        assert_eq!(Record::End { start: 0x3000 }.to_string(), "E3000");
    }

    #[test]
    fn test_parse_records() {
        assert_eq!(
            Record::parse("HBEEERZ30000003"),
            Ok(Record::Header {
                name: "BEEERZ".to_string(),
                origin: Some(0x3000),
                length: 3,
            })
        );
        assert_eq!(
            Record::parse("HPROG  MMMM0010"),
            Ok(Record::Header {
                name: "PROG  ".to_string(),
                origin: None,
                length: 0x10,
            })
        );
        assert_eq!(
            Record::parse("T3000e300"),
            Ok(Record::Text {
                address: 0x3000,
                value: 0xE300,
                relocation: None,
            })
        );
        assert_eq!(
            Record::parse("T00011FFFM1"),
            Ok(Record::Text {
                address: 0x0001,
                value: 0x1FFF,
                relocation: Some(Relocation::FullWord),
            })
        );
        assert_eq!(
            Record::parse("XR0004LOOP"),
            Ok(Record::Export {
                name: "LOOP".to_string(),
                value: 4,
                relocatable: true,
            })
        );
        assert_eq!(
            Record::parse("I0003F0FOO"),
            Ok(Record::Import {
                address: 3,
                range: BitRange::FULL_WORD,
                name: "FOO".to_string(),
            })
        );
        assert_eq!(Record::parse("E3000"), Ok(Record::End { start: 0x3000 }));
    }

    #[test]
    fn test_parse_rejects_bad_lengths() {
        assert!(Record::parse("HBEEERZ3000003").is_err());
        assert!(Record::parse("T3000E30").is_err());
        assert!(Record::parse("T3000E3001").is_err());
        assert!(Record::parse("XA300").is_err());
        assert!(Record::parse("E30000").is_err());
    }

    #[test]
    fn test_parse_rejects_bad_fields() {
        assert_eq!(
            Record::parse("T3000E300M2"),
            Err(RecordError(
                "Malformed modification record. Must be \"M0\" or \"M1\".".to_string()
            ))
        );
        assert!(Record::parse("T30G0E300").is_err());
        assert!(Record::parse("XQ3000FOO").is_err());
        assert!(Record::parse("XA3000x12").is_err());
        assert!(Record::parse("I300008FOO").is_err());
        assert!(Record::parse("E-300").is_err());
        assert_eq!(
            Record::parse("Q3000"),
            Err(RecordError(
                "First character of line is invalid; must be 'H', 'T', 'E', 'I', or 'X'."
                    .to_string()
            ))
        );
    }

    #[test]
    fn test_relocation_for_mask() {
        assert_eq!(Relocation::for_mask(0), None);
        assert_eq!(Relocation::for_mask(0x01FF), Some(Relocation::PageOffset));
        assert_eq!(Relocation::for_mask(0xFFFF), Some(Relocation::FullWord));
    }
}
