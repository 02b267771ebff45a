use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::io::Error as IoError;
use std::path::PathBuf;

/// Line numbers within an object file, counted from 1.
pub type LineNumber = usize;

/// A problem with one record of an object file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadError {
    pub line: Option<LineNumber>,
    pub msg: String,
}

impl LoadError {
    pub(crate) fn at_line(line: LineNumber, msg: String) -> LoadError {
        LoadError {
            line: Some(line),
            msg,
        }
    }

    pub(crate) fn whole_file(msg: &str) -> LoadError {
        LoadError {
            line: None,
            msg: msg.to_string(),
        }
    }
}

impl Display for LoadError {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        match self.line {
            Some(n) => write!(f, "Load error: Line {n} - {}", self.msg),
            None => write!(f, "Load error: {}", self.msg),
        }
    }
}

impl Error for LoadError {}

/// All the problems found in one object file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadErrors(pub Vec<LoadError>);

impl LoadErrors {
    #[must_use]
    pub fn errors(&self) -> &[LoadError] {
        &self.0
    }
}

impl Display for LoadErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        for (i, e) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{e}")?;
        }
        Ok(())
    }
}

impl Error for LoadErrors {}

/// Reasons for which a set of modules cannot be linked.  Linking
/// stops at the first of these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkFailure {
    NoModules,
    AbsoluteModuleMoved { name: String, origin: u16, base: u16 },
    AddressSpaceExhausted { name: String },
    Overlap { address: u16 },
    DuplicateExport { name: String },
    UndefinedSymbol { name: String },
    CrossesPage { first: u16, last: u16 },
}

impl Display for LinkFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        f.write_str("Link error: ")?;
        match self {
            LinkFailure::NoModules => f.write_str("No object modules to link."),
            LinkFailure::AbsoluteModuleMoved { name, origin, base } => write!(
                f,
                "Module \"{}\" has absolute origin 0x{origin:04X} and cannot be moved to 0x{base:04X}.",
                name.trim_end()
            ),
            LinkFailure::AddressSpaceExhausted { name } => {
                write!(f, "Module \"{}\" does not fit in memory.", name.trim_end())
            }
            LinkFailure::Overlap { address } => {
                write!(f, "Modules overlap at address 0x{address:04X}.")
            }
            LinkFailure::DuplicateExport { name } => {
                write!(f, "Symbol \"{name}\" is exported by more than one module.")
            }
            LinkFailure::UndefinedSymbol { name } => write!(f, "Undefined symbol \"{name}\"."),
            LinkFailure::CrossesPage { first, last } => write!(
                f,
                "Linked program spans more than one page (0x{first:04X} to 0x{last:04X})."
            ),
        }
    }
}

impl Error for LinkFailure {}

/// Failures of the file-level linker driver.
#[derive(Debug)]
pub enum LinkerFailure {
    IoErrorOnInput { filename: PathBuf, error: IoError },
    IoErrorOnOutput { filename: PathBuf, error: IoError },
    Load { filename: PathBuf, errors: LoadErrors },
    Link(LinkFailure),
}

impl Display for LinkerFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            LinkerFailure::IoErrorOnInput { filename, error } => {
                write!(f, "I/O error reading input file {}: {error}", filename.display())
            }
            LinkerFailure::IoErrorOnOutput { filename, error } => {
                write!(f, "I/O error writing output file {}: {error}", filename.display())
            }
            LinkerFailure::Load { filename, errors } => {
                writeln!(f, "failed to load {}:", filename.display())?;
                write!(f, "{errors}")
            }
            LinkerFailure::Link(e) => write!(f, "{e}"),
        }
    }
}

impl Error for LinkerFailure {}

impl From<LinkFailure> for LinkerFailure {
    fn from(e: LinkFailure) -> LinkerFailure {
        LinkerFailure::Link(e)
    }
}

#[test]
fn test_load_error_display() {
    let errors = LoadErrors(vec![
        LoadError::at_line(3, "Bad thing.".to_string()),
        LoadError::whole_file("Object file does not contain an end record."),
    ]);
    assert_eq!(
        errors.to_string(),
        "Load error: Line 3 - Bad thing.\nLoad error: Object file does not contain an end record."
    );
}
