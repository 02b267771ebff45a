use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::io::Error as IoError;
use std::path::PathBuf;

/// Source line numbers, counted from 1.
pub type LineNumber = usize;

/// Broad classification of assembly errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The line is malformed: bad spacing, an unclosed quote, a
    /// number which does not parse.
    Syntax,
    /// The line is well-formed but meaningless: undefined or
    /// redefined symbols, operands of the wrong type or out of range.
    Semantic,
    /// The program as a whole is wrong: missing or repeated `.ORIG`
    /// or `.END`, or it is too big.
    Structural,
}

/// One problem found in a program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramError {
    pub line: Option<LineNumber>,
    pub kind: ErrorKind,
    pub msg: String,
}

impl ProgramError {
    pub(crate) fn syntax(line: LineNumber, msg: String) -> ProgramError {
        ProgramError {
            line: Some(line),
            kind: ErrorKind::Syntax,
            msg,
        }
    }

    pub(crate) fn semantic(line: LineNumber, msg: String) -> ProgramError {
        ProgramError {
            line: Some(line),
            kind: ErrorKind::Semantic,
            msg,
        }
    }

    pub(crate) fn structural(line: Option<LineNumber>, msg: String) -> ProgramError {
        ProgramError {
            line,
            kind: ErrorKind::Structural,
            msg,
        }
    }
}

impl Display for ProgramError {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        f.write_str("Assemble error: ")?;
        if let Some(n) = self.line {
            write!(f, "Line {n} - ")?;
        }
        f.write_str(&self.msg)
    }
}

impl Error for ProgramError {}

/// Everything wrong with a program.  The assembler reports every
/// problem it finds, not just the first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramErrors(pub Vec<ProgramError>);

impl ProgramErrors {
    #[must_use]
    pub fn errors(&self) -> &[ProgramError] {
        &self.0
    }
}

impl Display for ProgramErrors {
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

impl Error for ProgramErrors {}

#[derive(Debug)]
pub enum AssemblerFailure {
    IoErrorOnStdout { error: IoError },
    IoErrorOnInput { filename: PathBuf, error: IoError },
    IoErrorOnOutput { filename: PathBuf, error: IoError },
    BadProgram(ProgramErrors),
}

impl Display for AssemblerFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            AssemblerFailure::IoErrorOnStdout { error } => {
                write!(f, "error writing on stdout: {error}")
            }
            AssemblerFailure::IoErrorOnInput { filename, error } => {
                write!(
                    f,
                    "I/O error reading input file {}: {error}",
                    filename.display()
                )
            }
            AssemblerFailure::IoErrorOnOutput { filename, error } => {
                write!(
                    f,
                    "I/O error writing output file {}: {error}",
                    filename.display(),
                )
            }
            AssemblerFailure::BadProgram(errors) => write!(f, "{errors}"),
        }
    }
}

impl Error for AssemblerFailure {}

impl From<ProgramErrors> for AssemblerFailure {
    fn from(errors: ProgramErrors) -> AssemblerFailure {
        AssemblerFailure::BadProgram(errors)
    }
}

#[test]
fn test_program_error_display() {
    let errors = ProgramErrors(vec![
        ProgramError::syntax(4, "Incorrect spacing.".to_string()),
        ProgramError::structural(
            None,
            "Program is missing .ORIG and/or .END instructions.".to_string(),
        ),
    ]);
    assert_eq!(
        errors.to_string(),
        "Assemble error: Line 4 - Incorrect spacing.\n\
         Assemble error: Program is missing .ORIG and/or .END instructions."
    );
}
