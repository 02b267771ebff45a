use std::fs;
use std::io::Write;
use std::path::Path;

use tracing::{event, Level};

use super::assembly::assemble;
use super::types::AssemblerFailure;

/// Options which control what the assembler writes.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputOptions {
    /// When set, print the listing on standard output.
    pub list: bool,
}

/// The segment name implied by a source file name: its stem.
fn segment_hint(input_file: &Path) -> String {
    input_file
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Assemble the file `input_file`, writing the object file to
/// `output_file`.
///
/// # Errors
///
/// Fails if the input cannot be read, if the program has errors, or
/// if the object file (or listing) cannot be written.  Nothing is
/// written when the program has errors.
pub fn assemble_file(
    input_file: &Path,
    output_file: &Path,
    options: OutputOptions,
) -> Result<(), AssemblerFailure> {
    let source = fs::read_to_string(input_file).map_err(|error| AssemblerFailure::IoErrorOnInput {
        filename: input_file.to_owned(),
        error,
    })?;
    let program = assemble(&segment_hint(input_file), &source)?;
    let rendering = program.render(options.list);

    if let Some(listing) = rendering.listing {
        let stdout = std::io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(listing.as_bytes())
            .and_then(|()| handle.flush())
            .map_err(|error| AssemblerFailure::IoErrorOnStdout { error })?;
    }

    fs::write(output_file, rendering.object).map_err(|error| AssemblerFailure::IoErrorOnOutput {
        filename: output_file.to_owned(),
        error,
    })?;
    event!(
        Level::INFO,
        "wrote {} ({} words)",
        output_file.display(),
        program.words().count()
    );
    Ok(())
}

#[test]
fn test_segment_hint() {
    assert_eq!(segment_hint(Path::new("dir/hello.asm")), "hello");
    assert_eq!(segment_hint(Path::new("noext")), "noext");
}
