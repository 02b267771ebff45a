use std::fs;
use std::path::{Path, PathBuf};

use tracing::{event, Level};

use super::link::{link, LinkedImage};
use super::module::{load, ObjectModule};
use super::types::LinkerFailure;

/// Read and parse one object file.
///
/// # Errors
///
/// Fails if the file cannot be read or does not hold a valid module.
pub fn load_file(path: &Path) -> Result<ObjectModule, LinkerFailure> {
    let text = fs::read_to_string(path).map_err(|error| LinkerFailure::IoErrorOnInput {
        filename: path.to_owned(),
        error,
    })?;
    let module = load(&text).map_err(|errors| LinkerFailure::Load {
        filename: path.to_owned(),
        errors,
    })?;
    event!(
        Level::INFO,
        "loaded {} ({} words)",
        path.display(),
        module.memory().len()
    );
    Ok(module)
}

/// Load each of `inputs` in turn, then link them.
///
/// # Errors
///
/// Fails on the first file which cannot be loaded, or if the loaded
/// modules cannot be linked.
pub fn load_and_link_files(
    inputs: &[PathBuf],
    base: Option<u16>,
) -> Result<LinkedImage, LinkerFailure> {
    let modules = inputs
        .iter()
        .map(|path| load_file(path))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(link(modules, base)?)
}

/// Link object files and write the result as an absolute object file.
///
/// # Errors
///
/// See [`load_and_link_files`]; also fails if the output cannot be
/// written.
pub fn link_files(
    inputs: &[PathBuf],
    output: &Path,
    base: Option<u16>,
) -> Result<(), LinkerFailure> {
    let image = load_and_link_files(inputs, base)?;
    fs::write(output, image.render()).map_err(|error| LinkerFailure::IoErrorOnOutput {
        filename: output.to_owned(),
        error,
    })
}

/// Parse an address given on the command line: `x3000`, `0x3000` or
/// decimal `12288`.
///
/// # Errors
///
/// The message describes why `s` is not a 16-bit address.
pub fn parse_address(s: &str) -> Result<u16, String> {
    let parsed = if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix('x')) {
        u16::from_str_radix(hex, 16)
    } else {
        s.parse::<u16>()
    };
    parsed.map_err(|e| format!("'{s}' is not a valid address: {e}"))
}

#[test]
fn test_parse_address() {
    assert_eq!(parse_address("x3000"), Ok(0x3000));
    assert_eq!(parse_address("0x3000"), Ok(0x3000));
    assert_eq!(parse_address("0xffff"), Ok(0xFFFF));
    assert_eq!(parse_address("12288"), Ok(0x3000));
    assert!(parse_address("x10000").is_err());
    assert!(parse_address("-1").is_err());
    assert!(parse_address("").is_err());
}
