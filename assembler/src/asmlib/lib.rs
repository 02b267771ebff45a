//! A two-pass assembler for the 16-bit machine.
//!
//! [`assemble`] turns column-formatted source text into a
//! [`Program`], which can be rendered as an object file (for the
//! linker or simulator to load) and as a listing.
#![deny(unreachable_pub)]
#![deny(unsafe_code)]
#![warn(clippy::must_use_candidate)]
#![warn(clippy::manual_string_new)]
#![warn(clippy::semicolon_if_nothing_returned)]
#![warn(clippy::return_self_not_must_use)]
#![warn(clippy::wildcard_imports)]
#![warn(clippy::bool_to_int_with_if)]
#![warn(clippy::match_same_arms)]
#![warn(clippy::missing_errors_doc)]
#![warn(clippy::items_after_statements)]
#![warn(clippy::explicit_iter_loop)]
#![warn(clippy::unreadable_literal)]
#![warn(clippy::pedantic)]
#![allow(clippy::too_many_lines)] // fix later
#![allow(clippy::redundant_closure_for_method_calls)] // fix later
#![allow(clippy::needless_pass_by_value)] // fix soon
#![allow(clippy::doc_markdown)] // fix soon

mod assembly;
mod directive;
mod driver;
mod listing;
mod literal;
mod operand;
mod program;
mod scanner;
mod types;


pub use assembly::{assemble, MAX_LITERALS, MAX_SOURCE_RECORDS, MAX_SYMBOLS};
pub use driver::{assemble_file, OutputOptions};
pub use literal::LiteralTable;
pub use program::{ImportReference, Program, Rendering, Word};
pub use types::{AssemblerFailure, ErrorKind, LineNumber, ProgramError, ProgramErrors};
