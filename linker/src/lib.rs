//! The linker reads object files produced by the assembler, moves
//! relocatable modules to their final addresses and resolves the
//! symbols which one module imports from another.  The result is a
//! single absolute memory image which the simulator can run, or which
//! can be written back out as an object file.
#![deny(unreachable_pub)]
#![deny(unsafe_code)]
#![warn(clippy::must_use_candidate)]
#![warn(clippy::semicolon_if_nothing_returned)]
#![warn(clippy::wildcard_imports)]
#![warn(clippy::missing_errors_doc)]
#![warn(clippy::items_after_statements)]
#![warn(clippy::explicit_iter_loop)]
#![warn(clippy::pedantic)]
#![allow(clippy::redundant_closure_for_method_calls)]

mod driver;
mod link;
mod module;
mod types;

pub use driver::{link_files, load_and_link_files, load_file, parse_address};
pub use link::{link, LinkedImage};
pub use module::{load, ImportSite, ObjectModule};
pub use types::{LineNumber, LinkFailure, LinkerFailure, LoadError, LoadErrors};
