//! The simulator.  A [`Machine`] executes a linked program held in a
//! [`base::memory::MemoryImage`], talking to the outside world only
//! through a [`Console`].
#![crate_name = "cpu"]
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

mod alarm;
mod console;
mod control;
mod random;
mod state;

pub use alarm::Alarm;
pub use console::{BufferConsole, Console};
pub use control::{ExecutionMode, Machine, RunState};
pub use random::Xorshift;
pub use state::{ConditionCode, MachineState};
