//! The `base` crate defines the things which are useful to more than
//! one stage of the toolchain: the assembler, the linker and the
//! simulator.  The idea is that the assembler depends on the base
//! crate but does not need to depend on the simulator library
//! itself, and the simulator does not need the assembler.
//!
//! The machine has 16-bit words, eight general registers and a
//! 64K-word address space divided into 512-word pages.

pub mod bitfield;
pub mod instruction;
pub mod isa;
pub mod memory;
pub mod object;
pub mod symbol;
