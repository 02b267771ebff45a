//! The control unit fetches instructions and dispatches them to the
//! handler for their opcode class.
//!
//! ## Opcode classes
//!
//! - Arithmetic and logic: [`Machine::op_add`], [`Machine::op_and`],
//!   [`Machine::op_not`] (module `op_arith`)
//! - Control transfer: [`Machine::op_br`], [`Machine::op_jsr`],
//!   [`Machine::op_jsrr`], [`Machine::op_ret`] (module `op_jump`)
//! - Loads and stores: LD, LDI, LDR, LEA, ST, STI, STR (module
//!   `op_loadstore`)
//! - TRAP service routines and DBUG (module `trap`)
use std::fmt::Write as _;

use tracing::{event, span, Level};

use base::bitfield::page_of;
use base::instruction::{Instruction, Opcode};
use base::memory::MemoryImage;

use crate::alarm::Alarm;
use crate::console::Console;
use crate::random::Xorshift;
use crate::state::MachineState;

mod op_arith;
mod op_jump;
mod op_loadstore;
mod trap;


/// Where the machine is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Running,
    /// The HALT trap was executed.
    Halted,
    /// An alarm stopped the machine.
    Faulted,
}

/// How much of the machine's operation is shown on the console.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    /// Only the program's own console I/O.
    #[default]
    Quiet,
    /// Before each instruction, show the current page and the
    /// registers.
    Trace,
    /// As `Trace`, but also wait for one byte of input before each
    /// instruction.
    Step,
}

impl ExecutionMode {
    fn shows_state(self) -> bool {
        matches!(self, ExecutionMode::Trace | ExecutionMode::Step)
    }
}

/// A machine loaded with a program.
#[derive(Debug)]
pub struct Machine {
    state: MachineState,
    memory: MemoryImage,
    random: Xorshift,
    run_state: RunState,
    instruction_limit: Option<u64>,
    executed: u64,
}

impl Machine {
    /// Prepare to run the program in `memory` from `start_address`.
    #[must_use]
    pub fn new(memory: MemoryImage, start_address: u16) -> Machine {
        Machine {
            state: MachineState::new(start_address),
            memory,
            random: Xorshift::from_time(),
            run_state: RunState::Running,
            instruction_limit: None,
            executed: 0,
        }
    }

    /// Make the RND trap's values repeatable.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Machine {
        self.random = Xorshift::new(seed);
        self
    }

    /// Stop with [`Alarm::InstructionLimitReached`] once `limit`
    /// instructions have been executed without the program halting.
    pub fn set_instruction_limit(&mut self, limit: Option<u64>) {
        self.instruction_limit = limit;
    }

    /// A snapshot of the registers and program counter.
    #[must_use]
    pub fn state(&self) -> MachineState {
        self.state.clone()
    }

    #[must_use]
    pub fn memory(&self) -> &MemoryImage {
        &self.memory
    }

    #[must_use]
    pub fn run_state(&self) -> RunState {
        self.run_state
    }

    #[must_use]
    pub fn instructions_executed(&self) -> u64 {
        self.executed
    }

    /// Reads beyond the end of memory give 0.
    fn load(&self, address: u32) -> u16 {
        u16::try_from(address).map_or(0, |a| self.memory.read(a))
    }

    fn store(&mut self, address: u32, value: u16) -> Result<(), Alarm> {
        let a = u16::try_from(address).map_err(|_| Alarm::WriteOutOfRange { address })?;
        self.memory.write(a, value);
        Ok(())
    }

    fn execute(
        &mut self,
        inst: Instruction,
        address: u16,
        console: &mut dyn Console,
    ) -> Result<(), Alarm> {
        let opcode = inst.opcode().map_err(|e| Alarm::InvalidOpcode {
            opcode: e.0,
            address,
        })?;
        match opcode {
            Opcode::Add => self.op_add(inst),
            Opcode::And => self.op_and(inst),
            Opcode::Not => self.op_not(inst),
            Opcode::Br => self.op_br(inst),
            Opcode::Jsr => self.op_jsr(inst),
            Opcode::Jsrr => self.op_jsrr(inst),
            Opcode::Ret => self.op_ret(),
            Opcode::Ld => self.op_ld(inst),
            Opcode::Ldi => self.op_ldi(inst),
            Opcode::Ldr => self.op_ldr(inst),
            Opcode::Lea => self.op_lea(inst),
            Opcode::St => self.op_st(inst)?,
            Opcode::Sti => self.op_sti(inst)?,
            Opcode::Str => self.op_str(inst)?,
            Opcode::Trap => self.op_trap(inst, address, console)?,
            Opcode::Dbug => self.op_dbug(console)?,
        }
        Ok(())
    }

    /// Execute one instruction.
    ///
    /// # Errors
    ///
    /// Any alarm raised by the instruction.  The machine is then in
    /// the [`RunState::Faulted`] state.
    pub fn step(&mut self, console: &mut dyn Console) -> Result<RunState, Alarm> {
        if self.run_state != RunState::Running {
            return Ok(self.run_state);
        }
        if let Some(limit) = self.instruction_limit {
            if self.executed >= limit {
                self.run_state = RunState::Faulted;
                return Err(Alarm::InstructionLimitReached(limit));
            }
        }
        let address = self.state.pc;
        let inst = Instruction::from(self.memory.read(address));
        self.state.pc = address.wrapping_add(1);
        self.executed += 1;
        event!(Level::DEBUG, "{address:04X}: {inst:?}");
        match self.execute(inst, address, console) {
            Ok(()) => {
                if !self.state.executing {
                    self.run_state = RunState::Halted;
                    event!(
                        Level::INFO,
                        "halted at {address:04X} after {} instructions",
                        self.executed
                    );
                }
                Ok(self.run_state)
            }
            Err(alarm) => {
                event!(Level::WARN, "instruction at {address:04X} raised alarm: {alarm}");
                self.run_state = RunState::Faulted;
                Err(alarm)
            }
        }
    }

    /// Write the page containing the program counter and the
    /// registers.
    fn show_state(&self, console: &mut dyn Console) -> Result<(), Alarm> {
        let mut text = String::new();
        // Writing to a String cannot fail.
        let _ = self
            .memory
            .display_page(&mut text, page_of(self.state.pc));
        let _ = write!(text, "{}", self.state);
        console.write_trace(&text)?;
        Ok(())
    }

    /// Run until the program halts.
    ///
    /// # Errors
    ///
    /// Any alarm which stops the machine.
    pub fn run(
        &mut self,
        mode: ExecutionMode,
        console: &mut dyn Console,
    ) -> Result<MachineState, Alarm> {
        let span = span!(Level::ERROR, "run", start = self.state.pc, mode = ?mode);
        let _enter = span.enter();
        while self.run_state == RunState::Running {
            if mode.shows_state() {
                self.show_state(console)?;
            }
            if mode == ExecutionMode::Step {
                // Any byte, or the end of input, continues.
                console.read_byte()?;
            }
            if mode.shows_state() {
                let name = Instruction::from(self.memory.read(self.state.pc))
                    .opcode()
                    .map_or("Unknown", |op| op.name());
                console.write_trace(&format!("Executing instruction: {name}\n"))?;
            }
            self.step(console)?;
        }
        if mode.shows_state() {
            self.show_state(console)?;
        }
        Ok(self.state())
    }
}
