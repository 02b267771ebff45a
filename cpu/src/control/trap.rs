//! TRAP service routines, and the DBUG instruction.
//!
//! | Vector | Name | Effect |
//! |--------|------|--------|
//! | 0x21 | OUT  | write the low byte of R0 |
//! | 0x22 | PUTS | write the string at R0 as UTF-8, one character per word, up to a zero word |
//! | 0x23 | IN   | prompt `? `, read one byte into R0 |
//! | 0x25 | HALT | stop the machine |
//! | 0x31 | OUTN | write R0 in decimal |
//! | 0x33 | INN  | prompt `d? `, read a decimal number into R0 |
//! | 0x43 | RND  | put a pseudo-random number into R0 |
//!
//! A service routine does not change the program counter.
use tracing::{event, Level};

use base::instruction::Instruction;

use crate::alarm::Alarm;
use crate::console::Console;
use crate::control::Machine;
use crate::state::to_word;

const OUT: u8 = 0x21;
const PUTS: u8 = 0x22;
const IN: u8 = 0x23;
const HALT: u8 = 0x25;
const OUTN: u8 = 0x31;
const INN: u8 = 0x33;
const RND: u8 = 0x43;

impl Machine {
    pub(crate) fn op_trap(
        &mut self,
        inst: Instruction,
        address: u16,
        console: &mut dyn Console,
    ) -> Result<(), Alarm> {
        let vector = inst.trap_vector();
        match vector {
            OUT => {
                let [_, low] = self.state.register_word(0).to_be_bytes();
                console.write_bytes(&[low])?;
            }
            PUTS => self.puts(console)?,
            IN => {
                console.write_bytes(b"? ")?;
                // At end of input R0 is set to 0.
                let byte = console.read_byte()?.unwrap_or(0);
                self.state.set_register(0, i16::from(byte));
            }
            HALT => {
                self.state.executing = false;
            }
            OUTN => {
                console.write_bytes(self.state.register(0).to_string().as_bytes())?;
            }
            INN => {
                console.write_bytes(b"d? ")?;
                let value = match console.read_line()? {
                    Some(line) => match line.trim().parse::<i32>() {
                        // Out-of-range numbers keep their low 16 bits.
                        #[allow(clippy::cast_possible_truncation)]
                        Ok(n) => n as i16,
                        Err(_) => {
                            event!(Level::WARN, "INN at {address:04X}: {line:?} is not a number");
                            console.write_bytes(b"Input by user was not a number.\n")?;
                            0
                        }
                    },
                    None => 0,
                };
                self.state.set_register(0, value);
            }
            RND => {
                let value = self.random.next_word();
                self.state.set_register(0, value);
            }
            _ => return Err(Alarm::UnknownTrapVector { vector, address }),
        }
        Ok(())
    }

    fn puts(&self, console: &mut dyn Console) -> Result<(), Alarm> {
        let mut text = String::new();
        let mut address = u32::from(self.state.register_word(0));
        loop {
            let word = self.load(address);
            if word == 0 {
                break;
            }
            // Each word holds one code point.  Surrogates are not
            // characters.
            text.push(char::from_u32(u32::from(word)).unwrap_or(char::REPLACEMENT_CHARACTER));
            address += 1;
            if address > u32::from(u16::MAX) {
                break;
            }
        }
        console.write_bytes(text.as_bytes())?;
        Ok(())
    }

    /// Dump the registers.  This is program output, not trace output.
    pub(crate) fn op_dbug(&self, console: &mut dyn Console) -> Result<(), Alarm> {
        event!(
            Level::DEBUG,
            "DBUG: pc={:04X} r0={:04X}",
            self.state.pc,
            to_word(self.state.register(0))
        );
        console.write_bytes(self.state.to_string().as_bytes())?;
        Ok(())
    }
}
