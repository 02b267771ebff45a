//! Alarms stop the machine.
use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::io;

/// Describes why execution stopped other than by a HALT trap.
#[derive(Debug)]
pub enum Alarm {
    /// The fetched word has no handler for its opcode.
    InvalidOpcode { opcode: u8, address: u16 },
    /// A TRAP instruction named a vector with no service routine.
    UnknownTrapVector { vector: u8, address: u16 },
    /// A store computed an effective address beyond the end of memory.
    WriteOutOfRange { address: u32 },
    /// The configured instruction limit was reached before the
    /// program halted.
    InstructionLimitReached(u64),
    /// Reading from or writing to the console failed.
    Console(io::Error),
}

impl Display for Alarm {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            Alarm::InvalidOpcode { opcode, address } => write!(
                f,
                "Execution error: no handler for opcode 0x{opcode:X} at address 0x{address:04X}"
            ),
            Alarm::UnknownTrapVector { vector, address } => write!(
                f,
                "Execution error: unknown trap vector 0x{vector:02X} at address 0x{address:04X}"
            ),
            Alarm::WriteOutOfRange { address } => write!(
                f,
                "Execution error: write to address 0x{address:X} is outside memory"
            ),
            Alarm::InstructionLimitReached(limit) => write!(
                f,
                "Execution error: program did not halt within {limit} instructions"
            ),
            Alarm::Console(e) => write!(f, "Execution error: console I/O failed: {e}"),
        }
    }
}

impl Error for Alarm {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Alarm::Console(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Alarm {
    fn from(e: io::Error) -> Alarm {
        Alarm::Console(e)
    }
}

#[test]
fn test_alarm_display() {
    assert_eq!(
        Alarm::UnknownTrapVector {
            vector: 0x99,
            address: 0x3004
        }
        .to_string(),
        "Execution error: unknown trap vector 0x99 at address 0x3004"
    );
    assert_eq!(
        Alarm::WriteOutOfRange { address: 0x1_0002 }.to_string(),
        "Execution error: write to address 0x10002 is outside memory"
    );
}
