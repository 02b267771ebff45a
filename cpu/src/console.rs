//! The simulated machine's connection to its operator.
use std::collections::VecDeque;
use std::io;

/// A byte-oriented console.  The simulator reads and writes the
/// console only from TRAP service routines and, in trace and step
/// modes, to show the machine's state.
pub trait Console {
    /// Read one byte; `None` at end of input.
    ///
    /// # Errors
    ///
    /// Any failure of the underlying input.
    fn read_byte(&mut self) -> io::Result<Option<u8>>;

    /// # Errors
    ///
    /// Any failure of the underlying output.
    fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Write trace or step display text.
    ///
    /// # Errors
    ///
    /// Any failure of the underlying output.
    fn write_trace(&mut self, text: &str) -> io::Result<()> {
        self.write_bytes(text.as_bytes())
    }

    /// Read one line, without its terminator; `None` if input ended
    /// before anything was read.
    ///
    /// # Errors
    ///
    /// Any failure of the underlying input.
    fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut line: Vec<u8> = Vec::new();
        loop {
            match self.read_byte()? {
                None if line.is_empty() => return Ok(None),
                None | Some(b'\n') => break,
                Some(b) => line.push(b),
            }
        }
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        Ok(Some(String::from_utf8_lossy(&line).into_owned()))
    }
}

/// A console whose input is given in advance and whose output is
/// collected in memory.  Trace output is kept apart from what the
/// program itself writes.
#[derive(Debug, Default, Clone)]
pub struct BufferConsole {
    input: VecDeque<u8>,
    output: Vec<u8>,
    trace: Vec<u8>,
}

impl BufferConsole {
    #[must_use]
    pub fn new() -> BufferConsole {
        BufferConsole::default()
    }

    #[must_use]
    pub fn with_input(input: &[u8]) -> BufferConsole {
        BufferConsole {
            input: input.iter().copied().collect(),
            ..BufferConsole::default()
        }
    }

    #[must_use]
    pub fn output(&self) -> &[u8] {
        &self.output
    }

    #[must_use]
    pub fn output_text(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }

    #[must_use]
    pub fn trace_text(&self) -> String {
        String::from_utf8_lossy(&self.trace).into_owned()
    }
}

impl Console for BufferConsole {
    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        Ok(self.input.pop_front())
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.output.extend_from_slice(bytes);
        Ok(())
    }

    fn write_trace(&mut self, text: &str) -> io::Result<()> {
        self.trace.extend_from_slice(text.as_bytes());
        Ok(())
    }
}

#[test]
fn test_read_line() {
    let mut console = BufferConsole::with_input(b"12\r\n-7\nlast");
    assert_eq!(console.read_line().ok().flatten().as_deref(), Some("12"));
    assert_eq!(console.read_line().ok().flatten().as_deref(), Some("-7"));
    assert_eq!(console.read_line().ok().flatten().as_deref(), Some("last"));
    assert_eq!(console.read_line().ok().flatten(), None);
}
