//! Consoles connecting the simulated machine to a terminal or a file.
use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::Path;

use termcolor::{self, ColorChoice, ColorSpec, StandardStream, WriteColor};
use tracing::{event, Level};

use cpu::Console;

fn get_colour_choice() -> termcolor::ColorChoice {
    if atty::is(atty::Stream::Stdout) {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    }
}

fn read_stdin_byte() -> io::Result<Option<u8>> {
    let mut buf = [0_u8; 1];
    match io::stdin().lock().read(&mut buf)? {
        0 => Ok(None),
        _ => Ok(Some(buf[0])),
    }
}

/// Program output goes to stdout.  Trace output is shown in a
/// different colour when stdout is a terminal.
pub(crate) struct TerminalConsole {
    stream: StandardStream,
    trace_colour: ColorSpec,
}

impl TerminalConsole {
    pub(crate) fn new() -> TerminalConsole {
        let mut trace_colour = ColorSpec::new();
        trace_colour.set_fg(Some(termcolor::Color::Cyan));
        TerminalConsole {
            stream: StandardStream::stdout(get_colour_choice()),
            trace_colour,
        }
    }
}

impl Console for TerminalConsole {
    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        // Prompts must be visible before we block.
        self.stream.flush()?;
        read_stdin_byte()
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.stream.write_all(bytes)?;
        self.stream.flush()
    }

    fn write_trace(&mut self, text: &str) -> io::Result<()> {
        if let Err(e) = self.stream.set_color(&self.trace_colour) {
            event!(Level::ERROR, "Failed to select trace colour: {}", e);
        }
        self.stream.write_all(text.as_bytes())?;
        if let Err(e) = self.stream.reset() {
            event!(Level::ERROR, "Failed to reset terminal: {}", e);
        }
        self.stream.flush()
    }
}

/// Program and trace output both go to a file; input still comes
/// from stdin.
pub(crate) struct FileConsole {
    out: BufWriter<File>,
}

impl FileConsole {
    pub(crate) fn create(path: &Path) -> io::Result<FileConsole> {
        Ok(FileConsole {
            out: BufWriter::new(File::create(path)?),
        })
    }

    pub(crate) fn finish(mut self) -> io::Result<()> {
        self.out.flush()
    }
}

impl Console for FileConsole {
    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        read_stdin_byte()
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.out.write_all(bytes)
    }
}
