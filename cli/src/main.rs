use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::io;
use std::path::PathBuf;

use clap::ArgAction::{Append, Set};
use clap::{Parser, ValueEnum};
use tracing::{event, span, Level};
use tracing_subscriber::prelude::*;

use cpu::{Alarm, Console, ExecutionMode, Machine};
use linker::{load_and_link_files, parse_address, LinkerFailure};

mod console;

use console::{FileConsole, TerminalConsole};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum RunMode {
    /// Show only the program's own input and output.
    Quiet,
    /// Show memory and registers before each instruction.
    Trace,
    /// As trace, but wait for Enter before each instruction.
    Step,
}

impl From<RunMode> for ExecutionMode {
    fn from(mode: RunMode) -> ExecutionMode {
        match mode {
            RunMode::Quiet => ExecutionMode::Quiet,
            RunMode::Trace => ExecutionMode::Trace,
            RunMode::Step => ExecutionMode::Step,
        }
    }
}

/// Simulator for the 16-bit machine: links the given object files
/// and runs the result.
#[derive(Parser, Debug)]
#[clap(version, about, long_about = None)]
struct Cli {
    /// Object files to load, in placement order.
    #[clap(action = Append, required = true)]
    inputs: Vec<PathBuf>,

    /// Write program and trace output to this file instead of the
    /// terminal.
    #[clap(action = Set, short = 'o', long)]
    output: Option<PathBuf>,

    #[clap(action = Set, short = 'r', long, value_enum, default_value_t = RunMode::Quiet)]
    run_mode: RunMode,

    /// Load address for the first module, if it is relocatable
    /// (x3000, 0x3000 or 12288).
    #[clap(action = Set, short = 'b', long, value_parser = parse_address)]
    base: Option<u16>,

    /// Stop the program after this many instructions.
    #[clap(action = Set, long)]
    max_instructions: Option<u64>,

    /// Seed for the RND trap, to make runs repeatable.
    #[clap(action = Set, long)]
    seed: Option<u64>,
}

#[derive(Debug)]
enum Fail {
    LinkFail(LinkerFailure),
    SimFail(Alarm),
    OutputFailure { filename: PathBuf, error: io::Error },
    InitialisationFailure(String),
}

impl Display for Fail {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            Fail::LinkFail(linker_failure) => linker_failure.fmt(f),
            Fail::SimFail(alarm) => alarm.fmt(f),
            Fail::OutputFailure { filename, error } => {
                write!(f, "Cannot write {}: {error}", filename.display())
            }
            Fail::InitialisationFailure(msg) => f.write_str(msg.as_str()),
        }
    }
}

impl Error for Fail {}

/// Reject option combinations which make no sense.
fn check_options(cli: &Cli) -> Result<(), Fail> {
    if cli.run_mode == RunMode::Step && cli.output.is_some() {
        return Err(Fail::InitialisationFailure(
            "Executing in step mode with an output file is not allowed.".to_string(),
        ));
    }
    Ok(())
}

fn simulate(cli: &Cli, console: &mut dyn Console) -> Result<(), Fail> {
    let image = load_and_link_files(&cli.inputs, cli.base).map_err(Fail::LinkFail)?;
    event!(
        Level::INFO,
        "loaded {} starting at {:04X}",
        image.segment_name.trim_end(),
        image.start_address
    );
    let mut machine = Machine::new(image.memory, image.start_address);
    if let Some(seed) = cli.seed {
        machine = machine.with_seed(seed);
    }
    machine.set_instruction_limit(cli.max_instructions);
    machine
        .run(cli.run_mode.into(), console)
        .map_err(Fail::SimFail)?;
    Ok(())
}

fn run_simulator() -> Result<(), Fail> {
    let cli = Cli::parse();

    // RUST_LOG selects which trace messages get printed.
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr);
    let filter_layer = match tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new("warn"))
    {
        Err(e) => {
            return Err(Fail::InitialisationFailure(format!(
                "failed to initialise tracing filter (perhaps there is a problem with environment variables): {e}"
            )));
        }
        Ok(layer) => layer,
    };

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();

    check_options(&cli)?;
    let span = span!(Level::ERROR, "sim16", inputs=?cli.inputs, mode=?cli.run_mode);
    let _enter = span.enter();
    let result = match &cli.output {
        Some(filename) => {
            let output_failure = |error| Fail::OutputFailure {
                filename: filename.clone(),
                error,
            };
            let mut file_console = FileConsole::create(filename).map_err(output_failure)?;
            let result = simulate(&cli, &mut file_console);
            // Whatever the program wrote before failing is still kept.
            file_console.finish().map_err(output_failure)?;
            result
        }
        None => simulate(&cli, &mut TerminalConsole::new()),
    };
    if let Err(e) = &result {
        event!(Level::ERROR, "simulation failed: {:?}", e);
    }
    result
}

fn main() {
    match run_simulator() {
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
        Ok(()) => {
            std::process::exit(0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).expect("arguments should be accepted")
    }

    #[test]
    fn test_defaults() {
        let cli = parse(&["sim16", "a.obj", "b.obj"]);
        assert_eq!(cli.inputs, vec![PathBuf::from("a.obj"), PathBuf::from("b.obj")]);
        assert_eq!(cli.run_mode, RunMode::Quiet);
        assert_eq!(cli.base, None);
        assert_eq!(cli.max_instructions, None);
        assert!(check_options(&cli).is_ok());
    }

    #[test]
    fn test_base_address_forms() {
        assert_eq!(parse(&["sim16", "-b", "x3000", "a.obj"]).base, Some(0x3000));
        assert_eq!(parse(&["sim16", "--base", "0x4000", "a.obj"]).base, Some(0x4000));
        assert!(Cli::try_parse_from(["sim16", "-b", "x10000", "a.obj"]).is_err());
    }

    #[test]
    fn test_an_input_is_required() {
        assert!(Cli::try_parse_from(["sim16"]).is_err());
    }

    #[test]
    fn test_step_mode_needs_the_terminal() {
        let cli = parse(&["sim16", "-r", "step", "-o", "out.txt", "a.obj"]);
        match check_options(&cli) {
            Err(Fail::InitialisationFailure(msg)) => assert_eq!(
                msg,
                "Executing in step mode with an output file is not allowed."
            ),
            other => panic!("expected step mode to be rejected, got {other:?}"),
        }
        let cli = parse(&["sim16", "-r", "trace", "-o", "out.txt", "a.obj"]);
        assert!(check_options(&cli).is_ok());
    }
}
