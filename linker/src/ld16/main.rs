use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::path::PathBuf;

use clap::ArgAction::{Append, Set};
use clap::Parser;
use tracing::{event, span, Level};
use tracing_subscriber::prelude::*;

use linker::{link_files, parse_address, LinkerFailure};

/// Linker for the 16-bit toolchain: combines object files into one
/// absolute object file.
#[derive(Parser, Debug)]
#[clap(version, about, long_about = None)]
struct Cli {
    /// Object files to link, in placement order.
    #[clap(action = Append, required = true)]
    inputs: Vec<PathBuf>,

    /// File to which the linked object file is written
    #[clap(action = Set, short = 'o', long)]
    output: PathBuf,

    /// Load address for the first module, if it is relocatable
    /// (x3000, 0x3000 or 12288).
    #[clap(action = Set, short = 'b', long, value_parser = parse_address)]
    base: Option<u16>,
}

#[derive(Debug)]
enum Fail {
    LinkFail(LinkerFailure),
    InitialisationFailure(String),
}

impl Display for Fail {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            Fail::LinkFail(linker_failure) => linker_failure.fmt(f),
            Fail::InitialisationFailure(msg) => f.write_str(msg.as_str()),
        }
    }
}

impl Error for Fail {}

fn run_linker() -> Result<(), Fail> {
    let cli = Cli::parse();

    // RUST_LOG selects which trace messages get printed.
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr);
    let filter_layer = match tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new("info"))
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

    let span = span!(Level::ERROR, "ld16", inputs=?cli.inputs, output=?cli.output);
    let _enter = span.enter();
    let result = link_files(&cli.inputs, &cli.output, cli.base).map_err(Fail::LinkFail);
    if let Err(e) = &result {
        event!(Level::ERROR, "link failed: {:?}", e);
    } else {
        event!(Level::INFO, "link succeeded");
    }
    result
}

fn main() {
    match run_linker() {
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
        Ok(()) => {
            std::process::exit(0);
        }
    }
}
