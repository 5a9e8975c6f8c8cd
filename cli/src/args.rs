use std::path::PathBuf;

use anyhow::bail;
use anyhow::Result;

use clap::ArgAction;
use clap::Parser;


/// Parse a directory containing binaries with symbols.
fn parse_symbols_dir(s: &str) -> Result<PathBuf> {
    let path = PathBuf::from(s);
    if !path.is_dir() {
        bail!("symbol directory `{s}` does not exist or is not a directory")
    }
    Ok(path)
}


/// Symbolize a HWASan crash report read from standard input.
///
/// Backtrace frames are resolved to functions and source locations and
/// faulting stack accesses are attributed to the local variables they
/// likely referenced.
#[derive(Debug, Parser)]
#[clap(version)]
pub struct Args {
    /// The path to an `llvm-symbolizer` compatible binary.
    #[arg(long, value_name = "PATH")]
    pub symbolizer: PathBuf,
    /// A directory to search for binaries with symbols (can be supplied
    /// multiple times, earlier directories take precedence).
    #[arg(long = "symbols", value_name = "DIR", required = true, value_parser = parse_symbols_dir)]
    pub symbols: Vec<PathBuf>,
    /// A source path prefix to strip from reported locations (can be
    /// supplied multiple times).
    #[arg(long = "source", value_name = "PREFIX")]
    pub source: Vec<String>,
    /// Attribute accesses to stack objects irrespective of tags.
    #[arg(long)]
    pub ignore_tags: bool,
    /// Index all binaries below the symbol directories by build ID
    /// before processing.
    #[arg(long)]
    pub index: bool,
    /// Echo all lines exchanged with the symbolizer to stderr.
    #[arg(short = 'd', long = "debug-protocol")]
    pub debug_protocol: bool,
    /// Emit HTML instead of plain text.
    #[arg(long)]
    pub html: bool,
    /// Increase verbosity (can be supplied multiple times).
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbosity: u8,
}
