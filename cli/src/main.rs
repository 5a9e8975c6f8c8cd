#![allow(clippy::let_and_return, clippy::let_unit_value)]

mod args;

use std::io;

use anyhow::Context;
use anyhow::Result;

use hwasym::scan::Format;
use hwasym::scan::Scanner;
use hwasym::symbolize::Session;

use clap::Parser as _;

use tracing::subscriber::set_global_default as set_global_subscriber;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::fmt::time::SystemTime;
use tracing_subscriber::FmtSubscriber;


/// Print the effective configuration to stderr.
fn print_config(args: &args::Args) {
    for dir in &args.symbols {
        eprintln!("Looking for symbols in {}", dir.display());
    }
    for prefix in &args.source {
        eprintln!("Stripping source path prefix {prefix}");
    }
    eprintln!("Using symbolizer at {}", args.symbolizer.display());
}

fn symbolize(args: args::Args) -> Result<()> {
    if args.verbosity > 0 {
        let () = print_config(&args);
    }

    let args::Args {
        symbolizer,
        symbols,
        source,
        ignore_tags,
        index,
        debug_protocol,
        html,
        ..
    } = args;

    let session = Session::builder()
        .set_binary_prefixes(symbols)
        .set_source_prefixes(source)
        .enable_protocol_logging(debug_protocol)
        .enable_build_id_index(index)
        .build(symbolizer);
    if index {
        tracing::info!(
            "indexed {} binaries by build ID",
            session.locator().index_len()
        );
    }

    let format = if html { Format::Html } else { Format::Text };
    let mut scanner = Scanner::builder()
        .enable_ignore_tags(ignore_tags)
        .set_format(format)
        .build(session);

    let result = scanner.run(io::stdin().lock(), io::stdout().lock());
    // Shut down the symbolizer in any case, but report input/output
    // errors first.
    let close = scanner.into_session().close();
    let () = result.context("failed to symbolize crash report")?;
    let () = close.context("symbolizer failed")?;
    Ok(())
}


fn main() -> Result<()> {
    let args = args::Args::parse();
    let level = match args.verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_span_events(FmtSpan::FULL)
        .with_timer(SystemTime)
        .with_writer(io::stderr)
        .finish();

    let () =
        set_global_subscriber(subscriber).with_context(|| "failed to set tracing subscriber")?;

    symbolize(args)
}
