use clap::Parser;
use colored::Colorize;
use eyre::Result;
use std::process;
use tasklist::TaskError;

mod cli;

use cli::Cli;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup tracing
    let level = match cli.verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = cli::run(cli) {
        // Notices are user mistakes, not failures worth a report
        if let Some(notice) = e.downcast_ref::<TaskError>() {
            eprintln!("{}", notice.to_string().yellow());
            process::exit(1);
        }
        return Err(e);
    }

    Ok(())
}
