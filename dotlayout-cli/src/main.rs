mod app;
mod commands;
mod output;

use anyhow::Context;
use clap::Parser;

use crate::app::{Cli, Command};

fn main() -> anyhow::Result<()> {
    ctrlc::set_handler(|| {
        eprintln!("\nCancelled.");
        std::process::exit(130);
    })
    .context("failed to set Ctrl+C handler")?;

    let cli = Cli::parse();

    // dotlayout info+ on stderr; --verbose enables debug; RUST_LOG overrides
    let level = if cli.global.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_module("dotlayout", level)
        .parse_default_env()
        .target(env_logger::Target::Stderr)
        .format_timestamp(None)
        .format_module_path(false)
        .format_target(false)
        .init();

    match &cli.command {
        Command::Dump {
            path,
            depth,
            leaves,
        } => commands::dump::run(path, *depth, *leaves, &cli.global),
        Command::Diff {
            left,
            right,
            summary,
            no_pdb,
        } => commands::diff::run(left, right, *summary, !*no_pdb, &cli.global),
        Command::Tables { path } => commands::tables::run(path, &cli.global),
        Command::Check { path } => commands::check::run(path, &cli.global),
    }
}
