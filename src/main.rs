use anyhow::Result;
use clap::{Parser, Subcommand};
use std::ffi::OsString;

mod args;
mod config;
mod env;
mod error;
mod http;
mod label;
mod metrics;
mod query;
mod report;
mod rule;
mod sa360;
mod status;
mod store;
mod ui;

use crate::args::CLIArgs;

const DEFAULT_DEV_VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), "-dev");
const CLI_VERSION: &str = match option_env!("SAL_VERSION_STRING") {
    Some(version) => version,
    None => DEFAULT_DEV_VERSION,
};

#[derive(Debug, Parser)]
#[command(
    name = "sal",
    about = "Search Ads 360 product custom-labeling CLI",
    version = CLI_VERSION
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Extract the shopping performance report
    Report(CLIArgs<report::ReportArgs>),
    /// Extract the report and assign product custom labels
    Label(CLIArgs<label::LabelArgs>),
    /// Manage sal configuration
    Config(CLIArgs<config::ConfigArgs>),
}

#[tokio::main]
async fn main() -> Result<()> {
    let argv: Vec<OsString> = std::env::args_os().collect();
    env::bootstrap_from_args(&argv)?;
    let cli = Cli::parse_from(argv);

    match cli.command {
        Commands::Report(cmd) => report::run(cmd.base, cmd.args).await?,
        Commands::Label(cmd) => label::run(cmd.base, cmd.args).await?,
        Commands::Config(cmd) => config::run(cmd.base, cmd.args)?,
    }

    Ok(())
}
