mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command};

fn main() -> Result<()> {
    let args = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&args.log).unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match args.command {
        Command::Run { config, process } => commands::run::execute(config.as_deref(), &process),
        Command::Macro(cmd) => commands::macro_file::execute(cmd),
    }
}
