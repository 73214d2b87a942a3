use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "dojo", about = "Practice-mode trainer for the supported game", version)]
pub struct Cli {
    /// Log filter, e.g. "debug" or "dojo_core=trace".
    #[arg(long, env = "DOJO_LOG", default_value = "info", global = true)]
    pub log: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Attach to the game and run the trainer until the game exits.
    Run {
        /// Settings file (JSON). Defaults are used when absent.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Executable name of the game process.
        #[arg(long, default_value = "efz.exe")]
        process: String,
    },

    /// Operate on exported macro text files.
    #[command(subcommand)]
    Macro(MacroCommand),
}

#[derive(Debug, Subcommand)]
pub enum MacroCommand {
    /// Parse a macro file and report its contents.
    Check { file: PathBuf },

    /// Horizontally mirror a macro file (left/right swapped).
    Mirror {
        file: PathBuf,

        /// Output path; defaults to overwriting the input.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}
