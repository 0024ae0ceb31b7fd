//! Command line interface for the supervisor binary.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Command line arguments, as parsed by [`clap`].
#[derive(Parser, Debug)]
#[command(name = "procvd", version, about = "Process group supervisor")]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Subcommand, Debug)]
pub enum CliCommand {
    /// Launch the process groups described by a configuration file and
    /// supervise them until interrupted.
    Run(RunArgs),
    /// Print a sample configuration file to stdout.
    SampleConfig {
        #[arg(long, value_enum, default_value = "ini")]
        format: SampleFormat,
    },
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Configuration file (.json, .ini, .conf or .cfg).
    #[arg(short, long)]
    pub config: PathBuf,

    /// Directory relative paths resolve against; defaults to the config
    /// file's directory.
    #[arg(long)]
    pub base_dir: Option<PathBuf>,

    /// Disable colorized console output.
    #[arg(long)]
    pub no_color: bool,

    /// Log level for supervisor diagnostics on stderr.
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum SampleFormat {
    Ini,
    Json,
}
