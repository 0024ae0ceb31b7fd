//! Entry point for the supervisor binary.
//!
//! Parses the command line, performs one-shot operations (sample-config)
//! directly, and otherwise resolves the configuration and runs the
//! supervision runtime until interrupted.

use clap::Parser;
use procvd::cli::{Cli, CliCommand, RunArgs, SampleFormat};
use procvd::config::{loader, sample};
use procvd::event::cancellation::CancelToken;
use procvd::executor::os::OsExecutor;
use procvd::executor::ProcessExecutor;
use procvd::logging;
use procvd::output::console::ConsoleSink;
use procvd::output::OutputSink;
use procvd::supervisor::RootSupervisor;
use std::error::Error;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};

fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        CliCommand::SampleConfig { format } => {
            let sample = match format {
                SampleFormat::Ini => sample::sample_ini(),
                SampleFormat::Json => sample::sample_json(),
            };
            print!("{sample}");
            ExitCode::SUCCESS
        }
        CliCommand::Run(args) => match run(args) {
            Ok(()) => {
                info!("supervisor exited");
                ExitCode::SUCCESS
            }
            Err(err) => {
                // Logging may not be up yet when config parsing fails, so
                // also print the plain error.
                error!("{err}");
                eprintln!("procvd: {err}");
                ExitCode::FAILURE
            }
        },
    }
}

fn run(args: RunArgs) -> Result<(), Box<dyn Error>> {
    logging::try_init(&args.log_level)?;
    if args.no_color {
        yansi::disable();
    }

    let config = loader::load_file(&args.config, args.base_dir.as_deref())?;

    let stop = CancelToken::new();
    {
        let stop = stop.clone();
        ctrlc::set_handler(move || {
            info!("termination signal received, stopping all groups");
            stop.cancel();
        })?;
    }

    let executor: Arc<dyn ProcessExecutor> = Arc::new(OsExecutor::new());
    let sink: Arc<dyn OutputSink> = Arc::new(ConsoleSink::new());
    let supervisor = RootSupervisor::new(&config, executor, sink)?;

    info!(
        groups = config.groups.len(),
        order = ?supervisor.graph().start_order(),
        "starting supervision"
    );
    supervisor.run(&stop);
    Ok(())
}
