//! Author: [Seclususs](https://github.com/seclususs)

use zram_governor::config::defaults::DEFAULT_CONFIG_PATH;
use zram_governor::daemon::status::LogSink;
use zram_governor::daemon::{logging, runtime};
use zram_governor::{ExitStatus, GovernorConfig, GovernorError};

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(
    name = "zram-governor",
    version,
    about = "Sizes and rescales ZRAM compressed swap"
)]
struct Cli {
    /// Configuration file (defaults apply when it does not exist)
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Configure zram swap, then keep rescaling when dynamic scaling is on
    Start {
        /// Stay resident until signalled even when dynamic scaling is off
        #[arg(long)]
        stay: bool,
    },
    /// Swap off every zram device and unload the module
    Stop,
    /// Show memory, the current sizing decision and live devices
    Status {
        /// Emit JSON
        #[arg(long)]
        json: bool,
    },
}

fn exit_with(err: &GovernorError) -> ExitCode {
    log::error!("zram-governor: {err}");
    ExitCode::from(err.exit_status().code())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = match GovernorConfig::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            logging::init(None);
            return exit_with(&runtime::config_failure(e, &mut LogSink));
        }
    };
    logging::init(config.log_level.as_deref());
    let result = match cli.command {
        Command::Start { stay } => runtime::run_governor(&config, stay),
        Command::Stop => runtime::stop_governor(&config).map(|released| {
            println!("released {released} zram swap device(s)");
        }),
        Command::Status { json } => runtime::report_status(&config).and_then(|report| {
            if json {
                let line = serde_json::to_string_pretty(&report).map_err(|e| {
                    GovernorError::Sys(zram_governor::SysError::InvalidInput(e.to_string()))
                })?;
                println!("{line}");
            } else {
                print!("{}", report.render_text());
            }
            Ok(())
        }),
    };
    match result {
        Ok(()) => ExitCode::from(ExitStatus::Success.code()),
        Err(e) => exit_with(&e),
    }
}
