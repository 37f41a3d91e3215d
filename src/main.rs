use clap::Parser;
use konstruktor::args::{Args, Command};
use konstruktor::{commands, Config, Mode, Result};
use std::process::ExitCode;
use tracing::{debug, error, trace};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let log_level = args.common().log_level();
    init_logger(log_level);
    debug!("Log level set to {}", log_level.to_string().to_lowercase());

    match main_inner(args).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Exiting with error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

pub async fn main_inner(args: Args) -> Result<()> {
    trace!("{args:?}");
    let home = args.common().konstruktor_home().path();

    // When KONSTRUKTOR_IN_TEST_MODE is set and non-empty the mode will be Mode::Testing and an
    // in-memory sheet is used instead of the Google APIs.
    let mode = Mode::from_env();

    let _: () = match args.command() {
        Command::Init(init_args) => {
            commands::init(home, init_args.client_secret(), init_args.sheet_url())
                .await?
                .print()
        }

        Command::Serve(serve_args) => {
            let config = Config::load(home).await?;
            commands::serve(config, mode, serve_args.port())
                .await?
                .print()
        }

        Command::Backup(backup_args) => {
            let config = Config::load(home).await?;
            commands::backup(config, mode, backup_args.name_prefix())
                .await?
                .print()
        }
    };
    Ok(())
}

/// Initializes the tracing subscriber.
pub fn init_logger(level: LevelFilter) {
    let filter = match std::env::var("RUST_LOG").ok() {
        // RUST_LOG exists; use it.
        Some(_) => EnvFilter::from_default_env(),
        // Otherwise only this crate and the request tracing log, at the requested level.
        None => EnvFilter::new(format!(
            "{}={level},{}={level},tower_http={level}",
            env!("CARGO_CRATE_NAME"),
            env!("CARGO_BIN_NAME"),
        )),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
