mod amount;
mod categorizer;
mod cli;
mod error;
mod export;
mod fmt;
mod importer;
mod models;
mod recurring;
mod reports;
mod settings;

use clap::Parser;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};

/// RUST_LOG wins when set; otherwise only this crate logs, at `level`.
fn init_logger(level: LevelFilter) {
    let filter = match std::env::var("RUST_LOG").ok() {
        Some(_) => EnvFilter::from_default_env(),
        None => EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), level)),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logger(cli.log_level);

    let config = cli.config.as_deref();
    let result = match cli.command {
        Commands::Report { file, overrides } => cli::report::run(&file, config, &overrides),
        Commands::Rules => cli::rules::list(config),
        Commands::Init { force } => cli::init::run(config, force),
        Commands::Show { file } => cli::show::run(&file),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
