use std::path::PathBuf;

use clap::{Parser, Subcommand};
use reserve_server::core::config::{BoxError, load_env_file};
use reserve_server::{Config, Server, init_logger};

#[derive(Parser, Debug)]
#[command(name = "reserve-server", version, about = "Restaurant table reservation server")]
struct Cli {
    /// Env file to load instead of `.env`
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Command {
    /// Serve the HTTP API (the default)
    Start,
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let cli = Cli::parse();
    let env_file = load_env_file(cli.config.as_deref())?;

    let config = Config::from_env()?;
    init_logger(&config.log_level, config.log_json, config.log_dir.as_deref())?;

    tracing::info!(
        environment = %config.environment,
        store = ?config.store,
        env_file = ?env_file,
        "Starting reservation server"
    );

    match cli.command.unwrap_or(Command::Start) {
        Command::Start => Server::new(config).run().await?,
    }
    Ok(())
}
