mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use download_worker::observability;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();
    let config = observability::with_startup_logging(|| commands::load_config(cli.config))?;
    observability::init_tracing(&config.logging)?;

    match cli.command {
        Commands::Run(args) => commands::run(&config, args).await?,
        Commands::Fetch(args) => commands::fetch(&config, args).await?,
        Commands::CheckConfig => commands::check_config(&config)?,
    }

    Ok(())
}
