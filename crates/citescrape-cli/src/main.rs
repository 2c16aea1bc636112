//! citescrape - command-line entry point.

use citescrape_cli::commands;
use citescrape_cli::{init_logging, AppConfig, Cli, Command};
use clap::Parser;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> citescrape_cli::Result<()> {
    let config_path = AppConfig::locate(cli.config.as_deref())?;
    let config = AppConfig::load(&config_path)?;
    init_logging(cli.verbose || config.debug_mode);

    match cli.command {
        Command::Run(args) => commands::execute_run(args, &config, &config_path).await?,
        Command::Templates(args) => commands::execute_templates(args)?,
        Command::Schema(args) => commands::execute_schema(args, &config, &config_path)?,
    }

    Ok(())
}
