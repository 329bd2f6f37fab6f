//! mixlane CLI
//!
//! Command-line front end for offline mixdowns.

use anyhow::Result;
use clap::Parser;
use env_logger::Env;
use log::info;

use mixlane::cli::{commands, Cli, Commands};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logger
    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_filter)).init();

    info!("mixlane v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Some(cmd) => {
            let config = commands::load_config(cli.config.as_deref())?;
            handle_command(cmd, config)
        }
        None => {
            println!("mixlane v{}", env!("CARGO_PKG_VERSION"));
            println!("Use --help for available commands");
            Ok(())
        }
    }
}

fn handle_command(cmd: Commands, config: mixlane::EngineConfig) -> Result<()> {
    match cmd {
        Commands::Render {
            project,
            output,
            codec,
            duration,
        } => commands::render(config, &project, &output, &codec, duration).map(|_| ()),
        Commands::Inspect { path } => commands::inspect(&path),
    }
}
