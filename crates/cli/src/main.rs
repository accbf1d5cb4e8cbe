//! conductor CLI: the main entry point.
//!
//! Commands:
//! - `replay`: Run one orchestration against a recorded chat script
//! - `tools`: List the built-in tools and their parameters
//! - `config`: Validate, show or initialize configuration

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use conductor_config::AppConfig;

mod commands;

#[derive(Parser)]
#[command(
    name = "conductor",
    about = "conductor: tool-using agent orchestration",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to ~/.conductor/config.toml)
    #[arg(short, long, global = true, env = "CONDUCTOR_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one orchestration, replaying chat replies from a script
    Replay(commands::replay::ReplayArgs),

    /// List the built-in tools
    Tools,

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config_cmd::ConfigAction,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config_path = cli.config.clone().unwrap_or_else(AppConfig::config_path);

    // Logging comes up before the config is validated, so fall back to
    // defaults when it does not load; the command reports the error.
    let loaded = AppConfig::load_with_env(&config_path);
    let logging = loaded
        .as_ref()
        .map(|c| c.logging.clone())
        .unwrap_or_default();
    init_tracing(&logging.level, logging.json, cli.verbose);

    match cli.command {
        Commands::Replay(args) => commands::replay::run(loaded?, args).await?,
        Commands::Tools => commands::tools::run(&loaded?)?,
        Commands::Config { action } => commands::config_cmd::run(action, &config_path, loaded)?,
    }

    Ok(())
}

fn init_tracing(level: &str, json: bool, verbose: bool) {
    let filter = if verbose { "debug" } else { level };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));

    // Logs go to stderr; stdout carries command output.
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
