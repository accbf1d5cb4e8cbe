//! `conductor config`: Configuration management commands.

use clap::Subcommand;
use std::path::Path;

use conductor_config::{AppConfig, ConfigError};

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Validate the config file and environment overrides
    Validate,

    /// Print the effective configuration as TOML
    Show,

    /// Print the config file path
    Path,

    /// Write a default config file if none exists
    Init,
}

pub fn run(
    action: ConfigAction,
    path: &Path,
    loaded: Result<AppConfig, ConfigError>,
) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ConfigAction::Validate => validate(path, loaded),
        ConfigAction::Show => {
            println!("{}", toml::to_string_pretty(&loaded?)?);
            Ok(())
        }
        ConfigAction::Path => {
            println!("{}", path.display());
            Ok(())
        }
        ConfigAction::Init => init(path),
    }
}

fn validate(path: &Path, loaded: Result<AppConfig, ConfigError>) -> Result<(), Box<dyn std::error::Error>> {
    println!("Validating {}...", path.display());

    let config = match loaded {
        Ok(config) => config,
        Err(e) => {
            println!("   ❌ {e}");
            return Err(e.into());
        }
    };
    println!("   ✅ Config parsed and validated");

    let warnings = warnings(&config);
    if !warnings.is_empty() {
        println!();
        for w in &warnings {
            println!("   ⚠️  {w}");
        }
    }

    println!();
    println!("   Max tool calls:  {}", config.agent.max_tool_calls);
    println!("   Parallel tools:  {}", config.agent.allow_parallel_tool_calls);
    println!("   Tool timeout:    {} ms", config.tools.timeout_ms);
    println!("   Retrieval tool:  {}", config.tools.retrieval_tool);
    println!(
        "   Pricing model:   {}",
        config.telemetry.model.as_deref().unwrap_or("(from reply)")
    );
    Ok(())
}

/// Settings that load fine but probably are not what the user wants.
fn warnings(config: &AppConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if config.tools.github_token.is_none() {
        warnings.push("No GitHub token: code_search is disabled".to_string());
    }
    if config.agent.use_retrieval_context && config.agent.min_relevance_score >= 0.9 {
        warnings.push(format!(
            "min_relevance_score {} will drop most pre-fetched passages",
            config.agent.min_relevance_score
        ));
    }
    if config.telemetry.model.is_none() {
        warnings.push("No telemetry.model: replies without a model name are not priced".to_string());
    }
    warnings
}

fn init(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    if path.exists() {
        println!("Config already exists at {}", path.display());
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, AppConfig::default_toml())?;
    println!("Wrote default config to {}", path.display());
    Ok(())
}
