//! Configuration view and validation commands (`civic-hero config`).

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use civic_hero::config::{API_KEY_ENV, CONFIG_DIR, CONFIG_FILE, CivicConfig, CivicToml};

use super::super::ConfigCommands;

pub fn cmd_config(config: &CivicConfig, command: Option<ConfigCommands>) -> Result<()> {
    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("civic-hero Configuration");
            println!("========================");
            println!();
            if config.config_path.exists() {
                println!("Config file: {}", config.config_path.display());
            } else {
                println!(
                    "No civic.toml found at {}; using defaults.",
                    config.config_path.display()
                );
            }
            println!();
            println!("Effective values (with env/CLI overrides):");
            println!();
            let rendered =
                toml::to_string_pretty(&config.toml).context("Failed to render configuration")?;
            print!("{}", rendered);
            println!();
            let key_state = if CivicConfig::api_key().is_some() {
                "set"
            } else {
                "not set"
            };
            println!("{}: {}", API_KEY_ENV, key_state);
            println!();
        }
        Some(ConfigCommands::Validate) => {
            println!();
            println!("Validating configuration...");
            println!();

            let warnings = config.validate();
            if warnings.is_empty() {
                println!("Configuration is valid.");
            } else {
                println!("Configuration warnings:");
                for warning in warnings {
                    println!("  - {}", warning);
                }
            }
            println!();
        }
        Some(ConfigCommands::Init { force }) => {
            cmd_config_init(Some(&config.config_path), force)?;
        }
    }

    Ok(())
}

/// Write a default civic.toml. Runs before any configuration is loaded.
pub fn cmd_config_init(config_path: Option<&Path>, force: bool) -> Result<()> {
    let config_path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(CONFIG_DIR).join(CONFIG_FILE));

    if config_path.exists() && !force {
        println!("civic.toml already exists at {}", config_path.display());
        println!("Use --force to overwrite it.");
        return Ok(());
    }

    CivicToml::default().save(&config_path)?;

    println!("Created civic.toml at {}", config_path.display());
    println!();
    println!("You can now customize:");
    println!("  - [server] host, port, db_path, dev");
    println!("  - [auth] allow_anonymous_writes");
    println!("  - [estimator] model, base_url, temperature, max_tokens");
    println!("  - [logging] format, filter");
    println!();
    Ok(())
}
