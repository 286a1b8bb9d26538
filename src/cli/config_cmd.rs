//! Configuration management CLI commands
//!
//! Provides commands for managing ~/.certbind/config.toml

use anyhow::{Context, Result};
use clap::Subcommand;
use std::path::PathBuf;

use super::config::CliConfig;
use super::output;
use crate::azure::auth::CredentialKind;

/// Keys accepted by `certbind config set`
pub const CONFIG_KEYS: &[&str] = &[
    "subscription_id",
    "tenant_id",
    "client_id",
    "credential",
    "timeout",
    "scratch_dir",
    "management_endpoint",
    "authority_host",
    "vault_url_template",
];

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Initialize configuration file with default values
    Init {
        /// Overwrite existing configuration file
        #[arg(short, long)]
        force: bool,
    },

    /// Show current configuration
    Show {
        /// Output format (json, yaml, or table)
        #[arg(short, long, default_value = "yaml")]
        output: String,
    },

    /// Set a configuration value
    Set {
        /// Configuration key (subscription_id, credential, timeout, scratch_dir, ...)
        key: String,

        /// Configuration value
        value: String,
    },

    /// Get configuration file path
    Path,
}

/// Handle config commands
pub async fn handle_config_command(command: ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Init { force } => init_config(force).await?,
        ConfigCommands::Show { output } => show_config(&output).await?,
        ConfigCommands::Set { key, value } => set_config(&key, &value).await?,
        ConfigCommands::Path => show_config_path().await?,
    }

    Ok(())
}

async fn init_config(force: bool) -> Result<()> {
    let path = CliConfig::config_path()?;

    if path.exists() && !force {
        anyhow::bail!(
            "Configuration file already exists at: {}\nUse --force to overwrite",
            path.display()
        );
    }

    CliConfig::default().save_to_path(&path)?;

    println!("Configuration file created at: {}", path.display());
    println!("\nYou can now set values using:");
    println!("  certbind config set subscription_id <subscription-id>");
    println!("  certbind config set credential <azure-cli|managed-identity|client-secret>");
    println!("  certbind config set scratch_dir <directory>");

    Ok(())
}

async fn show_config(output_format: &str) -> Result<()> {
    let path = CliConfig::config_path()?;

    if !path.exists() {
        println!("No configuration file found at: {}", path.display());
        println!("\nRun 'certbind config init' to create one");
        return Ok(());
    }

    let config = CliConfig::load_from_path(&path)?;

    if output_format == "table" {
        print_config_table(&config);
    } else {
        output::print_output(&config, output_format)?;
    }

    Ok(())
}

/// Apply `key = value` to `config`, validating the value.
pub fn apply_config_value(config: &mut CliConfig, key: &str, value: &str) -> Result<()> {
    match key {
        "subscription_id" => config.subscription_id = Some(value.to_string()),
        "tenant_id" => config.tenant_id = Some(value.to_string()),
        "client_id" => config.client_id = Some(value.to_string()),
        "credential" => {
            let kind: CredentialKind = value.parse()?;
            config.credential = Some(kind);
        }
        "timeout" => {
            let timeout: u64 = value
                .parse()
                .context("Invalid timeout value. Must be a number in seconds")?;
            config.timeout = Some(timeout);
        }
        "scratch_dir" => config.scratch_dir = Some(PathBuf::from(value)),
        "management_endpoint" => config.management_endpoint = Some(value.to_string()),
        "authority_host" => config.authority_host = Some(value.to_string()),
        "vault_url_template" => {
            if !value.contains("{vault}") {
                anyhow::bail!("vault_url_template must contain a {{vault}} placeholder");
            }
            config.vault_url_template = Some(value.to_string());
        }
        _ => {
            anyhow::bail!(
                "Unknown configuration key: '{}'. Valid keys: {}",
                key,
                CONFIG_KEYS.join(", ")
            );
        }
    }
    Ok(())
}

async fn set_config(key: &str, value: &str) -> Result<()> {
    let path = CliConfig::config_path()?;
    let mut config = CliConfig::load_from_path(&path).unwrap_or_default();

    apply_config_value(&mut config, key, value)?;
    config.save_to_path(&path)?;

    println!("Set {} = {}", key, value);
    println!("Configuration saved to: {}", path.display());

    Ok(())
}

async fn show_config_path() -> Result<()> {
    let path = CliConfig::config_path()?;
    println!("{}", path.display());
    Ok(())
}

fn print_config_table(config: &CliConfig) {
    let not_set = || "<not set>".to_string();

    let rows = [
        ("subscription_id", config.subscription_id.clone()),
        ("tenant_id", config.tenant_id.clone()),
        ("client_id", config.client_id.clone()),
        ("credential", config.credential.map(|c| c.to_string())),
        ("timeout", config.timeout.map(|t| format!("{} seconds", t))),
        ("scratch_dir", config.scratch_dir.as_ref().map(|p| p.display().to_string())),
        ("management_endpoint", config.management_endpoint.clone()),
        ("authority_host", config.authority_host.clone()),
        ("vault_url_template", config.vault_url_template.clone()),
    ];

    println!();
    println!("{:<22} {:<50}", "Key", "Value");
    output::print_separator(72);
    for (key, value) in rows {
        println!("{:<22} {}", key, value.unwrap_or_else(not_set));
    }

    println!();
    println!(
        "Config file: {}",
        CliConfig::config_path()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|_| "<unknown>".to_string())
    );
    println!();
}
