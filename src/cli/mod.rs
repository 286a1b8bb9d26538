//! # Command Line Interface
//!
//! The `certbind` binary: `bind` runs the certificate binding workflow and
//! `config` manages ~/.certbind/config.toml.

pub mod bind;
pub mod config;
pub mod config_cmd;
pub mod output;

use anyhow::Context;
use clap::{Parser, Subcommand};

use crate::azure::auth::CredentialKind;
use crate::observability::{init_logging, LogFormat};

#[derive(Parser)]
#[command(name = "certbind")]
#[command(about = "Bind Key Vault certificates to App Service custom hostnames")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log line format (text or json)
    #[arg(long, global = true, default_value = "text")]
    pub log_format: LogFormat,

    /// Azure subscription id
    #[arg(long, global = true)]
    pub subscription: Option<String>,

    /// Azure AD tenant id
    #[arg(long, global = true)]
    pub tenant: Option<String>,

    /// Service principal or user-assigned identity client id
    #[arg(long, global = true)]
    pub client_id: Option<String>,

    /// Credential source (azure-cli, managed-identity or client-secret)
    #[arg(long, global = true)]
    pub credential: Option<CredentialKind>,

    /// Request timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Bind a certificate from Key Vault to a web app hostname
    Bind(bind::BindArgs),

    /// Configuration management commands
    Config {
        #[command(subcommand)]
        command: config_cmd::ConfigCommands,
    },
}

/// Run CLI commands
pub async fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.log_format);

    match cli.command {
        Commands::Bind(args) => {
            let file = config::CliConfig::load()?;
            let flags = config::SettingsFlags {
                subscription_id: cli.subscription,
                tenant_id: cli.tenant,
                client_id: cli.client_id,
                credential: cli.credential,
                timeout: cli.timeout,
                scratch_dir: args.scratch_dir.clone(),
            };
            let settings = config::resolve_settings(flags, &file, |key| std::env::var(key).ok())
                .context("Failed to resolve settings")?;

            bind::handle_bind_command(args, &settings, cli.verbose).await?
        }
        Commands::Config { command } => config_cmd::handle_config_command(command).await?,
    }

    Ok(())
}
