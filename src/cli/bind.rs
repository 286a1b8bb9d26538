//! The `certbind bind` command.

use anyhow::{Context, Result};
use clap::builder::NonEmptyStringValueParser;
use clap::Args;
use std::path::PathBuf;

use super::output::{self, OutputFormat};
use crate::azure::AzureClients;
use crate::certificates::ScratchSpace;
use crate::config::AzureSettings;
use crate::errors::Error;
use crate::observability::log_settings_info;
use crate::orchestrator::{BindingInputs, BindingOptions, BindingOrchestrator};

#[derive(Args, Debug, Clone)]
pub struct BindArgs {
    /// Name of the App Service web app
    #[arg(value_parser = NonEmptyStringValueParser::new())]
    pub app: String,

    /// Custom hostname already added to the app
    #[arg(value_parser = NonEmptyStringValueParser::new())]
    pub hostname: String,

    /// Key Vault holding the certificate and its `<certificate>-password` secret
    #[arg(value_parser = NonEmptyStringValueParser::new())]
    pub vault: String,

    /// Certificate name in the source vault
    #[arg(value_parser = NonEmptyStringValueParser::new())]
    pub certificate: String,

    /// Directory for the repackaged certificate container
    #[arg(long)]
    pub scratch_dir: Option<PathBuf>,

    /// Keep the repackaged container on disk after the import
    #[arg(long)]
    pub keep_scratch: bool,

    /// Delete the imported certificate again if the binding fails
    #[arg(long)]
    pub rollback_on_failure: bool,

    /// Output format (json, yaml, or table)
    #[arg(short, long, default_value = "json")]
    pub output: String,
}

impl BindArgs {
    pub fn inputs(&self) -> BindingInputs {
        BindingInputs {
            app_name: self.app.clone(),
            hostname: self.hostname.clone(),
            source_vault: self.vault.clone(),
            certificate_name: self.certificate.clone(),
        }
    }

    pub fn options(&self) -> BindingOptions {
        BindingOptions {
            keep_scratch: self.keep_scratch,
            rollback_on_failure: self.rollback_on_failure,
        }
    }
}

/// Run one binding and print its report.
pub async fn handle_bind_command(
    args: BindArgs,
    settings: &AzureSettings,
    verbose: bool,
) -> Result<()> {
    let format: OutputFormat = args.output.parse()?;
    log_settings_info(settings);

    let clients = AzureClients::from_settings(settings, verbose)
        .context("Failed to initialise Azure clients")?;
    let orchestrator = BindingOrchestrator::new(
        clients,
        ScratchSpace::new(settings.scratch_dir.clone()),
        args.options(),
    );

    let report = match orchestrator.bind(&args.inputs()).await {
        Ok(report) => report,
        Err(err) => {
            let context = failure_context(&err, &args);
            return Err(anyhow::Error::new(err).context(context));
        }
    };

    output::print_report(&report, format)
}

/// Lookups all run before the import, so a missing resource means nothing was changed.
fn failure_context(err: &Error, args: &BindArgs) -> String {
    let summary =
        format!("Failed to bind certificate '{}' to '{}'", args.certificate, args.hostname);
    if err.is_not_found() {
        format!("{}; no changes were made", summary)
    } else {
        summary
    }
}
