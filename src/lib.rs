//! # certbind
//!
//! Binds a TLS certificate stored in Azure Key Vault to a custom hostname of an
//! Azure App Service web app.
//!
//! ## Architecture
//!
//! ```text
//! CLI → BindingOrchestrator → ResourceApi / VaultApi / WebApi → Azure REST APIs
//!                ↓
//!        certificates (PKCS#12 repackaging, scratch file)
//! ```
//!
//! The orchestrator resolves the web app and its managed identity, reads the
//! certificate and its `<certificate>-password` secret from the source vault,
//! finds a vault in the app's resource group whose access policy already
//! admits that identity, imports a password-protected copy of the certificate
//! there and creates an SNI binding for the hostname.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use certbind::azure::AzureClients;
//! use certbind::certificates::ScratchSpace;
//! use certbind::config::AzureSettings;
//! use certbind::orchestrator::{BindingInputs, BindingOptions, BindingOrchestrator};
//!
//! # async fn run() -> certbind::Result<()> {
//! let settings = AzureSettings { subscription_id: "sub-1".into(), ..Default::default() };
//! settings.validate()?;
//!
//! let clients = AzureClients::from_settings(&settings, false)?;
//! let orchestrator = BindingOrchestrator::new(
//!     clients,
//!     ScratchSpace::new(settings.scratch_dir.clone()),
//!     BindingOptions::default(),
//! );
//!
//! let report = orchestrator
//!     .bind(&BindingInputs {
//!         app_name: "web-01".into(),
//!         hostname: "shop.example.com".into(),
//!         source_vault: "kv-shared".into(),
//!         certificate_name: "shop-cert".into(),
//!     })
//!     .await?;
//! println!("bound {} with {}", report.hostname, report.thumbprint);
//! # Ok(())
//! # }
//! ```

pub mod azure;
pub mod certificates;
pub mod cli;
pub mod config;
pub mod domain;
pub mod errors;
pub mod observability;
pub mod orchestrator;

// Re-export commonly used types and traits
pub use config::AzureSettings;
pub use errors::{Error, Result};
pub use orchestrator::{BindingInputs, BindingOptions, BindingOrchestrator};

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name from Cargo.toml
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
