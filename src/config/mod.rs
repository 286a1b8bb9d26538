//! # Configuration Management
//!
//! Validated runtime settings. The CLI resolves flags, the config file and
//! environment variables into an [`AzureSettings`] before anything talks to
//! Azure.

pub mod settings;

pub use settings::{AzureSettings, DEFAULT_MANAGEMENT_ENDPOINT, DEFAULT_TIMEOUT_SECONDS};
