//! # Structured Logging
//!
//! Span macros and startup logging for the binding workflow.

/// Create a tracing span for one orchestrator step.
///
/// Every span carries the step label and a fresh `operation_id`; extra fields
/// are appended as in `tracing::info_span!`.
///
/// ```rust,ignore
/// let span = step_span!("c", "fetch_certificate", vault = %vault);
/// ```
#[macro_export]
macro_rules! step_span {
    ($step:expr, $operation:expr) => {
        tracing::info_span!(
            "binding_step",
            step = %$step,
            operation = %$operation,
            operation_id = %uuid::Uuid::new_v4()
        )
    };
    ($step:expr, $operation:expr, $($field:tt)*) => {
        tracing::info_span!(
            "binding_step",
            step = %$step,
            operation = %$operation,
            operation_id = %uuid::Uuid::new_v4(),
            $($field)*
        )
    };
}

/// Log the resolved settings once the subscriber is installed.
pub fn log_settings_info(settings: &crate::config::AzureSettings) {
    tracing::info!(
        subscription_id = %settings.subscription_id,
        credential = %settings.credential,
        management_endpoint = %settings.management_endpoint,
        vault_url_template = %settings.vault_url_template,
        timeout_seconds = settings.timeout_seconds,
        scratch_dir = %settings.scratch_dir.display(),
        "certbind configuration"
    );
}
