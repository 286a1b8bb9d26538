//! # Binding Orchestrator
//!
//! Binds a Key Vault certificate to an App Service custom hostname:
//!
//! 1. resolve the web app and its managed identity
//! 2. list the app's resource group
//! 3. fetch the certificate secret and certificate object from the source vault
//! 4. fetch the `<certificate>-password` secret
//! 5. pick the first resource-group vault whose access policy names the identity
//! 6. repackage the certificate as a password-protected PKCS#12 container
//! 7. stage the container in a scratch file
//! 8. import it into the destination vault
//! 9. create an SNI binding referencing the source certificate's thumbprint
//!
//! Steps run strictly in this order and the first failure aborts the run.

use std::sync::Arc;
use tracing::{debug, info, warn, Instrument};

use crate::azure::{AzureClients, ResourceApi, VaultApi, WebApi};
use crate::certificates::{self, ScratchSpace};
use crate::domain::{
    password_secret_name, BindingReport, CertificateRef, ResourceSummary, SecretBundle,
    SslBindingRequest, VaultDescriptor, WebApp, WEB_APP_RESOURCE_TYPE,
};
use crate::errors::{Error, Result};
use crate::step_span;

/// The four operator inputs of a binding run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingInputs {
    pub app_name: String,
    /// Custom hostname already added to the app
    pub hostname: String,
    pub source_vault: String,
    pub certificate_name: String,
}

/// Behaviour switches for a binding run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BindingOptions {
    /// Leave the scratch container on disk after the import
    pub keep_scratch: bool,
    /// Delete the imported certificate again when the binding step fails
    pub rollback_on_failure: bool,
}

/// The first vault, in enumeration order, with an access policy for `principal_id`.
pub fn first_accessible_vault<'a>(
    vaults: &'a [VaultDescriptor],
    principal_id: &str,
) -> Option<&'a VaultDescriptor> {
    let policy = vaults
        .iter()
        .flat_map(|vault| vault.access_policies.iter())
        .find(|policy| policy.applies_to(principal_id))?;
    vaults.iter().find(|vault| vault.name == policy.vault_name)
}

#[derive(Debug, Clone)]
pub struct BindingOrchestrator {
    resources: Arc<dyn ResourceApi>,
    vaults: Arc<dyn VaultApi>,
    web: Arc<dyn WebApi>,
    scratch: ScratchSpace,
    options: BindingOptions,
}

impl BindingOrchestrator {
    pub fn new(clients: AzureClients, scratch: ScratchSpace, options: BindingOptions) -> Self {
        Self::from_parts(clients.resources, clients.vaults, clients.web, scratch, options)
    }

    pub fn from_parts(
        resources: Arc<dyn ResourceApi>,
        vaults: Arc<dyn VaultApi>,
        web: Arc<dyn WebApi>,
        scratch: ScratchSpace,
        options: BindingOptions,
    ) -> Self {
        Self { resources, vaults, web, scratch, options }
    }

    /// Run the whole workflow for one hostname.
    pub async fn bind(&self, inputs: &BindingInputs) -> Result<BindingReport> {
        info!(
            app = %inputs.app_name,
            hostname = %inputs.hostname,
            vault = %inputs.source_vault,
            certificate = %inputs.certificate_name,
            "Starting certificate binding"
        );

        let app = self
            .resolve_application(&inputs.app_name)
            .instrument(step_span!("a", "resolve_application", app = %inputs.app_name))
            .await?;

        let group_resources = self
            .list_resource_group(&app)
            .instrument(step_span!("b", "list_resource_group", resource_group = %app.resource_group))
            .await?;

        let (secret, certificate) = self
            .fetch_certificate(&inputs.source_vault, &inputs.certificate_name)
            .instrument(step_span!("c", "fetch_certificate", vault = %inputs.source_vault))
            .await?;

        let password = self
            .fetch_password(&inputs.source_vault, &inputs.certificate_name)
            .instrument(step_span!("d", "fetch_password", vault = %inputs.source_vault))
            .await?;

        let principal_id = app
            .principal_id
            .as_deref()
            .ok_or_else(|| Error::ManagedIdentityMissing { app: app.name.clone() })?;
        let destination = self
            .select_destination_vault(&app.resource_group, &group_resources, principal_id)
            .instrument(step_span!("e", "select_destination_vault", principal_id = %principal_id))
            .await?;

        let bundle = {
            let _span = step_span!("f", "repackage_certificate").entered();
            let bundle = certificates::repackage(&secret, &password.value)?;
            match bundle.leaf_thumbprint() {
                Ok(leaf) if leaf != certificate.thumbprint => warn!(
                    vault_thumbprint = %certificate.thumbprint,
                    leaf_thumbprint = %leaf,
                    "Leaf certificate thumbprint does not match the vault thumbprint; binding uses the vault thumbprint"
                ),
                Ok(_) => debug!("Leaf thumbprint matches vault thumbprint"),
                Err(e) => warn!(error = %e, "Could not compute leaf thumbprint"),
            }
            bundle
        };

        let scratch = {
            let _span = step_span!("g", "write_scratch", dir = %self.scratch.dir().display())
                .entered();
            self.scratch.write(&bundle.pfx)?
        };
        drop(bundle);

        let imported = self
            .vaults
            .import_certificate(
                &destination.name,
                &inputs.certificate_name,
                scratch.path(),
                &password.value,
            )
            .instrument(step_span!("h", "import_certificate", vault = %destination.name))
            .await;

        // The container is no longer needed once the import call has returned
        let scratch_path = if self.options.keep_scratch {
            let path = scratch.keep();
            info!(path = %path.display(), "Kept scratch container");
            Some(path)
        } else {
            drop(scratch);
            None
        };
        let import = imported?;

        let request = SslBindingRequest::sni(
            app.resource_group.clone(),
            app.name.clone(),
            certificate.thumbprint.clone(),
            inputs.hostname.clone(),
        );
        let binding = match self
            .web
            .create_ssl_binding(&request)
            .instrument(step_span!("i", "create_ssl_binding", hostname = %request.hostname))
            .await
        {
            Ok(binding) => binding,
            Err(e) => {
                self.handle_binding_failure(&destination.name, &inputs.certificate_name).await;
                return Err(e);
            }
        };

        info!(
            app = %app.name,
            hostname = %request.hostname,
            thumbprint = %request.thumbprint,
            destination_vault = %destination.name,
            "Certificate bound"
        );

        Ok(BindingReport {
            app_name: app.name,
            resource_group: app.resource_group,
            hostname: request.hostname,
            source_vault: inputs.source_vault.clone(),
            destination_vault: destination.name,
            certificate_name: inputs.certificate_name.clone(),
            thumbprint: request.thumbprint,
            ssl_state: request.ssl_state,
            scratch_path,
            import,
            binding,
        })
    }

    async fn resolve_application(&self, name: &str) -> Result<WebApp> {
        let mut matches = self.resources.find_resources(name, WEB_APP_RESOURCE_TYPE).await?;
        let resource = match matches.len() {
            0 => return Err(Error::ApplicationNotFound { name: name.to_string() }),
            1 => matches.remove(0),
            count => return Err(Error::AmbiguousApplication { name: name.to_string(), count }),
        };

        let app = self
            .resources
            .get_web_app(&resource)
            .await?
            .ok_or_else(|| Error::ApplicationNotFound { name: name.to_string() })?;

        if app.principal_id.is_none() {
            return Err(Error::ManagedIdentityMissing { app: app.name });
        }

        info!(id = %app.id, resource_group = %app.resource_group, "Resolved application");
        Ok(app)
    }

    async fn list_resource_group(&self, app: &WebApp) -> Result<Vec<ResourceSummary>> {
        let not_found = || Error::ResourceGroupNotFound {
            app: app.name.clone(),
            resource_group: app.resource_group.clone(),
        };

        if app.resource_group.is_empty() {
            return Err(not_found());
        }

        let resources = self
            .resources
            .list_resource_group(&app.resource_group)
            .await?
            .filter(|resources| !resources.is_empty())
            .ok_or_else(not_found)?;

        debug!(count = resources.len(), "Listed resource group resources");
        Ok(resources)
    }

    async fn fetch_certificate(
        &self,
        vault: &str,
        name: &str,
    ) -> Result<(SecretBundle, CertificateRef)> {
        let not_found = || Error::CertificateNotFound { vault: vault.to_string(), name: name.to_string() };

        let secret = self.vaults.get_secret(vault, name).await?.ok_or_else(not_found)?;
        info!(id = ?secret.id, content_type = ?secret.content_type, "Fetched certificate secret");

        let certificate = self.vaults.get_certificate(vault, name).await?.ok_or_else(not_found)?;
        info!(id = ?certificate.id, thumbprint = %certificate.thumbprint, "Fetched certificate");

        Ok((secret, certificate))
    }

    async fn fetch_password(&self, vault: &str, certificate_name: &str) -> Result<SecretBundle> {
        let name = password_secret_name(certificate_name);
        let password = self
            .vaults
            .get_secret(vault, &name)
            .await?
            .ok_or_else(|| Error::PasswordNotFound { vault: vault.to_string(), name: name.clone() })?;

        info!(id = ?password.id, "Fetched password secret");
        Ok(password)
    }

    async fn select_destination_vault(
        &self,
        resource_group: &str,
        resources: &[ResourceSummary],
        principal_id: &str,
    ) -> Result<VaultDescriptor> {
        let mut vaults = Vec::new();
        for resource in resources.iter().filter(|r| r.is_vault()) {
            match self.resources.get_vault_details(resource).await? {
                Some(vault) => {
                    debug!(vault = %vault.name, policies = vault.access_policies.len(), "Inspected vault");
                    vaults.push(vault);
                }
                None => debug!(vault = %resource.name, "Vault disappeared during enumeration"),
            }
        }

        let destination = first_accessible_vault(&vaults, principal_id).cloned().ok_or_else(|| {
            Error::NoAccessibleVaultFound {
                resource_group: resource_group.to_string(),
                principal_id: principal_id.to_string(),
            }
        })?;

        info!(vault = %destination.name, candidates = vaults.len(), "Selected destination vault");
        Ok(destination)
    }

    async fn handle_binding_failure(&self, vault: &str, certificate_name: &str) {
        if !self.options.rollback_on_failure {
            warn!(
                vault = %vault,
                certificate = %certificate_name,
                "Binding failed; the imported certificate remains in the destination vault"
            );
            return;
        }

        match self.vaults.delete_certificate(vault, certificate_name).await {
            Ok(()) => info!(vault = %vault, certificate = %certificate_name, "Rolled back certificate import"),
            Err(e) => warn!(
                vault = %vault,
                certificate = %certificate_name,
                error = %e,
                "Rollback failed; the imported certificate remains in the destination vault"
            ),
        }
    }
}
