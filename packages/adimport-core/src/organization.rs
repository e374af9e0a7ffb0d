use crate::{
    config::ImportConfig,
    record::ImportRecord,
    report::{ImportEvent, ImportReporter},
};
use adimport_directory::{Directory, DirectoryError};
use thiserror::Error;

/// Errors that can occur when provisioning an organization
#[derive(Debug, Error)]
pub enum ProvisionOrganizationError {
    #[error("organization record is missing a name (cn)")]
    MissingName,

    #[error("failed to create {dn}: {error}")]
    CreateUnit { dn: String, error: DirectoryError },
}

/// Outcome from creating an organization unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateUnitOutcome {
    /// Unit was freshly created
    Created,
    /// Unit already existed
    Existing,
}

/// DNs of the units making up the organization `name`, parents first
pub fn organization_unit_dns(config: &ImportConfig, name: &str) -> [String; 3] {
    let base_dn = config.organization_dn(name);
    [
        base_dn.clone(),
        format!("OU=Groups,{base_dn}"),
        format!("OU=Users,{base_dn}"),
    ]
}

/// Ensures the units for the organization described by `record` exist
///
/// Returns the number of errors encountered
#[tracing::instrument(skip_all, fields(name = ?record.cn))]
pub async fn provision_organization(
    directory: &impl Directory,
    config: &ImportConfig,
    record: &ImportRecord,
    reporter: &mut impl ImportReporter,
) -> usize {
    let Some(name) = record.cn.as_deref().filter(|name| !name.is_empty()) else {
        let error = ProvisionOrganizationError::MissingName;
        tracing::debug!(%error, "cannot provision organization");
        reporter.report(ImportEvent::OrganizationFailed {
            message: error.to_string(),
        });
        return 1;
    };

    let mut errors = 0;

    for dn in organization_unit_dns(config, name) {
        match create_organization_unit(directory, &dn).await {
            Ok(CreateUnitOutcome::Created) => {
                tracing::info!(%dn, "created organization unit");
                reporter.report(ImportEvent::OrganizationUnitCreated { dn });
            }
            Ok(CreateUnitOutcome::Existing) => {
                tracing::debug!(%dn, "organization unit already exists");
            }
            Err(error) => {
                errors += 1;
                tracing::debug!(%error, "failed to create organization unit");
                reporter.report(ImportEvent::OrganizationFailed {
                    message: error.to_string(),
                });
            }
        }
    }

    errors
}

/// Creates the organization unit at `dn`, an already existing unit
/// is not considered an error
#[tracing::instrument(skip(directory))]
pub async fn create_organization_unit(
    directory: &impl Directory,
    dn: &str,
) -> Result<CreateUnitOutcome, ProvisionOrganizationError> {
    match directory.create_container(dn).await {
        Ok(()) => Ok(CreateUnitOutcome::Created),
        Err(error) if error.is_already_exists() => Ok(CreateUnitOutcome::Existing),
        Err(error) => Err(ProvisionOrganizationError::CreateUnit {
            dn: dn.to_string(),
            error,
        }),
    }
}
