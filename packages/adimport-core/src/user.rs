use crate::{
    config::ImportConfig,
    record::ImportRecord,
    report::{ImportEvent, ImportReporter},
};
use adimport_directory::{
    AttributeChange, Directory, DirectoryError, SearchScope,
    password::{UF_DONT_EXPIRE_PASSWD, UF_NORMAL_ACCOUNT},
};
use thiserror::Error;

/// Account control value written to every imported user, a normal enabled
/// account whose password never expires
pub const ENABLED_ACCOUNT_CONTROL: u32 = UF_NORMAL_ACCOUNT | UF_DONT_EXPIRE_PASSWD;

/// Errors that can occur when provisioning a user
#[derive(Debug, Error)]
pub enum ProvisionUserError {
    #[error("user record is missing a uid")]
    MissingUid,

    #[error("invalid tenant in dn for {uid}")]
    InvalidTenant { uid: String },

    #[error("user {account_name} has no password to create the account with")]
    MissingPassword { account_name: String },

    #[error("failed to create user {account_name}: {error}")]
    CreateUser {
        account_name: String,
        error: DirectoryError,
    },

    #[error("failed to move user {account_name} to {dn}: {error}")]
    MoveUser {
        account_name: String,
        dn: String,
        error: DirectoryError,
    },

    #[error("failed to update attributes of {account_name}: {error}")]
    ModifyAttributes {
        account_name: String,
        error: DirectoryError,
    },
}

/// Where a user lives in the target directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserTarget {
    /// Tenant extracted from the source DN
    pub tenant: String,
    /// Account name, `{uid}_{tenant}`
    pub account_name: String,
    /// Final DN of the user
    pub dn: String,
    /// DN the account is created at before being moved
    pub staging_dn: String,
}

impl UserTarget {
    pub fn new(config: &ImportConfig, uid: &str, tenant: &str) -> Self {
        let account_name = format!("{uid}_{tenant}");
        Self {
            tenant: tenant.to_string(),
            dn: config.tenant_user_dn(tenant, &account_name),
            staging_dn: config.staging_user_dn(&account_name),
            account_name,
        }
    }
}

/// Extract the tenant from a source DN
///
/// The tenant is the text following the first `cn=` up to the next comma,
/// for `cn=jdoe,ou=People,dc=acme,dc=corp` that is `jdoe`
pub fn extract_tenant(dn: &str) -> Option<&str> {
    let (_, rest) = dn.split_once("cn=")?;
    let segment = rest.split("cn=").next().unwrap_or(rest);
    let tenant = segment.split(',').next().unwrap_or(segment);

    if tenant.is_empty() {
        return None;
    }

    Some(tenant)
}

/// Resolve the target location of the user described by `record`
pub fn resolve_user_target(
    config: &ImportConfig,
    record: &ImportRecord,
) -> Result<UserTarget, ProvisionUserError> {
    let uid = record
        .uid
        .as_deref()
        .filter(|uid| !uid.is_empty())
        .ok_or(ProvisionUserError::MissingUid)?;

    let tenant = record
        .dn
        .as_deref()
        .and_then(extract_tenant)
        .ok_or_else(|| ProvisionUserError::InvalidTenant {
            uid: uid.to_string(),
        })?;

    Ok(UserTarget::new(config, uid, tenant))
}

/// Attribute replacements applied to every provisioned user, only
/// non empty values from the record are written
pub fn user_attribute_changes(record: &ImportRecord) -> Vec<AttributeChange> {
    let values = [
        ("uid", &record.uid),
        ("displayName", &record.displayname),
        ("mail", &record.mail),
        ("sn", &record.sn),
        ("givenName", &record.givenname),
    ];

    let mut changes: Vec<AttributeChange> = values
        .into_iter()
        .filter_map(|(name, value)| {
            value
                .as_deref()
                .filter(|value| !value.is_empty())
                .map(|value| AttributeChange::replace(name, value))
        })
        .collect();

    changes.push(AttributeChange::replace(
        "userAccountControl",
        ENABLED_ACCOUNT_CONTROL.to_string(),
    ));

    changes
}

/// Creates or updates the user described by `record`
///
/// Returns the number of errors encountered
#[tracing::instrument(skip_all, fields(uid = ?record.uid))]
pub async fn provision_user(
    directory: &impl Directory,
    config: &ImportConfig,
    record: &ImportRecord,
    reporter: &mut impl ImportReporter,
) -> usize {
    let target = match resolve_user_target(config, record) {
        Ok(value) => value,
        Err(error) => {
            report_failure(reporter, error);
            return 1;
        }
    };

    if user_exists(directory, &target).await {
        reporter.report(ImportEvent::UserExists {
            account_name: target.account_name.clone(),
        });
    } else {
        if let Err(error) =
            create_user(directory, &target, record.userpassword.as_deref()).await
        {
            report_failure(reporter, error);
            return 1;
        }

        reporter.report(ImportEvent::UserCreated {
            account_name: target.account_name.clone(),
        });
    }

    let mut errors = 0;

    if let Err(error) = sync_user_attributes(directory, &target, record).await {
        errors += 1;
        report_failure(reporter, error);
    }

    add_user_to_groups(directory, config, &target, reporter).await;

    errors
}

fn report_failure(reporter: &mut impl ImportReporter, error: ProvisionUserError) {
    tracing::debug!(%error, "failed to provision user");
    reporter.report(ImportEvent::UserFailed {
        message: error.to_string(),
    });
}

/// Check if the user already exists at its target, any lookup
/// failure is treated as the user not existing
#[tracing::instrument(skip(directory))]
pub async fn user_exists(directory: &impl Directory, target: &UserTarget) -> bool {
    match directory.search(&target.dn, SearchScope::Base).await {
        Ok(entries) => !entries.is_empty(),
        Err(error) if error.is_not_found() => {
            tracing::debug!("user does not exist");
            false
        }
        Err(error) => {
            tracing::debug!(%error, kind = ?error.kind(), "user lookup failed, treating as absent");
            false
        }
    }
}

/// Creates the account at its staging location then moves it to its target
#[tracing::instrument(skip(directory, password))]
pub async fn create_user(
    directory: &impl Directory,
    target: &UserTarget,
    password: Option<&str>,
) -> Result<(), ProvisionUserError> {
    let password = password.ok_or_else(|| ProvisionUserError::MissingPassword {
        account_name: target.account_name.clone(),
    })?;

    directory
        .create_user(&target.staging_dn, &target.account_name, password)
        .await
        .map_err(|error| ProvisionUserError::CreateUser {
            account_name: target.account_name.clone(),
            error,
        })?;

    directory
        .rename(&target.staging_dn, &target.dn)
        .await
        .map_err(|error| ProvisionUserError::MoveUser {
            account_name: target.account_name.clone(),
            dn: target.dn.clone(),
            error,
        })?;

    tracing::info!(dn = %target.dn, "created user");
    Ok(())
}

/// Replaces the user attributes with the values from the `record` and
/// enables the account
#[tracing::instrument(skip(directory, record))]
pub async fn sync_user_attributes(
    directory: &impl Directory,
    target: &UserTarget,
    record: &ImportRecord,
) -> Result<(), ProvisionUserError> {
    let changes = user_attribute_changes(record);

    directory
        .modify(&target.dn, &changes)
        .await
        .map_err(|error| ProvisionUserError::ModifyAttributes {
            account_name: target.account_name.clone(),
            error,
        })
}

/// Adds the user to every configured group
///
/// Membership is best effort: failures are never counted as errors, they
/// are only surfaced as [ImportEvent::GroupMemberSkipped] diagnostics
#[tracing::instrument(skip(directory, config, reporter))]
pub async fn add_user_to_groups(
    directory: &impl Directory,
    config: &ImportConfig,
    target: &UserTarget,
    reporter: &mut impl ImportReporter,
) {
    for group in &config.groups {
        match directory.add_group_member(group, &target.dn).await {
            Ok(()) => {
                reporter.report(ImportEvent::GroupMemberAdded {
                    group: group.clone(),
                    account_name: target.account_name.clone(),
                });
            }
            Err(error) => {
                tracing::debug!(%group, %error, "skipped adding user to group");
                reporter.report(ImportEvent::GroupMemberSkipped {
                    group: group.clone(),
                    account_name: target.account_name.clone(),
                    reason: error.to_string(),
                });
            }
        }
    }
}
