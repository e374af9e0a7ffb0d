//! # LDAP directory
//!
//! Directory backed by an LDAP server, intended for Active Directory and
//! Samba AD domain controllers.
//!
//! ## Environment Variables
//!
//! * `ADIMPORT_LDAP_URL` - URL of the directory server (Default: ldap://127.0.0.1:389)
//! * `ADIMPORT_LDAP_BIND_DN` - DN to bind as (Default: CN=Administrator,CN=Users,DC=example,DC=org)
//! * `ADIMPORT_LDAP_STARTTLS` - Whether to upgrade the connection with StartTLS (Default: false)
//! * `ADIMPORT_LDAP_CONNECT_TIMEOUT_SECONDS` - Connection timeout in seconds (Default: 10)
//! * `ADIMPORT_LDAP_GROUP_SEARCH_BASE` - Base DN groups are resolved under (Default: domain root of the bind DN)
//!
//! Setting `unicodePwd` requires an encrypted connection, use either an
//! `ldaps://` URL or StartTLS when creating users.

use crate::{
    AttributeChange, Credentials, Directory, DirectoryEntry, DirectoryError, SearchScope, dn,
    password::{UF_NORMAL_ACCOUNT, encode_unicode_pwd},
};
use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, LdapResult, Mod, Scope, SearchEntry};
use serde::{Deserialize, Serialize};
use std::{
    collections::HashSet,
    num::ParseIntError,
    str::ParseBoolError,
    time::Duration,
};
use thiserror::Error;

/// LDAP result code for a successful operation
const LDAP_SUCCESS: u32 = 0;
/// LDAP result code when an attribute value is already present
const LDAP_ATTRIBUTE_OR_VALUE_EXISTS: u32 = 20;
/// LDAP result code when the target entry does not exist
const LDAP_NO_SUCH_OBJECT: u32 = 32;
/// LDAP result code for rejected bind credentials
const LDAP_INVALID_CREDENTIALS: u32 = 49;
/// LDAP result code when the entry already exists
const LDAP_ALREADY_EXISTS: u32 = 68;

const DEFAULT_URL: &str = "ldap://127.0.0.1:389";
const DEFAULT_BIND_DN: &str = "CN=Administrator,CN=Users,DC=example,DC=org";
const DEFAULT_CONNECT_TIMEOUT_SECONDS: u64 = 10;

/// Configuration for the LDAP directory
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LdapDirectoryConfig {
    /// URL of the directory server
    #[serde(default = "default_url")]
    pub url: String,
    /// DN to bind as
    #[serde(default = "default_bind_dn")]
    pub bind_dn: String,
    /// Whether to upgrade the connection using StartTLS
    #[serde(default)]
    pub starttls: bool,
    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout_seconds")]
    pub connect_timeout_seconds: u64,
    /// Base DN groups are resolved under, defaults to the domain
    /// root of the `bind_dn`
    #[serde(default)]
    pub group_search_base: Option<String>,
}

fn default_url() -> String {
    DEFAULT_URL.to_string()
}

fn default_bind_dn() -> String {
    DEFAULT_BIND_DN.to_string()
}

fn default_connect_timeout_seconds() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_SECONDS
}

impl Default for LdapDirectoryConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            bind_dn: default_bind_dn(),
            starttls: false,
            connect_timeout_seconds: DEFAULT_CONNECT_TIMEOUT_SECONDS,
            group_search_base: None,
        }
    }
}

/// Errors that could occur when loading the LDAP config
#[derive(Debug, Error)]
pub enum LdapDirectoryConfigError {
    /// StartTLS flag was not a boolean
    #[error("ADIMPORT_LDAP_STARTTLS must be true or false")]
    InvalidStartTls(ParseBoolError),
    /// Connection timeout was not a number
    #[error("ADIMPORT_LDAP_CONNECT_TIMEOUT_SECONDS must be a positive number")]
    InvalidConnectTimeout(ParseIntError),
}

impl LdapDirectoryConfig {
    /// Load the LDAP config from environment variables
    pub fn from_env() -> Result<Self, LdapDirectoryConfigError> {
        let url = std::env::var("ADIMPORT_LDAP_URL").unwrap_or_else(|_| default_url());
        let bind_dn = std::env::var("ADIMPORT_LDAP_BIND_DN").unwrap_or_else(|_| default_bind_dn());

        let starttls = std::env::var("ADIMPORT_LDAP_STARTTLS")
            .ok()
            .map(|value| value.parse::<bool>())
            .transpose()
            .map_err(LdapDirectoryConfigError::InvalidStartTls)?
            .unwrap_or_default();

        let connect_timeout_seconds = std::env::var("ADIMPORT_LDAP_CONNECT_TIMEOUT_SECONDS")
            .ok()
            .map(|value| value.parse::<u64>())
            .transpose()
            .map_err(LdapDirectoryConfigError::InvalidConnectTimeout)?
            .unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECONDS);

        let group_search_base = std::env::var("ADIMPORT_LDAP_GROUP_SEARCH_BASE").ok();

        Ok(Self {
            url,
            bind_dn,
            starttls,
            connect_timeout_seconds,
            group_search_base,
        })
    }
}

/// Directory backed by an authenticated LDAP session
pub struct LdapDirectory {
    ldap: Ldap,
    group_search_base: String,
}

impl LdapDirectory {
    /// Connect to the server and bind using the `credentials`
    #[tracing::instrument(skip(credentials))]
    pub async fn connect(
        config: LdapDirectoryConfig,
        credentials: &Credentials,
    ) -> Result<Self, DirectoryError> {
        let settings = LdapConnSettings::new()
            .set_conn_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .set_starttls(config.starttls);

        let (conn, mut ldap) = LdapConnAsync::with_settings(settings, &config.url).await?;

        // Drive the connection in the background for the lifetime of the session
        tokio::spawn(async move {
            if let Err(error) = conn.drive().await {
                tracing::warn!(?error, "ldap connection driver error");
            }
        });

        let result = ldap
            .simple_bind(&config.bind_dn, &credentials.password)
            .await?;
        check_result(result, &config.bind_dn)?;

        tracing::info!(url = %config.url, "ldap session established");

        let group_search_base = match config.group_search_base {
            Some(value) => value,
            None => dn::domain_root(&config.bind_dn).unwrap_or_default(),
        };

        Ok(Self {
            ldap,
            group_search_base,
        })
    }

    /// Unbind and close the session
    pub async fn close(self) -> Result<(), DirectoryError> {
        let mut ldap = self.ldap;
        ldap.unbind().await?;
        Ok(())
    }

    /// Resolve the DN of the group with the account name `group`
    async fn find_group_dn(&self, group: &str) -> Result<String, DirectoryError> {
        let mut ldap = self.ldap.clone();
        let filter = format!(
            "(&(objectClass=group)(sAMAccountName={}))",
            dn::escape_filter(group)
        );

        let result = ldap
            .search(&self.group_search_base, Scope::Subtree, &filter, vec!["1.1"])
            .await?;
        let (entries, result) = (result.0, result.1);
        check_result(result, &self.group_search_base)?;

        entries
            .into_iter()
            .next()
            .map(|entry| SearchEntry::construct(entry).dn)
            .ok_or_else(|| DirectoryError::NotFound(group.to_string()))
    }
}

impl Directory for LdapDirectory {
    async fn create_container(&self, dn: &str) -> Result<(), DirectoryError> {
        let (rdn, _) = dn::split_rdn(dn).ok_or_else(|| DirectoryError::InvalidDn(dn.to_string()))?;
        let name = dn::rdn_value(rdn).ok_or_else(|| DirectoryError::InvalidDn(dn.to_string()))?;

        let attributes = vec![
            (
                "objectClass",
                HashSet::from(["top", "organizationalUnit"]),
            ),
            ("ou", HashSet::from([name.as_str()])),
        ];

        let mut ldap = self.ldap.clone();
        let result = ldap.add(dn, attributes).await?;
        check_result(result, dn)
    }

    async fn search(
        &self,
        base: &str,
        scope: SearchScope,
    ) -> Result<Vec<DirectoryEntry>, DirectoryError> {
        let scope = match scope {
            SearchScope::Base => Scope::Base,
            SearchScope::OneLevel => Scope::OneLevel,
            SearchScope::Subtree => Scope::Subtree,
        };

        let mut ldap = self.ldap.clone();
        let result = ldap
            .search(base, scope, "(objectClass=*)", vec!["*"])
            .await?;
        let (entries, result) = (result.0, result.1);
        check_result(result, base)?;

        Ok(entries
            .into_iter()
            .map(SearchEntry::construct)
            .map(|entry| DirectoryEntry {
                dn: entry.dn,
                attributes: entry.attrs,
            })
            .collect())
    }

    async fn create_user(
        &self,
        dn: &str,
        account_name: &str,
        password: &str,
    ) -> Result<(), DirectoryError> {
        let (rdn, _) = dn::split_rdn(dn).ok_or_else(|| DirectoryError::InvalidDn(dn.to_string()))?;
        let name = dn::rdn_value(rdn).ok_or_else(|| DirectoryError::InvalidDn(dn.to_string()))?;

        let mut attributes: Vec<(Vec<u8>, HashSet<Vec<u8>>)> = vec![
            (
                b"objectClass".to_vec(),
                ["top", "person", "organizationalPerson", "user"]
                    .into_iter()
                    .map(|value| value.as_bytes().to_vec())
                    .collect(),
            ),
            (b"cn".to_vec(), HashSet::from([name.into_bytes()])),
            (
                b"sAMAccountName".to_vec(),
                HashSet::from([account_name.as_bytes().to_vec()]),
            ),
            (
                b"unicodePwd".to_vec(),
                HashSet::from([encode_unicode_pwd(password)]),
            ),
            (
                b"userAccountControl".to_vec(),
                HashSet::from([UF_NORMAL_ACCOUNT.to_string().into_bytes()]),
            ),
        ];

        if let Some(domain) = dn::dns_domain(dn) {
            attributes.push((
                b"userPrincipalName".to_vec(),
                HashSet::from([format!("{account_name}@{domain}").into_bytes()]),
            ));
        }

        let mut ldap = self.ldap.clone();
        let result = ldap.add(dn, attributes).await?;
        check_result(result, dn)
    }

    async fn rename(&self, dn: &str, new_dn: &str) -> Result<(), DirectoryError> {
        let (rdn, new_parent) =
            dn::split_rdn(new_dn).ok_or_else(|| DirectoryError::InvalidDn(new_dn.to_string()))?;

        let mut ldap = self.ldap.clone();
        let result = ldap.modifydn(dn, rdn, true, Some(new_parent)).await?;
        check_result(result, dn)
    }

    async fn modify(&self, dn: &str, changes: &[AttributeChange]) -> Result<(), DirectoryError> {
        let mods: Vec<Mod<String>> = changes
            .iter()
            .map(|change| {
                Mod::Replace(
                    change.name.clone(),
                    change.values.iter().cloned().collect(),
                )
            })
            .collect();

        if mods.is_empty() {
            return Ok(());
        }

        let mut ldap = self.ldap.clone();
        let result = ldap.modify(dn, mods).await?;
        check_result(result, dn)
    }

    async fn add_group_member(&self, group: &str, member_dn: &str) -> Result<(), DirectoryError> {
        let group_dn = self.find_group_dn(group).await?;

        let mods = vec![Mod::Add(
            "member".to_string(),
            HashSet::from([member_dn.to_string()]),
        )];

        let mut ldap = self.ldap.clone();
        let result = ldap.modify(&group_dn, mods).await?;
        check_result(result, member_dn)
    }
}

/// Translate an LDAP result into a [DirectoryError] for the entry `dn`
fn check_result(result: LdapResult, dn: &str) -> Result<(), DirectoryError> {
    match result.rc {
        LDAP_SUCCESS => Ok(()),
        LDAP_ALREADY_EXISTS | LDAP_ATTRIBUTE_OR_VALUE_EXISTS => {
            Err(DirectoryError::AlreadyExists(dn.to_string()))
        }
        LDAP_NO_SUCH_OBJECT => Err(DirectoryError::NotFound(dn.to_string())),
        LDAP_INVALID_CREDENTIALS => Err(DirectoryError::InvalidCredentials),
        code => Err(DirectoryError::Rejected {
            code,
            message: result.text,
        }),
    }
}
