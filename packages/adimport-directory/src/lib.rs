#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! # Directory
//!
//! Directory service abstraction with multiple supported backends
//!
//! ## Environment Variables
//!
//! * `ADIMPORT_DIRECTORY` - Which directory backend to use ("ldap", "memory")
//!
//! See individual backend module documentation for individual environment variables
//!
//! - [ldap]
//! - [memory]

use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fmt::Debug, future::Future};
use thiserror::Error;

pub mod dn;
pub mod ldap;
pub mod memory;
pub mod password;

/// Configuration for a directory backend
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "provider", rename_all = "snake_case")]
pub enum DirectoryConfig {
    /// LDAP directory server (Active Directory / Samba AD)
    Ldap(ldap::LdapDirectoryConfig),

    /// In-memory directory
    Memory(memory::MemoryDirectoryConfig),
}

/// Errors that could occur with a directory config
#[derive(Debug, Error)]
pub enum DirectoryConfigError {
    /// Error from the LDAP directory config
    #[error(transparent)]
    Ldap(ldap::LdapDirectoryConfigError),

    /// Error from the memory directory config
    #[error(transparent)]
    Memory(memory::MemoryDirectoryConfigError),
}

impl DirectoryConfig {
    /// Get the current directory config from environment variables
    pub fn from_env() -> Result<Self, DirectoryConfigError> {
        let variant = std::env::var("ADIMPORT_DIRECTORY").unwrap_or_else(|_| "ldap".to_string());
        match variant.as_str() {
            "memory" => memory::MemoryDirectoryConfig::from_env()
                .map(Self::Memory)
                .map_err(DirectoryConfigError::Memory),
            _ => ldap::LdapDirectoryConfig::from_env()
                .map(Self::Ldap)
                .map_err(DirectoryConfigError::Ldap),
        }
    }
}

/// Credentials used to authenticate the directory session
#[derive(Clone)]
pub struct Credentials {
    /// Password for the configured bind identity
    pub password: String,
}

impl Credentials {
    /// Create credentials from a `password`
    pub fn new(password: impl Into<String>) -> Self {
        Self {
            password: password.into(),
        }
    }
}

impl Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials").finish()
    }
}

/// Scope of a directory search relative to its base
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchScope {
    /// Only the base entry itself
    Base,
    /// Direct children of the base entry
    OneLevel,
    /// The base entry and all of its descendants
    Subtree,
}

/// Entry returned from a directory search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    /// Distinguished name of the entry
    pub dn: String,
    /// Attribute values of the entry
    pub attributes: HashMap<String, Vec<String>>,
}

/// Replacement of every value of the attribute `name` with `values`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeChange {
    /// Name of the attribute
    pub name: String,
    /// New values for the attribute
    pub values: Vec<String>,
}

impl AttributeChange {
    /// Create a change replacing `name` with a single `value`
    pub fn replace(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: vec![value.into()],
        }
    }
}

/// Kind of a [DirectoryError], the provisioning logic only ever branches
/// on this closed set of outcomes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectoryErrorKind {
    /// Entry (or attribute value) already exists
    AlreadyExists,
    /// Entry does not exist
    NotFound,
    /// Bind credentials were rejected
    InvalidCredentials,
    /// Any other failure
    Other,
}

/// Errors that could occur when using a directory
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// Entry or value already exists
    #[error("entry already exists: {0}")]
    AlreadyExists(String),

    /// Entry does not exist
    #[error("no such entry: {0}")]
    NotFound(String),

    /// Bind credentials were rejected
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Provided distinguished name could not be parsed
    #[error("invalid distinguished name: {0}")]
    InvalidDn(String),

    /// Directory refused the request
    #[error("{message} (code {code})")]
    Rejected {
        /// LDAP result code
        code: u32,
        /// Diagnostic message from the directory
        message: String,
    },

    /// Connection or protocol level LDAP error
    #[error(transparent)]
    Ldap(Box<::ldap3::LdapError>),
}

impl DirectoryError {
    /// Get the kind of error
    pub fn kind(&self) -> DirectoryErrorKind {
        match self {
            DirectoryError::AlreadyExists(_) => DirectoryErrorKind::AlreadyExists,
            DirectoryError::NotFound(_) => DirectoryErrorKind::NotFound,
            DirectoryError::InvalidCredentials => DirectoryErrorKind::InvalidCredentials,
            DirectoryError::InvalidDn(_)
            | DirectoryError::Rejected { .. }
            | DirectoryError::Ldap(_) => DirectoryErrorKind::Other,
        }
    }

    /// Check if the error is an "already exists" error
    pub fn is_already_exists(&self) -> bool {
        self.kind() == DirectoryErrorKind::AlreadyExists
    }

    /// Check if the error is a "not found" error
    pub fn is_not_found(&self) -> bool {
        self.kind() == DirectoryErrorKind::NotFound
    }
}

impl From<::ldap3::LdapError> for DirectoryError {
    fn from(value: ::ldap3::LdapError) -> Self {
        Self::Ldap(Box::new(value))
    }
}

/// Operations required from a directory service
///
/// Each operation is an independent request, no multi-call transactions
/// are provided
pub trait Directory: Send + Sync {
    /// Create an organizational unit at `dn`
    fn create_container(&self, dn: &str) -> impl Future<Output = Result<(), DirectoryError>> + Send;

    /// Search for entries at `base` within `scope`
    fn search(
        &self,
        base: &str,
        scope: SearchScope,
    ) -> impl Future<Output = Result<Vec<DirectoryEntry>, DirectoryError>> + Send;

    /// Create a user account at `dn` with the provided `account_name` and `password`
    fn create_user(
        &self,
        dn: &str,
        account_name: &str,
        password: &str,
    ) -> impl Future<Output = Result<(), DirectoryError>> + Send;

    /// Move the entry at `dn` to `new_dn`
    fn rename(&self, dn: &str, new_dn: &str)
    -> impl Future<Output = Result<(), DirectoryError>> + Send;

    /// Apply all the `changes` to the entry at `dn` as a single request
    fn modify(
        &self,
        dn: &str,
        changes: &[AttributeChange],
    ) -> impl Future<Output = Result<(), DirectoryError>> + Send;

    /// Add `member_dn` as a member of the group with the account name `group`
    fn add_group_member(
        &self,
        group: &str,
        member_dn: &str,
    ) -> impl Future<Output = Result<(), DirectoryError>> + Send;
}

/// Directory backed by some underlying directory implementation
pub enum DirectoryClient {
    /// LDAP backed directory
    Ldap(ldap::LdapDirectory),

    /// In-memory directory
    Memory(memory::MemoryDirectory),
}

impl DirectoryClient {
    /// Establish an authenticated directory session from the provided `config`
    ///
    /// The in-memory directory does not use the `credentials`
    #[tracing::instrument(skip(credentials))]
    pub async fn connect(
        config: DirectoryConfig,
        credentials: &Credentials,
    ) -> Result<Self, DirectoryError> {
        match config {
            DirectoryConfig::Ldap(config) => {
                tracing::debug!("using ldap directory");
                ldap::LdapDirectory::connect(config, credentials)
                    .await
                    .map(DirectoryClient::Ldap)
            }
            DirectoryConfig::Memory(config) => {
                tracing::debug!("using in memory directory");
                Ok(DirectoryClient::Memory(memory::MemoryDirectory::from_config(
                    config,
                )))
            }
        }
    }

    /// Close the directory session
    pub async fn close(self) -> Result<(), DirectoryError> {
        match self {
            DirectoryClient::Ldap(inner) => inner.close().await,
            DirectoryClient::Memory(_) => Ok(()),
        }
    }
}

impl Directory for DirectoryClient {
    #[tracing::instrument(skip(self))]
    async fn create_container(&self, dn: &str) -> Result<(), DirectoryError> {
        tracing::debug!("creating container");
        match self {
            DirectoryClient::Ldap(inner) => inner.create_container(dn).await,
            DirectoryClient::Memory(inner) => inner.create_container(dn).await,
        }
    }

    #[tracing::instrument(skip(self))]
    async fn search(
        &self,
        base: &str,
        scope: SearchScope,
    ) -> Result<Vec<DirectoryEntry>, DirectoryError> {
        tracing::debug!("searching directory");
        match self {
            DirectoryClient::Ldap(inner) => inner.search(base, scope).await,
            DirectoryClient::Memory(inner) => inner.search(base, scope).await,
        }
    }

    #[tracing::instrument(skip(self, password))]
    async fn create_user(
        &self,
        dn: &str,
        account_name: &str,
        password: &str,
    ) -> Result<(), DirectoryError> {
        tracing::debug!("creating user");
        match self {
            DirectoryClient::Ldap(inner) => inner.create_user(dn, account_name, password).await,
            DirectoryClient::Memory(inner) => inner.create_user(dn, account_name, password).await,
        }
    }

    #[tracing::instrument(skip(self))]
    async fn rename(&self, dn: &str, new_dn: &str) -> Result<(), DirectoryError> {
        tracing::debug!("renaming entry");
        match self {
            DirectoryClient::Ldap(inner) => inner.rename(dn, new_dn).await,
            DirectoryClient::Memory(inner) => inner.rename(dn, new_dn).await,
        }
    }

    #[tracing::instrument(skip(self))]
    async fn modify(&self, dn: &str, changes: &[AttributeChange]) -> Result<(), DirectoryError> {
        tracing::debug!("modifying entry");
        match self {
            DirectoryClient::Ldap(inner) => inner.modify(dn, changes).await,
            DirectoryClient::Memory(inner) => inner.modify(dn, changes).await,
        }
    }

    #[tracing::instrument(skip(self))]
    async fn add_group_member(&self, group: &str, member_dn: &str) -> Result<(), DirectoryError> {
        tracing::debug!("adding group member");
        match self {
            DirectoryClient::Ldap(inner) => inner.add_group_member(group, member_dn).await,
            DirectoryClient::Memory(inner) => inner.add_group_member(group, member_dn).await,
        }
    }
}
