//! # Memory directory
//!
//! In-memory directory tree, nothing is persisted. Used for tests and for
//! rehearsing an import without touching a real domain controller.
//!
//! The tree enforces the same structural rules a domain controller would:
//! entries need an existing parent, names are unique (case insensitive) and
//! account names are unique across the whole tree.
//!
//! ## Environment Variables
//!
//! * `ADIMPORT_MEMORY_DIRECTORY` - JSON encoded [MemoryDirectoryConfig] to seed the tree with

use crate::{
    AttributeChange, Directory, DirectoryEntry, DirectoryError, SearchScope, dn,
    password::UF_NORMAL_ACCOUNT,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;
use tokio::sync::Mutex;

/// LDAP result code used when a request violates a constraint
const CONSTRAINT_VIOLATION: u32 = 19;

/// Configuration for the in-memory directory
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MemoryDirectoryConfig {
    /// Containers that exist before the import, ancestors are created implicitly
    #[serde(default)]
    pub containers: Vec<String>,
    /// Groups that exist before the import
    #[serde(default)]
    pub groups: Vec<MemoryGroupConfig>,
}

/// Group seeded into the in-memory directory
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MemoryGroupConfig {
    /// Account name (`sAMAccountName`) of the group
    pub name: String,
    /// Distinguished name of the group
    pub dn: String,
}

/// Errors that could occur when loading the memory directory config
#[derive(Debug, Error)]
pub enum MemoryDirectoryConfigError {
    /// Config JSON could not be parsed
    #[error("failed to parse ADIMPORT_MEMORY_DIRECTORY: {0}")]
    Parse(serde_json::Error),
}

impl MemoryDirectoryConfig {
    /// Load the memory directory config from environment variables
    pub fn from_env() -> Result<Self, MemoryDirectoryConfigError> {
        match std::env::var("ADIMPORT_MEMORY_DIRECTORY") {
            Ok(value) => serde_json::from_str(&value).map_err(MemoryDirectoryConfigError::Parse),
            Err(_) => Ok(Self::default()),
        }
    }
}

/// Entry stored within the in-memory directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryEntry {
    /// Distinguished name as it was created
    pub dn: String,
    /// Attributes of the entry, keyed by attribute name
    pub attributes: BTreeMap<String, Vec<String>>,
}

impl MemoryEntry {
    fn new(dn: &str, object_classes: &[&str]) -> Self {
        let mut attributes = BTreeMap::new();
        attributes.insert(
            "objectClass".to_string(),
            object_classes.iter().map(|value| value.to_string()).collect(),
        );

        Self {
            dn: dn.to_string(),
            attributes,
        }
    }

    /// Get the first value of the attribute `name`
    pub fn first(&self, name: &str) -> Option<&str> {
        self.attributes
            .get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// Check if the entry has `value` within the values of the attribute `name`
    pub fn has_value(&self, name: &str, value: &str) -> bool {
        self.attributes
            .get(name)
            .is_some_and(|values| values.iter().any(|existing| existing.eq_ignore_ascii_case(value)))
    }

    fn set(&mut self, name: &str, value: impl Into<String>) {
        self.attributes.insert(name.to_string(), vec![value.into()]);
    }
}

/// In memory directory
#[derive(Default)]
pub struct MemoryDirectory {
    /// Entries keyed by their normalized DN
    entries: Mutex<HashMap<String, MemoryEntry>>,
}

impl MemoryDirectory {
    /// Create a directory seeded from the provided `config`
    pub fn from_config(config: MemoryDirectoryConfig) -> Self {
        let mut entries = HashMap::new();

        for container in &config.containers {
            insert_with_ancestors(&mut entries, container, &["top", "organizationalUnit"]);
        }

        for group in &config.groups {
            insert_with_ancestors(&mut entries, &group.dn, &["top", "group"]);
            if let Some(entry) = entries.get_mut(&dn::normalize(&group.dn)) {
                entry.set("sAMAccountName", group.name.clone());
                entry.attributes.entry("member".to_string()).or_default();
            }
        }

        Self {
            entries: Mutex::new(entries),
        }
    }

    /// Get a copy of the entry at `dn`
    pub async fn entry(&self, dn: &str) -> Option<MemoryEntry> {
        self.entries.lock().await.get(&dn::normalize(dn)).cloned()
    }

    /// Get a copy of every entry keyed by normalized DN
    pub async fn snapshot(&self) -> BTreeMap<String, MemoryEntry> {
        self.entries
            .lock()
            .await
            .iter()
            .map(|(key, entry)| (key.clone(), entry.clone()))
            .collect()
    }
}

/// Insert containers for `dn` and every missing ancestor
fn insert_with_ancestors(
    entries: &mut HashMap<String, MemoryEntry>,
    dn: &str,
    object_classes: &[&str],
) {
    let mut current = Some(dn);
    let mut object_classes = object_classes;

    while let Some(value) = current {
        let key = dn::normalize(value);
        if key.is_empty() {
            break;
        }

        entries
            .entry(key)
            .or_insert_with(|| MemoryEntry::new(value, object_classes));

        // Ancestors above the seeded entry are plain containers
        object_classes = &["top", "container"];
        current = dn::parent(value);
    }
}

/// Ensure the parent of `dn` exists, entries without a parent
/// (the domain root) are always allowed
fn require_parent(
    entries: &HashMap<String, MemoryEntry>,
    dn: &str,
) -> Result<(), DirectoryError> {
    match dn::parent(dn) {
        Some(parent) if !entries.contains_key(&dn::normalize(parent)) => {
            Err(DirectoryError::NotFound(parent.to_string()))
        }
        Some(_) => Ok(()),
        None => Err(DirectoryError::InvalidDn(dn.to_string())),
    }
}

fn is_within(key: &str, base: &str) -> bool {
    key == base
        || key
            .strip_suffix(base)
            .is_some_and(|prefix| prefix.ends_with(','))
}

impl Directory for MemoryDirectory {
    async fn create_container(&self, dn: &str) -> Result<(), DirectoryError> {
        let (rdn, _) = dn::split_rdn(dn).ok_or_else(|| DirectoryError::InvalidDn(dn.to_string()))?;
        let name = dn::rdn_value(rdn).ok_or_else(|| DirectoryError::InvalidDn(dn.to_string()))?;

        let mut entries = self.entries.lock().await;
        let key = dn::normalize(dn);
        if entries.contains_key(&key) {
            return Err(DirectoryError::AlreadyExists(dn.to_string()));
        }

        require_parent(&entries, dn)?;

        let mut entry = MemoryEntry::new(dn, &["top", "organizationalUnit"]);
        entry.set("ou", name);
        entries.insert(key, entry);

        Ok(())
    }

    async fn search(
        &self,
        base: &str,
        scope: SearchScope,
    ) -> Result<Vec<DirectoryEntry>, DirectoryError> {
        let entries = self.entries.lock().await;
        let base_key = dn::normalize(base);
        if !entries.contains_key(&base_key) {
            return Err(DirectoryError::NotFound(base.to_string()));
        }

        let mut found: Vec<DirectoryEntry> = entries
            .iter()
            .filter(|(key, entry)| match scope {
                SearchScope::Base => **key == base_key,
                SearchScope::OneLevel => dn::parent(&entry.dn)
                    .is_some_and(|parent| dn::normalize(parent) == base_key),
                SearchScope::Subtree => is_within(key, &base_key),
            })
            .map(|(_, entry)| DirectoryEntry {
                dn: entry.dn.clone(),
                attributes: entry.attributes.clone().into_iter().collect(),
            })
            .collect();

        found.sort_by(|a, b| a.dn.cmp(&b.dn));
        Ok(found)
    }

    async fn create_user(
        &self,
        dn: &str,
        account_name: &str,
        password: &str,
    ) -> Result<(), DirectoryError> {
        let (rdn, _) = dn::split_rdn(dn).ok_or_else(|| DirectoryError::InvalidDn(dn.to_string()))?;
        let name = dn::rdn_value(rdn).ok_or_else(|| DirectoryError::InvalidDn(dn.to_string()))?;

        if password.is_empty() {
            return Err(DirectoryError::Rejected {
                code: CONSTRAINT_VIOLATION,
                message: "password does not meet the password policy".to_string(),
            });
        }

        let mut entries = self.entries.lock().await;
        let key = dn::normalize(dn);
        if entries.contains_key(&key)
            || entries
                .values()
                .any(|entry| entry.has_value("sAMAccountName", account_name))
        {
            return Err(DirectoryError::AlreadyExists(dn.to_string()));
        }

        require_parent(&entries, dn)?;

        let mut entry = MemoryEntry::new(dn, &["top", "person", "organizationalPerson", "user"]);
        entry.set("cn", name);
        entry.set("sAMAccountName", account_name);
        entry.set("userAccountControl", UF_NORMAL_ACCOUNT.to_string());
        if let Some(domain) = dn::dns_domain(dn) {
            entry.set("userPrincipalName", format!("{account_name}@{domain}"));
        }
        entries.insert(key, entry);

        Ok(())
    }

    async fn rename(&self, dn: &str, new_dn: &str) -> Result<(), DirectoryError> {
        let (new_rdn, _) =
            dn::split_rdn(new_dn).ok_or_else(|| DirectoryError::InvalidDn(new_dn.to_string()))?;
        let new_name =
            dn::rdn_value(new_rdn).ok_or_else(|| DirectoryError::InvalidDn(new_dn.to_string()))?;
        let naming_attribute = dn::rdn_attribute(new_rdn)
            .ok_or_else(|| DirectoryError::InvalidDn(new_dn.to_string()))?;

        let mut entries = self.entries.lock().await;
        let key = dn::normalize(dn);
        let new_key = dn::normalize(new_dn);

        if !entries.contains_key(&key) {
            return Err(DirectoryError::NotFound(dn.to_string()));
        }

        if entries.contains_key(&new_key) {
            return Err(DirectoryError::AlreadyExists(new_dn.to_string()));
        }

        require_parent(&entries, new_dn)?;

        // Move the entry along with any entries beneath it
        let moved: Vec<String> = entries
            .keys()
            .filter(|existing| is_within(existing, &key))
            .cloned()
            .collect();

        for old_key in moved {
            let Some(mut entry) = entries.remove(&old_key) else {
                continue;
            };

            if old_key == key {
                entry.dn = new_dn.to_string();
                entry.set(&naming_attribute, new_name.clone());
                entries.insert(new_key.clone(), entry);
                continue;
            }

            // Descendants keep their leading components, only the suffix changes
            let components = dn::components(&entry.dn);
            let depth = components.len().saturating_sub(dn::components(dn).len());
            entry.dn = format!("{},{new_dn}", components[..depth].join(","));
            entries.insert(dn::normalize(&entry.dn), entry);
        }

        Ok(())
    }

    async fn modify(&self, dn: &str, changes: &[AttributeChange]) -> Result<(), DirectoryError> {
        let mut entries = self.entries.lock().await;
        let entry = entries
            .get_mut(&dn::normalize(dn))
            .ok_or_else(|| DirectoryError::NotFound(dn.to_string()))?;

        for change in changes {
            if change.values.is_empty() {
                entry.attributes.remove(&change.name);
            } else {
                entry
                    .attributes
                    .insert(change.name.clone(), change.values.clone());
            }
        }

        Ok(())
    }

    async fn add_group_member(&self, group: &str, member_dn: &str) -> Result<(), DirectoryError> {
        let mut entries = self.entries.lock().await;
        let member_key = dn::normalize(member_dn);
        if !entries.contains_key(&member_key) {
            return Err(DirectoryError::NotFound(member_dn.to_string()));
        }

        let group_entry = entries
            .values_mut()
            .find(|entry| {
                entry.has_value("objectClass", "group") && entry.has_value("sAMAccountName", group)
            })
            .ok_or_else(|| DirectoryError::NotFound(group.to_string()))?;

        let members = group_entry
            .attributes
            .entry("member".to_string())
            .or_default();

        if members
            .iter()
            .any(|existing| dn::normalize(existing) == member_key)
        {
            return Err(DirectoryError::AlreadyExists(member_dn.to_string()));
        }

        members.push(member_dn.to_string());
        Ok(())
    }
}
