use adimport_directory::dn;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const DEFAULT_DOMAIN_DN: &str = "DC=example,DC=org";
const DEFAULT_CUSTOMERS_OU: &str = "Customers";
const DEFAULT_TENANTS_OU: &str = "Collectivites";
const DEFAULT_STAGING_CONTAINER: &str = "Users";
const DEFAULT_GROUPS: [&str; 2] = ["generic_app_group_1", "generic_app_group_2"];

/// Fixed layout of the target directory the import provisions into
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ImportConfig {
    /// Root of the domain every path is built under
    #[serde(default = "default_domain_dn")]
    pub domain_dn: String,
    /// OU beneath the domain root holding organization units
    #[serde(default = "default_customers_ou")]
    pub customers_ou: String,
    /// OU beneath the domain root holding per tenant user containers
    #[serde(default = "default_tenants_ou")]
    pub tenants_ou: String,
    /// Container (CN) beneath the domain root new accounts are created in
    /// before being moved to their tenant
    #[serde(default = "default_staging_container")]
    pub staging_container: String,
    /// Groups every imported user is added to
    #[serde(default = "default_groups")]
    pub groups: Vec<String>,
}

fn default_domain_dn() -> String {
    DEFAULT_DOMAIN_DN.to_string()
}

fn default_customers_ou() -> String {
    DEFAULT_CUSTOMERS_OU.to_string()
}

fn default_tenants_ou() -> String {
    DEFAULT_TENANTS_OU.to_string()
}

fn default_staging_container() -> String {
    DEFAULT_STAGING_CONTAINER.to_string()
}

fn default_groups() -> Vec<String> {
    DEFAULT_GROUPS.iter().map(|group| group.to_string()).collect()
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            domain_dn: default_domain_dn(),
            customers_ou: default_customers_ou(),
            tenants_ou: default_tenants_ou(),
            staging_container: default_staging_container(),
            groups: default_groups(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ImportConfigError {
    #[error("domain DN must be made of DC= components: {0}")]
    InvalidDomainDn(String),
}

impl ImportConfig {
    /// Load the import config from environment variables
    ///
    /// * `ADIMPORT_DOMAIN_DN` - Root of the domain (Default: DC=example,DC=org)
    /// * `ADIMPORT_GROUPS` - Comma separated groups users are added to
    pub fn from_env() -> Result<Self, ImportConfigError> {
        let mut config = Self::default();

        if let Ok(domain_dn) = std::env::var("ADIMPORT_DOMAIN_DN") {
            config.domain_dn = domain_dn;
        }

        if let Ok(groups) = std::env::var("ADIMPORT_GROUPS") {
            config.groups = groups
                .split(',')
                .map(str::trim)
                .filter(|group| !group.is_empty())
                .map(str::to_string)
                .collect();
        }

        config.validate()?;
        Ok(config)
    }

    /// Ensure the domain root is usable for building paths
    pub fn validate(&self) -> Result<(), ImportConfigError> {
        let components = dn::components(&self.domain_dn).len();
        let domain_components = dn::domain_root(&self.domain_dn)
            .map(|root| dn::components(&root).len())
            .unwrap_or_default();

        if components == 0 || components != domain_components {
            return Err(ImportConfigError::InvalidDomainDn(self.domain_dn.clone()));
        }

        Ok(())
    }

    /// DN of the unit for the organization `name`
    pub fn organization_dn(&self, name: &str) -> String {
        format!(
            "OU={},OU={},{}",
            dn::escape_value(name),
            dn::escape_value(&self.customers_ou),
            self.domain_dn
        )
    }

    /// DN of the user `account_name` within the users container of `tenant`
    pub fn tenant_user_dn(&self, tenant: &str, account_name: &str) -> String {
        format!(
            "CN={},OU=Users,OU={},OU={},{}",
            dn::escape_value(account_name),
            dn::escape_value(tenant),
            dn::escape_value(&self.tenants_ou),
            self.domain_dn
        )
    }

    /// DN new accounts named `account_name` are created at before being moved
    pub fn staging_user_dn(&self, account_name: &str) -> String {
        format!(
            "CN={},CN={},{}",
            dn::escape_value(account_name),
            dn::escape_value(&self.staging_container),
            self.domain_dn
        )
    }
}
