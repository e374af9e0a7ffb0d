use adimport_core::config::ImportConfig;
use adimport_directory::DirectoryConfig;
use eyre::Context;
use serde::Deserialize;
use std::path::Path;

/// Configuration for the import tool, either loaded from a JSON file
/// or from the environment
#[derive(Debug, Clone, Deserialize)]
pub struct CliConfiguration {
    pub directory: DirectoryConfig,
    #[serde(default)]
    pub import: ImportConfig,
}

impl CliConfiguration {
    pub fn from_env() -> eyre::Result<Self> {
        let directory = DirectoryConfig::from_env().context("invalid directory configuration")?;
        let import = ImportConfig::from_env().context("invalid import configuration")?;
        Ok(Self { directory, import })
    }

    pub async fn from_file(path: &Path) -> eyre::Result<Self> {
        let config_raw = tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: CliConfiguration =
            serde_json::from_slice(&config_raw).context("failed to parse config")?;
        config
            .import
            .validate()
            .context("invalid import configuration")?;
        Ok(config)
    }

    /// Load the config from `path` when provided, otherwise from the environment
    pub async fn load(path: Option<&Path>) -> eyre::Result<Self> {
        match path {
            Some(path) => Self::from_file(path).await,
            None => Self::from_env(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_config() {
        let config: CliConfiguration = serde_json::from_str(
            r#"{
                "directory": {
                    "provider": "ldap",
                    "url": "ldaps://dc01.example.org:636",
                    "bind_dn": "CN=svc_import,CN=Users,DC=example,DC=org"
                },
                "import": { "groups": ["staff"] }
            }"#,
        )
        .unwrap();

        let DirectoryConfig::Ldap(ldap) = config.directory else {
            panic!("expected ldap directory config");
        };
        assert_eq!(ldap.url, "ldaps://dc01.example.org:636");
        assert_eq!(config.import.groups, vec!["staff".to_string()]);
        assert_eq!(config.import.domain_dn, "DC=example,DC=org");
    }

    #[test]
    fn test_parse_config_default_import() {
        let config: CliConfiguration =
            serde_json::from_str(r#"{ "directory": { "provider": "memory" } }"#).unwrap();
        assert!(matches!(config.directory, DirectoryConfig::Memory(_)));
        assert_eq!(config.import.customers_ou, "Customers");
    }
}
