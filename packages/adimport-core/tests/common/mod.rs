pub mod directory;

use adimport_core::config::ImportConfig;
use adimport_directory::memory::{MemoryDirectory, MemoryDirectoryConfig, MemoryGroupConfig};

pub fn test_config() -> ImportConfig {
    ImportConfig::default()
}

/// Directory holding the containers and groups of a freshly prepared domain,
/// with user containers for the "acme" and "jdoe" tenants
pub fn create_test_directory() -> MemoryDirectory {
    MemoryDirectory::from_config(MemoryDirectoryConfig {
        containers: vec![
            "OU=Customers,DC=example,DC=org".to_string(),
            "CN=Users,DC=example,DC=org".to_string(),
            "OU=Users,OU=acme,OU=Collectivites,DC=example,DC=org".to_string(),
            "OU=Users,OU=jdoe,OU=Collectivites,DC=example,DC=org".to_string(),
        ],
        groups: vec![
            MemoryGroupConfig {
                name: "generic_app_group_1".to_string(),
                dn: "CN=generic_app_group_1,CN=Users,DC=example,DC=org".to_string(),
            },
            MemoryGroupConfig {
                name: "generic_app_group_2".to_string(),
                dn: "CN=generic_app_group_2,CN=Users,DC=example,DC=org".to_string(),
            },
        ],
    })
}
