use adimport_directory::{
    AttributeChange, Directory, DirectoryEntry, DirectoryError, SearchScope,
    memory::MemoryDirectory,
};
use std::sync::Mutex;

/// Result code used for injected failures (LDAP "unwilling to perform")
pub const INJECTED_FAILURE_CODE: u32 = 53;

/// Directory operation recorded by the [TestDirectory]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    CreateContainer { dn: String },
    Search { base: String },
    CreateUser { dn: String, account_name: String },
    Rename { dn: String, new_dn: String },
    Modify { dn: String, changes: Vec<AttributeChange> },
    AddGroupMember { group: String, member_dn: String },
}

impl Operation {
    /// Check if the operation changes the directory
    pub fn is_write(&self) -> bool {
        !matches!(self, Operation::Search { .. })
    }
}

/// Kind of operation to inject failures into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    CreateContainer,
    Search,
    CreateUser,
    Rename,
    Modify,
    AddGroupMember,
}

impl Operation {
    fn kind(&self) -> OperationKind {
        match self {
            Operation::CreateContainer { .. } => OperationKind::CreateContainer,
            Operation::Search { .. } => OperationKind::Search,
            Operation::CreateUser { .. } => OperationKind::CreateUser,
            Operation::Rename { .. } => OperationKind::Rename,
            Operation::Modify { .. } => OperationKind::Modify,
            Operation::AddGroupMember { .. } => OperationKind::AddGroupMember,
        }
    }
}

/// Memory directory wrapper that records every operation and fails
/// operations of the configured kinds
pub struct TestDirectory {
    pub inner: MemoryDirectory,
    operations: Mutex<Vec<Operation>>,
    failing: Mutex<Vec<OperationKind>>,
}

impl TestDirectory {
    pub fn new(inner: MemoryDirectory) -> Self {
        Self {
            inner,
            operations: Default::default(),
            failing: Default::default(),
        }
    }

    /// Make every following operation of `kind` fail
    pub fn fail(&self, kind: OperationKind) {
        self.failing.lock().unwrap().push(kind);
    }

    /// Take the operations recorded so far
    pub fn take_operations(&self) -> Vec<Operation> {
        std::mem::take(&mut *self.operations.lock().unwrap())
    }

    /// Take the write operations recorded so far
    pub fn take_writes(&self) -> Vec<Operation> {
        self.take_operations()
            .into_iter()
            .filter(Operation::is_write)
            .collect()
    }

    fn record(&self, operation: Operation) -> Result<(), DirectoryError> {
        let kind = operation.kind();
        self.operations.lock().unwrap().push(operation);

        if self.failing.lock().unwrap().contains(&kind) {
            return Err(DirectoryError::Rejected {
                code: INJECTED_FAILURE_CODE,
                message: "injected failure".to_string(),
            });
        }

        Ok(())
    }
}

impl Directory for TestDirectory {
    async fn create_container(&self, dn: &str) -> Result<(), DirectoryError> {
        self.record(Operation::CreateContainer { dn: dn.to_string() })?;
        self.inner.create_container(dn).await
    }

    async fn search(
        &self,
        base: &str,
        scope: SearchScope,
    ) -> Result<Vec<DirectoryEntry>, DirectoryError> {
        self.record(Operation::Search {
            base: base.to_string(),
        })?;
        self.inner.search(base, scope).await
    }

    async fn create_user(
        &self,
        dn: &str,
        account_name: &str,
        password: &str,
    ) -> Result<(), DirectoryError> {
        self.record(Operation::CreateUser {
            dn: dn.to_string(),
            account_name: account_name.to_string(),
        })?;
        self.inner.create_user(dn, account_name, password).await
    }

    async fn rename(&self, dn: &str, new_dn: &str) -> Result<(), DirectoryError> {
        self.record(Operation::Rename {
            dn: dn.to_string(),
            new_dn: new_dn.to_string(),
        })?;
        self.inner.rename(dn, new_dn).await
    }

    async fn modify(&self, dn: &str, changes: &[AttributeChange]) -> Result<(), DirectoryError> {
        self.record(Operation::Modify {
            dn: dn.to_string(),
            changes: changes.to_vec(),
        })?;
        self.inner.modify(dn, changes).await
    }

    async fn add_group_member(&self, group: &str, member_dn: &str) -> Result<(), DirectoryError> {
        self.record(Operation::AddGroupMember {
            group: group.to_string(),
            member_dn: member_dn.to_string(),
        })?;
        self.inner.add_group_member(group, member_dn).await
    }
}
