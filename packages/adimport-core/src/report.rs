/// Noteworthy events emitted while importing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportEvent {
    /// Organization unit was created
    OrganizationUnitCreated { dn: String },
    /// Organization failed to provision, counted as an error
    OrganizationFailed { message: String },
    /// User already exists and will be updated in place
    UserExists { account_name: String },
    /// User was created and moved to its tenant
    UserCreated { account_name: String },
    /// User failed to provision, counted as an error
    UserFailed { message: String },
    /// User was added to a group
    GroupMemberAdded { group: String, account_name: String },
    /// Adding the user to a group failed, membership is best effort
    /// so this is never counted as an error
    GroupMemberSkipped {
        group: String,
        account_name: String,
        reason: String,
    },
    /// Record was processed, `errors` is the number of errors it produced
    RecordCompleted { index: usize, errors: usize },
}

/// Receiver for [ImportEvent]s
pub trait ImportReporter {
    fn report(&mut self, event: ImportEvent);
}

/// Reporter that discards every event
#[derive(Debug, Default)]
pub struct NoopReporter;

impl ImportReporter for NoopReporter {
    fn report(&mut self, _event: ImportEvent) {}
}

impl ImportReporter for Vec<ImportEvent> {
    fn report(&mut self, event: ImportEvent) {
        self.push(event);
    }
}
