use crate::{
    classify::{RecordKind, classify},
    config::ImportConfig,
    organization::provision_organization,
    record::ImportRecord,
    report::{ImportEvent, ImportReporter},
    user::provision_user,
};
use adimport_directory::Directory;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseRecordsError {
    #[error("import file is not valid json: {0}")]
    InvalidJson(serde_json::Error),

    #[error("import file must contain a json array of records")]
    NotAnArray,
}

/// Parse the records from the raw contents of an import file
pub fn parse_records(bytes: &[u8]) -> Result<Vec<ImportRecord>, ParseRecordsError> {
    let value: Value = serde_json::from_slice(bytes).map_err(ParseRecordsError::InvalidJson)?;

    let Value::Array(values) = value else {
        return Err(ParseRecordsError::NotAnArray);
    };

    Ok(values.into_iter().map(ImportRecord::from_value).collect())
}

/// Totals from running a batch
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Number of records processed
    pub records: usize,
    /// Number of records provisioned as organizations
    pub organizations: usize,
    /// Number of records provisioned as users
    pub users: usize,
    /// Number of unrecognized records that were skipped
    pub skipped: usize,
    /// Total number of errors
    pub errors: usize,
}

/// Provision a single record, returns the kind it was handled as and the
/// number of errors it produced
pub async fn import_record(
    directory: &impl Directory,
    config: &ImportConfig,
    record: &ImportRecord,
    reporter: &mut impl ImportReporter,
) -> (RecordKind, usize) {
    let kind = classify(record);
    let errors = match kind {
        RecordKind::Organization => {
            provision_organization(directory, config, record, reporter).await
        }
        RecordKind::User => provision_user(directory, config, record, reporter).await,
        RecordKind::Unrecognized => {
            tracing::debug!(objectclass = ?record.objectclass, "skipping unrecognized record");
            0
        }
    };

    (kind, errors)
}

/// Provision every record in order, one at a time
#[tracing::instrument(skip_all, fields(records = records.len()))]
pub async fn run_batch(
    directory: &impl Directory,
    config: &ImportConfig,
    records: &[ImportRecord],
    reporter: &mut impl ImportReporter,
) -> BatchOutcome {
    let mut outcome = BatchOutcome::default();

    for (index, record) in records.iter().enumerate() {
        let (kind, errors) = import_record(directory, config, record, reporter).await;

        match kind {
            RecordKind::Organization => outcome.organizations += 1,
            RecordKind::User => outcome.users += 1,
            RecordKind::Unrecognized => outcome.skipped += 1,
        }

        outcome.records += 1;
        outcome.errors += errors;

        reporter.report(ImportEvent::RecordCompleted { index, errors });
    }

    tracing::info!(?outcome, "batch complete");
    outcome
}
