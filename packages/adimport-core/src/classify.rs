use crate::record::{ImportRecord, ObjectClassShape};

/// Object class marking an organization
pub const ORGANIZATION_CLASS: &str = "groupOfNames";

/// User classes accepted when the record lists its object classes
const LIST_USER_CLASSES: &[&str] = &["person", "inetOrgPerson"];

/// User classes accepted when the record has a single object class
const SCALAR_USER_CLASSES: &[&str] = &["person", "organizationalPerson", "inetOrgPerson"];

/// What a record should be provisioned as
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Organization,
    User,
    Unrecognized,
}

/// Determine what kind of directory object `record` describes
pub fn classify(record: &ImportRecord) -> RecordKind {
    let Some(classes) = record.objectclass.as_ref() else {
        return RecordKind::Unrecognized;
    };

    if classes.contains(ORGANIZATION_CLASS) {
        return RecordKind::Organization;
    }

    let user_classes = match classes.shape() {
        ObjectClassShape::Scalar => SCALAR_USER_CLASSES,
        ObjectClassShape::List => LIST_USER_CLASSES,
    };

    if classes.contains_any(user_classes) {
        return RecordKind::User;
    }

    RecordKind::Unrecognized
}
