use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::BTreeSet;

/// Single object from the import file
///
/// Exports are not consistent about value shapes so every field is read
/// leniently, see [lenient_string]
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ImportRecord {
    /// Object classes of the source entry
    pub objectclass: Option<ObjectClasses>,
    /// Common name, the name of an organization
    #[serde(deserialize_with = "lenient_string")]
    pub cn: Option<String>,
    /// User identifier
    #[serde(deserialize_with = "lenient_string")]
    pub uid: Option<String>,
    /// Distinguished name of the source entry
    #[serde(deserialize_with = "lenient_string")]
    pub dn: Option<String>,
    /// Initial password for new accounts
    #[serde(deserialize_with = "lenient_string")]
    pub userpassword: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub displayname: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub mail: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub sn: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub givenname: Option<String>,
}

impl ImportRecord {
    /// Read a record from a JSON value, values that are not objects
    /// produce an empty record
    pub fn from_value(value: Value) -> Self {
        if !value.is_object() {
            tracing::warn!("import entry is not an object");
            return Self::default();
        }

        match serde_json::from_value(value) {
            Ok(record) => record,
            Err(error) => {
                tracing::warn!(?error, "failed to read import entry");
                Self::default()
            }
        }
    }
}

/// Where the object classes of a record came from, a single string
/// or a list of strings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectClassShape {
    Scalar,
    List,
}

/// Normalized set of object classes for a record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectClasses {
    classes: BTreeSet<String>,
    shape: ObjectClassShape,
}

impl ObjectClasses {
    /// Object classes from a single class name
    pub fn scalar(class: impl Into<String>) -> Self {
        Self {
            classes: BTreeSet::from([class.into()]),
            shape: ObjectClassShape::Scalar,
        }
    }

    /// Object classes from a list of class names
    pub fn list<I, S>(classes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            classes: classes.into_iter().map(Into::into).collect(),
            shape: ObjectClassShape::List,
        }
    }

    fn from_value(value: Value) -> Self {
        match value {
            Value::String(class) => Self::scalar(class),
            Value::Array(values) => Self::list(values.into_iter().filter_map(|value| match value {
                Value::String(class) => Some(class),
                _ => None,
            })),
            _ => Self::list(Vec::<String>::new()),
        }
    }

    pub fn shape(&self) -> ObjectClassShape {
        self.shape
    }

    /// Check if the set contains `class` (case sensitive)
    pub fn contains(&self, class: &str) -> bool {
        self.classes.contains(class)
    }

    /// Check if the set contains any of `classes`
    pub fn contains_any(&self, classes: &[&str]) -> bool {
        classes.iter().any(|class| self.contains(class))
    }
}

impl<'de> Deserialize<'de> for ObjectClasses {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Value::deserialize(deserializer).map(Self::from_value)
    }
}

/// Reads a string from any JSON value
///
/// * strings are used as-is
/// * arrays use their first value
/// * numbers and booleans are converted to strings
/// * `null` and objects are treated as missing
pub fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(value_to_string)
}

fn value_to_string(value: Value) -> Option<String> {
    match value {
        Value::String(value) => Some(value),
        Value::Number(value) => Some(value.to_string()),
        Value::Bool(value) => Some(value.to_string()),
        Value::Array(values) => values.into_iter().next().and_then(value_to_string),
        Value::Null | Value::Object(_) => None,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_fields() {
        let record = ImportRecord::from_value(json!({
            "objectclass": "inetOrgPerson",
            "uid": "jdoe",
            "dn": "cn=jdoe,ou=People,dc=acme,dc=corp",
            "userpassword": "x",
            "mail": "j@acme.test",
            "unknown": { "nested": true }
        }));

        assert_eq!(record.objectclass, Some(ObjectClasses::scalar("inetOrgPerson")));
        assert_eq!(record.uid.as_deref(), Some("jdoe"));
        assert_eq!(record.dn.as_deref(), Some("cn=jdoe,ou=People,dc=acme,dc=corp"));
        assert_eq!(record.userpassword.as_deref(), Some("x"));
        assert_eq!(record.mail.as_deref(), Some("j@acme.test"));
        assert_eq!(record.cn, None);
        assert_eq!(record.sn, None);
    }

    #[test]
    fn test_lenient_values() {
        let record = ImportRecord::from_value(json!({
            "objectclass": ["top", "inetOrgPerson"],
            "uid": 42,
            "mail": ["first@acme.test", "second@acme.test"],
            "sn": null,
            "givenname": [],
            "displayname": true
        }));

        assert_eq!(
            record.objectclass,
            Some(ObjectClasses::list(["top", "inetOrgPerson"]))
        );
        assert_eq!(record.uid.as_deref(), Some("42"));
        assert_eq!(record.mail.as_deref(), Some("first@acme.test"));
        assert_eq!(record.sn, None);
        assert_eq!(record.givenname, None);
        assert_eq!(record.displayname.as_deref(), Some("true"));
    }

    #[test]
    fn test_non_object_is_empty_record() {
        let record = ImportRecord::from_value(json!("groupOfNames"));
        assert!(record.objectclass.is_none());
        assert!(record.cn.is_none());
    }

    #[test]
    fn test_object_class_shapes() {
        let classes = ObjectClasses::from_value(json!("person"));
        assert_eq!(classes.shape(), ObjectClassShape::Scalar);
        assert!(classes.contains("person"));

        let classes = ObjectClasses::from_value(json!(["person", 1, "top"]));
        assert_eq!(classes.shape(), ObjectClassShape::List);
        assert!(classes.contains_any(&["top"]));
        assert!(!classes.contains("Person"));

        let classes = ObjectClasses::from_value(json!(12));
        assert!(!classes.contains_any(&["person", "groupOfNames"]));
    }
}
