//! Dynamic table record

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;

/// A field value. Records store arbitrary JSON values per field.
pub type Value = serde_json::Value;

/// A dynamic row record.
///
/// Records hold field values as an ordered `field -> Value` map. The table
/// never interprets fields except the key field (see
/// [`RowKeyResolver`](crate::key::RowKeyResolver)) and the fields touched by
/// an edit draft.
///
/// # Example
///
/// ```
/// use tablestate::record::Record;
///
/// let record = Record::new()
///     .set("id", 1)
///     .set("name", "Alice");
///
/// assert_eq!(record.get_str("name"), Some("Alice"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: Map<String, Value>,
}

impl Record {
    /// Creates a new empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a record from an existing field map.
    pub fn from_fields(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    // =========================================================================
    // Field access
    // =========================================================================

    /// Returns a reference to the field value, if it exists.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Returns the field as a string slice, if it is a string.
    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(Value::as_str)
    }

    /// Returns `true` if the record contains the given field.
    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Returns a reference to all fields.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Returns the number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` if the record has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    // =========================================================================
    // Setters
    // =========================================================================

    /// Sets a field value (builder pattern).
    pub fn set(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    /// Inserts a field value.
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(field.into(), value.into());
    }

    /// Removes a field and returns its value.
    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.fields.remove(field)
    }

    /// Returns a copy of `self` with every field of `draft` written over it.
    ///
    /// Fields absent from the draft keep their current value.
    pub fn merged(&self, draft: &Record) -> Record {
        let mut merged = self.clone();
        for (field, value) in &draft.fields {
            merged.fields.insert(field.clone(), value.clone());
        }
        merged
    }
}

impl From<Map<String, Value>> for Record {
    fn from(fields: Map<String, Value>) -> Self {
        Self::from_fields(fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_merged_overwrites_only_draft_fields() {
        let live = Record::new().set("id", 1).set("name", "a").set("age", 30);
        let draft = Record::new().set("name", "b");

        let merged = live.merged(&draft);
        assert_eq!(merged.get("id"), Some(&json!(1)));
        assert_eq!(merged.get_str("name"), Some("b"));
        assert_eq!(merged.get("age"), Some(&json!(30)));
        // source untouched
        assert_eq!(live.get_str("name"), Some("a"));
    }

    #[test]
    fn test_deserialize_from_plain_object() {
        let record: Record = serde_json::from_value(json!({"id": "5a", "qty": 2})).unwrap();
        assert_eq!(record.get_str("id"), Some("5a"));
        assert_eq!(record.len(), 2);
    }
}
