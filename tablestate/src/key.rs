//! Row keys and key resolution.

use std::fmt;
use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;
use uuid::Uuid;

use crate::error::{TableError, TableResult};
use crate::record::{Record, Value};

/// Stable identifier of a table row (or of a child row within its parent).
///
/// Keys are compared as strings. Numeric key fields resolve to their JSON
/// text, so a row `{ "id": 1 }` has the key `"1"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowKey(String);

impl RowKey {
    /// Create a key from any string-like value.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Render a field value as a key.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::String(s) => Self(s.clone()),
            other => Self(other.to_string()),
        }
    }

    /// Get the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The key as a field value, used when writing a fresh key into a record.
    pub fn to_value(&self) -> Value {
        Value::String(self.0.clone())
    }
}

impl fmt::Display for RowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RowKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl From<String> for RowKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl From<&RowKey> for RowKey {
    fn from(key: &RowKey) -> Self {
        key.clone()
    }
}

macro_rules! impl_from_int {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for RowKey {
                fn from(key: $ty) -> Self {
                    Self(key.to_string())
                }
            }
        )*
    };
}

impl_from_int!(i32, i64, u32, u64, usize);

/// Identifier of a lazily loaded child row, scoped to its parent.
pub type ChildKey = RowKey;

type KeyFn = dyn Fn(&Record) -> RowKey + Send + Sync;
type WriteFn = dyn Fn(&mut Record, &RowKey) + Send + Sync;

/// Maps a record to its [`RowKey`].
///
/// Resolution is pure and stable. Distinct rows of the same sequence must
/// resolve to distinct keys; that is the caller's responsibility.
#[derive(Clone)]
pub enum RowKeyResolver {
    /// Read the key from the first of these fields that is present.
    Fields(Vec<String>),
    /// Compute the key with a host closure.
    ///
    /// Without a `write` closure, fresh keys go to `id`, which only works
    /// if `read` looks there.
    Custom {
        read: Arc<KeyFn>,
        write: Option<Arc<WriteFn>>,
    },
}

impl RowKeyResolver {
    /// Resolve keys from a single field.
    pub fn field(name: impl Into<String>) -> Self {
        Self::Fields(vec![name.into()])
    }

    /// Resolve keys with a closure.
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&Record) -> RowKey + Send + Sync + 'static,
    {
        Self::Custom {
            read: Arc::new(f),
            write: None,
        }
    }

    /// Set how a fresh key is stored in a record.
    ///
    /// Only custom resolvers take a writer; field resolvers ignore it.
    pub fn with_writer<F>(self, f: F) -> Self
    where
        F: Fn(&mut Record, &RowKey) + Send + Sync + 'static,
    {
        match self {
            Self::Custom { read, .. } => Self::Custom {
                read,
                write: Some(Arc::new(f)),
            },
            fields => fields,
        }
    }

    /// Resolver used for child rows: `id`, falling back to `key`.
    pub fn child_default() -> Self {
        Self::Fields(vec!["id".to_string(), "key".to_string()])
    }

    /// Resolve the key of a record.
    pub fn resolve(&self, record: &Record) -> RowKey {
        match self {
            Self::Fields(fields) => fields
                .iter()
                .find_map(|field| record.get(field))
                .map(RowKey::from_value)
                .unwrap_or_else(|| RowKey::from_value(&Value::Null)),
            Self::Custom { read, .. } => read(record),
        }
    }

    /// Field a freshly generated key is written to.
    ///
    /// Custom resolvers fall back to `id`.
    pub fn key_field(&self) -> &str {
        match self {
            Self::Fields(fields) => fields.first().map(String::as_str).unwrap_or("id"),
            Self::Custom { .. } => "id",
        }
    }

    /// Write `key` into `record`.
    ///
    /// Fails with `ConfigurationIgnored` if the record does not resolve to
    /// `key` afterwards, so a new row can never share a key with another.
    pub fn assign(&self, record: &mut Record, key: &RowKey) -> TableResult {
        match self {
            Self::Custom {
                write: Some(write), ..
            } => write(record, key),
            _ => {
                record.insert(self.key_field(), key.to_value());
            }
        }
        if &self.resolve(record) == key {
            Ok(())
        } else {
            log::warn!("fresh key {} is not visible to the row key resolver", key);
            Err(TableError::ignored(
                "row key resolver does not read the field fresh keys are written to",
            ))
        }
    }

    /// Generate a new unique row key.
    pub fn fresh_key() -> RowKey {
        RowKey(format!("row_{}", Uuid::new_v4().simple()))
    }

    /// Position of the row with `key` in `rows`.
    pub fn position(&self, rows: &[Record], key: &RowKey) -> Option<usize> {
        rows.iter().position(|row| &self.resolve(row) == key)
    }
}

impl Default for RowKeyResolver {
    fn default() -> Self {
        Self::field("id")
    }
}

impl fmt::Debug for RowKeyResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fields(fields) => f.debug_tuple("Fields").field(fields).finish(),
            Self::Custom { .. } => f.write_str("Custom(..)"),
        }
    }
}
