//! Table operation errors

use crate::key::RowKey;

/// Diagnostics returned by table operations.
///
/// None of these are fatal: every failing operation leaves the table state
/// untouched (or, for saves, keeps the edit session alive) and logs the
/// reason before returning it.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TableError {
    /// The host rejected a save; the edit session is kept for retry.
    #[error("Save of row {key} rejected: {reason}")]
    ValidationRejected {
        /// Key of the edited row.
        key: RowKey,
        /// Reason reported by the host.
        reason: String,
    },

    /// A print/export capability is not available.
    #[error("{capability} unavailable: {reason}")]
    CapabilityUnavailable {
        /// Name of the capability (`print`, `download`).
        capability: &'static str,
        /// Why it could not be used.
        reason: String,
    },

    /// The request conflicts with the configuration and was ignored.
    #[error("Ignored: {reason}")]
    ConfigurationIgnored {
        /// What was ignored and why.
        reason: String,
    },

    /// The targeted row, child or cursor does not exist.
    #[error("Not found: {what}")]
    NotFound {
        /// Description of the missing target.
        what: String,
    },

    /// The host loader failed for a row.
    #[error("Loading children of row {key} failed: {reason}")]
    LoadFailed {
        /// Key of the parent row.
        key: RowKey,
        /// Reason reported by the loader.
        reason: String,
    },
}

impl TableError {
    /// Creates a new configuration-ignored error.
    pub fn ignored(reason: impl Into<String>) -> Self {
        Self::ConfigurationIgnored {
            reason: reason.into(),
        }
    }

    /// Creates a new not-found error.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    /// Creates a not-found error for a row key.
    pub fn row_not_found(key: &RowKey) -> Self {
        Self::NotFound {
            what: format!("row {key}"),
        }
    }

    /// Creates a new capability-unavailable error.
    pub fn unavailable(capability: &'static str, reason: impl Into<String>) -> Self {
        Self::CapabilityUnavailable {
            capability,
            reason: reason.into(),
        }
    }

    /// Returns `true` if the failure came from a host callback.
    ///
    /// These are the failures worth surfacing to the user; the rest are
    /// benign no-ops.
    pub fn is_host_failure(&self) -> bool {
        matches!(self, Self::ValidationRejected { .. } | Self::LoadFailed { .. })
    }
}

/// Result alias for table operations.
pub type TableResult<T = ()> = Result<T, TableError>;
