//! Per-row child loading state.

/// The state of a row's lazily loaded children.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LoadState {
    /// Children have not been requested.
    #[default]
    Idle,
    /// The loader is running.
    Loading,
    /// Children are cached.
    Ready,
    /// The last load failed.
    Failed(String),
}

impl LoadState {
    /// Check if the row was never loaded
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    /// Check if a load is in flight
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    /// Check if children are cached
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }

    /// Check if the last load failed
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// Error message of a failed load
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Failed(message) => Some(message),
            _ => None,
        }
    }
}

/// Outcome of [`expand_all`](super::ExpansionSelectionEngine::expand_all).
///
/// Rows whose loader failed stay collapsed; nothing is retried
/// automatically. Use `refresh` to retry a single row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpandAllReport {
    /// Rows expanded by this call, in row order.
    pub expanded: Vec<crate::key::RowKey>,
    /// Rows whose loader failed, with the loader's message.
    pub failed: Vec<(crate::key::RowKey, String)>,
}

impl ExpandAllReport {
    /// Whether every expandable row was expanded.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}
