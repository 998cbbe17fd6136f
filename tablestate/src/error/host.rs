//! Errors reported by host collaborators

/// Error returned by a host event handler (e.g. a rejected save).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct HandlerError {
    /// Error message.
    pub message: String,
}

impl HandlerError {
    /// Create a new handler error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<String> for HandlerError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for HandlerError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

/// Error returned by a child-row loader.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct LoadError {
    /// Error message.
    pub message: String,
}

impl LoadError {
    /// Create a new load error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<String> for LoadError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for LoadError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

/// Errors reported by a print/export backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExportError {
    /// The backend cannot perform this kind of export.
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// The export target could not be found.
    #[error("Target not found: {0}")]
    TargetNotFound(String),

    /// The export started but failed.
    #[error("Export failed: {0}")]
    Failed(String),
}
