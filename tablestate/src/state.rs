use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use crate::record::Record;

/// Host-owned row sequence.
///
/// `Rows` is a cheap-to-clone handle the host creates and hands to the
/// table. The table reads it freely but only ever changes it by replacing
/// the whole sequence, which bumps the revision and raises the dirty flag so
/// the host can detect the change.
///
/// # Example
///
/// ```
/// use tablestate::record::Record;
/// use tablestate::state::Rows;
///
/// let rows = Rows::new(vec![Record::new().set("id", 1)]);
/// let view = rows.clone();
///
/// rows.replace(Vec::new());
/// assert!(view.is_empty());
/// assert!(view.take_dirty());
/// ```
#[derive(Debug)]
pub struct Rows {
    inner: Arc<RwLock<Arc<Vec<Record>>>>,
    revision: Arc<AtomicU64>,
    dirty: Arc<AtomicBool>,
}

impl Rows {
    /// Create a handle over an initial sequence.
    pub fn new(rows: Vec<Record>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(rows))),
            revision: Arc::new(AtomicU64::new(0)),
            dirty: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Current sequence.
    ///
    /// The returned snapshot is immutable; later replacements do not affect it.
    pub fn snapshot(&self) -> Arc<Vec<Record>> {
        self.inner
            .read()
            .map(|guard| Arc::clone(&guard))
            .unwrap_or_else(|poisoned| Arc::clone(&poisoned.into_inner()))
    }

    /// Clone of the current sequence.
    pub fn to_vec(&self) -> Vec<Record> {
        self.snapshot().as_ref().clone()
    }

    /// Run a closure against the current sequence.
    pub fn with<R>(&self, f: impl FnOnce(&[Record]) -> R) -> R {
        f(&self.snapshot())
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    /// Check if there are no rows.
    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    /// Replace the whole sequence.
    pub fn replace(&self, rows: Vec<Record>) {
        if let Ok(mut guard) = self.inner.write() {
            *guard = Arc::new(rows);
            self.revision.fetch_add(1, Ordering::SeqCst);
            self.dirty.store(true, Ordering::SeqCst);
        }
    }

    /// Number of replacements so far.
    pub fn revision(&self) -> u64 {
        self.revision.load(Ordering::SeqCst)
    }

    /// Check if the sequence was replaced since the last [`take_dirty`](Self::take_dirty).
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::SeqCst)
    }

    /// Read and clear the dirty flag.
    pub fn take_dirty(&self) -> bool {
        self.dirty.swap(false, Ordering::SeqCst)
    }
}

impl Clone for Rows {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            revision: Arc::clone(&self.revision),
            dirty: Arc::clone(&self.dirty),
        }
    }
}

impl Default for Rows {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl From<Vec<Record>> for Rows {
    fn from(rows: Vec<Record>) -> Self {
        Self::new(rows)
    }
}
