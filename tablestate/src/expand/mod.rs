//! Row expansion with lazy child loading, plus parent and child selection.
//!
//! The engine provides:
//! - Expand/collapse with a per-row child cache (kept across collapse)
//! - De-duplicated, concurrent child loading with stale-result guards
//! - Top-level selection gated by `row_checkable` and `max_selection`
//! - Per-parent child selection gated by `child_row_checkable`
//! - Parent/child linkage under a [`LinkagePolicy`](crate::config::LinkagePolicy)

mod engine;
mod load;
mod selection;

pub use engine::ExpansionSelectionEngine;
pub use load::{ExpandAllReport, LoadState};
pub use selection::Selection;
