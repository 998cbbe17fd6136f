//! Edit sessions - cell, row and modal editing behind one coordinator.
//!
//! The three engines implement the same [`EditEngine`] contract. The
//! [`EditCoordinator`] holds at most one of them as an [`ActiveEdit`], so the
//! "one session at a time" rule is carried by the type rather than by
//! convention.
//!
//! # Example
//!
//! ```ignore
//! let edit = EditCoordinator::new(rows.clone(), config, handler);
//!
//! edit.start(&RowKey::from(2), None)?;
//! edit.update_draft("name", json!("Bob"))?;
//! edit.save().await?;
//! ```

mod coordinator;
mod engines;

pub use coordinator::EditCoordinator;
pub use engines::{ActiveEdit, CellEdit, EditEngine, EditSession, ModalEdit, RowEdit, SessionKind};
