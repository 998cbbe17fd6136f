//! Error types

mod host;
mod table;

pub use host::*;
pub use table::*;
