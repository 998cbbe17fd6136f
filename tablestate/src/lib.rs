pub mod config;
pub mod dynamic_rows;
pub mod edit;
pub mod error;
pub mod expand;
pub mod handler;
pub mod key;
pub mod manager;
pub mod pagination;
pub mod record;
pub mod state;

pub use manager::TableManager;

pub mod prelude {
    pub use crate::config::{EditMode, LinkagePolicy, TableConfig};
    pub use crate::dynamic_rows::{
        DynamicRowEngine, DynamicRowsConfig, ExportTarget, PrintOptions, PrintPreset,
    };
    pub use crate::edit::{EditCoordinator, EditSession, SessionKind};
    pub use crate::error::{ExportError, HandlerError, LoadError, TableError, TableResult};
    pub use crate::expand::{ExpandAllReport, ExpansionSelectionEngine, LoadState};
    pub use crate::handler::{AsyncFnLoader, ExpandLoader, Exporter, FnLoader, NoopHandler, TableHandler};
    pub use crate::key::{ChildKey, RowKey, RowKeyResolver};
    pub use crate::manager::TableManager;
    pub use crate::pagination::{Pagination, PaginationConfig};
    pub use crate::record::{Record, Value};
    pub use crate::state::Rows;
}
