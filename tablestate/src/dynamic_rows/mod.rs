//! Dynamic rows
//!
//! Add, insert, delete, copy and move rows around a cursor, and hand the
//! rendered table to a host [`Exporter`](crate::handler::Exporter).

mod config;
mod engine;
mod export;

pub use config::{DynamicRowsConfig, RowFactory};
pub use engine::DynamicRowEngine;
pub use export::{
    DEFAULT_DOWNLOAD_NAME, ExportTarget, Orientation, PrintOptions, PrintPreset, Watermark,
    WatermarkPosition, resolve_print_options,
};
