//! Dynamic row configuration.

use std::fmt;
use std::sync::Arc;

use crate::handler::Exporter;
use crate::record::Record;

use super::export::{PrintOptions, PrintPreset};

/// Factory for the fields of a new row.
pub type RowFactory = Arc<dyn Fn() -> Record + Send + Sync>;

/// Structural row operations and their export hooks.
///
/// Every operation is enabled by default.
#[derive(Clone)]
pub struct DynamicRowsConfig {
    pub enable_add: bool,
    pub enable_insert: bool,
    pub enable_delete: bool,
    pub enable_copy: bool,
    pub enable_move: bool,
    pub enable_print: bool,

    /// Fields of new rows; a fresh key is written over them.
    pub default_row: Option<RowFactory>,
    /// Deleting arms a confirmation instead of deleting at once.
    pub confirm_delete: bool,

    /// Print/download backend.
    pub exporter: Option<Arc<dyn Exporter>>,
    /// Explicit export options, overriding the preset.
    pub print_options: Option<PrintOptions>,
    pub print_preset: PrintPreset,
    /// Replaces the preset's watermark text.
    pub print_watermark_text: Option<String>,
}

impl Default for DynamicRowsConfig {
    fn default() -> Self {
        Self {
            enable_add: true,
            enable_insert: true,
            enable_delete: true,
            enable_copy: true,
            enable_move: true,
            enable_print: true,
            default_row: None,
            confirm_delete: false,
            exporter: None,
            print_options: None,
            print_preset: PrintPreset::Table,
            print_watermark_text: None,
        }
    }
}

impl DynamicRowsConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build new rows from a factory.
    pub fn with_default_row<F>(mut self, f: F) -> Self
    where
        F: Fn() -> Record + Send + Sync + 'static,
    {
        self.default_row = Some(Arc::new(f));
        self
    }

    /// Require confirmation before deleting.
    pub fn with_confirm_delete(mut self) -> Self {
        self.confirm_delete = true;
        self
    }

    /// Set the export backend.
    pub fn with_exporter(mut self, exporter: impl Exporter + 'static) -> Self {
        self.exporter = Some(Arc::new(exporter));
        self
    }

    pub fn with_print_options(mut self, options: PrintOptions) -> Self {
        self.print_options = Some(options);
        self
    }

    pub fn with_print_preset(mut self, preset: PrintPreset) -> Self {
        self.print_preset = preset;
        self
    }

    pub fn with_watermark_text(mut self, text: impl Into<String>) -> Self {
        self.print_watermark_text = Some(text.into());
        self
    }

    /// Disable adding and inserting rows.
    pub fn without_add(mut self) -> Self {
        self.enable_add = false;
        self.enable_insert = false;
        self
    }

    pub fn without_delete(mut self) -> Self {
        self.enable_delete = false;
        self
    }

    pub fn without_copy(mut self) -> Self {
        self.enable_copy = false;
        self
    }

    pub fn without_move(mut self) -> Self {
        self.enable_move = false;
        self
    }

    pub fn without_print(mut self) -> Self {
        self.enable_print = false;
        self
    }
}

impl fmt::Debug for DynamicRowsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicRowsConfig")
            .field("enable_add", &self.enable_add)
            .field("enable_insert", &self.enable_insert)
            .field("enable_delete", &self.enable_delete)
            .field("enable_copy", &self.enable_copy)
            .field("enable_move", &self.enable_move)
            .field("enable_print", &self.enable_print)
            .field("has_default_row", &self.default_row.is_some())
            .field("confirm_delete", &self.confirm_delete)
            .field("has_exporter", &self.exporter.is_some())
            .field("print_options", &self.print_options)
            .field("print_preset", &self.print_preset)
            .field("print_watermark_text", &self.print_watermark_text)
            .finish()
    }
}
