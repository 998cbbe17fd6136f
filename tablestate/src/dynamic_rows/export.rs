//! Print and download options.

use serde::{Deserialize, Serialize};

/// Default file name for downloads.
pub const DEFAULT_DOWNLOAD_NAME: &str = "table.png";

/// Opaque handle to the rendered region an [`Exporter`](crate::handler::Exporter)
/// captures. The table never looks inside it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExportTarget(String);

impl ExportTarget {
    /// Create a target handle.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The handle as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ExportTarget {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Where the watermark is drawn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WatermarkPosition {
    Center,
    #[default]
    Repeat,
    Corner,
    Diagonal,
}

/// Page orientation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

/// Watermark drawn over the capture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Watermark {
    /// Text to draw.
    pub text: String,
    /// Placement.
    pub position: WatermarkPosition,
    /// Font size in pixels.
    pub text_size: u32,
    /// CSS colour.
    pub text_color: String,
}

/// Options handed to the exporter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrintOptions {
    pub watermark: Option<Watermark>,
    pub orientation: Option<Orientation>,
    /// Capture scale factor.
    pub scale: Option<f32>,
    /// Image quality (0..=1).
    pub quality: Option<f32>,
}

impl PrintOptions {
    /// Replace the watermark text, keeping the rest of the watermark.
    pub fn with_watermark_text(mut self, text: impl Into<String>) -> Self {
        if let Some(watermark) = self.watermark.as_mut() {
            watermark.text = text.into();
        }
        self
    }
}

/// Built-in option sets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrintPreset {
    /// Landscape, repeated light watermark.
    #[default]
    Table,
    /// Portrait, diagonal watermark.
    Form,
    /// Centered red watermark, high quality capture.
    Report,
}

impl PrintPreset {
    /// The options this preset stands for.
    pub fn options(self) -> PrintOptions {
        match self {
            Self::Table => PrintOptions {
                watermark: Some(Watermark {
                    text: "Data table".to_string(),
                    position: WatermarkPosition::Repeat,
                    text_size: 14,
                    text_color: "rgba(100, 100, 100, 0.25)".to_string(),
                }),
                orientation: Some(Orientation::Landscape),
                scale: Some(1.2),
                quality: None,
            },
            Self::Form => PrintOptions {
                watermark: Some(Watermark {
                    text: "Form data".to_string(),
                    position: WatermarkPosition::Diagonal,
                    text_size: 16,
                    text_color: "rgba(150, 150, 150, 0.2)".to_string(),
                }),
                orientation: Some(Orientation::Portrait),
                scale: None,
                quality: None,
            },
            Self::Report => PrintOptions {
                watermark: Some(Watermark {
                    text: "Confidential report".to_string(),
                    position: WatermarkPosition::Center,
                    text_size: 24,
                    text_color: "rgba(200, 50, 50, 0.15)".to_string(),
                }),
                orientation: None,
                scale: None,
                quality: Some(0.95),
            },
        }
    }
}

/// Pick the options for an export.
///
/// Explicit options win as given. Otherwise the preset is used, with its
/// watermark text replaced when `watermark_text` is set.
pub fn resolve_print_options(
    explicit: Option<&PrintOptions>,
    preset: PrintPreset,
    watermark_text: Option<&str>,
) -> PrintOptions {
    if let Some(options) = explicit {
        return options.clone();
    }
    let options = preset.options();
    match watermark_text {
        Some(text) => options.with_watermark_text(text),
        None => options,
    }
}
