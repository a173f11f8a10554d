//! Per-format export rendering options.

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Rendering options for every export format.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExportConfig {
    /// CSV options.
    #[serde(default)]
    pub csv: CsvExportConfig,
    /// PDF options.
    #[serde(default)]
    pub pdf: PdfExportConfig,
}

/// CSV writer options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CsvExportConfig {
    /// Single-byte field delimiter.
    #[serde(default = "default_delimiter")]
    pub delimiter: String,
    /// Single-byte quote character.
    #[serde(default = "default_enclosure")]
    pub enclosure: String,
}

impl Default for CsvExportConfig {
    fn default() -> Self {
        Self {
            delimiter: default_delimiter(),
            enclosure: default_enclosure(),
        }
    }
}

impl CsvExportConfig {
    /// The delimiter as a byte.
    pub fn delimiter_byte(&self) -> Result<u8, AppError> {
        single_byte("export.csv.delimiter", &self.delimiter)
    }

    /// The enclosure as a byte.
    pub fn enclosure_byte(&self) -> Result<u8, AppError> {
        single_byte("export.csv.enclosure", &self.enclosure)
    }
}

fn single_byte(key: &str, value: &str) -> Result<u8, AppError> {
    match value.as_bytes() {
        [b] => Ok(*b),
        _ => Err(AppError::configuration(format!(
            "{key} must be exactly one ASCII character, got '{value}'"
        ))),
    }
}

/// PDF page orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageOrientation {
    /// Tall pages.
    Portrait,
    /// Wide pages.
    #[default]
    Landscape,
}

/// PDF paper size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaperSize {
    /// ISO A4.
    #[default]
    A4,
    /// ISO A3.
    A3,
    /// US Letter.
    Letter,
    /// US Legal.
    Legal,
}

impl PaperSize {
    /// Portrait dimensions in millimetres (width, height).
    pub fn dimensions_mm(&self) -> (f32, f32) {
        match self {
            Self::A4 => (210.0, 297.0),
            Self::A3 => (297.0, 420.0),
            Self::Letter => (215.9, 279.4),
            Self::Legal => (215.9, 355.6),
        }
    }
}

/// PDF rendering options.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PdfExportConfig {
    /// Page orientation.
    #[serde(default)]
    pub orientation: PageOrientation,
    /// Paper size.
    #[serde(default)]
    pub paper_size: PaperSize,
}

impl PdfExportConfig {
    /// Page size in millimetres after applying orientation.
    pub fn page_size_mm(&self) -> (f32, f32) {
        let (w, h) = self.paper_size.dimensions_mm();
        match self.orientation {
            PageOrientation::Portrait => (w, h),
            PageOrientation::Landscape => (h, w),
        }
    }
}

fn default_delimiter() -> String {
    ",".to_string()
}

fn default_enclosure() -> String {
    "\"".to_string()
}
