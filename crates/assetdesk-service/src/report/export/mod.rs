//! Report exporters.
//!
//! Every writer runs on a blocking thread and pulls rows from a bounded
//! channel, writing straight into a temporary file. The temporary file is
//! removed when the returned [`ExportArtifact`] is dropped.

pub mod csv;
pub mod pdf;
pub mod xlsx;

use std::path::{Path, PathBuf};

use serde_json::Value;
use tempfile::NamedTempFile;
use tokio::sync::mpsc;

use assetdesk_core::AppError;
use assetdesk_core::config::ExportConfig;
use assetdesk_core::result::AppResult;
use assetdesk_entity::report::{ExportFormat, FieldType, ReportKind, Row};

/// One output column: source field, header label and value type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportColumn {
    /// Field name in each row.
    pub name: String,
    /// Header label.
    pub label: String,
    /// Value type, used for typed cells.
    pub field_type: FieldType,
}

impl ExportColumn {
    /// Columns for `names`, labelled from `kind`'s catalogue.
    ///
    /// Unknown names are rejected; resolved definitions never contain them.
    pub fn for_kind(kind: ReportKind, names: &[String]) -> AppResult<Vec<Self>> {
        names
            .iter()
            .map(|name| {
                let def = kind.field(name).ok_or_else(|| {
                    AppError::validation(format!("Unknown column '{name}' for {kind} reports"))
                })?;
                Ok(Self {
                    name: def.name.to_string(),
                    label: def.label.to_string(),
                    field_type: def.field_type,
                })
            })
            .collect()
    }
}

/// A finished export waiting to be uploaded.
#[derive(Debug)]
pub struct ExportArtifact {
    /// The temporary file holding the output.
    pub file: NamedTempFile,
    /// Output size.
    pub size_bytes: u64,
    /// MIME type of the output.
    pub mime_type: &'static str,
    /// File extension without the dot.
    pub extension: &'static str,
    /// Number of data rows written.
    pub row_count: u64,
}

impl ExportArtifact {
    /// Path of the temporary file.
    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

/// Blocking iterator over rows arriving on a channel.
#[derive(Debug)]
pub struct RowFeed {
    rx: mpsc::Receiver<AppResult<Row>>,
}

impl RowFeed {
    /// Wrap a receiver. Must only be iterated off the async runtime.
    pub fn new(rx: mpsc::Receiver<AppResult<Row>>) -> Self {
        Self { rx }
    }
}

impl Iterator for RowFeed {
    type Item = AppResult<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        self.rx.blocking_recv()
    }
}

/// Writes a table of rows to a file in one format.
pub trait TableWriter: Send {
    /// Write every row from `rows` to `out`, returning the data row count.
    fn write(
        &self,
        rows: &mut dyn Iterator<Item = AppResult<Row>>,
        columns: &[ExportColumn],
        title: &str,
        out: &Path,
    ) -> AppResult<u64>;
}

/// Format dispatcher for the table writers.
#[derive(Debug, Clone, Default)]
pub struct ReportExporter {
    config: ExportConfig,
    temp_dir: Option<PathBuf>,
}

impl ReportExporter {
    /// Creates an exporter with the given rendering options.
    pub fn new(config: ExportConfig) -> Self {
        Self {
            config,
            temp_dir: None,
        }
    }

    /// Write temporary files under `dir` instead of the system temp dir.
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    fn writer(&self, format: ExportFormat) -> AppResult<Box<dyn TableWriter>> {
        Ok(match format {
            ExportFormat::Csv => Box::new(csv::CsvTableWriter::from_config(&self.config.csv)?),
            ExportFormat::Xlsx => Box::new(xlsx::XlsxTableWriter),
            ExportFormat::Pdf => Box::new(pdf::PdfTableWriter::new(self.config.pdf.clone())),
        })
    }

    /// Export rows from `rows` into a temporary file of `format`.
    pub async fn export(
        &self,
        rows: mpsc::Receiver<AppResult<Row>>,
        columns: Vec<ExportColumn>,
        format: ExportFormat,
        title: &str,
    ) -> AppResult<ExportArtifact> {
        let writer = self.writer(format)?;
        let title = title.to_string();
        let temp_dir = self.temp_dir.clone();

        let handle = tokio::task::spawn_blocking(move || -> AppResult<ExportArtifact> {
            let mut builder = tempfile::Builder::new();
            builder.prefix("assetdesk-report-");
            let suffix = format!(".{}", format.extension());
            builder.suffix(&suffix);
            let file = match &temp_dir {
                Some(dir) => builder.tempfile_in(dir)?,
                None => builder.tempfile()?,
            };

            let mut feed = RowFeed::new(rows);
            let row_count = writer.write(&mut feed, &columns, &title, file.path())?;
            let size_bytes = std::fs::metadata(file.path())?.len();

            Ok(ExportArtifact {
                file,
                size_bytes,
                mime_type: format.mime_type(),
                extension: format.extension(),
                row_count,
            })
        });

        let artifact = handle
            .await
            .map_err(|e| AppError::internal(format!("Export task failed: {e}")))??;

        tracing::debug!(
            format = %format,
            rows = artifact.row_count,
            bytes = artifact.size_bytes,
            "Report exported"
        );
        Ok(artifact)
    }
}

/// Plain-text rendering of a cell value.
pub(crate) fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(other) => other.to_string(),
    }
}

/// Map a writer failure to a storage error.
pub(crate) fn write_error(format: &str, err: impl std::fmt::Display) -> AppError {
    AppError::storage(format!("Failed to write {format} export: {err}"))
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use serde_json::json;

    pub fn columns() -> Vec<ExportColumn> {
        ExportColumn::for_kind(
            ReportKind::Asset,
            &[
                "asset_tag".to_string(),
                "name".to_string(),
                "purchase_cost".to_string(),
                "is_active".to_string(),
                "purchase_date".to_string(),
            ],
        )
        .unwrap()
    }

    pub fn rows() -> Vec<Row> {
        let values = vec![
            json!({"asset_tag": "AT-0001", "name": "Laptop, 14\"", "purchase_cost": 1299.5, "is_active": true, "purchase_date": "2024-03-01"}),
            json!({"asset_tag": "AT-0002", "name": "Dock\nUSB-C", "purchase_cost": 189, "is_active": false, "purchase_date": null}),
            json!({"asset_tag": "AT-0003", "name": "Monitor", "purchase_cost": "249.99", "is_active": true, "purchase_date": "not a date"}),
        ];
        values
            .into_iter()
            .filter_map(|v| match v {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .collect()
    }

    pub fn feed(rows: Vec<Row>) -> impl Iterator<Item = AppResult<Row>> {
        rows.into_iter().map(Ok)
    }
}
