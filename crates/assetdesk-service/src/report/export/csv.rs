//! CSV writer.

use std::path::Path;

use assetdesk_core::config::CsvExportConfig;
use assetdesk_core::result::AppResult;
use assetdesk_entity::report::Row;

use super::{ExportColumn, TableWriter, cell_text, write_error};

/// Header of labels, then one record per row in column order.
#[derive(Debug, Clone, Copy)]
pub struct CsvTableWriter {
    delimiter: u8,
    quote: u8,
}

impl CsvTableWriter {
    /// Creates a writer with explicit delimiter and quote bytes.
    pub fn new(delimiter: u8, quote: u8) -> Self {
        Self { delimiter, quote }
    }

    /// Creates a writer from configuration.
    pub fn from_config(config: &CsvExportConfig) -> AppResult<Self> {
        Ok(Self::new(config.delimiter_byte()?, config.enclosure_byte()?))
    }
}

impl TableWriter for CsvTableWriter {
    fn write(
        &self,
        rows: &mut dyn Iterator<Item = AppResult<Row>>,
        columns: &[ExportColumn],
        _title: &str,
        out: &Path,
    ) -> AppResult<u64> {
        let mut writer = ::csv::WriterBuilder::new()
            .delimiter(self.delimiter)
            .quote(self.quote)
            .from_path(out)
            .map_err(|e| write_error("CSV", e))?;

        writer
            .write_record(columns.iter().map(|c| c.label.as_str()))
            .map_err(|e| write_error("CSV", e))?;

        let mut count = 0u64;
        for row in rows {
            let row = row?;
            writer
                .write_record(columns.iter().map(|c| cell_text(row.get(&c.name))))
                .map_err(|e| write_error("CSV", e))?;
            count += 1;
        }

        writer.flush().map_err(|e| write_error("CSV", e))?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::export::test_support;

    fn read_back(path: &Path, delimiter: u8, quote: u8) -> Vec<Vec<String>> {
        let mut reader = ::csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .quote(quote)
            .has_headers(false)
            .from_path(path)
            .unwrap();
        reader
            .records()
            .map(|r| r.unwrap().iter().map(str::to_string).collect())
            .collect()
    }

    #[test]
    fn test_round_trip_preserves_rows_values_and_order() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("assets.csv");
        let rows = test_support::rows();
        let columns = test_support::columns();

        let written = CsvTableWriter::new(b',', b'"')
            .write(&mut test_support::feed(rows.clone()), &columns, "Assets", &out)
            .unwrap();

        let records = read_back(&out, b',', b'"');
        assert_eq!(written, 3);
        assert_eq!(records.len(), 4);
        assert_eq!(
            records[0],
            vec!["Asset Tag", "Name", "Purchase Cost", "Active", "Purchase Date"]
        );
        for (record, row) in records[1..].iter().zip(&rows) {
            let expected: Vec<String> = columns
                .iter()
                .map(|c| cell_text(row.get(&c.name)))
                .collect();
            assert_eq!(record, &expected);
        }
        assert_eq!(records[1][1], "Laptop, 14\"");
        assert_eq!(records[2][1], "Dock\nUSB-C");
        assert_eq!(records[2][4], "");
    }

    #[test]
    fn test_configured_delimiter() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("assets.csv");
        let config = CsvExportConfig {
            delimiter: ";".to_string(),
            enclosure: "'".to_string(),
        };
        CsvTableWriter::from_config(&config)
            .unwrap()
            .write(
                &mut test_support::feed(test_support::rows()),
                &test_support::columns(),
                "Assets",
                &out,
            )
            .unwrap();

        let raw = std::fs::read_to_string(&out).unwrap();
        assert!(raw.starts_with("Asset Tag;Name;Purchase Cost;Active;Purchase Date\n"));
        let records = read_back(&out, b';', b'\'');
        assert_eq!(records[3][0], "AT-0003");
    }

    #[test]
    fn test_empty_result_writes_header_only() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("empty.csv");
        let written = CsvTableWriter::new(b',', b'"')
            .write(
                &mut test_support::feed(Vec::new()),
                &test_support::columns(),
                "Assets",
                &out,
            )
            .unwrap();
        assert_eq!(written, 0);
        assert_eq!(read_back(&out, b',', b'"').len(), 1);
    }
}
