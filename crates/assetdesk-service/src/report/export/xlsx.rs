//! XLSX writer.

use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};
use serde_json::Value;

use assetdesk_core::result::AppResult;
use assetdesk_entity::report::{FieldType, Row};

use super::{ExportColumn, TableWriter, cell_text, write_error};

const DATE_FORMAT: &str = "yyyy-mm-dd";
const DATETIME_FORMAT: &str = "yyyy-mm-dd hh:mm:ss";
const MIN_COLUMN_WIDTH: f64 = 10.0;
const MAX_COLUMN_WIDTH: f64 = 60.0;
/// Rows buffered to size the columns before streaming the rest.
const WIDTH_SAMPLE_ROWS: usize = 200;

/// One constant-memory worksheet with a bold header row and typed cells.
///
/// Rows are flushed to disk as they are written, so column widths are sized
/// from the header and the first [`WIDTH_SAMPLE_ROWS`] rows only.
#[derive(Debug, Clone, Copy, Default)]
pub struct XlsxTableWriter;

struct Formats {
    date: Format,
    datetime: Format,
}

impl TableWriter for XlsxTableWriter {
    fn write(
        &self,
        rows: &mut dyn Iterator<Item = AppResult<Row>>,
        columns: &[ExportColumn],
        _title: &str,
        out: &Path,
    ) -> AppResult<u64> {
        let mut sample = Vec::with_capacity(WIDTH_SAMPLE_ROWS);
        for row in (&mut *rows).take(WIDTH_SAMPLE_ROWS) {
            sample.push(row?);
        }

        let mut workbook = Workbook::new();
        let header = Format::new().set_bold();
        let formats = Formats {
            date: Format::new().set_num_format(DATE_FORMAT),
            datetime: Format::new().set_num_format(DATETIME_FORMAT),
        };

        let sheet = workbook.add_worksheet_with_constant_memory();
        for (col, width) in column_widths(columns, &sample).into_iter().enumerate() {
            sheet
                .set_column_width(col as u16, width)
                .map_err(xlsx_error)?;
        }
        for (col, column) in columns.iter().enumerate() {
            sheet
                .write_string_with_format(0, col as u16, &column.label, &header)
                .map_err(xlsx_error)?;
        }

        let mut count = 0u64;
        for row in sample.into_iter().map(Ok).chain(rows) {
            let row = row?;
            let excel_row = (count + 1) as u32;
            for (col, column) in columns.iter().enumerate() {
                write_cell(
                    sheet,
                    excel_row,
                    col as u16,
                    column.field_type,
                    row.get(&column.name),
                    &formats,
                )
                .map_err(xlsx_error)?;
            }
            count += 1;
        }

        workbook.save(out).map_err(xlsx_error)?;
        Ok(count)
    }
}

/// Width per column: the longest of the label and the sampled cells, clamped.
fn column_widths(columns: &[ExportColumn], sample: &[Row]) -> Vec<f64> {
    columns
        .iter()
        .map(|column| {
            let longest = sample
                .iter()
                .map(|row| cell_text(row.get(&column.name)).chars().count())
                .chain(std::iter::once(column.label.chars().count()))
                .max()
                .unwrap_or(0);
            (longest as f64 + 2.0).clamp(MIN_COLUMN_WIDTH, MAX_COLUMN_WIDTH)
        })
        .collect()
}

fn xlsx_error(err: XlsxError) -> assetdesk_core::AppError {
    write_error("XLSX", err)
}

fn write_cell(
    sheet: &mut Worksheet,
    row: u32,
    col: u16,
    field_type: FieldType,
    value: Option<&Value>,
    formats: &Formats,
) -> Result<(), XlsxError> {
    let Some(value) = value.filter(|v| !v.is_null()) else {
        return Ok(());
    };

    match (field_type, value) {
        (FieldType::Integer | FieldType::Decimal, Value::Number(n)) => {
            if let Some(number) = n.as_f64() {
                sheet.write_number(row, col, number)?;
                return Ok(());
            }
        }
        (FieldType::Integer | FieldType::Decimal, Value::String(s)) => {
            if let Ok(number) = s.trim().parse::<f64>() {
                sheet.write_number(row, col, number)?;
                return Ok(());
            }
        }
        (FieldType::Boolean, Value::Bool(b)) => {
            sheet.write_boolean(row, col, *b)?;
            return Ok(());
        }
        (FieldType::Date, Value::String(s)) => {
            if let Some(date) = parse_date(s) {
                sheet.write_datetime_with_format(row, col, &date, &formats.date)?;
                return Ok(());
            }
        }
        (FieldType::DateTime, Value::String(s)) => {
            if let Some(datetime) = parse_datetime(s) {
                sheet.write_datetime_with_format(row, col, &datetime, &formats.datetime)?;
                return Ok(());
            }
        }
        _ => {}
    }

    sheet.write_string(row, col, cell_text(Some(value)))?;
    Ok(())
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .or_else(|| parse_datetime(s).map(|dt| dt.date()))
}

fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.naive_utc())
        .ok()
        .or_else(|| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").ok())
        .or_else(|| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f").ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::export::test_support;

    #[test]
    fn test_writes_workbook() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("assets.xlsx");

        let written = XlsxTableWriter
            .write(
                &mut test_support::feed(test_support::rows()),
                &test_support::columns(),
                "Assets",
                &out,
            )
            .unwrap();

        assert_eq!(written, 3);
        let bytes = std::fs::read(&out).unwrap();
        assert_eq!(&bytes[..2], b"PK");
    }

    #[test]
    fn test_streams_rows_past_width_sample() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("many.xlsx");
        let rows: Vec<Row> = (0..WIDTH_SAMPLE_ROWS + 50)
            .map(|i| test_support::rows()[i % 3].clone())
            .collect();

        let written = XlsxTableWriter
            .write(
                &mut test_support::feed(rows),
                &test_support::columns(),
                "Assets",
                &out,
            )
            .unwrap();

        assert_eq!(written, (WIDTH_SAMPLE_ROWS + 50) as u64);
        assert!(out.exists());
    }

    #[test]
    fn test_column_widths_from_label_and_sample() {
        let columns = test_support::columns();
        let widths = column_widths(&columns, &test_support::rows());
        assert_eq!(widths.len(), columns.len());
        assert!(widths.iter().all(|w| (MIN_COLUMN_WIDTH..=MAX_COLUMN_WIDTH).contains(w)));
        assert!(column_widths(&columns, &[]).iter().all(|w| *w >= MIN_COLUMN_WIDTH));
    }

    #[test]
    fn test_date_parsing_accepts_common_shapes() {
        assert_eq!(
            parse_date("2024-03-01"),
            NaiveDate::from_ymd_opt(2024, 3, 1)
        );
        assert_eq!(
            parse_date("2024-03-01T10:00:00+00:00"),
            NaiveDate::from_ymd_opt(2024, 3, 1)
        );
        assert!(parse_date("not a date").is_none());
        assert!(parse_datetime("2024-03-01 08:15:00").is_some());
        assert!(parse_datetime("2024-03-01T08:15:00.123456").is_some());
    }
}
