//! CSV reading and writing for staged files.
//!
//! These functions do blocking file I/O; async callers run them on the blocking pool.
//! Fields are quoted only when they contain the delimiter, a quote or a line break.

use crate::db::types::{QueryResult, cell_text};
use crate::error::{BridgeError, BridgeResult};
use crate::models::Delimiter;
use std::fs::File;
use std::path::Path;
use tracing::debug;

/// Write a query result as CSV: a header with the result's column names, then one
/// line per row. Returns the number of data rows written.
///
/// The destination is truncated and written in place; a failure part-way leaves a
/// partial file behind.
pub fn write_result(path: &Path, result: &QueryResult, delimiter: Delimiter) -> BridgeResult<usize> {
    let file = File::create(path).map_err(|e| {
        BridgeError::export(format!("Cannot create '{}': {}", path.display(), e))
    })?;
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter.as_byte())
        .from_writer(file);

    writer.write_record(result.meta.iter().map(|c| c.name.as_str()))?;
    for row in &result.data {
        writer.write_record(row.iter().map(cell_text))?;
    }
    writer
        .flush()
        .map_err(|e| BridgeError::export(format!("Cannot write '{}': {}", path.display(), e)))?;

    debug!(path = %path.display(), rows = result.row_count(), "CSV written");
    Ok(result.row_count())
}

/// Positions of `columns` within a CSV header, matched by name.
fn header_positions(headers: &csv::StringRecord, columns: &[String]) -> BridgeResult<Vec<usize>> {
    columns
        .iter()
        .map(|column| {
            headers.iter().position(|h| h == column).ok_or_else(|| {
                BridgeError::invalid_input(format!(
                    "Column '{}' not found in CSV header.",
                    column
                ))
            })
        })
        .collect()
}

fn read_error(err: csv::Error) -> BridgeError {
    BridgeError::import(format!("Malformed CSV: {}", err))
}

fn open_reader(path: &Path, delimiter: Delimiter) -> BridgeResult<csv::Reader<File>> {
    let file = File::open(path).map_err(|e| {
        BridgeError::import(format!("Cannot open '{}': {}", path.display(), e))
    })?;
    Ok(csv::ReaderBuilder::new()
        .delimiter(delimiter.as_byte())
        .has_headers(true)
        .flexible(true)
        .from_reader(file))
}

/// Check that every requested column appears in the file's header row.
pub fn check_header(path: &Path, columns: &[String], delimiter: Delimiter) -> BridgeResult<()> {
    let mut reader = open_reader(path, delimiter)?;
    let headers = reader.headers().map_err(read_error)?.clone();
    header_positions(&headers, columns).map(|_| ())
}

/// Rows projected onto a column list, re-encoded as a comma-separated CSV body.
#[derive(Debug, Clone, Default)]
pub struct ProjectedRows {
    pub row_count: usize,
    pub body: Vec<u8>,
}

/// Read every data row of a delimited file, keep the fields named in `columns` (by
/// header name) in `columns` order, and encode them as one CSV payload.
///
/// Rows shorter than the header yield empty fields for the missing positions. Every
/// field that is not a number is quoted, so empty and space-padded strings reach the
/// server as written. The whole file is buffered in memory.
pub fn read_projected(
    path: &Path,
    columns: &[String],
    delimiter: Delimiter,
) -> BridgeResult<ProjectedRows> {
    let mut reader = open_reader(path, delimiter)?;
    let headers = reader.headers().map_err(read_error)?.clone();
    let positions = header_positions(&headers, columns)?;

    let mut writer = csv::WriterBuilder::new()
        .delimiter(b',')
        .quote_style(csv::QuoteStyle::NonNumeric)
        .from_writer(Vec::new());
    let mut row_count = 0;

    for record in reader.records() {
        let record = record.map_err(read_error)?;
        writer.write_record(positions.iter().map(|&i| record.get(i).unwrap_or("")))?;
        row_count += 1;
    }

    let body = writer
        .into_inner()
        .map_err(|e| BridgeError::internal(format!("Failed to encode rows: {}", e)))?;

    debug!(path = %path.display(), rows = row_count, "CSV parsed");
    Ok(ProjectedRows { row_count, body })
}
