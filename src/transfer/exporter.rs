//! Table preview and table-to-CSV export.

use crate::db::{ClickHouseHandle, QueryResult, StatementBuilder};
use crate::error::BridgeResult;
use crate::models::{Delimiter, ExportSpec};
use crate::staging::{StagedFile, StagingDirs};
use crate::transfer::csv_file;
use serde_json::{Map, Value as JsonValue};
use std::time::Instant;
use tracing::{info, warn};

/// Maximum number of rows returned by a preview.
pub const PREVIEW_ROW_LIMIT: usize = 100;

/// Result of writing a CSV file into the output staging directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOutcome {
    pub record_count: usize,
    /// Sanitized name of the file actually written
    pub output_file: String,
}

pub struct Exporter<'a> {
    handle: &'a ClickHouseHandle,
    statements: StatementBuilder,
    staging: &'a StagingDirs,
}

impl<'a> Exporter<'a> {
    pub fn new(
        handle: &'a ClickHouseHandle,
        statements: StatementBuilder,
        staging: &'a StagingDirs,
    ) -> Self {
        Self {
            handle,
            statements,
            staging,
        }
    }

    /// First rows of `table` as ordered column → value mappings.
    pub async fn preview(
        &self,
        table: &str,
        columns: &[String],
    ) -> BridgeResult<Vec<Map<String, JsonValue>>> {
        let sql = self
            .statements
            .select_limited(table, columns, PREVIEW_ROW_LIMIT);
        let result = self.handle.fetch(&sql, &[]).await?;

        if result.row_count() > PREVIEW_ROW_LIMIT {
            warn!(
                table,
                rows = result.row_count(),
                limit = PREVIEW_ROW_LIMIT,
                "Preview result truncated"
            );
        }
        Ok(result.into_records(PREVIEW_ROW_LIMIT))
    }

    /// Export every row of the selected columns to a CSV file.
    ///
    /// The output name is resolved first; an unusable name fails before any query runs.
    pub async fn export_to_file(&self, spec: &ExportSpec) -> BridgeResult<ExportOutcome> {
        let start = Instant::now();
        let staged = self.staging.output_path(&spec.output_file)?;
        let sql = self.statements.select(&spec.table, &spec.columns);
        let result = self.handle.fetch(&sql, &[]).await?;
        let outcome = write_output(staged, result, spec.delimiter).await?;

        info!(
            table = %spec.table,
            output_file = %outcome.output_file,
            record_count = outcome.record_count,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Table exported"
        );
        Ok(outcome)
    }
}

/// Write `result` to an already resolved output file on the blocking pool. Shared by
/// table exports and join exports.
pub(crate) async fn write_output(
    staged: StagedFile,
    result: QueryResult,
    delimiter: Delimiter,
) -> BridgeResult<ExportOutcome> {
    let path = staged.path.clone();
    let record_count =
        tokio::task::spawn_blocking(move || csv_file::write_result(&path, &result, delimiter))
            .await??;

    Ok(ExportOutcome {
        record_count,
        output_file: staged.name,
    })
}
