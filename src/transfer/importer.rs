//! CSV-to-table import.
//!
//! The sequence is drop, create, insert. It is not transactional: if the insert fails
//! the freshly created table is left empty and the previous table is gone.

use crate::db::{ClickHouseHandle, StatementBuilder};
use crate::error::BridgeResult;
use crate::models::{ImportSpec, UploadedFile};
use crate::staging::StagingDirs;
use crate::transfer::csv_file;
use std::time::Instant;
use tracing::{debug, info};

pub struct Importer<'a> {
    handle: &'a ClickHouseHandle,
    statements: StatementBuilder,
    staging: &'a StagingDirs,
}

impl<'a> Importer<'a> {
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

    /// Stage `source`, recreate `spec.table`, and insert every row of the file.
    /// Returns the number of rows inserted.
    pub async fn import_csv(&self, spec: &ImportSpec, source: &UploadedFile) -> BridgeResult<usize> {
        let start = Instant::now();
        let staged = self
            .staging
            .persist_upload(&source.file_name, &source.contents)
            .await?;

        // Fail on unknown columns before anything destructive runs.
        {
            let path = staged.path.clone();
            let columns = spec.columns.clone();
            let delimiter = spec.delimiter;
            tokio::task::spawn_blocking(move || {
                csv_file::check_header(&path, &columns, delimiter)
            })
            .await??;
        }

        self.handle
            .execute(&self.statements.drop_table_if_exists(&spec.table))
            .await?;
        self.handle
            .execute(
                &self
                    .statements
                    .create_table(&spec.table, spec.column_definitions()),
            )
            .await?;
        debug!(table = %spec.table, columns = spec.columns.len(), "Table recreated");

        let projected = {
            let path = staged.path.clone();
            let columns = spec.columns.clone();
            let delimiter = spec.delimiter;
            tokio::task::spawn_blocking(move || {
                csv_file::read_projected(&path, &columns, delimiter)
            })
            .await??
        };

        if projected.row_count > 0 {
            let sql = self.statements.insert_csv(&spec.table, &spec.columns);
            self.handle.insert(&sql, projected.body).await?;
        }

        info!(
            table = %spec.table,
            source = %staged.name,
            record_count = projected.row_count,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "CSV imported"
        );
        Ok(projected.row_count)
    }
}
