//! Schema introspection.
//!
//! Lists the tables of a database and describes the columns of one table through
//! ClickHouse's system tables and `DESCRIBE TABLE`.

use crate::db::client::ClickHouseHandle;
use crate::db::statement::{self, StatementBuilder};
use crate::db::types::QueryResult;
use crate::error::BridgeResult;
use crate::models::{ColumnDescriptor, TableDescriptor};
use tracing::debug;

/// Schema inspector for database introspection.
pub struct SchemaInspector<'a> {
    handle: &'a ClickHouseHandle,
    statements: StatementBuilder,
}

impl<'a> SchemaInspector<'a> {
    pub fn new(handle: &'a ClickHouseHandle, statements: StatementBuilder) -> Self {
        Self { handle, statements }
    }

    /// List all tables in `database`. The name is bound as a query parameter.
    pub async fn list_tables(&self, database: &str) -> BridgeResult<Vec<TableDescriptor>> {
        let result = self
            .handle
            .fetch(
                statement::LIST_TABLES,
                &[(statement::LIST_TABLES_PARAM, database)],
            )
            .await?;

        let tables = result
            .data
            .iter()
            .map(|row| QueryResult::text_at(row, 0).map(|name| TableDescriptor { name }))
            .collect::<BridgeResult<Vec<_>>>()?;

        debug!(database, count = tables.len(), "Listed tables");
        Ok(tables)
    }

    /// Describe a table's columns in declaration order.
    pub async fn describe_columns(&self, table: &str) -> BridgeResult<Vec<ColumnDescriptor>> {
        let sql = self.statements.describe_table(table);
        let result = self.handle.fetch(&sql, &[]).await?;

        // DESCRIBE returns name, type, default_type, default_expression, comment, ...
        let columns = result
            .data
            .iter()
            .map(|row| {
                Ok(ColumnDescriptor::new(
                    QueryResult::text_at(row, 0)?,
                    QueryResult::text_at(row, 1)?,
                ))
            })
            .collect::<BridgeResult<Vec<_>>>()?;

        debug!(table, count = columns.len(), "Described table");
        Ok(columns)
    }
}
