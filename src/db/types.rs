//! Result types returned by the ClickHouse HTTP interface.
//!
//! Row-returning statements are sent with `FORMAT JSONCompact`, which yields the
//! column metadata plus rows as positional JSON arrays.

use crate::error::{BridgeError, BridgeResult};
use crate::models::ColumnDescriptor;
use serde::Deserialize;
use serde_json::{Map, Value as JsonValue};

/// A `JSONCompact` response body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueryResult {
    /// Result columns, in select order
    pub meta: Vec<ColumnDescriptor>,
    #[serde(default)]
    pub data: Vec<Vec<JsonValue>>,
}

impl QueryResult {
    /// Column names exactly as the server reported them.
    pub fn column_names(&self) -> Vec<String> {
        self.meta.iter().map(|c| c.name.clone()).collect()
    }

    pub fn row_count(&self) -> usize {
        self.data.len()
    }

    /// Zip each row with the column names into an ordered mapping, keeping at most
    /// `limit` rows.
    pub fn into_records(self, limit: usize) -> Vec<Map<String, JsonValue>> {
        let names = self.column_names();
        self.data
            .into_iter()
            .take(limit)
            .map(|row| names.iter().cloned().zip(row).collect())
            .collect()
    }

    /// Text of column `index` in `row`, for metadata queries whose columns are strings.
    pub fn text_at(row: &[JsonValue], index: usize) -> BridgeResult<String> {
        match row.get(index) {
            Some(JsonValue::String(s)) => Ok(s.clone()),
            Some(other) => Ok(cell_text(other)),
            None => Err(BridgeError::query(format!(
                "Unexpected result shape: missing column {}",
                index
            ))),
        }
    }
}

/// Render one cell as CSV field text.
///
/// NULL becomes an empty field; arrays, maps and tuples are written as compact JSON.
pub fn cell_text(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => String::new(),
        JsonValue::Bool(b) => b.to_string(),
        JsonValue::Number(n) => n.to_string(),
        JsonValue::String(s) => s.clone(),
        JsonValue::Array(arr) => serde_json::to_string(arr).unwrap_or_default(),
        JsonValue::Object(obj) => serde_json::to_string(obj).unwrap_or_default(),
    }
}
