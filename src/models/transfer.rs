//! Validated transfer specifications.
//!
//! The gateway turns loosely-shaped request bodies into these types; once one
//! exists its invariants hold, so the transfer components don't re-check them.

use crate::error::{BridgeError, BridgeResult};

/// Default output file for table exports.
pub const DEFAULT_EXPORT_FILE: &str = "output.csv";
/// Default output file for join exports.
pub const DEFAULT_JOIN_FILE: &str = "joined_output.csv";

/// Single-byte field delimiter for CSV reading and writing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delimiter(u8);

impl Delimiter {
    pub const COMMA: Delimiter = Delimiter(b',');

    /// Parse a caller-supplied delimiter. Absent or empty means comma; the escape
    /// sequence `\t` means tab.
    pub fn parse(raw: Option<&str>) -> BridgeResult<Self> {
        let raw = match raw {
            None | Some("") => return Ok(Self::COMMA),
            Some(r"\t") => return Ok(Self(b'\t')),
            Some(raw) => raw,
        };

        let mut chars = raw.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if c.is_ascii() && !matches!(c, '"' | '\n' | '\r') => {
                Ok(Self(c as u8))
            }
            _ => Err(BridgeError::invalid_input(format!(
                "Delimiter must be a single ASCII character, got '{}'.",
                raw
            ))),
        }
    }

    pub fn as_byte(self) -> u8 {
        self.0
    }
}

impl Default for Delimiter {
    fn default() -> Self {
        Self::COMMA
    }
}

/// Export a table (or a column subset) to a CSV file.
#[derive(Debug, Clone)]
pub struct ExportSpec {
    pub table: String,
    pub columns: Vec<String>,
    pub output_file: String,
    pub delimiter: Delimiter,
}

/// Create a table from an uploaded CSV file.
#[derive(Debug, Clone)]
pub struct ImportSpec {
    pub table: String,
    pub columns: Vec<String>,
    pub column_types: Vec<String>,
    pub delimiter: Delimiter,
}

impl ImportSpec {
    pub fn new(
        table: impl Into<String>,
        columns: Vec<String>,
        column_types: Vec<String>,
        delimiter: Delimiter,
    ) -> BridgeResult<Self> {
        let table = table.into();
        if table.trim().is_empty() || columns.is_empty() || column_types.is_empty() {
            return Err(BridgeError::invalid_input("Missing required fields."));
        }
        if columns.len() != column_types.len() {
            return Err(BridgeError::invalid_input(
                "Number of columns and types must match.",
            ));
        }
        if columns.iter().chain(&column_types).any(|s| s.is_empty()) {
            return Err(BridgeError::invalid_input(
                "Column names and types must not be empty.",
            ));
        }
        Ok(Self {
            table,
            columns,
            column_types,
            delimiter,
        })
    }

    /// `(name, type)` pairs in declaration order.
    pub fn column_definitions(&self) -> impl Iterator<Item = (&str, &str)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.column_types.iter().map(String::as_str))
    }
}

/// Join several tables and export the result to a CSV file.
#[derive(Debug, Clone)]
pub struct JoinSpec {
    pub tables: Vec<String>,
    pub join_condition: String,
    pub columns: Vec<String>,
    pub output_file: String,
    pub delimiter: Delimiter,
}

/// An uploaded file as received from the multipart body.
#[derive(Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub contents: Vec<u8>,
}

impl std::fmt::Debug for UploadedFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadedFile")
            .field("file_name", &self.file_name)
            .field("len", &self.contents.len())
            .finish()
    }
}

/// Split a comma-separated form value into trimmed entries.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',').map(|s| s.trim().to_string()).collect()
}
