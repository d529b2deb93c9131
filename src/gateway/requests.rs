//! Typed request bodies for the API endpoints.
//!
//! Every JSON body carries the connection fields at the top level next to the
//! endpoint's own fields. Required fields are optional here so that a missing one
//! produces the endpoint's validation message instead of a serde error.

use crate::error::{BridgeError, BridgeResult};
use crate::models::{
    ConnectionConfig, DEFAULT_EXPORT_FILE, DEFAULT_JOIN_FILE, Delimiter, ExportSpec, ImportSpec,
    JoinSpec, UploadedFile, split_list,
};
use axum::extract::Multipart;
use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use serde::Deserialize;
use std::collections::HashMap;

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn non_empty(values: &Option<Vec<String>>) -> Option<&[String]> {
    values.as_deref().filter(|v| !v.is_empty())
}

/// Body of `/api/get_columns`.
#[derive(Debug, Deserialize)]
pub struct ColumnsRequest {
    #[serde(flatten)]
    pub connection: ConnectionConfig,
    #[serde(default)]
    pub table: Option<String>,
}

impl ColumnsRequest {
    pub fn table(&self) -> BridgeResult<&str> {
        present(&self.table).ok_or_else(|| BridgeError::invalid_input("Table name is required."))
    }
}

/// Body of `/api/preview_data`.
#[derive(Debug, Deserialize)]
pub struct PreviewRequest {
    #[serde(flatten)]
    pub connection: ConnectionConfig,
    #[serde(default)]
    pub table: Option<String>,
    #[serde(default)]
    pub columns: Option<Vec<String>>,
}

impl PreviewRequest {
    pub fn target(&self) -> BridgeResult<(&str, &[String])> {
        match (present(&self.table), non_empty(&self.columns)) {
            (Some(table), Some(columns)) => Ok((table, columns)),
            _ => Err(BridgeError::invalid_input(
                "Table name and columns are required.",
            )),
        }
    }
}

/// Body of `/api/ingest_clickhouse_to_flatfile`.
#[derive(Debug, Deserialize)]
pub struct ExportRequest {
    #[serde(flatten)]
    pub connection: ConnectionConfig,
    #[serde(default)]
    pub table: Option<String>,
    #[serde(default)]
    pub columns: Option<Vec<String>>,
    #[serde(default)]
    pub output_file: Option<String>,
    #[serde(default)]
    pub delimiter: Option<String>,
}

impl ExportRequest {
    pub fn spec(&self) -> BridgeResult<ExportSpec> {
        let (Some(table), Some(columns)) = (present(&self.table), non_empty(&self.columns)) else {
            return Err(BridgeError::invalid_input(
                "Table name and selected columns are required.",
            ));
        };
        Ok(ExportSpec {
            table: table.to_string(),
            columns: columns.to_vec(),
            output_file: present(&self.output_file)
                .unwrap_or(DEFAULT_EXPORT_FILE)
                .to_string(),
            delimiter: Delimiter::parse(self.delimiter.as_deref())?,
        })
    }
}

/// Body of `/api/join_tables`.
#[derive(Debug, Deserialize)]
pub struct JoinRequest {
    #[serde(flatten)]
    pub connection: ConnectionConfig,
    #[serde(default)]
    pub tables: Option<Vec<String>>,
    #[serde(default)]
    pub join_condition: Option<String>,
    #[serde(default)]
    pub columns: Option<Vec<String>>,
    #[serde(default)]
    pub output_file: Option<String>,
    #[serde(default)]
    pub delimiter: Option<String>,
}

impl JoinRequest {
    pub fn spec(&self) -> BridgeResult<JoinSpec> {
        let (Some(tables), Some(condition), Some(columns)) = (
            non_empty(&self.tables),
            present(&self.join_condition),
            non_empty(&self.columns),
        ) else {
            return Err(BridgeError::invalid_input(
                "Tables, join_condition and columns are required.",
            ));
        };
        if tables.len() < 2 {
            return Err(BridgeError::invalid_input(
                "At least two tables are required for a join.",
            ));
        }
        Ok(JoinSpec {
            tables: tables.to_vec(),
            join_condition: condition.to_string(),
            columns: columns.to_vec(),
            output_file: present(&self.output_file)
                .unwrap_or(DEFAULT_JOIN_FILE)
                .to_string(),
            delimiter: Delimiter::parse(self.delimiter.as_deref())?,
        })
    }
}

/// The multipart body of `/api/ingest_flatfile_to_clickhouse`, fully read.
#[derive(Debug, Default)]
pub struct ImportForm {
    fields: HashMap<String, String>,
    file: Option<UploadedFile>,
}

impl ImportForm {
    /// Drain every part of the multipart body. Text parts are kept by name; the part
    /// named `file` is kept as the upload.
    pub async fn read(mut multipart: Multipart, upload_limit_bytes: usize) -> BridgeResult<Self> {
        let mut form = Self::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| multipart_error(e, upload_limit_bytes))?
        {
            let name = field.name().unwrap_or("").to_string();
            if name == "file" {
                let file_name = field.file_name().unwrap_or("").to_string();
                let contents = field
                    .bytes()
                    .await
                    .map_err(|e| multipart_error(e, upload_limit_bytes))?;
                form.file = Some(UploadedFile {
                    file_name,
                    contents: contents.to_vec(),
                });
            } else if !name.is_empty() {
                let value = field
                    .text()
                    .await
                    .map_err(|e| multipart_error(e, upload_limit_bytes))?;
                form.fields.insert(name, value);
            }
        }
        Ok(form)
    }

    /// Build a form directly from parts.
    pub fn from_parts(fields: HashMap<String, String>, file: Option<UploadedFile>) -> Self {
        Self { fields, file }
    }

    pub fn connection(&self) -> BridgeResult<ConnectionConfig> {
        ConnectionConfig::from_form(&self.fields)
    }

    fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// Validate the text fields into an import spec.
    ///
    /// `host` counts as required here so a form without it is rejected before the
    /// upload is looked at.
    pub fn spec(&self) -> BridgeResult<ImportSpec> {
        let (Some(_), Some(table), Some(columns), Some(column_types)) = (
            self.field("host"),
            self.field("table"),
            self.field("columns"),
            self.field("column_types"),
        ) else {
            return Err(BridgeError::invalid_input("Missing required fields."));
        };
        ImportSpec::new(
            table,
            split_list(columns),
            split_list(column_types),
            Delimiter::parse(self.fields.get("delimiter").map(String::as_str))?,
        )
    }

    /// Take the uploaded file, which must be present and named.
    pub fn take_file(&mut self) -> BridgeResult<UploadedFile> {
        let file = self
            .file
            .take()
            .ok_or_else(|| BridgeError::invalid_input("No file part in the request."))?;
        if file.file_name.trim().is_empty() {
            return Err(BridgeError::invalid_input("No selected file."));
        }
        Ok(file)
    }
}

fn multipart_error(err: MultipartError, upload_limit_bytes: usize) -> BridgeError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        BridgeError::invalid_input(format!(
            "File too large. Maximum upload size is {} MB.",
            upload_limit_bytes / 1024 / 1024
        ))
    } else {
        BridgeError::invalid_input(format!("Failed to read multipart body: {}", err.body_text()))
    }
}
