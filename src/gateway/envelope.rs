//! Success payloads and the success envelope.
//!
//! Errors are rendered by `BridgeError`'s `IntoResponse`; everything that succeeds is
//! `{"status": "success", ...payload}` with HTTP 200.

use crate::models::ColumnDescriptor;
use axum::Json;
use serde::Serialize;
use serde_json::{Map, Value as JsonValue};

#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    status: &'static str,
    #[serde(flatten)]
    payload: T,
}

impl<T: Serialize> Envelope<T> {
    pub fn success(payload: T) -> Json<Self> {
        Json(Self {
            status: "success",
            payload,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct TablesPayload {
    pub tables: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ColumnsPayload {
    pub columns: Vec<ColumnDescriptor>,
}

#[derive(Debug, Serialize)]
pub struct PreviewPayload {
    pub preview: Vec<Map<String, JsonValue>>,
}

#[derive(Debug, Serialize)]
pub struct FileExportPayload {
    pub record_count: usize,
    pub output_file: String,
}

#[derive(Debug, Serialize)]
pub struct ImportPayload {
    pub record_count: usize,
    pub table: String,
}
