//! Endpoint handlers.
//!
//! Each handler parses its body, validates it, opens a fresh ClickHouse connection,
//! delegates to one component and wraps the outcome in the success envelope. The
//! connection is dropped when the handler returns, on success and on error.

use crate::db::SchemaInspector;
use crate::error::{BridgeError, BridgeResult};
use crate::gateway::envelope::{
    ColumnsPayload, Envelope, FileExportPayload, ImportPayload, PreviewPayload, TablesPayload,
};
use crate::gateway::requests::{
    ColumnsRequest, ExportRequest, ImportForm, JoinRequest, PreviewRequest,
};
use crate::gateway::state::Settings;
use crate::models::ConnectionConfig;
use crate::transfer::{Exporter, Importer, Joiner};
use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::response::Html;
use std::sync::Arc;
use tracing::debug;

type AppState = State<Arc<Settings>>;

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> BridgeResult<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| {
            BridgeError::invalid_input(format!("Invalid request body: {}", rejection.body_text()))
        })
}

/// `GET /`: the frontend entry page.
pub async fn index(State(settings): AppState) -> BridgeResult<Html<String>> {
    let path = settings.static_dir.join("index.html");
    let page = tokio::fs::read_to_string(&path).await.map_err(|e| {
        BridgeError::internal(format!(
            "Frontend page not available at {}: {}",
            path.display(),
            e
        ))
    })?;
    Ok(Html(page))
}

/// `POST /api/get_tables`
pub async fn get_tables(
    State(settings): AppState,
    payload: Result<Json<ConnectionConfig>, JsonRejection>,
) -> BridgeResult<Json<Envelope<TablesPayload>>> {
    let connection = json_body(payload)?;
    debug!(target_db = %connection.target(), "get_tables");

    let handle = settings.connect(&connection).await?;
    let tables = SchemaInspector::new(&handle, settings.statements)
        .list_tables(handle.database())
        .await?;

    Ok(Envelope::success(TablesPayload {
        tables: tables.into_iter().map(|t| t.name).collect(),
    }))
}

/// `POST /api/get_columns`
pub async fn get_columns(
    State(settings): AppState,
    payload: Result<Json<ColumnsRequest>, JsonRejection>,
) -> BridgeResult<Json<Envelope<ColumnsPayload>>> {
    let request = json_body(payload)?;
    let table = request.table()?;
    debug!(target_db = %request.connection.target(), table, "get_columns");

    let handle = settings.connect(&request.connection).await?;
    let columns = SchemaInspector::new(&handle, settings.statements)
        .describe_columns(table)
        .await?;

    Ok(Envelope::success(ColumnsPayload { columns }))
}

/// `POST /api/preview_data`
pub async fn preview_data(
    State(settings): AppState,
    payload: Result<Json<PreviewRequest>, JsonRejection>,
) -> BridgeResult<Json<Envelope<PreviewPayload>>> {
    let request = json_body(payload)?;
    let (table, columns) = request.target()?;
    debug!(target_db = %request.connection.target(), table, "preview_data");

    let handle = settings.connect(&request.connection).await?;
    let preview = Exporter::new(&handle, settings.statements, &settings.staging)
        .preview(table, columns)
        .await?;

    Ok(Envelope::success(PreviewPayload { preview }))
}

/// `POST /api/ingest_clickhouse_to_flatfile`
pub async fn ingest_clickhouse_to_flatfile(
    State(settings): AppState,
    payload: Result<Json<ExportRequest>, JsonRejection>,
) -> BridgeResult<Json<Envelope<FileExportPayload>>> {
    let request = json_body(payload)?;
    let spec = request.spec()?;

    let handle = settings.connect(&request.connection).await?;
    let outcome = Exporter::new(&handle, settings.statements, &settings.staging)
        .export_to_file(&spec)
        .await?;

    Ok(Envelope::success(FileExportPayload {
        record_count: outcome.record_count,
        output_file: outcome.output_file,
    }))
}

/// `POST /api/ingest_flatfile_to_clickhouse` (multipart)
pub async fn ingest_flatfile_to_clickhouse(
    State(settings): AppState,
    payload: Result<Multipart, MultipartRejection>,
) -> BridgeResult<Json<Envelope<ImportPayload>>> {
    let multipart = payload.map_err(|rejection| {
        BridgeError::invalid_input(format!("Invalid multipart body: {}", rejection.body_text()))
    })?;
    let mut form = ImportForm::read(multipart, settings.upload_limit_bytes).await?;
    let spec = form.spec()?;
    let file = form.take_file()?;
    let connection = form.connection()?;

    let handle = settings.connect(&connection).await?;
    let record_count = Importer::new(&handle, settings.statements, &settings.staging)
        .import_csv(&spec, &file)
        .await?;

    Ok(Envelope::success(ImportPayload {
        record_count,
        table: spec.table,
    }))
}

/// `POST /api/join_tables`
pub async fn join_tables(
    State(settings): AppState,
    payload: Result<Json<JoinRequest>, JsonRejection>,
) -> BridgeResult<Json<Envelope<FileExportPayload>>> {
    let request = json_body(payload)?;
    let spec = request.spec()?;

    let handle = settings.connect(&request.connection).await?;
    let outcome = Joiner::new(&handle, settings.statements, &settings.staging)
        .join_to_file(&spec)
        .await?;

    Ok(Envelope::success(FileExportPayload {
        record_count: outcome.record_count,
        output_file: outcome.output_file,
    }))
}
