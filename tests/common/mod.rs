//! Shared helpers for integration tests.
//!
//! `FakeClickHouse` is a small in-process stand-in for the ClickHouse HTTP interface:
//! it understands exactly the statements the bridge issues and keeps tables in
//! memory. `TestApp` wraps the bridge router with temporary staging directories.

#![allow(dead_code)]

use axum::Router;
use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, Request, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use clickhouse_flatfile_bridge::gateway::{self, Settings};
use clickhouse_flatfile_bridge::staging::StagingDirs;
use serde_json::{Value as JsonValue, json};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tower::util::ServiceExt;

pub const BOUNDARY: &str = "----TestBoundary1234567890";

/// One statement as the fake server received it.
#[derive(Debug, Clone)]
pub struct RecordedStatement {
    pub sql: String,
    pub authorization: Option<String>,
    pub user: Option<String>,
    pub params: HashMap<String, String>,
    /// Row payload sent alongside an `INSERT`, empty otherwise.
    pub data: String,
}

#[derive(Debug, Clone)]
struct FakeTable {
    columns: Vec<(String, String)>,
    rows: Vec<Vec<String>>,
}

#[derive(Debug, Default)]
struct FakeState {
    tables: BTreeMap<String, FakeTable>,
    statements: Vec<RecordedStatement>,
    required_token: Option<String>,
}

type Shared = Arc<Mutex<FakeState>>;
type Failure = (StatusCode, String);

pub struct FakeClickHouse {
    pub port: u16,
    state: Shared,
}

impl FakeClickHouse {
    pub async fn start() -> Self {
        Self::spawn(FakeState::default()).await
    }

    /// A server that rejects every request not carrying `Bearer <token>`.
    pub async fn start_with_token(token: &str) -> Self {
        Self::spawn(FakeState {
            required_token: Some(token.to_string()),
            ..FakeState::default()
        })
        .await
    }

    async fn spawn(state: FakeState) -> Self {
        let state = Arc::new(Mutex::new(state));
        let app = Router::new()
            .route("/", post(handle))
            .with_state(state.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Self { port, state }
    }

    /// Connection fields pointing at this server.
    pub fn connection(&self) -> JsonValue {
        json!({"host": "127.0.0.1", "port": self.port, "database": "default", "user": "default"})
    }

    /// Connection fields merged with endpoint-specific fields.
    pub fn request(&self, extra: JsonValue) -> JsonValue {
        let mut body = self.connection();
        if let (Some(target), JsonValue::Object(fields)) = (body.as_object_mut(), extra) {
            target.extend(fields);
        }
        body
    }

    /// Connection fields as multipart text parts.
    pub fn form_fields(&self) -> Vec<(String, String)> {
        vec![
            ("host".to_string(), "127.0.0.1".to_string()),
            ("port".to_string(), self.port.to_string()),
            ("database".to_string(), "default".to_string()),
            ("secure".to_string(), "false".to_string()),
        ]
    }

    pub fn seed_table(&self, name: &str, columns: &[(&str, &str)], rows: &[&[&str]]) {
        let table = FakeTable {
            columns: columns
                .iter()
                .map(|(n, t)| (n.to_string(), t.to_string()))
                .collect(),
            rows: rows
                .iter()
                .map(|row| row.iter().map(|v| v.to_string()).collect())
                .collect(),
        };
        self.state
            .lock()
            .unwrap()
            .tables
            .insert(name.to_string(), table);
    }

    pub fn table_rows(&self, name: &str) -> Option<Vec<Vec<String>>> {
        self.state
            .lock()
            .unwrap()
            .tables
            .get(name)
            .map(|t| t.rows.clone())
    }

    pub fn table_columns(&self, name: &str) -> Option<Vec<(String, String)>> {
        self.state
            .lock()
            .unwrap()
            .tables
            .get(name)
            .map(|t| t.columns.clone())
    }

    pub fn statements(&self) -> Vec<RecordedStatement> {
        self.state.lock().unwrap().statements.clone()
    }

    /// The most recent `INSERT` the server received.
    pub fn last_insert(&self) -> Option<RecordedStatement> {
        self.statements()
            .into_iter()
            .rev()
            .find(|s| s.sql.starts_with("INSERT INTO "))
    }

    /// Statements other than the liveness check.
    pub fn sql_log(&self) -> Vec<String> {
        self.statements()
            .into_iter()
            .map(|s| s.sql)
            .filter(|sql| sql != "SELECT 1")
            .collect()
    }
}

async fn handle(
    State(state): State<Shared>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: String,
) -> Response {
    let header_text = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    let authorization = header_text("authorization");
    let user = header_text("x-clickhouse-user");

    let (sql, data) = match params.get("query") {
        Some(query) => (query.clone(), body),
        None => (body, String::new()),
    };
    let sql = sql
        .trim()
        .trim_end_matches("FORMAT JSONCompact")
        .trim()
        .to_string();

    let mut state = state.lock().unwrap();
    state.statements.push(RecordedStatement {
        sql: sql.clone(),
        authorization: authorization.clone(),
        user,
        params: params.clone(),
        data: data.clone(),
    });

    if let Some(token) = &state.required_token {
        if authorization.as_deref() != Some(format!("Bearer {}", token).as_str()) {
            return (
                StatusCode::FORBIDDEN,
                "Code: 516. DB::Exception: Authentication failed. (AUTHENTICATION_FAILED)",
            )
                .into_response();
        }
    }

    match state.run(&sql, &params, &data) {
        Ok(Some(result)) => axum::Json(result).into_response(),
        Ok(None) => StatusCode::OK.into_response(),
        Err((status, message)) => (status, message).into_response(),
    }
}

fn bare(identifier: &str) -> String {
    identifier.trim().replace('`', "")
}

fn unknown_table(name: &str) -> Failure {
    (
        StatusCode::NOT_FOUND,
        format!(
            "Code: 60. DB::Exception: Table default.{} does not exist. (UNKNOWN_TABLE)",
            name
        ),
    )
}

fn syntax_error(sql: &str) -> Failure {
    (
        StatusCode::BAD_REQUEST,
        format!("Code: 62. DB::Exception: Syntax error: '{}'. (SYNTAX_ERROR)", sql),
    )
}

/// Render stored text the way JSONCompact does with unquoted 64-bit integers.
fn cell(type_name: &str, text: &str) -> JsonValue {
    if type_name.starts_with("Int") || type_name.starts_with("UInt") {
        json!(text.trim().parse::<i64>().unwrap_or(0))
    } else if type_name.starts_with("Float") {
        json!(text.trim().parse::<f64>().unwrap_or(0.0))
    } else {
        json!(text)
    }
}

/// Split on commas that are not nested inside parentheses.
fn split_top_level(text: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut current = String::new();
    for c in text.chars() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(current.trim().to_string());
                current.clear();
                continue;
            }
            _ => {}
        }
        current.push(c);
    }
    if !current.trim().is_empty() {
        parts.push(current.trim().to_string());
    }
    parts
}

/// Text between the first `(` and its matching `)`, plus everything before it.
fn parenthesized(text: &str) -> Option<(&str, &str)> {
    let open = text.find('(')?;
    let mut depth = 0usize;
    for (i, c) in text[open..].char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some((&text[..open], &text[open + 1..open + i]));
                }
            }
            _ => {}
        }
    }
    None
}

impl FakeState {
    fn table(&self, name: &str) -> Result<&FakeTable, Failure> {
        let name = bare(name);
        self.tables.get(&name).ok_or_else(|| unknown_table(&name))
    }

    fn run(
        &mut self,
        sql: &str,
        params: &HashMap<String, String>,
        data: &str,
    ) -> Result<Option<JsonValue>, Failure> {
        if sql == "SELECT 1" {
            return Ok(Some(json!({
                "meta": [{"name": "1", "type": "UInt8"}],
                "data": [[1]],
                "rows": 1
            })));
        }
        if sql.starts_with("SELECT name FROM system.tables") {
            let database = params.get("param_database").map(String::as_str);
            let names: Vec<JsonValue> = if database == Some("default") {
                self.tables.keys().map(|name| json!([name])).collect()
            } else {
                Vec::new()
            };
            return Ok(Some(json!({
                "meta": [{"name": "name", "type": "String"}],
                "data": names
            })));
        }
        if let Some(name) = sql.strip_prefix("DESCRIBE TABLE ") {
            let table = self.table(name)?;
            let rows: Vec<JsonValue> = table
                .columns
                .iter()
                .map(|(n, t)| json!([n, t, "", "", "", "", ""]))
                .collect();
            return Ok(Some(json!({
                "meta": [
                    {"name": "name", "type": "String"},
                    {"name": "type", "type": "String"},
                    {"name": "default_type", "type": "String"},
                    {"name": "default_expression", "type": "String"},
                    {"name": "comment", "type": "String"},
                    {"name": "codec_expression", "type": "String"},
                    {"name": "ttl_expression", "type": "String"}
                ],
                "data": rows
            })));
        }
        if let Some(name) = sql.strip_prefix("DROP TABLE IF EXISTS ") {
            self.tables.remove(&bare(name));
            return Ok(None);
        }
        if let Some(rest) = sql.strip_prefix("CREATE TABLE ") {
            return self.create(sql, rest).map(|_| None);
        }
        if let Some(rest) = sql.strip_prefix("INSERT INTO ") {
            return self.insert(sql, rest, data).map(|_| None);
        }
        if let Some(rest) = sql.strip_prefix("SELECT ") {
            return self.select(sql, rest).map(Some);
        }
        Err(syntax_error(sql))
    }

    fn create(&mut self, sql: &str, rest: &str) -> Result<(), Failure> {
        let (name, definitions) = parenthesized(rest).ok_or_else(|| syntax_error(sql))?;
        let name = bare(name);
        if self.tables.contains_key(&name) {
            return Err((
                StatusCode::BAD_REQUEST,
                format!(
                    "Code: 57. DB::Exception: Table default.{} already exists. (TABLE_ALREADY_EXISTS)",
                    name
                ),
            ));
        }
        let columns = split_top_level(definitions)
            .iter()
            .map(|definition| {
                definition
                    .split_once(' ')
                    .map(|(n, t)| (bare(n), t.trim().to_string()))
                    .ok_or_else(|| syntax_error(sql))
            })
            .collect::<Result<Vec<_>, _>>()?;
        self.tables.insert(
            name,
            FakeTable {
                columns,
                rows: Vec::new(),
            },
        );
        Ok(())
    }

    fn insert(&mut self, sql: &str, rest: &str, data: &str) -> Result<(), Failure> {
        let (name, column_list) = parenthesized(rest).ok_or_else(|| syntax_error(sql))?;
        let name = bare(name);
        let table = self.table(&name)?;
        let positions = column_list
            .split(',')
            .map(|column| {
                let column = bare(column);
                table
                    .columns
                    .iter()
                    .position(|(n, _)| *n == column)
                    .ok_or_else(|| {
                        (
                            StatusCode::BAD_REQUEST,
                            format!(
                                "Code: 16. DB::Exception: No such column {} in table default.{}. (NO_SUCH_COLUMN_IN_TABLE)",
                                column, name
                            ),
                        )
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let width = table.columns.len();

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_reader(data.as_bytes());
        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| {
                (
                    StatusCode::BAD_REQUEST,
                    format!("Code: 27. DB::Exception: Cannot parse input: {}. (CANNOT_PARSE_INPUT_ASSERTION_FAILED)", e),
                )
            })?;
            let mut row = vec![String::new(); width];
            for (field, &position) in record.iter().zip(&positions) {
                row[position] = field.to_string();
            }
            rows.push(row);
        }

        if let Some(table) = self.tables.get_mut(&name) {
            table.rows.extend(rows);
        }
        Ok(())
    }

    /// Resolve `t.c` or `c` against the tables in scope: (table index, column index, type).
    fn resolve(
        &self,
        scope: &[String],
        expression: &str,
    ) -> Result<(usize, usize, String), Failure> {
        let expression = bare(expression);
        let (qualifier, column) = match expression.split_once('.') {
            Some((t, c)) => (Some(t.to_string()), c.to_string()),
            None => (None, expression.clone()),
        };
        for (ti, table_name) in scope.iter().enumerate() {
            if qualifier.as_ref().is_some_and(|q| q != table_name) {
                continue;
            }
            let table = self.table(table_name)?;
            if let Some(ci) = table.columns.iter().position(|(n, _)| *n == column) {
                return Ok((ti, ci, table.columns[ci].1.clone()));
            }
        }
        Err((
            StatusCode::BAD_REQUEST,
            format!(
                "Code: 47. DB::Exception: Unknown expression identifier `{}`. (UNKNOWN_IDENTIFIER)",
                expression
            ),
        ))
    }

    fn select(&self, sql: &str, rest: &str) -> Result<JsonValue, Failure> {
        let (projection, from) = rest.split_once(" FROM ").ok_or_else(|| syntax_error(sql))?;
        let (from, limit) = match from.rsplit_once(" LIMIT ") {
            Some((source, n)) => (source, n.trim().parse::<usize>().ok()),
            None => (from, None),
        };

        // Combined rows: one source row per table in scope.
        let (scope, combined): (Vec<String>, Vec<Vec<Vec<String>>>) =
            match from.split_once(" ON ") {
                Some((tables, condition)) => {
                    let scope: Vec<String> = tables.split(" JOIN ").map(bare).collect();
                    if scope.len() != 2 {
                        return Err(syntax_error(sql));
                    }
                    let (left, right) = condition.split_once('=').ok_or_else(|| syntax_error(sql))?;
                    let (lt, lc, _) = self.resolve(&scope, left)?;
                    let (rt, rc, _) = self.resolve(&scope, right)?;
                    let a = self.table(&scope[0])?;
                    let b = self.table(&scope[1])?;
                    let mut combined = Vec::new();
                    for ra in &a.rows {
                        for rb in &b.rows {
                            let pair = [ra, rb];
                            if pair[lt][lc] == pair[rt][rc] {
                                combined.push(vec![ra.clone(), rb.clone()]);
                            }
                        }
                    }
                    (scope, combined)
                }
                None => {
                    let scope = vec![bare(from)];
                    let table = self.table(from)?;
                    let combined = table.rows.iter().map(|r| vec![r.clone()]).collect();
                    (scope, combined)
                }
            };

        let expressions: Vec<String> = if projection.trim() == "*" {
            self.table(&scope[0])?
                .columns
                .iter()
                .map(|(n, _)| n.clone())
                .collect()
        } else {
            projection.split(',').map(bare).collect()
        };
        let resolved = expressions
            .iter()
            .map(|e| self.resolve(&scope, e))
            .collect::<Result<Vec<_>, _>>()?;

        let meta: Vec<JsonValue> = expressions
            .iter()
            .zip(&resolved)
            .map(|(name, (_, _, type_name))| json!({"name": name, "type": type_name}))
            .collect();
        let data: Vec<JsonValue> = combined
            .iter()
            .take(limit.unwrap_or(usize::MAX))
            .map(|sources| {
                JsonValue::Array(
                    resolved
                        .iter()
                        .map(|(ti, ci, type_name)| cell(type_name, &sources[*ti][*ci]))
                        .collect(),
                )
            })
            .collect();

        Ok(json!({"meta": meta, "rows": data.len(), "data": data}))
    }
}

/// The bridge router over temporary staging directories.
pub struct TestApp {
    pub router: Router,
    pub staging: StagingDirs,
    _dir: TempDir,
}

impl TestApp {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let staging = StagingDirs::new(dir.path().join("uploads"), dir.path().join("output"));
        staging.prepare().unwrap();
        let mut settings = Settings::with_staging(staging.clone());
        settings.static_dir = dir.path().join("frontend");
        Self {
            router: gateway::router(Arc::new(settings)),
            staging,
            _dir: dir,
        }
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, JsonValue) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(JsonValue::Null);
        (status, json)
    }

    pub async fn post_json(&self, path: &str, body: &JsonValue) -> (StatusCode, JsonValue) {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(body).unwrap()))
            .unwrap();
        self.send(request).await
    }

    pub async fn post_raw(&self, path: &str, content_type: &str, body: &str) -> (StatusCode, JsonValue) {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header(header::CONTENT_TYPE, content_type)
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    pub async fn post_multipart(
        &self,
        path: &str,
        fields: &[(String, String)],
        file: Option<(&str, &[u8])>,
    ) -> (StatusCode, JsonValue) {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(multipart_body(fields, file)))
            .unwrap();
        self.send(request).await
    }

    /// Import `csv` into `table` through the upload endpoint.
    pub async fn import(
        &self,
        ch: &FakeClickHouse,
        table: &str,
        columns: &str,
        column_types: &str,
        csv: &[u8],
    ) -> (StatusCode, JsonValue) {
        let mut fields = ch.form_fields();
        fields.push(("table".to_string(), table.to_string()));
        fields.push(("columns".to_string(), columns.to_string()));
        fields.push(("column_types".to_string(), column_types.to_string()));
        self.post_multipart(
            "/api/ingest_flatfile_to_clickhouse",
            &fields,
            Some(("upload.csv", csv)),
        )
        .await
    }

    pub fn output_text(&self, name: &str) -> String {
        std::fs::read_to_string(self.staging.output_dir().join(name)).unwrap()
    }
}

/// Build a multipart body with text parts and an optional `file` part.
pub fn multipart_body(fields: &[(String, String)], file: Option<(&str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
        );
        body.extend_from_slice(value.as_bytes());
        body.extend_from_slice(b"\r\n");
    }
    if let Some((file_name, contents)) = file {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n",
                file_name
            )
            .as_bytes(),
        );
        body.extend_from_slice(b"Content-Type: text/csv\r\n\r\n");
        body.extend_from_slice(contents);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}
