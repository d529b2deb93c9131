//! Connection factory and request-scoped ClickHouse handle.
//!
//! A [`ClickHouseHandle`] talks to the ClickHouse HTTP interface. Each handle owns its
//! own HTTP client with idle pooling disabled, so nothing is shared or reused across
//! requests; dropping the handle releases the connection.

use crate::db::statement;
use crate::db::types::QueryResult;
use crate::error::{BridgeError, BridgeResult};
use crate::models::ConnectionConfig;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use std::time::{Duration, Instant};
use tracing::{debug, info};
use url::Url;

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

const USER_HEADER: HeaderName = HeaderName::from_static("x-clickhouse-user");

/// Settings sent with every CSV insert: cells arrive exactly as written, with no
/// whitespace trimming.
pub const INSERT_SETTINGS: &[(&str, &str)] = &[("input_format_csv_trim_whitespaces", "0")];

/// Server-wide client settings, independent of the target database.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Bound on TCP/TLS connection establishment. Queries themselves are not timed out.
    pub connect_timeout: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

/// A live, request-scoped session with one ClickHouse server and database.
#[derive(Debug)]
pub struct ClickHouseHandle {
    http: reqwest::Client,
    base_url: Url,
    database: String,
}

impl ClickHouseHandle {
    /// Build a handle for `config` and verify the server answers.
    ///
    /// The bearer token, when present, is installed once as a default header of the
    /// handle's client. Without a token the user name is sent instead.
    pub async fn connect(config: &ConnectionConfig, options: &ClientOptions) -> BridgeResult<Self> {
        let base_url = config.base_url()?;

        let mut headers = HeaderMap::new();
        match config.token() {
            Some(token) => {
                let mut value = HeaderValue::from_str(&format!("Bearer {}", token)).map_err(|_| {
                    BridgeError::invalid_input("Auth token contains invalid characters.")
                })?;
                value.set_sensitive(true);
                headers.insert(AUTHORIZATION, value);
            }
            None => {
                let value = HeaderValue::from_str(config.user()).map_err(|_| {
                    BridgeError::invalid_input("User name contains invalid characters.")
                })?;
                headers.insert(USER_HEADER, value);
            }
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .connect_timeout(options.connect_timeout)
            .pool_max_idle_per_host(0)
            .build()
            .map_err(|e| BridgeError::connection(format!("Failed to create client: {}", e)))?;

        let handle = Self {
            http,
            base_url,
            database: config.database().to_string(),
        };

        handle.ping().await?;

        info!(
            server = %config.target(),
            secure = config.secure,
            token = config.token().is_some(),
            "Connected to ClickHouse"
        );
        Ok(handle)
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    /// Run the liveness check. Any failure here means the server is unusable.
    async fn ping(&self) -> BridgeResult<()> {
        match self.fetch(statement::PING, &[]).await {
            Ok(_) => Ok(()),
            Err(BridgeError::Query { message, .. }) => Err(BridgeError::connection(message)),
            Err(e) => Err(e),
        }
    }

    /// Run a row-returning statement and parse its `JSONCompact` result.
    ///
    /// `params` are bound server-side: `{name:Type}` placeholders in `sql` are filled
    /// from the matching `(name, value)` pairs.
    pub async fn fetch(&self, sql: &str, params: &[(&str, &str)]) -> BridgeResult<QueryResult> {
        let body = format!("{} FORMAT JSONCompact", sql);
        let text = self.post(&[], params, body.into_bytes(), sql).await?;
        serde_json::from_str(&text)
            .map_err(|e| BridgeError::query(format!("Unexpected response from server: {}", e)))
    }

    /// Run a statement that returns no rows (DDL).
    pub async fn execute(&self, sql: &str) -> BridgeResult<()> {
        self.post(&[], &[], sql.as_bytes().to_vec(), sql).await?;
        Ok(())
    }

    /// Run an `INSERT ... FORMAT <fmt>` statement with `data` as the row payload.
    ///
    /// The statement travels in the `query` URL parameter alongside [`INSERT_SETTINGS`].
    pub async fn insert(&self, sql: &str, data: Vec<u8>) -> BridgeResult<()> {
        let mut settings = vec![("query", sql)];
        settings.extend_from_slice(INSERT_SETTINGS);
        self.post(&settings, &[], data, sql).await?;
        Ok(())
    }

    /// `settings` are passed through as URL parameters; `params` get the `param_` prefix.
    async fn post(
        &self,
        settings: &[(&str, &str)],
        params: &[(&str, &str)],
        body: Vec<u8>,
        sql: &str,
    ) -> BridgeResult<String> {
        let mut url = self.base_url.clone();
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("database", &self.database);
            pairs.append_pair("output_format_json_quote_64bit_integers", "0");
            for (name, value) in settings {
                pairs.append_pair(name, value);
            }
            for (name, value) in params {
                pairs.append_pair(&format!("param_{}", name), value);
            }
        }

        let start = Instant::now();
        let body_len = body.len();
        let response = self.http.post(url).body(body).send().await?;
        let status = response.status();
        let text = response.text().await?;

        debug!(
            sql = %sql,
            status = status.as_u16(),
            body_bytes = body_len,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Statement executed"
        );

        if !status.is_success() {
            return Err(BridgeError::query(text.trim()));
        }
        Ok(text)
    }
}
