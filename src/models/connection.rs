//! Connection-related data models.
//!
//! A [`ConnectionConfig`] travels with every request; nothing about the target
//! database is configured server-side.

use crate::error::{BridgeError, BridgeResult};
use serde::Deserialize;
use std::collections::HashMap;
use url::Url;

/// Default ClickHouse port when the request does not name one.
pub const DEFAULT_PORT: u16 = 9000;
pub const DEFAULT_DATABASE: &str = "default";
pub const DEFAULT_USER: &str = "default";

/// Database connection parameters supplied by the caller.
#[derive(Clone, Deserialize)]
pub struct ConnectionConfig {
    #[serde(default)]
    pub host: String,
    #[serde(default = "default_port", deserialize_with = "flexible::port")]
    pub port: u16,
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    /// Bearer token forwarded to the server. Contains sensitive data - never log
    #[serde(default, alias = "auth_token")]
    pub jwt_token: Option<String>,
    /// Use TLS (https) for the connection
    #[serde(default, deserialize_with = "flexible::flag")]
    pub secure: bool,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

impl ConnectionConfig {
    /// Create a configuration for `host` with every other field at its default.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_PORT,
            database: None,
            user: None,
            jwt_token: None,
            secure: false,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.jwt_token = Some(token.into());
        self
    }

    /// Build a configuration from multipart form fields, with the same parsing rules
    /// as the JSON endpoints.
    pub fn from_form(fields: &HashMap<String, String>) -> BridgeResult<Self> {
        const KEYS: &[&str] = &[
            "host",
            "port",
            "database",
            "user",
            "jwt_token",
            "auth_token",
            "secure",
        ];
        let map: serde_json::Map<String, serde_json::Value> = KEYS
            .iter()
            .filter_map(|key| {
                fields
                    .get(*key)
                    .map(|v| (key.to_string(), serde_json::Value::String(v.clone())))
            })
            .collect();
        serde_json::from_value(serde_json::Value::Object(map))
            .map_err(|e| BridgeError::invalid_input(format!("Invalid connection settings: {}", e)))
    }

    /// Target database, falling back to `default` when absent or blank.
    pub fn database(&self) -> &str {
        non_blank(self.database.as_deref()).unwrap_or(DEFAULT_DATABASE)
    }

    /// Database user, falling back to `default` when absent or blank.
    pub fn user(&self) -> &str {
        non_blank(self.user.as_deref()).unwrap_or(DEFAULT_USER)
    }

    /// Bearer token, if one was supplied and is not blank.
    pub fn token(&self) -> Option<&str> {
        non_blank(self.jwt_token.as_deref())
    }

    /// Check the invariants that must hold before a connection attempt.
    pub fn validate(&self) -> BridgeResult<()> {
        if self.host.trim().is_empty() {
            return Err(BridgeError::invalid_input("Host is required."));
        }
        Ok(())
    }

    /// Base URL of the ClickHouse HTTP interface for this configuration.
    pub fn base_url(&self) -> BridgeResult<Url> {
        self.validate()?;
        let scheme = if self.secure { "https" } else { "http" };
        let mut url = Url::parse(&format!("{}://localhost/", scheme))
            .map_err(|e| BridgeError::internal(format!("Invalid base URL: {}", e)))?;
        let host = self.host.trim();
        url.set_host(Some(host))
            .map_err(|e| BridgeError::invalid_input(format!("Invalid host '{}': {}", host, e)))?;
        url.set_port(Some(self.port))
            .map_err(|_| BridgeError::invalid_input(format!("Invalid port {}", self.port)))?;
        Ok(url)
    }

    /// Display-safe description of the target, for log fields.
    pub fn target(&self) -> String {
        format!("{}:{}/{}", self.host, self.port, self.database())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

impl std::fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database())
            .field("user", &self.user())
            .field("jwt_token", &self.token().map(|_| "****"))
            .field("secure", &self.secure)
            .finish()
    }
}

/// Lenient field parsers: browsers and form posts send numbers and booleans as text.
///
/// Values go through `serde_json::Value` so that numbers survive being buffered by
/// `#[serde(flatten)]` with `arbitrary_precision` enabled.
mod flexible {
    use super::DEFAULT_PORT;
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub fn port<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u16, D::Error> {
        match Option::<Value>::deserialize(deserializer)? {
            None | Some(Value::Null) => Ok(DEFAULT_PORT),
            Some(Value::Number(n)) => n
                .as_u64()
                .and_then(|n| u16::try_from(n).ok())
                .ok_or_else(|| D::Error::custom(format!("port {} is out of range", n))),
            Some(Value::String(s)) if s.trim().is_empty() => Ok(DEFAULT_PORT),
            Some(Value::String(s)) => s
                .trim()
                .parse()
                .map_err(|_| D::Error::custom(format!("invalid port '{}'", s))),
            Some(other) => Err(D::Error::custom(format!("invalid port {}", other))),
        }
    }

    pub fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        match Option::<Value>::deserialize(deserializer)? {
            None | Some(Value::Null) => Ok(false),
            Some(Value::Bool(b)) => Ok(b),
            Some(Value::String(s)) => Ok(s.trim().eq_ignore_ascii_case("true")),
            Some(other) => Err(D::Error::custom(format!("invalid flag {}", other))),
        }
    }
}
