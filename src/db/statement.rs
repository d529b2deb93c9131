//! SQL statement construction.
//!
//! Every piece of SQL text the bridge sends is assembled here. Table and column names
//! arrive from the caller and cannot be bound as parameters, so how they are spliced
//! into the text is decided by [`IdentifierMode`]:
//!
//! - `Verbatim` (default) passes identifiers through unchanged. Callers can project
//!   expressions and qualified names freely, and can also inject SQL.
//! - `Quoted` wraps each dot-separated part in backticks, doubling embedded backticks.
//!
//! Column types and the join predicate are always verbatim; they are expressions, not
//! identifiers.

use std::borrow::Cow;

/// Liveness check run when a connection is established.
pub const PING: &str = "SELECT 1";

/// Tables of one database. The database name is a server-side bound parameter.
pub const LIST_TABLES: &str = "SELECT name FROM system.tables WHERE database = {database:String}";

/// Name of the bound parameter in [`LIST_TABLES`].
pub const LIST_TABLES_PARAM: &str = "database";

/// Storage clause for tables created by an import: general-purpose, unordered.
pub const IMPORT_TABLE_ENGINE: &str = "MergeTree() ORDER BY tuple()";

/// How caller-supplied identifiers are spliced into SQL text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdentifierMode {
    #[default]
    Verbatim,
    Quoted,
}

/// Builds the statements used by the schema inspector and the transfer components.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatementBuilder {
    mode: IdentifierMode,
}

impl StatementBuilder {
    pub fn new(mode: IdentifierMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> IdentifierMode {
        self.mode
    }

    /// Render one identifier according to the builder's mode.
    pub fn identifier<'a>(&self, raw: &'a str) -> Cow<'a, str> {
        match self.mode {
            IdentifierMode::Verbatim => Cow::Borrowed(raw),
            IdentifierMode::Quoted => Cow::Owned(
                raw.split('.')
                    .map(|part| {
                        if part == "*" {
                            part.to_string()
                        } else {
                            format!("`{}`", part.replace('`', "``"))
                        }
                    })
                    .collect::<Vec<_>>()
                    .join("."),
            ),
        }
    }

    fn column_list(&self, columns: &[String]) -> String {
        columns
            .iter()
            .map(|c| self.identifier(c))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// `SELECT <columns> FROM <table>`
    pub fn select(&self, table: &str, columns: &[String]) -> String {
        format!(
            "SELECT {} FROM {}",
            self.column_list(columns),
            self.identifier(table)
        )
    }

    /// `SELECT <columns> FROM <table> LIMIT <limit>`
    pub fn select_limited(&self, table: &str, columns: &[String], limit: usize) -> String {
        format!("{} LIMIT {}", self.select(table, columns), limit)
    }

    /// `SELECT <columns> FROM <t1> JOIN <t2> ... ON <condition>`
    pub fn select_join(&self, tables: &[String], condition: &str, columns: &[String]) -> String {
        let joined = tables
            .iter()
            .map(|t| self.identifier(t))
            .collect::<Vec<_>>()
            .join(" JOIN ");
        format!(
            "SELECT {} FROM {} ON {}",
            self.column_list(columns),
            joined,
            condition
        )
    }

    pub fn describe_table(&self, table: &str) -> String {
        format!("DESCRIBE TABLE {}", self.identifier(table))
    }

    pub fn drop_table_if_exists(&self, table: &str) -> String {
        format!("DROP TABLE IF EXISTS {}", self.identifier(table))
    }

    /// `CREATE TABLE <table> (<name type>, ...) ENGINE = MergeTree() ORDER BY tuple()`
    pub fn create_table<'c>(
        &self,
        table: &str,
        columns: impl IntoIterator<Item = (&'c str, &'c str)>,
    ) -> String {
        let definitions = columns
            .into_iter()
            .map(|(name, type_name)| format!("{} {}", self.identifier(name), type_name))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "CREATE TABLE {} ({}) ENGINE = {}",
            self.identifier(table),
            definitions,
            IMPORT_TABLE_ENGINE
        )
    }

    /// `INSERT INTO <table> (<columns>) FORMAT CSV`; the rows travel as the request body.
    pub fn insert_csv(&self, table: &str, columns: &[String]) -> String {
        format!(
            "INSERT INTO {} ({}) FORMAT CSV",
            self.identifier(table),
            self.column_list(columns)
        )
    }
}
