//! Database access layer.
//!
//! - Connection factory and request-scoped handles (`client`)
//! - SQL statement construction (`statement`)
//! - Schema introspection (`schema`)
//! - Result types and cell rendering (`types`)

pub mod client;
pub mod schema;
pub mod statement;
pub mod types;

pub use client::{ClickHouseHandle, ClientOptions};
pub use schema::SchemaInspector;
pub use statement::{IdentifierMode, StatementBuilder};
pub use types::QueryResult;
