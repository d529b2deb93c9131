//! Data models for the bridge.
//!
//! This module re-exports all model types used throughout the application.

pub mod connection;
pub mod schema;
pub mod transfer;

// Re-export commonly used types
pub use connection::{ConnectionConfig, DEFAULT_DATABASE, DEFAULT_PORT, DEFAULT_USER};
pub use schema::{ColumnDescriptor, TableDescriptor};
pub use transfer::{
    DEFAULT_EXPORT_FILE, DEFAULT_JOIN_FILE, Delimiter, ExportSpec, ImportSpec, JoinSpec,
    UploadedFile, split_list,
};
