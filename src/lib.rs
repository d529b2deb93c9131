//! ClickHouse flat-file bridge.
//!
//! An HTTP service that moves data between ClickHouse tables and delimited text
//! files: list tables and columns, preview rows, export a table or a join to CSV,
//! and create a table from an uploaded CSV.

pub mod config;
pub mod db;
pub mod error;
pub mod gateway;
pub mod models;
pub mod staging;
pub mod transfer;
pub mod transport;

pub use config::Config;
pub use error::{BridgeError, BridgeResult};
pub use gateway::{Settings, router};
