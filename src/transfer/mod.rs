//! Data movement between ClickHouse and CSV files.
//!
//! - `exporter`: preview rows, export a table to CSV
//! - `importer`: create a table from an uploaded CSV
//! - `joiner`: export a multi-table join to CSV
//! - `csv_file`: blocking CSV reading and writing shared by the above

pub mod csv_file;
pub mod exporter;
pub mod importer;
pub mod joiner;

pub use exporter::{ExportOutcome, Exporter, PREVIEW_ROW_LIMIT};
pub use importer::Importer;
pub use joiner::Joiner;
