//! Transport layer for the bridge.
//!
//! The bridge is served over plain HTTP; the transport owns the listener and the
//! shutdown sequence, the gateway owns the routes.

pub mod http;

pub use http::HttpTransport;

use crate::error::BridgeResult;
use std::future::Future;

/// A way of serving the bridge API.
pub trait Transport: Send + Sync {
    /// Start serving. Resolves once the transport has shut down.
    fn run(self) -> impl Future<Output = BridgeResult<()>> + Send;

    /// Get the name of this transport for logging.
    fn name(&self) -> &'static str;
}
