//! Collaborator traits of the scanner.
//!
//! The scanner only knows these two seams; the UDP client and the SQLite
//! store in `dnsprobe-core` are one implementation of each, tests plug in
//! stubs.

use std::net::IpAddr;
use std::time::Duration;

use crate::record::{Exchange, QueryError, QueryRecord, SinkError};

/// Performs one timeboxed DNS exchange against a candidate resolver.
#[async_trait::async_trait]
pub trait QueryDispatcher: Send + Sync {
    /// Queries `target` for the A record of `domain`.
    ///
    /// Implementations enforce `timeout` themselves and report an expired
    /// wait as [`QueryError::Timeout`].
    async fn exchange(
        &self,
        target: IpAddr,
        domain: &str,
        timeout: Duration,
    ) -> Result<Exchange, QueryError>;
}

/// Durable, append-only destination for query records.
///
/// Must accept concurrent calls without any locking on the caller's side.
#[async_trait::async_trait]
pub trait ResultSink: Send + Sync {
    async fn record(&self, entry: QueryRecord) -> Result<(), SinkError>;
}
