//! # Query Results
//!
//! What a successful exchange produces, what gets persisted, and the errors
//! the two collaborators of the scanner report.

use std::net::IpAddr;

use chrono::{DateTime, Utc};
use thiserror::Error;

/// The outcome of one successful DNS exchange, rendered as text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    /// e.g. `"example.com A"`.
    pub question: String,
    /// One line per answer record, possibly none.
    pub answers: Vec<String>,
}

impl Exchange {
    pub fn new(question: impl Into<String>, answers: Vec<String>) -> Self {
        Self {
            question: question.into(),
            answers,
        }
    }
}

/// One persisted row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRecord {
    pub timestamp: DateTime<Utc>,
    pub address: String,
    pub domain: String,
    pub question: String,
    /// Every answer record followed by a newline; empty when there were none.
    pub answer: String,
}

impl QueryRecord {
    pub fn from_exchange(address: IpAddr, domain: &str, exchange: Exchange) -> Self {
        let answer: String = exchange
            .answers
            .iter()
            .map(|line| format!("{line}\n"))
            .collect();

        Self {
            timestamp: Utc::now(),
            address: address.to_string(),
            domain: domain.to_string(),
            question: exchange.question,
            answer,
        }
    }
}

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("network unreachable")]
    NetworkUnreachable,
    #[error("connection refused")]
    ConnectionRefused,
    #[error("no reply within {0:?}")]
    Timeout(std::time::Duration),
    #[error("cannot build a query: {0}")]
    InvalidQuery(String),
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error(transparent)]
    Io(std::io::Error),
}

impl From<std::io::Error> for QueryError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::ConnectionRefused => QueryError::ConnectionRefused,
            std::io::ErrorKind::NetworkUnreachable | std::io::ErrorKind::HostUnreachable => {
                QueryError::NetworkUnreachable
            }
            _ => QueryError::Io(err),
        }
    }
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("storage backend rejected the record: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}
