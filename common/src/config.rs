use std::num::NonZeroUsize;
use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_CONCURRENCY: usize = 256;
pub const DEFAULT_DATABASE: &str = "dns.db";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("the primary domain must not be empty")]
    EmptyDomain,
    #[error("the concurrency ceiling must be at least 1")]
    ZeroConcurrency,
    #[error("the query timeout must be greater than zero")]
    ZeroTimeout,
}

/// Read-only settings shared by every work unit of a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanConfig {
    pub primary_domain: String,
    /// Queried after the primary domain, in this order.
    pub additional_domains: Vec<String>,
    pub timeout: Duration,
    pub concurrency: NonZeroUsize,
}

impl ScanConfig {
    pub fn new(
        primary_domain: &str,
        additional_domains: Vec<String>,
        timeout: Duration,
        concurrency: usize,
    ) -> Result<Self, ConfigError> {
        let primary_domain: &str = primary_domain.trim();
        if primary_domain.is_empty() {
            return Err(ConfigError::EmptyDomain);
        }
        if timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        let concurrency: NonZeroUsize =
            NonZeroUsize::new(concurrency).ok_or(ConfigError::ZeroConcurrency)?;

        Ok(Self {
            primary_domain: primary_domain.to_string(),
            additional_domains,
            timeout,
            concurrency,
        })
    }

    /// Every domain a work unit queries: the primary one first, then the
    /// additional ones in configured order.
    pub fn domains(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.primary_domain.as_str())
            .chain(self.additional_domains.iter().map(String::as_str))
    }

    pub fn domain_count(&self) -> usize {
        1 + self.additional_domains.len()
    }
}

/// Splits a comma-separated domain list (e.g. `"a.com, b.com"`).
///
/// Whitespace around entries is trimmed and empty entries are dropped.
pub fn parse_domain_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}
