//! Shared building blocks for `dnsprobe`.
//!
//! Holds the data model of a scan (ranges, configuration, records) and the
//! traits through which the scanner talks to its collaborators.

pub mod config;
pub mod network;
pub mod record;
pub mod scanning;
