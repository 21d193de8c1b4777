//! Wire-level helpers used by the DNS dispatcher.

pub mod dns;
