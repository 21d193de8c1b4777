//! Scan engine of `dnsprobe`: the coordinator plus the UDP and SQLite
//! adapters it is normally wired to.

pub mod network;
pub mod scanner;
pub mod storage;

pub use network::UdpDispatcher;
pub use scanner::{ScanSummary, Scanner};
pub use storage::SqliteSink;
