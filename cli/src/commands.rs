pub mod scan;

use std::path::PathBuf;

use clap::{ArgAction, Parser};
use dnsprobe_common::config::{DEFAULT_CONCURRENCY, DEFAULT_DATABASE, DEFAULT_TIMEOUT};
use dnsprobe_common::network::AddressRange;

#[derive(Parser, Debug)]
#[command(name = "dnsprobe", version)]
#[command(about = "Finds hosts in a network range that answer DNS queries.")]
pub struct CommandLine {
    /// Domain queried against every host
    #[arg(short, long)]
    pub domain: String,

    /// Network range in CIDR notation (e.g. 192.168.1.0/24)
    #[arg(short, long)]
    pub network: AddressRange,

    /// Timeout for each DNS query, in seconds
    #[arg(short, long, default_value_t = DEFAULT_TIMEOUT.as_secs())]
    pub timeout: u64,

    /// Comma-separated list of additional domains to query
    #[arg(long)]
    pub domains: Option<String>,

    /// SQLite database file
    #[arg(long, default_value = DEFAULT_DATABASE)]
    pub db: PathBuf,

    /// Maximum number of hosts probed at the same time
    #[arg(short, long, default_value_t = DEFAULT_CONCURRENCY)]
    pub concurrent: usize,

    /// Log failed queries (-v) or every exchange (-vv)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Hide the progress bar and the summary
    #[arg(short, long)]
    pub quiet: bool,
}

impl CommandLine {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
