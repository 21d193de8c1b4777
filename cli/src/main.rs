mod commands;
mod terminal;

use commands::{CommandLine, scan};
use terminal::{logging, print};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let commands = CommandLine::parse_args();

    logging::init_logging(commands.verbose);

    print::header("dns probe", commands.quiet);
    scan::scan(&commands).await
}
