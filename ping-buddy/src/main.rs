use anyhow::Result;
use clap::Parser;

use batch_ping::helpers::bootstrap::{self, Tool};
use batch_ping::helpers::logging;

mod cmd_logic;

#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    #[clap(flatten)]
    logging: logging::Params,

    #[command(subcommand)]
    command: cmd_logic::Commands,
}

fn main() -> Result<()> {
    let tool = Tool {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
    };
    bootstrap::run(tool, Cli::parse, |cli: &Cli| &cli.logging, do_run)
}

fn do_run(cli: Cli) -> Result<()> {
    cmd_logic::handle(cli.command)
}
