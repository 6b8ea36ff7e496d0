use anyhow::Result;
use clap::Parser;

use foldpool::cli::Cli;

fn main() -> Result<()> {
    let cli = Cli::parse();
    cli.run()
}
