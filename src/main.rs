use clap::Parser;
use mapmerge::cli::{run, Cli};
use mapmerge::init_logging;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    init_logging()?;

    run(&cli)?;
    Ok(())
}
