use anyhow::Context;
use clap::Parser;
use ustar_diagnostics::cli::{run, Cli};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    run(cli).context("u* diagnostics failed")?;
    Ok(())
}
