use anyhow::Result;
use clap::Parser;
use digestbench::{run, Cli};

fn main() -> Result<()> {
    run(Cli::parse())
}
