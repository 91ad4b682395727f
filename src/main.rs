//! `reqlock`: lock the requirements declared in Markdown blockquotes and
//! check documents against the lock.

use clap::Parser;

mod cli;
use cli::Cli;

fn main() -> anyhow::Result<()> {
    Cli::parse().run()
}
