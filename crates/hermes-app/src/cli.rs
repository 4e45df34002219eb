//! Command-line arguments.

use clap::Parser;

#[derive(Debug, Parser)]
#[command(
    name = "hermes",
    version,
    about = "Conversational front-end for interchangeable LLM backends"
)]
pub struct Args {
    /// Log filter directive (e.g. "hermes=debug").
    #[arg(long)]
    pub log_level: Option<String>,

    /// Directory holding settings.json and sessions.json; defaults to
    /// the platform config directory.
    #[arg(long)]
    pub config_dir: Option<std::path::PathBuf>,
}

pub fn parse() -> Args {
    Args::parse()
}
