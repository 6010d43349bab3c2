//! Command-line argument parsing

use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments for CriticalBot
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Configuration file path
    ///
    /// If the file doesn't exist, a default configuration will be created.
    #[arg(short, long, default_value = "critbot.toml")]
    pub config: PathBuf,

    /// Read host events from this file instead of stdin
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    pub debug: bool,

    /// Output logs in JSON format
    #[arg(long)]
    pub json_logs: bool,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            config: PathBuf::from("critbot.toml"),
            input: None,
            debug: false,
            json_logs: false,
        }
    }
}
