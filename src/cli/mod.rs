use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "pank", about = "Attendance tracking and penalty engine")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the HTTP API in the foreground.
    Serve,
    Status,
    Doctor,
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Print company statistics for a date range.
    Stats {
        #[arg(long)]
        from: Option<String>,
        #[arg(long)]
        to: Option<String>,
    },
    /// Write a CSV/JSON export pair into the export directory.
    Export {
        /// attendance, employees, reports or penalties
        kind: String,
        #[arg(long)]
        from: Option<String>,
        #[arg(long)]
        to: Option<String>,
    },
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    Set { key: String, value: String },
    Get { key: String },
}
