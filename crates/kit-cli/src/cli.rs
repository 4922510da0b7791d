use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "kit",
    about = "Typed value snapshots, backoff schedules, secrets and file helpers",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Configuration file; missing files fall back to defaults
    #[arg(long, global = true, default_value = "kit.toml")]
    pub config: PathBuf,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Convert between JSON objects and store snapshots
    Snapshot(SnapshotArgs),
    /// Generate a random secret
    Secret(SecretArgs),
    /// Detect a file's content type
    Sniff(SniffArgs),
    /// Block until a file exists
    Wait(WaitArgs),
    /// Print a Fibonacci backoff schedule
    Backoff(BackoffArgs),
}

#[derive(Args)]
pub struct SnapshotArgs {
    #[command(subcommand)]
    pub action: SnapshotAction,
}

#[derive(Subcommand)]
pub enum SnapshotAction {
    /// Read a JSON object and print its snapshot
    Encode {
        /// Input file; stdin when omitted
        file: Option<PathBuf>,
    },
    /// Read a snapshot and print it as a JSON object
    Decode {
        /// Input file; stdin when omitted
        file: Option<PathBuf>,
    },
}

#[derive(Args)]
pub struct SecretArgs {
    #[arg(short, long)]
    pub len: Option<usize>,
    #[arg(short, long)]
    pub alphabet: Option<String>,
}

#[derive(Args)]
pub struct SniffArgs {
    pub file: PathBuf,
}

#[derive(Args)]
pub struct WaitArgs {
    pub path: PathBuf,
    /// Seconds to wait before giving up; 0 waits forever
    #[arg(short, long)]
    pub timeout: Option<u64>,
}

#[derive(Args)]
pub struct BackoffArgs {
    #[arg(long, conflicts_with = "infinite")]
    pub attempts: Option<u32>,
    #[arg(long)]
    pub infinite: bool,
    #[arg(long)]
    pub wrap_around: Option<u32>,
    /// Number of delays to print
    #[arg(long)]
    pub steps: Option<usize>,
}
