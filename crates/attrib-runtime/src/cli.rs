//! CLI definition using clap derive.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "attrib", about = "editor change provenance attribution")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run an attribution session: host events on stdin, records on stdout
    Run(RunOpts),
    /// Diff two files and print the compressed hunks
    Diff(DiffOpts),
}

#[derive(clap::Args)]
pub struct RunOpts {
    /// Agent activity state file, polled for new activations
    #[arg(long, env = "ATTRIB_STATE_FILE")]
    pub state_file: Option<PathBuf>,

    /// Quiet period before a change batch flushes, in milliseconds
    #[arg(long, env = "ATTRIB_DEBOUNCE_MS", default_value = "5000")]
    pub debounce_ms: u64,

    /// Agent recency window in seconds
    #[arg(long, env = "ATTRIB_AGENT_WINDOW_SECS", default_value = "10")]
    pub agent_window_secs: u64,

    /// Tick interval driving signal polls and debounce flushes, milliseconds
    #[arg(long, env = "ATTRIB_POLL_INTERVAL_MS", default_value = "1000")]
    pub poll_interval_ms: u64,

    /// Upper bound on one state-file read before the tick proceeds without it
    #[arg(long, env = "ATTRIB_RECHECK_TIMEOUT_MS", default_value = "200")]
    pub recheck_timeout_ms: u64,

    /// Append records to this file instead of stdout
    #[arg(long, short = 'o', env = "ATTRIB_OUTPUT")]
    pub output: Option<PathBuf>,
}

// Matches the clap default_value strings above; used when the binary is
// invoked with no subcommand.
impl Default for RunOpts {
    fn default() -> Self {
        Self {
            state_file: None,
            debounce_ms: 5000,
            agent_window_secs: 10,
            poll_interval_ms: 1000,
            recheck_timeout_ms: 200,
            output: None,
        }
    }
}

#[derive(clap::Args)]
pub struct DiffOpts {
    pub old: PathBuf,
    pub new: PathBuf,
}
