//! CLI argument definitions for logyard-daemon.
//!
//! Uses `clap` v4 derive macros to parse command-line arguments.

use std::path::PathBuf;

use clap::Parser;

/// Logyard log-line ingestion daemon.
///
/// Tails a log file and dispatches every line through the module chain
/// described by a JSON configuration document. The configuration is
/// hot-reloadable via SIGHUP or mtime polling.
#[derive(Parser, Debug)]
#[command(name = "logyard-daemon")]
#[command(version, about, long_about = None)]
pub struct DaemonCli {
    /// Path to the JSON chain configuration file.
    #[arg(short, long)]
    pub config: PathBuf,

    /// Log file to tail.
    #[arg(short, long)]
    pub file: PathBuf,

    /// Thread the debug flag into every module setup and raise log verbosity.
    #[arg(long)]
    pub debug: bool,

    /// Read the tailed file from the beginning instead of the current end.
    #[arg(long)]
    pub from_start: bool,

    /// Tail poll interval in milliseconds.
    #[arg(long, default_value_t = 1000)]
    pub poll_interval_ms: u64,

    /// Re-check the config file mtime every N seconds (0 disables watching;
    /// SIGHUP always triggers a reload).
    #[arg(long, default_value_t = 5)]
    pub watch_config_secs: u64,

    /// Log format (json, pretty).
    #[arg(long, default_value = "pretty")]
    pub log_format: String,

    /// Validate the configuration file and exit without starting the daemon.
    #[arg(long)]
    pub validate: bool,
}
