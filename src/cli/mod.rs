//! CLI argument definitions for omsdoctor.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Version string including the build's git commit.
pub const VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("OMSDOCTOR_GIT_COMMIT"),
    " ",
    env!("OMSDOCTOR_BUILD_TIMESTAMP"),
    ")"
);

/// omsdoctor - explain why the Linux monitoring agent is unhealthy.
///
/// Run as root (or the omsagent user) for complete results.
#[derive(Parser, Debug)]
#[command(name = "omsdoctor")]
#[command(author, version = VERSION, about = "Troubleshooter for the Linux monitoring agent", long_about = None)]
pub struct Cli {
    /// Output in human-readable format instead of JSON
    #[arg(short = 'H', long = "human", global = true)]
    pub human_readable: bool,

    /// Never prompt; take the conservative path wherever a question would be asked.
    /// Can also be set via OMSDOCTOR_SILENT or `silent #true` in config.kdl.
    #[arg(long, global = true)]
    pub silent: bool,

    /// Treat <path> as the filesystem root when reading agent files
    #[arg(long = "root", global = true, env = "OMSDOCTOR_ROOT")]
    pub root: Option<PathBuf>,

    /// Log filter directive (e.g. "debug", "omsdoctor=trace"); logs go to stderr
    #[arg(long = "log-level", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check agent heartbeat and health
    ///
    /// Verifies installation, onboarding, multihoming, that the agent is running
    /// (starting it once if not), and scans the agent log for known failures.
    Heartbeat,

    /// Check custom log configuration against the log files it tails
    #[command(name = "custom-logs")]
    CustomLogs,

    /// Check that the agent is onboarded to exactly one workspace
    Multihoming {
        /// Workspace id to expect (default: the onboarded workspace)
        #[arg(long)]
        workspace: Option<String>,
    },

    /// Show gathered system facts
    Facts {
        /// Only show this key (e.g. OS_ID, WORKSPACE_ID)
        key: Option<String>,
    },
}

impl Commands {
    /// Name used in reports.
    pub fn name(&self) -> &'static str {
        match self {
            Commands::Heartbeat => "heartbeat",
            Commands::CustomLogs => "custom-logs",
            Commands::Multihoming { .. } => "multihoming",
            Commands::Facts { .. } => "facts",
        }
    }
}
