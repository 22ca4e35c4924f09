//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(
    name = "setgate",
    author,
    version,
    about = "Fetch SET and TFEX web endpoints through a warmed, cookie-backed session",
    long_about = None
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Browser profile to simulate (chrome120, chrome116, edge120, safari17)
    #[arg(short, long, global = true, default_value = "chrome120")]
    pub profile: String,

    /// Session cache directory (defaults to ~/.setgate/sessions)
    #[arg(long, global = true, env = "SETGATE_CACHE_DIR", value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Session lifetime in seconds
    #[arg(long, global = true, default_value_t = 3600)]
    pub ttl: u64,

    /// Per-request timeout in seconds
    #[arg(long, global = true, default_value_t = 30)]
    pub timeout: u64,

    /// Transport retries on connect/timeout failures
    #[arg(long, global = true, default_value_t = 3)]
    pub retries: u32,

    /// Status codes treated as a bot block (comma separated)
    #[arg(long, global = true, value_delimiter = ',', value_name = "CODE")]
    pub block_status: Vec<u16>,

    /// Send only harvested cookies, without the synthetic browsing trail
    #[arg(long, global = true)]
    pub no_decoys: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// GET a URL through a site's warmed session
    Fetch {
        /// Site key: set or tfex
        site: String,

        /// Absolute URL to fetch
        url: String,

        /// Value for the landing_url cookie some endpoints require
        #[arg(long, value_name = "URL")]
        landing_page: Option<String>,

        /// Extra request header (repeatable)
        #[arg(long = "header", value_name = "NAME:VALUE")]
        headers: Vec<String>,

        /// Return the first block response instead of rewarming and retrying
        #[arg(long)]
        no_block_retry: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Pretty)]
        output: OutputFormat,

        /// Write the response body to a file instead of stdout
        #[arg(long, value_name = "PATH")]
        output_file: Option<PathBuf>,
    },

    /// Establish or refresh a site's session
    Warm {
        /// Site key: set or tfex
        site: String,

        /// Drop any cached session first
        #[arg(short, long)]
        force: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Pretty)]
        output: OutputFormat,
    },

    /// List cached sessions and store statistics
    Sessions {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Pretty)]
        output: OutputFormat,
    },

    /// Remove cached sessions
    Clear {
        /// Only this site's session for the active profile (all when omitted)
        site: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output
    Pretty,
    /// Pretty-printed JSON
    Json,
    /// Single-line JSON
    JsonCompact,
}
