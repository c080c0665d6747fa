use atrium_link::{AtriumLinkError, EventFilter, RowFilter};
use atrium_cli::config::DEFAULT_CONFIG_PATH;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

macro_rules! version_string {
    () => {
        concat!(
            env!("CARGO_PKG_VERSION"),
            "\nCommit: ",
            env!("GIT_COMMIT_HASH"),
            " (",
            env!("GIT_BRANCH"),
            ")\nBuilt: ",
            env!("BUILD_DATE")
        )
    };
}

/// Atrium CLI - operator tool for the Atrium platform
#[derive(Parser, Debug)]
#[command(name = "atrium")]
#[command(author = "Atrium Team")]
#[command(version = version_string!())]
#[command(about = "Checks, provisioning and live inspection for the Atrium platform", long_about = None)]
pub struct Cli {
    /// Configuration file path
    #[arg(long = "config", default_value = DEFAULT_CONFIG_PATH, global = true)]
    pub config: PathBuf,

    /// Enable verbose logging
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    /// Print results as JSON lines
    #[arg(long = "json", global = true)]
    pub json: bool,

    /// Disable colored output
    #[arg(long = "no-color", global = true)]
    pub no_color: bool,

    /// Log format override: compact or json
    #[arg(long = "log-format", global = true)]
    pub log_format: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check that auth, tables and storage are reachable
    Check {
        /// Table checked with a one-row read
        #[arg(long, default_value = "profiles")]
        table: String,

        /// Bucket to list (default: storage.bucket from the config)
        #[arg(long)]
        bucket: Option<String>,
    },

    /// Create or update the upload bucket (requires ATRIUM_SERVICE_KEY)
    ProvisionBucket {
        /// Bucket id (default: storage.bucket from the config)
        #[arg(long)]
        bucket: Option<String>,

        /// Make the bucket private regardless of the config
        #[arg(long)]
        private: bool,

        /// Maximum object size in bytes
        #[arg(long = "max-bytes")]
        max_bytes: Option<u64>,

        /// Allowed MIME types, comma separated
        #[arg(long = "mime", value_delimiter = ',')]
        mime_types: Vec<String>,
    },

    /// Mirror a table and print every change as it arrives
    Watch {
        table: String,

        /// insert, update, delete or *
        #[arg(long, default_value = "*", value_parser = parse_event_filter)]
        event: EventFilter,

        /// Row filter, e.g. room_id=eq.7
        #[arg(long, value_parser = parse_row_filter)]
        filter: Option<RowFilter>,

        /// Column identifying rows
        #[arg(long = "identity-key", default_value = "id")]
        identity_key: String,

        #[arg(long, default_value = "public")]
        schema: String,

        /// Stop after this many changes
        #[arg(long)]
        count: Option<usize>,
    },

    /// Sign in and show the role, permissions and routes of the account
    Whoami {
        #[arg(long, env = "ATRIUM_EMAIL")]
        email: String,

        #[arg(long, env = "ATRIUM_PASSWORD", hide_env_values = true)]
        password: String,

        /// Also decide access to this path
        #[arg(long)]
        path: Option<String>,
    },
}

fn parse_event_filter(value: &str) -> Result<EventFilter, String> {
    value.parse().map_err(|e: AtriumLinkError| e.to_string())
}

fn parse_row_filter(value: &str) -> Result<RowFilter, String> {
    value.parse().map_err(|e: AtriumLinkError| e.to_string())
}
