//! Atrium CLI - operator tool for the Atrium platform
//!
//! # Usage
//!
//! ```bash
//! # Is everything reachable?
//! atrium check
//!
//! # Create the upload bucket (needs ATRIUM_SERVICE_KEY)
//! atrium provision-bucket --bucket media
//!
//! # Follow inserts into a table as JSON lines
//! atrium watch messages --event insert --json
//!
//! # What may this account open?
//! atrium whoami --email ada@example.com --path /admin
//! ```

use clap::Parser;
use colored::Colorize;

use atrium_cli::{logging::init_logging, CLIConfiguration, OutputFormatter, Result};

mod args;
mod commands;
mod connect;

use args::{Cli, Command};
use commands::check::handle_check;
use commands::provision::{handle_provision, ProvisionRequest};
use commands::watch::{handle_watch, WatchRequest};
use commands::whoami::handle_whoami;
use connect::create_client;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("{} {}", "error:".red().bold(), e);
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli) -> Result<()> {
    if cli.no_color {
        colored::control::set_override(false);
    }

    let config = CLIConfiguration::load(&cli.config)?;
    let logging = config.resolved_logging();
    let log_format = cli.log_format.as_deref().unwrap_or(&logging.format);
    init_logging(&logging.level, log_format, cli.verbose)?;

    let formatter = OutputFormatter::new(cli.json);
    let client = create_client(&config)?;

    match cli.command {
        Command::Check { table, bucket } => {
            let bucket = bucket.unwrap_or_else(|| config.resolved_storage().bucket);
            handle_check(&client, &formatter, &table, &bucket).await
        },
        Command::ProvisionBucket {
            bucket,
            private,
            max_bytes,
            mime_types,
        } => {
            let request = ProvisionRequest {
                bucket,
                private,
                max_bytes,
                mime_types,
            };
            handle_provision(&client, &config, &formatter, request).await
        },
        Command::Watch {
            table,
            event,
            filter,
            identity_key,
            schema,
            count,
        } => {
            let request = WatchRequest {
                table,
                event,
                filter,
                identity_key,
                schema,
                count,
            };
            handle_watch(&client, &formatter, request).await
        },
        Command::Whoami {
            email,
            password,
            path,
        } => handle_whoami(&client, &config, &formatter, &email, &password, path.as_deref()).await,
    }
}
