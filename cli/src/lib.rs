//! Library entry point for atrium-cli components.
//!
//! Configuration, logging setup, errors and output formatting live here so
//! integration tests can use them without going through the binary.

pub mod config;
pub mod error;
pub mod formatter;
pub mod logging;

pub use config::CLIConfiguration;
pub use error::{CLIError, Result};
pub use formatter::{CheckOutcome, OutputFormatter};
