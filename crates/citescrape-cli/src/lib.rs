//! citescrape CLI library.
//!
//! Configuration and profile loading, command execution, output formatting
//! and logging setup for the `citescrape` binary.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod output;
pub mod profile;

pub use cli::{Cli, Command};
pub use config::AppConfig;
pub use error::{CliError, Result};
pub use output::{Formatter, OutputFormat};
pub use profile::{Profile, ResolvedProfile};

use tracing_subscriber::EnvFilter;

/// Install the global stderr logger
///
/// `RUST_LOG` wins over `debug`.
pub fn init_logging(debug: bool) {
    let level = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    // A second call in the same process keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
