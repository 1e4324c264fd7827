//! Logging prelude module for convenient access to tracing macros.
//!
//! Diagnostics go through `tracing`; the audit trail of a run is the JSONL
//! event log in [`crate::report::EventLog`], which is independent of this.
//!
//! # Usage
//!
//! ```ignore
//! use crate::logging::*;
//!
//! info!("Scanning {}", root.display());
//! warn!("Locked: {}", path.display());
//! ```

pub use tracing::{debug, error, info, trace, warn};

/// Initialize the tracing subscriber with environment filter support.
///
/// `RUST_LOG` wins when set; otherwise `default_level` (from the config's
/// `logLevel`) is used:
///
/// ```bash
/// RUST_LOG=debug sharemig compare
/// RUST_LOG=sharemig::remote=trace sharemig migrate
/// ```
pub fn init_tracing(default_level: &str) {
	let filter = tracing_subscriber::EnvFilter::try_from_default_env()
		.or_else(|_| tracing_subscriber::EnvFilter::try_new(default_level))
		.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
	let _ = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init();
}

// vim: ts=4
