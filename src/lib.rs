//! # sharemig - file share to document library reconciliation
//!
//! sharemig walks a file-server share, maps every file onto its path in a
//! document library, compares it with what is already there and optionally
//! uploads what is missing or newer. It never overwrites a remote file that
//! is newer than the source.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use sharemig::config::Config;
//! use sharemig::driver::{Driver, RunContext};
//! use sharemig::remote::{open_store, RemoteLookup};
//! use sharemig::report::{EventLog, MemoryReports};
//! use sharemig::scan::Scanner;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load("sharemig.json5".as_ref())?;
//!     let store = open_store(&config.store, &config.library_name);
//!     let reports = Arc::new(MemoryReports::new(store.library_root()));
//!     let context = Arc::new(RunContext::new(config.run.clone(), Arc::new(EventLog::in_memory()), reports));
//!     let lookup = RemoteLookup::new(store.clone(), config.lookup_candidates.clone(), config.library_aliases.clone());
//!
//!     let mut scanner = Scanner::new(&config.file_server_path, config.path_mapper(), None)?;
//!     let summary = Driver::new(store, lookup, context).run(&mut scanner).await?;
//!     println!("{}", summary.render());
//!     Ok(())
//! }
//! ```

pub mod callbacks;
pub mod classify;
pub mod config;
pub mod driver;
pub mod error;
pub mod logging;
pub mod mapping;
pub mod progress;
pub mod remote;
pub mod report;
pub mod scan;
pub mod strategies;
pub mod types;
pub mod utils;
pub mod validation;

// Re-export commonly used types and functions
pub use classify::{classify, ClassifyPolicy};
pub use config::{Config, RunOptions};
pub use driver::{Driver, RunContext};
pub use error::{MigrateError, RemoteError};
pub use mapping::PathMapper;
pub use report::{RunSummary, StopReason};
pub use scan::Scanner;
pub use types::{ClassificationResult, DestinationPath, FileDescriptor, MigrationAction, MigrationStatus, UploadOutcome};

// vim: ts=4
