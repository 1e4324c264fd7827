//! Error types for sharemig operations

use std::error::Error;
use std::fmt;
use std::io;

use crate::validation::ValidationError;

/// Main error type for reconciliation and migration runs
///
/// Everything in here is fatal for the run. Per-file problems (locked source
/// files, lookup misses, failed uploads) never surface as `MigrateError`;
/// they are recorded as classification results or upload outcomes instead.
#[derive(Debug)]
pub enum MigrateError {
	/// Configuration is missing fields or has invalid values
	InvalidConfig { message: String },

	/// Source root does not exist or cannot be listed
	SourceUnavailable { path: String, source: io::Error },

	/// Destination store could not be reached or the library is unresolvable
	RemoteUnavailable { message: String, source: RemoteError },

	/// Report or event log output failed
	Report { message: String },

	/// I/O error
	Io(io::Error),

	/// First upload failure under fail-fast
	FailFast { path: String, error: String },

	/// Two source files map to the same destination under the error policy
	Collision { key: String, first: String, second: String },

	/// Operation aborted by user
	Aborted,

	/// Generic error message
	Other { message: String },
}

impl fmt::Display for MigrateError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			MigrateError::InvalidConfig { message } => {
				write!(f, "Invalid configuration: {}", message)
			}
			MigrateError::SourceUnavailable { path, source } => {
				write!(f, "Source root {} is not accessible: {}", path, source)
			}
			MigrateError::RemoteUnavailable { message, source } => {
				write!(f, "Destination store unavailable ({}): {}", message, source)
			}
			MigrateError::Report { message } => write!(f, "Report output failed: {}", message),
			MigrateError::Io(e) => write!(f, "I/O error: {}", e),
			MigrateError::FailFast { path, error } => {
				write!(f, "Aborting on first failure (fail-fast): {}: {}", path, error)
			}
			MigrateError::Collision { key, first, second } => {
				write!(f, "Destination collision on {}: {} and {}", key, first, second)
			}
			MigrateError::Aborted => write!(f, "Operation aborted by user"),
			MigrateError::Other { message } => write!(f, "{}", message),
		}
	}
}

impl Error for MigrateError {
	fn source(&self) -> Option<&(dyn Error + 'static)> {
		match self {
			MigrateError::SourceUnavailable { source, .. } => Some(source),
			MigrateError::RemoteUnavailable { source, .. } => Some(source),
			MigrateError::Io(e) => Some(e),
			_ => None,
		}
	}
}

impl From<io::Error> for MigrateError {
	fn from(e: io::Error) -> Self {
		MigrateError::Io(e)
	}
}

impl From<String> for MigrateError {
	fn from(e: String) -> Self {
		MigrateError::Other { message: e }
	}
}

impl From<ValidationError> for MigrateError {
	fn from(e: ValidationError) -> Self {
		MigrateError::InvalidConfig { message: e.to_string() }
	}
}

impl From<csv::Error> for MigrateError {
	fn from(e: csv::Error) -> Self {
		MigrateError::Report { message: e.to_string() }
	}
}

impl From<serde_json::Error> for MigrateError {
	fn from(e: serde_json::Error) -> Self {
		MigrateError::Report { message: e.to_string() }
	}
}

/// Errors returned by a destination store
#[derive(Debug)]
pub enum RemoteError {
	/// Nothing exists at the requested path
	NotFound { url: String },

	/// Target already exists (folder create, or file upload without overwrite)
	AlreadyExists { url: String },

	/// The store rejected or failed the request
	Request { url: String, message: String },

	/// Local I/O while talking to the store (reading the upload source, etc.)
	Io { url: String, source: io::Error },
}

impl RemoteError {
	pub fn is_not_found(&self) -> bool {
		matches!(self, RemoteError::NotFound { .. })
	}

	pub fn is_already_exists(&self) -> bool {
		matches!(self, RemoteError::AlreadyExists { .. })
	}
}

impl fmt::Display for RemoteError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			RemoteError::NotFound { url } => write!(f, "Not found: {}", url),
			RemoteError::AlreadyExists { url } => write!(f, "Already exists: {}", url),
			RemoteError::Request { url, message } => {
				write!(f, "Request for {} failed: {}", url, message)
			}
			RemoteError::Io { url, source } => write!(f, "I/O error for {}: {}", url, source),
		}
	}
}

impl Error for RemoteError {
	fn source(&self) -> Option<&(dyn Error + 'static)> {
		match self {
			RemoteError::Io { source, .. } => Some(source),
			_ => None,
		}
	}
}


// vim: ts=4
