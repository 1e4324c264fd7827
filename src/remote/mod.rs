//! Destination store abstraction
//!
//! The engine talks to the document library only through [`RemoteStore`].
//! Paths passed to a store are server-relative URLs with `/` separators,
//! e.g. `Shared Documents/Clients/sub/file.pdf`.
//!
//! Two stores ship with the crate: [`MemoryStore`] (tests, plan-only runs)
//! and [`DirectoryStore`] (a local directory standing in for the site).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::Path;
use std::sync::Arc;

use crate::config::StoreConfig;
use crate::error::{MigrateError, RemoteError};
use crate::logging::*;
use crate::types::RemoteFileInfo;

pub mod directory;
pub mod lookup;
pub mod memory;

pub use directory::DirectoryStore;
pub use lookup::{LookupOutcome, RemoteLookup};
pub use memory::MemoryStore;

/// Result type for store operations
pub type RemoteResult<T> = Result<T, RemoteError>;

/// Operations the engine needs from a destination document library
///
/// Missing files and folders are reported as [`RemoteError::NotFound`];
/// lookups never create anything.
#[async_trait]
pub trait RemoteStore: Send + Sync {
	/// Server-relative URL of the library root folder
	fn library_root(&self) -> &str;

	/// Display name of the library; doubles as the connectivity check
	async fn library_display_name(&self) -> RemoteResult<String>;

	/// File metadata by server-relative URL
	async fn get_file(&self, url: &str) -> RemoteResult<RemoteFileInfo>;

	/// Whether a folder exists at the URL
	async fn folder_exists(&self, url: &str) -> RemoteResult<bool>;

	/// File metadata by name inside an explicitly opened folder
	async fn get_file_in_folder(&self, folder_url: &str, name: &str) -> RemoteResult<RemoteFileInfo>;

	/// Create one folder; [`RemoteError::AlreadyExists`] if it is there
	async fn create_folder(&self, parent_url: &str, name: &str) -> RemoteResult<()>;

	/// Upload a local file into a folder
	///
	/// With `overwrite` unset an existing file is left alone and
	/// [`RemoteError::AlreadyExists`] is returned. `modified` is recorded as
	/// the remote modification time so later comparisons see the source
	/// timestamp.
	async fn upload_file(
		&self,
		folder_url: &str,
		name: &str,
		source: &Path,
		modified: Option<DateTime<Utc>>,
		overwrite: bool,
	) -> RemoteResult<RemoteFileInfo>;
}

/// Join URL parts with `/`, ignoring empty parts and stray slashes
pub fn join_url(parts: &[&str]) -> String {
	parts
		.iter()
		.map(|p| p.trim_matches('/'))
		.filter(|p| !p.is_empty())
		.collect::<Vec<_>>()
		.join("/")
}

/// Build the configured store
///
/// `library_name` is the display name unless the store config overrides it;
/// an in-memory store also uses it as its root folder.
pub fn open_store(config: &StoreConfig, library_name: &str) -> Arc<dyn RemoteStore> {
	match config {
		StoreConfig::Memory => Arc::new(MemoryStore::new(library_name, library_name)),
		StoreConfig::Directory { path, library_folder, display_name } => Arc::new(DirectoryStore::new(
			path,
			library_folder,
			display_name.as_deref().unwrap_or(library_name),
		)),
	}
}

/// Resolve the library once at startup; failure aborts the run
pub async fn verify_library(store: &dyn RemoteStore) -> Result<String, MigrateError> {
	match store.library_display_name().await {
		Ok(name) => {
			info!("Connected to library {:?} at {}", name, store.library_root());
			Ok(name)
		}
		Err(source) => Err(MigrateError::RemoteUnavailable {
			message: format!("cannot resolve library at {}", store.library_root()),
			source,
		}),
	}
}


// vim: ts=4
