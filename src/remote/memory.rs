//! In-memory destination store
//!
//! Case-insensitive like a document library. Used by tests and by plan-only
//! runs that have no destination to compare against.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use super::{join_url, RemoteResult, RemoteStore};
use crate::error::RemoteError;
use crate::types::RemoteFileInfo;

#[derive(Debug, Clone)]
struct StoredFile {
	size: u64,
	modified: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct MemoryState {
	files: HashMap<String, StoredFile>,
	folders: HashSet<String>,
	/// URLs whose lookups fail with a request error
	failing_lookups: HashSet<String>,
	/// Upload fails when the target URL contains any of these
	failing_uploads: Vec<String>,
	created_folders: Vec<String>,
}

/// Document library held in memory
#[derive(Debug)]
pub struct MemoryStore {
	library_root: String,
	display_name: String,
	state: Mutex<MemoryState>,
	offline: AtomicBool,
	uploads: AtomicUsize,
	lookups: AtomicUsize,
}

fn key(url: &str) -> String {
	join_url(&[url]).to_lowercase()
}

impl MemoryStore {
	pub fn new(library_root: &str, display_name: &str) -> Self {
		let mut state = MemoryState::default();
		state.folders.insert(key(library_root));
		MemoryStore {
			library_root: join_url(&[library_root]),
			display_name: display_name.to_string(),
			state: Mutex::new(state),
			offline: AtomicBool::new(false),
			uploads: AtomicUsize::new(0),
			lookups: AtomicUsize::new(0),
		}
	}

	fn state(&self) -> std::sync::MutexGuard<'_, MemoryState> {
		self.state.lock().unwrap_or_else(|e| e.into_inner())
	}

	/// Place a file (and its folders) at a server-relative URL
	pub fn insert_file(&self, url: &str, size: u64, modified: DateTime<Utc>) {
		let mut state = self.state();
		let parts: Vec<&str> = url.split('/').filter(|s| !s.is_empty()).collect();
		for i in 1..parts.len() {
			state.folders.insert(key(&parts[..i].join("/")));
		}
		state.files.insert(key(url), StoredFile { size, modified });
	}

	pub fn insert_folder(&self, url: &str) {
		let mut state = self.state();
		let parts: Vec<&str> = url.split('/').filter(|s| !s.is_empty()).collect();
		for i in 1..=parts.len() {
			state.folders.insert(key(&parts[..i].join("/")));
		}
	}

	/// Make lookups of this exact URL fail with a request error
	pub fn fail_lookup(&self, url: &str) {
		self.state().failing_lookups.insert(key(url));
	}

	/// Make uploads whose target URL contains `fragment` fail
	pub fn fail_uploads_matching(&self, fragment: &str) {
		self.state().failing_uploads.push(fragment.to_lowercase());
	}

	/// Every request fails while offline
	pub fn set_offline(&self, offline: bool) {
		self.offline.store(offline, Ordering::SeqCst);
	}

	pub fn file(&self, url: &str) -> Option<RemoteFileInfo> {
		self.state().files.get(&key(url)).map(|f| RemoteFileInfo {
			resolved_url: join_url(&[url]),
			size: f.size,
			modified_at: f.modified,
		})
	}

	pub fn file_count(&self) -> usize {
		self.state().files.len()
	}

	pub fn has_folder(&self, url: &str) -> bool {
		self.state().folders.contains(&key(url))
	}

	/// Folders created through `create_folder`, in creation order
	pub fn created_folders(&self) -> Vec<String> {
		self.state().created_folders.clone()
	}

	pub fn upload_count(&self) -> usize {
		self.uploads.load(Ordering::SeqCst)
	}

	pub fn lookup_count(&self) -> usize {
		self.lookups.load(Ordering::SeqCst)
	}

	fn check_online(&self, url: &str) -> RemoteResult<()> {
		if self.offline.load(Ordering::SeqCst) {
			return Err(RemoteError::Request { url: url.to_string(), message: "store offline".into() });
		}
		Ok(())
	}
}

#[async_trait]
impl RemoteStore for MemoryStore {
	fn library_root(&self) -> &str {
		&self.library_root
	}

	async fn library_display_name(&self) -> RemoteResult<String> {
		self.check_online(&self.library_root)?;
		Ok(self.display_name.clone())
	}

	async fn get_file(&self, url: &str) -> RemoteResult<RemoteFileInfo> {
		self.lookups.fetch_add(1, Ordering::SeqCst);
		self.check_online(url)?;
		if self.state().failing_lookups.contains(&key(url)) {
			return Err(RemoteError::Request { url: url.to_string(), message: "injected failure".into() });
		}
		self.file(url).ok_or_else(|| RemoteError::NotFound { url: url.to_string() })
	}

	async fn folder_exists(&self, url: &str) -> RemoteResult<bool> {
		self.check_online(url)?;
		Ok(self.has_folder(url))
	}

	async fn get_file_in_folder(&self, folder_url: &str, name: &str) -> RemoteResult<RemoteFileInfo> {
		self.check_online(folder_url)?;
		if !self.has_folder(folder_url) {
			return Err(RemoteError::NotFound { url: folder_url.to_string() });
		}
		self.get_file(&join_url(&[folder_url, name])).await
	}

	async fn create_folder(&self, parent_url: &str, name: &str) -> RemoteResult<()> {
		let url = join_url(&[parent_url, name]);
		self.check_online(&url)?;
		let mut state = self.state();
		if !state.folders.contains(&key(parent_url)) {
			return Err(RemoteError::Request {
				url,
				message: format!("parent folder {} does not exist", parent_url),
			});
		}
		if !state.folders.insert(key(&url)) {
			return Err(RemoteError::AlreadyExists { url });
		}
		state.created_folders.push(url);
		Ok(())
	}

	async fn upload_file(
		&self,
		folder_url: &str,
		name: &str,
		source: &Path,
		modified: Option<DateTime<Utc>>,
		overwrite: bool,
	) -> RemoteResult<RemoteFileInfo> {
		let url = join_url(&[folder_url, name]);
		self.check_online(&url)?;
		self.uploads.fetch_add(1, Ordering::SeqCst);

		let meta = tokio::fs::metadata(source)
			.await
			.map_err(|e| RemoteError::Io { url: url.clone(), source: e })?;

		let mut state = self.state();
		let lower = url.to_lowercase();
		if state.failing_uploads.iter().any(|f| lower.contains(f.as_str())) {
			return Err(RemoteError::Request { url, message: "injected upload failure".into() });
		}
		if !state.folders.contains(&key(folder_url)) {
			return Err(RemoteError::NotFound { url: folder_url.to_string() });
		}
		if state.files.contains_key(&key(&url)) && !overwrite {
			return Err(RemoteError::AlreadyExists { url });
		}
		let modified = modified.unwrap_or_else(Utc::now);
		state.files.insert(key(&url), StoredFile { size: meta.len(), modified });
		Ok(RemoteFileInfo { resolved_url: url, size: meta.len(), modified_at: modified })
	}
}


// vim: ts=4
