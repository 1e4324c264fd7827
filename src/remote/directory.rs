//! Directory-backed destination store
//!
//! A local directory plays the site: the library is a sub-folder of it, and
//! server-relative URLs map onto paths below the site directory. Uploads go
//! through a temporary file and a rename, and carry the source modification
//! time over so re-runs classify uploaded files as identical.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::fs as afs;

use super::{join_url, RemoteResult, RemoteStore};
use crate::error::RemoteError;
use crate::logging::*;
use crate::scan::to_utc;
use crate::types::RemoteFileInfo;

const TEMP_SUFFIX: &str = ".sharemig-tmp";

/// Document library stored in a local directory
#[derive(Debug, Clone)]
pub struct DirectoryStore {
	site_root: PathBuf,
	library_root: String,
	display_name: String,
}

impl DirectoryStore {
	pub fn new(site_root: &Path, library_folder: &str, display_name: &str) -> Self {
		DirectoryStore {
			site_root: site_root.to_path_buf(),
			library_root: join_url(&[library_folder]),
			display_name: display_name.to_string(),
		}
	}

	/// Local path of a server-relative URL
	fn resolve(&self, url: &str) -> RemoteResult<PathBuf> {
		let mut path = self.site_root.clone();
		for segment in url.split('/').filter(|s| !s.is_empty()) {
			if segment == ".." || segment == "." {
				return Err(RemoteError::Request {
					url: url.to_string(),
					message: "relative segments are not allowed".into(),
				});
			}
			path.push(segment);
		}
		Ok(path)
	}

	async fn file_info(&self, url: &str) -> RemoteResult<RemoteFileInfo> {
		let path = self.resolve(url)?;
		let meta = match afs::metadata(&path).await {
			Ok(meta) => meta,
			Err(e) if e.kind() == io::ErrorKind::NotFound => {
				return Err(RemoteError::NotFound { url: url.to_string() })
			}
			Err(e) => return Err(RemoteError::Io { url: url.to_string(), source: e }),
		};
		if !meta.is_file() {
			return Err(RemoteError::NotFound { url: url.to_string() });
		}
		let modified =
			meta.modified().map_err(|e| RemoteError::Io { url: url.to_string(), source: e })?;
		Ok(RemoteFileInfo { resolved_url: join_url(&[url]), size: meta.len(), modified_at: to_utc(modified) })
	}

	async fn is_dir(&self, url: &str) -> RemoteResult<bool> {
		let path = self.resolve(url)?;
		match afs::metadata(&path).await {
			Ok(meta) => Ok(meta.is_dir()),
			Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
			Err(e) => Err(RemoteError::Io { url: url.to_string(), source: e }),
		}
	}
}

#[async_trait]
impl RemoteStore for DirectoryStore {
	fn library_root(&self) -> &str {
		&self.library_root
	}

	async fn library_display_name(&self) -> RemoteResult<String> {
		if !self.is_dir(&self.library_root).await? {
			return Err(RemoteError::NotFound { url: self.library_root.clone() });
		}
		Ok(self.display_name.clone())
	}

	async fn get_file(&self, url: &str) -> RemoteResult<RemoteFileInfo> {
		self.file_info(url).await
	}

	async fn folder_exists(&self, url: &str) -> RemoteResult<bool> {
		self.is_dir(url).await
	}

	async fn get_file_in_folder(&self, folder_url: &str, name: &str) -> RemoteResult<RemoteFileInfo> {
		if !self.is_dir(folder_url).await? {
			return Err(RemoteError::NotFound { url: folder_url.to_string() });
		}
		self.file_info(&join_url(&[folder_url, name])).await
	}

	async fn create_folder(&self, parent_url: &str, name: &str) -> RemoteResult<()> {
		let url = join_url(&[parent_url, name]);
		if !self.is_dir(parent_url).await? {
			return Err(RemoteError::Request {
				url,
				message: format!("parent folder {} does not exist", parent_url),
			});
		}
		let path = self.resolve(&url)?;
		match afs::create_dir(&path).await {
			Ok(()) => {
				debug!("Created folder {}", url);
				Ok(())
			}
			Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Err(RemoteError::AlreadyExists { url }),
			Err(e) => Err(RemoteError::Io { url, source: e }),
		}
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
		if !self.is_dir(folder_url).await? {
			return Err(RemoteError::NotFound { url: folder_url.to_string() });
		}
		let target = self.resolve(&url)?;
		if !overwrite && afs::metadata(&target).await.is_ok() {
			return Err(RemoteError::AlreadyExists { url });
		}

		let temp = target.with_file_name(format!(".{}{}", name, TEMP_SUFFIX));
		let io_err = |e: io::Error| RemoteError::Io { url: url.clone(), source: e };

		afs::copy(source, &temp).await.map_err(io_err)?;
		if let Some(modified) = modified {
			let temp_path = temp.clone();
			let stamp = SystemTime::from(modified);
			let result = tokio::task::spawn_blocking(move || {
				std::fs::OpenOptions::new().write(true).open(&temp_path)?.set_modified(stamp)
			})
			.await
			.map_err(|e| io::Error::new(io::ErrorKind::Other, e));
			if let Err(e) = result.and_then(|r| r) {
				let _ = afs::remove_file(&temp).await;
				return Err(io_err(e));
			}
		}
		if let Err(e) = afs::rename(&temp, &target).await {
			let _ = afs::remove_file(&temp).await;
			return Err(io_err(e));
		}

		self.file_info(&url).await
	}
}


// vim: ts=4
