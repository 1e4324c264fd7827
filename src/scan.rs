//! Source tree enumeration
//!
//! [`Scanner`] walks the share lazily and yields one [`FileDescriptor`] per
//! file. Files whose metadata cannot be read are still yielded, tagged
//! Locked. Files outside the configured date window are counted and dropped.

use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;

use crate::error::MigrateError;
use crate::logging::*;
use crate::mapping::PathMapper;
use crate::types::{AccessState, FileDescriptor};

/// Inclusive creation/modification window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateFilter {
	pub start: DateTime<Utc>,
	pub end: Option<DateTime<Utc>>,
}

impl DateFilter {
	/// Build a filter from optional bounds
	///
	/// No bounds means no filter. A lone start is closed at `now`, a lone end
	/// starts at the epoch.
	pub fn new(
		start: Option<DateTime<Utc>>,
		end: Option<DateTime<Utc>>,
		now: DateTime<Utc>,
	) -> Option<DateFilter> {
		match (start, end) {
			(None, None) => None,
			(Some(start), None) => Some(DateFilter { start, end: Some(now) }),
			(start, end) => Some(DateFilter { start: start.unwrap_or_else(epoch), end }),
		}
	}

	pub fn contains(&self, t: DateTime<Utc>) -> bool {
		t >= self.start && self.end.map_or(true, |end| t <= end)
	}

	/// Kept when either the creation or the modification time is in range
	pub fn keeps(&self, created: Option<DateTime<Utc>>, modified: Option<DateTime<Utc>>) -> bool {
		created.map_or(false, |t| self.contains(t)) || modified.map_or(false, |t| self.contains(t))
	}
}

fn epoch() -> DateTime<Utc> {
	Utc.timestamp_opt(0, 0).single().unwrap_or_default()
}

/// Running enumeration counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanStats {
	/// Every file seen, filtered ones included
	pub total_files: usize,
	/// Yielded to the caller (accessible and locked)
	pub emitted: usize,
	pub locked: usize,
	pub filtered_out: usize,
	/// Directories or entries that could not be listed
	pub unreadable_entries: usize,
	pub total_bytes: u64,
}

/// Lazy walk over a source root
pub struct Scanner {
	root: PathBuf,
	mapper: PathMapper,
	filter: Option<DateFilter>,
	pending: Vec<PathBuf>,
	current: Option<fs::ReadDir>,
	stats: ScanStats,
}

impl Scanner {
	/// Open the root; fails if it is missing, not a directory, or unlistable
	pub fn new(
		root: &Path,
		mapper: PathMapper,
		filter: Option<DateFilter>,
	) -> Result<Scanner, MigrateError> {
		let unavailable = |source: io::Error| MigrateError::SourceUnavailable {
			path: root.display().to_string(),
			source,
		};
		let meta = fs::metadata(root).map_err(unavailable)?;
		if !meta.is_dir() {
			return Err(unavailable(io::Error::new(io::ErrorKind::Other, "not a directory")));
		}
		let listing = fs::read_dir(root).map_err(unavailable)?;
		debug!("Scanning {}", root.display());

		Ok(Scanner {
			root: root.to_path_buf(),
			mapper,
			filter,
			pending: Vec::new(),
			current: Some(listing),
			stats: ScanStats::default(),
		})
	}

	pub fn root(&self) -> &Path {
		&self.root
	}

	pub fn stats(&self) -> &ScanStats {
		&self.stats
	}

	fn relative_path(&self, path: &Path) -> String {
		let rel = path.strip_prefix(&self.root).unwrap_or(path);
		rel.components()
			.filter_map(|c| match c {
				Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
				_ => None,
			})
			.collect::<Vec<_>>()
			.join("/")
	}

	fn describe(&self, path: PathBuf) -> FileDescriptor {
		let source_relative_path = self.relative_path(&path);
		let destination_path = self.mapper.map(&source_relative_path);
		let normalized_key = destination_path.normalized_key();

		let (size, created_at, modified_at, access, access_error) = match read_file_times(&path) {
			Ok((size, created, modified)) => {
				(Some(size), Some(created), Some(modified), AccessState::Accessible, None)
			}
			Err(e) => {
				warn!("Locked or unreadable: {}: {}", path.display(), e);
				(None, None, None, AccessState::Locked, Some(e.to_string()))
			}
		};

		FileDescriptor {
			source_absolute_path: path,
			source_relative_path,
			destination_path,
			normalized_key,
			size,
			created_at,
			modified_at,
			access,
			access_error,
		}
	}

	/// Next file path from the walk, descending into directories
	fn next_file(&mut self) -> Option<PathBuf> {
		loop {
			let entry = match self.current.as_mut() {
				Some(listing) => listing.next(),
				None => {
					let dir = self.pending.pop()?;
					match fs::read_dir(&dir) {
						Ok(listing) => self.current = Some(listing),
						Err(e) => {
							warn!("Cannot read directory {}: {}", dir.display(), e);
							self.stats.unreadable_entries += 1;
						}
					}
					continue;
				}
			};

			let entry = match entry {
				Some(Ok(entry)) => entry,
				Some(Err(e)) => {
					debug!("Error reading directory entry: {}", e);
					self.stats.unreadable_entries += 1;
					continue;
				}
				None => {
					self.current = None;
					continue;
				}
			};

			let path = entry.path();
			match entry.file_type() {
				Ok(ft) if ft.is_dir() => self.pending.push(path),
				Ok(ft) if ft.is_symlink() => {
					// Symlinked directories are not followed
					if fs::metadata(&path).map(|m| m.is_dir()).unwrap_or(false) {
						debug!("Not following directory symlink {}", path.display());
						continue;
					}
					return Some(path);
				}
				_ => return Some(path),
			}
		}
	}
}

impl Iterator for Scanner {
	type Item = FileDescriptor;

	fn next(&mut self) -> Option<FileDescriptor> {
		loop {
			let path = self.next_file()?;
			let descriptor = self.describe(path);
			self.stats.total_files += 1;

			if descriptor.is_locked() {
				self.stats.locked += 1;
				self.stats.emitted += 1;
				return Some(descriptor);
			}

			if let Some(filter) = &self.filter {
				if !filter.keeps(descriptor.created_at, descriptor.modified_at) {
					trace!("Outside date window: {}", descriptor.source_relative_path);
					self.stats.filtered_out += 1;
					continue;
				}
			}

			self.stats.emitted += 1;
			self.stats.total_bytes += descriptor.size.unwrap_or(0);
			return Some(descriptor);
		}
	}
}

/// Size, creation and modification time of a file
///
/// Filesystems without a birth time report the modification time as
/// creation time; any other failure marks the file locked.
fn read_file_times(path: &Path) -> io::Result<(u64, DateTime<Utc>, DateTime<Utc>)> {
	let meta = fs::metadata(path)?;
	let modified = meta.modified()?;
	let created = match meta.created() {
		Ok(t) => t,
		Err(e) if e.kind() == io::ErrorKind::Unsupported => modified,
		Err(e) => return Err(e),
	};
	Ok((meta.len(), to_utc(created), to_utc(modified)))
}

pub(crate) fn to_utc(t: SystemTime) -> DateTime<Utc> {
	DateTime::<Utc>::from(t)
}


// vim: ts=4
