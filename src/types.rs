//! Core data model shared by the scanner, classifier and driver

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Library-relative destination path, stored as segments
///
/// Remote calls use the forward-slash form, display and map keys use the
/// backslash form the share users are familiar with.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct DestinationPath {
	segments: Vec<String>,
}

impl DestinationPath {
	pub fn from_segments(segments: Vec<String>) -> Self {
		DestinationPath { segments: segments.into_iter().filter(|s| !s.is_empty()).collect() }
	}

	/// Split on either separator, dropping empty segments
	pub fn parse(path: &str) -> Self {
		DestinationPath::from_segments(split_segments(path).map(str::to_string).collect())
	}

	pub fn segments(&self) -> &[String] {
		&self.segments
	}

	pub fn is_empty(&self) -> bool {
		self.segments.is_empty()
	}

	pub fn as_url_path(&self) -> String {
		self.segments.join("/")
	}

	pub fn as_display(&self) -> String {
		self.segments.join("\\")
	}

	/// Case- and separator-insensitive key
	pub fn normalized_key(&self) -> String {
		self.as_display().to_lowercase()
	}

	pub fn file_name(&self) -> Option<&str> {
		self.segments.last().map(String::as_str)
	}

	/// Path without its last segment; empty for a single-segment path
	pub fn parent(&self) -> DestinationPath {
		let n = self.segments.len().saturating_sub(1);
		DestinationPath { segments: self.segments[..n].to_vec() }
	}

	pub fn join(&self, other: &DestinationPath) -> DestinationPath {
		let mut segments = self.segments.clone();
		segments.extend(other.segments.iter().cloned());
		DestinationPath { segments }
	}
}

impl fmt::Display for DestinationPath {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.as_display())
	}
}

/// Split a path string on `/` and `\`, skipping empty parts
pub fn split_segments(path: &str) -> impl Iterator<Item = &str> {
	path.split(|c: char| c == '/' || c == '\\').filter(|s| !s.is_empty())
}

/// Whether the scanner could read a file's metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessState {
	Accessible,
	Locked,
}

/// One file discovered during enumeration
#[derive(Debug, Clone, PartialEq)]
pub struct FileDescriptor {
	pub source_absolute_path: PathBuf,
	/// Relative to the scan root, `/` separated
	pub source_relative_path: String,
	pub destination_path: DestinationPath,
	pub normalized_key: String,
	pub size: Option<u64>,
	pub created_at: Option<DateTime<Utc>>,
	pub modified_at: Option<DateTime<Utc>>,
	pub access: AccessState,
	/// Why the metadata could not be read (Locked only)
	pub access_error: Option<String>,
}

impl FileDescriptor {
	pub fn is_locked(&self) -> bool {
		self.access == AccessState::Locked
	}
}

/// Metadata of a file found in the destination store
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteFileInfo {
	/// The candidate URL that matched
	pub resolved_url: String,
	pub size: u64,
	pub modified_at: DateTime<Utc>,
}

/// Comparison status of one source file against the destination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MigrationStatus {
	Missing,
	NewerOnServer,
	NewerInSharePoint,
	SizeMismatch,
	Identical,
	Locked,
}

impl MigrationStatus {
	pub const ALL: [MigrationStatus; 6] = [
		MigrationStatus::Missing,
		MigrationStatus::NewerOnServer,
		MigrationStatus::NewerInSharePoint,
		MigrationStatus::SizeMismatch,
		MigrationStatus::Identical,
		MigrationStatus::Locked,
	];

	pub fn as_str(&self) -> &'static str {
		match self {
			MigrationStatus::Missing => "Missing",
			MigrationStatus::NewerOnServer => "NewerOnServer",
			MigrationStatus::NewerInSharePoint => "NewerInSharePoint",
			MigrationStatus::SizeMismatch => "SizeMismatch",
			MigrationStatus::Identical => "Identical",
			MigrationStatus::Locked => "Locked",
		}
	}
}

impl fmt::Display for MigrationStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// What the driver should do with a classified file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MigrationAction {
	/// Missing at destination; upload without overwrite
	Migrate,
	/// Source is newer; upload with overwrite
	CanMigrate,
	Skip,
	Review,
	ReviewLocked,
}

impl MigrationAction {
	pub fn as_str(&self) -> &'static str {
		match self {
			MigrationAction::Migrate => "Migrate",
			MigrationAction::CanMigrate => "CanMigrate",
			MigrationAction::Skip => "Skip",
			MigrationAction::Review => "Review",
			MigrationAction::ReviewLocked => "ReviewLocked",
		}
	}

	pub fn is_upload(&self) -> bool {
		matches!(self, MigrationAction::Migrate | MigrationAction::CanMigrate)
	}

	/// Overwrite flag passed to the store for this action
	pub fn overwrite(&self) -> bool {
		matches!(self, MigrationAction::CanMigrate)
	}
}

impl fmt::Display for MigrationAction {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// One row of the comparison output
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationResult {
	pub status: MigrationStatus,
	pub action: MigrationAction,
	pub source_path: PathBuf,
	pub destination_path: DestinationPath,
	pub source_size: Option<u64>,
	pub source_modified: Option<DateTime<Utc>>,
	pub remote_size: Option<u64>,
	pub remote_modified: Option<DateTime<Utc>>,
	pub resolved_url: Option<String>,
}

impl ClassificationResult {
	/// Identical files are reconciled already and never reported as work
	pub fn is_actionable(&self) -> bool {
		self.status != MigrationStatus::Identical
	}
}

/// Result of one upload attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
	Success,
	Failed { error: String },
	Skipped { reason: String },
}

impl UploadOutcome {
	pub fn is_success(&self) -> bool {
		matches!(self, UploadOutcome::Success)
	}

	pub fn as_str(&self) -> &'static str {
		match self {
			UploadOutcome::Success => "Success",
			UploadOutcome::Failed { .. } => "Failed",
			UploadOutcome::Skipped { .. } => "Skipped",
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_destination_path_forms() {
		let p = DestinationPath::parse("Clients\\sub/file.pdf");
		assert_eq!(p.as_url_path(), "Clients/sub/file.pdf");
		assert_eq!(p.as_display(), "Clients\\sub\\file.pdf");
		assert_eq!(p.file_name(), Some("file.pdf"));
		assert_eq!(p.parent().as_url_path(), "Clients/sub");
	}

	#[test]
	fn test_normalized_key_ignores_case_and_separator() {
		let a = DestinationPath::parse("Clients/Sub/File.PDF");
		let b = DestinationPath::parse("clients\\sub\\file.pdf");
		assert_eq!(a.normalized_key(), b.normalized_key());
	}

	#[test]
	fn test_parent_of_single_segment_is_empty() {
		assert!(DestinationPath::parse("file.pdf").parent().is_empty());
	}

	#[test]
	fn test_action_overwrite_mapping() {
		assert!(!MigrationAction::Migrate.overwrite());
		assert!(MigrationAction::CanMigrate.overwrite());
		assert!(MigrationAction::Migrate.is_upload());
		assert!(!MigrationAction::Review.is_upload());
	}
}

// vim: ts=4
