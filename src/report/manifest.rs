//! Migration manifest for bulk migration tooling

use serde::{Deserialize, Serialize};

use crate::remote::join_url;
use crate::types::ClassificationResult;

/// One file the bulk tool should move
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestEntry {
	pub source_path: String,
	/// Server-relative URL of the target file
	pub destination_url: String,
	/// Library-relative path, backslash separated
	pub destination_path: String,
	pub file_name: String,
}

impl ManifestEntry {
	/// Entry for an upload row; `None` for every other action
	pub fn from_result(result: &ClassificationResult, library_root: &str) -> Option<ManifestEntry> {
		if !result.action.is_upload() {
			return None;
		}
		let destination_url = match &result.resolved_url {
			Some(url) => url.clone(),
			None => join_url(&[library_root, &result.destination_path.as_url_path()]),
		};
		Some(ManifestEntry {
			source_path: result.source_path.display().to_string(),
			destination_url,
			destination_path: result.destination_path.as_display(),
			file_name: result.destination_path.file_name().unwrap_or_default().to_string(),
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::types::{DestinationPath, MigrationAction, MigrationStatus};
	use std::path::PathBuf;

	fn result(action: MigrationAction, resolved: Option<&str>) -> ClassificationResult {
		ClassificationResult {
			status: MigrationStatus::Missing,
			action,
			source_path: PathBuf::from("/share/Clients/sub/file.pdf"),
			destination_path: DestinationPath::parse("Clients/sub/file.pdf"),
			source_size: Some(1),
			source_modified: None,
			remote_size: None,
			remote_modified: None,
			resolved_url: resolved.map(str::to_string),
		}
	}

	#[test]
	fn test_entry_for_missing_file() {
		let entry = ManifestEntry::from_result(&result(MigrationAction::Migrate, None), "sites/x/Shared Documents").unwrap();
		assert_eq!(entry.destination_url, "sites/x/Shared Documents/Clients/sub/file.pdf");
		assert_eq!(entry.destination_path, "Clients\\sub\\file.pdf");
		assert_eq!(entry.file_name, "file.pdf");
		let json = serde_json::to_value(&entry).unwrap();
		assert_eq!(json["sourcePath"], "/share/Clients/sub/file.pdf");
	}

	#[test]
	fn test_resolved_url_preferred_and_non_uploads_skipped() {
		let entry =
			ManifestEntry::from_result(&result(MigrationAction::CanMigrate, Some("Documents/Clients/sub/file.pdf")), "lib")
				.unwrap();
		assert_eq!(entry.destination_url, "Documents/Clients/sub/file.pdf");
		assert!(ManifestEntry::from_result(&result(MigrationAction::Review, None), "lib").is_none());
	}
}

// vim: ts=4
