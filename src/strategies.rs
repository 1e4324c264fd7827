//! Consolidated strategy and mode enums
//!
//! Central location for the run-shaping enums: processing mode, destination
//! collision handling and remote lookup candidates.
//!
//! Each enum includes a FromStr implementation for CLI and config parsing.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

// ============================================================================
// RUN MODE
// ============================================================================

/// How the driver interleaves scanning, classification and upload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum RunMode {
	/// Scan everything, classify everything, then upload (default)
	#[default]
	Batch,

	/// Classify and upload each file as the scanner finds it
	Streaming,
}

impl FromStr for RunMode {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_lowercase().as_str() {
			"batch" => Ok(Self::Batch),
			"streaming" | "stream" => Ok(Self::Streaming),
			_ => Err(format!("Unknown run mode: {}. Valid options: batch, streaming", s)),
		}
	}
}

impl std::fmt::Display for RunMode {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Batch => write!(f, "batch"),
			Self::Streaming => write!(f, "streaming"),
		}
	}
}

// ============================================================================
// COLLISION POLICY
// ============================================================================

/// What to do when two source files map to the same destination key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum CollisionPolicy {
	/// Later file replaces the earlier one, with a warning (default)
	#[default]
	KeepLast,

	/// Earlier file is kept, later one is dropped with a warning
	WarnSkip,

	/// Abort the run
	Error,
}

impl FromStr for CollisionPolicy {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_lowercase().as_str() {
			"keep-last" | "last" => Ok(Self::KeepLast),
			"warn-skip" | "keep-first" | "skip" => Ok(Self::WarnSkip),
			"error" | "fail" => Ok(Self::Error),
			_ => Err(format!(
				"Unknown collision policy: {}. Valid options: keep-last, warn-skip, error",
				s
			)),
		}
	}
}

impl std::fmt::Display for CollisionPolicy {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::KeepLast => write!(f, "keep-last"),
			Self::WarnSkip => write!(f, "warn-skip"),
			Self::Error => write!(f, "error"),
		}
	}
}

// ============================================================================
// LOOKUP CANDIDATES
// ============================================================================

/// One way of turning a destination path into a remote lookup attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CandidateRule {
	/// Library root URL + destination path
	Direct,

	/// Library display name + destination path
	LibraryDisplayName,

	/// Each configured library alias + destination path
	Aliases,

	/// A fixed prefix + destination path
	Prefix(String),

	/// Destination path with no prefix
	Raw,

	/// Open the parent folder, then the file by name inside it
	FolderNavigation,
}

impl CandidateRule {
	/// The default resolution order
	pub fn default_order() -> Vec<CandidateRule> {
		vec![
			CandidateRule::Direct,
			CandidateRule::LibraryDisplayName,
			CandidateRule::Aliases,
			CandidateRule::Raw,
			CandidateRule::FolderNavigation,
		]
	}
}

impl FromStr for CandidateRule {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		if let Some(prefix) = s.strip_prefix("prefix:") {
			return Ok(Self::Prefix(prefix.to_string()));
		}
		match s.to_lowercase().as_str() {
			"direct" => Ok(Self::Direct),
			"library-display-name" | "display-name" => Ok(Self::LibraryDisplayName),
			"aliases" => Ok(Self::Aliases),
			"raw" => Ok(Self::Raw),
			"folder-navigation" | "folder" => Ok(Self::FolderNavigation),
			_ => Err(format!(
				"Unknown lookup candidate: {}. Valid options: direct, library-display-name, aliases, raw, folder-navigation, prefix:<path>",
				s
			)),
		}
	}
}

impl std::fmt::Display for CandidateRule {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Direct => write!(f, "direct"),
			Self::LibraryDisplayName => write!(f, "library-display-name"),
			Self::Aliases => write!(f, "aliases"),
			Self::Prefix(prefix) => write!(f, "prefix:{}", prefix),
			Self::Raw => write!(f, "raw"),
			Self::FolderNavigation => write!(f, "folder-navigation"),
		}
	}
}


// vim: ts=4
