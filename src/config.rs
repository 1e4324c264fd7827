//! Unified configuration for sharemig
//!
//! The configuration follows a priority chain:
//! 1. Built-in defaults (Config::default())
//! 2. Config file (`.json`/`.json5` via json5, `.toml` via toml)
//! 3. Environment variables (SHAREMIG_* prefix)
//! 4. CLI flags (highest priority, applied by the binary)

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::de::{self, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::MigrateError;
use crate::mapping::{root_name_of, PathMapper, DEFAULT_RESERVED_LIBRARY_SEGMENTS};
use crate::scan::DateFilter;
use crate::strategies::{CandidateRule, CollisionPolicy, RunMode};
use crate::validation::ValidationError;

/// Library used when none is configured
pub const DEFAULT_LIBRARY_NAME: &str = "Documents";

/// Library aliases tried by the `aliases` lookup candidate
pub const DEFAULT_LIBRARY_ALIASES: &[&str] = &["Shared Documents", "Documents"];

// ============================================================================
// MAIN CONFIGURATION STRUCT
// ============================================================================

/// Unified configuration for a reconciliation/migration run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
	// ========================================================================
	// DESTINATION CREDENTIALS & ENDPOINT
	// ========================================================================
	pub tenant_id: String,
	pub client_id: String,
	pub certificate_thumbprint: String,
	/// Site URL of the destination store
	pub site_url: String,

	// ========================================================================
	// SOURCE
	// ========================================================================
	/// Root of the file-server share to reconcile
	pub file_server_path: PathBuf,

	/// Only files created or modified on/after this date (inclusive)
	pub start_date: Option<String>,

	/// Only files created or modified on/before this date (inclusive)
	pub end_date: Option<String>,

	// ========================================================================
	// DESTINATION LAYOUT
	// ========================================================================
	/// Destination library
	pub library_name: String,

	/// Destination root folder; defaults to the last segment of fileServerPath
	pub destination_root_name: Option<String>,

	/// Prefix segment(s) placed in front of the root folder
	pub share_point_base_path: Option<String>,

	/// Per-segment renaming rules
	pub folder_name_transform: Option<FolderNameTransform>,

	/// Leading segments stripped from destination paths
	pub reserved_library_segments: Vec<String>,

	// ========================================================================
	// REMOTE LOOKUP
	// ========================================================================
	/// Ordered lookup candidates
	pub lookup_candidates: Vec<CandidateRule>,

	/// Prefixes tried by the `aliases` candidate
	pub library_aliases: Vec<String>,

	/// Which store backs the destination
	pub store: StoreConfig,

	// ========================================================================
	// OUTPUT & LOGGING
	// ========================================================================
	/// Directory receiving reports and the event log
	pub output_dir: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	pub log_level: String,

	// ========================================================================
	// RUN BEHAVIOR
	// ========================================================================
	pub run: RunOptions,
}

impl Default for Config {
	fn default() -> Self {
		Config {
			tenant_id: String::new(),
			client_id: String::new(),
			certificate_thumbprint: String::new(),
			site_url: String::new(),

			file_server_path: PathBuf::new(),
			start_date: None,
			end_date: None,

			library_name: DEFAULT_LIBRARY_NAME.to_string(),
			destination_root_name: None,
			share_point_base_path: None,
			folder_name_transform: None,
			reserved_library_segments: DEFAULT_RESERVED_LIBRARY_SEGMENTS
				.iter()
				.map(|s| s.to_string())
				.collect(),

			lookup_candidates: CandidateRule::default_order(),
			library_aliases: DEFAULT_LIBRARY_ALIASES.iter().map(|s| s.to_string()).collect(),
			store: StoreConfig::default(),

			output_dir: PathBuf::from("sharemig-output"),
			log_level: "info".to_string(),

			run: RunOptions::default(),
		}
	}
}

impl Config {
	/// Load a config file, picking the parser from the extension
	pub fn load(path: &Path) -> Result<Config, MigrateError> {
		let contents = fs::read_to_string(path).map_err(|e| MigrateError::InvalidConfig {
			message: format!("cannot read {}: {}", path.display(), e),
		})?;
		let is_toml = path.extension().map(|ext| ext.eq_ignore_ascii_case("toml")).unwrap_or(false);
		if is_toml {
			toml::from_str(&contents).map_err(|e| MigrateError::InvalidConfig {
				message: format!("{}: {}", path.display(), e),
			})
		} else {
			json5::from_str(&contents).map_err(|e| MigrateError::InvalidConfig {
				message: format!("{}: {}", path.display(), e),
			})
		}
	}

	/// Apply SHAREMIG_* overrides from the given variable source
	pub fn apply_env<F>(&mut self, var: F)
	where
		F: Fn(&str) -> Option<String>,
	{
		let strings: [(&str, &mut String); 5] = [
			("SHAREMIG_TENANT_ID", &mut self.tenant_id),
			("SHAREMIG_CLIENT_ID", &mut self.client_id),
			("SHAREMIG_CERTIFICATE_THUMBPRINT", &mut self.certificate_thumbprint),
			("SHAREMIG_SITE_URL", &mut self.site_url),
			("SHAREMIG_LIBRARY_NAME", &mut self.library_name),
		];
		for (name, slot) in strings {
			if let Some(value) = var(name) {
				*slot = value;
			}
		}
		if let Some(value) = var("SHAREMIG_FILE_SERVER_PATH") {
			self.file_server_path = PathBuf::from(value);
		}
		if let Some(value) = var("SHAREMIG_OUTPUT_DIR") {
			self.output_dir = PathBuf::from(value);
		}
		if let Some(value) = var("SHAREMIG_LOG_LEVEL") {
			self.log_level = value;
		}
	}

	/// Apply overrides from the process environment
	pub fn apply_process_env(&mut self) {
		self.apply_env(|name| std::env::var(name).ok());
	}

	/// Destination root folder name before transformation
	pub fn source_root_name(&self) -> String {
		match &self.destination_root_name {
			Some(name) if !name.trim().is_empty() => name.trim().to_string(),
			_ => root_name_of(&self.file_server_path.to_string_lossy()),
		}
	}

	/// Build the path mapper for this configuration
	pub fn path_mapper(&self) -> PathMapper {
		PathMapper::new(
			&self.source_root_name(),
			self.share_point_base_path.as_deref(),
			self.folder_name_transform.as_ref(),
		)
		.with_reserved_segments(self.reserved_library_segments.clone())
	}

	/// Date filter from startDate/endDate, None when neither is set
	pub fn date_filter(&self, now: DateTime<Utc>) -> Result<Option<DateFilter>, ValidationError> {
		let start = self.start_date.as_deref().map(|s| parse_date(s, false)).transpose()?;
		let end = self.end_date.as_deref().map(|s| parse_date(s, true)).transpose()?;
		Ok(DateFilter::new(start, end, now))
	}
}

/// Parse an ISO date or date-time
///
/// Date-only values resolve to the start of the day, or the last instant of
/// the day when `end_of_day` is set, so both bounds stay inclusive.
pub fn parse_date(value: &str, end_of_day: bool) -> Result<DateTime<Utc>, ValidationError> {
	let value = value.trim();
	if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
		return Ok(dt.with_timezone(&Utc));
	}
	for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
		if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
			return Ok(Utc.from_utc_datetime(&naive));
		}
	}
	if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
		let naive = if end_of_day {
			date.and_hms_milli_opt(23, 59, 59, 999)
		} else {
			date.and_hms_opt(0, 0, 0)
		};
		if let Some(naive) = naive {
			return Ok(Utc.from_utc_datetime(&naive));
		}
	}
	Err(ValidationError::ConfigError(format!("Unparseable date: {}", value)))
}

// ============================================================================
// NESTED CONFIGURATION STRUCTS
// ============================================================================

/// Knobs that shape one run; most have CLI flags
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RunOptions {
	/// Upload eligible files (dry run when false)
	pub migrate: bool,

	/// Timestamps closer than this are treated as equal (seconds)
	pub tolerance_secs: f64,

	/// Number of planned actions logged up front
	pub preview_count: usize,

	/// Upload attempt budget, 0 = unlimited
	pub stop_after: usize,

	/// Abort the run on the first failed upload
	pub fail_fast: bool,

	/// Upload files that are newer at the source (overwrite)
	pub include_can_migrate: bool,

	/// Batch or streaming processing
	pub mode: RunMode,

	/// Files processed in parallel (1 = strictly sequential)
	pub concurrency: usize,

	/// Handling of source files colliding on one destination
	pub collision_policy: CollisionPolicy,

	/// Ask before uploading more than this many files (batch mode)
	pub confirm_threshold: usize,

	/// Never ask for confirmation
	pub assume_yes: bool,

	/// Include identical files in the comparison report
	pub report_identical: bool,
}

impl Default for RunOptions {
	fn default() -> Self {
		RunOptions {
			migrate: false,
			tolerance_secs: 2.0,
			preview_count: 20,
			stop_after: 0,
			fail_fast: false,
			include_can_migrate: false,
			mode: RunMode::Batch,
			concurrency: 1,
			collision_policy: CollisionPolicy::KeepLast,
			confirm_threshold: 500,
			assume_yes: false,
			report_identical: false,
		}
	}
}

/// Per-segment renaming rules
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FolderNameTransform {
	/// Exact-match substitutions, first match wins
	pub name_mappings: NameMappings,

	/// Cut folder names at the first "(" or " -"
	pub simplify_folders: bool,

	/// Regex whose matches are removed from each segment
	pub remove_pattern: Option<String>,
}

/// One exact-match substitution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameMapping {
	pub from: String,
	pub to: String,
}

/// Ordered substitution table
///
/// Accepts either a list of `{from, to}` objects or a plain object; the
/// object form keeps document order, which matters for first-match-wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NameMappings(pub Vec<NameMapping>);

impl NameMappings {
	pub fn iter(&self) -> impl Iterator<Item = &NameMapping> {
		self.0.iter()
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}

impl<'de> Deserialize<'de> for NameMappings {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		struct MappingsVisitor;

		impl<'de> Visitor<'de> for MappingsVisitor {
			type Value = NameMappings;

			fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
				f.write_str("an object of name mappings or a list of {from, to} pairs")
			}

			fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
			where
				A: MapAccess<'de>,
			{
				let mut out = Vec::new();
				while let Some((from, to)) = map.next_entry::<String, String>()? {
					out.push(NameMapping { from, to });
				}
				Ok(NameMappings(out))
			}

			fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
			where
				A: SeqAccess<'de>,
			{
				let mut out = Vec::new();
				while let Some(mapping) = seq.next_element::<NameMapping>()? {
					if mapping.from.is_empty() {
						return Err(de::Error::custom("name mapping with empty 'from'"));
					}
					out.push(mapping);
				}
				Ok(NameMappings(out))
			}
		}

		deserializer.deserialize_any(MappingsVisitor)
	}
}

/// Destination store backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum StoreConfig {
	/// Empty in-memory library; every file classifies as Missing
	Memory,

	/// A local directory standing in for the site
	Directory {
		path: PathBuf,
		/// Internal folder of the library under the site root
		#[serde(default = "default_library_folder", rename = "libraryFolder")]
		library_folder: String,
		/// Display name reported for the library (defaults to libraryName)
		#[serde(default, rename = "displayName")]
		display_name: Option<String>,
	},
}

fn default_library_folder() -> String {
	"Shared Documents".to_string()
}

impl Default for StoreConfig {
	fn default() -> Self {
		StoreConfig::Memory
	}
}


// vim: ts=4
