//! Source-to-destination path mapping
//!
//! A destination path is built as `[base path] / root folder / segments...`,
//! where the root folder and every relative segment pass through the same
//! per-segment transformation:
//!
//! 1. a fixed rule collapsing `Clients...` folder names to `Clients`
//! 2. the configured exact-match name table (first match wins)
//! 3. optional folder simplification (cut at `(` or ` -`)
//! 4. optional regex removal
//! 5. whitespace trim
//!
//! A segment that would come out empty keeps its original value. Mapping
//! never fails; bad input degrades to the untransformed name with a warning.

use regex::Regex;

use crate::config::{FolderNameTransform, NameMappings};
use crate::logging::*;
use crate::types::{split_segments, DestinationPath};

/// Folder-name prefix collapsed by the fixed rule
pub const RESERVED_PREFIX: &str = "Clients";

/// Leading destination segments that name the library itself
pub const DEFAULT_RESERVED_LIBRARY_SEGMENTS: &[&str] = &["Shared Documents", "Documents"];

/// Last segment of a Windows or Unix path string
pub fn root_name_of(path: &str) -> String {
	split_segments(path)
		.filter(|s| !s.ends_with(':'))
		.last()
		.unwrap_or("")
		.to_string()
}

/// Collapse `Clients`, `Clients (ETC - Wilco)`, `Clients-2019` ... to `Clients`
///
/// Only whole-word prefixes match, so `Clientside` is left alone. Returns
/// `None` when the rule does not apply.
pub fn collapse_reserved_prefix(segment: &str) -> Option<String> {
	let trimmed = segment.trim_start();
	let head = trimmed.get(..RESERVED_PREFIX.len())?;
	if !head.eq_ignore_ascii_case(RESERVED_PREFIX) {
		return None;
	}
	match trimmed[RESERVED_PREFIX.len()..].chars().next() {
		None => Some(RESERVED_PREFIX.to_string()),
		Some(c) if !c.is_alphanumeric() => Some(RESERVED_PREFIX.to_string()),
		Some(_) => None,
	}
}

/// Cut a folder name at the first `(` or ` -`
pub fn simplify_folder_name(segment: &str) -> &str {
	let paren = segment.find('(');
	let dash = segment.find(" -");
	let cut = match (paren, dash) {
		(Some(a), Some(b)) => Some(a.min(b)),
		(a, b) => a.or(b),
	};
	match cut {
		Some(idx) => &segment[..idx],
		None => segment,
	}
}

/// Compiled form of a [`FolderNameTransform`]
#[derive(Debug, Clone, Default)]
struct CompiledTransform {
	mappings: NameMappings,
	simplify_folders: bool,
	remove: Option<Regex>,
}

impl CompiledTransform {
	fn compile(transform: &FolderNameTransform) -> Self {
		let remove = match transform.remove_pattern.as_deref() {
			Some(pattern) if !pattern.is_empty() => match Regex::new(pattern) {
				Ok(re) => Some(re),
				Err(e) => {
					warn!("Ignoring invalid removePattern {:?}: {}", pattern, e);
					None
				}
			},
			_ => None,
		};
		CompiledTransform {
			mappings: transform.name_mappings.clone(),
			simplify_folders: transform.simplify_folders,
			remove,
		}
	}
}

/// Maps scanner-relative paths to destination paths
#[derive(Debug, Clone)]
pub struct PathMapper {
	root_name: String,
	base: Vec<String>,
	transform: Option<CompiledTransform>,
	reserved_segments: Vec<String>,
}

impl PathMapper {
	pub fn new(
		source_root_name: &str,
		base_path: Option<&str>,
		transform: Option<&FolderNameTransform>,
	) -> Self {
		PathMapper {
			root_name: source_root_name.to_string(),
			base: base_path
				.map(|b| split_segments(b).map(|s| s.trim().to_string()).collect())
				.unwrap_or_default(),
			transform: transform.map(CompiledTransform::compile),
			reserved_segments: DEFAULT_RESERVED_LIBRARY_SEGMENTS
				.iter()
				.map(|s| s.to_string())
				.collect(),
		}
	}

	/// Replace the leading segments stripped by [`sanitize_destination`]
	pub fn with_reserved_segments(mut self, segments: Vec<String>) -> Self {
		self.reserved_segments = segments;
		self
	}

	/// Map a path relative to the source root (either separator)
	pub fn map(&self, relative_path: &str) -> DestinationPath {
		let relative: Vec<&str> = split_segments(relative_path).collect();
		let mut segments = self.base.clone();

		let root = self.transform_folder(&self.root_name);
		if !root.is_empty() {
			segments.push(root);
		}
		if let Some((file, folders)) = relative.split_last() {
			for folder in folders {
				segments.push(self.transform_folder(folder));
			}
			segments.push(self.transform_file(file));
		}

		sanitize_destination(DestinationPath::from_segments(segments), &self.reserved_segments)
	}

	/// Transform one folder segment
	pub fn transform_folder(&self, segment: &str) -> String {
		let mut value = match collapse_reserved_prefix(segment) {
			Some(collapsed) => collapsed,
			None => segment.to_string(),
		};
		if let Some(transform) = &self.transform {
			value = apply_mappings(&transform.mappings, &value);
			if transform.simplify_folders {
				value = simplify_folder_name(&value).to_string();
			}
			if let Some(re) = &transform.remove {
				value = re.replace_all(&value, "").into_owned();
			}
		}
		fallback(segment, value.trim())
	}

	/// Transform the file-name segment, keeping its extension intact
	pub fn transform_file(&self, name: &str) -> String {
		let mut value = name.to_string();
		if let Some(transform) = &self.transform {
			value = apply_mappings(&transform.mappings, &value);
		}
		let (stem, ext) = split_extension(&value);
		let mut stem = match collapse_reserved_prefix(stem) {
			Some(collapsed) => collapsed,
			None => stem.to_string(),
		};
		if let Some(re) = self.transform.as_ref().and_then(|t| t.remove.as_ref()) {
			stem = re.replace_all(&stem, "").into_owned();
		}
		let stem = stem.trim();
		if stem.is_empty() {
			return fallback(name, "");
		}
		fallback(name, &format!("{}{}", stem, ext))
	}
}

/// Map a path in one call
pub fn map_path(
	source_root_name: &str,
	relative_path: &str,
	base_path: Option<&str>,
	transform: Option<&FolderNameTransform>,
) -> DestinationPath {
	PathMapper::new(source_root_name, base_path, transform).map(relative_path)
}

/// Strip a leading library-name segment so a misconfigured base path does
/// not nest the library inside itself
pub fn sanitize_destination(path: DestinationPath, reserved: &[String]) -> DestinationPath {
	let segments = path.segments();
	if segments.len() > 1 && reserved.iter().any(|r| r.eq_ignore_ascii_case(&segments[0])) {
		warn!("Stripping leading library segment {:?} from destination {}", segments[0], path);
		return DestinationPath::from_segments(segments[1..].to_vec());
	}
	path
}

fn apply_mappings(mappings: &NameMappings, value: &str) -> String {
	mappings
		.iter()
		.find(|m| m.from == value)
		.map(|m| m.to.clone())
		.unwrap_or_else(|| value.to_string())
}

/// `("report.final", ".pdf")`; dotfiles and extensionless names keep everything in the stem
fn split_extension(name: &str) -> (&str, &str) {
	match name.rfind('.') {
		Some(idx) if idx > 0 => (&name[..idx], &name[idx..]),
		_ => (name, ""),
	}
}

fn fallback(original: &str, transformed: &str) -> String {
	if transformed.trim().is_empty() {
		if !original.trim().is_empty() {
			warn!("Segment {:?} transforms to nothing, keeping original", original);
		}
		return original.to_string();
	}
	transformed.to_string()
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::NameMapping;

	fn transform(mappings: &[(&str, &str)], simplify: bool, remove: Option<&str>) -> FolderNameTransform {
		FolderNameTransform {
			name_mappings: NameMappings(
				mappings
					.iter()
					.map(|(f, t)| NameMapping { from: f.to_string(), to: t.to_string() })
					.collect(),
			),
			simplify_folders: simplify,
			remove_pattern: remove.map(str::to_string),
		}
	}

	#[test]
	fn test_clients_root_collapses() {
		let dest = map_path(&root_name_of("G:\\shared\\Clients (ETC - Wilco)"), "sub\\file.pdf", None, None);
		assert_eq!(dest.as_display(), "Clients\\sub\\file.pdf");
	}

	#[test]
	fn test_collapse_is_idempotent() {
		for name in ["Clients (ETC - Wilco)", "Clients-2019", "clients", "Clients"] {
			let once = collapse_reserved_prefix(name).unwrap();
			let twice = collapse_reserved_prefix(&once).unwrap();
			assert_eq!(once, "Clients");
			assert_eq!(once, twice);
		}
		assert_eq!(collapse_reserved_prefix("Clientside"), None);
		assert_eq!(collapse_reserved_prefix("Client"), None);
	}

	#[test]
	fn test_mapper_is_idempotent_on_transformed_folder() {
		let mapper = PathMapper::new("Share", None, Some(&transform(&[], true, None)));
		let once = mapper.transform_folder("Clients (ETC - Wilco)");
		assert_eq!(mapper.transform_folder(&once), once);
	}

	#[test]
	fn test_base_path_prefix() {
		let dest = map_path("Share", "a/b.txt", Some("Migrated/2024"), None);
		assert_eq!(dest.as_url_path(), "Migrated/2024/Share/a/b.txt");
	}

	#[test]
	fn test_name_mapping_first_match_wins() {
		let t = transform(&[("Old", "First"), ("Old", "Second")], false, None);
		let dest = map_path("Share", "Old/x.txt", None, Some(&t));
		assert_eq!(dest.as_url_path(), "Share/First/x.txt");
	}

	#[test]
	fn test_simplify_cuts_at_paren_or_dash() {
		let t = transform(&[], true, None);
		let mapper = PathMapper::new("Share", None, Some(&t));
		assert_eq!(mapper.transform_folder("Acme Corp (2019)"), "Acme Corp");
		assert_eq!(mapper.transform_folder("Acme Corp - Archive"), "Acme Corp");
		assert_eq!(mapper.transform_folder("Acme-Corp"), "Acme-Corp");
	}

	#[test]
	fn test_simplify_does_not_touch_file_names() {
		let t = transform(&[], true, None);
		let dest = map_path("Share", "Folder (old)/Report (final).pdf", None, Some(&t));
		assert_eq!(dest.as_url_path(), "Share/Folder/Report (final).pdf");
	}

	#[test]
	fn test_remove_pattern_and_trim() {
		let t = transform(&[], false, Some(r"\s*\d{4}$"));
		let mapper = PathMapper::new("Share", None, Some(&t));
		assert_eq!(mapper.transform_folder("Taxes 2019"), "Taxes");
	}

	#[test]
	fn test_empty_result_falls_back_to_original() {
		let t = transform(&[], false, Some(".*"));
		let dest = map_path("Share", "Folder/file.txt", None, Some(&t));
		assert_eq!(dest.as_url_path(), "Share/Folder/file.txt");
	}

	#[test]
	fn test_invalid_regex_is_ignored() {
		let t = transform(&[], false, Some("(unclosed"));
		let dest = map_path("Share", "Folder/file.txt", None, Some(&t));
		assert_eq!(dest.as_url_path(), "Share/Folder/file.txt");
	}

	#[test]
	fn test_file_extension_survives_reserved_rule() {
		let dest = map_path("Share", "Clients 2020.xlsx", None, None);
		assert_eq!(dest.as_url_path(), "Share/Clients.xlsx");
	}

	#[test]
	fn test_sanitizer_strips_leading_library_segment() {
		let dest = map_path("Share", "a.txt", Some("Shared Documents"), None);
		assert_eq!(dest.as_url_path(), "Share/a.txt");
		let dest = map_path("Share", "a.txt", Some("documents/Archive"), None);
		assert_eq!(dest.as_url_path(), "Archive/Share/a.txt");
	}

	#[test]
	fn test_root_name_of() {
		assert_eq!(root_name_of("G:\\shared\\Clients (ETC - Wilco)"), "Clients (ETC - Wilco)");
		assert_eq!(root_name_of("/srv/share/"), "share");
		assert_eq!(root_name_of("G:\\"), "");
	}
}

// vim: ts=4
