//! Destination path validation functions

use super::ValidationError;
use crate::types::DestinationPath;

/// Characters a document library rejects in file and folder names
pub const INVALID_SEGMENT_CHARS: &[char] = &['"', '*', ':', '<', '>', '?', '/', '\\', '|'];

/// Names a document library refuses regardless of case
pub const RESERVED_NAMES: &[&str] = &[".lock", "CON", "PRN", "AUX", "NUL", "desktop.ini"];

/// Longest accepted file or folder name
pub const MAX_SEGMENT_LEN: usize = 255;

/// Longest accepted decoded destination path
pub const MAX_PATH_LEN: usize = 400;

/// COM0-9 and LPT0-9
fn is_device_name(segment: &str) -> bool {
	let upper = segment.to_ascii_uppercase();
	let bytes = upper.as_bytes();
	bytes.len() == 4 && (upper.starts_with("COM") || upper.starts_with("LPT")) && bytes[3].is_ascii_digit()
}

fn is_reserved_name(segment: &str) -> bool {
	RESERVED_NAMES.iter().any(|r| r.eq_ignore_ascii_case(segment))
		|| is_device_name(segment)
		|| segment.starts_with("~$")
		|| segment.to_ascii_lowercase().contains("_vti_")
}

/// Check that a single segment is acceptable to the store
///
/// Rejects empty or overlong names, `.`/`..`, reserved characters, reserved
/// names, and names ending in a dot or space.
pub fn is_segment_valid(segment: &str) -> bool {
	!segment.is_empty()
		&& segment.chars().count() <= MAX_SEGMENT_LEN
		&& segment != "."
		&& segment != ".."
		&& !segment.contains(INVALID_SEGMENT_CHARS)
		&& !segment.ends_with('.')
		&& !segment.ends_with(' ')
		&& !is_reserved_name(segment)
}

/// Validate every segment of a destination path
///
/// # Returns
/// `Ok(())` if valid, `Err(ValidationError)` naming the first bad segment
pub fn validate_destination(path: &DestinationPath) -> Result<(), ValidationError> {
	if path.is_empty() {
		return Err(ValidationError::PathError("Destination path is empty".to_string()));
	}
	let length = path.as_url_path().chars().count();
	if length > MAX_PATH_LEN {
		return Err(ValidationError::PathError(format!(
			"Destination {} is {} characters long, limit is {}",
			path, length, MAX_PATH_LEN
		)));
	}
	for segment in path.segments() {
		if !is_segment_valid(segment) {
			return Err(ValidationError::PathError(format!(
				"Segment {:?} of {} is not a valid destination name",
				segment, path
			)));
		}
	}
	Ok(())
}


// vim: ts=4
