//! Configuration validation functions

use chrono::{DateTime, Utc};
use regex::Regex;

use super::{ValidationError, Validator};
use crate::config::{parse_date, Config, StoreConfig};

/// Largest accepted `concurrency`
pub const MAX_CONCURRENCY: usize = 32;

/// Reject empty or whitespace-only required fields
pub fn validate_required(field: &str, value: &str) -> Result<(), ValidationError> {
	if value.trim().is_empty() {
		return Err(ValidationError::ConfigError(format!("{} is required", field)));
	}
	Ok(())
}

/// Site URL must be an absolute http(s) URL
pub fn validate_site_url(url: &str) -> Result<(), ValidationError> {
	validate_required("siteUrl", url)?;
	let lower = url.trim().to_lowercase();
	if !(lower.starts_with("https://") || lower.starts_with("http://")) {
		return Err(ValidationError::ConfigError(format!(
			"siteUrl must start with https:// or http://, got {}",
			url
		)));
	}
	Ok(())
}

/// Tolerance must be a finite, non-negative number of seconds
pub fn validate_tolerance(tolerance_secs: f64) -> Result<(), ValidationError> {
	if !tolerance_secs.is_finite() || tolerance_secs < 0.0 {
		return Err(ValidationError::ConfigError(format!(
			"toleranceSecs must be a non-negative number, got {}",
			tolerance_secs
		)));
	}
	Ok(())
}

/// Concurrency must be within 1..=MAX_CONCURRENCY
pub fn validate_concurrency(concurrency: usize) -> Result<(), ValidationError> {
	if concurrency == 0 || concurrency > MAX_CONCURRENCY {
		return Err(ValidationError::ConfigError(format!(
			"concurrency must be between 1 and {}, got {}",
			MAX_CONCURRENCY, concurrency
		)));
	}
	Ok(())
}

/// Both dates must parse and be in order
pub fn validate_date_range(
	start: Option<&str>,
	end: Option<&str>,
) -> Result<(Option<DateTime<Utc>>, Option<DateTime<Utc>>), ValidationError> {
	let start = start.map(|s| parse_date(s, false)).transpose()?;
	let end = end.map(|s| parse_date(s, true)).transpose()?;
	if let (Some(s), Some(e)) = (start, end) {
		if s > e {
			return Err(ValidationError::ConfigError(format!(
				"startDate {} is after endDate {}",
				s, e
			)));
		}
	}
	Ok((start, end))
}

/// Uploads need a store that keeps them
pub fn validate_store(store: &StoreConfig, migrate: bool) -> Result<(), ValidationError> {
	if migrate && *store == StoreConfig::Memory {
		return Err(ValidationError::ConfigError(
			"migrate needs a persistent store; the memory store discards uploads".to_string(),
		));
	}
	Ok(())
}

/// removePattern must compile
pub fn validate_remove_pattern(pattern: Option<&str>) -> Result<(), ValidationError> {
	if let Some(pattern) = pattern {
		Regex::new(pattern).map_err(|e| {
			ValidationError::ConfigError(format!("removePattern is not a valid regex: {}", e))
		})?;
	}
	Ok(())
}

impl Validator for Config {
	fn validate(&self) -> Result<(), ValidationError> {
		validate_required("tenantId", &self.tenant_id)?;
		validate_required("clientId", &self.client_id)?;
		validate_required("certificateThumbprint", &self.certificate_thumbprint)?;
		validate_site_url(&self.site_url)?;
		validate_required("fileServerPath", &self.file_server_path.to_string_lossy())?;
		validate_required("libraryName", &self.library_name)?;
		validate_tolerance(self.run.tolerance_secs)?;
		validate_concurrency(self.run.concurrency)?;
		validate_store(&self.store, self.run.migrate)?;
		validate_date_range(self.start_date.as_deref(), self.end_date.as_deref())?;
		if let Some(transform) = &self.folder_name_transform {
			validate_remove_pattern(transform.remove_pattern.as_deref())?;
		}
		if self.lookup_candidates.is_empty() {
			return Err(ValidationError::ConfigError(
				"lookupCandidates must name at least one candidate".to_string(),
			));
		}
		if self.source_root_name().is_empty() {
			return Err(ValidationError::ConfigError(
				"cannot derive a destination root folder from fileServerPath; set destinationRootName"
					.to_string(),
			));
		}
		Ok(())
	}
}


// vim: ts=4
