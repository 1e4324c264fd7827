//! Tolerance-aware comparison of a source file against its remote twin

use crate::types::{ClassificationResult, FileDescriptor, MigrationAction, MigrationStatus, RemoteFileInfo};

/// Knobs that change how a comparison turns into an action
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassifyPolicy {
	/// Timestamps closer than this many seconds are considered equal
	pub tolerance_secs: f64,
	/// Upload source files that are newer than the remote copy
	pub include_can_migrate: bool,
}

impl Default for ClassifyPolicy {
	fn default() -> Self {
		ClassifyPolicy { tolerance_secs: 2.0, include_can_migrate: false }
	}
}

impl ClassifyPolicy {
	fn tolerance(&self) -> f64 {
		if self.tolerance_secs.is_finite() && self.tolerance_secs > 0.0 {
			self.tolerance_secs
		} else {
			0.0
		}
	}
}

/// Classify one descriptor given the lookup result for its destination
///
/// A remote copy that is newer than the source (beyond the tolerance) is
/// never scheduled for upload, whatever the policy says.
pub fn classify(
	descriptor: &FileDescriptor,
	remote: Option<&RemoteFileInfo>,
	policy: &ClassifyPolicy,
) -> ClassificationResult {
	let (status, action) = decide(descriptor, remote, policy);
	ClassificationResult {
		status,
		action,
		source_path: descriptor.source_absolute_path.clone(),
		destination_path: descriptor.destination_path.clone(),
		source_size: descriptor.size,
		source_modified: descriptor.modified_at,
		remote_size: remote.map(|r| r.size),
		remote_modified: remote.map(|r| r.modified_at),
		resolved_url: remote.map(|r| r.resolved_url.clone()),
	}
}

fn decide(
	descriptor: &FileDescriptor,
	remote: Option<&RemoteFileInfo>,
	policy: &ClassifyPolicy,
) -> (MigrationStatus, MigrationAction) {
	if descriptor.is_locked() {
		let action = if remote.is_some() { MigrationAction::Review } else { MigrationAction::ReviewLocked };
		return (MigrationStatus::Locked, action);
	}

	let remote = match remote {
		Some(remote) => remote,
		None => return (MigrationStatus::Missing, MigrationAction::Migrate),
	};

	let tolerance = policy.tolerance();
	let delta = match descriptor.modified_at {
		Some(modified) => (modified - remote.modified_at).num_milliseconds() as f64 / 1000.0,
		None => 0.0,
	};

	if delta > tolerance {
		let action = if policy.include_can_migrate { MigrationAction::CanMigrate } else { MigrationAction::Skip };
		(MigrationStatus::NewerOnServer, action)
	} else if delta < -tolerance {
		(MigrationStatus::NewerInSharePoint, MigrationAction::Skip)
	} else if descriptor.size != Some(remote.size) {
		(MigrationStatus::SizeMismatch, MigrationAction::Review)
	} else {
		(MigrationStatus::Identical, MigrationAction::Skip)
	}
}


// vim: ts=4
