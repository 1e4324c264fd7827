//! End-of-run summary

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write;
use std::path::PathBuf;

use crate::scan::ScanStats;
use crate::strategies::RunMode;
use crate::types::MigrationStatus;

/// Why a run ended before processing every file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum StopReason {
	/// Upload attempt budget exhausted
	StopAfter,
	/// First failure under fail-fast
	FailFast,
	/// Interrupted by the operator
	Cancelled,
	/// Two source files mapped to one destination under the error policy
	Collision,
}

impl std::fmt::Display for StopReason {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			StopReason::StopAfter => write!(f, "stop-after limit reached"),
			StopReason::FailFast => write!(f, "fail-fast on first failure"),
			StopReason::Cancelled => write!(f, "cancelled"),
			StopReason::Collision => write!(f, "destination collision"),
		}
	}
}

/// Counts and outcome of one run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
	pub run_id: String,
	pub mode: RunMode,
	pub migrate: bool,
	pub started_at: DateTime<Utc>,
	pub finished_at: DateTime<Utc>,
	pub scan: ScanStats,
	pub status_counts: BTreeMap<MigrationStatus, usize>,
	/// Files classified Migrate or CanMigrate
	pub planned_uploads: usize,
	pub attempted: usize,
	pub uploaded: usize,
	pub failed: usize,
	pub bytes_uploaded: u64,
	/// Source files dropped or replaced by the collision policy
	pub collisions: usize,
	pub stop_reason: Option<StopReason>,
	pub outputs: Vec<PathBuf>,
}

impl RunSummary {
	pub fn new(run_id: &str, mode: RunMode, migrate: bool, started_at: DateTime<Utc>) -> Self {
		RunSummary {
			run_id: run_id.to_string(),
			mode,
			migrate,
			started_at,
			finished_at: started_at,
			scan: ScanStats::default(),
			status_counts: BTreeMap::new(),
			planned_uploads: 0,
			attempted: 0,
			uploaded: 0,
			failed: 0,
			bytes_uploaded: 0,
			collisions: 0,
			stop_reason: None,
			outputs: Vec::new(),
		}
	}

	pub fn count(&self, status: MigrationStatus) -> usize {
		self.status_counts.get(&status).copied().unwrap_or(0)
	}

	pub fn classified(&self) -> usize {
		self.status_counts.values().sum()
	}

	/// Plain-text rendering for the summary file and the console
	pub fn render(&self) -> String {
		let mut out = String::new();
		let _ = writeln!(out, "sharemig run {}", self.run_id);
		let _ = writeln!(
			out,
			"Mode: {}{}",
			self.mode,
			if self.migrate { ", migrate" } else { ", dry run" }
		);
		let _ = writeln!(out, "Started:  {}", self.started_at.to_rfc3339());
		let _ = writeln!(out, "Finished: {}", self.finished_at.to_rfc3339());
		let _ = writeln!(out);
		let _ = writeln!(
			out,
			"Scanned {} files ({} locked, {} outside date window, {} unreadable entries)",
			self.scan.total_files, self.scan.locked, self.scan.filtered_out, self.scan.unreadable_entries
		);
		if self.collisions > 0 {
			let _ = writeln!(out, "Destination collisions: {}", self.collisions);
		}
		let _ = writeln!(out);
		let _ = writeln!(out, "Status counts:");
		for status in MigrationStatus::ALL {
			let _ = writeln!(out, "  {:<18} {}", status.as_str(), self.count(status));
		}
		let _ = writeln!(out);
		let _ = writeln!(out, "Planned uploads: {}", self.planned_uploads);
		if self.migrate {
			let _ = writeln!(out, "Attempted:       {}", self.attempted);
			let _ = writeln!(out, "Uploaded:        {}", self.uploaded);
			let _ = writeln!(out, "Failed:          {}", self.failed);
			let _ = writeln!(out, "Bytes uploaded:  {}", self.bytes_uploaded);
		}
		match self.stop_reason {
			Some(reason) => {
				let _ = writeln!(out, "Stopped early: {}", reason);
			}
			None => {
				let _ = writeln!(out, "Completed");
			}
		}
		if !self.outputs.is_empty() {
			let _ = writeln!(out);
			let _ = writeln!(out, "Outputs:");
			for path in &self.outputs {
				let _ = writeln!(out, "  {}", path.display());
			}
		}
		out
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_render_lists_every_status() {
		let mut summary = RunSummary::new("run-1", RunMode::Batch, true, Utc::now());
		summary.status_counts.insert(MigrationStatus::Missing, 3);
		summary.stop_reason = Some(StopReason::StopAfter);
		let text = summary.render();
		for status in MigrationStatus::ALL {
			assert!(text.contains(status.as_str()));
		}
		assert!(text.contains("Missing            3"));
		assert!(text.contains("Stopped early: stop-after limit reached"));
		assert_eq!(summary.classified(), 3);
	}

	#[test]
	fn test_summary_serializes_camel_case() {
		let summary = RunSummary::new("run-2", RunMode::Streaming, false, Utc::now());
		let json = serde_json::to_value(&summary).unwrap();
		assert_eq!(json["runId"], "run-2");
		assert_eq!(json["mode"], "streaming");
		assert!(json["stopReason"].is_null());
	}
}

// vim: ts=4
