//! Run outputs
//!
//! Classified files flow into a [`ReportSink`] as they are produced; the sink
//! is finished once with the run summary. [`FileReports`] writes the
//! comparison CSV, the manifest JSON and the summary text into the output
//! directory. [`MemoryReports`] keeps everything for inspection in tests.
//!
//! The JSONL audit trail lives in [`event_log`] and is independent of sinks.

pub mod comparison;
pub mod event_log;
pub mod manifest;
pub mod summary;

use chrono::{DateTime, Utc};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub use comparison::{ComparisonRow, ComparisonWriter};
pub use event_log::{EventLog, LogEvent};
pub use manifest::ManifestEntry;
pub use summary::{RunSummary, StopReason};

use crate::error::MigrateError;
use crate::logging::*;
use crate::types::{ClassificationResult, MigrationStatus};

/// Receives classification results and the final summary
pub trait ReportSink: Send + Sync {
	/// One classified file
	fn record(&self, result: &ClassificationResult) -> Result<(), MigrateError>;

	/// Write everything out; adds output paths to the summary
	fn finish(&self, summary: &mut RunSummary) -> Result<(), MigrateError>;
}

/// Output file names for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportPaths {
	pub comparison: PathBuf,
	pub manifest: PathBuf,
	pub summary: PathBuf,
	pub events: PathBuf,
}

impl ReportPaths {
	/// Timestamped names under `dir`
	pub fn new(dir: &Path, started_at: DateTime<Utc>) -> Self {
		let stamp = started_at.format("%Y%m%d-%H%M%S");
		ReportPaths {
			comparison: dir.join(format!("comparison-{}.csv", stamp)),
			manifest: dir.join(format!("manifest-{}.json", stamp)),
			summary: dir.join(format!("summary-{}.txt", stamp)),
			events: dir.join(format!("events-{}.jsonl", stamp)),
		}
	}
}

/// Hidden staging name next to the final file
fn staging_path(path: &Path) -> PathBuf {
	let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
	path.with_file_name(format!(".{}.tmp", name))
}

/// Write a file through a staging name and rename it into place
fn write_promoted(path: &Path, contents: &[u8]) -> Result<(), MigrateError> {
	let staging = staging_path(path);
	fs::write(&staging, contents)?;
	fs::rename(&staging, path)?;
	Ok(())
}

struct FileReportsState {
	comparison: Option<ComparisonWriter<BufWriter<File>>>,
	manifest: Vec<ManifestEntry>,
}

/// Reports written to the output directory
pub struct FileReports {
	paths: ReportPaths,
	library_root: String,
	report_identical: bool,
	state: Mutex<FileReportsState>,
}

impl FileReports {
	/// Create the output directory and start the comparison report
	pub fn create(
		paths: ReportPaths,
		library_root: &str,
		report_identical: bool,
	) -> Result<FileReports, MigrateError> {
		if let Some(dir) = paths.comparison.parent() {
			fs::create_dir_all(dir).map_err(|e| MigrateError::Report {
				message: format!("cannot create output directory {}: {}", dir.display(), e),
			})?;
		}
		let staging = staging_path(&paths.comparison);
		let file = File::create(&staging).map_err(|e| MigrateError::Report {
			message: format!("cannot create {}: {}", staging.display(), e),
		})?;
		let comparison = ComparisonWriter::new(BufWriter::new(file))?;
		debug!("Writing comparison report to {}", paths.comparison.display());

		Ok(FileReports {
			paths,
			library_root: library_root.to_string(),
			report_identical,
			state: Mutex::new(FileReportsState {
				comparison: Some(comparison),
				manifest: Vec::new(),
			}),
		})
	}

	pub fn paths(&self) -> &ReportPaths {
		&self.paths
	}
}

impl ReportSink for FileReports {
	fn record(&self, result: &ClassificationResult) -> Result<(), MigrateError> {
		let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
		if result.is_actionable() || self.report_identical {
			if let Some(writer) = state.comparison.as_mut() {
				writer.write(result)?;
			}
		}
		if let Some(entry) = ManifestEntry::from_result(result, &self.library_root) {
			state.manifest.push(entry);
		}
		Ok(())
	}

	fn finish(&self, summary: &mut RunSummary) -> Result<(), MigrateError> {
		let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());

		if let Some(mut writer) = state.comparison.take() {
			writer.flush()?;
			let rows = writer.rows();
			drop(writer.into_inner()?);
			fs::rename(staging_path(&self.paths.comparison), &self.paths.comparison)?;
			info!("Comparison report: {} rows -> {}", rows, self.paths.comparison.display());
		}

		let manifest = serde_json::to_vec_pretty(&state.manifest)?;
		write_promoted(&self.paths.manifest, &manifest)?;
		info!("Manifest: {} entries -> {}", state.manifest.len(), self.paths.manifest.display());

		summary.outputs.push(self.paths.comparison.clone());
		summary.outputs.push(self.paths.manifest.clone());
		summary.outputs.push(self.paths.summary.clone());
		write_promoted(&self.paths.summary, summary.render().as_bytes())?;
		Ok(())
	}
}

#[derive(Default)]
struct MemoryReportsState {
	rows: Vec<ClassificationResult>,
	manifest: Vec<ManifestEntry>,
	summary: Option<RunSummary>,
}

/// Reports kept in memory
pub struct MemoryReports {
	library_root: String,
	state: Mutex<MemoryReportsState>,
}

impl MemoryReports {
	pub fn new(library_root: &str) -> Self {
		MemoryReports { library_root: library_root.to_string(), state: Mutex::new(MemoryReportsState::default()) }
	}

	/// Every recorded result, identical ones included
	pub fn rows(&self) -> Vec<ClassificationResult> {
		self.state.lock().unwrap_or_else(|e| e.into_inner()).rows.clone()
	}

	pub fn rows_with_status(&self, status: MigrationStatus) -> Vec<ClassificationResult> {
		self.rows().into_iter().filter(|r| r.status == status).collect()
	}

	pub fn manifest(&self) -> Vec<ManifestEntry> {
		self.state.lock().unwrap_or_else(|e| e.into_inner()).manifest.clone()
	}

	pub fn summary(&self) -> Option<RunSummary> {
		self.state.lock().unwrap_or_else(|e| e.into_inner()).summary.clone()
	}
}

impl ReportSink for MemoryReports {
	fn record(&self, result: &ClassificationResult) -> Result<(), MigrateError> {
		let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
		if let Some(entry) = ManifestEntry::from_result(result, &self.library_root) {
			state.manifest.push(entry);
		}
		state.rows.push(result.clone());
		Ok(())
	}

	fn finish(&self, summary: &mut RunSummary) -> Result<(), MigrateError> {
		self.state.lock().unwrap_or_else(|e| e.into_inner()).summary = Some(summary.clone());
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::strategies::RunMode;
	use crate::types::{DestinationPath, MigrationAction};

	fn row(name: &str, status: MigrationStatus, action: MigrationAction) -> ClassificationResult {
		ClassificationResult {
			status,
			action,
			source_path: PathBuf::from(format!("/share/{}", name)),
			destination_path: DestinationPath::parse(&format!("Clients/{}", name)),
			source_size: Some(1),
			source_modified: None,
			remote_size: None,
			remote_modified: None,
			resolved_url: None,
		}
	}

	#[test]
	fn test_file_reports_written_and_identical_omitted() {
		let dir = tempfile::tempdir().unwrap();
		let started = Utc::now();
		let paths = ReportPaths::new(&dir.path().join("out"), started);
		let reports = FileReports::create(paths.clone(), "Shared Documents", false).unwrap();

		reports.record(&row("a.pdf", MigrationStatus::Missing, MigrationAction::Migrate)).unwrap();
		reports.record(&row("b.pdf", MigrationStatus::Identical, MigrationAction::Skip)).unwrap();
		reports.record(&row("c.pdf", MigrationStatus::Locked, MigrationAction::ReviewLocked)).unwrap();

		let mut summary = RunSummary::new("r", RunMode::Batch, false, started);
		reports.finish(&mut summary).unwrap();

		let csv_text = fs::read_to_string(&paths.comparison).unwrap();
		assert_eq!(csv_text.lines().count(), 3);
		assert!(!csv_text.contains("b.pdf"));
		assert!(!staging_path(&paths.comparison).exists());

		let manifest: Vec<ManifestEntry> =
			serde_json::from_str(&fs::read_to_string(&paths.manifest).unwrap()).unwrap();
		assert_eq!(manifest.len(), 1);
		assert_eq!(manifest[0].destination_url, "Shared Documents/Clients/a.pdf");

		assert!(fs::read_to_string(&paths.summary).unwrap().contains("sharemig run r"));
		assert_eq!(summary.outputs.len(), 3);
	}

	#[test]
	fn test_report_identical_option() {
		let dir = tempfile::tempdir().unwrap();
		let paths = ReportPaths::new(dir.path(), Utc::now());
		let reports = FileReports::create(paths.clone(), "lib", true).unwrap();
		reports.record(&row("b.pdf", MigrationStatus::Identical, MigrationAction::Skip)).unwrap();
		let mut summary = RunSummary::new("r", RunMode::Batch, false, Utc::now());
		reports.finish(&mut summary).unwrap();
		assert!(fs::read_to_string(&paths.comparison).unwrap().contains("Identical,Skip"));
	}

	#[test]
	fn test_empty_run_keeps_csv_header() {
		let dir = tempfile::tempdir().unwrap();
		let paths = ReportPaths::new(dir.path(), Utc::now());
		let reports = FileReports::create(paths.clone(), "lib", false).unwrap();
		reports.record(&row("same.pdf", MigrationStatus::Identical, MigrationAction::Skip)).unwrap();
		let mut summary = RunSummary::new("r", RunMode::Batch, false, Utc::now());
		reports.finish(&mut summary).unwrap();

		let csv_text = fs::read_to_string(&paths.comparison).unwrap();
		assert_eq!(csv_text.lines().collect::<Vec<_>>(), vec![comparison::HEADERS.join(",")]);
	}
}

// vim: ts=4
