//! Append-only JSONL audit log
//!
//! One JSON object per line: `ts`, `runId` and the `event` tag, followed by
//! the event's own fields. Lines are written whole, so a crash leaves at most
//! a truncated last line.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use uuid::Uuid;

use super::summary::RunSummary;
use crate::error::MigrateError;
use crate::logging::*;
use crate::scan::ScanStats;
use crate::types::{MigrationAction, MigrationStatus};

/// Audit events
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum LogEvent {
	#[serde(rename_all = "camelCase")]
	RunStart { mode: String, migrate: bool, source_root: String, library_root: String },

	#[serde(rename_all = "camelCase")]
	ScanComplete { stats: ScanStats },

	#[serde(rename_all = "camelCase")]
	Planned { source_path: String, destination_path: String, status: MigrationStatus, action: MigrationAction },

	#[serde(rename_all = "camelCase")]
	UploadStart { source_path: String, destination_path: String, overwrite: bool },

	#[serde(rename_all = "camelCase")]
	UploadSuccess { source_path: String, destination_url: String, bytes: u64 },

	#[serde(rename_all = "camelCase")]
	UploadFailed { source_path: String, destination_path: String, error: String },

	#[serde(rename_all = "camelCase")]
	StopAfterReached { limit: usize },

	#[serde(rename_all = "camelCase")]
	FailFast { source_path: String, error: String },

	#[serde(rename_all = "camelCase")]
	Cancelled { processed: usize },

	#[serde(rename_all = "camelCase")]
	RunSummary { summary: RunSummary },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Record<'a> {
	ts: DateTime<Utc>,
	run_id: &'a str,
	#[serde(flatten)]
	event: &'a LogEvent,
}

enum Sink {
	File(File),
	Memory(Vec<String>),
}

/// Event log for one run
pub struct EventLog {
	run_id: String,
	path: Option<PathBuf>,
	sink: Mutex<Sink>,
	write_failed: AtomicBool,
}

impl EventLog {
	/// Append to a JSONL file, creating it and its directory if needed
	pub fn open(path: &Path) -> Result<EventLog, MigrateError> {
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent)?;
		}
		let file = OpenOptions::new().create(true).append(true).open(path).map_err(|e| {
			MigrateError::Report { message: format!("cannot open event log {}: {}", path.display(), e) }
		})?;
		Ok(EventLog::with_sink(Sink::File(file), Some(path.to_path_buf())))
	}

	/// Keep lines in memory
	pub fn in_memory() -> EventLog {
		EventLog::with_sink(Sink::Memory(Vec::new()), None)
	}

	fn with_sink(sink: Sink, path: Option<PathBuf>) -> EventLog {
		EventLog {
			run_id: Uuid::new_v4().to_string(),
			path,
			sink: Mutex::new(sink),
			write_failed: AtomicBool::new(false),
		}
	}

	pub fn run_id(&self) -> &str {
		&self.run_id
	}

	pub fn path(&self) -> Option<&Path> {
		self.path.as_deref()
	}

	/// Append one event
	///
	/// A failing write is reported once and otherwise ignored; the audit log
	/// never stops a migration.
	pub fn log(&self, event: LogEvent) {
		let record = Record { ts: Utc::now(), run_id: &self.run_id, event: &event };
		let line = match serde_json::to_string(&record) {
			Ok(line) => line,
			Err(e) => {
				error!("Cannot serialize event log record: {}", e);
				return;
			}
		};

		let mut sink = self.sink.lock().unwrap_or_else(|e| e.into_inner());
		match &mut *sink {
			Sink::File(file) => {
				if let Err(e) = file.write_all(format!("{}\n", line).as_bytes()) {
					if !self.write_failed.swap(true, Ordering::SeqCst) {
						error!("Event log write failed, further failures are silent: {}", e);
					}
				}
			}
			Sink::Memory(lines) => lines.push(line),
		}
	}

	/// Lines logged so far (in-memory logs only)
	pub fn lines(&self) -> Vec<String> {
		match &*self.sink.lock().unwrap_or_else(|e| e.into_inner()) {
			Sink::Memory(lines) => lines.clone(),
			Sink::File(_) => Vec::new(),
		}
	}

	/// Parsed records (in-memory logs only)
	pub fn records(&self) -> Vec<serde_json::Value> {
		self.lines().iter().filter_map(|l| serde_json::from_str(l).ok()).collect()
	}

	pub fn flush(&self) -> Result<(), MigrateError> {
		if let Sink::File(file) = &mut *self.sink.lock().unwrap_or_else(|e| e.into_inner()) {
			file.flush()?;
			file.sync_data()?;
		}
		Ok(())
	}
}

impl std::fmt::Debug for EventLog {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("EventLog").field("run_id", &self.run_id).field("path", &self.path).finish()
	}
}


// vim: ts=4
