//! Callback traits for progress reporting and confirmation

use std::path::PathBuf;

use crate::types::{DestinationPath, MigrationAction, MigrationStatus, UploadOutcome};

/// Stage of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
	Scanning,
	Classifying,
	Uploading,
	Reporting,
}

/// Counters sent with progress updates
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressUpdate {
	/// Files done in the current phase: classified, or finished uploading
	pub processed: usize,
	/// Total for the current phase, when known (batch mode)
	pub total: Option<usize>,
	pub uploaded: usize,
	pub failed: usize,
	pub bytes_uploaded: u64,
}

/// Events emitted while a run progresses
#[derive(Debug, Clone)]
pub enum MigrationEvent {
	/// Phase lifecycle: phase and is_starting (true) or completing (false)
	PhaseChanged { phase: RunPhase, is_starting: bool },

	/// Scanner statistics while enumerating
	Scanned { files: usize, bytes: u64 },

	/// One file classified
	Classified { destination: DestinationPath, status: MigrationStatus, action: MigrationAction },

	/// Upload attempt finished
	Uploaded { source: PathBuf, destination: DestinationPath, outcome: UploadOutcome },

	/// Progress counters
	Progress(ProgressUpdate),
}

/// Receiver for run events
///
/// Closures taking a [`MigrationEvent`] implement this trait; they never
/// confirm large batches.
pub trait MigrationCallback: Send + Sync {
	/// Called for every run event
	fn on_event(&self, _event: MigrationEvent) {}

	/// Asked before a batch of `planned` uploads above the confirmation
	/// threshold starts. Return false to abort the run.
	fn confirm(&self, _planned: usize) -> bool {
		false
	}
}

impl<T: Fn(MigrationEvent) + Send + Sync> MigrationCallback for T {
	fn on_event(&self, event: MigrationEvent) {
		self(event);
	}
}

/// Callback that ignores events and declines confirmations
pub struct NoCallbacks;

impl MigrationCallback for NoCallbacks {}


// vim: ts=4
