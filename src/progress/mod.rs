//! Progress display callback for the CLI
//!
//! Prints throttled single-line progress to stderr and asks for
//! confirmation on stdin before large upload batches.

pub mod constants;

use std::io::{BufRead, Write};
use std::sync::Mutex;
use std::time::Instant;
use tracing::info;

use crate::callbacks::{MigrationCallback, MigrationEvent, ProgressUpdate, RunPhase};
use crate::types::UploadOutcome;

/// Progress display constants
pub use constants::*;

/// Shared state for progress tracking
#[derive(Debug)]
pub struct ProgressState {
	pub current_phase: Mutex<Option<RunPhase>>,
	pub last_update: Mutex<Instant>,
}

impl ProgressState {
	pub fn new() -> Self {
		Self { current_phase: Mutex::new(None), last_update: Mutex::new(Instant::now()) }
	}

	/// True at most once per throttle window
	fn should_draw(&self) -> bool {
		let mut last = self.last_update.lock().unwrap_or_else(|e| e.into_inner());
		if last.elapsed().as_millis() < UPDATE_THROTTLE_MS {
			return false;
		}
		*last = Instant::now();
		true
	}
}

impl Default for ProgressState {
	fn default() -> Self {
		Self::new()
	}
}

/// CLI progress callback
pub struct CliProgressCallback {
	state: ProgressState,
	/// Answer confirmations without prompting
	assume_yes: bool,
}

impl CliProgressCallback {
	pub fn new(assume_yes: bool) -> Self {
		Self { state: ProgressState::new(), assume_yes }
	}
}

impl Default for CliProgressCallback {
	fn default() -> Self {
		Self::new(false)
	}
}

/// One progress line; a bar when the total is known
pub fn format_progress(update: &ProgressUpdate) -> String {
	let counts = format!(
		"{} uploaded, {} failed, {:.1} MB",
		update.uploaded,
		update.failed,
		update.bytes_uploaded as f64 / BYTES_PER_MB
	);
	match update.total {
		Some(total) if total > 0 => {
			let ratio = (update.processed as f64 / total as f64).clamp(0.0, 1.0);
			let filled = (ratio * PROGRESS_BAR_WIDTH as f64) as usize;
			format!(
				"[{}{}] {}/{} | {}",
				"=".repeat(filled),
				" ".repeat(PROGRESS_BAR_WIDTH - filled),
				update.processed,
				total,
				counts
			)
		}
		_ => format!("{} processed | {}", update.processed, counts),
	}
}

impl MigrationCallback for CliProgressCallback {
	fn on_event(&self, event: MigrationEvent) {
		match event {
			MigrationEvent::PhaseChanged { phase, is_starting } => {
				if is_starting {
					let previous = self
						.state
						.current_phase
						.lock()
						.unwrap_or_else(|e| e.into_inner())
						.replace(phase);
					if previous.is_some() {
						let _ = writeln!(std::io::stderr());
					}
					info!("→ {:?} phase...", phase);
				}
			}
			MigrationEvent::Scanned { files, bytes } => {
				if !self.state.should_draw() {
					return;
				}
				let _ = write!(
					std::io::stderr(),
					"\r  Scanning: {} files / {:.1} MB",
					files,
					bytes as f64 / BYTES_PER_MB
				);
				let _ = std::io::stderr().flush();
			}
			MigrationEvent::Progress(update) => {
				if !self.state.should_draw() {
					return;
				}
				let _ = write!(std::io::stderr(), "\r  {}", format_progress(&update));
				let _ = std::io::stderr().flush();
			}
			MigrationEvent::Uploaded { destination, outcome: UploadOutcome::Failed { error }, .. } => {
				let _ = writeln!(std::io::stderr(), "\r  FAILED {}: {}", destination, error);
			}
			_ => {}
		}
	}

	fn confirm(&self, planned: usize) -> bool {
		if self.assume_yes {
			return true;
		}
		let _ = write!(std::io::stderr(), "\nAbout to upload {} files. Proceed? [y/N] ", planned);
		let _ = std::io::stderr().flush();
		let mut line = String::new();
		if std::io::stdin().lock().read_line(&mut line).is_err() {
			return false;
		}
		matches!(line.trim().to_lowercase().as_str(), "y" | "yes")
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_format_progress_with_total() {
		let line = format_progress(&ProgressUpdate {
			processed: 5,
			total: Some(10),
			uploaded: 3,
			failed: 1,
			bytes_uploaded: 2_500_000,
		});
		assert!(line.starts_with(&format!("[{}{}]", "=".repeat(15), " ".repeat(15))));
		assert!(line.contains("5/10"));
		assert!(line.contains("3 uploaded, 1 failed, 2.5 MB"));
	}

	#[test]
	fn test_format_progress_streaming() {
		let line = format_progress(&ProgressUpdate { processed: 7, ..Default::default() });
		assert_eq!(line, "7 processed | 0 uploaded, 0 failed, 0.0 MB");
	}

	#[test]
	fn test_assume_yes_confirms() {
		assert!(CliProgressCallback::new(true).confirm(10_000));
	}
}

// vim: ts=4
