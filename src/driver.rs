//! Migration driver
//!
//! Pulls descriptors from the [`Scanner`], resolves each destination,
//! classifies it and, when migrating, uploads Migrate and CanMigrate rows.
//! Two orderings share the same per-file steps:
//!
//! - batch: scan everything (resolving destination collisions), classify
//!   everything, preview, confirm large batches, then upload;
//! - streaming: classify and upload each file as the scanner yields it.
//!
//! All shared run state lives in [`RunContext`]: counters, the event log,
//! the report sink and the stop flags. With `concurrency > 1` independent
//! files are processed in parallel; each file still goes lookup, classify,
//! folders, upload in order.

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::callbacks::{MigrationCallback, MigrationEvent, NoCallbacks, ProgressUpdate, RunPhase};
use crate::classify::{classify, ClassifyPolicy};
use crate::config::RunOptions;
use crate::error::{MigrateError, RemoteError};
use crate::logging::*;
use crate::remote::{join_url, RemoteLookup, RemoteStore};
use crate::report::{EventLog, LogEvent, ReportSink, RunSummary, StopReason};
use crate::scan::Scanner;
use crate::strategies::{CollisionPolicy, RunMode};
use crate::types::{ClassificationResult, DestinationPath, FileDescriptor, MigrationAction, MigrationStatus, UploadOutcome};
use crate::validation::path::validate_destination;

/// Shared state of one run
pub struct RunContext {
	options: RunOptions,
	events: Arc<EventLog>,
	reports: Arc<dyn ReportSink>,
	callback: Arc<dyn MigrationCallback>,
	cancel: Arc<AtomicBool>,
	stop_reason: Mutex<Option<StopReason>>,
	attempts: AtomicUsize,
	/// Last stop-after slot taken
	budget_spent: AtomicBool,
	processed: AtomicUsize,
	planned: AtomicUsize,
	previewed: AtomicUsize,
	uploaded: AtomicUsize,
	failed: AtomicUsize,
	bytes_uploaded: AtomicU64,
	collisions: AtomicUsize,
	status_counts: Mutex<BTreeMap<MigrationStatus, usize>>,
}

impl RunContext {
	pub fn new(options: RunOptions, events: Arc<EventLog>, reports: Arc<dyn ReportSink>) -> Self {
		RunContext {
			options,
			events,
			reports,
			callback: Arc::new(NoCallbacks),
			cancel: Arc::new(AtomicBool::new(false)),
			stop_reason: Mutex::new(None),
			attempts: AtomicUsize::new(0),
			budget_spent: AtomicBool::new(false),
			processed: AtomicUsize::new(0),
			planned: AtomicUsize::new(0),
			previewed: AtomicUsize::new(0),
			uploaded: AtomicUsize::new(0),
			failed: AtomicUsize::new(0),
			bytes_uploaded: AtomicU64::new(0),
			collisions: AtomicUsize::new(0),
			status_counts: Mutex::new(BTreeMap::new()),
		}
	}

	pub fn with_callback(mut self, callback: Arc<dyn MigrationCallback>) -> Self {
		self.callback = callback;
		self
	}

	/// Use an externally owned cancel flag (e.g. set by a signal handler)
	pub fn with_cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
		self.cancel = cancel;
		self
	}

	pub fn options(&self) -> &RunOptions {
		&self.options
	}

	pub fn events(&self) -> &EventLog {
		&self.events
	}

	pub fn cancel_flag(&self) -> Arc<AtomicBool> {
		self.cancel.clone()
	}

	pub fn cancel(&self) {
		self.cancel.store(true, Ordering::SeqCst);
	}

	pub fn stop_reason(&self) -> Option<StopReason> {
		*self.stop_reason.lock().unwrap_or_else(|e| e.into_inner())
	}

	/// Record why the run stops; only the first reason is kept
	fn stop_with(&self, reason: StopReason) -> bool {
		let mut current = self.stop_reason.lock().unwrap_or_else(|e| e.into_inner());
		if current.is_some() {
			return false;
		}
		*current = Some(reason);
		true
	}

	/// Whether new work may start
	///
	/// Only called with work pending, so a spent budget is reported as
	/// StopAfter here rather than when the last slot is taken.
	pub fn should_stop(&self) -> bool {
		if self.cancel.load(Ordering::SeqCst) && self.stop_with(StopReason::Cancelled) {
			let processed = self.processed.load(Ordering::SeqCst);
			warn!("Cancelled after {} files; waiting for in-flight uploads", processed);
			self.events.log(LogEvent::Cancelled { processed });
		}
		if self.budget_spent.load(Ordering::SeqCst) {
			self.stop_after_reached();
		}
		self.stop_reason().is_some()
	}

	/// Reserve one upload attempt against the stop-after budget
	///
	/// Taking the last slot stops the run before the next file starts.
	fn reserve_attempt(&self) -> bool {
		let limit = self.options.stop_after;
		if limit == 0 {
			self.attempts.fetch_add(1, Ordering::SeqCst);
			return true;
		}
		let reserved = self
			.attempts
			.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| if n < limit { Some(n + 1) } else { None });
		match reserved {
			Ok(n) => {
				if n + 1 == limit {
					self.budget_spent.store(true, Ordering::SeqCst);
				}
				true
			}
			Err(_) => {
				self.stop_after_reached();
				false
			}
		}
	}

	fn stop_after_reached(&self) {
		if self.stop_with(StopReason::StopAfter) {
			let limit = self.options.stop_after;
			info!("Reached stop-after limit of {} upload attempts", limit);
			self.events.log(LogEvent::StopAfterReached { limit });
		}
	}

	fn emit(&self, event: MigrationEvent) {
		self.callback.on_event(event);
	}

	fn phase(&self, phase: RunPhase, is_starting: bool) {
		self.emit(MigrationEvent::PhaseChanged { phase, is_starting });
	}

	/// Progress of classification; `total` is known in batch mode
	fn progress(&self, total: Option<usize>) {
		self.emit_progress(self.processed.load(Ordering::SeqCst), total);
	}

	/// Progress of the batch upload phase: finished uploads out of `total`
	fn upload_progress(&self, total: usize) {
		let done = self.uploaded.load(Ordering::SeqCst) + self.failed.load(Ordering::SeqCst);
		self.emit_progress(done, Some(total));
	}

	fn emit_progress(&self, processed: usize, total: Option<usize>) {
		self.emit(MigrationEvent::Progress(ProgressUpdate {
			processed,
			total,
			uploaded: self.uploaded.load(Ordering::SeqCst),
			failed: self.failed.load(Ordering::SeqCst),
			bytes_uploaded: self.bytes_uploaded.load(Ordering::SeqCst),
		}));
	}

	/// Count, report and announce one classification
	fn record(&self, result: &ClassificationResult) -> Result<(), MigrateError> {
		*self.status_counts.lock().unwrap_or_else(|e| e.into_inner()).entry(result.status).or_insert(0) += 1;
		self.processed.fetch_add(1, Ordering::SeqCst);
		if result.action.is_upload() {
			self.planned.fetch_add(1, Ordering::SeqCst);
			self.preview(result);
		}
		self.reports.record(result)?;
		self.emit(MigrationEvent::Classified {
			destination: result.destination_path.clone(),
			status: result.status,
			action: result.action,
		});
		Ok(())
	}

	/// Log the first `preview_count` planned uploads
	fn preview(&self, result: &ClassificationResult) {
		let n = self.previewed.fetch_add(1, Ordering::SeqCst);
		if n >= self.options.preview_count {
			return;
		}
		info!(
			"Planned {} {} -> {} ({})",
			result.action,
			result.source_path.display(),
			result.destination_path,
			result.status
		);
		self.events.log(LogEvent::Planned {
			source_path: result.source_path.display().to_string(),
			destination_path: result.destination_path.as_display(),
			status: result.status,
			action: result.action,
		});
	}

	fn summary(&self, started_at: DateTime<Utc>, scanner: &Scanner) -> RunSummary {
		let mut summary = RunSummary::new(self.events.run_id(), self.options.mode, self.options.migrate, started_at);
		summary.finished_at = Utc::now();
		summary.scan = scanner.stats().clone();
		summary.status_counts = self.status_counts.lock().unwrap_or_else(|e| e.into_inner()).clone();
		summary.planned_uploads = self.planned.load(Ordering::SeqCst);
		summary.attempted = self.attempts.load(Ordering::SeqCst);
		summary.uploaded = self.uploaded.load(Ordering::SeqCst);
		summary.failed = self.failed.load(Ordering::SeqCst);
		summary.bytes_uploaded = self.bytes_uploaded.load(Ordering::SeqCst);
		summary.collisions = self.collisions.load(Ordering::SeqCst);
		summary.stop_reason = self.stop_reason();
		summary
	}
}

/// Runs the reconcile/migrate pipeline against one store
pub struct Driver {
	store: Arc<dyn RemoteStore>,
	lookup: RemoteLookup,
	context: Arc<RunContext>,
	policy: ClassifyPolicy,
	/// Lowercased URLs of folders known to exist
	known_folders: Mutex<HashSet<String>>,
}

impl Driver {
	pub fn new(store: Arc<dyn RemoteStore>, lookup: RemoteLookup, context: Arc<RunContext>) -> Self {
		let options = context.options();
		let policy = ClassifyPolicy {
			tolerance_secs: options.tolerance_secs,
			include_can_migrate: options.include_can_migrate,
		};
		let mut known = HashSet::new();
		known.insert(store.library_root().to_lowercase());
		Driver { store, lookup, context, policy, known_folders: Mutex::new(known) }
	}

	pub fn context(&self) -> &RunContext {
		&self.context
	}

	fn concurrency(&self) -> usize {
		self.context.options.concurrency.max(1)
	}

	/// Run in the configured mode
	pub async fn run(&self, scanner: &mut Scanner) -> Result<RunSummary, MigrateError> {
		match self.context.options.mode {
			RunMode::Batch => self.run_batch(scanner).await,
			RunMode::Streaming => self.run_streaming(scanner).await,
		}
	}

	/// Scan all, classify all, then upload
	pub async fn run_batch(&self, scanner: &mut Scanner) -> Result<RunSummary, MigrateError> {
		let started_at = self.start(scanner);
		let outcome = self.batch(scanner).await;
		self.finish(started_at, scanner, outcome)
	}

	/// Classify and upload each file as it is found
	pub async fn run_streaming(&self, scanner: &mut Scanner) -> Result<RunSummary, MigrateError> {
		let started_at = self.start(scanner);
		let outcome = self.streaming(scanner).await;
		self.finish(started_at, scanner, outcome)
	}

	fn start(&self, scanner: &Scanner) -> DateTime<Utc> {
		let options = &self.context.options;
		info!(
			"Starting {} run ({}) of {} into {}",
			options.mode,
			if options.migrate { "migrate" } else { "dry run" },
			scanner.root().display(),
			self.store.library_root()
		);
		self.context.events.log(LogEvent::RunStart {
			mode: options.mode.to_string(),
			migrate: options.migrate,
			source_root: scanner.root().display().to_string(),
			library_root: self.store.library_root().to_string(),
		});
		Utc::now()
	}

	fn finish(
		&self,
		started_at: DateTime<Utc>,
		scanner: &Scanner,
		outcome: Result<(), MigrateError>,
	) -> Result<RunSummary, MigrateError> {
		let ctx = &self.context;
		ctx.phase(RunPhase::Reporting, true);
		let mut summary = ctx.summary(started_at, scanner);
		let reported = ctx.reports.finish(&mut summary);
		if let Some(path) = ctx.events.path() {
			summary.outputs.push(path.to_path_buf());
		}
		ctx.events.log(LogEvent::RunSummary { summary: summary.clone() });
		if let Err(e) = ctx.events.flush() {
			warn!("Cannot flush event log: {}", e);
		}
		ctx.phase(RunPhase::Reporting, false);

		outcome?;
		reported?;
		info!(
			"Run finished: {} classified, {} planned, {} uploaded, {} failed",
			summary.classified(),
			summary.planned_uploads,
			summary.uploaded,
			summary.failed
		);
		Ok(summary)
	}

	async fn batch(&self, scanner: &mut Scanner) -> Result<(), MigrateError> {
		let ctx = &self.context;

		ctx.phase(RunPhase::Scanning, true);
		let descriptors = self.collect(scanner)?;
		ctx.events.log(LogEvent::ScanComplete { stats: scanner.stats().clone() });
		ctx.phase(RunPhase::Scanning, false);
		info!("Scanned {} files, {} to classify", scanner.stats().total_files, descriptors.len());

		ctx.phase(RunPhase::Classifying, true);
		let total = descriptors.len();
		let classified: Vec<(FileDescriptor, ClassificationResult)> =
			stream::iter(descriptors.into_values().take_while(|_| !ctx.should_stop()))
				.map(|d| async move {
					let result = self.classify_one(&d).await;
					(d, result)
				})
				.buffered(self.concurrency())
				.collect()
				.await;
		for (_, result) in &classified {
			ctx.record(result)?;
			ctx.progress(Some(total));
		}
		ctx.phase(RunPhase::Classifying, false);

		let uploads: Vec<(FileDescriptor, MigrationAction)> = classified
			.into_iter()
			.filter(|(_, r)| r.action.is_upload())
			.map(|(d, r)| (d, r.action))
			.collect();

		if !ctx.options.migrate || uploads.is_empty() || ctx.should_stop() {
			return Ok(());
		}

		let threshold = ctx.options.confirm_threshold;
		if threshold > 0 && uploads.len() > threshold && !ctx.options.assume_yes {
			if !ctx.callback.confirm(uploads.len()) {
				warn!("Upload of {} files declined", uploads.len());
				return Err(MigrateError::Aborted);
			}
		}

		ctx.phase(RunPhase::Uploading, true);
		let total = uploads.len();
		let results = stream::iter(uploads.into_iter().take_while(|_| !ctx.should_stop()))
			.map(|(d, action)| async move {
				let result = self.process_upload(&d, action).await;
				ctx.upload_progress(total);
				result
			})
			.buffer_unordered(self.concurrency());
		let outcome = drain(results).await;
		ctx.phase(RunPhase::Uploading, false);
		outcome
	}

	/// Materialize the scan, one descriptor per destination key
	fn collect(&self, scanner: &mut Scanner) -> Result<BTreeMap<String, FileDescriptor>, MigrateError> {
		let ctx = &self.context;
		let mut by_key: BTreeMap<String, FileDescriptor> = BTreeMap::new();

		while !ctx.should_stop() {
			let descriptor = match scanner.next() {
				Some(d) => d,
				None => break,
			};
			ctx.emit(MigrationEvent::Scanned {
				files: scanner.stats().total_files,
				bytes: scanner.stats().total_bytes,
			});

			match by_key.entry(descriptor.normalized_key.clone()) {
				Entry::Vacant(slot) => {
					slot.insert(descriptor);
				}
				Entry::Occupied(mut slot) => {
					ctx.collisions.fetch_add(1, Ordering::SeqCst);
					let first = slot.get().source_absolute_path.display().to_string();
					let second = descriptor.source_absolute_path.display().to_string();
					match ctx.options.collision_policy {
						CollisionPolicy::KeepLast => {
							warn!("{} and {} map to {}; keeping {}", first, second, slot.key(), second);
							slot.insert(descriptor);
						}
						CollisionPolicy::WarnSkip => {
							warn!("{} and {} map to {}; keeping {}", first, second, slot.key(), first);
						}
						CollisionPolicy::Error => {
							ctx.stop_with(StopReason::Collision);
							return Err(MigrateError::Collision { key: slot.key().clone(), first, second });
						}
					}
				}
			}
		}
		Ok(by_key)
	}

	async fn streaming(&self, scanner: &mut Scanner) -> Result<(), MigrateError> {
		let ctx = &self.context;
		let seen: Mutex<HashMap<String, String>> = Mutex::new(HashMap::new());

		ctx.phase(RunPhase::Classifying, true);
		let outcome = {
			let seen = &seen;
			let results = stream::iter(scanner.by_ref().take_while(|_| !ctx.should_stop()))
				.map(|d| async move {
					let result = self.process_streaming(d, seen).await;
					ctx.progress(None);
					result
				})
				.buffer_unordered(self.concurrency());
			drain(results).await
		};
		ctx.events.log(LogEvent::ScanComplete { stats: scanner.stats().clone() });
		ctx.phase(RunPhase::Classifying, false);
		outcome
	}

	/// One file end to end in streaming mode
	///
	/// A later file colliding with one already processed cannot replace it,
	/// so keep-last behaves like warn-skip here.
	async fn process_streaming(
		&self,
		descriptor: FileDescriptor,
		seen: &Mutex<HashMap<String, String>>,
	) -> Result<(), MigrateError> {
		let ctx = &self.context;
		let second = descriptor.source_absolute_path.display().to_string();
		let first = {
			let mut seen = seen.lock().unwrap_or_else(|e| e.into_inner());
			match seen.get(&descriptor.normalized_key) {
				Some(first) => Some(first.clone()),
				None => {
					seen.insert(descriptor.normalized_key.clone(), second.clone());
					None
				}
			}
		};
		if let Some(first) = first {
			ctx.collisions.fetch_add(1, Ordering::SeqCst);
			if ctx.options.collision_policy == CollisionPolicy::Error {
				ctx.stop_with(StopReason::Collision);
				return Err(MigrateError::Collision { key: descriptor.normalized_key, first, second });
			}
			warn!("{} and {} map to {}; keeping {}", first, second, descriptor.normalized_key, first);
			return Ok(());
		}

		let result = self.classify_one(&descriptor).await;
		ctx.record(&result)?;
		if ctx.options.migrate && result.action.is_upload() {
			self.process_upload(&descriptor, result.action).await?;
		}
		Ok(())
	}

	async fn classify_one(&self, descriptor: &FileDescriptor) -> ClassificationResult {
		let outcome = self.lookup.resolve(&descriptor.destination_path).await;
		let result = classify(descriptor, outcome.found(), &self.policy);
		trace!("{} -> {} / {}", descriptor.destination_path, result.status, result.action);
		result
	}

	/// Upload one classified file, honouring the attempt budget and fail-fast
	async fn process_upload(&self, descriptor: &FileDescriptor, action: MigrationAction) -> Result<(), MigrateError> {
		let ctx = &self.context;
		if !ctx.reserve_attempt() {
			return Ok(());
		}

		let source_path = descriptor.source_absolute_path.display().to_string();
		ctx.events.log(LogEvent::UploadStart {
			source_path: source_path.clone(),
			destination_path: descriptor.destination_path.as_display(),
			overwrite: action.overwrite(),
		});

		let outcome = self.upload(descriptor, action.overwrite()).await;
		let result = match &outcome {
			UploadOutcome::Success => {
				let bytes = descriptor.size.unwrap_or(0);
				ctx.uploaded.fetch_add(1, Ordering::SeqCst);
				ctx.bytes_uploaded.fetch_add(bytes, Ordering::SeqCst);
				debug!("Uploaded {} -> {}", source_path, descriptor.destination_path);
				ctx.events.log(LogEvent::UploadSuccess {
					source_path: source_path.clone(),
					destination_url: join_url(&[self.store.library_root(), &descriptor.destination_path.as_url_path()]),
					bytes,
				});
				Ok(())
			}
			UploadOutcome::Failed { error } | UploadOutcome::Skipped { reason: error } => {
				ctx.failed.fetch_add(1, Ordering::SeqCst);
				warn!("Upload failed for {}: {}", source_path, error);
				ctx.events.log(LogEvent::UploadFailed {
					source_path: source_path.clone(),
					destination_path: descriptor.destination_path.as_display(),
					error: error.clone(),
				});
				if ctx.options.fail_fast {
					ctx.stop_with(StopReason::FailFast);
					ctx.events.log(LogEvent::FailFast { source_path: source_path.clone(), error: error.clone() });
					Err(MigrateError::FailFast { path: source_path.clone(), error: error.clone() })
				} else {
					Ok(())
				}
			}
		};

		ctx.emit(MigrationEvent::Uploaded {
			source: descriptor.source_absolute_path.clone(),
			destination: descriptor.destination_path.clone(),
			outcome,
		});
		result
	}

	/// Upload a file, creating its destination folders first
	///
	/// With `overwrite` unset an existing remote file is left untouched and
	/// the attempt is reported as failed.
	pub async fn upload(&self, descriptor: &FileDescriptor, overwrite: bool) -> UploadOutcome {
		if descriptor.is_locked() {
			return UploadOutcome::Skipped { reason: "source file is locked".to_string() };
		}
		if let Err(e) = validate_destination(&descriptor.destination_path) {
			return UploadOutcome::Failed { error: e.to_string() };
		}
		let name = match descriptor.destination_path.file_name() {
			Some(name) => name,
			None => return UploadOutcome::Failed { error: "destination has no file name".to_string() },
		};

		let folder = match self.ensure_folders(&descriptor.destination_path.parent()).await {
			Ok(folder) => folder,
			Err(e) => return UploadOutcome::Failed { error: format!("cannot create folder: {}", e) },
		};

		match self
			.store
			.upload_file(&folder, name, &descriptor.source_absolute_path, descriptor.modified_at, overwrite)
			.await
		{
			Ok(_) => UploadOutcome::Success,
			Err(e) => UploadOutcome::Failed { error: e.to_string() },
		}
	}

	/// Create every missing folder of `path` under the library root
	///
	/// Returns the URL of the deepest folder.
	async fn ensure_folders(&self, path: &DestinationPath) -> Result<String, RemoteError> {
		let mut current = self.store.library_root().to_string();
		for segment in path.segments() {
			let next = join_url(&[&current, segment]);
			let key = next.to_lowercase();
			let known = self.known_folders.lock().unwrap_or_else(|e| e.into_inner()).contains(&key);
			if !known {
				if !self.store.folder_exists(&next).await? {
					match self.store.create_folder(&current, segment).await {
						Ok(()) => debug!("Created folder {}", next),
						Err(e) if e.is_already_exists() => trace!("Folder {} created concurrently", next),
						Err(e) => return Err(e),
					}
				}
				self.known_folders.lock().unwrap_or_else(|e| e.into_inner()).insert(key);
			}
			current = next;
		}
		Ok(current)
	}
}

/// Poll every in-flight future to completion; first error wins
async fn drain<S>(results: S) -> Result<(), MigrateError>
where
	S: futures::Stream<Item = Result<(), MigrateError>>,
{
	let mut results = std::pin::pin!(results);
	let mut first = None;
	while let Some(result) = results.next().await {
		if let Err(e) = result {
			first.get_or_insert(e);
		}
	}
	match first {
		Some(e) => Err(e),
		None => Ok(()),
	}
}


// vim: ts=4
