/// End-to-end tests - real source trees, a directory-backed library, real reports
///
/// Each test builds a share under a temp dir, runs the driver against a
/// DirectoryStore standing in for the site, and checks both the remote tree
/// and the written outputs.
///
/// Tests verify:
/// 1. Dry runs write reports and touch nothing remote
/// 2. Uploads land at the mapped path and keep the source modification time
/// 3. A second run reclassifies everything as identical
/// 4. Newer remote files are never overwritten
/// 5. Locked files are reported, never dropped, never uploaded
/// 6. Date window filtering
use chrono::{DateTime, TimeZone, Utc};
use filetime::FileTime;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

use sharemig::config::{parse_date, RunOptions};
use sharemig::driver::{Driver, RunContext};
use sharemig::mapping::PathMapper;
use sharemig::remote::{DirectoryStore, RemoteLookup, RemoteStore};
use sharemig::report::{EventLog, FileReports, ManifestEntry, MemoryReports, ReportPaths, ReportSink};
use sharemig::scan::{DateFilter, Scanner};
use sharemig::strategies::RunMode;
use sharemig::{MigrationAction, MigrationStatus, RunSummary};

const ROOT: &str = "Clients (ETC - Wilco)";
const LIBRARY: &str = "Shared Documents";

fn at(secs: i64) -> DateTime<Utc> {
	Utc.timestamp_opt(secs, 0).unwrap()
}

/// Helper to create a file with content and modification time
fn create_file(root: &Path, rel: &str, content: &[u8], modified: DateTime<Utc>) {
	let path = root.join(rel);
	fs::create_dir_all(path.parent().unwrap()).unwrap();
	fs::write(&path, content).unwrap();
	filetime::set_file_mtime(&path, FileTime::from_unix_time(modified.timestamp(), 0)).unwrap();
}

struct Env {
	_tmp: TempDir,
	share: PathBuf,
	site: PathBuf,
	out: PathBuf,
	store: Arc<DirectoryStore>,
}

impl Env {
	fn new() -> Self {
		let tmp = TempDir::new().unwrap();
		let share = tmp.path().join("share").join(ROOT);
		let site = tmp.path().join("site");
		let out = tmp.path().join("out");
		fs::create_dir_all(&share).unwrap();
		fs::create_dir_all(site.join(LIBRARY)).unwrap();
		let store = Arc::new(DirectoryStore::new(&site, LIBRARY, "Documents"));
		Env { _tmp: tmp, share, site, out, store }
	}

	fn remote(&self, rel: &str) -> PathBuf {
		self.site.join(LIBRARY).join(rel)
	}

	fn scanner(&self, filter: Option<DateFilter>) -> Scanner {
		Scanner::new(&self.share, PathMapper::new(ROOT, None, None), filter).unwrap()
	}

	async fn run_with(&self, options: RunOptions, reports: Arc<dyn ReportSink>, events: Arc<EventLog>) -> RunSummary {
		let context = Arc::new(RunContext::new(options, events, reports));
		let lookup = RemoteLookup::with_defaults(self.store.clone(), vec![]);
		Driver::new(self.store.clone(), lookup, context).run(&mut self.scanner(None)).await.unwrap()
	}

	async fn run(&self, options: RunOptions) -> (RunSummary, Arc<MemoryReports>) {
		let reports = Arc::new(MemoryReports::new(LIBRARY));
		let summary = self.run_with(options, reports.clone(), Arc::new(EventLog::in_memory())).await;
		(summary, reports)
	}
}

fn migrate() -> RunOptions {
	RunOptions { migrate: true, ..RunOptions::default() }
}

#[tokio::test]
async fn test_compare_writes_reports_without_uploading() {
	let env = Env::new();
	create_file(&env.share, "sub/file.pdf", b"hello", at(1_600_000_000));
	create_file(&env.share, "other.docx", b"doc", at(1_600_000_000));

	let paths = ReportPaths::new(&env.out, Utc::now());
	let reports = Arc::new(FileReports::create(paths.clone(), LIBRARY, false).unwrap());
	let events = Arc::new(EventLog::open(&paths.events).unwrap());
	let summary = env.run_with(RunOptions::default(), reports, events).await;

	assert_eq!(summary.count(MigrationStatus::Missing), 2);
	assert!(!env.remote("Clients").exists());

	let csv_text = fs::read_to_string(&paths.comparison).unwrap();
	assert!(csv_text.starts_with("Status,Action,"));
	assert!(csv_text.contains("Missing,Migrate"));
	assert!(csv_text.contains("Clients\\sub\\file.pdf"));

	let manifest: Vec<ManifestEntry> = serde_json::from_str(&fs::read_to_string(&paths.manifest).unwrap()).unwrap();
	assert_eq!(manifest.len(), 2);
	assert!(manifest.iter().any(|e| e.destination_url == "Shared Documents/Clients/sub/file.pdf"));

	let log = fs::read_to_string(&paths.events).unwrap();
	let events: Vec<serde_json::Value> = log.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
	assert_eq!(events.first().unwrap()["event"], "runStart");
	assert_eq!(events.last().unwrap()["event"], "runSummary");
	assert!(events.iter().all(|e| e["runId"] == events[0]["runId"]));
	assert_eq!(events.iter().filter(|e| e["event"] == "planned").count(), 2);

	assert!(fs::read_to_string(&paths.summary).unwrap().contains("Missing            2"));
}

#[tokio::test]
async fn test_migrate_uploads_and_rerun_is_identical() {
	let env = Env::new();
	let stamp = at(1_650_000_000);
	create_file(&env.share, "2023/Q1/report.pdf", b"quarterly", stamp);
	create_file(&env.share, "notes.txt", b"n", stamp);

	let (summary, _) = env.run(migrate()).await;
	assert_eq!(summary.uploaded, 2);
	assert_eq!(fs::read(env.remote("Clients/2023/Q1/report.pdf")).unwrap(), b"quarterly");
	let meta = fs::metadata(env.remote("Clients/2023/Q1/report.pdf")).unwrap();
	assert_eq!(FileTime::from_last_modification_time(&meta).unix_seconds(), stamp.timestamp());

	let (summary, reports) = env.run(migrate()).await;
	assert_eq!(summary.count(MigrationStatus::Identical), 2);
	assert_eq!(summary.planned_uploads, 0);
	assert_eq!(summary.uploaded, 0);
	assert!(reports.rows().iter().all(|r| r.action == MigrationAction::Skip));
}

#[tokio::test]
async fn test_newer_remote_file_is_left_alone() {
	let env = Env::new();
	create_file(&env.share, "contract.pdf", b"old source", at(1_600_000_000));
	create_file(&env.remote("Clients"), "contract.pdf", b"edited online", at(1_700_000_000));

	let options = RunOptions { include_can_migrate: true, ..migrate() };
	let (summary, reports) = env.run(options).await;

	assert_eq!(summary.count(MigrationStatus::NewerInSharePoint), 1);
	assert_eq!(summary.attempted, 0);
	assert_eq!(fs::read(env.remote("Clients/contract.pdf")).unwrap(), b"edited online");
	assert!(reports.manifest().is_empty());
}

#[tokio::test]
async fn test_size_mismatch_goes_to_review() {
	let env = Env::new();
	create_file(&env.share, "D.pdf", b"12345", at(1_600_000_000));
	create_file(&env.remote("Clients"), "D.pdf", b"1234567", at(1_600_000_001));

	let (summary, reports) = env.run(migrate()).await;
	assert_eq!(summary.count(MigrationStatus::SizeMismatch), 1);
	assert_eq!(reports.rows()[0].action, MigrationAction::Review);
	assert_eq!(fs::read(env.remote("Clients/D.pdf")).unwrap(), b"1234567");
}

#[cfg(unix)]
#[tokio::test]
async fn test_locked_files_reported_not_dropped() {
	let env = Env::new();
	create_file(&env.share, "a.pdf", b"a", at(1_600_000_000));
	create_file(&env.share, "sub/b.pdf", b"b", at(1_600_000_000));
	// metadata of a dangling link cannot be read, like a file held open elsewhere
	std::os::unix::fs::symlink(env.share.join("gone.pdf"), env.share.join("sub/locked.pdf")).unwrap();
	std::os::unix::fs::symlink(env.share.join("gone2.pdf"), env.share.join("present.pdf")).unwrap();
	create_file(&env.remote("Clients"), "present.pdf", b"p", at(1_600_000_000));

	let descriptors: Vec<_> = env.scanner(None).collect();
	assert_eq!(descriptors.len(), 4);
	assert_eq!(descriptors.iter().filter(|d| d.is_locked()).count(), 2);

	let (summary, reports) = env.run(migrate()).await;
	assert_eq!(summary.count(MigrationStatus::Locked), 2);
	assert_eq!(summary.uploaded, 2);

	let locked = reports.rows_with_status(MigrationStatus::Locked);
	let action_of = |name: &str| {
		locked.iter().find(|r| r.destination_path.file_name() == Some(name)).map(|r| r.action).unwrap()
	};
	assert_eq!(action_of("locked.pdf"), MigrationAction::ReviewLocked);
	assert_eq!(action_of("present.pdf"), MigrationAction::Review);
	assert!(!env.remote("Clients/sub/locked.pdf").exists());
}

#[tokio::test]
async fn test_date_window_filters_files() {
	let env = Env::new();
	create_file(&env.share, "in-window.pdf", b"x", at(1_686_000_000)); // 2023-06
	create_file(&env.share, "too-new.pdf", b"y", at(1_262_304_000 + 20 * 365 * 86_400));

	let start = parse_date("2023-01-01", false).unwrap();
	let end = parse_date("2023-12-31", true).unwrap();
	let filter = DateFilter::new(Some(start), Some(end), Utc::now());

	let mut scanner = env.scanner(filter);
	let names: Vec<String> = scanner.by_ref().map(|d| d.source_relative_path).collect();
	assert_eq!(names, vec!["in-window.pdf".to_string()]);
	assert_eq!(scanner.stats().filtered_out, 1);
	assert_eq!(scanner.stats().total_files, 2);
}

#[tokio::test]
async fn test_streaming_concurrent_migration() {
	let env = Env::new();
	for i in 0..20 {
		create_file(&env.share, &format!("matter-{}/doc-{}.pdf", i % 4, i), format!("{}", i).as_bytes(), at(1_600_000_000));
	}
	let options = RunOptions { mode: RunMode::Streaming, concurrency: 6, ..migrate() };
	let (summary, _) = env.run(options).await;

	assert_eq!(summary.uploaded, 20);
	assert_eq!(summary.failed, 0);
	for i in 0..20 {
		let path = env.remote(&format!("Clients/matter-{}/doc-{}.pdf", i % 4, i));
		assert_eq!(fs::read_to_string(path).unwrap(), format!("{}", i));
	}
}

#[tokio::test]
async fn test_stop_after_then_resume() {
	let env = Env::new();
	for i in 0..6 {
		create_file(&env.share, &format!("f{}.pdf", i), b"x", at(1_600_000_000));
	}

	let (summary, _) = env.run(RunOptions { stop_after: 4, ..migrate() }).await;
	assert_eq!(summary.uploaded, 4);
	assert!(summary.stop_reason.is_some());

	let (summary, _) = env.run(migrate()).await;
	assert_eq!(summary.count(MigrationStatus::Identical), 4);
	assert_eq!(summary.uploaded, 2);
	assert!(summary.stop_reason.is_none());
}

#[tokio::test]
async fn test_missing_library_is_fatal() {
	let tmp = TempDir::new().unwrap();
	let store = DirectoryStore::new(tmp.path(), "No Such Library", "Documents");
	let err = sharemig::remote::verify_library(&store).await.unwrap_err();
	assert!(matches!(err, sharemig::MigrateError::RemoteUnavailable { .. }));
	assert_eq!(store.library_root(), "No Such Library");
}

#[tokio::test]
async fn test_missing_source_root_is_fatal() {
	let tmp = TempDir::new().unwrap();
	let result = Scanner::new(&tmp.path().join("absent"), PathMapper::new(ROOT, None, None), None);
	assert!(matches!(result, Err(sharemig::MigrateError::SourceUnavailable { .. })));
}
