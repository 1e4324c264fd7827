use chrono::Utc;
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use sharemig::config::Config;
use sharemig::driver::{Driver, RunContext};
use sharemig::error::MigrateError;
use sharemig::logging::{self, *};
use sharemig::progress::CliProgressCallback;
use sharemig::remote::{open_store, verify_library, RemoteLookup};
use sharemig::report::{EventLog, FileReports, ReportPaths};
use sharemig::scan::Scanner;
use sharemig::utils::install_cancel_handler;
use sharemig::validation::Validator;

/////////
// CLI //
/////////

/// Flags shared by every subcommand
fn run_args() -> Vec<Arg> {
	vec![
		Arg::new("source")
			.long("source")
			.value_name("PATH")
			.help("File-server root to reconcile (fileServerPath)"),
		Arg::new("library").long("library").value_name("NAME").help("Destination library name"),
		Arg::new("base-path")
			.long("base-path")
			.value_name("PATH")
			.help("Prefix placed in front of the destination root folder"),
		Arg::new("tolerance")
			.long("tolerance")
			.value_name("SECS")
			.value_parser(clap::value_parser!(f64))
			.help("Timestamps closer than this are considered equal"),
		Arg::new("preview")
			.long("preview")
			.value_name("N")
			.value_parser(clap::value_parser!(usize))
			.help("Number of planned uploads to log up front"),
		Arg::new("stop-after")
			.long("stop-after")
			.value_name("N")
			.value_parser(clap::value_parser!(usize))
			.help("Stop after N upload attempts (0 = unlimited)"),
		Arg::new("fail-fast")
			.long("fail-fast")
			.action(ArgAction::SetTrue)
			.help("Abort on the first failed upload"),
		Arg::new("include-can-migrate")
			.long("include-can-migrate")
			.action(ArgAction::SetTrue)
			.help("Also upload files that are newer on the file server"),
		Arg::new("streaming")
			.long("streaming")
			.action(ArgAction::SetTrue)
			.help("Classify and upload each file as it is found"),
		Arg::new("concurrency")
			.long("concurrency")
			.value_name("N")
			.value_parser(clap::value_parser!(usize))
			.help("Files processed in parallel"),
		Arg::new("output-dir")
			.long("output-dir")
			.value_name("DIR")
			.help("Directory for reports and the event log"),
		Arg::new("yes")
			.short('y')
			.long("yes")
			.action(ArgAction::SetTrue)
			.help("Do not ask before large upload batches"),
	]
}

fn cli() -> Command {
	Command::new("sharemig")
		.version(env!("CARGO_PKG_VERSION"))
		.about("Reconcile a file share with a document library and migrate the difference")
		.subcommand_required(true)
		.arg(
			Arg::new("config")
				.short('c')
				.long("config")
				.value_name("FILE")
				.global(true)
				.help("Config file (.json, .json5 or .toml)"),
		)
		.subcommand(Command::new("compare").about("Classify every file and write the reports (dry run)").args(run_args()))
		.subcommand(Command::new("migrate").about("Classify and upload missing files").args(run_args()))
		.subcommand(Command::new("manifest").about("Print the migration manifest as JSON (dry run)").args(run_args()))
}

/// CLI flags override the file and the environment
fn apply_cli(config: &mut Config, command: &str, matches: &ArgMatches) {
	config.run.migrate = command == "migrate";

	if let Some(source) = matches.get_one::<String>("source") {
		config.file_server_path = PathBuf::from(source);
	}
	if let Some(library) = matches.get_one::<String>("library") {
		config.library_name = library.clone();
	}
	if let Some(base) = matches.get_one::<String>("base-path") {
		config.share_point_base_path = Some(base.clone());
	}
	if let Some(tolerance) = matches.get_one::<f64>("tolerance") {
		config.run.tolerance_secs = *tolerance;
	}
	if let Some(preview) = matches.get_one::<usize>("preview") {
		config.run.preview_count = *preview;
	}
	if let Some(stop_after) = matches.get_one::<usize>("stop-after") {
		config.run.stop_after = *stop_after;
	}
	if let Some(concurrency) = matches.get_one::<usize>("concurrency") {
		config.run.concurrency = *concurrency;
	}
	if let Some(dir) = matches.get_one::<String>("output-dir") {
		config.output_dir = PathBuf::from(dir);
	}
	if matches.get_flag("fail-fast") {
		config.run.fail_fast = true;
	}
	if matches.get_flag("include-can-migrate") {
		config.run.include_can_migrate = true;
	}
	if matches.get_flag("streaming") {
		config.run.mode = sharemig::strategies::RunMode::Streaming;
	}
	if matches.get_flag("yes") {
		config.run.assume_yes = true;
	}
}

/////////
// Run //
/////////

async fn run(matches: &ArgMatches) -> Result<(), MigrateError> {
	let mut config = match matches.get_one::<String>("config") {
		Some(path) => Config::load(Path::new(path))?,
		None => Config::default(),
	};
	config.apply_process_env();

	let (command, sub_matches) =
		matches.subcommand().ok_or_else(|| MigrateError::Other { message: "no command given".into() })?;
	apply_cli(&mut config, command, sub_matches);

	logging::init_tracing(&config.log_level);
	config.validate()?;
	let filter = config.date_filter(Utc::now())?;

	let store = open_store(&config.store, &config.library_name);
	verify_library(store.as_ref()).await?;
	let mut scanner = Scanner::new(&config.file_server_path, config.path_mapper(), filter)?;

	let paths = ReportPaths::new(&config.output_dir, Utc::now());
	let reports = Arc::new(FileReports::create(paths.clone(), store.library_root(), config.run.report_identical)?);
	let events = Arc::new(EventLog::open(&paths.events)?);
	info!("Run {} logging events to {}", events.run_id(), paths.events.display());

	let cancel = Arc::new(AtomicBool::new(false));
	install_cancel_handler(cancel.clone());

	let context = RunContext::new(config.run.clone(), events, reports)
		.with_callback(Arc::new(CliProgressCallback::new(config.run.assume_yes)))
		.with_cancel_flag(cancel);
	let lookup = RemoteLookup::new(store.clone(), config.lookup_candidates.clone(), config.library_aliases.clone());
	let driver = Driver::new(store, lookup, Arc::new(context));

	let summary = driver.run(&mut scanner).await?;
	eprintln!();

	if command == "manifest" {
		let manifest = std::fs::read_to_string(&paths.manifest)?;
		println!("{}", manifest);
	} else {
		print!("{}", summary.render());
	}
	Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
	let matches = cli().get_matches();
	match run(&matches).await {
		Ok(()) => ExitCode::SUCCESS,
		Err(e) => {
			error!("{}", e);
			eprintln!("Error: {}", e);
			ExitCode::FAILURE
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_cli_flags_override_config() {
		let matches = cli()
			.try_get_matches_from([
				"sharemig",
				"migrate",
				"--source",
				"/srv/share/Clients",
				"--tolerance",
				"5",
				"--stop-after",
				"10",
				"--streaming",
				"--concurrency",
				"4",
				"--yes",
			])
			.unwrap();
		let (command, sub) = matches.subcommand().unwrap();
		let mut config = Config::default();
		apply_cli(&mut config, command, sub);

		assert!(config.run.migrate);
		assert_eq!(config.file_server_path, PathBuf::from("/srv/share/Clients"));
		assert_eq!(config.run.tolerance_secs, 5.0);
		assert_eq!(config.run.stop_after, 10);
		assert_eq!(config.run.concurrency, 4);
		assert_eq!(config.run.mode, sharemig::strategies::RunMode::Streaming);
		assert!(config.run.assume_yes);
		assert!(!config.run.fail_fast);
	}

	#[test]
	fn test_compare_is_dry_run() {
		let matches = cli().try_get_matches_from(["sharemig", "compare", "--config", "x.json5"]).unwrap();
		let (command, sub) = matches.subcommand().unwrap();
		let mut config = Config::default();
		config.run.migrate = true;
		apply_cli(&mut config, command, sub);
		assert!(!config.run.migrate);
		assert_eq!(matches.get_one::<String>("config").map(String::as_str), Some("x.json5"));
	}

	#[test]
	fn test_command_required() {
		assert!(cli().try_get_matches_from(["sharemig"]).is_err());
	}
}

// vim: ts=4
