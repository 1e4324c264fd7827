/// Integration tests for configuration loading
/// Covers the defaults -> file -> environment chain and validation of loaded files
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

use sharemig::config::{Config, StoreConfig};
use sharemig::strategies::{CandidateRule, CollisionPolicy, RunMode};
use sharemig::validation::Validator;
use sharemig::MigrateError;

const JSON5_CONFIG: &str = r#"{
	tenantId: "00000000-0000-0000-0000-000000000001",
	clientId: "00000000-0000-0000-0000-000000000002",
	certificateThumbprint: "A1B2C3",
	siteUrl: "https://contoso.sharepoint.com/sites/legal",
	fileServerPath: "G:\\shared\\Clients (ETC - Wilco)",
	startDate: "2023-01-01",
	endDate: "2023-12-31",
	folderNameTransform: {
		nameMappings: { "Closed Matters": "Archive" },
		simplifyFolders: true,
	},
	lookupCandidates: ["direct", { prefix: "Shared Documents/Legacy" }, "folder-navigation"],
	libraryAliases: ["Legal Documents"],
	store: { kind: "directory", path: "/srv/site" },
	run: {
		toleranceSecs: 3.5,
		collisionPolicy: "warn-skip",
		concurrency: 4,
	},
}"#;

const TOML_CONFIG: &str = r#"
tenantId = "tenant"
clientId = "client"
certificateThumbprint = "THUMB"
siteUrl = "https://contoso.sharepoint.com/sites/hr"
fileServerPath = "/mnt/share/HR"
libraryName = "HR Documents"

[store]
kind = "memory"

[run]
migrate = true
stopAfter = 25
mode = "streaming"
"#;

#[test]
fn test_load_json5_file() {
	let dir = TempDir::new().unwrap();
	let path = dir.path().join("sharemig.json5");
	fs::write(&path, JSON5_CONFIG).unwrap();

	let config = Config::load(&path).unwrap();
	assert!(config.validate().is_ok());
	assert_eq!(config.source_root_name(), "Clients (ETC - Wilco)");
	assert_eq!(config.run.tolerance_secs, 3.5);
	assert_eq!(config.run.collision_policy, CollisionPolicy::WarnSkip);
	assert_eq!(config.run.concurrency, 4);
	assert_eq!(
		config.lookup_candidates,
		vec![
			CandidateRule::Direct,
			CandidateRule::Prefix("Shared Documents/Legacy".into()),
			CandidateRule::FolderNavigation
		]
	);
	assert_eq!(config.library_aliases, vec!["Legal Documents".to_string()]);
	match &config.store {
		StoreConfig::Directory { path, library_folder, .. } => {
			assert_eq!(path, &PathBuf::from("/srv/site"));
			assert_eq!(library_folder, "Shared Documents");
		}
		other => panic!("unexpected store {:?}", other),
	}
	assert!(config.date_filter(chrono::Utc::now()).unwrap().is_some());
}

#[test]
fn test_json5_config_maps_paths() {
	let dir = TempDir::new().unwrap();
	let path = dir.path().join("sharemig.json");
	fs::write(&path, JSON5_CONFIG).unwrap();
	let config = Config::load(&path).unwrap();

	let mapper = config.path_mapper();
	assert_eq!(mapper.map("sub\\file.pdf").as_display(), "Clients\\sub\\file.pdf");
	assert_eq!(mapper.map("Closed Matters/x.pdf").as_display(), "Clients\\Archive\\x.pdf");
}

#[test]
fn test_load_toml_file() {
	let dir = TempDir::new().unwrap();
	let path = dir.path().join("sharemig.toml");
	fs::write(&path, TOML_CONFIG).unwrap();

	let config = Config::load(&path).unwrap();
	assert_eq!(config.library_name, "HR Documents");
	assert_eq!(config.store, StoreConfig::Memory);
	assert!(config.run.migrate);
	assert_eq!(config.run.stop_after, 25);
	assert_eq!(config.run.mode, RunMode::Streaming);
	// untouched keys keep their defaults
	assert_eq!(config.run.preview_count, 20);
	assert_eq!(config.lookup_candidates, CandidateRule::default_order());
}

#[test]
fn test_migrate_into_memory_store_is_rejected() {
	let dir = TempDir::new().unwrap();
	let path = dir.path().join("sharemig.toml");
	fs::write(&path, TOML_CONFIG).unwrap();

	let mut config = Config::load(&path).unwrap();
	let err: MigrateError = config.validate().unwrap_err().into();
	assert!(matches!(err, MigrateError::InvalidConfig { .. }));

	// a dry run against the memory store is fine
	config.run.migrate = false;
	assert!(config.validate().is_ok());
}

#[test]
fn test_environment_overrides_file() {
	let dir = TempDir::new().unwrap();
	let path = dir.path().join("sharemig.toml");
	fs::write(&path, TOML_CONFIG).unwrap();

	let mut config = Config::load(&path).unwrap();
	config.apply_env(|name| match name {
		"SHAREMIG_LIBRARY_NAME" => Some("Records".to_string()),
		"SHAREMIG_OUTPUT_DIR" => Some("/var/log/sharemig".to_string()),
		_ => None,
	});
	assert_eq!(config.library_name, "Records");
	assert_eq!(config.output_dir, PathBuf::from("/var/log/sharemig"));
	assert_eq!(config.site_url, "https://contoso.sharepoint.com/sites/hr");
}

#[test]
fn test_invalid_files_are_config_errors() {
	let dir = TempDir::new().unwrap();

	let broken = dir.path().join("broken.json");
	fs::write(&broken, "{ siteUrl: ").unwrap();
	assert!(matches!(Config::load(&broken), Err(MigrateError::InvalidConfig { .. })));

	let missing = dir.path().join("missing.toml");
	assert!(matches!(Config::load(&missing), Err(MigrateError::InvalidConfig { .. })));
}

#[test]
fn test_loaded_config_validation_failures() {
	let dir = TempDir::new().unwrap();
	let path = dir.path().join("bad.json5");
	fs::write(
		&path,
		r#"{
			tenantId: "t", clientId: "c", certificateThumbprint: "x",
			siteUrl: "contoso.sharepoint.com",
			fileServerPath: "/srv/share",
		}"#,
	)
	.unwrap();
	let config = Config::load(&path).unwrap();
	let err = config.validate().unwrap_err();
	assert!(err.to_string().contains("siteUrl"));

	let reversed = Config {
		site_url: "https://contoso.sharepoint.com".into(),
		start_date: Some("2024-02-01".into()),
		end_date: Some("2024-01-01".into()),
		..config.clone()
	};
	assert!(reversed.validate().is_err());

	let mut bad_regex = Config { site_url: "https://contoso.sharepoint.com".into(), ..config };
	bad_regex.folder_name_transform =
		Some(serde_json::from_str(r#"{"removePattern": "([unclosed"}"#).unwrap());
	let err: MigrateError = bad_regex.validate().unwrap_err().into();
	assert!(matches!(err, MigrateError::InvalidConfig { .. }));
}
