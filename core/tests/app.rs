mod common;

use std::path::PathBuf;

use common::{FakeCatalog, Workspace};
use ds_core::{app, AppConfig, CancellationToken, SeedSpec, Stages, SyncError};
use tracing_test::traced_test;

fn config(workspace: &Workspace, data_folder: Option<PathBuf>) -> AppConfig {
	AppConfig {
		api_token: Some("token".to_string()),
		data_folder,
		watermark_path: workspace.watermark_path(),
		seeds: vec![SeedSpec {
			collection: "travel-types".to_string(),
			csv: workspace.dir.path().join("travel_types.csv"),
		}],
		..AppConfig::default()
	}
}

#[tokio::test]
#[traced_test]
async fn failed_seed_does_not_block_the_sync() {
	let workspace = Workspace::new();
	workspace
		.write_manifest(&["beach,asia,Thailand,Phuket,0,O,beach/asia/phuket.png,2025-03-01"])
		.await;
	workspace.write_image("beach/asia/phuket.png").await;

	let catalog = FakeCatalog {
		fail_list: true,
		..FakeCatalog::new()
	};

	let outcome = app::run(
		catalog,
		&config(&workspace, Some(workspace.data_folder())),
		Stages::default(),
		&CancellationToken::new(),
	)
	.await
	.unwrap();

	let [(collection, seeded)] = <[_; 1]>::try_from(outcome.seeds).unwrap();
	assert_eq!(collection, "travel-types");
	assert!(matches!(seeded, Err(SyncError::RemoteQuery { .. })));
	assert!(logs_contain("seeding 'travel-types'"));

	let report = outcome.sync.unwrap();
	assert_eq!(report.created(), 1);
	assert!(report.watermark_after.is_some());
}

#[tokio::test]
async fn unset_or_absent_data_folder_skips_the_sync() {
	let workspace = Workspace::new();
	tokio::fs::write(workspace.dir.path().join("travel_types.csv"), "name\nbeach\n")
		.await
		.unwrap();

	for data_folder in [None, Some(workspace.dir.path().join("nowhere"))] {
		let outcome = app::run(
			FakeCatalog::new(),
			&config(&workspace, data_folder),
			Stages::default(),
			&CancellationToken::new(),
		)
		.await
		.unwrap();

		assert!(outcome.sync.is_none());
		assert!(matches!(outcome.seeds[0].1, Ok(_)));
	}
	assert_eq!(workspace.read_watermark().await, None);
}

#[tokio::test]
async fn stages_select_what_runs() {
	let workspace = Workspace::new();
	workspace
		.write_manifest(&["beach,asia,Thailand,Phuket,0,O,beach/asia/phuket.png,2025-03-01"])
		.await;
	workspace.write_image("beach/asia/phuket.png").await;
	let config = config(&workspace, Some(workspace.data_folder()));

	let sync_only = app::run(
		FakeCatalog::new(),
		&config,
		Stages {
			seeds: false,
			sync: true,
		},
		&CancellationToken::new(),
	)
	.await
	.unwrap();
	assert!(sync_only.seeds.is_empty());
	assert!(sync_only.sync.is_some());

	let catalog = FakeCatalog::new();
	catalog.insert_entry("travel-types", serde_json::json!({ "name": "beach" }));
	let seeds_only = app::run(
		catalog,
		&config,
		Stages {
			seeds: true,
			sync: false,
		},
		&CancellationToken::new(),
	)
	.await
	.unwrap();
	assert_eq!(seeds_only.seeds.len(), 1);
	assert!(seeds_only.sync.is_none());
}

#[tokio::test]
async fn fatal_sync_error_is_returned() {
	let workspace = Workspace::new();
	workspace
		.write_manifest(&["beach,asia,Thailand,Phuket,0,O,beach/asia/phuket.png,2025-03-01"])
		.await;

	let err = app::run(
		FakeCatalog::new(),
		&AppConfig {
			seeds: Vec::new(),
			..config(&workspace, Some(workspace.data_folder()))
		},
		Stages::default(),
		&CancellationToken::new(),
	)
	.await
	.unwrap_err();

	assert!(matches!(err, SyncError::MissingFiles(_)));
}
