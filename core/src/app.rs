//! One invocation of the tool: the configured seeds, then the destination sync.

use ds_catalog_api::Catalog;
use ds_utils::error::report_error;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{
	config::AppConfig,
	engine::{SyncEngine, SyncReport},
	error::SyncError,
	seed::{seed_collection, SeedReport},
};

/// Which parts of a run to execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stages {
	pub seeds: bool,
	pub sync: bool,
}

impl Default for Stages {
	fn default() -> Self {
		Self {
			seeds: true,
			sync: true,
		}
	}
}

#[derive(Debug)]
pub struct RunOutcome {
	/// One entry per configured seed, in configuration order.
	pub seeds: Vec<(String, Result<SeedReport, SyncError>)>,
	/// `None` when the destination sync did not run.
	pub sync: Option<SyncReport>,
}

/// Runs every configured seed, then the destination sync.
///
/// A failed seed is logged and kept in the outcome; it never prevents the sync. The sync is
/// skipped when no data folder is configured or the folder does not exist. Only a batch-fatal
/// sync error is returned as `Err`.
pub async fn run<C: Catalog>(
	catalog: C,
	config: &AppConfig,
	stages: Stages,
	cancel: &CancellationToken,
) -> Result<RunOutcome, SyncError> {
	let mut outcome = RunOutcome {
		seeds: Vec::new(),
		sync: None,
	};

	if stages.seeds {
		for seed in &config.seeds {
			let res = seed_collection(&catalog, &seed.collection, &seed.csv).await;
			report_error(&res, &format!("seeding '{}'", seed.collection));
			if let Ok(report) = &res {
				info!(collection = %seed.collection, ?report, "seed finished");
			}
			outcome.seeds.push((seed.collection.clone(), res));
		}
	}

	if !stages.sync {
		return Ok(outcome);
	}

	let Some(sync_config) = config.sync_config() else {
		warn!("no data folder configured, skipping destination sync");
		return Ok(outcome);
	};

	let folder_exists = tokio::fs::metadata(&sync_config.image_root)
		.await
		.is_ok_and(|metadata| metadata.is_dir());
	if !folder_exists {
		warn!(
			folder = %sync_config.image_root.display(),
			"data folder does not exist, skipping destination sync"
		);
		return Ok(outcome);
	}

	outcome.sync = Some(SyncEngine::new(catalog, sync_config).run(cancel).await?);

	Ok(outcome)
}
