use std::path::PathBuf;

use thiserror::Error;

use crate::{config::ConfigError, manifest::ManifestError, watermark::WatermarkError};

/// Failures that abort a whole run. Anything scoped to a single row ends up in the report instead.
#[derive(Debug, Error)]
pub enum SyncError {
	#[error(transparent)]
	Config(#[from] ConfigError),
	#[error(transparent)]
	Manifest(#[from] ManifestError),
	#[error(transparent)]
	Watermark(#[from] WatermarkError),
	#[error("{} referenced image file(s) missing or unreadable: {}", .0.len(), display_paths(.0))]
	MissingFiles(Vec<PathBuf>),
	#[error("failed to query collection '{collection}': {source}")]
	RemoteQuery {
		collection: String,
		#[source]
		source: ds_catalog_api::Error,
	},
}

fn display_paths(paths: &[PathBuf]) -> String {
	paths
		.iter()
		.map(|p| format!("'{}'", p.display()))
		.collect::<Vec<_>>()
		.join(", ")
}
