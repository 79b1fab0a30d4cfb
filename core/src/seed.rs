use std::path::Path;

use ds_catalog_api::Catalog;
use serde_json::Value;
use tracing::{error, info};

use crate::{error::SyncError, manifest::read_records};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedReport {
	/// The remote collection already had entries; the file was not read.
	AlreadySeeded,
	Seeded {
		inserted: usize,
		failed: usize,
		/// Records without a `name`.
		skipped: usize,
	},
}

/// Fills a static lookup collection from a CSV file, but only while it is still empty remotely.
///
/// A failing insert is logged and counted; the remaining records are still sent.
pub async fn seed_collection(
	catalog: &impl Catalog,
	collection: &str,
	csv_path: impl AsRef<Path>,
) -> Result<SeedReport, SyncError> {
	let csv_path = csv_path.as_ref();

	info!(%collection, "initializing table with default values");

	let existing = catalog
		.list_entries(collection)
		.await
		.map_err(|source| SyncError::RemoteQuery {
			collection: collection.to_string(),
			source,
		})?;

	if !existing.is_empty() {
		info!(%collection, count = existing.len(), "table is not empty, no data inserted");
		return Ok(SeedReport::AlreadySeeded);
	}

	let (mut inserted, mut failed, mut skipped) = (0, 0, 0);

	for record in read_records(csv_path).await? {
		let has_name = record
			.get("name")
			.and_then(Value::as_str)
			.is_some_and(|name| !name.is_empty());
		if !has_name {
			skipped += 1;
			continue;
		}

		match catalog.create_entry(collection, &record).await {
			Ok(()) => inserted += 1,
			Err(e) => {
				error!(%collection, ?record, "data inserting failed: {e}");
				failed += 1;
			}
		}
	}

	info!(%collection, inserted, failed, skipped, "table seeded");

	Ok(SeedReport::Seeded {
		inserted,
		failed,
		skipped,
	})
}
