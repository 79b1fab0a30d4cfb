use std::{future::Future, time::Duration};

use chrono::{NaiveDate, Utc};
use ds_catalog_api::{
	Catalog, DestinationKey, DestinationUpdate, MediaId, MediaUpload, NewDestination,
};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use crate::{
	config::SyncConfig,
	error::SyncError,
	guard,
	manifest::{read_manifest, ManifestError, ManifestRow},
	watermark::{Watermark, WatermarkStore},
};

pub mod delta;
pub mod merge;

pub use merge::merge_images;

/// What happened to a single manifest row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOutcome {
	Created { id: u64, image: MediaId },
	Updated { id: u64, images: Vec<MediaId> },
	/// The image could not be uploaded; the destination was left untouched.
	Skipped { reason: String },
	/// The lookup or the create/update call failed.
	Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowReport {
	pub key: DestinationKey,
	pub filepath: String,
	pub order: Option<usize>,
	pub outcome: RowOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
	pub watermark_before: Watermark,
	/// Set only when a batch was processed to completion and the watermark was persisted.
	pub watermark_after: Option<Watermark>,
	pub manifest_missing: bool,
	pub cancelled: bool,
	pub rows: Vec<RowReport>,
}

impl SyncReport {
	fn new(watermark_before: Watermark) -> Self {
		Self {
			watermark_before,
			watermark_after: None,
			manifest_missing: false,
			cancelled: false,
			rows: Vec::new(),
		}
	}

	fn count(&self, f: impl Fn(&RowOutcome) -> bool) -> usize {
		self.rows.iter().filter(|row| f(&row.outcome)).count()
	}

	pub fn created(&self) -> usize {
		self.count(|o| matches!(o, RowOutcome::Created { .. }))
	}

	pub fn updated(&self) -> usize {
		self.count(|o| matches!(o, RowOutcome::Updated { .. }))
	}

	pub fn skipped(&self) -> usize {
		self.count(|o| matches!(o, RowOutcome::Skipped { .. }))
	}

	pub fn failed(&self) -> usize {
		self.count(|o| matches!(o, RowOutcome::Failed { .. }))
	}
}

#[derive(Debug, Error)]
enum RemoteCallError {
	#[error(transparent)]
	Catalog(#[from] ds_catalog_api::Error),
	#[error("remote call timed out after {0:?}")]
	TimedOut(Duration),
}

/// Drives a sync run against a [`Catalog`].
pub struct SyncEngine<C> {
	catalog: C,
	config: SyncConfig,
	watermarks: WatermarkStore,
	today: fn() -> NaiveDate,
}

impl<C: Catalog> SyncEngine<C> {
	pub fn new(catalog: C, config: SyncConfig) -> Self {
		Self {
			catalog,
			watermarks: WatermarkStore::new(&config.watermark_path),
			config,
			today: || Utc::now().date_naive(),
		}
	}

	/// Replaces the clock used to stamp the next watermark.
	#[must_use]
	pub fn with_clock(mut self, today: fn() -> NaiveDate) -> Self {
		self.today = today;
		self
	}

	pub fn catalog(&self) -> &C {
		&self.catalog
	}

	pub fn watermarks(&self) -> &WatermarkStore {
		&self.watermarks
	}

	/// Runs one batch.
	///
	/// Rows are processed one at a time in manifest order, so a row always sees the writes of the
	/// rows before it. `cancel` is checked between rows; a cancelled run leaves the watermark as
	/// it was.
	pub async fn run(&self, cancel: &CancellationToken) -> Result<SyncReport, SyncError> {
		let watermark = self.watermarks.read().await?;
		info!(
			%watermark,
			path = %self.watermarks.path().display(),
			"loaded watermark"
		);

		let mut report = SyncReport::new(watermark.clone());

		let rows = match read_manifest(&self.config.manifest_path).await {
			Ok(rows) => rows,
			Err(ManifestError::NotFound(path)) => {
				info!(path = %path.display(), "no manifest found, nothing to sync");
				report.manifest_missing = true;
				return Ok(report);
			}
			Err(e) => return Err(e.into()),
		};

		let eligible = delta::select(rows, &watermark);
		if eligible.is_empty() {
			info!(%watermark, "no destinations updated since watermark");
			return Ok(report);
		}

		info!(
			count = eligible.len(),
			rows = ?eligible
				.iter()
				.map(|row| format!("{} ({} @ {})", row.key(), row.filepath, row.updated_at))
				.collect::<Vec<_>>(),
			"found destinations to update"
		);

		guard::ensure_readable(&self.config.image_root, &eligible).await?;

		for row in &eligible {
			if cancel.is_cancelled() {
				warn!(
					processed = report.rows.len(),
					remaining = eligible.len() - report.rows.len(),
					"sync cancelled, watermark left untouched"
				);
				report.cancelled = true;
				return Ok(report);
			}

			let outcome = self.reconcile(row).await;
			report.rows.push(RowReport {
				key: row.key(),
				filepath: row.filepath.clone(),
				order: row.order,
				outcome,
			});
		}

		let next = Watermark::advance(
			Watermark::from_date((self.today)()),
			eligible.iter().map(|row| row.updated_at.as_str()),
		);
		self.watermarks.write(&next).await?;
		report.watermark_after = Some(next);

		info!(
			created = report.created(),
			updated = report.updated(),
			skipped = report.skipped(),
			failed = report.failed(),
			"destinations synced"
		);

		Ok(report)
	}

	async fn call<T>(
		&self,
		fut: impl Future<Output = Result<T, ds_catalog_api::Error>>,
	) -> Result<T, RemoteCallError> {
		tokio::time::timeout(self.config.request_timeout, fut)
			.await
			.map_err(|_| RemoteCallError::TimedOut(self.config.request_timeout))?
			.map_err(Into::into)
	}

	#[instrument(
		skip_all,
		fields(key = %row.key(), order = ?row.order, filepath = %row.filepath)
	)]
	async fn reconcile(&self, row: &ManifestRow) -> RowOutcome {
		let key = row.key();

		let existing = match self.call(self.catalog.find_destination(&key)).await {
			Ok(existing) => existing,
			Err(e) => {
				error!("lookup failed, skipping row: {e}");
				return RowOutcome::Failed {
					reason: format!("lookup failed: {e}"),
				};
			}
		};

		let path = self.config.image_root.join(&row.filepath);
		let upload = match MediaUpload::from_path(&path).await {
			Ok(upload) => MediaUpload {
				file_name: row.file_name().to_string(),
				..upload
			},
			Err(e) => {
				warn!("image could not be read, skipping row: {e}");
				return RowOutcome::Skipped {
					reason: e.to_string(),
				};
			}
		};

		let asset = match self.call(self.catalog.upload_media(upload)).await {
			Ok(asset) => asset,
			Err(e) => {
				warn!("upload failed, skipping row: {e}");
				return RowOutcome::Skipped {
					reason: format!("upload failed: {e}"),
				};
			}
		};

		match existing {
			None => {
				info!(image = %asset.id, "destination will be created");

				let new_destination = NewDestination {
					key,
					category1: row.category1.clone(),
					category2: row.category2.clone(),
					images: vec![asset.id],
				};

				match self
					.call(self.catalog.create_destination(&new_destination))
					.await
				{
					Ok(created) => RowOutcome::Created {
						id: created.id,
						image: asset.id,
					},
					Err(e) => {
						error!("create failed: {e}");
						RowOutcome::Failed {
							reason: format!("create failed: {e}"),
						}
					}
				}
			}

			Some(existing) => {
				let images = merge_images(&existing.image_ids(), row.order, asset.id);
				info!(
					id = existing.id,
					before = ?existing.image_ids(),
					after = ?images,
					"destination already exists, updating images"
				);

				let update = DestinationUpdate {
					category1: row.category1.clone(),
					category2: row.category2.clone(),
					images,
				};

				match self
					.call(self.catalog.update_destination(&existing, &update))
					.await
				{
					Ok(_) => RowOutcome::Updated {
						id: existing.id,
						images: update.images,
					},
					Err(e) => {
						error!(id = existing.id, "update failed: {e}");
						RowOutcome::Failed {
							reason: format!("update failed: {e}"),
						}
					}
				}
			}
		}
	}
}
