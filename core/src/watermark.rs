//! Cursor marking the most recent successfully processed manifest update.
//!
//! The watermark is compared to the manifest's `updated_at` column as a plain string, so any
//! value sharing the `YYYY-MM-DD` layout orders correctly. It is read once at the start of a run
//! and only written back after the whole batch went through, so an interrupted run replays the
//! same rows next time.

use std::{
	fmt,
	path::{Path, PathBuf},
};

use chrono::NaiveDate;
use ds_utils::{error::FileIOError, non_blank};
use thiserror::Error;
use tokio::fs;
use tracing::{debug, info};

/// Watermark used when no previous run left one behind.
pub const DEFAULT_WATERMARK: &str = "2025-01-01";

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Watermark(String);

impl Watermark {
	/// Builds a watermark from a persisted value. Blank values are rejected, they mean "absent".
	pub fn new(value: &str) -> Option<Self> {
		non_blank(value).map(|v| Self(v.to_string()))
	}

	pub fn from_date(date: NaiveDate) -> Self {
		Self(date.format(DATE_FORMAT).to_string())
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}

	/// Whether a manifest row stamped `updated_at` is newer than this cursor.
	pub fn is_before(&self, updated_at: &str) -> bool {
		updated_at > self.0.as_str()
	}

	/// The cursor to persist after a successful batch: today, or the newest processed stamp if
	/// some row was dated in the future. Never lower than any stamp in `processed`.
	pub fn advance<'a>(today: Self, processed: impl IntoIterator<Item = &'a str>) -> Self {
		processed
			.into_iter()
			.filter_map(Self::new)
			.fold(today, Ord::max)
	}
}

impl Default for Watermark {
	fn default() -> Self {
		Self(DEFAULT_WATERMARK.to_string())
	}
}

impl fmt::Display for Watermark {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

#[derive(Debug, Error)]
pub enum WatermarkError {
	#[error("failed to read watermark: {0}")]
	Read(#[source] FileIOError),
	#[error("failed to persist watermark: {0}")]
	Write(#[source] FileIOError),
}

/// Plain text file holding a single watermark value.
#[derive(Debug, Clone)]
pub struct WatermarkStore {
	path: PathBuf,
}

impl WatermarkStore {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	/// Returns the persisted watermark, or [`DEFAULT_WATERMARK`] if there is none yet.
	pub async fn read(&self) -> Result<Watermark, WatermarkError> {
		match fs::read_to_string(&self.path).await {
			Ok(contents) => Ok(Watermark::new(&contents).unwrap_or_else(|| {
				debug!(path = %self.path.display(), "watermark file is empty, using default");
				Watermark::default()
			})),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
				debug!(path = %self.path.display(), "no watermark file, using default");
				Ok(Watermark::default())
			}
			Err(e) => Err(WatermarkError::Read(FileIOError::from_std_io_err(
				&self.path, e,
			))),
		}
	}

	/// Overwrites the stored watermark.
	///
	/// The value lands in a sibling temporary file first and is then renamed over the old one, so
	/// a crash never leaves a truncated cursor behind.
	pub async fn write(&self, watermark: &Watermark) -> Result<(), WatermarkError> {
		if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent).await.map_err(|e| {
				WatermarkError::Write(FileIOError::with_context(
					parent,
					e,
					"creating watermark directory",
				))
			})?;
		}

		let tmp = self.path.with_extension("tmp");
		fs::write(&tmp, watermark.as_str())
			.await
			.map_err(|e| WatermarkError::Write(FileIOError::from_std_io_err(&tmp, e)))?;
		fs::rename(&tmp, &self.path).await.map_err(|e| {
			WatermarkError::Write(FileIOError::with_context(
				&self.path,
				e,
				"replacing watermark",
			))
		})?;

		info!(path = %self.path.display(), %watermark, "watermark advanced");

		Ok(())
	}
}
