use std::path::Path;

use tokio::fs::File;
use tracing::error;

use crate::{error::SyncError, manifest::ManifestRow};

/// Checks that every image referenced by `rows` exists under `root` and can be opened for reading.
///
/// All offending paths are collected so one run reports the whole list; nothing remote should be
/// touched when this fails.
pub async fn ensure_readable(root: &Path, rows: &[ManifestRow]) -> Result<(), SyncError> {
	let mut missing = Vec::new();

	for row in rows {
		let path = root.join(&row.filepath);
		if let Err(reason) = check(&path).await {
			error!(
				path = %path.display(),
				key = %row.key(),
				"image file is not usable: {reason}"
			);
			missing.push(path);
		}
	}

	if missing.is_empty() {
		Ok(())
	} else {
		Err(SyncError::MissingFiles(missing))
	}
}

async fn check(path: &Path) -> Result<(), String> {
	let file = File::open(path).await.map_err(|e| e.to_string())?;
	let metadata = file.metadata().await.map_err(|e| e.to_string())?;

	if metadata.is_file() {
		Ok(())
	} else {
		Err("not a regular file".to_string())
	}
}
