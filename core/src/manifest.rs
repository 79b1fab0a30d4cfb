use std::path::{Path, PathBuf};

use ds_catalog_api::DestinationKey;
use ds_utils::{error::FileIOError, non_blank_owned};
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum ManifestError {
	#[error("manifest not found: '{}'", .0.display())]
	NotFound(PathBuf),
	#[error(transparent)]
	FileIO(#[from] FileIOError),
	#[error("malformed csv header in '{}': {source}", .path.display())]
	Header {
		path: PathBuf,
		#[source]
		source: csv::Error,
	},
}

/// One line of the destinations manifest.
///
/// Values are kept as found (trimmed); a missing required cell reads as an empty string and is
/// rejected by the eligibility check rather than here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestRow {
	pub category1: String,
	pub category2: String,
	pub country: String,
	/// `None` for country-level destinations.
	pub city: Option<String>,
	/// Image slot inside the destination's image list. `None` when absent or not a non-negative
	/// integer.
	pub order: Option<usize>,
	pub image_exists: String,
	pub filepath: String,
	pub updated_at: String,
}

impl ManifestRow {
	pub fn key(&self) -> DestinationKey {
		DestinationKey::new(&self.country, self.city.as_deref())
	}

	/// `image_exists` is a case insensitive "o" flag.
	pub fn has_image(&self) -> bool {
		self.image_exists.eq_ignore_ascii_case("o")
	}

	/// The name the uploaded file gets: the last component of `filepath`.
	pub fn file_name(&self) -> &str {
		self.filepath
			.rsplit(['/', '\\'])
			.next()
			.unwrap_or(&self.filepath)
	}
}

// Every cell is optional: the csv deserializer only tolerates short records for `Option` fields.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawRow {
	category1: Option<String>,
	category2: Option<String>,
	country: Option<String>,
	city: Option<String>,
	order: Option<String>,
	image_exists: Option<String>,
	filepath: Option<String>,
	updated_at: Option<String>,
}

impl From<RawRow> for ManifestRow {
	fn from(raw: RawRow) -> Self {
		Self {
			category1: raw.category1.unwrap_or_default(),
			category2: raw.category2.unwrap_or_default(),
			country: raw.country.unwrap_or_default(),
			city: non_blank_owned(raw.city),
			order: raw.order.and_then(|o| o.trim().parse().ok()),
			image_exists: raw.image_exists.unwrap_or_default(),
			filepath: raw.filepath.unwrap_or_default(),
			updated_at: raw.updated_at.unwrap_or_default(),
		}
	}
}

async fn read_bytes(path: &Path) -> Result<Vec<u8>, ManifestError> {
	tokio::fs::read(path).await.map_err(|e| {
		if e.kind() == std::io::ErrorKind::NotFound {
			ManifestError::NotFound(path.to_path_buf())
		} else {
			FileIOError::with_context(path, e, "reading csv").into()
		}
	})
}

fn csv_reader(bytes: &[u8]) -> csv::Reader<&[u8]> {
	csv::ReaderBuilder::new()
		.has_headers(true)
		.flexible(true)
		.trim(csv::Trim::All)
		.from_reader(bytes)
}

/// Parses the manifest at `path` into rows, in file order.
///
/// Records that cannot be decoded at all are logged and dropped.
pub async fn read_manifest(path: impl AsRef<Path>) -> Result<Vec<ManifestRow>, ManifestError> {
	let path = path.as_ref();
	let bytes = read_bytes(path).await?;

	let mut reader = csv_reader(&bytes);
	reader.headers().map_err(|source| ManifestError::Header {
		path: path.to_path_buf(),
		source,
	})?;

	Ok(reader
		.deserialize::<RawRow>()
		.filter_map(|record| match record {
			Ok(raw) => Some(raw.into()),
			Err(e) => {
				warn!(path = %path.display(), "dropping undecodable manifest record: {e}");
				None
			}
		})
		.collect())
}

/// Reads a generic lookup table: every record becomes a JSON object keyed by the header names.
pub async fn read_records(
	path: impl AsRef<Path>,
) -> Result<Vec<Map<String, Value>>, ManifestError> {
	let path = path.as_ref();
	let bytes = read_bytes(path).await?;

	let mut reader = csv_reader(&bytes);
	let headers = reader
		.headers()
		.map_err(|source| ManifestError::Header {
			path: path.to_path_buf(),
			source,
		})?
		.clone();

	Ok(reader
		.records()
		.filter_map(|record| match record {
			Ok(record) => Some(
				headers
					.iter()
					.zip(record.iter())
					.map(|(header, value)| (header.to_string(), Value::String(value.to_string())))
					.collect(),
			),
			Err(e) => {
				warn!(path = %path.display(), "dropping undecodable record: {e}");
				None
			}
		})
		.collect())
}
