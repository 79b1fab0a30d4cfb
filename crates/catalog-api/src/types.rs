use std::{fmt, path::Path};

use ds_utils::{error::FileIOError, non_blank, non_blank_owned};
use serde::{Deserialize, Serialize};

/// Opaque identifier the backend assigns to an uploaded file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaId(pub u64);

impl fmt::Display for MediaId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		self.0.fmt(f)
	}
}

/// Result of a media upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaAsset {
	pub id: MediaId,
	#[serde(default)]
	pub name: String,
}

/// Identity of a destination: a country, optionally narrowed down to a city.
///
/// A blank city is normalized to `None` on construction, so a country-level key never compares
/// equal to a city-level one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DestinationKey {
	pub country: String,
	pub city: Option<String>,
}

impl DestinationKey {
	pub fn new(country: impl Into<String>, city: Option<&str>) -> Self {
		Self {
			country: country.into(),
			city: city.and_then(non_blank).map(ToString::to_string),
		}
	}

	/// Strict identity match: a null city only matches a null (or blank) city, and a named city
	/// only matches the exact same name.
	pub fn matches(&self, country: &str, city: Option<&str>) -> bool {
		self.country == country && self.city.as_deref() == city.and_then(non_blank)
	}
}

impl fmt::Display for DestinationKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match &self.city {
			Some(city) => write!(f, "{}/{city}", self.country),
			None => write!(f, "{}/-", self.country),
		}
	}
}

/// A destination record as the backend returns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteDestination {
	pub id: u64,
	#[serde(default)]
	pub document_id: Option<String>,
	pub country: String,
	#[serde(default)]
	pub city: Option<String>,
	#[serde(default)]
	pub category1: Option<String>,
	#[serde(default)]
	pub category2: Option<String>,
	#[serde(default)]
	pub images: Option<Vec<MediaAsset>>,
}

impl RemoteDestination {
	pub fn key(&self) -> DestinationKey {
		DestinationKey::new(&self.country, self.city.as_deref())
	}

	/// Image references in their stored order. A missing relation reads as an empty list.
	pub fn image_ids(&self) -> Vec<MediaId> {
		self.images
			.iter()
			.flatten()
			.map(|asset| asset.id)
			.collect()
	}

	/// Path segment addressing this record: the document id when the backend exposes one,
	/// otherwise the numeric id.
	pub fn path_segment(&self) -> String {
		non_blank_owned(self.document_id.clone()).unwrap_or_else(|| self.id.to_string())
	}
}

/// Payload for creating a destination. New destinations are always created enabled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDestination {
	pub key: DestinationKey,
	pub category1: String,
	pub category2: String,
	pub images: Vec<MediaId>,
}

/// Full replacement of the fields the sync owns on an existing destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationUpdate {
	pub category1: String,
	pub category2: String,
	pub images: Vec<MediaId>,
}

const FALLBACK_MIME: &str = "image/png";

/// A file ready to be sent to the media library.
#[derive(Clone, PartialEq, Eq)]
pub struct MediaUpload {
	pub bytes: Vec<u8>,
	pub file_name: String,
	pub mime_type: String,
}

impl fmt::Debug for MediaUpload {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("MediaUpload")
			.field("bytes", &self.bytes.len())
			.field("file_name", &self.file_name)
			.field("mime_type", &self.mime_type)
			.finish()
	}
}

impl MediaUpload {
	/// Reads the file at `path`, naming it after its last path component and guessing the MIME
	/// type from the extension.
	pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, FileIOError> {
		let path = path.as_ref();

		let bytes = tokio::fs::read(path)
			.await
			.map_err(|e| FileIOError::with_context(path, e, "reading media file"))?;

		let file_name = path
			.file_name()
			.map(|name| name.to_string_lossy().into_owned())
			.unwrap_or_default();

		Ok(Self {
			bytes,
			mime_type: guess_mime(&file_name),
			file_name,
		})
	}
}

fn guess_mime(file_name: &str) -> String {
	mime_guess::from_path(file_name)
		.first_raw()
		.unwrap_or(FALLBACK_MIME)
		.to_string()
}
