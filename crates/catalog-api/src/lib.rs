//! Client for the content backend holding the destination catalog.
//!
//! The sync engine only ever talks to the backend through the [`Catalog`] trait, so tests can
//! swap the HTTP implementation ([`StrapiCatalog`]) for an in-memory one.

mod types;

use std::time::Duration;

use async_trait::async_trait;
use ds_utils::{error::FileIOError, non_blank};
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use tracing::debug;

pub use types::{
	DestinationKey, DestinationUpdate, MediaAsset, MediaId, MediaUpload, NewDestination,
	RemoteDestination,
};

pub const DESTINATIONS_COLLECTION: &str = "destinations";

#[derive(thiserror::Error, Debug)]
pub enum Error {
	#[error("api token is required")]
	MissingCredential,
	#[error("invalid api url '{url}': {reason}")]
	InvalidUrl { url: String, reason: String },
	#[error("request to '{url}' failed: {source}")]
	Transport {
		url: String,
		#[source]
		source: reqwest::Error,
	},
	#[error("'{url}' responded with {status}: {body}")]
	Status {
		url: String,
		status: u16,
		body: String,
	},
	#[error("failed to decode response from '{url}': {source}")]
	Decode {
		url: String,
		#[source]
		source: serde_json::Error,
	},
	#[error("upload to '{url}' returned no media asset")]
	EmptyUpload { url: String },
	#[error(transparent)]
	FileIO(#[from] FileIOError),
}

impl Error {
	/// HTTP status of the failed call, when the backend answered at all.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Status { status, .. } => Some(*status),
			Self::Transport { source, .. } => source.status().map(|s| s.as_u16()),
			_ => None,
		}
	}
}

/// The remote operations the sync needs.
#[async_trait]
pub trait Catalog: Send + Sync {
	/// Looks a destination up by its identity key. At most one record is expected.
	async fn find_destination(
		&self,
		key: &DestinationKey,
	) -> Result<Option<RemoteDestination>, Error>;

	async fn create_destination(
		&self,
		destination: &NewDestination,
	) -> Result<RemoteDestination, Error>;

	/// Replaces categories and the whole image list of `existing`.
	async fn update_destination(
		&self,
		existing: &RemoteDestination,
		update: &DestinationUpdate,
	) -> Result<RemoteDestination, Error>;

	async fn upload_media(&self, upload: MediaUpload) -> Result<MediaAsset, Error>;

	/// Lists raw entries of a lookup collection (e.g. `travel-types`).
	async fn list_entries(&self, collection: &str) -> Result<Vec<Value>, Error>;

	async fn create_entry(&self, collection: &str, entry: &Map<String, Value>)
		-> Result<(), Error>;
}

#[derive(Debug, Clone)]
pub struct RequestConfig {
	pub client: reqwest::Client,
	pub api_url: String,
	pub api_token: String,
}

impl RequestConfig {
	/// Builds the shared HTTP client. Fails before any request is made when the token is missing
	/// or the URL is unusable.
	pub fn new(api_url: &str, api_token: Option<&str>, timeout: Duration) -> Result<Self, Error> {
		let api_token = api_token
			.and_then(non_blank)
			.ok_or(Error::MissingCredential)?
			.to_string();

		let parsed = reqwest::Url::parse(api_url).map_err(|e| Error::InvalidUrl {
			url: api_url.to_string(),
			reason: e.to_string(),
		})?;
		if !matches!(parsed.scheme(), "http" | "https") {
			return Err(Error::InvalidUrl {
				url: api_url.to_string(),
				reason: format!("unsupported scheme '{}'", parsed.scheme()),
			});
		}

		let client = reqwest::Client::builder()
			.timeout(timeout)
			.build()
			.map_err(|source| Error::Transport {
				url: api_url.to_string(),
				source,
			})?;

		Ok(Self {
			client,
			api_url: api_url.trim_end_matches('/').to_string(),
			api_token,
		})
	}

	fn endpoint(&self, path: &str) -> String {
		format!("{}/api/{}", self.api_url, path.trim_start_matches('/'))
	}
}

trait WithAuth {
	fn with_auth(self, token: &str) -> Self;
}

impl WithAuth for reqwest::RequestBuilder {
	fn with_auth(self, token: &str) -> Self {
		self.bearer_auth(token)
			.header(reqwest::header::ACCEPT, "application/json")
	}
}

#[derive(serde::Deserialize)]
struct Envelope<T> {
	data: T,
}

async fn read_json<T: DeserializeOwned>(
	url: &str,
	res: Result<reqwest::Response, reqwest::Error>,
) -> Result<T, Error> {
	let res = res.map_err(|source| Error::Transport {
		url: url.to_string(),
		source,
	})?;

	let status = res.status();
	let body = res.text().await.map_err(|source| Error::Transport {
		url: url.to_string(),
		source,
	})?;

	if !status.is_success() {
		return Err(Error::Status {
			url: url.to_string(),
			status: status.as_u16(),
			body,
		});
	}

	serde_json::from_str(&body).map_err(|source| Error::Decode {
		url: url.to_string(),
		source,
	})
}

pub mod destination {
	use super::*;

	pub use find::exec as find;
	pub mod find {
		use super::*;

		pub async fn exec(
			config: &RequestConfig,
			key: &DestinationKey,
		) -> Result<Option<RemoteDestination>, Error> {
			let url = config.endpoint(DESTINATIONS_COLLECTION);

			let mut query = vec![
				("filters[country][$eq]", key.country.clone()),
				("populate", "images".to_string()),
			];
			match &key.city {
				Some(city) => query.push(("filters[city][$eq]", city.clone())),
				// Country-level records may hold either null or an empty string
				None => {
					query.push(("filters[$or][0][city][$null]", "true".to_string()));
					query.push(("filters[$or][1][city][$eq]", String::new()));
				}
			}

			debug!(%url, %key, "looking up destination");

			let Envelope { data } = read_json::<Envelope<Vec<RemoteDestination>>>(
				&url,
				config
					.client
					.get(&url)
					.query(&query)
					.with_auth(&config.api_token)
					.send()
					.await,
			)
			.await?;

			Ok(data
				.into_iter()
				.find(|d| key.matches(&d.country, d.city.as_deref())))
		}
	}

	pub use create::exec as create;
	pub mod create {
		use super::*;

		pub async fn exec(
			config: &RequestConfig,
			destination: &NewDestination,
		) -> Result<RemoteDestination, Error> {
			let url = config.endpoint(DESTINATIONS_COLLECTION);

			debug!(%url, key = %destination.key, "creating destination");

			read_json::<Envelope<RemoteDestination>>(
				&url,
				config
					.client
					.post(&url)
					.json(&json!({
						"data": {
							"country": destination.key.country,
							"city": destination.key.city,
							"category1": destination.category1,
							"category2": destination.category2,
							"disabled": false,
							"images": destination.images,
						}
					}))
					.with_auth(&config.api_token)
					.send()
					.await,
			)
			.await
			.map(|Envelope { data }| data)
		}
	}

	pub use update::exec as update;
	pub mod update {
		use super::*;

		pub async fn exec(
			config: &RequestConfig,
			existing: &RemoteDestination,
			update: &DestinationUpdate,
		) -> Result<RemoteDestination, Error> {
			let url = config.endpoint(&format!(
				"{DESTINATIONS_COLLECTION}/{}",
				existing.path_segment()
			));

			debug!(%url, key = %existing.key(), images = ?update.images, "updating destination");

			read_json::<Envelope<RemoteDestination>>(
				&url,
				config
					.client
					.put(&url)
					.json(&json!({
						"data": {
							"category1": update.category1,
							"category2": update.category2,
							"images": update.images,
						}
					}))
					.with_auth(&config.api_token)
					.send()
					.await,
			)
			.await
			.map(|Envelope { data }| data)
		}
	}
}

pub mod media {
	use super::*;

	pub use upload::exec as upload;
	pub mod upload {
		use super::*;

		use reqwest::multipart::{Form, Part};

		pub async fn exec(config: &RequestConfig, upload: MediaUpload) -> Result<MediaAsset, Error> {
			let url = config.endpoint("upload");

			debug!(%url, file_name = %upload.file_name, mime = %upload.mime_type, "uploading media");

			let part = Part::bytes(upload.bytes)
				.file_name(upload.file_name)
				.mime_str(&upload.mime_type)
				.map_err(|source| Error::Transport {
					url: url.clone(),
					source,
				})?;

			let assets = read_json::<Vec<MediaAsset>>(
				&url,
				config
					.client
					.post(&url)
					.multipart(Form::new().part("files", part))
					.with_auth(&config.api_token)
					.send()
					.await,
			)
			.await?;

			assets.into_iter().next().ok_or(Error::EmptyUpload { url })
		}
	}
}

pub mod collection {
	use super::*;

	pub use list::exec as list;
	pub mod list {
		use super::*;

		pub async fn exec(config: &RequestConfig, collection: &str) -> Result<Vec<Value>, Error> {
			let url = config.endpoint(collection);

			read_json::<Envelope<Vec<Value>>>(
				&url,
				config
					.client
					.get(&url)
					.with_auth(&config.api_token)
					.send()
					.await,
			)
			.await
			.map(|Envelope { data }| data)
		}
	}

	pub use create::exec as create;
	pub mod create {
		use super::*;

		pub async fn exec(
			config: &RequestConfig,
			collection: &str,
			entry: &Map<String, Value>,
		) -> Result<(), Error> {
			let url = config.endpoint(collection);

			read_json::<Value>(
				&url,
				config
					.client
					.post(&url)
					.json(&json!({ "data": entry }))
					.with_auth(&config.api_token)
					.send()
					.await,
			)
			.await
			.map(|_| ())
		}
	}
}

/// [`Catalog`] backed by a Strapi REST API.
#[derive(Debug, Clone)]
pub struct StrapiCatalog {
	config: RequestConfig,
}

impl StrapiCatalog {
	pub fn new(config: RequestConfig) -> Self {
		Self { config }
	}

	pub fn config(&self) -> &RequestConfig {
		&self.config
	}
}

#[async_trait]
impl Catalog for StrapiCatalog {
	async fn find_destination(
		&self,
		key: &DestinationKey,
	) -> Result<Option<RemoteDestination>, Error> {
		destination::find(&self.config, key).await
	}

	async fn create_destination(
		&self,
		new_destination: &NewDestination,
	) -> Result<RemoteDestination, Error> {
		destination::create(&self.config, new_destination).await
	}

	async fn update_destination(
		&self,
		existing: &RemoteDestination,
		update: &DestinationUpdate,
	) -> Result<RemoteDestination, Error> {
		destination::update(&self.config, existing, update).await
	}

	async fn upload_media(&self, upload: MediaUpload) -> Result<MediaAsset, Error> {
		media::upload(&self.config, upload).await
	}

	async fn list_entries(&self, name: &str) -> Result<Vec<Value>, Error> {
		collection::list(&self.config, name).await
	}

	async fn create_entry(
		&self,
		name: &str,
		entry: &Map<String, Value>,
	) -> Result<(), Error> {
		collection::create(&self.config, name, entry).await
	}
}
