//! Application configuration

use std::{
	path::{Path, PathBuf},
	str::FromStr,
	time::Duration,
};

use ds_catalog_api::RequestConfig;
use ds_utils::{error::FileIOError, non_blank};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

pub const DEFAULT_API_URL: &str = "http://localhost:1337";
pub const DEFAULT_MANIFEST_NAME: &str = "cities.csv";
pub const DEFAULT_WATERMARK_PATH: &str = "data/city_updated_at.txt";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("an api token is required (STRAPI_API_TOKEN)")]
	MissingCredential,
	#[error("invalid api url '{url}': {reason}")]
	InvalidUrl { url: String, reason: String },
	#[error("request timeout must be greater than zero")]
	ZeroTimeout,
	#[error("invalid seed '{0}', expected <collection>=<csv path>")]
	InvalidSeed(String),
	#[error("failed to read config file: {0}")]
	Read(#[from] FileIOError),
	#[error("failed to parse config file '{}': {source}", .path.display())]
	Parse {
		path: PathBuf,
		#[source]
		source: toml::de::Error,
	},
	#[error("failed to build http client: {0}")]
	Client(#[source] ds_catalog_api::Error),
}

/// A lookup collection to fill from a CSV file when it is empty remotely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedSpec {
	pub collection: String,
	pub csv: PathBuf,
}

impl FromStr for SeedSpec {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let (collection, csv) = s
			.split_once('=')
			.ok_or_else(|| ConfigError::InvalidSeed(s.to_string()))?;

		match (non_blank(collection), non_blank(csv)) {
			(Some(collection), Some(csv)) => Ok(Self {
				collection: collection.trim_matches('/').to_string(),
				csv: PathBuf::from(csv),
			}),
			_ => Err(ConfigError::InvalidSeed(s.to_string())),
		}
	}
}

/// Every runtime setting, gathered in one place by the binary and handed down explicitly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
	pub api_url: String,
	pub api_token: Option<String>,
	/// Folder holding the manifest and the images it references.
	pub data_folder: Option<PathBuf>,
	pub manifest_name: String,
	pub watermark_path: PathBuf,
	pub request_timeout_secs: u64,
	pub seeds: Vec<SeedSpec>,
	pub log_dir: Option<PathBuf>,
}

impl Default for AppConfig {
	fn default() -> Self {
		Self {
			api_url: DEFAULT_API_URL.to_string(),
			api_token: None,
			data_folder: None,
			manifest_name: DEFAULT_MANIFEST_NAME.to_string(),
			watermark_path: PathBuf::from(DEFAULT_WATERMARK_PATH),
			request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
			seeds: Vec::new(),
			log_dir: None,
		}
	}
}

impl AppConfig {
	/// Loads a TOML config file. Fields it leaves out keep their defaults.
	pub async fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let path = path.as_ref();

		let contents = tokio::fs::read_to_string(path)
			.await
			.map_err(|e| FileIOError::with_context(path, e, "reading config"))?;

		let config = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
			path: path.to_path_buf(),
			source,
		})?;

		info!(path = %path.display(), "loaded config");

		Ok(config)
	}

	pub fn request_timeout(&self) -> Duration {
		Duration::from_secs(self.request_timeout_secs)
	}

	/// Validates credentials, URL and timeout, and builds the HTTP settings for the catalog.
	pub fn request_config(&self) -> Result<RequestConfig, ConfigError> {
		if self.request_timeout_secs == 0 {
			return Err(ConfigError::ZeroTimeout);
		}

		RequestConfig::new(
			&self.api_url,
			self.api_token.as_deref(),
			self.request_timeout(),
		)
		.map_err(|e| match e {
			ds_catalog_api::Error::MissingCredential => ConfigError::MissingCredential,
			ds_catalog_api::Error::InvalidUrl { url, reason } => {
				ConfigError::InvalidUrl { url, reason }
			}
			other => ConfigError::Client(other),
		})
	}

	/// Settings for the destination sync, or `None` when no data folder is configured.
	pub fn sync_config(&self) -> Option<SyncConfig> {
		self.data_folder.as_ref().map(|folder| SyncConfig {
			manifest_path: folder.join(&self.manifest_name),
			image_root: folder.clone(),
			watermark_path: self.watermark_path.clone(),
			request_timeout: self.request_timeout(),
		})
	}
}

/// What the sync engine needs to know about its environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
	pub manifest_path: PathBuf,
	/// Manifest `filepath` values are relative to this directory.
	pub image_root: PathBuf,
	pub watermark_path: PathBuf,
	/// Budget for each individual remote call.
	pub request_timeout: Duration,
}
