//! In-memory catalog and workspace fixtures shared by the integration tests.

#![allow(dead_code)]

use std::{
	collections::HashMap,
	path::{Path, PathBuf},
	sync::Mutex,
	time::Duration,
};

use async_trait::async_trait;
use chrono::NaiveDate;
use ds_catalog_api::{
	Catalog, DestinationKey, DestinationUpdate, Error, MediaAsset, MediaId, MediaUpload,
	NewDestination, RemoteDestination,
};
use ds_core::{CancellationToken, SyncConfig};
use serde_json::{Map, Value};
use tempfile::TempDir;

pub const HEADER: &str = "category1,category2,country,city,order,image_exists,filepath,updated_at";

/// First id handed out to uploaded media.
pub const FIRST_MEDIA_ID: u64 = 100;

pub fn today() -> NaiveDate {
	NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
	Find(DestinationKey),
	Create(NewDestination),
	Update { id: u64, update: DestinationUpdate },
	Upload(String),
	List(String),
	CreateEntry(String, Map<String, Value>),
}

#[derive(Debug, Default)]
pub(crate) struct State {
	destinations: Vec<RemoteDestination>,
	entries: HashMap<String, Vec<Value>>,
	calls: Vec<Call>,
	next_destination_id: u64,
	next_media_id: u64,
}

/// Behaves like the real backend for the calls the sync makes, with switches to inject failures.
#[derive(Debug, Default)]
pub struct FakeCatalog {
	pub(crate) state: Mutex<State>,
	pub fail_find_for: Option<DestinationKey>,
	pub stall_find: bool,
	pub fail_upload_for: Option<String>,
	pub stall_upload: bool,
	pub fail_writes: bool,
	pub stall_writes: bool,
	pub fail_list: bool,
	pub fail_entry_named: Option<String>,
	/// Cancelled as soon as the first upload arrives.
	pub cancel_on_upload: Option<CancellationToken>,
}

fn server_error(path: &str) -> Error {
	Error::Status {
		url: format!("http://fake/api/{path}"),
		status: 500,
		body: "Internal Server Error".to_string(),
	}
}

impl FakeCatalog {
	pub fn new() -> Self {
		Self::default()
	}

	/// Stores a destination as if it had been created earlier, returning its id.
	pub fn insert(&self, country: &str, city: Option<&str>, images: &[u64]) -> u64 {
		let mut state = self.state.lock().unwrap();
		state.next_destination_id += 1;
		let id = state.next_destination_id;
		state.destinations.push(RemoteDestination {
			id,
			document_id: Some(format!("doc-{id}")),
			country: country.to_string(),
			city: city.map(ToString::to_string),
			category1: Some("beach".to_string()),
			category2: Some("asia".to_string()),
			images: Some(
				images
					.iter()
					.map(|&id| MediaAsset {
						id: MediaId(id),
						name: format!("{id}.png"),
					})
					.collect(),
			),
		});
		id
	}

	pub fn insert_entry(&self, collection: &str, entry: Value) {
		self.state
			.lock()
			.unwrap()
			.entries
			.entry(collection.to_string())
			.or_default()
			.push(entry);
	}

	pub fn destinations(&self) -> Vec<RemoteDestination> {
		self.state.lock().unwrap().destinations.clone()
	}

	pub fn destination(&self, id: u64) -> RemoteDestination {
		self.destinations()
			.into_iter()
			.find(|d| d.id == id)
			.unwrap()
	}

	pub fn entries(&self, collection: &str) -> Vec<Value> {
		self.state
			.lock()
			.unwrap()
			.entries
			.get(collection)
			.cloned()
			.unwrap_or_default()
	}

	pub fn calls(&self) -> Vec<Call> {
		self.state.lock().unwrap().calls.clone()
	}

	fn record(&self, call: Call) {
		self.state.lock().unwrap().calls.push(call);
	}
}

#[async_trait]
impl Catalog for FakeCatalog {
	async fn find_destination(
		&self,
		key: &DestinationKey,
	) -> Result<Option<RemoteDestination>, Error> {
		self.record(Call::Find(key.clone()));

		if self.stall_find {
			std::future::pending::<()>().await;
		}
		if self.fail_find_for.as_ref() == Some(key) {
			return Err(server_error("destinations"));
		}

		Ok(self
			.state
			.lock()
			.unwrap()
			.destinations
			.iter()
			.find(|d| key.matches(&d.country, d.city.as_deref()))
			.cloned())
	}

	async fn create_destination(
		&self,
		new_destination: &NewDestination,
	) -> Result<RemoteDestination, Error> {
		self.record(Call::Create(new_destination.clone()));

		if self.stall_writes {
			std::future::pending::<()>().await;
		}
		if self.fail_writes {
			return Err(server_error("destinations"));
		}

		let mut state = self.state.lock().unwrap();
		state.next_destination_id += 1;
		let created = RemoteDestination {
			id: state.next_destination_id,
			document_id: Some(format!("doc-{}", state.next_destination_id)),
			country: new_destination.key.country.clone(),
			city: new_destination.key.city.clone(),
			category1: Some(new_destination.category1.clone()),
			category2: Some(new_destination.category2.clone()),
			images: Some(
				new_destination
					.images
					.iter()
					.map(|&id| MediaAsset {
						id,
						name: String::new(),
					})
					.collect(),
			),
		};
		state.destinations.push(created.clone());

		Ok(created)
	}

	async fn update_destination(
		&self,
		existing: &RemoteDestination,
		update: &DestinationUpdate,
	) -> Result<RemoteDestination, Error> {
		self.record(Call::Update {
			id: existing.id,
			update: update.clone(),
		});

		if self.stall_writes {
			std::future::pending::<()>().await;
		}
		if self.fail_writes {
			return Err(server_error(&format!(
				"destinations/{}",
				existing.path_segment()
			)));
		}

		let mut state = self.state.lock().unwrap();
		let stored = state
			.destinations
			.iter_mut()
			.find(|d| d.id == existing.id)
			.ok_or_else(|| Error::Status {
				url: format!("http://fake/api/destinations/{}", existing.path_segment()),
				status: 404,
				body: "Not Found".to_string(),
			})?;

		stored.category1 = Some(update.category1.clone());
		stored.category2 = Some(update.category2.clone());
		stored.images = Some(
			update
				.images
				.iter()
				.map(|&id| MediaAsset {
					id,
					name: String::new(),
				})
				.collect(),
		);

		Ok(stored.clone())
	}

	async fn upload_media(&self, upload: MediaUpload) -> Result<MediaAsset, Error> {
		self.record(Call::Upload(upload.file_name.clone()));

		if let Some(token) = &self.cancel_on_upload {
			token.cancel();
		}
		if self.stall_upload {
			std::future::pending::<()>().await;
		}
		if self.fail_upload_for.as_deref() == Some(upload.file_name.as_str()) {
			return Err(Error::Status {
				url: "http://fake/api/upload".to_string(),
				status: 413,
				body: "Payload Too Large".to_string(),
			});
		}

		let mut state = self.state.lock().unwrap();
		let id = FIRST_MEDIA_ID + state.next_media_id;
		state.next_media_id += 1;

		Ok(MediaAsset {
			id: MediaId(id),
			name: upload.file_name,
		})
	}

	async fn list_entries(&self, collection: &str) -> Result<Vec<Value>, Error> {
		self.record(Call::List(collection.to_string()));

		if self.fail_list {
			return Err(server_error(collection));
		}

		Ok(self.entries(collection))
	}

	async fn create_entry(
		&self,
		collection: &str,
		entry: &Map<String, Value>,
	) -> Result<(), Error> {
		self.record(Call::CreateEntry(collection.to_string(), entry.clone()));

		let name = entry.get("name").and_then(Value::as_str);
		if name.is_some() && name == self.fail_entry_named.as_deref() {
			return Err(server_error(collection));
		}

		self.insert_entry(collection, Value::Object(entry.clone()));
		Ok(())
	}
}

/// A temporary data folder holding a manifest, its images and a watermark file location.
pub struct Workspace {
	pub dir: TempDir,
}

impl Workspace {
	pub fn new() -> Self {
		Self {
			dir: tempfile::tempdir().unwrap(),
		}
	}

	pub fn data_folder(&self) -> PathBuf {
		self.dir.path().join("cities")
	}

	pub fn watermark_path(&self) -> PathBuf {
		self.dir.path().join("data/city_updated_at.txt")
	}

	pub fn sync_config(&self) -> SyncConfig {
		SyncConfig {
			manifest_path: self.data_folder().join("cities.csv"),
			image_root: self.data_folder(),
			watermark_path: self.watermark_path(),
			request_timeout: Duration::from_secs(5),
		}
	}

	/// Writes the manifest; each line is appended below the header as given.
	pub async fn write_manifest(&self, lines: &[&str]) {
		let mut contents = format!("{HEADER}\n");
		for line in lines {
			contents.push_str(line);
			contents.push('\n');
		}

		tokio::fs::create_dir_all(self.data_folder()).await.unwrap();
		tokio::fs::write(self.data_folder().join("cities.csv"), contents)
			.await
			.unwrap();
	}

	pub async fn write_image(&self, relative: impl AsRef<Path>) {
		let path = self.data_folder().join(relative);
		tokio::fs::create_dir_all(path.parent().unwrap())
			.await
			.unwrap();
		tokio::fs::write(path, b"\x89PNG\r\n\x1a\n").await.unwrap();
	}

	pub async fn write_watermark(&self, value: &str) {
		tokio::fs::create_dir_all(self.watermark_path().parent().unwrap())
			.await
			.unwrap();
		tokio::fs::write(self.watermark_path(), value).await.unwrap();
	}

	pub async fn read_watermark(&self) -> Option<String> {
		tokio::fs::read_to_string(self.watermark_path()).await.ok()
	}
}
