//!
//! # Destination Sync
//!
//! Incrementally pushes a CSV manifest of destinations (a country, optionally a city, two category
//! tags and one image per row) into the content backend.
//!
//! A run goes through the following stages:
//! - read the watermark left behind by the previous successful run;
//! - parse the manifest and keep only the rows that are complete, flagged as having an image and
//!   updated after the watermark;
//! - make sure every image those rows point to is present, before touching the backend at all;
//! - for every row, in file order: look the destination up, upload the image, then create the
//!   destination or merge the image into its existing slot list;
//! - advance the watermark once the whole batch went through.
//!
//! Row level failures (an upload or a write rejected by the backend) are reported in the returned
//! [`SyncReport`] and never stop the batch.

#![warn(
	clippy::all,
	clippy::pedantic,
	clippy::correctness,
	clippy::perf,
	clippy::style,
	clippy::suspicious,
	clippy::complexity,
	clippy::nursery,
	clippy::unwrap_used,
	unused_qualifications,
	rust_2018_idioms,
	trivial_casts,
	trivial_numeric_casts,
	unused_allocation,
	clippy::dbg_macro,
	deprecated
)]
#![allow(clippy::missing_errors_doc, clippy::module_name_repetitions)]

pub mod app;
pub mod config;
pub mod engine;
mod error;
pub mod guard;
pub mod logging;
pub mod manifest;
pub mod seed;
pub mod watermark;

pub use app::{RunOutcome, Stages};
pub use config::{AppConfig, ConfigError, SeedSpec, SyncConfig};
pub use engine::{RowOutcome, RowReport, SyncEngine, SyncReport};
pub use error::SyncError;
pub use manifest::{ManifestError, ManifestRow};
pub use seed::{seed_collection, SeedReport};
pub use watermark::{Watermark, WatermarkError, WatermarkStore, DEFAULT_WATERMARK};

pub use tokio_util::sync::CancellationToken;
