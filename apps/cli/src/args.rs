use std::path::PathBuf;

use clap::{Parser, Subcommand};
use ds_core::{AppConfig, SeedSpec, Stages};

#[derive(Parser, Debug)]
#[command(
	name = "destsync",
	about = "Pushes new and changed destinations from a CSV manifest to the content backend"
)]
pub struct Cli {
	/// TOML file with default settings; flags and environment take precedence
	#[arg(long)]
	pub config: Option<PathBuf>,

	/// Base URL of the content backend
	#[arg(long, env = "STRAPI_URL")]
	pub api_url: Option<String>,

	/// API token sent as a bearer credential
	#[arg(long, env = "STRAPI_API_TOKEN", hide_env_values = true)]
	pub api_token: Option<String>,

	/// Folder holding the manifest and the images it references
	#[arg(long, env = "CITY_DATA_FOLDER")]
	pub data_folder: Option<PathBuf>,

	/// Manifest file name inside the data folder
	#[arg(long)]
	pub manifest: Option<String>,

	/// Where the last processed update date is kept
	#[arg(long)]
	pub watermark_file: Option<PathBuf>,

	/// Budget for each remote call, in seconds
	#[arg(long)]
	pub timeout_secs: Option<u64>,

	/// Lookup collection to fill when empty, as <collection>=<csv path>
	#[arg(long = "seed", value_name = "COLLECTION=CSV")]
	pub seeds: Vec<SeedSpec>,

	/// Also write daily log files to this directory
	#[arg(long)]
	pub log_dir: Option<PathBuf>,

	/// Debug output for destsync's own crates
	#[arg(short, long, default_value_t = false)]
	pub verbose: bool,

	#[command(subcommand)]
	pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
	/// Only run the destination sync
	Sync,
	/// Only fill the lookup collections
	Seed,
}

impl Cli {
	pub fn stages(&self) -> Stages {
		Stages {
			seeds: self.command != Some(Command::Sync),
			sync: self.command != Some(Command::Seed),
		}
	}

	/// Lays the values given on the command line or in the environment over `config`.
	pub fn apply(&self, mut config: AppConfig) -> AppConfig {
		if let Some(api_url) = &self.api_url {
			config.api_url = api_url.clone();
		}
		if let Some(api_token) = &self.api_token {
			config.api_token = Some(api_token.clone());
		}
		if let Some(data_folder) = &self.data_folder {
			config.data_folder = Some(data_folder.clone());
		}
		if let Some(manifest) = &self.manifest {
			config.manifest_name = manifest.clone();
		}
		if let Some(watermark_file) = &self.watermark_file {
			config.watermark_path = watermark_file.clone();
		}
		if let Some(timeout_secs) = self.timeout_secs {
			config.request_timeout_secs = timeout_secs;
		}
		if !self.seeds.is_empty() {
			config.seeds = self.seeds.clone();
		}
		if let Some(log_dir) = &self.log_dir {
			config.log_dir = Some(log_dir.clone());
		}

		config
	}
}
