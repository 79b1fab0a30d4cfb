use std::path::PathBuf;

use thiserror::Error;
use tracing_appender::{non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{
	filter::{LevelFilter, ParseError},
	fmt,
	prelude::*,
	util::TryInitError,
	EnvFilter,
};

const LOG_FILE_PREFIX: &str = "destsync.log";

const CRATES: [&str; 4] = ["ds_core", "ds_catalog_api", "ds_utils", "ds_cli"];

#[derive(Debug, Error)]
pub enum LoggingError {
	#[error("invalid tracing directive: {0}")]
	Directive(#[from] ParseError),
	#[error("failed to install tracing subscriber: {0}")]
	Init(#[from] TryInitError),
	#[error("failed to create log directory '{}': {source}", .path.display())]
	LogDir {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},
}

#[derive(Debug, Clone, Default)]
pub struct LogConfig {
	/// Also write daily rolling log files here.
	pub log_dir: Option<PathBuf>,
	pub verbose: bool,
}

/// `RUST_LOG` directives, with the global `warn` level and our crates' level laid on top.
///
/// A default replaces a `RUST_LOG` directive for the same target, so `RUST_LOG` can only add
/// targets (e.g. `reqwest=debug`), not change the levels set here.
fn env_filter(env_directives: &str, verbose: bool) -> Result<EnvFilter, LoggingError> {
	let level = if verbose { "debug" } else { "info" };

	let mut filter = EnvFilter::new(env_directives).add_directive("warn".parse()?);
	for krate in CRATES {
		filter = filter.add_directive(format!("{krate}={level}").parse()?);
	}

	Ok(filter)
}

/// Installs the global subscriber.
///
/// The returned guard flushes the file writer on drop and has to live as long as the process.
pub fn init(config: &LogConfig) -> Result<Option<WorkerGuard>, LoggingError> {
	let filter = env_filter(
		&std::env::var(EnvFilter::DEFAULT_ENV).unwrap_or_default(),
		config.verbose,
	)?;

	let (file_writer, guard) = match &config.log_dir {
		Some(dir) => {
			std::fs::create_dir_all(dir).map_err(|source| LoggingError::LogDir {
				path: dir.clone(),
				source,
			})?;
			let (writer, guard) =
				tracing_appender::non_blocking(rolling::daily(dir, LOG_FILE_PREFIX));
			(Some(writer), Some(guard))
		}
		None => (None, None),
	};

	tracing_subscriber::registry()
		.with(filter)
		.with(fmt::layer().with_target(false))
		.with(file_writer.map(|writer| {
			fmt::layer()
				.with_writer(writer)
				.with_ansi(false)
				.with_filter(LevelFilter::DEBUG)
		}))
		.try_init()?;

	Ok(guard)
}
