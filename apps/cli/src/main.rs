use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use ds_catalog_api::StrapiCatalog;
use ds_core::{
	app,
	logging::{self, LogConfig},
	AppConfig, CancellationToken, RowOutcome, SyncReport,
};
use tracing::{error, warn};

mod args;

use args::Cli;

#[tokio::main]
async fn main() -> ExitCode {
	let cli = Cli::parse();

	let config = match load_config(&cli).await {
		Ok(config) => config,
		Err(e) => {
			eprintln!("error: {e:#}");
			return ExitCode::FAILURE;
		}
	};

	let _guard = match logging::init(&LogConfig {
		log_dir: config.log_dir.clone(),
		verbose: cli.verbose,
	}) {
		Ok(guard) => guard,
		Err(e) => {
			eprintln!("error: {e:#}");
			return ExitCode::FAILURE;
		}
	};

	match run(&cli, config).await {
		Ok(()) => ExitCode::SUCCESS,
		Err(e) => {
			error!("{e:#}");
			ExitCode::FAILURE
		}
	}
}

async fn load_config(cli: &Cli) -> Result<AppConfig> {
	let file = match &cli.config {
		Some(path) => AppConfig::load_from(path).await?,
		None => AppConfig::default(),
	};

	Ok(cli.apply(file))
}

async fn run(cli: &Cli, config: AppConfig) -> Result<()> {
	let catalog = StrapiCatalog::new(
		config
			.request_config()
			.context("invalid backend configuration")?,
	);

	let cancel = CancellationToken::new();
	tokio::spawn({
		let cancel = cancel.clone();
		async move {
			if tokio::signal::ctrl_c().await.is_ok() {
				warn!("interrupt received, stopping after the current row");
				cancel.cancel();
			}
		}
	});

	let outcome = app::run(catalog, &config, cli.stages(), &cancel)
		.await
		.context("destination sync failed")?;

	if let Some(report) = &outcome.sync {
		print_summary(report);
	}

	Ok(())
}

fn print_summary(report: &SyncReport) {
	if report.manifest_missing {
		println!("No manifest found, nothing to sync.");
		return;
	}

	for row in &report.rows {
		let status = match &row.outcome {
			RowOutcome::Created { id, image } => format!("created #{id} with image {image}"),
			RowOutcome::Updated { id, images } => format!("updated #{id} ({} images)", images.len()),
			RowOutcome::Skipped { reason } => format!("skipped: {reason}"),
			RowOutcome::Failed { reason } => format!("FAILED: {reason}"),
		};
		println!("{:<32} {:<40} {status}", row.key.to_string(), row.filepath);
	}

	println!(
		"created: {}, updated: {}, skipped: {}, failed: {}",
		report.created(),
		report.updated(),
		report.skipped(),
		report.failed()
	);

	match (&report.watermark_after, report.cancelled) {
		(_, true) => println!(
			"Cancelled; watermark stays at {}.",
			report.watermark_before
		),
		(Some(after), false) => println!("Watermark: {} -> {after}", report.watermark_before),
		(None, false) => println!(
			"Nothing newer than {}.",
			report.watermark_before
		),
	}
}
