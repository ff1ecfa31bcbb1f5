// src/bin/run_dataset.rs
// Run a single dataset, or a single time-slice of one, outside the full run.

use anyhow::{bail, Context, Result};
use clap::Parser;
use fedscraper::{
    config::Config,
    datasets,
    fetch::HttpFetcher,
    pipeline,
    sink::s3::S3Publisher,
};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
struct Args {
    /// Dataset name: treasury-full-extract, treasury-fiscal-interest,
    /// natl-poverty or small-area-poverty
    #[arg(long)]
    dataset: String,

    /// Optional slice id (a year, or "page-N" for the full extract)
    #[arg(long)]
    slice: Option<String>,

    /// Skip the publish step even if a bucket is configured
    #[arg(long)]
    no_publish: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = Config::from_env();

    let dataset = datasets::all(&config)
        .into_iter()
        .find(|d| d.name == args.dataset)
        .with_context(|| format!("unknown dataset `{}`", args.dataset))?;

    let fetcher = HttpFetcher::new()?;
    let publisher = match (&config.s3_bucket, args.no_publish) {
        (Some(bucket), false) => Some(S3Publisher::new(bucket.clone()).await),
        _ => None,
    };

    match args.slice {
        Some(id) => {
            let slice = dataset
                .slices
                .iter()
                .find(|s| s.id == id)
                .with_context(|| format!("dataset `{}` has no slice `{id}`", dataset.name))?;
            let out_dir = config.data_dir.join(dataset.subdir);
            let path = pipeline::run_slice(&fetcher, &dataset, slice, &out_dir, publisher.as_ref())
                .await
                .with_context(|| format!("slice {} of {}", slice.id, dataset.name))?;
            info!(path = %path.display(), "slice complete");
        }
        None => {
            let summary =
                pipeline::run_dataset(&fetcher, &dataset, &config, publisher.as_ref()).await;
            info!(
                succeeded = summary.succeeded(),
                failed = summary.failed(),
                skipped = summary.skipped.len(),
                "run finished"
            );
            if summary.failed() > 0 {
                bail!("{} time-slice(s) failed", summary.failed());
            }
        }
    }

    Ok(())
}
