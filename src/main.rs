use anyhow::Result;
use fedscraper::{
    config::Config,
    datasets,
    fetch::HttpFetcher,
    pipeline::{self, RunSummary},
    sink::s3::S3Publisher,
};
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();
    info!("startup");

    // ─── 2) load config ──────────────────────────────────────────────
    let config = Config::from_env();
    info!(
        data_dir = %config.data_dir.display(),
        bucket = ?config.s3_bucket,
        max_concurrent = config.max_concurrent_slices,
        "configuration"
    );

    // ─── 3) build fetcher + optional publisher ───────────────────────
    let fetcher = HttpFetcher::new()?;
    let publisher = match &config.s3_bucket {
        Some(bucket) => Some(S3Publisher::new(bucket.clone()).await),
        None => {
            info!("no bucket configured; publishing disabled");
            None
        }
    };

    // ─── 4) run every dataset, collecting summaries ──────────────────
    let mut summaries: Vec<RunSummary> = Vec::new();
    for dataset in datasets::all(&config) {
        info!(dataset = dataset.name, slices = dataset.slices.len(), "running dataset");
        let summary = pipeline::run_dataset(&fetcher, &dataset, &config, publisher.as_ref()).await;
        summaries.push(summary);
    }

    // ─── 5) end-of-run failure report ────────────────────────────────
    let mut failed = 0;
    for summary in &summaries {
        for failure in &summary.failures {
            error!(
                dataset = %summary.dataset,
                slice = %failure.slice,
                url = %failure.url,
                error = %failure.error,
                "slice failed"
            );
        }
        failed += summary.failed();
        info!(
            dataset = %summary.dataset,
            succeeded = summary.succeeded(),
            failed = summary.failed(),
            skipped = summary.skipped.len(),
            "dataset summary"
        );
    }

    if failed > 0 {
        anyhow::bail!("{failed} time-slice(s) failed; see log for details");
    }
    info!("all done");
    Ok(())
}
