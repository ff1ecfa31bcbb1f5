// src/pipeline/mod.rs

use std::path::{Path, PathBuf};

use futures::{stream::FuturesUnordered, StreamExt};
use tracing::{error, info, instrument, warn};

use crate::config::Config;
use crate::error::PipelineError;
use crate::fetch::Fetch;
use crate::sink::{self, s3::S3Publisher};
use crate::transform::{self, FieldSpec};

/// One bounded unit of extraction: a page or a calendar year.
#[derive(Debug, Clone)]
pub struct Slice {
    /// Short identifier used in logs and run summaries ("2016", "page-1").
    pub id: String,
    pub url: String,
    /// Output filename within the dataset's directory.
    pub filename: String,
}

/// A named pipeline definition: where the data comes from, how it is
/// projected, and where the output goes.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub name: &'static str,
    /// Subdirectory of the data dir holding this dataset's CSVs.
    pub subdir: &'static str,
    /// Key prefix for published objects.
    pub key_prefix: &'static str,
    /// Whether finished CSVs are pushed to object storage.
    pub publish: bool,
    pub spec: FieldSpec,
    pub slices: Vec<Slice>,
}

/// One failed time-slice, with enough context for operator diagnosis.
#[derive(Debug)]
pub struct SliceFailure {
    pub slice: String,
    pub url: String,
    pub error: PipelineError,
}

/// Outcome of a whole dataset run. No failure is silently swallowed: every
/// failed slice is carried here and reported by the caller.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub dataset: String,
    pub written: Vec<PathBuf>,
    pub failures: Vec<SliceFailure>,
    /// Slices never launched because the failure threshold was reached.
    pub skipped: Vec<String>,
}

impl RunSummary {
    pub fn succeeded(&self) -> usize {
        self.written.len()
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }
}

/// Run Fetch → Map → Write → [Publish] for a single time-slice and return
/// the output path.
///
/// Any stage error fails only this slice. A publish failure still leaves the
/// local CSV behind for inspection or a later retry.
#[instrument(level = "info", skip_all, fields(dataset = dataset.name, slice = %slice.id))]
pub async fn run_slice(
    fetcher: &dyn Fetch,
    dataset: &Dataset,
    slice: &Slice,
    out_dir: &Path,
    publisher: Option<&S3Publisher>,
) -> Result<PathBuf, PipelineError> {
    let payload = fetcher.fetch_json(&slice.url).await?;
    let records = transform::project_records(&payload, &dataset.spec)?;
    info!(rows = records.len(), "projected records");

    let path = out_dir.join(&slice.filename);
    sink::write_csv(&dataset.spec.headers(), &records, &path)?;

    if dataset.publish {
        if let Some(publisher) = publisher {
            publisher.publish(&path, dataset.key_prefix).await?;
        }
    }

    Ok(path)
}

/// Run every slice of `dataset`, isolating per-slice failures.
///
/// At most `max_concurrent_slices` fetches are in flight at once. Once
/// `failure_threshold` slices have failed, no further slices launch; the
/// remainder are reported as skipped. In-flight slices always drain.
#[instrument(level = "info", skip_all, fields(dataset = dataset.name))]
pub async fn run_dataset(
    fetcher: &dyn Fetch,
    dataset: &Dataset,
    config: &Config,
    publisher: Option<&S3Publisher>,
) -> RunSummary {
    let out_dir = config.data_dir.join(dataset.subdir);
    let mut summary = RunSummary {
        dataset: dataset.name.to_string(),
        ..Default::default()
    };

    let mut pending = dataset.slices.iter();
    let mut in_flight = FuturesUnordered::new();

    loop {
        while in_flight.len() < config.max_concurrent_slices.max(1)
            && summary.failed() < config.failure_threshold
        {
            let Some(slice) = pending.next() else { break };
            let dir = out_dir.as_path();
            in_flight.push(async move {
                (slice, run_slice(fetcher, dataset, slice, dir, publisher).await)
            });
        }

        let Some((slice, result)) = in_flight.next().await else {
            break;
        };
        match result {
            Ok(path) => {
                info!(slice = %slice.id, path = %path.display(), "slice complete");
                summary.written.push(path);
            }
            Err(error) => {
                error!(slice = %slice.id, url = %slice.url, %error, "slice failed");
                summary.failures.push(SliceFailure {
                    slice: slice.id.clone(),
                    url: slice.url.clone(),
                    error,
                });
            }
        }
    }

    if summary.failed() >= config.failure_threshold {
        summary.skipped = pending.map(|s| s.id.clone()).collect();
        if !summary.skipped.is_empty() {
            warn!(
                skipped = summary.skipped.len(),
                "failure threshold reached; remaining slices skipped"
            );
        }
    }

    info!(
        succeeded = summary.succeeded(),
        failed = summary.failed(),
        skipped = summary.skipped.len(),
        "dataset run finished"
    );
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::{FieldMapping, PayloadShape, SourceField};
    use async_trait::async_trait;
    use serde_json::{json, Value};

    /// Succeeds with a one-record payload unless the URL contains "fail".
    struct StubFetcher;

    #[async_trait]
    impl Fetch for StubFetcher {
        async fn fetch_json(&self, url: &str) -> Result<Value, PipelineError> {
            if url.contains("fail") {
                return Err(PipelineError::EmptyResponse {
                    url: url.to_string(),
                });
            }
            Ok(json!({"data": [{"record_date": "2020-01-01", "state_nm": "CA"}]}))
        }
    }

    fn test_dataset(urls: &[&str]) -> Dataset {
        let slices = urls
            .iter()
            .enumerate()
            .map(|(i, url)| Slice {
                id: format!("slice-{i}"),
                url: (*url).to_string(),
                filename: format!("out_{i}.csv"),
            })
            .collect();
        Dataset {
            name: "test-dataset",
            subdir: "test-data",
            key_prefix: "test-prefix",
            publish: false,
            spec: FieldSpec {
                shape: PayloadShape::DataKey("data"),
                fields: vec![
                    FieldMapping {
                        source: SourceField::Key("record_date"),
                        output: "Record Date",
                    },
                    FieldMapping {
                        source: SourceField::Key("state_nm"),
                        output: "State",
                    },
                ],
                recode: None,
            },
            slices,
        }
    }

    fn test_config(data_dir: &Path) -> Config {
        Config {
            data_dir: data_dir.to_path_buf(),
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn one_failing_slice_does_not_abort_the_others() {
        let dir = tempfile::tempdir().unwrap();
        let urls = [
            "http://t/1", "http://t/2", "http://t/3", "http://t/fail",
            "http://t/5", "http://t/6", "http://t/7",
        ];
        let dataset = test_dataset(&urls);
        let config = test_config(dir.path());

        let summary = run_dataset(&StubFetcher, &dataset, &config, None).await;

        assert_eq!(summary.succeeded(), 6);
        assert_eq!(summary.failed(), 1);
        assert!(summary.skipped.is_empty());
        assert_eq!(summary.failures[0].slice, "slice-3");
        assert_eq!(summary.failures[0].url, "http://t/fail");
        for path in &summary.written {
            assert!(path.is_file(), "{} should exist", path.display());
        }
    }

    #[tokio::test]
    async fn failed_fetch_writes_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let dataset = test_dataset(&["http://t/fail"]);
        let config = test_config(dir.path());

        let summary = run_dataset(&StubFetcher, &dataset, &config, None).await;

        assert_eq!(summary.succeeded(), 0);
        assert_eq!(summary.failed(), 1);
        assert!(!dir.path().join("test-data/out_0.csv").exists());
    }

    #[tokio::test]
    async fn failure_threshold_skips_remaining_slices() {
        let dir = tempfile::tempdir().unwrap();
        let urls = ["http://t/fail1", "http://t/fail2", "http://t/3", "http://t/4"];
        let dataset = test_dataset(&urls);
        let mut config = test_config(dir.path());
        config.max_concurrent_slices = 1;
        config.failure_threshold = 1;

        let summary = run_dataset(&StubFetcher, &dataset, &config, None).await;

        assert_eq!(summary.failed(), 1);
        assert_eq!(summary.succeeded(), 0);
        assert_eq!(summary.skipped, vec!["slice-1", "slice-2", "slice-3"]);
    }

    #[tokio::test]
    async fn run_slice_writes_projected_csv() {
        let dir = tempfile::tempdir().unwrap();
        let dataset = test_dataset(&["http://t/1"]);

        let path = run_slice(&StubFetcher, &dataset, &dataset.slices[0], dir.path(), None)
            .await
            .unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        assert_eq!(
            reader.headers().unwrap(),
            &csv::StringRecord::from(vec!["Record Date", "State"])
        );
        let rows: Vec<_> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(&rows[0], &csv::StringRecord::from(vec!["2020-01-01", "CA"]));
    }
}
