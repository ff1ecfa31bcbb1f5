// src/config.rs

use std::env;
use std::path::PathBuf;

/// Runtime configuration, read once at process start.
///
/// AWS credentials are deliberately absent: the S3 client is built from the
/// SDK's default credential chain, so this struct only carries what the
/// pipelines themselves need.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root directory for local CSV output; one subdirectory per dataset.
    pub data_dir: PathBuf,
    /// Target bucket for publishing. Publishing is skipped entirely when unset.
    pub s3_bucket: Option<String>,
    /// Census API key, appended to Census request URLs when present.
    pub census_key: Option<String>,
    /// Maximum number of time-slices in flight per dataset run.
    pub max_concurrent_slices: usize,
    /// Stop launching new slices once this many have failed.
    pub failure_threshold: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data_dir: PathBuf::from("data"),
            s3_bucket: None,
            census_key: None,
            max_concurrent_slices: 3,
            failure_threshold: 3,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Config::default();
        Config {
            data_dir: env::var("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            s3_bucket: env::var("S3_BUCKET").ok().filter(|b| !b.is_empty()),
            census_key: env::var("CENSUS_KEY").ok().filter(|k| !k.is_empty()),
            max_concurrent_slices: env::var("MAX_CONCURRENT_SLICES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_concurrent_slices),
            failure_threshold: env::var("FAILURE_THRESHOLD")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.failure_threshold),
        }
    }
}
