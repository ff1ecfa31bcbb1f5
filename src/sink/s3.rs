// src/sink/s3.rs

use std::path::Path;

use aws_config::BehaviorVersion;
use aws_sdk_s3::{primitives::ByteStream, Client};
use tracing::info;

use crate::error::PipelineError;

/// Publishes finished CSV files to one S3 bucket.
pub struct S3Publisher {
    client: Client,
    bucket: String,
}

impl S3Publisher {
    /// Build a publisher from the SDK default credential chain.
    pub async fn new(bucket: impl Into<String>) -> Self {
        let config = aws_config::load_defaults(BehaviorVersion::latest()).await;
        S3Publisher {
            client: Client::new(&config),
            bucket: bucket.into(),
        }
    }

    /// Upload the file at `local_path` under `{key_prefix}/{basename}` and
    /// return the object key. The local file is left in place whether or not
    /// the upload succeeds.
    pub async fn publish(
        &self,
        local_path: &Path,
        key_prefix: &str,
    ) -> Result<String, PipelineError> {
        let filename = local_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let key = format!("{}/{}", key_prefix.trim_end_matches('/'), filename);

        let body = ByteStream::from_path(local_path)
            .await
            .map_err(|e| PipelineError::Upload {
                key: key.clone(),
                source: Box::new(e),
            })?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(body)
            .send()
            .await
            .map_err(|e| PipelineError::Upload {
                key: key.clone(),
                source: Box::new(e),
            })?;

        info!(bucket = %self.bucket, key = %key, "uploaded csv");
        Ok(key)
    }
}
