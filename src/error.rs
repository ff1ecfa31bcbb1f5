// src/error.rs

use std::fmt;
use std::path::PathBuf;

/// Everything that can go wrong while running one time-slice.
///
/// Fetch and transform errors abort only the slice that raised them. An
/// `Upload` failure aborts only the publish step; the local CSV stays on
/// disk.
#[derive(Debug)]
pub enum PipelineError {
    /// The upstream API returned nothing usable (non-2xx or empty body).
    EmptyResponse { url: String },
    /// The response body was not valid JSON.
    MalformedPayload {
        url: String,
        source: serde_json::Error,
    },
    /// A configured source field was missing from a payload element.
    SchemaMismatch { field: String, row: usize },
    /// Local CSV write failure.
    Io { path: PathBuf, source: csv::Error },
    /// Remote publish failure, carrying the underlying transport/auth error.
    Upload {
        key: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::EmptyResponse { url } => write!(f, "no data fetched from {url}"),
            PipelineError::MalformedPayload { url, .. } => {
                write!(f, "response from {url} is not valid JSON")
            }
            PipelineError::SchemaMismatch { field, row } => {
                write!(f, "source field `{field}` missing from record {row}")
            }
            PipelineError::Io { path, .. } => write!(f, "failed to write {}", path.display()),
            PipelineError::Upload { key, .. } => write!(f, "failed to upload object {key}"),
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PipelineError::MalformedPayload { source, .. } => Some(source),
            PipelineError::Io { source, .. } => Some(source),
            PipelineError::Upload { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}
