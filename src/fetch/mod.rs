// src/fetch/mod.rs

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tokio::time::sleep;
use tracing::{debug, error, warn};

use crate::error::PipelineError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_RETRIES: u32 = 3;
const INITIAL_BACKOFF_MS: u64 = 500;

/// Seam between the pipeline driver and the network, so driver logic can be
/// exercised with a stub fetcher in tests.
#[async_trait]
pub trait Fetch: Send + Sync {
    /// GET `url` and decode the body as JSON.
    async fn fetch_json(&self, url: &str) -> Result<Value, PipelineError>;
}

/// Production fetcher: one shared `reqwest::Client` with a request timeout,
/// bounded retries with exponential backoff on transient failures.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
    max_retries: u32,
    initial_backoff_ms: u64,
}

enum GetError {
    /// Worth another attempt: transport failure, 429 or 5xx.
    Transient(String),
    /// Terminal for this slice: 4xx or an empty body.
    Empty,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("building http client")?;
        Ok(HttpFetcher {
            client,
            max_retries: MAX_RETRIES,
            initial_backoff_ms: INITIAL_BACKOFF_MS,
        })
    }

    async fn get_bytes(&self, url: &str) -> Result<Vec<u8>, GetError> {
        debug!(%url, "fetching");
        let resp = match self.client.get(url).send().await {
            Ok(resp) => resp,
            Err(e) => return Err(GetError::Transient(e.to_string())),
        };

        let status = resp.status();
        if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
            return Err(GetError::Transient(format!("HTTP {status}")));
        }
        if !status.is_success() {
            warn!(%url, %status, "non-success response");
            return Err(GetError::Empty);
        }

        match resp.bytes().await {
            Ok(bytes) if bytes.is_empty() => Err(GetError::Empty),
            Ok(bytes) => Ok(bytes.to_vec()),
            Err(e) => Err(GetError::Transient(e.to_string())),
        }
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn fetch_json(&self, url: &str) -> Result<Value, PipelineError> {
        let mut attempts = 0;
        loop {
            match self.get_bytes(url).await {
                Ok(body) => return decode_payload(url, &body),
                Err(GetError::Transient(reason)) if attempts < self.max_retries => {
                    attempts += 1;
                    let backoff = self.initial_backoff_ms * 2u64.pow(attempts - 1);
                    warn!(%url, attempt = attempts, delay_ms = backoff, %reason, "retrying");
                    sleep(Duration::from_millis(backoff)).await;
                }
                Err(GetError::Transient(reason)) => {
                    error!(%url, %reason, "exhausted retries");
                    return Err(PipelineError::EmptyResponse {
                        url: url.to_string(),
                    });
                }
                Err(GetError::Empty) => {
                    return Err(PipelineError::EmptyResponse {
                        url: url.to_string(),
                    })
                }
            }
        }
    }
}

/// Decode a response body as JSON. Factored out of the network path so the
/// empty/malformed contract is testable without a server.
pub(crate) fn decode_payload(url: &str, body: &[u8]) -> Result<Value, PipelineError> {
    if body.is_empty() {
        return Err(PipelineError::EmptyResponse {
            url: url.to_string(),
        });
    }
    serde_json::from_slice(body).map_err(|source| PipelineError::MalformedPayload {
        url: url.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_body_is_an_empty_response() {
        let err = decode_payload("http://example.test/t", b"").unwrap_err();
        assert!(matches!(err, PipelineError::EmptyResponse { .. }));
    }

    #[test]
    fn invalid_json_is_malformed() {
        let err = decode_payload("http://example.test/t", b"<html>oops</html>").unwrap_err();
        match err {
            PipelineError::MalformedPayload { url, .. } => {
                assert_eq!(url, "http://example.test/t");
            }
            other => panic!("expected MalformedPayload, got {other:?}"),
        }
    }

    #[test]
    fn valid_json_decodes() {
        let value = decode_payload("http://example.test/t", br#"{"data":[]}"#).unwrap();
        assert!(value.get("data").is_some());
    }
}
