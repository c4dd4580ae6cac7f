//! Client for the remote hold-scoring service.
//!
//! The HTTP stack lives behind [`ScoringTransport`] so the retry policy in
//! [`ScoringClient`] can be exercised against scripted responses without a
//! network or a running service.

use std::thread;
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use log::{debug, warn};
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use thiserror::Error;

use crate::prediction::{parse_predictions, RawPrediction};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Errors produced while talking to the scoring service.
#[derive(Debug, Error)]
pub enum DetectionApiError {
    /// The service answered with a status the client will not retry past.
    #[error("scoring service returned status {status}: {body}")]
    Status { status: u16, body: String },
    /// The request never completed (connect failure, timeout, TLS, ...).
    #[error("scoring request failed")]
    Transport(#[from] reqwest::Error),
    /// The service answered with success but the body was not prediction JSON.
    #[error("scoring response could not be decoded")]
    Decode(#[from] serde_json::Error),
}

/// Raw status and body of one scoring call, before retry handling.
#[derive(Debug, Clone)]
pub struct ScoringResponse {
    pub status: u16,
    pub body: String,
}

/// Seam between the retry policy and the actual wire protocol.
pub trait ScoringTransport {
    /// Submit one JPEG-encoded tile and return the service's raw response.
    fn send(
        &self,
        tile_jpeg: &[u8],
        confidence_percent: u32,
    ) -> Result<ScoringResponse, DetectionApiError>;
}

impl<T: ScoringTransport + ?Sized> ScoringTransport for &T {
    fn send(
        &self,
        tile_jpeg: &[u8],
        confidence_percent: u32,
    ) -> Result<ScoringResponse, DetectionApiError> {
        (**self).send(tile_jpeg, confidence_percent)
    }
}

/// Production transport: POSTs base64 JPEG bytes to the scoring endpoint.
pub struct HttpTransport {
    endpoint: String,
    api_key: String,
    client: Client,
}

impl HttpTransport {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self, DetectionApiError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            client,
        })
    }
}

impl ScoringTransport for HttpTransport {
    fn send(
        &self,
        tile_jpeg: &[u8],
        confidence_percent: u32,
    ) -> Result<ScoringResponse, DetectionApiError> {
        let encoded = BASE64.encode(tile_jpeg);
        let confidence = confidence_percent.to_string();
        debug!(
            "posting {} base64 bytes to scoring service (confidence {confidence})",
            encoded.len()
        );
        let response = self
            .client
            .post(&self.endpoint)
            .query(&[
                ("api_key", self.api_key.as_str()),
                ("confidence", confidence.as_str()),
            ])
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(encoded)
            .send()?;
        let status = response.status().as_u16();
        let body = response.text()?;
        Ok(ScoringResponse { status, body })
    }
}

/// Delay before retry number `attempt + 1`: 1s, 2s, 4s, ...
fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_secs(1u64 << attempt.min(63))
}

/// Submits tiles to the scoring service, retrying server-side failures.
///
/// Up to `max_retries` attempts are made per tile. A 5xx answer is retried
/// with exponential backoff; any other non-success status fails immediately
/// with [`DetectionApiError::Status`]. A success with no detections is an
/// empty prediction list, not an error.
pub struct ScoringClient<T> {
    transport: T,
    max_retries: u32,
    sleeper: fn(Duration),
}

impl<T: ScoringTransport> ScoringClient<T> {
    pub fn new(transport: T, max_retries: u32) -> Self {
        Self {
            transport,
            max_retries,
            sleeper: thread::sleep,
        }
    }

    /// Like [`ScoringClient::new`] but with backoff sleeps replaced, so retry
    /// tests finish instantly.
    #[cfg(test)]
    pub(crate) fn with_sleeper(transport: T, max_retries: u32, sleeper: fn(Duration)) -> Self {
        Self {
            transport,
            max_retries,
            sleeper,
        }
    }

    /// Score one tile, returning its predictions in tile-local pixel space.
    pub fn detect(
        &self,
        tile_jpeg: &[u8],
        confidence_percent: u32,
    ) -> Result<Vec<RawPrediction>, DetectionApiError> {
        for attempt in 0..self.max_retries {
            let response = self.transport.send(tile_jpeg, confidence_percent)?;
            if (200..300).contains(&response.status) {
                return Ok(parse_predictions(&response.body)?);
            }
            if response.status >= 500 && attempt + 1 < self.max_retries {
                let delay = backoff_delay(attempt);
                warn!(
                    "scoring service returned {}, retrying in {delay:?} (attempt {}/{})",
                    response.status,
                    attempt + 1,
                    self.max_retries
                );
                (self.sleeper)(delay);
                continue;
            }
            return Err(DetectionApiError::Status {
                status: response.status,
                body: response.body,
            });
        }
        // max_retries of zero: nothing was asked of the service.
        Ok(Vec::new())
    }
}
