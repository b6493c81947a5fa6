//! Optional external sink for per-example run records.
//!
//! When a sink is attached to the pipeline, every judged result is
//! forwarded as a [`RunRecord`] keyed by run id, so an external tracing
//! store can group the examples of one invocation (and tag them with a
//! dataset name when the request carries one). Recording is best-effort: a
//! failing sink is logged and never affects the run's outcome.

use crate::results::Scores;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Mutex;
use thiserror::Error;

/// One judged example, keyed by the run that produced it.
#[derive(Debug, Clone, Serialize)]
pub struct RunRecord {
    /// Identifier shared by every record of one pipeline invocation
    #[serde(rename = "runId")]
    pub run_id: String,

    /// Dataset label from the request, when given
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dataset: Option<String>,

    /// Name of the prompt under test
    #[serde(rename = "promptName")]
    pub prompt_name: String,

    /// Which prompt variant produced the output ("original", "optimized")
    pub variant: String,

    /// The test case input
    pub input: String,

    /// Generated output
    pub output: String,

    /// Scores the judge assigned
    pub scores: Scores,
}

/// Errors from delivering a record.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SinkError {
    /// Transport-level failure
    #[error("sink HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx status from the sink endpoint
    #[error("sink returned HTTP {0}")]
    Status(u16),
}

/// Destination for run records.
#[async_trait]
pub trait RunSink: Send + Sync {
    /// The name of this sink (used in logs).
    fn name(&self) -> &str;

    /// Deliver one record.
    async fn record(&self, record: &RunRecord) -> Result<(), SinkError>;
}

/// Sink posting each record as JSON to an HTTP endpoint.
pub struct HttpRunSink {
    endpoint: String,
    api_key: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for HttpRunSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpRunSink")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

impl HttpRunSink {
    /// Create a sink posting to `endpoint` with bearer authentication.
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl RunSink for HttpRunSink {
    fn name(&self) -> &str {
        "http"
    }

    async fn record(&self, record: &RunRecord) -> Result<(), SinkError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(record)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SinkError::Status(status.as_u16()));
        }
        Ok(())
    }
}

/// In-process sink collecting records in memory. Useful in tests and as a
/// run-scoped collector.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<RunRecord>>,
}

impl MemorySink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything recorded so far, in delivery order.
    pub fn records(&self) -> Vec<RunRecord> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl RunSink for MemorySink {
    fn name(&self) -> &str {
        "memory"
    }

    async fn record(&self, record: &RunRecord) -> Result<(), SinkError> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(record.clone());
        Ok(())
    }
}
