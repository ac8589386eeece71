//! Concrete analytics sinks.

use crate::analytics::AnalyticsSink;
use crate::error::ReceiptError;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

fn envelope(event: &str, properties: Value) -> Value {
    json!({ "event": event, "properties": properties })
}

/// Writes events to the log.
pub struct LogSink;

#[async_trait]
impl AnalyticsSink for LogSink {
    async fn track(&self, event: &str, properties: Value) -> Result<(), ReceiptError> {
        info!(event, %properties, "analytics event");
        Ok(())
    }
}

/// Drops events.
pub struct NullSink;

#[async_trait]
impl AnalyticsSink for NullSink {
    async fn track(&self, event: &str, _properties: Value) -> Result<(), ReceiptError> {
        debug!(event, "analytics disabled, event dropped");
        Ok(())
    }
}

/// Appends one JSON document per event to a file.
pub struct JsonLinesSink {
    path: PathBuf,
}

impl JsonLinesSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl AnalyticsSink for JsonLinesSink {
    async fn track(&self, event: &str, properties: Value) -> Result<(), ReceiptError> {
        let mut line = envelope(event, properties).to_string();
        line.push('\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;

        debug!(event, path = %self.path.display(), "analytics event appended");
        Ok(())
    }
}

/// POSTs events as JSON to an HTTP collector.
pub struct HttpSink {
    http: reqwest::Client,
    url: String,
}

impl HttpSink {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            url: url.into(),
        })
    }
}

#[async_trait]
impl AnalyticsSink for HttpSink {
    async fn track(&self, event: &str, properties: Value) -> Result<(), ReceiptError> {
        let resp = self
            .http
            .post(&self.url)
            .json(&envelope(event, properties))
            .send()
            .await
            .map_err(|e| ReceiptError::Analytics(format!("POST {}: {e}", self.url)))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ReceiptError::Analytics(format!(
                "POST {} returned HTTP {}",
                self.url,
                status.as_u16()
            )));
        }

        debug!(event, url = %self.url, "analytics event posted");
        Ok(())
    }
}
