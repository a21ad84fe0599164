pub mod endpoint;
pub mod processor;
pub mod window;

pub use processor::{MetricsProcessor, MetricsSnapshot, ProcessorConfig};
pub use window::SampleWindow;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single request-completion observation reported by a producer service.
/// This is the "write" side — the ingest endpoint decodes these and feeds
/// them to the processor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricEvent {
    /// e.g. "/api/users/:id"
    pub endpoint: String,
    /// HTTP method, e.g. "GET"
    pub method: String,
    /// Wall time of the request in milliseconds
    #[serde(rename = "duration")]
    pub duration_ms: u64,
    /// Outcome as reported by the producer ("success", "200", "500", ...)
    pub status: String,
    /// Epoch seconds at the producer
    pub timestamp: i64,

    // Optional identity fields, defaulted when absent
    #[serde(default)]
    pub trace_id: String,
    #[serde(default = "unknown_service")]
    pub service_name: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub ip_address: String,
}

fn unknown_service() -> String {
    "unknown".into()
}

/// Core-level failures. Validation happens before any counter or window
/// is touched, so a rejected event leaves no trace in the aggregates.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("missing or empty required field `{0}`")]
    Validation(&'static str),
}

impl MetricEvent {
    /// Checks the required fields. `duration` and `timestamp` are
    /// well-formed by construction once deserialized.
    pub fn validate(&self) -> Result<(), MetricsError> {
        if self.endpoint.is_empty() {
            return Err(MetricsError::Validation("endpoint"));
        }
        if self.method.is_empty() {
            return Err(MetricsError::Validation("method"));
        }
        if self.status.is_empty() {
            return Err(MetricsError::Validation("status"));
        }
        Ok(())
    }

    /// Registry key: `"<METHOD>:<PATH>"`, exact strings — no case folding
    /// or trailing-slash normalization. Producers own canonicalization.
    pub fn key(&self) -> String {
        format!("{}:{}", self.method, self.endpoint)
    }

    /// Literal match: only `"success"` and `"200"` count as success, so
    /// other 2xx codes like `"201"` land in the error counters.
    pub fn is_success(&self) -> bool {
        self.status == "success" || self.status == "200"
    }
}
