use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use crate::metrics::{MetricEvent, MetricsProcessor};

/// Failure raised by a subscriber while handling an anomalous event.
/// The processor logs it and moves on to the next subscriber; it never
/// reaches the ingest caller.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct SubscriberError(pub String);

impl SubscriberError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// Anything that wants to hear about anomalous events.
///
/// Subscribers run synchronously on the ingesting task, in registration
/// order, so a slow handler stalls that producer's ingest call. Delivery
/// mechanics (chat, email, webhooks) are the subscriber's business.
pub trait AlertSubscriber: Send + Sync {
    /// Shown in failure logs.
    fn name(&self) -> &str {
        "subscriber"
    }

    fn handle(&self, event: &MetricEvent) -> Result<(), SubscriberError>;
}

/// Adapter so a plain closure can subscribe without a named type.
pub struct FnSubscriber<F> {
    name: &'static str,
    f: F,
}

impl<F> FnSubscriber<F>
where
    F: Fn(&MetricEvent) + Send + Sync,
{
    pub fn new(name: &'static str, f: F) -> Self {
        Self { name, f }
    }
}

impl<F> AlertSubscriber for FnSubscriber<F>
where
    F: Fn(&MetricEvent) + Send + Sync,
{
    fn name(&self) -> &str {
        self.name
    }

    fn handle(&self, event: &MetricEvent) -> Result<(), SubscriberError> {
        (self.f)(event);
        Ok(())
    }
}

/// Default subscriber: a structured warn-level log of the anomalous event.
pub struct LogAlert;

impl AlertSubscriber for LogAlert {
    fn name(&self) -> &str {
        "log-alert"
    }

    fn handle(&self, event: &MetricEvent) -> Result<(), SubscriberError> {
        warn!(
            endpoint = %event.endpoint,
            method = %event.method,
            duration_ms = event.duration_ms,
            status = %event.status,
            service = %event.service_name,
            trace_id = %event.trace_id,
            "ALERT: anomalous request"
        );
        Ok(())
    }
}

/// Wires the out-of-the-box alerting. Further subscribers (Slack, email,
/// pager) register through the same interface.
pub fn setup_default_subscribers(processor: &MetricsProcessor) {
    processor.register_alert_subscriber(Arc::new(LogAlert));
    info!("alert subscribers configured");
}
