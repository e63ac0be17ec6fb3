//! Ingestion runner: owns the stream subscription lifetime.
//!
//! Wires the per-event callback (transform, then publish) into whichever
//! source the configuration selected, and releases the subscription on
//! shutdown.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::bootstrap::ReadinessState;
use crate::error::StreamError;
use crate::kafka::RecordSink;
use crate::metrics::IngestionMetrics;
use crate::model::{to_post_record, PostEvent};
use crate::source::{EventCallback, IngestionSource, Subscription};
use crate::Result;

/// Runner lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerState {
    /// No active subscription
    Stopped,
    /// Subscription open, events flowing
    Running,
}

/// Owns the subscription to the external stream and the per-event pipeline.
pub struct IngestionRunner {
    source: Box<dyn IngestionSource>,
    sink: Arc<dyn RecordSink>,
    keywords: Vec<String>,
    metrics: Arc<IngestionMetrics>,
    state: RunnerState,
    subscription: Option<Subscription>,
}

impl IngestionRunner {
    /// Create a runner over the given source and sink.
    pub fn new(
        source: Box<dyn IngestionSource>,
        sink: Arc<dyn RecordSink>,
        keywords: Vec<String>,
        metrics: Arc<IngestionMetrics>,
    ) -> Self {
        Self {
            source,
            sink,
            keywords,
            metrics,
            state: RunnerState::Stopped,
            subscription: None,
        }
    }

    /// Open the subscription and start publishing events.
    ///
    /// Only valid once the readiness gate has passed; ingestion must never
    /// write to a topic that might not exist.
    pub async fn start(&mut self, readiness: &ReadinessState) -> Result<()> {
        if !readiness.is_ready() {
            return Err(StreamError::BackendNotReady.into());
        }
        if self.state == RunnerState::Running {
            return Err(StreamError::AlreadyRunning.into());
        }

        let callback = self.event_callback();
        let subscription = self.source.subscribe(&self.keywords, callback).await?;

        self.subscription = Some(subscription);
        self.state = RunnerState::Running;
        info!(keywords = ?self.keywords, "Ingestion started");
        Ok(())
    }

    /// Release the subscription. Idempotent; callable even if never started.
    pub async fn shutdown(&mut self) {
        match self.subscription.take() {
            Some(subscription) => {
                subscription.close().await;
                info!("Stream subscription released");
            }
            None => debug!("No active stream subscription"),
        }
        self.state = RunnerState::Stopped;
    }

    /// Current lifecycle state.
    pub fn state(&self) -> RunnerState {
        self.state
    }

    /// The per-event pipeline: transform, then hand off to the sink.
    ///
    /// One bad record must not stop the stream, so the sink absorbs and logs
    /// its own failures; nothing here propagates past the handler.
    fn event_callback(&self) -> EventCallback {
        let sink = Arc::clone(&self.sink);
        let metrics = Arc::clone(&self.metrics);

        Arc::new(move |event: PostEvent| {
            metrics.record_event();
            debug!(id = event.id, author_id = event.author_id, "Received event");

            if event.text.is_empty() {
                warn!(id = event.id, "Event carries no text");
            }

            let record = to_post_record(&event);
            sink.publish(record.author_id, &record);
        })
    }
}
