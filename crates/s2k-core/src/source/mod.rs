//! Ingestion sources: the live keyword-filtered feed and the synthetic
//! generator, behind one subscription interface.

mod live;
mod synthetic;

pub use live::LiveSource;
pub use synthetic::SyntheticSource;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::model::PostEvent;
use crate::Result;

/// Bound on how long releasing a subscription may block.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Per-event callback invoked by a source.
///
/// Invoked sequentially on a task owned by the source; implementations must
/// not block beyond handing the event off.
pub type EventCallback = Arc<dyn Fn(PostEvent) + Send + Sync>;

/// A provider of raw post events.
#[async_trait]
pub trait IngestionSource: Send {
    /// Open the event feed with the given keyword filter.
    ///
    /// Connect failure is an error from this call; it is not retried here.
    async fn subscribe(
        &mut self,
        keywords: &[String],
        on_event: EventCallback,
    ) -> Result<Subscription>;
}

/// Handle to an open event feed.
pub struct Subscription {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl Subscription {
    /// Wrap a delivery task and its stop signal.
    ///
    /// Public so external `IngestionSource` implementations can construct
    /// handles for their own delivery tasks.
    pub fn new(stop: watch::Sender<bool>, task: JoinHandle<()>) -> Self {
        Self { stop, task }
    }

    /// Release the feed.
    ///
    /// Signals the delivery task to stop and waits for it with a bound;
    /// a task that does not wind down in time is aborted rather than leaked.
    pub async fn close(mut self) {
        let _ = self.stop.send(true);
        if tokio::time::timeout(CLOSE_TIMEOUT, &mut self.task)
            .await
            .is_err()
        {
            self.task.abort();
        }
    }
}
