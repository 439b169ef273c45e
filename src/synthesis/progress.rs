// Progress reporting from a research run to its consumer

use std::sync::atomic::{AtomicU8, Ordering};

use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info};

use crate::models::{ProgressEvent, ResearchEvent, Stage};

/// Sending half of one run's event stream.
///
/// Progress percentages never go backwards: a stage reported out of order is
/// dropped. A consumer that went away is not an error for the run.
pub struct ProgressSink {
    tx: UnboundedSender<ResearchEvent>,
    last_percent: AtomicU8,
}

impl ProgressSink {
    pub fn new(tx: UnboundedSender<ResearchEvent>) -> Self {
        Self {
            tx,
            last_percent: AtomicU8::new(0),
        }
    }

    pub fn channel() -> (Self, UnboundedReceiver<ResearchEvent>) {
        let (tx, rx) = unbounded_channel();
        (Self::new(tx), rx)
    }

    pub fn emit(&self, stage: Stage) {
        let event = ProgressEvent::from(stage);
        let previous = self.last_percent.fetch_max(event.percent, Ordering::SeqCst);
        if event.percent < previous {
            debug!(stage = stage.name(), previous, "Dropping out-of-order progress");
            return;
        }

        info!(percent = event.percent, "{}", event.message);
        let _ = self.tx.send(ResearchEvent::Progress(event));
    }

    /// Terminal event; nothing should be sent afterwards.
    pub fn finish(self, event: ResearchEvent) {
        let _ = self.tx.send(event);
    }
}
