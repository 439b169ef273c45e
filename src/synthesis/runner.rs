// Background execution of research runs

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::{FutureExt, Stream};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use tracing::{error, info, Instrument};

use crate::export::ReportExporter;
use crate::models::{CompletedResearch, ExportFormat, ResearchDepth, ResearchEvent, ResearchStore};
use crate::synthesis::{ProgressSink, ResearchEngine};
use crate::types::AppResult;

/// What to research and which artifacts to produce
#[derive(Debug, Clone)]
pub struct ResearchJob {
    pub topic: String,
    pub depth: ResearchDepth,
    pub format: ExportFormat,
}

/// Ordered event stream of one run.
///
/// Yields progress events followed by exactly one `complete` or `error`.
/// Dropping the handle cancels the run.
pub struct ResearchHandle {
    research_id: String,
    rx: UnboundedReceiver<ResearchEvent>,
    task: JoinHandle<()>,
}

impl ResearchHandle {
    pub fn research_id(&self) -> &str {
        &self.research_id
    }
}

impl Stream for ResearchHandle {
    type Item = ResearchEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

impl Drop for ResearchHandle {
    fn drop(&mut self) {
        if !self.task.is_finished() {
            info!(research_id = %self.research_id, "Research stream dropped, cancelling run");
            self.task.abort();
        }
    }
}

async fn run_job(
    engine: &ResearchEngine,
    exporter: &ReportExporter,
    job: &ResearchJob,
    research_id: &str,
    sink: &ProgressSink,
) -> AppResult<CompletedResearch> {
    let result = engine.conduct_research(&job.topic, job.depth, sink).await?;
    let artifacts = exporter.export(&result, job.format, research_id).await?;

    Ok(CompletedResearch {
        research_id: research_id.to_string(),
        format: job.format,
        result,
        pdf_path: artifacts.pdf_path,
        docx_path: artifacts.docx_path,
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

/// Start a run on its own task and return its event stream.
///
/// Completed runs are recorded in `store` before the `complete` event is sent.
pub fn spawn_research(
    engine: Arc<ResearchEngine>,
    exporter: Arc<ReportExporter>,
    store: ResearchStore,
    job: ResearchJob,
) -> ResearchHandle {
    let research_id = uuid::Uuid::new_v4().to_string();
    let (sink, rx) = ProgressSink::channel();
    let span = tracing::info_span!("research", research_id = %research_id, topic = %job.topic);

    let id = research_id.clone();
    let task = tokio::spawn(
        async move {
            // A panicking stage still ends the stream with an error event
            let outcome = AssertUnwindSafe(run_job(&engine, &exporter, &job, &id, &sink))
                .catch_unwind()
                .await;
            let event = match outcome {
                Ok(Ok(completed)) => {
                    store.insert(completed.clone()).await;
                    ResearchEvent::Complete(Box::new(completed))
                }
                Ok(Err(e)) => {
                    error!(error = %e, "Research run failed");
                    ResearchEvent::Error { error: e.to_string() }
                }
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    error!(panic = %message, "Research run panicked");
                    ResearchEvent::Error {
                        error: format!("Internal error: research run panicked: {}", message),
                    }
                }
            };
            sink.finish(event);
        }
        .instrument(span),
    );

    ResearchHandle { research_id, rx, task }
}
