//! The job handler workers run: convert, deliver, report, clean up.

use std::sync::Arc;

use a2v_core::{Error, Stage};
use async_trait::async_trait;
use tracing::Instrument;

use crate::job::{Job, ReplyTarget};
use crate::messages::failure_message;
use crate::pipeline::ConversionPipeline;
use crate::pool::JobHandler;
use crate::ports::Notifier;

/// Runs the [`ConversionPipeline`] for each job and reports the outcome
/// through the [`Notifier`].
pub struct ConversionService {
    pipeline: ConversionPipeline,
    notifier: Arc<dyn Notifier>,
}

impl ConversionService {
    pub fn new(pipeline: ConversionPipeline, notifier: Arc<dyn Notifier>) -> Self {
        Self { pipeline, notifier }
    }

    async fn process(&self, job: Job) {
        if job.cancel.is_cancelled() {
            tracing::info!("Job cancelled before processing started");
            self.report(job.reply, &Error::Cancelled).await;
            return;
        }

        tracing::info!(file_name = %job.source.file_name, "Processing job");

        let artifact = match self.pipeline.execute(&job).await {
            Ok(artifact) => artifact,
            Err(e) => {
                tracing::error!(stage = ?e.stage(), error = %e, "Conversion failed");
                self.report(job.reply, &e).await;
                return;
            }
        };

        let delivery = tokio::time::timeout_at(
            job.deadline,
            self.notifier
                .deliver_voice(job.reply, artifact.path(), artifact.duration_secs()),
        )
        .await;

        match delivery {
            Ok(Ok(())) => tracing::info!(
                duration_secs = artifact.duration_secs(),
                elapsed_ms = job.submitted_at.elapsed().as_millis() as u64,
                "Voice message delivered"
            ),
            Ok(Err(e)) => {
                tracing::error!(error = %e, "Voice delivery failed");
                self.report(job.reply, &Error::Delivery(e.to_string())).await;
            }
            Err(_elapsed) => {
                tracing::error!("Job deadline exceeded during delivery");
                self.report(job.reply, &Error::Timeout { stage: Stage::Deliver })
                    .await;
            }
        }

        if let Err(e) = artifact.cleanup() {
            tracing::warn!(error = %e, "Failed to remove job workspace");
        }
    }

    async fn report(&self, target: ReplyTarget, err: &Error) {
        let Some(text) = failure_message(err) else {
            return;
        };
        if let Err(e) = self.notifier.reply(target, &text, None).await {
            tracing::warn!(error = %e, "Failed to send failure reply");
        }
    }
}

#[async_trait]
impl JobHandler for ConversionService {
    async fn handle(&self, job: Job) {
        let span = tracing::info_span!(
            "job",
            job_id = %job.id,
            chat_id = job.reply.chat_id,
            message_id = job.reply.message_id
        );
        self.process(job).instrument(span).await;
    }
}
