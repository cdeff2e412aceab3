//! Routes inbound updates to command replies or job admission.

use std::sync::Arc;

use a2v_core::classify;
use a2v_pipeline::messages;
use a2v_pipeline::{JobAdmission, Notifier, ReplyTarget, SourceRef, TextFormat};
use tokio::sync::{mpsc, Semaphore};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::telegram::types::{Message, Update};

/// The audio attachment of `message`, if it can be converted.
///
/// Audio attachments are always taken; documents only when their name or
/// MIME type looks like supported audio.
pub fn extract_audio(message: &Message) -> Option<SourceRef> {
    if let Some(audio) = &message.audio {
        return Some(SourceRef {
            file_id: audio.file_id.clone(),
            file_name: audio.file_name.clone().unwrap_or_default(),
        });
    }

    let doc = message.document.as_ref()?;
    let file_name = doc.file_name.clone().unwrap_or_default();
    classify(&file_name, doc.mime_type.as_deref())
        .is_eligible()
        .then(|| SourceRef {
            file_id: doc.file_id.clone(),
            file_name,
        })
}

pub struct Dispatcher {
    notifier: Arc<dyn Notifier>,
    admission: JobAdmission,
    log_updates: bool,
}

impl Dispatcher {
    pub fn new(notifier: Arc<dyn Notifier>, admission: JobAdmission) -> Self {
        Self {
            notifier,
            admission,
            log_updates: false,
        }
    }

    /// Log every raw update at info level.
    pub fn with_update_logging(mut self, enabled: bool) -> Self {
        self.log_updates = enabled;
        self
    }

    pub async fn handle_update(&self, update: Update) {
        if self.log_updates {
            match serde_json::to_string(&update) {
                Ok(raw) => tracing::info!(update_id = update.update_id, %raw, "Update received"),
                Err(e) => tracing::warn!(update_id = update.update_id, error = %e, "Unprintable update"),
            }
        }

        let Some(message) = update.message else {
            return;
        };
        self.handle_message(&message).await;
    }

    pub async fn handle_message(&self, message: &Message) {
        let target = ReplyTarget {
            chat_id: message.chat.id,
            message_id: message.message_id,
        };

        if let Some(command) = message.command() {
            match command {
                "start" | "help" => {
                    self.say(target, &messages::usage(), Some(TextFormat::Html))
                        .await
                }
                other => {
                    tracing::debug!(chat_id = target.chat_id, command = other, "Unknown command");
                    self.say(target, messages::UNKNOWN_COMMAND, None).await
                }
            }
            return;
        }

        let Some(source) = extract_audio(message) else {
            self.say(target, messages::SEND_AUDIO_HINT, None).await;
            return;
        };

        tracing::info!(
            chat_id = target.chat_id,
            message_id = target.message_id,
            file_name = %source.file_name,
            "Audio received"
        );
        self.say(target, messages::PROCESSING, None).await;

        let job = self.admission.new_job(source, target);
        if let Err(e) = self.admission.submit(job) {
            if let Some(text) = messages::failure_message(&e) {
                self.say(target, &text, None).await;
            }
        }
    }

    async fn say(&self, target: ReplyTarget, text: &str, format: Option<TextFormat>) {
        if let Err(e) = self.notifier.reply(target, text, format).await {
            tracing::warn!(chat_id = target.chat_id, error = %e, "Failed to send reply");
        }
    }

    /// Handle updates from `rx` until it closes or `cancel` fires.
    ///
    /// Each update runs in its own task; at most `limit`'s permits run at
    /// once and the loop waits for a permit before taking the next update.
    /// Running tasks are awaited before returning.
    pub async fn process_updates(
        self: Arc<Self>,
        mut rx: mpsc::Receiver<Update>,
        limit: Arc<Semaphore>,
        cancel: CancellationToken,
    ) {
        let tracker = TaskTracker::new();

        loop {
            let permit = tokio::select! {
                _ = cancel.cancelled() => break,
                permit = limit.clone().acquire_owned() => match permit {
                    Ok(p) => p,
                    Err(_) => break,
                },
            };

            let update = tokio::select! {
                _ = cancel.cancelled() => break,
                update = rx.recv() => match update {
                    Some(u) => u,
                    None => break,
                },
            };

            let dispatcher = self.clone();
            tracker.spawn(async move {
                dispatcher.handle_update(update).await;
                drop(permit);
            });
        }

        tracker.close();
        tracker.wait().await;
        tracing::debug!("Update dispatcher stopped");
    }
}
