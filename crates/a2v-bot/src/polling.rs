//! Long-polling receiver.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::telegram::types::Update;
use crate::telegram::TelegramClient;

/// Pause after a failed `getUpdates` call.
const RETRY_DELAY: Duration = Duration::from_secs(3);

/// Pull updates with `getUpdates` and forward them to `tx` until `cancel`
/// fires or the receiving side goes away.
///
/// Any registered webhook is removed first, dropping updates queued for it.
pub async fn run_polling(
    client: TelegramClient,
    tx: mpsc::Sender<Update>,
    poll_timeout_secs: u64,
    cancel: CancellationToken,
) -> a2v_core::Result<()> {
    client.delete_webhook(true).await?;
    tracing::info!(poll_timeout_secs, "Polling for updates");

    let mut offset = 0i64;
    loop {
        let batch = tokio::select! {
            _ = cancel.cancelled() => break,
            batch = client.get_updates(offset, poll_timeout_secs) => batch,
        };

        let updates = match batch {
            Ok(updates) => updates,
            Err(e) => {
                tracing::warn!(error = %e, "getUpdates failed, retrying in {:?}", RETRY_DELAY);
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(RETRY_DELAY) => continue,
                }
            }
        };

        for update in updates {
            offset = offset.max(update.update_id + 1);
            let sent = tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                sent = tx.send(update) => sent,
            };
            if sent.is_err() {
                tracing::debug!("Update channel closed, stopping poller");
                return Ok(());
            }
        }
    }

    tracing::info!("Polling stopped");
    Ok(())
}
