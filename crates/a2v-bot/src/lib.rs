//! # a2v-bot
//!
//! Telegram transport for audio2voice: the Bot API client (which implements
//! the pipeline's [`Notifier`](a2v_pipeline::Notifier) and
//! [`ResourceFetcher`](a2v_pipeline::ResourceFetcher) ports), the update
//! [`Dispatcher`], and the long-polling and webhook receivers.

pub mod dispatcher;
pub mod polling;
pub mod telegram;
pub mod webhook;

pub use dispatcher::{extract_audio, Dispatcher};
pub use telegram::TelegramClient;

use std::sync::Arc;

use a2v_av::{ToolRegistry, ToolRunner};
use a2v_core::config::Config;
use a2v_pipeline::{ConversionPipeline, ConversionService, JobAdmission, WorkerPoolManager};
use tokio::signal;
use tokio::sync::{mpsc, Semaphore};
use tokio_util::sync::CancellationToken;

/// Run the bot until `cancel` fires, then drain in-flight jobs.
///
/// Uses long polling when `telegram.debug` is set or no webhook URL is
/// configured, and the webhook receiver otherwise.
pub async fn start(config: Config, cancel: CancellationToken) -> a2v_core::Result<()> {
    config.check()?;
    let token = config.telegram.token.as_deref().unwrap_or_default();

    let client = TelegramClient::new(&config.telegram.api_base, token)?;
    let me = client.get_me().await?;
    tracing::info!(
        bot = me.username.as_deref().unwrap_or(&me.first_name),
        "Authorized on Telegram"
    );

    let tools = ToolRegistry::discover(&config.tools);
    let missing = tools.missing();
    if !missing.is_empty() {
        tracing::warn!(?missing, "External tools not found; conversions will fail");
    }

    let pipeline = ConversionPipeline::new(
        Arc::new(client.clone()),
        Arc::new(ToolRunner),
        Arc::new(tools),
    )
    .with_work_dir(config.pool.work_dir.clone());
    let service = ConversionService::new(pipeline, Arc::new(client.clone()));

    let pool = Arc::new(WorkerPoolManager::new(
        Arc::new(service),
        config.pool.capacity(),
        config.pool.worker_count(),
    ));
    tracing::info!(
        capacity = pool.capacity(),
        workers = pool.workers(),
        job_timeout = ?config.pool.job_timeout(),
        "Worker pool configured"
    );
    let admission = JobAdmission::new(pool.clone(), cancel.clone(), config.pool.job_timeout());

    let inflight = config.transport.max_inflight_messages.max(1);
    let (tx, rx) = mpsc::channel(inflight);
    let dispatcher = Arc::new(
        Dispatcher::new(Arc::new(client.clone()), admission)
            .with_update_logging(config.telegram.debug),
    );
    let dispatching = tokio::spawn(dispatcher.process_updates(
        rx,
        Arc::new(Semaphore::new(inflight)),
        cancel.clone(),
    ));

    let use_polling = config.telegram.debug || config.telegram.webhook_url.is_none();
    let received = if use_polling {
        polling::run_polling(
            client,
            tx,
            config.transport.poll_timeout_secs,
            cancel.clone(),
        )
        .await
    } else {
        webhook::run_webhook(client, &config.telegram, tx, cancel.clone()).await
    };

    if let Err(e) = &received {
        tracing::error!(error = %e, "Update receiver failed");
    }
    cancel.cancel();

    if let Err(e) = dispatching.await {
        tracing::error!(error = %e, "Update dispatcher panicked");
    }
    pool.drained().await;
    tracing::info!("All jobs drained");

    received
}

/// Resolve on Ctrl+C or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => {}
            Err(e) => {
                tracing::error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
