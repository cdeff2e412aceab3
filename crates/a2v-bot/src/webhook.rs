//! Webhook receiver: an axum endpoint Telegram pushes updates to.

use std::net::SocketAddr;
use std::sync::Arc;

use a2v_core::config::TelegramConfig;
use a2v_core::Error;
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

use crate::telegram::types::Update;
use crate::telegram::TelegramClient;

pub const SECRET_HEADER: &str = "x-telegram-bot-api-secret-token";

#[derive(Clone)]
struct WebhookState {
    tx: mpsc::Sender<Update>,
    secret: Option<Arc<str>>,
}

/// Router accepting `POST /` update payloads and forwarding them to `tx`.
///
/// With a `secret`, requests must carry it in the secret token header.
pub fn webhook_router(tx: mpsc::Sender<Update>, secret: Option<String>) -> Router {
    let state = WebhookState {
        tx,
        secret: secret.map(Arc::from),
    };

    Router::new()
        .route("/", post(receive_update))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn receive_update(
    State(state): State<WebhookState>,
    headers: HeaderMap,
    Json(update): Json<Update>,
) -> Result<StatusCode, (StatusCode, String)> {
    if let Some(secret) = &state.secret {
        let presented = headers.get(SECRET_HEADER).and_then(|v| v.to_str().ok());
        if presented != Some(secret.as_ref()) {
            tracing::warn!(update_id = update.update_id, "Webhook secret mismatch");
            return Err((StatusCode::UNAUTHORIZED, "Invalid secret token".to_string()));
        }
    }

    state.tx.send(update).await.map_err(|_| {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            "Shutting down".to_string(),
        )
    })?;

    Ok(StatusCode::OK)
}

/// Register the webhook, serve it until `cancel` fires, then unregister it.
pub async fn run_webhook(
    client: TelegramClient,
    config: &TelegramConfig,
    tx: mpsc::Sender<Update>,
    cancel: CancellationToken,
) -> a2v_core::Result<()> {
    let url = config
        .webhook_url
        .as_deref()
        .ok_or_else(|| Error::Config("webhook mode requires telegram.webhook_url".into()))?;

    client
        .set_webhook(url, config.webhook_secret.as_deref())
        .await?;

    match client.get_webhook_info().await {
        Ok(info) => tracing::info!(
            url = %info.url,
            pending = info.pending_update_count,
            last_error = info.last_error_message.as_deref().unwrap_or("none"),
            "Webhook registered"
        ),
        Err(e) => tracing::warn!(error = %e, "Could not fetch webhook info"),
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening for webhook updates on {}", addr);

    let app = webhook_router(tx, config.webhook_secret.clone());
    let served = axum::serve(listener, app)
        .with_graceful_shutdown({
            let cancel = cancel.clone();
            async move { cancel.cancelled().await }
        })
        .await;

    if let Err(e) = client.delete_webhook(false).await {
        tracing::warn!(error = %e, "Failed to remove webhook");
    }

    served?;
    tracing::info!("Webhook receiver stopped");
    Ok(())
}
