//! Minimal Telegram Bot API client over `reqwest`.
//!
//! Request URLs embed the bot token, so transport errors are stripped of
//! their URL before they are wrapped or logged.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use a2v_core::Error;
use a2v_pipeline::{Notifier, RemoteResource, ReplyTarget, ResourceFetcher, SourceRef, TextFormat};
use async_trait::async_trait;
use reqwest::multipart;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use tokio::io::AsyncWriteExt;
use tokio::time::Instant;

use super::types::{ApiResponse, File, Update, User, WebhookInfo};

/// Timeout for ordinary API calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// Extra time granted to `getUpdates` on top of its long-poll timeout.
const POLL_GRACE: Duration = Duration::from_secs(10);
/// Timeout for uploading a voice file.
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Clone)]
pub struct TelegramClient {
    http: reqwest::Client,
    api_base: String,
    token: String,
}

impl fmt::Debug for TelegramClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramClient")
            .field("api_base", &self.api_base)
            .finish_non_exhaustive()
    }
}

impl TelegramClient {
    pub fn new(api_base: &str, token: &str) -> a2v_core::Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .user_agent(concat!("audio2voice/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::http(e.without_url()))?;

        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.token, method)
    }

    /// Download location of a file returned by `getFile`.
    pub fn file_url(&self, file_path: &str) -> String {
        format!("{}/file/bot{}/{}", self.api_base, self.token, file_path)
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        body: &impl Serialize,
        timeout: Duration,
    ) -> a2v_core::Result<T> {
        let response = self
            .http
            .post(self.method_url(method))
            .json(body)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| Error::http(e.without_url()))?;
        parse_response(method, response).await
    }

    /// Verify the token and return the bot account.
    pub async fn get_me(&self) -> a2v_core::Result<User> {
        self.call("getMe", &json!({}), REQUEST_TIMEOUT).await
    }

    /// Long-poll for updates after `offset`.
    pub async fn get_updates(&self, offset: i64, timeout_secs: u64) -> a2v_core::Result<Vec<Update>> {
        let body = json!({
            "offset": offset,
            "timeout": timeout_secs,
            "allowed_updates": ["message"],
        });
        self.call(
            "getUpdates",
            &body,
            Duration::from_secs(timeout_secs) + POLL_GRACE,
        )
        .await
    }

    pub async fn send_message(
        &self,
        chat_id: i64,
        reply_to: i64,
        text: &str,
        parse_mode: Option<&str>,
    ) -> a2v_core::Result<()> {
        let mut body = json!({
            "chat_id": chat_id,
            "text": text,
            "reply_to_message_id": reply_to,
        });
        if let Some(mode) = parse_mode {
            body["parse_mode"] = json!(mode);
        }
        let _: serde_json::Value = self.call("sendMessage", &body, REQUEST_TIMEOUT).await?;
        Ok(())
    }

    /// Upload `path` as a voice message replying to `reply_to`.
    pub async fn send_voice(
        &self,
        chat_id: i64,
        reply_to: i64,
        path: &Path,
        duration_secs: u32,
    ) -> a2v_core::Result<()> {
        let bytes = tokio::fs::read(path).await?;
        let voice = multipart::Part::bytes(bytes)
            .file_name("voice.ogg")
            .mime_str("audio/ogg")
            .map_err(|e| Error::http(e.without_url()))?;

        let form = multipart::Form::new()
            .text("chat_id", chat_id.to_string())
            .text("reply_to_message_id", reply_to.to_string())
            .text("duration", duration_secs.to_string())
            .part("voice", voice);

        let response = self
            .http
            .post(self.method_url("sendVoice"))
            .multipart(form)
            .timeout(UPLOAD_TIMEOUT)
            .send()
            .await
            .map_err(|e| Error::http(e.without_url()))?;
        let _: serde_json::Value = parse_response("sendVoice", response).await?;
        Ok(())
    }

    pub async fn get_file(&self, file_id: &str) -> a2v_core::Result<File> {
        self.call("getFile", &json!({ "file_id": file_id }), REQUEST_TIMEOUT)
            .await
    }

    /// Stream the file at `location` into `dest`, giving up at `deadline`.
    pub async fn download(&self, location: &str, dest: &Path, deadline: Instant) -> a2v_core::Result<u64> {
        let remaining = deadline.saturating_duration_since(Instant::now());
        let mut response = self
            .http
            .get(location)
            .timeout(remaining)
            .send()
            .await
            .map_err(|e| Error::http(e.without_url()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Acquisition(format!(
                "download failed with status {status}"
            )));
        }

        let mut file = tokio::fs::File::create(dest).await?;
        let mut written = 0u64;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| Error::http(e.without_url()))?
        {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        Ok(written)
    }

    pub async fn set_webhook(&self, url: &str, secret_token: Option<&str>) -> a2v_core::Result<()> {
        let mut body = json!({ "url": url, "allowed_updates": ["message"] });
        if let Some(secret) = secret_token {
            body["secret_token"] = json!(secret);
        }
        let _: bool = self.call("setWebhook", &body, REQUEST_TIMEOUT).await?;
        Ok(())
    }

    pub async fn delete_webhook(&self, drop_pending_updates: bool) -> a2v_core::Result<()> {
        let body = json!({ "drop_pending_updates": drop_pending_updates });
        let _: bool = self.call("deleteWebhook", &body, REQUEST_TIMEOUT).await?;
        Ok(())
    }

    pub async fn get_webhook_info(&self) -> a2v_core::Result<WebhookInfo> {
        self.call("getWebhookInfo", &json!({}), REQUEST_TIMEOUT).await
    }
}

async fn parse_response<T: DeserializeOwned>(
    method: &str,
    response: reqwest::Response,
) -> a2v_core::Result<T> {
    let status = response.status();
    let envelope: ApiResponse<T> = response.json().await.map_err(|e| {
        Error::http(format!("{method}: invalid response (status {status}): {}", e.without_url()))
    })?;

    match envelope {
        ApiResponse {
            ok: true,
            result: Some(result),
            ..
        } => Ok(result),
        ApiResponse {
            description,
            error_code,
            ..
        } => Err(Error::http(format!(
            "{method} failed ({}): {}",
            error_code.map_or_else(|| status.as_u16().to_string(), |c| c.to_string()),
            description.unwrap_or_else(|| "no description".to_string())
        ))),
    }
}

#[async_trait]
impl Notifier for TelegramClient {
    async fn reply(
        &self,
        target: ReplyTarget,
        text: &str,
        format: Option<TextFormat>,
    ) -> a2v_core::Result<()> {
        let parse_mode = format.map(|f| match f {
            TextFormat::Html => "HTML",
        });
        self.send_message(target.chat_id, target.message_id, text, parse_mode)
            .await
    }

    async fn deliver_voice(
        &self,
        target: ReplyTarget,
        path: &Path,
        duration_secs: u32,
    ) -> a2v_core::Result<()> {
        self.send_voice(target.chat_id, target.message_id, path, duration_secs)
            .await
    }
}

#[async_trait]
impl ResourceFetcher for TelegramClient {
    async fn resolve(&self, source: &SourceRef) -> a2v_core::Result<RemoteResource> {
        let file = self.get_file(&source.file_id).await?;
        let remote_path = file
            .file_path
            .ok_or_else(|| Error::Acquisition(format!("no file_path for {}", source.file_id)))?;

        Ok(RemoteResource {
            location: self.file_url(&remote_path),
            remote_path,
            suggested_name: source.file_name.clone(),
        })
    }

    async fn fetch(
        &self,
        resource: &RemoteResource,
        dest: &Path,
        deadline: Instant,
    ) -> a2v_core::Result<()> {
        let bytes = self.download(&resource.location, dest, deadline).await?;
        tracing::debug!(remote_path = %resource.remote_path, bytes, "Source downloaded");
        Ok(())
    }
}
