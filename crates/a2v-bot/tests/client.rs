//! Bot API client against a mock Telegram server.

use a2v_core::Error;
use a2v_bot::TelegramClient;
use a2v_pipeline::{Notifier, ReplyTarget, ResourceFetcher, SourceRef, TextFormat};
use assert_matches::assert_matches;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN: &str = "123:abc";

fn ok(result: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "ok": true, "result": result }))
}

async fn setup() -> (MockServer, TelegramClient) {
    let server = MockServer::start().await;
    let client = TelegramClient::new(&server.uri(), TOKEN).unwrap();
    (server, client)
}

fn deadline() -> tokio::time::Instant {
    tokio::time::Instant::now() + Duration::from_secs(10)
}

#[tokio::test]
async fn get_me_returns_bot_user() {
    let (server, client) = setup().await;
    Mock::given(method("POST"))
        .and(path(format!("/bot{TOKEN}/getMe")))
        .respond_with(ok(json!({"id": 42, "is_bot": true, "first_name": "A2V", "username": "a2v_bot"})))
        .expect(1)
        .mount(&server)
        .await;

    let me = client.get_me().await.unwrap();
    assert_eq!(me.id, 42);
    assert_eq!(me.username.as_deref(), Some("a2v_bot"));
}

#[tokio::test]
async fn api_error_carries_description_without_token() {
    let (server, client) = setup().await;
    Mock::given(method("POST"))
        .and(path(format!("/bot{TOKEN}/getMe")))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "ok": false,
            "error_code": 401,
            "description": "Unauthorized"
        })))
        .mount(&server)
        .await;

    let err = client.get_me().await.unwrap_err();
    assert_matches!(err, Error::Http { .. });
    let text = err.to_string();
    assert!(text.contains("Unauthorized"), "got: {text}");
    assert!(text.contains("401"), "got: {text}");
    assert!(!text.contains(TOKEN), "got: {text}");
}

#[tokio::test]
async fn reply_sets_html_parse_mode_and_reply_target() {
    let (server, client) = setup().await;
    Mock::given(method("POST"))
        .and(path(format!("/bot{TOKEN}/sendMessage")))
        .and(body_partial_json(json!({
            "chat_id": 1001,
            "reply_to_message_id": 55,
            "text": "<b>hi</b>",
            "parse_mode": "HTML"
        })))
        .respond_with(ok(json!({"message_id": 56, "chat": {"id": 1001}})))
        .expect(1)
        .mount(&server)
        .await;

    let target = ReplyTarget {
        chat_id: 1001,
        message_id: 55,
    };
    client
        .reply(target, "<b>hi</b>", Some(TextFormat::Html))
        .await
        .unwrap();
}

#[tokio::test]
async fn get_updates_parses_batch() {
    let (server, client) = setup().await;
    Mock::given(method("POST"))
        .and(path(format!("/bot{TOKEN}/getUpdates")))
        .and(body_partial_json(json!({"offset": 10, "timeout": 0})))
        .respond_with(ok(json!([
            {"update_id": 10, "message": {"message_id": 1, "chat": {"id": 7}, "text": "/start",
                "entities": [{"type": "bot_command", "offset": 0, "length": 6}]}},
            {"update_id": 11, "edited_message": {"message_id": 2, "chat": {"id": 7}}}
        ])))
        .mount(&server)
        .await;

    let updates = client.get_updates(10, 0).await.unwrap();
    assert_eq!(updates.len(), 2);
    assert_eq!(updates[0].message.as_ref().unwrap().command(), Some("start"));
    assert!(updates[1].message.is_none());
}

#[tokio::test]
async fn resolve_and_fetch_download_file() {
    let (server, client) = setup().await;
    Mock::given(method("POST"))
        .and(path(format!("/bot{TOKEN}/getFile")))
        .and(body_partial_json(json!({"file_id": "abc"})))
        .respond_with(ok(json!({"file_id": "abc", "file_path": "music/file_9.mp3", "file_size": 5})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/file/bot{TOKEN}/music/file_9.mp3")))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"ID3xx".to_vec()))
        .mount(&server)
        .await;

    let source = SourceRef {
        file_id: "abc".into(),
        file_name: "song.mp3".into(),
    };
    let resource = client.resolve(&source).await.unwrap();
    assert_eq!(resource.remote_path, "music/file_9.mp3");
    assert_eq!(resource.suggested_name, "song.mp3");
    assert!(resource.location.ends_with("/music/file_9.mp3"));

    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("input.mp3");
    client.fetch(&resource, &dest, deadline()).await.unwrap();
    assert_eq!(std::fs::read(&dest).unwrap(), b"ID3xx");
}

#[tokio::test]
async fn missing_file_path_is_acquisition_failure() {
    let (server, client) = setup().await;
    Mock::given(method("POST"))
        .and(path(format!("/bot{TOKEN}/getFile")))
        .respond_with(ok(json!({"file_id": "big"})))
        .mount(&server)
        .await;

    let source = SourceRef {
        file_id: "big".into(),
        file_name: String::new(),
    };
    assert_matches!(client.resolve(&source).await, Err(Error::Acquisition(_)));
}

#[tokio::test]
async fn non_success_download_is_acquisition_failure() {
    let (server, client) = setup().await;
    Mock::given(method("GET"))
        .and(path(format!("/file/bot{TOKEN}/music/gone.mp3")))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("input.mp3");
    let result = client
        .download(&client.file_url("music/gone.mp3"), &dest, deadline())
        .await;

    let err = result.unwrap_err();
    assert_matches!(err, Error::Acquisition(_));
    assert!(err.to_string().contains("404"));
    assert!(!dest.exists());
}

#[tokio::test]
async fn deliver_voice_uploads_file() {
    let (server, client) = setup().await;
    Mock::given(method("POST"))
        .and(path(format!("/bot{TOKEN}/sendVoice")))
        .respond_with(ok(json!({"message_id": 57, "chat": {"id": 1001}})))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let voice = dir.path().join("voice.ogg");
    std::fs::write(&voice, b"OggS").unwrap();

    let target = ReplyTarget {
        chat_id: 1001,
        message_id: 55,
    };
    client.deliver_voice(target, &voice, 12).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let body = String::from_utf8_lossy(&requests[0].body);
    assert!(body.contains("name=\"voice\""));
    assert!(body.contains("name=\"duration\""));
    assert!(body.contains("OggS"));
}

#[tokio::test]
async fn webhook_management_calls() {
    let (server, client) = setup().await;
    Mock::given(method("POST"))
        .and(path(format!("/bot{TOKEN}/setWebhook")))
        .and(body_partial_json(json!({"url": "https://bot.example/hook", "secret_token": "s"})))
        .respond_with(ok(json!(true)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("/bot{TOKEN}/deleteWebhook")))
        .and(body_partial_json(json!({"drop_pending_updates": false})))
        .respond_with(ok(json!(true)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("/bot{TOKEN}/getWebhookInfo")))
        .respond_with(ok(json!({"url": "https://bot.example/hook", "pending_update_count": 3})))
        .mount(&server)
        .await;

    client
        .set_webhook("https://bot.example/hook", Some("s"))
        .await
        .unwrap();
    let info = client.get_webhook_info().await.unwrap();
    assert_eq!(info.pending_update_count, 3);
    client.delete_webhook(false).await.unwrap();
}
