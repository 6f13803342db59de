// tests/gotify_source.rs
//
// Gotify REST + WebSocket clients against an in-process axum stub.

use axum::extract::ws::{Message, WebSocketUpgrade};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use futures_util::StreamExt;
use gotify_ntfy_bridge::gotify::{GotifyClient, WsConnector};
use gotify_ntfy_bridge::supervisor::Connector;
use gotify_ntfy_bridge::sync::AppSource;
use serde_json::json;

const TOKEN: &str = "C1ientT0ken";

fn authorized(headers: &HeaderMap) -> bool {
    headers.get("x-gotify-key").and_then(|v| v.to_str().ok()) == Some(TOKEN)
}

async fn applications(headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    Json(json!([
        {"id": 1, "token": "AaBb", "name": "Backups", "description": "nightly", "internal": false, "image": "image/image.jpeg"},
        {"id": 9, "token": "CcDd", "name": "Home Assistant", "description": ""}
    ]))
    .into_response()
}

async fn stream(headers: HeaderMap, ws: WebSocketUpgrade) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    ws.on_upgrade(|mut socket| async move {
        let frames = [
            json!({"id": 1, "appid": 9, "title": "door", "message": "open", "priority": 6}),
            json!({"id": 2, "appid": 1, "title": "backup", "message": "done", "priority": 2}),
        ];
        for f in frames {
            if socket.send(Message::Text(f.to_string().into())).await.is_err() {
                return;
            }
        }
        let _ = socket.send(Message::Close(None)).await;
    })
}

async fn spawn_gotify_stub() -> String {
    let router = Router::new()
        .route("/gotify/application", get(applications))
        .route("/gotify/stream", get(stream));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind stub");
    let addr = listener.local_addr().expect("stub addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("serve stub");
    });
    format!("ws://{addr}/gotify/stream")
}

#[tokio::test]
async fn fetch_apps_uses_rewritten_url_and_token_header() {
    let stream_url = spawn_gotify_stub().await;
    let client = GotifyClient::new(&stream_url, TOKEN).unwrap();
    assert!(client.apps_url().as_str().starts_with("http://"));
    assert!(client.apps_url().as_str().ends_with("/gotify/application"));

    let apps = client.fetch_apps().await.expect("fetch apps");
    assert_eq!(apps.len(), 2);
    assert_eq!(apps[0].name, "Backups");
    assert_eq!(apps[0].description, "nightly");
    assert_eq!(apps[1].id, 9);
    assert!(apps[1].image.is_empty());
}

#[tokio::test]
async fn fetch_apps_fails_on_non_2xx() {
    let stream_url = spawn_gotify_stub().await;
    let client = GotifyClient::new(&stream_url, "wrong").unwrap();

    let err = client.fetch_apps().await.expect_err("401 must fail");
    assert!(format!("{err:#}").contains("401"), "{err:#}");
}

#[tokio::test]
async fn ws_connector_yields_frames_until_close() {
    let stream_url = spawn_gotify_stub().await;
    let connector = WsConnector::new(stream_url, TOKEN);

    let frames: Vec<_> = connector.connect().await.expect("connect").collect().await;

    assert_eq!(frames.len(), 2);
    let first: serde_json::Value = serde_json::from_slice(frames[0].as_ref().unwrap()).unwrap();
    assert_eq!(first["appid"], 9);
    let second: serde_json::Value = serde_json::from_slice(frames[1].as_ref().unwrap()).unwrap();
    assert_eq!(second["title"], "backup");
}

#[tokio::test]
async fn ws_connector_fails_without_valid_token() {
    let stream_url = spawn_gotify_stub().await;
    let connector = WsConnector::new(stream_url, "wrong");
    assert!(connector.connect().await.is_err());
}
