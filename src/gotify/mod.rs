// src/gotify/mod.rs
//! Gotify side of the bridge: wire types, the REST client used for app
//! metadata and the WebSocket connector used for the message stream.

pub mod rest;
pub mod stream;
pub mod types;

pub use rest::GotifyClient;
pub use stream::WsConnector;
pub use types::{App, StreamMessage};

use anyhow::{Context, Result};
use url::{Position, Url};

/// Header carrying the Gotify client token on both REST and stream requests.
pub const GOTIFY_KEY_HEADER: &str = "X-Gotify-Key";

/// Derive the REST `/application` URL from the configured stream URL.
///
/// * `wss://host/gotify/stream`   → `https://host/gotify/application`
/// * `ws://host/stream?x=y`       → `http://host/application`
/// * `https://host/gotify/stream` → `https://host/gotify/application`
///
/// Unknown schemes become `https`. Query and fragment are dropped.
pub fn apps_url(stream_url: &str) -> Result<Url> {
    let mut url =
        Url::parse(stream_url).with_context(|| format!("invalid GOTIFY_URL: {stream_url}"))?;

    let scheme = match url.scheme() {
        "wss" | "https" => "https",
        "ws" | "http" => "http",
        _ => "https",
    };
    if url.scheme() != scheme && url.set_scheme(scheme).is_err() {
        // url refuses to switch a non-special scheme in place
        let rebuilt = format!("{scheme}://{}", &url[Position::BeforeHost..]);
        url = Url::parse(&rebuilt).with_context(|| format!("invalid GOTIFY_URL: {stream_url}"))?;
    }

    let path = url.path().to_string();
    let base = path.strip_suffix("/stream").unwrap_or(&path).trim_end_matches('/');
    url.set_path(&format!("{base}/application"));
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewrites_stream_url_to_application_endpoint() {
        let cases = [
            ("wss://push.example.com/gotify/stream", "https://push.example.com/gotify/application"),
            ("ws://push.example.com/stream?x=y", "http://push.example.com/application"),
            ("https://push.example.com/gotify/stream", "https://push.example.com/gotify/application"),
            ("http://10.0.0.2:8080/stream#frag", "http://10.0.0.2:8080/application"),
            ("wss://push.example.com/", "https://push.example.com/application"),
            ("wss://push.example.com/stream/", "https://push.example.com/stream/application"),
            ("gotify://push.example.com:8443/stream", "https://push.example.com:8443/application"),
        ];
        for (input, expected) in cases {
            assert_eq!(apps_url(input).unwrap().as_str(), expected, "input {input}");
        }
    }

    #[test]
    fn rejects_garbage() {
        assert!(apps_url("not a url").is_err());
    }

    #[test]
    fn stream_message_uses_gotify_field_names() {
        let raw = r#"{"id":1,"appid":7,"title":"T","message":"M","priority":6,"date":"2024-01-01T00:00:00Z"}"#;
        let msg: StreamMessage = serde_json::from_str(raw).unwrap();
        assert_eq!(
            msg,
            StreamMessage {
                id: 1,
                appid: 7,
                title: "T".into(),
                message: "M".into(),
                priority: 6,
            }
        );
    }

    #[test]
    fn stream_message_tolerates_missing_optional_fields() {
        let msg: StreamMessage = serde_json::from_str(r#"{"id":2,"appid":3}"#).unwrap();
        assert_eq!(msg.priority, 0);
        assert!(msg.title.is_empty());
    }

    #[test]
    fn token_is_masked_to_same_length() {
        let app = App {
            id: 1,
            token: "AbC123".into(),
            name: "x".into(),
            description: String::new(),
            image: String::new(),
        };
        assert_eq!(app.masked_token(), "******");
    }
}
