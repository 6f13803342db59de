// src/gotify/stream.rs
use anyhow::{Context, Result};
use futures_util::StreamExt;
use tokio_tungstenite::tungstenite::{
    self, client::IntoClientRequest, http::HeaderValue, Message,
};
use tracing::{debug, info};

use super::GOTIFY_KEY_HEADER;
use crate::supervisor::{Connector, FrameStream};

/// Opens the Gotify `/stream` WebSocket with the client token header.
#[derive(Debug, Clone)]
pub struct WsConnector {
    url: String,
    token: String,
}

impl WsConnector {
    pub fn new(url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            token: token.into(),
        }
    }
}

#[async_trait::async_trait]
impl Connector for WsConnector {
    async fn connect(&self) -> Result<FrameStream> {
        let mut request = self
            .url
            .as_str()
            .into_client_request()
            .with_context(|| format!("invalid stream url {}", self.url))?;
        let key = HeaderValue::from_str(&self.token).context("client token is not a valid header value")?;
        request.headers_mut().insert(GOTIFY_KEY_HEADER, key);

        let (ws, _response) = tokio_tungstenite::connect_async(request)
            .await
            .with_context(|| format!("connect {}", self.url))?;
        info!(url = %self.url, "connected to gotify stream");

        Ok(payloads(ws).boxed())
    }
}

/// Turn the socket into a stream of message payloads.
///
/// Ends at a Close frame or when the socket ends; a read error is yielded once
/// and then the stream ends. Ping/Pong replies are handled by tungstenite.
fn payloads<S>(ws: S) -> impl futures_util::Stream<Item = Result<Vec<u8>>> + Send
where
    S: futures_util::Stream<Item = Result<Message, tungstenite::Error>> + Send + Unpin,
{
    futures_util::stream::unfold(Some(ws), |state| async move {
        let mut ws = state?;
        loop {
            match ws.next().await {
                Some(Ok(Message::Text(text))) => {
                    return Some((Ok(text.as_bytes().to_vec()), Some(ws)));
                }
                Some(Ok(Message::Binary(data))) => return Some((Ok(data.to_vec()), Some(ws))),
                Some(Ok(Message::Close(frame))) => {
                    debug!(?frame, "gotify sent close frame");
                    return None;
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => {
                    return Some((Err(anyhow::Error::new(e).context("stream read")), None));
                }
                None => return None,
            }
        }
    })
}
