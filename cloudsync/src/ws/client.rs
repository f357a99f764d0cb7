//! WebSocket subscriber for deployment status streams.
//!
//! Connects to the platform's status endpoint for one deployment and forwards
//! every parsed status message into an mpsc channel consumed by
//! [`super::wait_for_deployment`]. The forwarding task ends on the first
//! terminal status, on close, or when the receiver is dropped.

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

use super::{DeployStatusEvent, StatusReceiver, STATUS_CHANNEL_CAPACITY};
use crate::utils::{Result, SyncError};

/// Map an HTTP(S) base URL onto its WebSocket equivalent.
pub fn to_ws_url(http_url: &str) -> String {
    if let Some(rest) = http_url.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = http_url.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        http_url.to_string()
    }
}

/// Subscribe to the status stream at `url`.
pub async fn subscribe(url: &str, token: Option<&str>) -> Result<StatusReceiver> {
    let mut request = url.into_client_request()?;
    if let Some(token) = token {
        let value = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|e| SyncError::Config(format!("invalid API token: {e}")))?;
        request.headers_mut().insert("authorization", value);
    }

    info!("Subscribing to deployment status: {}", url);
    let (ws_stream, _) = connect_async(request).await?;
    let (mut write, mut read) = ws_stream.split();

    let (tx, rx) = mpsc::channel(STATUS_CHANNEL_CAPACITY);

    tokio::spawn(async move {
        while let Some(msg) = read.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    let event = match serde_json::from_str::<DeployStatusEvent>(&text) {
                        Ok(event) => event,
                        Err(e) => {
                            warn!("Ignoring unparseable status message: {} (raw: {})", e, text);
                            continue;
                        }
                    };
                    let terminal = event.status.is_terminal();
                    if tx.send(event).await.is_err() || terminal {
                        break;
                    }
                }
                Ok(Message::Ping(data)) => {
                    if write.send(Message::Pong(data)).await.is_err() {
                        break;
                    }
                }
                Ok(Message::Close(_)) => {
                    debug!("Status stream closed by server");
                    break;
                }
                Err(e) => {
                    warn!("Status stream read error: {}", e);
                    break;
                }
                _ => {}
            }
        }
        let _ = write.send(Message::Close(None)).await;
    });

    Ok(rx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_urls_map_to_ws() {
        assert_eq!(to_ws_url("https://api.example.com/v1"), "wss://api.example.com/v1");
        assert_eq!(to_ws_url("http://localhost:8080"), "ws://localhost:8080");
        assert_eq!(to_ws_url("ws://already"), "ws://already");
    }

    #[tokio::test]
    async fn secure_urls_attempt_a_tls_handshake() {
        use tokio_tungstenite::tungstenite::error::{Error as WsError, UrlError};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            // Accept and hang up without speaking TLS.
            if let Ok((socket, _)) = listener.accept().await {
                drop(socket);
            }
        });

        let url = format!("wss://127.0.0.1:{port}/deployments/d-1/status");
        let err = match subscribe(&url, None).await {
            Ok(_) => panic!("handshake against a plain socket must fail"),
            Err(e) => e,
        };
        assert!(
            !matches!(err, SyncError::WebSocket(WsError::Url(UrlError::TlsFeatureNotEnabled))),
            "wss support is missing: {err}"
        );
    }
}
