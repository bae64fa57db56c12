//! WebSocket push channel.
//!
//! The service streams captured requests over `/api/ws`: the client sends
//! its token as the first text frame, the service replies with the stored
//! history as `{"data": [...]}`, then pushes each new capture as
//! `{"data": "<json-encoded request>"}`.

use futures::{SinkExt, StreamExt};
use log::{debug, warn};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use url::Url;

use crate::api::models::{decode_request_list, CapturedRequest};
use crate::config::{HTTP_STATUS_FORBIDDEN, HTTP_STATUS_UNAUTHORIZED};
use crate::error_handling::{Error, NetworkError, Result};
use crate::initialization::init_crypto_provider;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// An authenticated subscription to the session's captures.
pub(crate) struct PushChannel {
    socket: Socket,
}

impl std::fmt::Debug for PushChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PushChannel").finish_non_exhaustive()
    }
}

/// What one frame meant.
enum Frame {
    Requests(Vec<CapturedRequest>),
    Closed(Option<String>),
    Control,
}

impl PushChannel {
    /// Connects, authenticates and returns the channel with the stored history.
    ///
    /// # Errors
    ///
    /// `Error::Authentication` if the service closes the socket before sending
    /// history; `Error::Network` for transport failures.
    pub(crate) async fn connect(url: &Url, token: &str) -> Result<(Self, Vec<CapturedRequest>)> {
        init_crypto_provider();

        debug!("Connecting push channel to {}", url);
        let (socket, _response) = match connect_async(url.as_str()).await {
            Ok(connected) => connected,
            Err(tungstenite::Error::Http(response))
                if response.status().as_u16() == HTTP_STATUS_UNAUTHORIZED
                    || response.status().as_u16() == HTTP_STATUS_FORBIDDEN =>
            {
                return Err(Error::Authentication(format!(
                    "push channel upgrade refused (HTTP {})",
                    response.status().as_u16()
                )))
            }
            Err(e) => return Err(e.into()),
        };
        let mut channel = Self { socket };
        channel.socket.send(Message::Text(token.to_string())).await?;

        loop {
            match channel.read_frame().await? {
                Frame::Requests(history) => {
                    debug!("Push channel ready, {} stored requests", history.len());
                    return Ok((channel, history));
                }
                Frame::Closed(reason) => {
                    return Err(Error::Authentication(match reason {
                        Some(reason) if !reason.is_empty() => {
                            format!("push channel refused the token: {}", reason)
                        }
                        _ => "push channel closed before sending history".to_string(),
                    }))
                }
                Frame::Control => continue,
            }
        }
    }

    /// Waits for the next pushed batch.
    ///
    /// # Errors
    ///
    /// `Error::Network(NetworkError::Closed)` once the service hangs up.
    pub(crate) async fn recv(&mut self) -> Result<Vec<CapturedRequest>> {
        loop {
            match self.read_frame().await? {
                Frame::Requests(batch) => return Ok(batch),
                Frame::Closed(reason) => {
                    if let Some(reason) = reason {
                        debug!("Push channel closed: {}", reason);
                    }
                    return Err(Error::Network(NetworkError::Closed));
                }
                Frame::Control => continue,
            }
        }
    }

    /// Closes the socket; errors are only logged.
    pub(crate) async fn close(mut self) {
        if let Err(e) = self.socket.close(None).await {
            debug!("Push channel close failed: {}", e);
        }
    }

    async fn read_frame(&mut self) -> Result<Frame> {
        let message = match self.socket.next().await {
            Some(message) => message?,
            None => return Ok(Frame::Closed(None)),
        };

        let text = match message {
            Message::Text(text) => text,
            Message::Binary(bytes) => String::from_utf8(bytes).map_err(|e| {
                Error::MalformedResponse(format!("push frame is not UTF-8: {}", e))
            })?,
            Message::Close(frame) => {
                return Ok(Frame::Closed(frame.map(|f| f.reason.to_string())))
            }
            Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => return Ok(Frame::Control),
        };

        let value: Value = serde_json::from_str(&text).map_err(|e| {
            Error::MalformedResponse(format!("push frame is not valid JSON: {}", e))
        })?;
        if let Value::Object(map) = &value {
            if let Some(Value::String(error)) = map.get("error") {
                warn!("Push channel reported: {}", error);
                return Ok(Frame::Closed(Some(error.clone())));
            }
        }
        decode_request_list(value).map(Frame::Requests)
    }
}
