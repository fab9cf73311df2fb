//! WebSocket channel implementation

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_tungstenite::{
    connect_async_with_config,
    tungstenite::{
        client::IntoClientRequest, http::HeaderValue, protocol::Message as WsMessage,
        protocol::WebSocketConfig as WsProtocolConfig,
    },
};
use tracing::{debug, error, warn};

use crate::error::{Result, TransportError};
use crate::traits::{ChannelEvent, ChannelReceiver, ChannelSender, Connector};

use webrtsp_core::WS_SUBPROTOCOL;

/// Frames buffered per direction before `send` starts failing
const QUEUE_CAPACITY: usize = 100;

/// WebSocket configuration
#[derive(Debug, Clone)]
pub struct WebSocketConfig {
    /// Subprotocol requested in the handshake
    pub subprotocol: String,
    /// Maximum message size
    pub max_message_size: usize,
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            subprotocol: WS_SUBPROTOCOL.to_string(),
            max_message_size: 64 * 1024,
        }
    }
}

/// Opens WebRTSP channels over WebSocket
#[derive(Debug, Clone, Default)]
pub struct WebSocketConnector {
    config: WebSocketConfig,
}

impl WebSocketConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: WebSocketConfig) -> Self {
        Self { config }
    }
}

/// Sending half of a WebSocket channel. Closes the channel when dropped.
pub struct WebSocketSender {
    tx: mpsc::Sender<WsMessage>,
    connected: Arc<Mutex<bool>>,
}

impl ChannelSender for WebSocketSender {
    fn send(&self, text: String) -> Result<()> {
        if !self.is_connected() {
            return Err(TransportError::ConnectionClosed);
        }

        self.tx
            .try_send(WsMessage::Text(text))
            .map_err(|e| TransportError::SendFailed(e.to_string()))
    }

    fn is_connected(&self) -> bool {
        *self.connected.lock()
    }

    fn close(&self) {
        let mut connected = self.connected.lock();
        if *connected {
            *connected = false;
            let _ = self.tx.try_send(WsMessage::Close(None));
        }
    }
}

impl Drop for WebSocketSender {
    fn drop(&mut self) {
        // The reader task holds the socket until the close handshake ends
        self.close();
    }
}

/// Receiving half of a WebSocket channel
pub struct WebSocketReceiver {
    rx: mpsc::Receiver<ChannelEvent>,
}

#[async_trait]
impl ChannelReceiver for WebSocketReceiver {
    async fn recv(&mut self) -> Option<ChannelEvent> {
        self.rx.recv().await
    }
}

#[async_trait]
impl Connector for WebSocketConnector {
    async fn connect(
        &self,
        url: &str,
    ) -> Result<(Box<dyn ChannelSender>, Box<dyn ChannelReceiver>)> {
        url::Url::parse(url).map_err(|e| TransportError::InvalidUrl(e.to_string()))?;

        debug!("Opening WebSocket channel to \"{}\"", url);

        let mut request = url
            .into_client_request()
            .map_err(|e| TransportError::InvalidUrl(e.to_string()))?;
        let subprotocol = HeaderValue::from_str(&self.config.subprotocol)
            .map_err(|e| TransportError::Other(e.to_string()))?;
        request
            .headers_mut()
            .insert("Sec-WebSocket-Protocol", subprotocol);

        let mut ws_config = WsProtocolConfig::default();
        ws_config.max_message_size = Some(self.config.max_message_size);

        let (ws_stream, response) = connect_async_with_config(request, Some(ws_config), false)
            .await
            .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;

        debug!("WebSocket connected, response: {:?}", response.status());

        let (write, read) = ws_stream.split();

        let (send_tx, mut send_rx) = mpsc::channel::<WsMessage>(QUEUE_CAPACITY);
        let (event_tx, event_rx) = mpsc::channel::<ChannelEvent>(QUEUE_CAPACITY);

        let connected = Arc::new(Mutex::new(true));
        let connected_write = connected.clone();
        let connected_read = connected.clone();

        let peer_url = url.to_string();
        tokio::spawn(async move {
            let mut write = write;
            while let Some(frame) = send_rx.recv().await {
                let closing = matches!(frame, WsMessage::Close(_));
                if let Err(e) = write.send(frame).await {
                    error!("Failed to write to \"{}\": {}", peer_url, e);
                    break;
                }
                if closing {
                    break;
                }
            }
            *connected_write.lock() = false;
        });

        let peer_url = url.to_string();
        tokio::spawn(async move {
            let mut read = read;
            let mut reason = None;

            while let Some(result) = read.next().await {
                match result {
                    Ok(WsMessage::Text(text)) => {
                        if event_tx.send(ChannelEvent::Message(text)).await.is_err() {
                            break;
                        }
                    }
                    Ok(WsMessage::Binary(data)) => match String::from_utf8(data) {
                        Ok(text) => {
                            warn!("Binary frame from \"{}\" handled as text", peer_url);
                            if event_tx.send(ChannelEvent::Message(text)).await.is_err() {
                                break;
                            }
                        }
                        Err(_) => warn!("Dropped non UTF-8 binary frame from \"{}\"", peer_url),
                    },
                    Ok(WsMessage::Close(frame)) => {
                        // Polling continues until the close reply is flushed
                        reason = frame.map(|f| f.reason.to_string());
                        debug!("Close frame received: {:?}", reason);
                    }
                    Ok(WsMessage::Ping(_) | WsMessage::Pong(_) | WsMessage::Frame(_)) => {}
                    Err(e) => {
                        error!("Failed to read from \"{}\": {}", peer_url, e);
                        let _ = event_tx.send(ChannelEvent::Error(e.to_string())).await;
                        reason = Some(e.to_string());
                        break;
                    }
                }
            }

            *connected_read.lock() = false;
            let _ = event_tx.send(ChannelEvent::Closed { reason }).await;
        });

        let sender = WebSocketSender {
            tx: send_tx,
            connected,
        };

        let receiver = WebSocketReceiver { rx: event_rx };

        Ok((Box::new(sender), Box::new(receiver)))
    }
}
