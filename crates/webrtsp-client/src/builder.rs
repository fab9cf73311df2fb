//! Client builder

use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use webrtsp_transport::{
    ConnectionState, Connector, ReconnectPolicy, Transport, TransportConfig, TransportError,
    WebSocketConfig, WebSocketConnector,
};

use crate::client::WebRtspClient;
use crate::error::{ClientError, Result};

/// Builder for [`WebRtspClient`]
pub struct WebRtspClientBuilder {
    url: String,
    websocket: WebSocketConfig,
    reconnect: ReconnectPolicy,
    trace_messages: bool,
    connector: Option<Arc<dyn Connector>>,
}

impl WebRtspClientBuilder {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            websocket: WebSocketConfig::default(),
            reconnect: ReconnectPolicy::default(),
            trace_messages: true,
            connector: None,
        }
    }

    /// WebSocket subprotocol requested in the handshake
    pub fn subprotocol(mut self, subprotocol: &str) -> Self {
        self.websocket.subprotocol = subprotocol.to_string();
        self
    }

    /// Maximum accepted WebSocket message size
    pub fn max_message_size(mut self, size: usize) -> Self {
        self.websocket.max_message_size = size;
        self
    }

    /// Enable or disable auto-reconnect
    pub fn reconnect(mut self, enabled: bool) -> Self {
        self.reconnect.enabled = enabled;
        self
    }

    /// Jitter range for the auto-reconnect delay
    pub fn reconnect_delay(mut self, min: Duration, max: Duration) -> Self {
        self.reconnect.min_delay = min;
        self.reconnect.max_delay = max;
        self
    }

    /// Log every sent and received message at debug level
    pub fn trace_messages(mut self, enabled: bool) -> Self {
        self.trace_messages = enabled;
        self
    }

    /// Use a custom channel connector instead of WebSocket
    pub fn connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connector = Some(connector);
        self
    }

    /// Build the client without connecting
    pub fn build(self) -> WebRtspClient {
        let connector: Arc<dyn Connector> = match self.connector {
            Some(connector) => connector,
            None => Arc::new(WebSocketConnector::with_config(self.websocket)),
        };

        let config = TransportConfig {
            url: self.url,
            reconnect: self.reconnect,
        };

        WebRtspClient::with_transport(Transport::new(config, connector), self.trace_messages)
    }

    /// Build the client and wait for the first connection attempt.
    ///
    /// Fails if that attempt does not end up connected.
    pub async fn connect(self) -> Result<WebRtspClient> {
        let client = self.build();
        let mut state_rx = client.subscribe_state();

        client.connect()?;

        let connected = match state_rx
            .wait_for(|state| *state != ConnectionState::Connecting)
            .await
        {
            Ok(state) => *state == ConnectionState::Connected,
            Err(_) => false,
        };

        if !connected {
            warn!("Failed to connect to \"{}\"", client.transport().url());
            let _ = client.disconnect().await;
            return Err(ClientError::Transport(TransportError::ConnectionFailed(
                client.transport().url().to_string(),
            )));
        }

        Ok(client)
    }
}
