//! Reconnecting transport
//!
//! Wraps one channel at a time and drives the connection state machine:
//!
//! ```text
//! Disconnected -> Connecting -> Connected -> Disconnecting -> Disconnected
//!                      \-------------------------------------^ (aborted connect)
//! ```
//!
//! Every channel gets a fresh id. Events coming from a channel whose id no
//! longer matches the current one are ignored, so a superseded channel can
//! never drive the state machine.

use parking_lot::{Mutex, RwLock};
use rand::Rng;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::error::{Result, TransportError};
use crate::traits::{ChannelEvent, ChannelReceiver, ChannelSender, Connector};

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Disconnecting,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Disconnecting => "disconnecting",
        };
        f.write_str(name)
    }
}

/// Auto-reconnect settings
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    pub enabled: bool,
    /// Lower bound of the jittered delay (inclusive)
    pub min_delay: Duration,
    /// Upper bound of the jittered delay (exclusive)
    pub max_delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            min_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(5000),
        }
    }
}

impl ReconnectPolicy {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Delay drawn uniformly from `[min_delay, max_delay)`
    pub fn next_delay(&self) -> Duration {
        if self.max_delay <= self.min_delay {
            return self.min_delay;
        }
        rand::thread_rng().gen_range(self.min_delay..self.max_delay)
    }
}

/// Transport configuration
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub url: String,
    pub reconnect: ReconnectPolicy,
}

impl TransportConfig {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            reconnect: ReconnectPolicy::default(),
        }
    }
}

/// Connected/disconnected callback type
pub type EventHandler = Arc<dyn Fn() + Send + Sync>;

/// Message callback type
pub type MessageHandler = Arc<dyn Fn(String) + Send + Sync>;

#[derive(Default)]
struct Handlers {
    connected: Option<EventHandler>,
    disconnected: Option<EventHandler>,
    message: Option<MessageHandler>,
}

struct Channel {
    id: u64,
    sender: Option<Arc<dyn ChannelSender>>,
    task: JoinHandle<()>,
}

#[derive(Default)]
struct Shared {
    state: ConnectionState,
    channel: Option<Channel>,
    keep_connection: bool,
    reconnect_task: Option<JoinHandle<()>>,
}

struct Inner {
    config: TransportConfig,
    connector: Arc<dyn Connector>,
    shared: Mutex<Shared>,
    state_tx: watch::Sender<ConnectionState>,
    handlers: RwLock<Handlers>,
    next_channel_id: AtomicU64,
}

/// A reconnecting, callback-driven message transport.
///
/// Cheap to clone; clones share the same connection.
#[derive(Clone)]
pub struct Transport {
    inner: Arc<Inner>,
}

impl Transport {
    pub fn new(config: TransportConfig, connector: Arc<dyn Connector>) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            inner: Arc::new(Inner {
                config,
                connector,
                shared: Mutex::new(Shared::default()),
                state_tx,
                handlers: RwLock::new(Handlers::default()),
                next_channel_id: AtomicU64::new(1),
            }),
        }
    }

    /// Transport over the default WebSocket connector
    #[cfg(feature = "websocket")]
    pub fn websocket(config: TransportConfig) -> Self {
        Self::new(config, Arc::new(crate::websocket::WebSocketConnector::new()))
    }

    pub fn url(&self) -> &str {
        &self.inner.config.url
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.shared.lock().state
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Observe state transitions
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state_tx.subscribe()
    }

    /// Whether an auto-reconnect is currently scheduled
    pub fn reconnect_pending(&self) -> bool {
        self.inner.shared.lock().reconnect_task.is_some()
    }

    /// Register the connected callback, replacing any previous one
    pub fn on_connected<F>(&self, handler: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.inner.handlers.write().connected = Some(Arc::new(handler));
    }

    /// Register the disconnected callback, replacing any previous one
    pub fn on_disconnected<F>(&self, handler: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.inner.handlers.write().disconnected = Some(Arc::new(handler));
    }

    /// Register the message callback, replacing any previous one
    pub fn on_message<F>(&self, handler: F)
    where
        F: Fn(String) + Send + Sync + 'static,
    {
        self.inner.handlers.write().message = Some(Arc::new(handler));
    }

    /// Start connecting and arm auto-reconnect.
    ///
    /// Must be called from within a tokio runtime.
    pub fn connect(&self) -> Result<()> {
        Inner::connect(&self.inner)
    }

    /// Disarm auto-reconnect and close the connection.
    ///
    /// While connecting, the attempt is aborted on the spot and no
    /// disconnected callback fires. While connected, a close is requested
    /// and this resolves once the close handler has driven the state back to
    /// `Disconnected`.
    pub async fn disconnect(&self) -> Result<()> {
        {
            let mut shared = self.inner.shared.lock();

            if shared.channel.is_none() {
                if shared.keep_connection || shared.reconnect_task.is_some() {
                    shared.keep_connection = false;
                    Inner::cancel_reconnect(&mut shared);
                    info!("Reconnect cancelled");
                    return Ok(());
                }
                return Err(TransportError::InvalidState(
                    "no initialized connection".to_string(),
                ));
            }

            Inner::cancel_reconnect(&mut shared);
            shared.keep_connection = false;

            match shared.state {
                ConnectionState::Connecting => {
                    self.inner.set_state(&mut shared, ConnectionState::Disconnected);
                    if let Some(channel) = shared.channel.take() {
                        channel.task.abort();
                        if let Some(sender) = channel.sender {
                            sender.close();
                        }
                    }
                    info!("Connect aborted");
                    return Ok(());
                }
                ConnectionState::Connected => {
                    self.inner.set_state(&mut shared, ConnectionState::Disconnecting);
                    if let Some(sender) = shared.channel.as_ref().and_then(|c| c.sender.as_ref()) {
                        sender.close();
                    }
                }
                ConnectionState::Disconnecting | ConnectionState::Disconnected => {}
            }
        }

        let mut state_rx = self.inner.state_tx.subscribe();
        let _ = state_rx
            .wait_for(|state| *state == ConnectionState::Disconnected)
            .await;

        Ok(())
    }

    /// Send one message. Fails unless the state is exactly `Connected`.
    pub fn send(&self, text: String) -> Result<()> {
        let sender = {
            let shared = self.inner.shared.lock();
            match (&shared.state, shared.channel.as_ref().and_then(|c| c.sender.clone())) {
                (ConnectionState::Connected, Some(sender)) => sender,
                _ => return Err(TransportError::InvalidState("not connected".to_string())),
            }
        };

        sender.send(text)
    }
}

impl Inner {
    fn set_state(&self, shared: &mut Shared, state: ConnectionState) {
        if shared.state != state {
            debug!("Transport state: {} -> {}", shared.state, state);
        }
        shared.state = state;
        self.state_tx.send_replace(state);
    }

    fn cancel_reconnect(shared: &mut Shared) {
        if let Some(task) = shared.reconnect_task.take() {
            task.abort();
        }
    }

    fn connect(this: &Arc<Self>) -> Result<()> {
        let mut shared = this.shared.lock();

        if shared.channel.is_some() {
            return Err(TransportError::InvalidState(
                "already has an active connection attempt".to_string(),
            ));
        }

        Self::cancel_reconnect(&mut shared);
        shared.keep_connection = true;
        this.set_state(&mut shared, ConnectionState::Connecting);

        let id = this.next_channel_id.fetch_add(1, Ordering::SeqCst);
        info!("Connecting to \"{}\"...", this.config.url);

        let task = tokio::spawn(run_channel(
            Arc::downgrade(this),
            id,
            this.connector.clone(),
            this.config.url.clone(),
        ));

        shared.channel = Some(Channel {
            id,
            sender: None,
            task,
        });

        Ok(())
    }

    fn is_current(shared: &Shared, id: u64) -> bool {
        shared.channel.as_ref().map(|c| c.id) == Some(id)
    }

    /// Returns false if the channel was superseded and has been closed
    fn on_open(&self, id: u64, sender: Box<dyn ChannelSender>) -> bool {
        {
            let mut shared = self.shared.lock();
            let Some(channel) = shared.channel.as_mut().filter(|c| c.id == id) else {
                sender.close();
                return false;
            };
            channel.sender = Some(Arc::from(sender));
            self.set_state(&mut shared, ConnectionState::Connected);
        }

        info!("Connected");

        let handler = self.handlers.read().connected.clone();
        if let Some(handler) = handler {
            handler();
        }

        true
    }

    fn on_error(&self, id: u64, error: &str) {
        if !Self::is_current(&self.shared.lock(), id) {
            return;
        }
        error!("Channel error: {}", error);
    }

    fn on_message(&self, id: u64, text: String) {
        if !Self::is_current(&self.shared.lock(), id) {
            return;
        }

        let handler = self.handlers.read().message.clone();
        if let Some(handler) = handler {
            handler(text);
        }
    }

    fn on_close(this: &Arc<Self>, id: u64, reason: Option<String>) {
        {
            let mut shared = this.shared.lock();
            if !Self::is_current(&shared, id) {
                return;
            }
            this.set_state(&mut shared, ConnectionState::Disconnected);
            shared.channel = None;
        }

        info!("Disconnected: {:?}", reason);

        let handler = this.handlers.read().disconnected.clone();
        if let Some(handler) = handler {
            handler();
        }

        Self::schedule_reconnect(this);
    }

    fn schedule_reconnect(this: &Arc<Self>) {
        let mut shared = this.shared.lock();

        if !shared.keep_connection || !this.config.reconnect.enabled {
            return;
        }
        if shared.reconnect_task.is_some() {
            return;
        }

        let delay = this.config.reconnect.next_delay();
        let weak = Arc::downgrade(this);
        shared.reconnect_task = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            let Some(this) = weak.upgrade() else {
                return;
            };
            {
                let mut shared = this.shared.lock();
                shared.reconnect_task = None;
                if !shared.keep_connection || shared.state != ConnectionState::Disconnected {
                    return;
                }
            }
            if let Err(e) = Self::connect(&this) {
                error!("Reconnect failed: {}", e);
            }
        }));

        info!("Scheduled reconnect in {} ms...", delay.as_millis());
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        let shared = self.shared.get_mut();
        Self::cancel_reconnect(shared);
        if let Some(channel) = shared.channel.take() {
            channel.task.abort();
            if let Some(sender) = channel.sender {
                sender.close();
            }
        }
    }
}

async fn run_channel(inner: Weak<Inner>, id: u64, connector: Arc<dyn Connector>, url: String) {
    let result = connector.connect(&url).await;

    let Some(this) = inner.upgrade() else {
        return;
    };

    let mut receiver: Box<dyn ChannelReceiver> = match result {
        Ok((sender, receiver)) => {
            if !this.on_open(id, sender) {
                return;
            }
            receiver
        }
        Err(e) => {
            error!("Connection to \"{}\" failed: {}", url, e);
            Inner::on_close(&this, id, Some(e.to_string()));
            return;
        }
    };
    drop(this);

    loop {
        let event = receiver.recv().await;

        let Some(this) = inner.upgrade() else {
            return;
        };

        match event {
            Some(ChannelEvent::Message(text)) => this.on_message(id, text),
            Some(ChannelEvent::Error(e)) => this.on_error(id, &e),
            Some(ChannelEvent::Closed { reason }) => {
                Inner::on_close(&this, id, reason);
                return;
            }
            None => {
                Inner::on_close(&this, id, None);
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reconnect_delay_jitter_bounds() {
        let policy = ReconnectPolicy::default();
        for _ in 0..1000 {
            let delay = policy.next_delay();
            assert!(delay >= Duration::from_millis(1000), "{:?}", delay);
            assert!(delay < Duration::from_millis(5000), "{:?}", delay);
        }
    }

    #[test]
    fn test_reconnect_delay_degenerate_range() {
        let policy = ReconnectPolicy {
            enabled: true,
            min_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(10),
        };
        assert_eq!(policy.next_delay(), Duration::from_millis(10));
    }

    #[test]
    fn test_state_display() {
        assert_eq!(ConnectionState::Disconnecting.to_string(), "disconnecting");
        assert_eq!(ConnectionState::default(), ConnectionState::Disconnected);
    }
}
