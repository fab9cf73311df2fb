//! Common test helpers for WebRTSP tests
//!
//! This crate provides:
//! - Condition-based waiting (no hardcoded sleeps)
//! - An in-process WebSocket peer ([`TestServer`]) with RAII cleanup
//! - A scriptable [`MockConnector`] for driving transport edge cases
//! - Tracing initialisation for test output

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Notify};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::{
    handshake::server::{Request as HsRequest, Response as HsResponse},
    protocol::Message as WsMessage,
};

use webrtsp_core::{parse_request, parse_response, Request, Response, WS_SUBPROTOCOL};
use webrtsp_transport::{
    ChannelEvent, ChannelReceiver, ChannelSender, Connector, Result as TransportResult,
    TransportError,
};

/// Default test timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default condition check interval
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_millis(10);

/// Install a fmt subscriber honouring `RUST_LOG`. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ============================================================================
// Condition-Based Waiting
// ============================================================================

/// Wait for a condition with timeout - condition-based, not time-based
pub async fn wait_for<F, Fut>(check: F, interval: Duration, max_wait: Duration) -> bool
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let start = Instant::now();
    while start.elapsed() < max_wait {
        if check().await {
            return true;
        }
        tokio::time::sleep(interval).await;
    }
    false
}

/// Wait for an atomic counter to reach a target value
pub async fn wait_for_count(counter: &AtomicU32, target: u32, max_wait: Duration) -> bool {
    wait_for(
        || async { counter.load(Ordering::SeqCst) >= target },
        DEFAULT_CHECK_INTERVAL,
        max_wait,
    )
    .await
}

/// Wait for a boolean flag to become true
pub async fn wait_for_flag(flag: &AtomicBool, max_wait: Duration) -> bool {
    wait_for(
        || async { flag.load(Ordering::SeqCst) },
        DEFAULT_CHECK_INTERVAL,
        max_wait,
    )
    .await
}

/// Counter that can be handed to callbacks
#[derive(Clone, Default)]
pub struct EventCounter {
    count: Arc<AtomicU32>,
}

impl EventCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn callback(&self) -> impl Fn() + Send + Sync + 'static {
        let count = self.count.clone();
        move || {
            count.fetch_add(1, Ordering::SeqCst);
        }
    }

    pub fn count(&self) -> u32 {
        self.count.load(Ordering::SeqCst)
    }

    pub async fn wait_for_count(&self, n: u32, max_wait: Duration) -> bool {
        wait_for_count(&self.count, n, max_wait).await
    }
}

// ============================================================================
// Test Server - an in-process WebRTSP peer
// ============================================================================

/// A WebSocket peer on an ephemeral port that records every inbound text
/// message and lets the test push messages or close the current connection.
/// Stops on drop.
pub struct TestServer {
    port: u16,
    handle: Option<tokio::task::JoinHandle<()>>,
    inbound: tokio::sync::Mutex<mpsc::UnboundedReceiver<String>>,
    current: Arc<Mutex<Option<mpsc::UnboundedSender<WsMessage>>>>,
    connections: Arc<AtomicU32>,
}

impl TestServer {
    pub async fn start() -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test server");
        let port = listener.local_addr().expect("local addr").port();

        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let current = Arc::new(Mutex::new(None));
        let connections = Arc::new(AtomicU32::new(0));

        let current_clone = current.clone();
        let connections_clone = connections.clone();
        let handle = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let ws_stream = match tokio_tungstenite::accept_hdr_async(
                    stream,
                    |req: &HsRequest, mut response: HsResponse| {
                        let requested = req
                            .headers()
                            .get("Sec-WebSocket-Protocol")
                            .and_then(|p| p.to_str().ok())
                            .map(|p| p.split(',').any(|s| s.trim() == WS_SUBPROTOCOL))
                            .unwrap_or(false);
                        if requested {
                            response.headers_mut().insert(
                                "Sec-WebSocket-Protocol",
                                WS_SUBPROTOCOL.parse().expect("header value"),
                            );
                        }
                        Ok(response)
                    },
                )
                .await
                {
                    Ok(ws) => ws,
                    Err(_) => continue,
                };

                let (mut write, mut read) = ws_stream.split();
                let (out_tx, mut out_rx) = mpsc::unbounded_channel::<WsMessage>();
                *current_clone.lock() = Some(out_tx);
                connections_clone.fetch_add(1, Ordering::SeqCst);

                tokio::spawn(async move {
                    while let Some(msg) = out_rx.recv().await {
                        if write.send(msg).await.is_err() {
                            break;
                        }
                    }
                });

                let inbound_tx = inbound_tx.clone();
                tokio::spawn(async move {
                    while let Some(Ok(msg)) = read.next().await {
                        if let WsMessage::Text(text) = msg {
                            let _ = inbound_tx.send(text);
                        }
                    }
                });
            }
        });

        Self {
            port,
            handle: Some(handle),
            inbound: tokio::sync::Mutex::new(inbound_rx),
            current,
            connections,
        }
    }

    /// WebSocket URL of this server
    pub fn url(&self) -> String {
        format!("ws://127.0.0.1:{}", self.port)
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Number of accepted connections so far
    pub fn connection_count(&self) -> u32 {
        self.connections.load(Ordering::SeqCst)
    }

    pub async fn wait_for_connections(&self, n: u32, max_wait: Duration) -> bool {
        wait_for_count(&self.connections, n, max_wait).await
    }

    /// Push a text message to the most recent connection
    pub fn send(&self, text: impl Into<String>) -> bool {
        match self.current.lock().as_ref() {
            Some(tx) => tx.send(WsMessage::Text(text.into())).is_ok(),
            None => false,
        }
    }

    /// Initiate a close handshake on the most recent connection
    pub fn close_connection(&self) {
        if let Some(tx) = self.current.lock().take() {
            let _ = tx.send(WsMessage::Close(None));
        }
    }

    /// Next inbound text message
    pub async fn recv(&self, max_wait: Duration) -> Option<String> {
        let mut inbound = self.inbound.lock().await;
        timeout(max_wait, inbound.recv()).await.ok().flatten()
    }

    /// Next inbound message, parsed as a request
    pub async fn recv_request(&self) -> Request {
        let text = self.recv(DEFAULT_TIMEOUT).await.expect("no request received");
        parse_request(&text).unwrap_or_else(|e| panic!("invalid request {:?}: {}", text, e))
    }

    /// Next inbound message, parsed as a response
    pub async fn recv_response(&self) -> Response {
        let text = self.recv(DEFAULT_TIMEOUT).await.expect("no response received");
        parse_response(&text).unwrap_or_else(|e| panic!("invalid response {:?}: {}", text, e))
    }

    /// Stop accepting connections (also happens on drop)
    pub fn stop(&mut self) {
        self.close_connection();
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.stop();
    }
}

// ============================================================================
// Mock Connector - scripted channel outcomes
// ============================================================================

/// Outcome of one [`MockConnector::connect`] call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockOutcome {
    /// Open a mock channel
    Accept,
    /// Fail the attempt
    Refuse,
    /// Never complete
    Hang,
}

/// Peer side of an open mock channel
#[derive(Clone)]
pub struct MockPeer {
    events: mpsc::UnboundedSender<ChannelEvent>,
    sent: Arc<Mutex<Vec<String>>>,
    closed: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl MockPeer {
    /// Deliver a message to the transport
    pub fn push(&self, text: impl Into<String>) {
        let _ = self.events.send(ChannelEvent::Message(text.into()));
    }

    /// Close the channel from the remote side
    pub fn close(&self) {
        let _ = self.events.send(ChannelEvent::Closed {
            reason: Some("closed by peer".to_string()),
        });
    }

    /// Messages the transport sent on this channel
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().clone()
    }

    pub async fn wait_for_sent(&self, n: usize, max_wait: Duration) -> bool {
        let deadline = Instant::now() + max_wait;
        loop {
            if self.sent.lock().len() >= n {
                return true;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }
            let _ = timeout(remaining.min(DEFAULT_CHECK_INTERVAL), self.notify.notified()).await;
        }
    }

    /// Whether the transport asked this channel to close
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

struct MockSender {
    peer: MockPeer,
}

impl ChannelSender for MockSender {
    fn send(&self, text: String) -> TransportResult<()> {
        if self.peer.is_closed() {
            return Err(TransportError::ConnectionClosed);
        }
        self.peer.sent.lock().push(text);
        self.peer.notify.notify_waiters();
        Ok(())
    }

    fn is_connected(&self) -> bool {
        !self.peer.is_closed()
    }

    fn close(&self) {
        if !self.peer.closed.swap(true, Ordering::SeqCst) {
            // Local close completes immediately, as after a close handshake
            let _ = self.peer.events.send(ChannelEvent::Closed { reason: None });
        }
    }
}

struct MockReceiver {
    rx: mpsc::UnboundedReceiver<ChannelEvent>,
}

#[async_trait]
impl ChannelReceiver for MockReceiver {
    async fn recv(&mut self) -> Option<ChannelEvent> {
        self.rx.recv().await
    }
}

/// Connector whose attempts follow a script; once the script runs out
/// every further attempt uses the fallback outcome.
pub struct MockConnector {
    script: Mutex<VecDeque<MockOutcome>>,
    fallback: MockOutcome,
    attempts: AtomicU32,
    peers: Mutex<Vec<MockPeer>>,
}

impl MockConnector {
    pub fn new(fallback: MockOutcome) -> Arc<Self> {
        Self::scripted(Vec::new(), fallback)
    }

    pub fn scripted(script: Vec<MockOutcome>, fallback: MockOutcome) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            fallback,
            attempts: AtomicU32::new(0),
            peers: Mutex::new(Vec::new()),
        })
    }

    /// Number of connect calls so far
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    pub async fn wait_for_attempts(&self, n: u32, max_wait: Duration) -> bool {
        wait_for_count(&self.attempts, n, max_wait).await
    }

    /// Peer of the most recently opened channel
    pub fn last_peer(&self) -> Option<MockPeer> {
        self.peers.lock().last().cloned()
    }

    /// Number of channels opened so far
    pub fn opened(&self) -> usize {
        self.peers.lock().len()
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(
        &self,
        _url: &str,
    ) -> TransportResult<(Box<dyn ChannelSender>, Box<dyn ChannelReceiver>)> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let outcome = self.script.lock().pop_front().unwrap_or(self.fallback);

        match outcome {
            MockOutcome::Accept => {
                let (events, rx) = mpsc::unbounded_channel();
                let peer = MockPeer {
                    events,
                    sent: Arc::new(Mutex::new(Vec::new())),
                    closed: Arc::new(AtomicBool::new(false)),
                    notify: Arc::new(Notify::new()),
                };
                self.peers.lock().push(peer.clone());
                Ok((Box::new(MockSender { peer }), Box::new(MockReceiver { rx })))
            }
            MockOutcome::Refuse => Err(TransportError::ConnectionFailed(
                "connection refused".to_string(),
            )),
            MockOutcome::Hang => std::future::pending().await,
        }
    }
}
