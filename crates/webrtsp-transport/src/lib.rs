//! WebRTSP Transport Layer
//!
//! This crate provides:
//! - Channel traits ([`Connector`], [`ChannelSender`], [`ChannelReceiver`])
//! - WebSocket channels over tokio-tungstenite ([`WebSocketConnector`])
//! - A reconnecting [`Transport`] with a four-state connection state machine
//!   and jittered auto-reconnect

pub mod error;
pub mod traits;
pub mod transport;

#[cfg(feature = "websocket")]
pub mod websocket;

pub use error::{Result, TransportError};
pub use traits::{ChannelEvent, ChannelReceiver, ChannelSender, Connector};
pub use transport::{
    ConnectionState, EventHandler, MessageHandler, ReconnectPolicy, Transport, TransportConfig,
};

#[cfg(feature = "websocket")]
pub use websocket::{WebSocketConfig, WebSocketConnector};
