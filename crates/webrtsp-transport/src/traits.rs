//! Channel trait definitions
//!
//! A channel is one persistent, message-oriented duplex connection that
//! carries exactly one WebRTSP message per text frame.
//! [`Transport`](crate::Transport) opens channels through a [`Connector`]
//! and never touches framing itself.

use async_trait::async_trait;

use crate::error::Result;

/// Events produced by an open channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// One complete text message
    Message(String),
    /// Non-fatal error reported by the channel
    Error(String),
    /// Channel closed (clean or error)
    Closed { reason: Option<String> },
}

/// Sending half of an open channel
pub trait ChannelSender: Send + Sync {
    /// Queue a text message. Fails immediately if the channel is gone.
    fn send(&self, text: String) -> Result<()>;

    fn is_connected(&self) -> bool;

    /// Request a close; the receiver reports [`ChannelEvent::Closed`] once done
    fn close(&self);
}

/// Receiving half of an open channel
#[async_trait]
pub trait ChannelReceiver: Send {
    /// Next event, `None` once the channel is fully torn down
    async fn recv(&mut self) -> Option<ChannelEvent>;
}

/// Opens channels to a URL
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, url: &str) -> Result<(Box<dyn ChannelSender>, Box<dyn ChannelReceiver>)>;
}
