//! WebRTSP Client Library
//!
//! Async signaling client for WebRTSP: request/response correlation over a
//! reconnecting WebSocket, plus dispatch of server-initiated ICE candidates
//! and teardowns to per-media-session handlers.
//!
//! # Example
//!
//! ```ignore
//! use webrtsp_client::WebRtspClient;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = WebRtspClient::builder("ws://localhost:5554").connect().await?;
//!
//!     let description = client
//!         .describe("cam1", |candidate| println!("remote candidate: {:?}", candidate), || {
//!             println!("teardown")
//!         })
//!         .await?;
//!
//!     client.play("cam1", &description.media_session, "v=0\r\n...").await?;
//!
//!     Ok(())
//! }
//! ```

pub mod builder;
pub mod client;
pub mod completion;
pub mod error;

pub use builder::WebRtspClientBuilder;
pub use client::{ClientEventHandler, Description, IceCandidateHandler, TeardownHandler, WebRtspClient};
pub use error::{ClientError, Result};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::builder::WebRtspClientBuilder;
    pub use crate::client::{Description, WebRtspClient};
    pub use crate::error::{ClientError, Result};
    pub use webrtsp_core::{IceCandidate, Method, Options, Uri2Description};
    pub use webrtsp_transport::ConnectionState;
}
