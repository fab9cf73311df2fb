//! WebRTSP Core
//!
//! Message model, parser and serializer for WebRTSP, the RTSP-styled text
//! protocol used to negotiate WebRTC sessions over a WebSocket.
//!
//! This crate provides:
//! - Message types ([`Request`], [`Response`], [`Method`], [`HeaderFields`])
//! - Parsing of messages, `Public` options, `text/parameters` bodies and
//!   ICE candidates ([`parse`])
//! - Serialization to wire text ([`serialize`])
//! - Request URI percent-encoding ([`uri`])
//!
//! # Wire format
//!
//! ```text
//! DESCRIBE cam1 WEBRTSP/0.2\r\n
//! CSeq: 1\r\n
//! \r\n
//! ```

pub mod error;
pub mod parse;
pub mod serialize;
pub mod types;
pub mod uri;

pub use error::{ParseError, Result};
pub use parse::{
    is_request, parse_cseq, parse_ice_candidate, parse_options, parse_parameters, parse_request,
    parse_response,
};
pub use serialize::{serialize_request, serialize_response, serialize_status_code};
pub use types::*;

/// WebSocket subprotocol negotiated for WebRTSP connections
pub const WS_SUBPROTOCOL: &str = "webrtsp";
