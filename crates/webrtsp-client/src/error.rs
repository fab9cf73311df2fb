//! Client error types

use thiserror::Error;
use webrtsp_core::ParseError;
use webrtsp_transport::TransportError;

pub type Result<T> = std::result::Result<T, ClientError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// Response to an outstanding request was not valid WebRTSP
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// Well-formed response that failed a semantic expectation
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Peer answered with a non-OK status
    #[error("request failed: {status_code} {reason_phrase}")]
    RequestFailed {
        status_code: u16,
        reason_phrase: String,
    },

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Connection dropped while the request was outstanding
    #[error("disconnected")]
    Disconnected,

    #[error("no free CSeq available")]
    CSeqExhausted,
}

impl ClientError {
    pub fn is_disconnected(&self) -> bool {
        matches!(self, ClientError::Disconnected)
    }

    /// Status code of a [`ClientError::RequestFailed`]
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ClientError::RequestFailed { status_code, .. } => Some(*status_code),
            _ => None,
        }
    }
}
