//! Error types for WebRTSP message parsing

use thiserror::Error;

/// Result type alias for parsing operations
pub type Result<T> = std::result::Result<T, ParseError>;

/// Malformed wire syntax.
///
/// Absent optional elements (no `Session` header, no `Public` header, empty
/// body) are never reported as errors; only elements that are present but
/// malformed are.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Request line is not `Method SP URI SP Protocol EOL`
    #[error("invalid method line")]
    InvalidMethodLine,

    /// Status line is not `Protocol SP 3DIGIT SP Reason-Phrase EOL`
    #[error("invalid status line")]
    InvalidStatusLine,

    /// Header field line is malformed or unterminated
    #[error("invalid header field")]
    InvalidHeaderField,

    /// Mandatory CSeq header is absent
    #[error("CSeq header is missing")]
    MissingCSeq,

    /// CSeq value is zero, non-numeric or overflows
    #[error("invalid CSeq: {0:?}")]
    InvalidCSeq(String),

    /// Token where a method was expected
    #[error("method expected")]
    MethodExpected,

    /// Token is not one of the supported methods
    #[error("unknown method \"{0}\"")]
    UnknownMethod(String),

    /// `text/parameters` body has a line without `name:value` shape
    #[error("invalid parameters body")]
    InvalidParameters,

    /// Message carries a content type the caller did not expect
    #[error("unexpected Content-Type: {0:?}")]
    UnexpectedContentType(Option<String>),

    /// ICE candidate body is empty
    #[error("empty ICE candidate")]
    EmptyIceCandidate,

    /// ICE candidate body is not `<index>/<candidate>\r\n`
    #[error("invalid ICE candidate format: {0:?}")]
    InvalidIceCandidate(String),
}
