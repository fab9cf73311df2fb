//! WebRTSP message model

use indexmap::IndexMap;
use std::collections::BTreeSet;
use std::fmt;

/// Protocol name used in method and status lines
pub const PROTOCOL_NAME: &str = "WEBRTSP";

/// Candidate text signalling that the peer has no more ICE candidates
pub const END_OF_CANDIDATES: &str = "a=end-of-candidates";

/// Per-request sequence number. Always non-zero on the wire.
pub type CSeq = u32;

/// Supported WebRTSP methods
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Method {
    Options,
    List,
    Describe,
    Setup,
    Play,
    Record,
    Teardown,
    GetParameter,
    SetParameter,
}

impl Method {
    pub const ALL: [Method; 9] = [
        Method::Options,
        Method::List,
        Method::Describe,
        Method::Setup,
        Method::Play,
        Method::Record,
        Method::Teardown,
        Method::GetParameter,
        Method::SetParameter,
    ];

    /// Wire name of the method
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Options => "OPTIONS",
            Method::List => "LIST",
            Method::Describe => "DESCRIBE",
            Method::Setup => "SETUP",
            Method::Play => "PLAY",
            Method::Record => "RECORD",
            Method::Teardown => "TEARDOWN",
            Method::GetParameter => "GET_PARAMETER",
            Method::SetParameter => "SET_PARAMETER",
        }
    }

    /// Case-sensitive lookup of a method token
    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.as_str() == token)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Known protocol versions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Protocol {
    #[default]
    WebRtsp0_2,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::WebRtsp0_2 => "WEBRTSP/0.2",
        }
    }

    /// Resolve a syntactically valid `WEBRTSP/D.D` token to a known version
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "WEBRTSP/0.2" => Some(Protocol::WebRtsp0_2),
            _ => None,
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Content types carried in WebRTSP bodies
pub struct ContentType;

impl ContentType {
    pub const TEXT_PARAMETERS: &'static str = "text/parameters";
    pub const APPLICATION_SDP: &'static str = "application/sdp";
    pub const APPLICATION_ICE_CANDIDATE: &'static str = "application/x-ice-candidate";
}

pub struct StatusCode;

impl StatusCode {
    pub const OK: u16 = 200;
}

pub struct ReasonPhrase;

impl ReasonPhrase {
    pub const OK: &'static str = "OK";
}

/// Header fields keyed by lowercase name, in insertion order.
///
/// CSeq and Session never live here once a message is parsed; they are
/// carried in dedicated fields of [`Request`] and [`Response`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderFields(IndexMap<String, String>);

impl HeaderFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a header, normalizing the name to lowercase.
    /// Replacing an existing header keeps its original position.
    pub fn insert(&mut self, name: &str, value: impl Into<String>) -> Option<String> {
        self.0.insert(name.to_ascii_lowercase(), value.into())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.0.shift_remove(&name.to_ascii_lowercase())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(&name.to_ascii_lowercase())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Methods advertised by a peer in its `Public` header
pub type Options = BTreeSet<Method>;

/// `name:value` pairs from a `text/parameters` body, in body order
pub type Parameters = IndexMap<String, String>;

/// Percent-decoded URI to description, from a LIST response
pub type Uri2Description = IndexMap<String, String>;

/// A WebRTSP request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: Method,
    /// Percent-encoded request URI
    pub uri: String,
    pub protocol: Protocol,
    pub cseq: CSeq,
    pub session: Option<String>,
    pub header_fields: HeaderFields,
    pub body: String,
}

impl Request {
    pub fn new(method: Method, uri: impl Into<String>, cseq: CSeq, session: Option<String>) -> Self {
        Self {
            method,
            uri: uri.into(),
            protocol: Protocol::default(),
            cseq,
            session,
            header_fields: HeaderFields::new(),
            body: String::new(),
        }
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header_fields.get("content-type")
    }

    pub fn set_content_type(&mut self, content_type: &str) {
        self.header_fields.insert("content-type", content_type);
    }
}

/// A WebRTSP response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub protocol: Protocol,
    pub status_code: u16,
    pub reason_phrase: String,
    pub cseq: CSeq,
    pub session: Option<String>,
    pub header_fields: HeaderFields,
    pub body: String,
}

impl Response {
    pub fn new(
        status_code: u16,
        reason_phrase: impl Into<String>,
        cseq: CSeq,
        session: Option<String>,
    ) -> Self {
        Self {
            protocol: Protocol::default(),
            status_code,
            reason_phrase: reason_phrase.into(),
            cseq,
            session,
            header_fields: HeaderFields::new(),
            body: String::new(),
        }
    }

    /// `200 OK` echoing the given CSeq and session
    pub fn ok(cseq: CSeq, session: Option<String>) -> Self {
        Self::new(StatusCode::OK, ReasonPhrase::OK, cseq, session)
    }

    pub fn is_ok(&self) -> bool {
        self.status_code == StatusCode::OK
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header_fields.get("content-type")
    }

    pub fn set_content_type(&mut self, content_type: &str) {
        self.header_fields.insert("content-type", content_type);
    }
}

/// Remote or local ICE candidate exchanged through SETUP
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IceCandidate {
    pub sdp_mline_index: u32,
    /// `None` marks end-of-candidates
    pub candidate: Option<String>,
}

impl IceCandidate {
    pub fn new(sdp_mline_index: u32, candidate: impl Into<String>) -> Self {
        Self {
            sdp_mline_index,
            candidate: Some(candidate.into()),
        }
    }

    pub fn end_of_candidates(sdp_mline_index: u32) -> Self {
        Self {
            sdp_mline_index,
            candidate: None,
        }
    }

    /// Body for an `application/x-ice-candidate` SETUP request
    pub fn to_body(&self) -> String {
        let candidate = match self.candidate.as_deref() {
            Some(c) if !c.is_empty() => c,
            _ => END_OF_CANDIDATES,
        };
        format!("{}/{}\r\n", self.sdp_mline_index, candidate)
    }
}
