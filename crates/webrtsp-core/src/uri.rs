//! Request URI percent-encoding

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use std::borrow::Cow;

/// Characters escaped in request URIs. Reserved URI delimiters such as
/// `/`, `?`, `:` and `#` pass through untouched.
const URI_ESCAPE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// Percent-encode a URI for use on a method line
pub fn encode_uri(uri: &str) -> String {
    utf8_percent_encode(uri, URI_ESCAPE).to_string()
}

/// Percent-decode a URI. Input that does not decode to UTF-8 is returned as is.
pub fn decode_uri(uri: &str) -> Cow<'_, str> {
    match percent_decode_str(uri).decode_utf8() {
        Ok(decoded) => decoded,
        Err(_) => Cow::Borrowed(uri),
    }
}
