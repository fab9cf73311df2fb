//! Lexical primitives (RFC 2616/2326 style)

use super::buffer::ParseBuffer;
use crate::types::PROTOCOL_NAME;

pub(crate) fn is_wsp(c: u8) -> bool {
    c == b' ' || c == b'\t'
}

pub(crate) fn is_ctl(c: u8) -> bool {
    c <= 31 || c == 127
}

pub(crate) fn is_tspecial(c: u8) -> bool {
    matches!(
        c,
        b'(' | b')'
            | b'<'
            | b'>'
            | b'@'
            | b','
            | b';'
            | b':'
            | b'\\'
            | b'"'
            | b'/'
            | b'['
            | b']'
            | b'?'
            | b'='
            | b'{'
            | b'}'
            | b' '
            | b'\t'
    )
}

pub(crate) fn parse_digit(c: u8) -> Option<u32> {
    if c.is_ascii_digit() {
        Some(u32::from(c - b'0'))
    } else {
        None
    }
}

/// Skip a run of spaces/tabs. Returns whether anything was skipped.
pub(crate) fn skip_wsp(buffer: &mut ParseBuffer<'_>) -> bool {
    let start = buffer.pos();
    while matches!(buffer.current(), Some(c) if is_wsp(c)) {
        buffer.advance();
    }
    start != buffer.pos()
}

/// Skip one line terminator: CRLF, bare LF or bare CR.
pub(crate) fn skip_eol(buffer: &mut ParseBuffer<'_>) -> bool {
    match buffer.current() {
        Some(b'\n') => {
            buffer.advance();
            true
        }
        Some(b'\r') => {
            buffer.advance();
            if buffer.current() == Some(b'\n') {
                buffer.advance();
            }
            true
        }
        _ => false,
    }
}

/// Skip a folded line break (EOL followed by WSP).
pub(crate) fn skip_folding(buffer: &mut ParseBuffer<'_>) -> bool {
    let mut tmp = *buffer;
    if !skip_eol(&mut tmp) || !skip_wsp(&mut tmp) {
        return false;
    }
    *buffer = tmp;
    true
}

/// Skip linear whitespace: optional EOL followed by mandatory WSP.
pub(crate) fn skip_lws(buffer: &mut ParseBuffer<'_>) -> bool {
    let mut tmp = *buffer;
    skip_eol(&mut tmp);
    if !skip_wsp(&mut tmp) {
        return false;
    }
    *buffer = tmp;
    true
}

pub(crate) fn skip(buffer: &mut ParseBuffer<'_>, c: u8) -> bool {
    if buffer.current() == Some(c) {
        buffer.advance();
        true
    } else {
        false
    }
}

/// Maximal run of non-CTL, non-tspecial characters
pub(crate) fn get_token<'a>(buffer: &mut ParseBuffer<'a>) -> Option<&'a str> {
    let start = buffer.pos();
    while matches!(buffer.current(), Some(c) if !is_ctl(c) && !is_tspecial(c)) {
        buffer.advance();
    }
    let token = buffer.since(start);
    (!token.is_empty()).then_some(token)
}

/// `WEBRTSP/D.D`, syntactically only
pub(crate) fn get_protocol<'a>(buffer: &mut ParseBuffer<'a>) -> Option<&'a str> {
    let start = buffer.pos();

    if buffer.tail_len() < PROTOCOL_NAME.len() + 4 {
        return None;
    }
    if !buffer.starts_with(PROTOCOL_NAME) {
        return None;
    }
    buffer.advance_by(PROTOCOL_NAME.len());

    if !skip(buffer, b'/') {
        return None;
    }
    if !matches!(buffer.current(), Some(c) if c.is_ascii_digit()) {
        return None;
    }
    buffer.advance();
    if !skip(buffer, b'.') {
        return None;
    }
    if !matches!(buffer.current(), Some(c) if c.is_ascii_digit()) {
        return None;
    }
    buffer.advance();

    Some(buffer.since(start))
}

/// Permissive request URI: any run of non-CTL, non-space characters
pub(crate) fn get_uri<'a>(buffer: &mut ParseBuffer<'a>) -> Option<&'a str> {
    let start = buffer.pos();
    while matches!(buffer.current(), Some(c) if !is_ctl(c) && c != b' ') {
        buffer.advance();
    }
    let uri = buffer.since(start);
    (!uri.is_empty()).then_some(uri)
}

/// Exactly three ASCII digits
pub(crate) fn get_status_code(buffer: &mut ParseBuffer<'_>) -> Option<u16> {
    let mut code = 0u16;
    for _ in 0..3 {
        let digit = buffer.current().and_then(parse_digit)?;
        code = code * 10 + digit as u16;
        buffer.advance();
    }
    Some(code)
}

/// Control-free run up to the line terminator; may be empty
pub(crate) fn get_reason_phrase<'a>(buffer: &mut ParseBuffer<'a>) -> &'a str {
    let start = buffer.pos();
    while matches!(buffer.current(), Some(c) if !is_ctl(c)) {
        buffer.advance();
    }
    buffer.since(start)
}
