//! WebRTSP message parsing
//!
//! Pure functions from raw text to message-model values. A missing optional
//! element (no `Session`, no `Public`, empty body) is never an error; a
//! present but malformed one always is.

mod buffer;
mod lexer;

use buffer::ParseBuffer;
use lexer::{
    get_protocol, get_reason_phrase, get_status_code, get_token, get_uri, is_ctl, parse_digit,
    skip, skip_eol, skip_folding, skip_lws, skip_wsp,
};

use crate::error::{ParseError, Result};
use crate::types::{
    CSeq, ContentType, HeaderFields, IceCandidate, Method, Options, Parameters, Protocol, Request,
    Response, END_OF_CANDIDATES,
};

struct MethodLine<'a> {
    method: Method,
    uri: &'a str,
    protocol: Protocol,
}

fn parse_method_line<'a>(buffer: &mut ParseBuffer<'a>) -> Option<MethodLine<'a>> {
    let method = Method::from_token(get_token(buffer)?)?;

    if !skip_wsp(buffer) {
        return None;
    }
    let uri = get_uri(buffer)?;

    if !skip_wsp(buffer) {
        return None;
    }
    let protocol = Protocol::from_token(get_protocol(buffer)?)?;

    if !skip_eol(buffer) {
        return None;
    }

    Some(MethodLine {
        method,
        uri,
        protocol,
    })
}

struct StatusLine<'a> {
    protocol: Protocol,
    status_code: u16,
    reason_phrase: &'a str,
}

fn parse_status_line<'a>(buffer: &mut ParseBuffer<'a>) -> Option<StatusLine<'a>> {
    let protocol = Protocol::from_token(get_protocol(buffer)?)?;

    if !skip_wsp(buffer) {
        return None;
    }
    let status_code = get_status_code(buffer)?;

    if !skip_wsp(buffer) {
        return None;
    }
    let reason_phrase = get_reason_phrase(buffer);
    if reason_phrase.is_empty() {
        return None;
    }

    if !skip_eol(buffer) {
        return None;
    }

    Some(StatusLine {
        protocol,
        status_code,
        reason_phrase,
    })
}

/// One `name: value EOL` line; folded continuations stay part of the value.
fn parse_header_field(buffer: &mut ParseBuffer<'_>, fields: &mut HeaderFields) -> bool {
    let Some(name) = get_token(buffer) else {
        return false;
    };

    if !skip(buffer, b':') {
        return false;
    }

    skip_lws(buffer);

    let value_start = buffer.pos();
    while let Some(c) = buffer.current() {
        let value_end = buffer.pos();
        if skip_folding(buffer) {
            continue;
        } else if skip_eol(buffer) {
            fields.insert(name, buffer.slice(value_start, value_end));
            return true;
        } else if !is_ctl(c) {
            buffer.advance();
        } else {
            return false;
        }
    }

    false
}

/// Header block up to the blank line (or end of text); leaves the cursor at the body.
fn parse_header_fields(buffer: &mut ParseBuffer<'_>) -> Result<HeaderFields> {
    let mut fields = HeaderFields::new();
    while !buffer.eos() {
        if !parse_header_field(buffer, &mut fields) {
            return Err(ParseError::InvalidHeaderField);
        }
        if skip_eol(buffer) {
            break;
        }
    }
    Ok(fields)
}

/// Parse a CSeq value.
///
/// Digits are folded left to right with checked arithmetic, so any value
/// that would wrap is rejected, as are zero and the empty string.
pub fn parse_cseq(token: &str) -> Result<CSeq> {
    let invalid = || ParseError::InvalidCSeq(token.to_string());

    let mut cseq: CSeq = 0;
    for c in token.bytes() {
        let digit = parse_digit(c).ok_or_else(invalid)?;
        cseq = cseq
            .checked_mul(10)
            .and_then(|v| v.checked_add(digit))
            .ok_or_else(invalid)?;
    }

    if cseq == 0 {
        return Err(invalid());
    }

    Ok(cseq)
}

/// Pull CSeq and Session out of the generic header mapping
fn take_cseq_and_session(fields: &mut HeaderFields) -> Result<(CSeq, Option<String>)> {
    let cseq = fields.remove("cseq").ok_or(ParseError::MissingCSeq)?;
    let cseq = parse_cseq(&cseq)?;

    let session = fields.remove("session").filter(|s| !s.is_empty());

    Ok((cseq, session))
}

/// Parse a request message
pub fn parse_request(message: &str) -> Result<Request> {
    let mut buffer = ParseBuffer::new(message);

    let MethodLine {
        method,
        uri,
        protocol,
    } = parse_method_line(&mut buffer).ok_or(ParseError::InvalidMethodLine)?;

    let mut header_fields = parse_header_fields(&mut buffer)?;
    let (cseq, session) = take_cseq_and_session(&mut header_fields)?;

    Ok(Request {
        method,
        uri: uri.to_string(),
        protocol,
        cseq,
        session,
        header_fields,
        body: buffer.tail().to_string(),
    })
}

/// Parse a response message
pub fn parse_response(message: &str) -> Result<Response> {
    let mut buffer = ParseBuffer::new(message);

    let StatusLine {
        protocol,
        status_code,
        reason_phrase,
    } = parse_status_line(&mut buffer).ok_or(ParseError::InvalidStatusLine)?;

    let mut header_fields = parse_header_fields(&mut buffer)?;
    let (cseq, session) = take_cseq_and_session(&mut header_fields)?;

    Ok(Response {
        protocol,
        status_code,
        reason_phrase: reason_phrase.to_string(),
        cseq,
        session,
        header_fields,
        body: buffer.tail().to_string(),
    })
}

/// Whether the message starts with a known method token
pub fn is_request(message: &str) -> bool {
    let mut buffer = ParseBuffer::new(message);
    get_token(&mut buffer)
        .and_then(Method::from_token)
        .is_some()
}

/// Methods listed in the response's `Public` header.
///
/// No header yields an empty set; a header that lists anything but
/// comma-separated known methods is an error.
pub fn parse_options(response: &Response) -> Result<Options> {
    let mut options = Options::new();

    let Some(public) = response.header_fields.get("public") else {
        return Ok(options);
    };

    let mut buffer = ParseBuffer::new(public);
    while !buffer.eos() {
        skip_wsp(&mut buffer);

        let token = get_token(&mut buffer).ok_or(ParseError::MethodExpected)?;
        let method =
            Method::from_token(token).ok_or_else(|| ParseError::UnknownMethod(token.to_string()))?;

        skip_wsp(&mut buffer);

        if !buffer.eos() && !skip(&mut buffer, b',') {
            return Err(ParseError::MethodExpected);
        }

        options.insert(method);
    }

    Ok(options)
}

fn parse_parameter<'a>(buffer: &mut ParseBuffer<'a>) -> Option<(&'a str, &'a str)> {
    let name_start = buffer.pos();
    while buffer.current()? != b':' {
        if is_ctl(buffer.current()?) {
            return None;
        }
        buffer.advance();
    }
    let name = buffer.since(name_start);
    if name.is_empty() {
        return None;
    }

    skip(buffer, b':');
    skip_wsp(buffer);

    let value_start = buffer.pos();
    while let Some(c) = buffer.current() {
        let value_end = buffer.pos();
        if skip_eol(buffer) {
            return Some((name, buffer.slice(value_start, value_end)));
        } else if !is_ctl(c) {
            buffer.advance();
        } else {
            return None;
        }
    }

    None
}

/// Parse a `text/parameters` body into ordered `name:value` pairs
pub fn parse_parameters(body: &str) -> Result<Parameters> {
    let mut parameters = Parameters::new();

    let mut buffer = ParseBuffer::new(body);

    let mut eol_check = buffer;
    if skip_eol(&mut eol_check) && eol_check.eos() {
        return Ok(parameters);
    }

    while !buffer.eos() {
        let (name, value) = parse_parameter(&mut buffer).ok_or(ParseError::InvalidParameters)?;
        parameters.insert(name.to_string(), value.to_string());
    }

    Ok(parameters)
}

/// Parse the body of an `application/x-ice-candidate` request
pub fn parse_ice_candidate(request: &Request) -> Result<IceCandidate> {
    if request.content_type() != Some(ContentType::APPLICATION_ICE_CANDIDATE) {
        return Err(ParseError::UnexpectedContentType(
            request.content_type().map(str::to_string),
        ));
    }

    let body = request.body.as_str();
    if body.is_empty() {
        return Err(ParseError::EmptyIceCandidate);
    }

    let invalid = || ParseError::InvalidIceCandidate(body.to_string());

    let separator = body.find('/').filter(|&i| i > 0).ok_or_else(invalid)?;
    let eol = body[separator..]
        .find("\r\n")
        .map(|i| separator + i)
        .ok_or_else(invalid)?;

    let index = &body[..separator];
    if !index.bytes().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }
    let sdp_mline_index = index.parse::<u32>().map_err(|_| invalid())?;

    let candidate = &body[separator + 1..eol];
    let candidate = (candidate != END_OF_CANDIDATES).then(|| candidate.to_string());

    Ok(IceCandidate {
        sdp_mline_index,
        candidate,
    })
}
