//! WebRTSP message serialization

use std::fmt::Write;

use crate::types::{CSeq, HeaderFields, Request, Response};

/// Clamp a status code into the three-digit range `[100, 999]`
pub fn serialize_status_code(status_code: u16) -> String {
    status_code.clamp(100, 999).to_string()
}

fn write_headers_and_body(
    out: &mut String,
    cseq: CSeq,
    session: Option<&str>,
    header_fields: &HeaderFields,
    body: &str,
) {
    let _ = write!(out, "CSeq: {}\r\n", cseq);

    if let Some(session) = session {
        let _ = write!(out, "Session: {}\r\n", session);
    }

    for (name, value) in header_fields.iter() {
        let _ = write!(out, "{}: {}\r\n", name, value);
    }

    if !body.is_empty() {
        out.push_str("\r\n");
        out.push_str(body);
    }
}

/// Serialize a request to wire text
pub fn serialize_request(request: &Request) -> String {
    let mut out = format!(
        "{} {} {}\r\n",
        request.method, request.uri, request.protocol
    );

    write_headers_and_body(
        &mut out,
        request.cseq,
        request.session.as_deref(),
        &request.header_fields,
        &request.body,
    );

    out
}

/// Serialize a response to wire text
pub fn serialize_response(response: &Response) -> String {
    let mut out = format!(
        "{} {} {}\r\n",
        response.protocol,
        serialize_status_code(response.status_code),
        response.reason_phrase
    );

    write_headers_and_body(
        &mut out,
        response.cseq,
        response.session.as_deref(),
        &response.header_fields,
        &response.body,
    );

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Method;

    #[test]
    fn test_status_code_clamp() {
        for code in 0..=1200u16 {
            let serialized = serialize_status_code(code);
            assert_eq!(serialized.len(), 3, "code {}", code);
            let value: u16 = serialized.parse().unwrap();
            assert!((100..=999).contains(&value));
            if (100..=999).contains(&code) {
                assert_eq!(value, code);
            }
        }
        assert_eq!(serialize_status_code(42), "100");
        assert_eq!(serialize_status_code(1200), "999");
    }

    #[test]
    fn test_serialize_teardown_without_body() {
        let request = Request::new(Method::Teardown, "cam", 7, Some("S1".to_string()));
        assert_eq!(
            serialize_request(&request),
            "TEARDOWN cam WEBRTSP/0.2\r\nCSeq: 7\r\nSession: S1\r\n"
        );
    }
}
