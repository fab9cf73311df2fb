//! Parser tests for WebRTSP core
//!
//! - Request and response envelopes
//! - CSeq / Session extraction
//! - `Public` options, `text/parameters` bodies, ICE candidates
//! - Rejection of malformed input

use webrtsp_core::{
    is_request, parse_ice_candidate, parse_options, parse_parameters, parse_request,
    parse_response, ContentType, Method, ParseError, Protocol, Request, Response,
};

// ============================================================================
// Requests
// ============================================================================

#[test]
fn test_parse_setup_request() {
    let message = "SETUP rtsp://host/cam WEBRTSP/0.2\r\n\
                   CSeq: 3\r\n\
                   Session: S1\r\n\
                   Content-Type: application/x-ice-candidate\r\n\
                   \r\n\
                   0/a=end-of-candidates\r\n";

    let request = parse_request(message).expect("parse failed");
    assert_eq!(request.method, Method::Setup);
    assert_eq!(request.uri, "rtsp://host/cam");
    assert_eq!(request.protocol, Protocol::WebRtsp0_2);
    assert_eq!(request.cseq, 3);
    assert_eq!(request.session.as_deref(), Some("S1"));
    assert_eq!(request.content_type(), Some(ContentType::APPLICATION_ICE_CANDIDATE));
    assert_eq!(request.body, "0/a=end-of-candidates\r\n");

    assert!(!request.header_fields.contains("cseq"));
    assert!(!request.header_fields.contains("session"));
    assert_eq!(request.header_fields.len(), 1);
}

#[test]
fn test_parse_request_accepts_bare_lf() {
    let request = parse_request("OPTIONS * WEBRTSP/0.2\nCSeq: 12\n\n").expect("parse failed");
    assert_eq!(request.method, Method::Options);
    assert_eq!(request.cseq, 12);
    assert!(request.session.is_none());
    assert!(request.body.is_empty());
}

#[test]
fn test_parse_request_header_names_case_insensitive() {
    let request =
        parse_request("LIST * WEBRTSP/0.2\r\ncseq: 5\r\nSESSION: abc\r\nX-Foo: Bar\r\n\r\n")
            .expect("parse failed");
    assert_eq!(request.cseq, 5);
    assert_eq!(request.session.as_deref(), Some("abc"));
    assert_eq!(request.header_fields.get("X-FOO"), Some("Bar"));
}

#[test]
fn test_parse_request_rejects_unknown_method() {
    assert_eq!(
        parse_request("PAUSE * WEBRTSP/0.2\r\nCSeq: 1\r\n\r\n"),
        Err(ParseError::InvalidMethodLine)
    );
    assert_eq!(
        parse_request("options * WEBRTSP/0.2\r\nCSeq: 1\r\n\r\n"),
        Err(ParseError::InvalidMethodLine)
    );
}

#[test]
fn test_parse_request_rejects_bad_protocol() {
    assert!(parse_request("OPTIONS * RTSP/1.0\r\nCSeq: 1\r\n\r\n").is_err());
    assert!(parse_request("OPTIONS * WEBRTSP/9.9\r\nCSeq: 1\r\n\r\n").is_err());
    assert!(parse_request("OPTIONS * WEBRTSP/0.2x\r\nCSeq: 1\r\n\r\n").is_err());
}

#[test]
fn test_parse_request_requires_cseq() {
    assert_eq!(
        parse_request("OPTIONS * WEBRTSP/0.2\r\nX: y\r\n\r\n"),
        Err(ParseError::MissingCSeq)
    );
    assert_eq!(
        parse_request("OPTIONS * WEBRTSP/0.2\r\nCSeq: 0\r\n\r\n"),
        Err(ParseError::InvalidCSeq("0".to_string()))
    );
    assert!(parse_request("OPTIONS * WEBRTSP/0.2\r\nCSeq: 99999999999\r\n\r\n").is_err());
}

#[test]
fn test_parse_request_rejects_malformed_header() {
    assert_eq!(
        parse_request("OPTIONS * WEBRTSP/0.2\r\nCSeq 1\r\n\r\n"),
        Err(ParseError::InvalidHeaderField)
    );
    assert_eq!(
        parse_request("OPTIONS * WEBRTSP/0.2\r\nCSeq: 1\r\nX: a\x01b\r\n\r\n"),
        Err(ParseError::InvalidHeaderField)
    );
}

#[test]
fn test_is_request() {
    assert!(is_request("DESCRIBE cam WEBRTSP/0.2\r\n"));
    assert!(is_request("SET_PARAMETER"));
    assert!(!is_request("WEBRTSP/0.2 200 OK\r\n"));
    assert!(!is_request(""));
    assert!(!is_request("FOO bar"));
}

// ============================================================================
// Responses
// ============================================================================

#[test]
fn test_parse_describe_response() {
    let message = "WEBRTSP/0.2 200 OK\r\n\
                   CSeq: 1\r\n\
                   Session: S1\r\n\
                   Content-Type: application/sdp\r\n\
                   \r\n\
                   v=0\r\n";

    let response = parse_response(message).expect("parse failed");
    assert_eq!(response.status_code, 200);
    assert_eq!(response.reason_phrase, "OK");
    assert_eq!(response.cseq, 1);
    assert_eq!(response.session.as_deref(), Some("S1"));
    assert_eq!(response.content_type(), Some(ContentType::APPLICATION_SDP));
    assert_eq!(response.body, "v=0\r\n");
    assert!(response.is_ok());
}

#[test]
fn test_parse_response_reason_phrase_with_spaces() {
    let response = parse_response("WEBRTSP/0.2 404 Not Found\r\nCSeq: 2\r\n\r\n")
        .expect("parse failed");
    assert_eq!(response.status_code, 404);
    assert_eq!(response.reason_phrase, "Not Found");
}

#[test]
fn test_parse_response_status_code_must_be_three_digits() {
    for status in ["20", "2000", "2x0", "abc", ""] {
        let message = format!("WEBRTSP/0.2 {} OK\r\nCSeq: 1\r\n\r\n", status);
        assert_eq!(
            parse_response(&message),
            Err(ParseError::InvalidStatusLine),
            "status {:?}",
            status
        );
    }
}

#[test]
fn test_parse_response_requires_reason_phrase() {
    assert!(parse_response("WEBRTSP/0.2 200 \r\nCSeq: 1\r\n\r\n").is_err());
    assert!(parse_response("WEBRTSP/0.2 200\r\nCSeq: 1\r\n\r\n").is_err());
}

// ============================================================================
// Options
// ============================================================================

fn response_with_public(public: Option<&str>) -> Response {
    let mut response = Response::ok(1, None);
    if let Some(public) = public {
        response.header_fields.insert("Public", public);
    }
    response
}

#[test]
fn test_parse_options() {
    let options = parse_options(&response_with_public(Some(
        "OPTIONS, DESCRIBE,SETUP ,PLAY, TEARDOWN",
    )))
    .expect("parse failed");

    assert_eq!(options.len(), 5);
    assert!(options.contains(&Method::Describe));
    assert!(options.contains(&Method::Teardown));
    assert!(!options.contains(&Method::List));
}

#[test]
fn test_parse_options_absent_header_is_empty() {
    let options = parse_options(&response_with_public(None)).expect("parse failed");
    assert!(options.is_empty());
}

#[test]
fn test_parse_options_unknown_method_fails() {
    assert_eq!(
        parse_options(&response_with_public(Some("OPTIONS, PAUSE"))),
        Err(ParseError::UnknownMethod("PAUSE".to_string()))
    );
    assert_eq!(
        parse_options(&response_with_public(Some("OPTIONS, , PLAY"))),
        Err(ParseError::MethodExpected)
    );
}

// ============================================================================
// Parameters
// ============================================================================

#[test]
fn test_parse_parameters_empty_bodies() {
    assert!(parse_parameters("").expect("parse failed").is_empty());
    assert!(parse_parameters("\r\n").expect("parse failed").is_empty());
}

#[test]
fn test_parse_parameters_preserves_order() {
    let parameters = parse_parameters("b:2\r\na:1\r\n").expect("parse failed");
    let pairs: Vec<(&str, &str)> = parameters
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();
    assert_eq!(pairs, vec![("b", "2"), ("a", "1")]);
}

#[test]
fn test_parse_parameters_value_may_contain_colons() {
    let parameters = parse_parameters("cam%201: Front door: east\r\n").expect("parse failed");
    assert_eq!(parameters.get("cam%201").map(String::as_str), Some("Front door: east"));
}

#[test]
fn test_parse_parameters_malformed() {
    assert_eq!(parse_parameters("malformed"), Err(ParseError::InvalidParameters));
    assert_eq!(parse_parameters(":value\r\n"), Err(ParseError::InvalidParameters));
    assert_eq!(parse_parameters("a:1"), Err(ParseError::InvalidParameters));
}

// ============================================================================
// ICE candidates
// ============================================================================

fn ice_request(body: &str) -> Request {
    let mut request = Request::new(Method::Setup, "cam", 1, Some("S1".to_string()));
    request.set_content_type(ContentType::APPLICATION_ICE_CANDIDATE);
    request.body = body.to_string();
    request
}

#[test]
fn test_parse_end_of_candidates() {
    let candidate = parse_ice_candidate(&ice_request("0/a=end-of-candidates\r\n"))
        .expect("parse failed");
    assert_eq!(candidate.sdp_mline_index, 0);
    assert!(candidate.candidate.is_none());
}

#[test]
fn test_parse_ice_candidate() {
    let candidate = parse_ice_candidate(&ice_request(
        "2/candidate:1 1 UDP 2122260223 10.0.0.1 54400 typ host\r\n",
    ))
    .expect("parse failed");
    assert_eq!(candidate.sdp_mline_index, 2);
    assert_eq!(
        candidate.candidate.as_deref(),
        Some("candidate:1 1 UDP 2122260223 10.0.0.1 54400 typ host")
    );
}

#[test]
fn test_parse_ice_candidate_requires_content_type() {
    let mut request = ice_request("0/a=end-of-candidates\r\n");
    request.set_content_type(ContentType::APPLICATION_SDP);
    assert!(matches!(
        parse_ice_candidate(&request),
        Err(ParseError::UnexpectedContentType(_))
    ));
}

#[test]
fn test_parse_ice_candidate_malformed() {
    assert_eq!(
        parse_ice_candidate(&ice_request("")),
        Err(ParseError::EmptyIceCandidate)
    );
    for body in [
        "candidate:1\r\n",
        "/candidate:1\r\n",
        "0/candidate:1",
        "x/candidate:1\r\n",
        "+1/candidate:1\r\n",
    ] {
        assert!(
            matches!(
                parse_ice_candidate(&ice_request(body)),
                Err(ParseError::InvalidIceCandidate(_))
            ),
            "body {:?}",
            body
        );
    }
}
