//! Serializer tests for WebRTSP core

use webrtsp_core::{
    parse_request, parse_response, serialize_request, serialize_response, ContentType, Method,
    Request, Response,
};

#[test]
fn test_serialize_play_request() {
    let mut request = Request::new(Method::Play, "cam", 4, Some("S1".to_string()));
    request.set_content_type(ContentType::APPLICATION_SDP);
    request.body = "v=0\r\n".to_string();

    assert_eq!(
        serialize_request(&request),
        "PLAY cam WEBRTSP/0.2\r\n\
         CSeq: 4\r\n\
         Session: S1\r\n\
         content-type: application/sdp\r\n\
         \r\n\
         v=0\r\n"
    );
}

#[test]
fn test_serialize_ok_response() {
    let response = Response::ok(9, Some("S1".to_string()));
    assert_eq!(
        serialize_response(&response),
        "WEBRTSP/0.2 200 OK\r\nCSeq: 9\r\nSession: S1\r\n"
    );
}

#[test]
fn test_serialize_clamps_status_code() {
    let response = Response::new(1234, "Weird", 1, None);
    assert!(serialize_response(&response).starts_with("WEBRTSP/0.2 999 Weird\r\n"));

    let response = Response::new(7, "Weird", 1, None);
    assert!(serialize_response(&response).starts_with("WEBRTSP/0.2 100 Weird\r\n"));
}

#[test]
fn test_header_order_is_insertion_order() {
    let mut request = Request::new(Method::GetParameter, "cam", 1, None);
    request.header_fields.insert("Z-Last", "1");
    request.header_fields.insert("A-First", "2");

    let text = serialize_request(&request);
    let z = text.find("z-last").unwrap();
    let a = text.find("a-first").unwrap();
    assert!(z < a);
}

#[test]
fn test_request_round_trip() {
    let mut request = Request::new(Method::Setup, "rtsp://host/cam%201", 42, Some("S7".to_string()));
    request.set_content_type(ContentType::APPLICATION_ICE_CANDIDATE);
    request.header_fields.insert("X-Custom", "value with spaces");
    request.body = "1/candidate:1 1 UDP 2122260223 10.0.0.1 54400 typ host\r\n".to_string();

    let parsed = parse_request(&serialize_request(&request)).expect("parse failed");
    assert_eq!(parsed, request);
}

#[test]
fn test_request_round_trip_without_session_or_body() {
    let request = Request::new(Method::Options, "*", 1, None);
    let parsed = parse_request(&serialize_request(&request)).expect("parse failed");
    assert_eq!(parsed, request);
}

#[test]
fn test_response_round_trip() {
    let mut response = Response::new(200, "OK", 3, Some("S1".to_string()));
    response.set_content_type(ContentType::TEXT_PARAMETERS);
    response.body = "cam1:Front\r\ncam2:Back\r\n".to_string();

    let parsed = parse_response(&serialize_response(&response)).expect("parse failed");
    assert_eq!(parsed, response);
}
