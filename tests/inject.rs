//! End-to-end injection tests.

use bytes::Bytes;
use http::{Method, StatusCode, Version};
use http_injector::config::ResponseConfig;
use http_injector::http::RequestInfo;
use http_injector::inject::{inject, live_channel, InjectOptions};
use http_injector::{Chunk, Encoding, ResponseSink, ServerResponse};
use tokio::io::AsyncReadExt;

mod common;

#[tokio::test]
async fn test_not_found_end_to_end() {
    let snapshot = inject(&common::NotFound, common::get("/missing"), InjectOptions::default())
        .await
        .unwrap();

    assert_eq!(snapshot.status_code, 404);
    assert_eq!(snapshot.status_message, "Not Found");
    assert_eq!(snapshot.payload.as_deref(), Some("not found"));
    assert_eq!(
        String::from_utf8_lossy(snapshot.raw_payload.as_ref().unwrap()),
        "not found"
    );
    assert!(snapshot.raw.res.is_finished());
}

#[tokio::test]
async fn test_payload_is_concatenation_of_writes() {
    let handler = common::Chunks(vec![
        Chunk::from("alpha "),
        Chunk::text("YmV0YSA=", Encoding::Base64),
        Chunk::from(Bytes::from_static(b"gamma")),
        Chunk::from(""),
        Chunk::text("ïota", Encoding::Utf8),
    ]);
    let snapshot = inject(&handler, common::get("/"), InjectOptions::default())
        .await
        .unwrap();

    assert_eq!(
        snapshot.raw_payload.unwrap(),
        Bytes::from("alpha beta gammaïota")
    );
    assert_eq!(snapshot.payload.as_deref(), Some("alpha beta gammaïota"));
}

#[tokio::test]
async fn test_headers_and_trailers() {
    let handler = common::PlainText { body: "hi" };
    let snapshot = inject(&handler, common::get("/"), InjectOptions::default())
        .await
        .unwrap();

    assert_eq!(snapshot.header("content-type"), Some("text/plain"));
    assert!(!snapshot.header("date").unwrap().is_empty());
    assert_eq!(snapshot.header("connection"), Some("keep-alive"));
    assert_eq!(snapshot.header("transfer-encoding"), Some("chunked"));

    assert_eq!(snapshot.trailers.len(), 1);
    assert_eq!(snapshot.trailer("x-foo"), Some("baz"));
}

#[tokio::test]
async fn test_live_consumer_gets_bytes_instead_of_snapshot() {
    let (live, mut reader) = live_channel();
    let handler = common::Chunks(vec![Chunk::from("abc"), Chunk::from("def")]);
    let snapshot = inject(&handler, common::get("/"), InjectOptions::default().with_live(live))
        .await
        .unwrap();

    let mut body = Vec::new();
    reader.read_to_end(&mut body).await.unwrap();
    assert_eq!(body, b"abcdef");
    assert_eq!(snapshot.raw_payload, None);
    assert_eq!(snapshot.payload, None);

    let state = reader.state();
    assert_eq!(state.status_code, Some(StatusCode::OK));
    assert_eq!(state.raw.unwrap().res.id(), snapshot.raw.res.id());
}

#[tokio::test]
async fn test_head_request_still_captures_body() {
    let request = http::Request::builder()
        .method(Method::HEAD)
        .uri("/")
        .body(Bytes::new())
        .unwrap();
    let snapshot = inject(&common::NotFound, request, InjectOptions::default())
        .await
        .unwrap();

    assert_eq!(snapshot.payload.as_deref(), Some("not found"));
    assert_eq!(snapshot.header("transfer-encoding"), None);
}

#[tokio::test]
async fn test_http10_request_negotiates_close() {
    let request = http::Request::builder()
        .version(Version::HTTP_10)
        .uri("/")
        .body(Bytes::new())
        .unwrap();
    let snapshot = inject(&common::NotFound, request, InjectOptions::default())
        .await
        .unwrap();

    assert_eq!(snapshot.header("connection"), Some("close"));
    assert_eq!(snapshot.header("transfer-encoding"), None);
}

#[tokio::test]
async fn test_echo_request_body() {
    let request = http::Request::builder()
        .method(Method::POST)
        .uri("/echo")
        .body(Bytes::from_static(b"{\"n\":7}"))
        .unwrap();
    let snapshot = inject(&common::Echo, request, InjectOptions::default())
        .await
        .unwrap();

    assert_eq!(snapshot.header("x-method"), Some("POST"));
    let value: serde_json::Value = snapshot.json().unwrap();
    assert_eq!(value["n"], 7);
}

#[tokio::test]
async fn test_same_handler_on_real_transport() {
    let config = ResponseConfig {
        send_date: false,
        ..ResponseConfig::default()
    };
    let mut response = ServerResponse::new(Vec::new(), RequestInfo::default(), config);
    http_injector::Handler::handle(&common::NotFound, &common::get("/"), &mut response)
        .await
        .unwrap();

    assert!(response.finished());
    let wire = String::from_utf8(response.into_transport()).unwrap();
    assert_eq!(
        wire,
        "HTTP/1.1 404 Not Found\r\nConnection: keep-alive\r\nTransfer-Encoding: chunked\r\n\r\n\
         9\r\nnot found\r\n0\r\n\r\n"
    );
}
