//! The capturing response.
//!
//! # Responsibilities
//! - Stand in for a connection-backed response during injection
//! - Copy the header map at the moment headers are sent, plus the rendered
//!   `date`, `connection` and `transfer-encoding` fields
//! - Keep every written chunk (or forward it to a live reader)
//! - Normalize trailers and deliver one snapshot when the response ends
//!
//! # Design Decisions
//! - Wraps a `ServerResponse<NullSink>`; every operation reaches it first so
//!   framing and validation behave exactly as on a real connection
//! - Errors from the wrapped response are returned unchanged
//! - `write` reports `true` whatever the wrapped response says
//! - `destroy` is ignored so the simulated transport outlives the handler

use bytes::Bytes;
use http::header::{self, HeaderName};
use http::{HeaderMap, HeaderValue, StatusCode};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::ResponseConfig;
use crate::http::{
    Chunk, ExchangeId, RequestInfo, ResponseResult, ResponseSink, ServerResponse, SyntheticRequest,
};
use crate::inject::live::{LiveStream, LiveUpdate};
use crate::inject::snapshot::{concat, RawExchange, ResponseHandle, ResponseSnapshot};
use crate::net::NullSink;

/// Protocol fields recovered from the rendered head.
const RENDERED_FIELDS: [HeaderName; 3] = [
    header::DATE,
    header::CONNECTION,
    header::TRANSFER_ENCODING,
];

/// Callback receiving the snapshot once the response ends.
pub type OnComplete = Box<dyn FnOnce(ResponseSnapshot) + Send + 'static>;

/// Builder for [`SyntheticResponse`].
pub struct SyntheticResponseBuilder {
    request: Arc<SyntheticRequest>,
    sink: NullSink,
    config: ResponseConfig,
    live: Option<LiveStream>,
    on_complete: Option<OnComplete>,
}

impl SyntheticResponseBuilder {
    /// Use a specific sink as the simulated transport.
    pub fn sink(mut self, sink: NullSink) -> Self {
        self.sink = sink;
        self
    }

    pub fn config(mut self, config: ResponseConfig) -> Self {
        self.config = config;
        self
    }

    /// Forward body bytes to `live` instead of keeping them.
    pub fn live(mut self, live: LiveStream) -> Self {
        self.live = Some(live);
        self
    }

    pub fn on_complete<F>(mut self, callback: F) -> Self
    where
        F: FnOnce(ResponseSnapshot) + Send + 'static,
    {
        self.on_complete = Some(Box::new(callback));
        self
    }

    pub fn build(self) -> SyntheticResponse {
        let id = ExchangeId::new();
        let handle = ResponseHandle::new(id, self.sink.absorbed());
        let info = RequestInfo::from_request(&self.request);
        let inner = ServerResponse::new(self.sink, info, self.config);

        let response = SyntheticResponse {
            id,
            inner,
            request: self.request,
            handle,
            captured_headers: None,
            trailers: BTreeMap::new(),
            payload_chunks: if self.live.is_some() { None } else { Some(Vec::new()) },
            live: self.live,
            on_complete: self.on_complete,
        };
        response.refresh_live();

        tracing::trace!(
            exchange_id = %id,
            streaming = response.is_streaming(),
            "Synthetic response created"
        );
        response
    }
}

/// Response that records everything a handler sends.
pub struct SyntheticResponse {
    id: ExchangeId,
    inner: ServerResponse<NullSink>,
    request: Arc<SyntheticRequest>,
    handle: ResponseHandle,
    captured_headers: Option<HeaderMap>,
    trailers: BTreeMap<String, String>,
    /// None when a live consumer takes the bytes instead.
    payload_chunks: Option<Vec<Bytes>>,
    live: Option<LiveStream>,
    on_complete: Option<OnComplete>,
}

impl std::fmt::Debug for SyntheticResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyntheticResponse")
            .field("id", &self.id)
            .field("status", &self.inner.status())
            .field("headers_sent", &self.inner.headers_sent())
            .field("finished", &self.inner.finished())
            .field("streaming", &self.is_streaming())
            .finish()
    }
}

impl SyntheticResponse {
    pub fn builder(request: Arc<SyntheticRequest>) -> SyntheticResponseBuilder {
        SyntheticResponseBuilder {
            request,
            sink: NullSink::new(),
            config: ResponseConfig::default(),
            live: None,
            on_complete: None,
        }
    }

    pub fn id(&self) -> ExchangeId {
        self.id
    }

    pub fn request(&self) -> &Arc<SyntheticRequest> {
        &self.request
    }

    pub fn handle(&self) -> &ResponseHandle {
        &self.handle
    }

    /// Whether body bytes go to a live consumer rather than being kept.
    pub fn is_streaming(&self) -> bool {
        self.live.is_some()
    }

    /// Header copy taken when headers were sent.
    pub fn captured_headers(&self) -> Option<&HeaderMap> {
        self.captured_headers.as_ref()
    }

    pub fn trailers(&self) -> &BTreeMap<String, String> {
        &self.trailers
    }

    fn capture_headers(&mut self) {
        let mut captured = self.inner.headers().clone();
        if let Some(head) = self.inner.rendered_head() {
            for name in &RENDERED_FIELDS {
                if let Some(value) = head.fields().get(name) {
                    captured.insert(name.clone(), value.clone());
                }
            }
            self.handle.record_head(head.bytes().clone());
        }
        self.captured_headers = Some(captured);
    }

    fn snapshot(&self) -> ResponseSnapshot {
        let raw_payload = self.payload_chunks.as_deref().map(concat);
        let payload = raw_payload
            .as_ref()
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned());

        ResponseSnapshot {
            raw: self.raw(),
            headers: self.captured_headers.clone().unwrap_or_default(),
            status_code: self.inner.status(),
            status_message: self.inner.status_message().to_string(),
            trailers: self.trailers.clone(),
            raw_payload,
            payload,
        }
    }

    fn raw(&self) -> RawExchange {
        RawExchange {
            req: Arc::clone(&self.request),
            res: self.handle.clone(),
        }
    }

    fn refresh_live(&self) {
        if let Some(live) = &self.live {
            live.refresh(LiveUpdate {
                raw: &self.raw(),
                headers: self.captured_headers.as_ref(),
                status_code: self.inner.status(),
                status_message: self.inner.status_message(),
                trailers: &self.trailers,
            });
        }
    }

    /// Send headers through the capture path if nothing was sent yet.
    fn ensure_headers(&mut self) -> ResponseResult<()> {
        if !self.inner.headers_sent() {
            let status = self.inner.status();
            self.send_headers(status, None, None)?;
        }
        Ok(())
    }
}

impl ResponseSink for SyntheticResponse {
    fn status(&self) -> StatusCode {
        self.inner.status()
    }

    fn set_status(&mut self, status: StatusCode) {
        self.inner.set_status(status);
    }

    fn reason(&self) -> &str {
        self.inner.reason()
    }

    fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    fn set_header(&mut self, name: &str, value: &str) -> ResponseResult<()> {
        self.inner.set_header(name, value)
    }

    fn append_header(&mut self, name: &str, value: &str) -> ResponseResult<()> {
        self.inner.append_header(name, value)
    }

    fn remove_header(&mut self, name: &str) -> ResponseResult<Option<HeaderValue>> {
        self.inner.remove_header(name)
    }

    fn headers_sent(&self) -> bool {
        self.inner.headers_sent()
    }

    fn finished(&self) -> bool {
        self.inner.finished()
    }

    fn send_headers(
        &mut self,
        status: StatusCode,
        reason: Option<&str>,
        headers: Option<HeaderMap>,
    ) -> ResponseResult<()> {
        self.inner.send_headers(status, reason, headers)?;
        self.capture_headers();

        tracing::debug!(
            exchange_id = %self.id,
            status = self.inner.status().as_u16(),
            headers = self.captured_headers.as_ref().map_or(0, HeaderMap::len),
            "Headers captured"
        );
        self.refresh_live();
        Ok(())
    }

    async fn write(&mut self, chunk: impl Into<Chunk>) -> ResponseResult<bool> {
        let chunk: Chunk = chunk.into();
        let data = chunk.into_bytes()?;
        if !self.inner.finished() {
            self.ensure_headers()?;
        }

        // The wrapped response may report backpressure; there is none here
        let _ = self.inner.write(data.clone()).await?;

        if let Some(chunks) = &mut self.payload_chunks {
            chunks.push(data.clone());
        }
        if let Some(live) = &mut self.live {
            live.write(data);
        }
        Ok(true)
    }

    async fn end(&mut self, chunk: Option<Chunk>) -> ResponseResult<()> {
        if self.inner.finished() {
            return self.inner.end(chunk).await;
        }

        match chunk {
            Some(chunk) if !chunk.is_empty() => {
                self.write(chunk).await?;
            }
            _ => {
                self.inner.declare_length(0);
                self.ensure_headers()?;
            }
        }

        if let Some(live) = &mut self.live {
            live.end();
        }
        self.inner.end(None).await?;
        self.handle.mark_finished();

        // Completion is delivered as a separate event, after finalization settles
        tokio::task::yield_now().await;

        let snapshot = self.snapshot();
        self.refresh_live();
        tracing::debug!(
            exchange_id = %self.id,
            status = snapshot.status_code.as_u16(),
            payload_bytes = snapshot.raw_payload.as_ref().map(Bytes::len),
            wire_bytes = self.handle.wire_bytes(),
            "Response completed"
        );
        if let Some(on_complete) = self.on_complete.take() {
            on_complete(snapshot);
        }
        Ok(())
    }

    fn add_trailers<I, K, V>(&mut self, trailers: I) -> ResponseResult<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: ToString,
    {
        for (name, value) in trailers {
            let name = name.as_ref().to_lowercase().trim().to_string();
            let value = value.to_string().trim().to_string();
            self.trailers.insert(name, value);
        }
        Ok(())
    }

    fn destroy(&mut self) {
        tracing::trace!(exchange_id = %self.id, "Ignoring destroy on synthetic response");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{Encoding, ResponseError};
    use crate::inject::live::live_channel;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio::io::AsyncReadExt;

    fn request() -> Arc<SyntheticRequest> {
        Arc::new(
            http::Request::builder()
                .uri("/items")
                .body(Bytes::new())
                .unwrap(),
        )
    }

    fn collecting() -> (SyntheticResponseBuilder, Arc<Mutex<Vec<ResponseSnapshot>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let builder = SyntheticResponse::builder(request())
            .on_complete(move |snapshot| sink.lock().unwrap().push(snapshot));
        (builder, seen)
    }

    #[tokio::test]
    async fn test_payload_concatenates_writes() {
        let (builder, seen) = collecting();
        let mut res = builder.build();
        res.write("hello, ").await.unwrap();
        res.write(Chunk::text("776f726c64", Encoding::Hex)).await.unwrap();
        res.write(Bytes::from_static(b"!")).await.unwrap();
        res.end(None).await.unwrap();

        let seen = seen.lock().unwrap();
        let snapshot = &seen[0];
        assert_eq!(snapshot.raw_payload.as_deref(), Some(&b"hello, world!"[..]));
        assert_eq!(snapshot.payload.as_deref(), Some("hello, world!"));
    }

    #[tokio::test]
    async fn test_write_always_reports_ready() {
        let mut res = SyntheticResponse::builder(request()).build();
        for _ in 0..3 {
            assert!(res.write("x").await.unwrap());
        }
    }

    #[tokio::test]
    async fn test_trailers_are_normalized() {
        let (builder, seen) = collecting();
        let mut res = builder.build();
        res.add_trailers([("X-Foo", " bar ")]).unwrap();
        res.add_trailers([("x-foo", "baz")]).unwrap();
        res.add_trailers([(" Server-Timing ", 12)]).unwrap();
        res.end(None).await.unwrap();

        let seen = seen.lock().unwrap();
        let trailers = &seen[0].trailers;
        assert_eq!(trailers.len(), 2);
        assert_eq!(trailers["x-foo"], "baz");
        assert_eq!(trailers["server-timing"], "12");
    }

    #[tokio::test]
    async fn test_headers_captured_at_send_time() {
        let (builder, seen) = collecting();
        let mut res = builder.build();
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, "text/plain".parse().unwrap());
        res.send_headers(StatusCode::OK, Some("OK"), Some(headers)).unwrap();

        // Too late: the copy was taken already
        assert!(res.set_header("x-late", "1").is_err());
        res.end(Some("body".into())).await.unwrap();

        let seen = seen.lock().unwrap();
        let snapshot = &seen[0];
        assert_eq!(snapshot.header("content-type"), Some("text/plain"));
        assert!(!snapshot.header("date").unwrap_or_default().is_empty());
        assert_eq!(snapshot.header("connection"), Some("keep-alive"));
        assert_eq!(snapshot.header("transfer-encoding"), Some("chunked"));
        assert_eq!(snapshot.header("x-late"), None);
        assert!(snapshot
            .raw
            .res
            .rendered_head()
            .unwrap()
            .starts_with(b"HTTP/1.1 200 OK\r\n"));
    }

    #[tokio::test]
    async fn test_implicit_headers_go_through_capture() {
        let (builder, seen) = collecting();
        let mut res = builder.build();
        res.set_status(StatusCode::NOT_FOUND);
        res.set_header("x-trace", "abc").unwrap();
        res.write("not found").await.unwrap();
        assert!(res.captured_headers().is_some());
        res.end(None).await.unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen[0].status_code, StatusCode::NOT_FOUND);
        assert_eq!(seen[0].status_message, "Not Found");
        assert_eq!(seen[0].header("x-trace"), Some("abc"));
    }

    #[tokio::test]
    async fn test_bare_end_announces_zero_length() {
        let (builder, seen) = collecting();
        let mut res = builder.build();
        res.end(None).await.unwrap();

        let seen = seen.lock().unwrap();
        let snapshot = &seen[0];
        assert_eq!(snapshot.raw_payload, Some(Bytes::new()));
        assert_eq!(snapshot.payload.as_deref(), Some(""));
        assert_eq!(snapshot.header("transfer-encoding"), None);
        assert_eq!(snapshot.header("connection"), Some("keep-alive"));
    }

    #[tokio::test]
    async fn test_end_with_data_frames_like_a_write() {
        let (builder, seen) = collecting();
        let mut res = builder.build();
        res.end(Some("hello".into())).await.unwrap();

        let seen = seen.lock().unwrap();
        let snapshot = &seen[0];
        assert_eq!(snapshot.payload.as_deref(), Some("hello"));
        assert_eq!(snapshot.header("transfer-encoding"), Some("chunked"));
        assert_eq!(snapshot.header("content-length"), None);
    }

    #[tokio::test]
    async fn test_completion_fires_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let mut res = SyntheticResponse::builder(request())
            .on_complete(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .build();

        res.end(Some("done".into())).await.unwrap();
        res.end(None).await.unwrap();
        assert!(matches!(
            res.end(Some("again".into())).await,
            Err(ResponseError::WriteAfterEnd)
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(res.handle().is_finished());
    }

    #[tokio::test]
    async fn test_destroy_is_ignored() {
        let (builder, seen) = collecting();
        let mut res = builder.build();
        res.write("partial").await.unwrap();
        res.destroy();
        res.end(Some(" and done".into())).await.unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen[0].payload.as_deref(), Some("partial and done"));
    }

    #[tokio::test]
    async fn test_errors_propagate_without_completion() {
        let (builder, seen) = collecting();
        let mut res = builder.build();
        res.send_headers(StatusCode::OK, None, None).unwrap();
        assert!(matches!(
            res.send_headers(StatusCode::OK, None, None),
            Err(ResponseError::HeadersAlreadySent)
        ));
        assert!(matches!(
            res.write(Chunk::text("zz", Encoding::Hex)).await,
            Err(ResponseError::InvalidEncoding { .. })
        ));
        drop(res);
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_live_consumer_receives_bytes() {
        let (live, mut reader) = live_channel();
        let (builder, seen) = collecting();
        let mut res = builder.live(live).build();
        assert!(res.is_streaming());
        assert!(reader.raw().is_some());
        assert!(reader.headers().is_none());

        res.write("abc").await.unwrap();
        assert_eq!(reader.status_code(), Some(StatusCode::OK));
        assert!(reader.headers().is_some());
        res.write("def").await.unwrap();
        res.add_trailers([("x-done", "yes")]).unwrap();
        res.end(None).await.unwrap();

        let mut body = String::new();
        reader.read_to_string(&mut body).await.unwrap();
        assert_eq!(body, "abcdef");

        let seen = seen.lock().unwrap();
        assert_eq!(seen[0].raw_payload, None);
        assert_eq!(seen[0].payload, None);

        let state = reader.state();
        assert_eq!(state.trailers["x-done"], "yes");
        assert_eq!(state.raw.unwrap().res.id(), res.id());
    }

    #[tokio::test]
    async fn test_wire_bytes_reach_the_sink() {
        let sink = NullSink::new();
        let absorbed = sink.absorbed();
        let mut res = SyntheticResponse::builder(request()).sink(sink).build();
        res.write("12345").await.unwrap();
        res.end(None).await.unwrap();

        let head = res.handle().rendered_head().unwrap().len() as u64;
        // "5\r\n12345\r\n" + "0\r\n\r\n"
        assert_eq!(absorbed.get(), head + 10 + 5);
        assert_eq!(res.handle().wire_bytes(), absorbed.get());
    }
}
