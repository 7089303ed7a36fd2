//! Transport-backed HTTP/1.1 response.
//!
//! # Responsibilities
//! - Hold status, reason phrase and the application header map
//! - Render the header block, synthesizing `Date`, `Connection` and framing
//! - Frame body writes (chunked, fixed length, or close-delimited)
//! - Render trailers after a chunked body
//!
//! # Design Decisions
//! - Rendering is lazy: the header block goes out with the first body
//!   bytes or with `end`
//! - `end` before any header or body announces `Content-Length`
//! - Writes on bodiless responses (HEAD, 1xx, 204, 304) are dropped

use bytes::{BufMut, Bytes, BytesMut};
use http::header::{self, HeaderName, HeaderValue};
use http::{HeaderMap, StatusCode};
use time::OffsetDateTime;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::config::ResponseConfig;
use crate::http::chunk::Chunk;
use crate::http::error::{ResponseError, ResponseResult};
use crate::http::head::{http_date, render_trailers, RenderedHead};
use crate::http::request::RequestInfo;
use crate::http::sink::ResponseSink;

/// How the body is delimited on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    /// Not decided yet, or no body may follow.
    Bodiless,
    /// `Content-Length` announced.
    Length,
    /// `Transfer-Encoding: chunked`.
    Chunked,
    /// Body ends when the connection closes.
    UntilClose,
}

/// An HTTP/1.1 response written onto `T`.
#[derive(Debug)]
pub struct ServerResponse<T> {
    transport: T,
    request: RequestInfo,
    config: ResponseConfig,
    status: StatusCode,
    reason: Option<String>,
    headers: HeaderMap,
    head: Option<RenderedHead>,
    head_flushed: bool,
    framing: Framing,
    declared_length: Option<u64>,
    trailers: HeaderMap,
    finished: bool,
    destroyed: bool,
    bytes_written: u64,
}

impl<T> ServerResponse<T> {
    pub fn new(transport: T, request: RequestInfo, config: ResponseConfig) -> Self {
        Self {
            transport,
            request,
            config,
            status: StatusCode::OK,
            reason: None,
            headers: HeaderMap::new(),
            head: None,
            head_flushed: false,
            framing: Framing::Bodiless,
            declared_length: None,
            trailers: HeaderMap::new(),
            finished: false,
            destroyed: false,
            bytes_written: 0,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    pub fn request(&self) -> &RequestInfo {
        &self.request
    }

    /// Rendered status line and header block, once sent.
    pub fn rendered_head(&self) -> Option<&RenderedHead> {
        self.head.as_ref()
    }

    pub fn framing(&self) -> Framing {
        self.framing
    }

    /// Trailers accepted so far.
    pub fn trailers(&self) -> &HeaderMap {
        &self.trailers
    }

    /// Bytes handed to the transport, framing included.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Announce the full body length for an implicit header send.
    pub(crate) fn declare_length(&mut self, len: u64) {
        if self.head.is_none() {
            self.declared_length = Some(len);
        }
    }

    /// Reason phrase: the one set explicitly, else the canonical one.
    pub fn status_message(&self) -> &str {
        self.reason
            .as_deref()
            .or_else(|| self.status.canonical_reason())
            .unwrap_or("unknown")
    }

    fn ensure_open(&self) -> ResponseResult<()> {
        if self.destroyed {
            Err(ResponseError::Destroyed)
        } else if self.finished {
            Err(ResponseError::WriteAfterEnd)
        } else {
            Ok(())
        }
    }

    fn ensure_head_pending(&self) -> ResponseResult<()> {
        if self.head.is_some() {
            Err(ResponseError::HeadersAlreadySent)
        } else {
            Ok(())
        }
    }

    fn body_allowed(&self) -> bool {
        let status = self.status;
        self.request.allows_body()
            && !status.is_informational()
            && status != StatusCode::NO_CONTENT
            && status != StatusCode::NOT_MODIFIED
    }

    fn render_head(&mut self) {
        let body_allowed = self.body_allowed();
        let chunking = self.config.chunked_by_default && self.request.allows_chunked();

        let mut fields = self.headers.clone();
        let has_length = fields.contains_key(header::CONTENT_LENGTH);
        let coding = fields.get(header::TRANSFER_ENCODING).map(is_chunked);

        if self.config.send_date && !fields.contains_key(header::DATE) {
            if let Some(date) = http_date(OffsetDateTime::now_utc())
                .and_then(|d| HeaderValue::from_str(&d).ok())
            {
                fields.insert(header::DATE, date);
            }
        }

        if !fields.contains_key(header::CONNECTION) {
            let persistent = self.config.keep_alive
                && self.request.keep_alive
                && (has_length || self.declared_length.is_some() || chunking);
            let value = if persistent { "keep-alive" } else { "close" };
            fields.insert(header::CONNECTION, HeaderValue::from_static(value));
        }

        self.framing = match coding {
            Some(true) => Framing::Chunked,
            Some(false) => Framing::UntilClose,
            None if has_length => Framing::Length,
            None if !body_allowed => Framing::Bodiless,
            None => match self.declared_length {
                Some(len) => {
                    fields.insert(header::CONTENT_LENGTH, HeaderValue::from(len));
                    Framing::Length
                }
                None if chunking => {
                    fields.insert(
                        header::TRANSFER_ENCODING,
                        HeaderValue::from_static("chunked"),
                    );
                    Framing::Chunked
                }
                None => Framing::UntilClose,
            },
        };
        if !body_allowed {
            self.framing = Framing::Bodiless;
        }

        let reason = self.status_message().to_owned();
        self.head = Some(RenderedHead::render(self.status, &reason, fields));
    }

    fn take_pending_head(&mut self) -> BytesMut {
        let mut buf = BytesMut::new();
        if !self.head_flushed {
            if let Some(head) = &self.head {
                buf.put_slice(head.bytes());
                self.head_flushed = true;
            }
        }
        buf
    }
}

impl<T: AsyncWrite + Unpin> ServerResponse<T> {
    async fn write_body(&mut self, data: Bytes) -> ResponseResult<()> {
        let mut buf = self.take_pending_head();
        match self.framing {
            Framing::Bodiless => {
                if !data.is_empty() {
                    tracing::debug!(
                        status = self.status.as_u16(),
                        method = %self.request.method,
                        bytes = data.len(),
                        "Response must not have a body, ignoring write"
                    );
                }
            }
            _ if data.is_empty() => {}
            Framing::Chunked => {
                buf.put_slice(format!("{:x}\r\n", data.len()).as_bytes());
                buf.put_slice(&data);
                buf.put_slice(b"\r\n");
            }
            Framing::Length | Framing::UntilClose => buf.put_slice(&data),
        }
        self.flush_buf(buf).await
    }

    async fn flush_buf(&mut self, buf: BytesMut) -> ResponseResult<()> {
        if buf.is_empty() {
            return Ok(());
        }
        self.transport.write_all(&buf).await?;
        self.bytes_written += buf.len() as u64;
        Ok(())
    }
}

impl<T: AsyncWrite + Unpin> ResponseSink for ServerResponse<T> {
    fn status(&self) -> StatusCode {
        self.status
    }

    fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    fn reason(&self) -> &str {
        self.status_message()
    }

    fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    fn set_header(&mut self, name: &str, value: &str) -> ResponseResult<()> {
        self.ensure_head_pending()?;
        let name = parse_name(name)?;
        let value = parse_value(&name, value)?;
        self.headers.insert(name, value);
        Ok(())
    }

    fn append_header(&mut self, name: &str, value: &str) -> ResponseResult<()> {
        self.ensure_head_pending()?;
        let name = parse_name(name)?;
        let value = parse_value(&name, value)?;
        self.headers.append(name, value);
        Ok(())
    }

    fn remove_header(&mut self, name: &str) -> ResponseResult<Option<HeaderValue>> {
        self.ensure_head_pending()?;
        let name = parse_name(name)?;
        Ok(self.headers.remove(name))
    }

    fn headers_sent(&self) -> bool {
        self.head.is_some()
    }

    fn finished(&self) -> bool {
        self.finished
    }

    fn send_headers(
        &mut self,
        status: StatusCode,
        reason: Option<&str>,
        headers: Option<HeaderMap>,
    ) -> ResponseResult<()> {
        self.ensure_head_pending()?;
        if let Some(reason) = reason {
            if reason.contains(['\r', '\n']) {
                return Err(ResponseError::InvalidReason(reason.to_string()));
            }
            self.reason = Some(reason.to_string());
        }
        self.status = status;
        if let Some(headers) = headers {
            merge_headers(&mut self.headers, headers);
        }
        self.render_head();
        Ok(())
    }

    async fn write(&mut self, chunk: impl Into<Chunk>) -> ResponseResult<bool> {
        self.ensure_open()?;
        let chunk: Chunk = chunk.into();
        let data = chunk.into_bytes()?;
        if self.head.is_none() {
            let status = self.status;
            self.send_headers(status, None, None)?;
        }
        self.write_body(data).await?;
        Ok(true)
    }

    async fn end(&mut self, chunk: Option<Chunk>) -> ResponseResult<()> {
        if self.destroyed {
            return Err(ResponseError::Destroyed);
        }
        if self.finished {
            return match chunk {
                Some(chunk) if !chunk.is_empty() => Err(ResponseError::WriteAfterEnd),
                _ => Ok(()),
            };
        }

        let data = match chunk {
            Some(chunk) => chunk.into_bytes()?,
            None => Bytes::new(),
        };
        if self.head.is_none() {
            self.declare_length(data.len() as u64);
            let status = self.status;
            self.send_headers(status, None, None)?;
        }
        self.write_body(data).await?;

        if self.framing == Framing::Chunked {
            let mut buf = BytesMut::from(&b"0\r\n"[..]);
            render_trailers(&mut buf, &self.trailers);
            self.flush_buf(buf).await?;
        }
        self.transport.flush().await?;
        self.finished = true;

        tracing::trace!(
            status = self.status.as_u16(),
            bytes_written = self.bytes_written,
            "Response finished"
        );
        Ok(())
    }

    fn add_trailers<I, K, V>(&mut self, trailers: I) -> ResponseResult<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: ToString,
    {
        for (name, value) in trailers {
            let name = parse_name(name.as_ref())?;
            let value = parse_value(&name, value.to_string().trim())?;
            self.trailers.insert(name, value);
        }
        Ok(())
    }

    fn destroy(&mut self) {
        if !self.destroyed {
            self.destroyed = true;
            tracing::debug!(
                status = self.status.as_u16(),
                finished = self.finished,
                "Response destroyed"
            );
        }
    }
}

fn parse_name(name: &str) -> ResponseResult<HeaderName> {
    HeaderName::from_bytes(name.trim().as_bytes())
        .map_err(|_| ResponseError::InvalidHeaderName(name.to_string()))
}

fn parse_value(name: &HeaderName, value: &str) -> ResponseResult<HeaderValue> {
    HeaderValue::from_str(value).map_err(|_| ResponseError::InvalidHeaderValue {
        name: name.to_string(),
    })
}

fn is_chunked(value: &HeaderValue) -> bool {
    value
        .to_str()
        .ok()
        .and_then(|v| v.rsplit(',').next())
        .map(|last| last.trim().eq_ignore_ascii_case("chunked"))
        .unwrap_or(false)
}

/// Merge `source` into `target`, each name in `source` replacing `target`'s values.
fn merge_headers(target: &mut HeaderMap, source: HeaderMap) {
    let mut current: Option<HeaderName> = None;
    for (name, value) in source {
        match name {
            Some(name) => {
                target.insert(name.clone(), value);
                current = Some(name);
            }
            None => {
                if let Some(name) = &current {
                    target.append(name.clone(), value);
                }
            }
        }
    }
}
