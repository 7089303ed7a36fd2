//! The handler-facing response contract.

use http::{HeaderMap, HeaderValue, StatusCode};

use crate::http::chunk::Chunk;
use crate::http::error::ResponseResult;

/// Operations a request handler performs on a response.
///
/// Implemented by [`ServerResponse`](crate::http::ServerResponse), which
/// renders onto a transport, and by
/// [`SyntheticResponse`](crate::inject::SyntheticResponse), which records
/// everything for later inspection. Handlers written against this trait
/// cannot tell the two apart.
#[allow(async_fn_in_trait)]
pub trait ResponseSink {
    /// Current status code.
    fn status(&self) -> StatusCode;

    /// Set the status used by an implicit header send.
    fn set_status(&mut self, status: StatusCode);

    /// Reason phrase that goes (or went) into the status line.
    fn reason(&self) -> &str;

    /// Application header map.
    fn headers(&self) -> &HeaderMap;

    fn header(&self, name: &str) -> Option<&HeaderValue> {
        self.headers().get(name)
    }

    /// Replace every value of `name` with `value`.
    fn set_header(&mut self, name: &str, value: &str) -> ResponseResult<()>;

    /// Add a value to `name`, keeping existing ones.
    fn append_header(&mut self, name: &str, value: &str) -> ResponseResult<()>;

    fn remove_header(&mut self, name: &str) -> ResponseResult<Option<HeaderValue>>;

    /// Whether the status line and header block were rendered.
    fn headers_sent(&self) -> bool;

    /// Whether `end` completed.
    fn finished(&self) -> bool;

    /// Render the status line and header block.
    ///
    /// `headers` are merged into the application header map first, each
    /// supplied name replacing the existing values.
    fn send_headers(
        &mut self,
        status: StatusCode,
        reason: Option<&str>,
        headers: Option<HeaderMap>,
    ) -> ResponseResult<()>;

    /// Write a body chunk, sending headers first if needed.
    ///
    /// Returns `true` when the caller may keep writing immediately.
    async fn write(&mut self, chunk: impl Into<Chunk>) -> ResponseResult<bool>;

    /// Finish the response, optionally writing one last chunk.
    async fn end(&mut self, chunk: Option<Chunk>) -> ResponseResult<()>;

    /// Add trailer fields sent after a chunked body.
    fn add_trailers<I, K, V>(&mut self, trailers: I) -> ResponseResult<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: ToString;

    /// Abort the response and release the transport.
    fn destroy(&mut self);
}
