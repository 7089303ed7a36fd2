//! Status line and header block rendering.
//!
//! # Responsibilities
//! - Render the status line and header block into wire bytes
//! - Record every rendered field, including the ones synthesized by the
//!   response machinery (`Date`, `Connection`, framing headers)
//! - Format IMF-fixdate timestamps
//!
//! # Design Decisions
//! - Rendered fields are kept as a `HeaderMap` next to the wire bytes, so
//!   callers never parse the header block to find synthesized values
//! - The status line always announces HTTP/1.1

use bytes::{BufMut, Bytes, BytesMut};
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use time::macros::format_description;
use time::OffsetDateTime;

/// A rendered status line and header block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedHead {
    bytes: Bytes,
    fields: HeaderMap,
}

impl RenderedHead {
    /// Render `fields` under a status line.
    pub fn render(status: StatusCode, reason: &str, fields: HeaderMap) -> Self {
        let mut buf = BytesMut::with_capacity(128 + fields.len() * 32);
        buf.put_slice(b"HTTP/1.1 ");
        buf.put_slice(status.as_str().as_bytes());
        buf.put_u8(b' ');
        buf.put_slice(reason.as_bytes());
        buf.put_slice(b"\r\n");
        for (name, value) in fields.iter() {
            put_field(&mut buf, name, value);
        }
        buf.put_slice(b"\r\n");

        Self {
            bytes: buf.freeze(),
            fields,
        }
    }

    /// Wire bytes, terminated by the empty line.
    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    /// Every field that went out on the wire.
    pub fn fields(&self) -> &HeaderMap {
        &self.fields
    }

    /// Value of a rendered field, if it was rendered and is valid UTF-8.
    pub fn field(&self, name: &HeaderName) -> Option<&str> {
        self.fields.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Render trailer fields followed by the terminating empty line.
pub(crate) fn render_trailers(buf: &mut BytesMut, trailers: &HeaderMap) {
    for (name, value) in trailers.iter() {
        put_field(buf, name, value);
    }
    buf.put_slice(b"\r\n");
}

fn put_field(buf: &mut BytesMut, name: &HeaderName, value: &HeaderValue) {
    buf.put_slice(canonical_name(name).as_bytes());
    buf.put_slice(b": ");
    buf.put_slice(value.as_bytes());
    buf.put_slice(b"\r\n");
}

/// Title-case a header name (`content-type` → `Content-Type`).
pub fn canonical_name(name: &HeaderName) -> String {
    let mut upper = true;
    name.as_str()
        .chars()
        .map(|c| {
            let out = if upper { c.to_ascii_uppercase() } else { c };
            upper = c == '-';
            out
        })
        .collect()
}

/// Format a timestamp as an IMF-fixdate (`Sun, 06 Nov 1994 08:49:37 GMT`).
pub fn http_date(at: OffsetDateTime) -> Option<String> {
    let format = format_description!(
        "[weekday repr:short], [day] [month repr:short] [year] [hour]:[minute]:[second] GMT"
    );
    at.to_offset(time::UtcOffset::UTC).format(format).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header;
    use time::macros::datetime;

    #[test]
    fn test_http_date() {
        let at = datetime!(1994-11-06 08:49:37 UTC);
        assert_eq!(http_date(at).unwrap(), "Sun, 06 Nov 1994 08:49:37 GMT");

        let shifted = datetime!(1994-11-06 10:49:37 +02:00);
        assert_eq!(http_date(shifted).unwrap(), "Sun, 06 Nov 1994 08:49:37 GMT");
    }

    #[test]
    fn test_canonical_name() {
        assert_eq!(canonical_name(&header::CONTENT_TYPE), "Content-Type");
        assert_eq!(canonical_name(&HeaderName::from_static("x-a-b")), "X-A-B");
        assert_eq!(canonical_name(&header::DATE), "Date");
    }

    #[test]
    fn test_render_head() {
        let mut fields = HeaderMap::new();
        fields.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        fields.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));

        let head = RenderedHead::render(StatusCode::NOT_FOUND, "Not Found", fields);
        assert_eq!(
            head.bytes().as_ref(),
            b"HTTP/1.1 404 Not Found\r\nContent-Type: text/plain\r\nConnection: keep-alive\r\n\r\n"
        );
        assert_eq!(head.field(&header::CONNECTION), Some("keep-alive"));
        assert_eq!(head.field(&header::DATE), None);
    }
}
