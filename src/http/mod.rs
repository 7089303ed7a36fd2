//! HTTP response machinery.
//!
//! # Data Flow
//! ```text
//! handler
//!     → sink.rs (ResponseSink: send_headers / write / end / add_trailers / destroy)
//!     → response.rs (ServerResponse: status, header map, framing)
//!     → head.rs (status line + header block, synthesized fields)
//!     → transport (any AsyncWrite: TCP stream, Vec<u8>, NullSink)
//! ```
//!
//! # Design Decisions
//! - One trait for every response a handler can see; the capturing response
//!   in `inject` wraps a `ServerResponse` instead of extending it
//! - Synthesized header fields are exposed through `RenderedHead`, never
//!   scraped from the wire bytes

pub mod chunk;
pub mod error;
pub mod head;
pub mod request;
pub mod response;
pub mod sink;

pub use chunk::{Chunk, Encoding};
pub use error::{ResponseError, ResponseResult};
pub use head::RenderedHead;
pub use request::{ExchangeId, RequestInfo, SyntheticRequest};
pub use response::{Framing, ServerResponse};
pub use sink::ResponseSink;
