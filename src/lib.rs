//! In-process HTTP response capture.
//!
//! Exercise a request handler without a socket: build a synthetic request,
//! hand the handler a [`SyntheticResponse`](inject::SyntheticResponse), and
//! get back a [`ResponseSnapshot`](inject::ResponseSnapshot) with the status,
//! headers, trailers and payload it sent.
//!
//! ```text
//!   SyntheticRequest ──▶ Handler ──▶ SyntheticResponse ──▶ ServerResponse ──▶ NullSink
//!                                          │
//!                                          ├──▶ LiveReader (optional, progressive)
//!                                          ▼
//!                                   ResponseSnapshot
//! ```

pub mod config;
pub mod http;
pub mod inject;
pub mod net;
pub mod observability;

pub use config::InjectorConfig;
pub use crate::http::{Chunk, Encoding, ResponseError, ResponseSink, ServerResponse, SyntheticRequest};
pub use inject::{inject, Handler, InjectError, InjectOptions, ResponseSnapshot, SyntheticResponse};
pub use net::NullSink;
