//! In-process injection subsystem.
//!
//! # Data Flow
//! ```text
//! SyntheticRequest
//!     → runner.rs (inject: fresh response + NullSink per call, optional deadline)
//!     → Handler (hand-written, or service.rs wrapping a tower Service)
//!     → capture.rs (SyntheticResponse: header copy, chunk capture, trailers)
//!         → live.rs (optional: bytes + state to a LiveReader as they happen)
//!     → snapshot.rs (ResponseSnapshot, delivered once on end)
//! ```
//!
//! # Design Decisions
//! - No socket, no listener: the response writes into a `NullSink`
//! - Each injection owns its response, sink and live stream exclusively
//! - Byte retention (keep vs forward to live) is fixed at construction

pub mod capture;
pub mod live;
pub mod runner;
pub mod service;
pub mod snapshot;

pub use capture::{OnComplete, SyntheticResponse, SyntheticResponseBuilder};
pub use live::{live_channel, LiveReader, LiveState, LiveStream};
pub use runner::{inject, BoxError, Handler, InjectError, InjectOptions, InjectResult};
pub use service::ServiceHandler;
pub use snapshot::{RawExchange, ResponseHandle, ResponseSnapshot};
