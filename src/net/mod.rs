//! Transport layer subsystem.
//!
//! # Data Flow
//! ```text
//! ServerResponse
//!     → rendered head + framed body bytes
//!     → null_sink.rs (acknowledged one tick later, then dropped)
//! ```
//!
//! # Design Decisions
//! - No socket is ever bound; injection only needs something that behaves
//!   like an always-ready writer
//! - Absorbed bytes are counted, not stored

pub mod null_sink;

pub use null_sink::{AbsorbedBytes, NullSink};
