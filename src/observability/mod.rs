//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! http / inject subsystems produce:
//!     → tracing events (header send, ignored writes, end, completion)
//!     → spans carrying the exchange ID
//!
//! Consumers:
//!     → logging.rs subscriber (stdout, fmt or JSON)
//! ```
//!
//! # Design Decisions
//! - Structured fields instead of formatted messages
//! - Exchange ID flows through every event of one injection

pub mod logging;

pub use logging::init_logging;
