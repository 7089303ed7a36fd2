//! Synthetic request handling.
//!
//! # Responsibilities
//! - Define the request type handlers receive during injection
//! - Extract the fields the response needs for protocol negotiation
//! - Generate unique exchange IDs for tracing
//!
//! # Design Decisions
//! - The request is opaque to the response; only method, version and the
//!   `Connection` header are read
//! - HTTP/1.0 and older never keep the connection alive

use bytes::Bytes;
use http::{header, Method, Request, Version};
use uuid::Uuid;

/// Request type fed into handlers during injection.
pub type SyntheticRequest = Request<Bytes>;

/// Unique identifier for one simulated exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExchangeId(Uuid);

impl ExchangeId {
    /// Generate a new random exchange ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ExchangeId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ExchangeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Request fields consulted when rendering a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestInfo {
    pub method: Method,
    pub version: Version,
    /// Whether the client allows the connection to stay open.
    pub keep_alive: bool,
}

impl RequestInfo {
    pub fn from_request<B>(request: &Request<B>) -> Self {
        let version = request.version();
        let wants_close = request
            .headers()
            .get_all(header::CONNECTION)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(','))
            .any(|token| token.trim().eq_ignore_ascii_case("close"));

        Self {
            method: request.method().clone(),
            version,
            keep_alive: supports_persistence(version) && !wants_close,
        }
    }

    /// Whether the response to this request may carry a body.
    pub fn allows_body(&self) -> bool {
        self.method != Method::HEAD
    }

    /// Whether chunked transfer coding can be used.
    pub fn allows_chunked(&self) -> bool {
        supports_persistence(self.version)
    }
}

impl Default for RequestInfo {
    fn default() -> Self {
        Self {
            method: Method::GET,
            version: Version::HTTP_11,
            keep_alive: true,
        }
    }
}

fn supports_persistence(version: Version) -> bool {
    version != Version::HTTP_09 && version != Version::HTTP_10
}
