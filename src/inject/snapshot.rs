//! Finished-response records.

use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use crate::http::{ExchangeId, SyntheticRequest};
use crate::net::AbsorbedBytes;

/// Live handle to a capturing response.
///
/// Clones share state with the response, so a handle taken early still
/// reports the rendered head and the finished flag later on.
#[derive(Debug, Clone)]
pub struct ResponseHandle {
    id: ExchangeId,
    shared: Arc<HandleState>,
}

#[derive(Debug)]
struct HandleState {
    head: OnceLock<Bytes>,
    finished: AtomicBool,
    absorbed: AbsorbedBytes,
}

impl ResponseHandle {
    pub(crate) fn new(id: ExchangeId, absorbed: AbsorbedBytes) -> Self {
        Self {
            id,
            shared: Arc::new(HandleState {
                head: OnceLock::new(),
                finished: AtomicBool::new(false),
                absorbed,
            }),
        }
    }

    pub fn id(&self) -> ExchangeId {
        self.id
    }

    /// Rendered status line and header block, once sent.
    pub fn rendered_head(&self) -> Option<&Bytes> {
        self.shared.head.get()
    }

    /// Bytes the null sink swallowed, framing included.
    pub fn wire_bytes(&self) -> u64 {
        self.shared.absorbed.get()
    }

    pub fn is_finished(&self) -> bool {
        self.shared.finished.load(Ordering::Acquire)
    }

    pub(crate) fn record_head(&self, head: Bytes) {
        let _ = self.shared.head.set(head);
    }

    pub(crate) fn mark_finished(&self) {
        self.shared.finished.store(true, Ordering::Release);
    }
}

/// The request/response pair behind a snapshot.
#[derive(Debug, Clone)]
pub struct RawExchange {
    pub req: Arc<SyntheticRequest>,
    pub res: ResponseHandle,
}

/// Everything a handler sent, assembled once the response finished.
#[derive(Debug, Clone)]
pub struct ResponseSnapshot {
    pub raw: RawExchange,
    /// Headers as sent, plus the rendered `date`, `connection` and
    /// `transfer-encoding` fields.
    pub headers: HeaderMap,
    pub status_code: StatusCode,
    pub status_message: String,
    /// Lower-cased, trimmed trailer names mapped to trimmed values.
    pub trailers: BTreeMap<String, String>,
    /// Concatenated body, absent when bytes went to a live consumer.
    pub raw_payload: Option<Bytes>,
    /// Lossy UTF-8 decoding of `raw_payload`.
    pub payload: Option<String>,
}

impl ResponseSnapshot {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn trailer(&self, name: &str) -> Option<&str> {
        self.trailers
            .get(&name.trim().to_lowercase())
            .map(String::as_str)
    }

    /// Deserialize the payload as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_slice(self.raw_payload.as_deref().unwrap_or_default())
    }
}

/// Concatenate captured chunks in write order.
pub(crate) fn concat(chunks: &[Bytes]) -> Bytes {
    match chunks {
        [] => Bytes::new(),
        [single] => single.clone(),
        _ => {
            let mut buf = Vec::with_capacity(chunks.iter().map(Bytes::len).sum());
            for chunk in chunks {
                buf.extend_from_slice(chunk);
            }
            buf.into()
        }
    }
}
