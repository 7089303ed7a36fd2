//! Progressive consumption of a capturing response.
//!
//! # Responsibilities
//! - Carry body bytes from the response to a reader as they are written
//! - Re-expose the evolving response state (status, headers, trailers)
//! - Signal end-of-stream when the response ends
//!
//! # Design Decisions
//! - The byte channel is unbounded: the response never waits on the reader,
//!   matching a `write` that always reports success
//! - `raw` is sticky: the first refresh sets it, later refreshes skip it
//! - A dropped reader is not an error; further bytes are discarded

use bytes::Bytes;
use futures_util::Stream;
use http::{HeaderMap, StatusCode};
use std::collections::BTreeMap;
use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, ReadBuf};
use tokio::sync::mpsc;

use crate::inject::snapshot::RawExchange;

/// Response state visible to a live reader.
#[derive(Debug, Clone, Default)]
pub struct LiveState {
    /// Set at the first refresh and never replaced.
    pub raw: Option<RawExchange>,
    /// Present once headers were sent.
    pub headers: Option<HeaderMap>,
    pub status_code: Option<StatusCode>,
    pub status_message: Option<String>,
    pub trailers: BTreeMap<String, String>,
}

/// Fields pushed into a [`LiveState`] on refresh.
#[derive(Debug)]
pub(crate) struct LiveUpdate<'a> {
    pub raw: &'a RawExchange,
    pub headers: Option<&'a HeaderMap>,
    pub status_code: StatusCode,
    pub status_message: &'a str,
    pub trailers: &'a BTreeMap<String, String>,
}

type SharedState = Arc<Mutex<LiveState>>;

fn lock(state: &SharedState) -> MutexGuard<'_, LiveState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Create a connected writer/reader pair.
pub fn live_channel() -> (LiveStream, LiveReader) {
    let (tx, rx) = mpsc::unbounded_channel();
    let state = SharedState::default();
    (
        LiveStream {
            tx: Some(tx),
            state: Arc::clone(&state),
        },
        LiveReader {
            rx,
            pending: Bytes::new(),
            state,
        },
    )
}

/// Writing half, handed to a capturing response at construction.
#[derive(Debug)]
pub struct LiveStream {
    tx: Option<mpsc::UnboundedSender<Bytes>>,
    state: SharedState,
}

impl LiveStream {
    pub(crate) fn write(&mut self, data: Bytes) {
        if data.is_empty() {
            return;
        }
        if let Some(tx) = &self.tx {
            if tx.send(data).is_err() {
                tracing::debug!("Live reader dropped, discarding bytes");
                self.tx = None;
            }
        }
    }

    pub(crate) fn end(&mut self) {
        self.tx = None;
    }

    #[cfg(test)]
    pub(crate) fn is_ended(&self) -> bool {
        self.tx.is_none()
    }

    pub(crate) fn refresh(&self, update: LiveUpdate<'_>) {
        let mut state = lock(&self.state);
        if state.raw.is_none() {
            state.raw = Some(update.raw.clone());
        }
        state.headers = update.headers.cloned();
        state.status_code = Some(update.status_code);
        state.status_message = Some(update.status_message.to_string());
        state.trailers = update.trailers.clone();
    }
}

/// Reading half: body bytes in write order, plus the latest state.
#[derive(Debug)]
pub struct LiveReader {
    rx: mpsc::UnboundedReceiver<Bytes>,
    pending: Bytes,
    state: SharedState,
}

impl LiveReader {
    /// Copy of the latest response state.
    pub fn state(&self) -> LiveState {
        lock(&self.state).clone()
    }

    pub fn raw(&self) -> Option<RawExchange> {
        lock(&self.state).raw.clone()
    }

    pub fn headers(&self) -> Option<HeaderMap> {
        lock(&self.state).headers.clone()
    }

    pub fn status_code(&self) -> Option<StatusCode> {
        lock(&self.state).status_code
    }
}

impl Stream for LiveReader {
    type Item = Bytes;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Bytes>> {
        let this = self.get_mut();
        if !this.pending.is_empty() {
            return Poll::Ready(Some(std::mem::take(&mut this.pending)));
        }
        this.rx.poll_recv(cx)
    }
}

impl AsyncRead for LiveReader {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        loop {
            if !this.pending.is_empty() {
                let n = this.pending.len().min(buf.remaining());
                buf.put_slice(&this.pending.split_to(n));
                return Poll::Ready(Ok(()));
            }
            match this.rx.poll_recv(cx) {
                Poll::Ready(Some(chunk)) => this.pending = chunk,
                // End of stream
                Poll::Ready(None) => return Poll::Ready(Ok(())),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
