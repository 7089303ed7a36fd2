//! Write-only transport that discards everything.
//!
//! # Responsibilities
//! - Stand in for a socket under a `ServerResponse`
//! - Accept every write, acknowledging it one scheduler tick later
//! - Count absorbed bytes for inspection
//!
//! # Design Decisions
//! - Each write first returns `Pending` and wakes itself, so the
//!   acknowledgment is never synchronous
//! - No capacity limit, no backpressure, never fails

use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::io::AsyncWrite;

/// Shared count of bytes a [`NullSink`] absorbed.
///
/// Relaxed ordering is enough: the counter is read for inspection only.
#[derive(Debug, Clone, Default)]
pub struct AbsorbedBytes(Arc<AtomicU64>);

impl AbsorbedBytes {
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    fn add(&self, n: usize) {
        self.0.fetch_add(n as u64, Ordering::Relaxed);
    }
}

/// Transport that accepts and drops all bytes.
#[derive(Debug, Default)]
pub struct NullSink {
    /// Set while a write has been deferred and awaits its second poll.
    deferred: bool,
    absorbed: AbsorbedBytes,
}

impl NullSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle to the absorbed byte count, valid after the sink is moved.
    pub fn absorbed(&self) -> AbsorbedBytes {
        self.absorbed.clone()
    }
}

impl AsyncWrite for NullSink {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        if !this.deferred {
            this.deferred = true;
            cx.waker().wake_by_ref();
            return Poll::Pending;
        }

        this.deferred = false;
        this.absorbed.add(buf.len());
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        // A write dropped while deferred must not leave the next one acknowledged early
        self.get_mut().deferred = false;
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.get_mut().deferred = false;
        Poll::Ready(Ok(()))
    }
}
