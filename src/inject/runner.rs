//! Running a handler against a capturing response.
//!
//! # Responsibilities
//! - Build a fresh `SyntheticResponse` over a fresh `NullSink` per call
//! - Drive the handler and wait for the completion snapshot
//! - Apply the caller-side deadline, if any
//!
//! # Design Decisions
//! - The snapshot travels through a oneshot channel fed by the completion
//!   callback, so the runner and a hand-built response use the same path
//! - A handler that returns without ending the response yields `Incomplete`
//!   instead of hanging

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::oneshot;
use tracing::Instrument;

use crate::config::{InjectorConfig, ResponseConfig};
use crate::http::{ResponseError, ResponseSink, SyntheticRequest};
use crate::inject::capture::SyntheticResponse;
use crate::inject::live::LiveStream;
use crate::inject::snapshot::ResponseSnapshot;

/// Boxed error from a service or body.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors surfaced by an injected exchange.
#[derive(Debug, Error)]
pub enum InjectError {
    /// The response machinery rejected an operation.
    #[error(transparent)]
    Response(#[from] ResponseError),

    /// The handler returned without ending the response.
    #[error("Handler returned without ending the response")]
    Incomplete,

    /// The exchange did not finish before the deadline.
    #[error("Injection timed out after {0:?}")]
    Timeout(Duration),

    /// The wrapped service failed.
    #[error("Service error: {0}")]
    Service(#[source] BoxError),

    /// The response body stream failed.
    #[error("Body error: {0}")]
    Body(#[source] BoxError),
}

/// Result type for injection.
pub type InjectResult<T> = Result<T, InjectError>;

/// A request handler that works with any [`ResponseSink`].
#[allow(async_fn_in_trait)]
pub trait Handler {
    async fn handle<R: ResponseSink>(
        &self,
        request: &SyntheticRequest,
        response: &mut R,
    ) -> InjectResult<()>;
}

/// Per-call settings for [`inject`].
#[derive(Debug, Default)]
pub struct InjectOptions {
    pub response: ResponseConfig,
    /// Forward the body here instead of keeping it in the snapshot.
    pub live: Option<LiveStream>,
    pub timeout: Option<Duration>,
}

impl InjectOptions {
    pub fn from_config(config: &InjectorConfig) -> Self {
        Self {
            response: config.response,
            live: None,
            timeout: config.inject.timeout_ms.map(Duration::from_millis),
        }
    }

    pub fn with_live(mut self, live: LiveStream) -> Self {
        self.live = Some(live);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Run `handler` on `request` and return what it sent.
pub async fn inject<H: Handler>(
    handler: &H,
    request: SyntheticRequest,
    options: InjectOptions,
) -> InjectResult<ResponseSnapshot> {
    let request = Arc::new(request);
    let (tx, rx) = oneshot::channel();

    let mut builder = SyntheticResponse::builder(Arc::clone(&request))
        .config(options.response)
        .on_complete(move |snapshot| {
            // The receiver only goes away when the deadline already fired
            let _ = tx.send(snapshot);
        });
    if let Some(live) = options.live {
        builder = builder.live(live);
    }
    let mut response = builder.build();

    let span = tracing::debug_span!(
        "inject",
        exchange_id = %response.id(),
        method = %request.method(),
        uri = %request.uri(),
    );

    let exchange = async move {
        handler.handle(&request, &mut response).await?;
        drop(response);
        rx.await.map_err(|_| InjectError::Incomplete)
    }
    .instrument(span);

    match options.timeout {
        Some(limit) => tokio::time::timeout(limit, exchange)
            .await
            .map_err(|_| InjectError::Timeout(limit))?,
        None => exchange.await,
    }
}
