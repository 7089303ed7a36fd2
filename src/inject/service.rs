//! Tower service adapter.
//!
//! # Responsibilities
//! - Forward a synthetic request to any `tower::Service` (e.g. an axum `Router`)
//! - Replay the service's response onto a `ResponseSink`: status and headers,
//!   each data frame as a write, trailer frames as trailers, then `end`
//!
//! # Design Decisions
//! - The service is cloned per call, the way `ServiceExt::oneshot` expects
//! - Non-UTF-8 trailer values are decoded lossily

use axum::body::{Body, HttpBody};
use bytes::Bytes;
use http::{Request, Response};
use http_body_util::BodyExt;
use tower::{Service, ServiceExt};

use crate::http::{ResponseSink, SyntheticRequest};
use crate::inject::runner::{BoxError, Handler, InjectError, InjectResult};

/// Runs a tower service as an injection [`Handler`].
#[derive(Debug, Clone)]
pub struct ServiceHandler<S> {
    service: S,
}

impl<S> ServiceHandler<S> {
    pub fn new(service: S) -> Self {
        Self { service }
    }

    pub fn into_inner(self) -> S {
        self.service
    }
}

impl<S, B> Handler for ServiceHandler<S>
where
    S: Service<Request<Body>, Response = Response<B>> + Clone,
    S::Error: Into<BoxError>,
    B: HttpBody<Data = Bytes>,
    B::Error: Into<BoxError>,
{
    async fn handle<R: ResponseSink>(
        &self,
        request: &SyntheticRequest,
        response: &mut R,
    ) -> InjectResult<()> {
        let upstream = self
            .service
            .clone()
            .oneshot(to_service_request(request))
            .await
            .map_err(|e| InjectError::Service(e.into()))?;

        let (parts, body) = upstream.into_parts();
        response.send_headers(parts.status, None, Some(parts.headers))?;

        let mut body = Box::pin(body);
        while let Some(frame) = body.frame().await {
            let frame = frame.map_err(|e| InjectError::Body(e.into()))?;
            match frame.into_data() {
                Ok(data) => {
                    response.write(data).await?;
                }
                Err(frame) => {
                    if let Ok(trailers) = frame.into_trailers() {
                        response.add_trailers(trailers.iter().map(|(name, value)| {
                            (name.as_str(), String::from_utf8_lossy(value.as_bytes()))
                        }))?;
                    }
                }
            }
        }

        response.end(None).await?;
        Ok(())
    }
}

fn to_service_request(request: &SyntheticRequest) -> Request<Body> {
    let mut forwarded = Request::new(Body::from(request.body().clone()));
    *forwarded.method_mut() = request.method().clone();
    *forwarded.uri_mut() = request.uri().clone();
    *forwarded.version_mut() = request.version();
    *forwarded.headers_mut() = request.headers().clone();
    *forwarded.extensions_mut() = request.extensions().clone();
    forwarded
}
