//! Shared handlers for integration tests.

#![allow(dead_code)]

use bytes::Bytes;
use http::{HeaderMap, Request, StatusCode};
use http_injector::inject::{Handler, InjectResult};
use http_injector::{Chunk, ResponseSink, SyntheticRequest};

/// Build a GET request for `path`.
pub fn get(path: &str) -> SyntheticRequest {
    Request::builder().uri(path).body(Bytes::new()).unwrap()
}

/// Sets 404, writes "not found", ends.
pub struct NotFound;

impl Handler for NotFound {
    async fn handle<R: ResponseSink>(
        &self,
        _request: &SyntheticRequest,
        response: &mut R,
    ) -> InjectResult<()> {
        response.set_status(StatusCode::NOT_FOUND);
        response.write("not found").await?;
        response.end(None).await?;
        Ok(())
    }
}

/// Writes each chunk in order, then ends.
pub struct Chunks(pub Vec<Chunk>);

impl Handler for Chunks {
    async fn handle<R: ResponseSink>(
        &self,
        _request: &SyntheticRequest,
        response: &mut R,
    ) -> InjectResult<()> {
        for chunk in &self.0 {
            response.write(chunk.clone()).await?;
        }
        response.end(None).await?;
        Ok(())
    }
}

/// Sends explicit headers, a body and trailers.
pub struct PlainText {
    pub body: &'static str,
}

impl Handler for PlainText {
    async fn handle<R: ResponseSink>(
        &self,
        _request: &SyntheticRequest,
        response: &mut R,
    ) -> InjectResult<()> {
        let mut headers = HeaderMap::new();
        headers.insert("content-type", "text/plain".parse().unwrap());
        response.send_headers(StatusCode::OK, Some("OK"), Some(headers))?;
        response.write(self.body).await?;
        response.add_trailers([("X-Foo", " bar ")])?;
        response.add_trailers([("x-foo", "baz")])?;
        response.end(None).await?;
        Ok(())
    }
}

/// Echoes the request body back with the request method in a header.
pub struct Echo;

impl Handler for Echo {
    async fn handle<R: ResponseSink>(
        &self,
        request: &SyntheticRequest,
        response: &mut R,
    ) -> InjectResult<()> {
        response.set_header("x-method", request.method().as_str())?;
        response.end(Some(Chunk::Bytes(request.body().clone()))).await?;
        Ok(())
    }
}
