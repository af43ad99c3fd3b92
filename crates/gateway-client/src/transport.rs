//! HTTP transport abstraction
//!
//! The client hands a fully prepared request to a `Transport` and gets back
//! status, headers and the whole body. `ReqwestTransport` is the production
//! implementation; tests plug in scripted transports.
//!
//! Uses `Pin<Box<dyn Future>>` return types so the client can hold an
//! `Arc<dyn Transport>`.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};
use tracing::debug;

use crate::error::{Error, Result};
use crate::multipart::MultipartForm;

/// Body of an outbound request.
#[derive(Debug, Clone, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    /// Already JSON-encoded bytes.
    Json(Bytes),
    Multipart(MultipartForm),
}

/// A request ready for dispatch.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    /// Host prefix + address + query string.
    pub url: String,
    pub headers: HeaderMap,
    pub body: RequestBody,
    pub timeout: Duration,
}

/// A fully read response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    /// The URL the response belongs to, used in synthesized problem titles.
    pub url: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Pluggable HTTP transport.
pub trait Transport: Send + Sync {
    /// Send one request and read its full response.
    ///
    /// Any failure (timeout, DNS, refused connection, body read) is an `Err`;
    /// non-success statuses are a normal `Ok` response.
    fn send(
        &self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse>> + Send + '_>>;
}

/// Transport backed by `reqwest`.
///
/// `per_call()` acquires a fresh client for every request and drops it
/// afterwards; `shared()` reuses an injected, pooled client.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    shared: Option<reqwest::Client>,
}

impl ReqwestTransport {
    pub fn per_call() -> Self {
        Self { shared: None }
    }

    pub fn shared(client: reqwest::Client) -> Self {
        Self {
            shared: Some(client),
        }
    }

    fn client(&self) -> reqwest::Client {
        match &self.shared {
            Some(client) => client.clone(),
            None => reqwest::Client::new(),
        }
    }
}

impl Transport for ReqwestTransport {
    fn send(
        &self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse>> + Send + '_>> {
        Box::pin(async move {
            let client = self.client();
            let mut builder = client
                .request(request.method.clone(), &request.url)
                .headers(request.headers)
                .timeout(request.timeout);

            builder = match request.body {
                RequestBody::Empty => builder,
                RequestBody::Json(bytes) => builder.body(bytes),
                RequestBody::Multipart(form) => builder.multipart(form.to_reqwest()?),
            };

            let response = builder.send().await.map_err(map_reqwest_error)?;
            let status = response.status();
            let url = response.url().to_string();
            let headers = response.headers().clone();
            let body = response.bytes().await.map_err(map_reqwest_error)?;

            debug!(method = %request.method, %url, status = status.as_u16(), bytes = body.len(), "response received");

            Ok(HttpResponse {
                status,
                url,
                headers,
                body,
            })
        })
    }
}

fn map_reqwest_error(err: reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::Timeout
    } else if err.is_connect() {
        Error::Connection(err.to_string())
    } else {
        Error::Transport(err.to_string())
    }
}
