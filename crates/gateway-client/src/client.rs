//! Call orchestration
//!
//! One generic call path serves every verb:
//! 1. Build the `Authorization` header from a snapshot of the credentials
//! 2. Dispatch through the transport
//! 3. Classify the response
//! 4. On an `unauthorized` problem for a call that relied on stored bearer
//!    tokens with auto-refresh on, refresh once and dispatch again pinned to
//!    the current access token
//!
//! The second dispatch always carries an explicit token, which makes it
//! ineligible for another refresh, so a call performs at most one retry.
//! Every local failure becomes a `server_unexpected_error` problem; the
//! public methods never return `Err`.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use bytes::Bytes;
use gateway_auth::{Auth, AuthMode, Credentials, RefreshHook, RefreshResponse, TokenPair, TokenProvider};
use reqwest::Method;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::classify::classify;
use crate::config::ClientConfig;
use crate::decode::{DecodeTarget, Json};
use crate::error::{Error, Result};
use crate::metrics::{record_call, record_refresh};
use crate::multipart::MultipartForm;
use crate::problem::{CallResult, ErrorKind, ProblemDetails};
use crate::transport::{HttpRequest, ReqwestTransport, RequestBody, Transport};

const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// HTTP verbs the client issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Verb {
    pub fn method(&self) -> Method {
        match self {
            Verb::Get => Method::GET,
            Verb::Post => Method::POST,
            Verb::Put => Method::PUT,
            Verb::Patch => Method::PATCH,
            Verb::Delete => Method::DELETE,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Get => "GET",
            Verb::Post => "POST",
            Verb::Put => "PUT",
            Verb::Patch => "PATCH",
            Verb::Delete => "DELETE",
        }
    }

    /// `instance` of problems raised by local failures.
    pub fn entry_point(&self) -> &'static str {
        match self {
            Verb::Get => "ApiClient/get",
            Verb::Post => "ApiClient/post",
            Verb::Put => "ApiClient/put",
            Verb::Patch => "ApiClient/patch",
            Verb::Delete => "ApiClient/delete",
        }
    }
}

/// HTTP API client with credential handling and refresh-on-unauthorized.
///
/// Safe to share behind an `Arc`. Credentials are the only state shared
/// between concurrent calls; concurrent unauthorized calls may each trigger
/// their own refresh.
pub struct ApiClient {
    host: String,
    timeout_ms: AtomicU64,
    credentials: RwLock<Credentials>,
    transport: Arc<dyn Transport>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("host", &self.host)
            .field("timeout", &self.timeout())
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// A client that builds a fresh HTTP client for every call.
    pub fn new(config: ClientConfig) -> Self {
        Self::with_transport(config, Arc::new(ReqwestTransport::per_call()))
    }

    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            host: config.host,
            timeout_ms: AtomicU64::new(config.timeout_ms),
            credentials: RwLock::new(Credentials::None),
            transport,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    // --- credential setters ---

    /// Switch to static bearer tokens.
    pub async fn set_tokens(
        &self,
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        refresh_endpoint: impl Into<String>,
        auto_refresh: bool,
        on_refreshed: Option<RefreshHook>,
    ) {
        self.set_credentials(Credentials::bearer(
            access_token,
            refresh_token,
            refresh_endpoint,
            auto_refresh,
            on_refreshed,
        ))
        .await;
    }

    /// Switch to a token provider. Clears static tokens and disables refresh.
    pub async fn set_token_provider(&self, provider: TokenProvider) {
        self.set_credentials(Credentials::Provider(provider)).await;
    }

    pub async fn set_basic_credential(&self, username: impl Into<String>, password: impl Into<String>) {
        self.set_credentials(Credentials::basic(username, password))
            .await;
    }

    /// Send `value` as the `Authorization` header verbatim.
    pub async fn set_custom_authorization_header(&self, value: impl Into<String>) {
        self.set_credentials(Credentials::custom_header(value)).await;
    }

    /// Replace the whole credential mode.
    pub async fn set_credentials(&self, credentials: Credentials) {
        let mode = credentials.mode();
        *self.credentials.write().await = credentials;
        debug!(mode = mode.label(), "credentials replaced");
    }

    pub fn set_timeout(&self, timeout_ms: u64) {
        self.timeout_ms.store(timeout_ms, Ordering::Relaxed);
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms.load(Ordering::Relaxed))
    }

    /// The stored static access token, empty outside bearer-token mode.
    pub async fn access_token(&self) -> String {
        self.credentials.read().await.access_token().to_owned()
    }

    pub async fn auth_mode(&self) -> AuthMode {
        self.credentials.read().await.mode()
    }

    // --- verbs ---

    pub async fn get<D: DecodeTarget>(
        &self,
        address: &str,
        auth: Auth,
        query: &[(&str, &str)],
    ) -> CallResult<D::Output> {
        self.execute::<D>(Verb::Get, address, query, Ok(RequestBody::Empty), auth)
            .await
    }

    pub async fn delete<D: DecodeTarget>(
        &self,
        address: &str,
        auth: Auth,
        query: &[(&str, &str)],
    ) -> CallResult<D::Output> {
        self.execute::<D>(Verb::Delete, address, query, Ok(RequestBody::Empty), auth)
            .await
    }

    /// POST `body` encoded as JSON.
    pub fn post<'a, D, B>(
        &'a self,
        address: &'a str,
        body: &B,
        auth: Auth,
    ) -> impl Future<Output = CallResult<D::Output>> + Send + 'a
    where
        D: DecodeTarget,
        B: Serialize + ?Sized,
    {
        self.execute::<D>(Verb::Post, address, &[], encode_json(body), auth)
    }

    pub fn put<'a, D, B>(
        &'a self,
        address: &'a str,
        body: &B,
        auth: Auth,
    ) -> impl Future<Output = CallResult<D::Output>> + Send + 'a
    where
        D: DecodeTarget,
        B: Serialize + ?Sized,
    {
        self.execute::<D>(Verb::Put, address, &[], encode_json(body), auth)
    }

    pub fn patch<'a, D, B>(
        &'a self,
        address: &'a str,
        body: &B,
        auth: Auth,
    ) -> impl Future<Output = CallResult<D::Output>> + Send + 'a
    where
        D: DecodeTarget,
        B: Serialize + ?Sized,
    {
        self.execute::<D>(Verb::Patch, address, &[], encode_json(body), auth)
    }

    pub async fn post_multipart<D: DecodeTarget>(
        &self,
        address: &str,
        form: MultipartForm,
        auth: Auth,
    ) -> CallResult<D::Output> {
        self.execute::<D>(Verb::Post, address, &[], Ok(RequestBody::Multipart(form)), auth)
            .await
    }

    pub async fn put_multipart<D: DecodeTarget>(
        &self,
        address: &str,
        form: MultipartForm,
        auth: Auth,
    ) -> CallResult<D::Output> {
        self.execute::<D>(Verb::Put, address, &[], Ok(RequestBody::Multipart(form)), auth)
            .await
    }

    pub async fn patch_multipart<D: DecodeTarget>(
        &self,
        address: &str,
        form: MultipartForm,
        auth: Auth,
    ) -> CallResult<D::Output> {
        self.execute::<D>(Verb::Patch, address, &[], Ok(RequestBody::Multipart(form)), auth)
            .await
    }

    // --- refresh ---

    /// Exchange the stored token pair for a new one. Returns whether it worked.
    pub async fn refresh_tokens(&self) -> bool {
        self.refresh_tokens_pair().await.is_some()
    }

    /// Like `refresh_tokens`, handing back the new pair on success.
    ///
    /// Outside static bearer mode nothing is sent and `None` is returned.
    /// On failure the stored pair is left untouched.
    pub async fn refresh_tokens_pair(&self) -> Option<TokenPair> {
        let request = self.credentials.read().await.refresh_request();
        let Some((endpoint, body)) = request else {
            debug!("no static bearer tokens, refresh skipped");
            record_refresh(false);
            return None;
        };

        // Sent without an Authorization header, so this call can never
        // itself qualify for a refresh.
        let started = Instant::now();
        let url = build_url(&self.host, &endpoint, &[]);
        let result = match encode_json(&body) {
            Ok(body) => {
                self.attempt::<Json<RefreshResponse>>(Verb::Post, &url, &endpoint, &body, &Auth::Anonymous)
                    .await
            }
            Err(e) => caught(Verb::Post, &endpoint, e),
        };
        record_call(
            Verb::Post.as_str(),
            result.outcome_label(),
            started.elapsed().as_secs_f64(),
        );

        let pair = match result {
            CallResult::Success(response) => response.into_pair(),
            CallResult::Problem(problem) => {
                warn!(
                    endpoint = %endpoint,
                    kind = problem.problem_type.as_deref().unwrap_or(""),
                    status = problem.status.unwrap_or_default(),
                    "token refresh failed"
                );
                record_refresh(false);
                return None;
            }
        };

        let (applied, hook) = {
            let mut credentials = self.credentials.write().await;
            let applied = credentials.apply_refresh(&pair);
            (applied, credentials.refresh_hook())
        };
        if !applied {
            warn!("credentials replaced during refresh, new tokens discarded");
            record_refresh(false);
            return None;
        }

        info!(endpoint = %endpoint, "token refresh succeeded");
        record_refresh(true);
        if let Some(hook) = hook {
            hook(&pair.access_token, &pair.refresh_token);
        }
        Some(pair)
    }

    // --- internals ---

    async fn execute<D: DecodeTarget>(
        &self,
        verb: Verb,
        address: &str,
        query: &[(&str, &str)],
        body: Result<RequestBody>,
        auth: Auth,
    ) -> CallResult<D::Output> {
        let started = Instant::now();
        let result = match body {
            Ok(body) => {
                let url = build_url(&self.host, address, query);
                let first = self.attempt::<D>(verb, &url, address, &body, &auth).await;
                if self.refresh_eligible(first.problem(), &auth).await {
                    debug!(method = verb.as_str(), address, "unauthorized, refreshing tokens");
                    self.refresh_tokens().await;
                    let token = self.access_token().await;
                    self.attempt::<D>(verb, &url, address, &body, &Auth::Token(token))
                        .await
                } else {
                    first
                }
            }
            Err(e) => caught(verb, address, e),
        };
        record_call(
            verb.as_str(),
            result.outcome_label(),
            started.elapsed().as_secs_f64(),
        );
        result
    }

    /// Refresh only when the caller relied on stored credentials, the
    /// server said unauthorized, and static tokens with auto-refresh are set.
    /// Takes only the problem: the payload need not be `Sync`.
    async fn refresh_eligible(&self, problem: Option<&ProblemDetails>, auth: &Auth) -> bool {
        let unauthorized = problem.is_some_and(|problem| problem.is_kind(&ErrorKind::Unauthorized));
        unauthorized
            && auth.sends_header()
            && auth.explicit_token().is_none()
            && self.credentials.read().await.refresh_armed()
    }

    /// One dispatch, with local failures folded into a problem.
    async fn attempt<D: DecodeTarget>(
        &self,
        verb: Verb,
        url: &str,
        address: &str,
        body: &RequestBody,
        auth: &Auth,
    ) -> CallResult<D::Output> {
        match self.dispatch::<D>(verb, url, body, auth).await {
            Ok(result) => result,
            Err(e) => caught(verb, address, e),
        }
    }

    async fn dispatch<D: DecodeTarget>(
        &self,
        verb: Verb,
        url: &str,
        body: &RequestBody,
        auth: &Auth,
    ) -> Result<CallResult<D::Output>> {
        // Snapshot so no lock is held while a provider or the transport runs.
        let credentials = self.credentials.read().await.clone();

        let mut headers = HeaderMap::new();
        if let Some(value) = gateway_auth::authorization_header(&credentials, auth).await? {
            headers.insert(AUTHORIZATION, value);
        }
        if matches!(body, RequestBody::Json(_)) {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
        }

        debug!(
            method = verb.as_str(),
            url,
            mode = credentials.mode().label(),
            authorized = headers.contains_key(AUTHORIZATION),
            "dispatching call"
        );

        let response = self
            .transport
            .send(HttpRequest {
                method: verb.method(),
                url: url.to_owned(),
                headers,
                body: body.clone(),
                timeout: self.timeout(),
            })
            .await?;

        let status = response.status.as_u16();
        let result = classify::<D>(response)?;
        if let CallResult::Problem(problem) = &result {
            debug!(
                method = verb.as_str(),
                url,
                status,
                kind = problem.problem_type.as_deref().unwrap_or(""),
                "call returned a problem"
            );
        }
        Ok(result)
    }
}

/// `host + address`, plus `?k1=v1&k2=v2` when there are query parameters.
/// Nothing is escaped.
pub fn build_url(host: &str, address: &str, query: &[(&str, &str)]) -> String {
    let mut url = format!("{host}{address}");
    for (i, (key, value)) in query.iter().enumerate() {
        url.push(if i == 0 { '?' } else { '&' });
        url.push_str(key);
        url.push('=');
        url.push_str(value);
    }
    url
}

fn encode_json<B: Serialize + ?Sized>(body: &B) -> Result<RequestBody> {
    serde_json::to_vec(body)
        .map(|bytes| RequestBody::Json(Bytes::from(bytes)))
        .map_err(|e| Error::Encode(e.to_string()))
}

fn caught<T>(verb: Verb, address: &str, error: Error) -> CallResult<T> {
    warn!(method = verb.as_str(), address, error = %error, "call failed locally");
    CallResult::Problem(ProblemDetails::new(
        ErrorKind::ServerUnexpectedError,
        500,
        format!("API Manager Error({address})"),
        error.to_string(),
        verb.entry_point(),
    ))
}
