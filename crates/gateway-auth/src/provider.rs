//! Caller-supplied token providers
//!
//! A provider mints a bearer token on demand, replacing a client-held static
//! token. It is invoked once per authorized call, so the caller owns token
//! freshness and refresh-on-401 stays disabled while a provider is set.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::{Error, Result};

/// Boxed future returned by async providers.
pub type ProviderFuture = Pin<Box<dyn Future<Output = Result<String>> + Send>>;

type SyncProviderFn = dyn Fn() -> Result<String> + Send + Sync;
type AsyncProviderFn = dyn Fn() -> ProviderFuture + Send + Sync;

/// A function that yields the current bearer token.
///
/// Cloning is cheap (the function is shared behind an `Arc`), which lets the
/// client snapshot its credentials without holding a lock across the call.
#[derive(Clone)]
pub enum TokenProvider {
    Sync(Arc<SyncProviderFn>),
    Async(Arc<AsyncProviderFn>),
}

impl TokenProvider {
    /// Wrap a synchronous provider. Its error is surfaced through `Display`.
    pub fn from_fn<F, E>(f: F) -> Self
    where
        F: Fn() -> std::result::Result<String, E> + Send + Sync + 'static,
        E: fmt::Display + 'static,
    {
        Self::Sync(Arc::new(move || {
            f().map_err(|e| Error::TokenProvider(e.to_string()))
        }))
    }

    /// Wrap an async provider, e.g. one that fetches from a secrets service.
    pub fn from_async_fn<F, Fut, E>(f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<String, E>> + Send + 'static,
        E: fmt::Display + 'static,
    {
        Self::Async(Arc::new(move || -> ProviderFuture {
            let fut = f();
            Box::pin(async move { fut.await.map_err(|e| Error::TokenProvider(e.to_string())) })
        }))
    }

    /// Invoke the provider. Async providers may suspend on external I/O.
    pub async fn token(&self) -> Result<String> {
        match self {
            TokenProvider::Sync(f) => f(),
            TokenProvider::Async(f) => f().await,
        }
    }

    pub fn is_async(&self) -> bool {
        matches!(self, TokenProvider::Async(_))
    }
}

impl fmt::Debug for TokenProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenProvider::Sync(_) => f.write_str("TokenProvider::Sync"),
            TokenProvider::Async(_) => f.write_str("TokenProvider::Async"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn sync_provider_is_invoked_per_call() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let provider = TokenProvider::from_fn(move || {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            Ok::<_, Error>(format!("tok_{n}"))
        });

        assert_eq!(provider.token().await.unwrap(), "tok_0");
        assert_eq!(provider.token().await.unwrap(), "tok_1");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(!provider.is_async());
    }

    #[tokio::test]
    async fn async_provider_resolves() {
        let provider = TokenProvider::from_async_fn(|| async {
            tokio::time::sleep(std::time::Duration::from_millis(1)).await;
            Ok::<_, Error>("from-vault".to_string())
        });
        assert!(provider.is_async());
        assert_eq!(provider.token().await.unwrap(), "from-vault");
    }

    #[tokio::test]
    async fn provider_errors_map_to_token_provider_variant() {
        let provider = TokenProvider::from_fn(|| Err::<String, _>("vault sealed"));
        let err = provider.token().await.unwrap_err();
        assert!(matches!(err, Error::TokenProvider(ref msg) if msg == "vault sealed"));
        assert_eq!(err.to_string(), "token provider failed: vault sealed");
    }

    #[test]
    fn debug_names_the_variant() {
        let provider = TokenProvider::from_fn(|| Ok::<_, Error>(String::new()));
        assert_eq!(format!("{provider:?}"), "TokenProvider::Sync");
    }
}
