//! HTTP middleware attaching the engine bearer token to every request.

use std::sync::{Arc, RwLock};
use std::task::{Context, Poll};
use std::time::Duration;

use http::header::AUTHORIZATION;
use http::HeaderValue;
use tower::{Layer, Service};

use crate::jwt::{unix_now, Credential, CredentialError, CredentialProvider};

/// Holds the current credential and re-issues it when it goes stale.
pub struct CredentialCache {
    provider: Arc<dyn CredentialProvider>,
    current: RwLock<Credential>,
    renewal_margin: Duration,
}

impl CredentialCache {
    /// Issue the first credential eagerly so a bad secret fails at setup time.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider cannot issue a credential.
    pub fn new(
        provider: Arc<dyn CredentialProvider>,
        renewal_margin: Duration,
    ) -> Result<Self, CredentialError> {
        let current = RwLock::new(provider.issue()?);
        Ok(Self { provider, current, renewal_margin })
    }

    /// `Authorization` header value for an outbound request, renewed first if
    /// the cached token is close to expiry or its `iat` has aged out.
    ///
    /// # Errors
    ///
    /// Returns an error if the clock is unreadable or the provider cannot
    /// issue a replacement. The stale token is never served in that case.
    pub fn authorization(&self) -> Result<HeaderValue, CredentialError> {
        let now = unix_now()?;
        {
            let current = self.current.read().unwrap_or_else(|e| e.into_inner());
            if !current.needs_renewal(now, self.renewal_margin) {
                return Ok(current.header().clone());
            }
        }

        let mut current = self.current.write().unwrap_or_else(|e| e.into_inner());
        // another request may have renewed while we waited for the lock
        if current.needs_renewal(now, self.renewal_margin) {
            let fresh = self.provider.issue().inspect_err(|e| {
                tracing::error!(error = %e, "Failed to renew engine credential");
            })?;
            tracing::debug!(issued_at = fresh.issued_at(), "Renewed engine credential");
            *current = fresh;
        }
        Ok(current.header().clone())
    }

    /// Header of the cached credential, without renewal.
    pub fn header(&self) -> HeaderValue {
        self.current.read().unwrap_or_else(|e| e.into_inner()).header().clone()
    }
}

/// Layer adding `Authorization: Bearer <jwt>` to each HTTP request.
///
/// The layer renews the token when it can. A failed renewal leaves the cached
/// header in place here; callers surface the failure through
/// [`CredentialCache::authorization`] before sending.
#[derive(Clone)]
pub struct AuthClientLayer {
    credentials: Arc<CredentialCache>,
}

impl AuthClientLayer {
    /// Create a new layer around a credential cache.
    pub const fn new(credentials: Arc<CredentialCache>) -> Self {
        Self { credentials }
    }
}

impl<S> Layer<S> for AuthClientLayer {
    type Service = AuthClientService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthClientService { inner, credentials: Arc::clone(&self.credentials) }
    }
}

/// Service created by [`AuthClientLayer`].
#[derive(Clone)]
pub struct AuthClientService<S> {
    inner: S,
    credentials: Arc<CredentialCache>,
}

impl<S, B> Service<http::Request<B>> for AuthClientService<S>
where
    S: Service<http::Request<B>>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: http::Request<B>) -> Self::Future {
        let header =
            self.credentials.authorization().unwrap_or_else(|_| self.credentials.header());
        request.headers_mut().insert(AUTHORIZATION, header);
        self.inner.call(request)
    }
}
