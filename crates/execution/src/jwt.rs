//! JWT credentials for Engine API authentication.
//!
//! Issues HS256 tokens carrying `iat` and `exp` claims, signed with the secret
//! shared with the execution engine.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use alloy_rpc_types_engine::{Claims, JwtSecret};
use http::HeaderValue;

/// Default lifetime of an issued token.
pub const DEFAULT_TOKEN_VALIDITY: Duration = Duration::from_secs(3600);

/// Oldest `iat` still served. Engines refuse tokens whose `iat` is more than
/// 60 seconds away from their clock.
pub const MAX_TOKEN_AGE: Duration = Duration::from_secs(30);

/// Errors raised while issuing engine credentials.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    /// Secret is not 32 bytes of hex.
    #[error("invalid JWT secret: {0}")]
    InvalidSecret(String),

    /// Secret file could not be read.
    #[error("failed to read JWT secret from {path}: {source}")]
    Io {
        /// Secret file path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Token signing failed.
    #[error("failed to sign JWT: {0}")]
    Signing(String),

    /// System clock reads before the unix epoch.
    #[error("system clock is before the unix epoch")]
    Clock,
}

/// A signed bearer token together with its validity window.
#[derive(Clone)]
pub struct Credential {
    token: String,
    header: HeaderValue,
    issued_at: u64,
    expires_at: u64,
}

impl Credential {
    /// The encoded token.
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Ready-made `Authorization` header value (`Bearer <token>`).
    #[must_use]
    pub fn header(&self) -> &HeaderValue {
        &self.header
    }

    /// Issued-at, unix seconds.
    #[must_use]
    pub const fn issued_at(&self) -> u64 {
        self.issued_at
    }

    /// Expiry, unix seconds.
    #[must_use]
    pub const fn expires_at(&self) -> u64 {
        self.expires_at
    }

    /// Whether the token should be replaced at `now`.
    ///
    /// True once `now` is within `margin` of expiry, or once `iat` is
    /// [`MAX_TOKEN_AGE`] or more away from `now` in either direction.
    #[must_use]
    pub fn needs_renewal(&self, now: u64, margin: Duration) -> bool {
        now.saturating_add(margin.as_secs()) >= self.expires_at
            || now.abs_diff(self.issued_at) >= MAX_TOKEN_AGE.as_secs()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("issued_at", &self.issued_at)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

/// Source of engine credentials.
pub trait CredentialProvider: Send + Sync {
    /// Issue a fresh credential valid from now.
    ///
    /// # Errors
    ///
    /// Returns an error if the token cannot be signed.
    fn issue(&self) -> Result<Credential, CredentialError>;
}

/// Issues HS256 JWTs from a shared 32-byte secret.
pub struct JwtCredentialProvider {
    secret: JwtSecret,
    validity: Duration,
}

impl JwtCredentialProvider {
    /// Create a provider from an already-decoded secret.
    #[must_use]
    pub fn new(secret: JwtSecret) -> Self {
        Self { secret, validity: DEFAULT_TOKEN_VALIDITY }
    }

    /// Create a provider from a hex secret (with or without `0x` prefix).
    ///
    /// # Errors
    ///
    /// Returns an error if the secret is not valid hex or not 32 bytes.
    pub fn from_hex(secret_hex: &str) -> Result<Self, CredentialError> {
        let secret = JwtSecret::from_hex(secret_hex.trim())
            .map_err(|e| CredentialError::InvalidSecret(e.to_string()))?;
        Ok(Self::new(secret))
    }

    /// Read a hex secret from a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or holds an invalid secret.
    pub fn from_file(path: &Path) -> Result<Self, CredentialError> {
        let secret_hex = std::fs::read_to_string(path)
            .map_err(|source| CredentialError::Io { path: path.to_path_buf(), source })?;
        Self::from_hex(&secret_hex)
    }

    /// Override the token lifetime.
    #[must_use]
    pub const fn with_validity(mut self, validity: Duration) -> Self {
        self.validity = validity;
        self
    }

    /// Issue a token as if the current time were `now` (unix seconds).
    ///
    /// # Errors
    ///
    /// Returns an error if signing fails.
    pub fn issue_at(&self, now: u64) -> Result<Credential, CredentialError> {
        let expires_at = now.saturating_add(self.validity.as_secs());
        let claims = Claims { iat: now, exp: Some(expires_at) };

        let token = self.secret.encode(&claims).map_err(|e| CredentialError::Signing(e.to_string()))?;
        let header = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|e| CredentialError::Signing(e.to_string()))?;

        Ok(Credential { token, header, issued_at: now, expires_at })
    }
}

impl CredentialProvider for JwtCredentialProvider {
    fn issue(&self) -> Result<Credential, CredentialError> {
        self.issue_at(unix_now()?)
    }
}

impl fmt::Debug for JwtCredentialProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtCredentialProvider").field("validity", &self.validity).finish_non_exhaustive()
    }
}

/// Current unix time in seconds.
pub(crate) fn unix_now() -> Result<u64, CredentialError> {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).map_err(|_| CredentialError::Clock)
}
