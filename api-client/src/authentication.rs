//! Authentication for API clients.
//!
//! The `Authentication` trait is used to authenticate with an API queried via the `ApiClient`.
//!
//! Two implementations are provided:
//! - `BearerAuth` for Bearer token authentication
//! - `()` for no authentication

use http::HeaderValue;
use secret::Secret;

/// Attach credentials to an outgoing request.
pub trait Authentication: Clone {
    /// Called by the `ApiClient` on every request before it is sent.
    fn authenticate<B>(&self, req: http::Request<B>) -> http::Request<B>;
}

/// Authentication with a bearer token, often used with an API key.
///
/// The token is stored as a [Secret] to prevent it from being logged.
///
/// # Example
/// ```rust
/// use api_client::BearerAuth;
///
/// let auth = BearerAuth::new("my-secret");
/// let header = auth.header_value().unwrap();
///
/// assert_eq!(header.to_str().unwrap(), "Bearer my-secret");
/// ```
#[derive(Debug, Clone)]
pub struct BearerAuth(Secret);

impl BearerAuth {
    /// Create a new Bearer authentication with a given key.
    pub fn new<K: Into<Secret>>(key: K) -> Self {
        BearerAuth(key.into())
    }

    /// Get the header value for the Bearer token, if the token is
    /// representable as a header.
    pub fn header_value(&self) -> Option<HeaderValue> {
        self.0.bearer().ok()
    }
}

impl Authentication for BearerAuth {
    fn authenticate<B>(&self, mut req: http::Request<B>) -> http::Request<B> {
        if req.headers().contains_key(http::header::AUTHORIZATION) {
            tracing::warn!("{} header already set", http::header::AUTHORIZATION);
            return req;
        }

        match self.header_value() {
            Some(value) => {
                req.headers_mut().insert(http::header::AUTHORIZATION, value);
            }
            None => tracing::error!("Bearer token is not a valid header value, sending without it"),
        }
        req
    }
}

impl Authentication for () {
    fn authenticate<B>(&self, req: http::Request<B>) -> http::Request<B> {
        req
    }
}
