//! Credentials which must never show up in logs or debug output.

use std::{borrow::Cow, env::VarError, fmt, ops::Deref};

use http::{header::InvalidHeaderValue, HeaderValue};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use zeroize::Zeroize;

/// A credential was expected in the environment but was not usable.
#[derive(Debug, Error)]
pub enum MissingSecret {
    /// The variable was unset or empty.
    #[error("{0} is not set")]
    Unset(String),

    /// The variable was set, but not to valid unicode.
    #[error("{0} is not valid unicode")]
    NotUnicode(String),
}

/// An API token for a service. Generally any semi-secret item.
///
/// This wrapper keeps the token out of debug reprs, and zeroes owned
/// values on drop.
///
/// Use [Secret::revealed] to get the underlying value.
#[derive(Clone, Deserialize, Serialize)]
#[serde(from = "String")]
pub struct Secret(Cow<'static, str>);

impl Secret {
    /// Read a secret from the environment variable `var`.
    ///
    /// An empty variable is treated the same as an unset one.
    pub fn from_env(var: &str) -> Result<Self, MissingSecret> {
        match std::env::var(var) {
            Ok(value) if !value.trim().is_empty() => Ok(Secret(value.into())),
            Ok(_) | Err(VarError::NotPresent) => Err(MissingSecret::Unset(var.to_owned())),
            Err(VarError::NotUnicode(_)) => Err(MissingSecret::NotUnicode(var.to_owned())),
        }
    }

    /// Expose the underlying value of this secret
    pub fn revealed(&self) -> &str {
        self.0.deref()
    }

    /// True when the secret holds no usable characters.
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Render the secret as a `Bearer` authorization header value.
    pub fn bearer(&self) -> Result<HeaderValue, InvalidHeaderValue> {
        let mut header = HeaderValue::try_from(format!("Bearer {}", self.revealed()))?;
        header.set_sensitive(true);
        Ok(header)
    }
}

impl Drop for Secret {
    fn drop(&mut self) {
        if let Cow::Owned(ref mut s) = self.0 {
            s.zeroize()
        }
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(****)")
    }
}

impl From<Cow<'static, str>> for Secret {
    fn from(inner: Cow<'static, str>) -> Self {
        Secret(inner)
    }
}

impl From<String> for Secret {
    fn from(value: String) -> Self {
        Secret(value.into())
    }
}

impl From<&'static str> for Secret {
    fn from(value: &'static str) -> Self {
        Secret(value.into())
    }
}
