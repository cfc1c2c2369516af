//! URI utilities.

use camino::Utf8Path;
use http::uri::PathAndQuery;
use http::Uri;

/// Extension trait for URIs.
pub trait UriExtension: Sized {
    /// Join a path to a URI, dropping any existing query.
    fn join<P: AsRef<str>>(self, path: P) -> Result<Uri, http::Error>;

    /// Append an already url-encoded query string to a URI.
    fn append_query(self, encoded: &str) -> Result<Uri, http::Error>;
}

impl UriExtension for Uri {
    fn join<P: AsRef<str>>(self, path: P) -> Result<Uri, http::Error> {
        let mut parts = self.into_parts();

        parts.path_and_query = match parts.path_and_query {
            Some(pq) => {
                let joined = Utf8Path::new(pq.path()).join(path.as_ref());
                Some(PathAndQuery::from_maybe_shared(joined.to_string())?)
            }
            None => None,
        };
        Ok(Uri::from_parts(parts)?)
    }

    fn append_query(self, encoded: &str) -> Result<Uri, http::Error> {
        if encoded.is_empty() {
            return Ok(self);
        }

        let mut parts = self.into_parts();
        let (path, query) = match parts.path_and_query.as_ref() {
            Some(pq) => (pq.path().to_owned(), pq.query().map(str::to_owned)),
            None => ("/".to_owned(), None),
        };

        let rendered = match query {
            Some(existing) if !existing.is_empty() => format!("{path}?{existing}&{encoded}"),
            _ => format!("{path}?{encoded}"),
        };

        parts.path_and_query = Some(PathAndQuery::from_maybe_shared(rendered)?);
        Ok(Uri::from_parts(parts)?)
    }
}
