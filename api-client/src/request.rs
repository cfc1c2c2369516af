use http::{Method, Uri};
use serde::Serialize;

use crate::error::Error;
use crate::response::Response;
use crate::uri::UriExtension as _;
use crate::{ApiClient, Authentication};

/// Builder for a single request against an [`ApiClient`].
///
/// URI problems are deferred until the request is sent, so endpoint
/// construction stays infallible for callers.
#[derive(Debug)]
pub struct RequestBuilder<A> {
    client: ApiClient<A>,
    method: Method,
    uri: Result<Uri, Error>,
}

impl<A> RequestBuilder<A> {
    pub(crate) fn new(client: ApiClient<A>, uri: Result<Uri, http::Error>, method: Method) -> Self {
        Self {
            client,
            method,
            uri: uri.map_err(Error::from),
        }
    }

    /// Append url-encoded query parameters to the request URI.
    ///
    /// `None` fields are skipped by serde, so optional parameters are omitted
    /// entirely instead of being sent empty.
    pub fn query<Q: Serialize + ?Sized>(mut self, query: &Q) -> Self {
        self.uri = self.uri.and_then(|uri| {
            let encoded = serde_urlencoded::to_string(query)?;
            Ok(uri.append_query(&encoded)?)
        });
        self
    }

    /// The URI this request will be sent to.
    pub fn uri(&self) -> Option<&Uri> {
        self.uri.as_ref().ok()
    }

    /// Build the underlying HTTP request.
    pub fn build(self) -> Result<http::Request<hyperdriver::Body>, Error> {
        let uri = self.uri?;
        Ok(http::Request::builder()
            .method(self.method)
            .uri(uri)
            .body(hyperdriver::Body::empty())?)
    }

    /// Send the request, returning the response regardless of its status.
    pub async fn send(self) -> Result<Response, Error>
    where
        A: Authentication,
    {
        let client = self.client.clone();
        let req = self.build()?;
        Ok(client.execute(req).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BearerAuth;

    #[derive(Serialize)]
    struct Window<'a> {
        page: usize,
        #[serde(skip_serializing_if = "Option::is_none")]
        since: Option<&'a str>,
    }

    fn client() -> ApiClient<BearerAuth> {
        ApiClient::with_service(
            "https://api.example.com/".parse().unwrap(),
            BearerAuth::new("token"),
            crate::mock::MockService::new(),
        )
    }

    #[test]
    fn query_omits_absent_fields() {
        let builder = client().get("orgs/acme/repos").query(&Window {
            page: 2,
            since: None,
        });
        assert_eq!(
            builder.uri().unwrap().to_string(),
            "https://api.example.com/orgs/acme/repos?page=2"
        );
    }

    #[test]
    fn query_encodes_timestamps() {
        let builder = client().get("repos/acme/widget/commits").query(&Window {
            page: 1,
            since: Some("2023-01-01T00:00:00Z"),
        });
        assert_eq!(
            builder.uri().unwrap().to_string(),
            "https://api.example.com/repos/acme/widget/commits?page=1&since=2023-01-01T00%3A00%3A00Z"
        );
    }

    #[test]
    fn invalid_endpoint_fails_at_build() {
        let builder = client().get("orgs/not valid/repos");
        assert!(builder.uri().is_none());
        assert!(matches!(builder.build(), Err(Error::Build(_))));
    }
}
