//! A small HTTP API client built on `hyperdriver` and `tower`.
//!
//! Service crates wrap an [`ApiClient`] with their own endpoint methods and
//! models. Cross-cutting policy (rate limiting, default headers) lives in the
//! `tower` service stack handed to [`ApiClient::with_service`].

use std::sync::Arc;

use http::Method;
use http::Uri;
use hyperdriver::service::SharedService;
use tower::ServiceExt;

mod authentication;
pub mod error;
mod paginate;
mod ratelimit;
pub mod request;
pub mod response;
pub mod uri;

pub use secret::{MissingSecret, Secret};

pub use self::authentication::{Authentication, BearerAuth};
pub use self::error::{Error, HttpResponseError};
pub use self::paginate::{fetch_all, pages, Page, MAX_PER_PAGE};
pub use self::ratelimit::{Permit, RateLimit, RateLimitLayer, RateLimitService, RateLimiter};
pub use self::request::RequestBuilder;
pub use self::response::Response;
use self::uri::UriExtension as _;

/// A client for accessing APIs over HTTP / HTTPS
///
/// Useful inner object to wrap for individual API clients.
#[derive(Debug, Clone)]
pub struct ApiClient<A> {
    base: Uri,
    inner: hyperdriver::client::SharedClientService<hyperdriver::Body, hyperdriver::Body>,
    authentication: Arc<A>,
}

impl<A> ApiClient<A>
where
    A: Authentication + Send + Sync + 'static,
{
    /// Create a client which sends requests through `inner`.
    ///
    /// `inner` is usually a `hyperdriver` client with extra layers applied,
    /// or a [`mock::MockService`] in tests.
    pub fn with_service<S>(base: Uri, authentication: A, inner: S) -> Self
    where
        S: tower::Service<
                http::Request<hyperdriver::Body>,
                Response = http::Response<hyperdriver::Body>,
                Error = hyperdriver::client::Error,
            > + Clone
            + Send
            + Sync
            + 'static,
        S::Future: Send + 'static,
    {
        let service = tower::ServiceBuilder::new()
            .layer(SharedService::layer())
            .service(inner);

        ApiClient {
            base,
            inner: service,
            authentication: Arc::new(authentication),
        }
    }
}

impl<A> ApiClient<A>
where
    A: Authentication,
{
    /// The base URI endpoints are joined onto.
    pub fn base(&self) -> &Uri {
        &self.base
    }

    /// Start a GET request against `endpoint`, relative to the base URI.
    pub fn get(&self, endpoint: &str) -> RequestBuilder<A> {
        let url = self.base.clone().join(endpoint);
        RequestBuilder::new(self.clone(), url, Method::GET)
    }

    /// Authenticate and send a request, returning the response whatever its status.
    pub async fn execute(
        &self,
        req: http::Request<hyperdriver::Body>,
    ) -> Result<response::Response, hyperdriver::client::Error> {
        let req = self.authentication.authenticate(req);
        let parts = request_parts(&req);

        let response = self.inner.clone().oneshot(req).await?;
        Ok(response::Response::new(parts, response))
    }
}

fn request_parts<B>(req: &http::Request<B>) -> http::request::Parts {
    let mut template = http::Request::new(());
    *template.method_mut() = req.method().clone();
    *template.uri_mut() = req.uri().clone();
    *template.headers_mut() = req.headers().clone();
    template.into_parts().0
}

/// A canned-response transport for tests.
pub mod mock {
    use std::collections::HashMap;
    use std::sync::Arc;

    use bytes::Bytes;
    use http::response;
    use parking_lot::Mutex;

    /// A response returned by [`MockService`].
    #[derive(Debug, Clone)]
    pub struct MockResponse {
        status: http::StatusCode,
        headers: http::HeaderMap,
        body: Vec<u8>,
    }

    impl MockResponse {
        /// Create a canned response.
        pub fn new(status: http::StatusCode, headers: http::HeaderMap, body: Vec<u8>) -> Self {
            Self {
                status,
                headers,
                body,
            }
        }
    }

    /// A request seen by [`MockService`].
    #[derive(Debug, Clone)]
    pub struct MockRequest {
        /// Full URI of the request.
        pub uri: http::Uri,

        /// Headers as sent.
        pub headers: http::HeaderMap,
    }

    /// Serves canned responses keyed by path and query.
    ///
    /// A response registered for `/a?page=1` only answers that exact query;
    /// one registered for `/a` answers any query on that path. Anything else
    /// gets a 404. Clones share the request log.
    #[derive(Debug, Default, Clone)]
    pub struct MockService {
        responses: HashMap<String, MockResponse>,
        requests: Arc<Mutex<Vec<MockRequest>>>,
    }

    impl MockService {
        /// Create an empty mock.
        pub fn new() -> Self {
            Self::default()
        }

        /// Register a response for a path, optionally including a query string.
        pub fn add(
            &mut self,
            path: &str,
            status: http::StatusCode,
            headers: http::HeaderMap,
            body: Vec<u8>,
        ) {
            let response = MockResponse::new(status, headers, body);
            self.responses.insert(path.to_owned(), response);
        }

        /// Register a `200 OK` JSON response.
        pub fn add_json(&mut self, path: &str, body: &serde_json::Value) {
            let mut headers = http::HeaderMap::new();
            headers.insert(
                http::header::CONTENT_TYPE,
                http::HeaderValue::from_static("application/json"),
            );
            self.add(path, http::StatusCode::OK, headers, body.to_string().into_bytes());
        }

        /// All requests seen so far, in order.
        pub fn requests(&self) -> Vec<MockRequest> {
            self.requests.lock().clone()
        }

        fn lookup(&self, uri: &http::Uri) -> Option<&MockResponse> {
            let exact = uri.path_and_query().map(|pq| pq.as_str());
            exact
                .and_then(|key| self.responses.get(key))
                .or_else(|| self.responses.get(uri.path()))
        }
    }

    impl tower::Service<http::Request<hyperdriver::Body>> for MockService {
        type Response = http::Response<hyperdriver::Body>;
        type Error = hyperdriver::client::Error;
        type Future = std::future::Ready<Result<Self::Response, Self::Error>>;

        fn poll_ready(
            &mut self,
            _cx: &mut std::task::Context<'_>,
        ) -> std::task::Poll<Result<(), Self::Error>> {
            std::task::Poll::Ready(Ok(()))
        }

        fn call(&mut self, req: http::Request<hyperdriver::Body>) -> Self::Future {
            self.requests.lock().push(MockRequest {
                uri: req.uri().clone(),
                headers: req.headers().clone(),
            });

            let not_found = MockResponse::new(
                http::StatusCode::NOT_FOUND,
                http::HeaderMap::new(),
                br#"{"message":"Not Found"}"#.to_vec(),
            );
            let response = self.lookup(req.uri()).unwrap_or(&not_found);

            let mut builder = response::Builder::new()
                .status(response.status)
                .version(http::Version::HTTP_11);

            for (key, value) in response.headers.iter() {
                builder = builder.header(key, value);
            }

            let response = builder
                .body(hyperdriver::Body::from(Bytes::from(response.body.clone())))
                .expect("canned responses are valid");

            std::future::ready(Ok(response))
        }
    }
}
