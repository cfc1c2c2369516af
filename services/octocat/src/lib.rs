//! Rate limited client for the organization listing endpoints of the Github API.
//!
//! Every request made by clients from the same [`GithubTransport`] goes
//! through one shared [`RateLimiter`], whatever token it carries.

use api_client::{ApiClient, BearerAuth, RateLimitLayer, RequestBuilder};

use http::{header, HeaderName, HeaderValue};
use hyperdriver::client::conn::transport::tcp::TcpTransportConfig;
use hyperdriver::client::SharedClientService;
use hyperdriver::service::SharedService;
use hyperdriver::{Body, Client};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tower_http::set_header::SetRequestHeaderLayer;

pub mod models;

pub use api_client::{MissingSecret, Page, RateLimit, RateLimiter, Secret};

pub use crate::models::{Account, Commit, Member, Repository};

const CONNECT_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);
const GITHUB_ACCEPT: &str = "application/vnd.github+json";
const GITHUB_API_VERSION: &str = "2022-11-28";
const GITHUB_API_VERSION_HEADER: &str = "x-github-api-version";
const GITHUB_BASE: &str = "https://api.github.com/";
const GITHUB_USER_AGENT: &str = "github-workhours/0.1.0";

/// Text GitHub puts in the body of a commit listing for a repository with no commits.
pub const EMPTY_REPOSITORY: &str = "Git Repository is empty";

/// Path segment characters which are sent as-is.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'.').remove(b'_');

/// Errors that can occur when using the Github client.
#[derive(Debug, Error)]
pub enum Error {
    /// No token was provided.
    #[error("GitHub token is required. Set GITHUB_TOKEN environment variable.")]
    MissingToken,

    /// An error that occurs when building or sending a request.
    #[error("Sending request: {0}")]
    Request(#[from] api_client::Error),

    /// A response not in the 200-299 range.
    #[error(transparent)]
    Response(#[from] ResponseError),

    /// An error that occurs when receiving or decoding a response body.
    #[error("Receiving body: {0}")]
    Body(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
    /// The commit listing failed because the repository has no commits yet.
    pub fn is_empty_repository(&self) -> bool {
        self.to_string().contains(EMPTY_REPOSITORY)
    }
}

/// An error that occurs when a response is not successful.
#[derive(Debug, Clone, Error)]
#[error("GitHub request failed: {} {}\n{body}", status.as_u16(), status.canonical_reason().unwrap_or("Unknown"))]
pub struct ResponseError {
    status: http::StatusCode,
    body: String,
}

impl From<api_client::HttpResponseError> for ResponseError {
    fn from(error: api_client::HttpResponseError) -> Self {
        Self {
            status: error.status,
            body: error.message,
        }
    }
}

impl ResponseError {
    /// HTTP status of the failed response.
    pub fn status(&self) -> http::StatusCode {
        self.status
    }

    /// Body text of the failed response.
    pub fn body(&self) -> &str {
        &self.body
    }
}

/// Optional time bounds for a commit listing, as ISO-8601 strings.
///
/// Absent bounds are left out of the query entirely.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CommitWindow {
    /// Only commits after this date.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub since: Option<String>,

    /// Only commits before this date.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub until: Option<String>,
}

/// The shared, rate limited connection to the Github API.
///
/// Clients created from one transport (and its clones) share its rate limiter.
#[derive(Debug, Clone)]
pub struct GithubTransport {
    service: SharedClientService<Body, Body>,
    limiter: RateLimiter,
}

impl GithubTransport {
    /// Connect to api.github.com over HTTPS.
    pub fn new(limiter: RateLimiter) -> Self {
        let mut tcp = TcpTransportConfig::default();
        tcp.connect_timeout = Some(CONNECT_TIMEOUT);

        let client = Client::builder()
            .with_tcp(tcp)
            .with_auto_http()
            .build_service();

        Self::with_service(client, limiter)
    }

    /// Send requests through `inner` instead of the network.
    pub fn with_service<S>(inner: S, limiter: RateLimiter) -> Self
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
            .layer(SetRequestHeaderLayer::if_not_present(
                header::ACCEPT,
                HeaderValue::from_static(GITHUB_ACCEPT),
            ))
            .layer(SetRequestHeaderLayer::if_not_present(
                HeaderName::from_static(GITHUB_API_VERSION_HEADER),
                HeaderValue::from_static(GITHUB_API_VERSION),
            ))
            .layer(SetRequestHeaderLayer::if_not_present(
                header::USER_AGENT,
                HeaderValue::from_static(GITHUB_USER_AGENT),
            ))
            .layer(RateLimitLayer::new(limiter.clone()))
            .service(inner);

        Self { service, limiter }
    }

    /// The rate limiter shared by every client of this transport.
    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// A client authenticating with `token`.
    ///
    /// Fails without sending anything when the token is blank.
    pub fn client(&self, token: Secret) -> Result<GithubClient, Error> {
        if token.is_empty() {
            return Err(Error::MissingToken);
        }

        let base = GITHUB_BASE
            .parse()
            .map_err(|err: http::uri::InvalidUri| api_client::Error::Build(err.into()))?;
        Ok(GithubClient {
            client: ApiClient::with_service(base, BearerAuth::new(token), self.service.clone()),
        })
    }
}

/// A Github client for one token.
#[derive(Debug, Clone)]
pub struct GithubClient {
    client: ApiClient<BearerAuth>,
}

impl GithubClient {
    /// List one page of repositories owned by an organization.
    #[tracing::instrument(skip(self))]
    pub async fn list_org_repos(&self, org: &str, page: Page) -> Result<Vec<Repository>, Error> {
        let endpoint = format!("orgs/{}/repos", segment(org));
        self.fetch_page(self.client.get(&endpoint).query(&page)).await
    }

    /// List one page of an organization's members.
    #[tracing::instrument(skip(self))]
    pub async fn list_org_members(&self, org: &str, page: Page) -> Result<Vec<Member>, Error> {
        let endpoint = format!("orgs/{}/members", segment(org));
        self.fetch_page(self.client.get(&endpoint).query(&page)).await
    }

    /// List one page of a repository's commits, optionally bounded in time.
    #[tracing::instrument(skip(self))]
    pub async fn list_repo_commits(
        &self,
        owner: &str,
        repo: &str,
        window: &CommitWindow,
        page: Page,
    ) -> Result<Vec<Commit>, Error> {
        let endpoint = format!("repos/{}/{}/commits", segment(owner), segment(repo));
        self.fetch_page(self.client.get(&endpoint).query(&page).query(window))
            .await
    }

    /// List every repository owned by an organization.
    pub async fn org_repos(&self, org: &str) -> Result<Vec<Repository>, Error> {
        api_client::fetch_all(api_client::MAX_PER_PAGE, |page| {
            self.list_org_repos(org, page)
        })
        .await
    }

    /// List every member of an organization.
    pub async fn org_members(&self, org: &str) -> Result<Vec<Member>, Error> {
        api_client::fetch_all(api_client::MAX_PER_PAGE, |page| {
            self.list_org_members(org, page)
        })
        .await
    }

    /// List every commit in a repository within `window`.
    pub async fn repo_commits(
        &self,
        owner: &str,
        repo: &str,
        window: &CommitWindow,
    ) -> Result<Vec<Commit>, Error> {
        api_client::fetch_all(api_client::MAX_PER_PAGE, |page| {
            self.list_repo_commits(owner, repo, window, page)
        })
        .await
    }

    async fn fetch_page<T>(&self, request: RequestBuilder<BearerAuth>) -> Result<Vec<T>, Error>
    where
        T: DeserializeOwned,
    {
        let response = match request.send().await?.error_for_status().await {
            Ok(response) => response,
            Err(error) => {
                let error = ResponseError::from(error);
                tracing::debug!(status = %error.status, "Github request failed");
                return Err(Error::Response(error));
            }
        };

        let items: Option<Vec<T>> = response.json().await.map_err(Error::Body)?;
        Ok(items.unwrap_or_default())
    }
}

fn segment(value: &str) -> String {
    utf8_percent_encode(value, SEGMENT).to_string()
}
