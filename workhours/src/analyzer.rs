//! Runs analyses against GitHub, caching commit listings between runs.

use chrono::{Local, TimeZone};
use octocat::{Commit, CommitWindow, GithubClient, GithubTransport, RateLimiter, Secret};
use resultcache::{cache_key, Cache, CacheConfig};
use tokio::sync::Mutex;

use crate::aggregate::Aggregator;
use crate::config::{AnalysisRequest, GITHUB_TOKEN_ENV};
use crate::error::AnalysisError;
use crate::report::AnalysisReport;

/// Namespace for cached commit listings.
const COMMITS_NAMESPACE: &str = "commits";

/// Shared state for analyses: the GitHub transport with its rate limiter,
/// a default token, and the commit cache.
///
/// Concurrent analyses on one analyzer share the limiter and the cache. The
/// cache is built on first use and released by [`Analyzer::shutdown`].
#[derive(Debug)]
pub struct Analyzer<Tz = Local> {
    transport: GithubTransport,
    credential: Option<Secret>,
    cache_config: CacheConfig,
    cache: Mutex<Option<Cache>>,
    timezone: Tz,
}

impl Analyzer<Local> {
    /// Create an analyzer which buckets commits in the host's local time.
    pub fn new(transport: GithubTransport, cache_config: CacheConfig) -> Self {
        Self {
            transport,
            credential: None,
            cache_config,
            cache: Mutex::new(None),
            timezone: Local,
        }
    }

    /// Configure everything from the environment: the default token from
    /// `GITHUB_TOKEN` and the cache from `REDIS_URL`.
    pub fn from_env() -> Self {
        let credential = Secret::from_env(GITHUB_TOKEN_ENV).ok();
        let analyzer = Self::new(
            GithubTransport::new(RateLimiter::github()),
            CacheConfig::from_env(),
        );

        match credential {
            Some(credential) => analyzer.with_credential(credential),
            None => analyzer,
        }
    }
}

impl<Tz> Analyzer<Tz>
where
    Tz: TimeZone,
{
    /// Token used by requests which do not carry their own.
    pub fn with_credential(mut self, credential: Secret) -> Self {
        self.credential = Some(credential);
        self
    }

    /// Use `cache` instead of building one from configuration.
    pub fn with_cache(mut self, cache: Cache) -> Self {
        self.cache = Mutex::new(Some(cache));
        self
    }

    /// Bucket commits by wall-clock time in `timezone`.
    pub fn with_timezone<T: TimeZone>(self, timezone: T) -> Analyzer<T> {
        Analyzer {
            transport: self.transport,
            credential: self.credential,
            cache_config: self.cache_config,
            cache: self.cache,
            timezone,
        }
    }

    /// The transport shared by every analysis.
    pub fn transport(&self) -> &GithubTransport {
        &self.transport
    }

    async fn cache(&self) -> Cache {
        let mut slot = self.cache.lock().await;
        if let Some(cache) = &*slot {
            return cache.clone();
        }

        let cache = self.cache_config.build().await;
        tracing::debug!(backend = cache.name(), "Created commit cache");
        *slot = Some(cache.clone());
        cache
    }

    fn client(&self, credential: Option<Secret>) -> Result<GithubClient, AnalysisError> {
        let credential = credential
            .filter(|secret| !secret.is_empty())
            .or_else(|| self.credential.clone().filter(|secret| !secret.is_empty()))
            .ok_or(AnalysisError::MissingCredential)?;
        Ok(self.transport.client(credential)?)
    }

    /// Count after-hours commits by every member of an organization.
    ///
    /// Repositories are processed one after another. A repository with no
    /// commits contributes nothing; any other failure aborts the run.
    #[tracing::instrument(skip_all, fields(org = %request.organization))]
    pub async fn analyze(&self, request: AnalysisRequest) -> Result<AnalysisReport, AnalysisError> {
        let AnalysisRequest {
            organization,
            since,
            until,
            credential,
        } = request;

        if organization.is_empty() {
            return Err(AnalysisError::MissingOrganization);
        }
        let client = self.client(credential)?;
        let cache = self.cache().await;

        let members = client.org_members(&organization).await?;
        let repos = client.org_repos(&organization).await?;
        tracing::debug!(
            members = members.len(),
            repos = repos.len(),
            "Listed organization"
        );

        let window = CommitWindow {
            since: since.clone().filter(|bound| !bound.is_empty()),
            until: until.clone().filter(|bound| !bound.is_empty()),
        };
        let mut aggregator = Aggregator::new(
            members.into_iter().map(|member| member.login),
            self.timezone.clone(),
        );

        for repo in &repos {
            let key = cache_key(
                COMMITS_NAMESPACE,
                [
                    organization.as_str(),
                    repo.name.as_str(),
                    since.as_deref().unwrap_or(""),
                    until.as_deref().unwrap_or(""),
                ],
            );

            let commits = match cache.get::<Vec<Commit>>(&key).await? {
                Some(commits) => {
                    tracing::trace!(repo = %repo.name, %key, "Commit cache hit");
                    commits
                }
                None => {
                    let commits = repo_commits(&client, &organization, &repo.name, &window).await?;
                    cache.set(&key, &commits).await?;
                    commits
                }
            };

            let counted = aggregator.add_commits(&commits);
            tracing::debug!(
                repo = %repo.name,
                commits = commits.len(),
                counted,
                "Aggregated repository"
            );
        }

        Ok(AnalysisReport {
            organization,
            since,
            until,
            analysis: aggregator.finish(),
        })
    }

    /// Release the cache and its connection, if one was made.
    ///
    /// Safe to call more than once. A later analysis builds a fresh cache.
    pub async fn shutdown(&self) -> Result<(), AnalysisError> {
        let cache = self.cache.lock().await.take();
        if let Some(cache) = cache {
            tracing::debug!(backend = cache.name(), "Closing commit cache");
            cache.close().await?;
        }
        Ok(())
    }
}

async fn repo_commits(
    client: &GithubClient,
    organization: &str,
    repo: &str,
    window: &CommitWindow,
) -> Result<Vec<Commit>, octocat::Error> {
    match client.repo_commits(organization, repo, window).await {
        Ok(commits) => Ok(commits),
        Err(error) if error.is_empty_repository() => {
            tracing::debug!(repo, "Repository is empty");
            Ok(Vec::new())
        }
        Err(error) => Err(error),
    }
}
