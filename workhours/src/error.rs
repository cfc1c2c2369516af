//! Errors from running an analysis.

use resultcache::CacheError;
use thiserror::Error;

/// Why an analysis did not produce a report.
///
/// Partial results are never returned alongside an error.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// The organization name was empty.
    #[error("Organization name is required")]
    MissingOrganization,

    /// Neither the request nor the analyzer had a token.
    #[error("GitHub token is required. Set GITHUB_TOKEN environment variable.")]
    MissingCredential,

    /// A GitHub request failed.
    #[error(transparent)]
    Github(#[from] octocat::Error),

    /// Reading or writing cached commits failed.
    #[error("Commit cache: {0}")]
    Cache(#[from] CacheError),
}
