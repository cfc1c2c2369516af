//! Inputs to an analysis.

use octocat::Secret;
use serde::Deserialize;

mod since;

pub use self::since::{relative_to, resolve_since};

/// Environment variable holding the default GitHub token.
pub const GITHUB_TOKEN_ENV: &str = "GITHUB_TOKEN";

/// Environment variable holding the default organization for the CLI.
pub const GITHUB_ORG_ENV: &str = "GITHUB_ORG";

/// One analysis run.
///
/// `since` and `until` are handed to GitHub as-is.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalysisRequest {
    /// Organization login.
    pub organization: String,

    /// Only count commits after this ISO-8601 date.
    #[serde(default)]
    pub since: Option<String>,

    /// Only count commits before this ISO-8601 date.
    #[serde(default)]
    pub until: Option<String>,

    /// Token to use instead of the analyzer's default.
    #[serde(default)]
    pub credential: Option<Secret>,
}

impl AnalysisRequest {
    /// Analyze `organization` over all time with the default token.
    pub fn new(organization: impl Into<String>) -> Self {
        Self {
            organization: organization.into(),
            ..Default::default()
        }
    }

    /// Only count commits after `since`.
    pub fn since(mut self, since: impl Into<String>) -> Self {
        self.since = Some(since.into());
        self
    }

    /// Only count commits before `until`.
    pub fn until(mut self, until: impl Into<String>) -> Self {
        self.until = Some(until.into());
        self
    }

    /// Authenticate with `credential`.
    pub fn credential(mut self, credential: Secret) -> Self {
        self.credential = Some(credential);
        self
    }
}
