//! Commit data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Account;

/// A commit object, as returned by the repository commits listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Commit {
    /// The SHA of the commit.
    #[serde(default)]
    pub sha: String,

    /// The commit details.
    pub commit: CommitDetails,

    /// The GitHub account the commit author resolved to, if any.
    #[serde(default)]
    pub author: Option<Account>,
}

impl Commit {
    /// Login of the GitHub account which authored this commit.
    ///
    /// `None` when GitHub could not match the author email to an account.
    pub fn author_login(&self) -> Option<&str> {
        self.author.as_ref().map(|account| account.login.as_str())
    }

    /// When the commit was authored.
    pub fn authored_at(&self) -> Option<DateTime<Utc>> {
        self.commit.author.as_ref().map(|author| author.date)
    }
}

/// The author and message for a commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitDetails {
    /// The author of the commit.
    #[serde(default)]
    pub author: Option<AuthorCommitDetails>,

    /// The commit message.
    #[serde(default)]
    pub message: String,
}

/// The author and date for a commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorCommitDetails {
    /// Author name
    pub name: String,

    /// Author email
    #[serde(default)]
    pub email: Option<String>,

    /// The date of the commit.
    pub date: DateTime<Utc>,
}
