//! Github API object models.

use serde::{Deserialize, Serialize};

pub mod commits;

pub use commits::Commit;

/// A GitHub user account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Account login.
    pub login: String,

    /// Account ID.
    #[serde(default)]
    pub id: Option<u64>,
}

/// A member of an organization.
pub type Member = Account;

/// A repository owned by an organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    /// Repository name, without the owner.
    pub name: String,

    /// `owner/name`.
    #[serde(default)]
    pub full_name: Option<String>,
}
