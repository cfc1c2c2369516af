//! The analysis result handed back to callers.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::histogram::{DAYS, HOURS};

/// Activity of one organization member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributorReport {
    /// Commit counts indexed by day (Sunday first) then hour.
    pub by_hour_and_day: [[u64; HOURS]; DAYS],

    /// Commit counts per hour of day.
    pub by_hour: [u64; HOURS],

    /// Commit counts per day of week, Sunday first.
    pub by_day: [u64; DAYS],

    /// All commits attributed to the member.
    pub total_commits: u64,

    /// Commits on weekends, or before 9:00 or from 17:00 on weekdays.
    pub after_hours_commits: u64,
}

/// Result of analyzing one organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// Organization login.
    pub organization: String,

    /// Lower time bound, as given.
    pub since: Option<String>,

    /// Upper time bound, as given.
    pub until: Option<String>,

    /// Per-member activity, keyed by login.
    pub analysis: BTreeMap<String, ContributorReport>,
}
