//! Attribution of commits to organization members.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::TimeZone;
use octocat::Commit;

use crate::histogram::ContributorHistogram;
use crate::report::ContributorReport;

/// Buckets commits into per-member histograms in a fixed timezone.
///
/// Only commits whose author login exactly matches a member login are
/// counted. Histograms are created when a member's first commit is seen.
#[derive(Debug)]
pub struct Aggregator<Tz> {
    members: HashSet<String>,
    timezone: Tz,
    contributors: HashMap<String, ContributorHistogram>,
}

impl<Tz: TimeZone> Aggregator<Tz> {
    /// Start aggregating for the given member logins.
    pub fn new<I>(members: I, timezone: Tz) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Self {
            members: members.into_iter().map(Into::into).collect(),
            timezone,
            contributors: HashMap::new(),
        }
    }

    /// Count a repository's commits, returning how many were attributed.
    pub fn add_commits<'c, I>(&mut self, commits: I) -> usize
    where
        I: IntoIterator<Item = &'c Commit>,
    {
        let mut counted = 0;
        for commit in commits {
            let Some(login) = commit.author_login() else {
                continue;
            };
            if !self.members.contains(login) {
                continue;
            }
            let Some(authored) = commit.authored_at() else {
                tracing::trace!(sha = %commit.sha, "Skipping commit without an author date");
                continue;
            };

            let local = authored.with_timezone(&self.timezone);
            self.contributors
                .entry(login.to_owned())
                .or_default()
                .record(&local);
            counted += 1;
        }
        counted
    }

    /// Compute after-hours counts and return the reports, ordered by login.
    pub fn finish(self) -> BTreeMap<String, ContributorReport> {
        self.contributors
            .into_iter()
            .map(|(login, histogram)| (login, histogram.finalize()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{FixedOffset, Utc};
    use serde_json::json;

    use super::*;

    fn commit(login: Option<&str>, date: &str) -> Commit {
        serde_json::from_value(json!({
            "sha": "0000",
            "commit": { "author": { "name": "someone", "date": date }, "message": "m" },
            "author": login.map(|login| json!({ "login": login })),
        }))
        .unwrap()
    }

    #[test]
    fn non_members_are_ignored() {
        let commits = vec![
            commit(Some("alice"), "2023-01-01T10:00:00Z"),
            commit(Some("alice"), "2023-01-02T18:00:00Z"),
            commit(Some("alice"), "2023-01-02T12:00:00Z"),
            commit(Some("bob"), "2023-01-02T20:00:00Z"),
        ];

        let mut aggregator = Aggregator::new(["alice"], Utc);
        assert_eq!(aggregator.add_commits(&commits), 3);

        let analysis = aggregator.finish();
        assert!(!analysis.contains_key("bob"));
        let alice = &analysis["alice"];
        assert_eq!(alice.total_commits, 3);
        assert_eq!(alice.after_hours_commits, 2);
    }

    #[test]
    fn logins_match_case_sensitively() {
        let commits = vec![commit(Some("Alice"), "2023-01-02T12:00:00Z")];

        let mut aggregator = Aggregator::new(["alice"], Utc);
        assert_eq!(aggregator.add_commits(&commits), 0);
        assert!(aggregator.finish().is_empty());
    }

    #[test]
    fn unattributed_commits_are_dropped() {
        let commits = vec![
            commit(None, "2023-01-02T12:00:00Z"),
            commit(Some("alice"), "2023-01-02T12:00:00Z"),
        ];

        let mut aggregator = Aggregator::new(["alice"], Utc);
        aggregator.add_commits(&commits);
        let analysis = aggregator.finish();
        assert_eq!(analysis.len(), 1);
        assert_eq!(analysis["alice"].total_commits, 1);
    }

    #[test]
    fn counts_accumulate_across_repositories() {
        let first = vec![commit(Some("alice"), "2023-01-02T12:00:00Z")];
        let second = vec![
            commit(Some("alice"), "2023-01-03T12:00:00Z"),
            commit(Some("carol"), "2023-01-07T12:00:00Z"),
        ];

        let mut aggregator = Aggregator::new(["alice", "carol"], Utc);
        aggregator.add_commits(&first);
        aggregator.add_commits(&second);

        let analysis = aggregator.finish();
        assert_eq!(analysis["alice"].total_commits, 2);
        assert_eq!(analysis["alice"].after_hours_commits, 0);
        assert_eq!(analysis["carol"].after_hours_commits, 1);
        let logins: Vec<_> = analysis.keys().map(String::as_str).collect();
        assert_eq!(logins, vec!["alice", "carol"]);
    }

    #[test]
    fn timezone_moves_commits_between_cells() {
        // Friday 16:00 UTC is Saturday 01:00 at UTC+9.
        let commits = vec![commit(Some("alice"), "2023-01-06T16:00:00Z")];

        let mut utc = Aggregator::new(["alice"], Utc);
        utc.add_commits(&commits);
        assert_eq!(utc.finish()["alice"].after_hours_commits, 0);

        let tokyo = FixedOffset::east_opt(9 * 3600).unwrap();
        let mut local = Aggregator::new(["alice"], tokyo);
        local.add_commits(&commits);
        let analysis = local.finish();
        let alice = &analysis["alice"];
        assert_eq!(alice.by_day[6], 1);
        assert_eq!(alice.by_hour[1], 1);
        assert_eq!(alice.after_hours_commits, 1);
    }
}
