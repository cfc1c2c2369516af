//! Hour-of-day by day-of-week commit counts.

use chrono::{DateTime, Datelike as _, TimeZone, Timelike as _};

use crate::report::ContributorReport;

/// Days in a week, Sunday first.
pub const DAYS: usize = 7;

/// Hours in a day.
pub const HOURS: usize = 24;

/// First hour of the working day.
pub const WORKDAY_START: usize = 9;

/// First hour after the working day.
pub const WORKDAY_END: usize = 17;

/// Whether a commit in this cell was made outside working hours.
///
/// `day` counts from Sunday (0) to Saturday (6). Every hour of a weekend day
/// counts; on weekdays only hours before 9:00 or from 17:00 on do.
pub fn is_after_hours(day: usize, hour: usize) -> bool {
    let weekend = day == 0 || day == DAYS - 1;
    weekend || hour < WORKDAY_START || hour >= WORKDAY_END
}

/// Commit counts for one contributor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContributorHistogram {
    by_hour_and_day: [[u64; HOURS]; DAYS],
    by_hour: [u64; HOURS],
    by_day: [u64; DAYS],
    total: u64,
}

impl ContributorHistogram {
    /// An empty histogram.
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a commit at the wall-clock time of `when`.
    pub fn record<Tz: TimeZone>(&mut self, when: &DateTime<Tz>) {
        let day = when.weekday().num_days_from_sunday() as usize;
        let hour = when.hour() as usize;
        self.record_cell(day, hour);
    }

    fn record_cell(&mut self, day: usize, hour: usize) {
        self.by_hour_and_day[day][hour] += 1;
        self.by_hour[hour] += 1;
        self.by_day[day] += 1;
        self.total += 1;
    }

    /// Number of commits recorded.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Count for a single day and hour.
    pub fn cell(&self, day: usize, hour: usize) -> u64 {
        self.by_hour_and_day[day][hour]
    }

    /// Commits made outside working hours, summed cell by cell.
    pub fn after_hours(&self) -> u64 {
        self.by_hour_and_day
            .iter()
            .enumerate()
            .flat_map(|(day, hours)| {
                hours
                    .iter()
                    .enumerate()
                    .filter(move |(hour, _)| is_after_hours(day, *hour))
                    .map(|(_, count)| *count)
            })
            .sum()
    }

    /// Freeze into the reported form.
    pub fn finalize(self) -> ContributorReport {
        let after_hours_commits = self.after_hours();
        ContributorReport {
            by_hour_and_day: self.by_hour_and_day,
            by_hour: self.by_hour,
            by_day: self.by_day,
            total_commits: self.total,
            after_hours_commits,
        }
    }
}
