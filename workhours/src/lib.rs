//! # workhours
//!
//! Measures how much of an organization's commit activity happens outside
//! working hours.
//!
//! Every member's commits across every repository of the organization are
//! bucketed by weekday and hour of the wall-clock time they were authored.
//! A commit counts as after-hours when it was made on a weekend, or before
//! 9:00 or from 17:00 on a weekday.
//!
//! ```rust,no_run
//! # async fn run() -> Result<(), workhours::AnalysisError> {
//! use workhours::{AnalysisRequest, Analyzer};
//!
//! let analyzer = Analyzer::from_env();
//! let report = analyzer
//!     .analyze(AnalysisRequest::new("acme").since("2024-01-01T00:00:00Z"))
//!     .await?;
//! for (login, activity) in &report.analysis {
//!     println!("{login}: {}/{}", activity.after_hours_commits, activity.total_commits);
//! }
//! analyzer.shutdown().await?;
//! # Ok(())
//! # }
//! ```

mod aggregate;
mod analyzer;
pub mod config;
mod error;
pub mod histogram;
mod report;

pub use self::aggregate::Aggregator;
pub use self::analyzer::Analyzer;
pub use self::config::AnalysisRequest;
pub use self::error::AnalysisError;
pub use self::histogram::ContributorHistogram;
pub use self::report::{AnalysisReport, ContributorReport};
