//! `github-workhours`: print an after-hours commit report for a GitHub organization.

use clap::Parser;
use eyre::eyre;
use tracing_subscriber::EnvFilter;
use workhours::config::{resolve_since, GITHUB_ORG_ENV, GITHUB_TOKEN_ENV};
use workhours::{AnalysisRequest, Analyzer};

/// Analyze GitHub commit patterns to determine after-hours activity.
#[derive(Debug, Parser)]
#[command(name = "github-workhours", version)]
struct Args {
    /// GitHub organization name
    #[arg(short, long, env = GITHUB_ORG_ENV)]
    org: Option<String>,

    /// Start date (ISO format, e.g. 2023-01-01T00:00:00Z) or a duration like "2 months"
    #[arg(short, long)]
    since: Option<String>,

    /// End date (ISO format, e.g. 2024-01-01T00:00:00Z)
    #[arg(short, long)]
    until: Option<String>,

    /// GitHub Personal Access Token
    #[arg(short, long, env = GITHUB_TOKEN_ENV, hide_env_values = true)]
    token: Option<String>,

    /// Print the report on a single line
    #[arg(long)]
    compact: bool,
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(tracing::Level::WARN.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let organization = args
        .org
        .filter(|org| !org.is_empty())
        .ok_or_else(|| eyre!("Organization name is required. Provide via --org or GITHUB_ORG env var."))?;
    let token = args
        .token
        .filter(|token| !token.is_empty())
        .ok_or_else(|| eyre!("GitHub token is required. Provide via --token or GITHUB_TOKEN env var."))?;

    let mut request = AnalysisRequest::new(organization).credential(token.into());
    if let Some(since) = args.since {
        request = request.since(resolve_since(&since, chrono::Utc::now()));
    }
    if let Some(until) = args.until {
        request = request.until(until);
    }

    let analyzer = Analyzer::from_env();
    tracing::info!(org = %request.organization, "Analyzing commits");
    let outcome = analyzer.analyze(request).await;
    analyzer.shutdown().await?;
    let report = outcome?;

    let json = if args.compact {
        serde_json::to_string(&report)?
    } else {
        serde_json::to_string_pretty(&report)?
    };
    println!("{json}");

    Ok(())
}
