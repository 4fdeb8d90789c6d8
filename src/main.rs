use anyhow::{Context, Result};
use clap::Parser;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

mod ai;
mod config;
mod error;
mod github;

use ai::adapters::create_model;
use ai::{AnalysisOutcome, AnalysisView, ModelInvoker, Orchestrator};
use config::{Config, Secrets};
use error::FetchError;
use github::GithubClient;

#[derive(Parser, Debug)]
#[command(name = "ot")]
#[command(about = "AI-assisted triage for GitHub issues")]
#[command(version)]
struct Args {
    /// Repository name (e.g., "owner/repo")
    #[arg(short, long)]
    repo: String,

    /// Issue number
    #[arg(short, long)]
    issue: u64,

    /// Print the analysis view as JSON instead of text
    #[arg(long, default_value = "false")]
    json: bool,

    /// Override the number of sibling issues fetched for navigation
    #[arg(long)]
    max_siblings: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let (owner, repo) = split_repo(&args.repo)?;
    anyhow::ensure!(args.issue >= 1, "issue number must be positive");

    let mut config = Config::load()?;
    if let Some(n) = args.max_siblings {
        config.limits.max_siblings = n;
    }
    let secrets = Secrets::from_env()?;

    let client = GithubClient::new(
        &config.github.api_base,
        config.github.request_timeout_secs,
        secrets.github_token.clone(),
    )?;
    let primary = create_model(
        &config.ai.primary_model,
        &secrets.gemini_api_key,
        config.ai.request_timeout_secs,
    )?;
    let fallback = create_model(
        &config.ai.fallback_model,
        &secrets.gemini_api_key,
        config.ai.request_timeout_secs,
    )?;
    let invoker = ModelInvoker::new(
        primary,
        fallback,
        Duration::from_secs(config.ai.request_timeout_secs),
    );
    let orchestrator = Orchestrator::new(Box::new(client), invoker, config.limits.clone());

    eprintln!("Analyzing {}#{}...", args.repo, args.issue);
    let view = match orchestrator.analyze(owner, repo, args.issue).await {
        Ok(view) => view,
        Err(FetchError::RateLimited {
            retry_after: Some(secs),
        }) => anyhow::bail!("GitHub rate limit exceeded, retry after {secs}s"),
        Err(e) => return Err(e.into()),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&view)?);
    } else {
        print_view(&view);
    }
    Ok(())
}

fn split_repo(repo: &str) -> Result<(&str, &str)> {
    let (owner, name) = repo
        .split_once('/')
        .context("repository must be in owner/repo form")?;
    github::issue::validate_repo_ident(owner)?;
    github::issue::validate_repo_ident(name)?;
    Ok((owner, name))
}

fn print_view(view: &AnalysisView) {
    println!("{} #{}: {}", view.repo, view.issue_number, view.issue_title);
    println!();

    match &view.analysis {
        AnalysisOutcome::Ok { result } => {
            println!("  Summary : {}", result.summary);
            println!("  Priority: {}/5", result.priority);
            println!("  Type    : {}", result.issue_type.as_str());
            if result.labels.is_empty() {
                println!("  Labels  : (none)");
            } else {
                println!("  Labels  : {}", result.labels.join(", "));
            }
        }
        AnalysisOutcome::Failed { kind, message } => {
            println!("  Analysis failed: {message} ({kind:?})");
        }
    }

    if !view.siblings.is_empty() {
        println!();
        println!("Recent issues in {}:", view.repo);
        for sibling in &view.siblings {
            println!("  #{:<5} [{}] {}", sibling.number, sibling.state, sibling.title);
        }
    }
}
