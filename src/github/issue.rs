use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::client::GithubClient;
use crate::error::FetchError;

/// One issue's full text: title, body and chronologically ordered comments.
/// Request-scoped; built once per analysis and discarded after.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueThread {
    pub owner: String,
    pub repo: String,
    pub number: u64,
    pub title: String,
    pub body: String,
    pub comments: Vec<Comment>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub author: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

/// Lightweight reference to another issue in the same repository.
/// Navigation context only; never part of the prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiblingIssue {
    pub number: u64,
    pub title: String,
    pub state: String,
}

#[derive(Debug, Deserialize)]
struct RawIssue {
    number: u64,
    title: String,
    body: Option<String>,
    state: String,
    /// Present when the "issue" is actually a pull request.
    #[serde(default)]
    pull_request: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct RawComment {
    body: Option<String>,
    user: Option<User>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct User {
    login: String,
}

/// Read access to issue threads and their siblings. `GithubClient` is the
/// production implementation; tests drive the orchestrator with fakes.
#[async_trait]
pub trait ThreadSource: Send + Sync {
    async fn fetch_thread(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<IssueThread, FetchError>;

    async fn fetch_siblings(
        &self,
        owner: &str,
        repo: &str,
        exclude: u64,
        limit: usize,
    ) -> Result<Vec<SiblingIssue>, FetchError>;
}

#[async_trait]
impl ThreadSource for GithubClient {
    async fn fetch_thread(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<IssueThread, FetchError> {
        let issue_json = self
            .get_json(&format!("repos/{owner}/{repo}/issues/{number}"))
            .await?;
        let issue: RawIssue = serde_json::from_value(issue_json)
            .map_err(|e| FetchError::UpstreamUnavailable(format!("unexpected issue payload: {e}")))?;

        // コメント取得は degrade 可: タイトルと本文だけでも解析は成立する
        let comments = match self
            .get_json(&format!(
                "repos/{owner}/{repo}/issues/{number}/comments?per_page=100"
            ))
            .await
        {
            Ok(json) => match serde_json::from_value::<Vec<RawComment>>(json) {
                Ok(raw) => raw,
                Err(e) => {
                    warn!(error = %e, "unexpected comments payload, continuing without comments");
                    Vec::new()
                }
            },
            Err(e) => {
                warn!(error = %e, "comment fetch failed, continuing without comments");
                Vec::new()
            }
        };

        Ok(thread_from_raw(owner, repo, issue, comments))
    }

    async fn fetch_siblings(
        &self,
        owner: &str,
        repo: &str,
        exclude: u64,
        limit: usize,
    ) -> Result<Vec<SiblingIssue>, FetchError> {
        let json = self
            .get_json(&format!(
                "repos/{owner}/{repo}/issues?per_page={limit}&state=all&sort=updated"
            ))
            .await?;
        let raw: Vec<RawIssue> = serde_json::from_value(json).map_err(|e| {
            FetchError::UpstreamUnavailable(format!("unexpected issue list payload: {e}"))
        })?;

        Ok(siblings_from_raw(raw, exclude, limit))
    }
}

fn thread_from_raw(owner: &str, repo: &str, issue: RawIssue, comments: Vec<RawComment>) -> IssueThread {
    let comments = comments
        .into_iter()
        .map(|c| Comment {
            author: c.user.map(|u| u.login).unwrap_or_else(|| "ghost".to_owned()),
            body: c.body.unwrap_or_default(),
            created_at: c.created_at,
        })
        .collect();

    IssueThread {
        owner: owner.to_owned(),
        repo: repo.to_owned(),
        number: issue.number,
        title: issue.title,
        body: issue.body.unwrap_or_default(),
        comments,
    }
}

/// The issues list endpoint mixes in pull requests; drop those, drop the
/// issue under analysis, and cap the result.
fn siblings_from_raw(raw: Vec<RawIssue>, exclude: u64, limit: usize) -> Vec<SiblingIssue> {
    raw.into_iter()
        .filter(|issue| issue.pull_request.is_none() && issue.number != exclude)
        .map(|issue| SiblingIssue {
            number: issue.number,
            title: issue.title,
            state: issue.state,
        })
        .take(limit)
        .collect()
}

/// Validate an owner or repository identifier against GitHub naming rules.
/// Rejects path traversal patterns outright.
pub fn validate_repo_ident(name: &str) -> Result<()> {
    if name.is_empty() {
        anyhow::bail!("owner/repo segment must not be empty");
    }
    if name.contains("..") || name.starts_with('.') {
        anyhow::bail!("invalid owner/repo segment: {name:?}");
    }
    for c in name.chars() {
        if !c.is_ascii_alphanumeric() && c != '_' && c != '-' && c != '.' {
            anyhow::bail!("invalid character {c:?} in owner/repo segment {name:?}");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw_issue(number: u64, title: &str, state: &str, is_pr: bool) -> RawIssue {
        RawIssue {
            number,
            title: title.to_owned(),
            body: None,
            state: state.to_owned(),
            pull_request: is_pr.then(|| json!({"url": "https://example"})),
        }
    }

    #[test]
    fn test_thread_from_raw_fills_missing_fields() {
        let issue = RawIssue {
            number: 7,
            title: "Crash on startup".to_owned(),
            body: None,
            state: "open".to_owned(),
            pull_request: None,
        };
        let comments = vec![RawComment {
            body: Some("Same here".to_owned()),
            user: None,
            created_at: "2024-05-01T12:00:00Z".parse().unwrap(),
        }];

        let thread = thread_from_raw("acme", "widget", issue, comments);
        assert_eq!(thread.number, 7);
        assert_eq!(thread.body, "");
        assert_eq!(thread.comments.len(), 1);
        assert_eq!(thread.comments[0].author, "ghost");
    }

    #[test]
    fn test_siblings_exclude_current_and_pull_requests() {
        let raw = vec![
            raw_issue(1, "a", "open", false),
            raw_issue(2, "b", "closed", false),
            raw_issue(3, "pr", "open", true),
            raw_issue(4, "current", "open", false),
        ];
        let siblings = siblings_from_raw(raw, 4, 10);
        assert_eq!(
            siblings.iter().map(|s| s.number).collect::<Vec<_>>(),
            vec![1, 2]
        );
    }

    #[test]
    fn test_siblings_respect_limit() {
        let raw = (1..=10).map(|n| raw_issue(n, "t", "open", false)).collect();
        let siblings = siblings_from_raw(raw, 99, 3);
        assert_eq!(siblings.len(), 3);
    }

    #[test]
    fn test_raw_issue_parses_github_shape() {
        let value = json!({
            "number": 42,
            "title": "Login fails on retry",
            "body": "Steps to reproduce...",
            "state": "open",
            "user": {"login": "alice"},
            "labels": [{"name": "bug"}]
        });
        let issue: RawIssue = serde_json::from_value(value).unwrap();
        assert_eq!(issue.number, 42);
        assert!(issue.pull_request.is_none());
    }

    #[test]
    fn test_validate_repo_ident() {
        assert!(validate_repo_ident("rust-lang").is_ok());
        assert!(validate_repo_ident("my_repo.js").is_ok());
        assert!(validate_repo_ident("").is_err());
        assert!(validate_repo_ident("..").is_err());
        assert!(validate_repo_ident(".hidden").is_err());
        assert!(validate_repo_ident("owner/extra").is_err());
    }
}
