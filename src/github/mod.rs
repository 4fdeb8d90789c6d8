pub mod client;
pub mod issue;

pub use client::GithubClient;
pub use issue::{Comment, IssueThread, SiblingIssue, ThreadSource};
