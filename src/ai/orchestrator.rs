use serde::Serialize;
use tracing::{info, warn};

use super::invoker::ModelInvoker;
use super::prompts::build_triage_prompt;
use super::validate::{validate, AnalysisResult};
use crate::config::LimitsConfig;
use crate::error::{AnalysisFailureKind, FetchError};
use crate::github::{SiblingIssue, ThreadSource};

/// Single user-facing message for every analysis-stage failure; the specific
/// stage is logged where it happened.
pub const ANALYSIS_FAILED_MESSAGE: &str = "analysis failed, please retry";

/// What the caller renders: triage result (or a typed failure) plus sibling
/// issues for navigation.
#[derive(Debug, Serialize)]
pub struct AnalysisView {
    pub repo: String,
    pub issue_number: u64,
    pub issue_title: String,
    pub analysis: AnalysisOutcome,
    pub siblings: Vec<SiblingIssue>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AnalysisOutcome {
    Ok {
        #[serde(flatten)]
        result: AnalysisResult,
    },
    Failed {
        kind: AnalysisFailureKind,
        message: String,
    },
}

impl AnalysisOutcome {
    fn failed(kind: AnalysisFailureKind) -> Self {
        AnalysisOutcome::Failed {
            kind,
            message: ANALYSIS_FAILED_MESSAGE.to_owned(),
        }
    }
}

/// Runs one analysis request end to end: fetch thread, build prompt, invoke
/// the model, validate, and merge with sibling context.
pub struct Orchestrator {
    source: Box<dyn ThreadSource>,
    invoker: ModelInvoker,
    limits: LimitsConfig,
}

impl Orchestrator {
    pub fn new(source: Box<dyn ThreadSource>, invoker: ModelInvoker, limits: LimitsConfig) -> Self {
        Self {
            source,
            invoker,
            limits,
        }
    }

    /// A thread-fetch failure aborts the request. Model and validation
    /// failures degrade to a view with siblings only, so navigation keeps
    /// working even when triage does not.
    pub async fn analyze(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<AnalysisView, FetchError> {
        let thread = self.source.fetch_thread(owner, repo, number).await?;
        info!(
            issue = number,
            comments = thread.comments.len(),
            "fetched issue thread"
        );

        let prompt = build_triage_prompt(&thread, self.limits.max_prompt_chars);

        // サブリング取得はモデル呼び出しと独立なので並行で走らせる
        let (analysis, siblings) = tokio::join!(
            self.run_analysis(&prompt),
            self.fetch_siblings_best_effort(owner, repo, number),
        );

        Ok(AnalysisView {
            repo: format!("{owner}/{repo}"),
            issue_number: number,
            issue_title: thread.title,
            analysis,
            siblings,
        })
    }

    async fn run_analysis(&self, prompt: &str) -> AnalysisOutcome {
        let raw = match self.invoker.invoke(prompt).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "model invocation failed");
                return AnalysisOutcome::failed(AnalysisFailureKind::from(&e));
            }
        };

        match validate(&raw, self.limits.label_cap) {
            Ok(result) => AnalysisOutcome::Ok { result },
            Err(e) => {
                warn!(error = %e, "model output failed validation");
                AnalysisOutcome::failed(AnalysisFailureKind::from(&e))
            }
        }
    }

    /// Best-effort: siblings are supplementary context, never a reason to
    /// fail the analysis.
    async fn fetch_siblings_best_effort(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Vec<SiblingIssue> {
        match self
            .source
            .fetch_siblings(owner, repo, number, self.limits.max_siblings)
            .await
        {
            Ok(siblings) => siblings,
            Err(e) => {
                warn!(error = %e, "sibling fetch failed, continuing without navigation context");
                Vec::new()
            }
        }
    }
}
