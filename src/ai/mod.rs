pub mod adapter;
pub mod adapters;
pub mod invoker;
pub mod orchestrator;
pub mod prompts;
pub mod validate;

pub use adapter::GenerativeModel;
pub use invoker::ModelInvoker;
pub use orchestrator::{AnalysisOutcome, AnalysisView, Orchestrator};
pub use validate::{AnalysisResult, IssueType};
