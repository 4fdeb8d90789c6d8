use crate::github::IssueThread;

/// Marker inserted when old comments are dropped to fit the budget.
const OMITTED_MARKER: &str = "[earlier comments omitted]";

const SCHEMA_BLOCK: &str = r#"Return ONLY a JSON object with exactly these fields:
{
    "summary": "One sentence summary of the issue",
    "priority": 1-5 (integer, 5 = most urgent),
    "issueType": "bug" | "feature" | "question" | "documentation" | "other",
    "labels": ["short", "tags"] (at most 6)
}"#;

const FEW_SHOT_BLOCK: &str = r#"Example 1:
Title: App crashes when uploading files over 2GB
Body:
Uploading a 2.5GB video kills the process with an OOM. Happens every time on 1.4.2.
Answer:
{"summary": "Uploads larger than 2GB crash the app with an out-of-memory error", "priority": 5, "issueType": "bug", "labels": ["crash", "upload", "memory"]}

Example 2:
Title: Please add a dark theme
Body:
The white background is hard on the eyes at night. Most editors ship a dark mode these days.
Answer:
{"summary": "Request to add a dark color theme for night-time use", "priority": 2, "issueType": "feature", "labels": ["ui", "theme"]}"#;

/// Render an issue thread into the triage prompt.
///
/// Pure and deterministic: the same thread and budget always produce a
/// byte-identical prompt. Title and body are always included whole; comments
/// are dropped oldest-first once the character budget is exceeded.
pub fn build_triage_prompt(thread: &IssueThread, max_chars: usize) -> String {
    let header = format!(
        "You are an expert Engineering Manager triaging a GitHub issue.\n\n\
         {SCHEMA_BLOCK}\n\n{FEW_SHOT_BLOCK}\n\nIssue Data:\n"
    );
    let issue_block = format!("Title: {}\n\nBody:\n{}\n", thread.title, thread.body);
    let footer = "\nReturn ONLY the JSON object. No surrounding prose, no code fences.";

    let fixed_cost = header.chars().count() + issue_block.chars().count() + footer.chars().count();
    let comment_budget = max_chars.saturating_sub(fixed_cost);

    // Walk newest-first so the oldest comments are the ones dropped.
    let mut kept: Vec<String> = Vec::new();
    let mut used = 0;
    for comment in thread.comments.iter().rev() {
        let block = format!("\nComment by {}:\n{}\n", comment.author, comment.body);
        let cost = block.chars().count();
        if used + cost > comment_budget {
            break;
        }
        used += cost;
        kept.push(block);
    }
    let omitted = thread.comments.len() - kept.len();
    kept.reverse();

    let mut prompt = String::with_capacity(fixed_cost + used + 64);
    prompt.push_str(&header);
    prompt.push_str(&issue_block);
    if omitted > 0 {
        prompt.push('\n');
        prompt.push_str(OMITTED_MARKER);
        prompt.push('\n');
    }
    for block in &kept {
        prompt.push_str(block);
    }
    prompt.push_str(footer);
    prompt
}
