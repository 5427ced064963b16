use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Agents whose output is intermediate work, shown inside the collapsed
/// progress expander.
pub const PROGRESS_AGENTS: [&str; 4] = [
    "SUPERVISOR",
    "RESEARCH_AGENT",
    "DATA_AGENT",
    "PREDICTION_AGENT",
];

/// Agents whose output is the answer shown in the main chat area.
pub const FINAL_AGENTS: [&str; 2] = ["PLANNING_AGENT", "REPORT_AGENT"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SeparatedOutput {
    pub final_content: String,
    pub progress_content: String,
}

/// One agent's contribution to an assistant turn, as recorded by the
/// agent system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentChunk {
    pub agent: String,
    pub text: String,
}

/// Splits a multi-agent assistant message into final and progress
/// sections, preserving chronological order within each.
///
/// A line that both starts and ends with `**` is an agent header. The
/// uppercased line decides the section: progress agents switch to
/// progress, final agents back to final, any other header leaves the
/// section unchanged. Lines before the first header count as final.
pub fn separate_agent_outputs(content: &str) -> SeparatedOutput {
    let mut final_content = String::new();
    let mut progress_content = String::new();
    let mut in_progress = false;

    for line in content.split('\n') {
        if line.starts_with("**") && line.ends_with("**") {
            let line_upper = line.to_uppercase();
            if PROGRESS_AGENTS.iter().any(|agent| line_upper.contains(agent)) {
                in_progress = true;
            } else if FINAL_AGENTS.iter().any(|agent| line_upper.contains(agent)) {
                in_progress = false;
            }
        }

        let section = if in_progress {
            &mut progress_content
        } else {
            &mut final_content
        };
        section.push_str(line);
        section.push('\n');
    }

    SeparatedOutput {
        final_content: final_content.trim().to_string(),
        progress_content: progress_content.trim().to_string(),
    }
}

/// Readable rendering of one recorded tool call: name plus the arguments
/// as fenced pretty-printed JSON.
pub fn pretty_print_tool_call(name: &str, args: &Value) -> String {
    let pretty_args = serde_json::to_string_pretty(args).unwrap_or_else(|_| args.to_string());
    format!("Tool call: {}\n```json\n{}\n```", name, pretty_args)
}

/// Assembles one assistant transcript row from per-agent records: each
/// chunk prefixed with its `**AGENT**` header unless it already carries
/// one, chunks joined by blank lines. The inverse of the splitter.
pub fn reconstruct_assistant_response(chunks: &[AgentChunk]) -> String {
    let mut parts = Vec::new();

    for chunk in chunks {
        let text = chunk.text.trim();
        if text.is_empty() {
            continue;
        }

        let first_line = text.lines().next().unwrap_or("");
        if first_line.starts_with("**") && first_line.ends_with("**") {
            parts.push(text.to_string());
        } else {
            parts.push(format!("**{}**\n{}", chunk.agent.trim().to_uppercase(), text));
        }
    }

    parts.join("\n\n")
}

/// Sidebar titles longer than `max_chars` characters are cut and
/// suffixed with "...". Counts characters, so multi-byte titles never
/// split mid code point.
pub fn truncate_title(title: &str, max_chars: usize) -> String {
    if title.chars().count() > max_chars {
        let truncated: String = title.chars().take(max_chars).collect();
        format!("{}...", truncated)
    } else {
        title.to_string()
    }
}
