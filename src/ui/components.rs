use std::path::Path;

use base64::{engine::general_purpose::STANDARD, Engine};
use serde_json::Value;

use crate::episodic::EpisodicSystemStatus;
use crate::history::{StoredMessage, ThreadInfo};

use super::formatters::{pretty_print_tool_call, separate_agent_outputs, truncate_title};

const PAGE_CSS: &str = "\
body { margin: 0; font-family: system-ui, sans-serif; background: #f7f7f9; color: #222; }
.header { display: flex; align-items: center; gap: 10px; padding: 14px 20px; background: #fff; border-bottom: 1px solid #ddd; }
.header h1 { margin: 0; font-size: 1.5em; }
.banner { margin: 14px 20px; padding: 10px 14px; background: #e8f0fe; border: 1px solid #c4d7f7; border-radius: 6px; }
.layout { display: flex; gap: 18px; padding: 0 20px 20px; align-items: flex-start; }
.sidebar { width: 280px; flex-shrink: 0; background: #fff; border: 1px solid #ddd; border-radius: 6px; padding: 12px; }
.sidebar h2 { font-size: 1.05em; margin: 8px 0; }
.sidebar hr { border: none; border-top: 1px solid #e4e4e8; margin: 10px 0; }
.sidebar .caption { font-size: 0.85em; color: #555; margin: 4px 0; }
.threads { display: flex; flex-direction: column; gap: 4px; }
.thread-row { display: flex; align-items: center; gap: 4px; }
.thread-row button.inert { width: auto; padding: 2px 6px; flex-shrink: 0; }
.thread { display: block; flex-grow: 1; padding: 6px 8px; border-radius: 4px; text-decoration: none; color: #222; }
.thread:hover { background: #eef1f6; }
.thread.current { background: #dce8fb; font-weight: 600; }
button.inert { width: 100%; padding: 6px; border: 1px solid #ccc; border-radius: 4px; background: #fafafa; color: #888; }
.content { flex-grow: 1; min-width: 0; }
.message { background: #fff; border: 1px solid #ddd; border-radius: 6px; padding: 10px 14px; margin-bottom: 12px; }
.message .role { font-size: 0.8em; text-transform: uppercase; color: #777; margin-bottom: 6px; }
.message.user { background: #f0f6ff; }
details.progress { margin-top: 8px; }
details.progress summary { cursor: pointer; color: #555; }
details.progress > div { margin-top: 6px; padding: 8px; background: #f7f7f9; border-radius: 4px; }
pre.tool-call { background: #23272e; color: #e6e6e6; padding: 10px; border-radius: 4px; overflow-x: auto; font-size: 0.85em; }
";

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Logo plus title, the logo embedded as a base64 data URI. A missing or
/// unreadable logo file degrades to the text-only header.
pub fn render_header(title: &str, logo_path: &Path) -> String {
    match std::fs::read(logo_path) {
        Ok(bytes) => {
            let logo_base64 = STANDARD.encode(&bytes);
            format!(
                "<div class=\"header\"><img src=\"data:image/png;base64,{}\" width=\"60\" alt=\"\"><h1>{}</h1></div>\n",
                logo_base64,
                escape_html(title)
            )
        }
        Err(_) => format!(
            "<div class=\"header\"><h1>{}</h1></div>\n",
            escape_html(title)
        ),
    }
}

pub fn render_demo_banner() -> String {
    "<div class=\"banner\">🎯 <strong>Demo Mode</strong>: This is a read-only demonstration \
     of the conversation display system. All formatting capabilities from the main app are \
     preserved here.</div>\n"
        .to_string()
}

/// Sidebar in display order: episodic panel, task management, the thread
/// list with the most recent thread first, database info. `threads` comes
/// in store order (oldest first) and is reversed here.
pub fn render_sidebar(
    status: &EpisodicSystemStatus,
    threads: &[ThreadInfo],
    current_thread_id: &str,
    title_max_chars: usize,
    db_file_name: &str,
    db_size_bytes: Option<u64>,
) -> String {
    let mut html = String::from("<aside class=\"sidebar\">\n");

    if status.enabled {
        html.push_str("<details class=\"episodic\"><summary>🧠 Episodic Learning</summary>\n");
        html.push_str(
            "<p class=\"caption\">Save patterns from this conversation for future use</p>\n",
        );
        html.push_str("<button class=\"inert\" disabled>📚 Extract Learning</button>\n");
        html.push_str(&format!(
            "<p class=\"caption\">📊 Stored patterns: {}</p>\n",
            status.total_episodes
        ));
        html.push_str("</details>\n<hr>\n");
    }

    html.push_str("<h2>Task Management</h2>\n");
    html.push_str("<button class=\"inert\" disabled>New Task</button>\n<hr>\n");

    html.push_str("<nav class=\"threads\">\n");
    for thread in threads.iter().rev() {
        let is_current = thread.id == current_thread_id;
        let marker = if is_current { "🔵" } else { "💬" };
        let display_title = escape_html(&truncate_title(&thread.title, title_max_chars));

        html.push_str("<div class=\"thread-row\">");
        if is_current {
            html.push_str(&format!(
                "<span class=\"thread current\">{} {}</span>",
                marker, display_title
            ));
        } else {
            html.push_str(&format!(
                "<a class=\"thread\" href=\"/?thread={}\">{} {}</a>",
                escape_html(&thread.id),
                marker,
                display_title
            ));
        }
        html.push_str("<button class=\"inert delete\" disabled>🗑️</button></div>\n");
    }
    html.push_str("</nav>\n<hr>\n");

    html.push_str(&format!(
        "<p class=\"caption\">💾 Memory: {}</p>\n",
        escape_html(db_file_name)
    ));
    if let Some(size) = db_size_bytes {
        let size_mb = size as f64 / (1024.0 * 1024.0);
        html.push_str(&format!(
            "<p class=\"caption\">📊 Size: {:.2} MB</p>\n",
            size_mb
        ));
    }

    html.push_str("</aside>\n");
    html
}

pub fn render_chat_messages(messages: &[StoredMessage]) -> String {
    let mut html = String::from("<div class=\"chat\">\n");
    for message in messages {
        html.push_str(&render_message(message));
    }
    html.push_str("</div>\n");
    html
}

/// One chat bubble. Assistant content is split into the final answer and
/// the collapsed progress expander; everything else renders as-is.
fn render_message(message: &StoredMessage) -> String {
    let mut body = String::new();

    if message.role == "assistant" && !message.content.is_empty() {
        let separated = separate_agent_outputs(&message.content);

        if !separated.final_content.is_empty() {
            body.push_str(&format!(
                "<div class=\"final\">{}</div>\n",
                format_message_html(&separated.final_content)
            ));
        }
        if !separated.progress_content.is_empty() {
            body.push_str(&format!(
                "<details class=\"progress\"><summary>🔄 Processing Progress</summary><div>{}</div></details>\n",
                format_message_html(&separated.progress_content)
            ));
        }
    } else {
        body.push_str(&format!(
            "<div class=\"plain\">{}</div>\n",
            format_message_html(&message.content)
        ));
    }

    if let Some(tool_calls) = message.tool_calls.as_ref().and_then(|v| v.as_array()) {
        for call in tool_calls {
            let name = call.get("name").and_then(|v| v.as_str()).unwrap_or("unknown");
            let args = call.get("args").cloned().unwrap_or(Value::Null);
            body.push_str(&format!(
                "<pre class=\"tool-call\">{}</pre>\n",
                escape_html(&pretty_print_tool_call(name, &args))
            ));
        }
    }

    format!(
        "<div class=\"message {}\">\n<div class=\"role\">{}</div>\n{}</div>\n",
        escape_html(&message.role),
        escape_html(&message.role),
        body
    )
}

/// Escaped text with `**AGENT**` header lines bolded and newlines kept
/// as line breaks. No general markdown rendering; the transcripts only
/// rely on the header convention.
fn format_message_html(content: &str) -> String {
    let mut html_lines = Vec::new();
    for line in content.split('\n') {
        if line.starts_with("**") && line.ends_with("**") && line.len() > 4 {
            html_lines.push(format!(
                "<strong>{}</strong>",
                escape_html(line.trim_matches('*'))
            ));
        } else {
            html_lines.push(escape_html(line));
        }
    }
    html_lines.join("<br>")
}

pub fn render_page(title: &str, header: &str, banner: &str, sidebar: &str, chat: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>{} - Demo</title>\n<style>\n{}</style>\n</head>\n<body>\n\
         {}{}<div class=\"layout\">\n{}<main class=\"content\">\n{}</main>\n</div>\n</body>\n</html>\n",
        escape_html(title),
        PAGE_CSS,
        header,
        banner,
        sidebar,
        chat
    )
}
