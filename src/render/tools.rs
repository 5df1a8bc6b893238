use crate::sanitize::{split_chars, truncate_chars};
use crate::types::ToolCall;
use std::path::Path;

/// Write bodies longer than this are cut in the input view.
const WRITE_PREVIEW: usize = 500;
/// Subagent prompts longer than this are cut in the input view.
const PROMPT_PREVIEW: usize = 1000;
/// Cap for the JSON dump of tools without a dedicated view.
const JSON_PREVIEW: usize = 500;

/// Strip a path down to its file name.
fn file_name(path: &str) -> &str {
    Path::new(path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(path)
}

/// `text`, with anything past `max` chars replaced by a count.
fn preview(text: &str, max: usize) -> String {
    match split_chars(text, max) {
        (head, 0) => head.to_string(),
        (head, rest) => format!("{head}\n... [{rest} more chars]"),
    }
}

impl ToolCall {
    /// One-line label for the `<summary>` of the tool's details block.
    pub fn summary(&self) -> String {
        match self {
            ToolCall::Bash(b) => match b.description.as_deref() {
                Some(desc) if !desc.is_empty() => format!("Tool: Bash -- {desc}"),
                _ => format!("Tool: Bash -- `{}`", truncate_chars(&b.command, 80)),
            },
            ToolCall::Read(r) => format!("Tool: Read -- `{}`", file_name(&r.file_path)),
            ToolCall::Write(w) => format!("Tool: Write -- `{}`", file_name(&w.file_path)),
            ToolCall::Edit(e) => format!("Tool: Edit -- `{}`", file_name(&e.file_path)),
            ToolCall::Glob(g) => format!("Tool: Glob -- `{}`", g.pattern),
            ToolCall::Grep(g) => format!("Tool: Grep -- `{}`", g.pattern),
            ToolCall::Task(t) => format!(
                "Subagent ({}): {}",
                t.subagent_type.as_deref().unwrap_or("unknown"),
                t.description
            ),
            ToolCall::WebFetch(w) => {
                format!("Tool: WebFetch -- `{}`", split_chars(&w.url, 60).0)
            }
            ToolCall::WebSearch(w) => format!("Tool: WebSearch -- `{}`", w.query),
            ToolCall::Other { tool_name } => format!("Tool: {tool_name}"),
        }
    }

    /// Markdown view of the tool input. Tools without a dedicated view get
    /// a size-capped JSON dump of `raw`.
    pub fn formatted_input(&self, raw: &serde_json::Value) -> String {
        match self {
            ToolCall::Bash(b) => {
                let mut out = String::new();
                if let Some(desc) = b.description.as_deref().filter(|d| !d.is_empty()) {
                    out.push_str(&format!("*{desc}*\n\n"));
                }
                out.push_str(&format!("```bash\n{}\n```", b.command));
                out
            }
            ToolCall::Edit(e) => format!(
                "**File:** `{}`\n\n**Old:**\n```\n{}\n```\n\n**New:**\n```\n{}\n```",
                e.file_path, e.old_string, e.new_string
            ),
            ToolCall::Write(w) => format!(
                "**File:** `{}`\n\n```\n{}\n```",
                w.file_path,
                preview(&w.content, WRITE_PREVIEW)
            ),
            ToolCall::Task(t) => format!(
                "**Agent:** `{}` | **Description:** {}\n\n{}",
                t.subagent_type.as_deref().unwrap_or(""),
                t.description,
                preview(&t.prompt, PROMPT_PREVIEW)
            ),
            _ => {
                let dumped = serde_json::to_string_pretty(raw).unwrap_or_else(|_| raw.to_string());
                let dumped = match split_chars(&dumped, JSON_PREVIEW) {
                    (head, 0) => head.to_string(),
                    (head, _) => format!("{head}\n... [truncated]"),
                };
                format!("```json\n{dumped}\n```")
            }
        }
    }
}
