mod tools;

use crate::conversation::{AgentInfo, Role, ToolResults, Turn};
use crate::debug_log::Severity;
use crate::sanitize::{sanitize, split_chars};
use crate::transcript::{Block, ContentBlock, MessageContent, TextBlock, ToolUseBlock};
use crate::types::ToolCall;
use chrono::{DateTime, Local, NaiveDateTime};

/// Cap for message text.
pub const DEFAULT_TEXT_LIMIT: usize = 3000;
/// Cap for tool inputs, tool results and debug bodies.
pub const DEFAULT_TOOL_LIMIT: usize = 2000;

const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Per-kind character limits passed to the sanitizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub text: usize,
    pub tool: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            text: DEFAULT_TEXT_LIMIT,
            tool: DEFAULT_TOOL_LIMIT,
        }
    }
}

/// Render an ISO-8601 timestamp as local time. Falls back to the raw string
/// if it doesn't parse.
pub fn format_timestamp(iso: &str) -> String {
    if iso.is_empty() {
        return String::new();
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(iso) {
        return dt.with_timezone(&Local).format(DISPLAY_FORMAT).to_string();
    }
    // No offset: already local wall-clock time.
    if let Ok(naive) = NaiveDateTime::parse_from_str(iso, "%Y-%m-%dT%H:%M:%S%.f") {
        return naive.format(DISPLAY_FORMAT).to_string();
    }
    iso.to_string()
}

// ===================================================================
// Turn renderer
// ===================================================================

/// Renders turns as Markdown lines, resolving tool results from a
/// prebuilt index.
pub struct Renderer<'a> {
    results: &'a ToolResults,
    limits: Limits,
}

impl<'a> Renderer<'a> {
    pub fn new(results: &'a ToolResults, limits: Limits) -> Self {
        Self { results, limits }
    }

    pub fn render_turns(&self, turns: &[Turn], out: &mut Vec<String>) {
        for turn in turns {
            let ts = format_timestamp(&turn.timestamp);
            let ts_label = if ts.is_empty() {
                String::new()
            } else {
                format!("  *[{ts}]*")
            };
            let rendered = match turn.role {
                Role::User => self.render_user(turn, &ts_label, out),
                Role::Assistant => {
                    self.render_assistant(turn, &ts_label, out);
                    true
                }
                Role::Debug => {
                    self.render_debug(turn, &ts_label, out);
                    true
                }
            };
            if rendered {
                out.push(String::new());
            }
        }
    }

    /// User turns that only carry tool results are skipped; their content
    /// shows up under the matching tool call instead.
    fn render_user(&self, turn: &Turn, ts_label: &str, out: &mut Vec<String>) -> bool {
        if !turn.content.has_visible_text() {
            return false;
        }
        out.push(format!("## USER{ts_label}\n"));
        out.push(format!("{}\n", sanitize(&turn.content.text(), self.limits.text)));
        true
    }

    fn render_assistant(&self, turn: &Turn, ts_label: &str, out: &mut Vec<String>) {
        out.push(format!("## ASSISTANT{ts_label}\n"));
        match &turn.content {
            MessageContent::Blocks(blocks) => {
                for block in blocks {
                    match block {
                        Block::Raw(text) | Block::Typed(ContentBlock::Text(TextBlock { text })) => {
                            self.push_text(text, out)
                        }
                        Block::Typed(ContentBlock::ToolUse(tool_use)) => {
                            self.render_tool_use(tool_use, out)
                        }
                        _ => {}
                    }
                }
            }
            other => self.push_text(&other.text(), out),
        }
    }

    fn push_text(&self, text: &str, out: &mut Vec<String>) {
        if !text.trim().is_empty() {
            out.push(format!("{}\n", sanitize(text, self.limits.text)));
        }
    }

    /// A collapsible block with the tool summary, its input, and its result
    /// if one was indexed. Subagent spawns start expanded.
    fn render_tool_use(&self, tool_use: &ToolUseBlock, out: &mut Vec<String>) {
        let call = ToolCall::parse(&tool_use.name, &tool_use.input);
        out.push(if call.is_subagent_spawn() { "<details open>" } else { "<details>" }.to_string());
        out.push(format!("<summary>{}</summary>\n", call.summary()));

        out.push("**Input:**\n".to_string());
        let input = call.formatted_input(&tool_use.input);
        out.push(format!("{}\n", sanitize(&input, self.limits.tool)));

        if let Some(result) = self.results.get(&tool_use.id).filter(|r| !r.is_empty()) {
            out.push("**Result:**\n".to_string());
            out.push(format!("{}\n", sanitize(result, self.limits.tool)));
        }

        out.push("</details>\n".to_string());
    }

    fn render_debug(&self, turn: &Turn, ts_label: &str, out: &mut Vec<String>) {
        let level = turn.level.unwrap_or(Severity::Debug);
        let text = turn.content.text();
        let first_line = split_chars(text.lines().next().unwrap_or(""), 120).0;
        out.push("<details>".to_string());
        out.push(format!(
            "<summary><strong>[{level}]</strong>{ts_label} {first_line}</summary>\n"
        ));
        out.push(format!("```\n{}\n```\n", sanitize(&text, self.limits.tool)));
        out.push("</details>\n".to_string());
    }
}

// ===================================================================
// Top-level collapsed sections
// ===================================================================

/// Abandoned-branch turns, collapsed. Renders nothing if there are none.
pub fn render_sidechain(turns: &[Turn], limits: Limits, out: &mut Vec<String>) {
    if turns.is_empty() {
        return;
    }
    let results = ToolResults::build(turns);
    out.push(String::new());
    out.push("<details>".to_string());
    out.push(format!(
        "<summary><strong>Sidechain messages (abandoned branches) -- {} entries</strong></summary>\n",
        turns.len()
    ));
    Renderer::new(&results, limits).render_turns(turns, out);
    out.push("</details>\n".to_string());
}

/// One subagent transcript, collapsed, labelled with what its spawning
/// `Task` call said about it.
pub fn render_agent(
    agent_id: &str,
    info: Option<&AgentInfo>,
    turns: &[Turn],
    limits: Limits,
    out: &mut Vec<String>,
) {
    if turns.is_empty() {
        return;
    }
    let agent_type = info.map_or("unknown", |i| i.agent_type.as_str());
    let mut label = format!("Agent `{agent_id}` ({agent_type})");
    if let Some(desc) = info.map(|i| i.description.as_str()).filter(|d| !d.is_empty()) {
        label.push_str(&format!(" -- {desc}"));
    }
    label.push_str(&format!(" [{} messages]", turns.len()));

    let results = ToolResults::build(turns);
    out.push("<details>".to_string());
    out.push(format!("<summary><strong>{label}</strong></summary>\n"));
    Renderer::new(&results, limits).render_turns(turns, out);
    out.push("</details>\n".to_string());
}
