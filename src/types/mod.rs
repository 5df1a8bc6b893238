use serde::Deserialize;
use std::fmt;

// ===================================================================
// Hook Input (received via stdin, snake_case JSON)
// ===================================================================

/// Compaction trigger (used by PreCompact).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompactTrigger {
    Manual,
    Auto,
    #[serde(other)]
    Other,
}

impl fmt::Display for CompactTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompactTrigger::Manual => f.write_str("manual"),
            CompactTrigger::Auto => f.write_str("auto"),
            CompactTrigger::Other => f.write_str("other"),
        }
    }
}

/// Hook payload read from stdin.
///
/// Written for PreCompact, but every field is optional so the binary can
/// also be wired to SessionEnd or driven by hand with a partial payload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HookInput {
    #[serde(default)]
    pub hook_event_name: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub transcript_path: Option<String>,
    #[serde(default)]
    pub cwd: Option<String>,
    #[serde(default)]
    pub trigger: Option<CompactTrigger>,
    #[serde(default)]
    pub custom_instructions: Option<String>,
}

// ===================================================================
// Tool-Specific Input Types
// ===================================================================

/// Name of the tool that spawns a subagent.
pub const SUBAGENT_TOOL: &str = "Task";

/// Parsed tool call, matching the tool name to a typed input.
#[derive(Debug, Clone)]
pub enum ToolCall {
    Bash(BashToolInput),
    Write(WriteToolInput),
    Edit(EditToolInput),
    Read(ReadToolInput),
    Glob(GlobToolInput),
    Grep(GrepToolInput),
    WebFetch(WebFetchToolInput),
    WebSearch(WebSearchToolInput),
    Task(TaskToolInput),
    /// MCP or other unknown tools, or a known tool whose input didn't fit.
    Other { tool_name: String },
}

impl ToolCall {
    /// Parse a `tool_use` name + input. Never fails: input that doesn't fit
    /// the known shape falls back to `Other`.
    pub fn parse(tool_name: &str, tool_input: &serde_json::Value) -> Self {
        fn typed<T: serde::de::DeserializeOwned>(
            input: &serde_json::Value,
            wrap: fn(T) -> ToolCall,
        ) -> Option<ToolCall> {
            serde_json::from_value(input.clone()).ok().map(wrap)
        }

        let parsed = match tool_name {
            "Bash" => typed(tool_input, Self::Bash),
            "Write" => typed(tool_input, Self::Write),
            "Edit" => typed(tool_input, Self::Edit),
            "Read" => typed(tool_input, Self::Read),
            "Glob" => typed(tool_input, Self::Glob),
            "Grep" => typed(tool_input, Self::Grep),
            "WebFetch" => typed(tool_input, Self::WebFetch),
            "WebSearch" => typed(tool_input, Self::WebSearch),
            SUBAGENT_TOOL => typed(tool_input, Self::Task),
            _ => None,
        };
        parsed.unwrap_or_else(|| Self::Other {
            tool_name: tool_name.to_string(),
        })
    }

    /// Subagent spawns are the interesting branches of a session.
    pub fn is_subagent_spawn(&self) -> bool {
        matches!(self, Self::Task(_))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BashToolInput {
    pub command: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WriteToolInput {
    pub file_path: String,
    pub content: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EditToolInput {
    pub file_path: String,
    pub old_string: String,
    pub new_string: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReadToolInput {
    pub file_path: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GlobToolInput {
    pub pattern: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GrepToolInput {
    pub pattern: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WebFetchToolInput {
    pub url: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WebSearchToolInput {
    pub query: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TaskToolInput {
    pub prompt: String,
    pub description: String,
    pub subagent_type: Option<String>,
}
