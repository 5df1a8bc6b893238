use crate::debug_log::{DebugEntry, Severity};
use crate::transcript::{Block, ContentBlock, MessageContent, Record, RecordKind};
use crate::types::SUBAGENT_TOOL;
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

// ===================================================================
// Turns
// ===================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
    Debug,
}

/// One rendered unit of the conversation: a user or assistant message, or
/// a debug log entry merged in by timestamp.
#[derive(Debug, Clone)]
pub struct Turn {
    pub role: Role,
    pub content: MessageContent,
    pub timestamp: String,
    /// Only set on debug turns.
    pub level: Option<Severity>,
}

impl Turn {
    pub fn from_debug(entry: &DebugEntry) -> Self {
        Self {
            role: Role::Debug,
            content: MessageContent::Text(entry.text.clone()),
            timestamp: entry.timestamp.clone(),
            level: Some(entry.level),
        }
    }
}

/// Mainline turns and sidechain (abandoned branch) turns, each in file order.
#[derive(Debug, Default)]
pub struct Partition {
    pub main: Vec<Turn>,
    pub sidechain: Vec<Turn>,
}

impl Partition {
    pub fn is_empty(&self) -> bool {
        self.main.is_empty() && self.sidechain.is_empty()
    }

    pub fn len(&self) -> usize {
        self.main.len() + self.sidechain.len()
    }

    /// Main turns followed by sidechain turns.
    pub fn into_turns(self) -> Vec<Turn> {
        let mut turns = self.main;
        turns.extend(self.sidechain);
        turns
    }
}

// ===================================================================
// Message extraction
// ===================================================================

/// Extract user/assistant turns belonging to `session_id`.
///
/// Records without a session id are kept: subagent transcripts often omit it.
pub fn extract_messages(records: &[Record], session_id: &str) -> Partition {
    partition(records, Some(session_id))
}

/// Extract user/assistant turns without looking at session ids.
pub fn extract_messages_unfiltered(records: &[Record]) -> Partition {
    partition(records, None)
}

/// Filtered extraction, retried unfiltered if nothing matched. Subagent
/// transcripts don't always carry the parent's session id.
pub fn extract_with_fallback(records: &[Record], session_id: &str) -> Partition {
    let filtered = extract_messages(records, session_id);
    if filtered.is_empty() {
        extract_messages_unfiltered(records)
    } else {
        filtered
    }
}

fn partition(records: &[Record], session_id: Option<&str>) -> Partition {
    let mut out = Partition::default();
    for record in records {
        let kind_role = match record.kind {
            RecordKind::User => Role::User,
            RecordKind::Assistant => Role::Assistant,
            _ => continue,
        };
        if let (Some(wanted), Some(found)) = (session_id, record.session_id.as_deref()) {
            if !found.is_empty() && found != wanted {
                continue;
            }
        }
        let Some(message) = &record.message else {
            continue;
        };
        let role = match message.role.as_deref() {
            Some("user") => Role::User,
            Some("assistant") => Role::Assistant,
            _ => kind_role,
        };
        let turn = Turn {
            role,
            content: message.content.clone(),
            timestamp: record.timestamp.clone(),
            level: None,
        };
        if record.is_sidechain {
            out.sidechain.push(turn);
        } else {
            out.main.push(turn);
        }
    }
    out
}

// ===================================================================
// Tool result index
// ===================================================================

/// `tool_use_id` → result text, built from the user turns that carry
/// `tool_result` blocks.
///
/// Built in full before rendering starts, so a result resolves whether it
/// appears before or after its invocation.
#[derive(Debug, Default)]
pub struct ToolResults {
    by_id: HashMap<String, String>,
}

impl ToolResults {
    pub fn build(turns: &[Turn]) -> Self {
        let mut by_id = HashMap::new();
        for turn in turns.iter().filter(|t| t.role == Role::User) {
            let MessageContent::Blocks(blocks) = &turn.content else {
                continue;
            };
            for block in blocks {
                if let Block::Typed(ContentBlock::ToolResult(result)) = block {
                    if result.tool_use_id.is_empty() {
                        continue;
                    }
                    by_id.insert(result.tool_use_id.clone(), result_text(&result.content));
                }
            }
        }
        Self { by_id }
    }

    pub fn get(&self, tool_use_id: &str) -> Option<&str> {
        self.by_id.get(tool_use_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }
}

/// Text of a `tool_result` payload: a string as-is, a block list as its
/// text parts joined by newlines.
fn result_text(content: &Value) -> String {
    match content {
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.as_str()),
                Value::Object(obj) if obj.get("type").and_then(Value::as_str) == Some("text") => {
                    Some(obj.get("text").and_then(Value::as_str).unwrap_or(""))
                }
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n"),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

// ===================================================================
// Subagent metadata
// ===================================================================

/// What the spawning `Task` call said about a subagent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentInfo {
    pub agent_type: String,
    pub description: String,
}

/// Map subagent ids to the `Task` call that spawned them.
///
/// Task `tool_use` blocks are keyed by their id. Progress records carry
/// `data.agentId` plus `parentToolUseID` pointing at that id, which joins
/// the two. The first record seen for an agent wins.
pub fn build_agent_info(records: &[Record]) -> HashMap<String, AgentInfo> {
    let mut spawns: HashMap<&str, AgentInfo> = HashMap::new();
    for record in records.iter().filter(|r| r.kind == RecordKind::Assistant) {
        let Some(MessageContent::Blocks(blocks)) = record.message.as_ref().map(|m| &m.content)
        else {
            continue;
        };
        for block in blocks {
            let Block::Typed(ContentBlock::ToolUse(tool_use)) = block else {
                continue;
            };
            if tool_use.name != SUBAGENT_TOOL {
                continue;
            }
            let field = |name: &str| tool_use.input.get(name).and_then(Value::as_str);
            spawns.insert(
                tool_use.id.as_str(),
                AgentInfo {
                    agent_type: field("subagent_type").unwrap_or("unknown").to_string(),
                    description: field("description").unwrap_or("").to_string(),
                },
            );
        }
    }

    let mut agents = HashMap::new();
    for record in records {
        let Some(data) = &record.data else {
            continue;
        };
        let Some(agent_id) = data.agent_id.as_deref() else {
            continue;
        };
        if agent_id.is_empty() || agents.contains_key(agent_id) {
            continue;
        }
        let parent = record.parent_tool_use_id.as_deref().unwrap_or("");
        if let Some(info) = spawns.get(parent) {
            debug!(agent_id, parent, progress = ?data.progress_type, "linked subagent to Task call");
            agents.insert(agent_id.to_string(), info.clone());
        }
    }
    agents
}
