use anyhow::{Context, Result};
use serde::de::{DeserializeOwned, Deserializer};
use serde::Deserialize;
use serde_json::Value;
use std::fs;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use tracing::debug;

/// Text Claude Code puts in the first user message after a compaction.
pub const COMPACTION_MARKER: &str =
    "This session is being continued from a previous conversation";

/// Deserialize a field, treating a value of the wrong shape as absent.
///
/// The transcript schema drifts between Claude Code versions. One odd field
/// should cost that field, not the whole record.
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

// ===================================================================
// Record: one per JSONL line
// ===================================================================

/// The `type` tag of a transcript line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecordKind {
    User,
    Assistant,
    Progress,
    System,
    QueueOperation,
    FileHistorySnapshot,
    /// Any tag we don't know about, or a missing one.
    #[default]
    #[serde(other)]
    Other,
}

/// A single line in a Claude Code `.jsonl` transcript file.
///
/// Only the fields the export needs are kept. Every field is optional and
/// lenient so that any JSON object produces a record.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    #[serde(rename = "type", default, deserialize_with = "lenient")]
    pub kind: RecordKind,
    #[serde(default, deserialize_with = "lenient")]
    pub timestamp: String,
    #[serde(default, deserialize_with = "lenient")]
    pub session_id: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub is_sidechain: bool,
    #[serde(rename = "parentToolUseID", default, deserialize_with = "lenient")]
    pub parent_tool_use_id: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub message: Option<Message>,
    #[serde(default, deserialize_with = "lenient")]
    pub data: Option<ProgressData>,
}

/// `data` on progress records. Subagent progress carries the agent id.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressData {
    #[serde(rename = "type", default, deserialize_with = "lenient")]
    pub progress_type: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub agent_id: Option<String>,
}

// ===================================================================
// Message
// ===================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Message {
    #[serde(default, deserialize_with = "lenient")]
    pub role: Option<String>,
    #[serde(default)]
    pub content: MessageContent,
}

/// `message.content` can be a plain string (user text) or an array of
/// content blocks (assistant responses, tool results). Anything else is
/// kept as raw JSON.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Blocks(Vec<Block>),
    Other(Value),
}

impl Default for MessageContent {
    fn default() -> Self {
        MessageContent::Text(String::new())
    }
}

impl MessageContent {
    /// Plain text of the content: the string itself, or the text and raw
    /// string blocks joined by newlines.
    pub fn text(&self) -> String {
        match self {
            MessageContent::Text(t) => t.clone(),
            MessageContent::Blocks(blocks) => blocks
                .iter()
                .filter_map(Block::as_text)
                .collect::<Vec<_>>()
                .join("\n"),
            MessageContent::Other(Value::Null) => String::new(),
            MessageContent::Other(v) => v.to_string(),
        }
    }

    /// True if any part of the content is non-blank human-readable text.
    pub fn has_visible_text(&self) -> bool {
        match self {
            MessageContent::Text(t) => !t.trim().is_empty(),
            MessageContent::Blocks(blocks) => blocks
                .iter()
                .filter_map(Block::as_text)
                .any(|t| !t.trim().is_empty()),
            MessageContent::Other(v) => !v.is_null(),
        }
    }
}

// ===================================================================
// Content blocks inside message.content[]
// ===================================================================

/// One element of a block list. Bare strings occasionally show up in place
/// of `{"type": "text"}` objects; anything unrecognisable is kept opaque.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Block {
    Raw(String),
    Typed(ContentBlock),
    Opaque(Value),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text(TextBlock),
    ToolUse(ToolUseBlock),
    ToolResult(ToolResultBlock),
    /// thinking, image, redacted_thinking, ...
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TextBlock {
    #[serde(default, deserialize_with = "lenient")]
    pub text: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ToolUseBlock {
    #[serde(default, deserialize_with = "lenient")]
    pub id: String,
    #[serde(default = "unknown_tool", deserialize_with = "lenient")]
    pub name: String,
    #[serde(default)]
    pub input: Value,
}

fn unknown_tool() -> String {
    "unknown".into()
}

#[derive(Debug, Clone, Deserialize)]
pub struct ToolResultBlock {
    #[serde(default, deserialize_with = "lenient")]
    pub tool_use_id: String,
    #[serde(default)]
    pub content: Value,
}

impl Block {
    /// The text of a text block or a bare string block.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Block::Raw(s) => Some(s),
            Block::Typed(ContentBlock::Text(t)) => Some(&t.text),
            _ => None,
        }
    }
}

// ===================================================================
// Transcript: parsed JSONL in file order
// ===================================================================

/// A parsed Claude Code JSONL transcript.
#[derive(Debug, Default)]
pub struct Transcript {
    records: Vec<Record>,
}

impl Transcript {
    /// Parse a JSONL transcript string. Returns the transcript and any
    /// lines that failed to parse (with 1-based line number and error).
    pub fn parse(contents: &str) -> (Self, Vec<(usize, String)>) {
        Self::parse_bytes(contents.as_bytes())
    }

    /// Like [`Transcript::parse`], but each line is decoded on its own so a
    /// line with invalid UTF-8 (a write cut mid-character) is skipped
    /// instead of failing the whole file.
    pub fn parse_bytes(contents: &[u8]) -> (Self, Vec<(usize, String)>) {
        let mut records = Vec::new();
        let mut errors = Vec::new();

        for (i, line) in contents.split(|&b| b == b'\n').enumerate() {
            let Ok(line) = std::str::from_utf8(line) else {
                errors.push((i + 1, "invalid UTF-8".to_string()));
                continue;
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<Value>(line) {
                Ok(val) if val.is_object() => match serde_json::from_value::<Record>(val) {
                    Ok(record) => records.push(record),
                    Err(e) => errors.push((i + 1, format!("{e}"))),
                },
                Ok(_) => errors.push((i + 1, "not a JSON object".to_string())),
                Err(e) => errors.push((i + 1, format!("{e}"))),
            }
        }

        (Self { records }, errors)
    }

    /// All records in file order.
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Index of the last user record carrying the compaction marker, or 0
    /// if the session was never compacted.
    pub fn compaction_index(&self) -> usize {
        compaction_index(&self.records)
    }

    /// Records from the last compaction onward.
    pub fn current_segment(&self) -> &[Record] {
        &self.records[self.compaction_index()..]
    }
}

/// Index of the last user record whose text contains
/// [`COMPACTION_MARKER`]. Later compactions supersede earlier ones.
pub fn compaction_index(records: &[Record]) -> usize {
    let mut last = 0;
    for (i, record) in records.iter().enumerate() {
        if record.kind != RecordKind::User {
            continue;
        }
        let Some(message) = &record.message else {
            continue;
        };
        if message.content.text().contains(COMPACTION_MARKER) {
            last = i;
        }
    }
    last
}

/// Read and parse a transcript file. Malformed lines are skipped.
pub fn read_transcript(path: &Path) -> Result<Transcript> {
    let contents =
        fs::read(path).with_context(|| format!("reading transcript {}", path.display()))?;
    let (transcript, errors) = Transcript::parse_bytes(&contents);
    for (line, err) in &errors {
        debug!(path = %path.display(), line, error = %err, "skipping transcript line");
    }
    Ok(transcript)
}

/// Timestamp of the first record in `path` that has one, reading only as
/// far as needed.
pub fn first_timestamp(path: &Path) -> io::Result<Option<String>> {
    let reader = BufReader::new(fs::File::open(path)?);
    for line in reader.split(b'\n') {
        let line = line?;
        let Ok(Value::Object(map)) = serde_json::from_slice::<Value>(&line) else {
            continue;
        };
        if let Some(ts) = map.get("timestamp").and_then(Value::as_str) {
            if !ts.is_empty() {
                return Ok(Some(ts.to_string()));
            }
        }
    }
    Ok(None)
}
