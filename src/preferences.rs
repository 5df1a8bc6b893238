use crate::debug_log::{Severity, default_levels};
use crate::render::{DEFAULT_TEXT_LIMIT, DEFAULT_TOOL_LIMIT, Limits};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub const FILENAME: &str = "claudexport.toml";

/// Built-in document header. Rendered with the same variables a custom
/// template gets.
pub const DEFAULT_HEADER: &str = "\
# Claude Code Session Export

- **Session ID:** `{{ session_id }}`
- **Exported:** {{ exported_at }}
- **Transcript:** `{{ transcript }}`
{% if trigger %}- **Trigger:** {{ trigger }}
{% endif %}{% if compacted %}- **Note:** prior compactions detected; exporting only current segment
{% endif %}{% if segment_start %}- **Segment start:** {{ segment_start }}
{% endif %}{% if subagent_count %}- **Subagent transcripts:** {{ subagent_count }}
{% endif %}{% if debug_count %}- **Debug log entries ({{ debug_levels }}):** {{ debug_count }}
{% endif %}";

/// Header template: either an inline minijinja string or a path to a
/// template file (relative to `.claude/`).
///
/// ```toml
/// [header_template]
/// inline = "# {{ session_id }}"
///
/// # or
///
/// [header_template]
/// file = "export-header.tmpl"
/// ```
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum HeaderTemplate {
    Inline(String),
    File(String),
}

impl Default for HeaderTemplate {
    fn default() -> Self {
        HeaderTemplate::Inline(DEFAULT_HEADER.into())
    }
}

impl HeaderTemplate {
    /// Template source text. `dir` is the `.claude/` directory file
    /// references are resolved against.
    pub fn source(&self, dir: &Path) -> Result<String> {
        match self {
            HeaderTemplate::Inline(s) => Ok(s.clone()),
            HeaderTemplate::File(filename) => {
                let path = dir.join(filename);
                fs::read_to_string(&path)
                    .with_context(|| format!("reading template {}", path.display()))
            }
        }
    }
}

/// Export settings stored in `.claude/claudexport.toml`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Preferences {
    /// Character cap for message text.
    #[serde(default = "default_text_limit")]
    pub text_limit: usize,

    /// Character cap for tool inputs, results and debug bodies.
    #[serde(default = "default_tool_limit")]
    pub tool_limit: usize,

    /// Debug log severities to include.
    #[serde(default = "default_debug_levels")]
    pub debug_levels: Vec<String>,

    /// Output directory, relative to the project directory unless absolute.
    #[serde(default = "default_export_dir")]
    pub export_dir: PathBuf,

    /// Where `<session_id>.txt` debug logs live. Defaults to `~/.claude/debug`.
    #[serde(default)]
    pub debug_dir: Option<PathBuf>,

    #[serde(default = "default_true")]
    pub include_subagents: bool,

    #[serde(default = "default_true")]
    pub include_debug: bool,

    #[serde(default)]
    pub header_template: HeaderTemplate,
}

fn default_text_limit() -> usize {
    DEFAULT_TEXT_LIMIT
}

fn default_tool_limit() -> usize {
    DEFAULT_TOOL_LIMIT
}

fn default_debug_levels() -> Vec<String> {
    default_levels().iter().rev().map(|s| s.to_string()).collect()
}

fn default_export_dir() -> PathBuf {
    PathBuf::from(".claude").join("chat_history")
}

fn default_true() -> bool {
    true
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            text_limit: default_text_limit(),
            tool_limit: default_tool_limit(),
            debug_levels: default_debug_levels(),
            export_dir: default_export_dir(),
            debug_dir: None,
            include_subagents: true,
            include_debug: true,
            header_template: HeaderTemplate::default(),
        }
    }
}

impl Preferences {
    /// Load preferences from `<dir>/claudexport.toml`.
    ///
    /// A missing file means defaults; nothing is written. Missing keys in an
    /// existing file are filled in with defaults via serde.
    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(FILENAME);
        match fs::read_to_string(&path) {
            Ok(contents) => {
                let prefs: Preferences = toml::from_str(&contents)
                    .with_context(|| format!("parsing {}", path.display()))?;
                Ok(prefs)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Preferences::default()),
            Err(e) => Err(e).with_context(|| format!("reading {}", path.display())),
        }
    }

    pub fn limits(&self) -> Limits {
        Limits {
            text: self.text_limit,
            tool: self.tool_limit,
        }
    }

    /// The configured debug severities. An unknown name is an error.
    pub fn severities(&self) -> Result<BTreeSet<Severity>> {
        parse_levels(&self.debug_levels)
    }
}

/// Parse severity names such as `["ERROR", "warn"]`.
pub fn parse_levels<S: AsRef<str>>(names: &[S]) -> Result<BTreeSet<Severity>> {
    names
        .iter()
        .map(|n| n.as_ref().trim())
        .filter(|n| !n.is_empty())
        .map(|n| n.parse::<Severity>().context("parsing debug levels"))
        .collect()
}
