use crate::conversation::{
    AgentInfo, ToolResults, build_agent_info, extract_messages, extract_with_fallback,
};
use crate::debug_log::{DebugEntry, Severity, read_debug_log};
use crate::error::ExportError;
use crate::merge::{SessionWindow, merge_debug_entries};
use crate::preferences::Preferences;
use crate::render::{Limits, Renderer, format_timestamp, render_agent, render_sidechain};
use crate::transcript::{first_timestamp, read_transcript};
use crate::types::CompactTrigger;
use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use minijinja::{Environment, context};
use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Expand a leading `~` to the home directory.
pub fn expand_home(path: &str) -> PathBuf {
    let rest = match path.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => rest.trim_start_matches('/'),
        _ => return PathBuf::from(path),
    };
    match dirs::home_dir() {
        Some(home) if rest.is_empty() => home,
        Some(home) => home.join(rest),
        None => PathBuf::from(path),
    }
}

/// Everything one export run needs, resolved from the hook payload and the
/// command line.
#[derive(Debug, Clone)]
pub struct ExportRequest {
    pub session_id: String,
    pub transcript: Option<PathBuf>,
    /// Project directory. Preferences and the default output directory are
    /// resolved against it.
    pub cwd: PathBuf,
    pub trigger: Option<CompactTrigger>,
    pub output_dir: Option<PathBuf>,
    pub debug_log: Option<PathBuf>,
    /// Overrides the `debug_levels` preference.
    pub levels: Option<BTreeSet<Severity>>,
    pub skip_subagents: bool,
    pub skip_debug: bool,
}

impl ExportRequest {
    pub fn new(session_id: impl Into<String>, transcript: Option<PathBuf>, cwd: PathBuf) -> Self {
        Self {
            session_id: session_id.into(),
            transcript,
            cwd,
            trigger: None,
            output_dir: None,
            debug_log: None,
            levels: None,
            skip_subagents: false,
            skip_debug: false,
        }
    }
}

pub struct Exporter {
    request: ExportRequest,
    /// `<cwd>/.claude`, where preferences and header templates live.
    dir: PathBuf,
    pub prefs: Preferences,
}

impl Exporter {
    /// Load preferences for the request's project directory and return an
    /// `Exporter` ready to run.
    pub fn open(request: ExportRequest) -> Result<Self> {
        let dir = request.cwd.join(".claude");
        let prefs = Preferences::load(&dir)?;
        Ok(Self {
            request,
            dir,
            prefs,
        })
    }

    // ---------------------------------------------------------------
    // Private path helpers
    // ---------------------------------------------------------------

    fn transcript_path(&self) -> Result<&Path> {
        match self.request.transcript.as_deref() {
            Some(path) if path.exists() => Ok(path),
            _ => Err(ExportError::NoTranscript.into()),
        }
    }

    /// `<dir(transcript)>/<session_id>/subagents`.
    fn subagents_dir(&self, transcript: &Path) -> PathBuf {
        transcript
            .parent()
            .unwrap_or(Path::new(""))
            .join(&self.request.session_id)
            .join("subagents")
    }

    /// Explicit path, else `<debug_dir>/<session_id>.txt` with `debug_dir`
    /// defaulting to `~/.claude/debug`.
    fn debug_log_path(&self) -> Option<PathBuf> {
        if let Some(path) = &self.request.debug_log {
            return Some(path.clone());
        }
        let dir = match &self.prefs.debug_dir {
            Some(dir) => dir.clone(),
            None => dirs::home_dir()?.join(".claude").join("debug"),
        };
        Some(dir.join(format!("{}.txt", self.request.session_id)))
    }

    fn export_dir(&self) -> PathBuf {
        let dir = self
            .request
            .output_dir
            .as_ref()
            .unwrap_or(&self.prefs.export_dir);
        self.request.cwd.join(dir)
    }

    fn limits(&self) -> Limits {
        self.prefs.limits()
    }

    fn levels(&self) -> Result<BTreeSet<Severity>> {
        match &self.request.levels {
            Some(levels) => Ok(levels.clone()),
            None => self.prefs.severities(),
        }
    }

    // ---------------------------------------------------------------
    // Auxiliary sources
    // ---------------------------------------------------------------

    /// `agent-*.jsonl` files next to the transcript, sorted by path.
    fn subagent_files(&self, transcript: &Path) -> Vec<PathBuf> {
        if self.request.skip_subagents || !self.prefs.include_subagents {
            return Vec::new();
        }
        let dir = self.subagents_dir(transcript);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) => {
                if e.kind() != io::ErrorKind::NotFound {
                    debug!(dir = %dir.display(), error = %e, "skipping unreadable subagent directory");
                }
                return Vec::new();
            }
        };
        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with("agent-") && n.ends_with(".jsonl"))
            })
            .collect();
        files.sort();
        files
    }

    fn debug_entries(&self, window: &SessionWindow) -> Result<Vec<DebugEntry>> {
        if self.request.skip_debug || !self.prefs.include_debug {
            return Ok(Vec::new());
        }
        let Some(path) = self.debug_log_path() else {
            return Ok(Vec::new());
        };
        let filter = window.debug_filter(self.levels()?);
        match read_debug_log(&path, &filter) {
            Ok(Some(entries)) => Ok(entries),
            Ok(None) => {
                debug!(path = %path.display(), "no debug log");
                Ok(Vec::new())
            }
            Err(err) => {
                debug!(error = %format!("{err:#}"), "skipping unreadable debug log");
                Ok(Vec::new())
            }
        }
    }

    // ---------------------------------------------------------------
    // Header
    // ---------------------------------------------------------------

    fn render_header(&self, vars: HeaderVars<'_>) -> Result<String> {
        let source = self.prefs.header_template.source(&self.dir)?;
        render_header(&source, vars)
    }

    // ---------------------------------------------------------------
    // Document
    // ---------------------------------------------------------------

    /// Assemble the full Markdown export.
    pub fn build_document(&self, now: DateTime<Local>) -> Result<String> {
        let transcript_path = self.transcript_path()?;
        let transcript = read_transcript(transcript_path)?;
        if transcript.is_empty() {
            return Err(ExportError::EmptyTranscript.into());
        }

        let compact_idx = transcript.compaction_index();
        let segment = transcript.current_segment();
        info!(
            records = transcript.records().len(),
            segment = segment.len(),
            compact_idx,
            "located current segment"
        );

        let session_id = self.request.session_id.as_str();
        let partition = extract_messages(segment, session_id);
        if partition.is_empty() {
            return Err(ExportError::NoMessages.into());
        }
        let agents = build_agent_info(segment);

        let window = SessionWindow::of(segment);
        let agent_files = admit_agents(self.subagent_files(transcript_path), &window);
        let debug_entries = self.debug_entries(&window)?;
        info!(
            messages = partition.len(),
            sidechain = partition.sidechain.len(),
            subagents = agent_files.len(),
            debug = debug_entries.len(),
            "collected sources"
        );

        let levels = self.levels()?;
        let header = self.render_header(HeaderVars {
            session_id,
            exported_at: now.format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
            transcript: transcript_path,
            compacted: compact_idx > 0,
            segment_start: format_timestamp(&window.start),
            subagent_count: agent_files.len(),
            debug_count: debug_entries.len(),
            debug_levels: levels_label(&levels),
            trigger: self.request.trigger.as_ref().map(|t| t.to_string()),
        })?;

        let mut out = vec![header.trim_end().to_string(), String::new(), "---\n".to_string()];

        let limits = self.limits();
        let main = merge_debug_entries(partition.main, &debug_entries);
        let results = ToolResults::build(&main);
        debug!(tool_results = results.len(), "indexed tool results");
        Renderer::new(&results, limits).render_turns(&main, &mut out);

        render_sidechain(&partition.sidechain, limits, &mut out);

        if !agent_files.is_empty() {
            self.render_subagents(&agent_files, &agents, &mut out);
        }

        Ok(out.join("\n"))
    }

    fn render_subagents(
        &self,
        files: &[PathBuf],
        agents: &HashMap<String, AgentInfo>,
        out: &mut Vec<String>,
    ) {
        out.push(String::new());
        out.push("---\n".to_string());
        out.push(format!("# Subagent Transcripts ({})\n", files.len()));

        for path in files {
            let id = agent_id(path);
            let transcript = match read_transcript(path) {
                Ok(t) => t,
                Err(err) => {
                    debug!(error = %format!("{err:#}"), "skipping subagent transcript");
                    continue;
                }
            };
            let turns =
                extract_with_fallback(transcript.records(), &self.request.session_id).into_turns();
            if turns.is_empty() {
                debug!(agent = %id, "subagent transcript has no messages");
            }
            render_agent(&id, agents.get(&id), &turns, self.limits(), out);
        }
    }

    // ---------------------------------------------------------------
    // Output
    // ---------------------------------------------------------------

    /// Write `document` to `<export_dir>/export-YYYYMMDD-HHMMSS.md`,
    /// creating the directory if needed.
    pub fn write(&self, document: &str, now: DateTime<Local>) -> Result<PathBuf> {
        let dir = self.export_dir();
        fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;
        let path = dir.join(format!("export-{}.md", now.format("%Y%m%d-%H%M%S")));
        fs::write(&path, document).with_context(|| format!("writing {}", path.display()))?;
        info!(path = %path.display(), bytes = document.len(), "wrote export");
        Ok(path)
    }

    /// Build the document and write it. Returns the output path.
    pub fn run(&self) -> Result<PathBuf> {
        let now = Local::now();
        let document = self.build_document(now)?;
        self.write(&document, now)
    }
}

/// Agent id from `agent-<id>.jsonl`.
fn agent_id(path: &Path) -> String {
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("");
    stem.strip_prefix("agent-").unwrap_or(stem).to_string()
}

/// Keep subagent files whose first timestamp falls inside the window.
fn admit_agents(files: Vec<PathBuf>, window: &SessionWindow) -> Vec<PathBuf> {
    if window.is_empty() {
        return files;
    }
    files
        .into_iter()
        .filter(|path| match first_timestamp(path) {
            Ok(ts) => {
                let keep = window.admits_agent(ts.as_deref());
                if !keep {
                    debug!(path = %path.display(), "subagent predates segment");
                }
                keep
            }
            Err(e) => {
                debug!(path = %path.display(), error = %e, "skipping unreadable subagent transcript");
                false
            }
        })
        .collect()
}

/// `ERROR/WARN`: most severe first.
fn levels_label(levels: &BTreeSet<Severity>) -> String {
    levels
        .iter()
        .rev()
        .map(|s| s.as_str())
        .collect::<Vec<_>>()
        .join("/")
}

/// Variables available to the header template.
pub struct HeaderVars<'a> {
    pub session_id: &'a str,
    pub exported_at: String,
    pub transcript: &'a Path,
    pub compacted: bool,
    pub segment_start: String,
    pub subagent_count: usize,
    pub debug_count: usize,
    pub debug_levels: String,
    pub trigger: Option<String>,
}

/// Render a header template with the given variables.
pub fn render_header(template: &str, vars: HeaderVars<'_>) -> Result<String> {
    let env = Environment::new();
    let tmpl = env
        .template_from_str(template)
        .context("parsing header template")?;
    tmpl.render(context! {
        session_id => vars.session_id,
        exported_at => vars.exported_at,
        transcript => vars.transcript.display().to_string(),
        compacted => vars.compacted,
        segment_start => vars.segment_start,
        subagent_count => vars.subagent_count,
        debug_count => vars.debug_count,
        debug_levels => vars.debug_levels,
        trigger => vars.trigger,
    })
    .context("rendering header template")
}
