use crate::error::ExportError;
use anyhow::{Context, Result};
use regex::Regex;
use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::io;
use std::path::Path;
use std::str::FromStr;
use std::sync::LazyLock;

/// `<ISO timestamp> [LEVEL] text`, the header of every debug log entry. The
/// text may be missing.
static HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^([0-9]{4}-[0-9]{2}-[0-9]{2}T[0-9]{2}:[0-9]{2}:[0-9]{2}\.[0-9]+Z)\s+\[(DEBUG|ERROR|WARN|INFO|TRACE)\](?:\s+(.*))?$",
    )
    .unwrap()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Trace => "TRACE",
            Severity::Debug => "DEBUG",
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "TRACE" => Ok(Severity::Trace),
            "DEBUG" => Ok(Severity::Debug),
            "INFO" => Ok(Severity::Info),
            "WARN" | "WARNING" => Ok(Severity::Warn),
            "ERROR" => Ok(Severity::Error),
            _ => Err(ExportError::UnknownSeverity(s.to_string())),
        }
    }
}

/// The two most severe levels.
pub fn default_levels() -> BTreeSet<Severity> {
    BTreeSet::from([Severity::Error, Severity::Warn])
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebugEntry {
    pub timestamp: String,
    pub level: Severity,
    pub text: String,
}

/// Which entries to keep: a level set plus an inclusive time window. An
/// empty bound is unbounded.
#[derive(Debug, Clone)]
pub struct DebugFilter {
    pub levels: BTreeSet<Severity>,
    pub start: String,
    pub end: String,
}

impl Default for DebugFilter {
    fn default() -> Self {
        Self {
            levels: default_levels(),
            start: String::new(),
            end: String::new(),
        }
    }
}

impl DebugFilter {
    /// Timestamps compare as strings; every source uses the same
    /// zero-padded UTC format.
    pub fn admits(&self, entry: &DebugEntry) -> bool {
        let ts = entry.timestamp.as_str();
        self.levels.contains(&entry.level)
            && (self.start.is_empty() || ts >= self.start.as_str())
            && (self.end.is_empty() || ts <= self.end.as_str())
    }
}

/// Parse a Claude Code debug log.
///
/// Lines that don't start a new entry (stack traces and the like) are
/// appended to the entry before them. Text before the first header has no
/// entry to attach to and is dropped.
pub fn parse(contents: &str, filter: &DebugFilter) -> Vec<DebugEntry> {
    let mut entries = Vec::new();
    let mut current: Option<DebugEntry> = None;

    for line in contents.lines() {
        if let Some(caps) = HEADER_RE.captures(line) {
            if let Some(done) = current.take() {
                if filter.admits(&done) {
                    entries.push(done);
                }
            }
            // The regex only admits the five known levels.
            let Ok(level) = caps[2].parse::<Severity>() else {
                continue;
            };
            current = Some(DebugEntry {
                timestamp: caps[1].to_string(),
                level,
                text: caps.get(3).map_or("", |m| m.as_str()).to_string(),
            });
        } else if let Some(entry) = current.as_mut() {
            entry.text.push('\n');
            entry.text.push_str(line.trim_end());
        }
    }
    if let Some(done) = current {
        if filter.admits(&done) {
            entries.push(done);
        }
    }
    entries
}

/// Read and parse a debug log. Returns `None` if the file does not exist.
/// Lines that are not valid UTF-8 are skipped.
pub fn read_debug_log(path: &Path, filter: &DebugFilter) -> Result<Option<Vec<DebugEntry>>> {
    match fs::read(path) {
        Ok(bytes) => {
            let contents = bytes
                .split(|&b| b == b'\n')
                .filter_map(|line| std::str::from_utf8(line).ok())
                .collect::<Vec<_>>()
                .join("\n");
            Ok(Some(parse(&contents, filter)))
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).with_context(|| format!("reading debug log {}", path.display())),
    }
}
