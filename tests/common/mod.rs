#![allow(dead_code)]

use serde_json::{Value, json};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

pub struct Output {
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

/// Run the binary with `args` and `stdin`. HOME points at `home` so no test
/// touches the real `~/.claude`.
pub fn run_cli(home: &Path, args: &[&str], stdin: &str) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_claudexport"))
        .args(args)
        .env("HOME", home)
        .env_remove("CLAUDEXPORT_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to spawn binary");

    child
        .stdin
        .as_mut()
        .unwrap()
        .write_all(stdin.as_bytes())
        .unwrap();

    let output = child.wait_with_output().unwrap();
    Output {
        code: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
    }
}

/// PreCompact payload for a session.
pub fn hook_payload(session_id: &str, transcript: &Path, cwd: &Path) -> String {
    json!({
        "session_id": session_id,
        "transcript_path": transcript,
        "cwd": cwd,
        "hook_event_name": "PreCompact",
        "trigger": "manual",
        "custom_instructions": ""
    })
    .to_string()
}

pub fn new_session_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

pub fn ts(secs: u32) -> String {
    format!("2026-02-12T20:{:02}:{:02}.000Z", secs / 60, secs % 60)
}

pub fn message(session_id: &str, role: &str, ts: &str, content: Value) -> Value {
    json!({
        "type": role,
        "sessionId": session_id,
        "timestamp": ts,
        "isSidechain": false,
        "message": { "role": role, "content": content }
    })
}

pub fn write_jsonl(path: &Path, records: &[Value]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    let body: String = records.iter().map(|r| format!("{r}\n")).collect();
    fs::write(path, body).unwrap();
}

/// A project directory plus a fake home, both temporary.
pub struct Workspace {
    pub home: tempfile::TempDir,
    pub project: tempfile::TempDir,
    pub session_id: String,
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            home: tempfile::tempdir().unwrap(),
            project: tempfile::tempdir().unwrap(),
            session_id: new_session_id(),
        }
    }

    /// Transcript location mirroring `~/.claude/projects/<slug>/<id>.jsonl`.
    pub fn transcript(&self) -> PathBuf {
        self.home
            .path()
            .join(".claude/projects/test-project")
            .join(format!("{}.jsonl", self.session_id))
    }

    pub fn write_transcript(&self, records: &[Value]) {
        write_jsonl(&self.transcript(), records);
    }

    pub fn write_subagent(&self, agent_id: &str, records: &[Value]) {
        let path = self
            .home
            .path()
            .join(".claude/projects/test-project")
            .join(&self.session_id)
            .join("subagents")
            .join(format!("agent-{agent_id}.jsonl"));
        write_jsonl(&path, records);
    }

    pub fn write_debug_log(&self, contents: &str) {
        let dir = self.home.path().join(".claude/debug");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(format!("{}.txt", self.session_id)), contents).unwrap();
    }

    pub fn msg(&self, role: &str, secs: u32, content: Value) -> Value {
        message(&self.session_id, role, &ts(secs), content)
    }

    pub fn payload(&self) -> String {
        hook_payload(&self.session_id, &self.transcript(), self.project.path())
    }

    pub fn run(&self) -> Output {
        self.run_with(&[], &self.payload())
    }

    pub fn run_with(&self, args: &[&str], stdin: &str) -> Output {
        run_cli(self.home.path(), args, stdin)
    }

    /// Path printed on stdout by a successful run.
    pub fn exported_path(out: &Output) -> PathBuf {
        let line = out.stdout.trim();
        PathBuf::from(line.strip_prefix("Exported to ").expect("no export path on stdout"))
    }

    /// Run and return the exported document, asserting success.
    pub fn export(&self) -> String {
        self.export_with(&[], &self.payload())
    }

    pub fn export_with(&self, args: &[&str], stdin: &str) -> String {
        let out = self.run_with(args, stdin);
        assert_eq!(out.code, 0, "stderr: {}", out.stderr);
        fs::read_to_string(Self::exported_path(&out)).unwrap()
    }
}
