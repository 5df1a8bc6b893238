mod conversation;
mod debug_log;
mod error;
mod export;
mod logging;
mod merge;
mod preferences;
mod render;
mod sanitize;
mod transcript;
mod types;

use anyhow::{Context, Result};
use clap::Parser;
use export::{ExportRequest, Exporter, expand_home};
use std::io::{self, Read};
use std::path::PathBuf;
use std::process;
use types::HookInput;

/// Export the current Claude Code session segment to Markdown.
///
/// Meant to run as a PreCompact hook: the hook payload arrives as JSON on
/// stdin. Flags override payload fields.
#[derive(Debug, Parser)]
#[command(name = "claudexport", version)]
struct Args {
    /// Transcript to export. When given, stdin is not read.
    #[arg(long)]
    transcript: Option<String>,

    /// Session id (used for filtering and locating subagent and debug logs).
    #[arg(long)]
    session_id: Option<String>,

    /// Project directory holding `.claude/`.
    #[arg(long)]
    cwd: Option<PathBuf>,

    /// Write the export here instead of `.claude/chat_history`.
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Debug log to merge instead of `~/.claude/debug/<session_id>.txt`.
    #[arg(long)]
    debug_log: Option<String>,

    /// Debug severities to include, e.g. `ERROR,WARN`.
    #[arg(long, value_delimiter = ',')]
    levels: Option<Vec<String>>,

    /// Leave subagent transcripts out.
    #[arg(long)]
    no_subagents: bool,

    /// Leave the debug log out.
    #[arg(long)]
    no_debug: bool,
}

fn read_stdin() -> Result<String> {
    let mut buffer = String::new();
    io::stdin()
        .read_to_string(&mut buffer)
        .context("reading hook input from stdin")?;
    Ok(buffer)
}

fn hook_input(args: &Args) -> Result<HookInput> {
    if args.transcript.is_some() {
        return Ok(HookInput::default());
    }
    let input = read_stdin()?;
    if input.trim().is_empty() {
        return Ok(HookInput::default());
    }
    serde_json::from_str(&input).context("parsing hook input")
}

fn request(args: Args, input: HookInput) -> Result<ExportRequest> {
    let session_id = args
        .session_id
        .or(input.session_id)
        .unwrap_or_else(|| "unknown".to_string());
    let transcript = args
        .transcript
        .or(input.transcript_path)
        .filter(|p| !p.is_empty())
        .map(|p| expand_home(&p));
    let cwd = match args.cwd.or_else(|| input.cwd.map(PathBuf::from)) {
        Some(cwd) => cwd,
        None => std::env::current_dir().context("resolving working directory")?,
    };
    let levels = args
        .levels
        .map(|names| preferences::parse_levels(&names))
        .transpose()?;

    let mut req = ExportRequest::new(session_id, transcript, cwd);
    req.trigger = input.trigger;
    req.output_dir = args.output_dir;
    req.debug_log = args.debug_log.map(|p| expand_home(&p));
    req.levels = levels;
    req.skip_subagents = args.no_subagents;
    req.skip_debug = args.no_debug;
    Ok(req)
}

fn run(args: Args) -> Result<PathBuf> {
    let input = hook_input(&args)?;
    tracing::debug!(
        event = ?input.hook_event_name,
        trigger = ?input.trigger,
        custom_instructions = input.custom_instructions.is_some(),
        "hook input"
    );
    let req = request(args, input)?;
    Exporter::open(req)?.run()
}

fn main() {
    let _ = logging::init();
    let args = Args::parse();

    match run(args) {
        Ok(path) => println!("Exported to {}", path.display()),
        Err(err) => {
            eprintln!("claudexport: {err:#}");
            process::exit(1);
        }
    }
}
