use thiserror::Error;

/// Failures that end an export run. Everything else (bad lines, missing
/// subagent files, a missing debug log) is recovered from locally.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("No transcript found")]
    NoTranscript,

    #[error("Empty transcript")]
    EmptyTranscript,

    #[error("No messages in transcript")]
    NoMessages,

    #[error("unknown debug level `{0}` (expected TRACE, DEBUG, INFO, WARN or ERROR)")]
    UnknownSeverity(String),
}
