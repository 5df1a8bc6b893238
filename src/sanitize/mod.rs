use regex::{Captures, Regex};
use std::sync::LazyLock;

/// Replacement for text that failed the binary check.
pub const BINARY_PLACEHOLDER: &str = "*[binary content filtered]*";

/// Replacement for `<system-reminder>` blocks.
pub const REMINDER_PLACEHOLDER: &str = "[system reminder collapsed]";

/// How many leading characters the binary check samples.
const BINARY_SAMPLE: usize = 2000;

// ===================================================================
// Patterns
// ===================================================================

/// CSI sequences (colors, cursor moves) and OSC sequences terminated by BEL.
static ANSI_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\x1b\[[0-9;]*[A-Za-z]|\x1b\].*?\x07").unwrap());

/// `data:<mime>;base64,<payload>` URIs.
static DATA_URI_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"data:([a-zA-Z0-9/+.\-]+);base64,([A-Za-z0-9+/=]+)").unwrap()
});

/// 100+ chars of base64 alphabet: 25 or more groups of 4, optional padding.
static BASE64_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:[A-Za-z0-9+/]{4}){25,}(?:[A-Za-z0-9+/]{2}==|[A-Za-z0-9+/]{3}=)?").unwrap()
});

static SYSTEM_REMINDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<system-reminder>.*?</system-reminder>").unwrap());

// ===================================================================
// Entry point
// ===================================================================

/// Make `text` safe to drop into the export document.
///
/// Binary-looking text is replaced wholesale. Otherwise the steps run in a
/// fixed order: escape sequences first (blobs can be interleaved with color
/// codes), then data URIs and base64 blobs, then system-reminder blocks, and
/// finally truncation to `limit` characters.
pub fn sanitize(text: &str, limit: usize) -> String {
    if is_binary(text) {
        return BINARY_PLACEHOLDER.to_string();
    }
    let text = strip_ansi(text);
    let text = filter_blobs(&text);
    let text = strip_system_reminders(&text);
    truncate_with_note(&text, limit)
}

/// True if more than 10% of the first 2000 characters are control
/// characters other than newline, carriage return and tab.
pub fn is_binary(text: &str) -> bool {
    let mut sampled = 0usize;
    let mut bad = 0usize;
    for c in text.chars().take(BINARY_SAMPLE) {
        sampled += 1;
        if (c as u32) < 32 && !matches!(c, '\n' | '\r' | '\t') {
            bad += 1;
        }
    }
    bad * 10 > sampled
}

pub fn strip_ansi(text: &str) -> String {
    ANSI_RE.replace_all(text, "").into_owned()
}

/// Replace data URIs and long base64 runs with size-annotated placeholders.
/// The size is the decoded estimate, 3/4 of the encoded length.
pub fn filter_blobs(text: &str) -> String {
    let text = DATA_URI_RE.replace_all(text, |caps: &Captures| {
        format!(
            "[data URI filtered: {}, ~{} bytes]",
            &caps[1],
            caps[2].len() * 3 / 4
        )
    });
    BASE64_RE
        .replace_all(&text, |caps: &Captures| {
            format!("[base64 data filtered, ~{} bytes]", caps[0].len() * 3 / 4)
        })
        .into_owned()
}

pub fn strip_system_reminders(text: &str) -> String {
    SYSTEM_REMINDER_RE
        .replace_all(text, REMINDER_PLACEHOLDER)
        .into_owned()
}

// ===================================================================
// Character-aware truncation
// ===================================================================

/// Split `s` after `max` characters. Returns the head and how many
/// characters were cut off (0 if nothing was).
pub fn split_chars(s: &str, max: usize) -> (&str, usize) {
    match s.char_indices().nth(max) {
        None => (s, 0),
        Some((byte_idx, _)) => (&s[..byte_idx], s[byte_idx..].chars().count()),
    }
}

/// Truncate a string to `max` chars, appending "..." if truncated.
pub fn truncate_chars(s: &str, max: usize) -> String {
    match split_chars(s, max) {
        (head, 0) => head.to_string(),
        (head, _) => format!("{head}..."),
    }
}

/// Keep the first `limit` characters and note how many were dropped.
pub fn truncate_with_note(text: &str, limit: usize) -> String {
    match split_chars(text, limit) {
        (head, 0) => head.to_string(),
        (head, rest) => format!("{head}\n\n... [{rest} more chars truncated]"),
    }
}

#[cfg(test)]
mod tests;
