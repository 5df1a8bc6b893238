use crate::conversation::Turn;
use crate::debug_log::{DebugEntry, DebugFilter, Severity};
use crate::transcript::Record;
use std::collections::BTreeSet;

/// Fold debug entries into the main turns by timestamp.
///
/// ISO-8601 strings in a shared format sort lexicographically. The sort is
/// stable, so on a tie the conversation turn stays ahead of the debug entry.
pub fn merge_debug_entries(turns: Vec<Turn>, entries: &[DebugEntry]) -> Vec<Turn> {
    if entries.is_empty() {
        return turns;
    }
    let mut merged = turns;
    merged.extend(entries.iter().map(Turn::from_debug));
    merged.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
    merged
}

/// First and last timestamp of the exported segment. Both are empty when no
/// record in the segment carries a timestamp.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionWindow {
    pub start: String,
    pub end: String,
}

impl SessionWindow {
    pub fn of(records: &[Record]) -> Self {
        let mut stamps = records
            .iter()
            .map(|r| r.timestamp.as_str())
            .filter(|ts| !ts.is_empty());
        let start = stamps.next().unwrap_or("");
        let end = stamps.last().unwrap_or(start);
        Self {
            start: start.to_string(),
            end: end.to_string(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.start.is_empty()
    }

    /// Whether a subagent whose transcript starts at `first_timestamp`
    /// belongs to this segment. An unbounded window admits everything; a
    /// transcript with no timestamps can't be placed and is left out.
    pub fn admits_agent(&self, first_timestamp: Option<&str>) -> bool {
        if self.is_empty() {
            return true;
        }
        first_timestamp.is_some_and(|ts| ts >= self.start.as_str())
    }

    /// Debug filter restricted to this window.
    pub fn debug_filter(&self, levels: BTreeSet<Severity>) -> DebugFilter {
        DebugFilter {
            levels,
            start: self.start.clone(),
            end: self.end.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::Role;
    use crate::debug_log::default_levels;
    use crate::transcript::MessageContent;

    fn turn(ts: &str, text: &str) -> Turn {
        Turn {
            role: Role::Assistant,
            content: MessageContent::Text(text.into()),
            timestamp: ts.into(),
            level: None,
        }
    }

    fn entry(ts: &str, text: &str) -> DebugEntry {
        DebugEntry {
            timestamp: ts.into(),
            level: Severity::Error,
            text: text.into(),
        }
    }

    fn record(ts: &str) -> Record {
        Record {
            timestamp: ts.into(),
            ..Record::default()
        }
    }

    #[test]
    fn debug_entry_lands_between_turns() {
        let merged = merge_debug_entries(
            vec![
                turn("2026-01-01T00:00:01.000Z", "first"),
                turn("2026-01-01T00:00:03.000Z", "third"),
            ],
            &[entry("2026-01-01T00:00:02.000Z", "second")],
        );
        let roles: Vec<Role> = merged.iter().map(|t| t.role).collect();
        assert_eq!(roles, vec![Role::Assistant, Role::Debug, Role::Assistant]);
        assert_eq!(merged[1].content.text(), "second");
    }

    #[test]
    fn ties_keep_turn_before_debug() {
        let ts = "2026-01-01T00:00:01.000Z";
        let merged = merge_debug_entries(vec![turn(ts, "turn")], &[entry(ts, "debug")]);
        assert_eq!(merged[0].role, Role::Assistant);
        assert_eq!(merged[1].role, Role::Debug);
    }

    #[test]
    fn no_entries_leaves_turns_untouched() {
        let merged = merge_debug_entries(vec![turn("b", "1"), turn("a", "2")], &[]);
        assert_eq!(merged[0].timestamp, "b");
    }

    #[test]
    fn window_spans_first_to_last_timestamp() {
        let window = SessionWindow::of(&[record(""), record("t1"), record("t2"), record(""), record("t3")]);
        assert_eq!(window.start, "t1");
        assert_eq!(window.end, "t3");
    }

    #[test]
    fn single_timestamp_window() {
        let window = SessionWindow::of(&[record("t1")]);
        assert_eq!(window.start, "t1");
        assert_eq!(window.end, "t1");
    }

    #[test]
    fn untimed_segment_has_empty_window() {
        let window = SessionWindow::of(&[record(""), record("")]);
        assert!(window.is_empty());
        assert!(window.admits_agent(None));
        assert!(window.admits_agent(Some("anything")));
    }

    #[test]
    fn agents_starting_before_window_are_excluded() {
        let window = SessionWindow {
            start: "2026-01-01T00:00:05.000Z".into(),
            end: "2026-01-01T00:00:09.000Z".into(),
        };
        assert!(!window.admits_agent(Some("2026-01-01T00:00:04.999Z")));
        assert!(window.admits_agent(Some("2026-01-01T00:00:05.000Z")));
        assert!(window.admits_agent(Some("2026-01-01T00:00:10.000Z")));
        assert!(!window.admits_agent(None));
    }

    #[test]
    fn debug_filter_carries_window_and_levels() {
        let window = SessionWindow {
            start: "a".into(),
            end: "z".into(),
        };
        let filter = window.debug_filter(default_levels());
        assert_eq!(filter.start, "a");
        assert_eq!(filter.end, "z");
        assert!(filter.levels.contains(&Severity::Warn));
    }
}
