//! Line diff for display
//!
//! Greedy single pass with one line of lookahead. Linear time, not a minimal
//! edit script: a reordering can show up as a removed/added pair where an LCS
//! would keep a line unchanged. Never used to decide merge outcomes.

use serde::{Deserialize, Serialize};

/// Type of change for a line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineChange {
    Unchanged,
    Added,
    Removed,
}

/// A single line in a diff
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffLine {
    pub kind: LineChange,
    /// Line content without the newline
    pub line: String,
}

impl DiffLine {
    fn new(kind: LineChange, line: &str) -> Self {
        Self {
            kind,
            line: line.to_string(),
        }
    }
}

/// Summary counts over a diff
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffStats {
    pub added: usize,
    pub removed: usize,
    pub unchanged: usize,
}

impl DiffStats {
    pub fn from_lines(lines: &[DiffLine]) -> Self {
        lines.iter().fold(Self::default(), |mut stats, l| {
            match l.kind {
                LineChange::Added => stats.added += 1,
                LineChange::Removed => stats.removed += 1,
                LineChange::Unchanged => stats.unchanged += 1,
            }
            stats
        })
    }

    pub fn has_changes(&self) -> bool {
        self.added > 0 || self.removed > 0
    }
}

/// Compare two texts line by line
pub fn diff(old_text: &str, new_text: &str) -> Vec<DiffLine> {
    let old: Vec<&str> = old_text.split('\n').collect();
    let new: Vec<&str> = new_text.split('\n').collect();
    let mut out = Vec::with_capacity(old.len().max(new.len()));

    let (mut i, mut j) = (0, 0);
    while i < old.len() || j < new.len() {
        match (old.get(i), new.get(j)) {
            (None, Some(n)) => {
                out.push(DiffLine::new(LineChange::Added, n));
                j += 1;
            }
            (Some(o), None) => {
                out.push(DiffLine::new(LineChange::Removed, o));
                i += 1;
            }
            (Some(o), Some(n)) if o == n => {
                out.push(DiffLine::new(LineChange::Unchanged, o));
                i += 1;
                j += 1;
            }
            (Some(o), Some(n)) => {
                if old.get(i + 1) == Some(n) {
                    out.push(DiffLine::new(LineChange::Removed, o));
                    i += 1;
                } else if new.get(j + 1) == Some(o) {
                    out.push(DiffLine::new(LineChange::Added, n));
                    j += 1;
                } else {
                    out.push(DiffLine::new(LineChange::Removed, o));
                    out.push(DiffLine::new(LineChange::Added, n));
                    i += 1;
                    j += 1;
                }
            }
            (None, None) => break,
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn kinds(lines: &[DiffLine]) -> Vec<(LineChange, &str)> {
        lines.iter().map(|l| (l.kind, l.line.as_str())).collect()
    }

    #[test]
    fn test_identical() {
        let lines = diff("a\nb", "a\nb");
        assert_eq!(
            kinds(&lines),
            vec![(LineChange::Unchanged, "a"), (LineChange::Unchanged, "b")]
        );
    }

    #[test]
    fn test_deleted_line_uses_lookahead() {
        let lines = diff("a\nx\nb", "a\nb");
        assert_eq!(
            kinds(&lines),
            vec![
                (LineChange::Unchanged, "a"),
                (LineChange::Removed, "x"),
                (LineChange::Unchanged, "b"),
            ]
        );
    }

    #[test]
    fn test_inserted_line_uses_lookahead() {
        let lines = diff("a\nb", "a\ny\nb");
        assert_eq!(
            kinds(&lines),
            vec![
                (LineChange::Unchanged, "a"),
                (LineChange::Added, "y"),
                (LineChange::Unchanged, "b"),
            ]
        );
    }

    #[test]
    fn test_replaced_line() {
        let lines = diff("a\nold\nc", "a\nnew\nc");
        assert_eq!(
            kinds(&lines),
            vec![
                (LineChange::Unchanged, "a"),
                (LineChange::Removed, "old"),
                (LineChange::Added, "new"),
                (LineChange::Unchanged, "c"),
            ]
        );
    }

    #[test]
    fn test_exhausted_sides() {
        let lines = diff("a", "a\nb\nc");
        assert_eq!(
            kinds(&lines),
            vec![
                (LineChange::Unchanged, "a"),
                (LineChange::Added, "b"),
                (LineChange::Added, "c"),
            ]
        );

        let lines = diff("a\nb\nc", "a");
        assert_eq!(
            kinds(&lines),
            vec![
                (LineChange::Unchanged, "a"),
                (LineChange::Removed, "b"),
                (LineChange::Removed, "c"),
            ]
        );
    }

    #[test]
    fn test_not_minimal_on_two_line_shift() {
        // An LCS would keep "c" unchanged; the greedy walk does not look that far
        let lines = diff("a\nb\nc", "c\na\nb");
        let stats = DiffStats::from_lines(&lines);
        assert!(stats.has_changes());
        assert_eq!(stats.added, stats.removed);
    }

    #[test]
    fn test_empty_inputs() {
        assert_eq!(kinds(&diff("", "")), vec![(LineChange::Unchanged, "")]);
        assert_eq!(
            kinds(&diff("", "x")),
            vec![(LineChange::Removed, ""), (LineChange::Added, "x")]
        );
    }

    #[test]
    fn test_stats() {
        let stats = DiffStats::from_lines(&diff("a\nold\nc", "a\nnew\nc\nd"));
        assert_eq!(
            stats,
            DiffStats {
                added: 2,
                removed: 1,
                unchanged: 2
            }
        );
    }

    #[test]
    fn test_serialized_kind_is_lowercase() {
        let json = serde_json::to_value(DiffLine::new(LineChange::Added, "x")).unwrap();
        assert_eq!(json["kind"], "added");
    }

    proptest! {
        #[test]
        fn prop_diff_with_self_is_unchanged(text in "[a-c\n]{0,40}") {
            let lines = diff(&text, &text);
            prop_assert!(lines.iter().all(|l| l.kind == LineChange::Unchanged));
            let joined: Vec<&str> = lines.iter().map(|l| l.line.as_str()).collect();
            prop_assert_eq!(joined.join("\n"), text);
        }

        #[test]
        fn prop_diff_preserves_both_sides(old in "[a-c\n]{0,30}", new in "[a-c\n]{0,30}") {
            let lines = diff(&old, &new);
            let old_side: Vec<&str> = lines
                .iter()
                .filter(|l| l.kind != LineChange::Added)
                .map(|l| l.line.as_str())
                .collect();
            let new_side: Vec<&str> = lines
                .iter()
                .filter(|l| l.kind != LineChange::Removed)
                .map(|l| l.line.as_str())
                .collect();
            prop_assert_eq!(old_side.join("\n"), old);
            prop_assert_eq!(new_side.join("\n"), new);
        }
    }
}
