//! Line-based diff between two full-text snapshots. Classic O(m·n) LCS
//! dynamic programming with a lockstep walk that groups divergent runs
//! into unified-style hunks. Good enough for typical source files; inputs
//! past the DP cell cap degrade to a whole-file replacement hunk instead
//! of a pathological table.

/// Upper bound on LCS table cells ((m+1)·(n+1) lines). Past this the diff
/// falls back to remove-all/add-all.
pub const MAX_DP_CELLS: usize = 9_000_000;

/// A contiguous block of removed and added lines, removed lines first.
/// Starts are 1-based; a zero count positions the hunk after the given
/// line, matching unified-diff conventions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffHunk {
    pub old_start: usize,
    pub old_count: usize,
    pub new_start: usize,
    pub new_count: usize,
    /// Lines prefixed `"- "` (removed) or `"+ "` (added).
    pub lines: Vec<String>,
}

impl DiffHunk {
    pub fn header(&self) -> String {
        format!(
            "@@ -{},{} +{},{} @@",
            self.old_start, self.old_count, self.new_start, self.new_count
        )
    }
}

/// Result of diffing two snapshots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffResult {
    pub hunks: Vec<DiffHunk>,
    pub added_lines: usize,
    pub removed_lines: usize,
}

impl DiffResult {
    /// Equal inputs produce an empty result; callers must treat that as
    /// "no-op, emit nothing".
    pub fn is_empty(&self) -> bool {
        self.hunks.is_empty()
    }

    /// Render all hunks as unified-diff-like text.
    pub fn to_unified(&self) -> String {
        let mut out = Vec::with_capacity(self.hunks.len() * 4);
        for hunk in &self.hunks {
            out.push(hunk.header());
            out.extend(hunk.lines.iter().cloned());
        }
        out.join("\n")
    }
}

/// Split into line records. The empty text has zero lines; a trailing
/// newline yields a final empty line, keeping the split reversible.
fn split_lines(text: &str) -> Vec<&str> {
    if text.is_empty() {
        Vec::new()
    } else {
        text.split('\n').collect()
    }
}

/// Compute the line diff between `old` and `new`.
pub fn diff(old: &str, new: &str) -> DiffResult {
    if old == new {
        return DiffResult::default();
    }
    let old_lines = split_lines(old);
    let new_lines = split_lines(new);

    if (old_lines.len() + 1).saturating_mul(new_lines.len() + 1) > MAX_DP_CELLS {
        return replace_all(&old_lines, &new_lines);
    }

    let table = lcs_suffix_table(&old_lines, &new_lines);
    walk(&old_lines, &new_lines, &table)
}

/// Whole-content addition, for file-created records. Bypasses the LCS
/// walk: every line is a pure addition.
pub fn full_addition(text: &str) -> DiffResult {
    let lines = split_lines(text);
    replace_all(&[], &lines)
}

/// Whole-content removal, for file-deleted records.
pub fn full_removal(text: &str) -> DiffResult {
    let lines = split_lines(text);
    replace_all(&lines, &[])
}

/// Single-hunk remove-all/add-all replacement.
fn replace_all(old_lines: &[&str], new_lines: &[&str]) -> DiffResult {
    if old_lines.is_empty() && new_lines.is_empty() {
        return DiffResult::default();
    }
    let mut lines = Vec::with_capacity(old_lines.len() + new_lines.len());
    for line in old_lines {
        lines.push(format!("- {line}"));
    }
    for line in new_lines {
        lines.push(format!("+ {line}"));
    }
    let hunk = DiffHunk {
        old_start: if old_lines.is_empty() { 0 } else { 1 },
        old_count: old_lines.len(),
        new_start: if new_lines.is_empty() { 0 } else { 1 },
        new_count: new_lines.len(),
        lines,
    };
    DiffResult {
        added_lines: new_lines.len(),
        removed_lines: old_lines.len(),
        hunks: vec![hunk],
    }
}

/// Suffix LCS table: `table[i][j]` is the LCS length of `old[i..]` and
/// `new[j..]`. Suffix orientation lets the walk run forward without a
/// separate backtrack pass.
fn lcs_suffix_table(old: &[&str], new: &[&str]) -> Vec<Vec<u32>> {
    let m = old.len();
    let n = new.len();
    let mut table = vec![vec![0u32; n + 1]; m + 1];
    for i in (0..m).rev() {
        for j in (0..n).rev() {
            table[i][j] = if old[i] == new[j] {
                table[i + 1][j + 1] + 1
            } else {
                table[i + 1][j].max(table[i][j + 1])
            };
        }
    }
    table
}

/// Walk both line sequences in lockstep against the LCS: matching lines
/// are skipped, divergent runs accumulate into hunks.
fn walk(old: &[&str], new: &[&str], table: &[Vec<u32>]) -> DiffResult {
    let m = old.len();
    let n = new.len();
    let mut result = DiffResult::default();

    let mut i = 0;
    let mut j = 0;
    let mut open: Option<HunkBuilder> = None;

    while i < m || j < n {
        if i < m && j < n && old[i] == new[j] {
            if let Some(builder) = open.take() {
                builder.flush(&mut result);
            }
            i += 1;
            j += 1;
        } else if i < m && (j == n || table[i + 1][j] >= table[i][j + 1]) {
            open.get_or_insert_with(|| HunkBuilder::new(i, j))
                .removed
                .push(old[i].to_string());
            i += 1;
        } else {
            open.get_or_insert_with(|| HunkBuilder::new(i, j))
                .added
                .push(new[j].to_string());
            j += 1;
        }
    }
    if let Some(builder) = open.take() {
        builder.flush(&mut result);
    }
    result
}

struct HunkBuilder {
    /// 0-based indices where the divergent run began.
    old_index: usize,
    new_index: usize,
    removed: Vec<String>,
    added: Vec<String>,
}

impl HunkBuilder {
    fn new(old_index: usize, new_index: usize) -> Self {
        Self {
            old_index,
            new_index,
            removed: Vec::new(),
            added: Vec::new(),
        }
    }

    fn flush(self, result: &mut DiffResult) {
        let old_count = self.removed.len();
        let new_count = self.added.len();
        let mut lines = Vec::with_capacity(old_count + new_count);
        for line in &self.removed {
            lines.push(format!("- {line}"));
        }
        for line in &self.added {
            lines.push(format!("+ {line}"));
        }
        result.hunks.push(DiffHunk {
            old_start: if old_count == 0 {
                self.old_index
            } else {
                self.old_index + 1
            },
            old_count,
            new_start: if new_count == 0 {
                self.new_index
            } else {
                self.new_index + 1
            },
            new_count,
            lines,
        });
        result.removed_lines += old_count;
        result.added_lines += new_count;
    }
}

// ─── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    /// Apply all hunks of `result` to `old`, reproducing the new text.
    fn apply(old: &str, result: &DiffResult) -> String {
        let old_lines = split_lines(old);
        let mut out: Vec<String> = Vec::new();
        let mut cursor = 0usize; // 0-based index into old_lines

        for hunk in &result.hunks {
            // Position of the first removed line, or the insertion point.
            let stop = if hunk.old_count == 0 {
                hunk.old_start
            } else {
                hunk.old_start - 1
            };
            while cursor < stop {
                out.push(old_lines[cursor].to_string());
                cursor += 1;
            }
            cursor += hunk.old_count;
            for line in &hunk.lines {
                if let Some(added) = line.strip_prefix("+ ") {
                    out.push(added.to_string());
                }
            }
        }
        while cursor < old_lines.len() {
            out.push(old_lines[cursor].to_string());
            cursor += 1;
        }
        out.join("\n")
    }

    fn assert_round_trip(old: &str, new: &str) {
        let result = diff(old, new);
        assert_eq!(apply(old, &result), new, "round trip {old:?} -> {new:?}");
    }

    // ── 1. Idempotence ──────────────────────────────────────────────

    #[test]
    fn equal_texts_yield_empty_result() {
        for text in ["", "a", "a\nb\nc", "line\n", "\n\n"] {
            let result = diff(text, text);
            assert!(result.is_empty(), "diff of {text:?} with itself");
            assert_eq!(result.added_lines, 0);
            assert_eq!(result.removed_lines, 0);
        }
    }

    // ── 2. Single-line replacement ──────────────────────────────────

    #[test]
    fn single_line_replacement() {
        let result = diff("a\nb\nc", "a\nx\nc");
        assert_eq!(result.hunks.len(), 1);
        let hunk = &result.hunks[0];
        assert_eq!(hunk.old_start, 2);
        assert_eq!(hunk.old_count, 1);
        assert_eq!(hunk.new_start, 2);
        assert_eq!(hunk.new_count, 1);
        assert_eq!(hunk.lines, vec!["- b".to_string(), "+ x".to_string()]);
        assert_eq!(result.added_lines, 1);
        assert_eq!(result.removed_lines, 1);
    }

    // ── 3. Pure insertion and removal ───────────────────────────────

    #[test]
    fn pure_insertion() {
        let result = diff("a\nc", "a\nb\nc");
        assert_eq!(result.hunks.len(), 1);
        let hunk = &result.hunks[0];
        assert_eq!((hunk.old_start, hunk.old_count), (1, 0));
        assert_eq!((hunk.new_start, hunk.new_count), (2, 1));
        assert_eq!(hunk.lines, vec!["+ b".to_string()]);
    }

    #[test]
    fn pure_removal() {
        let result = diff("a\nb\nc", "a\nc");
        assert_eq!(result.hunks.len(), 1);
        let hunk = &result.hunks[0];
        assert_eq!((hunk.old_start, hunk.old_count), (2, 1));
        assert_eq!((hunk.new_start, hunk.new_count), (1, 0));
        assert_eq!(hunk.lines, vec!["- b".to_string()]);
    }

    #[test]
    fn insertion_at_top() {
        let result = diff("b\nc", "a\nb\nc");
        let hunk = &result.hunks[0];
        assert_eq!((hunk.old_start, hunk.old_count), (0, 0));
        assert_eq!((hunk.new_start, hunk.new_count), (1, 1));
    }

    #[test]
    fn from_empty_is_all_additions() {
        let result = diff("", "a\nb");
        assert_eq!(result.hunks.len(), 1);
        let hunk = &result.hunks[0];
        assert_eq!((hunk.old_start, hunk.old_count), (0, 0));
        assert_eq!((hunk.new_start, hunk.new_count), (1, 2));
        assert_eq!(result.added_lines, 2);
        assert_eq!(result.removed_lines, 0);
    }

    #[test]
    fn to_empty_is_all_removals() {
        let result = diff("a\nb", "");
        assert_eq!(result.removed_lines, 2);
        assert_eq!(result.added_lines, 0);
    }

    // ── 4. Multiple hunks ───────────────────────────────────────────

    #[test]
    fn two_separate_hunks() {
        let result = diff("a\nb\nc\nd\ne", "a\nB\nc\nd\nE");
        assert_eq!(result.hunks.len(), 2);
        assert_eq!(result.hunks[0].old_start, 2);
        assert_eq!(result.hunks[1].old_start, 5);
        assert_eq!(result.added_lines, 2);
        assert_eq!(result.removed_lines, 2);
    }

    #[test]
    fn removed_lines_precede_added_within_hunk() {
        let result = diff("a\nold1\nold2\nz", "a\nnew1\nnew2\nnew3\nz");
        assert_eq!(result.hunks.len(), 1);
        let lines = &result.hunks[0].lines;
        assert_eq!(
            lines,
            &[
                "- old1".to_string(),
                "- old2".to_string(),
                "+ new1".to_string(),
                "+ new2".to_string(),
                "+ new3".to_string(),
            ]
        );
    }

    // ── 5. Unified rendering ────────────────────────────────────────

    #[test]
    fn unified_text_has_headers() {
        let result = diff("a\nb\nc", "a\nx\nc");
        assert_eq!(result.to_unified(), "@@ -2,1 +2,1 @@\n- b\n+ x");
    }

    #[test]
    fn unified_text_multiple_hunks() {
        let result = diff("a\nb\nc\nd\ne", "a\nB\nc\nd\nE");
        let unified = result.to_unified();
        assert!(unified.contains("@@ -2,1 +2,1 @@"));
        assert!(unified.contains("@@ -5,1 +5,1 @@"));
    }

    // ── 6. Round trips ──────────────────────────────────────────────

    #[test]
    fn round_trip_assorted() {
        let cases = [
            ("", "hello"),
            ("hello", ""),
            ("a\nb\nc", "a\nx\nc"),
            ("a\nc", "a\nb\nc"),
            ("a\nb\nc", "c\nb\na"),
            ("fn main() {}\n", "fn main() {\n    run();\n}\n"),
            ("x", "x\n"),
            ("x\n", "x"),
            ("one\ntwo\nthree\nfour", "zero\ntwo\nfour\nfive"),
            ("\n\n\n", "\n"),
        ];
        for (old, new) in cases {
            assert_round_trip(old, new);
        }
    }

    // ── 7. Whole-file fast paths ────────────────────────────────────

    #[test]
    fn full_addition_lists_every_line() {
        let result = full_addition("a\nb\nc");
        assert_eq!(result.hunks.len(), 1);
        let hunk = &result.hunks[0];
        assert_eq!((hunk.old_start, hunk.old_count), (0, 0));
        assert_eq!((hunk.new_start, hunk.new_count), (1, 3));
        assert!(hunk.lines.iter().all(|l| l.starts_with("+ ")));
        assert_eq!(result.added_lines, 3);
    }

    #[test]
    fn full_removal_lists_every_line() {
        let result = full_removal("a\nb");
        let hunk = &result.hunks[0];
        assert_eq!((hunk.old_start, hunk.old_count), (1, 2));
        assert_eq!((hunk.new_start, hunk.new_count), (0, 0));
        assert!(hunk.lines.iter().all(|l| l.starts_with("- ")));
        assert_eq!(result.removed_lines, 2);
    }

    #[test]
    fn full_addition_of_empty_text_is_empty() {
        assert!(full_addition("").is_empty());
        assert!(full_removal("").is_empty());
    }

    // ── 8. DP cap fallback ──────────────────────────────────────────

    #[test]
    fn oversized_inputs_fall_back_to_replacement() {
        // 4000×4000 lines exceeds MAX_DP_CELLS.
        let old = "x\n".repeat(4_000);
        let new = "y\n".repeat(4_000);
        let result = diff(&old, &new);
        assert_eq!(result.hunks.len(), 1, "single replacement hunk");
        assert_round_trip(&old, &new);
    }

    // ── 9. Trailing newline handling ────────────────────────────────

    #[test]
    fn trailing_newline_is_a_line_change() {
        let result = diff("a", "a\n");
        assert_eq!(result.added_lines, 1);
        assert_eq!(result.removed_lines, 0);
        assert_round_trip("a", "a\n");
    }
}
