//! Tab/completion disambiguation. A Tab keypress is ambiguous: it either
//! inserts literal indentation or triggers an inline completion. The text
//! of the document change that follows the keypress resolves which.

/// Editors translate a Tab into at most this many spaces.
pub const TAB_MAX_INDENT_SPACES: usize = 8;

/// Added-text length bounds for the best-effort completion heuristic.
pub const COMPLETION_MIN_LEN: usize = 3;
pub const COMPLETION_MAX_LEN: usize = 500;

/// What the change following a Tab keypress turned out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabFollowup {
    /// A literal tab or 1–8 spaces: the user indented.
    Indentation,
    /// Anything else non-empty: an accepted inline suggestion.
    Completion,
}

/// Classify the document change that followed a Tab keypress. Only
/// meaningful while a pending tab mark is live; the caller consumes the
/// mark regardless of the outcome. Returns `None` for an empty change
/// (nothing to attribute).
///
/// Editors commonly translate a Tab keypress into 1–8 spaces depending on
/// indent-width configuration; anything larger, or containing non-space
/// content, is virtually always an accepted suggestion rather than typing.
pub fn classify_tab_followup(added: &str) -> Option<TabFollowup> {
    if added.is_empty() {
        return None;
    }
    if added == "\t" {
        return Some(TabFollowup::Indentation);
    }
    if added.len() <= TAB_MAX_INDENT_SPACES && added.bytes().all(|b| b == b' ') {
        return Some(TabFollowup::Indentation);
    }
    Some(TabFollowup::Completion)
}

/// Best-effort completion heuristic for hosts that cannot intercept Tab
/// directly: recent typing in the file, non-whitespace content, and a
/// plausible suggestion length. Diagnostic only — this never overrides an
/// exact typed-input match and never changes a classification.
pub fn looks_like_completion(recently_typed: bool, added: &str) -> bool {
    recently_typed
        && !added.trim().is_empty()
        && (COMPLETION_MIN_LEN..=COMPLETION_MAX_LEN).contains(&added.len())
}

// ─── Tests ────────────────────────────────────────────────────────
