//! Per-change source classification. Fuses the typed-input ledger and the
//! tab disambiguator into a single verdict for one document-change event,
//! in strict priority order: explicit tab signal, exact typed-input match,
//! then external. Agent attribution happens later, at the batch level —
//! this module only separates "proven human" from "not keystroke-typed".

use chrono::{DateTime, Utc};

use crate::ledger::TypedInputLedger;
use crate::tab::{self, TabFollowup};
use crate::types::ClassificationVerdict;

/// Verdict plus diagnostic annotations for one change event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassifyOutcome {
    pub verdict: ClassificationVerdict,
    /// Best-effort completion hint for external changes. Annotation only;
    /// it never alters the verdict.
    pub completion_hint: bool,
    /// Which rule produced the verdict, for logging.
    pub rule: ClassifyRule,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifyRule {
    TabIndentation,
    TabCompletion,
    TypedMatch,
    External,
}

/// Classify one document change for `file`.
///
/// Priority order:
/// 1. Expire stale ledger and tab-mark state.
/// 2. A live tab mark delegates to the disambiguator. An explicit Tab
///    signal is the strongest available evidence and takes precedence over
///    the pending typed buffer; ledger and mark are cleared either way.
/// 3. A non-empty pending buffer with a prefix relationship to `added`
///    (either direction, covering both character-by-character and
///    coalesced delivery) is an exact typed-input match: human, full count.
/// 4. Otherwise external. Remaining ledger state for the file is discarded
///    so a stale or mismatched buffer cannot compound into later errors.
///    A pure deletion (empty `added`) only discards the buffer: a live tab
///    mark stays pending for the insertion event that follows.
pub fn classify(
    ledger: &mut TypedInputLedger,
    file: &str,
    added: &str,
    removed_len: usize,
    now: DateTime<Utc>,
) -> ClassifyOutcome {
    let _ = removed_len; // deletions carry no added bytes to attribute
    ledger.expire(now);

    // Rule 2: explicit tab signal.
    if ledger.tab_mark_live(file, now) {
        if let Some(followup) = tab::classify_tab_followup(added) {
            ledger.take_tab_mark(file);
            ledger.clear(file);
            return match followup {
                TabFollowup::Indentation => ClassifyOutcome {
                    verdict: ClassificationVerdict::human(added.len()),
                    completion_hint: false,
                    rule: ClassifyRule::TabIndentation,
                },
                TabFollowup::Completion => ClassifyOutcome {
                    verdict: ClassificationVerdict::external(added.len()),
                    completion_hint: false,
                    rule: ClassifyRule::TabCompletion,
                },
            };
        }
        // Empty change under a live mark resolves nothing; fall through
        // with the mark intact.
    }

    // Rule 3: exact typed-input match.
    let pending = ledger.pending(file);
    if !pending.is_empty()
        && !added.is_empty()
        && (pending.starts_with(added) || added.starts_with(pending))
    {
        ledger.consume(file, added);
        return ClassifyOutcome {
            verdict: ClassificationVerdict::human(added.len()),
            completion_hint: false,
            rule: ClassifyRule::TypedMatch,
        };
    }

    // Rule 4: external.
    let completion_hint = tab::looks_like_completion(ledger.recently_typed(file, now), added);
    if added.is_empty() {
        // A pure deletion resolves nothing about a pending Tab; keep the
        // mark alive for the insertion that follows (editors remove the
        // selection in a separate event before inserting the followup).
        ledger.clear_pending(file);
    } else {
        ledger.clear(file);
    }
    ClassifyOutcome {
        verdict: ClassificationVerdict::external(added.len()),
        completion_hint,
        rule: ClassifyRule::External,
    }
}

// ─── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::TYPED_EXPIRY_MS;
    use crate::types::ChangeOrigin;
    use chrono::TimeDelta;

    fn ts(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s)
            .expect("valid RFC3339")
            .with_timezone(&Utc)
    }

    fn t0() -> DateTime<Utc> {
        ts("2026-02-25T12:00:00Z")
    }

    // ── 1. Keystrokes followed by the identical change are human ────

    #[test]
    fn typed_text_matching_change_is_human() {
        let mut ledger = TypedInputLedger::new();
        for c in ["f", "o", "o"] {
            ledger.record_typed("a.rs", c, t0());
        }
        let outcome = classify(&mut ledger, "a.rs", "foo", 0, t0());
        assert_eq!(outcome.rule, ClassifyRule::TypedMatch);
        assert_eq!(outcome.verdict.origin, ChangeOrigin::Human);
        assert_eq!(outcome.verdict.human_chars, 3);
        assert_eq!(outcome.verdict.external_chars, 0);
    }

    #[test]
    fn character_by_character_delivery_is_human() {
        let mut ledger = TypedInputLedger::new();
        for c in ["f", "o", "o"] {
            ledger.record_typed("a.rs", c, t0());
        }
        // Host delivers three one-char change events.
        for (i, c) in ["f", "o", "o"].iter().enumerate() {
            let outcome = classify(&mut ledger, "a.rs", c, 0, t0());
            assert_eq!(
                outcome.verdict.origin,
                ChangeOrigin::Human,
                "char {i} should be human"
            );
            assert_eq!(outcome.verdict.human_chars, 1);
        }
        assert_eq!(ledger.pending("a.rs"), "");
    }

    #[test]
    fn coalesced_superset_delivery_is_human() {
        // Keystrokes lag the change event: pending "fo", change "foo".
        let mut ledger = TypedInputLedger::new();
        ledger.record_typed("a.rs", "fo", t0());
        let outcome = classify(&mut ledger, "a.rs", "foo", 0, t0());
        assert_eq!(outcome.rule, ClassifyRule::TypedMatch);
        assert_eq!(outcome.verdict.human_chars, 3);
        assert_eq!(ledger.pending("a.rs"), "", "buffer fully consumed");
    }

    // ── 2. Tab mark precedence ──────────────────────────────────────

    #[test]
    fn tab_then_spaces_is_human_indentation() {
        let mut ledger = TypedInputLedger::new();
        ledger.set_tab_mark("a.rs", t0());
        let outcome = classify(&mut ledger, "a.rs", "  ", 0, t0());
        assert_eq!(outcome.rule, ClassifyRule::TabIndentation);
        assert_eq!(outcome.verdict.origin, ChangeOrigin::Human);
        assert_eq!(outcome.verdict.human_chars, 2);
    }

    #[test]
    fn tab_then_code_is_external_completion() {
        let mut ledger = TypedInputLedger::new();
        ledger.set_tab_mark("a.rs", t0());
        let outcome = classify(&mut ledger, "a.rs", "function foo() {", 0, t0());
        assert_eq!(outcome.rule, ClassifyRule::TabCompletion);
        assert_eq!(outcome.verdict.origin, ChangeOrigin::External);
        assert_eq!(outcome.verdict.external_chars, 16);
    }

    #[test]
    fn tab_mark_beats_pending_buffer() {
        // Typed "\t" enters both the buffer and the mark; the mark wins and
        // the whole change is attributed through the disambiguator.
        let mut ledger = TypedInputLedger::new();
        ledger.record_typed("a.rs", "\t", t0());
        let outcome = classify(&mut ledger, "a.rs", "fn main() {}", 0, t0());
        assert_eq!(outcome.rule, ClassifyRule::TabCompletion);
        assert_eq!(outcome.verdict.origin, ChangeOrigin::External);
        assert_eq!(ledger.pending("a.rs"), "", "ledger cleared with the mark");
    }

    #[test]
    fn expired_tab_mark_is_ignored() {
        let mut ledger = TypedInputLedger::new();
        ledger.set_tab_mark("a.rs", t0());
        let later = t0() + TimeDelta::milliseconds(TYPED_EXPIRY_MS + 1);
        let outcome = classify(&mut ledger, "a.rs", "function foo() {", 0, later);
        assert_eq!(outcome.rule, ClassifyRule::External);
    }

    #[test]
    fn empty_change_leaves_tab_mark_intact() {
        let mut ledger = TypedInputLedger::new();
        ledger.set_tab_mark("a.rs", t0());
        let outcome = classify(&mut ledger, "a.rs", "", 1, t0());
        assert_eq!(outcome.rule, ClassifyRule::External);
        assert!(ledger.tab_mark_live("a.rs", t0()), "mark not consumed");
    }

    #[test]
    fn deletion_then_insertion_still_resolves_through_tab_mark() {
        // Tab over a selection: the editor first removes the selected text
        // in its own change event, then inserts the followup.
        let mut ledger = TypedInputLedger::new();
        ledger.set_tab_mark("a.rs", t0());
        let deletion = classify(&mut ledger, "a.rs", "", 7, t0());
        assert_eq!(deletion.rule, ClassifyRule::External);

        let insertion = classify(&mut ledger, "a.rs", "function foo() {", 0, t0());
        assert_eq!(insertion.rule, ClassifyRule::TabCompletion);
        assert!(!ledger.tab_mark_live("a.rs", t0()), "mark spent by followup");

        let indent = {
            let mut ledger = TypedInputLedger::new();
            ledger.set_tab_mark("b.rs", t0());
            classify(&mut ledger, "b.rs", "", 3, t0());
            classify(&mut ledger, "b.rs", "    ", 0, t0())
        };
        assert_eq!(indent.rule, ClassifyRule::TabIndentation);
    }

    // ── 3. External fallbacks ───────────────────────────────────────

    #[test]
    fn paste_with_no_keystrokes_is_external() {
        let mut ledger = TypedInputLedger::new();
        let outcome = classify(&mut ledger, "a.rs", "pasted block", 0, t0());
        assert_eq!(outcome.rule, ClassifyRule::External);
        assert_eq!(outcome.verdict.external_chars, 12);
    }

    #[test]
    fn unrelated_change_discards_pending_buffer() {
        let mut ledger = TypedInputLedger::new();
        ledger.record_typed("a.rs", "foo", t0());
        let outcome = classify(&mut ledger, "a.rs", " bar baz", 0, t0());
        assert_eq!(outcome.rule, ClassifyRule::External);
        assert_eq!(
            ledger.pending("a.rs"),
            "",
            "mismatched buffer must not survive"
        );
    }

    #[test]
    fn typed_prefix_coalesced_with_paste_matches_as_human() {
        // Edge case: matching is a bare prefix relationship, so a paste
        // that a host coalesces into one change together with just-typed
        // text is credited to the typed prefix in full. Hosts that deliver
        // the paste as its own event get the external verdict instead
        // (see unrelated_change_discards_pending_buffer).
        let mut ledger = TypedInputLedger::new();
        ledger.record_typed("a.rs", "foo", t0());
        let outcome = classify(&mut ledger, "a.rs", "foo bar baz", 0, t0());
        assert_eq!(outcome.rule, ClassifyRule::TypedMatch);
        assert_eq!(outcome.verdict.human_chars, 11);
    }

    #[test]
    fn pure_deletion_is_external_with_zero_chars() {
        let mut ledger = TypedInputLedger::new();
        let outcome = classify(&mut ledger, "a.rs", "", 10, t0());
        assert_eq!(outcome.verdict.origin, ChangeOrigin::External);
        assert_eq!(outcome.verdict.external_chars, 0);
    }

    #[test]
    fn stale_typed_buffer_does_not_match() {
        let mut ledger = TypedInputLedger::new();
        ledger.record_typed("a.rs", "foo", t0());
        let later = t0() + TimeDelta::milliseconds(TYPED_EXPIRY_MS + 1);
        let outcome = classify(&mut ledger, "a.rs", "foo", 0, later);
        assert_eq!(outcome.rule, ClassifyRule::External);
    }

    #[test]
    fn other_files_buffers_are_untouched() {
        let mut ledger = TypedInputLedger::new();
        ledger.record_typed("a.rs", "foo", t0());
        ledger.record_typed("b.rs", "bar", t0());
        classify(&mut ledger, "a.rs", "zzz", 0, t0());
        assert_eq!(ledger.pending("b.rs"), "bar");
    }

    // ── 4. Completion hint annotation ───────────────────────────────

    #[test]
    fn completion_hint_set_for_plausible_suggestion() {
        let mut ledger = TypedInputLedger::new();
        ledger.record_typed("a.rs", "re", t0());
        // "re" typed, then a whole different insertion arrives.
        let outcome = classify(&mut ledger, "a.rs", "let x = compute();", 0, t0());
        assert_eq!(outcome.rule, ClassifyRule::External);
        assert!(outcome.completion_hint);
    }

    #[test]
    fn completion_hint_absent_without_recent_typing() {
        let mut ledger = TypedInputLedger::new();
        let outcome = classify(&mut ledger, "a.rs", "return value;", 0, t0());
        assert!(!outcome.completion_hint);
    }
}
