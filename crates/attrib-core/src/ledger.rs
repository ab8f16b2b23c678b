//! Typed-input ledger: the one deterministic signal available for human
//! authorship. Records every character delivered through the keystroke
//! interception channel, keyed per file, pending attribution to a
//! document-change event. Entries expire quickly: typed text that was not
//! matched against a change within the window is evidence of nothing.

use chrono::{DateTime, TimeDelta, Utc};
use std::collections::{HashMap, VecDeque};

/// Expiry window for typed input and pending tab marks (milliseconds).
/// A keystroke's document change lands within a frame or two; anything
/// older than this no longer explains the change in front of us.
pub const TYPED_EXPIRY_MS: i64 = 500;

/// How long after the last keystroke a file counts as "recently typed in"
/// for the best-effort completion heuristic (milliseconds).
pub const RECENT_TYPING_MS: i64 = 2_000;

/// One intercepted keystroke (possibly multi-byte, possibly coalesced).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypedInputRecord {
    pub file: String,
    pub text: String,
    pub typed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingBuffer {
    text: String,
    last_typed_at: DateTime<Utc>,
}

/// Per-file pending typed text plus the global keystroke queue.
///
/// Invariant: each pending buffer is always a prefix-consistent remainder
/// of what was actually typed and not yet attributed to a change. On any
/// mismatch the buffer is discarded wholesale; losing track is preferred
/// over crediting leftover text to a later, unrelated change.
#[derive(Debug, Default)]
pub struct TypedInputLedger {
    queue: VecDeque<TypedInputRecord>,
    pending: HashMap<String, PendingBuffer>,
    /// At most one pending tab mark per file; latest wins.
    tab_marks: HashMap<String, DateTime<Utc>>,
    /// Last keystroke time per file, surviving buffer consumption.
    last_typed: HashMap<String, DateTime<Utc>>,
}

impl TypedInputLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record intercepted typed text for `file`.
    ///
    /// A `\t` additionally sets the pending tab mark: a Tab keypress is
    /// ambiguous between indentation and completion trigger, and only the
    /// following document-change event resolves which.
    pub fn record_typed(&mut self, file: &str, text: &str, now: DateTime<Utc>) {
        if text.is_empty() {
            return;
        }
        self.queue.push_back(TypedInputRecord {
            file: file.to_string(),
            text: text.to_string(),
            typed_at: now,
        });
        let buffer = self.pending.entry(file.to_string()).or_insert(PendingBuffer {
            text: String::new(),
            last_typed_at: now,
        });
        buffer.text.push_str(text);
        buffer.last_typed_at = now;
        self.last_typed.insert(file.to_string(), now);

        if text.contains('\t') {
            self.set_tab_mark(file, now);
        }
    }

    /// Not-yet-matched typed text for `file`.
    pub fn pending(&self, file: &str) -> &str {
        self.pending.get(file).map_or("", |b| b.text.as_str())
    }

    /// Remove a matched prefix from the pending buffer. If `matched` covers
    /// the whole buffer (or more: coalesced delivery can hand us a superset
    /// of what was recorded) the buffer is dropped; if `matched` is not
    /// related to the buffer by prefix in either direction, the buffer is
    /// cleared entirely rather than carried forward.
    pub fn consume(&mut self, file: &str, matched: &str) {
        let Some(buffer) = self.pending.get_mut(file) else {
            return;
        };
        if matched.len() >= buffer.text.len() {
            // Either the change covers the whole buffer or it is unrelated;
            // both end with the buffer dropped.
            self.pending.remove(file);
        } else if buffer.text.starts_with(matched) {
            buffer.text.drain(..matched.len());
            if buffer.text.is_empty() {
                self.pending.remove(file);
            }
        } else {
            self.pending.remove(file);
        }
    }

    /// Drop queue records and pending buffers older than the expiry window.
    /// Stale tab marks go with them.
    pub fn expire(&mut self, now: DateTime<Utc>) {
        let limit = TimeDelta::milliseconds(TYPED_EXPIRY_MS);
        while let Some(front) = self.queue.front() {
            if now.signed_duration_since(front.typed_at) > limit {
                self.queue.pop_front();
            } else {
                break;
            }
        }
        self.pending
            .retain(|_, buffer| now.signed_duration_since(buffer.last_typed_at) <= limit);
        self.tab_marks
            .retain(|_, set_at| now.signed_duration_since(*set_at) <= limit);
    }

    /// Drop all per-file state (pending buffer and tab mark) for `file`.
    pub fn clear(&mut self, file: &str) {
        self.pending.remove(file);
        self.tab_marks.remove(file);
    }

    /// Drop only the pending typed buffer for `file`, leaving any tab mark
    /// in place.
    pub fn clear_pending(&mut self, file: &str) {
        self.pending.remove(file);
    }

    /// Set the pending tab mark for `file` (latest wins). Hosts that route
    /// Tab through a command path instead of the keystroke channel call
    /// this directly.
    pub fn set_tab_mark(&mut self, file: &str, now: DateTime<Utc>) {
        self.tab_marks.insert(file.to_string(), now);
    }

    /// Whether a non-expired tab mark exists for `file`.
    pub fn tab_mark_live(&self, file: &str, now: DateTime<Utc>) -> bool {
        self.tab_marks.get(file).is_some_and(|set_at| {
            now.signed_duration_since(*set_at) <= TimeDelta::milliseconds(TYPED_EXPIRY_MS)
        })
    }

    /// Consume the tab mark for `file`, returning when it was set.
    pub fn take_tab_mark(&mut self, file: &str) -> Option<DateTime<Utc>> {
        self.tab_marks.remove(file)
    }

    /// Whether the user typed in `file` within the recent-typing window.
    /// Survives buffer consumption; feeds the completion heuristic only.
    pub fn recently_typed(&self, file: &str, now: DateTime<Utc>) -> bool {
        self.last_typed.get(file).is_some_and(|typed_at| {
            now.signed_duration_since(*typed_at) <= TimeDelta::milliseconds(RECENT_TYPING_MS)
        })
    }

    /// Number of records currently in the global queue.
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }
}

// ─── Tests ────────────────────────────────────────────────────────
