//! Per-file batch state: everything accumulated for one file between two
//! flushes, plus the final provenance resolution applied at flush time.

use chrono::{DateTime, TimeDelta, Utc};
use serde_json::Value;

use attrib_core::oracle::AgentOracle;
use attrib_core::types::{ClassificationVerdict, Provenance};

/// Accumulated change state for one file.
#[derive(Debug, Clone, PartialEq)]
pub struct FileBatch {
    /// Buffer text at batch creation; the diff baseline.
    pub baseline: String,
    /// Most recent full buffer text.
    pub current: String,
    pub opened_at: DateTime<Utc>,
    pub last_change_at: Option<DateTime<Utc>>,
    pub human_chars: usize,
    pub external_chars: usize,
    /// Set when an external change landed while the oracle was active.
    pub agent_activity: bool,
    /// Oracle subtype/payload captured at change time. Captured then, not
    /// at flush: in inline-edit flows the user reviews before accepting,
    /// and the payload live during the edit is the one that explains it.
    pub agent_subtype: Option<String>,
    pub agent_payload: Option<Value>,
}

impl FileBatch {
    pub fn new(baseline: String, now: DateTime<Utc>) -> Self {
        Self {
            current: baseline.clone(),
            baseline,
            opened_at: now,
            last_change_at: None,
            human_chars: 0,
            external_chars: 0,
            agent_activity: false,
            agent_subtype: None,
            agent_payload: None,
        }
    }

    /// Fold one classified change into the batch.
    pub fn record(&mut self, verdict: &ClassificationVerdict, current: &str, now: DateTime<Utc>) {
        self.human_chars += verdict.human_chars;
        self.external_chars += verdict.external_chars;
        self.current.clear();
        self.current.push_str(current);
        self.last_change_at = Some(now);
    }

    /// Capture the oracle attribution live at this moment.
    pub fn capture_agent(&mut self, subtype: String, payload: Value) {
        self.agent_activity = true;
        self.agent_subtype = Some(subtype);
        self.agent_payload = Some(payload);
    }

    /// Whether the batch has observed any change since creation.
    pub fn is_dirty(&self) -> bool {
        self.last_change_at.is_some()
    }

    /// Debounce deadline: quiet period after the last change.
    pub fn deadline(&self, debounce: TimeDelta) -> Option<DateTime<Utc>> {
        self.last_change_at.map(|t| t + debounce)
    }
}

/// Resolved provenance for a flushed batch.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub source: Provenance,
    pub subtype: Option<String>,
    pub payload: Option<Value>,
}

/// Resolve the batch's final provenance, in order:
///
/// 1. Agent activity was captured during the batch: agent. The oracle is
///    consumed so the same activation cannot bleed into later edits.
/// 2. Proven keystrokes anywhere in the batch: human, unconditionally.
///    The ledger proof is definitive and no heuristic overrides it.
/// 3. External-only batch: one late oracle recheck, defending against the
///    race where the agent signal arrives between the last change and the
///    debounce flush. Active now: agent (consume). Otherwise: human —
///    paste, undo/redo, and unsignaled completion acceptances are folded
///    into human provenance because the user proximately caused them.
pub fn resolve(
    batch: &FileBatch,
    oracle: &mut AgentOracle,
    file: &str,
    now: DateTime<Utc>,
) -> Resolution {
    if batch.agent_activity {
        oracle.consume();
        return Resolution {
            source: Provenance::Agent,
            subtype: batch.agent_subtype.clone(),
            payload: batch.agent_payload.clone(),
        };
    }
    if batch.human_chars > 0 {
        return Resolution {
            source: Provenance::Human,
            subtype: None,
            payload: None,
        };
    }
    if batch.external_chars > 0 {
        if let Some(attribution) = oracle.attribution(Some(file), now) {
            oracle.consume();
            return Resolution {
                source: Provenance::Agent,
                subtype: Some(attribution.subtype),
                payload: Some(attribution.payload),
            };
        }
    }
    Resolution {
        source: Provenance::Human,
        subtype: None,
        payload: None,
    }
}

// ─── Tests ────────────────────────────────────────────────────────
