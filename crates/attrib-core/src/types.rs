use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ─── Provenance ───────────────────────────────────────────────────

/// Final per-batch provenance of a recorded change.
///
/// Unattributed external edits (paste, undo/redo, completions accepted
/// without an explicit tab signal) are folded into `Human`: the user
/// proximately caused them even though they were not literal typing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    Human,
    Agent,
}

impl Provenance {
    pub const ALL: [Self; 2] = [Self::Human, Self::Agent];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Human => "human",
            Self::Agent => "agent",
        }
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provenance {
    type Err = AttribError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "human" => Ok(Self::Human),
            "agent" => Ok(Self::Agent),
            _ => Err(AttribError::UnknownProvenance(s.to_string())),
        }
    }
}

// ─── Per-change origin ────────────────────────────────────────────

/// Origin of a single document-change event, before batch resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeOrigin {
    /// Proven by an exact typed-input match or an indentation tab.
    Human,
    /// Not explained by intercepted keystrokes; attribution resolved at flush.
    External,
}

// ─── Classification verdict ──────────────────────────────────────

/// Classification is exact-or-not, so every verdict carries the same
/// maximal confidence. Kept as an explicit field so downstream records
/// stay shape-compatible with probabilistic classifiers.
pub const EXACT_MATCH_CONFIDENCE: f64 = 1.0;

/// Verdict for a single document-change event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassificationVerdict {
    pub origin: ChangeOrigin,
    /// Bytes of added text attributed to keystrokes or indentation.
    pub human_chars: usize,
    /// Bytes of added text with no keystroke proof.
    pub external_chars: usize,
    pub confidence: f64,
}

impl ClassificationVerdict {
    pub fn human(chars: usize) -> Self {
        Self {
            origin: ChangeOrigin::Human,
            human_chars: chars,
            external_chars: 0,
            confidence: EXACT_MATCH_CONFIDENCE,
        }
    }

    pub fn external(chars: usize) -> Self {
        Self {
            origin: ChangeOrigin::External,
            human_chars: 0,
            external_chars: chars,
            confidence: EXACT_MATCH_CONFIDENCE,
        }
    }
}

// ─── Emitted record ───────────────────────────────────────────────

/// One flushed batch: provenance plus the compressed diff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffRecord {
    pub source: Provenance,
    /// Agent interaction subtype captured from the oracle, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtype: Option<String>,
    /// Agent interaction payload captured at change time, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
    pub file: String,
    /// Unified-style diff text.
    pub diff: String,
    pub lines_added: usize,
    pub lines_removed: usize,
    pub timestamp: DateTime<Utc>,
}

// ─── Host event protocol ──────────────────────────────────────────

/// Events the editor integration feeds into the engine, one JSON object
/// per line on the runtime's stdin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostEvent {
    /// A literal character insertion intercepted at the keystroke level.
    Keystroke {
        file: String,
        text: String,
        ts: DateTime<Utc>,
    },
    /// Tab key pressed; some hosts route Tab outside the keystroke channel.
    TabPressed { file: String, ts: DateTime<Utc> },
    /// Document opened or first seen; seeds the baseline snapshot.
    Opened {
        file: String,
        text: String,
        ts: DateTime<Utc>,
    },
    /// Document content changed. `text` is the full post-change buffer.
    Changed {
        file: String,
        added: String,
        removed: usize,
        text: String,
        ts: DateTime<Utc>,
    },
    /// Active editor switched away from `file` (flush trigger).
    Focus {
        #[serde(skip_serializing_if = "Option::is_none")]
        file: Option<String>,
        ts: DateTime<Utc>,
    },
    Closed { file: String, ts: DateTime<Utc> },
    Created {
        file: String,
        text: String,
        ts: DateTime<Utc>,
    },
    Deleted { file: String, ts: DateTime<Utc> },
    /// Out-of-band agent activity notification from the host itself.
    Agent {
        subtype: String,
        #[serde(default)]
        payload: serde_json::Value,
        #[serde(skip_serializing_if = "Option::is_none")]
        workspace: Option<String>,
        ts: DateTime<Utc>,
    },
}

// ─── Error ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttribError {
    UnknownProvenance(String),
}

impl fmt::Display for AttribError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownProvenance(s) => write!(f, "unknown provenance: {s}"),
        }
    }
}

impl std::error::Error for AttribError {}

// ─── Tests ────────────────────────────────────────────────────────
