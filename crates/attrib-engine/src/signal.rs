//! Agent signal sources: how the oracle learns that an agent is active.
//! The engine polls a source periodically; an unreadable source means "no
//! signal", never an error that stops the session — the next poll tick is
//! the retry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One observed agent activation from an external data source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSignal {
    /// Interaction subtype, e.g. `"composer"` or `"inline_edit"`.
    pub subtype: String,
    #[serde(default)]
    pub payload: Value,
    /// Workspace root the activation belongs to, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace: Option<String>,
    pub observed_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum SignalError {
    #[error("signal source io: {0}")]
    Io(#[from] std::io::Error),
    #[error("signal source decode: {0}")]
    Decode(#[from] serde_json::Error),
}

/// A pollable source of agent activations. `poll` returns only signals
/// not yet reported; the same activation must not be yielded twice, or a
/// consumed oracle would be re-armed by its own past.
pub trait AgentSignalSource {
    fn poll(&mut self, now: DateTime<Utc>) -> Result<Vec<AgentSignal>, SignalError>;
}
