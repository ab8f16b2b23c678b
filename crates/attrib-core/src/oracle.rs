//! Agent activity oracle: answers "is an AI agent likely responsible for
//! changes right now." Modeled as an explicit state machine so the
//! never-double-attribute invariant is checkable independent of timing:
//!
//! ```text
//! Idle ──mark_active──▶ Active{consumed: false}
//!                           │ consume()
//!                           ▼
//!                       Active{consumed: true} ──window elapses──▶ Idle
//! ```
//!
//! Once a classifier bills a batch to the agent it must call `consume()`
//! exactly once; from then on the same activation never answers "active"
//! again, so a stale agent signal cannot infect later human typing.

use chrono::{DateTime, TimeDelta, Utc};
use serde_json::Value;

/// Default recency window (seconds). Deliberately a tunable, not a truth:
/// too short misclassifies slow agent edits as human, too generous bills
/// unrelated human edits to the agent. Validate against recorded traces
/// before changing the default.
pub const DEFAULT_RECENT_WINDOW_SECS: u64 = 10;

/// Activation state of the oracle.
#[derive(Debug, Clone, PartialEq)]
pub enum ActivationState {
    Idle,
    Active {
        since: DateTime<Utc>,
        subtype: String,
        payload: Value,
        /// Workspace root this activation belongs to; `None` means any.
        scope: Option<String>,
        consumed: bool,
    },
}

/// Agent subtype and payload captured from a live activation.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentAttribution {
    pub subtype: String,
    pub payload: Value,
}

#[derive(Debug)]
pub struct AgentOracle {
    state: ActivationState,
    recent_window: TimeDelta,
}

impl AgentOracle {
    pub fn new(recent_window: TimeDelta) -> Self {
        Self {
            state: ActivationState::Idle,
            recent_window,
        }
    }

    pub fn with_default_window() -> Self {
        Self::new(TimeDelta::seconds(DEFAULT_RECENT_WINDOW_SECS as i64))
    }

    /// Record a fresh agent activation. Always resets the consumed flag:
    /// a new signal is new evidence even if the previous one was spent.
    pub fn mark_active(
        &mut self,
        subtype: &str,
        payload: Value,
        scope: Option<&str>,
        now: DateTime<Utc>,
    ) {
        self.state = ActivationState::Active {
            since: now,
            subtype: subtype.to_string(),
            payload,
            scope: scope.map(str::to_string),
            consumed: false,
        };
    }

    /// Active predicate: unconsumed, within the recency window, and scoped
    /// to the asking path. A change under workspace A is never attributed
    /// to activity detected in workspace B.
    pub fn is_active(&self, path: Option<&str>, now: DateTime<Utc>) -> bool {
        match &self.state {
            ActivationState::Idle => false,
            ActivationState::Active {
                since,
                scope,
                consumed,
                ..
            } => {
                !*consumed
                    && now.signed_duration_since(*since) < self.recent_window
                    && scope_matches(scope.as_deref(), path)
            }
        }
    }

    /// Subtype and payload of the live activation, if the active predicate
    /// holds for `path`. Callers capture this at change time, not at flush
    /// time: for inline-edit flows the payload live during the edit is the
    /// one that explains it.
    pub fn attribution(&self, path: Option<&str>, now: DateTime<Utc>) -> Option<AgentAttribution> {
        if !self.is_active(path, now) {
            return None;
        }
        match &self.state {
            ActivationState::Active {
                subtype, payload, ..
            } => Some(AgentAttribution {
                subtype: subtype.clone(),
                payload: payload.clone(),
            }),
            ActivationState::Idle => None,
        }
    }

    /// Mark the current activation as spent. Idempotent; a consumed
    /// activation stays inactive until the next `mark_active`.
    pub fn consume(&mut self) {
        if let ActivationState::Active { consumed, .. } = &mut self.state {
            *consumed = true;
        }
    }

    /// Collapse an activation whose window has fully elapsed back to Idle.
    /// `is_active` already accounts for time; this keeps the state machine
    /// honest for observers.
    pub fn expire(&mut self, now: DateTime<Utc>) {
        if let ActivationState::Active { since, .. } = &self.state {
            if now.signed_duration_since(*since) >= self.recent_window {
                self.state = ActivationState::Idle;
            }
        }
    }

    pub fn state(&self) -> &ActivationState {
        &self.state
    }

    pub fn recent_window(&self) -> TimeDelta {
        self.recent_window
    }
}

/// Path-prefix scope match. An unscoped activation matches any path; an
/// unscoped query matches any activation.
fn scope_matches(scope: Option<&str>, path: Option<&str>) -> bool {
    match (scope, path) {
        (None, _) | (_, None) => true,
        (Some(scope), Some(path)) => path.starts_with(scope),
    }
}

// ─── Tests ────────────────────────────────────────────────────────
