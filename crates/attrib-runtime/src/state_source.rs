//! State-file signal source. The editor extension writes the most recent
//! agent activation as a single JSON object to a well-known file; we poll
//! it and report each activation once, keyed by its `observed_at`.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use attrib_engine::signal::{AgentSignal, AgentSignalSource, SignalError};

pub struct StateFileSource {
    path: PathBuf,
    /// `observed_at` of the newest activation already reported.
    last_seen: Option<DateTime<Utc>>,
}

impl StateFileSource {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            last_seen: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Decode one read of the state file. An activation is yielded only the
    /// first time its timestamp is seen, so a re-read of an unchanged file
    /// cannot re-arm a consumed oracle.
    pub fn ingest(&mut self, bytes: &[u8]) -> Result<Vec<AgentSignal>, SignalError> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }
        let signal: AgentSignal = serde_json::from_slice(bytes)?;
        if self
            .last_seen
            .is_some_and(|seen| signal.observed_at <= seen)
        {
            return Ok(Vec::new());
        }
        self.last_seen = Some(signal.observed_at);
        Ok(vec![signal])
    }
}

impl AgentSignalSource for StateFileSource {
    fn poll(&mut self, _now: DateTime<Utc>) -> Result<Vec<AgentSignal>, SignalError> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            // Missing file means no agent has run yet, not an error.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        self.ingest(&bytes)
    }
}

// ─── Tests ────────────────────────────────────────────────────────
