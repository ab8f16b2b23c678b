//! The attribution engine: single-threaded, event-driven. All
//! classification runs synchronously inside the host-event handlers; the
//! only asynchrony the runtime adds around this is the tick that drives
//! debounce flushes and signal polling.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use chrono::{DateTime, TimeDelta, Utc};
use tracing::{debug, warn};

use attrib_core::classify::{self, ClassifyRule};
use attrib_core::diff;
use attrib_core::ledger::TypedInputLedger;
use attrib_core::oracle::{AgentOracle, DEFAULT_RECENT_WINDOW_SECS};
use attrib_core::types::{ChangeOrigin, DiffRecord, HostEvent, Provenance};

use crate::batch::{self, FileBatch};
use crate::signal::AgentSignal;
use crate::sink::{RecordingSink, SinkError};

/// Quiet period after the last change before a batch flushes (seconds).
pub const DEFAULT_DEBOUNCE_SECS: u64 = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub debounce: TimeDelta,
    /// Oracle recency window; see `attrib_core::oracle` for the trade-off.
    pub recent_window: TimeDelta,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            debounce: TimeDelta::seconds(DEFAULT_DEBOUNCE_SECS as i64),
            recent_window: TimeDelta::seconds(DEFAULT_RECENT_WINDOW_SECS as i64),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Sink(#[from] SinkError),
}

/// Owns the ledger, the oracle, and the per-file batch arena. Constructed
/// once at session start; no global state, so tests build fresh instances.
pub struct Engine<S: RecordingSink> {
    config: EngineConfig,
    ledger: TypedInputLedger,
    oracle: AgentOracle,
    batches: HashMap<String, FileBatch>,
    /// Last known full buffer text per open file; the baseline source for
    /// the next batch after a flush.
    texts: HashMap<String, String>,
    active_file: Option<String>,
    sink: S,
}

impl<S: RecordingSink> Engine<S> {
    pub fn new(config: EngineConfig, sink: S) -> Self {
        let oracle = AgentOracle::new(config.recent_window);
        Self {
            config,
            ledger: TypedInputLedger::new(),
            oracle,
            batches: HashMap::new(),
            texts: HashMap::new(),
            active_file: None,
            sink,
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn oracle(&self) -> &AgentOracle {
        &self.oracle
    }

    /// Dispatch one host event.
    pub fn handle(&mut self, event: HostEvent) -> Result<(), EngineError> {
        match event {
            HostEvent::Keystroke { file, text, ts } => {
                self.on_keystroke(&file, &text, ts);
                Ok(())
            }
            HostEvent::TabPressed { file, ts } => {
                self.on_tab_pressed(&file, ts);
                Ok(())
            }
            HostEvent::Opened { file, text, ts } => {
                self.on_document_opened(&file, text, ts);
                Ok(())
            }
            HostEvent::Changed {
                file,
                added,
                removed,
                text,
                ts,
            } => {
                self.on_document_changed(&file, &added, removed, &text, ts);
                Ok(())
            }
            HostEvent::Focus { file, ts } => self.on_editor_switched(file.as_deref(), ts),
            HostEvent::Closed { file, ts } => self.on_document_closed(&file, ts),
            HostEvent::Created { file, text, ts } => self.on_file_created(&file, &text, ts),
            HostEvent::Deleted { file, ts } => self.on_file_deleted(&file, ts),
            HostEvent::Agent {
                subtype,
                payload,
                workspace,
                ts,
            } => {
                self.apply_signal(AgentSignal {
                    subtype,
                    payload,
                    workspace,
                    observed_at: ts,
                });
                Ok(())
            }
        }
    }

    /// Every literal character insertion the host can intercept.
    pub fn on_keystroke(&mut self, file: &str, text: &str, now: DateTime<Utc>) {
        self.ledger.record_typed(file, text, now);
    }

    /// Tab keypress, for hosts that route Tab outside the keystroke channel.
    pub fn on_tab_pressed(&mut self, file: &str, now: DateTime<Utc>) {
        self.ledger.set_tab_mark(file, now);
    }

    pub fn on_document_opened(&mut self, file: &str, text: String, _now: DateTime<Utc>) {
        self.texts.insert(file.to_string(), text);
    }

    /// Classify one document change and fold it into the file's batch.
    pub fn on_document_changed(
        &mut self,
        file: &str,
        added: &str,
        removed_len: usize,
        current: &str,
        now: DateTime<Utc>,
    ) {
        let outcome = classify::classify(&mut self.ledger, file, added, removed_len, now);
        let batch = match self.batches.entry(file.to_string()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let baseline = self.texts.get(file).cloned().unwrap_or_else(|| {
                    // Change for a document we never saw open: the first
                    // change is absorbed into the baseline and only later
                    // deltas diff.
                    warn!(file, "change event for unseeded document");
                    current.to_string()
                });
                entry.insert(FileBatch::new(baseline, now))
            }
        };
        batch.record(&outcome.verdict, current, now);

        if outcome.verdict.origin == ChangeOrigin::External {
            if let Some(attribution) = self.oracle.attribution(Some(file), now) {
                batch.capture_agent(attribution.subtype, attribution.payload);
            }
            if outcome.completion_hint {
                debug!(file, rule = ?outcome.rule, "external change resembles a completion acceptance");
            }
        }
        if outcome.rule == ClassifyRule::TabCompletion {
            debug!(file, "tab-triggered completion accepted");
        }

        self.texts.insert(file.to_string(), current.to_string());
    }

    /// Active editor switched: flush the file we are leaving.
    pub fn on_editor_switched(
        &mut self,
        file: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<(), EngineError> {
        let previous = self.active_file.take();
        self.active_file = file.map(str::to_string);
        if let Some(previous) = previous {
            if Some(previous.as_str()) != file {
                self.flush(&previous, now)?;
            }
        }
        Ok(())
    }

    pub fn on_document_closed(&mut self, file: &str, now: DateTime<Utc>) -> Result<(), EngineError> {
        self.flush(file, now)?;
        self.texts.remove(file);
        self.ledger.clear(file);
        Ok(())
    }

    /// File created: whole-content addition record, bypassing the LCS walk.
    pub fn on_file_created(
        &mut self,
        file: &str,
        text: &str,
        now: DateTime<Utc>,
    ) -> Result<(), EngineError> {
        self.texts.insert(file.to_string(), text.to_string());
        let result = diff::full_addition(text);
        if result.is_empty() {
            return Ok(());
        }
        self.emit_whole_file(file, result, now)
    }

    /// File deleted: flush whatever was pending, then emit the removal of
    /// the last known content.
    pub fn on_file_deleted(&mut self, file: &str, now: DateTime<Utc>) -> Result<(), EngineError> {
        self.flush(file, now)?;
        self.ledger.clear(file);
        let Some(text) = self.texts.remove(file) else {
            return Ok(());
        };
        let result = diff::full_removal(&text);
        if result.is_empty() {
            return Ok(());
        }
        self.emit_whole_file(file, result, now)
    }

    /// Expire stale state and flush every batch past its debounce deadline.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Result<usize, EngineError> {
        self.ledger.expire(now);
        self.oracle.expire(now);

        let due: Vec<String> = self
            .batches
            .iter()
            .filter(|(_, batch)| {
                batch
                    .deadline(self.config.debounce)
                    .is_some_and(|deadline| deadline <= now)
            })
            .map(|(file, _)| file.clone())
            .collect();

        let mut flushed = 0;
        for file in due {
            if self.flush(&file, now)?.is_some() {
                flushed += 1;
            }
        }
        Ok(flushed)
    }

    /// Flush one file's batch: diff baseline against current, resolve the
    /// batch provenance, emit. Equal texts emit nothing but still reset
    /// the batch. Per-file failures leave other files' state untouched.
    pub fn flush(&mut self, file: &str, now: DateTime<Utc>) -> Result<Option<DiffRecord>, EngineError> {
        let Some(batch) = self.batches.remove(file) else {
            return Ok(None);
        };
        self.ledger.clear(file);
        debug!(
            file,
            batch_age_ms = (now - batch.opened_at).num_milliseconds(),
            "flushing batch"
        );

        let result = diff::diff(&batch.baseline, &batch.current);
        if result.is_empty() {
            return Ok(None);
        }

        let resolution = batch::resolve(&batch, &mut self.oracle, file, now);
        let record = DiffRecord {
            source: resolution.source,
            subtype: resolution.subtype,
            payload: resolution.payload,
            file: file.to_string(),
            diff: result.to_unified(),
            lines_added: result.added_lines,
            lines_removed: result.removed_lines,
            timestamp: now,
        };
        self.sink.emit(&record)?;
        Ok(Some(record))
    }

    /// Flush every pending batch. Called on shutdown: a pending edit that
    /// was never flushed is data loss, not cancellation.
    pub fn shutdown(&mut self, now: DateTime<Utc>) -> Result<usize, EngineError> {
        let files: Vec<String> = self.batches.keys().cloned().collect();
        let mut flushed = 0;
        for file in files {
            if self.flush(&file, now)?.is_some() {
                flushed += 1;
            }
        }
        Ok(flushed)
    }

    /// Feed one polled agent signal into the oracle. Latest wins.
    pub fn apply_signal(&mut self, signal: AgentSignal) {
        debug!(subtype = %signal.subtype, workspace = ?signal.workspace, "agent signal");
        self.oracle.mark_active(
            &signal.subtype,
            signal.payload,
            signal.workspace.as_deref(),
            signal.observed_at,
        );
    }

    fn emit_whole_file(
        &mut self,
        file: &str,
        result: diff::DiffResult,
        now: DateTime<Utc>,
    ) -> Result<(), EngineError> {
        let source = if let Some(attribution) = self.oracle.attribution(Some(file), now) {
            self.oracle.consume();
            (Provenance::Agent, Some(attribution.subtype), Some(attribution.payload))
        } else {
            (Provenance::Human, None, None)
        };
        let record = DiffRecord {
            source: source.0,
            subtype: source.1,
            payload: source.2,
            file: file.to_string(),
            diff: result.to_unified(),
            lines_added: result.added_lines,
            lines_removed: result.removed_lines,
            timestamp: now,
        };
        self.sink.emit(&record)?;
        Ok(())
    }
}

// ─── Tests ────────────────────────────────────────────────────────
