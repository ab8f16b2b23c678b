//! Session event loop: host events arrive as JSONL on stdin, the tick
//! interval drives signal polling and debounce flushes, and shutdown
//! flushes whatever is still pending.

use std::io::Write;

use chrono::{TimeDelta, Utc};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::{Duration, interval, timeout};

use attrib_engine::engine::{Engine, EngineConfig};
use attrib_engine::sink::{JsonlSink, RecordingSink};
use attrib_engine::types::HostEvent;

use crate::cli::RunOpts;
use crate::state_source::StateFileSource;

pub async fn run_session(opts: RunOpts) -> anyhow::Result<()> {
    let writer: Box<dyn Write + Send> = match &opts.output {
        Some(path) => Box::new(
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?,
        ),
        None => Box::new(std::io::stdout()),
    };
    let sink = JsonlSink::new(writer);

    let config = EngineConfig {
        debounce: TimeDelta::milliseconds(opts.debounce_ms as i64),
        recent_window: TimeDelta::seconds(opts.agent_window_secs as i64),
    };
    let mut engine = Engine::new(config, sink);
    let mut source = opts.state_file.clone().map(StateFileSource::new);
    let recheck = Duration::from_millis(opts.recheck_timeout_ms);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut ticker = interval(Duration::from_millis(opts.poll_interval_ms));

    tracing::info!(
        debounce_ms = opts.debounce_ms,
        agent_window_secs = opts.agent_window_secs,
        state_file = ?opts.state_file,
        "attribution session starting"
    );

    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => handle_line(&mut engine, &line)?,
                // Host closed the pipe; the session is over.
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!("stdin read failed: {e}");
                    break;
                }
            },
            _ = ticker.tick() => {
                let now = Utc::now();
                // Signals land before deadline flushes so that an
                // activation racing the debounce still attributes.
                poll_signals(&mut engine, source.as_mut(), recheck).await;
                engine.tick(now)?;
            }
            () = shutdown_signal() => break,
        }
    }

    let now = Utc::now();
    poll_signals(&mut engine, source.as_mut(), recheck).await;
    let flushed = engine.shutdown(now)?;
    tracing::info!(flushed, "session closed");
    Ok(())
}

/// Parse and dispatch one stdin line. A malformed line is logged and
/// dropped; only sink failures end the session.
fn handle_line<S: RecordingSink>(
    engine: &mut Engine<S>,
    line: &str,
) -> Result<(), attrib_engine::engine::EngineError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(());
    }
    match serde_json::from_str::<HostEvent>(line) {
        Ok(event) => engine.handle(event),
        Err(e) => {
            tracing::warn!("malformed host event: {e}");
            Ok(())
        }
    }
}

/// Read the state file once, under a timeout so a hung filesystem cannot
/// stall the flush that follows. The read goes through `tokio::fs` rather
/// than `AgentSignalSource::poll`: the sync poll would need
/// `spawn_blocking`, which takes ownership, and a timed-out task would
/// abandon the source together with its dedupe state. Decode and dedupe
/// still run through `StateFileSource::ingest`, the same path the trait's
/// `poll` uses, so the two entry points cannot drift.
async fn poll_signals<S: RecordingSink>(
    engine: &mut Engine<S>,
    source: Option<&mut StateFileSource>,
    recheck: Duration,
) {
    let Some(source) = source else { return };
    match timeout(recheck, tokio::fs::read(source.path())).await {
        Err(_) => tracing::warn!("state file read timed out"),
        Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {}
        Ok(Err(e)) => tracing::warn!("state file read failed: {e}"),
        Ok(Ok(bytes)) => match source.ingest(&bytes) {
            Ok(signals) => {
                for signal in signals {
                    engine.apply_signal(signal);
                }
            }
            Err(e) => tracing::warn!("state file decode failed: {e}"),
        },
    }
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => tracing::info!("received ctrl-c, shutting down"),
                    _ = sigterm.recv() => tracing::info!("received SIGTERM, shutting down"),
                }
            }
            Err(e) => {
                tracing::warn!("failed to register SIGTERM handler: {e}");
                ctrl_c.await.ok();
            }
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        tracing::info!("received ctrl-c, shutting down");
    }
}

// ─── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use attrib_engine::sink::MemorySink;
    use attrib_engine::types::Provenance;

    fn engine() -> Engine<MemorySink> {
        Engine::new(EngineConfig::default(), MemorySink::new())
    }

    #[test]
    fn malformed_lines_are_dropped() {
        let mut e = engine();
        handle_line(&mut e, "not json at all").expect("handled");
        handle_line(&mut e, r#"{"type":"unknown_kind"}"#).expect("handled");
        handle_line(&mut e, "").expect("handled");
        assert!(e.sink().records.is_empty());
    }

    #[test]
    fn lines_drive_the_engine() {
        let mut e = engine();
        handle_line(
            &mut e,
            r#"{"type":"opened","file":"a.rs","text":"","ts":"2026-02-25T12:00:00Z"}"#,
        )
        .expect("open");
        handle_line(
            &mut e,
            r#"{"type":"changed","file":"a.rs","added":"x","removed":0,"text":"x","ts":"2026-02-25T12:00:01Z"}"#,
        )
        .expect("change");
        handle_line(
            &mut e,
            r#"{"type":"closed","file":"a.rs","ts":"2026-02-25T12:00:02Z"}"#,
        )
        .expect("close");

        assert_eq!(e.sink().records.len(), 1);
        assert_eq!(e.sink().records[0].source, Provenance::Human);
    }
}
