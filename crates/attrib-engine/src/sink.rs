//! Recording sink: where finished records go. The engine only knows the
//! trait; persistence is someone else's problem.

use std::io::Write;

use attrib_core::types::DiffRecord;

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("sink io: {0}")]
    Io(#[from] std::io::Error),
    #[error("sink serialization: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub trait RecordingSink {
    fn emit(&mut self, record: &DiffRecord) -> Result<(), SinkError>;
}

/// Writes one JSON object per line. The runtime points this at stdout or
/// a log file.
#[derive(Debug)]
pub struct JsonlSink<W: Write> {
    writer: W,
}

impl<W: Write> JsonlSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl<W: Write> RecordingSink for JsonlSink<W> {
    fn emit(&mut self, record: &DiffRecord) -> Result<(), SinkError> {
        serde_json::to_writer(&mut self.writer, record)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}

/// In-memory sink for tests and embedding.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub records: Vec<DiffRecord>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordingSink for MemorySink {
    fn emit(&mut self, record: &DiffRecord) -> Result<(), SinkError> {
        self.records.push(record.clone());
        Ok(())
    }
}
