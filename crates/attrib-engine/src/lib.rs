//! attrib-engine: the event-driven engine that owns the attribution state.
//! Consumes host events, accumulates per-file change batches, drives
//! debounce flushes through the diff engine, and emits classified records
//! to a recording sink.

pub mod batch;
pub mod engine;
pub mod signal;
pub mod sink;

pub use attrib_core::types;
