//! attrib-core: pure attribution logic for editor change provenance.
//! Typed-input ledger, tab disambiguation, agent-activity oracle, change
//! classification, and the line-based diff engine. No IO, no clocks: every
//! function that needs the current time takes it as an argument.

pub mod classify;
pub mod diff;
pub mod ledger;
pub mod oracle;
pub mod tab;
pub mod types;
