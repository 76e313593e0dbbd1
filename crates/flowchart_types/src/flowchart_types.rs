//! Flowchart Types - Core type definitions for the flowchart execution engine
//!
//! This crate contains the pure data structures shared between the runtime
//! and authoring/persistence tooling: flowchart, block and command
//! definitions, the variable value type, command outcomes and execution
//! snapshots. Flowcharts are stored as JSON documents and loaded at runtime.

mod types;
mod value;

pub use types::*;
pub use value::*;
