//! Flowchart Runtime - Execution engine for block/command visual scripts
//!
//! A flowchart owns a set of named blocks; each block is an ordered sequence
//! of commands driven by an interpreter loop. Commands either advance the
//! cursor synchronously, jump it (conditions, calls), or suspend the block by
//! keeping their `enter` future pending until some asynchronous completion
//! (a timer, a sub-block, external input) resolves it.
//!
//! # Overview
//!
//! - [`CommandExecutor`] - the capability contract every command implements
//! - [`Block`] - the interpreter loop over one command sequence
//! - [`Flowchart`] - owns blocks, dispatches execution, tracks selection
//! - [`CommandRegistry`] - instantiates commands from JSON definitions
//! - [`VariableStore`] - shared key-value bindings read by conditions
//!
//! The built-in command set ([`register_builtin_commands`]) covers flow
//! control (If/ElseIf/Else/While/End/Break), label jumps, cross-block calls,
//! timed waits and variable writes. Everything else - audio, dialogue,
//! tweens - is expected to be supplied by the host as additional
//! `CommandExecutor` implementations.

pub use flowchart_types;

mod block;
mod command;
mod commands;
mod context;
mod error;
mod flowchart;
mod registry;
mod variables;

pub use block::*;
pub use command::*;
pub use commands::*;
pub use context::*;
pub use error::*;
pub use flowchart::*;
pub use registry::*;
pub use variables::*;
