//! Built-in command set.
//!
//! Flow control lives in `flow`, variable mutation in `variable`. Everything
//! else (dialogue, audio, scene transitions) is expected to be registered by
//! the embedding application as its own `CommandExecutor` implementations.

mod flow;
mod variable;

pub use flow::*;
pub use variable::*;

use crate::registry::{CommandRegistry, CommandSpec};

/// Install the builtin flow and variable commands into a registry.
pub fn register_builtin_commands(registry: &mut CommandRegistry) {
    registry.register::<IfCommand>(
        CommandSpec::new("flow/If").describe("Branch if a condition is true"),
    );
    registry.register::<ElseIfCommand>(
        CommandSpec::new("flow/ElseIf").describe("Chained alternative branch"),
    );
    registry.register::<ElseCommand>(
        CommandSpec::new("flow/Else").describe("Fallback branch of an If"),
    );
    registry.register::<WhileCommand>(
        CommandSpec::new("flow/While").describe("Loop while a condition is true"),
    );
    registry.register::<EndCommand>(
        CommandSpec::new("flow/End").describe("Close an If, Else or While section"),
    );
    registry.register::<BreakCommand>(
        CommandSpec::new("flow/Break").describe("Exit the enclosing While loop"),
    );
    registry.register::<JumpCommand>(
        CommandSpec::new("flow/Jump").describe("Jump to a named label in this block"),
    );
    registry.register::<LabelCommand>(
        CommandSpec::new("flow/Label").describe("Named jump target"),
    );
    registry.register::<CommentCommand>(
        CommandSpec::new("flow/Comment").describe("Authoring note, never executed"),
    );
    registry.register::<StopCommand>(
        CommandSpec::new("flow/Stop").describe("Stop executing this block"),
    );
    registry.register::<StopBlockCommand>(
        CommandSpec::new("flow/StopBlock").describe("Stop a named block"),
    );
    registry.register::<CallCommand>(
        CommandSpec::new("flow/Call").describe("Execute another block"),
    );
    registry.register::<WaitCommand>(
        CommandSpec::new("flow/Wait").describe("Wait for a duration in seconds"),
    );
    registry.register::<SetVariableCommand>(
        CommandSpec::new("variable/Set").describe("Set or modify a variable"),
    );
}
