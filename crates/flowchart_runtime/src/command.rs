//! Command contract - the capability trait implemented by every command.
//!
//! The interpreter loop only depends on `enter`; the remaining methods are
//! optional capabilities consumed by tooling (summaries, variable dependency
//! analysis, indent computation) or by the flow-control scans.

use async_trait::async_trait;

use flowchart_types::{CommandKind, CommandOutcome};

use crate::context::CommandContext;
use crate::error::CommandError;

// ─────────────────────────────────────────────────────────────────────────────
// Command Executor Trait
// ─────────────────────────────────────────────────────────────────────────────

/// Trait for command execution.
///
/// `enter` is invoked exactly once when control reaches the command. It must
/// resolve to an outcome that advances, jumps or stops the block; awaiting
/// inside `enter` suspends the block with the cursor unchanged until the
/// future resolves. A command whose future never resolves stalls its block
/// permanently - that is a caller contract violation the engine does not
/// detect.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Execute the command with the given context
    async fn enter(&self, ctx: CommandContext) -> Result<CommandOutcome, CommandError>;

    /// Human-readable description, used only by tooling
    fn summary(&self) -> String {
        String::new()
    }

    /// Whether this command references the named variable, used only by tooling
    fn has_reference(&self, _variable: &str) -> bool {
        false
    }

    /// Structural classification consulted by the loop and the condition scans
    fn kind(&self) -> CommandKind {
        CommandKind::Normal
    }

    /// True for While-like constructs
    fn is_looping(&self) -> bool {
        false
    }

    /// True for ElseIf conditions
    fn is_else_if(&self) -> bool {
        false
    }

    /// Jump-target name, exposed by Label commands
    fn label(&self) -> Option<&str> {
        None
    }

    /// Whether this command opens an indented section (authoring time only)
    fn opens_block(&self) -> bool {
        matches!(self.kind(), CommandKind::Condition | CommandKind::Else)
    }

    /// Whether this command closes an indented section (authoring time only)
    fn closes_block(&self) -> bool {
        matches!(self.kind(), CommandKind::Else | CommandKind::End)
    }

    /// Called when the block is stopped while this command is suspended.
    ///
    /// The command should cancel whatever asynchronous work it started; a
    /// command that skips this may leak its pending operation.
    fn on_stop(&self) {}
}

// ─────────────────────────────────────────────────────────────────────────────
// Function-based Commands
// ─────────────────────────────────────────────────────────────────────────────

/// Closure-backed executor for simple synchronous commands.
pub struct FnCommand<F>
where
    F: Fn(&CommandContext) -> Result<CommandOutcome, CommandError> + Send + Sync,
{
    func: F,
}

impl<F> FnCommand<F>
where
    F: Fn(&CommandContext) -> Result<CommandOutcome, CommandError> + Send + Sync,
{
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

#[async_trait]
impl<F> CommandExecutor for FnCommand<F>
where
    F: Fn(&CommandContext) -> Result<CommandOutcome, CommandError> + Send + Sync,
{
    async fn enter(&self, ctx: CommandContext) -> Result<CommandOutcome, CommandError> {
        (self.func)(&ctx)
    }
}
