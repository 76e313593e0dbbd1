//! Flow-control commands: conditions, loops, jumps and block lifecycle.
//!
//! If, ElseIf and While share one condition entry routine. Structural pairing
//! (which End closes which condition) is resolved by indent-level scans over
//! the parent block's sequence; the loop-back state an armed While leaves on
//! its End lives in the block's cursor, not in the commands, so command
//! instances stay immutable and shareable.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use flowchart_types::{CommandKind, CommandOutcome};

use crate::block::Block;
use crate::command::CommandExecutor;
use crate::context::CommandContext;
use crate::error::CommandError;
use crate::variables::Comparison;

// ─────────────────────────────────────────────────────────────────────────────
// Condition entry
// ─────────────────────────────────────────────────────────────────────────────

/// Jump past `index`, or stop the block when that would run off the end.
fn jump_past(block: &Block, index: usize) -> CommandOutcome {
    let next = index + 1;
    if next < block.len() {
        CommandOutcome::ContinueAt(next)
    } else {
        CommandOutcome::Stop
    }
}

/// Shared entry routine for If, ElseIf and While.
fn enter_condition(
    ctx: &CommandContext,
    comparison: &Comparison,
    looping: bool,
    else_if: bool,
) -> CommandOutcome {
    let block = ctx.block();
    let index = ctx.index();
    let indent = ctx.indent();

    // An ElseIf is only valid when a failing prior condition at the same
    // indent redirected execution here. Reached any other way (straight-line
    // flow, external jump) it must not evaluate, or a branch that already ran
    // could run twice.
    if else_if {
        let redirected = block
            .previous_command()
            .is_some_and(|(_, meta)| meta.kind == CommandKind::Condition && meta.indent == indent);
        if !redirected {
            tracing::warn!(
                block = %block.name(),
                index,
                "ElseIf entered without a preceding condition; skipping to its End"
            );
            return match block.find_end_from(index) {
                Some(end) => CommandOutcome::ContinueAt(end),
                None => CommandOutcome::Stop,
            };
        }
    }

    // A looping condition resolves and arms its End before evaluating, so the
    // End loops back even when the body is entered.
    let armed_end = if looping {
        match block.find_paired_end(index) {
            Some(end) => {
                block.arm_loop(end, index);
                Some(end)
            }
            None => {
                tracing::error!(
                    block = %block.name(),
                    index,
                    "looping condition has no matching End; continuing without looping"
                );
                return CommandOutcome::Continue;
            }
        }
    } else {
        None
    };

    if comparison.evaluate(ctx.variables()) {
        // Enter the body
        return CommandOutcome::Continue;
    }

    if let Some(end) = armed_end {
        // Loop is over; straight-line flow through the End must not re-enter
        block.disarm_loop(end);
        return jump_past(block, end);
    }

    // Branching condition failed: hand control to the next sibling
    // terminator, skipping disabled commands, comments and labels.
    let mut i = index + 1;
    while let Some(meta) = block.meta(i) {
        if meta.enabled
            && meta.indent == indent
            && !matches!(meta.kind, CommandKind::Comment | CommandKind::Label)
        {
            match meta.kind {
                CommandKind::Condition if meta.else_if => return CommandOutcome::ContinueAt(i),
                CommandKind::Else | CommandKind::End => return jump_past(block, i),
                _ => {}
            }
        }
        i += 1;
    }

    tracing::warn!(
        block = %block.name(),
        index,
        "condition has no Else/ElseIf/End terminator; stopping block"
    );
    CommandOutcome::Stop
}

// ─────────────────────────────────────────────────────────────────────────────
// Conditions
// ─────────────────────────────────────────────────────────────────────────────

/// Branch into the following section when the condition holds.
#[derive(Deserialize)]
pub struct IfCommand {
    pub condition: Comparison,
}

#[async_trait]
impl CommandExecutor for IfCommand {
    async fn enter(&self, ctx: CommandContext) -> Result<CommandOutcome, CommandError> {
        Ok(enter_condition(&ctx, &self.condition, false, false))
    }

    fn summary(&self) -> String {
        format!("If {}", self.condition.summary())
    }

    fn has_reference(&self, variable: &str) -> bool {
        self.condition.variable == variable
    }

    fn kind(&self) -> CommandKind {
        CommandKind::Condition
    }
}

/// Chained alternative: evaluated only when the prior condition failed.
#[derive(Deserialize)]
pub struct ElseIfCommand {
    pub condition: Comparison,
}

#[async_trait]
impl CommandExecutor for ElseIfCommand {
    async fn enter(&self, ctx: CommandContext) -> Result<CommandOutcome, CommandError> {
        Ok(enter_condition(&ctx, &self.condition, false, true))
    }

    fn summary(&self) -> String {
        format!("Else If {}", self.condition.summary())
    }

    fn has_reference(&self, variable: &str) -> bool {
        self.condition.variable == variable
    }

    fn kind(&self) -> CommandKind {
        CommandKind::Condition
    }

    fn is_else_if(&self) -> bool {
        true
    }

    // Sits at its parent If's indent: closes the previous branch, opens its own
    fn closes_block(&self) -> bool {
        true
    }
}

/// Loop over the following section while the condition holds.
#[derive(Deserialize)]
pub struct WhileCommand {
    pub condition: Comparison,
}

#[async_trait]
impl CommandExecutor for WhileCommand {
    async fn enter(&self, ctx: CommandContext) -> Result<CommandOutcome, CommandError> {
        Ok(enter_condition(&ctx, &self.condition, true, false))
    }

    fn summary(&self) -> String {
        format!("While {}", self.condition.summary())
    }

    fn has_reference(&self, variable: &str) -> bool {
        self.condition.variable == variable
    }

    fn kind(&self) -> CommandKind {
        CommandKind::Condition
    }

    fn is_looping(&self) -> bool {
        true
    }
}

/// Fallback branch. Only straight-line flow out of a true branch reaches it,
/// so on entry it always skips past its own End.
#[derive(Deserialize)]
pub struct ElseCommand {}

#[async_trait]
impl CommandExecutor for ElseCommand {
    async fn enter(&self, ctx: CommandContext) -> Result<CommandOutcome, CommandError> {
        let block = ctx.block();
        match block.find_end_from(ctx.index()) {
            Some(end) => Ok(jump_past(block, end)),
            None => {
                tracing::warn!(
                    block = %block.name(),
                    index = ctx.index(),
                    "Else has no matching End; stopping block"
                );
                Ok(CommandOutcome::Stop)
            }
        }
    }

    fn summary(&self) -> String {
        "Else".to_string()
    }

    fn kind(&self) -> CommandKind {
        CommandKind::Else
    }
}

/// Section terminator. Passive except when an enclosing While armed it to
/// loop back; the arming lives in the block cursor, mutated by its pairing
/// condition rather than by this command.
#[derive(Deserialize)]
pub struct EndCommand {}

#[async_trait]
impl CommandExecutor for EndCommand {
    async fn enter(&self, ctx: CommandContext) -> Result<CommandOutcome, CommandError> {
        match ctx.block().loop_target(ctx.index()) {
            Some(cond_index) => Ok(CommandOutcome::ContinueAt(cond_index)),
            None => Ok(CommandOutcome::Continue),
        }
    }

    fn summary(&self) -> String {
        "End".to_string()
    }

    fn kind(&self) -> CommandKind {
        CommandKind::End
    }
}

/// Exit the nearest enclosing While by disarming its End and jumping past it.
/// Outside any loop it is a no-op.
#[derive(Deserialize)]
pub struct BreakCommand {}

#[async_trait]
impl CommandExecutor for BreakCommand {
    async fn enter(&self, ctx: CommandContext) -> Result<CommandOutcome, CommandError> {
        let block = ctx.block();
        let indent = ctx.indent();

        let enclosing = (0..ctx.index())
            .rev()
            .filter_map(|i| block.meta(i).map(|meta| (i, meta)))
            .find(|(_, meta)| meta.looping && meta.indent < indent);

        let Some((cond_index, _)) = enclosing else {
            tracing::warn!(
                block = %block.name(),
                index = ctx.index(),
                "Break outside a loop has no effect"
            );
            return Ok(CommandOutcome::Continue);
        };

        match block.find_paired_end(cond_index) {
            Some(end) => {
                block.disarm_loop(end);
                Ok(jump_past(block, end))
            }
            None => Ok(CommandOutcome::Continue),
        }
    }

    fn summary(&self) -> String {
        "Break".to_string()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Jumps and markers
// ─────────────────────────────────────────────────────────────────────────────

/// Jump to a named label in the same block. An unresolved label is a
/// warning and execution falls through to the next command.
#[derive(Deserialize)]
pub struct JumpCommand {
    pub target_label: String,
}

#[async_trait]
impl CommandExecutor for JumpCommand {
    async fn enter(&self, ctx: CommandContext) -> Result<CommandOutcome, CommandError> {
        match ctx.block().find_label(&self.target_label) {
            Some(index) => Ok(CommandOutcome::ContinueAt(index)),
            None => {
                tracing::warn!(
                    block = %ctx.block().name(),
                    label = %self.target_label,
                    "jump target not found; continuing"
                );
                Ok(CommandOutcome::Continue)
            }
        }
    }

    fn summary(&self) -> String {
        format!("Jump to {}", self.target_label)
    }
}

/// Named jump target. Never dispatched; the loop skips over it.
#[derive(Deserialize)]
pub struct LabelCommand {
    pub name: String,
}

#[async_trait]
impl CommandExecutor for LabelCommand {
    async fn enter(&self, _ctx: CommandContext) -> Result<CommandOutcome, CommandError> {
        Ok(CommandOutcome::Continue)
    }

    fn summary(&self) -> String {
        format!("Label: {}", self.name)
    }

    fn kind(&self) -> CommandKind {
        CommandKind::Label
    }

    fn label(&self) -> Option<&str> {
        Some(&self.name)
    }
}

/// Authoring note. Never dispatched.
#[derive(Deserialize)]
pub struct CommentCommand {
    #[serde(default)]
    pub text: String,
}

#[async_trait]
impl CommandExecutor for CommentCommand {
    async fn enter(&self, _ctx: CommandContext) -> Result<CommandOutcome, CommandError> {
        Ok(CommandOutcome::Continue)
    }

    fn summary(&self) -> String {
        format!("// {}", self.text)
    }

    fn kind(&self) -> CommandKind {
        CommandKind::Comment
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Block lifecycle
// ─────────────────────────────────────────────────────────────────────────────

/// Stop executing the current block.
#[derive(Deserialize)]
pub struct StopCommand {}

#[async_trait]
impl CommandExecutor for StopCommand {
    async fn enter(&self, _ctx: CommandContext) -> Result<CommandOutcome, CommandError> {
        Ok(CommandOutcome::Stop)
    }

    fn summary(&self) -> String {
        "Stop".to_string()
    }
}

/// Stop a named block on the owning flowchart. Stopping the current block by
/// name works too: dispatch ceases before the next command.
#[derive(Deserialize)]
pub struct StopBlockCommand {
    pub block: String,
}

#[async_trait]
impl CommandExecutor for StopBlockCommand {
    async fn enter(&self, ctx: CommandContext) -> Result<CommandOutcome, CommandError> {
        let Some(flowchart) = ctx.flowchart() else {
            tracing::warn!("StopBlock outside a flowchart has no effect");
            return Ok(CommandOutcome::Continue);
        };
        if flowchart.stop_block(&self.block).is_err() {
            tracing::warn!(block = %self.block, "StopBlock target not found");
        }
        Ok(CommandOutcome::Continue)
    }

    fn summary(&self) -> String {
        format!("Stop block {}", self.block)
    }
}

/// How a Call treats its own block once the target block is started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallMode {
    /// Start the target, then stop this block
    #[default]
    Stop,
    /// Start the target and keep going concurrently
    Continue,
    /// Suspend this block until the target finishes
    WaitUntilFinished,
}

/// Execute another block, optionally on a linked flowchart and optionally
/// starting at a label or index inside it.
///
/// Calling the parent block itself is a jump: the cursor moves to the start
/// position within the current run and the call mode does not apply.
#[derive(Deserialize)]
pub struct CallCommand {
    pub block: String,
    /// Named flowchart linked to the owning one; the own chart when absent
    #[serde(default)]
    pub flowchart: Option<String>,
    #[serde(default)]
    pub mode: CallMode,
    #[serde(default)]
    pub start_index: usize,
    /// Overrides `start_index` when it resolves
    #[serde(default)]
    pub start_label: Option<String>,
}

impl CallCommand {
    fn start_in(&self, block: &Block) -> usize {
        match self.start_label.as_deref() {
            Some(label) => match block.find_label(label) {
                Some(index) => index,
                None => {
                    tracing::warn!(
                        block = %block.name(),
                        label,
                        "Call label not found; using the start index"
                    );
                    self.start_index
                }
            },
            None => self.start_index,
        }
    }
}

#[async_trait]
impl CommandExecutor for CallCommand {
    async fn enter(&self, ctx: CommandContext) -> Result<CommandOutcome, CommandError> {
        // Self-call: redirect the current cursor instead of starting a second
        // run, which the one-cursor invariant would reject.
        if self.flowchart.is_none() && ctx.block().name() == self.block {
            return Ok(CommandOutcome::ContinueAt(self.start_in(ctx.block())));
        }

        let Some(own) = ctx.flowchart() else {
            tracing::warn!(block = %self.block, "Call outside a flowchart has no effect");
            return Ok(CommandOutcome::Continue);
        };
        let chart = match self.flowchart.as_deref() {
            Some(name) => match own.find_flowchart(name) {
                Some(chart) => chart,
                None => {
                    tracing::warn!(flowchart = name, "Call target flowchart not linked; continuing");
                    return Ok(CommandOutcome::Continue);
                }
            },
            None => own,
        };
        let Some(target) = chart.find_block(&self.block) else {
            tracing::warn!(block = %self.block, "Call target not found; continuing");
            return Ok(CommandOutcome::Continue);
        };

        let completion = chart
            .execute_block(&self.block, self.start_in(&target))
            .map_err(|err| CommandError::failed(err.to_string()))?;

        match self.mode {
            CallMode::Stop => Ok(CommandOutcome::Stop),
            CallMode::Continue => Ok(CommandOutcome::Continue),
            CallMode::WaitUntilFinished => {
                completion
                    .wait()
                    .await
                    .map_err(|err| CommandError::failed(err.to_string()))?;
                Ok(CommandOutcome::Continue)
            }
        }
    }

    fn summary(&self) -> String {
        match &self.flowchart {
            Some(chart) => format!("Call {}/{}", chart, self.block),
            None => format!("Call {}", self.block),
        }
    }
}

/// Suspend the block for a duration in seconds.
#[derive(Deserialize)]
pub struct WaitCommand {
    pub duration: f64,
}

#[async_trait]
impl CommandExecutor for WaitCommand {
    async fn enter(&self, _ctx: CommandContext) -> Result<CommandOutcome, CommandError> {
        tokio::time::sleep(Duration::from_secs_f64(self.duration)).await;
        Ok(CommandOutcome::Continue)
    }

    fn summary(&self) -> String {
        format!("Wait {}s", self.duration)
    }
}
