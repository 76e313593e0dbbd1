//! Block - an ordered command sequence and its interpreter loop.
//!
//! A block owns the execution cursor: current index, executing/idle status,
//! jump handling and the loop-back bookkeeping used by While/End pairs.
//! Commands are stored in a dense, zero-based sequence; "pointers" between
//! commands (paired End, loop-back targets) are indices into that same
//! sequence, resolved lazily and cached.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;

use flowchart_types::{BlockResult, CommandId, CommandKind, CommandOutcome, ExecutionStatus};

use crate::command::CommandExecutor;
use crate::context::{CommandContext, ExecutionContext};
use crate::error::FlowchartError;
use crate::registry::CommandRegistry;

// ─────────────────────────────────────────────────────────────────────────────
// Command Slots
// ─────────────────────────────────────────────────────────────────────────────

/// A command in place within a block: the executor plus per-slot metadata.
///
/// The slot's position in the block's sequence is its index; rebuilding the
/// sequence is the only way to reorder, so indices are dense by construction.
pub struct CommandSlot {
    executor: Arc<dyn CommandExecutor>,
    enabled: bool,
    indent: usize,
    id: CommandId,
}

impl CommandSlot {
    /// Create an enabled slot for an executor
    pub fn new(executor: Arc<dyn CommandExecutor>) -> Self {
        Self {
            executor,
            enabled: true,
            indent: 0,
            id: CommandId::new(),
        }
    }

    /// Set the enabled flag
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set the stable command id
    pub fn with_id(mut self, id: CommandId) -> Self {
        self.id = id;
        self
    }

    /// The command executor
    pub fn executor(&self) -> &Arc<dyn CommandExecutor> {
        &self.executor
    }

    /// Whether the interpreter dispatches this slot
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Indent level, computed from open/close markers
    pub fn indent(&self) -> usize {
        self.indent
    }

    /// Stable command id
    pub fn id(&self) -> CommandId {
        self.id
    }
}

/// Structural metadata for one slot, consumed by the flow-control scans.
#[derive(Debug, Clone, Copy)]
pub struct CommandMeta {
    pub kind: CommandKind,
    pub indent: usize,
    pub enabled: bool,
    pub looping: bool,
    pub else_if: bool,
}

// ─────────────────────────────────────────────────────────────────────────────
// Cursor
// ─────────────────────────────────────────────────────────────────────────────

struct Cursor {
    status: ExecutionStatus,
    active: Option<usize>,
    previous: Option<usize>,
    execution_count: u32,
    stop_tx: Option<watch::Sender<bool>>,
    /// Armed loop-backs: End index -> condition index to re-enter
    loop_back: HashMap<usize, usize>,
    /// Lazily resolved While/End pairings: condition index -> End index
    paired_end: HashMap<usize, Option<usize>>,
}

impl Cursor {
    fn new() -> Self {
        Self {
            status: ExecutionStatus::Idle,
            active: None,
            previous: None,
            execution_count: 0,
            stop_tx: None,
            loop_back: HashMap::new(),
            paired_end: HashMap::new(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Block
// ─────────────────────────────────────────────────────────────────────────────

/// A named, ordered sequence of commands forming one executable unit.
pub struct Block {
    name: String,
    commands: Vec<CommandSlot>,
    cursor: Mutex<Cursor>,
}

impl Block {
    /// Create a block, computing indent levels from open/close markers.
    pub fn new(name: impl Into<String>, mut commands: Vec<CommandSlot>) -> Self {
        let mut indent = 0usize;
        for slot in &mut commands {
            if slot.executor.closes_block() {
                indent = indent.saturating_sub(1);
            }
            slot.indent = indent;
            if slot.executor.opens_block() {
                indent += 1;
            }
        }

        Self {
            name: name.into(),
            commands,
            cursor: Mutex::new(Cursor::new()),
        }
    }

    /// Build a block from a definition, instantiating commands through the
    /// registry.
    pub fn from_def(
        def: &flowchart_types::BlockDef,
        registry: &CommandRegistry,
    ) -> Result<Self, FlowchartError> {
        let mut commands = Vec::with_capacity(def.commands.len());
        for command_def in &def.commands {
            let executor = registry.instantiate(command_def)?;
            commands.push(
                CommandSlot::new(executor)
                    .with_enabled(command_def.enabled)
                    .with_id(command_def.id),
            );
        }
        Ok(Block::new(&def.name, commands))
    }

    /// Block name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of commands in the block
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Whether the block has no commands
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// The command slots in execution order
    pub fn commands(&self) -> &[CommandSlot] {
        &self.commands
    }

    /// Whether the block's cursor is active
    pub fn is_executing(&self) -> bool {
        self.cursor.lock().status == ExecutionStatus::Executing
    }

    /// How many times execution of this block has started
    pub fn execution_count(&self) -> u32 {
        self.cursor.lock().execution_count
    }

    /// Index of the command currently being executed, if any
    pub fn active_index(&self) -> Option<usize> {
        self.cursor.lock().active
    }

    // ── Execution ────────────────────────────────────────────────────────────

    /// Begin or resume execution at `start_index`.
    ///
    /// Runs the interpreter loop to completion: a chain of commands that
    /// resolve their `enter` immediately executes without yielding, and a
    /// pending `enter` suspends the loop at the current cursor until it
    /// resolves or [`Block::stop`] interrupts it.
    ///
    /// Calling this on a block that is already executing is rejected with
    /// [`FlowchartError::AlreadyExecuting`]; the prior cursor is never
    /// abandoned or queued behind.
    pub async fn execute(
        self: &Arc<Self>,
        start_index: usize,
        ctx: &ExecutionContext,
    ) -> Result<BlockResult, FlowchartError> {
        let mut stop_rx = {
            let mut cursor = self.cursor.lock();
            if cursor.status == ExecutionStatus::Executing {
                tracing::warn!(block = %self.name, "ignoring execute on a block that is already executing");
                return Err(FlowchartError::AlreadyExecuting(self.name.clone()));
            }
            let (stop_tx, stop_rx) = watch::channel(false);
            cursor.status = ExecutionStatus::Executing;
            cursor.execution_count += 1;
            cursor.active = None;
            cursor.previous = None;
            cursor.stop_tx = Some(stop_tx);
            cursor.loop_back.clear();
            stop_rx
        };

        tracing::debug!(block = %self.name, start_index, "block execution started");

        let mut index = start_index;
        let result = loop {
            // Skip disabled commands, comments and labels
            while index < self.commands.len() && self.should_skip(index) {
                index += 1;
            }
            if index >= self.commands.len() {
                break BlockResult::Completed;
            }
            if *stop_rx.borrow() {
                break BlockResult::Stopped;
            }

            {
                // The previous executed command index feeds the ElseIf
                // fallthrough check.
                let mut cursor = self.cursor.lock();
                cursor.previous = cursor.active;
                cursor.active = Some(index);
            }

            let slot = &self.commands[index];
            let command_ctx = CommandContext::new(Arc::clone(self), index, ctx.clone());

            let outcome = tokio::select! {
                outcome = slot.executor.enter(command_ctx) => outcome,
                _ = stop_rx.changed() => {
                    // Stopped while this command was suspended; let it cancel
                    // whatever asynchronous work it started.
                    slot.executor.on_stop();
                    break BlockResult::Stopped;
                }
            };

            match outcome {
                Ok(CommandOutcome::Continue) => index += 1,
                Ok(CommandOutcome::ContinueAt(next)) => index = next,
                Ok(CommandOutcome::Stop) => break BlockResult::Stopped,
                Err(err) => {
                    // Programmer error inside a command. Propagate without
                    // touching the cursor: the block stays Executing and will
                    // reject further execute calls until reset.
                    tracing::error!(block = %self.name, index, error = %err, "command failed");
                    return Err(FlowchartError::Command(err));
                }
            }
        };

        {
            let mut cursor = self.cursor.lock();
            cursor.status = ExecutionStatus::Idle;
            cursor.active = None;
            cursor.stop_tx = None;
        }

        tracing::debug!(block = %self.name, ?result, "block execution finished");
        Ok(result)
    }

    /// Stop the block: dispatch ceases and a suspended command is given its
    /// `on_stop` callback. Pending asynchronous work beyond that is not
    /// cancelled.
    pub fn stop(&self) {
        let cursor = self.cursor.lock();
        if let Some(stop_tx) = &cursor.stop_tx {
            let _ = stop_tx.send(true);
        }
    }

    /// Clear the cursor and execution count. Variable resets are the owning
    /// flowchart's concern.
    pub fn reset(&self) {
        let mut cursor = self.cursor.lock();
        cursor.status = ExecutionStatus::Idle;
        cursor.active = None;
        cursor.previous = None;
        cursor.execution_count = 0;
        cursor.stop_tx = None;
        cursor.loop_back.clear();
    }

    fn should_skip(&self, index: usize) -> bool {
        let slot = &self.commands[index];
        !slot.enabled
            || matches!(
                slot.executor.kind(),
                CommandKind::Comment | CommandKind::Label
            )
    }

    // ── Structure queries ────────────────────────────────────────────────────

    /// Structural metadata for the command at `index`
    pub fn meta(&self, index: usize) -> Option<CommandMeta> {
        let slot = self.commands.get(index)?;
        Some(CommandMeta {
            kind: slot.executor.kind(),
            indent: slot.indent,
            enabled: slot.enabled,
            looping: slot.executor.is_looping(),
            else_if: slot.executor.is_else_if(),
        })
    }

    /// Index and metadata of the previously executed command in the current
    /// run, if any
    pub fn previous_command(&self) -> Option<(usize, CommandMeta)> {
        let previous = self.cursor.lock().previous?;
        Some((previous, self.meta(previous)?))
    }

    /// Resolve a label name to its command index by linear scan
    pub fn find_label(&self, name: &str) -> Option<usize> {
        self.commands
            .iter()
            .position(|slot| slot.executor.label() == Some(name))
    }

    /// Find the End paired with the looping condition at `cond_index`.
    ///
    /// Scans forward for the first command at the same indent level; the
    /// pairing only holds if that command is an End. The result is cached for
    /// the block's lifetime (the sequence is immutable at runtime).
    pub fn find_paired_end(&self, cond_index: usize) -> Option<usize> {
        {
            let cursor = self.cursor.lock();
            if let Some(cached) = cursor.paired_end.get(&cond_index) {
                return *cached;
            }
        }

        let indent = self.commands.get(cond_index)?.indent;
        let mut found = None;
        for (i, slot) in self.commands.iter().enumerate().skip(cond_index + 1) {
            if slot.indent == indent {
                if slot.executor.kind() == CommandKind::End {
                    found = Some(i);
                }
                break;
            }
        }

        self.cursor.lock().paired_end.insert(cond_index, found);
        found
    }

    /// Find the next End at the same indent level as the command at `index`,
    /// skipping disabled commands, comments and labels and passing over
    /// anything else (including an intervening Else).
    pub fn find_end_from(&self, index: usize) -> Option<usize> {
        let indent = self.commands.get(index)?.indent;
        self.commands
            .iter()
            .enumerate()
            .skip(index + 1)
            .find(|(_, slot)| {
                slot.enabled
                    && slot.indent == indent
                    && slot.executor.kind() == CommandKind::End
            })
            .map(|(i, _)| i)
    }

    // ── Loop bookkeeping ─────────────────────────────────────────────────────

    /// Arm the End at `end_index` to loop back to `cond_index`
    pub fn arm_loop(&self, end_index: usize, cond_index: usize) {
        self.cursor.lock().loop_back.insert(end_index, cond_index);
    }

    /// Disarm the End at `end_index` so straight-line flow passes through it
    pub fn disarm_loop(&self, end_index: usize) {
        self.cursor.lock().loop_back.remove(&end_index);
    }

    /// Loop-back target armed on the End at `end_index`, if any
    pub fn loop_target(&self, end_index: usize) -> Option<usize> {
        self.cursor.lock().loop_back.get(&end_index).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex as PlMutex;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::sync::oneshot;

    use crate::command::FnCommand;
    use crate::error::CommandError;

    /// Probe command that records its own index into a shared log
    fn probe(log: &Arc<PlMutex<Vec<usize>>>) -> CommandSlot {
        let log = Arc::clone(log);
        CommandSlot::new(Arc::new(FnCommand::new(move |ctx| {
            log.lock().push(ctx.index());
            Ok(CommandOutcome::Continue)
        })))
    }

    /// Command that suspends until a oneshot fires
    struct Gate {
        rx: PlMutex<Option<oneshot::Receiver<()>>>,
        stopped: AtomicBool,
    }

    impl Gate {
        fn new() -> (Arc<Self>, oneshot::Sender<()>) {
            let (tx, rx) = oneshot::channel();
            (
                Arc::new(Self {
                    rx: PlMutex::new(Some(rx)),
                    stopped: AtomicBool::new(false),
                }),
                tx,
            )
        }
    }

    #[async_trait]
    impl CommandExecutor for Gate {
        async fn enter(&self, _ctx: CommandContext) -> Result<CommandOutcome, CommandError> {
            let rx = self.rx.lock().take().ok_or(CommandError::AlreadyResumed)?;
            rx.await
                .map_err(|_| CommandError::failed("gate sender dropped"))?;
            Ok(CommandOutcome::Continue)
        }

        fn on_stop(&self) {
            self.stopped.store(true, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn test_sequential_execution_visits_in_order() {
        let log = Arc::new(PlMutex::new(Vec::new()));
        let block = Arc::new(Block::new(
            "seq",
            vec![probe(&log), probe(&log), probe(&log), probe(&log)],
        ));

        let result = block.execute(0, &ExecutionContext::detached()).await.unwrap();

        assert_eq!(result, BlockResult::Completed);
        assert_eq!(*log.lock(), vec![0, 1, 2, 3]);
        assert!(!block.is_executing());
        assert_eq!(block.execution_count(), 1);
    }

    #[tokio::test]
    async fn test_disabled_commands_are_skipped() {
        let log = Arc::new(PlMutex::new(Vec::new()));
        let block = Arc::new(Block::new(
            "skip",
            vec![
                probe(&log),
                probe(&log).with_enabled(false),
                probe(&log),
            ],
        ));

        block.execute(0, &ExecutionContext::detached()).await.unwrap();
        assert_eq!(*log.lock(), vec![0, 2]);
    }

    #[tokio::test]
    async fn test_start_past_end_completes_immediately() {
        let log = Arc::new(PlMutex::new(Vec::new()));
        let block = Arc::new(Block::new("empty-run", vec![probe(&log)]));

        let result = block.execute(5, &ExecutionContext::detached()).await.unwrap();
        assert_eq!(result, BlockResult::Completed);
        assert!(log.lock().is_empty());
    }

    #[tokio::test]
    async fn test_suspension_holds_cursor() {
        let log = Arc::new(PlMutex::new(Vec::new()));
        let (gate, gate_tx) = Gate::new();
        let block = Arc::new(Block::new(
            "wait",
            vec![probe(&log), CommandSlot::new(gate), probe(&log)],
        ));

        let task = {
            let block = Arc::clone(&block);
            tokio::spawn(async move { block.execute(0, &ExecutionContext::detached()).await })
        };
        tokio::task::yield_now().await;

        // Suspended at the gate: cursor unchanged, block still executing
        assert!(block.is_executing());
        assert_eq!(block.active_index(), Some(1));
        assert_eq!(*log.lock(), vec![0]);

        gate_tx.send(()).unwrap();
        let result = task.await.unwrap().unwrap();
        assert_eq!(result, BlockResult::Completed);
        assert_eq!(*log.lock(), vec![0, 2]);
    }

    #[tokio::test]
    async fn test_stop_invokes_cleanup_hook() {
        let log = Arc::new(PlMutex::new(Vec::new()));
        let (gate, _gate_tx) = Gate::new();
        let gate_ref = Arc::clone(&gate);
        let block = Arc::new(Block::new(
            "stopped",
            vec![probe(&log), CommandSlot::new(gate), probe(&log)],
        ));

        let task = {
            let block = Arc::clone(&block);
            tokio::spawn(async move { block.execute(0, &ExecutionContext::detached()).await })
        };
        tokio::task::yield_now().await;
        assert!(block.is_executing());

        block.stop();
        let result = task.await.unwrap().unwrap();
        assert_eq!(result, BlockResult::Stopped);
        assert!(gate_ref.stopped.load(Ordering::SeqCst));
        assert!(!block.is_executing());
        // The command after the gate never ran
        assert_eq!(*log.lock(), vec![0]);
    }

    #[tokio::test]
    async fn test_reentrant_execute_is_rejected() {
        let (gate, gate_tx) = Gate::new();
        let block = Arc::new(Block::new("busy", vec![CommandSlot::new(gate)]));

        let task = {
            let block = Arc::clone(&block);
            tokio::spawn(async move { block.execute(0, &ExecutionContext::detached()).await })
        };
        tokio::task::yield_now().await;

        let err = block.execute(0, &ExecutionContext::detached()).await.unwrap_err();
        assert!(matches!(err, FlowchartError::AlreadyExecuting(_)));

        gate_tx.send(()).unwrap();
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_command_error_leaves_block_stuck() {
        let block = Arc::new(Block::new(
            "broken",
            vec![CommandSlot::new(Arc::new(FnCommand::new(|_ctx| {
                Err(CommandError::failed("boom"))
            })))],
        ));

        let err = block.execute(0, &ExecutionContext::detached()).await.unwrap_err();
        assert!(matches!(err, FlowchartError::Command(_)));
        // Deliberately no recovery: the block stays executing until reset
        assert!(block.is_executing());

        block.reset();
        assert!(!block.is_executing());
        assert_eq!(block.execution_count(), 0);
    }

    #[tokio::test]
    async fn test_explicit_jump_outcome() {
        let log = Arc::new(PlMutex::new(Vec::new()));
        let jump = CommandSlot::new(Arc::new(FnCommand::new(|_ctx| {
            Ok(CommandOutcome::ContinueAt(3))
        })));
        let block = Arc::new(Block::new(
            "jump",
            vec![probe(&log), jump, probe(&log), probe(&log)],
        ));

        block.execute(0, &ExecutionContext::detached()).await.unwrap();
        // Index 2 is skipped by the jump
        assert_eq!(*log.lock(), vec![0, 3]);
    }

    #[test]
    fn test_indent_levels_from_markers() {
        struct Marker(CommandKind);
        #[async_trait]
        impl CommandExecutor for Marker {
            async fn enter(&self, _ctx: CommandContext) -> Result<CommandOutcome, CommandError> {
                Ok(CommandOutcome::Continue)
            }
            fn kind(&self) -> CommandKind {
                self.0
            }
        }

        let block = Block::new(
            "indent",
            vec![
                CommandSlot::new(Arc::new(Marker(CommandKind::Condition))), // If
                CommandSlot::new(Arc::new(Marker(CommandKind::Normal))),    //   body
                CommandSlot::new(Arc::new(Marker(CommandKind::Else))),      // Else
                CommandSlot::new(Arc::new(Marker(CommandKind::Normal))),    //   body
                CommandSlot::new(Arc::new(Marker(CommandKind::End))),       // End
                CommandSlot::new(Arc::new(Marker(CommandKind::Normal))),    // after
            ],
        );

        let indents: Vec<usize> = (0..block.len()).map(|i| block.meta(i).unwrap().indent).collect();
        assert_eq!(indents, vec![0, 1, 0, 1, 0, 0]);
    }
}
