//! Flowchart - a named collection of blocks sharing one variable store.
//!
//! The flowchart is the scheduling boundary: each executing block runs on its
//! own tokio task, so blocks progress concurrently while execution within a
//! single block stays strictly sequential. Callers get a completion handle
//! per started block and may await it or drop it.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use dashmap::DashMap;
use parking_lot::RwLock;
use tokio::sync::oneshot;

use flowchart_types::{BlockResult, ExecutionSnapshot, FlowchartDef, Value};

use crate::block::Block;
use crate::context::ExecutionContext;
use crate::error::FlowchartError;
use crate::registry::CommandRegistry;
use crate::variables::VariableStore;

// ─────────────────────────────────────────────────────────────────────────────
// Block Completion
// ─────────────────────────────────────────────────────────────────────────────

/// Handle to one started block execution.
///
/// Dropping the handle detaches the run; the block keeps executing.
pub struct BlockCompletion {
    block: String,
    rx: oneshot::Receiver<Result<BlockResult, FlowchartError>>,
}

impl BlockCompletion {
    /// Name of the block this handle tracks
    pub fn block(&self) -> &str {
        &self.block
    }

    /// Wait for the run to finish.
    ///
    /// Errors raised inside the run (re-entrant start, command failure)
    /// surface here rather than at start time.
    pub async fn wait(self) -> Result<BlockResult, FlowchartError> {
        self.rx
            .await
            .map_err(|_| FlowchartError::CompletionLost(self.block))?
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Flowchart
// ─────────────────────────────────────────────────────────────────────────────

/// A flowchart: uniquely named blocks plus the variable store they share.
pub struct Flowchart {
    name: String,
    blocks: DashMap<String, Arc<Block>>,
    variables: Arc<VariableStore>,
    initial_variables: HashMap<String, Value>,
    /// Most recently started block, mirrored for tooling that follows
    /// execution around the chart.
    selected_block: RwLock<Option<String>>,
    /// Other flowcharts reachable from Call commands, by name. Non-owning.
    linked: DashMap<String, Weak<Flowchart>>,
}

impl Flowchart {
    /// Create an empty flowchart
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            blocks: DashMap::new(),
            variables: Arc::new(VariableStore::new()),
            initial_variables: HashMap::new(),
            selected_block: RwLock::new(None),
            linked: DashMap::new(),
        }
    }

    /// Build a flowchart from a definition, instantiating every command
    /// through the registry and seeding the variable store.
    pub fn from_def(
        def: &FlowchartDef,
        registry: &CommandRegistry,
    ) -> Result<Self, FlowchartError> {
        let flowchart = Self {
            name: def.name.clone(),
            blocks: DashMap::new(),
            variables: Arc::new(VariableStore::from_map(def.variables.clone())),
            initial_variables: def.variables.clone(),
            selected_block: RwLock::new(None),
            linked: DashMap::new(),
        };
        for block_def in &def.blocks {
            flowchart.add_block(Block::from_def(block_def, registry)?)?;
        }
        tracing::info!(
            flowchart = %flowchart.name,
            blocks = flowchart.blocks.len(),
            "flowchart loaded"
        );
        Ok(flowchart)
    }

    /// Flowchart name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The shared variable store
    pub fn variables(&self) -> &Arc<VariableStore> {
        &self.variables
    }

    /// Most recently started block, if any
    pub fn selected_block(&self) -> Option<String> {
        self.selected_block.read().clone()
    }

    /// Add a block. Names are unique per flowchart.
    pub fn add_block(&self, block: Block) -> Result<(), FlowchartError> {
        let name = block.name().to_string();
        match self.blocks.entry(name.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                Err(FlowchartError::DuplicateBlock(name))
            }
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                entry.insert(Arc::new(block));
                Ok(())
            }
        }
    }

    /// Make another flowchart reachable from this chart's Call commands.
    ///
    /// The link is by name and non-owning; a dropped target simply stops
    /// resolving.
    pub fn link_flowchart(&self, other: &Arc<Flowchart>) {
        self.linked
            .insert(other.name().to_string(), Arc::downgrade(other));
    }

    /// Resolve a linked flowchart by name
    pub fn find_flowchart(&self, name: &str) -> Option<Arc<Flowchart>> {
        self.linked.get(name).and_then(|entry| entry.value().upgrade())
    }

    /// Look up a block by name
    pub fn find_block(&self, name: &str) -> Option<Arc<Block>> {
        self.blocks.get(name).map(|entry| Arc::clone(entry.value()))
    }

    /// Whether any block in the chart is currently executing
    pub fn is_any_executing(&self) -> bool {
        self.blocks.iter().any(|entry| entry.value().is_executing())
    }

    // ── Execution ────────────────────────────────────────────────────────────

    /// Start a block at `start_index` on its own task.
    pub fn execute_block(
        self: &Arc<Self>,
        name: &str,
        start_index: usize,
    ) -> Result<BlockCompletion, FlowchartError> {
        let block = self
            .find_block(name)
            .ok_or_else(|| FlowchartError::BlockNotFound(name.to_string()))?;

        *self.selected_block.write() = Some(name.to_string());

        let (tx, rx) = oneshot::channel();
        let ctx = ExecutionContext::for_flowchart(self);
        tokio::spawn(async move {
            let result = block.execute(start_index, &ctx).await;
            let _ = tx.send(result);
        });

        Ok(BlockCompletion {
            block: name.to_string(),
            rx,
        })
    }

    /// Stop one block by name
    pub fn stop_block(&self, name: &str) -> Result<(), FlowchartError> {
        let block = self
            .find_block(name)
            .ok_or_else(|| FlowchartError::BlockNotFound(name.to_string()))?;
        block.stop();
        Ok(())
    }

    /// Stop every executing block in the chart
    pub fn stop_all_blocks(&self) {
        for entry in self.blocks.iter() {
            entry.value().stop();
        }
    }

    /// Reset every block's cursor, and optionally restore the variable store
    /// to its seeded values.
    pub fn reset(&self, reset_variables: bool) {
        for entry in self.blocks.iter() {
            entry.value().reset();
        }
        if reset_variables {
            self.variables.replace(self.initial_variables.clone());
        }
    }

    // ── Snapshots ────────────────────────────────────────────────────────────

    /// Capture where an executing block currently is, as a resumable record.
    ///
    /// Returns `None` when the block is idle or unknown. The label, when one
    /// precedes the active command, makes the snapshot survive command
    /// insertions before it. Resuming a labelled snapshot re-runs every
    /// command between the label and the captured index; labels mark
    /// replay-safe checkpoints, and authors who need exact-position resume
    /// leave labels out of the surrounding commands.
    pub fn capture(&self, name: &str) -> Option<ExecutionSnapshot> {
        let block = self.find_block(name)?;
        let index = block.active_index()?;
        let label = block
            .commands()
            .iter()
            .take(index + 1)
            .rev()
            .find_map(|slot| slot.executor().label().map(str::to_string));
        let mut snapshot = ExecutionSnapshot::new(name, index);
        snapshot.label = label;
        Some(snapshot)
    }

    /// Resume a block from a snapshot: the label is resolved first, falling
    /// back to the stored index when absent or no longer present.
    pub fn resume(
        self: &Arc<Self>,
        snapshot: &ExecutionSnapshot,
    ) -> Result<BlockCompletion, FlowchartError> {
        let block = self
            .find_block(&snapshot.block)
            .ok_or_else(|| FlowchartError::BlockNotFound(snapshot.block.clone()))?;
        let start = snapshot
            .label
            .as_deref()
            .and_then(|label| block.find_label(label))
            .unwrap_or(snapshot.index);
        tracing::debug!(block = %snapshot.block, start, "resuming from snapshot");
        self.execute_block(&snapshot.block, start)
    }
}
