//! Execution context passed to commands.
//!
//! Rather than process-wide statics, every command receives an explicit
//! context carrying its parent block, the shared variable store and a weak
//! handle to the owning flowchart, so independent execution sessions (tests,
//! parallel instances) can coexist.

use std::sync::{Arc, Weak};

use crate::block::Block;
use crate::flowchart::Flowchart;
use crate::variables::VariableStore;

// ─────────────────────────────────────────────────────────────────────────────
// Execution Context
// ─────────────────────────────────────────────────────────────────────────────

/// Per-run environment handed to a block when it starts executing.
#[derive(Clone)]
pub struct ExecutionContext {
    variables: Arc<VariableStore>,
    flowchart: Weak<Flowchart>,
}

impl ExecutionContext {
    /// Context bound to a flowchart (the scheduler uses this)
    pub fn for_flowchart(flowchart: &Arc<Flowchart>) -> Self {
        Self {
            variables: Arc::clone(flowchart.variables()),
            flowchart: Arc::downgrade(flowchart),
        }
    }

    /// Standalone context with its own variable store, for blocks executed
    /// outside any flowchart
    pub fn detached() -> Self {
        Self::with_variables(Arc::new(VariableStore::new()))
    }

    /// Standalone context over an existing variable store
    pub fn with_variables(variables: Arc<VariableStore>) -> Self {
        Self {
            variables,
            flowchart: Weak::new(),
        }
    }

    /// The shared variable store
    pub fn variables(&self) -> &Arc<VariableStore> {
        &self.variables
    }

    /// The owning flowchart, if still alive
    pub fn flowchart(&self) -> Option<Arc<Flowchart>> {
        self.flowchart.upgrade()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Command Context
// ─────────────────────────────────────────────────────────────────────────────

/// Context passed to a single command's `enter`.
pub struct CommandContext {
    block: Arc<Block>,
    index: usize,
    exec: ExecutionContext,
}

impl CommandContext {
    pub(crate) fn new(block: Arc<Block>, index: usize, exec: ExecutionContext) -> Self {
        Self { block, index, exec }
    }

    /// The parent block
    pub fn block(&self) -> &Arc<Block> {
        &self.block
    }

    /// This command's index within the parent block
    pub fn index(&self) -> usize {
        self.index
    }

    /// This command's indent level
    pub fn indent(&self) -> usize {
        self.block
            .meta(self.index)
            .map(|meta| meta.indent)
            .unwrap_or(0)
    }

    /// The shared variable store
    pub fn variables(&self) -> &VariableStore {
        self.exec.variables()
    }

    /// The owning flowchart, if any (detached blocks have none)
    pub fn flowchart(&self) -> Option<Arc<Flowchart>> {
        self.exec.flowchart()
    }
}
