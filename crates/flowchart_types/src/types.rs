// Flowchart Types - Core data structures for the flowchart execution engine
//
// These types define the structure of flowcharts, blocks and commands.
// Flowcharts are stored as JSON files and loaded at runtime.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::value::Value;

// ─────────────────────────────────────────────────────────────────────────────
// Command Identity
// ─────────────────────────────────────────────────────────────────────────────

/// Stable identifier for a command, unique within one flowchart.
///
/// Survives reordering and insertion, so save data and cross-references can
/// point at a command without depending on its current index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommandId(pub uuid::Uuid);

impl CommandId {
    /// Create a new unique command ID
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for CommandId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CommandId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Command Classification
// ─────────────────────────────────────────────────────────────────────────────

/// Structural classification of a command.
///
/// The interpreter loop skips `Comment` and `Label` commands; the condition
/// scans that pair If/While constructs with their terminators match on
/// `Condition`, `Else` and `End`. Most commands are `Normal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    /// Ordinary command with no structural meaning
    Normal,
    /// Condition command (If, ElseIf, While) - opens an indented section
    Condition,
    /// Else marker - closes one section and opens another
    Else,
    /// End marker - closes a conditional or looping section
    End,
    /// Jump target marker, skipped during execution
    Label,
    /// Authoring note, skipped during execution
    Comment,
}

// ─────────────────────────────────────────────────────────────────────────────
// Definitions
// ─────────────────────────────────────────────────────────────────────────────

/// A command instance within a block definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandDef {
    /// Stable identifier, generated if absent from the source document
    #[serde(default)]
    pub id: CommandId,
    /// Command type (references a registered command factory, e.g. "flow/If")
    #[serde(rename = "type")]
    pub command_type: String,
    /// Disabled commands are skipped by the interpreter loop
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Command-specific configuration (e.g. the comparison for a condition)
    #[serde(default)]
    pub config: serde_json::Value,
}

fn default_enabled() -> bool {
    true
}

impl CommandDef {
    /// Create a new command definition with an empty config
    pub fn new(command_type: impl Into<String>) -> Self {
        Self {
            id: CommandId::new(),
            command_type: command_type.into(),
            enabled: true,
            config: serde_json::Value::Null,
        }
    }

    /// Set the command configuration
    pub fn with_config(mut self, config: serde_json::Value) -> Self {
        self.config = config;
        self
    }

    /// Mark the command as disabled
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// A named, ordered sequence of commands forming one executable unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockDef {
    /// Block name, unique within its flowchart
    pub name: String,
    /// Description shown in authoring tools
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Commands in execution order
    #[serde(default)]
    pub commands: Vec<CommandDef>,
}

impl BlockDef {
    /// Create a new empty block definition
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            commands: Vec::new(),
        }
    }

    /// Append a command definition
    pub fn with_command(mut self, command: CommandDef) -> Self {
        self.commands.push(command);
        self
    }
}

/// Complete flowchart definition: a set of blocks plus variable defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowchartDef {
    /// Flowchart name
    pub name: String,
    /// Version string
    #[serde(default = "default_version")]
    pub version: String,
    /// Description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Variable defaults, seeded into the variable store on construction
    #[serde(default)]
    pub variables: HashMap<String, Value>,
    /// Blocks in this flowchart (names must be unique)
    #[serde(default)]
    pub blocks: Vec<BlockDef>,
}

fn default_version() -> String {
    "1.0.0".to_string()
}

impl FlowchartDef {
    /// Create a new empty flowchart definition
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: default_version(),
            description: None,
            variables: HashMap::new(),
            blocks: Vec::new(),
        }
    }

    /// Append a block definition
    pub fn with_block(mut self, block: BlockDef) -> Self {
        self.blocks.push(block);
        self
    }

    /// Seed a variable default
    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }

    /// Get a block definition by name
    pub fn get_block(&self, name: &str) -> Option<&BlockDef> {
        self.blocks.iter().find(|b| b.name == name)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Execution Types
// ─────────────────────────────────────────────────────────────────────────────

/// Result of entering a single command.
///
/// Returned by a command's `enter`; a command that needs to wait for an
/// asynchronous completion simply keeps its `enter` future pending, which
/// suspends the block's loop with the cursor unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    /// Advance to the next command in the block
    Continue,
    /// Jump to an explicit command index
    ContinueAt(usize),
    /// Stop the parent block
    Stop,
}

/// Execution state of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Idle,
    Executing,
}

/// How a block run finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockResult {
    /// The cursor ran past the last command
    Completed,
    /// The block was stopped before completing
    Stopped,
}

/// Minimal record of an execution position, for save/resume.
///
/// Captured mid-block by a persistence collaborator and consumed once on
/// load. If `label` is set it is resolved to an index at resume time, with
/// `index` as the fallback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionSnapshot {
    /// Name of the block to resume
    pub block: String,
    /// Command index to resume at
    pub index: usize,
    /// Optional label resolved at resume time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl ExecutionSnapshot {
    /// Create a snapshot at a command index
    pub fn new(block: impl Into<String>, index: usize) -> Self {
        Self {
            block: block.into(),
            index,
            label: None,
        }
    }

    /// Create a snapshot that resumes at a label
    pub fn at_label(block: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            block: block.into(),
            index: 0,
            label: Some(label.into()),
        }
    }
}
