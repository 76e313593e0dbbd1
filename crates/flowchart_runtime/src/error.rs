//! Error types for the flowchart runtime.

use thiserror::Error;

/// Errors surfaced by flowchart and block operations.
#[derive(Debug, Error)]
pub enum FlowchartError {
    #[error("block not found: {0}")]
    BlockNotFound(String),

    #[error("block already exists: {0}")]
    DuplicateBlock(String),

    #[error("block is already executing: {0}")]
    AlreadyExecuting(String),

    #[error("completion channel closed for block: {0}")]
    CompletionLost(String),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Command(#[from] CommandError),
}

/// Errors raised while instantiating commands from definitions.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("unknown command type: {0}")]
    UnknownCommandType(String),

    #[error("invalid config for {command_type}: {source}")]
    InvalidConfig {
        command_type: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Error returned by a command's `enter`.
///
/// These are programmer/integration errors: the engine propagates them out of
/// the interpreter loop without retrying or recovering (the block is left in
/// its executing state). Authoring mistakes like a missing End degrade with a
/// log line instead and never produce a `CommandError`.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("{0}")]
    Failed(String),

    #[error("command was resumed more than once")]
    AlreadyResumed,
}

impl CommandError {
    /// Create a failure with a message
    pub fn failed(message: impl Into<String>) -> Self {
        CommandError::Failed(message.into())
    }
}
