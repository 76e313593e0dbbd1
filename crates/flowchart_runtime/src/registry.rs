//! Command registry: maps `"category/Name"` type strings to factories that
//! deserialize a command's JSON config into a ready executor.

use std::collections::HashMap;
use std::sync::Arc;

use flowchart_types::{CommandDef, CommandOutcome};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::command::{CommandExecutor, FnCommand};
use crate::context::CommandContext;
use crate::error::{CommandError, RegistryError};

// ─────────────────────────────────────────────────────────────────────────────
// Command Spec
// ─────────────────────────────────────────────────────────────────────────────

/// Metadata for a registered command type, for tooling and palettes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandSpec {
    /// Full type string, e.g. `"flow/If"`
    pub id: String,
    /// Display name, e.g. `"If"`
    pub name: String,
    /// Category, e.g. `"flow"`
    pub category: String,
    /// One-line description
    pub description: Option<String>,
}

impl CommandSpec {
    /// Build a spec from a `"category/Name"` type string
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        let (category, name) = id
            .split_once('/')
            .map(|(c, n)| (c.to_string(), n.to_string()))
            .unwrap_or_else(|| (String::new(), id.clone()));
        Self {
            id,
            name,
            category,
            description: None,
        }
    }

    /// Attach a description
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Command Registry
// ─────────────────────────────────────────────────────────────────────────────

type CommandFactory =
    Box<dyn Fn(&serde_json::Value) -> Result<Arc<dyn CommandExecutor>, serde_json::Error> + Send + Sync>;

struct CommandEntry {
    spec: CommandSpec,
    factory: CommandFactory,
}

/// Registry of command types available to a flowchart.
///
/// Registration is a startup concern; lookups at build time take `&self`.
pub struct CommandRegistry {
    commands: HashMap<String, CommandEntry>,
}

impl CommandRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            commands: HashMap::new(),
        }
    }

    /// Create a registry preloaded with the builtin command set
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        crate::commands::register_builtin_commands(&mut registry);
        registry
    }

    /// Register a command whose config deserializes into `C`.
    ///
    /// Last registration for a type string wins, so applications can shadow
    /// builtins with their own implementations.
    pub fn register<C>(&mut self, spec: CommandSpec)
    where
        C: CommandExecutor + DeserializeOwned + 'static,
    {
        self.insert(
            spec,
            Box::new(|config| {
                // A missing config is the same as an empty one
                let config = match config {
                    serde_json::Value::Null => serde_json::Value::Object(Default::default()),
                    other => other.clone(),
                };
                let command: C = serde_json::from_value(config)?;
                Ok(Arc::new(command) as Arc<dyn CommandExecutor>)
            }),
        );
    }

    /// Register a config-free command backed by a closure
    pub fn register_fn<F>(&mut self, spec: CommandSpec, func: F)
    where
        F: Fn(&CommandContext) -> Result<CommandOutcome, CommandError> + Send + Sync + 'static,
    {
        let command: Arc<dyn CommandExecutor> = Arc::new(FnCommand::new(func));
        self.insert(spec, Box::new(move |_config| Ok(Arc::clone(&command))));
    }

    fn insert(&mut self, spec: CommandSpec, factory: CommandFactory) {
        tracing::debug!(command_type = %spec.id, "registered command");
        self.commands
            .insert(spec.id.clone(), CommandEntry { spec, factory });
    }

    /// Whether a command type is registered
    pub fn contains(&self, command_type: &str) -> bool {
        self.commands.contains_key(command_type)
    }

    /// Metadata for a registered command type
    pub fn spec(&self, command_type: &str) -> Option<&CommandSpec> {
        self.commands.get(command_type).map(|entry| &entry.spec)
    }

    /// Metadata for every registered command type, unordered
    pub fn specs(&self) -> impl Iterator<Item = &CommandSpec> {
        self.commands.values().map(|entry| &entry.spec)
    }

    /// Instantiate an executor for a command definition
    pub fn instantiate(&self, def: &CommandDef) -> Result<Arc<dyn CommandExecutor>, RegistryError> {
        let entry = self
            .commands
            .get(&def.command_type)
            .ok_or_else(|| RegistryError::UnknownCommandType(def.command_type.clone()))?;
        (entry.factory)(&def.config).map_err(|source| RegistryError::InvalidConfig {
            command_type: def.command_type.clone(),
            source,
        })
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}
