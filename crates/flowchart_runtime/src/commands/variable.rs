//! Variable mutation commands.

use async_trait::async_trait;
use serde::Deserialize;

use flowchart_types::{CommandOutcome, SetOperator, Value};

use crate::command::CommandExecutor;
use crate::context::CommandContext;
use crate::error::CommandError;

/// Set or modify a named variable in the shared store.
#[derive(Deserialize)]
pub struct SetVariableCommand {
    pub variable: String,
    #[serde(default)]
    pub operator: SetOperator,
    pub value: Value,
}

#[async_trait]
impl CommandExecutor for SetVariableCommand {
    async fn enter(&self, ctx: CommandContext) -> Result<CommandOutcome, CommandError> {
        ctx.variables().apply(&self.variable, self.operator, &self.value);
        Ok(CommandOutcome::Continue)
    }

    fn summary(&self) -> String {
        format!("{} {} {}", self.variable, self.operator.symbol(), self.value)
    }

    fn has_reference(&self, variable: &str) -> bool {
        self.variable == variable
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use flowchart_types::{BlockDef, BlockResult, CommandDef, FlowchartDef};

    use crate::flowchart::Flowchart;
    use crate::registry::CommandRegistry;

    #[tokio::test]
    async fn test_set_assign_and_arithmetic() {
        let registry = CommandRegistry::with_builtins();
        let def = FlowchartDef::new("test").with_variable("score", 10i64).with_block(
            BlockDef::new("main")
                .with_command(CommandDef::new("variable/Set").with_config(serde_json::json!({
                    "variable": "score",
                    "operator": "add",
                    "value": { "kind": "int", "value": 5 },
                })))
                .with_command(CommandDef::new("variable/Set").with_config(serde_json::json!({
                    "variable": "name",
                    "value": { "kind": "string", "value": "Ann" },
                }))),
        );

        let flowchart = Arc::new(Flowchart::from_def(&def, &registry).unwrap());
        let result = flowchart.execute_block("main", 0).unwrap().wait().await.unwrap();
        assert_eq!(result, BlockResult::Completed);
        assert_eq!(flowchart.variables().get("score"), Some(Value::Int(15)));
        assert_eq!(
            flowchart.variables().get("name"),
            Some(Value::String("Ann".to_string()))
        );
    }

    #[test]
    fn test_summary_and_reference() {
        let command = SetVariableCommand {
            variable: "lives".to_string(),
            operator: SetOperator::Subtract,
            value: Value::Int(1),
        };
        assert_eq!(command.summary(), "lives -= 1");
        assert!(command.has_reference("lives"));
        assert!(!command.has_reference("score"));
    }
}
