//! Variable store - shared key-value bindings consumed by command evaluation.
//!
//! The store is externally owned from the engine's point of view: the engine
//! imposes no locking discipline beyond individual reads and writes, and
//! concurrent blocks mutating the same variable is an authoring concern, not
//! something the engine arbitrates.

use std::collections::HashMap;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use flowchart_types::{CompareOperator, SetOperator, Value};

/// Named, typed variable bindings shared by all blocks of a flowchart.
#[derive(Debug, Default)]
pub struct VariableStore {
    values: RwLock<HashMap<String, Value>>,
}

impl VariableStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with initial values
    pub fn from_map(values: HashMap<String, Value>) -> Self {
        Self {
            values: RwLock::new(values),
        }
    }

    /// Get a variable value
    pub fn get(&self, name: &str) -> Option<Value> {
        self.values.read().get(name).cloned()
    }

    /// Set a variable value
    pub fn set(&self, name: impl Into<String>, value: impl Into<Value>) {
        self.values.write().insert(name.into(), value.into());
    }

    /// Check if a variable exists
    pub fn has(&self, name: &str) -> bool {
        self.values.read().contains_key(name)
    }

    /// Replace the whole store contents (used by flowchart variable reset)
    pub fn replace(&self, values: HashMap<String, Value>) {
        *self.values.write() = values;
    }

    /// Apply a set operator to a variable.
    ///
    /// A missing variable behaves as `Null` for Assign and skips arithmetic
    /// with a warning; type mismatches and division by zero also skip the
    /// write, leaving the current value untouched.
    pub fn apply(&self, name: &str, operator: SetOperator, operand: &Value) {
        let mut values = self.values.write();
        let current = values.get(name).cloned().unwrap_or_default();
        match operator.apply(&current, operand) {
            Some(next) => {
                values.insert(name.to_string(), next);
            }
            None => {
                tracing::warn!(
                    variable = name,
                    operator = operator.symbol(),
                    current = %current,
                    operand = %operand,
                    "set-variable operation skipped: incompatible operands"
                );
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Comparison
// ─────────────────────────────────────────────────────────────────────────────

/// A boolean expression over one variable, used by condition commands.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comparison {
    /// Variable to read from the store
    pub variable: String,
    /// Comparison operator
    pub operator: CompareOperator,
    /// Right-hand operand
    pub value: Value,
}

impl Comparison {
    /// Create a new comparison
    pub fn new(variable: impl Into<String>, operator: CompareOperator, value: impl Into<Value>) -> Self {
        Self {
            variable: variable.into(),
            operator,
            value: value.into(),
        }
    }

    /// Evaluate against a store.
    ///
    /// An unset variable or an incomparable operand pair evaluates to false
    /// after logging; condition commands never fail the block over a bad
    /// comparison.
    pub fn evaluate(&self, variables: &VariableStore) -> bool {
        let Some(current) = variables.get(&self.variable) else {
            tracing::warn!(variable = %self.variable, "condition references unset variable, evaluating false");
            return false;
        };
        match self.operator.evaluate(&current, &self.value) {
            Some(result) => result,
            None => {
                tracing::warn!(
                    variable = %self.variable,
                    lhs = %current,
                    rhs = %self.value,
                    operator = self.operator.symbol(),
                    "incomparable operands, evaluating false"
                );
                false
            }
        }
    }

    /// Summary text, e.g. `lives > 0`
    pub fn summary(&self) -> String {
        format!("{} {} {}", self.variable, self.operator.symbol(), self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_get_set() {
        let store = VariableStore::new();
        assert!(!store.has("coins"));
        store.set("coins", 5);
        assert_eq!(store.get("coins"), Some(Value::Int(5)));
    }

    #[test]
    fn test_apply_add() {
        let store = VariableStore::new();
        store.set("coins", 5);
        store.apply("coins", SetOperator::Add, &Value::Int(3));
        assert_eq!(store.get("coins"), Some(Value::Int(8)));
    }

    #[test]
    fn test_apply_mismatch_leaves_value() {
        let store = VariableStore::new();
        store.set("name", "fred");
        store.apply("name", SetOperator::Subtract, &Value::Int(1));
        assert_eq!(store.get("name"), Some(Value::from("fred")));
    }

    #[test]
    fn test_comparison_unset_variable_is_false() {
        let store = VariableStore::new();
        let cmp = Comparison::new("missing", CompareOperator::Equals, 1);
        assert!(!cmp.evaluate(&store));
    }

    #[test]
    fn test_comparison_numeric() {
        let store = VariableStore::new();
        store.set("lives", 2);
        let cmp = Comparison::new("lives", CompareOperator::GreaterThan, 0);
        assert!(cmp.evaluate(&store));
        assert_eq!(cmp.summary(), "lives > 0");
    }

    #[test]
    fn test_comparison_incomparable_is_false() {
        let store = VariableStore::new();
        store.set("flag", true);
        let cmp = Comparison::new("flag", CompareOperator::LessThan, 1);
        assert!(!cmp.evaluate(&store));
    }
}
