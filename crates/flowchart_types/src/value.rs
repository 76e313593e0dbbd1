//! Variable value type shared by conditions, set-variable commands and the
//! flowchart variable store.

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Value
// ─────────────────────────────────────────────────────────────────────────────

/// A value held in a flowchart variable store.
///
/// Conditions compare these, set-variable commands write them, and any
/// command may read them through its execution context. The type set matches
/// what condition evaluation needs to be synchronous and side-effect-free.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Value {
    /// Null/unset value
    Null,
    /// Boolean value
    Bool(bool),
    /// 64-bit integer
    Int(i64),
    /// 64-bit floating point
    Float(f64),
    /// UTF-8 string
    String(String),
}

impl Default for Value {
    fn default() -> Self {
        Value::Null
    }
}

impl Value {
    /// Check if value is null
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Get as boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get as integer
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Get as float (integers convert)
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Get as string slice
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Check if this value is numeric (int or float)
    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_))
    }

    /// Human-readable name of this value's type
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i as i64)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(v) => write!(f, "{}", v),
            Value::String(s) => write!(f, "{}", s),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Compare Operator
// ─────────────────────────────────────────────────────────────────────────────

/// Comparison operator used by condition commands (If, ElseIf, While).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOperator {
    Equals,
    NotEquals,
    LessThan,
    GreaterThan,
    LessThanOrEquals,
    GreaterThanOrEquals,
}

impl CompareOperator {
    /// Operator symbol for command summaries
    pub fn symbol(&self) -> &'static str {
        match self {
            CompareOperator::Equals => "==",
            CompareOperator::NotEquals => "!=",
            CompareOperator::LessThan => "<",
            CompareOperator::GreaterThan => ">",
            CompareOperator::LessThanOrEquals => "<=",
            CompareOperator::GreaterThanOrEquals => ">=",
        }
    }

    /// Evaluate the comparison between two values.
    ///
    /// Numeric values compare across int/float. Equality is defined for any
    /// two values of the same type; ordering only for numbers. Returns `None`
    /// when the operands are incomparable, which callers treat as a false
    /// outcome after logging.
    pub fn evaluate(&self, lhs: &Value, rhs: &Value) -> Option<bool> {
        use CompareOperator::*;

        if lhs.is_numeric() && rhs.is_numeric() {
            let a = lhs.as_float()?;
            let b = rhs.as_float()?;
            return Some(match self {
                Equals => a == b,
                NotEquals => a != b,
                LessThan => a < b,
                GreaterThan => a > b,
                LessThanOrEquals => a <= b,
                GreaterThanOrEquals => a >= b,
            });
        }

        match self {
            Equals | NotEquals => {
                if lhs.type_name() != rhs.type_name() {
                    return None;
                }
                let eq = lhs == rhs;
                Some(if *self == Equals { eq } else { !eq })
            }
            // Ordering is only defined for numbers
            _ => None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Set Operator
// ─────────────────────────────────────────────────────────────────────────────

/// Operator applied by set-variable commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SetOperator {
    /// Replace the current value
    Assign,
    /// Numeric addition, or string concatenation
    Add,
    /// Numeric subtraction
    Subtract,
    /// Numeric multiplication
    Multiply,
    /// Numeric division
    Divide,
}

impl Default for SetOperator {
    fn default() -> Self {
        SetOperator::Assign
    }
}

impl SetOperator {
    /// Operator symbol for command summaries
    pub fn symbol(&self) -> &'static str {
        match self {
            SetOperator::Assign => "=",
            SetOperator::Add => "+=",
            SetOperator::Subtract => "-=",
            SetOperator::Multiply => "*=",
            SetOperator::Divide => "/=",
        }
    }

    /// Apply the operator to the current value and an operand.
    ///
    /// Integer arithmetic stays integer; mixed int/float promotes to float.
    /// Returns `None` for type mismatches, division by zero and integer
    /// overflow, which callers treat as a skipped write after logging.
    pub fn apply(&self, current: &Value, operand: &Value) -> Option<Value> {
        if *self == SetOperator::Assign {
            return Some(operand.clone());
        }

        if let (Value::Int(a), Value::Int(b)) = (current, operand) {
            // Overflow and division by zero both skip the write
            return match self {
                SetOperator::Add => a.checked_add(*b),
                SetOperator::Subtract => a.checked_sub(*b),
                SetOperator::Multiply => a.checked_mul(*b),
                SetOperator::Divide => a.checked_div(*b),
                SetOperator::Assign => unreachable!(),
            }
            .map(Value::Int);
        }

        if current.is_numeric() && operand.is_numeric() {
            let a = current.as_float()?;
            let b = operand.as_float()?;
            return Some(Value::Float(match self {
                SetOperator::Add => a + b,
                SetOperator::Subtract => a - b,
                SetOperator::Multiply => a * b,
                SetOperator::Divide => {
                    if b == 0.0 {
                        return None;
                    }
                    a / b
                }
                SetOperator::Assign => unreachable!(),
            }));
        }

        if let (Value::String(a), Value::String(b), SetOperator::Add) = (current, operand, self) {
            return Some(Value::String(format!("{}{}", a, b)));
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_accessors() {
        assert_eq!(Value::Int(42).as_int(), Some(42));
        assert_eq!(Value::Int(42).as_float(), Some(42.0));
        assert_eq!(Value::Float(1.5).as_float(), Some(1.5));
        assert_eq!(Value::Bool(true).as_bool(), Some(true));
        assert_eq!(Value::from("hi").as_str(), Some("hi"));
        assert!(Value::Null.is_null());
        assert_eq!(Value::from("hi").as_int(), None);
    }

    #[test]
    fn test_compare_numeric_cross_type() {
        let op = CompareOperator::LessThan;
        assert_eq!(op.evaluate(&Value::Int(2), &Value::Float(2.5)), Some(true));
        assert_eq!(
            CompareOperator::Equals.evaluate(&Value::Int(3), &Value::Float(3.0)),
            Some(true)
        );
    }

    #[test]
    fn test_compare_strings() {
        let a = Value::from("hello");
        let b = Value::from("hello");
        assert_eq!(CompareOperator::Equals.evaluate(&a, &b), Some(true));
        assert_eq!(CompareOperator::NotEquals.evaluate(&a, &b), Some(false));
        // Ordering on strings is not defined
        assert_eq!(CompareOperator::LessThan.evaluate(&a, &b), None);
    }

    #[test]
    fn test_compare_incompatible_types() {
        assert_eq!(
            CompareOperator::Equals.evaluate(&Value::Bool(true), &Value::Int(1)),
            None
        );
    }

    #[test]
    fn test_set_operator_integer_math() {
        let op = SetOperator::Add;
        assert_eq!(op.apply(&Value::Int(2), &Value::Int(3)), Some(Value::Int(5)));
        assert_eq!(
            SetOperator::Divide.apply(&Value::Int(7), &Value::Int(2)),
            Some(Value::Int(3))
        );
        assert_eq!(SetOperator::Divide.apply(&Value::Int(7), &Value::Int(0)), None);
    }

    #[test]
    fn test_set_operator_integer_overflow_is_skipped() {
        assert_eq!(SetOperator::Add.apply(&Value::Int(i64::MAX), &Value::Int(1)), None);
        assert_eq!(SetOperator::Subtract.apply(&Value::Int(i64::MIN), &Value::Int(1)), None);
        assert_eq!(
            SetOperator::Multiply.apply(&Value::Int(i64::MAX), &Value::Int(2)),
            None
        );
        // MIN / -1 overflows too
        assert_eq!(SetOperator::Divide.apply(&Value::Int(i64::MIN), &Value::Int(-1)), None);
    }

    #[test]
    fn test_set_operator_mixed_promotes_to_float() {
        assert_eq!(
            SetOperator::Multiply.apply(&Value::Int(2), &Value::Float(1.5)),
            Some(Value::Float(3.0))
        );
    }

    #[test]
    fn test_set_operator_string_concat() {
        assert_eq!(
            SetOperator::Add.apply(&Value::from("ab"), &Value::from("cd")),
            Some(Value::from("abcd"))
        );
        assert_eq!(SetOperator::Subtract.apply(&Value::from("ab"), &Value::from("cd")), None);
    }

    #[test]
    fn test_value_json_roundtrip() {
        let v = Value::Float(2.5);
        let json = serde_json::to_string(&v).unwrap();
        let back: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(v, back);
    }
}
