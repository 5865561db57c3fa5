//! Runtime values and the machine state they live in.

use std::fmt;

use crate::language::{self, VARIABLE_COUNT};
use crate::operation::BlockId;

/// A value on the operand stack or in a variable slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Value {
    Integer(i32),
    /// A lambda, referring to its body block.
    Function(BlockId),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Integer(_) => "Integer",
            Value::Function(_) => "Function",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(value) => write!(f, "{value}"),
            Value::Function(body) => write!(f, "Function{body}"),
        }
    }
}

/// Operand stack. The top is the end of the vector.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stack {
    values: Vec<Value>,
}

impl Stack {
    pub fn new() -> Self {
        Stack::default()
    }

    pub fn push(&mut self, value: Value) {
        self.values.push(value);
    }

    pub fn pop(&mut self) -> Option<Value> {
        self.values.pop()
    }

    pub fn peek(&self) -> Option<&Value> {
        self.values.last()
    }

    /// The `n`th value counted from the top, `0` being the top itself.
    pub fn pick(&self, n: usize) -> Option<Value> {
        let len = self.values.len();
        if n < len {
            Some(self.values[len - 1 - n])
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    /// Bottom-to-top view.
    pub fn as_slice(&self) -> &[Value] {
        &self.values
    }
}

impl fmt::Display for Stack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, value) in self.values.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{value}")?;
        }
        f.write_str("]")
    }
}

/// The 26 variable slots `a`..=`z`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Variables {
    slots: [Option<Value>; VARIABLE_COUNT],
}

impl Variables {
    pub fn new() -> Self {
        Variables::default()
    }

    pub fn get(&self, name: char) -> Option<Value> {
        language::variable_slot(name).and_then(|slot| self.slots[slot])
    }

    /// Store `value` in `name`. Returns `false` for a name outside `a`..=`z`.
    pub fn set(&mut self, name: char, value: Value) -> bool {
        match language::variable_slot(name) {
            Some(slot) => {
                self.slots[slot] = Some(value);
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.slots = [None; VARIABLE_COUNT];
    }

    /// Assigned variables in alphabetical order.
    pub fn iter(&self) -> impl Iterator<Item = (char, Value)> + '_ {
        (language::VARIABLE_FIRST..=language::VARIABLE_LAST)
            .zip(self.slots.iter())
            .filter_map(|(name, slot)| slot.map(|value| (name, value)))
    }
}

impl fmt::Display for Variables {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (name, value)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{name}: {value}")?;
        }
        f.write_str("}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_from_the_top() {
        let mut stack = Stack::new();
        for n in 1..=4 {
            stack.push(Value::Integer(n));
        }
        assert_eq!(stack.pick(0), Some(Value::Integer(4)));
        assert_eq!(stack.pick(2), Some(Value::Integer(2)));
        assert_eq!(stack.pick(4), None);
        assert_eq!(stack.to_string(), "[1, 2, 3, 4]");
    }

    #[test]
    fn variables_start_unset() {
        let mut variables = Variables::new();
        assert_eq!(variables.get('c'), None);
        assert!(variables.set('c', Value::Integer(7)));
        assert!(!variables.set('C', Value::Integer(7)));
        assert_eq!(variables.get('c'), Some(Value::Integer(7)));
        variables.set('a', Value::Function(BlockId::ROOT));
        assert_eq!(variables.to_string(), "{a: Function#0, c: 7}");
        variables.clear();
        assert_eq!(variables.iter().count(), 0);
    }

    #[test]
    fn names_value_types() {
        assert_eq!(Value::Integer(0).type_name(), "Integer");
        assert_eq!(Value::Function(BlockId::ROOT).type_name(), "Function");
    }
}
