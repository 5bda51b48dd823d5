use alloc::boxed::Box;
use alloc::string::{String, ToString};
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;

use bitflags::bitflags;

use crate::{MemberRef, ObjectRef, descends_to};

/// A dynamically typed value read from or written to a member.
#[derive(Clone, Debug, Default)]
#[non_exhaustive]
pub enum Value {
    /// No value
    #[default]
    Null,

    /// A boolean
    Bool(bool),

    /// A signed integer
    Int(i64),

    /// A floating point number
    Float(f64),

    /// A string
    Text(String),

    /// A set of break conditions
    BreakConditions(BreakConditions),

    /// A list of values
    List(Vec<Value>),

    /// A list of member descriptors, compared by reference
    Members(Vec<MemberRef>),

    /// A reference to an object of the graph, compared by reference
    Object(ObjectRef),
}

impl Value {
    /// Short name of the variant, used in error messages
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::BreakConditions(_) => "break conditions",
            Value::List(_) => "list",
            Value::Members(_) => "members",
            Value::Object(_) => "object",
        }
    }

    /// Returns true for [`Value::Null`]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the integer, if this is one
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the float, if this is one
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Returns the string slice, if this is text
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the member list, if this is one
    pub fn as_members(&self) -> Option<&[MemberRef]> {
        match self {
            Value::Members(m) => Some(m),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(l), Value::Bool(r)) => l == r,
            (Value::Int(l), Value::Int(r)) => l == r,
            (Value::Float(l), Value::Float(r)) => l == r,
            (Value::Text(l), Value::Text(r)) => l == r,
            (Value::BreakConditions(l), Value::BreakConditions(r)) => l == r,
            (Value::List(l), Value::List(r)) => l == r,
            (Value::Members(l), Value::Members(r)) => {
                l.len() == r.len() && l.iter().zip(r).all(|(l, r)| Arc::ptr_eq(l, r))
            }
            (Value::Object(l), Value::Object(r)) => Arc::ptr_eq(l, r),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Text(s) => write!(f, "{s}"),
            Value::BreakConditions(bc) => write!(f, "{bc}"),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Value::Members(members) => {
                write!(f, "[")?;
                for (i, member) in members.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", member.name())?;
                }
                write!(f, "]")
            }
            Value::Object(obj) => write!(f, "⟨{}⟩", obj.type_data().name()),
        }
    }
}

/// The declared type of a member's value.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ValueType {
    /// Accepts anything
    Any,
    /// [`Value::Bool`]
    Bool,
    /// [`Value::Int`]
    Int,
    /// [`Value::Float`]
    Float,
    /// [`Value::Text`]
    Text,
    /// [`Value::BreakConditions`]
    BreakConditions,
    /// [`Value::List`] whose items are all of the inner type
    List(Box<ValueType>),
    /// [`Value::Members`]
    Members,
    /// [`Value::Object`] whose type descends to the named type, or [`Value::Null`]
    Object(String),
}

impl ValueType {
    /// Returns true if `value` can be stored as-is in a member of this type.
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (ValueType::Any, _) => true,
            (ValueType::Bool, Value::Bool(_))
            | (ValueType::Int, Value::Int(_))
            | (ValueType::Float, Value::Float(_))
            | (ValueType::Text, Value::Text(_))
            | (ValueType::BreakConditions, Value::BreakConditions(_))
            | (ValueType::Members, Value::Members(_)) => true,
            (ValueType::List(inner), Value::List(items)) => items.iter().all(|v| inner.accepts(v)),
            (ValueType::Object(_), Value::Null) => true,
            (ValueType::Object(name), Value::Object(obj)) => descends_to(&obj.type_data(), name),
            _ => false,
        }
    }

    /// Converts `value` into something this type accepts, if there is a lossless way to.
    pub fn convert(&self, value: &Value) -> Option<Value> {
        if self.accepts(value) {
            return Some(value.clone());
        }
        match (self, value) {
            (ValueType::Float, Value::Int(i)) => Some(Value::Float(*i as f64)),
            (ValueType::Int, Value::Float(x))
                if x.fract() == 0.0 && *x >= i64::MIN as f64 && *x <= i64::MAX as f64 =>
            {
                Some(Value::Int(*x as i64))
            }
            (ValueType::Text, Value::Bool(_) | Value::Int(_) | Value::Float(_)) => {
                Some(Value::Text(value.to_string()))
            }
            (ValueType::List(inner), Value::List(items)) => items
                .iter()
                .map(|item| inner.convert(item))
                .collect::<Option<Vec<_>>>()
                .map(Value::List),
            _ => None,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Any => write!(f, "any"),
            ValueType::Bool => write!(f, "bool"),
            ValueType::Int => write!(f, "int"),
            ValueType::Float => write!(f, "float"),
            ValueType::Text => write!(f, "text"),
            ValueType::BreakConditions => write!(f, "break conditions"),
            ValueType::List(inner) => write!(f, "list<{inner}>"),
            ValueType::Members => write!(f, "members"),
            ValueType::Object(name) => write!(f, "{name}"),
        }
    }
}

bitflags! {
    /// Conditions under which a step run stops
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BreakConditions: u32 {
        /// Use the parent's break conditions
        const INHERIT = 1 << 0;

        /// Break when a step errors
        const BREAK_ON_ERROR = 1 << 1;

        /// Break when a step fails
        const BREAK_ON_FAIL = 1 << 2;

        /// Break when a step is inconclusive
        const BREAK_ON_INCONCLUSIVE = 1 << 3;

        /// Break when a step passes
        const BREAK_ON_PASS = 1 << 4;
    }
}

impl Default for BreakConditions {
    #[inline(always)]
    fn default() -> Self {
        Self::INHERIT
    }
}

impl fmt::Display for BreakConditions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "none");
        }

        let flags = [
            (BreakConditions::INHERIT, "inherit"),
            (BreakConditions::BREAK_ON_ERROR, "break on error"),
            (BreakConditions::BREAK_ON_FAIL, "break on fail"),
            (BreakConditions::BREAK_ON_INCONCLUSIVE, "break on inconclusive"),
            (BreakConditions::BREAK_ON_PASS, "break on pass"),
        ];

        let mut is_first = true;
        for (flag, name) in flags {
            if self.contains(flag) {
                if !is_first {
                    write!(f, ", ")?;
                }
                is_first = false;
                write!(f, "{name}")?;
            }
        }

        Ok(())
    }
}
