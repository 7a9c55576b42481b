use core::fmt;
use std::rc::Rc;

use itertools::Itertools;
use rustc_hash::FxHashMap;

use crate::{
    ast::{format_float, Block},
    builtin::Builtin,
    environment::Env,
};

/// Runtime values produced by evaluation.
///
/// `ReturnValue` and `Error` are signals rather than data: they unwind
/// evaluation to a call boundary or to the top of the program.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Integer(i64),
    Float(f64),
    Boolean(bool),
    String(Rc<str>),
    Array(Rc<[Value]>),
    Dictionary(Rc<Dictionary>),
    Function(Rc<Function>),
    Builtin(&'static Builtin),
    ReturnValue(Box<Value>),
    Error(Rc<str>),
}

/// A closure: parameters and body from the literal, plus the scope the
/// literal was evaluated in.
#[derive(Debug)]
pub struct Function {
    pub parameters: Rc<[String]>,
    pub body: Rc<Block>,
    pub env: Env,
}

/// The subset of values usable as dictionary keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HashKey {
    Integer(i64),
    Boolean(bool),
    String(Rc<str>),
}

impl From<&HashKey> for Value {
    fn from(key: &HashKey) -> Self {
        match key {
            HashKey::Integer(value) => Self::Integer(*value),
            HashKey::Boolean(value) => Self::Boolean(*value),
            HashKey::String(value) => Self::String(Rc::clone(value)),
        }
    }
}

/// Insertion-ordered mapping from hashable values to values.
#[derive(Debug, Default)]
pub struct Dictionary {
    entries: Vec<(HashKey, Value)>,
    index: FxHashMap<HashKey, usize>,
}

impl Dictionary {
    /// Inserts or overwrites; an overwritten key keeps its original position.
    pub fn insert(&mut self, key: HashKey, value: Value) {
        match self.index.get(&key) {
            Some(&position) => self.entries[position].1 = value,
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, value));
            }
        }
    }

    pub fn get(&self, key: &HashKey) -> Option<&Value> {
        self.index.get(key).map(|&position| &self.entries[position].1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&HashKey, &Value)> {
        self.entries.iter().map(|(key, value)| (key, value))
    }
}

impl FromIterator<(HashKey, Value)> for Dictionary {
    fn from_iter<T: IntoIterator<Item = (HashKey, Value)>>(iter: T) -> Self {
        let mut dictionary = Self::default();
        for (key, value) in iter {
            dictionary.insert(key, value);
        }
        dictionary
    }
}

// Relative tolerance matching the usual "isclose" default
const RELATIVE_TOLERANCE: f64 = 1e-9;

fn is_close(a: f64, b: f64) -> bool {
    a == b || (a - b).abs() <= RELATIVE_TOLERANCE * a.abs().max(b.abs())
}

impl Value {
    pub fn error(message: impl Into<Rc<str>>) -> Self {
        Self::Error(message.into())
    }

    pub fn string(value: impl Into<Rc<str>>) -> Self {
        Self::String(value.into())
    }

    pub fn array(elements: impl Into<Rc<[Value]>>) -> Self {
        Self::Array(elements.into())
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "NULL",
            Self::Integer(_) => "INTEGER",
            Self::Float(_) => "FLOAT",
            Self::Boolean(_) => "BOOLEAN",
            Self::String(_) => "STRING",
            Self::Array(_) => "ARRAY",
            Self::Dictionary(_) => "DICTIONARY",
            Self::Function(_) => "FUNCTION",
            Self::Builtin(_) => "BUILTIN",
            Self::ReturnValue(_) => "RETURN_VALUE",
            Self::Error(_) => "ERROR",
        }
    }

    /// Only `null` and `false` are falsy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Self::Null | Self::Boolean(false))
    }

    pub fn hash_key(&self) -> Option<HashKey> {
        match self {
            Self::Integer(value) => Some(HashKey::Integer(*value)),
            Self::Boolean(value) => Some(HashKey::Boolean(*value)),
            Self::String(value) => Some(HashKey::String(Rc::clone(value))),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(value) => Some(*value as f64),
            Self::Float(value) => Some(*value),
            _ => None,
        }
    }
}

/// Language equality: numbers compare by value across Integer and Float,
/// strings by content, and everything else by identity.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Integer(_) | Self::Float(_), Self::Integer(_) | Self::Float(_)) => {
                matches!((self.as_f64(), other.as_f64()), (Some(a), Some(b)) if is_close(a, b))
            }
            (Self::Array(a), Self::Array(b)) => Rc::ptr_eq(a, b),
            (Self::Dictionary(a), Self::Dictionary(b)) => Rc::ptr_eq(a, b),
            (Self::Function(a), Self::Function(b)) => Rc::ptr_eq(a, b),
            (Self::Builtin(a), Self::Builtin(b)) => std::ptr::eq(*a, *b),
            _ => false,
        }
    }
}

/// Strings nested inside collections are shown quoted.
struct Nested<'a>(&'a Value);

impl fmt::Display for Nested<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Value::String(value) => write!(f, "\"{value}\""),
            other => fmt::Display::fmt(other, f),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Integer(value) => write!(f, "{value}"),
            Self::Float(value) => f.write_str(&format_float(*value)),
            Self::Boolean(value) => write!(f, "{value}"),
            Self::String(value) => f.write_str(value),
            Self::Array(elements) => write!(f, "[{}]", elements.iter().map(Nested).join(", ")),
            Self::Dictionary(dictionary) => write!(
                f,
                "{{{}}}",
                dictionary
                    .iter()
                    .map(|(key, value)| format!("{}: {}", Nested(&Value::from(key)), Nested(value)))
                    .join(", ")
            ),
            Self::Function(function) => write!(f, "fn({}) {{ ... }}", function.parameters.iter().join(", ")),
            Self::Builtin(builtin) => write!(f, "builtin function {}", builtin.name),
            Self::ReturnValue(value) => fmt::Display::fmt(value, f),
            Self::Error(message) => write!(f, "Error: {message}"),
        }
    }
}
