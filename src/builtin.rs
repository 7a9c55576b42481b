use core::fmt;
use std::io::{self, BufRead, Write};

use itertools::Itertools;
use thiserror::Error;

use crate::value::Value;

type NativeFunction = fn(&[Value]) -> Result<Value, BuiltinError>;

/// A native function reachable from the language by name.
pub struct Builtin {
    pub name: &'static str,
    pub doc: &'static str,
    function: NativeFunction,
}

impl Builtin {
    /// Invokes the builtin, turning a failure into an `Error` value.
    pub fn call(&self, arguments: &[Value]) -> Value {
        (self.function)(arguments).unwrap_or_else(|err| Value::error(err.to_string()))
    }
}

impl fmt::Debug for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Builtin").field(&self.name).finish()
    }
}

/// Accepted argument counts, rendered the way arity errors print them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exactly(usize),
    AtMost(usize),
    AtLeast(usize),
}

impl Arity {
    fn accepts(self, count: usize) -> bool {
        match self {
            Self::Exactly(n) => count == n,
            Self::AtMost(n) => count <= n,
            Self::AtLeast(n) => count >= n,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exactly(n) => write!(f, "={n}"),
            Self::AtMost(n) => write!(f, "<={n}"),
            Self::AtLeast(n) => write!(f, ">={n}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuiltinError {
    #[error("wrong number of arguments. got={got}, want{want}")]
    Arity { got: usize, want: Arity },
    #[error("argument to `{name}` not supported, got {got}")]
    Unsupported { name: &'static str, got: &'static str },
    #[error("argument cannot be converted to {0}")]
    Conversion(&'static str),
    #[error("{0}")]
    Other(String),
}

fn check_arity(arguments: &[Value], want: Arity) -> Result<(), BuiltinError> {
    if want.accepts(arguments.len()) {
        Ok(())
    } else {
        Err(BuiltinError::Arity { got: arguments.len(), want })
    }
}

fn unsupported(name: &'static str, value: &Value) -> BuiltinError {
    BuiltinError::Unsupported { name, got: value.type_name() }
}

fn overflow() -> BuiltinError {
    BuiltinError::Other("integer overflow".to_owned())
}

fn builtin_len(arguments: &[Value]) -> Result<Value, BuiltinError> {
    check_arity(arguments, Arity::Exactly(1))?;

    let length = match &arguments[0] {
        Value::String(value) => value.chars().count(),
        Value::Array(elements) => elements.len(),
        Value::Dictionary(dictionary) => dictionary.len(),
        other => return Err(unsupported("len", other)),
    };
    i64::try_from(length).map(Value::Integer).map_err(|_| overflow())
}

fn builtin_exit(arguments: &[Value]) -> Result<Value, BuiltinError> {
    check_arity(arguments, Arity::AtMost(1))?;

    let status = match arguments.first() {
        None => 0,
        Some(Value::Integer(status)) => i32::try_from(*status)
            .map_err(|_| BuiltinError::Other(format!("exit status {status} out of range")))?,
        Some(other) => return Err(unsupported("exit", other)),
    };
    std::process::exit(status)
}

fn builtin_type(arguments: &[Value]) -> Result<Value, BuiltinError> {
    check_arity(arguments, Arity::Exactly(1))?;
    Ok(Value::string(arguments[0].type_name()))
}

fn builtin_help(arguments: &[Value]) -> Result<Value, BuiltinError> {
    check_arity(arguments, Arity::AtMost(1))?;

    match arguments.first() {
        None => Ok(Value::string(names().join(", "))),
        Some(Value::Builtin(builtin)) => Ok(Value::string(builtin.doc)),
        Some(other) => Err(unsupported("help", other)),
    }
}

fn builtin_puts(arguments: &[Value]) -> Result<Value, BuiltinError> {
    let mut stdout = io::stdout().lock();
    for argument in arguments {
        writeln!(stdout, "{argument}").map_err(|err| BuiltinError::Other(err.to_string()))?;
    }
    Ok(Value::Null)
}

fn builtin_gets(arguments: &[Value]) -> Result<Value, BuiltinError> {
    read_line(arguments, &mut io::stdin().lock(), &mut io::stdout().lock())
}

/// Writes the optional prompt to `output`, then reads one line from `input`
/// without its line ending. End of input reads as `null`.
fn read_line(arguments: &[Value], input: &mut impl BufRead, output: &mut impl Write) -> Result<Value, BuiltinError> {
    check_arity(arguments, Arity::AtMost(1))?;

    let io_error = |err: io::Error| BuiltinError::Other(err.to_string());
    match arguments.first() {
        None => {}
        Some(Value::String(prompt)) => {
            write!(output, "{prompt}").map_err(io_error)?;
            output.flush().map_err(io_error)?;
        }
        Some(other) => return Err(unsupported("gets", other)),
    }

    let mut line = String::new();
    if input.read_line(&mut line).map_err(io_error)? == 0 {
        return Ok(Value::Null);
    }
    let trimmed = line.strip_suffix('\n').unwrap_or(&line);
    Ok(Value::string(trimmed.strip_suffix('\r').unwrap_or(trimmed)))
}

fn builtin_int(arguments: &[Value]) -> Result<Value, BuiltinError> {
    check_arity(arguments, Arity::Exactly(1))?;

    let conversion = BuiltinError::Conversion("an integer");
    match &arguments[0] {
        Value::Integer(value) => Ok(Value::Integer(*value)),
        Value::String(value) => value.trim().parse().map(Value::Integer).map_err(|_| conversion),
        Value::Float(value) => {
            let truncated = value.trunc();
            // i64::MAX is not representable, so the upper bound is exclusive
            if truncated.is_finite() && truncated >= i64::MIN as f64 && truncated < i64::MAX as f64 {
                Ok(Value::Integer(truncated as i64))
            } else {
                Err(conversion)
            }
        }
        other => Err(unsupported("int", other)),
    }
}

fn builtin_float(arguments: &[Value]) -> Result<Value, BuiltinError> {
    check_arity(arguments, Arity::Exactly(1))?;

    match &arguments[0] {
        Value::Float(value) => Ok(Value::Float(*value)),
        Value::Integer(value) => Ok(Value::Float(*value as f64)),
        Value::String(value) => value
            .trim()
            .parse()
            .map(Value::Float)
            .map_err(|_| BuiltinError::Conversion("a float")),
        other => Err(unsupported("float", other)),
    }
}

fn builtin_str(arguments: &[Value]) -> Result<Value, BuiltinError> {
    check_arity(arguments, Arity::Exactly(1))?;
    Ok(Value::string(arguments[0].to_string()))
}

fn array_argument<'a>(name: &'static str, arguments: &'a [Value]) -> Result<&'a [Value], BuiltinError> {
    match &arguments[0] {
        Value::Array(elements) => Ok(&elements[..]),
        other => Err(unsupported(name, other)),
    }
}

fn builtin_first(arguments: &[Value]) -> Result<Value, BuiltinError> {
    check_arity(arguments, Arity::Exactly(1))?;
    let elements = array_argument("first", arguments)?;
    Ok(elements.first().cloned().unwrap_or(Value::Null))
}

fn builtin_last(arguments: &[Value]) -> Result<Value, BuiltinError> {
    check_arity(arguments, Arity::Exactly(1))?;
    let elements = array_argument("last", arguments)?;
    Ok(elements.last().cloned().unwrap_or(Value::Null))
}

fn builtin_rest(arguments: &[Value]) -> Result<Value, BuiltinError> {
    check_arity(arguments, Arity::Exactly(1))?;

    match array_argument("rest", arguments)? {
        [] => Ok(Value::Null),
        [_, rest @ ..] => Ok(Value::array(rest.to_vec())),
    }
}

fn builtin_push(arguments: &[Value]) -> Result<Value, BuiltinError> {
    check_arity(arguments, Arity::Exactly(2))?;

    let elements = array_argument("push", arguments)?;
    let pushed = elements.iter().chain([&arguments[1]]).cloned().collect_vec();
    Ok(Value::array(pushed))
}

fn builtin_abs(arguments: &[Value]) -> Result<Value, BuiltinError> {
    check_arity(arguments, Arity::Exactly(1))?;

    match &arguments[0] {
        Value::Integer(value) => value.checked_abs().map(Value::Integer).ok_or_else(overflow),
        Value::Float(value) => Ok(Value::Float(value.abs())),
        other => Err(unsupported("abs", other)),
    }
}

fn builtin_zip(arguments: &[Value]) -> Result<Value, BuiltinError> {
    check_arity(arguments, Arity::AtLeast(2))?;

    let arrays = arguments
        .iter()
        .map(|argument| match argument {
            Value::Array(elements) if elements.is_empty() => {
                Err(BuiltinError::Other("an argument to `zip` is empty".to_owned()))
            }
            Value::Array(elements) => Ok(elements),
            other => Err(unsupported("zip", other)),
        })
        .collect::<Result<Vec<_>, _>>()?;

    let shortest = arrays.iter().map(|elements| elements.len()).min().unwrap_or(0);
    let zipped = (0..shortest)
        .map(|position| Value::array(arrays.iter().map(|elements| elements[position].clone()).collect_vec()))
        .collect_vec();
    Ok(Value::array(zipped))
}

fn builtin_sumarr(arguments: &[Value]) -> Result<Value, BuiltinError> {
    check_arity(arguments, Arity::Exactly(1))?;

    let elements = array_argument("sumarr", arguments)?;
    if !elements.iter().all(|element| matches!(element, Value::Integer(_) | Value::Float(_))) {
        return Err(BuiltinError::Other("array contains a non-INTEGER or non-FLOAT element".to_owned()));
    }

    if elements.iter().all(|element| matches!(element, Value::Integer(_))) {
        elements
            .iter()
            .filter_map(|element| match element {
                Value::Integer(value) => Some(*value),
                _ => None,
            })
            .try_fold(0i64, i64::checked_add)
            .map(Value::Integer)
            .ok_or_else(overflow)
    } else {
        Ok(Value::Float(elements.iter().filter_map(Value::as_f64).sum()))
    }
}

static BUILTINS: [Builtin; 16] = [
    Builtin {
        name: "len",
        doc: "Get the length of an ARRAY, STRING or DICTIONARY as an INTEGER.",
        function: builtin_len,
    },
    Builtin {
        name: "exit",
        doc: "Exit the interpreter with the given INTEGER exit code (default 0).",
        function: builtin_exit,
    },
    Builtin {
        name: "type",
        doc: "Return the type of a value as a STRING.",
        function: builtin_type,
    },
    Builtin {
        name: "help",
        doc: "Return the documentation of a builtin function as a STRING.\n\
              With no arguments, list every builtin function.",
        function: builtin_help,
    },
    Builtin {
        name: "puts",
        doc: "Print each argument to stdout on its own line.",
        function: builtin_puts,
    },
    Builtin {
        name: "gets",
        doc: "Read a line from stdin as a STRING, or null at end of input.\n\
              An optional STRING argument is shown as a prompt.",
        function: builtin_gets,
    },
    Builtin {
        name: "int",
        doc: "Convert a STRING or a FLOAT to an INTEGER.",
        function: builtin_int,
    },
    Builtin {
        name: "float",
        doc: "Convert an INTEGER or a STRING to a FLOAT.",
        function: builtin_float,
    },
    Builtin {
        name: "str",
        doc: "Convert any value to its STRING representation.",
        function: builtin_str,
    },
    Builtin {
        name: "first",
        doc: "Return the first element of an ARRAY.",
        function: builtin_first,
    },
    Builtin {
        name: "last",
        doc: "Return the last element of an ARRAY.",
        function: builtin_last,
    },
    Builtin {
        name: "rest",
        doc: "Return a new ARRAY with all elements except the first.",
        function: builtin_rest,
    },
    Builtin {
        name: "push",
        doc: "Return a copy of the ARRAY with the given element appended.",
        function: builtin_push,
    },
    Builtin {
        name: "abs",
        doc: "Give the absolute value of an INTEGER or FLOAT.",
        function: builtin_abs,
    },
    Builtin {
        name: "zip",
        doc: "Pair up the elements of two or more ARRAYs.\n\
              The result is as long as the shortest argument.",
        function: builtin_zip,
    },
    Builtin {
        name: "sumarr",
        doc: "Return the sum of an ARRAY of INTEGER and FLOAT elements.",
        function: builtin_sumarr,
    },
];

pub fn lookup(name: &str) -> Option<&'static Builtin> {
    BUILTINS.iter().find(|builtin| builtin.name == name)
}

pub fn names() -> impl Iterator<Item = &'static str> {
    BUILTINS.iter().map(|builtin| builtin.name)
}
