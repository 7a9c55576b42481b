mod ast;
mod builtin;
mod context;
mod environment;
mod error;
mod interpreter;
mod lexer;
mod parser;
mod token;
mod value;

#[cfg(test)]
mod test_utils;

pub use ast::{Block, Expression, FunctionLiteral, InfixOperator, PrefixOperator, Program, Statement};
pub use builtin::{Arity, Builtin, BuiltinError};
pub use context::EvaluationContext;
pub use environment::{AssignError, Binding, Env, Environment};
pub use error::SimianError;
pub use interpreter::evaluate;
pub use lexer::Lexer;
pub use parser::{parse, Parser, Precedence};
pub use token::{Token, TokenKind};
pub use value::{Dictionary, Function, HashKey, Value};

