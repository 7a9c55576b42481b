#![no_main]

use core::fmt;

use itertools::Itertools;
use libfuzzer_sys::{arbitrary::Arbitrary, fuzz_target};

// Variables and the builtins that neither terminate the process nor block
// on stdin
#[derive(Arbitrary, Debug)]
enum Name {
    A, B, C,
    Len, Type, Help, Puts,
    Int, Float, Str,
    First, Last, Rest, Push,
    Abs, Zip, Sum,
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", match self {
            Name::A => "a",
            Name::B => "b",
            Name::C => "c",
            Name::Len => "len",
            Name::Type => "type",
            Name::Help => "help",
            Name::Puts => "puts",
            Name::Int => "int",
            Name::Float => "float",
            Name::Str => "str",
            Name::First => "first",
            Name::Last => "last",
            Name::Rest => "rest",
            Name::Push => "push",
            Name::Abs => "abs",
            Name::Zip => "zip",
            Name::Sum => "sumarr",
        })
    }
}

#[derive(Arbitrary, Debug)]
enum Operator {
    Plus, Minus, Asterisk, Slash, Percent,
    Lt, Gt, Eq, NotEq,
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", match self {
            Operator::Plus => "+",
            Operator::Minus => "-",
            Operator::Asterisk => "*",
            Operator::Slash => "/",
            Operator::Percent => "%",
            Operator::Lt => "<",
            Operator::Gt => ">",
            Operator::Eq => "==",
            Operator::NotEq => "!=",
        })
    }
}

#[derive(Arbitrary, Debug)]
enum Expression {
    Name(Name),
    Integer(u32),
    Float(u32, u16),
    Boolean(bool),
    String(String),
    Array(Vec<Expression>),
    Dictionary(Vec<(Expression, Expression)>),
    Function(Vec<Name>, Vec<Statement>),
    Negate(Box<Expression>),
    Not(Box<Expression>),
    Infix(Box<Expression>, Operator, Box<Expression>),
    If(Box<Expression>, Vec<Statement>, Option<Vec<Statement>>),
    Call(Box<Expression>, Vec<Expression>),
    Index(Box<Expression>, Box<Expression>),
}

#[derive(Arbitrary, Debug)]
enum Statement {
    Let(Name, Expression),
    Const(Name, Expression),
    Assign(Name, Expression),
    Return(Expression),
    Expression(Expression),
}

fn block(statements: &[Statement]) -> String {
    format!("{{ {} }}", statements.iter().join(" "))
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Expression::Name(name) => write!(f, "{}", name),
            Expression::Integer(value) => write!(f, "{}", value),
            Expression::Float(whole, fraction) => write!(f, "{}.{}", whole, fraction),
            Expression::Boolean(value) => write!(f, "{}", value),
            Expression::String(value) => {
                let text: String = value.chars().filter(char::is_ascii_alphanumeric).collect();
                write!(f, "\"{}\"", text)
            }
            Expression::Array(elements) => write!(f, "[{}]", elements.iter().join(", ")),
            Expression::Dictionary(entries) => write!(
                f,
                "{{{}}}",
                entries.iter().map(|(key, value)| format!("{}: {}", key, value)).join(", ")
            ),
            Expression::Function(parameters, body) => {
                write!(f, "fn({}) {}", parameters.iter().join(", "), block(body))
            }
            Expression::Negate(operand) => write!(f, "(-{})", operand),
            Expression::Not(operand) => write!(f, "(!{})", operand),
            Expression::Infix(left, operator, right) => write!(f, "({} {} {})", left, operator, right),
            Expression::If(condition, consequence, alternative) => {
                write!(f, "if ({}) {}", condition, block(consequence))?;
                match alternative {
                    Some(alternative) => write!(f, " else {}", block(alternative)),
                    None => Ok(()),
                }
            }
            Expression::Call(callee, arguments) => write!(f, "({})({})", callee, arguments.iter().join(", ")),
            Expression::Index(collection, index) => write!(f, "({})[{}]", collection, index),
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Statement::Let(name, value) => write!(f, "let {} = {};", name, value),
            Statement::Const(name, value) => write!(f, "const {} = {};", name, value),
            Statement::Assign(name, value) => write!(f, "{} = {};", name, value),
            Statement::Return(value) => write!(f, "return {};", value),
            Statement::Expression(value) => write!(f, "{};", value),
        }
    }
}

fuzz_target!(|statements: Vec<Statement>| {
    let mut context = simian::EvaluationContext::new();

    for statement in statements {
        let source = statement.to_string();
        let _ = context.evaluate_str(&source);
    }
});
