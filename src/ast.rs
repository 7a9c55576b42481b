use core::fmt;
use std::rc::Rc;

use itertools::Itertools;

/// Root of a parsed source unit.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub statements: Vec<Statement>,
}

/// Ordered statements forming the body of a function, `if` or `while`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Block {
    pub statements: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// `let` (mutable) and `const` (immutable) declarations.
    Let {
        name: String,
        value: Expression,
        mutable: bool,
    },
    /// Update of an existing mutable binding, `name = value`.
    Reassign {
        name: String,
        value: Expression,
    },
    Return(Expression),
    While {
        condition: Expression,
        body: Block,
    },
    Expression(Expression),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefixOperator {
    Bang,
    Minus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfixOperator {
    Plus,
    Minus,
    Asterisk,
    Slash,
    Percent,
    Lt,
    Gt,
    Eq,
    NotEq,
}

/// Parameters and body of a function literal.
///
/// Both halves sit behind `Rc` so that every closure created from the same
/// literal shares them with the tree instead of copying.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionLiteral {
    pub parameters: Rc<[String]>,
    pub body: Rc<Block>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Identifier(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    String(String),
    Array(Vec<Expression>),
    Dictionary(Vec<(Expression, Expression)>),
    Function(FunctionLiteral),
    Prefix {
        operator: PrefixOperator,
        operand: Box<Expression>,
    },
    Infix {
        left: Box<Expression>,
        operator: InfixOperator,
        right: Box<Expression>,
    },
    If {
        condition: Box<Expression>,
        consequence: Block,
        alternative: Option<Block>,
    },
    Call {
        callee: Box<Expression>,
        arguments: Vec<Expression>,
    },
    Index {
        collection: Box<Expression>,
        index: Box<Expression>,
    },
}

/// Renders a float so that it always reads back as a float literal.
pub(crate) fn format_float(value: f64) -> String {
    let rendered = value.to_string();
    if value.is_finite() && !rendered.contains('.') {
        format!("{rendered}.0")
    } else {
        rendered
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.statements.iter().join(" "))
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.statements.is_empty() {
            return f.write_str("{}");
        }
        write!(f, "{{ {} }}", self.statements.iter().join(" "))
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Let { name, value, mutable: true } => write!(f, "let {name} = {value};"),
            Self::Let { name, value, mutable: false } => write!(f, "const {name} = {value};"),
            Self::Reassign { name, value } => write!(f, "{name} = {value};"),
            Self::Return(value) => write!(f, "return {value};"),
            Self::While { condition, body } => write!(f, "while ({condition}) {body}"),
            Self::Expression(expression) => write!(f, "{expression};"),
        }
    }
}

impl fmt::Display for PrefixOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Bang => "!",
            Self::Minus => "-",
        })
    }
}

impl fmt::Display for InfixOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Asterisk => "*",
            Self::Slash => "/",
            Self::Percent => "%",
            Self::Lt => "<",
            Self::Gt => ">",
            Self::Eq => "==",
            Self::NotEq => "!=",
        })
    }
}

impl fmt::Display for FunctionLiteral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fn({}) {}", self.parameters.iter().join(", "), self.body)
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Identifier(name) => f.write_str(name),
            Self::Integer(value) => write!(f, "{value}"),
            Self::Float(value) => f.write_str(&format_float(*value)),
            Self::Boolean(value) => write!(f, "{value}"),
            Self::String(value) => write!(f, "\"{value}\""),
            Self::Array(elements) => write!(f, "[{}]", elements.iter().join(", ")),
            Self::Dictionary(entries) => write!(
                f,
                "{{{}}}",
                entries.iter().map(|(key, value)| format!("{key}: {value}")).join(", ")
            ),
            Self::Function(literal) => fmt::Display::fmt(literal, f),
            Self::Prefix { operator, operand } => write!(f, "({operator}{operand})"),
            Self::Infix { left, operator, right } => write!(f, "({left} {operator} {right})"),
            Self::If { condition, consequence, alternative } => {
                write!(f, "if ({condition}) {consequence}")?;
                match alternative {
                    Some(alternative) => write!(f, " else {alternative}"),
                    None => Ok(()),
                }
            }
            Self::Call { callee, arguments } => write!(f, "{callee}({})", arguments.iter().join(", ")),
            Self::Index { collection, index } => write!(f, "({collection}[{index}])"),
        }
    }
}
