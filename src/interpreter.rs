use std::rc::Rc;

use tracing::debug;

use crate::{
    ast::{Block, Expression, FunctionLiteral, InfixOperator, PrefixOperator, Program, Statement},
    builtin,
    environment::{Env, Environment},
    value::{Dictionary, Function, Value},
};

// The error side carries the two values that unwind evaluation:
// `Value::Error` and `Value::ReturnValue`
type EvaluationResult<T = Value> = Result<T, Value>;

fn error(message: impl Into<Rc<str>>) -> Value {
    Value::error(message)
}

/// Evaluates a program in `env`, returning the value of its last statement.
///
/// A `return` at the top level ends the program with its value, and a
/// runtime error ends it with the `Error` value. `None` means the last
/// statement produced nothing, as `let` and `while` do.
pub fn evaluate(program: &Program, env: &Env) -> Option<Value> {
    let mut result = None;
    for statement in &program.statements {
        match evaluate_statement(statement, env) {
            Ok(value) => result = value,
            Err(Value::ReturnValue(value)) => return Some(*value),
            Err(failure) => return Some(failure),
        }
    }
    result
}

fn evaluate_block(block: &Block, env: &Env) -> EvaluationResult<Option<Value>> {
    let mut result = None;
    for statement in &block.statements {
        result = evaluate_statement(statement, env)?;
    }
    Ok(result)
}

fn evaluate_statement(statement: &Statement, env: &Env) -> EvaluationResult<Option<Value>> {
    match statement {
        Statement::Expression(expression) => evaluate_expression(expression, env).map(Some),
        Statement::Let { name, value, mutable } => {
            let value = evaluate_expression(value, env)?;
            env.borrow_mut().define(name, value, *mutable);
            Ok(None)
        }
        Statement::Reassign { name, value } => {
            let value = evaluate_expression(value, env)?;
            env.borrow_mut()
                .assign(name, value)
                .map_err(|err| error(err.to_string()))?;
            Ok(None)
        }
        Statement::Return(value) => {
            let value = evaluate_expression(value, env)?;
            Err(Value::ReturnValue(Box::new(value)))
        }
        Statement::While { condition, body } => {
            while evaluate_expression(condition, env)?.is_truthy() {
                evaluate_block(body, env)?;
            }
            Ok(None)
        }
    }
}

fn evaluate_expression(expression: &Expression, env: &Env) -> EvaluationResult {
    match expression {
        Expression::Identifier(name) => evaluate_identifier(name, env),
        Expression::Integer(value) => Ok(Value::Integer(*value)),
        Expression::Float(value) => Ok(Value::Float(*value)),
        Expression::Boolean(value) => Ok(Value::Boolean(*value)),
        Expression::String(value) => Ok(Value::string(value.as_str())),
        Expression::Array(elements) => Ok(Value::array(evaluate_expressions(elements, env)?)),
        Expression::Dictionary(entries) => evaluate_dictionary(entries, env),
        Expression::Function(literal) => Ok(evaluate_function_literal(literal, env)),
        Expression::Prefix { operator, operand } => {
            let operand = evaluate_expression(operand, env)?;
            evaluate_prefix(*operator, operand)
        }
        Expression::Infix { left, operator, right } => {
            let left = evaluate_expression(left, env)?;
            let right = evaluate_expression(right, env)?;
            evaluate_infix(&left, *operator, &right)
        }
        Expression::If { condition, consequence, alternative } => {
            let branch = if evaluate_expression(condition, env)?.is_truthy() {
                Some(consequence)
            } else {
                alternative.as_ref()
            };
            match branch {
                Some(block) => Ok(evaluate_block(block, env)?.unwrap_or(Value::Null)),
                None => Ok(Value::Null),
            }
        }
        Expression::Call { callee, arguments } => {
            let callee = evaluate_expression(callee, env)?;
            let arguments = evaluate_expressions(arguments, env)?;
            apply(callee, arguments)
        }
        Expression::Index { collection, index } => {
            let collection = evaluate_expression(collection, env)?;
            let index = evaluate_expression(index, env)?;
            evaluate_index(&collection, &index)
        }
    }
}

fn evaluate_expressions(expressions: &[Expression], env: &Env) -> EvaluationResult<Vec<Value>> {
    expressions
        .iter()
        .map(|expression| evaluate_expression(expression, env))
        .collect()
}

fn evaluate_identifier(name: &str, env: &Env) -> EvaluationResult {
    let bound = env.borrow().get(name);
    bound
        .or_else(|| builtin::lookup(name).map(Value::Builtin))
        .ok_or_else(|| error(format!("identifier {name} not found")))
}

fn evaluate_dictionary(entries: &[(Expression, Expression)], env: &Env) -> EvaluationResult {
    let mut dictionary = Dictionary::default();
    for (key, value) in entries {
        let key = evaluate_expression(key, env)?;
        let key = key
            .hash_key()
            .ok_or_else(|| error(format!("provided key {} is unhashable", key.type_name())))?;
        let value = evaluate_expression(value, env)?;
        dictionary.insert(key, value);
    }
    Ok(Value::Dictionary(Rc::new(dictionary)))
}

fn evaluate_function_literal(literal: &FunctionLiteral, env: &Env) -> Value {
    Value::Function(Rc::new(Function {
        parameters: Rc::clone(&literal.parameters),
        body: Rc::clone(&literal.body),
        env: Rc::clone(env),
    }))
}

fn evaluate_prefix(operator: PrefixOperator, operand: Value) -> EvaluationResult {
    match (operator, &operand) {
        (PrefixOperator::Bang, _) => Ok(Value::Boolean(!operand.is_truthy())),
        (PrefixOperator::Minus, Value::Integer(value)) => {
            value.checked_neg().map(Value::Integer).ok_or_else(|| error("integer overflow"))
        }
        (PrefixOperator::Minus, Value::Float(value)) => Ok(Value::Float(-value)),
        (PrefixOperator::Minus, _) => Err(error(format!("cannot apply `-` prefix operator on {operand}"))),
    }
}

fn evaluate_infix(left: &Value, operator: InfixOperator, right: &Value) -> EvaluationResult {
    match (operator, left, right) {
        (InfixOperator::Eq, _, _) => Ok(Value::Boolean(left == right)),
        (InfixOperator::NotEq, _, _) => Ok(Value::Boolean(left != right)),
        (_, Value::String(a), Value::String(b)) => evaluate_string_infix(a, operator, b),
        (_, Value::Integer(a), Value::Integer(b)) => evaluate_integer_infix(*a, operator, *b),
        (_, Value::Integer(_) | Value::Float(_), Value::Integer(_) | Value::Float(_)) => {
            match (left.as_f64(), right.as_f64()) {
                (Some(a), Some(b)) => evaluate_float_infix(a, operator, b),
                _ => Err(error(format!("cannot perform operation: {left} {operator} {right}"))),
            }
        }
        _ => Err(error(format!("cannot perform operation: {left} {operator} {right}"))),
    }
}

fn evaluate_string_infix(left: &str, operator: InfixOperator, right: &str) -> EvaluationResult {
    match operator {
        InfixOperator::Plus => Ok(Value::string(format!("{left}{right}"))),
        _ => Err(error(format!("cannot apply infix operator {operator} on two string values"))),
    }
}

// Modulo takes the sign of the divisor
fn floored_remainder_i64(left: i64, right: i64) -> Option<i64> {
    let remainder = left.checked_rem(right)?;
    if remainder != 0 && (remainder < 0) != (right < 0) {
        Some(remainder + right)
    } else {
        Some(remainder)
    }
}

fn floored_remainder_f64(left: f64, right: f64) -> f64 {
    let remainder = left % right;
    if remainder != 0.0 && (remainder < 0.0) != (right < 0.0) {
        remainder + right
    } else {
        remainder
    }
}

fn evaluate_integer_infix(left: i64, operator: InfixOperator, right: i64) -> EvaluationResult {
    let checked = match operator {
        InfixOperator::Plus => left.checked_add(right),
        InfixOperator::Minus => left.checked_sub(right),
        InfixOperator::Asterisk => left.checked_mul(right),
        InfixOperator::Slash | InfixOperator::Percent if right == 0 => return Err(error("division by zero")),
        InfixOperator::Slash => return Ok(Value::Float(left as f64 / right as f64)),
        InfixOperator::Percent => floored_remainder_i64(left, right),
        InfixOperator::Lt => return Ok(Value::Boolean(left < right)),
        InfixOperator::Gt => return Ok(Value::Boolean(left > right)),
        InfixOperator::Eq | InfixOperator::NotEq => {
            return Err(error(format!("cannot apply infix operator {operator} on two numeric values")))
        }
    };
    checked.map(Value::Integer).ok_or_else(|| error("integer overflow"))
}

fn evaluate_float_infix(left: f64, operator: InfixOperator, right: f64) -> EvaluationResult {
    let value = match operator {
        InfixOperator::Plus => left + right,
        InfixOperator::Minus => left - right,
        InfixOperator::Asterisk => left * right,
        InfixOperator::Slash | InfixOperator::Percent if right == 0.0 => return Err(error("division by zero")),
        InfixOperator::Slash => left / right,
        InfixOperator::Percent => floored_remainder_f64(left, right),
        InfixOperator::Lt => return Ok(Value::Boolean(left < right)),
        InfixOperator::Gt => return Ok(Value::Boolean(left > right)),
        InfixOperator::Eq | InfixOperator::NotEq => {
            return Err(error(format!("cannot apply infix operator {operator} on two numeric values")))
        }
    };
    Ok(Value::Float(value))
}

fn evaluate_index(collection: &Value, index: &Value) -> EvaluationResult {
    match (collection, index) {
        (Value::Array(elements), Value::Integer(position)) => Ok(usize::try_from(*position)
            .ok()
            .and_then(|position| elements.get(position))
            .cloned()
            .unwrap_or(Value::Null)),
        (Value::Dictionary(dictionary), _) if index.hash_key().is_some() => Ok(index
            .hash_key()
            .and_then(|key| dictionary.get(&key).cloned())
            .unwrap_or(Value::Null)),
        _ => Err(error(format!(
            "index {} not supported on {}",
            index.type_name(),
            collection.type_name()
        ))),
    }
}

fn apply(callee: Value, arguments: Vec<Value>) -> EvaluationResult {
    match callee {
        Value::Function(function) => call_function(&function, arguments),
        Value::Builtin(builtin) => {
            debug!(name = builtin.name, arguments = arguments.len(), "calling builtin");
            match builtin.call(&arguments) {
                failure @ Value::Error(_) => Err(failure),
                value => Ok(value),
            }
        }
        other => Err(error(format!("not a function: {}", other.type_name()))),
    }
}

fn call_function(function: &Function, arguments: Vec<Value>) -> EvaluationResult {
    debug!(
        parameters = function.parameters.len(),
        arguments = arguments.len(),
        "calling function"
    );

    let scope = Environment::enclosed(&function.env);
    {
        let mut scope = scope.borrow_mut();
        let mut arguments = arguments.into_iter();
        for parameter in function.parameters.iter() {
            let Some(argument) = arguments.next() else {
                return Err(error(format!("{parameter} argument missing from function call")));
            };
            scope.define(parameter, argument, true);
        }
    }

    match evaluate_block(&function.body, &scope) {
        Ok(value) => Ok(value.unwrap_or(Value::Null)),
        Err(Value::ReturnValue(value)) => Ok(*value),
        Err(failure) => Err(failure),
    }
}
