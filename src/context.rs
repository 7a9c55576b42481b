use tracing::debug;

use crate::{
    environment::{Env, Environment},
    error::SimianError,
    interpreter::evaluate,
    parser::parse,
    value::Value,
};

/// A session that evaluates source text against one long-lived root scope,
/// so bindings made by one call are visible to the next.
///
/// Each call parses its own input; function values keep the parts of the
/// tree they need alive, so the source text can be dropped right after.
pub struct EvaluationContext {
    environment: Env,
}

impl EvaluationContext {
    pub fn new() -> Self {
        Self { environment: Environment::new() }
    }

    pub fn environment(&self) -> &Env {
        &self.environment
    }

    /// Parses and evaluates `input`, returning the value of its last
    /// statement, or `None` when that statement produces nothing.
    pub fn evaluate_str(&mut self, input: &str) -> Result<Option<Value>, SimianError> {
        debug!(bytes = input.len(), "evaluating input");

        let (program, errors) = parse(input);
        if !errors.is_empty() {
            return Err(SimianError::Syntax(errors));
        }

        match evaluate(&program, &self.environment) {
            Some(Value::Error(message)) => Err(SimianError::Runtime(message.to_string())),
            result => Ok(result),
        }
    }
}

impl Default for EvaluationContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use anyhow::bail;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::test_utils::{all_testcases, load_test_pair, ExpectedError, TestEvaluationResult, TestOutput};

    fn compare_lists(values: &[Value], expected: &[TestOutput]) -> bool {
        if values.len() != expected.len() { return false; }

        values.iter().zip(expected.iter())
            .all(|(value, expected)| compare(value, expected))
    }

    fn compare(value: &Value, expected: &TestOutput) -> bool {
        match (value, expected) {
            (Value::Null, TestOutput::Null) => true,
            (Value::Boolean(a), TestOutput::Boolean(b)) => a == b,
            (Value::Integer(_) | Value::Float(_), TestOutput::Number(b)) => {
                value.as_f64().is_some_and(|a| (a - b).abs() < 1.0e-5)
            }
            (Value::Array(values), TestOutput::List(expected)) => compare_lists(values, expected),
            (_, TestOutput::Text(text)) => value.to_string() == *text,
            _ => false,
        }
    }

    fn compare_error(error: &SimianError, expected: &ExpectedError) -> bool {
        error.kind() == expected.kind
            && expected.message.as_ref().map_or(true, |message| *message == error.to_string())
    }

    fn assert_run(testcase: usize, entries: &[(String, TestEvaluationResult)]) -> anyhow::Result<()> {
        let mut evaluation_context = EvaluationContext::new();
        for (lineno, (source, expected)) in entries.iter().enumerate() {
            let result = evaluation_context.evaluate_str(source);

            println!("{}:\n{:?}", source, result);
            let matches = match (&result, &expected.0) {
                (Ok(None), Ok(None)) => true,
                (Ok(Some(value)), Ok(Some(expected))) => compare(value, expected),
                (Err(error), Err(expected)) => compare_error(error, expected),
                _ => false,
            };
            if !matches {
                bail!("Testcase({}, {}): Got {:?}, expected {:?}", testcase, lineno, result, expected);
            }
        }

        Ok(())
    }

    #[test]
    fn evaluate_testcase() -> anyhow::Result<()> {
        for testcase in all_testcases() {
            println!("Running testcase {}", testcase);
            let entries = load_test_pair(testcase)?;
            assert_run(testcase, &entries)?;
        }

        Ok(())
    }

    #[test]
    fn bindings_survive_between_calls() -> anyhow::Result<()> {
        let mut context = EvaluationContext::new();
        assert!(context.evaluate_str("let greeting = \"hi\";")?.is_none());
        assert!(context.evaluate_str("let shout = fn(s) { s + \"!\" };")?.is_none());

        let Some(value) = context.evaluate_str("shout(greeting)")? else {
            bail!("expected a value");
        };
        assert_eq!(value.to_string(), "hi!");
        assert!(context.environment().borrow().get("greeting").is_some());
        Ok(())
    }

    #[test]
    fn errors_are_reported_by_kind() {
        let mut context = EvaluationContext::new();

        match context.evaluate_str("let = 1; let y 2;") {
            Err(SimianError::Syntax(errors)) => assert_eq!(errors.len(), 3),
            other => panic!("expected syntax errors, got {other:?}"),
        }
        match context.evaluate_str("1 + true") {
            Err(error) => assert_eq!(error.to_string(), "cannot perform operation: 1 + true"),
            other => panic!("expected a runtime error, got {other:?}"),
        }
    }
}
