use std::{io::BufRead, path::{Path, PathBuf}};

use anyhow::bail;
use itertools::Itertools;
use serde::{de::{Error, Visitor}, Deserialize};

/// Expected value of a successful line.
///
/// Strings match against the rendered value, so `"fn(x) { ... }"` checks a
/// function and `"12"` accepts both the string and the integer.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TestOutput {
    Null,
    Boolean(bool),
    Number(f64),
    Text(String),
    List(Vec<TestOutput>),
}

#[derive(Debug, Clone)]
pub struct ExpectedError {
    pub kind: String,
    pub message: Option<String>,
}

/// One expected line result: a value, nothing at all (`Ok(None)`), or an
/// error of some kind.
#[derive(Debug, Clone)]
pub struct TestEvaluationResult(pub Result<Option<TestOutput>, ExpectedError>);

struct EvaluationResultVisitor {}

impl<'de> Deserialize<'de> for TestEvaluationResult {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
        where
            D: serde::Deserializer<'de> {

        deserializer.deserialize_map(EvaluationResultVisitor {})
    }
}

impl<'de> Visitor<'de> for EvaluationResultVisitor {
    type Value = TestEvaluationResult;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(formatter, "A structure starting with the boolean key 'ok'. If it's okay, it may contain the key 'output', otherwise the key 'type' and optionally 'message'")
    }

    fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
        where
            A: serde::de::MapAccess<'de>, {

        if map.next_key::<String>()?.as_deref() != Some("ok") {
            return Err(A::Error::custom("First key should be 'ok'"))
        }

        let ok: bool = map.next_value()?;
        if ok {
            let output = match map.next_key::<String>()?.as_deref() {
                None => return Ok(TestEvaluationResult(Ok(None))),
                Some("output") => map.next_value::<TestOutput>()?,
                Some(other) => return Err(A::Error::custom(format!("Unexpected key '{}' after 'ok'", other))),
            };

            if map.next_key::<String>()?.is_some() {
                return Err(A::Error::custom("Only 'ok' and 'output' should be present"));
            }
            return Ok(TestEvaluationResult(Ok(Some(output))));
        }

        if map.next_key::<String>()?.as_deref() != Some("type") {
            return Err(A::Error::custom("Second key of a failure should be 'type'"))
        }

        let kind = map.next_value::<String>()?;
        if !matches!(kind.as_str(), "SyntaxError" | "RuntimeError") {
            return Err(A::Error::custom(format!("Unrecognized error type: {}", kind)));
        }

        let message = match map.next_key::<String>()?.as_deref() {
            None => None,
            Some("message") => Some(map.next_value::<String>()?),
            Some(other) => return Err(A::Error::custom(format!("Unexpected key '{}' after 'type'", other))),
        };

        if map.next_key::<String>()?.is_some() {
            return Err(A::Error::custom("Only 'ok', 'type' and 'message' should be present"));
        }
        Ok(TestEvaluationResult(Err(ExpectedError { kind, message })))
    }
}

fn load_input_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<String>> {
    let source = std::fs::read(path)?;
    Ok(source.lines().collect::<Result<Vec<String>, _>>()?)
}

fn load_output_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<TestEvaluationResult>> {
    let source = std::fs::read(path)?;
    let result: Vec<TestEvaluationResult> = serde_json::from_slice(&source)?;
    Ok(result)
}

const TESTCASES: usize = 6;

pub fn load_test_pair(testcase: usize) -> anyhow::Result<Vec<(String, TestEvaluationResult)>> {
    if !(1..=TESTCASES).contains(&testcase) { bail!("Testcase out of bounds"); }

    let base_path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let input = load_input_file(base_path.join("test_inputs").join(format!("{}.sim", testcase)))?;
    let output = load_output_file(base_path.join("test_outputs").join(format!("{}.json", testcase)))?;

    if input.len() != output.len() { bail!("Input and output of testcase {} do not match", testcase); }
    Ok(input.into_iter().zip(output).collect_vec())
}

pub fn all_testcases() -> impl Iterator<Item = usize> {
    1..=TESTCASES
}
