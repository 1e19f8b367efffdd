//! Calculator Tool
//!
//! Evaluates an arithmetic expression and reports the result as JSON.

use assistant_core::{
    AgentError, Arguments, Result as CoreResult, Tool, ToolSchema, tool::ParameterSchema,
};
use async_trait::async_trait;
use serde_json::{Value, json};

use crate::error::ToolsError;
use crate::expression;

/// Tool for evaluating arithmetic expressions
#[derive(Clone, Copy, Debug, Default)]
pub struct CalculatorTool;

impl CalculatorTool {
    pub const NAME: &'static str = "calculate";

    pub const fn new() -> Self {
        Self
    }

    /// Evaluate `expression` into the tool's JSON payload
    pub fn evaluate(expression: &str) -> String {
        let payload = match expression::evaluate(expression) {
            Ok(number) => match number.to_json() {
                Some(result) => json!({ "result": result }),
                None => json!({ "error": "Error calculating: result is not a finite number" }),
            },
            Err(e @ ToolsError::InvalidCharacters) => json!({ "error": e.to_string() }),
            Err(e) => json!({ "error": format!("Error calculating: {e}") }),
        };
        payload.to_string()
    }
}

#[async_trait]
impl Tool for CalculatorTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: Self::NAME.into(),
            description: "Evaluate a mathematical expression".into(),
            parameters: vec![ParameterSchema::required_string(
                "expression",
                "The mathematical expression to evaluate",
            )],
        }
    }

    async fn call(&self, arguments: &Arguments) -> CoreResult<String> {
        let expression = match arguments.get("expression") {
            Some(Value::String(text)) => text.clone(),
            // Models occasionally send a bare number
            Some(Value::Number(number)) => number.to_string(),
            _ => {
                return Err(AgentError::ToolValidation(
                    "expression must be a string".into(),
                ));
            }
        };

        let output = Self::evaluate(&expression);
        tracing::debug!(%expression, %output, "Calculated");
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(value: Value) -> Arguments {
        match json!({ "expression": value }) {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    fn payload(output: &str) -> Value {
        serde_json::from_str(output).unwrap()
    }

    #[tokio::test]
    async fn test_calculates_integer_result() {
        let output = CalculatorTool.call(&args(json!("17 * (3+2)"))).await.unwrap();
        assert_eq!(payload(&output), json!({ "result": 85 }));
    }

    #[tokio::test]
    async fn test_float_result() {
        let output = CalculatorTool.call(&args(json!("7 / 2"))).await.unwrap();
        assert_eq!(payload(&output)["result"], 3.5);
    }

    #[tokio::test]
    async fn test_numeric_argument_is_accepted() {
        let output = CalculatorTool.call(&args(json!(42))).await.unwrap();
        assert_eq!(payload(&output)["result"], 42);
    }

    #[tokio::test]
    async fn test_rejects_non_string_argument() {
        let err = CalculatorTool.call(&args(json!(["1+1"]))).await.unwrap_err();
        assert!(matches!(err, AgentError::ToolValidation(_)));
    }

    #[test]
    fn test_error_payloads() {
        assert_eq!(
            payload(&CalculatorTool::evaluate("2 + x")),
            json!({ "error": "Invalid characters in expression" })
        );
        assert_eq!(
            payload(&CalculatorTool::evaluate("1 / 0")),
            json!({ "error": "Error calculating: division by zero" })
        );
        assert!(
            payload(&CalculatorTool::evaluate("(1 + 2"))["error"]
                .as_str()
                .unwrap()
                .starts_with("Error calculating:")
        );
    }

    #[test]
    fn test_schema() {
        let schema = CalculatorTool.schema();
        assert_eq!(schema.name, "calculate");
        assert_eq!(schema.primary_parameter(), Some("expression"));
    }
}
