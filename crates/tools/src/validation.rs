//! Argument validation against a tool's declared parameters.

use conductor_core::error::ToolError;
use conductor_core::tool::{Arguments, ToolDefinition};
use serde_json::Value;

/// Check `arguments` against `definition` and return the arguments the
/// capability will actually see.
///
/// - A missing (or `null`) required parameter fails, naming the field.
/// - A value of the wrong type fails, naming the expected type.
/// - A missing optional parameter with a declared default gets the default.
/// - Unknown extra arguments are passed through untouched.
pub fn validate_arguments(
    definition: &ToolDefinition,
    arguments: &Arguments,
) -> Result<Arguments, ToolError> {
    let mut validated = arguments.clone();

    for spec in &definition.parameters {
        match arguments.get(&spec.name) {
            None | Some(Value::Null) => {
                if spec.required {
                    return Err(ToolError::InvalidArguments(format!(
                        "missing required parameter '{}'",
                        spec.name
                    )));
                }
                match &spec.default {
                    Some(default) => {
                        validated.insert(spec.name.clone(), default.clone());
                    }
                    None => {
                        validated.remove(&spec.name);
                    }
                }
            }
            Some(value) if !spec.param_type.accepts(value) => {
                return Err(ToolError::InvalidArguments(format!(
                    "parameter '{}' must be of type {}, got {}",
                    spec.name,
                    spec.param_type,
                    json_type_name(value)
                )));
            }
            Some(_) => {}
        }
    }

    Ok(validated)
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conductor_core::tool::{ParamType, ParameterSpec};
    use serde_json::json;

    fn search_definition() -> ToolDefinition {
        ToolDefinition::new("search", "Search things")
            .param(ParameterSpec::required("query", ParamType::String))
            .param(ParameterSpec::optional("top_k", ParamType::Integer).with_default(json!(5)))
            .param(ParameterSpec::optional("filter", ParamType::Object))
    }

    fn args(value: Value) -> Arguments {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn missing_required_names_field() {
        let err = validate_arguments(&search_definition(), &args(json!({}))).unwrap_err();
        assert!(err.to_string().contains("'query'"));
    }

    #[test]
    fn null_counts_as_missing() {
        let err =
            validate_arguments(&search_definition(), &args(json!({"query": null}))).unwrap_err();
        assert!(err.to_string().contains("missing required parameter 'query'"));
    }

    #[test]
    fn type_mismatch_names_expected_type() {
        let err = validate_arguments(
            &search_definition(),
            &args(json!({"query": "rust", "top_k": "ten"})),
        )
        .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("integer"));
        assert!(msg.contains("got string"));
    }

    #[test]
    fn injects_defaults() {
        let validated =
            validate_arguments(&search_definition(), &args(json!({"query": "rust"}))).unwrap();
        assert_eq!(validated["top_k"], json!(5));
        assert!(!validated.contains_key("filter"));
    }

    #[test]
    fn explicit_value_wins_over_default() {
        let validated = validate_arguments(
            &search_definition(),
            &args(json!({"query": "rust", "top_k": 2})),
        )
        .unwrap();
        assert_eq!(validated["top_k"], json!(2));
    }

    #[test]
    fn extra_arguments_pass_through() {
        let validated = validate_arguments(
            &search_definition(),
            &args(json!({"query": "rust", "verbose": true})),
        )
        .unwrap();
        assert_eq!(validated["verbose"], json!(true));
    }
}
