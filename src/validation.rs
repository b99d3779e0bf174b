// 📐 Argument Validation
//
// Checks caller-supplied arguments against a ParameterSchema and yields
// ValidatedArgs keyed by canonical parameter name. All failures are
// collected, not just the first.

use crate::error::DispatchError;
use crate::params::{ParamSpec, ParameterSchema};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

// ============================================================================
// VALIDATION ERROR
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        ValidationError {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

// ============================================================================
// VALIDATED ARGS
// ============================================================================

/// Normalized arguments: canonical names, trimmed strings, upper-cased ids,
/// defaults filled in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidatedArgs {
    values: BTreeMap<String, Value>,
}

impl ValidatedArgs {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn str(&self, name: &str) -> Option<&str> {
        self.values.get(name).and_then(Value::as_str)
    }

    /// Items of a string-list argument; empty when absent
    pub fn str_list(&self, name: &str) -> Vec<&str> {
        self.values
            .get(name)
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    /// String argument the schema marks as required
    pub fn require_str(&self, name: &str) -> Result<&str, DispatchError> {
        self.str(name).ok_or_else(|| DispatchError::Validation {
            errors: vec![ValidationError::new(name, format!("{} is required", name))],
        })
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.values.clone().into_iter().collect::<Map<_, _>>())
    }
}

// ============================================================================
// VALIDATOR
// ============================================================================

pub struct Validator;

impl Validator {
    /// Validate `args` against `schema`.
    ///
    /// `null` arguments are treated as `{}`. `null` or blank values count as
    /// missing. Unknown extra keys are ignored.
    pub fn validate(schema: &ParameterSchema, args: &Value) -> Result<ValidatedArgs, Vec<ValidationError>> {
        let empty = Map::new();
        let object = match args {
            Value::Null => &empty,
            Value::Object(map) => map,
            _ => {
                return Err(vec![ValidationError::new(
                    "arguments",
                    "arguments must be a JSON object",
                )])
            }
        };

        let mut values = BTreeMap::new();
        let mut errors = Vec::new();

        for param in schema.params() {
            match lookup(param, object) {
                Some(raw) => match normalize(param, raw) {
                    Ok(value) => {
                        values.insert(param.name.clone(), value);
                    }
                    Err(err) => errors.push(err),
                },
                None if param.required => {
                    errors.push(ValidationError::new(
                        &param.name,
                        format!("{} is required", param.name),
                    ));
                }
                None => {
                    if let Some(default) = &param.default_value {
                        values.insert(param.name.clone(), default.clone());
                    }
                }
            }
        }

        if errors.is_empty() {
            Ok(ValidatedArgs { values })
        } else {
            Err(errors)
        }
    }
}

/// First present, non-blank value under any accepted name
fn lookup<'a>(param: &ParamSpec, object: &'a Map<String, Value>) -> Option<&'a Value> {
    param
        .accepted_names()
        .iter()
        .filter_map(|name| object.get(name))
        .find(|value| !is_blank(value))
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

fn normalize(param: &ParamSpec, raw: &Value) -> Result<Value, ValidationError> {
    if !param.type_.matches(raw) {
        return Err(ValidationError::new(
            &param.name,
            format!("{} must be a {}", param.name, param.type_.json_type()),
        ));
    }

    if let Some(items) = raw.as_array() {
        return items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(|item| match_enum(param, item))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array);
    }

    let Some(text) = raw.as_str() else {
        return Ok(raw.clone());
    };
    let text = text.trim();

    if let Some(format) = param.id_format {
        let id = text.to_uppercase();
        if !format.is_match(&id) {
            return Err(ValidationError::new(
                &param.name,
                format!(
                    "Invalid {} ID format: '{}'. Expected format like {}",
                    format.entity(),
                    text,
                    format.example()
                ),
            ));
        }
        return Ok(Value::String(id));
    }

    match_enum(param, text)
}

/// `text` in its canonical enum spelling; any text when the param has no enum
fn match_enum(param: &ParamSpec, text: &str) -> Result<Value, ValidationError> {
    if param.enum_values.is_empty() {
        return Ok(Value::String(text.to_string()));
    }

    param
        .enum_values
        .iter()
        .find(|allowed| allowed.eq_ignore_ascii_case(text))
        .map(|allowed| Value::String(allowed.clone()))
        .ok_or_else(|| {
            ValidationError::new(
                &param.name,
                format!(
                    "{} must be one of: {}",
                    param.name,
                    param.enum_values.join(", ")
                ),
            )
        })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ParamType;
    use serde_json::json;

    fn risk_schema() -> ParameterSchema {
        ParameterSchema::new()
            .with_param(ParamSpec::borrower_id())
            .with_param(
                ParamSpec::string("timeHorizon")
                    .with_enum(["3m", "6m", "12m", "1y"])
                    .with_default(json!("6m")),
            )
    }

    #[test]
    fn test_camel_case_alias_is_normalized() {
        let args = Validator::validate(&risk_schema(), &json!({"borrowerId": " b003 "})).unwrap();

        assert_eq!(args.str("borrower_id"), Some("B003"));
        assert_eq!(args.str("timeHorizon"), Some("6m"));
    }

    #[test]
    fn test_missing_required_field() {
        let errors = Validator::validate(&risk_schema(), &json!({})).unwrap_err();

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "borrower_id");
        assert_eq!(errors[0].message, "borrower_id is required");
    }

    #[test]
    fn test_null_and_blank_count_as_missing() {
        assert!(Validator::validate(&risk_schema(), &json!({"borrower_id": null})).is_err());
        assert!(Validator::validate(&risk_schema(), &json!({"borrower_id": "  "})).is_err());
        assert!(Validator::validate(&risk_schema(), &Value::Null).is_err());
    }

    #[test]
    fn test_bad_id_format() {
        let errors = Validator::validate(&risk_schema(), &json!({"borrowerId": "XYZ123"})).unwrap_err();

        assert_eq!(errors[0].field, "borrower_id");
        assert!(errors[0].message.contains("Invalid borrower ID format"));
    }

    #[test]
    fn test_enum_out_of_range_and_type_mismatch_collected() {
        let errors = Validator::validate(
            &risk_schema(),
            &json!({"borrower_id": 42, "time_horizon": "5y"}),
        )
        .unwrap_err();

        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].message, "borrower_id must be a string");
        assert!(errors[1].message.starts_with("timeHorizon must be one of"));
    }

    #[test]
    fn test_enum_match_is_case_insensitive() {
        let args = Validator::validate(&risk_schema(), &json!({"borrower_id": "B1", "timeHorizon": "1Y"})).unwrap();
        assert_eq!(args.str("timeHorizon"), Some("1y"));
    }

    #[test]
    fn test_non_object_arguments_rejected() {
        let errors = Validator::validate(&risk_schema(), &json!(["B003"])).unwrap_err();
        assert_eq!(errors[0].field, "arguments");
    }

    #[test]
    fn test_string_list_trimmed_and_checked() {
        let schema = ParameterSchema::new().with_param(ParamSpec::string_list("commodity_types"));

        let args = Validator::validate(&schema, &json!({"commodityTypes": [" Corn ", "", "soybeans"]})).unwrap();
        assert_eq!(args.str_list("commodity_types"), vec!["Corn", "soybeans"]);

        let errors = Validator::validate(&schema, &json!({"commodity_types": ["corn", 7]})).unwrap_err();
        assert_eq!(errors[0].message, "commodity_types must be a array");

        let empty = Validator::validate(&schema, &json!({"commodity_types": []})).unwrap();
        assert!(empty.str_list("commodity_types").is_empty());
    }

    #[test]
    fn test_string_list_enum() {
        let schema = ParameterSchema::new()
            .with_param(ParamSpec::string_list("goals").with_enum(["lower_payments", "shorter_term"]));

        let args = Validator::validate(&schema, &json!({"goals": ["SHORTER_TERM"]})).unwrap();
        assert_eq!(args.str_list("goals"), vec!["shorter_term"]);
        assert!(Validator::validate(&schema, &json!({"goals": ["faster"]})).is_err());
    }

    #[test]
    fn test_non_string_params_pass_through() {
        let schema = ParameterSchema::new().with_param(ParamSpec::new("limit", ParamType::Integer));
        let args = Validator::validate(&schema, &json!({"limit": 5, "extra": true})).unwrap();

        assert_eq!(args.get("limit"), Some(&json!(5)));
        assert_eq!(args.to_value(), json!({"limit": 5}));
    }
}
