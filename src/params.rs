// 🏷️ Parameter Schema - typed descriptors for function arguments
//
// Each function advertises its arguments as a ParameterSchema. The same
// schema renders to the JSON-schema object handed to the chat model and
// drives the Validator.

use crate::entities::EntityKind;
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{json, Map, Value};

// ============================================================================
// PARAMETER TYPES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    String,
    Number,
    Integer,
    Boolean,
    /// Array of strings
    StringList,
}

impl ParamType {
    /// JSON-schema type name
    pub fn json_type(&self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::Number => "number",
            ParamType::Integer => "integer",
            ParamType::Boolean => "boolean",
            ParamType::StringList => "array",
        }
    }

    pub fn matches(&self, value: &Value) -> bool {
        match self {
            ParamType::String => value.is_string(),
            ParamType::Number => value.is_number(),
            ParamType::Integer => value.is_i64() || value.is_u64(),
            ParamType::Boolean => value.is_boolean(),
            ParamType::StringList => value
                .as_array()
                .is_some_and(|items| items.iter().all(Value::is_string)),
        }
    }
}

lazy_static! {
    static ref BORROWER_ID: Regex = Regex::new(r"^B\d+$").unwrap();
    static ref LOAN_ID: Regex = Regex::new(r"^L\d+$").unwrap();
}

/// Domain identifier formats, checked after trimming and upper-casing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdFormat {
    Borrower,
    Loan,
}

impl IdFormat {
    pub fn is_match(&self, id: &str) -> bool {
        match self {
            IdFormat::Borrower => BORROWER_ID.is_match(id),
            IdFormat::Loan => LOAN_ID.is_match(id),
        }
    }

    pub fn entity(&self) -> EntityKind {
        match self {
            IdFormat::Borrower => EntityKind::Borrower,
            IdFormat::Loan => EntityKind::Loan,
        }
    }

    pub fn example(&self) -> &'static str {
        match self {
            IdFormat::Borrower => "B001",
            IdFormat::Loan => "L001",
        }
    }
}

// ============================================================================
// PARAMETER SPEC
// ============================================================================

#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub name: String,
    pub type_: ParamType,
    pub description: String,
    pub required: bool,
    /// Allowed values; empty means unrestricted
    pub enum_values: Vec<String>,
    pub id_format: Option<IdFormat>,
    /// Applied when the argument is absent
    pub default_value: Option<Value>,
}

impl ParamSpec {
    pub fn new(name: impl Into<String>, type_: ParamType) -> Self {
        ParamSpec {
            name: name.into(),
            type_,
            description: String::new(),
            required: false,
            enum_values: Vec::new(),
            id_format: None,
            default_value: None,
        }
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, ParamType::String)
    }

    pub fn string_list(name: impl Into<String>) -> Self {
        Self::new(name, ParamType::StringList)
    }

    /// Required borrower id parameter (`borrower_id`)
    pub fn borrower_id() -> Self {
        Self::string("borrower_id")
            .with_description("The ID of the borrower (e.g., B001)")
            .with_id_format(IdFormat::Borrower)
            .required()
    }

    /// Required loan id parameter (`loan_id`)
    pub fn loan_id() -> Self {
        Self::string("loan_id")
            .with_description("The ID of the loan (e.g., L001)")
            .with_id_format(IdFormat::Loan)
            .required()
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = desc.into();
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_enum<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.enum_values = values.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_id_format(mut self, format: IdFormat) -> Self {
        self.id_format = Some(format);
        self
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default_value = Some(value);
        self
    }

    /// Names the argument is accepted under: declared name plus its
    /// snake_case / camelCase twin.
    pub fn accepted_names(&self) -> Vec<String> {
        let mut names = vec![self.name.clone()];
        for twin in [to_camel_case(&self.name), to_snake_case(&self.name)] {
            if !names.contains(&twin) {
                names.push(twin);
            }
        }
        names
    }

    fn to_json(&self) -> Value {
        let mut prop = Map::new();
        prop.insert("type".into(), json!(self.type_.json_type()));
        if !self.description.is_empty() {
            prop.insert("description".into(), json!(self.description));
        }
        match (self.type_, self.enum_values.is_empty()) {
            (ParamType::StringList, true) => {
                prop.insert("items".into(), json!({ "type": "string" }));
            }
            (ParamType::StringList, false) => {
                prop.insert("items".into(), json!({ "type": "string", "enum": self.enum_values }));
            }
            (_, false) => {
                prop.insert("enum".into(), json!(self.enum_values));
            }
            (_, true) => {}
        }
        Value::Object(prop)
    }
}

fn to_camel_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper_next = false;
    for c in name.chars() {
        if c == '_' {
            upper_next = true;
        } else if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    out
}

fn to_snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for c in name.chars() {
        if c.is_uppercase() {
            out.push('_');
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

// ============================================================================
// PARAMETER SCHEMA
// ============================================================================

/// Ordered parameter list for one function
#[derive(Debug, Clone, Default)]
pub struct ParameterSchema {
    params: Vec<ParamSpec>,
}

impl ParameterSchema {
    pub fn new() -> Self {
        ParameterSchema { params: Vec::new() }
    }

    pub fn with_param(mut self, param: ParamSpec) -> Self {
        self.params.push(param);
        self
    }

    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    pub fn get(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }

    pub fn required_names(&self) -> Vec<&str> {
        self.params
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect()
    }

    /// JSON-schema object: `{type: "object", properties, required}`
    pub fn to_json(&self) -> Value {
        let properties: Map<String, Value> = self
            .params
            .iter()
            .map(|p| (p.name.clone(), p.to_json()))
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": self.required_names(),
        })
    }
}
