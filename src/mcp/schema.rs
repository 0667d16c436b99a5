//! Structural input schemas for MCP tools
//!
//! An [`InputSchema`] is the single source for two things: the JSON Schema
//! advertised in `tools/list`, and the validation that runs before a tool
//! handler sees its arguments.
//!
//! # Type Mapping
//!
//! | FieldKind | JSON Schema Type | Additional Properties |
//! |-----------|------------------|-----------------------|
//! | String    | "string"         | minLength: 1 if non-empty |
//! | Integer   | "integer"        | minimum / maximum     |
//! | Enum      | "string"         | enum                  |
//!
//! Validation is structural only: required fields must be present, values
//! must have the declared JSON type and lie inside the declared bounds.
//! Absent optional fields receive their default. Unknown fields are ignored.

use crate::error::McpServiceError;
use serde_json::{json, Map, Value};

#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    String { non_empty: bool },
    Integer { min: Option<i64>, max: Option<i64> },
    Enum(&'static [&'static str]),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    pub default: Option<Value>,
}

impl FieldSpec {
    pub fn string(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            description,
            kind: FieldKind::String { non_empty: false },
            required: false,
            default: None,
        }
    }

    pub fn integer(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            description,
            kind: FieldKind::Integer {
                min: None,
                max: None,
            },
            required: false,
            default: None,
        }
    }

    pub fn one_of(
        name: &'static str,
        description: &'static str,
        values: &'static [&'static str],
    ) -> Self {
        Self {
            name,
            description,
            kind: FieldKind::Enum(values),
            required: false,
            default: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn non_empty(mut self) -> Self {
        if let FieldKind::String { non_empty } = &mut self.kind {
            *non_empty = true;
        }
        self
    }

    /// Inclusive bounds for integer fields
    pub fn range(mut self, min: Option<i64>, max: Option<i64>) -> Self {
        if let FieldKind::Integer { min: lo, max: hi } = &mut self.kind {
            *lo = min;
            *hi = max;
        }
        self
    }

    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    fn to_json_schema(&self) -> Value {
        let mut property = match &self.kind {
            FieldKind::String { non_empty } => {
                let mut p = json!({ "type": "string" });
                if *non_empty {
                    p["minLength"] = json!(1);
                }
                p
            }
            FieldKind::Integer { min, max } => {
                let mut p = json!({ "type": "integer" });
                if let Some(min) = min {
                    p["minimum"] = json!(min);
                }
                if let Some(max) = max {
                    p["maximum"] = json!(max);
                }
                p
            }
            FieldKind::Enum(values) => json!({ "type": "string", "enum": values }),
        };

        if !self.description.is_empty() {
            property["description"] = json!(self.description);
        }
        if let Some(default) = &self.default {
            property["default"] = default.clone();
        }

        property
    }

    fn check(&self, value: &Value) -> Result<(), String> {
        match &self.kind {
            FieldKind::String { non_empty } => {
                let s = value
                    .as_str()
                    .ok_or_else(|| format!("'{}' must be a string", self.name))?;
                if *non_empty && s.trim().is_empty() {
                    return Err(format!("'{}' must not be empty", self.name));
                }
            }
            FieldKind::Integer { min, max } => {
                let n = value
                    .as_i64()
                    .ok_or_else(|| format!("'{}' must be an integer", self.name))?;
                if min.is_some_and(|min| n < min) || max.is_some_and(|max| n > max) {
                    return Err(format!(
                        "'{}' must be between {} and {}, got {}",
                        self.name,
                        min.map_or("-inf".to_string(), |v| v.to_string()),
                        max.map_or("inf".to_string(), |v| v.to_string()),
                        n
                    ));
                }
            }
            FieldKind::Enum(values) => {
                let s = value
                    .as_str()
                    .ok_or_else(|| format!("'{}' must be a string", self.name))?;
                if !values.contains(&s) {
                    return Err(format!(
                        "'{}' must be one of: {}",
                        self.name,
                        values.join(", ")
                    ));
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputSchema {
    fields: Vec<FieldSpec>,
}

impl InputSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Renders the schema as a JSON Schema object
    pub fn to_json_schema(&self) -> Map<String, Value> {
        let mut properties = Map::new();
        let mut required = Vec::new();

        for field in &self.fields {
            properties.insert(field.name.to_string(), field.to_json_schema());
            if field.required {
                required.push(json!(field.name));
            }
        }

        let mut schema = Map::new();
        schema.insert("type".to_string(), json!("object"));
        schema.insert("properties".to_string(), Value::Object(properties));
        if !required.is_empty() {
            schema.insert("required".to_string(), Value::Array(required));
        }
        schema
    }

    /// Validates `args` and fills in defaults
    ///
    /// # Errors
    ///
    /// * `McpServiceError::Validation` - first violated constraint
    pub fn validate(
        &self,
        args: Option<&Map<String, Value>>,
    ) -> Result<Map<String, Value>, McpServiceError> {
        let empty = Map::new();
        let args = args.unwrap_or(&empty);
        let mut validated = args.clone();

        for field in &self.fields {
            match args.get(field.name) {
                Some(Value::Null) | None => {
                    if field.required {
                        return Err(McpServiceError::Validation(format!(
                            "Missing required field '{}'",
                            field.name
                        )));
                    }
                    match &field.default {
                        Some(default) => {
                            validated.insert(field.name.to_string(), default.clone());
                        }
                        None => {
                            validated.remove(field.name);
                        }
                    }
                }
                Some(value) => field.check(value).map_err(McpServiceError::Validation)?,
            }
        }

        Ok(validated)
    }
}
